//! Combat: resolver, attack sessions, hitboxes, block, смерть.

pub mod block;
pub mod events;
pub mod hitbox;
pub mod resolver;
pub mod session;

pub use block::{start_blocks, stop_blocks, Blocking, BLOCK_DEFENSE_BONUS};
pub use events::{
    AttackIntent, BlockIntent, BlockReleased, CombatEvent, EntityDied, SessionEnded,
};
pub use hitbox::{hitbox_position, zones_overlap, AttackReach, Hitbox, BODY_RADIUS};
pub use resolver::{
    check_critical, check_hit, resolve, roll_damage, DamageOutcome, Feedback,
    CRITICAL_MULTIPLIER, DAMAGE_VARIATION, MIN_HIT_DAMAGE,
};
pub use session::{
    AttackSession, CompletionCause, DeathTimer, SessionPhase, SessionTokens,
    ATTACK_FALLBACK_SECS, ATTACK_WINDUP_SECS, DEATH_GRACE_SECS, ENEMY_HITBOX_TRAIL_SECS,
};

use bevy::prelude::*;

use crate::services::{
    AnimationCommand, AnimationFinished, ExperienceAwarded, ItemsDropped,
};
use crate::SimSet;

/// Плагин боевой системы: события + фиксированная цепочка систем.
///
/// Порядок в цепочке неслучаен: блоки до старта атак (block запирает
/// can_attack в том же тике), completion triggers до финализации,
/// финализация до release, смерть — последней.
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SessionTokens>()
            .add_event::<AttackIntent>()
            .add_event::<BlockIntent>()
            .add_event::<BlockReleased>()
            .add_event::<EntityDied>()
            .add_event::<SessionEnded>()
            .add_event::<CombatEvent>()
            .add_event::<AnimationCommand>()
            .add_event::<AnimationFinished>()
            .add_event::<ItemsDropped>()
            .add_event::<ExperienceAwarded>()
            .register_type::<AttackReach>()
            .register_type::<Blocking>()
            .add_systems(
                FixedUpdate,
                (
                    start_blocks,
                    stop_blocks,
                    session::start_attack_sessions,
                    session::advance_attack_sessions,
                    session::complete_on_animation,
                    session::poll_hitbox_overlaps,
                    session::finalize_attack_sessions,
                    session::release_struck_targets,
                    session::handle_deaths,
                    session::tick_death_timers,
                )
                    .chain()
                    .in_set(SimSet::Combat),
            );
    }
}
