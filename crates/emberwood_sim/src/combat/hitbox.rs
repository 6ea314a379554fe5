//! Hitbox geometry: направление-зависимый placement hit-зоны.
//!
//! Hitbox — отдельная entity (Transform + Hitbox), живущая либо пока жива
//! сессия атаки владельца (session-bound), либо фиксированный trailing
//! lifetime (enemy атаки оставляют короткое окно после completion).

use bevy::prelude::*;

use crate::components::Facing;

/// Радиус «тела» цели для circle-overlap проверок.
pub const BODY_RADIUS: f32 = 0.5;

/// Геометрия ближней атаки combatant.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct AttackReach {
    /// Насколько далеко от центра атакующего ставится hit-зона
    pub reach: f32,
    /// Радиус hit-зоны
    pub radius: f32,
}

impl Default for AttackReach {
    fn default() -> Self {
        Self {
            reach: 1.0,
            radius: 0.9,
        }
    }
}

/// Hit-зона атаки.
///
/// `token` привязывает session-bound hitbox к конкретной сессии владельца:
/// despawn владельца или новая сессия делают hitbox stale, и poll система
/// его убирает (cancellation semantics из дизайна таймеров).
#[derive(Component, Debug, Clone)]
pub struct Hitbox {
    /// Кто атакует
    pub owner: Entity,
    /// Токен сессии, породившей hitbox
    pub token: u64,
    /// Радиус зоны
    pub radius: f32,
    /// true — бьёт игроков (enemy атака), false — бьёт врагов (player атака)
    pub hits_players: bool,
    /// None — session-bound; Some — trailing window с независимым lifetime
    pub lifetime: Option<f32>,
    /// Дедупликация для trailing окна (у session-bound дедуп в session.struck)
    pub struck: Vec<Entity>,
}

impl Hitbox {
    pub fn session_bound(owner: Entity, token: u64, radius: f32, hits_players: bool) -> Self {
        Self {
            owner,
            token,
            radius,
            hits_players,
            lifetime: None,
            struck: Vec::new(),
        }
    }

    pub fn trailing(
        owner: Entity,
        token: u64,
        radius: f32,
        hits_players: bool,
        lifetime: f32,
    ) -> Self {
        Self {
            owner,
            token,
            radius,
            hits_players,
            lifetime: Some(lifetime),
            struck: Vec::new(),
        }
    }
}

/// Позиция hit-зоны: центр атакующего + facing-offset.
pub fn hitbox_position(attacker_position: Vec3, facing: Facing, reach: f32) -> Vec3 {
    attacker_position + facing.offset(reach)
}

/// Circle-overlap зоны против тела цели.
pub fn zones_overlap(hitbox_position: Vec3, radius: f32, target_position: Vec3) -> bool {
    hitbox_position.distance(target_position) <= radius + BODY_RADIUS
}
