//! Attack session state machine.
//!
//! # Phases
//!
//! ```text
//! Idle (компонент отсутствует)
//!   ↓ AttackIntent + guard (can_attack && can_move)
//! Windup — hitbox уже размещён, overlap ещё не опрашивается
//!   ↓ windup timer
//! Active — overlap poll каждый тик, resolver по каждой новой цели
//!   ↓ первый из двух triggers
//! Completing — restore can_attack, release struck, убрать/пересоздать hitbox
//!   ↓ тот же тик
//! Idle (компонент снят)
//! ```
//!
//! # Completion race
//!
//! Сессию завершают ДВА независимых trigger'а: AnimationFinished от
//! animation service и fallback timer (длиннее самой долгой анимации атаки).
//! Кто первый — тот завершает; второй — тихий no-op. Fallback — это
//! backstop корректности: потерянное animation событие не должно
//! навсегда запереть can_attack (наблюдавшийся класс дефектов).
//!
//! # Cancellation
//!
//! Fallback timer живёт внутри компонента: despawn атакующего удаляет
//! сессию вместе с таймером. Session-bound hitbox несёт token сессии —
//! stale hitbox (владелец умер/пересессился) убирается poll системой.

use bevy::prelude::*;

use crate::combat::events::{AttackIntent, CombatEvent, EntityDied, SessionEnded};
use crate::combat::hitbox::{hitbox_position, zones_overlap, AttackReach, Hitbox};
use crate::combat::resolver::{self, Feedback};
use crate::combat::Blocking;
use crate::components::{Capabilities, CombatStats, Enemy, Facing, Health, PhysicsBody, Player};
use crate::logger::Diagnostics;
use crate::services::{AnimationCommand, AnimationFinished, AnimationKind, ExperienceAwarded, ItemsDropped};
use crate::{DeterministicRng, PerceptionState};

/// Телеграф атаки перед открытием hit-окна.
pub const ATTACK_WINDUP_SECS: f32 = 0.25;

/// Fallback completion: не короче самой долгой анимации атаки (~2.6s).
pub const ATTACK_FALLBACK_SECS: f32 = 2.8;

/// Trailing окно hit-зоны enemy атаки после completion сессии.
pub const ENEMY_HITBOX_TRAIL_SECS: f32 = 0.35;

/// Grace перед despawn умершего NPC (hit-reaction визуалы успевают доиграть).
pub const DEATH_GRACE_SECS: f32 = 0.8;

/// Монотонный счётчик session токенов.
#[derive(Resource, Debug, Default)]
pub struct SessionTokens(u64);

impl SessionTokens {
    pub fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

/// Фаза сессии атаки. Idle = компонент отсутствует.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Windup,
    Active,
    Completing(CompletionCause),
}

/// Какой trigger завершил сессию первым.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionCause {
    Animation,
    Fallback,
}

/// Транзиентная per-attack запись, принадлежит атакующему пока атака жива.
#[derive(Component, Debug, Clone)]
pub struct AttackSession {
    /// Монотонный токен против duplicate-completion гонок
    pub token: u64,
    pub phase: SessionPhase,
    pub windup_timer: f32,
    pub fallback_timer: f32,
    /// Session-bound hitbox entity
    pub hitbox: Option<Entity>,
    /// Цели, по которым resolver уже вызывался (максимум один раз за сессию)
    pub struck: Vec<Entity>,
}

impl AttackSession {
    pub fn new(token: u64, hitbox: Entity) -> Self {
        Self {
            token,
            phase: SessionPhase::Windup,
            windup_timer: ATTACK_WINDUP_SECS,
            fallback_timer: ATTACK_FALLBACK_SECS,
            hitbox: Some(hitbox),
            struck: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn is_completing(&self) -> bool {
        matches!(self.phase, SessionPhase::Completing(_))
    }

    /// First-wins completion. Возвращает false если сессия уже завершается
    /// (второй trigger — тихий no-op, не ошибка).
    pub fn trigger_completion(&mut self, cause: CompletionCause) -> bool {
        if self.is_completing() {
            return false;
        }
        self.phase = SessionPhase::Completing(cause);
        true
    }
}

/// Grace timer умершего NPC перед drop/XP/despawn.
#[derive(Component, Debug, Clone)]
pub struct DeathTimer {
    pub timer: f32,
    pub killer: Option<Entity>,
}

// ============================================================================
// Systems
// ============================================================================

/// Система: старт сессий атаки (AttackIntent события).
///
/// Guard: can_attack && can_move. На входе: новый токен, hitbox от текущего
/// facing, is_attacking=true, can_attack=false, velocity в ноль,
/// AnimationCommand::Play(Attack), fallback timer взведён.
pub fn start_attack_sessions(
    mut intents: EventReader<AttackIntent>,
    mut commands: Commands,
    mut tokens: ResMut<SessionTokens>,
    mut attackers: Query<
        (
            &Transform,
            &Facing,
            &mut Capabilities,
            &mut PhysicsBody,
            &AttackReach,
            Has<Player>,
        ),
        Without<AttackSession>,
    >,
    mut animations: EventWriter<AnimationCommand>,
    diag: Res<Diagnostics>,
) {
    for intent in intents.read() {
        let Ok((transform, facing, mut caps, mut body, reach, is_player)) =
            attackers.get_mut(intent.attacker)
        else {
            continue;
        };

        if !caps.can_attack || !caps.can_move {
            continue;
        }

        let token = tokens.next();
        let position = hitbox_position(transform.translation, *facing, reach.reach);
        let hitbox = commands
            .spawn((
                Hitbox::session_bound(intent.attacker, token, reach.radius, !is_player),
                Transform::from_translation(position),
            ))
            .id();

        caps.is_attacking = true;
        caps.can_attack = false;
        body.stop();

        commands
            .entity(intent.attacker)
            .insert(AttackSession::new(token, hitbox));

        animations.write(AnimationCommand::Play {
            entity: intent.attacker,
            kind: AnimationKind::Attack,
        });

        diag.debug(&format!(
            "⚔️ Attack session started (attacker: {:?}, token: {}, facing: {:?})",
            intent.attacker, token, facing
        ));
    }
}

/// Система: продвижение фаз и fallback timer.
///
/// Windup → Active по таймеру; fallback timer тикает с момента входа и,
/// истекая, становится первым completion trigger'ом если анимация так и
/// не отчиталась.
pub fn advance_attack_sessions(
    mut sessions: Query<(Entity, &mut AttackSession)>,
    time: Res<Time<Fixed>>,
    diag: Res<Diagnostics>,
) {
    let delta = time.delta_secs();

    for (entity, mut session) in sessions.iter_mut() {
        if session.phase == SessionPhase::Windup {
            session.windup_timer -= delta;
            if session.windup_timer <= 0.0 {
                session.phase = SessionPhase::Active;
            }
        }

        if !session.is_completing() {
            session.fallback_timer -= delta;
            if session.fallback_timer <= 0.0 && session.trigger_completion(CompletionCause::Fallback)
            {
                diag.debug(&format!(
                    "⏰ Attack fallback fired (attacker: {:?}, token: {}) — animation event never arrived",
                    entity, session.token
                ));
            }
        }
    }
}

/// Система: completion по AnimationFinished(Attack).
///
/// Если fallback успел первым — no-op (duplicate completion глотается
/// молча, это не ошибка).
pub fn complete_on_animation(
    mut finished: EventReader<AnimationFinished>,
    mut sessions: Query<&mut AttackSession>,
    diag: Res<Diagnostics>,
) {
    for event in finished.read() {
        if event.kind != AnimationKind::Attack {
            continue;
        }
        let Ok(mut session) = sessions.get_mut(event.entity) else {
            continue;
        };
        if session.trigger_completion(CompletionCause::Animation) {
            diag.debug(&format!(
                "✅ Attack animation completed (attacker: {:?}, token: {})",
                event.entity, session.token
            ));
        }
    }
}

/// Система: overlap poll каждый тик пока hit-зона жива.
///
/// Session-bound hitbox опрашивается только в Active фазе и только пока
/// токен совпадает с сессией владельца; stale hitbox убирается. Trailing
/// hitbox живёт по собственному lifetime и дедупит по своему struck set.
pub fn poll_hitbox_overlaps(
    mut commands: Commands,
    mut hitboxes: Query<(Entity, &mut Hitbox, &Transform)>,
    mut sessions: Query<&mut AttackSession>,
    attacker_stats: Query<&CombatStats>,
    mut targets: Query<(
        Entity,
        &Transform,
        &mut Health,
        &mut Capabilities,
        &CombatStats,
        Option<&Blocking>,
        Has<Player>,
    )>,
    mut rng: ResMut<DeterministicRng>,
    mut combat_events: EventWriter<CombatEvent>,
    mut deaths: EventWriter<EntityDied>,
    time: Res<Time<Fixed>>,
    diag: Res<Diagnostics>,
) {
    let delta = time.delta_secs();

    for (hitbox_entity, mut hitbox, hitbox_transform) in hitboxes.iter_mut() {
        // Жизненный цикл: trailing окно тикает само, session-bound
        // валидируется против сессии владельца.
        let mut session = None;
        if let Some(lifetime) = hitbox.lifetime.as_mut() {
            *lifetime -= delta;
            if *lifetime <= 0.0 {
                for &target in &hitbox.struck {
                    if let Ok((_, _, health, mut caps, _, _, _)) = targets.get_mut(target) {
                        if health.is_alive() {
                            caps.can_take_damage = true;
                        }
                    }
                }
                commands.entity(hitbox_entity).despawn();
                continue;
            }
        } else {
            match sessions.get_mut(hitbox.owner) {
                Ok(owner_session) if owner_session.token == hitbox.token => {
                    if owner_session.phase != SessionPhase::Active {
                        continue;
                    }
                    session = Some(owner_session);
                }
                _ => {
                    // Владелец despawned или начал новую сессию — hitbox stale
                    commands.entity(hitbox_entity).despawn();
                    continue;
                }
            }
        }

        let stats = match attacker_stats.get(hitbox.owner) {
            Ok(stats) => *stats,
            Err(_) => {
                // Владелец исчез: release struck как при истечении окна
                for &target in &hitbox.struck {
                    if let Ok((_, _, health, mut caps, _, _, _)) = targets.get_mut(target) {
                        if health.is_alive() {
                            caps.can_take_damage = true;
                        }
                    }
                }
                commands.entity(hitbox_entity).despawn();
                continue;
            }
        };

        for (target, target_transform, mut health, mut caps, target_stats, blocking, is_player) in
            targets.iter_mut()
        {
            if target == hitbox.owner {
                continue;
            }
            if is_player != hitbox.hits_players {
                continue;
            }
            if !caps.can_take_damage {
                continue;
            }
            let already_struck = match &session {
                Some(s) => s.struck.contains(&target),
                None => hitbox.struck.contains(&target),
            };
            if already_struck {
                continue;
            }
            if !zones_overlap(hitbox_transform.translation, hitbox.radius, target_transform.translation) {
                continue;
            }

            // Resolver вызывается максимум один раз на цель за сессию,
            // включая промахи.
            match &mut session {
                Some(s) => s.struck.push(target),
                None => hitbox.struck.push(target),
            }

            let defense_bonus = blocking.map(|b| b.defense_bonus).unwrap_or(0);
            let outcome = resolver::resolve(&stats, target_stats, defense_bonus, &mut rng.rng);

            match outcome.feedback() {
                Feedback::Miss => {
                    combat_events.write(CombatEvent::Miss {
                        attacker: hitbox.owner,
                        target,
                    });
                    continue;
                }
                Feedback::Critical => {
                    combat_events.write(CombatEvent::Critical {
                        attacker: hitbox.owner,
                        target,
                        damage: outcome.damage,
                    });
                }
                Feedback::Hit => {
                    combat_events.write(CombatEvent::Hit {
                        attacker: hitbox.owner,
                        target,
                        damage: outcome.damage,
                    });
                }
            }

            health.take_damage(outcome.damage);
            // Momentary: защищает от multi-hit в том же кадре,
            // release на completion сессии / истечении trailing окна
            caps.can_take_damage = false;

            diag.debug(&format!(
                "💥 Hitbox hit (attacker: {:?}, target: {:?}, damage: {}, critical: {}, HP: {})",
                hitbox.owner, target, outcome.damage, outcome.is_critical, health.current
            ));

            if !health.is_alive() {
                deaths.write(EntityDied {
                    entity: target,
                    killer: Some(hitbox.owner),
                });
            }
        }
    }
}

/// Система: финализация Completing сессий.
///
/// Restore can_attack/is_attacking, убрать session-bound hitbox (player)
/// или пересоздать trailing hitbox с независимым lifetime (enemy — окно
/// отложенного counter-overlap). SessionEnded → release struck целей.
pub fn finalize_attack_sessions(
    mut commands: Commands,
    mut sessions: Query<(
        Entity,
        &AttackSession,
        &mut Capabilities,
        &Transform,
        &Facing,
        &AttackReach,
        Has<Player>,
    )>,
    mut ended: EventWriter<SessionEnded>,
    diag: Res<Diagnostics>,
) {
    for (attacker, session, mut caps, transform, facing, reach, is_player) in sessions.iter_mut() {
        let SessionPhase::Completing(cause) = session.phase else {
            continue;
        };

        caps.can_attack = true;
        caps.is_attacking = false;

        if let Some(hitbox) = session.hitbox {
            if let Ok(mut hitbox_commands) = commands.get_entity(hitbox) {
                hitbox_commands.despawn();
            }
        }

        if !is_player {
            // Enemy hit-зона переживает сессию: свежий hitbox со своим
            // lifetime и своим struck set
            let position = hitbox_position(transform.translation, *facing, reach.reach);
            commands.spawn((
                Hitbox::trailing(
                    attacker,
                    session.token,
                    reach.radius,
                    true,
                    ENEMY_HITBOX_TRAIL_SECS,
                ),
                Transform::from_translation(position),
            ));
        }

        ended.write(SessionEnded {
            attacker,
            struck: session.struck.clone(),
        });
        commands.entity(attacker).remove::<AttackSession>();

        diag.debug(&format!(
            "✅ Attack session finished (attacker: {:?}, token: {}, cause: {:?}, struck: {})",
            attacker,
            session.token,
            cause,
            session.struck.len()
        ));
    }
}

/// Система: release can_take_damage у struck целей завершённой сессии.
///
/// Мёртвые цели не освобождаются — death window держит их вне таргетинга.
pub fn release_struck_targets(
    mut ended: EventReader<SessionEnded>,
    mut targets: Query<(&Health, &mut Capabilities)>,
) {
    for event in ended.read() {
        for &target in &event.struck {
            if let Ok((health, mut caps)) = targets.get_mut(target) {
                if health.is_alive() {
                    caps.can_take_damage = true;
                }
            }
        }
    }
}

/// Система: death handling.
///
/// Игрок: все capability flags вниз, Stop анимации, PlayerDefeated —
/// дальше сценой владеет внешний collaborator. NPC: отмена сессии,
/// снятие perception, grace timer перед drop/XP/despawn.
pub fn handle_deaths(
    mut deaths: EventReader<EntityDied>,
    mut commands: Commands,
    mut victims: Query<(&mut Capabilities, &mut PhysicsBody, Has<Player>)>,
    sessions: Query<&AttackSession>,
    mut combat_events: EventWriter<CombatEvent>,
    mut animations: EventWriter<AnimationCommand>,
    mut ended: EventWriter<SessionEnded>,
    diag: Res<Diagnostics>,
) {
    for death in deaths.read() {
        combat_events.write(CombatEvent::Death {
            entity: death.entity,
            killer: death.killer,
        });

        let Ok((mut caps, mut body, is_player)) = victims.get_mut(death.entity) else {
            continue;
        };

        body.stop();

        // Отменяем незавершённую сессию и её hitbox (cancellation semantics).
        // Struck цели освобождаются тем же SessionEnded, что и при обычном
        // завершении — иначе выжившая цель навсегда остаётся с
        // can_take_damage == false.
        if let Ok(session) = sessions.get(death.entity) {
            if let Some(hitbox) = session.hitbox {
                if let Ok(mut hitbox_commands) = commands.get_entity(hitbox) {
                    hitbox_commands.despawn();
                }
            }
            ended.write(SessionEnded {
                attacker: death.entity,
                struck: session.struck.clone(),
            });
        }

        if is_player {
            caps.disable_all();
            if let Ok(mut entity_commands) = commands.get_entity(death.entity) {
                entity_commands.remove::<AttackSession>();
            }
            animations.write(AnimationCommand::Stop {
                entity: death.entity,
            });
            combat_events.write(CombatEvent::PlayerDefeated {
                player: death.entity,
            });
            diag.info(&format!("💀 Player defeated: {:?}", death.entity));
        } else {
            caps.can_attack = false;
            caps.can_move = false;
            caps.can_block = false;
            caps.can_take_damage = false;
            caps.is_attacking = false;
            caps.is_blocking = false;

            if let Ok(mut entity_commands) = commands.get_entity(death.entity) {
                entity_commands.remove::<AttackSession>();
                entity_commands.remove::<PerceptionState>();
                entity_commands.insert(DeathTimer {
                    timer: DEATH_GRACE_SECS,
                    killer: death.killer,
                });
            }
            animations.write(AnimationCommand::Play {
                entity: death.entity,
                kind: AnimationKind::Die,
            });
            diag.debug(&format!(
                "💀 Enemy died: {:?} (killer: {:?})",
                death.entity, death.killer
            ));
        }
    }
}

/// Система: grace таймеры умерших NPC.
///
/// По истечении: ItemsDropped, ExperienceAwarded (только если killer —
/// игрок и ещё существует), despawn.
pub fn tick_death_timers(
    mut commands: Commands,
    mut dying: Query<(Entity, &mut DeathTimer, &Enemy)>,
    players: Query<(), With<Player>>,
    mut drops: EventWriter<ItemsDropped>,
    mut experience: EventWriter<ExperienceAwarded>,
    time: Res<Time<Fixed>>,
    diag: Res<Diagnostics>,
) {
    let delta = time.delta_secs();

    for (entity, mut death, enemy) in dying.iter_mut() {
        death.timer -= delta;
        if death.timer > 0.0 {
            continue;
        }

        drops.write(ItemsDropped {
            source: entity,
            items: enemy.loot.clone(),
        });

        if let Some(killer) = death.killer {
            if players.get(killer).is_ok() {
                experience.write(ExperienceAwarded {
                    player: killer,
                    amount: enemy.xp_reward,
                });
            }
        }

        diag.debug(&format!(
            "⚰️ Despawning dead enemy {:?} (loot: {:?}, xp: {})",
            entity, enemy.loot, enemy.xp_reward
        ));
        commands.entity(entity).despawn();
    }
}
