//! Perception: throttled поиск цели для NPC.
//!
//! Сканирование дорогое (LOS raycast), поэтому гоняется не каждый тик,
//! а по interval-таймеру. Таймер перезаряжается безусловно — нашли цель
//! или нет, следующий скан через полный interval.

use bevy::prelude::*;

use crate::components::{Capabilities, Health, PhysicsBody, Player};
use crate::logger::Diagnostics;
use crate::services::LineOfSightService;

/// Статическая настройка восприятия NPC (из каталога).
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct PerceptionConfig {
    /// Дальность обнаружения
    pub range: f32,
    /// Интервал между сканированиями, сек
    pub check_interval: f32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            range: 75.0,
            check_interval: 0.5,
        }
    }
}

/// Текущее состояние восприятия: цель, путь, прогресс по waypoint'ам.
///
/// Снимается при смерти NPC — мёртвый не воспринимает.
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct PerceptionState {
    pub check_timer: f32,
    pub target: Option<Entity>,
    /// Waypoint-путь от pathfinder'а (None = direct seek)
    pub path: Option<Vec<Vec3>>,
    pub waypoint_index: usize,
}

/// Система: throttled скан целей.
///
/// На каждом скане: ближайший ЖИВОЙ игрок в радиусе, опционально
/// отфильтрованный LOS-сервисом (сервис отсутствует ⇒ видимость по
/// одному range-критерию). Цель найдена — path сбрасывается, pursuit
/// перепланирует на свежую позицию. Цели нет — путь чистится, NPC встаёт.
pub fn perceive_targets(
    mut enemies: Query<(
        Entity,
        &Transform,
        &PerceptionConfig,
        &mut PerceptionState,
        &mut PhysicsBody,
        &Capabilities,
    )>,
    players: Query<(Entity, &Transform, &Health), With<Player>>,
    los: Option<Res<LineOfSightService>>,
    time: Res<Time<Fixed>>,
    diag: Res<Diagnostics>,
) {
    let delta = time.delta_secs();

    for (enemy, transform, config, mut state, mut body, caps) in enemies.iter_mut() {
        state.check_timer -= delta;
        if state.check_timer > 0.0 {
            continue;
        }
        // Безусловная перезарядка: скан раз в interval независимо от исхода
        state.check_timer = config.check_interval;

        if !caps.can_move {
            continue;
        }

        let origin = transform.translation;
        let mut nearest: Option<(Entity, f32)> = None;

        for (player, player_transform, health) in players.iter() {
            if !health.is_alive() {
                continue;
            }
            let distance = origin.distance(player_transform.translation);
            if distance > config.range {
                continue;
            }
            if let Some(los) = &los {
                if !los.0.is_visible(origin, player_transform.translation) {
                    continue;
                }
            }
            match nearest {
                Some((_, best)) if best <= distance => {}
                _ => nearest = Some((player, distance)),
            }
        }

        match nearest {
            Some((player, distance)) => {
                if state.target != Some(player) {
                    diag.debug(&format!(
                        "👁️ Enemy {:?} acquired target {:?} at {:.1}",
                        enemy, player, distance
                    ));
                }
                state.target = Some(player);
                // Путь пересчитывается на свежую позицию цели
                state.path = None;
                state.waypoint_index = 0;
            }
            None => {
                if state.target.is_some() {
                    diag.debug(&format!("👁️ Enemy {:?} lost target", enemy));
                }
                state.target = None;
                state.path = None;
                state.waypoint_index = 0;
                body.stop();
            }
        }
    }
}
