//! Pursuit planner: движение к цели и переход в атаку.
//!
//! Приоритет: атака > движение. Если цель уже в зоне досягаемости,
//! NPC останавливается и шлёт AttackIntent; иначе идёт по waypoint-пути
//! (если pathfinder зарегистрирован и дал путь) или напрямую (fallback).

use bevy::prelude::*;

use crate::ai::perception::PerceptionState;
use crate::combat::events::AttackIntent;
use crate::combat::hitbox::{AttackReach, BODY_RADIUS};
use crate::combat::session::AttackSession;
use crate::components::{Capabilities, MovementSpeed, PhysicsBody};
use crate::services::PathfinderService;

/// Waypoint считается достигнутым на этой дистанции.
pub const WAYPOINT_REACHED_DISTANCE: f32 = 0.4;

/// Скорость в воде.
pub const SWIM_SPEED_FACTOR: f32 = 0.5;

/// Система: планирование преследования.
///
/// NPC с активной сессией атаки пропускается — velocity обнулена при
/// старте сессии и до её завершения не трогается.
pub fn plan_pursuit(
    mut enemies: Query<
        (
            Entity,
            &Transform,
            &mut PerceptionState,
            &mut PhysicsBody,
            &MovementSpeed,
            &AttackReach,
            &Capabilities,
        ),
        Without<AttackSession>,
    >,
    targets: Query<&Transform>,
    pathfinder: Option<Res<PathfinderService>>,
    mut attacks: EventWriter<AttackIntent>,
) {
    for (enemy, transform, mut state, mut body, speed, reach, caps) in enemies.iter_mut() {
        if !caps.can_move {
            body.stop();
            continue;
        }

        let Some(target) = state.target else {
            continue;
        };
        let Ok(target_transform) = targets.get(target) else {
            // Цель despawned между сканами
            state.target = None;
            state.path = None;
            body.stop();
            continue;
        };

        let origin = transform.translation;
        let target_position = target_transform.translation;
        let distance = origin.distance(target_position);

        // Цель в досягаемости hit-зоны — стоп и атака
        if distance <= reach.reach + reach.radius + BODY_RADIUS {
            body.stop();
            attacks.write(AttackIntent { attacker: enemy });
            continue;
        }

        if state.path.is_none() {
            if let Some(pathfinder) = &pathfinder {
                state.path = pathfinder.0.find_path(origin, target_position);
                state.waypoint_index = 0;
            }
        }

        let next = next_waypoint(&mut state, origin).unwrap_or(target_position);

        let mut effective_speed = speed.speed;
        if caps.is_swimming {
            effective_speed *= SWIM_SPEED_FACTOR;
        }

        let direction = next - origin;
        if direction.length_squared() > 1e-6 {
            body.velocity = direction.normalize() * effective_speed;
        } else {
            body.stop();
        }
    }
}

/// Текущий waypoint пути, с продвижением индекса по мере достижения.
/// Путь исчерпан (или отсутствует) — None, caller идёт прямо на цель.
fn next_waypoint(state: &mut PerceptionState, origin: Vec3) -> Option<Vec3> {
    let path = state.path.as_ref()?;

    while state.waypoint_index < path.len() {
        let waypoint = path[state.waypoint_index];
        if origin.distance(waypoint) > WAYPOINT_REACHED_DISTANCE {
            return Some(waypoint);
        }
        state.waypoint_index += 1;
    }

    state.path = None;
    state.waypoint_index = 0;
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waypoint_advance() {
        let mut state = PerceptionState {
            path: Some(vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)]),
            ..Default::default()
        };

        // Далеко от первого waypoint — идём к нему
        assert_eq!(
            next_waypoint(&mut state, Vec3::ZERO),
            Some(Vec3::new(1.0, 0.0, 0.0))
        );

        // Подошли вплотную — переключаемся на второй
        assert_eq!(
            next_waypoint(&mut state, Vec3::new(0.9, 0.0, 0.0)),
            Some(Vec3::new(2.0, 0.0, 0.0))
        );

        // Достигли последнего — путь исчерпан и очищен
        assert_eq!(next_waypoint(&mut state, Vec3::new(2.1, 0.0, 0.0)), None);
        assert!(state.path.is_none());
    }
}
