//! Movement компоненты: скорость и kinematic body.

use bevy::prelude::*;

/// Скорость движения combatant (метры/сек)
#[derive(Component, Clone, Copy, Debug, Reflect)]
#[reflect(Component)]
pub struct MovementSpeed {
    pub speed: f32,
}

impl Default for MovementSpeed {
    fn default() -> Self {
        Self { speed: 2.0 } // 2 m/s — базовая скорость ходьбы
    }
}

/// Kinematic body: velocity, которую пишет PursuitPlanner и интегрирует
/// `physics::integrate_movement`.
///
/// PursuitPlanner обязан ПРИМЕНЯТЬ вычисленную velocity сюда, а не просто
/// считать её (класс дефектов "computed but unused velocity").
#[derive(Component, Clone, Copy, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct PhysicsBody {
    pub velocity: Vec3,
}

impl PhysicsBody {
    pub fn stop(&mut self) {
        self.velocity = Vec3::ZERO;
    }

    pub fn is_moving(&self) -> bool {
        self.velocity.length_squared() > 1e-6
    }
}
