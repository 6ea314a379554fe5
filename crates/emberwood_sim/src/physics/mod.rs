//! Движение: интеграция velocity → translation на fixed tick.

use bevy::prelude::*;

use crate::components::{Capabilities, Facing, PhysicsBody};

/// Система: translation += velocity * dt, facing по направлению движения.
///
/// !can_move гасит velocity вместо интеграции — запертые состояния
/// (блок, атака, смерть) не двигают entity даже при остаточной скорости.
pub fn integrate_movement(
    mut bodies: Query<(&mut Transform, &mut PhysicsBody, &mut Facing, &Capabilities)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (mut transform, mut body, mut facing, caps) in bodies.iter_mut() {
        if !caps.can_move {
            body.stop();
            continue;
        }
        if !body.is_moving() {
            continue;
        }

        transform.translation += body.velocity * delta;

        if let Some(direction) = Facing::from_direction(body.velocity) {
            *facing = direction;
        }
    }
}
