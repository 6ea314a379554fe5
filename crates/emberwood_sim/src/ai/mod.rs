//! Enemy AI: perception (поиск цели) и pursuit (преследование/атака).

pub mod perception;
pub mod pursuit;

pub use perception::{perceive_targets, PerceptionConfig, PerceptionState};
pub use pursuit::{plan_pursuit, SWIM_SPEED_FACTOR, WAYPOINT_REACHED_DISTANCE};

use bevy::prelude::*;

use crate::SimSet;

pub struct AiPlugin;

impl Plugin for AiPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<PerceptionConfig>()
            .register_type::<PerceptionState>()
            .add_systems(FixedUpdate, perceive_targets.in_set(SimSet::Perception))
            .add_systems(FixedUpdate, plan_pursuit.in_set(SimSet::Pursuit));
    }
}
