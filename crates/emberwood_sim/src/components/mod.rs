//! Базовые компоненты combatants.

pub mod actor;
pub mod movement;

pub use actor::{Capabilities, CombatStats, Enemy, Facing, Health, Player};
pub use movement::{MovementSpeed, PhysicsBody};
