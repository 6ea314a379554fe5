//! External collaborator seams.
//!
//! Ядро остаётся decoupled от конкретного engine:
//! - line of sight / pathfinding — optional injected trait objects;
//!   их отсутствие деградирует gracefully (auto-visible / direct seek),
//!   никогда не ошибка
//! - animation — typed events в обе стороны; completion может НЕ прийти
//!   вовсе (fallback timer в AttackSession это терпит)
//! - loot/progression — typed events наружу, ядро не знает что с ними делают

use bevy::prelude::*;

// ============================================================================
// Line of sight
// ============================================================================

/// Raycast «видно ли точку B из точки A» (стены, деревья).
pub trait LineOfSight: Send + Sync {
    fn is_visible(&self, from: Vec3, to: Vec3) -> bool;
}

/// Optional resource: если не зарегистрирован, perception считает цель
/// видимой по одному range-критерию.
#[derive(Resource)]
pub struct LineOfSightService(pub Box<dyn LineOfSight>);

// ============================================================================
// Pathfinding
// ============================================================================

/// Waypoint-путь от A к B. None = путь не найден (PursuitPlanner
/// откатывается на direct seek).
pub trait Pathfinder: Send + Sync {
    fn find_path(&self, from: Vec3, to: Vec3) -> Option<Vec<Vec3>>;
}

/// Optional resource: отсутствие = direct seek, никогда не ошибка.
#[derive(Resource)]
pub struct PathfinderService(pub Box<dyn Pathfinder>);

// ============================================================================
// Animation service (events в обе стороны)
// ============================================================================

/// Анимации, которыми ядро управляет у presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum AnimationKind {
    Attack,
    Die,
}

/// Команда presentation layer: проиграть/остановить анимацию.
#[derive(Event, Debug, Clone)]
pub enum AnimationCommand {
    Play { entity: Entity, kind: AnimationKind },
    Stop { entity: Entity },
}

/// Анимация доиграла (presentation → ядро).
///
/// Ядро обязано переживать потерю этого события: completion сессии атаки
/// дублируется fallback таймером.
#[derive(Event, Debug, Clone)]
pub struct AnimationFinished {
    pub entity: Entity,
    pub kind: AnimationKind,
}

// ============================================================================
// Loot / progression collaborators
// ============================================================================

/// Умерший NPC роняет предметы (обрабатывает loot collaborator).
#[derive(Event, Debug, Clone)]
pub struct ItemsDropped {
    pub source: Entity,
    pub items: Vec<String>,
}

/// Игроку начислен опыт за убийство.
#[derive(Event, Debug, Clone)]
pub struct ExperienceAwarded {
    pub player: Entity,
    pub amount: u32,
}
