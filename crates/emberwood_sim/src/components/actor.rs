//! Базовые компоненты combatants: Health, CombatStats, Capabilities, Facing.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Маркер: управляемый игроком combatant.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Player;

/// Маркер + death payload для NPC-врага.
///
/// `xp_reward` и `loot` резолвятся из EnemyCatalog при spawn
/// (невалидные id — фатальная ошибка конструирования, см. `catalog`).
#[derive(Component, Debug, Clone, Reflect)]
pub struct Enemy {
    /// Опыт, начисляемый игроку-убийце
    pub xp_reward: u32,
    /// Item id для drop при смерти
    pub loot: Vec<String>,
}

/// Здоровье combatant
///
/// Инвариант: 0 ≤ current ≤ max. Entity с current == 0 мертв и не должен
/// становиться целью новых атак (can_take_damage снимается на death window).
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.current = self.current.saturating_sub(amount);
    }

    pub fn heal(&mut self, amount: u32) {
        self.current = (self.current + amount).min(self.max);
    }
}

/// Боевые атрибуты combatant.
///
/// `critical`, `hit`, `flee` — в процентных единицах (roll U(0,100)).
/// flee == 0 — defined behavior: атакующий попадает всегда (см. resolver).
#[derive(Component, Debug, Clone, Copy, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct CombatStats {
    pub attack: i32,
    pub defense: i32,
    pub critical: f32,
    pub hit: f32,
    pub flee: f32,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            attack: 10,
            defense: 5,
            critical: 5.0,
            hit: 20.0,
            flee: 10.0,
        }
    }
}

/// Capability flags combatant.
///
/// Мутируются сессиями атак, block controller и death handling.
/// Внешние системы (диалоги, меню) могут снимать can_* флаги независимо —
/// block restore обязан это уважать (asymmetric restore, см. `combat::block`).
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Capabilities {
    pub can_attack: bool,
    pub can_move: bool,
    pub can_block: bool,
    pub can_take_damage: bool,
    pub is_swimming: bool,
    pub is_attacking: bool,
    pub is_blocking: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            can_attack: true,
            can_move: true,
            can_block: true,
            can_take_damage: true,
            is_swimming: false,
            is_attacking: false,
            is_blocking: false,
        }
    }
}

impl Capabilities {
    /// Снять всё (player defeat: управление отдаётся внешнему collaborator).
    pub fn disable_all(&mut self) {
        self.can_attack = false;
        self.can_move = false;
        self.can_block = false;
        self.can_take_damage = false;
        self.is_attacking = false;
        self.is_blocking = false;
    }
}

/// Четырёхстороннее направление взгляда (top-down plane X/Z).
///
/// Определяет placement hit-зоны атаки; обновляется из последнего
/// ненулевого направления движения.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
#[reflect(Component)]
pub enum Facing {
    North,
    #[default]
    South,
    East,
    West,
}

impl Facing {
    /// Offset hit-зоны от позиции атакующего.
    pub fn offset(&self, reach: f32) -> Vec3 {
        match self {
            Facing::North => Vec3::new(0.0, 0.0, -reach),
            Facing::South => Vec3::new(0.0, 0.0, reach),
            Facing::East => Vec3::new(reach, 0.0, 0.0),
            Facing::West => Vec3::new(-reach, 0.0, 0.0),
        }
    }

    /// Facing из направления движения (доминирующая ось), None для нулевого вектора.
    pub fn from_direction(direction: Vec3) -> Option<Self> {
        if direction.length_squared() < 1e-6 {
            return None;
        }
        if direction.x.abs() >= direction.z.abs() {
            if direction.x >= 0.0 {
                Some(Facing::East)
            } else {
                Some(Facing::West)
            }
        } else if direction.z >= 0.0 {
            Some(Facing::South)
        } else {
            Some(Facing::North)
        }
    }
}
