//! Каталоги архетипов и spawn helpers.
//!
//! Валидация — на spawn-time: неизвестный архетип или loot id это
//! ошибка данных, она фатальна и возвращается caller'у. Runtime ошибок
//! ядро не генерирует.

use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ai::{PerceptionConfig, PerceptionState};
use crate::combat::AttackReach;
use crate::components::{
    Capabilities, CombatStats, Enemy, Facing, Health, MovementSpeed, PhysicsBody, Player,
};

/// Ошибки spawn-time валидации.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    #[error("unknown enemy archetype: {0}")]
    UnknownEnemy(String),
    #[error("unknown item id in loot table: {0}")]
    UnknownItem(String),
}

/// Шаблон NPC (десериализуется из data-файлов).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyArchetype {
    pub max_health: u32,
    pub stats: CombatStats,
    pub movement_speed: f32,
    pub perception_range: f32,
    pub perception_interval: f32,
    pub attack_reach: f32,
    pub hitbox_radius: f32,
    pub xp_reward: u32,
    #[serde(default)]
    pub loot: Vec<String>,
}

/// Реестр архетипов NPC.
#[derive(Resource, Debug, Default)]
pub struct EnemyCatalog {
    archetypes: HashMap<String, EnemyArchetype>,
}

impl EnemyCatalog {
    pub fn register(&mut self, id: impl Into<String>, archetype: EnemyArchetype) {
        self.archetypes.insert(id.into(), archetype);
    }

    pub fn get(&self, id: &str) -> Option<&EnemyArchetype> {
        self.archetypes.get(id)
    }
}

/// Реестр известных предметов (валидация loot таблиц).
#[derive(Resource, Debug, Default)]
pub struct ItemCatalog {
    items: HashMap<String, String>,
}

impl ItemCatalog {
    pub fn register(&mut self, id: impl Into<String>, display_name: impl Into<String>) {
        self.items.insert(id.into(), display_name.into());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn display_name(&self, id: &str) -> Option<&str> {
        self.items.get(id).map(String::as_str)
    }
}

/// Spawn NPC по id архетипа. Loot таблица валидируется против ItemCatalog
/// до создания entity — частично инициализированных NPC не бывает.
pub fn spawn_enemy(
    commands: &mut Commands,
    enemies: &EnemyCatalog,
    items: &ItemCatalog,
    id: &str,
    position: Vec3,
) -> Result<Entity, SpawnError> {
    let archetype = enemies
        .get(id)
        .ok_or_else(|| SpawnError::UnknownEnemy(id.to_string()))?;

    for item in &archetype.loot {
        if !items.contains(item) {
            return Err(SpawnError::UnknownItem(item.clone()));
        }
    }

    let entity = commands
        .spawn((
            Enemy {
                xp_reward: archetype.xp_reward,
                loot: archetype.loot.clone(),
            },
            Health::new(archetype.max_health),
            archetype.stats,
            Capabilities::default(),
            MovementSpeed {
                speed: archetype.movement_speed,
            },
            Facing::default(),
            PhysicsBody::default(),
            AttackReach {
                reach: archetype.attack_reach,
                radius: archetype.hitbox_radius,
            },
            PerceptionConfig {
                range: archetype.perception_range,
                check_interval: archetype.perception_interval,
            },
            PerceptionState::default(),
            Transform::from_translation(position),
        ))
        .id();

    Ok(entity)
}

/// Spawn игрока с заданными статами.
pub fn spawn_player(
    commands: &mut Commands,
    max_health: u32,
    stats: CombatStats,
    position: Vec3,
) -> Entity {
    commands
        .spawn((
            Player,
            Health::new(max_health),
            stats,
            Capabilities::default(),
            MovementSpeed::default(),
            Facing::default(),
            PhysicsBody::default(),
            AttackReach::default(),
            Transform::from_translation(position),
        ))
        .id()
}
