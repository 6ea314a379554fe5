//! Combat events: intents внутрь, typed presentation events наружу.

use bevy::prelude::*;

/// Intent: combatant хочет атаковать (player input или PursuitPlanner).
///
/// Обрабатывается `start_attack_sessions` с guard can_attack && can_move.
#[derive(Event, Debug, Clone)]
pub struct AttackIntent {
    pub attacker: Entity,
}

/// Intent: начать блок (player input).
#[derive(Event, Debug, Clone)]
pub struct BlockIntent {
    pub entity: Entity,
}

/// Intent: отпустить блок.
#[derive(Event, Debug, Clone)]
pub struct BlockReleased {
    pub entity: Entity,
}

/// Entity умер (health == 0). Внутреннее событие для death handling.
#[derive(Event, Debug, Clone)]
pub struct EntityDied {
    pub entity: Entity,
    pub killer: Option<Entity>,
}

/// Сессия атаки завершена: release struck целей.
/// Внутреннее событие между finalize и release системами.
#[derive(Event, Debug, Clone)]
pub struct SessionEnded {
    pub attacker: Entity,
    pub struck: Vec<Entity>,
}

/// Typed combat events для presentation/audio/log sink.
///
/// Ядро никогда не форматирует user-facing строки — только эти события.
/// Sink сам решает какой звук/текст/тинт им соответствует.
#[derive(Event, Debug, Clone)]
pub enum CombatEvent {
    Hit {
        attacker: Entity,
        target: Entity,
        damage: u32,
    },
    Critical {
        attacker: Entity,
        target: Entity,
        damage: u32,
    },
    Miss {
        attacker: Entity,
        target: Entity,
    },
    Death {
        entity: Entity,
        killer: Option<Entity>,
    },
    /// Игрок повержен: внешний collaborator ставит сцену на паузу.
    PlayerDefeated {
        player: Entity,
    },
    /// Блок начат (sink применяет tint).
    BlockStarted {
        entity: Entity,
    },
    BlockEnded {
        entity: Entity,
    },
}
