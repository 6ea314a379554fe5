//! Block controller: стойка с временным бонусом защиты.
//!
//! Вход в блок запирает движение и атаку; выход восстанавливает их
//! асимметрично — только если can_block всё ещё true (внешний state
//! manager мог забрать способности, пока блок держался; блок не должен
//! вернуть их поверх этого).

use bevy::prelude::*;

use crate::combat::events::{BlockIntent, BlockReleased, CombatEvent};
use crate::components::{Capabilities, PhysicsBody};
use crate::logger::Diagnostics;

/// Временный бонус к defense пока блок держится.
pub const BLOCK_DEFENSE_BONUS: i32 = 4;

/// Маркер активного блока. Resolver читает бонус при попадании по цели.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Blocking {
    pub defense_bonus: i32,
}

impl Default for Blocking {
    fn default() -> Self {
        Self {
            defense_bonus: BLOCK_DEFENSE_BONUS,
        }
    }
}

/// Система: вход в блок.
///
/// Guard: can_block && can_move && !is_attacking. Повторный intent
/// при активном блоке — no-op (is_blocking уже true ⇒ can_move false).
pub fn start_blocks(
    mut intents: EventReader<BlockIntent>,
    mut commands: Commands,
    mut blockers: Query<(&mut Capabilities, &mut PhysicsBody)>,
    mut combat_events: EventWriter<CombatEvent>,
    diag: Res<Diagnostics>,
) {
    for intent in intents.read() {
        let Ok((mut caps, mut body)) = blockers.get_mut(intent.entity) else {
            continue;
        };

        if !caps.can_block || !caps.can_move || caps.is_attacking {
            continue;
        }

        caps.is_blocking = true;
        caps.can_move = false;
        caps.can_attack = false;
        body.stop();

        commands.entity(intent.entity).insert(Blocking::default());
        combat_events.write(CombatEvent::BlockStarted {
            entity: intent.entity,
        });
        diag.debug(&format!("🛡️ Block started: {:?}", intent.entity));
    }
}

/// Система: выход из блока.
///
/// Асимметричный restore: can_move/can_attack возвращаются только если
/// can_block всё ещё true. Release без активного блока — no-op.
pub fn stop_blocks(
    mut releases: EventReader<BlockReleased>,
    mut commands: Commands,
    mut blockers: Query<&mut Capabilities, With<Blocking>>,
    mut combat_events: EventWriter<CombatEvent>,
    diag: Res<Diagnostics>,
) {
    for release in releases.read() {
        let Ok(mut caps) = blockers.get_mut(release.entity) else {
            continue;
        };

        if !caps.is_blocking {
            continue;
        }

        caps.is_blocking = false;
        if caps.can_block {
            caps.can_move = true;
            caps.can_attack = true;
        }

        commands.entity(release.entity).remove::<Blocking>();
        combat_events.write(CombatEvent::BlockEnded {
            entity: release.entity,
        });
        diag.debug(&format!("🛡️ Block released: {:?}", release.entity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bonus() {
        assert_eq!(Blocking::default().defense_bonus, BLOCK_DEFENSE_BONUS);
    }
}
