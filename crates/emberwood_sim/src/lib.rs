//! EMBERWOOD Simulation Core
//!
//! Tick-driven combat resolution + enemy pursuit engine (strategic layer).
//! Engine-agnostic: рендер, физика и pathfinding живут снаружи и общаются
//! с ядром через events и injected services (см. `services`).
//!
//! Управление временем: все gameplay системы в FixedUpdate (60Hz),
//! порядок — chained system sets Perception → Pursuit → Combat → Movement.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod ai;
pub mod catalog;
pub mod combat;
pub mod components;
pub mod logger;
pub mod physics;
pub mod services;

// Re-export базовых типов для удобства
pub use ai::{AiPlugin, PerceptionConfig, PerceptionState};
pub use catalog::{spawn_enemy, spawn_player, EnemyArchetype, EnemyCatalog, ItemCatalog, SpawnError};
pub use combat::{
    resolve, AttackIntent, AttackReach, AttackSession, BlockIntent, BlockReleased, CombatEvent,
    CombatPlugin, EntityDied, Hitbox, SessionPhase, ATTACK_FALLBACK_SECS, CRITICAL_MULTIPLIER,
};
pub use components::*;
pub use logger::{Diagnostics, LogLevel, LogSink};
pub use services::{
    AnimationCommand, AnimationFinished, AnimationKind, ExperienceAwarded, ItemsDropped,
    LineOfSight, LineOfSightService, Pathfinder, PathfinderService,
};

/// Порядок выполнения симуляции внутри FixedUpdate.
///
/// Perception решает «видим ли цель», Pursuit — «идти или атаковать»,
/// Combat обрабатывает сессии атак и урон, Movement интегрирует velocity.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimSet {
    Perception,
    Pursuit,
    Combat,
    Movement,
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick (легче считать интервалы)
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            // Детерминистичный RNG (seed по умолчанию)
            .insert_resource(DeterministicRng::new(42))
            // Injected diagnostics context (console в debug builds, no-op в release)
            .init_resource::<Diagnostics>()
            // Spawn catalogs (пустые, пока игра не зарегистрирует archetypes)
            .init_resource::<EnemyCatalog>()
            .init_resource::<ItemCatalog>()
            .configure_sets(
                FixedUpdate,
                (
                    SimSet::Perception,
                    SimSet::Pursuit,
                    SimSet::Combat,
                    SimSet::Movement,
                )
                    .chain(),
            )
            // Подсистемы (strategic layer)
            .add_plugins((CombatPlugin, AiPlugin))
            .add_systems(
                FixedUpdate,
                physics::integrate_movement.in_set(SimSet::Movement),
            );
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(SimulationPlugin)
        .insert_resource(DeterministicRng::new(seed));

    app
}

/// Прогоняет один fixed tick вручную (детерминистично, без wall-clock).
///
/// MinimalPlugins накапливает Time<Fixed> из реального времени; для тестов
/// и headless прогонов это не годится — тики двигаем сами.
pub fn run_fixed_step(app: &mut App) {
    let timestep = app.world().resource::<Time<Fixed>>().timestep();
    app.world_mut()
        .resource_mut::<Time<Fixed>>()
        .advance_by(timestep);
    app.world_mut().run_schedule(FixedUpdate);
}

/// Прогоняет `ticks` fixed тиков подряд.
pub fn run_fixed_steps(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        run_fixed_step(app);
    }
}

/// Snapshot мира для сравнения детерминизма
/// (упрощённая версия: Debug-сериализация, сортировка по Entity ID)
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
