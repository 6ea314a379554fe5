//! Headless демо: игрок против пары волков, 10 секунд симуляции.
//!
//! Запуск: `cargo run -p emberwood_sim`

use bevy::ecs::system::SystemState;
use bevy::prelude::*;
use emberwood_sim::*;

fn main() {
    let mut app = create_headless_app(42);
    app.insert_resource(Diagnostics::console());

    // Каталоги
    {
        let world = app.world_mut();
        let mut items = world.resource_mut::<ItemCatalog>();
        items.register("wolf_pelt", "Wolf Pelt");
        items.register("wolf_fang", "Wolf Fang");

        let mut enemies = world.resource_mut::<EnemyCatalog>();
        enemies.register(
            "wolf",
            EnemyArchetype {
                max_health: 30,
                stats: CombatStats {
                    attack: 8,
                    defense: 2,
                    critical: 5.0,
                    hit: 20.0,
                    flee: 5.0,
                },
                movement_speed: 2.5,
                perception_range: 75.0,
                perception_interval: 0.5,
                attack_reach: 1.0,
                hitbox_radius: 0.9,
                xp_reward: 25,
                loot: vec!["wolf_pelt".to_string(), "wolf_fang".to_string()],
            },
        );
    }

    // Spawn: игрок в центре, волки по сторонам
    let player = {
        let world = app.world_mut();
        let mut state: SystemState<(
            Commands,
            Res<EnemyCatalog>,
            Res<ItemCatalog>,
        )> = SystemState::new(world);
        let (mut commands, enemies, items) = state.get_mut(world);

        let player = spawn_player(
            &mut commands,
            100,
            CombatStats {
                attack: 12,
                defense: 5,
                critical: 10.0,
                hit: 30.0,
                flee: 10.0,
            },
            Vec3::ZERO,
        );

        for position in [Vec3::new(10.0, 0.0, 0.0), Vec3::new(-8.0, 0.0, 6.0)] {
            if let Err(error) = spawn_enemy(&mut commands, &enemies, &items, "wolf", position) {
                eprintln!("spawn failed: {error}");
                std::process::exit(1);
            }
        }

        state.apply(world);
        player
    };

    // 10 секунд симуляции на 60Hz
    run_fixed_steps(&mut app, 600);

    let world = app.world_mut();
    let player_health = world
        .get::<Health>(player)
        .map(|h| h.current)
        .unwrap_or(0);
    let mut enemy_health = world.query_filtered::<&Health, With<Enemy>>();
    let enemies_alive = enemy_health
        .iter(world)
        .filter(|h| h.is_alive())
        .count();

    println!("--- simulation report ---");
    println!("player HP: {player_health}");
    println!("enemies alive: {enemies_alive}");
}
