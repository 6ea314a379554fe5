//! Combat integration tests
//!
//! Headless прогоны полного SimulationPlugin на ручных fixed тиках:
//! - lockout/восстановление can_attack (regression: потерянное animation
//!   событие не запирает атаку навсегда)
//! - completion race (animation vs fallback, duplicate — no-op)
//! - урон максимум один раз за сессию на цель
//! - block: асимметричный restore способностей
//! - perception range / pursuit / waypoint following
//! - смерть NPC: grace, loot, XP; поражение игрока
//! - детерминизм (одинаковый seed ⇒ идентичные снепшоты)

use bevy::prelude::*;
use emberwood_sim::ai::{PerceptionConfig, PerceptionState};
use emberwood_sim::combat::{AttackReach, DeathTimer, SessionPhase};
use emberwood_sim::services::{LineOfSight, LineOfSightService, Pathfinder, PathfinderService};
use emberwood_sim::*;

/// Helper: игрок с заданными статами и HP
fn spawn_test_player(world: &mut World, position: Vec3, stats: CombatStats, hp: u32) -> Entity {
    world
        .spawn((
            Player,
            Health::new(hp),
            stats,
            Capabilities::default(),
            MovementSpeed::default(),
            Facing::East,
            PhysicsBody::default(),
            AttackReach::default(),
            Transform::from_translation(position),
        ))
        .id()
}

/// Helper: NPC с perception + pursuit
fn spawn_test_enemy(
    world: &mut World,
    position: Vec3,
    stats: CombatStats,
    hp: u32,
    facing: Facing,
) -> Entity {
    world
        .spawn((
            Enemy {
                xp_reward: 25,
                loot: vec!["pelt".to_string()],
            },
            Health::new(hp),
            stats,
            Capabilities::default(),
            MovementSpeed { speed: 2.5 },
            facing,
            PhysicsBody::default(),
            AttackReach::default(),
            PerceptionConfig::default(),
            PerceptionState::default(),
            Transform::from_translation(position),
        ))
        .id()
}

/// Helper: все CombatEvent с начала прогона (события не очищаются —
/// First schedule в ручном tick-драйвере не гоняется)
fn combat_events(world: &World) -> Vec<CombatEvent> {
    let events = world.resource::<Events<CombatEvent>>();
    events.get_cursor().read(events).cloned().collect()
}

fn always_crit() -> CombatStats {
    CombatStats {
        attack: 10,
        defense: 0,
        critical: 100.0,
        hit: 100.0,
        flee: 0.0,
    }
}

fn harmless() -> CombatStats {
    CombatStats {
        attack: 1,
        defense: 0,
        critical: 0.0,
        hit: 0.0,
        flee: 1.0,
    }
}

// --- Attack session lifecycle ---

/// Regression: can_attack true → false на время сессии → true после
/// fallback, даже если AnimationFinished так и не пришёл.
#[test]
fn test_attack_lockout_releases_via_fallback() {
    let mut app = create_headless_app(42);
    let player = spawn_test_player(app.world_mut(), Vec3::ZERO, always_crit(), 100);

    assert!(app.world().get::<Capabilities>(player).unwrap().can_attack);

    app.world_mut().send_event(AttackIntent { attacker: player });
    run_fixed_step(&mut app);

    let caps = app.world().get::<Capabilities>(player).unwrap();
    assert!(!caps.can_attack, "attack must lock during session");
    assert!(caps.is_attacking);
    assert!(app.world().get::<AttackSession>(player).is_some());

    // Fallback 2.8s на 60Hz = 168 тиков; никакого animation события
    run_fixed_steps(&mut app, 200);

    let caps = app.world().get::<Capabilities>(player).unwrap();
    assert!(caps.can_attack, "fallback must release the lockout");
    assert!(!caps.is_attacking);
    assert!(app.world().get::<AttackSession>(player).is_none());
}

/// Animation completion приходит раньше fallback и завершает сессию;
/// duplicate событие — тихий no-op.
#[test]
fn test_animation_completion_and_duplicate() {
    let mut app = create_headless_app(42);
    let player = spawn_test_player(app.world_mut(), Vec3::ZERO, always_crit(), 100);

    app.world_mut().send_event(AttackIntent { attacker: player });
    run_fixed_step(&mut app);
    assert!(!app.world().get::<Capabilities>(player).unwrap().can_attack);

    app.world_mut().send_event(AnimationFinished {
        entity: player,
        kind: AnimationKind::Attack,
    });
    run_fixed_step(&mut app);

    let caps = app.world().get::<Capabilities>(player).unwrap();
    assert!(caps.can_attack, "animation completion must release lockout");
    assert!(app.world().get::<AttackSession>(player).is_none());

    // Второе completion (сессии уже нет) — no-op, без паники
    app.world_mut().send_event(AnimationFinished {
        entity: player,
        kind: AnimationKind::Attack,
    });
    run_fixed_step(&mut app);
    assert!(app.world().get::<Capabilities>(player).unwrap().can_attack);
}

/// Цель получает урон максимум один раз за сессию, несмотря на
/// overlap poll каждый тик.
#[test]
fn test_damage_applies_once_per_session() {
    let mut app = create_headless_app(42);
    let player = spawn_test_player(app.world_mut(), Vec3::ZERO, always_crit(), 100);
    let enemy = spawn_test_enemy(
        app.world_mut(),
        Vec3::new(1.5, 0.0, 0.0),
        harmless(),
        30,
        Facing::West,
    );
    // Обездвиживаем NPC: интересует только входящий урон
    app.world_mut().get_mut::<Capabilities>(enemy).unwrap().can_move = false;

    app.world_mut().send_event(AttackIntent { attacker: player });
    run_fixed_steps(&mut app, 200); // вся сессия вплоть до fallback

    // crit 100% ⇒ ровно один Critical на 15 урона (ceil(10 * 1.5))
    let health = app.world().get::<Health>(enemy).unwrap();
    assert_eq!(health.current, 15);

    let hits = combat_events(app.world())
        .iter()
        .filter(|e| {
            matches!(
                e,
                CombatEvent::Hit { target, .. }
                | CombatEvent::Critical { target, .. }
                | CombatEvent::Miss { target, .. }
                if *target == enemy
            )
        })
        .count();
    assert_eq!(hits, 1, "resolver must run once per target per session");

    // Сессия завершена — can_take_damage возвращён
    assert!(app.world().get::<Capabilities>(enemy).unwrap().can_take_damage);
}

// --- Block ---

/// Блок запирает движение/атаку; restore асимметричен: если can_block
/// забрали пока блок держался, release НЕ возвращает can_move/can_attack.
#[test]
fn test_block_asymmetric_restore() {
    let mut app = create_headless_app(42);
    let player = spawn_test_player(app.world_mut(), Vec3::ZERO, always_crit(), 100);

    app.world_mut().send_event(BlockIntent { entity: player });
    run_fixed_step(&mut app);

    let caps = app.world().get::<Capabilities>(player).unwrap();
    assert!(caps.is_blocking);
    assert!(!caps.can_move && !caps.can_attack);

    // Обычный release возвращает способности
    app.world_mut().send_event(BlockReleased { entity: player });
    run_fixed_step(&mut app);
    let caps = app.world().get::<Capabilities>(player).unwrap();
    assert!(!caps.is_blocking && caps.can_move && caps.can_attack);

    // Снова блок, затем внешний менеджер забирает can_block
    app.world_mut().send_event(BlockIntent { entity: player });
    run_fixed_step(&mut app);
    app.world_mut().get_mut::<Capabilities>(player).unwrap().can_block = false;

    app.world_mut().send_event(BlockReleased { entity: player });
    run_fixed_step(&mut app);

    let caps = app.world().get::<Capabilities>(player).unwrap();
    assert!(!caps.is_blocking);
    assert!(
        !caps.can_move && !caps.can_attack,
        "release must not restore abilities revoked during block"
    );
}

// --- Perception / pursuit ---

/// Цель за пределами perception range не обнаруживается; в радиусе —
/// обнаруживается и NPC начинает сближение.
#[test]
fn test_perception_range_gate() {
    let mut app = create_headless_app(42);
    spawn_test_player(app.world_mut(), Vec3::ZERO, always_crit(), 100);
    // range по умолчанию 75
    let far = spawn_test_enemy(
        app.world_mut(),
        Vec3::new(80.0, 0.0, 0.0),
        harmless(),
        30,
        Facing::West,
    );
    let near = spawn_test_enemy(
        app.world_mut(),
        Vec3::new(50.0, 0.0, 0.0),
        harmless(),
        30,
        Facing::West,
    );

    run_fixed_steps(&mut app, 120); // 2 секунды, несколько сканов

    let world = app.world();
    assert!(
        world.get::<PerceptionState>(far).unwrap().target.is_none(),
        "target beyond range must stay undetected"
    );
    assert_eq!(world.get::<Transform>(far).unwrap().translation.x, 80.0);

    assert!(world.get::<PerceptionState>(near).unwrap().target.is_some());
    assert!(
        world.get::<Transform>(near).unwrap().translation.x < 50.0,
        "detected enemy must close distance"
    );
}

/// Без pathfinder'а NPC идёт прямо на цель (graceful degradation).
#[test]
fn test_direct_seek_without_pathfinder() {
    let mut app = create_headless_app(42);
    spawn_test_player(app.world_mut(), Vec3::ZERO, always_crit(), 100);
    let enemy = spawn_test_enemy(
        app.world_mut(),
        Vec3::new(20.0, 0.0, 0.0),
        harmless(),
        30,
        Facing::West,
    );

    run_fixed_steps(&mut app, 10);

    let body = app.world().get::<PhysicsBody>(enemy).unwrap();
    assert!(body.velocity.x < 0.0, "must seek straight toward the player");
    assert!(body.velocity.z.abs() < 1e-4);
}

struct DoglegPath;

impl Pathfinder for DoglegPath {
    fn find_path(&self, _from: Vec3, to: Vec3) -> Option<Vec<Vec3>> {
        Some(vec![Vec3::new(0.0, 0.0, 10.0), to])
    }
}

/// С pathfinder'ом NPC следует waypoint-пути, а не прямой линии.
#[test]
fn test_waypoint_following_with_pathfinder() {
    let mut app = create_headless_app(42);
    app.insert_resource(PathfinderService(Box::new(DoglegPath)));
    spawn_test_player(app.world_mut(), Vec3::new(20.0, 0.0, 0.0), always_crit(), 100);
    let enemy = spawn_test_enemy(app.world_mut(), Vec3::ZERO, harmless(), 30, Facing::West);

    run_fixed_steps(&mut app, 5);

    // Первый waypoint на +z: движение перпендикулярно прямой на цель
    let body = app.world().get::<PhysicsBody>(enemy).unwrap();
    assert!(body.velocity.z > 0.0, "must head to the first waypoint");
    assert!(body.velocity.x.abs() < 1e-4);
}

/// NPC в зоне досягаемости атакует вместо движения.
#[test]
fn test_attack_preempts_movement() {
    let mut app = create_headless_app(42);
    spawn_test_player(app.world_mut(), Vec3::ZERO, harmless(), 100);
    let enemy = spawn_test_enemy(
        app.world_mut(),
        Vec3::new(1.5, 0.0, 0.0),
        harmless(),
        30,
        Facing::West,
    );

    run_fixed_steps(&mut app, 5);

    let world = app.world();
    assert!(
        world.get::<AttackSession>(enemy).is_some(),
        "enemy in reach must open an attack session"
    );
    assert!(!world.get::<PhysicsBody>(enemy).unwrap().is_moving());
    assert_eq!(world.get::<Transform>(enemy).unwrap().translation.x, 1.5);
}

// --- Death ---

/// Смерть NPC: grace period, затем loot + XP + despawn.
#[test]
fn test_enemy_death_drops_loot_and_xp() {
    let mut app = create_headless_app(42);
    let player = spawn_test_player(app.world_mut(), Vec3::ZERO, always_crit(), 100);
    let enemy = spawn_test_enemy(
        app.world_mut(),
        Vec3::new(1.5, 0.0, 0.0),
        harmless(),
        1, // один удар
        Facing::West,
    );
    app.world_mut().get_mut::<Capabilities>(enemy).unwrap().can_move = false;

    app.world_mut().send_event(AttackIntent { attacker: player });

    // Windup 0.25s = 15 тиков, затем попадание и смерть
    run_fixed_steps(&mut app, 20);
    assert!(
        app.world().get::<DeathTimer>(enemy).is_some(),
        "dead enemy must enter the despawn grace period"
    );
    assert!(app.world().get::<PerceptionState>(enemy).is_none());

    // Grace 0.8s = 48 тиков
    run_fixed_steps(&mut app, 60);
    assert!(app.world().get_entity(enemy).is_err(), "enemy must despawn");

    let drops: Vec<_> = {
        let events = app.world().resource::<Events<ItemsDropped>>();
        events.get_cursor().read(events).cloned().collect()
    };
    assert_eq!(drops.len(), 1);
    assert_eq!(drops[0].items, vec!["pelt".to_string()]);

    let xp: Vec<_> = {
        let events = app.world().resource::<Events<ExperienceAwarded>>();
        events.get_cursor().read(events).cloned().collect()
    };
    assert_eq!(xp.len(), 1);
    assert_eq!(xp[0].player, player);
    assert_eq!(xp[0].amount, 25);
}

/// Поражение игрока: все способности вниз, PlayerDefeated наружу,
/// entity НЕ despawn'ится (сценой владеет внешний collaborator).
#[test]
fn test_player_defeat() {
    let mut app = create_headless_app(42);
    let player = spawn_test_player(app.world_mut(), Vec3::ZERO, harmless(), 1);
    spawn_test_enemy(
        app.world_mut(),
        Vec3::new(1.5, 0.0, 0.0),
        always_crit(),
        30,
        Facing::West,
    );

    // Perception скан + pursuit attack + windup: секунды хватает
    run_fixed_steps(&mut app, 60);

    let world = app.world();
    assert!(world.get_entity(player).is_ok(), "player is never despawned");
    assert!(!world.get::<Health>(player).unwrap().is_alive());

    let caps = world.get::<Capabilities>(player).unwrap();
    assert!(
        !caps.can_attack && !caps.can_move && !caps.can_block && !caps.can_take_damage,
        "defeat must disable all capabilities"
    );

    let defeated = combat_events(world)
        .iter()
        .filter(|e| matches!(e, CombatEvent::PlayerDefeated { player: p } if *p == player))
        .count();
    assert_eq!(defeated, 1);
}

/// Смерть атакующего посреди его сессии освобождает struck цели:
/// выживший не должен навсегда остаться с can_take_damage == false.
#[test]
fn test_attacker_death_releases_struck_targets() {
    let mut app = create_headless_app(42);
    let player = spawn_test_player(app.world_mut(), Vec3::ZERO, always_crit(), 100);
    let enemy = spawn_test_enemy(
        app.world_mut(),
        Vec3::new(1.5, 0.0, 0.0),
        always_crit(),
        1, // умрёт от одного удара в ответ
        Facing::West,
    );

    // NPC бьёт первым: игрок попадает в struck set его сессии
    run_fixed_steps(&mut app, 30);
    let caps = app.world().get::<Capabilities>(player).unwrap();
    assert!(
        !caps.can_take_damage,
        "struck player is shielded while the enemy session runs"
    );
    assert_eq!(app.world().get::<Health>(player).unwrap().current, 85);

    // Игрок убивает атакующего, пока его сессия ещё активна
    app.world_mut().send_event(AttackIntent { attacker: player });
    run_fixed_steps(&mut app, 170);

    assert!(app.world().get_entity(enemy).is_err(), "enemy must despawn");
    let caps = app.world().get::<Capabilities>(player).unwrap();
    assert!(
        caps.can_take_damage,
        "attacker death must release its struck targets"
    );
    assert_eq!(app.world().get::<Health>(player).unwrap().current, 85);
}

// --- Line of sight ---

struct SolidWall;

impl LineOfSight for SolidWall {
    fn is_visible(&self, _from: Vec3, _to: Vec3) -> bool {
        false
    }
}

/// Цель в радиусе, но LOS-сервис её не подтверждает — цели нет,
/// NPC стоит на месте.
#[test]
fn test_perception_blocked_by_line_of_sight() {
    let mut app = create_headless_app(42);
    app.insert_resource(LineOfSightService(Box::new(SolidWall)));
    spawn_test_player(app.world_mut(), Vec3::ZERO, always_crit(), 100);
    let enemy = spawn_test_enemy(
        app.world_mut(),
        Vec3::new(20.0, 0.0, 0.0), // в радиусе 75, но за «стеной»
        harmless(),
        30,
        Facing::West,
    );

    run_fixed_steps(&mut app, 120);

    let world = app.world();
    assert!(
        world.get::<PerceptionState>(enemy).unwrap().target.is_none(),
        "LOS-blocked target must stay undetected"
    );
    assert!(!world.get::<PhysicsBody>(enemy).unwrap().is_moving());
    assert_eq!(world.get::<Transform>(enemy).unwrap().translation.x, 20.0);
}

// --- Hitbox lifecycle ---

fn hitbox_count(world: &mut World) -> usize {
    world.query::<&Hitbox>().iter(world).count()
}

/// Despawn атакующего посреди сессии: его session-bound hitbox становится
/// stale и убирается без единого удара.
#[test]
fn test_despawned_attacker_hitbox_goes_stale() {
    let mut app = create_headless_app(42);
    let player = spawn_test_player(app.world_mut(), Vec3::ZERO, always_crit(), 100);
    let enemy = spawn_test_enemy(
        app.world_mut(),
        Vec3::new(1.5, 0.0, 0.0),
        harmless(),
        30,
        Facing::West,
    );
    app.world_mut().get_mut::<Capabilities>(enemy).unwrap().can_move = false;

    app.world_mut().send_event(AttackIntent { attacker: player });
    run_fixed_steps(&mut app, 5); // ещё Windup: hitbox есть, ударов нет
    assert_eq!(hitbox_count(app.world_mut()), 1);

    app.world_mut().despawn(player);
    run_fixed_steps(&mut app, 2);
    assert_eq!(
        hitbox_count(app.world_mut()),
        0,
        "stale hitbox must despawn with its owner"
    );

    // И дальше по фазам несостоявшейся сессии ничего не прилетает
    run_fixed_steps(&mut app, 200);
    assert_eq!(app.world().get::<Health>(enemy).unwrap().current, 30);
}

/// Trailing окно enemy атаки: цель, вошедшая в зону сразу после
/// completion сессии, всё ещё получает удар.
#[test]
fn test_trailing_window_strikes_late_target() {
    let mut app = create_headless_app(42);
    let player = spawn_test_player(app.world_mut(), Vec3::new(3.0, 0.0, 0.0), harmless(), 100);
    // NPC без perception: сессией управляем вручную, позиция не меняется
    let enemy = app
        .world_mut()
        .spawn((
            Enemy {
                xp_reward: 0,
                loot: Vec::new(),
            },
            Health::new(30),
            always_crit(),
            Capabilities::default(),
            MovementSpeed { speed: 2.5 },
            Facing::East,
            PhysicsBody::default(),
            AttackReach::default(),
            Transform::from_xyz(0.0, 0.0, 0.0),
        ))
        .id();

    app.world_mut().send_event(AttackIntent { attacker: enemy });
    run_fixed_steps(&mut app, 20); // Active, но игрок вне зоны (дистанция 2.0 > 1.4)
    assert_eq!(app.world().get::<Health>(player).unwrap().current, 100);

    // Completion по анимации: сессия закрыта, trailing hitbox размещён
    app.world_mut().send_event(AnimationFinished {
        entity: enemy,
        kind: AnimationKind::Attack,
    });
    run_fixed_step(&mut app);
    assert!(app.world().get::<AttackSession>(enemy).is_none());
    assert_eq!(app.world().get::<Health>(player).unwrap().current, 100);

    // Игрок входит в зону уже ПОСЛЕ завершения сессии
    app.world_mut()
        .get_mut::<Transform>(player)
        .unwrap()
        .translation = Vec3::new(1.5, 0.0, 0.0);
    run_fixed_steps(&mut app, 3);
    assert_eq!(
        app.world().get::<Health>(player).unwrap().current,
        85,
        "trailing window must still land the hit"
    );

    // Окно истекло: hitbox убран, цель снова уязвима
    run_fixed_steps(&mut app, 30);
    assert_eq!(hitbox_count(app.world_mut()), 0);
    assert!(app.world().get::<Capabilities>(player).unwrap().can_take_damage);
}

// --- Determinism ---

/// Один seed ⇒ идентичные Health снепшоты между прогонами.
#[test]
fn test_determinism_two_runs() {
    fn run(seed: u64) -> Vec<u8> {
        let mut app = create_headless_app(seed);
        let player = spawn_test_player(
            app.world_mut(),
            Vec3::ZERO,
            CombatStats::default(),
            100,
        );
        spawn_test_enemy(
            app.world_mut(),
            Vec3::new(6.0, 0.0, 0.0),
            CombatStats::default(),
            40,
            Facing::West,
        );
        spawn_test_enemy(
            app.world_mut(),
            Vec3::new(-4.0, 0.0, 3.0),
            CombatStats::default(),
            40,
            Facing::East,
        );
        // Игрок дерётся в ответ: атака каждый раз как только доступна
        for _ in 0..6 {
            app.world_mut().send_event(AttackIntent { attacker: player });
            run_fixed_steps(&mut app, 50);
        }
        world_snapshot::<Health>(app.world_mut())
    }

    let first = run(42);
    let second = run(42);
    assert_eq!(first, second, "same seed must reproduce the same fight");
}

/// Сессия проходит фазы Windup → Active по таймеру.
#[test]
fn test_session_phase_progression() {
    let mut app = create_headless_app(42);
    let player = spawn_test_player(app.world_mut(), Vec3::ZERO, always_crit(), 100);

    app.world_mut().send_event(AttackIntent { attacker: player });
    run_fixed_step(&mut app);
    assert_eq!(
        app.world().get::<AttackSession>(player).unwrap().phase,
        SessionPhase::Windup
    );

    // 0.25s windup = 15 тиков
    run_fixed_steps(&mut app, 20);
    assert_eq!(
        app.world().get::<AttackSession>(player).unwrap().phase,
        SessionPhase::Active
    );
}
