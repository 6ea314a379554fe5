//! Damage resolver: pure функции hit/critical/damage.
//!
//! Никаких side effects — caller применяет DamageOutcome к Health и
//! транслирует `feedback()` в presentation events.
//!
//! Формулы:
//! - base damage = attack - defense, ±10% uniform variation, floor
//! - hit: roll U(0,100); попадание если hit*100/flee >= roll;
//!   non-finite ratio (flee == 0) — гарантированное попадание (defined behavior)
//! - critical: независимый roll U(0,100); crit если critical >= roll;
//!   crit минует hit check и бьёт ceil(attack * CRITICAL_MULTIPLIER)

use rand::Rng;

use crate::components::CombatStats;

/// Разброс урона в процентах от base damage.
pub const DAMAGE_VARIATION: f32 = 10.0;

/// Множитель критического урона.
pub const CRITICAL_MULTIPLIER: f32 = 1.5;

/// Успешное некритическое попадание всегда снимает хотя бы столько.
pub const MIN_HIT_DAMAGE: u32 = 1;

/// Какой звук/лог-вариант показывать (единственное, что нужно caller'у
/// для side effects).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Hit,
    Critical,
    Miss,
}

/// Результат резолва одной атаки по одной цели.
#[derive(Debug, Clone, Copy)]
pub struct DamageOutcome {
    pub damage: u32,
    pub is_critical: bool,
    pub did_hit: bool,
}

impl DamageOutcome {
    pub fn feedback(&self) -> Feedback {
        if self.is_critical {
            Feedback::Critical
        } else if self.did_hit {
            Feedback::Hit
        } else {
            Feedback::Miss
        }
    }

    fn miss() -> Self {
        Self {
            damage: 0,
            is_critical: false,
            did_hit: false,
        }
    }
}

/// Резолвит атаку attacker → defender.
///
/// `defense_bonus` — временный бонус защиты цели (block).
/// Порядок бросков фиксирован (critical, затем hit, затем variation) —
/// важно для детерминизма при seeded RNG.
pub fn resolve(
    attacker: &CombatStats,
    defender: &CombatStats,
    defense_bonus: i32,
    rng: &mut impl Rng,
) -> DamageOutcome {
    // Critical минует hit check полностью
    if check_critical(attacker.critical, rng) {
        let damage = (attacker.attack as f32 * CRITICAL_MULTIPLIER).ceil().max(0.0) as u32;
        return DamageOutcome {
            damage,
            is_critical: true,
            did_hit: true,
        };
    }

    if !check_hit(attacker.hit, defender.flee, rng) {
        return DamageOutcome::miss();
    }

    let rolled = roll_damage(attacker.attack, defender.defense + defense_bonus, rng);
    DamageOutcome {
        damage: rolled.max(MIN_HIT_DAMAGE as i64) as u32,
        is_critical: false,
        did_hit: true,
    }
}

/// Hit check: hit*100/flee против roll U(0,100).
///
/// flee == 0 даёт non-finite ratio → автоматическое попадание.
/// Это defined behavior, не ошибка.
pub fn check_hit(hit: f32, flee: f32, rng: &mut impl Rng) -> bool {
    let ratio = hit * 100.0 / flee;
    if !ratio.is_finite() {
        return true;
    }
    let roll = rng.gen_range(0.0..100.0);
    ratio >= roll
}

/// Critical check: независимый roll U(0,100).
pub fn check_critical(critical: f32, rng: &mut impl Rng) -> bool {
    let roll = rng.gen_range(0.0..100.0);
    critical >= roll
}

/// Base damage ± variation, floored. Может уйти в ноль и ниже —
/// caller поднимает до MIN_HIT_DAMAGE на успешном попадании.
pub fn roll_damage(attack: i32, defense: i32, rng: &mut impl Rng) -> i64 {
    let base = (attack - defense) as f32;
    let variation = base * (DAMAGE_VARIATION / 100.0) * rng.gen::<f32>();
    let rolled = if rng.gen_bool(0.5) {
        base + variation
    } else {
        base - variation
    };
    rolled.floor() as i64
}
