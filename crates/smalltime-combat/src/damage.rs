//! Damage resolution pipeline.
//!
//! This module provides:
//! - `DamageInfo` / `DamageReport` value types
//! - Critical hit roll and crit damage formula
//! - Armor vs. armor penetration
//! - `resolve`, which applies one hit to a health ledger

use serde::{Deserialize, Serialize};

use crate::health::{HealthLedger, ImmunityState};
use crate::rng::RandomSource;

/// Crit damage baseline in percent: with no bonus a crit deals 150%.
pub const CRIT_BASELINE_PERCENT: i32 = 150;

// ============================================================================
// Damage Values
// ============================================================================

/// Parameters of one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DamageInfo {
    /// Base damage.
    pub damage: i32,
    /// Armor ignored by this hit.
    pub armor_penetration: i32,
    /// Crit chance in percent (0-100).
    pub crit_chance: i32,
    /// Additive crit bonus in percentage points over the 150% baseline.
    pub crit_bonus: i32,
}

impl DamageInfo {
    /// Plain hit with no penetration and no crit chance.
    #[must_use]
    pub const fn new(damage: i32) -> Self {
        Self {
            damage,
            armor_penetration: 0,
            crit_chance: 0,
            crit_bonus: 0,
        }
    }

    /// Set armor penetration.
    #[must_use]
    pub const fn with_armor_penetration(mut self, armor_penetration: i32) -> Self {
        self.armor_penetration = armor_penetration;
        self
    }

    /// Set crit chance (clamped to 0-100) and bonus.
    #[must_use]
    pub fn with_crit(mut self, crit_chance: i32, crit_bonus: i32) -> Self {
        self.crit_chance = crit_chance.clamp(0, 100);
        self.crit_bonus = crit_bonus;
        self
    }
}

/// Outcome of one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DamageReport {
    /// Damage that went through to health.
    pub damage_taken: i32,
    /// Damage absorbed by armor.
    pub damage_blocked: i32,
    /// Whether this hit killed the target.
    pub is_kill: bool,
    /// Whether this hit was a critical.
    pub is_crit: bool,
}

impl DamageReport {
    /// Report of a hit that had no effect.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            damage_taken: 0,
            damage_blocked: 0,
            is_kill: false,
            is_crit: false,
        }
    }

    /// Whether the hit changed anything.
    #[must_use]
    pub const fn had_effect(&self) -> bool {
        self.damage_taken != 0 || self.damage_blocked != 0 || self.is_kill
    }
}

// ============================================================================
// Formulas
// ============================================================================

/// Roll a crit: a uniform draw in `[0, 100)` below the crit chance.
pub fn roll_crit(crit_chance: i32, rng: &mut dyn RandomSource) -> bool {
    rng.uniform(0, 100) < crit_chance
}

/// Crit damage: `round(damage * (bonus + 150) / 100)`, halves rounded away
/// from zero.
#[must_use]
pub fn crit_damage(damage: i32, crit_bonus: i32) -> i32 {
    let scaled = f64::from(damage) * (f64::from(crit_bonus) + f64::from(CRIT_BASELINE_PERCENT)) / 100.0;
    scaled.round() as i32
}

/// Split damage into (taken, blocked) against flat armor.
#[must_use]
pub fn apply_armor(damage: i32, armor: i32, armor_penetration: i32) -> (i32, i32) {
    if damage <= 0 {
        return (damage, 0);
    }
    let effective = armor.saturating_sub(armor_penetration).max(0);
    let blocked = effective.min(damage);
    (damage - blocked, blocked)
}

// ============================================================================
// Pipeline
// ============================================================================

/// Target-side parameters the pipeline needs besides the ledger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefenseProfile {
    /// Flat armor of the target.
    pub armor: i32,
    /// Length of the immunity window a hit starts.
    pub immunity_frame: f32,
    /// Blink phase length of the immunity window.
    pub blink_interval: f32,
}

/// Full result of [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolution {
    /// Report handed back to the caller.
    pub report: DamageReport,
    /// Whether the ledger changed (health or death).
    pub applied: bool,
    /// Whether this hit performed the dead transition.
    pub newly_dead: bool,
    /// Whether this hit opened a new immunity window.
    pub immunity_started: bool,
}

/// Apply one hit to a ledger.
///
/// Immune targets, non-positive hits and dead ledgers short-circuit to an empty
/// resolution without touching any state.
pub fn resolve(
    ledger: &mut HealthLedger,
    immunity: &mut ImmunityState,
    info: &DamageInfo,
    defense: &DefenseProfile,
    rng: &mut dyn RandomSource,
) -> Resolution {
    if immunity.is_damage_immune() || info.damage <= 0 || ledger.is_dead() {
        return Resolution::default();
    }

    let is_crit = roll_crit(info.crit_chance, rng);
    // A negative crit bonus can push the scaled hit below zero; never heal.
    let raw = if is_crit {
        crit_damage(info.damage, info.crit_bonus).max(0)
    } else {
        info.damage
    };
    let (taken, blocked) = apply_armor(raw, defense.armor, info.armor_penetration);

    ledger.lose_health(taken);
    let immunity_started = immunity.start_window(defense.immunity_frame, defense.blink_interval);

    let newly_dead = ledger.health() <= 0 && ledger.mark_dead();

    Resolution {
        report: DamageReport {
            damage_taken: taken,
            damage_blocked: blocked,
            is_kill: newly_dead,
            is_crit,
        },
        applied: true,
        newly_dead,
        immunity_started,
    }
}
