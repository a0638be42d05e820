//! Modifiable actor stats.
//!
//! An [`EntityStat`] is a base value plus a stack of modifiers. Max health,
//! armor, move speed and gravity scale are all stats, so buffs and encounter
//! effects (a fuse carrier speeding up once it commits to an attack) never
//! overwrite the configured base.

use serde::{Deserialize, Serialize};

// ============================================================================
// Stat Modifiers
// ============================================================================

/// Source of a stat modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierSource {
    /// From equipment or upgrades.
    Equipment,
    /// From the current encounter (enrage, attack commit).
    Encounter,
    /// From a timed status effect.
    Status,
    /// From a passive ability.
    Passive,
}

/// How a modifier is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifierType {
    /// Added to the base value.
    Flat,
    /// Additive percentage (0.25 = +25%), summed before multiplying.
    Percent,
    /// Multiplies the result (1.5 = x1.5).
    Multiplier,
}

/// A stat modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    /// Identifier, assigned by the stat when added.
    pub id: u32,
    /// Source of the modifier.
    pub source: ModifierSource,
    /// Type of modification.
    pub modifier_type: ModifierType,
    /// Value of the modifier.
    pub value: f32,
    /// Optional remaining duration (None = permanent).
    pub duration: Option<f32>,
}

impl StatModifier {
    /// Create a flat modifier.
    #[must_use]
    pub fn flat(source: ModifierSource, value: f32) -> Self {
        Self::new(source, ModifierType::Flat, value)
    }

    /// Create an additive percentage modifier.
    #[must_use]
    pub fn percent(source: ModifierSource, value: f32) -> Self {
        Self::new(source, ModifierType::Percent, value)
    }

    /// Create a multiplicative modifier.
    #[must_use]
    pub fn multiplier(source: ModifierSource, value: f32) -> Self {
        Self::new(source, ModifierType::Multiplier, value)
    }

    fn new(source: ModifierSource, modifier_type: ModifierType, value: f32) -> Self {
        Self {
            id: 0,
            source,
            modifier_type,
            value,
            duration: None,
        }
    }

    /// Set duration.
    #[must_use]
    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Check if expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self.duration, Some(d) if d <= 0.0)
    }

    /// Update duration.
    pub fn tick(&mut self, dt: f32) {
        if let Some(ref mut dur) = self.duration {
            *dur -= dt;
        }
    }
}

// ============================================================================
// Entity Stat
// ============================================================================

/// A base value with modifiers applied on read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityStat {
    /// Configured base value.
    base_value: f32,
    /// Active modifiers.
    modifiers: Vec<StatModifier>,
    /// Modifier ID counter.
    next_id: u32,
}

impl EntityStat {
    /// Creates a stat with the given base value.
    #[must_use]
    pub fn new(base_value: f32) -> Self {
        Self {
            base_value,
            modifiers: Vec::new(),
            next_id: 1,
        }
    }

    /// Base value without modifiers.
    #[must_use]
    pub fn base_value(&self) -> f32 {
        self.base_value
    }

    /// Replace the base value. Modifiers are kept.
    pub fn set_base_value(&mut self, value: f32) {
        self.base_value = value;
    }

    /// Current value: `(base + flat) * (1 + percent) * multipliers`.
    #[must_use]
    pub fn value(&self) -> f32 {
        let mut flat = 0.0;
        let mut percent = 0.0;
        let mut multiplier = 1.0;
        for modifier in &self.modifiers {
            match modifier.modifier_type {
                ModifierType::Flat => flat += modifier.value,
                ModifierType::Percent => percent += modifier.value,
                ModifierType::Multiplier => multiplier *= modifier.value,
            }
        }
        (self.base_value + flat) * (1.0 + percent) * multiplier
    }

    /// Current value rounded to the nearest integer.
    #[must_use]
    pub fn rounded(&self) -> i32 {
        self.value().round() as i32
    }

    /// Add a modifier, returning its ID.
    pub fn add_modifier(&mut self, mut modifier: StatModifier) -> u32 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        modifier.id = id;
        self.modifiers.push(modifier);
        id
    }

    /// Remove a modifier by ID.
    pub fn remove_modifier(&mut self, id: u32) -> bool {
        let len = self.modifiers.len();
        self.modifiers.retain(|m| m.id != id);
        self.modifiers.len() != len
    }

    /// Remove every modifier from a source.
    pub fn remove_modifiers_from(&mut self, source: ModifierSource) {
        self.modifiers.retain(|m| m.source != source);
    }

    /// Check for a modifier from a source.
    #[must_use]
    pub fn has_modifier_from(&self, source: ModifierSource) -> bool {
        self.modifiers.iter().any(|m| m.source == source)
    }

    /// Active modifiers.
    #[must_use]
    pub fn modifiers(&self) -> &[StatModifier] {
        &self.modifiers
    }

    /// Update timed modifiers and drop expired ones.
    pub fn tick(&mut self, dt: f32) {
        for modifier in &mut self.modifiers {
            modifier.tick(dt);
        }
        self.modifiers.retain(|m| !m.is_expired());
    }
}
