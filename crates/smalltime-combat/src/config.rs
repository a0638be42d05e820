//! Combat configuration.
//!
//! Tunables for health, the player motor, the fuse carrier, the clock and the
//! event queue. Loaded from TOML; every section and field falls back to its
//! default when missing.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use smalltime_common::SmallTimeError;
use thiserror::Error;
use tracing::{info, warn};

use crate::curve::DamageCurve;
use crate::damage::DamageInfo;

/// Errors from reading or writing a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("config I/O error: {0}")]
    Io(#[from] io::Error),
    /// File is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Config could not be encoded
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl From<ConfigError> for SmallTimeError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other.to_string()),
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Health, immunity and collision damage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Starting and max health
    pub max_health: i32,
    /// Immunity window opened by a hit (seconds)
    pub immunity_frame_length: f32,
    /// Blink phase length of the immunity window (seconds)
    pub blink_interval: f32,
    /// Relative speed above which a ground/hazard collision hurts
    pub collision_damage_threshold: f32,
    /// Fraction of max health lost on a hard collision
    pub collision_damage_fraction: f32,
    /// Armor penetration of collision damage
    pub collision_armor_penetration: i32,
    /// Show the hit tint
    pub flash_on_hit: bool,
    /// Fixed steps the hit tint lasts
    pub hit_flash_steps: u8,
    /// Flat armor
    pub armor: i32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_health: 100,
            immunity_frame_length: 0.05,
            blink_interval: 0.1,
            collision_damage_threshold: 1.0,
            collision_damage_fraction: 0.2,
            collision_armor_penetration: 5,
            flash_on_hit: true,
            hit_flash_steps: 3,
            armor: 0,
        }
    }
}

/// Player motor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Max health of the player
    pub max_health: i32,
    /// Horizontal acceleration from input
    pub move_speed: f32,
    /// Input scale while airborne
    pub air_control: f32,
    /// Upward jump impulse
    pub jump_force: f32,
    /// Dash impulse along the input direction
    pub dash_force: f32,
    /// Jump charges, refilled on landing
    pub jumps: u32,
    /// Dash charges
    pub dashes: u32,
    /// Seconds per regenerated dash charge
    pub dash_cooldown: f32,
    /// Dash length (seconds)
    pub dash_time: f32,
    /// Window after a dash ends in which a new dash restarts the old one
    pub redash_grace: f32,
    /// Gravity affector length after a jump (seconds)
    pub jump_float_time: f32,
    /// Gravity scale at the start of the float
    pub reduced_gravity: f32,
    /// Normal gravity scale
    pub gravity: f32,
    /// Collision immunity granted by a jump (seconds)
    pub jump_collision_immunity: f32,
    /// Fall distance above which landing hurts
    pub fall_damage_threshold: f32,
    /// Height of the feet sensor
    pub ground_sensor_height: f32,
    /// Feet sensor width as a fraction of body width
    pub ground_sensor_width: f32,
    /// Vertical speed below which ground contact counts as a landing
    pub landing_speed: f32,
    /// Lifetime of a dash afterimage (seconds)
    pub afterimage_lifetime: f32,
    /// Percent of max health lost by fall distance
    pub fall_damage_curve: DamageCurve,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: 100,
            move_speed: 40.0,
            air_control: 0.75,
            jump_force: 12.0,
            dash_force: 18.0,
            jumps: 2,
            dashes: 1,
            dash_cooldown: 2.0,
            dash_time: 0.2,
            redash_grace: 0.1,
            jump_float_time: 0.5,
            reduced_gravity: 0.0,
            gravity: 1.0,
            jump_collision_immunity: 0.1,
            fall_damage_threshold: 4.0,
            ground_sensor_height: 0.2,
            ground_sensor_width: 0.95,
            landing_speed: 1.0,
            afterimage_lifetime: 5.0 / 60.0,
            fall_damage_curve: DamageCurve::default(),
        }
    }
}

/// Fuse-carrying enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BomberConfig {
    /// Max health of the carrier
    pub max_health: i32,
    /// Horizontal acceleration while chasing
    pub move_speed: f32,
    /// Horizontal speed cap while chasing
    pub max_speed: f32,
    /// Upward impulse used to hop over walls
    pub jump_force: f32,
    /// Distance ahead of the body sensed for walls
    pub wall_sensor_distance: f32,
    /// Distance at which a target is noticed
    pub aggro_range: f32,
    /// Distance at which the fuse is lit
    pub attack_range: f32,
    /// Fuse length (seconds)
    pub fuse_time: f32,
    /// Move speed multiplier once the fuse is lit
    pub enrage_multiplier: f32,
    /// Coins dropped on self-destruct
    pub coin_reward: u32,
    /// Upward impulse given to a dropped payload
    pub drop_impulse: f32,
    /// Body color with a fresh fuse (RGBA)
    pub normal_color: [f32; 4],
    /// Body color about to explode (RGBA)
    pub near_explosion_color: [f32; 4],
    /// Damage the dropped payload deals
    pub payload: DamageInfo,
}

impl Default for BomberConfig {
    fn default() -> Self {
        Self {
            max_health: 30,
            move_speed: 10.0,
            max_speed: 4.0,
            jump_force: 8.0,
            wall_sensor_distance: 0.3,
            aggro_range: 12.0,
            attack_range: 1.5,
            fuse_time: 3.0,
            enrage_multiplier: 1.5,
            coin_reward: 3,
            drop_impulse: 10.0,
            normal_color: [1.0, 1.0, 1.0, 1.0],
            near_explosion_color: [1.0, 0.2, 0.1, 1.0],
            payload: DamageInfo::new(25),
        }
    }
}

/// Fixed-step clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Fixed step length (seconds)
    pub fixed_dt: f32,
    /// Fixed steps allowed per frame before the accumulator is dropped
    pub max_steps_per_frame: u32,
    /// Longest frame delta accepted (seconds)
    pub max_frame_dt: f32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_steps_per_frame: 10,
            max_frame_dt: 0.25,
        }
    }
}

/// Event queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Queue capacity; events beyond it are dropped with a warning
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

// ============================================================================
// Combat Config
// ============================================================================

/// Full configuration of the combat core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Seed of the crit RNG
    pub seed: u64,
    /// Health defaults
    pub health: HealthConfig,
    /// Player motor
    pub player: PlayerConfig,
    /// Fuse carrier
    pub bomber: BomberConfig,
    /// Clock
    pub clock: ClockConfig,
    /// Event queue
    pub events: EventsConfig,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            health: HealthConfig::default(),
            player: PlayerConfig::default(),
            bomber: BomberConfig::default(),
            clock: ClockConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl CombatConfig {
    /// Load configuration from a path.
    /// Returns defaults if the file is missing or invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(mut config) => {
                info!("Loaded config from {}", path.display());
                config.validate();
                config
            },
            Err(e) => {
                warn!("{e}, using defaults");
                Self::default()
            },
        }
    }

    /// Load configuration from a path, reporting any failure.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to a path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp values to sensible ranges.
    pub fn validate(&mut self) {
        // Health
        let health = &mut self.health;
        health.max_health = health.max_health.max(1);
        health.immunity_frame_length = health.immunity_frame_length.max(0.0);
        health.blink_interval = health.blink_interval.clamp(0.01, 1.0);
        health.collision_damage_threshold = health.collision_damage_threshold.max(0.0);
        health.collision_damage_fraction = health.collision_damage_fraction.clamp(0.0, 1.0);
        health.armor = health.armor.max(0);

        // Player
        let player = &mut self.player;
        player.max_health = player.max_health.max(1);
        player.air_control = player.air_control.clamp(0.0, 1.0);
        player.dash_cooldown = player.dash_cooldown.max(0.0);
        player.dash_time = player.dash_time.max(0.0);
        player.redash_grace = player.redash_grace.max(0.0);
        player.jump_float_time = player.jump_float_time.max(0.0);
        player.fall_damage_threshold = player.fall_damage_threshold.max(0.0);
        player.ground_sensor_width = player.ground_sensor_width.clamp(0.1, 1.0);
        player.ground_sensor_height = player.ground_sensor_height.max(0.01);

        // Bomber
        let bomber = &mut self.bomber;
        bomber.max_health = bomber.max_health.max(1);
        bomber.fuse_time = bomber.fuse_time.max(0.0);
        bomber.attack_range = bomber.attack_range.max(0.0);
        bomber.aggro_range = bomber.aggro_range.max(bomber.attack_range);
        bomber.enrage_multiplier = bomber.enrage_multiplier.max(0.0);

        // Clock
        let clock = &mut self.clock;
        clock.fixed_dt = clock.fixed_dt.clamp(1.0 / 480.0, 0.1);
        clock.max_steps_per_frame = clock.max_steps_per_frame.clamp(1, 64);
        clock.max_frame_dt = clock.max_frame_dt.max(clock.fixed_dt);

        // Events
        self.events.capacity = self.events.capacity.clamp(16, 1 << 16);
    }

    /// Health settings for a player.
    #[must_use]
    pub fn player_health(&self) -> HealthConfig {
        HealthConfig {
            max_health: self.player.max_health,
            ..self.health.clone()
        }
    }

    /// Health settings for a fuse carrier.
    #[must_use]
    pub fn bomber_health(&self) -> HealthConfig {
        HealthConfig {
            max_health: self.bomber.max_health,
            ..self.health.clone()
        }
    }
}
