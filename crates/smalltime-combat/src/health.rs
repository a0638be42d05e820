//! Per-actor health, immunity windows and death detection.
//!
//! [`ActorHealthState`] owns the [`HealthLedger`], the [`ImmunityState`] and
//! the hit flash. It is ticked by the simulation before any behavior runs.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use smalltime_common::ActorId;
use tracing::{debug, trace};

use crate::config::HealthConfig;
use crate::damage::{self, DamageInfo, DamageReport, DefenseProfile};
use crate::events::{CombatEvent, EventBus};
use crate::physics::{PhysicsBody, SurfaceKind};
use crate::rng::RandomSource;
use crate::stats::EntityStat;
use crate::timer::TimedTimer;

// ============================================================================
// Health Ledger
// ============================================================================

/// Health bookkeeping. `dead` never reverts once set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthLedger {
    health: i32,
    max_health: EntityStat,
    dead: bool,
}

impl HealthLedger {
    /// Create a ledger. A non-positive starting health is born dead.
    #[must_use]
    pub fn new(health: i32, max_health: i32) -> Self {
        let mut ledger = Self {
            health: 0,
            max_health: EntityStat::new(max_health as f32),
            dead: false,
        };
        ledger.set(health, max_health);
        ledger
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> i32 {
        self.health
    }

    /// Max health (rounded stat value).
    #[must_use]
    pub fn max_health(&self) -> i32 {
        self.max_health.rounded()
    }

    /// Max health stat, for modifiers.
    pub fn max_health_stat_mut(&mut self) -> &mut EntityStat {
        &mut self.max_health
    }

    /// Whether the ledger is dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Health as a fraction of max (0.0 to 1.0).
    #[must_use]
    pub fn health_percent(&self) -> f32 {
        let max = self.max_health();
        if max <= 0 {
            0.0
        } else {
            (self.health as f32 / max as f32).clamp(0.0, 1.0)
        }
    }

    /// Initialization write. Returns `true` if this marked the ledger dead.
    pub fn set(&mut self, health: i32, max_health: i32) -> bool {
        self.max_health.set_base_value(max_health as f32);
        self.health = health.clamp(0, self.max_health().max(0));
        if health <= 0 && !self.dead {
            self.dead = true;
            return true;
        }
        false
    }

    /// Subtract damage, flooring at zero.
    pub(crate) fn lose_health(&mut self, amount: i32) {
        self.health = self.health.saturating_sub(amount.max(0)).clamp(0, self.max_health().max(0));
    }

    /// Advance timed max-health modifiers, pulling health down to a lowered max.
    pub(crate) fn tick(&mut self, dt: f32) {
        self.max_health.tick(dt);
        self.health = self.health.min(self.max_health().max(0));
    }

    /// Perform the dead transition. Returns `false` if already dead.
    pub(crate) fn mark_dead(&mut self) -> bool {
        debug_assert!(!self.dead, "ledger killed twice");
        if self.dead {
            return false;
        }
        self.dead = true;
        true
    }

    /// Force death without the damage pipeline.
    pub(crate) fn force_dead(&mut self) -> bool {
        self.health = 0;
        if self.dead {
            return false;
        }
        self.dead = true;
        true
    }
}

// ============================================================================
// Immunity
// ============================================================================

/// Damage immunity window with a blink phase.
///
/// The body alternates translucent/opaque every `interval`. Each phase spends
/// `interval` from the budget and the window closes once the budget drops
/// below zero, so a window of `t` lasts `(floor(t / interval) + 1) * interval`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImmunityWindow {
    phase: TimedTimer,
    budget: f32,
    interval: f32,
    translucent: bool,
}

impl ImmunityWindow {
    /// Whether the window is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase.is_running()
    }

    /// Open the window unless one is already open.
    pub fn start(&mut self, duration: f32, interval: f32) -> bool {
        if self.is_active() {
            return false;
        }
        self.interval = interval.max(f32::EPSILON);
        self.budget = duration;
        self.translucent = true;
        self.phase.start(self.interval);
        true
    }

    /// Advance the blink phase. Returns `true` when the window closes.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.phase.tick(dt) {
            return false;
        }
        self.translucent = !self.translucent;
        self.budget -= self.interval;
        if self.budget < 0.0 {
            self.translucent = false;
            return true;
        }
        self.phase.start(self.interval);
        false
    }

    /// Close the window immediately.
    pub fn cancel(&mut self) {
        self.phase.cancel();
        self.translucent = false;
    }

    /// Seconds until the window closes.
    #[must_use]
    pub fn time_left(&self) -> f32 {
        if !self.is_active() {
            return 0.0;
        }
        let after_phase = self.budget - self.interval;
        let extra_phases = if after_phase < 0.0 {
            0.0
        } else {
            (after_phase / self.interval).floor() + 1.0
        };
        self.phase.remaining() + extra_phases * self.interval
    }

    /// Alpha the renderer should apply to the body.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        if self.is_active() && self.translucent {
            0.5
        } else {
            1.0
        }
    }
}

/// Damage and collision immunity of one actor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImmunityState {
    window: ImmunityWindow,
    collision_immune_for: f32,
    collision_immune: bool,
}

impl ImmunityState {
    /// No immunity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether damage is blocked.
    #[must_use]
    pub fn is_damage_immune(&self) -> bool {
        self.window.is_active()
    }

    /// Whether collision damage is suppressed.
    #[must_use]
    pub fn is_collision_immune(&self) -> bool {
        self.collision_immune_for > 0.0 || self.collision_immune || self.is_damage_immune()
    }

    /// Open the damage immunity window (de-bounced).
    pub fn start_window(&mut self, duration: f32, blink_interval: f32) -> bool {
        self.window.start(duration, blink_interval)
    }

    /// Seconds until damage immunity ends.
    #[must_use]
    pub fn window_time_left(&self) -> f32 {
        self.window.time_left()
    }

    /// Alpha for the immunity blink.
    #[must_use]
    pub fn body_alpha(&self) -> f32 {
        self.window.alpha()
    }

    /// Grant collision immunity; never shortens an existing grant.
    pub fn add_collision_immunity(&mut self, duration: f32) {
        if self.collision_immune_for <= 0.0 || self.collision_immune_for < duration {
            self.collision_immune_for = duration;
        }
    }

    /// Seconds of collision immunity left.
    #[must_use]
    pub fn collision_immunity_left(&self) -> f32 {
        self.collision_immune_for
    }

    /// Explicit, untimed collision immunity.
    pub fn set_collision_immune(&mut self, immune: bool) {
        self.collision_immune = immune;
    }

    /// Decay collision immunity and advance the blink window.
    pub fn tick(&mut self, dt: f32) {
        if self.collision_immune_for > 0.0 {
            self.collision_immune_for = (self.collision_immune_for - dt).max(0.0);
        }
        if self.window.tick(dt) {
            trace!("immunity window closed");
        }
    }

    /// Close every timed immunity.
    pub fn clear(&mut self) {
        self.window.cancel();
        self.collision_immune_for = 0.0;
    }
}

// ============================================================================
// Hit Flash
// ============================================================================

/// Tint shown for a few fixed steps after a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HitFlash {
    steps_left: u8,
}

impl HitFlash {
    /// Start (or restart) the flash.
    pub fn trigger(&mut self, steps: u8) {
        self.steps_left = steps;
    }

    /// Advance one fixed step.
    pub fn tick(&mut self) {
        self.steps_left = self.steps_left.saturating_sub(1);
    }

    /// Whether the hit tint is showing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.steps_left > 0
    }
}

// ============================================================================
// Actor Health State
// ============================================================================

/// Health, immunity and hit feedback of one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorHealthState {
    actor: ActorId,
    ledger: HealthLedger,
    immunity: ImmunityState,
    flash: HitFlash,
    armor: EntityStat,
    config: HealthConfig,
    torn_down: bool,
}

impl ActorHealthState {
    /// Create a health state at full health.
    #[must_use]
    pub fn new(actor: ActorId, config: &HealthConfig) -> Self {
        Self {
            actor,
            ledger: HealthLedger::new(config.max_health, config.max_health),
            immunity: ImmunityState::new(),
            flash: HitFlash::default(),
            armor: EntityStat::new(config.armor as f32),
            config: config.clone(),
            torn_down: false,
        }
    }

    /// Owning actor.
    #[must_use]
    pub fn actor(&self) -> ActorId {
        self.actor
    }

    /// Health ledger.
    #[must_use]
    pub fn ledger(&self) -> &HealthLedger {
        &self.ledger
    }

    /// Mutable ledger, for stat modifiers on max health.
    pub fn ledger_mut(&mut self) -> &mut HealthLedger {
        &mut self.ledger
    }

    /// Immunity state.
    #[must_use]
    pub fn immunity(&self) -> &ImmunityState {
        &self.immunity
    }

    /// Armor stat.
    pub fn armor_mut(&mut self) -> &mut EntityStat {
        &mut self.armor
    }

    /// Settings this state was created with.
    #[must_use]
    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> i32 {
        self.ledger.health()
    }

    /// Max health.
    #[must_use]
    pub fn max_health(&self) -> i32 {
        self.ledger.max_health()
    }

    /// Whether the actor is dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.ledger.is_dead()
    }

    /// Whether damage is currently blocked.
    #[must_use]
    pub fn is_damage_immune(&self) -> bool {
        self.immunity.is_damage_immune()
    }

    /// Whether collision damage is currently suppressed.
    #[must_use]
    pub fn is_collision_immune(&self) -> bool {
        self.immunity.is_collision_immune()
    }

    /// Whether the hit tint is showing.
    #[must_use]
    pub fn is_flashing(&self) -> bool {
        self.flash.is_active()
    }

    /// Alpha for the immunity blink.
    #[must_use]
    pub fn body_alpha(&self) -> f32 {
        self.immunity.body_alpha()
    }

    /// Whether `teardown` ran.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn defense(&self) -> DefenseProfile {
        DefenseProfile {
            armor: self.armor.rounded(),
            immunity_frame: self.config.immunity_frame_length,
            blink_interval: self.config.blink_interval,
        }
    }

    /// Run a hit through the damage pipeline and publish the notifications.
    pub fn take_damage(
        &mut self,
        info: &DamageInfo,
        rng: &mut dyn RandomSource,
        events: &EventBus,
    ) -> DamageReport {
        if self.torn_down {
            return DamageReport::none();
        }

        let defense = self.defense();
        let resolution = damage::resolve(&mut self.ledger, &mut self.immunity, info, &defense, rng);
        if !resolution.applied {
            return resolution.report;
        }

        if self.config.flash_on_hit {
            self.flash.trigger(self.config.hit_flash_steps);
        }

        let report = resolution.report;
        trace!(
            actor = %self.actor,
            damage = report.damage_taken,
            crit = report.is_crit,
            health = self.ledger.health(),
            "damage applied"
        );
        events.publish(CombatEvent::DamageTaken {
            actor: self.actor,
            info: *info,
            report,
        });
        events.publish(CombatEvent::HealthChanged {
            actor: self.actor,
            health: self.ledger.health(),
            max_health: self.ledger.max_health(),
        });
        if resolution.newly_dead {
            debug!(actor = %self.actor, "actor killed");
            events.publish(CombatEvent::Death {
                actor: self.actor,
                report,
            });
        }

        report
    }

    /// Apply an instantaneous impulse to the actor's body.
    pub fn knock_back(&self, body: &mut dyn PhysicsBody, impulse: Vec2) {
        body.apply_impulse(impulse);
    }

    /// Die without a kill: no immunity check, no death notification.
    ///
    /// Returns `false` if the actor was already dead.
    pub fn die_silently(&mut self) -> bool {
        let died = self.ledger.force_dead();
        if died {
            debug!(actor = %self.actor, "actor expired silently");
        }
        died
    }

    /// Initialization write of health and max health.
    ///
    /// A non-positive `current` marks the actor dead immediately.
    pub fn set_health(&mut self, current: i32, max: i32) -> bool {
        self.ledger.set(current, max)
    }

    /// Open a damage immunity window (de-bounced).
    pub fn start_immunity(&mut self, duration: f32) -> bool {
        self.immunity.start_window(duration, self.config.blink_interval)
    }

    /// Grant collision immunity; never shortens an existing grant.
    pub fn add_collision_immunity(&mut self, duration: f32) {
        self.immunity.add_collision_immunity(duration);
    }

    /// Explicit, untimed collision immunity.
    pub fn set_collision_immune(&mut self, immune: bool) {
        self.immunity.set_collision_immune(immune);
    }

    /// Collision reported by the physics collaborator.
    ///
    /// A hard landing on ground or a hazard costs a fixed fraction of max
    /// health unless the actor is collision-immune.
    pub fn on_collision(
        &mut self,
        relative_speed: f32,
        surface: SurfaceKind,
        rng: &mut dyn RandomSource,
        events: &EventBus,
    ) -> Option<DamageReport> {
        if !surface.deals_impact_damage()
            || self.is_collision_immune()
            || relative_speed <= self.config.collision_damage_threshold
        {
            return None;
        }

        let damage = (self.max_health() as f32 * self.config.collision_damage_fraction).round() as i32;
        let info = DamageInfo::new(damage).with_armor_penetration(self.config.collision_armor_penetration);
        Some(self.take_damage(&info, rng, events))
    }

    /// Advance immunity windows, hit flash and timed stat modifiers.
    pub fn tick(&mut self, dt: f32) {
        debug_assert!(!self.torn_down, "ticked a torn-down health state");
        if self.torn_down {
            return;
        }
        self.immunity.tick(dt);
        self.flash.tick();
        self.armor.tick(dt);
        self.ledger.tick(dt);
    }

    /// Stop every timer. The state must not be ticked afterwards.
    pub fn teardown(&mut self) {
        self.immunity.clear();
        self.flash = HitFlash::default();
        self.torn_down = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::KinematicBody;
    use crate::rng::FixedRolls;
    use crate::stats::{ModifierSource, StatModifier};

    fn state() -> ActorHealthState {
        ActorHealthState::new(ActorId::new(), &HealthConfig::default())
    }

    fn no_crit() -> FixedRolls {
        FixedRolls::constant(99)
    }

    #[test]
    fn test_starts_at_full_health() {
        let hs = state();
        assert_eq!(hs.health(), 100);
        assert_eq!(hs.max_health(), 100);
        assert!(!hs.is_dead());
    }

    #[test]
    fn test_take_damage_publishes_events() {
        let mut hs = state();
        let bus = EventBus::default();
        let report = hs.take_damage(&DamageInfo::new(30), &mut no_crit(), &bus);

        assert_eq!(report.damage_taken, 30);
        assert_eq!(hs.health(), 70);
        assert!(hs.is_flashing());

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], CombatEvent::DamageTaken { .. }));
        assert!(matches!(events[1], CombatEvent::HealthChanged { health: 70, .. }));
    }

    #[test]
    fn test_death_fires_once() {
        let mut hs = state();
        let bus = EventBus::default();
        hs.take_damage(&DamageInfo::new(150), &mut no_crit(), &bus);
        for _ in 0..20 {
            hs.tick(0.05);
            hs.take_damage(&DamageInfo::new(150), &mut no_crit(), &bus);
        }

        let deaths = bus
            .drain()
            .into_iter()
            .filter(|e| matches!(e, CombatEvent::Death { .. }))
            .count();
        assert_eq!(deaths, 1);
        assert_eq!(hs.health(), 0);
    }

    #[test]
    fn test_immune_hit_is_noop() {
        let mut hs = state();
        let bus = EventBus::default();
        assert!(hs.start_immunity(1.0));
        let left = hs.immunity().window_time_left();

        let report = hs.take_damage(&DamageInfo::new(40), &mut no_crit(), &bus);
        assert_eq!(report, DamageReport::none());
        assert_eq!(hs.health(), 100);
        assert!(!hs.is_flashing());
        assert!(bus.drain().is_empty());
        assert_eq!(hs.immunity().window_time_left(), left);
    }

    #[test]
    fn test_immunity_debounce_keeps_first_window() {
        let mut hs = state();
        assert!(hs.start_immunity(0.5));
        hs.tick(0.05);
        let left = hs.immunity().window_time_left();

        assert!(!hs.start_immunity(0.5));
        assert!(!hs.start_immunity(5.0));
        assert_eq!(hs.immunity().window_time_left(), left);
    }

    #[test]
    fn test_immunity_window_rounds_to_blink_phases() {
        let mut hs = state();
        // Default frame 0.05 with 0.1 phases: one phase.
        let bus = EventBus::default();
        hs.take_damage(&DamageInfo::new(1), &mut no_crit(), &bus);
        assert!((hs.immunity().window_time_left() - 0.1).abs() < 1e-6);
        assert_eq!(hs.body_alpha(), 0.5);

        hs.tick(0.05);
        assert!(hs.is_damage_immune());
        hs.tick(0.05);
        assert!(!hs.is_damage_immune());
        assert_eq!(hs.body_alpha(), 1.0);
    }

    #[test]
    fn test_blink_alternates() {
        let mut hs = state();
        hs.start_immunity(0.3);
        assert_eq!(hs.body_alpha(), 0.5);
        hs.tick(0.1);
        assert_eq!(hs.body_alpha(), 1.0);
        hs.tick(0.1);
        assert_eq!(hs.body_alpha(), 0.5);
        assert!(hs.is_damage_immune());
    }

    #[test]
    fn test_hit_flash_lasts_configured_steps() {
        let mut hs = state();
        let bus = EventBus::default();
        hs.take_damage(&DamageInfo::new(5), &mut no_crit(), &bus);
        hs.tick(0.0);
        hs.tick(0.0);
        assert!(hs.is_flashing());
        hs.tick(0.0);
        assert!(!hs.is_flashing());
    }

    #[test]
    fn test_collision_immunity_is_monotone() {
        let mut hs = state();
        hs.add_collision_immunity(0.5);
        hs.add_collision_immunity(0.2);
        assert_eq!(hs.immunity().collision_immunity_left(), 0.5);

        hs.add_collision_immunity(1.0);
        assert_eq!(hs.immunity().collision_immunity_left(), 1.0);
    }

    #[test]
    fn test_collision_immunity_decays_to_zero() {
        let mut hs = state();
        hs.add_collision_immunity(0.25);
        hs.tick(0.125);
        assert!(hs.is_collision_immune());
        hs.tick(0.125);
        assert!(!hs.is_collision_immune());
        hs.tick(0.125);
        assert_eq!(hs.immunity().collision_immunity_left(), 0.0);
    }

    #[test]
    fn test_hard_landing_costs_a_fifth() {
        let mut hs = state();
        let bus = EventBus::default();
        let report = hs.on_collision(3.0, SurfaceKind::Ground, &mut no_crit(), &bus);
        assert_eq!(report.map(|r| r.damage_taken), Some(20));
        assert_eq!(hs.health(), 80);
    }

    #[test]
    fn test_soft_or_immune_collision_is_ignored() {
        let mut hs = state();
        let bus = EventBus::default();
        assert!(hs.on_collision(0.5, SurfaceKind::Ground, &mut no_crit(), &bus).is_none());
        assert!(hs.on_collision(5.0, SurfaceKind::Actor, &mut no_crit(), &bus).is_none());

        hs.add_collision_immunity(0.1);
        assert!(hs.on_collision(5.0, SurfaceKind::Hazard, &mut no_crit(), &bus).is_none());

        hs.set_collision_immune(false);
        hs.tick(0.1);
        hs.set_collision_immune(true);
        assert!(hs.on_collision(5.0, SurfaceKind::Hazard, &mut no_crit(), &bus).is_none());
        assert_eq!(hs.health(), 100);
    }

    #[test]
    fn test_die_silently() {
        let mut hs = state();
        let bus = EventBus::default();
        hs.start_immunity(1.0);
        assert!(hs.die_silently());
        assert!(hs.is_dead());
        assert_eq!(hs.health(), 0);
        assert!(!hs.die_silently());
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_set_health_non_positive_kills() {
        let mut hs = state();
        assert!(!hs.set_health(50, 200));
        assert_eq!(hs.health(), 50);
        assert_eq!(hs.max_health(), 200);

        assert!(hs.set_health(0, 200));
        assert!(hs.is_dead());
        // Dead is monotonic.
        hs.set_health(100, 200);
        assert!(hs.is_dead());
    }

    #[test]
    fn test_knock_back_passes_impulse() {
        let hs = state();
        let mut body = KinematicBody::new(Vec2::ZERO, Vec2::ONE);
        hs.knock_back(&mut body, Vec2::new(3.0, 4.0));
        assert_eq!(body.velocity(), Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_armor_blocks() {
        let mut hs = state();
        let bus = EventBus::default();
        hs.armor_mut().set_base_value(4.0);
        let report = hs.take_damage(&DamageInfo::new(10), &mut no_crit(), &bus);
        assert_eq!(report.damage_blocked, 4);
        assert_eq!(hs.health(), 94);
    }

    #[test]
    fn test_teardown_stops_timers() {
        let mut hs = state();
        let bus = EventBus::default();
        hs.add_collision_immunity(1.0);
        hs.start_immunity(1.0);
        hs.teardown();
        assert!(!hs.is_damage_immune());
        assert!(!hs.is_collision_immune());
        assert_eq!(hs.take_damage(&DamageInfo::new(10), &mut no_crit(), &bus), DamageReport::none());
    }

    #[test]
    fn test_extreme_hits_do_not_overflow() {
        let mut hs = state();
        let bus = EventBus::default();
        let report = hs.take_damage(&DamageInfo::new(i32::MIN), &mut no_crit(), &bus);
        assert_eq!(report, DamageReport::none());
        assert_eq!(hs.health(), 100);

        let crit = DamageInfo::new(10).with_crit(100, i32::MAX);
        let report = hs.take_damage(&crit, &mut FixedRolls::constant(0), &bus);
        assert!(report.is_kill);
        assert_eq!(hs.health(), 0);
    }

    #[test]
    fn test_expired_max_health_bonus_clamps_health() {
        let mut hs = state();
        hs.ledger_mut()
            .max_health_stat_mut()
            .add_modifier(StatModifier::flat(ModifierSource::Status, 50.0).with_duration(0.5));
        hs.set_health(150, 100);
        assert_eq!(hs.health(), 150);
        assert_eq!(hs.max_health(), 150);

        for _ in 0..4 {
            hs.tick(0.25);
        }
        assert_eq!(hs.max_health(), 100);
        assert_eq!(hs.health(), 100);
    }
}
