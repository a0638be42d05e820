//! Player motor: movement, jumps, dashes and fall damage.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{feet_sensor, BehaviorContext};
use crate::charges::ChargePool;
use crate::config::PlayerConfig;
use crate::damage::{DamageInfo, DamageReport};
use crate::events::CombatEvent;
use crate::spawn::{spawn_or_warn, SpawnRequest};
use crate::stats::EntityStat;
use crate::timer::TimedTimer;

/// State of the player motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerState {
    /// Standing on ground
    #[default]
    Grounded,
    /// Falling or coasting
    Airborne,
    /// Gravity affector running after a jump
    Jumping,
    /// Dash in progress
    Dashing,
    /// Terminal
    Dead,
}

/// Player movement controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMotor {
    config: PlayerConfig,
    state: PlayerState,
    input: Vec2,
    last_input: Vec2,
    grounded: bool,
    last_surface: Vec2,
    jumps: ChargePool,
    dashes: ChargePool,
    gravity: EntityStat,
    move_speed: EntityStat,
    /// Lerps gravity back in after a jump
    gravity_affector: TimedTimer,
    dash: TimedTimer,
    /// Seconds since the last dash started
    since_dash: Option<f32>,
}

impl PlayerMotor {
    /// New motor for a player spawned at `spawn`.
    #[must_use]
    pub fn new(config: &PlayerConfig, spawn: Vec2) -> Self {
        Self {
            config: config.clone(),
            state: PlayerState::Airborne,
            input: Vec2::ZERO,
            last_input: Vec2::ZERO,
            grounded: false,
            last_surface: spawn,
            jumps: ChargePool::new(config.jumps),
            dashes: ChargePool::regenerating(config.dashes, config.dash_cooldown),
            gravity: EntityStat::new(config.gravity),
            move_speed: EntityStat::new(config.move_speed),
            gravity_affector: TimedTimer::new(),
            dash: TimedTimer::new(),
            since_dash: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Whether the feet sensor touched ground on the last poll.
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Jump charges left.
    #[must_use]
    pub fn jumps_left(&self) -> u32 {
        self.jumps.current()
    }

    /// Dash charges left.
    #[must_use]
    pub fn dashes_left(&self) -> u32 {
        self.dashes.current()
    }

    /// Dash charge pool.
    #[must_use]
    pub fn dash_pool(&self) -> &ChargePool {
        &self.dashes
    }

    /// Last horizontal input that moved the body.
    #[must_use]
    pub fn last_input(&self) -> Vec2 {
        self.last_input
    }

    /// Normal gravity scale.
    #[must_use]
    pub fn gravity(&self) -> f32 {
        self.gravity.value()
    }

    /// Gravity scale stat, for modifiers.
    pub fn gravity_stat_mut(&mut self) -> &mut EntityStat {
        &mut self.gravity
    }

    /// Move speed stat, for modifiers.
    pub fn move_speed_stat_mut(&mut self) -> &mut EntityStat {
        &mut self.move_speed
    }

    /// Set movement input. Vertical input is ignored.
    pub fn set_input(&mut self, input: Vec2) {
        self.input = Vec2::new(input.x, 0.0);
    }

    /// Jump if a charge is left.
    pub fn jump(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
        if self.state == PlayerState::Dead || ctx.health.is_dead() {
            return false;
        }
        if !self.jumps.consume() {
            trace!(actor = %ctx.actor(), "jump rejected, no charges");
            return false;
        }

        self.dash.cancel();
        let velocity = ctx.body.velocity();
        ctx.body.set_velocity(Vec2::new(velocity.x, 0.0));
        ctx.body.apply_impulse(Vec2::Y * self.config.jump_force);

        self.gravity_affector.start(self.config.jump_float_time);
        ctx.body.set_gravity_scale(self.config.reduced_gravity);
        ctx.health.add_collision_immunity(self.config.jump_collision_immunity);

        debug!(actor = %ctx.actor(), jumps_left = self.jumps.current(), "jump");
        ctx.events.publish(CombatEvent::Jumped {
            actor: ctx.actor(),
            jumps_left: self.jumps.current(),
        });
        self.refresh_state();
        true
    }

    /// Dash along the current input if a charge is left and no dash runs.
    pub fn dash(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
        if self.state == PlayerState::Dead || ctx.health.is_dead() {
            return false;
        }
        if self.dashes.is_empty() || self.dash.is_running() {
            trace!(actor = %ctx.actor(), "dash rejected");
            return false;
        }

        let grace = self.config.dash_time + self.config.redash_grace;
        if self.since_dash.is_some_and(|t| t < grace) {
            // Rapid re-dash restarts rather than stacks.
            self.dash.cancel();
        }
        self.gravity_affector.cancel();

        self.since_dash = Some(0.0);
        ctx.body.set_velocity(Vec2::ZERO);
        ctx.body.apply_impulse(self.input * self.config.dash_force);
        self.dashes.consume();
        self.dash.start(self.config.dash_time);
        ctx.body.set_gravity_scale(0.0);
        ctx.health.add_collision_immunity(self.config.dash_time);
        self.dashes.restart_cooldown();

        debug!(actor = %ctx.actor(), direction = ?self.input, "dash");
        ctx.events.publish(CombatEvent::Dashed {
            actor: ctx.actor(),
            direction: self.input,
        });
        self.refresh_state();
        true
    }

    /// Fixed step: dash motion and the gravity affector.
    pub fn fixed_step(&mut self, ctx: &mut BehaviorContext<'_>, dt: f32) {
        if self.state == PlayerState::Dead {
            return;
        }
        if let Some(t) = self.since_dash.as_mut() {
            *t += dt;
        }
        self.gravity.tick(dt);
        self.move_speed.tick(dt);

        if self.dash.is_running() {
            let source = ctx.actor();
            spawn_or_warn(
                ctx.spawner,
                SpawnRequest::Afterimage {
                    source,
                    position: ctx.body.position(),
                    lifetime: self.config.afterimage_lifetime,
                },
            );
            if self.dash.tick(dt) {
                ctx.body.set_gravity_scale(self.gravity.value());
            }
        } else if self.gravity_affector.is_running() {
            self.gravity_affector.tick(dt);
            let t = self.gravity_affector.progress();
            let scale = self.config.reduced_gravity + (self.gravity.value() - self.config.reduced_gravity) * t;
            ctx.body.set_gravity_scale(scale);
        } else {
            ctx.body.set_gravity_scale(self.gravity.value());
        }

        self.refresh_state();
    }

    /// Variable step: ground detection, fall damage, input and dash regen.
    ///
    /// Returns the fall damage report when a landing hurt.
    pub fn variable_step(&mut self, ctx: &mut BehaviorContext<'_>, dt: f32) -> Option<DamageReport> {
        if self.state == PlayerState::Dead {
            return None;
        }

        let fall = self.detect_ground(ctx);

        if self.input != Vec2::ZERO {
            let control = if self.grounded { 1.0 } else { self.config.air_control };
            let velocity = ctx.body.velocity() + self.input * self.move_speed.value() * dt * control;
            ctx.body.set_velocity(velocity);
            self.last_input = self.input;
        }

        if self.dashes.tick(dt) > 0 {
            trace!(actor = %ctx.actor(), dashes = self.dashes.current(), "dash charge restored");
        }

        self.refresh_state();
        fall
    }

    /// Death notification: stop every timer.
    pub fn on_death(&mut self, ctx: &mut BehaviorContext<'_>, _report: &DamageReport) {
        if self.state == PlayerState::Dead {
            return;
        }
        debug!(actor = %ctx.actor(), "player died");
        self.dash.cancel();
        self.gravity_affector.cancel();
        self.input = Vec2::ZERO;
        self.state = PlayerState::Dead;
    }

    fn detect_ground(&mut self, ctx: &mut BehaviorContext<'_>) -> Option<DamageReport> {
        let sensor = feet_sensor(&*ctx.body, self.config.ground_sensor_width, self.config.ground_sensor_height);
        if !ctx.ground.overlaps_ground(&sensor) {
            self.grounded = false;
            return None;
        }

        let position = ctx.body.position();
        let fall = self.last_surface.y - position.y;
        if !self.grounded {
            ctx.events.publish(CombatEvent::Landed {
                actor: ctx.actor(),
                fall_distance: fall.max(0.0),
            });
        }

        let mut report = None;
        if fall > self.config.fall_damage_threshold {
            let percent = self.config.fall_damage_curve.evaluate(fall);
            let damage = (ctx.health.max_health() as f32 * percent / 100.0).round() as i32;
            debug!(actor = %ctx.actor(), fall, damage, "fall damage");
            report = Some(ctx.health.take_damage(&DamageInfo::new(damage), ctx.rng, ctx.events));
        }

        self.grounded = true;
        if ctx.body.velocity().y < self.config.landing_speed {
            self.last_surface = position;
            self.jumps.refill();
            if self.gravity_affector.cancel() {
                ctx.body.set_gravity_scale(self.gravity.value());
            }
        }
        report
    }

    fn refresh_state(&mut self) {
        if self.state == PlayerState::Dead {
            return;
        }
        self.state = if self.dash.is_running() {
            PlayerState::Dashing
        } else if self.gravity_affector.is_running() {
            PlayerState::Jumping
        } else if self.grounded {
            PlayerState::Grounded
        } else {
            PlayerState::Airborne
        };
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Rig;
    use super::*;
    use crate::physics::PhysicsBody;
    use crate::stats::{ModifierSource, StatModifier};

    const DT: f32 = 0.125;

    fn motor(rig: &Rig) -> PlayerMotor {
        PlayerMotor::new(&PlayerConfig::default(), rig.body.position())
    }

    fn grounded(rig: &mut Rig) -> PlayerMotor {
        let mut m = motor(rig);
        m.variable_step(&mut rig.ctx(), 0.0);
        assert!(m.is_grounded());
        m
    }

    #[test]
    fn test_grounded_after_first_poll() {
        let mut rig = Rig::on_floor(100);
        let m = grounded(&mut rig);
        assert_eq!(m.state(), PlayerState::Grounded);
        assert_eq!(m.jumps_left(), 2);
    }

    #[test]
    fn test_two_jumps_then_rejected() {
        let mut rig = Rig::on_floor(100);
        let mut m = grounded(&mut rig);

        assert!(m.jump(&mut rig.ctx()));
        assert!(m.jump(&mut rig.ctx()));
        assert!(!m.jump(&mut rig.ctx()));
        assert_eq!(m.jumps_left(), 0);

        // Still touching ground but rising: no refill.
        m.variable_step(&mut rig.ctx(), DT);
        assert!(!m.jump(&mut rig.ctx()));

        // Descending contact refills.
        rig.body.set_velocity(Vec2::ZERO);
        m.variable_step(&mut rig.ctx(), DT);
        assert_eq!(m.jumps_left(), 2);
        assert!(m.jump(&mut rig.ctx()));
    }

    #[test]
    fn test_jump_resets_vertical_velocity() {
        let mut rig = Rig::on_floor(100);
        let mut m = grounded(&mut rig);
        rig.body.set_velocity(Vec2::new(3.0, -7.0));
        m.jump(&mut rig.ctx());

        assert_eq!(rig.body.velocity(), Vec2::new(3.0, 12.0));
        assert_eq!(rig.body.gravity_scale(), 0.0);
        assert!(rig.health.is_collision_immune());
        assert_eq!(m.state(), PlayerState::Jumping);
    }

    #[test]
    fn test_gravity_affector_lerps_back() {
        let mut rig = Rig::on_floor(100);
        let mut m = grounded(&mut rig);
        m.jump(&mut rig.ctx());

        m.fixed_step(&mut rig.ctx(), DT);
        m.fixed_step(&mut rig.ctx(), DT);
        assert!((rig.body.gravity_scale() - 0.5).abs() < 1e-6);

        m.fixed_step(&mut rig.ctx(), DT);
        m.fixed_step(&mut rig.ctx(), DT);
        assert_eq!(rig.body.gravity_scale(), 1.0);
        assert_ne!(m.state(), PlayerState::Jumping);
    }

    #[test]
    fn test_landing_cancels_gravity_affector() {
        let mut rig = Rig::on_floor(100);
        let mut m = grounded(&mut rig);
        m.jump(&mut rig.ctx());
        m.fixed_step(&mut rig.ctx(), DT);

        rig.body.set_velocity(Vec2::ZERO);
        m.variable_step(&mut rig.ctx(), DT);
        assert_eq!(rig.body.gravity_scale(), 1.0);
        assert_eq!(m.state(), PlayerState::Grounded);
    }

    #[test]
    fn test_dash() {
        let mut rig = Rig::on_floor(100);
        let mut m = grounded(&mut rig);
        m.set_input(Vec2::new(1.0, 1.0));
        rig.body.set_velocity(Vec2::new(-4.0, 2.0));

        assert!(m.dash(&mut rig.ctx()));
        assert_eq!(rig.body.velocity(), Vec2::new(18.0, 0.0));
        assert_eq!(rig.body.gravity_scale(), 0.0);
        assert_eq!(m.state(), PlayerState::Dashing);
        assert_eq!(m.dashes_left(), 0);
        assert_eq!(rig.health.immunity().collision_immunity_left(), 0.2);

        // No charge left and a dash running.
        assert!(!m.dash(&mut rig.ctx()));
    }

    #[test]
    fn test_dash_spawns_afterimages_and_restores_gravity() {
        let mut rig = Rig::on_floor(100);
        let mut m = grounded(&mut rig);
        m.set_input(Vec2::X);
        m.dash(&mut rig.ctx());

        m.fixed_step(&mut rig.ctx(), 0.1);
        m.fixed_step(&mut rig.ctx(), 0.1);
        assert_eq!(rig.body.gravity_scale(), 1.0);
        m.fixed_step(&mut rig.ctx(), 0.1);

        let afterimages = rig
            .spawner
            .requests()
            .into_iter()
            .filter(|r| matches!(r, SpawnRequest::Afterimage { .. }))
            .count();
        assert_eq!(afterimages, 2);
    }

    #[test]
    fn test_dash_cancels_jump_affector() {
        let mut rig = Rig::on_floor(100);
        let mut m = grounded(&mut rig);
        m.jump(&mut rig.ctx());
        m.dash(&mut rig.ctx());
        for _ in 0..8 {
            m.fixed_step(&mut rig.ctx(), DT);
        }
        // Dash ended and restored gravity; the cancelled affector never ran.
        assert_eq!(rig.body.gravity_scale(), 1.0);
        assert_ne!(m.state(), PlayerState::Jumping);
    }

    #[test]
    fn test_jump_cancels_dash() {
        let mut rig = Rig::on_floor(100);
        let mut m = grounded(&mut rig);
        m.set_input(Vec2::X);
        m.dash(&mut rig.ctx());
        m.jump(&mut rig.ctx());
        assert_eq!(m.state(), PlayerState::Jumping);

        m.fixed_step(&mut rig.ctx(), DT);
        assert!(rig.spawner.requests().is_empty());
    }

    #[test]
    fn test_dash_regenerates_one_charge() {
        let mut rig = Rig::on_floor(100);
        let mut m = grounded(&mut rig);
        m.set_input(Vec2::X);
        m.dash(&mut rig.ctx());
        assert_eq!(m.dashes_left(), 0);

        for _ in 0..15 {
            m.variable_step(&mut rig.ctx(), DT);
        }
        assert_eq!(m.dashes_left(), 0);
        m.variable_step(&mut rig.ctx(), DT);
        assert_eq!(m.dashes_left(), 1);

        for _ in 0..32 {
            m.variable_step(&mut rig.ctx(), DT);
        }
        assert_eq!(m.dashes_left(), 1);
    }

    #[test]
    fn test_dash_regenerates_at_frame_rate() {
        let mut rig = Rig::on_floor(100);
        let mut m = grounded(&mut rig);
        m.set_input(Vec2::X);
        m.dash(&mut rig.ctx());

        let dt = 1.0 / 60.0;
        for _ in 0..119 {
            m.variable_step(&mut rig.ctx(), dt);
        }
        assert_eq!(m.dashes_left(), 0);
        m.variable_step(&mut rig.ctx(), dt);
        assert_eq!(m.dashes_left(), 1);
    }

    #[test]
    fn test_timed_gravity_modifier_expires() {
        let mut rig = Rig::on_floor(100);
        let mut m = grounded(&mut rig);
        m.gravity_stat_mut()
            .add_modifier(StatModifier::multiplier(ModifierSource::Status, 2.0).with_duration(0.5));

        m.fixed_step(&mut rig.ctx(), DT);
        assert_eq!(m.gravity(), 2.0);
        assert_eq!(rig.body.gravity_scale(), 2.0);

        for _ in 0..3 {
            m.fixed_step(&mut rig.ctx(), DT);
        }
        assert_eq!(m.gravity(), 1.0);
        assert_eq!(rig.body.gravity_scale(), 1.0);
    }

    #[test]
    fn test_rapid_redash_restarts() {
        let mut rig = Rig::on_floor(100);
        let config = PlayerConfig {
            dashes: 2,
            ..PlayerConfig::default()
        };
        let mut m = PlayerMotor::new(&config, rig.body.position());
        m.set_input(Vec2::X);
        assert!(m.dash(&mut rig.ctx()));

        // Dash (0.2s) over, still within the 0.1s grace.
        m.fixed_step(&mut rig.ctx(), 0.125);
        m.fixed_step(&mut rig.ctx(), 0.125);
        assert_ne!(m.state(), PlayerState::Dashing);

        assert!(m.dash(&mut rig.ctx()));
        assert_eq!(m.dashes_left(), 0);
        m.fixed_step(&mut rig.ctx(), 0.125);
        assert_eq!(m.state(), PlayerState::Dashing);
    }

    #[test]
    fn test_air_control() {
        let mut rig = Rig::on_floor(100);
        let mut m = grounded(&mut rig);
        m.set_input(Vec2::X);
        m.variable_step(&mut rig.ctx(), 0.5);
        assert_eq!(rig.body.velocity().x, 20.0);

        rig.body.set_position(Vec2::new(0.0, 10.0));
        rig.body.set_velocity(Vec2::ZERO);
        m.variable_step(&mut rig.ctx(), 0.5);
        assert!(!m.is_grounded());
        assert_eq!(rig.body.velocity().x, 15.0);
        assert_eq!(m.last_input(), Vec2::X);
    }

    #[test]
    fn test_fall_damage() {
        let mut rig = Rig::on_floor(100);
        let mut m = PlayerMotor::new(&PlayerConfig::default(), Vec2::new(0.0, 10.5));

        let report = m.variable_step(&mut rig.ctx(), DT).expect("fall damage");
        // 10m fall: 25% of max health.
        assert_eq!(report.damage_taken, 25);
        assert_eq!(rig.health.health(), 75);

        let landed = rig
            .events
            .drain()
            .into_iter()
            .any(|e| matches!(e, CombatEvent::Landed { fall_distance, .. } if fall_distance == 10.0));
        assert!(landed);

        // Surface refreshed: no second hit.
        rig.health.tick(1.0);
        assert!(m.variable_step(&mut rig.ctx(), DT).is_none());
    }

    #[test]
    fn test_short_fall_is_free() {
        let mut rig = Rig::on_floor(100);
        let mut m = PlayerMotor::new(&PlayerConfig::default(), Vec2::new(0.0, 4.5));
        assert!(m.variable_step(&mut rig.ctx(), DT).is_none());
        assert_eq!(rig.health.health(), 100);
    }

    #[test]
    fn test_dead_motor_ignores_requests() {
        let mut rig = Rig::on_floor(100);
        let mut m = grounded(&mut rig);
        m.on_death(&mut rig.ctx(), &DamageReport::none());
        assert_eq!(m.state(), PlayerState::Dead);
        assert!(!m.jump(&mut rig.ctx()));
        assert!(!m.dash(&mut rig.ctx()));
        m.set_input(Vec2::X);
        assert!(m.variable_step(&mut rig.ctx(), DT).is_none());
        assert_eq!(rig.body.velocity(), Vec2::ZERO);
    }
}
