//! Fuse-carrying enemy.
//!
//! Chases its target, lights a fuse once in range and blows itself up when
//! the fuse runs out. Killed before that, it still leaves a live payload
//! behind: with the fuse that was left, or a full fuse if it never lit one.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{feet_sensor, BehaviorContext};
use crate::config::BomberConfig;
use crate::damage::DamageReport;
use crate::events::CombatEvent;
use crate::physics::AABB;
use crate::spawn::{spawn_or_warn, SpawnRequest};
use crate::stats::{EntityStat, ModifierSource, StatModifier};
use crate::timer::TimedTimer;

/// State of a fuse carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BomberState {
    /// No target in range
    #[default]
    Idle,
    /// Moving toward the target
    Chase,
    /// In range; lighting the fuse
    Attack,
    /// Fuse burning, still chasing
    FusePreparing,
    /// Killed; payload dropped
    Dying,
    /// Terminal
    Dead,
}

/// Fuse carrier state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomberBehavior {
    state: BomberState,
    fuse: TimedTimer,
    move_speed: EntityStat,
    enrage_modifier: Option<u32>,
    config: BomberConfig,
}

impl BomberBehavior {
    /// New carrier in [`BomberState::Idle`].
    #[must_use]
    pub fn new(config: &BomberConfig) -> Self {
        Self {
            state: BomberState::Idle,
            fuse: TimedTimer::new(),
            move_speed: EntityStat::new(config.move_speed),
            enrage_modifier: None,
            config: config.clone(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> BomberState {
        self.state
    }

    /// Fuse timer.
    #[must_use]
    pub fn fuse(&self) -> &TimedTimer {
        &self.fuse
    }

    /// Current chase acceleration.
    #[must_use]
    pub fn move_speed(&self) -> f32 {
        self.move_speed.value()
    }

    /// Move speed stat, for modifiers.
    pub fn move_speed_stat_mut(&mut self) -> &mut EntityStat {
        &mut self.move_speed
    }

    /// Body color: lerps toward the near-explosion color as the fuse burns.
    #[must_use]
    pub fn fuse_color(&self) -> [f32; 4] {
        let from = self.config.normal_color;
        if !self.fuse.is_running() {
            return from;
        }
        let to = self.config.near_explosion_color;
        let t = self.fuse.progress();
        std::array::from_fn(|i| from[i] + (to[i] - from[i]) * t)
    }

    /// Advance one fixed step.
    pub fn fixed_step(&mut self, ctx: &mut BehaviorContext<'_>, dt: f32) {
        match self.state {
            BomberState::Dead => return,
            BomberState::Dying => {
                self.state = BomberState::Dead;
                return;
            },
            _ => {},
        }
        self.move_speed.tick(dt);
        if ctx.health.is_dead() {
            // Died without a kill notification.
            self.fuse.cancel();
            self.state = BomberState::Dead;
            return;
        }

        if self.fuse.tick(dt) {
            self.detonate(ctx);
            return;
        }

        let distance = ctx.target_distance();

        if self.state == BomberState::Idle && distance.is_some_and(|d| d <= self.config.aggro_range) {
            trace!(actor = %ctx.actor(), "target acquired");
            self.state = BomberState::Chase;
        }

        if self.state == BomberState::Chase {
            self.chase(ctx, dt);
            if distance.is_some_and(|d| d <= self.config.attack_range) {
                self.state = BomberState::Attack;
            }
        }

        match self.state {
            BomberState::Attack => {
                if self.attack(ctx) {
                    self.state = BomberState::FusePreparing;
                }
            },
            BomberState::FusePreparing => self.chase(ctx, dt),
            _ => {},
        }
    }

    /// Death notification from the damage pipeline.
    pub fn on_death(&mut self, ctx: &mut BehaviorContext<'_>, _report: &DamageReport) {
        if matches!(self.state, BomberState::Dying | BomberState::Dead) {
            return;
        }
        let fuse_time = if self.fuse.is_running() {
            self.fuse.remaining()
        } else {
            self.config.fuse_time
        };
        self.fuse.cancel();
        debug!(actor = %ctx.actor(), fuse_time, "fuse carrier killed");
        self.drop_payload(ctx, fuse_time);
        self.state = BomberState::Dying;
    }

    /// Move toward the target; hop when a wall blocks the way.
    fn chase(&mut self, ctx: &mut BehaviorContext<'_>, dt: f32) {
        let Some(target) = ctx.target else {
            return;
        };
        let position = ctx.body.position();
        let dir = if position.x <= target.x { 1.0 } else { -1.0 };

        let mut velocity = ctx.body.velocity();
        velocity.x += dir * self.move_speed.value() * dt;
        let cap = self.config.max_speed * self.speed_factor();
        velocity.x = velocity.x.clamp(-cap, cap);
        ctx.body.set_velocity(velocity);

        if self.is_wall_blocking(ctx, dir) && self.is_grounded(ctx) && velocity.y <= 0.0 {
            trace!(actor = %ctx.actor(), "wall ahead, jumping");
            ctx.body.apply_impulse(Vec2::Y * self.config.jump_force);
        }
    }

    /// Light the fuse and speed up. No-op without a target.
    fn attack(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
        if ctx.target.is_none() {
            return false;
        }
        if self.fuse.start_debounced(self.config.fuse_time) {
            debug!(actor = %ctx.actor(), fuse_time = self.config.fuse_time, "fuse lit");
            ctx.events.publish(CombatEvent::FuseStarted {
                actor: ctx.actor(),
                fuse_time: self.config.fuse_time,
            });
        }
        if self.enrage_modifier.is_none() {
            let modifier = StatModifier::multiplier(ModifierSource::Encounter, self.config.enrage_multiplier);
            self.enrage_modifier = Some(self.move_speed.add_modifier(modifier));
        }
        true
    }

    /// Fuse ran out: immediate payload, coins, silent death.
    fn detonate(&mut self, ctx: &mut BehaviorContext<'_>) {
        debug!(actor = %ctx.actor(), "fuse burned out");
        self.drop_payload(ctx, 0.0);
        if self.config.coin_reward > 0 {
            spawn_or_warn(
                ctx.spawner,
                SpawnRequest::Coins {
                    amount: self.config.coin_reward,
                    position: ctx.body.position(),
                },
            );
        }
        ctx.health.die_silently();
        self.state = BomberState::Dead;
    }

    fn drop_payload(&self, ctx: &mut BehaviorContext<'_>, fuse_time: f32) {
        let source = ctx.actor();
        let position = ctx.body.position();
        spawn_or_warn(
            ctx.spawner,
            SpawnRequest::Payload {
                source,
                position,
                damage: self.config.payload,
                fuse_time,
                impulse: Vec2::Y * self.config.drop_impulse,
            },
        );
        ctx.events.publish(CombatEvent::PayloadDropped {
            actor: source,
            position,
            fuse_time,
        });
    }

    fn speed_factor(&self) -> f32 {
        let base = self.move_speed.base_value();
        if base <= f32::EPSILON {
            1.0
        } else {
            self.move_speed.value() / base
        }
    }

    fn is_wall_blocking(&self, ctx: &BehaviorContext<'_>, dir: f32) -> bool {
        let size = ctx.body.size();
        let sensor = self.config.wall_sensor_distance;
        let center = ctx.body.position() + Vec2::new(dir * (size.x + sensor) * 0.5, 0.0);
        ctx.ground
            .overlaps_ground(&AABB::from_center(center, Vec2::new(sensor, size.y * 0.8)))
    }

    fn is_grounded(&self, ctx: &BehaviorContext<'_>) -> bool {
        ctx.ground.overlaps_ground(&feet_sensor(&*ctx.body, 0.95, 0.2))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Rig;
    use super::*;
    use crate::physics::PhysicsBody;

    const DT: f32 = 0.25;

    fn bomber() -> BomberBehavior {
        BomberBehavior::new(&BomberConfig::default())
    }

    fn payload_fuse(rig: &Rig) -> Vec<f32> {
        rig.spawner
            .payloads()
            .into_iter()
            .filter_map(|r| match r {
                SpawnRequest::Payload { fuse_time, .. } => Some(fuse_time),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_idle_without_target() {
        let mut rig = Rig::on_floor(30);
        let mut b = bomber();
        b.fixed_step(&mut rig.ctx(), DT);
        assert_eq!(b.state(), BomberState::Idle);
        assert_eq!(rig.body.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_chases_toward_target() {
        let mut rig = Rig::on_floor(30);
        rig.target = Some(Vec2::new(-8.0, 0.5));
        let mut b = bomber();
        b.fixed_step(&mut rig.ctx(), DT);
        assert_eq!(b.state(), BomberState::Chase);
        assert!(rig.body.velocity().x < 0.0);
        assert!(!b.fuse().is_running());
    }

    #[test]
    fn test_jumps_over_wall() {
        let mut rig = Rig::on_floor(30);
        rig.ground.add_block(AABB::new(Vec2::new(0.6, 0.0), Vec2::new(1.5, 3.0)));
        rig.target = Some(Vec2::new(8.0, 0.5));
        let mut b = bomber();
        b.fixed_step(&mut rig.ctx(), DT);
        assert_eq!(rig.body.velocity().y, 8.0);

        // Already rising: no second impulse.
        b.fixed_step(&mut rig.ctx(), DT);
        assert_eq!(rig.body.velocity().y, 8.0);
    }

    #[test]
    fn test_attack_lights_fuse_and_enrages_once() {
        let mut rig = Rig::on_floor(30);
        rig.target = Some(Vec2::new(1.0, 0.5));
        let mut b = bomber();
        b.fixed_step(&mut rig.ctx(), DT);

        assert_eq!(b.state(), BomberState::FusePreparing);
        assert!(b.fuse().is_running());
        assert_eq!(b.move_speed(), 15.0);

        for _ in 0..3 {
            b.fixed_step(&mut rig.ctx(), DT);
        }
        assert_eq!(b.move_speed(), 15.0);

        let started = rig
            .events
            .drain()
            .into_iter()
            .filter(|e| matches!(e, CombatEvent::FuseStarted { .. }))
            .count();
        assert_eq!(started, 1);
    }

    #[test]
    fn test_kill_carries_remaining_fuse() {
        let mut rig = Rig::on_floor(30);
        rig.target = Some(Vec2::new(1.0, 0.5));
        let mut b = bomber();
        // Lights the 3.0s fuse.
        b.fixed_step(&mut rig.ctx(), DT);
        for _ in 0..4 {
            b.fixed_step(&mut rig.ctx(), DT);
        }
        assert_eq!(b.fuse().remaining(), 2.0);

        let report = DamageReport {
            is_kill: true,
            ..DamageReport::none()
        };
        b.on_death(&mut rig.ctx(), &report);

        assert_eq!(payload_fuse(&rig), vec![2.0]);
        assert_eq!(b.state(), BomberState::Dying);
        b.fixed_step(&mut rig.ctx(), DT);
        assert_eq!(b.state(), BomberState::Dead);
    }

    #[test]
    fn test_early_kill_drops_full_fuse() {
        let mut rig = Rig::on_floor(30);
        let mut b = bomber();
        b.on_death(&mut rig.ctx(), &DamageReport::none());
        b.on_death(&mut rig.ctx(), &DamageReport::none());
        assert_eq!(payload_fuse(&rig), vec![3.0]);
    }

    #[test]
    fn test_fuse_completion_self_destructs() {
        let mut rig = Rig::on_floor(30);
        rig.target = Some(Vec2::new(1.0, 0.5));
        let mut b = bomber();
        for _ in 0..13 {
            b.fixed_step(&mut rig.ctx(), DT);
        }

        assert_eq!(b.state(), BomberState::Dead);
        assert!(rig.health.is_dead());
        assert_eq!(payload_fuse(&rig), vec![0.0]);
        let coins = rig
            .spawner
            .requests()
            .into_iter()
            .filter(|r| matches!(r, SpawnRequest::Coins { amount: 3, .. }))
            .count();
        assert_eq!(coins, 1);
        assert!(!rig
            .events
            .drain()
            .iter()
            .any(|e| matches!(e, CombatEvent::Death { .. })));
    }

    #[test]
    fn test_fuse_color_lerps() {
        let mut rig = Rig::on_floor(30);
        rig.target = Some(Vec2::new(1.0, 0.5));
        let mut b = bomber();
        assert_eq!(b.fuse_color(), BomberConfig::default().normal_color);

        b.fixed_step(&mut rig.ctx(), DT);
        for _ in 0..6 {
            b.fixed_step(&mut rig.ctx(), DT);
        }
        // Half of the 3.0s fuse burned.
        let color = b.fuse_color();
        assert!((color[1] - 0.6).abs() < 1e-5);
        assert!((color[2] - 0.55).abs() < 1e-5);
    }

    #[test]
    fn test_timed_speed_modifier_expires() {
        let mut rig = Rig::on_floor(30);
        let mut b = bomber();
        b.move_speed_stat_mut()
            .add_modifier(StatModifier::flat(ModifierSource::Status, 5.0).with_duration(0.5));
        assert_eq!(b.move_speed(), 15.0);

        b.fixed_step(&mut rig.ctx(), DT);
        assert_eq!(b.move_speed(), 15.0);
        b.fixed_step(&mut rig.ctx(), DT);
        assert_eq!(b.move_speed(), 10.0);
    }

    #[test]
    fn test_attack_without_target_is_noop() {
        let mut rig = Rig::on_floor(30);
        let mut b = bomber();
        assert!(!b.attack(&mut rig.ctx()));
        assert!(!b.fuse().is_running());
        assert_eq!(b.move_speed(), 10.0);
    }
}
