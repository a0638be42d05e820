//! Actor registry and the boundary the host engine talks to.
//!
//! The host owns rendering, rigid-body solving and input devices. It hands the
//! simulation one body per actor, forwards damage and collisions, and calls
//! [`Simulation::advance`] (or [`Simulation::tick`]) once per frame. Each
//! fixed step runs in three phases:
//!
//! 1. every actor's health state ticks (immunity, collision immunity, flash)
//! 2. pending death notifications are dispatched to behaviors
//! 3. behaviors run their fixed step
//!
//! so a timer that completes in phase 1 is visible to phase 3 of the same
//! step.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use smalltime_common::{ActorId, SmallTimeError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::behavior::{BehaviorContext, Behavior, BomberBehavior, PlayerMotor};
use crate::clock::{FramePlan, SimulationClock};
use crate::config::{CombatConfig, HealthConfig};
use crate::damage::{DamageInfo, DamageReport};
use crate::events::{CombatEvent, EventBus};
use crate::health::ActorHealthState;
use crate::physics::{GroundQuery, PhysicsBody, SurfaceKind};
use crate::rng::{RandomSource, SeededRng};
use crate::session::{GameState, Session};
use crate::spawn::Spawner;

/// Errors at the simulation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// Unknown or despawned actor
    #[error("actor not found: {0}")]
    ActorNotFound(ActorId),
}

impl From<SimulationError> for SmallTimeError {
    fn from(err: SimulationError) -> Self {
        match err {
            SimulationError::ActorNotFound(id) => Self::ActorNotFound(id),
        }
    }
}

/// Result alias for simulation calls.
pub type SimulationResult<T> = Result<T, SimulationError>;

// ============================================================================
// Actor
// ============================================================================

/// One simulated actor.
#[derive(Debug)]
pub struct Actor<B> {
    id: ActorId,
    body: B,
    health: ActorHealthState,
    behavior: Option<Behavior>,
    target: Option<ActorId>,
    pending_death: Option<DamageReport>,
}

impl<B: PhysicsBody + 'static> Actor<B> {
    /// Actor id.
    #[must_use]
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Physics body.
    #[must_use]
    pub fn body(&self) -> &B {
        &self.body
    }

    /// Mutable physics body, for the host's integrator.
    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    /// Health state.
    #[must_use]
    pub fn health(&self) -> &ActorHealthState {
        &self.health
    }

    /// Mutable health state, for stat modifiers.
    pub fn health_mut(&mut self) -> &mut ActorHealthState {
        &mut self.health
    }

    /// Attached behavior.
    #[must_use]
    pub fn behavior(&self) -> Option<&Behavior> {
        self.behavior.as_ref()
    }

    /// Current target.
    #[must_use]
    pub fn target(&self) -> Option<ActorId> {
        self.target
    }

    fn note_report(&mut self, report: &DamageReport) {
        if report.is_kill {
            self.pending_death = Some(*report);
        }
    }

    /// Run `f` against the behavior with a context built from `world`.
    fn with_behavior<R>(
        &mut self,
        world: &mut World<'_>,
        target: Option<Vec2>,
        f: impl FnOnce(&mut Behavior, &mut BehaviorContext<'_>) -> R,
    ) -> Option<R> {
        let behavior = self.behavior.as_mut()?;
        let mut ctx = BehaviorContext {
            body: &mut self.body,
            health: &mut self.health,
            ground: world.ground,
            spawner: &mut *world.spawner,
            events: world.events,
            rng: &mut *world.rng,
            target,
        };
        Some(f(behavior, &mut ctx))
    }
}

/// Shared collaborators borrowed for one pass over the actors.
struct World<'a> {
    ground: &'a dyn GroundQuery,
    spawner: &'a mut dyn Spawner,
    events: &'a EventBus,
    rng: &'a mut dyn RandomSource,
}

// ============================================================================
// Simulation
// ============================================================================

/// Owns every actor and drives them.
pub struct Simulation<B> {
    config: CombatConfig,
    actors: BTreeMap<ActorId, Actor<B>>,
    ground: Box<dyn GroundQuery>,
    spawner: Box<dyn Spawner>,
    rng: Box<dyn RandomSource>,
    events: EventBus,
    session: Session,
    clock: SimulationClock,
    torn_down: bool,
}

impl<B: fmt::Debug> fmt::Debug for Simulation<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("actors", &self.actors.len())
            .field("session", &self.session)
            .field("clock", &self.clock)
            .field("pending_events", &self.events.pending_count())
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl<B: PhysicsBody + 'static> Simulation<B> {
    /// Create a simulation with a seeded crit RNG.
    pub fn new(
        config: CombatConfig,
        ground: impl GroundQuery + 'static,
        spawner: impl Spawner + 'static,
    ) -> Self {
        info!(seed = config.seed, "Creating combat simulation");
        Self {
            actors: BTreeMap::new(),
            ground: Box::new(ground),
            spawner: Box::new(spawner),
            rng: Box::new(SeededRng::new(config.seed)),
            events: EventBus::new(config.events.capacity),
            session: Session::new(),
            clock: SimulationClock::new(&config.clock),
            torn_down: false,
            config,
        }
    }

    /// Replace the randomness source (builder pattern).
    #[must_use]
    pub fn with_rng(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Session context.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable session context.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Change the game state, publishing the change.
    pub fn set_game_state(&mut self, state: GameState) {
        self.session.set_state(state, &self.events);
    }

    /// Flip between paused and running. No effect once the run is over.
    pub fn toggle_pause(&mut self) {
        self.session.toggle_pause(&self.events);
        self.clock.reset();
    }

    /// Clock.
    #[must_use]
    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// Event queue, e.g. to hand a sender to another thread.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Drain every pending event.
    pub fn drain_events(&self) -> Vec<CombatEvent> {
        self.events.drain()
    }

    /// Number of live actors.
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Look up an actor.
    #[must_use]
    pub fn actor(&self, id: ActorId) -> Option<&Actor<B>> {
        self.actors.get(&id)
    }

    /// Look up an actor mutably.
    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor<B>> {
        self.actors.get_mut(&id)
    }

    /// All actors in id order.
    pub fn actors(&self) -> impl Iterator<Item = &Actor<B>> {
        self.actors.values()
    }

    /// All actors in id order, mutably.
    pub fn actors_mut(&mut self) -> impl Iterator<Item = &mut Actor<B>> {
        self.actors.values_mut()
    }

    fn get_mut(&mut self, id: ActorId) -> SimulationResult<&mut Actor<B>> {
        self.actors.get_mut(&id).ok_or(SimulationError::ActorNotFound(id))
    }

    // === Spawning ===

    /// Spawn an actor with health but no behavior.
    pub fn spawn_actor(&mut self, body: B, health: &HealthConfig) -> ActorId {
        self.insert(body, health, None)
    }

    /// Spawn a fuse carrier.
    pub fn spawn_bomber(&mut self, body: B) -> ActorId {
        let behavior = Behavior::Bomber(BomberBehavior::new(&self.config.bomber));
        let health = self.config.bomber_health();
        self.insert(body, &health, Some(behavior))
    }

    /// Spawn a player.
    pub fn spawn_player(&mut self, mut body: B) -> ActorId {
        body.set_gravity_scale(self.config.player.gravity);
        let behavior = Behavior::Player(PlayerMotor::new(&self.config.player, body.position()));
        let health = self.config.player_health();
        self.insert(body, &health, Some(behavior))
    }

    fn insert(&mut self, body: B, health: &HealthConfig, behavior: Option<Behavior>) -> ActorId {
        let id = ActorId::new();
        debug!(actor = %id, "spawned actor");
        self.actors.insert(
            id,
            Actor {
                id,
                body,
                health: ActorHealthState::new(id, health),
                behavior,
                target: None,
                pending_death: None,
            },
        );
        id
    }

    /// Remove an actor and tear down its state.
    pub fn despawn(&mut self, id: ActorId) -> SimulationResult<()> {
        let mut actor = self.actors.remove(&id).ok_or(SimulationError::ActorNotFound(id))?;
        actor.health.teardown();
        debug!(actor = %id, "despawned actor");
        self.events.publish(CombatEvent::Despawned { actor: id });
        Ok(())
    }

    /// Despawn every actor whose behavior finished its death sequence.
    pub fn despawn_finished(&mut self) -> Vec<ActorId> {
        let finished: Vec<ActorId> = self
            .actors
            .values()
            .filter(|a| a.behavior.as_ref().is_some_and(Behavior::is_dead))
            .map(|a| a.id)
            .collect();
        finished
            .into_iter()
            .filter(|&id| self.despawn(id).is_ok())
            .collect()
    }

    // === Commands ===

    /// Point an actor's behavior at another actor.
    pub fn set_target(&mut self, id: ActorId, target: Option<ActorId>) -> SimulationResult<()> {
        self.get_mut(id)?.target = target;
        Ok(())
    }

    /// Horizontal movement input for a player. Ignored for other actors.
    pub fn set_move_input(&mut self, id: ActorId, input: Vec2) -> SimulationResult<()> {
        if let Some(Behavior::Player(player)) = self.get_mut(id)?.behavior.as_mut() {
            player.set_input(input);
        }
        Ok(())
    }

    /// Ask a player to jump. Returns whether the jump happened.
    pub fn request_jump(&mut self, id: ActorId) -> SimulationResult<bool> {
        self.player_action(id, PlayerMotor::jump)
    }

    /// Ask a player to dash. Returns whether the dash happened.
    pub fn request_dash(&mut self, id: ActorId) -> SimulationResult<bool> {
        self.player_action(id, PlayerMotor::dash)
    }

    fn player_action(
        &mut self,
        id: ActorId,
        action: fn(&mut PlayerMotor, &mut BehaviorContext<'_>) -> bool,
    ) -> SimulationResult<bool> {
        if !self.actors.contains_key(&id) {
            return Err(SimulationError::ActorNotFound(id));
        }
        if !self.session.state().is_running() {
            return Ok(false);
        }
        let target = self.target_position(id);
        let Self {
            actors,
            ground,
            spawner,
            events,
            rng,
            ..
        } = self;
        let mut world = World {
            ground: &**ground,
            spawner: &mut **spawner,
            events,
            rng: &mut **rng,
        };
        let actor = actors.get_mut(&id).ok_or(SimulationError::ActorNotFound(id))?;
        let done = actor.with_behavior(&mut world, target, |behavior, ctx| {
            behavior.as_player_mut().is_some_and(|player| action(player, ctx))
        });
        Ok(done.unwrap_or(false))
    }

    /// Apply an impulse to an actor's body.
    pub fn knock_back(&mut self, id: ActorId, impulse: Vec2) -> SimulationResult<()> {
        let actor = self.get_mut(id)?;
        actor.health.knock_back(&mut actor.body, impulse);
        Ok(())
    }

    /// Add collected coins to the session.
    pub fn collect_coins(&mut self, amount: u64) {
        self.session.collect_coins(amount, &self.events);
    }

    // === Damage ===

    /// Run a hit through an actor's damage pipeline.
    ///
    /// A killing hit is dispatched to the actor's behavior before returning.
    pub fn resolve_damage(&mut self, id: ActorId, info: &DamageInfo) -> SimulationResult<DamageReport> {
        let Self {
            actors, events, rng, ..
        } = self;
        let actor = actors.get_mut(&id).ok_or(SimulationError::ActorNotFound(id))?;
        let report = actor.health.take_damage(info, &mut **rng, events);
        actor.note_report(&report);
        self.dispatch_death(id);
        Ok(report)
    }

    /// Collision reported by the host's physics.
    pub fn notify_collision(
        &mut self,
        id: ActorId,
        relative_speed: f32,
        surface: SurfaceKind,
    ) -> SimulationResult<()> {
        let Self {
            actors, events, rng, ..
        } = self;
        let actor = actors.get_mut(&id).ok_or(SimulationError::ActorNotFound(id))?;
        if let Some(report) = actor.health.on_collision(relative_speed, surface, &mut **rng, events) {
            actor.note_report(&report);
            self.dispatch_death(id);
        }
        Ok(())
    }

    fn dispatch_death(&mut self, id: ActorId) {
        let target = self.target_position(id);
        let Self {
            actors,
            ground,
            spawner,
            events,
            rng,
            session,
            ..
        } = self;
        let Some(actor) = actors.get_mut(&id) else {
            return;
        };
        let Some(report) = actor.pending_death.take() else {
            return;
        };

        let is_player = matches!(actor.behavior, Some(Behavior::Player(_)));
        let mut world = World {
            ground: &**ground,
            spawner: &mut **spawner,
            events,
            rng: &mut **rng,
        };
        actor.with_behavior(&mut world, target, |behavior, ctx| behavior.on_death(ctx, &report));

        if is_player {
            info!(actor = %id, "player died");
            session.set_state(GameState::GameOver, events);
        }
    }

    fn target_position(&self, id: ActorId) -> Option<Vec2> {
        let target = self.actors.get(&id)?.target?;
        let actor = self.actors.get(&target)?;
        if actor.health.is_dead() {
            return None;
        }
        Some(actor.body.position())
    }

    // === Stepping ===

    /// One fixed step followed by one variable step.
    pub fn tick(&mut self, fixed_dt: f32, variable_dt: f32) {
        self.fixed_step(fixed_dt);
        self.variable_step(variable_dt);
    }

    /// Advance by a frame delta: as many fixed steps as have accumulated, then
    /// one variable step.
    pub fn advance(&mut self, frame_dt: f32) -> FramePlan {
        let plan = self.clock.accumulate(frame_dt);
        for _ in 0..plan.fixed_steps {
            self.fixed_step(plan.fixed_dt);
        }
        self.variable_step(plan.variable_dt);
        plan
    }

    fn fixed_step(&mut self, dt: f32) {
        if self.torn_down {
            warn!("fixed step on a torn-down simulation");
            return;
        }

        // Health first
        for actor in self.actors.values_mut() {
            actor.health.tick(dt);
        }

        // Then deaths the health phase or the last variable step produced
        let dying: Vec<ActorId> = self
            .actors
            .values()
            .filter(|a| a.pending_death.is_some())
            .map(|a| a.id)
            .collect();
        for id in dying {
            self.dispatch_death(id);
        }

        // Then behaviors
        if self.session.state().is_running() {
            let targets: Vec<(ActorId, Option<Vec2>)> = self
                .actors
                .keys()
                .map(|&id| (id, self.target_position(id)))
                .collect();
            let Self {
                actors,
                ground,
                spawner,
                events,
                rng,
                ..
            } = self;
            let mut world = World {
                ground: &**ground,
                spawner: &mut **spawner,
                events,
                rng: &mut **rng,
            };
            for (id, target) in targets {
                if let Some(actor) = actors.get_mut(&id) {
                    actor.with_behavior(&mut world, target, |behavior, ctx| behavior.fixed_step(ctx, dt));
                }
            }
        }

        self.clock.record_fixed_step(dt);
    }

    fn variable_step(&mut self, dt: f32) {
        if self.torn_down {
            return;
        }

        if self.session.state().is_running() {
            let targets: Vec<(ActorId, Option<Vec2>)> = self
                .actors
                .keys()
                .map(|&id| (id, self.target_position(id)))
                .collect();
            let Self {
                actors,
                ground,
                spawner,
                events,
                rng,
                ..
            } = self;
            let mut world = World {
                ground: &**ground,
                spawner: &mut **spawner,
                events,
                rng: &mut **rng,
            };
            for (id, target) in targets {
                let Some(actor) = actors.get_mut(&id) else {
                    continue;
                };
                let report = actor
                    .with_behavior(&mut world, target, |behavior, ctx| behavior.variable_step(ctx, dt))
                    .flatten();
                if let Some(report) = report {
                    actor.note_report(&report);
                }
            }
        }

        self.session.tick(dt);
    }

    /// Tear down every actor. Further steps are ignored.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        for actor in self.actors.values_mut() {
            actor.health.teardown();
        }
        self.actors.clear();
        self.torn_down = true;
        info!("Combat simulation torn down");
    }

    /// Whether `teardown` ran.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}
