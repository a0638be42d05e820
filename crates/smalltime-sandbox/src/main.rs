//! # SmallTime Sandbox
//!
//! Headless driver for the combat core. Plays a scripted encounter between a
//! player and a fuse carrier on a flat floor, integrating simple kinematic
//! physics in place of a real rigid-body engine, and logs every event.
//!
//! Usage: `smalltime-sandbox [config.toml]`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::Result;
use glam::Vec2;
use smalltime_combat::prelude::*;
use smalltime_common::ActorId;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Downward acceleration applied by the sandbox integrator.
const GRAVITY: f32 = 30.0;

/// Height of the floor.
const FLOOR_Y: f32 = 0.0;

/// Radius a detonating payload reaches.
const BLAST_RADIUS: f32 = 2.5;

/// Frames to run.
const FRAMES: u32 = 600;

/// Default config location.
const DEFAULT_CONFIG: &str = "smalltime.toml";

/// Payload ticking down in the sandbox world.
#[derive(Debug)]
struct LivePayload {
    position: Vec2,
    fuse: TimedTimer,
    damage: DamageInfo,
}

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("smalltime=info".parse()?))
        .init();

    info!("SmallTime sandbox starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = CombatConfig::load_from(&path);

    run_encounter(config)?;

    info!("SmallTime sandbox shutdown complete");
    Ok(())
}

fn run_encounter(config: CombatConfig) -> Result<()> {
    let frame_dt = config.clock.fixed_dt;
    let spawner = RecordingSpawner::new();
    let mut sim = Simulation::new(config, FlatGround::new(FLOOR_Y), spawner.clone());

    let player = sim.spawn_player(KinematicBody::new(Vec2::new(0.0, 0.5), Vec2::ONE));
    let bomber = sim.spawn_bomber(KinematicBody::new(Vec2::new(9.0, 0.5), Vec2::ONE));
    sim.set_target(bomber, Some(player))?;

    let mut payloads: Vec<LivePayload> = Vec::new();

    for frame in 0..FRAMES {
        script_input(&mut sim, player, frame)?;

        let plan = sim.advance(frame_dt);
        integrate(&mut sim, plan.variable_dt)?;

        for request in spawner.take() {
            handle_spawn(&mut sim, &mut payloads, request);
        }
        detonate_payloads(&mut sim, &mut payloads, plan.variable_dt)?;

        for event in sim.drain_events() {
            info!(frame, ?event, "event");
        }
        for id in sim.despawn_finished() {
            info!(frame, actor = %id, "removed finished actor");
        }

        if sim.session().state() == GameState::GameOver {
            info!(frame, "run over");
            break;
        }
        if sim.actor(bomber).is_none() && payloads.is_empty() {
            info!(frame, "encounter cleared");
            break;
        }
    }

    info!(
        game_time = sim.session().game_time(),
        gold = sim.session().gold(),
        steps = sim.clock().fixed_steps(),
        "encounter finished"
    );
    sim.teardown();
    Ok(())
}

/// Player walks toward the enemy, hops over it, then dashes away.
fn script_input(sim: &mut Simulation<KinematicBody>, player: ActorId, frame: u32) -> Result<()> {
    if sim.actor(player).is_none() {
        return Ok(());
    }
    match frame {
        0 => sim.set_move_input(player, Vec2::X)?,
        60 | 72 => {
            let jumped = sim.request_jump(player)?;
            debug!(frame, jumped, "jump requested");
        },
        120 => {
            sim.set_move_input(player, Vec2::NEG_X)?;
            let dashed = sim.request_dash(player)?;
            debug!(frame, dashed, "dash requested");
        },
        240 => sim.set_move_input(player, Vec2::ZERO)?,
        _ => {},
    }
    Ok(())
}

/// Stand-in for the host's rigid-body solver.
fn integrate(sim: &mut Simulation<KinematicBody>, dt: f32) -> Result<()> {
    let mut impacts = Vec::new();
    for actor in sim.actors_mut() {
        let id = actor.id();
        let body = actor.body_mut();
        body.step(dt, GRAVITY);
        if let Some(speed) = body.rest_on(FLOOR_Y) {
            impacts.push((id, speed));
        }
    }
    for (id, speed) in impacts {
        sim.notify_collision(id, speed, SurfaceKind::Ground)?;
    }
    Ok(())
}

fn handle_spawn(sim: &mut Simulation<KinematicBody>, payloads: &mut Vec<LivePayload>, request: SpawnRequest) {
    match request {
        SpawnRequest::Payload {
            position,
            damage,
            fuse_time,
            ..
        } => {
            info!(?position, fuse_time, "payload placed");
            payloads.push(LivePayload {
                position,
                fuse: TimedTimer::started(fuse_time),
                damage,
            });
        },
        SpawnRequest::Coins { amount, .. } => sim.collect_coins(u64::from(amount)),
        SpawnRequest::Afterimage { .. } => {},
    }
}

fn detonate_payloads(
    sim: &mut Simulation<KinematicBody>,
    payloads: &mut Vec<LivePayload>,
    dt: f32,
) -> Result<()> {
    let mut blasts = Vec::new();
    payloads.retain_mut(|payload| {
        // A zero fuse goes off on the frame it lands.
        if payload.fuse.total() <= 0.0 || payload.fuse.tick(dt) {
            blasts.push((payload.position, payload.damage));
            false
        } else {
            true
        }
    });

    for (position, damage) in blasts {
        let victims: Vec<ActorId> = sim
            .actors()
            .filter(|a| !a.health().is_dead())
            .filter(|a| a.body().position().distance(position) <= BLAST_RADIUS)
            .map(Actor::id)
            .collect();
        info!(?position, victims = victims.len(), "payload detonated");
        for id in victims {
            let report = sim.resolve_damage(id, &damage)?;
            if report.is_kill {
                warn!(actor = %id, "actor killed by blast");
            }
        }
    }
    Ok(())
}
