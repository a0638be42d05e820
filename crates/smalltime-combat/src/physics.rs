//! Physics collaborator interfaces.
//!
//! The combat core never resolves collisions itself. It reads and nudges
//! bodies through [`PhysicsBody`] and asks the world whether a region touches
//! the ground layer through [`GroundQuery`]. [`KinematicBody`] and
//! [`FlatGround`] are small reference implementations for headless runs and
//! tests. Coordinates are y-up.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box for ground sensors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl AABB {
    /// Creates a new AABB.
    #[must_use]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates an AABB from its center and full size.
    #[must_use]
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Returns the center of the AABB.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Returns the size of the AABB.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Checks if this AABB overlaps with another.
    #[must_use]
    pub fn overlaps(&self, other: &AABB) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Returns the AABB translated by a vector.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

/// Kind of surface a collision was reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// Ground layer
    #[default]
    Ground,
    /// Environmental hazard (spikes, lava)
    Hazard,
    /// Another actor
    Actor,
    /// Anything else
    Other,
}

impl SurfaceKind {
    /// Whether a hard impact with this surface hurts.
    #[must_use]
    pub fn deals_impact_damage(self) -> bool {
        matches!(self, Self::Ground | Self::Hazard)
    }
}

/// Rigid body owned by the physics engine.
pub trait PhysicsBody: fmt::Debug {
    /// Center position.
    fn position(&self) -> Vec2;

    /// Collider size.
    fn size(&self) -> Vec2;

    /// Linear velocity.
    fn velocity(&self) -> Vec2;

    /// Overwrite linear velocity.
    fn set_velocity(&mut self, velocity: Vec2);

    /// Apply an instantaneous impulse.
    fn apply_impulse(&mut self, impulse: Vec2);

    /// Current gravity scale.
    fn gravity_scale(&self) -> f32;

    /// Overwrite gravity scale.
    fn set_gravity_scale(&mut self, scale: f32);
}

/// World query for the ground layer.
pub trait GroundQuery {
    /// Whether `region` overlaps anything on the ground layer.
    fn overlaps_ground(&self, region: &AABB) -> bool;
}

/// Flat floor plus optional solid blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlatGround {
    /// Everything at or below this height is ground.
    floor: Option<f32>,
    /// Extra solid blocks (walls, ledges).
    blocks: Vec<AABB>,
}

impl FlatGround {
    /// Ground with a floor at `floor_y`.
    #[must_use]
    pub fn new(floor_y: f32) -> Self {
        Self {
            floor: Some(floor_y),
            blocks: Vec::new(),
        }
    }

    /// Ground with nothing in it.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a solid block (builder pattern).
    #[must_use]
    pub fn with_block(mut self, block: AABB) -> Self {
        self.blocks.push(block);
        self
    }

    /// Add a solid block.
    pub fn add_block(&mut self, block: AABB) {
        self.blocks.push(block);
    }

    /// Floor height.
    #[must_use]
    pub fn floor(&self) -> Option<f32> {
        self.floor
    }
}

impl GroundQuery for FlatGround {
    fn overlaps_ground(&self, region: &AABB) -> bool {
        if let Some(floor) = self.floor {
            if region.min.y < floor {
                return true;
            }
        }
        self.blocks.iter().any(|block| block.overlaps(region))
    }
}

/// Minimal body that integrates its own velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicBody {
    position: Vec2,
    size: Vec2,
    velocity: Vec2,
    gravity_scale: f32,
    mass: f32,
}

impl KinematicBody {
    /// Body at rest with unit mass and gravity scale 1.
    #[must_use]
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            velocity: Vec2::ZERO,
            gravity_scale: 1.0,
            mass: 1.0,
        }
    }

    /// Set the mass used for impulses.
    #[must_use]
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass.max(f32::EPSILON);
        self
    }

    /// Teleport.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Integrate one step under `gravity` (positive = downward acceleration).
    pub fn step(&mut self, dt: f32, gravity: f32) {
        self.velocity.y -= gravity * self.gravity_scale * dt;
        self.position += self.velocity * dt;
    }

    /// Push the body out of a floor at `floor_y`.
    ///
    /// Returns the impact speed when the body was moving into the floor.
    pub fn rest_on(&mut self, floor_y: f32) -> Option<f32> {
        let bottom = self.position.y - self.size.y * 0.5;
        if bottom >= floor_y {
            return None;
        }
        self.position.y = floor_y + self.size.y * 0.5;
        if self.velocity.y < 0.0 {
            let speed = -self.velocity.y;
            self.velocity.y = 0.0;
            Some(speed)
        } else {
            None
        }
    }
}

impl PhysicsBody for KinematicBody {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn size(&self) -> Vec2 {
        self.size
    }

    fn velocity(&self) -> Vec2 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    fn apply_impulse(&mut self, impulse: Vec2) {
        self.velocity += impulse / self.mass;
    }

    fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity_scale = scale;
    }
}
