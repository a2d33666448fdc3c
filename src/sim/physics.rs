//! Minimal 2D rigid body physics
//!
//! Just enough of a physics engine for tethered swinging:
//! - Point-mass bodies with force accumulation, gravity and linear drag
//! - A rigid fixed-distance joint to a world-space anchor point
//! - Circle colliders with layers, tags and a sensor flag
//!
//! Integration is semi-implicit Euler. Forces accumulate between steps and are
//! consumed by [`Body::integrate`], so a force applied during decision logic
//! only moves the body when the physics step runs.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::selector::{AnchorCandidate, SpatialQuery};

/// How a force passed to [`Body::apply_force`] is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Accumulated and integrated over the next step (scaled by dt)
    Force,
    /// Immediate change in momentum
    Impulse,
}

/// A dynamic point-mass body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub pos: Vec2,
    pub vel: Vec2,
    pub mass: f32,
    /// Velocity damping: vel *= 1 / (1 + linear_drag * dt)
    pub linear_drag: f32,
    /// Multiplier on world gravity
    pub gravity_scale: f32,
    /// Forces accumulated since the last integration
    #[serde(skip)]
    force: Vec2,
}

impl Body {
    pub fn new(pos: Vec2, vel: Vec2, mass: f32) -> Self {
        Self {
            pos,
            vel,
            mass,
            linear_drag: 0.0,
            gravity_scale: 1.0,
            force: Vec2::ZERO,
        }
    }

    /// Apply a force or impulse to the body
    pub fn apply_force(&mut self, force: Vec2, mode: ForceMode) {
        match mode {
            ForceMode::Force => self.force += force,
            ForceMode::Impulse => self.vel += force / self.mass,
        }
    }

    /// Force accumulated for the next integration step
    #[inline]
    pub fn pending_force(&self) -> Vec2 {
        self.force
    }

    /// Advance velocity then position by one step, consuming accumulated forces
    pub fn integrate(&mut self, dt: f32, gravity: Vec2) {
        let accel = self.force / self.mass + gravity * self.gravity_scale;
        self.vel += accel * dt;
        if self.linear_drag > 0.0 {
            self.vel *= 1.0 / (1.0 + self.linear_drag * dt);
        }
        self.pos += self.vel * dt;
        self.force = Vec2::ZERO;
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }
}

/// Rigid distance constraint between a body and a fixed world point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceJoint {
    /// Anchor in world space (a snapshot, never re-queried)
    pub anchor: Vec2,
    /// Distance the body is held at
    pub distance: f32,
}

impl DistanceJoint {
    pub fn new(anchor: Vec2, distance: f32) -> Self {
        Self { anchor, distance }
    }

    /// Project the body back onto the constraint circle and strip radial velocity
    pub fn solve(&self, body: &mut Body) {
        let offset = body.pos - self.anchor;
        let Some(normal) = offset.try_normalize() else {
            // Body sits exactly on the anchor, no defined direction to push along
            return;
        };
        body.pos = self.anchor + normal * self.distance;
        let radial = body.vel.dot(normal);
        body.vel -= normal * radial;
    }

    /// Signed constraint error (positive = stretched)
    pub fn error(&self, pos: Vec2) -> f32 {
        pos.distance(self.anchor) - self.distance
    }
}

/// Bitmask over collider layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const NONE: LayerMask = LayerMask(0);

    /// Mask containing a single layer
    pub const fn layer(layer: u8) -> Self {
        LayerMask(1 << layer)
    }

    pub const fn with(self, layer: u8) -> Self {
        LayerMask(self.0 | (1 << layer))
    }

    #[inline]
    pub fn contains(self, layer: u8) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::layer(layers::ANCHORS)
    }
}

/// Well-known collider layers
pub mod layers {
    pub const DEFAULT: u8 = 0;
    pub const AGENTS: u8 = 1;
    pub const ANCHORS: u8 = 2;
    pub const OBSTACLES: u8 = 3;
}

/// Gameplay tag carried by a collider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tag {
    #[default]
    Untagged,
    Player,
    Enemy,
    Obstacle,
}

/// A circle collider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collider {
    pub id: u32,
    pub center: Vec2,
    pub radius: f32,
    pub layer: u8,
    /// Sensors are grapple points: queryable, never physically solid
    pub sensor: bool,
    pub tag: Tag,
    /// Agent that owns this collider (moves with it)
    pub agent: Option<u32>,
}

impl Collider {
    /// Closest point on the collider to `point` (the point itself when inside)
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let offset = point - self.center;
        let dist = offset.length();
        if dist <= self.radius {
            point
        } else {
            self.center + offset / dist * self.radius
        }
    }

    /// Whether the collider overlaps a query circle
    #[inline]
    pub fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        self.center.distance(center) <= self.radius + radius
    }
}

/// All colliders in the world, kept sorted by id for deterministic iteration
#[derive(Debug, Clone, Default)]
pub struct ColliderSet {
    colliders: Vec<Collider>,
}

impl ColliderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a collider, keeping id order
    pub fn insert(&mut self, collider: Collider) {
        let idx = self.colliders.partition_point(|c| c.id < collider.id);
        self.colliders.insert(idx, collider);
    }

    pub fn remove(&mut self, id: u32) -> Option<Collider> {
        let idx = self.index_of(id)?;
        Some(self.colliders.remove(idx))
    }

    pub fn get(&self, id: u32) -> Option<&Collider> {
        self.index_of(id).map(|i| &self.colliders[i])
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Collider> {
        let idx = self.index_of(id)?;
        Some(&mut self.colliders[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.iter()
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    fn index_of(&self, id: u32) -> Option<usize> {
        self.colliders.binary_search_by_key(&id, |c| c.id).ok()
    }
}

impl SpatialQuery for ColliderSet {
    /// Sensor colliders overlapping the circle, in ascending id order
    fn query_circle(&self, center: Vec2, radius: f32, mask: LayerMask) -> Vec<AnchorCandidate> {
        self.colliders
            .iter()
            .filter(|c| c.sensor && mask.contains(c.layer) && c.overlaps_circle(center, radius))
            .map(|c| AnchorCandidate {
                collider: c.id,
                point: c.closest_point(center),
            })
            .collect()
    }
}
