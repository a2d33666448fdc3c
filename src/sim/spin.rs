//! Tangential spin drive for tethered agents
//!
//! While attached, the agent is pushed along the tangent of its tether circle
//! with a force that ramps up every tick until it hits the configured cap.
//! The force is a forcing term fed to the integrator, so the agent's real
//! tangential speed depends on mass, drag and tether tension and will not
//! match `speed`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{Body, ForceMode};
use crate::sign_or_positive;

/// Per-attach spin state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpinDrive {
    /// +1 or -1, picked once at attach time
    direction: f32,
    /// Current force magnitude, in [0, max_spin_speed]
    speed: f32,
}

impl SpinDrive {
    /// Spin in whichever direction the agent is already moving around the anchor
    pub fn from_motion(position: Vec2, velocity: Vec2, anchor: Vec2) -> Self {
        let around = (anchor - position).perp();
        Self {
            direction: sign_or_positive(velocity.dot(around)),
            speed: 0.0,
        }
    }

    #[inline]
    pub fn direction(&self) -> f32 {
        self.direction
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Unit tangent in the spin direction, zero if the agent sits on the anchor
    pub fn tangent(&self, position: Vec2, anchor: Vec2) -> Vec2 {
        (anchor - position).perp().normalize_or_zero() * self.direction
    }

    /// Velocity component along the spin tangent
    pub fn tangential_speed(&self, body: &Body, anchor: Vec2) -> f32 {
        body.vel.dot(self.tangent(body.pos, anchor))
    }

    /// Ramp the spin speed and push the body along the tangent
    pub fn step(&mut self, body: &mut Body, anchor: Vec2, acceleration: f32, max_speed: f32, dt: f32) {
        let tangent = self.tangent(body.pos, anchor);
        self.speed = (self.speed + acceleration * dt).min(max_speed);
        body.apply_force(tangent * self.speed, ForceMode::Force);
    }
}
