//! Grapple Swing - tether, spin and release mechanics for 2D physics agents
//!
//! Core modules:
//! - `sim`: Deterministic simulation (anchor selection, tether, spin, release, physics)
//! - `config`: Data-driven tuning for AI agents, player agents and physics
//! - `arena`: Demo scene construction and spawn placement

pub mod arena;
pub mod config;
pub mod sim;

pub use config::{AiConfig, ConfigError, GrappleConfig, PhysicsConfig, PlayerConfig, SwingConfig};

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Player anchor scoring: weight of alignment with the input direction
    pub const ALIGNMENT_WEIGHT: f32 = 0.3;
    /// Player anchor scoring: weight of closeness
    pub const DISTANCE_WEIGHT: f32 = 0.7;
    /// AI anchors must lie strictly within this angle (degrees) of the target direction
    pub const AI_ANCHOR_MAX_ANGLE: f32 = 90.0;

    /// Default agent collider radius
    pub const AGENT_RADIUS: f32 = 0.5;
    /// Default agent mass
    pub const AGENT_MASS: f32 = 1.0;
}

/// Unsigned angle between two vectors in degrees, in [0, 180].
///
/// Returns `None` when either vector has no direction.
#[inline]
pub fn angle_between_deg(a: Vec2, b: Vec2) -> Option<f32> {
    let a = a.try_normalize()?;
    let b = b.try_normalize()?;
    Some(a.dot(b).clamp(-1.0, 1.0).acos().to_degrees())
}

/// Sign of `value` as +1.0 / -1.0, with zero mapping to +1.0
#[inline]
pub fn sign_or_positive(value: f32) -> f32 {
    if value >= 0.0 { 1.0 } else { -1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_between_right_angle() {
        let angle = angle_between_deg(Vec2::X, Vec2::Y).unwrap();
        assert!((angle - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_angle_between_ignores_magnitude() {
        let angle = angle_between_deg(Vec2::new(10.0, 0.0), Vec2::new(0.5, 0.5)).unwrap();
        assert!((angle - 45.0).abs() < 1e-3);
    }

    #[test]
    fn test_angle_between_zero_vector_is_undefined() {
        assert!(angle_between_deg(Vec2::ZERO, Vec2::X).is_none());
        assert!(angle_between_deg(Vec2::X, Vec2::ZERO).is_none());
    }

    #[test]
    fn test_sign_or_positive() {
        assert_eq!(sign_or_positive(3.0), 1.0);
        assert_eq!(sign_or_positive(0.0), 1.0);
        assert_eq!(sign_or_positive(-0.1), -1.0);
    }
}
