//! Release decisions for attached agents
//!
//! AI agents let go automatically: on any collision, when they are spinning
//! fast enough and flying toward their target, or once their grapple time is
//! up and they are flying toward their target. Players let go on their own
//! input, on touching a hazard, or when flung too fast.

use serde::{Deserialize, Serialize};

use crate::config::{AiConfig, PlayerConfig};

/// Why a tether was let go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseCause {
    /// AI hit something while attached
    Collision,
    /// AI reached the spin speed breakpoint facing its target
    Breakpoint,
    /// AI grapple duration elapsed facing its target
    Timed,
    /// Player pressed the grapple toggle
    Toggle,
    /// Player touched a hazard
    Contact,
    /// Player exceeded the spin force break threshold
    SpinForce,
    /// The anchor collider disappeared
    AnchorLost,
    /// The AI's tracked target disappeared
    TargetLost,
    /// The agent itself is being removed
    AgentRemoved,
}

impl ReleaseCause {
    /// Whether an AI release for this cause starts the lockout.
    /// Player releases always lock out.
    pub fn ai_locks_out(self) -> bool {
        matches!(
            self,
            ReleaseCause::Collision | ReleaseCause::Breakpoint | ReleaseCause::Timed
        )
    }
}

/// Per-attach release bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReleaseTracker {
    /// Seconds since attach
    pub elapsed: f32,
    /// When the timed release becomes eligible (AI only)
    pub duration_target: Option<f32>,
    /// Breakpoint already fired this attach; disables the timed release
    pub breakpoint_triggered: bool,
}

impl ReleaseTracker {
    pub fn new(duration_target: Option<f32>) -> Self {
        Self {
            elapsed: 0.0,
            duration_target,
            breakpoint_triggered: false,
        }
    }
}

/// What the AI release check sees this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiReleaseInput {
    /// A collision started since the last tick
    pub collided: bool,
    /// Velocity along the spin tangent
    pub tangential_speed: f32,
    /// Angle between velocity and the direction to the target, `None` if undefined
    pub angle_to_target: Option<f32>,
}

/// Advance the attach clock and decide whether an AI agent lets go this tick.
///
/// Triggers in priority order: collision, spin breakpoint, timed.
pub fn evaluate_ai(
    tracker: &mut ReleaseTracker,
    input: &AiReleaseInput,
    config: &AiConfig,
    dt: f32,
) -> Option<ReleaseCause> {
    tracker.elapsed += dt;

    if input.collided {
        return Some(ReleaseCause::Collision);
    }

    let facing_target = input
        .angle_to_target
        .is_some_and(|angle| angle <= config.release_angle_threshold);

    if !tracker.breakpoint_triggered && input.tangential_speed.abs() >= config.spin_speed_breakpoint {
        if facing_target {
            tracker.breakpoint_triggered = true;
            return Some(ReleaseCause::Breakpoint);
        }
        log::debug!(
            "Spin breakpoint hit but waiting for better angle ({:?})",
            input.angle_to_target
        );
    }

    if tracker.breakpoint_triggered {
        return None;
    }

    let time_up = tracker
        .duration_target
        .is_some_and(|target| tracker.elapsed >= target);
    if time_up {
        if facing_target {
            return Some(ReleaseCause::Timed);
        }
        log::debug!(
            "Grapple time up, waiting for better release angle ({:?})",
            input.angle_to_target
        );
    }

    None
}

/// What the player release check sees this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerReleaseInput {
    /// Grapple toggle pressed this tick
    pub toggled: bool,
    /// A hazard contact started since the last tick
    pub hazard_contact: bool,
    /// Current total speed
    pub speed: f32,
}

/// Decide whether a player agent lets go this tick
pub fn evaluate_player(input: &PlayerReleaseInput, config: &PlayerConfig) -> Option<ReleaseCause> {
    if input.toggled {
        Some(ReleaseCause::Toggle)
    } else if config.break_on_contact && input.hazard_contact {
        Some(ReleaseCause::Contact)
    } else if config.break_on_spin_force && input.speed > config.spin_force_break_threshold {
        Some(ReleaseCause::SpinForce)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.1;

    fn ai_config() -> AiConfig {
        AiConfig {
            spin_speed_breakpoint: 40.0,
            release_angle_threshold: 10.0,
            ..AiConfig::default()
        }
    }

    fn quiet(angle: f32) -> AiReleaseInput {
        AiReleaseInput {
            collided: false,
            tangential_speed: 0.0,
            angle_to_target: Some(angle),
        }
    }

    #[test]
    fn test_collision_releases_regardless_of_angle() {
        let mut tracker = ReleaseTracker::new(Some(100.0));
        let input = AiReleaseInput {
            collided: true,
            tangential_speed: 0.0,
            angle_to_target: Some(170.0),
        };
        assert_eq!(
            evaluate_ai(&mut tracker, &input, &ai_config(), DT),
            Some(ReleaseCause::Collision)
        );
    }

    #[test]
    fn test_breakpoint_fires_once_and_blocks_timed() {
        let config = ai_config();
        let mut tracker = ReleaseTracker::new(Some(0.05));
        let input = AiReleaseInput {
            collided: false,
            tangential_speed: 42.0,
            angle_to_target: Some(5.0),
        };
        assert_eq!(
            evaluate_ai(&mut tracker, &input, &config, DT),
            Some(ReleaseCause::Breakpoint)
        );
        assert!(tracker.breakpoint_triggered);

        // Elapsed is past the target and the angle is good, still no second release
        assert!(tracker.elapsed >= 0.05);
        assert_eq!(evaluate_ai(&mut tracker, &quiet(1.0), &config, DT), None);
        assert_eq!(evaluate_ai(&mut tracker, &input, &config, DT), None);
    }

    #[test]
    fn test_breakpoint_waits_for_angle() {
        let config = ai_config();
        let mut tracker = ReleaseTracker::new(Some(100.0));
        let mut input = AiReleaseInput {
            collided: false,
            tangential_speed: -45.0,
            angle_to_target: Some(30.0),
        };
        assert_eq!(evaluate_ai(&mut tracker, &input, &config, DT), None);
        assert!(!tracker.breakpoint_triggered);

        input.angle_to_target = Some(9.0);
        assert_eq!(
            evaluate_ai(&mut tracker, &input, &config, DT),
            Some(ReleaseCause::Breakpoint)
        );
    }

    #[test]
    fn test_timed_release_needs_angle() {
        let config = ai_config();
        let mut tracker = ReleaseTracker::new(Some(0.25));
        assert_eq!(evaluate_ai(&mut tracker, &quiet(0.0), &config, DT), None);
        assert_eq!(evaluate_ai(&mut tracker, &quiet(0.0), &config, DT), None);
        // 0.3s elapsed, but facing away
        assert_eq!(evaluate_ai(&mut tracker, &quiet(11.0), &config, DT), None);
        // Elapsed keeps counting while waiting
        assert!((tracker.elapsed - 0.3).abs() < 1e-5);
        assert_eq!(
            evaluate_ai(&mut tracker, &quiet(10.0), &config, DT),
            Some(ReleaseCause::Timed)
        );
    }

    #[test]
    fn test_undefined_angle_never_releases() {
        let config = ai_config();
        let mut tracker = ReleaseTracker::new(Some(0.0));
        let input = AiReleaseInput {
            collided: false,
            tangential_speed: 100.0,
            angle_to_target: None,
        };
        assert_eq!(evaluate_ai(&mut tracker, &input, &config, DT), None);
    }

    #[test]
    fn test_player_triggers() {
        let mut config = PlayerConfig::default();
        let idle = PlayerReleaseInput {
            toggled: false,
            hazard_contact: false,
            speed: 1000.0,
        };
        config.break_on_spin_force = false;
        assert_eq!(evaluate_player(&idle, &config), None);

        config.break_on_spin_force = true;
        config.spin_force_break_threshold = 50.0;
        assert_eq!(evaluate_player(&idle, &config), Some(ReleaseCause::SpinForce));

        let contact = PlayerReleaseInput {
            hazard_contact: true,
            speed: 0.0,
            ..idle
        };
        config.break_on_contact = true;
        assert_eq!(evaluate_player(&contact, &config), Some(ReleaseCause::Contact));
        config.break_on_contact = false;
        assert_eq!(evaluate_player(&contact, &config), None);

        let toggled = PlayerReleaseInput { toggled: true, ..contact };
        assert_eq!(evaluate_player(&toggled, &config), Some(ReleaseCause::Toggle));
    }

    #[test]
    fn test_ai_lockout_causes() {
        assert!(ReleaseCause::Collision.ai_locks_out());
        assert!(ReleaseCause::Breakpoint.ai_locks_out());
        assert!(ReleaseCause::Timed.ai_locks_out());
        assert!(!ReleaseCause::AnchorLost.ai_locks_out());
        assert!(!ReleaseCause::TargetLost.ai_locks_out());
    }
}
