//! Attaching and detaching the grapple tether
//!
//! A tether is a rigid distance joint to a point snapshotted at attach time.
//! If the anchor collider later moves, the tether does not follow it.

use serde::{Deserialize, Serialize};

use glam::Vec2;

use super::lockout::LockoutTimer;
use super::physics::DistanceJoint;
use super::release::ReleaseTracker;
use super::selector::AnchorCandidate;
use super::spin::SpinDrive;
use super::state::{Agent, Grapple, GrappleState};

/// The constraint holding an agent to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tether {
    /// Collider the anchor point was taken from. The agent does not collide with it.
    pub anchor_collider: u32,
    pub joint: DistanceJoint,
}

impl Tether {
    #[inline]
    pub fn anchor(&self) -> Vec2 {
        self.joint.anchor
    }

    #[inline]
    pub fn distance(&self) -> f32 {
        self.joint.distance
    }
}

/// Attach `agent` to `candidate`.
///
/// The rope length is the current separation, but never less than
/// `min_rope_length`. Spin direction follows the agent's current motion
/// around the anchor. Attaching an agent that is not idle is a caller bug:
/// it panics in debug builds and is refused (returning false) otherwise.
pub fn attach(
    agent: &mut Agent,
    candidate: AnchorCandidate,
    min_rope_length: f32,
    duration_target: Option<f32>,
) -> bool {
    debug_assert!(
        agent.grapple.is_idle(),
        "agent {} attached while {:?}",
        agent.id,
        agent.grapple.phase()
    );
    if !agent.grapple.is_idle() {
        log::error!(
            "Refusing to attach agent {} while {:?}",
            agent.id,
            agent.grapple.phase()
        );
        return false;
    }

    let distance = agent.body.pos.distance(candidate.point).max(min_rope_length);
    let tether = Tether {
        anchor_collider: candidate.collider,
        joint: DistanceJoint::new(candidate.point, distance),
    };
    let spin = SpinDrive::from_motion(agent.body.pos, agent.body.vel, candidate.point);

    agent.grapple = GrappleState::Attached(Grapple {
        tether,
        spin,
        release: ReleaseTracker::new(duration_target),
    });
    true
}

/// Drop the tether, locking out for `lockout_time` seconds if positive.
///
/// Returns the grapple that was dropped, or `None` if the agent wasn't attached
/// (in which case its state is left untouched).
pub fn detach(agent: &mut Agent, lockout_time: f32) -> Option<Grapple> {
    if !matches!(agent.grapple, GrappleState::Attached(_)) {
        return None;
    }
    let next = match LockoutTimer::start(lockout_time) {
        Some(timer) => GrappleState::Locked(timer),
        None => GrappleState::Idle,
    };
    match std::mem::replace(&mut agent.grapple, next) {
        GrappleState::Attached(grapple) => Some(grapple),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::Body;
    use crate::sim::state::{AgentKind, GrapplePhase};

    fn agent_at(pos: Vec2, vel: Vec2) -> Agent {
        Agent::new(1, AgentKind::Player { slot: 1 }, Body::new(pos, vel, 1.0), 0.5, 2)
    }

    fn candidate(x: f32, y: f32) -> AnchorCandidate {
        AnchorCandidate {
            collider: 9,
            point: Vec2::new(x, y),
        }
    }

    #[test]
    fn test_rope_length_uses_separation() {
        let mut agent = agent_at(Vec2::ZERO, Vec2::ZERO);
        assert!(attach(&mut agent, candidate(0.0, 3.0), 2.0, None));
        let tether = agent.grapple.tether().unwrap();
        assert!((tether.distance() - 3.0).abs() < 1e-5);
        assert_eq!(tether.anchor_collider, 9);
        assert_eq!(agent.anchor_collider(), Some(9));
    }

    #[test]
    fn test_rope_length_respects_minimum() {
        let mut agent = agent_at(Vec2::ZERO, Vec2::ZERO);
        assert!(attach(&mut agent, candidate(0.0, 1.0), 2.0, None));
        assert!((agent.grapple.tether().unwrap().distance() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_attach_starts_fresh_cycle() {
        let mut agent = agent_at(Vec2::ZERO, Vec2::new(-1.0, 0.0));
        attach(&mut agent, candidate(0.0, 3.0), 2.0, Some(4.0));
        let GrappleState::Attached(grapple) = &agent.grapple else {
            panic!("not attached");
        };
        assert_eq!(grapple.spin.speed(), 0.0);
        assert_eq!(grapple.spin.direction(), 1.0);
        assert_eq!(grapple.release.elapsed, 0.0);
        assert_eq!(grapple.release.duration_target, Some(4.0));
        assert!(!grapple.release.breakpoint_triggered);
    }

    #[test]
    fn test_detach_with_lockout() {
        let mut agent = agent_at(Vec2::ZERO, Vec2::ZERO);
        attach(&mut agent, candidate(0.0, 3.0), 2.0, None);
        assert!(detach(&mut agent, 1.0).is_some());
        assert_eq!(agent.grapple.phase(), GrapplePhase::Locked);
        assert_eq!(agent.grapple.lockout_remaining(), 1.0);
        assert_eq!(agent.grapple.spin_speed(), 0.0);
        assert!(agent.grapple.tether().is_none());
    }

    #[test]
    fn test_detach_without_lockout() {
        let mut agent = agent_at(Vec2::ZERO, Vec2::ZERO);
        attach(&mut agent, candidate(0.0, 3.0), 2.0, None);
        assert!(detach(&mut agent, 0.0).is_some());
        assert_eq!(agent.grapple.phase(), GrapplePhase::Idle);
    }

    #[test]
    fn test_detach_when_not_attached_keeps_state() {
        let mut agent = agent_at(Vec2::ZERO, Vec2::ZERO);
        agent.grapple = GrappleState::Locked(LockoutTimer::start(0.5).unwrap());
        assert!(detach(&mut agent, 1.0).is_none());
        assert_eq!(agent.grapple.lockout_remaining(), 0.5);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "attached while")]
    fn test_double_attach_panics_in_debug() {
        let mut agent = agent_at(Vec2::ZERO, Vec2::ZERO);
        attach(&mut agent, candidate(0.0, 3.0), 2.0, None);
        attach(&mut agent, candidate(3.0, 0.0), 2.0, None);
    }
}
