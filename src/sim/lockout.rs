//! Post-release grapple cooldown

use serde::{Deserialize, Serialize};

/// Countdown during which an agent may not attach again.
///
/// Only ever held inside `GrappleState::Locked`, and always with a positive
/// remaining time: [`LockoutTimer::start`] refuses non-positive durations and
/// [`LockoutTimer::tick`] reports expiry so the owner can drop back to idle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LockoutTimer {
    remaining: f32,
}

impl LockoutTimer {
    /// Start a lockout, or `None` if the duration would not lock at all
    pub fn start(duration: f32) -> Option<Self> {
        (duration > 0.0).then_some(Self { remaining: duration })
    }

    /// Seconds left
    #[inline]
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Count down by `dt`. Returns true once the lockout has run out.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.remaining = (self.remaining - dt).max(0.0);
        self.remaining <= 0.0
    }
}
