//! Deterministic simulation module
//!
//! All grapple logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod lockout;
pub mod physics;
pub mod release;
pub mod rope;
pub mod selector;
pub mod spin;
pub mod state;
pub mod tether;
pub mod tick;

pub use collision::{CollisionResult, Contact, circle_circle_collision};
pub use lockout::LockoutTimer;
pub use physics::{Body, Collider, ColliderSet, DistanceJoint, ForceMode, LayerMask, Tag, layers};
pub use release::{ReleaseCause, ReleaseTracker};
pub use rope::{NoRope, RopeLines, RopeVisual};
pub use selector::{AnchorCandidate, SelectionPolicy, SpatialQuery, anchor_score, select};
pub use spin::SpinDrive;
pub use state::{
    Agent, AgentKind, AgentSnapshot, Grapple, GrapplePhase, GrappleState, SwingEvent, SwingWorld,
    WorldSnapshot,
};
pub use tether::{Tether, attach, detach};
pub use tick::{FixedStepper, GrappleToggle, TickInput, tick};
