//! World state and core simulation types
//!
//! Everything a tick reads or writes lives in [`SwingWorld`]. Agents and
//! colliders are kept sorted by id so that iteration order, and therefore the
//! whole simulation, is deterministic for a given seed.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Contact;
use super::lockout::LockoutTimer;
use super::physics::{Body, Collider, ColliderSet, Tag, layers};
use super::release::{ReleaseCause, ReleaseTracker};
use super::rope::{RopeLines, RopeVisual};
use super::spin::SpinDrive;
use super::tether::Tether;
use crate::config::SwingConfig;

/// Who steers an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    /// Human controlled, grapples on toggle input
    Player { slot: u8 },
    /// Grapples and releases on its own, steering toward `target` (an agent id)
    Ai { target: Option<u32> },
}

/// Coarse grapple phase, for logging and snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrapplePhase {
    Idle,
    Attached,
    Locked,
}

/// Everything that exists only while an agent is tethered
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grapple {
    pub tether: Tether,
    pub spin: SpinDrive,
    pub release: ReleaseTracker,
}

/// Grapple state machine
///
/// Idle -> Attached on a successful selection, Attached -> Locked on a
/// release with a lockout, Locked -> Idle when the timer runs out.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum GrappleState {
    #[default]
    Idle,
    Attached(Grapple),
    Locked(LockoutTimer),
}

impl GrappleState {
    pub fn phase(&self) -> GrapplePhase {
        match self {
            GrappleState::Idle => GrapplePhase::Idle,
            GrappleState::Attached(_) => GrapplePhase::Attached,
            GrappleState::Locked(_) => GrapplePhase::Locked,
        }
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, GrappleState::Idle)
    }

    pub fn tether(&self) -> Option<&Tether> {
        match self {
            GrappleState::Attached(grapple) => Some(&grapple.tether),
            _ => None,
        }
    }

    /// Current spin force magnitude, zero unless attached
    pub fn spin_speed(&self) -> f32 {
        match self {
            GrappleState::Attached(grapple) => grapple.spin.speed(),
            _ => 0.0,
        }
    }

    /// Seconds of lockout left, zero unless locked
    pub fn lockout_remaining(&self) -> f32 {
        match self {
            GrappleState::Locked(timer) => timer.remaining(),
            _ => 0.0,
        }
    }
}

/// A swinging agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: u32,
    pub kind: AgentKind,
    pub body: Body,
    pub radius: f32,
    /// The agent's own collider in the world collider set
    pub collider: u32,
    pub grapple: GrappleState,
    /// Seconds before an AI starts grappling
    pub start_delay: f32,
}

impl Agent {
    pub fn new(id: u32, kind: AgentKind, body: Body, radius: f32, collider: u32) -> Self {
        Self {
            id,
            kind,
            body,
            radius,
            collider,
            grapple: GrappleState::Idle,
            start_delay: 0.0,
        }
    }

    /// Tag other colliders see when they hit this agent
    pub fn tag(&self) -> Tag {
        match self.kind {
            AgentKind::Player { .. } => Tag::Player,
            AgentKind::Ai { .. } => Tag::Enemy,
        }
    }

    /// Collider the agent is currently tethered to
    pub fn anchor_collider(&self) -> Option<u32> {
        self.grapple.tether().map(|t| t.anchor_collider)
    }

    #[inline]
    pub fn phase(&self) -> GrapplePhase {
        self.grapple.phase()
    }

    #[inline]
    pub fn spin_speed(&self) -> f32 {
        self.grapple.spin_speed()
    }

    pub fn is_ai(&self) -> bool {
        matches!(self.kind, AgentKind::Ai { .. })
    }
}

/// Events emitted during a tick (for logging and presentation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SwingEvent {
    Attached {
        agent: u32,
        anchor: u32,
        point: Vec2,
        distance: f32,
    },
    Released {
        agent: u32,
        cause: ReleaseCause,
        locked_out: bool,
    },
    LockoutExpired {
        agent: u32,
    },
    /// Selection ran but found nothing to grab
    SelectionFailed {
        agent: u32,
    },
    Contact(Contact),
}

/// Removal queued from outside the tick, applied at the start of the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Removal {
    Agent(u32),
    Collider(u32),
}

/// Read-only view of one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: u32,
    pub kind: AgentKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub phase: GrapplePhase,
    pub spin_speed: f32,
    pub anchor: Option<Vec2>,
    pub rope_length: Option<f32>,
    pub lockout_remaining: f32,
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        let tether = agent.grapple.tether();
        Self {
            id: agent.id,
            kind: agent.kind,
            position: agent.body.pos,
            velocity: agent.body.vel,
            phase: agent.phase(),
            spin_speed: agent.spin_speed(),
            anchor: tether.map(|t| t.anchor()),
            rope_length: tether.map(|t| t.distance()),
            lockout_remaining: agent.grapple.lockout_remaining(),
        }
    }
}

/// Read-only view of the whole world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub time_ticks: u64,
    pub agents: Vec<AgentSnapshot>,
}

/// The simulation world
///
/// `R` drives every random draw (grapple durations, start delays) and `V`
/// receives rope updates. Both are injectable so tests can pin them down.
#[derive(Debug)]
pub struct SwingWorld<R = Pcg32, V = RopeLines> {
    pub config: SwingConfig,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Agents (sorted by id for determinism)
    pub agents: Vec<Agent>,
    pub colliders: ColliderSet,
    pub(crate) rng: R,
    pub(crate) rope: V,
    /// Collider pairs touching at the end of the last step
    pub(crate) touching: BTreeSet<(u32, u32)>,
    /// Contacts that started in the last physics step, consumed by the next tick
    pub(crate) contacts: Vec<Contact>,
    pub(crate) removals: Vec<Removal>,
    pub(crate) events: Vec<SwingEvent>,
    next_id: u32,
}

impl SwingWorld {
    /// Create an empty world seeded for reproducibility
    pub fn new(config: SwingConfig, seed: u64) -> Self {
        Self::with_parts(config, Pcg32::seed_from_u64(seed), RopeLines::default())
    }
}

impl<R: Rng, V: RopeVisual> SwingWorld<R, V> {
    pub fn with_parts(config: SwingConfig, rng: R, rope: V) -> Self {
        Self {
            config,
            time_ticks: 0,
            agents: Vec::new(),
            colliders: ColliderSet::new(),
            rng,
            rope,
            touching: BTreeSet::new(),
            contacts: Vec::new(),
            removals: Vec::new(),
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID (shared by agents and colliders)
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Spawn an agent and its collider. Returns the agent id.
    ///
    /// AI agents get a random start delay before their first grapple.
    pub fn spawn_agent(&mut self, kind: AgentKind, pos: Vec2, vel: Vec2) -> u32 {
        let id = self.next_entity_id();
        let collider = self.next_entity_id();
        let physics = &self.config.physics;

        let mut body = Body::new(pos, vel, physics.agent_mass);
        body.linear_drag = physics.agent_linear_drag;
        let mut agent = Agent::new(id, kind, body, physics.agent_radius, collider);
        if agent.is_ai() {
            let (min, max) = (self.config.ai.min_start_delay, self.config.ai.max_start_delay);
            agent.start_delay = sample_range(&mut self.rng, min, max);
        }

        self.colliders.insert(Collider {
            id: collider,
            center: pos,
            radius: agent.radius,
            layer: layers::AGENTS,
            sensor: false,
            tag: agent.tag(),
            agent: Some(id),
        });
        log::debug!("Spawned {:?} agent {} at {}", kind, id, pos);
        self.agents.push(agent);
        self.agents.sort_by_key(|a| a.id);
        id
    }

    /// Add a grapple point (a sensor on the anchor layer)
    pub fn spawn_anchor(&mut self, center: Vec2, radius: f32) -> u32 {
        let id = self.next_entity_id();
        self.colliders.insert(Collider {
            id,
            center,
            radius,
            layer: layers::ANCHORS,
            sensor: true,
            tag: Tag::Untagged,
            agent: None,
        });
        id
    }

    /// Add a solid obstacle that agents bounce off
    pub fn spawn_obstacle(&mut self, center: Vec2, radius: f32) -> u32 {
        let id = self.next_entity_id();
        self.colliders.insert(Collider {
            id,
            center,
            radius,
            layer: layers::OBSTACLES,
            sensor: false,
            tag: Tag::Obstacle,
            agent: None,
        });
        id
    }

    /// Queue an agent for removal at the start of the next tick
    pub fn despawn_agent(&mut self, id: u32) {
        self.removals.push(Removal::Agent(id));
    }

    /// Queue a static collider for removal at the start of the next tick.
    /// Agents tethered to it are forced to release.
    pub fn despawn_collider(&mut self, id: u32) {
        self.removals.push(Removal::Collider(id));
    }

    pub fn agent(&self, id: u32) -> Option<&Agent> {
        let idx = self.agents.binary_search_by_key(&id, |a| a.id).ok()?;
        Some(&self.agents[idx])
    }

    pub fn agent_mut(&mut self, id: u32) -> Option<&mut Agent> {
        let idx = self.agents.binary_search_by_key(&id, |a| a.id).ok()?;
        Some(&mut self.agents[idx])
    }

    /// Re-target an AI agent. Ignored for players.
    pub fn set_target(&mut self, agent: u32, target: Option<u32>) {
        if let Some(agent) = self.agent_mut(agent) {
            if let AgentKind::Ai { target: current } = &mut agent.kind {
                *current = target;
            }
        }
    }

    pub fn rope_visual(&self) -> &V {
        &self.rope
    }

    /// Contacts from the last physics step, read by the next tick
    pub fn pending_contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<SwingEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            time_ticks: self.time_ticks,
            agents: self.agents.iter().map(AgentSnapshot::from).collect(),
        }
    }
}

/// Uniform draw from [min, max], `min` when the range is empty
pub(crate) fn sample_range<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    debug_assert!(max >= min, "inverted range {min}..{max}");
    if max > min {
        rng.random_range(min..=max)
    } else {
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_agent_creates_collider() {
        let mut world = SwingWorld::new(SwingConfig::default(), 1);
        let id = world.spawn_agent(AgentKind::Player { slot: 1 }, Vec2::new(1.0, 2.0), Vec2::ZERO);
        let agent = world.agent(id).unwrap();
        let collider = world.colliders.get(agent.collider).unwrap();
        assert_eq!(collider.agent, Some(id));
        assert_eq!(collider.tag, Tag::Player);
        assert!(!collider.sensor);
        assert_eq!(agent.phase(), GrapplePhase::Idle);
        assert_eq!(agent.start_delay, 0.0);
    }

    #[test]
    fn test_ai_start_delay_in_range() {
        let mut world = SwingWorld::new(SwingConfig::default(), 7);
        for _ in 0..20 {
            let id = world.spawn_agent(AgentKind::Ai { target: None }, Vec2::ZERO, Vec2::ZERO);
            let delay = world.agent(id).unwrap().start_delay;
            assert!((0.3..=1.2).contains(&delay), "delay {delay}");
        }
    }

    #[test]
    fn test_ids_are_unique_and_sorted() {
        let mut world = SwingWorld::new(SwingConfig::default(), 1);
        let anchor = world.spawn_anchor(Vec2::Y, 0.5);
        let a = world.spawn_agent(AgentKind::Player { slot: 1 }, Vec2::ZERO, Vec2::ZERO);
        let b = world.spawn_agent(AgentKind::Ai { target: Some(a) }, Vec2::ZERO, Vec2::ZERO);
        assert!(anchor < a && a < b);
        let ids: Vec<u32> = world.agents.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert!(world.colliders.get(anchor).unwrap().sensor);
    }

    #[test]
    fn test_snapshot_reports_idle_agents() {
        let mut world = SwingWorld::new(SwingConfig::default(), 1);
        world.spawn_agent(AgentKind::Player { slot: 1 }, Vec2::X, Vec2::Y);
        let snapshot = world.snapshot();
        assert_eq!(snapshot.agents.len(), 1);
        let agent = &snapshot.agents[0];
        assert_eq!(agent.position, Vec2::X);
        assert_eq!(agent.phase, GrapplePhase::Idle);
        assert!(agent.anchor.is_none());
        assert_eq!(agent.spin_speed, 0.0);
    }

    #[test]
    fn test_sample_range_empty() {
        let mut rng = Pcg32::seed_from_u64(3);
        assert_eq!(sample_range(&mut rng, 2.0, 2.0), 2.0);
        let x = sample_range(&mut rng, 2.0, 5.0);
        assert!((2.0..=5.0).contains(&x));
    }
}
