//! Fixed timestep simulation tick
//!
//! One tick runs, in order:
//! 1. Queued removals (forced releases for anything tethered to what is removed)
//! 2. Per-agent grapple logic, in ascending id order, against a position
//!    snapshot taken at the start of the phase
//! 3. The physics step (integrate, contacts, tether constraint)
//! 4. Rope visuals
//!
//! Contacts found in step 3 are what the release checks in step 2 of the
//! *next* tick see.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::Rng;

use super::collision::{Contact, resolve_contacts};
use super::release::{AiReleaseInput, PlayerReleaseInput, ReleaseCause, evaluate_ai, evaluate_player};
use super::rope::RopeVisual;
use super::selector::{SelectionPolicy, select};
use super::state::{Agent, AgentKind, GrapplePhase, GrappleState, Removal, SwingEvent, SwingWorld, sample_range};
use super::tether::{attach, detach};
use crate::angle_between_deg;
use crate::config::{AiConfig, PhysicsConfig, PlayerConfig, SwingConfig};
use crate::sim::physics::ColliderSet;

/// Grapple button press for one player agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrappleToggle {
    pub agent: u32,
    /// Aim direction for anchor scoring, `PlayerConfig::aim` when absent
    pub aim: Option<Vec2>,
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Grapple toggles pressed since the last tick
    pub toggles: Vec<GrappleToggle>,
    /// Game over: agents stop making grapple decisions, physics keeps running
    pub game_ended: bool,
}

impl TickInput {
    /// Input with a single toggle for `agent`
    pub fn toggle(agent: u32) -> Self {
        Self {
            toggles: vec![GrappleToggle { agent, aim: None }],
            game_ended: false,
        }
    }

    fn toggle_for(&self, agent: u32) -> Option<&GrappleToggle> {
        self.toggles.iter().find(|t| t.agent == agent)
    }
}

/// Advance the world by one fixed timestep
pub fn tick<R: Rng, V: RopeVisual>(world: &mut SwingWorld<R, V>, input: &TickInput, dt: f32) {
    world.time_ticks += 1;

    process_removals(world);

    let contacts = std::mem::take(&mut world.contacts);
    if !input.game_ended {
        update_agents(world, input, &contacts, dt);
    }

    step_physics(world, dt);
    update_ropes(world);
}

/// Drop the tether and report why
fn release(agent: &mut Agent, cause: ReleaseCause, lockout_time: f32, events: &mut Vec<SwingEvent>) {
    if detach(agent, lockout_time).is_none() {
        return;
    }
    let locked_out = agent.phase() == GrapplePhase::Locked;
    log::info!(
        "Agent {} released ({:?}){}",
        agent.id,
        cause,
        if locked_out { ", locked out" } else { "" }
    );
    events.push(SwingEvent::Released {
        agent: agent.id,
        cause,
        locked_out,
    });
}

/// Lockout applied for `cause` given the agent's kind
fn lockout_for(kind: AgentKind, cause: ReleaseCause, config: &SwingConfig) -> f32 {
    match kind {
        AgentKind::Player { .. } => config.player.grapple.lockout_time,
        AgentKind::Ai { .. } => ai_lockout(cause, &config.ai),
    }
}

fn ai_lockout(cause: ReleaseCause, config: &AiConfig) -> f32 {
    if cause.ai_locks_out() {
        config.grapple.lockout_time
    } else {
        0.0
    }
}

fn process_removals<R: Rng, V: RopeVisual>(world: &mut SwingWorld<R, V>) {
    let removals = std::mem::take(&mut world.removals);
    for removal in removals {
        match removal {
            Removal::Collider(id) => remove_collider(world, id),
            Removal::Agent(id) => remove_agent(world, id),
        }
    }
}

fn remove_collider<R: Rng, V: RopeVisual>(world: &mut SwingWorld<R, V>, id: u32) {
    if world.colliders.get(id).is_some_and(|c| c.agent.is_some()) {
        log::warn!("Collider {} belongs to an agent, despawn the agent instead", id);
        return;
    }
    if world.colliders.remove(id).is_none() {
        return;
    }
    world.touching.retain(|&(a, b)| a != id && b != id);

    for agent in world.agents.iter_mut() {
        if agent.anchor_collider() == Some(id) {
            let lockout = lockout_for(agent.kind, ReleaseCause::AnchorLost, &world.config);
            release(agent, ReleaseCause::AnchorLost, lockout, &mut world.events);
        }
    }
    log::debug!("Removed collider {}", id);
}

fn remove_agent<R: Rng, V: RopeVisual>(world: &mut SwingWorld<R, V>, id: u32) {
    let Some(idx) = world.agents.iter().position(|a| a.id == id) else {
        return;
    };
    let mut agent = world.agents.remove(idx);
    release(&mut agent, ReleaseCause::AgentRemoved, 0.0, &mut world.events);
    world.colliders.remove(agent.collider);
    world.touching.retain(|&(a, b)| a != agent.collider && b != agent.collider);
    world.contacts.retain(|c| c.agent != id && c.other != agent.collider);
    world.rope.clear(id);

    // Anyone chasing the removed agent lets go
    for other in world.agents.iter_mut() {
        let chasing = matches!(other.kind, AgentKind::Ai { target: Some(t) } if t == id);
        if chasing {
            other.kind = AgentKind::Ai { target: None };
            let lockout = lockout_for(other.kind, ReleaseCause::TargetLost, &world.config);
            release(other, ReleaseCause::TargetLost, lockout, &mut world.events);
        }
    }
    log::info!("Removed agent {}", id);
}

fn update_agents<R: Rng, V: RopeVisual>(
    world: &mut SwingWorld<R, V>,
    input: &TickInput,
    contacts: &[Contact],
    dt: f32,
) {
    // Targets are read from where everyone stood before anyone acted
    let positions: BTreeMap<u32, Vec2> = world.agents.iter().map(|a| (a.id, a.body.pos)).collect();

    for agent in world.agents.iter_mut() {
        match agent.kind {
            AgentKind::Player { .. } => {
                let toggle = input.toggle_for(agent.id);
                update_player(
                    agent,
                    toggle,
                    contacts,
                    &world.colliders,
                    &world.config.player,
                    &mut world.events,
                    dt,
                );
            }
            AgentKind::Ai { target } => {
                let target_pos = target.and_then(|t| positions.get(&t).copied());
                update_ai(
                    agent,
                    target_pos,
                    contacts,
                    &world.colliders,
                    &world.config.ai,
                    &mut world.rng,
                    &mut world.events,
                    dt,
                );
            }
        }
    }
}

fn advance_lockout(agent: &mut Agent, dt: f32, events: &mut Vec<SwingEvent>) {
    if let GrappleState::Locked(timer) = &mut agent.grapple {
        if timer.tick(dt) {
            agent.grapple = GrappleState::Idle;
            log::info!("Agent {} lockout expired", agent.id);
            events.push(SwingEvent::LockoutExpired { agent: agent.id });
        }
    }
}

fn report_attach(agent: &Agent, events: &mut Vec<SwingEvent>) {
    if let Some(tether) = agent.grapple.tether() {
        log::info!(
            "Agent {} attached to collider {} at {} (rope {:.2})",
            agent.id,
            tether.anchor_collider,
            tether.anchor(),
            tether.distance()
        );
        events.push(SwingEvent::Attached {
            agent: agent.id,
            anchor: tether.anchor_collider,
            point: tether.anchor(),
            distance: tether.distance(),
        });
    }
}

#[allow(clippy::too_many_arguments)]
fn update_ai<R: Rng>(
    agent: &mut Agent,
    target_pos: Option<Vec2>,
    contacts: &[Contact],
    colliders: &ColliderSet,
    config: &AiConfig,
    rng: &mut R,
    events: &mut Vec<SwingEvent>,
    dt: f32,
) {
    if agent.start_delay > 0.0 {
        agent.start_delay = (agent.start_delay - dt).max(0.0);
        if agent.start_delay > 0.0 {
            return;
        }
    }
    advance_lockout(agent, dt, events);

    // No target, nothing to steer toward
    let Some(target_pos) = target_pos else {
        if matches!(agent.grapple, GrappleState::Attached(_)) {
            release(agent, ReleaseCause::TargetLost, 0.0, events);
        }
        return;
    };

    if let GrappleState::Attached(grapple) = &mut agent.grapple {
        let anchor = grapple.tether.anchor();
        let input = AiReleaseInput {
            collided: contacts.iter().any(|c| c.agent == agent.id),
            tangential_speed: grapple.spin.tangential_speed(&agent.body, anchor),
            angle_to_target: angle_between_deg(agent.body.vel, target_pos - agent.body.pos),
        };
        match evaluate_ai(&mut grapple.release, &input, config, dt) {
            Some(cause) => release(agent, cause, ai_lockout(cause, config), events),
            None => grapple.spin.step(
                &mut agent.body,
                anchor,
                config.grapple.rotation_acceleration,
                config.grapple.max_spin_speed,
                dt,
            ),
        }
        return;
    }

    if agent.grapple.is_idle() {
        let origin = agent.body.pos;
        let policy = SelectionPolicy::NearestToward {
            toward: target_pos - origin,
        };
        let grapple = &config.grapple;
        match select(colliders, origin, policy, grapple.search_radius, grapple.layers, Some(agent.collider)) {
            Some(candidate) => {
                let duration = sample_range(rng, config.min_grapple_time, config.max_grapple_time);
                if attach(agent, candidate, grapple.min_rope_length, Some(duration)) {
                    report_attach(agent, events);
                }
            }
            None => {
                log::debug!("Agent {} found no grapple point toward its target", agent.id);
                events.push(SwingEvent::SelectionFailed { agent: agent.id });
            }
        }
    }
}

fn update_player(
    agent: &mut Agent,
    toggle: Option<&GrappleToggle>,
    contacts: &[Contact],
    colliders: &ColliderSet,
    config: &PlayerConfig,
    events: &mut Vec<SwingEvent>,
    dt: f32,
) {
    advance_lockout(agent, dt, events);

    match agent.phase() {
        GrapplePhase::Attached => player_attached(agent, toggle.is_some(), contacts, config, events, dt),
        GrapplePhase::Idle => {
            let Some(toggle) = toggle else {
                return;
            };
            let origin = agent.body.pos;
            let policy = SelectionPolicy::Scored {
                aim: toggle.aim.unwrap_or(config.aim),
            };
            let grapple = &config.grapple;
            match select(colliders, origin, policy, grapple.search_radius, grapple.layers, Some(agent.collider)) {
                Some(candidate) => {
                    if attach(agent, candidate, grapple.min_rope_length, None) {
                        report_attach(agent, events);
                    }
                }
                None => {
                    log::debug!("Player agent {} found no grapple point", agent.id);
                    events.push(SwingEvent::SelectionFailed { agent: agent.id });
                }
            }
        }
        GrapplePhase::Locked => {
            if toggle.is_some() {
                log::debug!(
                    "Player agent {} toggle ignored, locked out for {:.2}s",
                    agent.id,
                    agent.grapple.lockout_remaining()
                );
            }
        }
    }
}

fn player_attached(
    agent: &mut Agent,
    toggled: bool,
    contacts: &[Contact],
    config: &PlayerConfig,
    events: &mut Vec<SwingEvent>,
    dt: f32,
) {
    let input = PlayerReleaseInput {
        toggled,
        hazard_contact: contacts
            .iter()
            .any(|c| c.agent == agent.id && config.is_hazard(c.tag)),
        speed: agent.body.speed(),
    };
    if let Some(cause) = evaluate_player(&input, config) {
        release(agent, cause, config.grapple.lockout_time, events);
        return;
    }

    let GrappleState::Attached(grapple) = &mut agent.grapple else {
        return;
    };
    grapple.release.elapsed += dt;
    let anchor = grapple.tether.anchor();
    grapple.spin.step(
        &mut agent.body,
        anchor,
        config.grapple.rotation_acceleration,
        config.grapple.max_spin_speed,
        dt,
    );
}

fn step_physics<R: Rng, V: RopeVisual>(world: &mut SwingWorld<R, V>, dt: f32) {
    let PhysicsConfig {
        gravity, restitution, ..
    } = world.config.physics;

    for agent in world.agents.iter_mut() {
        agent.body.integrate(dt, gravity);
    }

    let contacts = resolve_contacts(&mut world.agents, &world.colliders, restitution, &mut world.touching);

    for agent in world.agents.iter_mut() {
        if let Some(tether) = agent.grapple.tether() {
            let joint = tether.joint;
            joint.solve(&mut agent.body);
        }
        if let Some(collider) = world.colliders.get_mut(agent.collider) {
            collider.center = agent.body.pos;
        }
    }

    for contact in &contacts {
        log::trace!("Agent {} touched collider {} ({:?})", contact.agent, contact.other, contact.tag);
        world.events.push(SwingEvent::Contact(*contact));
    }
    world.contacts = contacts;
}

fn update_ropes<R: Rng, V: RopeVisual>(world: &mut SwingWorld<R, V>) {
    for agent in &world.agents {
        match agent.grapple.tether() {
            Some(tether) => world.rope.set_endpoints(agent.id, agent.body.pos, tether.anchor()),
            None => world.rope.clear(agent.id),
        }
    }
}

/// Accumulates frame time and runs whole fixed steps
///
/// Frame time beyond `max_substeps` steps is dropped so a long stall cannot
/// snowball into ever longer frames.
#[derive(Debug, Clone)]
pub struct FixedStepper {
    dt: f32,
    max_substeps: u32,
    accumulator: f32,
}

impl FixedStepper {
    pub fn new(dt: f32, max_substeps: u32) -> Self {
        Self {
            dt,
            max_substeps,
            accumulator: 0.0,
        }
    }

    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self::new(config.fixed_dt, config.max_substeps)
    }

    #[inline]
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Add `frame_dt` seconds and call `step` once per whole fixed step.
    /// Returns the number of steps taken.
    pub fn advance(&mut self, frame_dt: f32, mut step: impl FnMut(f32)) -> u32 {
        self.accumulator += frame_dt.max(0.0);
        let mut substeps = 0;
        while self.accumulator >= self.dt && substeps < self.max_substeps {
            step(self.dt);
            self.accumulator -= self.dt;
            substeps += 1;
        }
        if substeps == self.max_substeps && self.accumulator >= self.dt {
            log::warn!("Dropping {:.3}s of simulation time", self.accumulator);
            self.accumulator %= self.dt;
        }
        substeps
    }

    /// Fraction of a step left in the accumulator, for render interpolation
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }
}
