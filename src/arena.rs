//! Demo arena construction
//!
//! Lays out a field of grapple points over a drop, scatters the player and
//! the enemies across a spawn box without overlap, and watches a lose zone
//! at the bottom.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sim::{AgentKind, RopeVisual, SwingWorld};

/// Arena geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaLayout {
    /// Spawn box, bottom-left corner
    pub spawn_min: Vec2,
    /// Spawn box, top-right corner
    pub spawn_max: Vec2,
    /// Spawned agents are at least this far apart
    pub spawn_spacing: f32,
    /// Tries per agent before giving up on a spawn position
    pub spawn_attempts: u32,
    /// Grapple point grid
    pub anchor_origin: Vec2,
    pub anchor_spacing: Vec2,
    pub anchor_rows: u32,
    pub anchor_columns: u32,
    pub anchor_radius: f32,
    /// Solid bumpers between the anchor rows
    pub obstacles: Vec<(Vec2, f32)>,
    /// Agents falling below this height are out
    pub lose_zone_y: f32,
}

impl Default for ArenaLayout {
    fn default() -> Self {
        Self {
            spawn_min: Vec2::new(-12.0, 2.0),
            spawn_max: Vec2::new(12.0, 6.0),
            spawn_spacing: 1.5,
            spawn_attempts: 50,
            anchor_origin: Vec2::new(-15.0, 8.0),
            anchor_spacing: Vec2::new(5.0, 4.0),
            anchor_rows: 3,
            anchor_columns: 7,
            anchor_radius: 0.4,
            obstacles: vec![(Vec2::new(-7.5, 10.0), 1.0), (Vec2::new(7.5, 10.0), 1.0)],
            lose_zone_y: -20.0,
        }
    }
}

/// Random positions inside `[min, max]`, each at least `min_distance` from the
/// ones placed before it.
///
/// An entry is `None` when no free spot turned up in `max_attempts` tries.
pub fn scatter_positions<R: Rng>(
    rng: &mut R,
    min: Vec2,
    max: Vec2,
    count: usize,
    min_distance: f32,
    max_attempts: u32,
) -> Vec<Option<Vec2>> {
    let mut placed: Vec<Vec2> = Vec::with_capacity(count);
    let mut result = Vec::with_capacity(count);

    for i in 0..count {
        let mut found = None;
        for _ in 0..max_attempts {
            let candidate = Vec2::new(uniform(rng, min.x, max.x), uniform(rng, min.y, max.y));
            if placed.iter().all(|p| p.distance(candidate) >= min_distance) {
                found = Some(candidate);
                break;
            }
        }
        match found {
            Some(pos) => placed.push(pos),
            None => log::warn!("Spawn {} could not find a free position", i),
        }
        result.push(found);
    }
    result
}

fn uniform<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    if max > min { rng.random_range(min..max) } else { min }
}

/// What fell into the lose zone this check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoseReport {
    pub removed: Vec<u32>,
    /// The player was among them
    pub player_lost: bool,
}

/// Handles to everything the demo scene spawned
#[derive(Debug, Clone)]
pub struct Arena {
    pub layout: ArenaLayout,
    pub player: u32,
    pub enemies: Vec<u32>,
    pub anchors: Vec<u32>,
    pub obstacles: Vec<u32>,
    /// Agents already sent for removal
    lost: BTreeSet<u32>,
    /// World tick on which the player fell
    ended_at: Option<u64>,
}

impl Arena {
    /// Populate `world` with the demo scene: one player and `enemies` AI agents
    /// all chasing the player.
    ///
    /// Agents that could not be placed are not spawned.
    pub fn build<R: Rng, V: RopeVisual>(world: &mut SwingWorld<R, V>, layout: ArenaLayout, enemies: usize) -> Self {
        let mut anchors = Vec::new();
        for row in 0..layout.anchor_rows {
            for col in 0..layout.anchor_columns {
                // Offset every other row so the grid reads as a lattice
                let shift = if row % 2 == 1 { 0.5 } else { 0.0 };
                let center = layout.anchor_origin
                    + Vec2::new(
                        (col as f32 + shift) * layout.anchor_spacing.x,
                        row as f32 * layout.anchor_spacing.y,
                    );
                anchors.push(world.spawn_anchor(center, layout.anchor_radius));
            }
        }

        let obstacles = layout
            .obstacles
            .iter()
            .map(|&(center, radius)| world.spawn_obstacle(center, radius))
            .collect();

        let spots = scatter_positions(
            &mut world.rng,
            layout.spawn_min,
            layout.spawn_max,
            enemies + 1,
            layout.spawn_spacing,
            layout.spawn_attempts,
        );
        let mut spots = spots.into_iter();

        let player_pos = spots.next().flatten().unwrap_or((layout.spawn_min + layout.spawn_max) * 0.5);
        let player = world.spawn_agent(AgentKind::Player { slot: 1 }, player_pos, Vec2::ZERO);

        let enemies = spots
            .flatten()
            .map(|pos| world.spawn_agent(AgentKind::Ai { target: Some(player) }, pos, Vec2::ZERO))
            .collect::<Vec<_>>();

        log::info!(
            "Arena ready: {} anchors, {} enemies, player {}",
            anchors.len(),
            enemies.len(),
            player
        );

        Self {
            layout,
            player,
            enemies,
            anchors,
            obstacles,
            lost: BTreeSet::new(),
            ended_at: None,
        }
    }

    pub fn game_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Tick the player was lost on, if the game has ended
    pub fn ended_at_tick(&self) -> Option<u64> {
        self.ended_at
    }

    /// Queue removal of every agent below the lose line.
    ///
    /// Losing the player ends the game. Once ended, nothing more is removed.
    pub fn check_lose_zone<R: Rng, V: RopeVisual>(&mut self, world: &mut SwingWorld<R, V>) -> LoseReport {
        let mut report = LoseReport::default();
        if self.game_ended() {
            return report;
        }

        let fallen: Vec<u32> = world
            .agents
            .iter()
            .filter(|a| a.body.pos.y < self.layout.lose_zone_y && !self.lost.contains(&a.id))
            .map(|a| a.id)
            .collect();

        for id in fallen {
            world.despawn_agent(id);
            self.lost.insert(id);
            if id == self.player {
                log::info!("Player {} entered the lose zone", id);
                report.player_lost = true;
                self.ended_at = Some(world.time_ticks);
            } else {
                log::info!("Enemy {} entered the lose zone", id);
            }
            report.removed.push(id);
        }
        report
    }
}
