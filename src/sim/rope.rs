//! Rope rendering hand-off
//!
//! The simulation never draws anything. Every tick it tells a [`RopeVisual`]
//! where each attached agent's rope runs, and clears the rope of every agent
//! that is not attached.

use std::collections::BTreeMap;

use glam::Vec2;

/// Receiver for rope line updates
pub trait RopeVisual {
    /// Rope of `agent` runs from `from` (the agent) to `to` (the anchor)
    fn set_endpoints(&mut self, agent: u32, from: Vec2, to: Vec2);
    /// `agent` has no rope. Must be safe to call repeatedly.
    fn clear(&mut self, agent: u32);
}

impl<T: RopeVisual + ?Sized> RopeVisual for Box<T> {
    fn set_endpoints(&mut self, agent: u32, from: Vec2, to: Vec2) {
        (**self).set_endpoints(agent, from, to);
    }

    fn clear(&mut self, agent: u32) {
        (**self).clear(agent);
    }
}

/// Two-point polylines per agent, ready for a renderer to draw
#[derive(Debug, Clone, Default)]
pub struct RopeLines {
    lines: BTreeMap<u32, [Vec2; 2]>,
}

impl RopeLines {
    pub fn get(&self, agent: u32) -> Option<[Vec2; 2]> {
        self.lines.get(&agent).copied()
    }

    /// Visible ropes by agent id
    pub fn iter(&self) -> impl Iterator<Item = (u32, [Vec2; 2])> + '_ {
        self.lines.iter().map(|(id, line)| (*id, *line))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl RopeVisual for RopeLines {
    fn set_endpoints(&mut self, agent: u32, from: Vec2, to: Vec2) {
        self.lines.insert(agent, [from, to]);
    }

    fn clear(&mut self, agent: u32) {
        self.lines.remove(&agent);
    }
}

/// Discards all rope updates (headless runs)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRope;

impl RopeVisual for NoRope {
    fn set_endpoints(&mut self, _agent: u32, _from: Vec2, _to: Vec2) {}

    fn clear(&mut self, _agent: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rope_lines_set_and_clear() {
        let mut ropes = RopeLines::default();
        ropes.set_endpoints(3, Vec2::ZERO, Vec2::Y);
        assert_eq!(ropes.get(3), Some([Vec2::ZERO, Vec2::Y]));

        ropes.set_endpoints(3, Vec2::X, Vec2::Y);
        assert_eq!(ropes.len(), 1);
        assert_eq!(ropes.get(3), Some([Vec2::X, Vec2::Y]));

        ropes.clear(3);
        ropes.clear(3);
        assert!(ropes.is_empty());
    }

    #[test]
    fn test_boxed_visual_forwards() {
        let mut ropes: Box<dyn RopeVisual> = Box::new(NoRope);
        ropes.set_endpoints(1, Vec2::ZERO, Vec2::X);
        ropes.clear(1);
    }
}
