//! Anchor selection
//!
//! Picks one grapple point out of everything a circle query returns. Two
//! policies exist: AI agents take the nearest anchor that lies toward their
//! target, players score anchors on closeness and alignment with their aim.
//!
//! Candidates are visited in query order (ascending collider id) and a later
//! candidate must be strictly better to replace the current best, so ties go
//! to the lowest collider id.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::LayerMask;
use crate::angle_between_deg;
use crate::consts::{AI_ANCHOR_MAX_ANGLE, ALIGNMENT_WEIGHT, DISTANCE_WEIGHT};

/// A possible grapple point, valid only for the tick it was queried in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorCandidate {
    /// Collider the point belongs to
    pub collider: u32,
    /// World-space point the tether would attach to
    pub point: Vec2,
}

/// Read-only circle query over world colliders
pub trait SpatialQuery {
    /// All candidates within `radius` of `center` on a layer in `mask`.
    /// Ordering must be stable within a tick.
    fn query_circle(&self, center: Vec2, radius: f32, mask: LayerMask) -> Vec<AnchorCandidate>;
}

/// Which selection rule to apply
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionPolicy {
    /// Nearest anchor within 90° of `toward` (AI)
    NearestToward { toward: Vec2 },
    /// Best weighted score of alignment with `aim` and closeness (player)
    Scored { aim: Vec2 },
}

/// Choose an anchor for an agent at `origin`
///
/// `exclude` is the agent's own collider. Returns `None` when nothing qualifies;
/// the caller just doesn't attach this tick.
pub fn select(
    query: &impl SpatialQuery,
    origin: Vec2,
    policy: SelectionPolicy,
    search_radius: f32,
    mask: LayerMask,
    exclude: Option<u32>,
) -> Option<AnchorCandidate> {
    let candidates = query
        .query_circle(origin, search_radius, mask)
        .into_iter()
        .filter(|c| Some(c.collider) != exclude);

    match policy {
        SelectionPolicy::NearestToward { toward } => nearest_toward(candidates, origin, toward),
        SelectionPolicy::Scored { aim } => best_scored(candidates, origin, aim, search_radius),
    }
}

fn nearest_toward(
    candidates: impl Iterator<Item = AnchorCandidate>,
    origin: Vec2,
    toward: Vec2,
) -> Option<AnchorCandidate> {
    let mut best: Option<(AnchorCandidate, f32)> = None;
    for candidate in candidates {
        let to_point = candidate.point - origin;
        let in_front = angle_between_deg(toward, to_point).is_some_and(|a| a < AI_ANCHOR_MAX_ANGLE);
        if !in_front {
            continue;
        }
        let dist = to_point.length();
        if best.is_none_or(|(_, best_dist)| dist < best_dist) {
            best = Some((candidate, dist));
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Player anchor score: alignment with aim plus closeness, both weighted
pub fn anchor_score(origin: Vec2, point: Vec2, aim: Vec2, search_radius: f32) -> f32 {
    let to_anchor = point - origin;
    let align = to_anchor.normalize_or_zero().dot(aim);
    let normalized_distance = if search_radius > 0.0 {
        (to_anchor.length() / search_radius).clamp(0.0, 1.0)
    } else {
        1.0
    };
    ALIGNMENT_WEIGHT * align + DISTANCE_WEIGHT * (1.0 - normalized_distance)
}

fn best_scored(
    candidates: impl Iterator<Item = AnchorCandidate>,
    origin: Vec2,
    aim: Vec2,
    search_radius: f32,
) -> Option<AnchorCandidate> {
    let mut best: Option<(AnchorCandidate, f32)> = None;
    for candidate in candidates {
        let score = anchor_score(origin, candidate.point, aim, search_radius);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }
    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed candidate list, returned in insertion order
    struct Points(Vec<AnchorCandidate>);

    impl SpatialQuery for Points {
        fn query_circle(&self, center: Vec2, radius: f32, _mask: LayerMask) -> Vec<AnchorCandidate> {
            self.0
                .iter()
                .copied()
                .filter(|c| c.point.distance(center) <= radius)
                .collect()
        }
    }

    fn pt(collider: u32, x: f32, y: f32) -> AnchorCandidate {
        AnchorCandidate {
            collider,
            point: Vec2::new(x, y),
        }
    }

    #[test]
    fn test_ai_picks_nearest_in_front() {
        let world = Points(vec![pt(1, 5.0, 0.0), pt(2, 2.0, 0.5), pt(3, -1.0, 0.0)]);
        let policy = SelectionPolicy::NearestToward { toward: Vec2::X };
        let chosen = select(&world, Vec2::ZERO, policy, 10.0, LayerMask::ALL, None).unwrap();
        // 3 is closest but behind
        assert_eq!(chosen.collider, 2);
    }

    #[test]
    fn test_ai_rejects_perpendicular_anchor() {
        let world = Points(vec![pt(1, 0.0, 3.0)]);
        let policy = SelectionPolicy::NearestToward { toward: Vec2::X };
        assert!(select(&world, Vec2::ZERO, policy, 10.0, LayerMask::ALL, None).is_none());
    }

    #[test]
    fn test_ai_fails_without_target_direction() {
        let world = Points(vec![pt(1, 1.0, 0.0)]);
        let policy = SelectionPolicy::NearestToward { toward: Vec2::ZERO };
        assert!(select(&world, Vec2::ZERO, policy, 10.0, LayerMask::ALL, None).is_none());
    }

    #[test]
    fn test_player_prefers_close_over_aligned() {
        // Aligned but at the edge of range vs close but sideways
        let world = Points(vec![pt(1, 0.0, 9.0), pt(2, 1.0, 0.0)]);
        let policy = SelectionPolicy::Scored { aim: Vec2::Y };
        let chosen = select(&world, Vec2::ZERO, policy, 10.0, LayerMask::ALL, None).unwrap();
        assert_eq!(chosen.collider, 2);
    }

    #[test]
    fn test_player_alignment_breaks_equal_distance() {
        let world = Points(vec![pt(1, 0.0, -3.0), pt(2, 0.0, 3.0)]);
        let policy = SelectionPolicy::Scored { aim: Vec2::Y };
        let chosen = select(&world, Vec2::ZERO, policy, 10.0, LayerMask::ALL, None).unwrap();
        assert_eq!(chosen.collider, 2);
    }

    #[test]
    fn test_score_formula() {
        let score = anchor_score(Vec2::ZERO, Vec2::new(0.0, 5.0), Vec2::Y, 10.0);
        // 0.3 * 1 + 0.7 * 0.5
        assert!((score - 0.65).abs() < 1e-5);
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        let world = Points(vec![pt(4, 3.0, 0.0), pt(7, 3.0, 0.0)]);
        let ai = SelectionPolicy::NearestToward { toward: Vec2::X };
        assert_eq!(select(&world, Vec2::ZERO, ai, 10.0, LayerMask::ALL, None).unwrap().collider, 4);
        let player = SelectionPolicy::Scored { aim: Vec2::X };
        assert_eq!(select(&world, Vec2::ZERO, player, 10.0, LayerMask::ALL, None).unwrap().collider, 4);
    }

    #[test]
    fn test_excludes_own_collider() {
        let world = Points(vec![pt(1, 0.5, 0.0), pt(2, 4.0, 0.0)]);
        let policy = SelectionPolicy::Scored { aim: Vec2::X };
        let chosen = select(&world, Vec2::ZERO, policy, 10.0, LayerMask::ALL, Some(1)).unwrap();
        assert_eq!(chosen.collider, 2);
    }

    #[test]
    fn test_empty_query_is_no_selection() {
        let world = Points(Vec::new());
        let policy = SelectionPolicy::Scored { aim: Vec2::Y };
        assert!(select(&world, Vec2::ZERO, policy, 10.0, LayerMask::ALL, None).is_none());
    }
}
