//! Collision detection and response for circle colliders
//!
//! Agents are circles, obstacles are circles. Contacts are pushed apart along
//! the contact normal and only the approaching part of the velocity is
//! reflected. A contact is reported once, on the step the pair starts
//! touching, mirroring an "on collision enter" callback.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{ColliderSet, Tag};
use super::state::Agent;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the surface of the second shape
    pub point: Vec2,
    /// Surface normal, pointing from the second shape toward the first
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// A contact that started this step, reported from the agent's point of view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Agent that was hit
    pub agent: u32,
    /// Collider it ran into
    pub other: u32,
    /// Tag of that collider
    pub tag: Tag,
}

/// Check collision between circle `a` and circle `b`
pub fn circle_circle_collision(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CollisionResult {
    let offset = a_pos - b_pos;
    let dist = offset.length();
    let reach = a_radius + b_radius;
    if dist >= reach {
        return CollisionResult::miss();
    }

    // Concentric circles have no natural normal, pick one
    let normal = if dist > f32::EPSILON { offset / dist } else { Vec2::Y };
    CollisionResult {
        hit: true,
        point: b_pos + normal * b_radius,
        normal,
        penetration: reach - dist,
    }
}

/// Remove the approaching normal component of `velocity`, scaled by restitution
#[inline]
fn bounce(velocity: Vec2, normal: Vec2, restitution: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    if vn < 0.0 {
        velocity - (1.0 + restitution) * vn * normal
    } else {
        velocity
    }
}

#[inline]
fn pair_key(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

/// Resolve all agent contacts for one step
///
/// Sensors never collide, and an agent never collides with the collider its
/// tether is anchored to. `touching` carries the set of touching pairs between
/// steps so that only new contacts are returned.
pub fn resolve_contacts(
    agents: &mut [Agent],
    colliders: &ColliderSet,
    restitution: f32,
    touching: &mut BTreeSet<(u32, u32)>,
) -> Vec<Contact> {
    let mut now_touching = BTreeSet::new();
    let mut contacts = Vec::new();

    // --- Agents vs static obstacles ---
    for agent in agents.iter_mut() {
        let ignored = agent.anchor_collider();
        for col in colliders.iter() {
            if col.sensor || col.agent.is_some() || Some(col.id) == ignored {
                continue;
            }
            let result = circle_circle_collision(agent.body.pos, agent.radius, col.center, col.radius);
            if !result.hit {
                continue;
            }

            agent.body.pos += result.normal * result.penetration;
            agent.body.vel = bounce(agent.body.vel, result.normal, restitution);

            let key = pair_key(agent.collider, col.id);
            if !touching.contains(&key) {
                contacts.push(Contact {
                    agent: agent.id,
                    other: col.id,
                    tag: col.tag,
                });
            }
            now_touching.insert(key);
        }
    }

    // --- Agents vs agents ---
    for j in 1..agents.len() {
        let (left, right) = agents.split_at_mut(j);
        let b = &mut right[0];
        for a in left.iter_mut() {
            if a.anchor_collider() == Some(b.collider) || b.anchor_collider() == Some(a.collider) {
                continue;
            }
            let result = circle_circle_collision(a.body.pos, a.radius, b.body.pos, b.radius);
            if !result.hit {
                continue;
            }

            let inv_a = 1.0 / a.body.mass;
            let inv_b = 1.0 / b.body.mass;
            let inv_sum = inv_a + inv_b;

            // Split the correction by inverse mass
            a.body.pos += result.normal * result.penetration * (inv_a / inv_sum);
            b.body.pos -= result.normal * result.penetration * (inv_b / inv_sum);

            let approach = (a.body.vel - b.body.vel).dot(result.normal);
            if approach < 0.0 {
                let impulse = -(1.0 + restitution) * approach / inv_sum;
                a.body.vel += result.normal * impulse * inv_a;
                b.body.vel -= result.normal * impulse * inv_b;
            }

            let key = pair_key(a.collider, b.collider);
            if !touching.contains(&key) {
                contacts.push(Contact {
                    agent: a.id,
                    other: b.collider,
                    tag: b.tag(),
                });
                contacts.push(Contact {
                    agent: b.id,
                    other: a.collider,
                    tag: a.tag(),
                });
            }
            now_touching.insert(key);
        }
    }

    *touching = now_touching;
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_collision_hit() {
        let result = circle_circle_collision(Vec2::new(1.5, 0.0), 1.0, Vec2::ZERO, 1.0);
        assert!(result.hit);
        assert!((result.normal - Vec2::X).length() < 1e-5);
        assert!((result.penetration - 0.5).abs() < 1e-5);
        assert!((result.point - Vec2::X).length() < 1e-5);
    }

    #[test]
    fn test_circle_collision_miss() {
        let result = circle_circle_collision(Vec2::new(2.5, 0.0), 1.0, Vec2::ZERO, 1.0);
        assert!(!result.hit);
    }

    #[test]
    fn test_circle_collision_concentric() {
        let result = circle_circle_collision(Vec2::ZERO, 1.0, Vec2::ZERO, 1.0);
        assert!(result.hit);
        assert!((result.normal.length() - 1.0).abs() < 1e-5);
        assert!((result.penetration - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_full_restitution_reflects() {
        // Moving right, hits a wall whose normal points left
        let reflected = bounce(Vec2::new(100.0, 3.0), Vec2::new(-1.0, 0.0), 1.0);
        assert!((reflected.x + 100.0).abs() < 0.001);
        assert!((reflected.y - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_bounce_ignores_separating_velocity() {
        let v = Vec2::new(1.0, 2.0);
        assert_eq!(bounce(v, Vec2::Y, 0.5), v);
        let stopped = bounce(Vec2::new(1.0, -2.0), Vec2::Y, 0.0);
        assert!((stopped - Vec2::new(1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        assert_eq!(pair_key(3, 7), pair_key(7, 3));
    }
}
