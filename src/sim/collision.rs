//! Collision detection and response for the arcade-physics games
//!
//! Circles against circles (sandbox balls), circles against the arena walls,
//! and axis-aligned boxes (flappy bird vs pipes).

use glam::Vec2;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Unit normal, pointing from the first shape toward the second
    pub normal: Vec2,
    /// Overlap depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Bounding box of a circle
    pub fn around_circle(center: Vec2, radius: f32) -> Self {
        Self {
            min: center - Vec2::splat(radius),
            max: center + Vec2::splat(radius),
        }
    }

    /// Strict overlap (touching edges do not count)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.max.x > other.min.x
            && self.min.x < other.max.x
            && self.max.y > other.min.y
            && self.min.y < other.max.y
    }
}

/// Circle-circle overlap test
///
/// Coincident centers report a miss: there is no usable normal.
pub fn circle_circle_collision(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CollisionResult {
    let delta = b_pos - a_pos;
    let distance = delta.length();
    let min_distance = a_radius + b_radius;

    if distance >= min_distance || distance <= f32::EPSILON {
        return CollisionResult::miss();
    }

    let normal = delta / distance;
    CollisionResult {
        hit: true,
        normal,
        penetration: min_distance - distance,
    }
}

/// Reflect only the normal component, scaled by `restitution`
///
/// v' = v - (1 + e)(v·n)n; e = 1 is a perfect mirror.
#[inline]
pub fn bounce_velocity(velocity: Vec2, normal: Vec2, restitution: f32) -> Vec2 {
    velocity - (1.0 + restitution) * velocity.dot(normal) * normal
}

/// Keep a circle inside `[0, size]`, bouncing off any wall it crossed
///
/// Returns true if any wall was hit.
pub fn bounce_off_walls(pos: &mut Vec2, vel: &mut Vec2, radius: f32, size: Vec2, restitution: f32) -> bool {
    let mut hit = false;

    if pos.x - radius < 0.0 {
        pos.x = radius;
        *vel = bounce_velocity(*vel, Vec2::X, restitution);
        hit = true;
    }
    if pos.x + radius > size.x {
        pos.x = size.x - radius;
        *vel = bounce_velocity(*vel, Vec2::NEG_X, restitution);
        hit = true;
    }
    if pos.y - radius < 0.0 {
        pos.y = radius;
        *vel = bounce_velocity(*vel, Vec2::Y, restitution);
        hit = true;
    }
    if pos.y + radius > size.y {
        pos.y = size.y - radius;
        *vel = bounce_velocity(*vel, Vec2::NEG_Y, restitution);
        hit = true;
    }

    hit
}

/// Impulse magnitude for a two-body collision along `normal` (first → second)
///
/// `relative_vel` is `v_first - v_second`. Returns `None` when the bodies
/// are already separating.
pub fn collision_impulse(
    relative_vel: Vec2,
    normal: Vec2,
    inv_mass_a: f32,
    inv_mass_b: f32,
    restitution: f32,
) -> Option<f32> {
    let closing_speed = relative_vel.dot(normal);
    let inv_mass_sum = inv_mass_a + inv_mass_b;
    if closing_speed <= 0.0 || inv_mass_sum <= 0.0 {
        return None;
    }
    Some((1.0 + restitution) * closing_speed / inv_mass_sum)
}
