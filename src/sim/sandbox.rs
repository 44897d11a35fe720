//! Physics sandbox
//!
//! Click-to-spawn balls under gravity with friction, wall bounces and
//! pairwise elastic collisions. Unscored; runs until cleared.

use glam::Vec2;
use serde::Serialize;

use super::collision::{bounce_off_walls, circle_circle_collision, collision_impulse};
use super::rng::SimRng;

/// Downward acceleration per step (when enabled)
pub const GRAVITY: f32 = 0.3;
/// Velocity retained per step
pub const FRICTION: f32 = 0.99;
/// Wall restitution
pub const WALL_BOUNCE: f32 = 0.8;
/// Ball-ball restitution
pub const BALL_RESTITUTION: f32 = 0.9;

pub const MIN_RADIUS: f32 = 15.0;
pub const MAX_RADIUS: f32 = 40.0;
/// Spawned balls beyond this evict the oldest
pub const MAX_BALLS: usize = 64;

/// A simulated ball
#[derive(Debug, Clone, Serialize)]
pub struct Ball {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Mass derived from radius²
    pub mass: f32,
}

impl Ball {
    pub fn new(id: u32, pos: Vec2, vel: Vec2, radius: f32) -> Self {
        Self {
            id,
            pos,
            vel,
            radius,
            mass: radius * radius,
        }
    }

    pub fn momentum(&self) -> Vec2 {
        self.vel * self.mass
    }

    fn inv_mass(&self) -> f32 {
        if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 }
    }
}

/// Resolve one ball pair: de-overlap symmetrically, then exchange impulse
///
/// Returns true if the pair was touching.
pub fn resolve_pair(a: &mut Ball, b: &mut Ball, restitution: f32) -> bool {
    let contact = circle_circle_collision(a.pos, a.radius, b.pos, b.radius);
    if !contact.hit {
        return false;
    }

    let half = contact.normal * (contact.penetration / 2.0);
    a.pos -= half;
    b.pos += half;

    if let Some(j) = collision_impulse(
        a.vel - b.vel,
        contact.normal,
        a.inv_mass(),
        b.inv_mass(),
        restitution,
    ) {
        a.vel -= contact.normal * (j * a.inv_mass());
        b.vel += contact.normal * (j * b.inv_mass());
    }
    true
}

/// Sandbox world
#[derive(Debug, Clone, Serialize)]
pub struct Sandbox {
    pub size: Vec2,
    /// Balls (sorted by id)
    pub balls: Vec<Ball>,
    pub gravity: bool,
    pub paused: bool,
    pub time_ticks: u64,
    next_id: u32,
    #[serde(skip)]
    rng: SimRng,
}

impl Sandbox {
    pub fn new(width: f32, height: f32, seed: u64) -> Self {
        Self {
            size: Vec2::new(width, height),
            balls: Vec::new(),
            gravity: true,
            paused: false,
            time_ticks: 0,
            next_id: 0,
            rng: SimRng::new(seed),
        }
    }

    /// Spawn a ball with random size and velocity at `pos`
    pub fn spawn(&mut self, pos: Vec2) -> u32 {
        let radius = self.rng.range_f32(MIN_RADIUS, MAX_RADIUS);
        let vel = Vec2::new(self.rng.range_f32(-5.0, 5.0), self.rng.range_f32(-2.5, 2.5));
        self.insert(pos, vel, radius)
    }

    /// Insert a ball with explicit properties
    pub fn insert(&mut self, pos: Vec2, vel: Vec2, radius: f32) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.balls.push(Ball::new(id, pos, vel, radius));
        if self.balls.len() > MAX_BALLS {
            self.balls.remove(0);
        }
        id
    }

    pub fn clear(&mut self) {
        self.balls.clear();
    }

    pub fn toggle_gravity(&mut self) {
        self.gravity = !self.gravity;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Canvas resized; balls are pushed back inside on the next step
    pub fn resize(&mut self, width: f32, height: f32) {
        self.size = Vec2::new(width, height);
    }

    pub fn total_momentum(&self) -> Vec2 {
        self.balls.iter().map(Ball::momentum).sum()
    }

    /// Advance one frame
    pub fn step(&mut self) {
        if self.paused {
            return;
        }
        self.time_ticks += 1;

        for ball in &mut self.balls {
            if self.gravity {
                ball.vel.y += GRAVITY;
            }
            ball.vel *= FRICTION;
            ball.pos += ball.vel;
            bounce_off_walls(&mut ball.pos, &mut ball.vel, ball.radius, self.size, WALL_BOUNCE);
        }

        let n = self.balls.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (left, right) = self.balls.split_at_mut(j);
                resolve_pair(&mut left[i], &mut right[0], BALL_RESTITUTION);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn normal_momentum(a: &Ball, b: &Ball, normal: Vec2) -> f32 {
        a.momentum().dot(normal) + b.momentum().dot(normal)
    }

    #[test]
    fn test_head_on_equal_masses_swap() {
        let mut a = Ball::new(0, Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0), 10.0);
        let mut b = Ball::new(1, Vec2::new(19.0, 0.0), Vec2::new(-2.0, 0.0), 10.0);
        assert!(resolve_pair(&mut a, &mut b, 1.0));
        assert!((a.vel.x + 2.0).abs() < 1e-4);
        assert!((b.vel.x - 2.0).abs() < 1e-4);
        // De-overlapped symmetrically
        assert!(((b.pos.x - a.pos.x) - 20.0).abs() < 1e-4);
        assert!((a.pos.x + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_separating_pair_keeps_velocity() {
        let mut a = Ball::new(0, Vec2::ZERO, Vec2::new(-1.0, 0.0), 10.0);
        let mut b = Ball::new(1, Vec2::new(15.0, 0.0), Vec2::new(1.0, 0.0), 10.0);
        assert!(resolve_pair(&mut a, &mut b, BALL_RESTITUTION));
        assert_eq!(a.vel, Vec2::new(-1.0, 0.0));
        assert_eq!(b.vel, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_gravity_toggle_and_pause() {
        let mut world = Sandbox::new(800.0, 600.0, 1);
        world.insert(Vec2::new(400.0, 100.0), Vec2::ZERO, 20.0);
        world.step();
        assert!(world.balls[0].vel.y > 0.0);

        world.toggle_gravity();
        world.balls[0].vel = Vec2::ZERO;
        world.step();
        assert_eq!(world.balls[0].vel, Vec2::ZERO);

        world.toggle_pause();
        let ticks = world.time_ticks;
        world.step();
        assert_eq!(world.time_ticks, ticks);
    }

    #[test]
    fn test_balls_stay_inside() {
        let mut world = Sandbox::new(600.0, 400.0, 9);
        for i in 0..4 {
            world.spawn(Vec2::new(80.0 + i as f32 * 120.0, 60.0));
        }
        for _ in 0..500 {
            world.step();
        }
        // Pair de-overlap may nudge a ball past a wall by part of its
        // radius, but never its center
        for ball in &world.balls {
            assert!(ball.pos.y <= world.size.y);
            assert!(ball.pos.x >= 0.0 && ball.pos.x <= world.size.x);
        }
    }

    #[test]
    fn test_spawn_cap_evicts_oldest() {
        let mut world = Sandbox::new(800.0, 600.0, 2);
        for _ in 0..(MAX_BALLS + 3) {
            world.spawn(Vec2::new(100.0, 100.0));
        }
        assert_eq!(world.balls.len(), MAX_BALLS);
        assert_eq!(world.balls[0].id, 3);
    }

    proptest! {
        #[test]
        fn prop_momentum_conserved_along_normal(
            r1 in 5.0f32..40.0,
            r2 in 5.0f32..40.0,
            vx1 in -10.0f32..10.0,
            vy1 in -10.0f32..10.0,
            vx2 in -10.0f32..10.0,
            vy2 in -10.0f32..10.0,
            angle in 0.0f32..std::f32::consts::TAU,
            overlap in 0.1f32..0.9,
        ) {
            let dir = Vec2::new(angle.cos(), angle.sin());
            let dist = (r1 + r2) * (1.0 - overlap * 0.5);
            let mut a = Ball::new(0, Vec2::ZERO, Vec2::new(vx1, vy1), r1);
            let mut b = Ball::new(1, dir * dist, Vec2::new(vx2, vy2), r2);

            let before = normal_momentum(&a, &b, dir);
            let total_before = a.momentum() + b.momentum();
            // Tolerance relative to the momenta involved, not their sum
            let scale = 1.0 + a.momentum().length() + b.momentum().length();
            prop_assert!(resolve_pair(&mut a, &mut b, BALL_RESTITUTION));
            let after = normal_momentum(&a, &b, dir);
            let total_after = a.momentum() + b.momentum();

            prop_assert!((before - after).abs() / scale < 1e-3);
            prop_assert!((total_before - total_after).length() / scale < 1e-3);
        }
    }
}
