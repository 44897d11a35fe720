//! Flappy-bird style side scroller
//!
//! Per-tick physics in field pixels (one tick = one 60 Hz frame). Pipes
//! spawn on a wall-clock interval checked against `last_spawn_ms`.

use glam::Vec2;
use serde::Serialize;

use super::collision::Aabb;
use super::rng::SimRng;
use super::state::{GameId, Intent, Phase, Simulation, TimedIntent};
use crate::score::RawMetric;

pub const FIELD_WIDTH: f32 = 400.0;
pub const FIELD_HEIGHT: f32 = 600.0;

/// Bird is pinned at this x; only y moves
pub const BIRD_X: f32 = 80.0;
pub const BIRD_RADIUS: f32 = 15.0;
/// Downward acceleration per tick
pub const GRAVITY: f32 = 0.5;
/// Vertical velocity set by a flap (negative = up)
pub const FLAP_VELOCITY: f32 = -9.0;

pub const PIPE_WIDTH: f32 = 60.0;
pub const PIPE_GAP: f32 = 150.0;
/// Leftward pipe speed per tick
pub const PIPE_SPEED: f32 = 3.0;
pub const PIPE_SPAWN_INTERVAL_MS: f64 = 1800.0;
/// Minimum height of either pipe half
pub const PIPE_MIN_HEIGHT: f32 = 80.0;

/// The player-controlled bird
#[derive(Debug, Clone, Serialize)]
pub struct Bird {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Visual tilt in degrees, derived from vertical speed
    pub tilt: f32,
}

impl Default for Bird {
    fn default() -> Self {
        Self {
            pos: Vec2::new(BIRD_X, FIELD_HEIGHT / 2.0),
            vel: Vec2::ZERO,
            radius: BIRD_RADIUS,
            tilt: 0.0,
        }
    }
}

impl Bird {
    pub fn bounds(&self) -> Aabb {
        Aabb::around_circle(self.pos, self.radius)
    }
}

/// A pipe pair with a gap below `top_height`
#[derive(Debug, Clone, Serialize)]
pub struct Pipe {
    pub id: u32,
    /// Leading (left) edge
    pub x: f32,
    pub top_height: f32,
    /// Set once the bird has passed this pipe
    pub scored: bool,
}

impl Pipe {
    pub fn new(id: u32, x: f32, top_height: f32) -> Self {
        Self {
            id,
            x,
            top_height,
            scored: false,
        }
    }

    pub fn trailing_edge(&self) -> f32 {
        self.x + PIPE_WIDTH
    }

    pub fn top_box(&self) -> Aabb {
        Aabb::new(Vec2::new(self.x, f32::NEG_INFINITY), Vec2::new(self.trailing_edge(), self.top_height))
    }

    pub fn bottom_box(&self) -> Aabb {
        Aabb::new(
            Vec2::new(self.x, self.top_height + PIPE_GAP),
            Vec2::new(self.trailing_edge(), f32::INFINITY),
        )
    }

    /// True if the bird overlaps either pipe half
    pub fn hits(&self, bird: &Bird) -> bool {
        let b = bird.bounds();
        b.overlaps(&self.top_box()) || b.overlaps(&self.bottom_box())
    }
}

/// Credit every pipe whose trailing edge the bird has crossed
///
/// Each pipe is credited at most once; returns the number newly credited.
pub fn credit_passed_pipes(pipes: &mut [Pipe], bird_x: f32) -> u32 {
    let mut credited = 0;
    for pipe in pipes.iter_mut().filter(|p| !p.scored) {
        if pipe.trailing_edge() < bird_x {
            pipe.scored = true;
            credited += 1;
        }
    }
    credited
}

/// Flappy game state
#[derive(Debug, Clone, Serialize)]
pub struct FlappyGame {
    pub phase: Phase,
    pub bird: Bird,
    /// Active pipes (sorted by id, oldest first)
    pub pipes: Vec<Pipe>,
    /// Pipes passed
    pub score: u64,
    pub time_ticks: u64,
    pub started_at: Option<f64>,
    pub ended_at: Option<f64>,
    last_spawn_ms: f64,
    next_id: u32,
    #[serde(skip)]
    rng: SimRng,
}

impl FlappyGame {
    pub fn new(seed: u64) -> Self {
        Self {
            phase: Phase::Idle,
            bird: Bird::default(),
            pipes: Vec::new(),
            score: 0,
            time_ticks: 0,
            started_at: None,
            ended_at: None,
            last_spawn_ms: 0.0,
            next_id: 1,
            rng: SimRng::new(seed),
        }
    }

    fn start(&mut self, at_ms: f64) {
        self.bird = Bird::default();
        self.bird.vel.y = FLAP_VELOCITY;
        self.pipes.clear();
        self.score = 0;
        self.time_ticks = 0;
        self.started_at = Some(at_ms);
        self.ended_at = None;
        self.last_spawn_ms = at_ms;
        self.phase = Phase::Playing;
        log::debug!("flappy: run started at {at_ms:.0}ms");
    }

    fn end(&mut self, now_ms: f64) {
        self.phase = Phase::GameOver;
        self.ended_at = Some(now_ms);
        log::info!("flappy: game over with {} pipes", self.score);
    }

    fn spawn_pipe(&mut self) {
        let max_top = FIELD_HEIGHT - PIPE_GAP - PIPE_MIN_HEIGHT;
        let top_height = self.rng.range_f32(PIPE_MIN_HEIGHT, max_top);
        let id = self.next_id;
        self.next_id += 1;
        self.pipes.push(Pipe::new(id, FIELD_WIDTH, top_height));
    }

    /// Bird touches the floor or ceiling
    fn out_of_bounds(&self) -> bool {
        self.bird.pos.y + self.bird.radius > FIELD_HEIGHT || self.bird.pos.y - self.bird.radius < 0.0
    }
}

impl Simulation for FlappyGame {
    fn game(&self) -> GameId {
        GameId::FlappyBird
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn apply(&mut self, input: &TimedIntent) {
        match (&input.intent, self.phase) {
            (Intent::Start | Intent::Flap, Phase::Idle) => self.start(input.at_ms),
            (Intent::Flap, Phase::Playing) => self.bird.vel.y = FLAP_VELOCITY,
            _ => {}
        }
    }

    fn advance(&mut self, now_ms: f64) {
        if self.phase != Phase::Playing {
            return;
        }
        self.time_ticks += 1;

        // Forces and integration
        self.bird.vel.y += GRAVITY;
        self.bird.pos += self.bird.vel;
        self.bird.tilt = (self.bird.vel.y * 3.0).clamp(-30.0, 90.0);

        if now_ms - self.last_spawn_ms > PIPE_SPAWN_INTERVAL_MS {
            self.spawn_pipe();
            self.last_spawn_ms = now_ms;
        }

        for pipe in &mut self.pipes {
            pipe.x -= PIPE_SPEED;
        }
        self.score += u64::from(credit_passed_pipes(&mut self.pipes, self.bird.pos.x));

        let hit_pipe = self.pipes.iter().any(|p| p.hits(&self.bird));
        self.pipes.retain(|p| p.x > -PIPE_WIDTH);

        if hit_pipe || self.out_of_bounds() {
            self.end(now_ms);
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.bird = Bird::default();
        self.pipes.clear();
        self.score = 0;
        self.time_ticks = 0;
        self.started_at = None;
        self.ended_at = None;
    }

    fn force_game_over(&mut self, now_ms: f64) {
        if !self.phase.is_terminal() {
            self.end(now_ms);
        }
    }

    fn metric(&self) -> Option<RawMetric> {
        match self.phase {
            Phase::Idle => None,
            _ => Some(RawMetric::Counter(self.score)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT_MS;

    fn started(seed: u64) -> FlappyGame {
        let mut game = FlappyGame::new(seed);
        game.apply(&TimedIntent::new(Intent::Flap, 0.0));
        assert_eq!(game.phase, Phase::Playing);
        game
    }

    #[test]
    fn test_flap_starts_and_lifts() {
        let game = started(1);
        assert_eq!(game.bird.vel.y, FLAP_VELOCITY);
        assert_eq!(game.bird.pos.y, FIELD_HEIGHT / 2.0);
    }

    #[test]
    fn test_falls_to_floor_and_ends() {
        let mut game = started(1);
        let mut now = 0.0;
        for _ in 0..600 {
            now += SIM_DT_MS;
            game.advance(now);
            if game.phase == Phase::GameOver {
                break;
            }
        }
        assert_eq!(game.phase, Phase::GameOver);
        assert_eq!(game.ended_at, Some(now));
        assert_eq!(game.score, 0);

        // Frozen: further ticks and flaps change nothing
        let y = game.bird.pos.y;
        game.apply(&TimedIntent::new(Intent::Flap, now));
        game.advance(now + SIM_DT_MS);
        assert_eq!(game.bird.pos.y, y);
        assert_eq!(game.metric(), Some(RawMetric::Counter(0)));
    }

    #[test]
    fn test_pipe_credit_exactly_once() {
        let mut pipes = vec![Pipe::new(1, 100.0, 200.0), Pipe::new(2, 10.0, 200.0)];

        // Pipe 2 trailing edge at 70 < 80: credited; pipe 1 not yet passed
        assert_eq!(credit_passed_pipes(&mut pipes, BIRD_X), 1);
        assert!(!pipes[0].scored);
        assert!(pipes[1].scored);

        // Second pass never re-credits
        assert_eq!(credit_passed_pipes(&mut pipes, BIRD_X), 0);

        // Move pipe 1 past the bird
        pipes[0].x = 15.0;
        assert_eq!(credit_passed_pipes(&mut pipes, BIRD_X), 1);
        assert_eq!(credit_passed_pipes(&mut pipes, BIRD_X), 0);
    }

    #[test]
    fn test_trailing_edge_touching_bird_not_credited() {
        let mut pipes = vec![Pipe::new(1, BIRD_X - PIPE_WIDTH, 200.0)];
        assert_eq!(credit_passed_pipes(&mut pipes, BIRD_X), 0);
    }

    #[test]
    fn test_pipe_collision_outside_gap() {
        let bird = Bird {
            pos: Vec2::new(BIRD_X, 100.0),
            ..Bird::default()
        };
        // Pipe spanning the bird's x with gap from 200..350
        let pipe = Pipe::new(1, 60.0, 200.0);
        assert!(pipe.hits(&bird));

        let safe = Bird {
            pos: Vec2::new(BIRD_X, 275.0),
            ..Bird::default()
        };
        assert!(!pipe.hits(&safe));

        // Pipe not yet at the bird's x
        let far = Pipe::new(2, 300.0, 200.0);
        assert!(!far.hits(&bird));
    }

    #[test]
    fn test_pipes_spawn_on_interval() {
        let mut game = started(3);
        let mut now = 0.0;
        // Keep the bird centred so it survives
        while now < PIPE_SPAWN_INTERVAL_MS + 2.0 * SIM_DT_MS {
            now += SIM_DT_MS;
            game.bird.pos.y = FIELD_HEIGHT / 2.0;
            game.bird.vel.y = 0.0;
            game.advance(now);
        }
        assert_eq!(game.pipes.len(), 1);
        let pipe = &game.pipes[0];
        assert!(pipe.top_height >= PIPE_MIN_HEIGHT);
        assert!(pipe.top_height < FIELD_HEIGHT - PIPE_GAP - PIPE_MIN_HEIGHT);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut game = started(1);
        game.advance(SIM_DT_MS);
        game.reset();
        assert_eq!(game.phase, Phase::Idle);
        assert!(game.metric().is_none());
        assert!(game.pipes.is_empty());
    }
}
