//! Grid snake, classic and reversible
//!
//! The reversible variant swaps which end of the body is the head every
//! time food is eaten and heads back the other way.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::rng::SimRng;
use super::state::{Direction, GameId, Intent, Phase, Simulation, TimedIntent};
use crate::score::RawMetric;

/// Cells per side
pub const GRID_SIZE: i32 = 20;
/// Step interval at the start of a run
pub const INITIAL_STEP_MS: f64 = 120.0;
/// Fastest step interval
pub const MIN_STEP_MS: f64 = 60.0;
/// Step interval shaved off per food
pub const STEP_SPEEDUP_MS: f64 = 2.0;
pub const FOOD_POINTS: u64 = 10;

/// A grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(&self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn in_bounds(&self) -> bool {
        (0..GRID_SIZE).contains(&self.x) && (0..GRID_SIZE).contains(&self.y)
    }

    /// Direction from `self` to an orthogonal neighbour
    fn direction_to(&self, other: Cell) -> Option<Direction> {
        match (other.x - self.x, other.y - self.y) {
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Snake rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnakeMode {
    /// Head is always the front segment
    Classic,
    /// Eating swaps the active end and reverses direction
    #[default]
    Reversible,
}

impl SnakeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnakeMode::Classic => "classic",
            SnakeMode::Reversible => "reversible",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "classic" => Some(SnakeMode::Classic),
            "reversible" => Some(SnakeMode::Reversible),
            _ => None,
        }
    }

    fn initial_body(&self) -> VecDeque<Cell> {
        match self {
            SnakeMode::Classic => VecDeque::from([Cell::new(10, 10)]),
            SnakeMode::Reversible => {
                VecDeque::from([Cell::new(10, 10), Cell::new(9, 10), Cell::new(8, 10)])
            }
        }
    }
}

/// What a single grid step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    Ate,
    HitWall,
    HitSelf,
    /// Ate the last free cell
    BoardFull,
}

/// Snake game state
#[derive(Debug, Clone, Serialize)]
pub struct SnakeGame {
    pub mode: SnakeMode,
    pub phase: Phase,
    /// Segments, front to back
    pub body: VecDeque<Cell>,
    /// Whether the head is `body.front()` (else `body.back()`)
    pub head_at_front: bool,
    pub direction: Direction,
    /// Direction applied at the next step
    pub next_direction: Direction,
    pub food: Cell,
    pub score: u64,
    pub step_ms: f64,
    pub steps: u64,
    pub started_at: Option<f64>,
    pub ended_at: Option<f64>,
    next_step_at: f64,
    #[serde(skip)]
    rng: SimRng,
}

impl SnakeGame {
    pub fn new(mode: SnakeMode, seed: u64) -> Self {
        Self {
            mode,
            phase: Phase::Idle,
            body: mode.initial_body(),
            head_at_front: true,
            direction: Direction::Right,
            next_direction: Direction::Right,
            food: Cell::new(15, 10),
            score: 0,
            step_ms: INITIAL_STEP_MS,
            steps: 0,
            started_at: None,
            ended_at: None,
            next_step_at: 0.0,
            rng: SimRng::new(seed),
        }
    }

    pub fn start(&mut self, at_ms: f64) {
        self.body = self.mode.initial_body();
        self.head_at_front = true;
        self.direction = Direction::Right;
        self.next_direction = Direction::Right;
        self.score = 0;
        self.step_ms = INITIAL_STEP_MS;
        self.steps = 0;
        self.started_at = Some(at_ms);
        self.ended_at = None;
        self.next_step_at = at_ms + self.step_ms;
        self.phase = Phase::Playing;
        if !self.spawn_food() {
            self.phase = Phase::GameOver;
        }
        log::debug!("snake: {:?} run started at {at_ms:.0}ms", self.mode);
    }

    pub fn head(&self) -> Cell {
        let head = if self.head_at_front {
            self.body.front()
        } else {
            self.body.back()
        };
        // Body is never empty
        head.copied().unwrap_or(Cell::new(0, 0))
    }

    /// Segment adjacent to the active head, if the body has one
    pub fn neck(&self) -> Option<Cell> {
        let len = self.body.len();
        if len < 2 {
            return None;
        }
        let idx = if self.head_at_front { 1 } else { len - 2 };
        self.body.get(idx).copied()
    }

    fn tail_index(&self) -> usize {
        if self.head_at_front {
            self.body.len() - 1
        } else {
            0
        }
    }

    /// Queue a direction change; rejects turning back into the neck
    pub fn queue_turn(&mut self, dir: Direction) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }
        if self.neck() == Some(self.head().step(dir)) {
            return false;
        }
        self.next_direction = dir;
        true
    }

    /// Choose a food cell uniformly among free cells
    ///
    /// Returns false when the body covers the whole board.
    fn spawn_food(&mut self) -> bool {
        let free: Vec<Cell> = (0..GRID_SIZE)
            .flat_map(|y| (0..GRID_SIZE).map(move |x| Cell::new(x, y)))
            .filter(|c| !self.body.contains(c))
            .collect();
        match self.rng.choose(&free) {
            Some(cell) => {
                self.food = *cell;
                true
            }
            None => false,
        }
    }

    /// Move one cell in the queued direction
    pub fn step(&mut self, now_ms: f64) -> StepOutcome {
        if self.phase != Phase::Playing {
            return StepOutcome::Moved;
        }
        self.steps += 1;
        self.direction = self.next_direction;

        let new_head = self.head().step(self.direction);
        if !new_head.in_bounds() {
            self.end(now_ms, "wall");
            return StepOutcome::HitWall;
        }

        let eating = new_head == self.food;
        // The tail cell is vacated this step unless we grow
        let tail_idx = self.tail_index();
        let hits_body = self
            .body
            .iter()
            .enumerate()
            .any(|(i, c)| *c == new_head && (eating || i != tail_idx));
        if hits_body {
            self.end(now_ms, "self");
            return StepOutcome::HitSelf;
        }

        if self.head_at_front {
            self.body.push_front(new_head);
        } else {
            self.body.push_back(new_head);
        }

        if !eating {
            if self.head_at_front {
                self.body.pop_back();
            } else {
                self.body.pop_front();
            }
            return StepOutcome::Moved;
        }

        self.score += FOOD_POINTS;
        self.step_ms = (self.step_ms - STEP_SPEEDUP_MS).max(MIN_STEP_MS);
        if self.mode == SnakeMode::Reversible {
            self.reverse();
        }
        if !self.spawn_food() {
            self.end(now_ms, "board full");
            return StepOutcome::BoardFull;
        }
        StepOutcome::Ate
    }

    /// Swap the active end and head back the way we came
    fn reverse(&mut self) {
        self.head_at_front = !self.head_at_front;
        let mut dir = self.direction.opposite();
        // A bent body can leave the inverted heading pointing into the new
        // neck; follow the tail's own heading instead
        if let Some(neck) = self.neck() {
            let head = self.head();
            if head.step(dir) == neck {
                dir = neck.direction_to(head).unwrap_or(dir);
            }
        }
        self.direction = dir;
        self.next_direction = dir;
    }

    fn end(&mut self, now_ms: f64, cause: &str) {
        self.phase = Phase::GameOver;
        self.ended_at = Some(now_ms);
        log::info!("snake: game over ({cause}) with {} points", self.score);
    }
}

impl Simulation for SnakeGame {
    fn game(&self) -> GameId {
        GameId::Snake
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn apply(&mut self, input: &TimedIntent) {
        match (&input.intent, self.phase) {
            (Intent::Start | Intent::Turn(_), Phase::Idle) => self.start(input.at_ms),
            (Intent::Turn(dir), Phase::Playing) => {
                if !self.queue_turn(*dir) {
                    log::debug!("snake: rejected turn {dir:?}");
                }
            }
            _ => {}
        }
    }

    fn advance(&mut self, now_ms: f64) {
        if self.phase != Phase::Playing || now_ms < self.next_step_at {
            return;
        }
        self.step(now_ms);
        self.next_step_at = now_ms + self.step_ms;
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.body = self.mode.initial_body();
        self.head_at_front = true;
        self.direction = Direction::Right;
        self.next_direction = Direction::Right;
        self.score = 0;
        self.step_ms = INITIAL_STEP_MS;
        self.steps = 0;
        self.started_at = None;
        self.ended_at = None;
    }

    fn force_game_over(&mut self, now_ms: f64) {
        if !self.phase.is_terminal() {
            self.end(now_ms, "forced");
        }
    }

    fn metric(&self) -> Option<RawMetric> {
        match self.phase {
            Phase::Idle => None,
            _ => Some(RawMetric::Counter(self.score)),
        }
    }
}
