//! Demo players
//!
//! Reads a simulation's public state each tick and produces the intent a
//! reasonable human would send. Drives the headless demo and the attract
//! mode; it only ever talks to a game through intents, never by mutating
//! state directly.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::sim::flappy::{BIRD_X, FIELD_HEIGHT, FlappyGame, PIPE_GAP};
use crate::sim::memory::MemoryMatch;
use crate::sim::reaction::ReactionTest;
use crate::sim::snake::{Cell, SnakeGame};
use crate::sim::typing::TypingRace;
use crate::sim::{Direction, Intent, Phase, SimRng, Simulation, SimulationCore};

/// Flap once the bird sinks this far below the gap center
const FLAP_MARGIN: f32 = 25.0;
/// Pause between memory flips
const MEMORY_THINK_MS: f64 = 250.0;
/// Human-ish reaction window
const REACTION_MIN_MS: f64 = 180.0;
const REACTION_MAX_MS: f64 = 260.0;
/// Delay between typed characters (about 100 wpm)
const TYPING_CHAR_MS: f64 = 120.0;

const DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

/// Stateful demo player for any game
#[derive(Debug, Clone)]
pub struct Autopilot {
    rng: SimRng,
    /// Memory: deck position -> face, for every card seen so far
    seen: HashMap<usize, usize>,
    next_action_at: f64,
    click_at: Option<f64>,
}

impl Autopilot {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SimRng::new(seed),
            seen: HashMap::new(),
            next_action_at: 0.0,
            click_at: None,
        }
    }

    /// Next input for `core`, if any; terminal phases get nothing
    pub fn next_intent(&mut self, core: &SimulationCore, now_ms: f64) -> Option<Intent> {
        match core.phase() {
            Phase::Idle => {
                self.seen.clear();
                self.click_at = None;
                self.next_action_at = now_ms;
                return Some(Intent::Start);
            }
            Phase::GameOver | Phase::TooEarly => return None,
            Phase::Countdown | Phase::Playing => {}
        }

        match core {
            SimulationCore::Flappy(game) => flappy_intent(game),
            SimulationCore::Snake(game) => snake_intent(game).map(Intent::Turn),
            SimulationCore::Memory(game) => self.memory_intent(game, now_ms),
            SimulationCore::Reaction(game) => self.reaction_intent(game, now_ms),
            SimulationCore::Typing(game) => self.typing_intent(game, now_ms),
        }
    }

    fn memory_intent(&mut self, game: &MemoryMatch, now_ms: f64) -> Option<Intent> {
        for (i, card) in game.cards.iter().enumerate() {
            if card.face_up && !card.matched {
                self.seen.insert(i, card.face);
            }
        }
        self.seen.retain(|i, _| game.cards.get(*i).is_some_and(|c| !c.matched));

        if game.revealed.len() >= 2 || now_ms < self.next_action_at {
            return None;
        }

        let pick = match game.revealed.first() {
            // Second card: the remembered mate, else something new
            Some(&open) => {
                let face = game.cards.get(open)?.face;
                self.known_mate(open, face).or_else(|| self.unseen(game))
            }
            // First card: finish a remembered pair, else explore
            None => self.known_pair().or_else(|| self.unseen(game)),
        }?;
        self.next_action_at = now_ms + MEMORY_THINK_MS;
        Some(Intent::Flip(pick))
    }

    fn known_mate(&self, open: usize, face: usize) -> Option<usize> {
        self.seen
            .iter()
            .filter(|&(&i, &f)| i != open && f == face)
            .map(|(&i, _)| i)
            .min()
    }

    fn known_pair(&self) -> Option<usize> {
        let mut by_face: HashMap<usize, usize> = HashMap::new();
        let mut best: Option<usize> = None;
        for (&i, &face) in &self.seen {
            if let Some(&other) = by_face.get(&face) {
                let first = i.min(other);
                best = Some(best.map_or(first, |b| b.min(first)));
            } else {
                by_face.insert(face, i);
            }
        }
        best
    }

    fn unseen(&self, game: &MemoryMatch) -> Option<usize> {
        game.cards
            .iter()
            .enumerate()
            .position(|(i, c)| !c.matched && !c.face_up && !self.seen.contains_key(&i))
    }

    fn reaction_intent(&mut self, game: &ReactionTest, now_ms: f64) -> Option<Intent> {
        if game.phase != Phase::Playing {
            return None;
        }
        let click_at = *self
            .click_at
            .get_or_insert_with(|| now_ms + self.rng.range_f64(REACTION_MIN_MS, REACTION_MAX_MS));
        (now_ms >= click_at).then_some(Intent::Click)
    }

    fn typing_intent(&mut self, game: &TypingRace, now_ms: f64) -> Option<Intent> {
        if game.phase != Phase::Playing || now_ms < self.next_action_at {
            return None;
        }
        let typed = game.typed.chars().count();
        let next: String = game.target.chars().take(typed + 1).collect();
        if next == game.typed {
            return None;
        }
        self.next_action_at = now_ms + TYPING_CHAR_MS;
        Some(Intent::Text(next))
    }
}

/// Hold the bird near the center of the next gap
fn flappy_intent(game: &FlappyGame) -> Option<Intent> {
    let bird = &game.bird;
    let target = game
        .pipes
        .iter()
        .find(|p| p.trailing_edge() >= BIRD_X - bird.radius)
        .map(|p| p.top_height + PIPE_GAP / 2.0)
        .unwrap_or(FIELD_HEIGHT / 2.0);

    (bird.pos.y > target + FLAP_MARGIN && bird.vel.y >= 0.0).then_some(Intent::Flap)
}

/// Greedy toward the food, never into a wall, the body, or a pocket too
/// small to hold the snake
fn snake_intent(game: &SnakeGame) -> Option<Direction> {
    let head = game.head();
    let neck = game.neck();
    let tail = if game.head_at_front {
        game.body.back()
    } else {
        game.body.front()
    }
    .copied();

    let mut best: Option<(bool, i32, Direction)> = None;
    for dir in DIRECTIONS {
        let next = head.step(dir);
        if Some(next) == neck || !next.in_bounds() {
            continue;
        }
        let eating = next == game.food;
        let mut blocked: HashSet<Cell> = game.body.iter().copied().collect();
        if !eating {
            if let Some(tail) = tail {
                blocked.remove(&tail);
            }
        }
        if blocked.contains(&next) {
            continue;
        }
        blocked.insert(next);
        let roomy = reachable(next, &blocked, game.body.len() + 1) > game.body.len();
        let distance = (next.x - game.food.x).abs() + (next.y - game.food.y).abs();
        let candidate = (roomy, -distance, dir);
        if best.is_none_or(|(r, d, _)| (roomy, -distance) > (r, d)) {
            best = Some(candidate);
        }
    }
    best.map(|(_, _, dir)| dir)
}

/// Free cells reachable from `start`, counting up to `cap`
fn reachable(start: Cell, blocked: &HashSet<Cell>, cap: usize) -> usize {
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    let mut count = 0;
    while let Some(cell) = queue.pop_front() {
        count += 1;
        if count >= cap {
            break;
        }
        for dir in DIRECTIONS {
            let n = cell.step(dir);
            if n.in_bounds() && !blocked.contains(&n) && visited.insert(n) {
                queue.push_back(n);
            }
        }
    }
    count
}
