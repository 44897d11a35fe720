//! Shared session vocabulary and the tagged simulation core
//!
//! Every mini-game implements [`Simulation`]; [`SimulationCore`] picks the
//! variant at session creation and forwards the tick/reset/score contract.

use serde::{Deserialize, Serialize};

use super::flappy::FlappyGame;
use super::memory::{Difficulty, MemoryMatch};
use super::reaction::ReactionTest;
use super::snake::{SnakeGame, SnakeMode};
use super::typing::TypingRace;
use crate::score::RawMetric;

/// The five scored mini-games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameId {
    #[serde(rename = "flappy-bird")]
    FlappyBird,
    #[serde(rename = "snake")]
    Snake,
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "reaction")]
    Reaction,
    #[serde(rename = "typing")]
    Typing,
}

impl GameId {
    pub const ALL: [GameId; 5] = [
        GameId::FlappyBird,
        GameId::Snake,
        GameId::Memory,
        GameId::Reaction,
        GameId::Typing,
    ];

    /// Name used on the leaderboard wire
    pub fn as_str(&self) -> &'static str {
        match self {
            GameId::FlappyBird => "flappy-bird",
            GameId::Snake => "snake",
            GameId::Memory => "memory",
            GameId::Reaction => "reaction",
            GameId::Typing => "typing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "flappy-bird" | "flappy" => Some(GameId::FlappyBird),
            "snake" => Some(GameId::Snake),
            "memory" => Some(GameId::Memory),
            "reaction" => Some(GameId::Reaction),
            "typing" => Some(GameId::Typing),
            _ => None,
        }
    }

    /// Local high-score key (memory adds its difficulty, see [`MemoryMatch`])
    pub fn cache_key(&self) -> &'static str {
        match self {
            GameId::FlappyBird => "flappyHighScore",
            GameId::Snake => "snakeHighScore",
            GameId::Memory => "memory-highscore",
            GameId::Reaction => "reaction-best",
            GameId::Typing => "typing-best-wpm",
        }
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No run in progress
    Idle,
    /// Fixed-duration, non-interactive lead-in
    Countdown,
    /// Accepting input, simulation stepping
    Playing,
    /// Run ended, score frozen
    GameOver,
    /// Reflex foul: input arrived before the go signal, no score
    TooEarly,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::GameOver | Phase::TooEarly)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Countdown | Phase::Playing)
    }
}

/// Grid/keyboard direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Cell offset (y grows downward)
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Accepts direction names, arrow key names and WASD
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "up" | "arrowup" | "w" => Some(Direction::Up),
            "down" | "arrowdown" | "s" => Some(Direction::Down),
            "left" | "arrowleft" | "a" => Some(Direction::Left),
            "right" | "arrowright" | "d" => Some(Direction::Right),
            _ => None,
        }
    }

    /// Swipe gesture to direction; swipes shorter than `min_swipe` are ignored
    pub fn from_swipe(dx: f32, dy: f32, min_swipe: f32) -> Option<Self> {
        if dx.abs() > dy.abs() {
            if dx.abs() > min_swipe {
                return Some(if dx > 0.0 { Direction::Right } else { Direction::Left });
            }
        } else if dy.abs() > min_swipe {
            return Some(if dy > 0.0 { Direction::Down } else { Direction::Up });
        }
        None
    }
}

/// Player intent, queued and applied at the next tick boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    /// Begin a run (also restarts from a terminal phase)
    Start,
    /// Flappy: jump
    Flap,
    /// Snake: change direction
    Turn(Direction),
    /// Memory: reveal the card at this deck position
    Flip(usize),
    /// Reaction: the single click/tap
    Click,
    /// Typing: full current contents of the input box
    Text(String),
    /// Abandon the run and return to idle
    Reset,
}

/// An intent stamped with the session time it was received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedIntent {
    pub at_ms: f64,
    pub intent: Intent,
}

impl TimedIntent {
    pub fn new(intent: Intent, at_ms: f64) -> Self {
        Self { at_ms, intent }
    }
}

/// Tick/reset/score contract shared by every mini-game
pub trait Simulation {
    fn game(&self) -> GameId;

    fn phase(&self) -> Phase;

    /// Apply one queued intent; irrelevant or malformed intents are ignored
    fn apply(&mut self, input: &TimedIntent);

    /// Advance one tick at session time `now_ms`
    fn advance(&mut self, now_ms: f64);

    /// Discard the run and return to `Idle`
    fn reset(&mut self);

    /// End the run immediately, keeping whatever score was earned
    fn force_game_over(&mut self, now_ms: f64);

    /// Raw metric earned so far, if the game has one yet
    fn metric(&self) -> Option<RawMetric>;

    fn cache_key(&self) -> String {
        self.game().cache_key().to_string()
    }
}

/// Broad simulation family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreKind {
    /// Continuous-time integration (flappy, sandbox)
    Physics,
    /// Discrete cell steps (snake)
    Grid,
    /// Timer-measured input (reaction, typing)
    Reflex,
    /// Pure state transitions (memory)
    Matching,
}

/// Per-game options chosen when a session is created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreOptions {
    pub snake_mode: SnakeMode,
    pub memory_difficulty: Difficulty,
}

/// Tagged simulation variant
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "game", content = "state")]
pub enum SimulationCore {
    Flappy(FlappyGame),
    Snake(SnakeGame),
    Memory(MemoryMatch),
    Reaction(ReactionTest),
    Typing(TypingRace),
}

/// Effect of an input arriving in a terminal phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rearm {
    /// Reset, then apply the input as the first of a new run
    Restart,
    /// Back to `Idle`; the next input starts
    Idle,
    Ignore,
}

impl SimulationCore {
    pub fn new(game: GameId, options: CoreOptions, seed: u64) -> Self {
        match game {
            GameId::FlappyBird => SimulationCore::Flappy(FlappyGame::new(seed)),
            GameId::Snake => SimulationCore::Snake(SnakeGame::new(options.snake_mode, seed)),
            GameId::Memory => {
                SimulationCore::Memory(MemoryMatch::new(options.memory_difficulty, seed))
            }
            GameId::Reaction => SimulationCore::Reaction(ReactionTest::new(seed)),
            GameId::Typing => SimulationCore::Typing(TypingRace::new(seed)),
        }
    }

    pub fn kind(&self) -> CoreKind {
        match self {
            SimulationCore::Flappy(_) => CoreKind::Physics,
            SimulationCore::Snake(_) => CoreKind::Grid,
            SimulationCore::Reaction(_) | SimulationCore::Typing(_) => CoreKind::Reflex,
            SimulationCore::Memory(_) => CoreKind::Matching,
        }
    }

    /// What `intent` does once the run has ended
    pub fn on_terminal(&self, intent: &Intent) -> Rearm {
        match (self, intent) {
            (_, Intent::Start) | (SimulationCore::Reaction(_), Intent::Click) => Rearm::Restart,
            (SimulationCore::Snake(_), Intent::Turn(_)) => Rearm::Idle,
            _ => Rearm::Ignore,
        }
    }

    fn inner(&self) -> &dyn Simulation {
        match self {
            SimulationCore::Flappy(g) => g,
            SimulationCore::Snake(g) => g,
            SimulationCore::Memory(g) => g,
            SimulationCore::Reaction(g) => g,
            SimulationCore::Typing(g) => g,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Simulation {
        match self {
            SimulationCore::Flappy(g) => g,
            SimulationCore::Snake(g) => g,
            SimulationCore::Memory(g) => g,
            SimulationCore::Reaction(g) => g,
            SimulationCore::Typing(g) => g,
        }
    }
}

impl Simulation for SimulationCore {
    fn game(&self) -> GameId {
        self.inner().game()
    }

    fn phase(&self) -> Phase {
        self.inner().phase()
    }

    fn apply(&mut self, input: &TimedIntent) {
        self.inner_mut().apply(input)
    }

    fn advance(&mut self, now_ms: f64) {
        self.inner_mut().advance(now_ms)
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }

    fn force_game_over(&mut self, now_ms: f64) {
        self.inner_mut().force_game_over(now_ms)
    }

    fn metric(&self) -> Option<RawMetric> {
        self.inner().metric()
    }

    fn cache_key(&self) -> String {
        self.inner().cache_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_id_wire_names_round_trip() {
        for game in GameId::ALL {
            assert_eq!(GameId::parse(game.as_str()), Some(game));
            let json = serde_json::to_string(&game).unwrap();
            assert_eq!(json, format!("\"{}\"", game.as_str()));
        }
        assert_eq!(GameId::parse("pong"), None);
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!(Direction::parse("ArrowUp"), Some(Direction::Up));
        assert_eq!(Direction::parse("a"), Some(Direction::Left));
        assert_eq!(Direction::parse("sideways"), None);
        assert_eq!(Direction::Left.opposite(), Direction::Right);
    }

    #[test]
    fn test_swipe_threshold() {
        assert_eq!(Direction::from_swipe(40.0, 5.0, 30.0), Some(Direction::Right));
        assert_eq!(Direction::from_swipe(-3.0, -50.0, 30.0), Some(Direction::Up));
        assert_eq!(Direction::from_swipe(10.0, 12.0, 30.0), None);
    }

    #[test]
    fn test_terminal_input_policy() {
        let options = CoreOptions::default();
        let reaction = SimulationCore::new(GameId::Reaction, options, 1);
        assert_eq!(reaction.on_terminal(&Intent::Click), Rearm::Restart);
        assert_eq!(reaction.on_terminal(&Intent::Start), Rearm::Restart);

        let snake = SimulationCore::new(GameId::Snake, options, 1);
        assert_eq!(snake.on_terminal(&Intent::Turn(Direction::Up)), Rearm::Idle);
        assert_eq!(snake.on_terminal(&Intent::Click), Rearm::Ignore);

        let flappy = SimulationCore::new(GameId::FlappyBird, options, 1);
        assert_eq!(flappy.on_terminal(&Intent::Flap), Rearm::Ignore);
    }

    #[test]
    fn test_core_selection() {
        let opts = CoreOptions::default();
        let core = SimulationCore::new(GameId::Snake, opts, 1);
        assert_eq!(core.kind(), CoreKind::Grid);
        assert_eq!(core.game(), GameId::Snake);
        assert_eq!(core.phase(), Phase::Idle);

        let core = SimulationCore::new(GameId::Typing, opts, 1);
        assert_eq!(core.kind(), CoreKind::Reflex);
        assert_eq!(core.cache_key(), "typing-best-wpm");
    }
}
