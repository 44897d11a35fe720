//! Pastel Arcade - game session engine for a set of browser mini-games
//!
//! Core modules:
//! - `sim`: Deterministic simulations (flappy, snake, memory, reaction, typing, sandbox)
//! - `session`: One run of one game: intent queue, tick, terminal score
//! - `runner`: Fixed-step loop with cancellable tokens
//! - `score`: Raw metric normalization and comparison
//! - `highscores` / `storage`: Local best-score cache over an injected key-value store
//! - `leaderboard`: Asynchronous score submission and standings
//! - `settings`: Player preferences and service configuration
//! - `autopilot`: Demo players that drive any game through intents
//! - `web` (wasm32): Browser handle the page drives from its animation loop

pub mod autopilot;
pub mod error;
pub mod highscores;
pub mod leaderboard;
pub mod platform;
pub mod runner;
pub mod score;
pub mod session;
pub mod settings;
pub mod sim;
pub mod storage;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use error::{LeaderboardError, StorageError};
pub use highscores::HighScoreCache;
pub use leaderboard::{LeaderboardClient, LeaderboardEntry};
pub use runner::{FrameOutcome, LoopToken, SessionRunner};
pub use score::{RawMetric, Score, SortOrder, normalize};
pub use session::{GameSession, ScoreSubmission, SessionEvent};
pub use settings::Settings;
pub use sim::{GameId, Intent, Phase};

/// Engine timing constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one display frame)
    pub const SIM_DT_MS: f64 = 1000.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Frame deltas above this are clamped (tab was hidden, debugger, etc.)
    pub const MAX_FRAME_DT_MS: f64 = 100.0;
}
