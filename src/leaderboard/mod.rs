//! Leaderboard client
//!
//! Score submission never blocks a tick: the client hands the request to a
//! backend and gets a [`PendingReply`] back immediately. The host drains
//! replies with [`LeaderboardClient::poll`] between frames. Failures become
//! [`Notice`]s and never touch session state.

mod local;
pub use local::LocalLeaderboard;

#[cfg(not(target_arch = "wasm32"))]
mod http;
#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpLeaderboard;

#[cfg(target_arch = "wasm32")]
mod fetch;
#[cfg(target_arch = "wasm32")]
pub use fetch::FetchLeaderboard;

use std::collections::HashMap;
use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use crate::error::LeaderboardError;
use crate::score::{is_improvement, sort_order};
use crate::session::ScoreSubmission;
use crate::sim::GameId;

/// Rows per leaderboard unless configured otherwise
pub const DEFAULT_LIMIT: usize = 10;

/// `POST /api/leaderboard` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub game: GameId,
    pub score: u64,
}

/// `POST /api/leaderboard` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_new_best: bool,
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub username: String,
    pub score: u64,
    /// Wire name; unknown games are kept as-is
    pub game: String,
    pub date: String,
}

impl LeaderboardEntry {
    pub fn game_id(&self) -> Option<GameId> {
        GameId::parse(&self.game)
    }
}

/// `GET /api/leaderboard` reply
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LeaderboardPage {
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Which rows to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardQuery {
    /// None for every game
    pub game: Option<GameId>,
    pub limit: usize,
}

impl LeaderboardQuery {
    pub fn game(game: GameId) -> Self {
        Self {
            game: Some(game),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn all() -> Self {
        Self {
            game: None,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Value of the `game` query parameter
    pub fn game_param(&self) -> &'static str {
        self.game.map(|g| g.as_str()).unwrap_or("all")
    }
}

/// Signed-in player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub token: String,
}

/// Sending half of a [`PendingReply`]
pub struct ReplySender<T>(mpsc::Sender<Result<T, LeaderboardError>>);

impl<T> ReplySender<T> {
    /// Deliver the result; a dropped receiver is not an error
    pub fn send(self, result: Result<T, LeaderboardError>) {
        let _ = self.0.send(result);
    }
}

/// Result of an asynchronous leaderboard call, polled without blocking
pub struct PendingReply<T> {
    rx: mpsc::Receiver<Result<T, LeaderboardError>>,
    finished: bool,
}

impl<T> PendingReply<T> {
    pub fn channel() -> (ReplySender<T>, Self) {
        let (tx, rx) = mpsc::channel();
        (
            ReplySender(tx),
            Self {
                rx,
                finished: false,
            },
        )
    }

    /// Already-completed reply
    pub fn ready(result: Result<T, LeaderboardError>) -> Self {
        let (tx, reply) = Self::channel();
        tx.send(result);
        reply
    }

    /// The result, once; None while still in flight or after it was taken
    pub fn poll(&mut self) -> Option<Result<T, LeaderboardError>> {
        if self.finished {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.finished = true;
                Some(result)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.finished = true;
                Some(Err(LeaderboardError::Disconnected))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Block until the reply arrives (native hosts and tests only)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn wait(self) -> Result<T, LeaderboardError> {
        self.rx.recv().unwrap_or(Err(LeaderboardError::Disconnected))
    }
}

/// Where submissions go
pub trait LeaderboardBackend {
    fn name(&self) -> &'static str;

    fn submit(&self, request: &SubmitRequest, identity: &Identity) -> PendingReply<SubmitResponse>;

    fn fetch(&self, query: &LeaderboardQuery) -> PendingReply<Vec<LeaderboardEntry>>;
}

/// What `submit` did with a score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDecision {
    /// Request dispatched; the outcome arrives via `poll`
    Sent,
    /// Not better than the known personal best
    NotImproved { best: u64 },
    /// No signed-in player
    NotSignedIn,
}

/// Outcome of a finished submission, for the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Submitted {
        game: GameId,
        score: u64,
        new_best: bool,
    },
    Failed {
        game: GameId,
        score: u64,
        error: LeaderboardError,
    },
}

struct InFlight {
    game: GameId,
    score: u64,
    reply: PendingReply<SubmitResponse>,
}

/// Tracks personal bests and in-flight submissions over a backend
pub struct LeaderboardClient {
    backend: Box<dyn LeaderboardBackend>,
    identity: Option<Identity>,
    personal_bests: HashMap<GameId, u64>,
    in_flight: Vec<InFlight>,
}

impl LeaderboardClient {
    pub fn new(backend: Box<dyn LeaderboardBackend>) -> Self {
        Self {
            backend,
            identity: None,
            personal_bests: HashMap::new(),
            in_flight: Vec::new(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn set_identity(&mut self, identity: Option<Identity>) {
        if identity.as_ref().map(|i| &i.username) != self.identity.as_ref().map(|i| &i.username) {
            self.personal_bests.clear();
        }
        self.identity = identity;
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn personal_best(&self, game: GameId) -> Option<u64> {
        self.personal_bests.get(&game).copied()
    }

    /// Seed a known personal best (e.g. from a fetched leaderboard)
    pub fn set_personal_best(&mut self, game: GameId, score: u64) {
        self.personal_bests.insert(game, score);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Send a score if it beats the known personal best
    pub fn submit(&mut self, submission: &ScoreSubmission) -> SubmitDecision {
        let Some(identity) = &self.identity else {
            log::debug!("{}: not signed in, score stays local", submission.game);
            return SubmitDecision::NotSignedIn;
        };
        let game = submission.game;
        let score = submission.score.value;
        let best = self.personal_best(game);
        if !is_improvement(sort_order(game), score, best) {
            log::debug!("{game}: {score} does not beat personal best {best:?}");
            return SubmitDecision::NotImproved {
                best: best.unwrap_or_default(),
            };
        }

        let request = SubmitRequest { game, score };
        let reply = self.backend.submit(&request, identity);
        log::info!("{game}: submitting {score} to {}", self.backend.name());
        self.in_flight.push(InFlight { game, score, reply });
        SubmitDecision::Sent
    }

    /// Drain finished submissions
    pub fn poll(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        let mut still_waiting = Vec::with_capacity(self.in_flight.len());

        for mut pending in self.in_flight.drain(..) {
            let Some(result) = pending.reply.poll() else {
                still_waiting.push(pending);
                continue;
            };
            let (game, score) = (pending.game, pending.score);
            match result {
                Ok(response) if response.success => {
                    if response.is_new_best {
                        self.personal_bests.insert(game, score);
                    }
                    notices.push(Notice::Submitted {
                        game,
                        score,
                        new_best: response.is_new_best,
                    });
                }
                Ok(_) => {
                    log::warn!("{game}: leaderboard rejected {score}");
                    notices.push(Notice::Failed {
                        game,
                        score,
                        error: LeaderboardError::Rejected,
                    });
                }
                Err(error) => {
                    log::warn!("{game}: score submission failed: {error}");
                    notices.push(Notice::Failed { game, score, error });
                }
            }
        }

        self.in_flight = still_waiting;
        notices
    }

    /// Request standings; the reply is polled by the caller
    pub fn fetch(&self, query: &LeaderboardQuery) -> PendingReply<Vec<LeaderboardEntry>> {
        self.backend.fetch(query)
    }
}
