//! Device-local leaderboard
//!
//! Same rules as the hosted service: a row is only added when it beats the
//! player's personal best, reaction times rank lowest first, everything
//! else highest first. Optionally persisted to the key-value store.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::{
    Identity, LeaderboardBackend, LeaderboardEntry, LeaderboardQuery, PendingReply,
    SubmitRequest, SubmitResponse,
};
use crate::error::LeaderboardError;
use crate::platform;
use crate::score::{SortOrder, is_improvement, sort_order};
use crate::sim::GameId;
use crate::storage::KeyValueStore;

/// Rows kept per game before the worst are dropped
pub const MAX_ROWS_PER_GAME: usize = 100;

/// A stored score row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ScoreRow {
    username: String,
    game: GameId,
    score: u64,
    /// Unix timestamp (ms) when achieved
    created_at: f64,
}

/// Leaderboard held in memory (and optionally in the key-value store)
pub struct LocalLeaderboard {
    rows: RefCell<Vec<ScoreRow>>,
    store: Option<Rc<dyn KeyValueStore>>,
    clock: fn() -> f64,
}

impl Default for LocalLeaderboard {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalLeaderboard {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "pastel_arcade_leaderboard";

    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            rows: RefCell::new(Vec::new()),
            store: None,
            clock: platform::wall_clock_ms,
        }
    }

    /// Load rows from the store and save back after every accepted score
    pub fn load(store: Rc<dyn KeyValueStore>) -> Self {
        let rows = match store.get(Self::STORAGE_KEY) {
            Ok(Some(json)) => serde_json::from_str::<Vec<ScoreRow>>(&json).unwrap_or_else(|e| {
                log::warn!("Discarding corrupt local leaderboard: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Could not read local leaderboard: {e}");
                Vec::new()
            }
        };
        log::info!("Loaded {} local leaderboard rows", rows.len());
        Self {
            rows: RefCell::new(rows),
            store: Some(store),
            clock: platform::wall_clock_ms,
        }
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: fn() -> f64) -> Self {
        self.clock = clock;
        self
    }

    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    /// Player's best for a game
    pub fn personal_best(&self, username: &str, game: GameId) -> Option<u64> {
        let rows = self.rows.borrow();
        let scores = rows
            .iter()
            .filter(|r| r.game == game && r.username == username)
            .map(|r| r.score);
        match sort_order(game) {
            SortOrder::Ascending => scores.min(),
            SortOrder::Descending => scores.max(),
        }
    }

    /// Record a score if it beats the player's personal best
    pub fn add_score(&self, username: &str, game: GameId, score: u64) -> bool {
        let best = self.personal_best(username, game);
        if !is_improvement(sort_order(game), score, best) {
            return false;
        }

        let mut rows = self.rows.borrow_mut();
        rows.push(ScoreRow {
            username: username.to_string(),
            game,
            score,
            created_at: (self.clock)(),
        });

        // Trim the worst rows of this game
        let count = rows.iter().filter(|r| r.game == game).count();
        if count > MAX_ROWS_PER_GAME {
            let worst = ranked(&rows, Some(game)).last().map(|r| (*r).clone());
            if let Some(worst) = worst {
                rows.retain(|r| *r != worst);
            }
        }
        drop(rows);

        self.save();
        true
    }

    /// Top rows for a query, ranked from 1
    pub fn top(&self, query: &LeaderboardQuery) -> Vec<LeaderboardEntry> {
        let rows = self.rows.borrow();
        ranked(&rows, query.game)
            .into_iter()
            .take(query.limit)
            .enumerate()
            .map(|(i, r)| LeaderboardEntry {
                rank: i as u32 + 1,
                username: r.username.clone(),
                score: r.score,
                game: r.game.as_str().to_string(),
                date: platform::format_utc(r.created_at),
            })
            .collect()
    }

    fn save(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let result = serde_json::to_string(&*self.rows.borrow())
            .map_err(Into::into)
            .and_then(|json| store.set(Self::STORAGE_KEY, &json));
        match result {
            Ok(()) => log::debug!("Local leaderboard saved ({} rows)", self.len()),
            Err(e) => log::warn!("Could not save local leaderboard: {e}"),
        }
    }
}

/// Rows of one game (or all) in display order; ties keep insertion order
///
/// The all-games view sorts highest first, like the hosted service.
fn ranked(rows: &[ScoreRow], game: Option<GameId>) -> Vec<&ScoreRow> {
    let mut out: Vec<&ScoreRow> = rows
        .iter()
        .filter(|r| game.is_none_or(|g| r.game == g))
        .collect();
    match game.map(sort_order) {
        Some(SortOrder::Ascending) => out.sort_by_key(|r| r.score),
        _ => out.sort_by_key(|r| std::cmp::Reverse(r.score)),
    }
    out
}

impl LeaderboardBackend for LocalLeaderboard {
    fn name(&self) -> &'static str {
        "local"
    }

    fn submit(&self, request: &SubmitRequest, identity: &Identity) -> PendingReply<SubmitResponse> {
        if identity.username.is_empty() {
            return PendingReply::ready(Err(LeaderboardError::Unauthorized));
        }
        let is_new_best = self.add_score(&identity.username, request.game, request.score);
        let message = if is_new_best {
            "New personal best! Score submitted successfully"
        } else {
            "Score not better than personal best"
        };
        PendingReply::ready(Ok(SubmitResponse {
            success: true,
            message: Some(message.to_string()),
            is_new_best,
        }))
    }

    fn fetch(&self, query: &LeaderboardQuery) -> PendingReply<Vec<LeaderboardEntry>> {
        PendingReply::ready(Ok(self.top(query)))
    }
}
