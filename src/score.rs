//! Score normalization
//!
//! Turns each game's raw metric into a comparable score plus the direction
//! in which scores improve. Everything here is pure.

use serde::{Deserialize, Serialize};

use crate::sim::GameId;

/// Memory match base score before move/time penalties
pub const MEMORY_BASE_SCORE: u64 = 10_000;
/// Penalty per move (pair of reveals)
pub const MEMORY_MOVE_PENALTY: u64 = 100;
/// Penalty per elapsed second
pub const MEMORY_SECOND_PENALTY: u64 = 10;

/// Which way scores improve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Lower is better (reaction time)
    Ascending,
    /// Higher is better
    Descending,
}

/// Raw per-game measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawMetric {
    /// Plain counter (pipes, points, WPM)
    Counter(u64),
    /// Elapsed milliseconds
    Millis(u64),
    /// Memory match result
    MovesAndTime { moves: u32, seconds: u32 },
}

/// A comparable score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub value: u64,
    pub order: SortOrder,
}

impl Score {
    /// True if this score improves on `previous` (no previous always improves)
    pub fn beats(&self, previous: Option<u64>) -> bool {
        is_improvement(self.order, self.value, previous)
    }

    /// Scores of zero are never worth submitting, except reaction times
    /// which are always positive anyway
    pub fn is_submittable(&self) -> bool {
        self.value > 0
    }
}

/// Comparison direction for a game
pub fn sort_order(game: GameId) -> SortOrder {
    match game {
        GameId::Reaction => SortOrder::Ascending,
        _ => SortOrder::Descending,
    }
}

/// Improvement predicate shared by the client and the local leaderboard
pub fn is_improvement(order: SortOrder, candidate: u64, previous: Option<u64>) -> bool {
    match previous {
        None => true,
        Some(best) => match order {
            SortOrder::Ascending => candidate < best,
            SortOrder::Descending => candidate > best,
        },
    }
}

/// Memory match score: `max(0, 10000 - moves*100 - seconds*10)`
pub fn memory_score(moves: u32, seconds: u32) -> u64 {
    let penalty = u64::from(moves) * MEMORY_MOVE_PENALTY
        + u64::from(seconds) * MEMORY_SECOND_PENALTY;
    MEMORY_BASE_SCORE.saturating_sub(penalty)
}

/// Normalize a raw metric into a comparable score
pub fn normalize(game: GameId, raw: RawMetric) -> Score {
    let value = match raw {
        RawMetric::Counter(n) | RawMetric::Millis(n) => n,
        RawMetric::MovesAndTime { moves, seconds } => memory_score(moves, seconds),
    };
    Score {
        value,
        order: sort_order(game),
    }
}
