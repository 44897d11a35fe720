//! Error types for the arcade engine

use thiserror::Error;

/// Failures talking to the leaderboard service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeaderboardError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not signed in")]
    Unauthorized,

    #[error("Leaderboard service returned HTTP {0}")]
    Status(u16),

    #[error("Malformed leaderboard response: {0}")]
    Decode(String),

    #[error("Submission rejected by the leaderboard")]
    Rejected,

    #[error("Leaderboard request was dropped before replying")]
    Disconnected,
}

/// Failures reading or writing the local key-value store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
