//! Local best-score cache
//!
//! One decimal value per key in the injected store (`flappyHighScore`,
//! `reaction-best`, `memory-highscore-hard`, ...). Storage trouble never
//! reaches the player: failures are logged and read as "no best yet".

use std::rc::Rc;

use crate::score::Score;
use crate::storage::KeyValueStore;

/// Best score per cache key
#[derive(Clone)]
pub struct HighScoreCache {
    store: Rc<dyn KeyValueStore>,
}

impl HighScoreCache {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Cached best for `key`, or None when absent, unreadable or garbled
    pub fn best(&self, key: &str) -> Option<u64> {
        match self.store.get(key) {
            Ok(Some(raw)) => match raw.trim().parse::<u64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    log::warn!("Ignoring malformed cached best {key}={raw:?}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("Could not read cached best {key}: {e}");
                None
            }
        }
    }

    /// Check if a score would replace the cached best
    pub fn qualifies(&self, key: &str, score: Score) -> bool {
        score.is_submittable() && score.beats(self.best(key))
    }

    /// Store `score` if it improves on the cached best
    ///
    /// Returns true when the cache now holds a new best.
    pub fn record(&self, key: &str, score: Score) -> bool {
        if !self.qualifies(key, score) {
            return false;
        }
        match self.store.set(key, &score.value.to_string()) {
            Ok(()) => {
                log::info!("New local best {key}={}", score.value);
                true
            }
            Err(e) => {
                log::warn!("Could not save cached best {key}: {e}");
                false
            }
        }
    }
}

impl std::fmt::Debug for HighScoreCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighScoreCache").finish_non_exhaustive()
    }
}
