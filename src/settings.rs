//! Player preferences and service configuration
//!
//! Persisted as one JSON document in the key-value store, separately from
//! the cached bests.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::leaderboard::{DEFAULT_LIMIT, Identity};
use crate::sim::{CoreOptions, Difficulty, SnakeMode};
use crate::storage::KeyValueStore;

/// Arcade settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Leaderboard ===
    /// Base URL of the leaderboard service; None keeps scores on this device
    pub leaderboard_url: Option<String>,
    /// Display name of the signed-in player
    pub player: Option<String>,
    /// Bearer token issued at sign-in
    pub token: Option<String>,
    /// Rows fetched per leaderboard
    pub leaderboard_limit: usize,
    /// Submit new personal bests automatically
    pub submit_scores: bool,

    // === Games ===
    pub snake_mode: SnakeMode,
    pub memory_difficulty: Difficulty,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            leaderboard_url: None,
            player: None,
            token: None,
            leaderboard_limit: DEFAULT_LIMIT,
            submit_scores: true,

            snake_mode: SnakeMode::default(),
            memory_difficulty: Difficulty::default(),
            seed: None,
        }
    }
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "pastel_arcade_settings";

    /// Load settings, falling back to defaults on missing or corrupt data
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(Self::STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings");
                    settings
                }
                Err(e) => {
                    log::warn!("Corrupt settings, using defaults: {e}");
                    Self::default()
                }
            },
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Could not read settings, using defaults: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        let json = serde_json::to_string(self)?;
        store.set(Self::STORAGE_KEY, &json)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Options for building a simulation core
    pub fn core_options(&self) -> CoreOptions {
        CoreOptions {
            snake_mode: self.snake_mode,
            memory_difficulty: self.memory_difficulty,
        }
    }

    /// Signed-in identity, if both name and token are known
    pub fn identity(&self) -> Option<Identity> {
        match (&self.player, &self.token) {
            (Some(username), Some(token)) if !username.is_empty() && !token.is_empty() => {
                Some(Identity {
                    username: username.clone(),
                    token: token.clone(),
                })
            }
            _ => None,
        }
    }

    /// Identity for the on-device leaderboard, which only needs a name
    pub fn local_identity(&self) -> Option<Identity> {
        self.identity().or_else(|| {
            self.player
                .as_ref()
                .filter(|name| !name.is_empty())
                .map(|name| Identity {
                    username: name.clone(),
                    token: String::new(),
                })
        })
    }

    /// Configured seed, or a fresh one from the clock
    pub fn seed_or_entropy(&self) -> u64 {
        self.seed.unwrap_or_else(crate::sim::rng::entropy_seed)
    }

    /// Override from `ARCADE_*` environment variables
    #[cfg(not(target_arch = "wasm32"))]
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    /// Override from any `ARCADE_*` variable lookup
    pub fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("ARCADE_LEADERBOARD_URL") {
            self.leaderboard_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(player) = var("ARCADE_PLAYER") {
            self.player = Some(player);
        }
        if let Some(token) = var("ARCADE_TOKEN") {
            self.token = Some(token);
        }
        if let Some(seed) = var("ARCADE_SEED") {
            match seed.parse() {
                Ok(seed) => self.seed = Some(seed),
                Err(_) => log::warn!("Ignoring ARCADE_SEED={seed:?}"),
            }
        }
        if let Some(mode) = var("ARCADE_SNAKE_MODE") {
            match SnakeMode::parse(&mode) {
                Some(m) => self.snake_mode = m,
                None => log::warn!("Ignoring ARCADE_SNAKE_MODE={mode:?}"),
            }
        }
        if let Some(difficulty) = var("ARCADE_MEMORY_DIFFICULTY") {
            match Difficulty::parse(&difficulty) {
                Some(d) => self.memory_difficulty = d,
                None => log::warn!("Ignoring ARCADE_MEMORY_DIFFICULTY={difficulty:?}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_round_trip_through_store() {
        let store = MemoryStore::new();
        assert_eq!(Settings::load(&store), Settings::default());

        let settings = Settings {
            player: Some("ada".into()),
            memory_difficulty: Difficulty::Hard,
            seed: Some(7),
            ..Settings::default()
        };
        settings.save(&store).unwrap();
        assert_eq!(Settings::load(&store), settings);
    }

    #[test]
    fn test_corrupt_or_partial_json() {
        let store = MemoryStore::new();
        store.set(Settings::STORAGE_KEY, "{oops").unwrap();
        assert_eq!(Settings::load(&store), Settings::default());

        // Missing fields take defaults
        store
            .set(Settings::STORAGE_KEY, r#"{"snake_mode":"Classic"}"#)
            .unwrap();
        let settings = Settings::load(&store);
        assert_eq!(settings.snake_mode, SnakeMode::Classic);
        assert_eq!(settings.leaderboard_limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_identity_needs_name_and_token() {
        let mut settings = Settings {
            player: Some("ada".into()),
            ..Settings::default()
        };
        assert!(settings.identity().is_none());
        assert_eq!(settings.local_identity().unwrap().token, "");
        settings.token = Some("t0k".into());
        assert_eq!(settings.identity().unwrap().username, "ada");
        assert_eq!(settings.local_identity().unwrap().token, "t0k");

        settings.player = Some(String::new());
        assert!(settings.local_identity().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_vars(|name| match name {
            "ARCADE_LEADERBOARD_URL" => Some("http://localhost:3000/".into()),
            "ARCADE_SEED" => Some("not-a-number".into()),
            "ARCADE_SNAKE_MODE" => Some("Classic".into()),
            "ARCADE_MEMORY_DIFFICULTY" => Some("easy".into()),
            _ => None,
        });
        assert_eq!(settings.leaderboard_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(settings.seed, None);
        assert_eq!(settings.snake_mode, SnakeMode::Classic);
        assert_eq!(settings.memory_difficulty, Difficulty::Easy);
    }
}
