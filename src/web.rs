//! Browser bindings
//!
//! The page owns the canvas, the DOM and the `requestAnimationFrame` loop;
//! [`WebArcade`] owns everything else. Structured results cross the
//! boundary as JSON strings.

use std::rc::Rc;

use glam::Vec2;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::highscores::HighScoreCache;
use crate::leaderboard::{
    FetchLeaderboard, Identity, LeaderboardBackend, LeaderboardClient, LeaderboardEntry, LeaderboardQuery,
    LocalLeaderboard, Notice, PendingReply, SubmitDecision,
};
use crate::runner::{FrameOutcome, LoopToken, SessionRunner};
use crate::score::{Score, is_improvement, sort_order};
use crate::session::{GameSession, SessionEvent};
use crate::settings::Settings;
use crate::sim::{
    Difficulty, Direction, GameId, Intent, Phase, Sandbox, SimulationCore, SnakeMode,
};
use crate::storage::{KeyValueStore, LocalStorageStore, MemoryStore};

/// Swipes shorter than this (CSS px) are taps
const MIN_SWIPE_PX: f32 = 30.0;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"logger already initialised".into());
    }
    log::info!("Pastel Arcade starting...");
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::error!("Could not serialise response: {e}");
        "null".to_string()
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NoticeView {
    game: GameId,
    score: u64,
    ok: bool,
    new_best: bool,
    error: Option<String>,
}

impl From<Notice> for NoticeView {
    fn from(notice: Notice) -> Self {
        match notice {
            Notice::Submitted {
                game,
                score,
                new_best,
            } => Self {
                game,
                score,
                ok: true,
                new_best,
                error: None,
            },
            Notice::Failed { game, score, error } => Self {
                game,
                score,
                ok: false,
                new_best: false,
                error: Some(error.to_string()),
            },
        }
    }
}

#[derive(Serialize)]
struct FrameView<'a> {
    ticks: u32,
    phase: Option<Phase>,
    events: &'a [SessionEvent],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotView<'a> {
    game: GameId,
    phase: Phase,
    time_ms: f64,
    score: Option<Score>,
    live_score: Option<Score>,
    cached_best: Option<u64>,
    personal_best: Option<u64>,
    core: &'a SimulationCore,
}

/// Everything one page needs to run the arcade
#[wasm_bindgen]
pub struct WebArcade {
    store: Rc<dyn KeyValueStore>,
    settings: Settings,
    runner: SessionRunner,
    leaderboard: LeaderboardClient,
    notices: Vec<NoticeView>,
    standings: Option<PendingReply<Vec<LeaderboardEntry>>>,
    sandbox: Option<Sandbox>,
}

impl Default for WebArcade {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WebArcade {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WebArcade {
        let store: Rc<dyn KeyValueStore> = match LocalStorageStore::open() {
            Ok(store) => Rc::new(store),
            Err(e) => {
                log::warn!("Scores will not survive a reload: {e}");
                Rc::new(MemoryStore::new())
            }
        };
        let settings = Settings::load(store.as_ref());
        let leaderboard = build_leaderboard(&settings, &store);
        Self {
            store,
            settings,
            runner: SessionRunner::new(),
            leaderboard,
            notices: Vec::new(),
            standings: None,
            sandbox: None,
        }
    }

    // === Settings ===

    /// Current settings as JSON
    pub fn settings(&self) -> String {
        to_json(&self.settings)
    }

    /// Remember the signed-in player; an empty name signs out
    pub fn sign_in(&mut self, player: &str, token: &str) {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        self.settings.player = non_empty(player);
        self.settings.token = non_empty(token);
        self.save_settings();
        self.leaderboard.set_identity(self.identity());
    }

    /// Point at a hosted leaderboard, or keep scores on this device
    pub fn set_leaderboard_url(&mut self, url: Option<String>) {
        self.settings.leaderboard_url = url
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        self.save_settings();
        self.leaderboard = build_leaderboard(&self.settings, &self.store);
    }

    pub fn set_snake_mode(&mut self, mode: &str) -> bool {
        let Some(mode) = SnakeMode::parse(mode) else {
            return false;
        };
        self.settings.snake_mode = mode;
        self.save_settings();
        true
    }

    pub fn set_memory_difficulty(&mut self, difficulty: &str) -> bool {
        let Some(difficulty) = Difficulty::parse(difficulty) else {
            return false;
        };
        self.settings.memory_difficulty = difficulty;
        self.save_settings();
        true
    }

    // === Loop ===

    /// Open a game and return the loop id the page passes to `frame`
    pub fn open(&mut self, game: &str) -> Result<u32, JsValue> {
        let game = GameId::parse(game)
            .ok_or_else(|| JsValue::from_str(&format!("unknown game: {game}")))?;
        let session = GameSession::new(
            game,
            self.settings.core_options(),
            self.settings.seed_or_entropy(),
        )
        .with_cache(HighScoreCache::new(self.store.clone()))
        .with_player(self.settings.player.clone());
        let token = self.runner.start(session);
        log::info!("Opened {game}");
        Ok(token.id() as u32)
    }

    /// Close the current game; pending frames become no-ops
    pub fn close(&mut self) {
        if let Some(session) = self.runner.stop() {
            log::info!("Closed {}", session.game());
        }
    }

    /// Advance the running game to host time `now_ms`
    ///
    /// Returns undefined when `loop_id` is stale; the page must stop
    /// requesting frames for it.
    pub fn frame(&mut self, loop_id: u32, now_ms: f64) -> Option<String> {
        let outcome = self
            .runner
            .frame(LoopToken::from_id(u64::from(loop_id)), now_ms);
        let FrameOutcome::Ran { ticks, events } = outcome else {
            return None;
        };

        for event in &events {
            if let SessionEvent::GameOver {
                submission: Some(submission),
                ..
            } = event
            {
                if self.settings.submit_scores {
                    match self.leaderboard.submit(submission) {
                        SubmitDecision::Sent => {}
                        decision => log::debug!("{}: not submitted ({decision:?})", submission.game),
                    }
                }
            }
        }
        self.drain_notices();

        let phase = self.runner.session().map(|s| s.phase());
        Some(to_json(&FrameView {
            ticks,
            phase,
            events: &events,
        }))
    }

    /// State of the running game for the page to draw
    pub fn snapshot(&self, now_ms: f64) -> Option<String> {
        let session = self.runner.session()?;
        Some(to_json(&SnapshotView {
            game: session.game(),
            phase: session.phase(),
            time_ms: self.runner.session_time(now_ms),
            score: session.score(),
            live_score: session.live_score(),
            cached_best: session.cached_best(),
            personal_best: self.leaderboard.personal_best(session.game()),
            core: session.core(),
        }))
    }

    // === Input ===

    pub fn press_start(&mut self, now_ms: f64) -> bool {
        self.runner.push_intent(Intent::Start, now_ms)
    }

    pub fn flap(&mut self, now_ms: f64) -> bool {
        self.runner.push_intent(Intent::Flap, now_ms)
    }

    /// Arrow key, WASD or direction name
    pub fn turn(&mut self, key: &str, now_ms: f64) -> bool {
        match Direction::parse(key) {
            Some(dir) => self.runner.push_intent(Intent::Turn(dir), now_ms),
            None => false,
        }
    }

    pub fn swipe(&mut self, dx: f32, dy: f32, now_ms: f64) -> bool {
        match Direction::from_swipe(dx, dy, MIN_SWIPE_PX) {
            Some(dir) => self.runner.push_intent(Intent::Turn(dir), now_ms),
            None => false,
        }
    }

    pub fn flip(&mut self, index: usize, now_ms: f64) -> bool {
        self.runner.push_intent(Intent::Flip(index), now_ms)
    }

    pub fn click(&mut self, now_ms: f64) -> bool {
        self.runner.push_intent(Intent::Click, now_ms)
    }

    /// Full contents of the typing box
    pub fn text(&mut self, value: String, now_ms: f64) -> bool {
        self.runner.push_intent(Intent::Text(value), now_ms)
    }

    pub fn reset(&mut self, now_ms: f64) -> bool {
        self.runner.push_intent(Intent::Reset, now_ms)
    }

    // === Physics sandbox ===

    /// Open the sandbox on a canvas of the given size (CSS px)
    pub fn sandbox_open(&mut self, width: f32, height: f32) {
        self.sandbox = Some(Sandbox::new(width, height, self.settings.seed_or_entropy()));
    }

    pub fn sandbox_close(&mut self) {
        self.sandbox = None;
    }

    pub fn sandbox_spawn(&mut self, x: f32, y: f32) -> Option<u32> {
        self.sandbox.as_mut().map(|s| s.spawn(Vec2::new(x, y)))
    }

    pub fn sandbox_clear(&mut self) {
        if let Some(sandbox) = &mut self.sandbox {
            sandbox.clear();
        }
    }

    pub fn sandbox_toggle_gravity(&mut self) -> bool {
        self.sandbox.as_mut().is_some_and(|s| {
            s.toggle_gravity();
            s.gravity
        })
    }

    pub fn sandbox_toggle_pause(&mut self) -> bool {
        self.sandbox.as_mut().is_some_and(|s| {
            s.toggle_pause();
            s.paused
        })
    }

    pub fn sandbox_resize(&mut self, width: f32, height: f32) {
        if let Some(sandbox) = &mut self.sandbox {
            sandbox.resize(width, height);
        }
    }

    /// Advance one animation frame and return the balls to draw
    pub fn sandbox_step(&mut self) -> Option<String> {
        let sandbox = self.sandbox.as_mut()?;
        sandbox.step();
        Some(to_json(&*sandbox))
    }

    // === Leaderboard ===

    /// Finished submissions since the last call, as a JSON array
    pub fn take_notices(&mut self) -> String {
        self.drain_notices();
        to_json(&std::mem::take(&mut self.notices))
    }

    /// Ask for standings of one game, or of every game with `"all"`
    pub fn request_leaderboard(&mut self, game: &str) {
        let query = match GameId::parse(game) {
            Some(game) => LeaderboardQuery::game(game),
            None => LeaderboardQuery::all(),
        }
        .with_limit(self.settings.leaderboard_limit);
        self.standings = Some(self.leaderboard.fetch(&query));
    }

    /// Standings once they arrive; undefined while still loading
    pub fn poll_leaderboard(&mut self) -> Option<String> {
        let result = self.standings.as_mut()?.poll()?;
        self.standings = None;
        Some(match result {
            Ok(rows) => {
                self.learn_personal_bests(&rows);
                to_json(&rows)
            }
            Err(e) => {
                log::warn!("Could not load leaderboard: {e}");
                to_json(&serde_json::json!({ "error": e.to_string() }))
            }
        })
    }
}

impl WebArcade {
    fn identity(&self) -> Option<Identity> {
        identity_for(&self.settings)
    }

    fn save_settings(&self) {
        if let Err(e) = self.settings.save(self.store.as_ref()) {
            log::warn!("Could not save settings: {e}");
        }
    }

    fn drain_notices(&mut self) {
        self.notices
            .extend(self.leaderboard.poll().into_iter().map(NoticeView::from));
    }

    /// The signed-in player's rows double as their known personal bests
    fn learn_personal_bests(&mut self, rows: &[LeaderboardEntry]) {
        let Some(username) = self.leaderboard.identity().map(|i| i.username.clone()) else {
            return;
        };
        for row in rows.iter().filter(|r| r.username == username && r.score > 0) {
            let Some(game) = row.game_id() else {
                continue;
            };
            let best = self.leaderboard.personal_best(game);
            if is_improvement(sort_order(game), row.score, best) {
                self.leaderboard.set_personal_best(game, row.score);
            }
        }
    }
}

fn identity_for(settings: &Settings) -> Option<Identity> {
    match settings.leaderboard_url {
        Some(_) => settings.identity(),
        None => settings.local_identity(),
    }
}

fn build_leaderboard(settings: &Settings, store: &Rc<dyn KeyValueStore>) -> LeaderboardClient {
    let backend: Box<dyn LeaderboardBackend> = match &settings.leaderboard_url {
        Some(url) => Box::new(FetchLeaderboard::new(url)),
        None => Box::new(LocalLeaderboard::load(store.clone())),
    };
    let mut client = LeaderboardClient::new(backend);
    client.set_identity(identity_for(settings));
    log::info!("Leaderboard: {}", client.backend_name());
    client
}
