//! Game session: one play-through of one game
//!
//! Wraps a [`SimulationCore`] with the parts every game shares: the input
//! intent queue, lifecycle bookkeeping, the local best-score cache, and the
//! terminal score handed to the leaderboard. Nothing that happens inside a
//! tick is allowed to escape it; a panicking simulation is forced into
//! `GameOver` instead.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use crate::highscores::HighScoreCache;
use crate::score::{RawMetric, Score, normalize};
use crate::sim::{
    CoreOptions, GameId, Intent, Phase, Rearm, Simulation, SimulationCore, TimedIntent,
};

/// Score ready to be sent to the leaderboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSubmission {
    pub game: GameId,
    pub raw: RawMetric,
    pub score: Score,
    /// Player name at the time of the run, if signed in
    pub player: Option<String>,
}

/// Something the host should react to after a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    PhaseChanged { from: Phase, to: Phase },
    /// The local cache now holds a better score (first improvement per run)
    NewLocalBest { key: String, value: u64 },
    /// Reflex foul: input arrived before the go signal
    Fouled,
    /// A tick panicked; the run was ended
    Aborted { reason: String },
    /// Run finished with its frozen score
    GameOver {
        score: Option<Score>,
        submission: Option<ScoreSubmission>,
    },
}

/// One run of one game
#[derive(Debug)]
pub struct GameSession {
    core: SimulationCore,
    phase: Phase,
    started_at: Option<f64>,
    ended_at: Option<f64>,
    /// Frozen at the terminal transition
    score: Option<Score>,
    raw: Option<RawMetric>,
    /// Cached best when the run started
    cached_best: Option<u64>,
    cache: Option<HighScoreCache>,
    player: Option<String>,
    intents: VecDeque<TimedIntent>,
    beat_local_best: bool,
}

impl GameSession {
    pub fn new(game: GameId, options: CoreOptions, seed: u64) -> Self {
        Self::from_core(SimulationCore::new(game, options, seed))
    }

    pub fn from_core(core: SimulationCore) -> Self {
        Self {
            phase: core.phase(),
            core,
            started_at: None,
            ended_at: None,
            score: None,
            raw: None,
            cached_best: None,
            cache: None,
            player: None,
            intents: VecDeque::new(),
            beat_local_best: false,
        }
    }

    /// Attach the local best-score cache and read the current best
    pub fn with_cache(mut self, cache: HighScoreCache) -> Self {
        self.cached_best = cache.best(&self.core.cache_key());
        self.cache = Some(cache);
        self
    }

    pub fn with_player(mut self, player: Option<String>) -> Self {
        self.player = player;
        self
    }

    pub fn game(&self) -> GameId {
        self.core.game()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn core(&self) -> &SimulationCore {
        &self.core
    }

    pub fn started_at(&self) -> Option<f64> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<f64> {
        self.ended_at
    }

    /// Final score; only meaningful once the run is over
    pub fn score(&self) -> Option<Score> {
        if self.phase.is_terminal() { self.score } else { None }
    }

    /// Score so far, for the HUD
    pub fn live_score(&self) -> Option<Score> {
        self.core.metric().map(|raw| normalize(self.game(), raw))
    }

    /// Best score known locally (cached at start, raised by this run)
    pub fn cached_best(&self) -> Option<u64> {
        self.cached_best
    }

    pub fn pending_intents(&self) -> usize {
        self.intents.len()
    }

    /// Queue an input; it takes effect at the next tick
    pub fn push_intent(&mut self, intent: Intent, at_ms: f64) {
        self.intents.push_back(TimedIntent::new(intent, at_ms));
    }

    /// Abandon the run and return to `Idle`
    pub fn reset(&mut self) {
        self.reset_run();
        self.phase = self.core.phase();
    }

    fn reset_run(&mut self) {
        self.core.reset();
        self.started_at = None;
        self.ended_at = None;
        self.score = None;
        self.raw = None;
        self.beat_local_best = false;
        if let Some(cache) = &self.cache {
            self.cached_best = cache.best(&self.core.cache_key());
        }
    }

    /// Apply queued intents, then advance the simulation by one tick
    ///
    /// Panics inside the simulation are caught and end the run on native
    /// targets; `wasm32-unknown-unknown` aborts on panic, so there the
    /// guard never fires.
    pub fn tick(&mut self, now_ms: f64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let batch: Vec<TimedIntent> = self.intents.drain(..).collect();

        for input in batch {
            match input.intent {
                Intent::Reset => {
                    self.reset_run();
                    self.sync_phase(input.at_ms, &mut events);
                }
                _ if self.phase.is_terminal() => match self.core.on_terminal(&input.intent) {
                    Rearm::Restart => {
                        self.reset_run();
                        self.step_guarded(|core| core.apply(&input), input.at_ms, &mut events);
                    }
                    Rearm::Idle => {
                        self.reset_run();
                        self.sync_phase(input.at_ms, &mut events);
                    }
                    Rearm::Ignore => {}
                },
                _ => self.step_guarded(|core| core.apply(&input), input.at_ms, &mut events),
            }
        }
        self.step_guarded(|core| core.advance(now_ms), now_ms, &mut events);
        events
    }

    /// Run one mutation of the core, catching panics at the boundary
    fn step_guarded(
        &mut self,
        f: impl FnOnce(&mut SimulationCore),
        now_ms: f64,
        events: &mut Vec<SessionEvent>,
    ) {
        let core = &mut self.core;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(core))) {
            let reason = panic_message(payload.as_ref());
            log::error!("{}: tick panicked, forcing game over: {reason}", self.game());
            self.core.force_game_over(now_ms);
            events.push(SessionEvent::Aborted { reason });
        }
        self.track_local_best(events);
        self.sync_phase(now_ms, events);
    }

    fn track_local_best(&mut self, events: &mut Vec<SessionEvent>) {
        let (Some(cache), Some(raw)) = (&self.cache, self.core.metric()) else {
            return;
        };
        let score = normalize(self.game(), raw);
        let key = self.core.cache_key();
        if cache.record(&key, score) {
            self.cached_best = Some(score.value);
            if !self.beat_local_best {
                self.beat_local_best = true;
                events.push(SessionEvent::NewLocalBest {
                    key,
                    value: score.value,
                });
            }
        }
    }

    fn sync_phase(&mut self, now_ms: f64, events: &mut Vec<SessionEvent>) {
        let to = self.core.phase();
        let from = self.phase;
        if to == from {
            return;
        }
        self.phase = to;
        log::debug!("{}: {from:?} -> {to:?}", self.game());
        events.push(SessionEvent::PhaseChanged { from, to });

        if to.is_active() && self.started_at.is_none() {
            self.started_at = Some(now_ms);
        }
        match to {
            Phase::GameOver => {
                self.ended_at = Some(now_ms);
                self.raw = self.core.metric();
                self.score = self.raw.map(|raw| normalize(self.game(), raw));
                let submission = self.submission();
                log::info!(
                    "{}: game over, score {:?}",
                    self.game(),
                    self.score.map(|s| s.value)
                );
                events.push(SessionEvent::GameOver {
                    score: self.score,
                    submission,
                });
            }
            Phase::TooEarly => {
                self.ended_at = Some(now_ms);
                events.push(SessionEvent::Fouled);
            }
            _ => {}
        }
    }

    /// Submission for the frozen score, if it is worth sending
    pub fn submission(&self) -> Option<ScoreSubmission> {
        match (self.phase, self.raw, self.score) {
            (Phase::GameOver, Some(raw), Some(score)) if score.is_submittable() => {
                Some(ScoreSubmission {
                    game: self.game(),
                    raw,
                    score,
                    player: self.player.clone(),
                })
            }
            _ => None,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::consts::SIM_DT_MS;
    use crate::score::SortOrder;
    use crate::sim::{Difficulty, Direction, SnakeMode};
    use crate::storage::{KeyValueStore, MemoryStore};

    fn session(game: GameId) -> GameSession {
        GameSession::new(game, CoreOptions::default(), 11)
    }

    fn run_until(
        session: &mut GameSession,
        mut now: f64,
        done: impl Fn(&GameSession) -> bool,
    ) -> (f64, Vec<SessionEvent>) {
        let mut events = Vec::new();
        for _ in 0..100_000 {
            now += SIM_DT_MS;
            events.extend(session.tick(now));
            if done(session) {
                return (now, events);
            }
        }
        panic!("session never reached the expected state");
    }

    #[test]
    fn test_intent_waits_for_next_tick() {
        let mut s = session(GameId::FlappyBird);
        s.push_intent(Intent::Flap, 5.0);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.pending_intents(), 1);

        let events = s.tick(SIM_DT_MS);
        assert_eq!(s.phase(), Phase::Playing);
        assert_eq!(s.pending_intents(), 0);
        assert_eq!(s.started_at(), Some(5.0));
        assert!(events.contains(&SessionEvent::PhaseChanged {
            from: Phase::Idle,
            to: Phase::Playing,
        }));
    }

    #[test]
    fn test_flappy_falls_to_game_over_with_frozen_score() {
        let mut s = session(GameId::FlappyBird);
        s.push_intent(Intent::Start, 0.0);
        let (end, events) = run_until(&mut s, 0.0, |s| s.phase().is_terminal());
        assert_eq!(s.phase(), Phase::GameOver);
        assert_eq!(s.ended_at(), Some(end));
        assert_eq!(s.score().map(|sc| sc.value), Some(0));
        // Zero is never submitted
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::GameOver { submission: None, .. }
        )));

        // Further ticks change nothing
        assert!(s.tick(end + 1000.0).is_empty());
        assert_eq!(s.ended_at(), Some(end));
    }

    #[test]
    fn test_score_hidden_until_terminal() {
        let mut s = session(GameId::Snake);
        s.push_intent(Intent::Start, 0.0);
        s.tick(SIM_DT_MS);
        assert_eq!(s.phase(), Phase::Playing);
        assert!(s.live_score().is_some());
        assert!(s.score().is_none());
    }

    #[test]
    fn test_reaction_foul_is_not_game_over() {
        let mut s = session(GameId::Reaction);
        s.push_intent(Intent::Click, 0.0);
        s.tick(SIM_DT_MS);
        assert_eq!(s.phase(), Phase::Countdown);
        s.push_intent(Intent::Click, 500.0);
        let events = s.tick(2.0 * SIM_DT_MS);
        assert_eq!(s.phase(), Phase::TooEarly);
        assert!(events.contains(&SessionEvent::Fouled));
        assert!(s.score().is_none());
        assert!(s.submission().is_none());
    }

    #[test]
    fn test_reaction_submission_ascending() {
        let mut s = session(GameId::Reaction).with_player(Some("ada".into()));
        s.push_intent(Intent::Click, 0.0);
        let (ready, _) = run_until(&mut s, 0.0, |s| s.phase() == Phase::Playing);
        s.push_intent(Intent::Click, ready + 222.0);
        let events = s.tick(ready + SIM_DT_MS * 14.0);

        let submission = events
            .iter()
            .find_map(|e| match e {
                SessionEvent::GameOver { submission, .. } => submission.clone(),
                _ => None,
            })
            .unwrap();
        assert_eq!(submission.score.value, 222);
        assert_eq!(submission.score.order, SortOrder::Ascending);
        assert_eq!(submission.player.as_deref(), Some("ada"));
    }

    #[test]
    fn test_start_after_game_over_restarts() {
        let mut s = session(GameId::FlappyBird);
        s.push_intent(Intent::Start, 0.0);
        let (end, _) = run_until(&mut s, 0.0, |s| s.phase().is_terminal());

        s.push_intent(Intent::Start, end + 100.0);
        s.tick(end + 100.0);
        assert_eq!(s.phase(), Phase::Playing);
        assert_eq!(s.started_at(), Some(end + 100.0));
        assert_eq!(s.ended_at(), None);
        assert!(s.score().is_none());
    }

    #[test]
    fn test_reaction_click_after_foul_rearms() {
        let mut s = session(GameId::Reaction);
        s.push_intent(Intent::Click, 0.0);
        s.tick(SIM_DT_MS);
        s.push_intent(Intent::Click, 500.0);
        s.tick(2.0 * SIM_DT_MS);
        assert_eq!(s.phase(), Phase::TooEarly);

        s.push_intent(Intent::Click, 600.0);
        let events = s.tick(3.0 * SIM_DT_MS);
        assert_eq!(s.phase(), Phase::Countdown);
        assert_eq!(s.started_at(), Some(600.0));
        assert_eq!(s.ended_at(), None);
        assert!(events.contains(&SessionEvent::PhaseChanged {
            from: Phase::TooEarly,
            to: Phase::Countdown,
        }));
    }

    #[test]
    fn test_reaction_click_after_result_rearms() {
        let mut s = session(GameId::Reaction);
        s.push_intent(Intent::Click, 0.0);
        let (ready, _) = run_until(&mut s, 0.0, |s| s.phase() == Phase::Playing);
        s.push_intent(Intent::Click, ready + 250.0);
        s.tick(ready + SIM_DT_MS * 16.0);
        assert_eq!(s.phase(), Phase::GameOver);

        let again = ready + 2000.0;
        s.push_intent(Intent::Click, again);
        s.tick(again + SIM_DT_MS);
        assert_eq!(s.phase(), Phase::Countdown);
        assert!(s.score().is_none());
    }

    #[test]
    fn test_snake_turn_after_game_over_goes_idle() {
        let mut s = session(GameId::Snake);
        s.push_intent(Intent::Start, 0.0);
        let (end, _) = run_until(&mut s, 0.0, |s| s.phase().is_terminal());
        assert_eq!(s.phase(), Phase::GameOver);

        s.push_intent(Intent::Turn(Direction::Down), end + 100.0);
        let events = s.tick(end + 100.0);
        assert_eq!(s.phase(), Phase::Idle);
        assert!(events.contains(&SessionEvent::PhaseChanged {
            from: Phase::GameOver,
            to: Phase::Idle,
        }));

        s.push_intent(Intent::Turn(Direction::Up), end + 200.0);
        s.tick(end + 200.0);
        assert_eq!(s.phase(), Phase::Playing);
        assert_eq!(s.started_at(), Some(end + 200.0));
    }

    #[test]
    fn test_flap_after_game_over_is_ignored() {
        let mut s = session(GameId::FlappyBird);
        s.push_intent(Intent::Start, 0.0);
        let (end, _) = run_until(&mut s, 0.0, |s| s.phase().is_terminal());
        s.push_intent(Intent::Flap, end + 50.0);
        assert!(s.tick(end + 50.0).is_empty());
        assert_eq!(s.phase(), Phase::GameOver);
    }

    #[test]
    fn test_reset_intent_returns_to_idle() {
        let mut s = session(GameId::Snake);
        s.push_intent(Intent::Turn(Direction::Up), 0.0);
        s.tick(SIM_DT_MS);
        assert_eq!(s.phase(), Phase::Playing);
        s.push_intent(Intent::Reset, 20.0);
        let events = s.tick(2.0 * SIM_DT_MS);
        assert_eq!(s.phase(), Phase::Idle);
        assert!(events.contains(&SessionEvent::PhaseChanged {
            from: Phase::Playing,
            to: Phase::Idle,
        }));
        assert_eq!(s.started_at(), None);
    }

    #[test]
    fn test_panicking_tick_forces_game_over() {
        let mut s = session(GameId::Memory);
        s.push_intent(Intent::Start, 0.0);
        s.tick(SIM_DT_MS);
        let SimulationCore::Memory(game) = &mut s.core else {
            unreachable!()
        };
        let first = game.cards[0].face;
        let other = game.cards.iter().position(|c| c.face != first).unwrap();
        s.push_intent(Intent::Flip(0), 20.0);
        s.push_intent(Intent::Flip(other), 20.0);
        s.tick(2.0 * SIM_DT_MS);
        assert_eq!(s.phase(), Phase::Playing);

        // Corrupt the deck so hiding the mismatched pair indexes past the end
        let SimulationCore::Memory(game) = &mut s.core else {
            unreachable!()
        };
        game.cards.clear();

        let (_, events) = run_until(&mut s, 2.0 * SIM_DT_MS, |s| s.phase().is_terminal());
        assert_eq!(s.phase(), Phase::GameOver);
        assert!(events.iter().any(|e| matches!(e, SessionEvent::Aborted { .. })));
        assert!(events.iter().any(|e| matches!(e, SessionEvent::GameOver { .. })));
        assert!(s.submission().is_none());
    }

    #[test]
    fn test_cache_read_at_start_and_raised() {
        let store = Rc::new(MemoryStore::new());
        store.set("memory-highscore-easy", "9000").unwrap();
        let cache = HighScoreCache::new(store.clone());

        let options = CoreOptions {
            snake_mode: SnakeMode::Classic,
            memory_difficulty: Difficulty::Easy,
        };
        let mut s = GameSession::new(GameId::Memory, options, 3).with_cache(cache);
        assert_eq!(s.cached_best(), Some(9000));

        s.push_intent(Intent::Start, 0.0);
        s.tick(SIM_DT_MS);
        let SimulationCore::Memory(game) = s.core() else {
            unreachable!()
        };
        let pairs: Vec<(usize, usize)> = (0..Difficulty::Easy.pairs())
            .map(|face| {
                let idx: Vec<usize> = game
                    .cards
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.face == face)
                    .map(|(i, _)| i)
                    .collect();
                (idx[0], idx[1])
            })
            .collect();
        for (a, b) in pairs {
            s.push_intent(Intent::Flip(a), 100.0);
            s.push_intent(Intent::Flip(b), 100.0);
        }
        let events = s.tick(2.0 * SIM_DT_MS);

        // 4 moves, 0 seconds
        assert_eq!(s.score().map(|sc| sc.value), Some(9600));
        assert!(events.contains(&SessionEvent::NewLocalBest {
            key: "memory-highscore-easy".into(),
            value: 9600,
        }));
        assert_eq!(store.get("memory-highscore-easy").unwrap().as_deref(), Some("9600"));
        assert_eq!(s.cached_best(), Some(9600));
    }
}
