//! Reaction time test
//!
//! Click to arm, wait through a 3 second countdown plus a random hold, then
//! click as soon as the go signal shows. Clicking early is a foul.

use serde::Serialize;

use super::rng::SimRng;
use super::state::{GameId, Intent, Phase, Simulation, TimedIntent};
use crate::score::RawMetric;

/// Visible countdown length (3, 2, 1)
pub const COUNTDOWN_SECS: u32 = 3;
pub const COUNTDOWN_MS: f64 = COUNTDOWN_SECS as f64 * 1000.0;
/// Random hold after the countdown before the go signal
pub const MIN_HOLD_MS: f64 = 1500.0;
pub const MAX_HOLD_MS: f64 = 4000.0;

/// Human-readable rating for a reaction time
pub fn speed_rating(ms: u64) -> &'static str {
    match ms {
        0..150 => "Inhuman",
        150..200 => "Lightning Fast",
        200..250 => "Fast",
        250..300 => "Average",
        300..400 => "Slow",
        _ => "Sleepy?",
    }
}

/// Reaction test state
///
/// `attempts` and `best_ms` survive resets so a page can show history.
#[derive(Debug, Clone, Serialize)]
pub struct ReactionTest {
    pub phase: Phase,
    /// Last measured reaction time
    pub reaction_ms: Option<u64>,
    /// Every measured time this page session, oldest first
    pub attempts: Vec<u64>,
    pub best_ms: Option<u64>,
    pub started_at: Option<f64>,
    pub ended_at: Option<f64>,
    /// Scheduled go-signal time
    ready_at: f64,
    /// Tick at which the go signal was actually shown
    ready_since: Option<f64>,
    #[serde(skip)]
    rng: SimRng,
}

impl ReactionTest {
    pub fn new(seed: u64) -> Self {
        Self {
            phase: Phase::Idle,
            reaction_ms: None,
            attempts: Vec::new(),
            best_ms: None,
            started_at: None,
            ended_at: None,
            ready_at: 0.0,
            ready_since: None,
            rng: SimRng::new(seed),
        }
    }

    fn arm(&mut self, at_ms: f64) {
        let hold = self.rng.range_f64(MIN_HOLD_MS, MAX_HOLD_MS);
        self.phase = Phase::Countdown;
        self.reaction_ms = None;
        self.started_at = Some(at_ms);
        self.ended_at = None;
        self.ready_at = at_ms + COUNTDOWN_MS + hold;
        self.ready_since = None;
        log::debug!("reaction: armed, go signal in {:.0}ms", COUNTDOWN_MS + hold);
    }

    fn record(&mut self, at_ms: f64, ready_since: f64) {
        let ms = (at_ms - ready_since).round().max(1.0) as u64;
        self.reaction_ms = Some(ms);
        self.attempts.push(ms);
        if self.best_ms.is_none_or(|best| ms < best) {
            self.best_ms = Some(ms);
        }
        self.phase = Phase::GameOver;
        self.ended_at = Some(at_ms);
        log::info!("reaction: {ms}ms ({})", speed_rating(ms));
    }

    /// Seconds left on the visible countdown (3, 2, 1, then 0 during the hold)
    pub fn countdown_remaining(&self, now_ms: f64) -> u32 {
        match (self.phase, self.started_at) {
            (Phase::Countdown, Some(start)) => {
                let left = start + COUNTDOWN_MS - now_ms;
                if left <= 0.0 {
                    0
                } else {
                    (left / 1000.0).ceil() as u32
                }
            }
            _ => 0,
        }
    }

    /// Rounded mean of all attempts
    pub fn average_ms(&self) -> Option<u64> {
        if self.attempts.is_empty() {
            return None;
        }
        let total: u64 = self.attempts.iter().sum();
        Some((total as f64 / self.attempts.len() as f64).round() as u64)
    }
}

impl Simulation for ReactionTest {
    fn game(&self) -> GameId {
        GameId::Reaction
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn apply(&mut self, input: &TimedIntent) {
        match (&input.intent, self.phase) {
            (Intent::Start | Intent::Click, Phase::Idle) => self.arm(input.at_ms),
            (Intent::Click, Phase::Countdown) => {
                self.phase = Phase::TooEarly;
                self.ended_at = Some(input.at_ms);
                log::info!("reaction: too early");
            }
            (Intent::Click, Phase::Playing) => {
                let ready_since = self.ready_since.unwrap_or(self.ready_at);
                self.record(input.at_ms, ready_since);
            }
            _ => {}
        }
    }

    fn advance(&mut self, now_ms: f64) {
        if self.phase == Phase::Countdown && now_ms >= self.ready_at {
            self.phase = Phase::Playing;
            self.ready_since = Some(now_ms);
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.reaction_ms = None;
        self.started_at = None;
        self.ended_at = None;
        self.ready_since = None;
    }

    fn force_game_over(&mut self, now_ms: f64) {
        if !self.phase.is_terminal() {
            self.phase = Phase::GameOver;
            self.ended_at = Some(now_ms);
        }
    }

    fn metric(&self) -> Option<RawMetric> {
        match self.phase {
            Phase::GameOver => self.reaction_ms.map(RawMetric::Millis),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT_MS;

    fn armed(seed: u64) -> ReactionTest {
        let mut test = ReactionTest::new(seed);
        test.apply(&TimedIntent::new(Intent::Click, 0.0));
        assert_eq!(test.phase, Phase::Countdown);
        test
    }

    /// Tick until the go signal shows, returning the tick time
    fn run_to_ready(test: &mut ReactionTest) -> f64 {
        let mut now = 0.0;
        while test.phase == Phase::Countdown {
            now += SIM_DT_MS;
            test.advance(now);
        }
        assert_eq!(test.phase, Phase::Playing);
        now
    }

    #[test]
    fn test_countdown_is_three_seconds() {
        let test = armed(1);
        assert_eq!(test.countdown_remaining(0.0), 3);
        assert_eq!(test.countdown_remaining(999.0), 3);
        assert_eq!(test.countdown_remaining(1000.0), 2);
        assert_eq!(test.countdown_remaining(2500.0), 1);
        assert_eq!(test.countdown_remaining(3000.0), 0);
    }

    #[test]
    fn test_click_in_each_countdown_second_is_too_early() {
        for at in [10.0, 1500.0, 2999.0, 3000.0 + MIN_HOLD_MS - 1.0] {
            let mut test = armed(2);
            test.advance(at);
            assert_eq!(test.phase, Phase::Countdown);
            test.apply(&TimedIntent::new(Intent::Click, at));
            assert_eq!(test.phase, Phase::TooEarly);
            assert!(test.metric().is_none());
            assert!(test.attempts.is_empty());
        }
    }

    #[test]
    fn test_hold_within_bounds() {
        for seed in 0..20 {
            let mut test = armed(seed);
            let ready = run_to_ready(&mut test);
            assert!(ready >= COUNTDOWN_MS + MIN_HOLD_MS);
            assert!(ready < COUNTDOWN_MS + MAX_HOLD_MS + SIM_DT_MS);
        }
    }

    #[test]
    fn test_click_when_ready_measures_delta() {
        let mut test = armed(3);
        let ready = run_to_ready(&mut test);
        test.apply(&TimedIntent::new(Intent::Click, ready + 243.4));
        assert_eq!(test.phase, Phase::GameOver);
        assert_eq!(test.reaction_ms, Some(243));
        assert_eq!(test.metric(), Some(RawMetric::Millis(243)));
        assert_eq!(test.best_ms, Some(243));
    }

    #[test]
    fn test_instant_click_is_still_positive() {
        let mut test = armed(4);
        let ready = run_to_ready(&mut test);
        test.apply(&TimedIntent::new(Intent::Click, ready));
        assert_eq!(test.reaction_ms, Some(1));
    }

    #[test]
    fn test_history_survives_reset() {
        let mut test = armed(5);
        let ready = run_to_ready(&mut test);
        test.apply(&TimedIntent::new(Intent::Click, ready + 300.0));
        test.reset();

        test.apply(&TimedIntent::new(Intent::Click, 0.0));
        let ready = run_to_ready(&mut test);
        test.apply(&TimedIntent::new(Intent::Click, ready + 200.0));

        assert_eq!(test.attempts, vec![300, 200]);
        assert_eq!(test.best_ms, Some(200));
        assert_eq!(test.average_ms(), Some(250));
    }

    #[test]
    fn test_ratings() {
        assert_eq!(speed_rating(120), "Inhuman");
        assert_eq!(speed_rating(240), "Fast");
        assert_eq!(speed_rating(399), "Slow");
        assert_eq!(speed_rating(900), "Sleepy?");
    }
}
