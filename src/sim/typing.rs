//! Typing race
//!
//! Copy a random sentence as fast as possible. Every edit of the input box
//! is diffed against the target; the run ends when the input matches it.

use serde::Serialize;

use super::rng::SimRng;
use super::state::{GameId, Intent, Phase, Simulation, TimedIntent};
use crate::score::RawMetric;

pub const COUNTDOWN_MS: f64 = 3000.0;
/// Elapsed time never drops below this when finalizing WPM
pub const MIN_ELAPSED_MS: f64 = 1.0;

pub const SAMPLE_TEXTS: [&str; 15] = [
    "The quick brown fox jumps over the lazy dog.",
    "Pack my box with five dozen liquor jugs.",
    "How vexingly quick daft zebras jump!",
    "The five boxing wizards jump quickly.",
    "Sphinx of black quartz, judge my vow.",
    "Two driven jocks help fax my big quiz.",
    "The job requires extra pluck and zeal from every young wage earner.",
    "A mad boxer shot a quick, gloved jab to the jaw of his dizzy opponent.",
    "Jackdaws love my big sphinx of quartz.",
    "We promptly judged antique ivory buckles for the next prize.",
    "Programming is the art of telling computers what to do.",
    "The best way to predict the future is to invent it.",
    "Code is like humor. When you have to explain it, it's bad.",
    "First, solve the problem. Then, write the code.",
    "Experience is the name everyone gives to their mistakes.",
];

/// Per-keystroke comparison against the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypingDiff {
    /// Typed characters that differ from the target at the same position
    pub errors: u32,
    /// Percentage of typed characters that are correct (100 when empty)
    pub accuracy: u32,
}

/// Compare typed text with the target, character by character
pub fn diff(typed: &str, target: &str) -> TypingDiff {
    let mut target_chars = target.chars();
    let mut typed_len = 0u32;
    let mut errors = 0u32;
    for c in typed.chars() {
        typed_len += 1;
        if target_chars.next() != Some(c) {
            errors += 1;
        }
    }
    let accuracy = if typed_len == 0 {
        100
    } else {
        ((f64::from(typed_len - errors) / f64::from(typed_len)) * 100.0).round() as u32
    };
    TypingDiff { errors, accuracy }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Words per minute; zero for non-positive elapsed time
pub fn words_per_minute(words: usize, elapsed_ms: f64) -> f64 {
    if elapsed_ms <= 0.0 || !elapsed_ms.is_finite() {
        return 0.0;
    }
    words as f64 / (elapsed_ms / 60_000.0)
}

/// Human-readable rating for a typing speed
pub fn wpm_rating(wpm: u64) -> &'static str {
    match wpm {
        100.. => "Legendary",
        80..100 => "Pro Typist",
        60..80 => "Fast",
        40..60 => "Average",
        20..40 => "Keep Practicing",
        _ => "Beginner",
    }
}

/// Typing race state
#[derive(Debug, Clone, Serialize)]
pub struct TypingRace {
    pub phase: Phase,
    pub target: String,
    pub typed: String,
    pub errors: u32,
    pub accuracy: u32,
    /// Live speed while playing
    pub wpm: f64,
    /// Final rounded speed once finished
    pub final_wpm: Option<u64>,
    /// When typing opened (end of countdown)
    pub started_at: Option<f64>,
    pub ended_at: Option<f64>,
    countdown_started_at: f64,
    #[serde(skip)]
    rng: SimRng,
}

impl TypingRace {
    pub fn new(seed: u64) -> Self {
        Self {
            phase: Phase::Idle,
            target: String::new(),
            typed: String::new(),
            errors: 0,
            accuracy: 100,
            wpm: 0.0,
            final_wpm: None,
            started_at: None,
            ended_at: None,
            countdown_started_at: 0.0,
            rng: SimRng::new(seed),
        }
    }

    /// Start with a specific sentence instead of a random one
    pub fn start_with(&mut self, target: &str, at_ms: f64) {
        self.target = target.to_string();
        self.typed.clear();
        self.errors = 0;
        self.accuracy = 100;
        self.wpm = 0.0;
        self.final_wpm = None;
        self.started_at = None;
        self.ended_at = None;
        self.countdown_started_at = at_ms;
        self.phase = Phase::Countdown;
    }

    fn start(&mut self, at_ms: f64) {
        let target = self.rng.choose(&SAMPLE_TEXTS).copied().unwrap_or(SAMPLE_TEXTS[0]);
        self.start_with(target, at_ms);
    }

    fn on_text(&mut self, value: &str, at_ms: f64) {
        let Some(started) = self.started_at else {
            return;
        };
        self.typed = value.to_string();
        let d = diff(&self.typed, &self.target);
        self.errors = d.errors;
        self.accuracy = d.accuracy;

        let elapsed = at_ms - started;
        self.wpm = words_per_minute(word_count(&self.typed), elapsed);

        if self.typed == self.target {
            let wpm = words_per_minute(word_count(&self.target), elapsed.max(MIN_ELAPSED_MS));
            let wpm = wpm.round() as u64;
            self.wpm = wpm as f64;
            self.final_wpm = Some(wpm);
            self.phase = Phase::GameOver;
            self.ended_at = Some(at_ms);
            log::info!("typing: finished at {wpm} wpm ({})", wpm_rating(wpm));
        }
    }

    /// Elapsed typing time in whole seconds
    pub fn elapsed_secs(&self, now_ms: f64) -> u64 {
        match self.started_at {
            Some(start) => {
                let end = self.ended_at.unwrap_or(now_ms);
                ((end - start).max(0.0) / 1000.0).round() as u64
            }
            None => 0,
        }
    }
}

impl Simulation for TypingRace {
    fn game(&self) -> GameId {
        GameId::Typing
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn apply(&mut self, input: &TimedIntent) {
        match (&input.intent, self.phase) {
            (Intent::Start, Phase::Idle) => self.start(input.at_ms),
            (Intent::Text(value), Phase::Playing) => self.on_text(value, input.at_ms),
            _ => {}
        }
    }

    fn advance(&mut self, now_ms: f64) {
        if self.phase == Phase::Countdown && now_ms - self.countdown_started_at >= COUNTDOWN_MS {
            self.phase = Phase::Playing;
            self.started_at = Some(now_ms);
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.typed.clear();
        self.errors = 0;
        self.accuracy = 100;
        self.wpm = 0.0;
        self.final_wpm = None;
        self.started_at = None;
        self.ended_at = None;
    }

    fn force_game_over(&mut self, now_ms: f64) {
        if !self.phase.is_terminal() {
            self.phase = Phase::GameOver;
            self.ended_at = Some(now_ms);
        }
    }

    fn metric(&self) -> Option<RawMetric> {
        self.final_wpm.map(RawMetric::Counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "Sphinx of black quartz, judge my vow.";

    fn playing() -> TypingRace {
        let mut race = TypingRace::new(1);
        race.start_with(TARGET, 0.0);
        race.advance(COUNTDOWN_MS - 1.0);
        assert_eq!(race.phase, Phase::Countdown);
        race.advance(COUNTDOWN_MS);
        assert_eq!(race.phase, Phase::Playing);
        race
    }

    fn type_text(race: &mut TypingRace, text: &str, at: f64) {
        race.apply(&TimedIntent::new(Intent::Text(text.to_string()), at));
    }

    #[test]
    fn test_correct_prefix_is_full_accuracy() {
        let mut race = playing();
        for end in 1..TARGET.len() {
            type_text(&mut race, &TARGET[..end], COUNTDOWN_MS + end as f64 * 100.0);
            assert_eq!(race.accuracy, 100);
            assert_eq!(race.errors, 0);
        }
        assert_eq!(race.phase, Phase::Playing);
    }

    #[test]
    fn test_errors_and_accuracy() {
        let d = diff("Sphynx", TARGET);
        assert_eq!(d.errors, 1);
        assert_eq!(d.accuracy, 83);
        assert_eq!(diff("", TARGET).accuracy, 100);
        // Overtyping past the target counts as errors
        assert_eq!(diff("ab", "a").errors, 1);
    }

    #[test]
    fn test_completion_freezes_wpm() {
        let mut race = playing();
        // 7 words in 12 seconds = 35 wpm
        type_text(&mut race, TARGET, COUNTDOWN_MS + 12_000.0);
        assert_eq!(race.phase, Phase::GameOver);
        assert_eq!(race.final_wpm, Some(35));
        assert_eq!(race.metric(), Some(RawMetric::Counter(35)));

        // Input after completion is ignored
        type_text(&mut race, "x", COUNTDOWN_MS + 20_000.0);
        assert_eq!(race.typed, TARGET);
        assert_eq!(race.elapsed_secs(99_999.0), 12);
    }

    #[test]
    fn test_instant_completion_is_finite() {
        let mut race = playing();
        type_text(&mut race, TARGET, COUNTDOWN_MS);
        let wpm = race.final_wpm.unwrap();
        assert!(race.wpm.is_finite());
        assert!(wpm > 0);
    }

    #[test]
    fn test_wpm_non_negative_and_finite() {
        for elapsed in [0.0, 0.5, 1.0, 1000.0, 1e9] {
            let wpm = words_per_minute(7, elapsed);
            assert!(wpm >= 0.0 && wpm.is_finite());
        }
        assert_eq!(words_per_minute(5, 0.0), 0.0);
        assert_eq!(words_per_minute(5, -10.0), 0.0);
    }

    #[test]
    fn test_text_before_playing_ignored() {
        let mut race = TypingRace::new(1);
        race.start_with(TARGET, 0.0);
        type_text(&mut race, "Sph", 10.0);
        assert!(race.typed.is_empty());
    }

    #[test]
    fn test_random_target_from_samples() {
        let mut race = TypingRace::new(77);
        race.apply(&TimedIntent::new(Intent::Start, 0.0));
        assert_eq!(race.phase, Phase::Countdown);
        assert!(SAMPLE_TEXTS.contains(&race.target.as_str()));
    }

    #[test]
    fn test_ratings() {
        assert_eq!(wpm_rating(120), "Legendary");
        assert_eq!(wpm_rating(65), "Fast");
        assert_eq!(wpm_rating(3), "Beginner");
    }
}
