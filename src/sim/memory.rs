//! Memory match
//!
//! Flip two cards per move; matching pairs stay up, mismatches hide again
//! after a short delay. Score comes from moves and elapsed seconds.

use serde::{Deserialize, Serialize};

use super::rng::SimRng;
use super::state::{GameId, Intent, Phase, Simulation, TimedIntent};
use crate::score::RawMetric;

/// Card faces, one per pair
pub const SYMBOLS: [&str; 12] = [
    "🎮", "🎯", "🎪", "🎨", "🎭", "🎰", "🎲", "🎳", "🏆", "⭐", "🌟", "💎",
];
/// How long a mismatched pair stays visible
pub const MISMATCH_HIDE_MS: f64 = 1000.0;

/// Deck size presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn card_count(&self) -> usize {
        match self {
            Difficulty::Easy => 8,
            Difficulty::Medium => 12,
            Difficulty::Hard => 18,
        }
    }

    pub fn pairs(&self) -> usize {
        self.card_count() / 2
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// One card in the deck
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    /// Position in the unshuffled deck
    pub id: usize,
    /// Index into [`SYMBOLS`]; two cards share each face
    pub face: usize,
    pub face_up: bool,
    pub matched: bool,
}

impl Card {
    pub fn symbol(&self) -> &'static str {
        SYMBOLS.get(self.face).copied().unwrap_or("?")
    }
}

/// Memory match state
#[derive(Debug, Clone, Serialize)]
pub struct MemoryMatch {
    pub difficulty: Difficulty,
    pub phase: Phase,
    pub cards: Vec<Card>,
    /// Deck positions currently revealed and unmatched (at most two)
    pub revealed: Vec<usize>,
    pub moves: u32,
    pub matched_pairs: usize,
    /// Whole seconds since the deal, frozen on completion
    pub seconds: u32,
    pub started_at: Option<f64>,
    pub ended_at: Option<f64>,
    /// When the current mismatched pair hides
    hide_at: Option<f64>,
    #[serde(skip)]
    rng: SimRng,
}

impl MemoryMatch {
    pub fn new(difficulty: Difficulty, seed: u64) -> Self {
        Self {
            difficulty,
            phase: Phase::Idle,
            cards: Vec::new(),
            revealed: Vec::new(),
            moves: 0,
            matched_pairs: 0,
            seconds: 0,
            started_at: None,
            ended_at: None,
            hide_at: None,
            rng: SimRng::new(seed),
        }
    }

    /// Deal a fresh shuffled deck and start the clock
    pub fn deal(&mut self, at_ms: f64) {
        let pairs = self.difficulty.pairs();
        let mut cards: Vec<Card> = (0..pairs)
            .chain(0..pairs)
            .enumerate()
            .map(|(id, face)| Card {
                id,
                face,
                face_up: false,
                matched: false,
            })
            .collect();
        self.rng.shuffle(&mut cards);

        self.cards = cards;
        self.revealed.clear();
        self.moves = 0;
        self.matched_pairs = 0;
        self.seconds = 0;
        self.started_at = Some(at_ms);
        self.ended_at = None;
        self.hide_at = None;
        self.phase = Phase::Playing;
        log::debug!("memory: dealt {} cards ({})", self.cards.len(), self.difficulty.as_str());
    }

    /// Reveal a card; returns false when the flip is not allowed
    pub fn flip(&mut self, index: usize, at_ms: f64) -> bool {
        if self.phase != Phase::Playing || self.revealed.len() >= 2 {
            return false;
        }
        match self.cards.get_mut(index) {
            Some(card) if !card.face_up && !card.matched => card.face_up = true,
            _ => return false,
        }
        self.revealed.push(index);

        if let [first, second] = self.revealed[..] {
            self.moves += 1;
            if self.cards[first].face == self.cards[second].face {
                self.cards[first].matched = true;
                self.cards[second].matched = true;
                self.matched_pairs += 1;
                self.revealed.clear();
            } else {
                self.hide_at = Some(at_ms + MISMATCH_HIDE_MS);
            }
        }
        true
    }

    pub fn is_complete(&self) -> bool {
        !self.cards.is_empty() && self.matched_pairs == self.difficulty.pairs()
    }

    fn update_clock(&mut self, now_ms: f64) {
        if let Some(start) = self.started_at {
            self.seconds = ((now_ms - start).max(0.0) / 1000.0).floor() as u32;
        }
    }
}

impl Simulation for MemoryMatch {
    fn game(&self) -> GameId {
        GameId::Memory
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn apply(&mut self, input: &TimedIntent) {
        match (&input.intent, self.phase) {
            (Intent::Start, Phase::Idle) => self.deal(input.at_ms),
            (Intent::Flip(index), Phase::Playing) => {
                if !self.flip(*index, input.at_ms) {
                    log::debug!("memory: flip {index} ignored");
                }
            }
            _ => {}
        }
    }

    fn advance(&mut self, now_ms: f64) {
        if self.phase != Phase::Playing {
            return;
        }
        self.update_clock(now_ms);

        if self.hide_at.is_some_and(|t| now_ms >= t) {
            for &i in &self.revealed {
                self.cards[i].face_up = false;
            }
            self.revealed.clear();
            self.hide_at = None;
        }

        if self.is_complete() {
            self.phase = Phase::GameOver;
            self.ended_at = Some(now_ms);
            log::info!("memory: cleared in {} moves, {}s", self.moves, self.seconds);
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.cards.clear();
        self.revealed.clear();
        self.moves = 0;
        self.matched_pairs = 0;
        self.seconds = 0;
        self.started_at = None;
        self.ended_at = None;
        self.hide_at = None;
    }

    fn force_game_over(&mut self, now_ms: f64) {
        if !self.phase.is_terminal() {
            self.phase = Phase::GameOver;
            self.ended_at = Some(now_ms);
        }
    }

    fn metric(&self) -> Option<RawMetric> {
        if self.phase == Phase::GameOver && self.is_complete() {
            Some(RawMetric::MovesAndTime {
                moves: self.moves,
                seconds: self.seconds,
            })
        } else {
            None
        }
    }

    fn cache_key(&self) -> String {
        format!("{}-{}", GameId::Memory.cache_key(), self.difficulty.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{normalize, memory_score};

    fn dealt(difficulty: Difficulty) -> MemoryMatch {
        let mut game = MemoryMatch::new(difficulty, 21);
        game.apply(&TimedIntent::new(Intent::Start, 0.0));
        assert_eq!(game.phase, Phase::Playing);
        game
    }

    /// Deck positions of the two cards showing `face`
    fn pair_of(game: &MemoryMatch, face: usize) -> (usize, usize) {
        let idx: Vec<usize> = game
            .cards
            .iter()
            .enumerate()
            .filter(|(_, c)| c.face == face)
            .map(|(i, _)| i)
            .collect();
        (idx[0], idx[1])
    }

    /// Two positions with different faces
    fn mismatch(game: &MemoryMatch) -> (usize, usize) {
        let first = game.cards[0].face;
        let other = game.cards.iter().position(|c| c.face != first).unwrap();
        (0, other)
    }

    #[test]
    fn test_deck_sizes_and_pairs() {
        for (difficulty, count) in [
            (Difficulty::Easy, 8),
            (Difficulty::Medium, 12),
            (Difficulty::Hard, 18),
        ] {
            let game = dealt(difficulty);
            assert_eq!(game.cards.len(), count);
            for face in 0..difficulty.pairs() {
                assert_eq!(game.cards.iter().filter(|c| c.face == face).count(), 2);
            }
        }
    }

    #[test]
    fn test_match_stays_up() {
        let mut game = dealt(Difficulty::Easy);
        let (a, b) = pair_of(&game, 0);
        assert!(game.flip(a, 100.0));
        assert!(game.flip(b, 200.0));
        assert_eq!(game.moves, 1);
        assert_eq!(game.matched_pairs, 1);
        assert!(game.revealed.is_empty());
        assert!(game.cards[a].matched && game.cards[b].matched);
    }

    #[test]
    fn test_third_flip_blocked_until_hide() {
        let mut game = dealt(Difficulty::Medium);
        let (a, b) = mismatch(&game);
        assert!(game.flip(a, 100.0));
        assert!(game.flip(b, 150.0));
        assert_eq!(game.revealed.len(), 2);

        let third = (0..game.cards.len()).find(|i| *i != a && *i != b).unwrap();
        assert!(!game.flip(third, 300.0));
        assert_eq!(game.revealed.len(), 2);
        assert!(!game.cards[third].face_up);

        game.advance(150.0 + MISMATCH_HIDE_MS - 1.0);
        assert_eq!(game.revealed.len(), 2);
        game.advance(150.0 + MISMATCH_HIDE_MS);
        assert!(game.revealed.is_empty());
        assert!(!game.cards[a].face_up && !game.cards[b].face_up);

        assert!(game.flip(third, 1200.0));
    }

    #[test]
    fn test_invalid_flips_ignored() {
        let mut game = dealt(Difficulty::Easy);
        assert!(!game.flip(99, 0.0));
        assert!(game.flip(0, 0.0));
        // Same card twice
        assert!(!game.flip(0, 1.0));
        assert_eq!(game.moves, 0);
    }

    #[test]
    fn test_clear_board_scores() {
        let mut game = dealt(Difficulty::Easy);
        let mut now = 0.0;
        for face in 0..Difficulty::Easy.pairs() {
            let (a, b) = pair_of(&game, face);
            now += 2500.0;
            game.apply(&TimedIntent::new(Intent::Flip(a), now));
            game.apply(&TimedIntent::new(Intent::Flip(b), now));
            game.advance(now);
        }
        assert_eq!(game.phase, Phase::GameOver);
        assert_eq!(game.moves, 4);
        assert_eq!(game.seconds, 10);

        let raw = game.metric().unwrap();
        assert_eq!(raw, RawMetric::MovesAndTime { moves: 4, seconds: 10 });
        assert_eq!(normalize(GameId::Memory, raw).value, memory_score(4, 10));
        assert_eq!(memory_score(4, 10), 10_000 - 400 - 100);

        // Clock frozen after completion
        game.advance(now + 60_000.0);
        assert_eq!(game.seconds, 10);
    }

    #[test]
    fn test_cache_key_per_difficulty() {
        assert_eq!(MemoryMatch::new(Difficulty::Hard, 1).cache_key(), "memory-highscore-hard");
    }
}
