/// Puzzle contract shared by every memory puzzle.
///
/// A puzzle is a small input-driven state machine:
///   setup → (update / handle_input)* → completed | timed out
///
/// Shared bookkeeping (difficulty, attempts, hints, timer, score, anomaly
/// tags) lives in `PuzzleCore`; variants own only their content and phase.
/// Once a puzzle is completed or its countdown has run out, input is
/// ignored and nothing changes.

pub mod factory;
pub mod pattern;
pub mod sequence;
pub mod spatial;

use std::fmt;
use std::str::FromStr;

use rand::RngCore;

use crate::config::PuzzleConfig;
use crate::domain::anomaly::{AnomalyKind, DifficultyModifiers};
use crate::domain::timer::CountdownTimer;
use crate::error::CoreError;

pub const NO_HINTS_LEFT: &str = "No hints left";

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum PuzzleKind {
    Sequence,
    Pattern,
    Spatial,
}

impl PuzzleKind {
    pub const ALL: [PuzzleKind; 3] = [PuzzleKind::Sequence, PuzzleKind::Pattern, PuzzleKind::Spatial];

    pub fn tag(self) -> &'static str {
        match self {
            PuzzleKind::Sequence => "sequence",
            PuzzleKind::Pattern => "pattern",
            PuzzleKind::Spatial => "spatial",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PuzzleKind::Sequence => "Sequence Replay",
            PuzzleKind::Pattern => "Number Pattern",
            PuzzleKind::Spatial => "Spatial Recall",
        }
    }
}

impl fmt::Display for PuzzleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for PuzzleKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PuzzleKind::ALL
            .into_iter()
            .find(|k| k.tag() == s)
            .ok_or_else(|| CoreError::UnknownPuzzleType(s.to_string()))
    }
}

/// The six glyphs of the sequence-replay alphabet (keys 1-6).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Glyph {
    Triangle,
    Circle,
    Square,
    Star,
    Diamond,
    TriangleDown,
}

impl Glyph {
    pub const ALL: [Glyph; 6] = [
        Glyph::Triangle,
        Glyph::Circle,
        Glyph::Square,
        Glyph::Star,
        Glyph::Diamond,
        Glyph::TriangleDown,
    ];

    pub fn symbol(self) -> char {
        match self {
            Glyph::Triangle => '▲',
            Glyph::Circle => '●',
            Glyph::Square => '■',
            Glyph::Star => '★',
            Glyph::Diamond => '◆',
            Glyph::TriangleDown => '▼',
        }
    }

    /// 1-based key index → glyph.
    pub fn from_key(n: u8) -> Option<Glyph> {
        match n {
            1..=6 => Some(Glyph::ALL[(n - 1) as usize]),
            _ => None,
        }
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Discrete input events delivered by the presentation layer.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PuzzleInput {
    Digit(u8),
    Backspace,
    Confirm,
    Glyph(Glyph),
    /// Explicit "col,row" coordinate, 0-based cell indices.
    Coordinate(String),
}

/// `max(0, 100 - 2·elapsed - 10·attempts - 15·hints + 20·difficulty)`.
/// Time penalty and difficulty bonus are truncated to whole points.
pub fn compute_score(time_limit: f64, remaining: f64, attempts: u32, hints_used: u32, difficulty: f64) -> u32 {
    let time_penalty = ((time_limit - remaining) * 2.0) as i64;
    let attempt_penalty = i64::from(attempts) * 10;
    let hint_penalty = i64::from(hints_used) * 15;
    let difficulty_bonus = (difficulty * 20.0) as i64;
    (100 - time_penalty - attempt_penalty - hint_penalty + difficulty_bonus).max(0) as u32
}

/// State common to every puzzle variant.
#[derive(Debug)]
pub struct PuzzleCore {
    base_difficulty: f64,
    difficulty_bonus: f64,
    completed: bool,
    score: u32,
    attempts: u32,
    max_attempts: u32,
    hints_used: u32,
    max_hints: u32,
    anomalies: Vec<AnomalyKind>,
    timer: CountdownTimer,
    feedback: Option<String>,
}

impl PuzzleCore {
    pub fn new(difficulty: f64, timer: CountdownTimer, config: &PuzzleConfig) -> Self {
        PuzzleCore {
            base_difficulty: difficulty.max(0.0),
            difficulty_bonus: 0.0,
            completed: false,
            score: 0,
            attempts: 0,
            max_attempts: config.max_attempts,
            hints_used: 0,
            max_hints: config.max_hints,
            anomalies: Vec::new(),
            timer,
            feedback: None,
        }
    }

    // ── Difficulty ──

    /// Effective difficulty = construction difficulty + modifier bonus.
    pub fn difficulty(&self) -> f64 {
        self.base_difficulty + self.difficulty_bonus
    }

    pub fn base_difficulty(&self) -> f64 {
        self.base_difficulty
    }

    /// Second build phase: attach anomaly tags and their difficulty bonus.
    /// Returns the new effective difficulty. The base value is kept intact.
    pub fn apply_modifiers(&mut self, mods: &DifficultyModifiers) -> f64 {
        for &kind in &mods.tags {
            self.add_anomaly(kind);
        }
        self.difficulty_bonus += mods.bonus;
        self.difficulty()
    }

    // ── Anomaly tags ──

    pub fn add_anomaly(&mut self, kind: AnomalyKind) {
        if !self.anomalies.contains(&kind) {
            self.anomalies.push(kind);
        }
    }

    pub fn remove_anomaly(&mut self, kind: AnomalyKind) {
        self.anomalies.retain(|k| *k != kind);
    }

    pub fn has_anomaly(&self, kind: AnomalyKind) -> bool {
        self.anomalies.contains(&kind)
    }

    pub fn anomalies(&self) -> &[AnomalyKind] {
        &self.anomalies
    }

    // ── Counters ──

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Tracked for bookkeeping only; never enforced as a failure.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    pub fn hints_used(&self) -> u32 {
        self.hints_used
    }

    pub fn max_hints(&self) -> u32 {
        self.max_hints
    }

    /// Consume one hint. False once the budget is spent.
    pub fn take_hint(&mut self) -> bool {
        if self.hints_used >= self.max_hints {
            return false;
        }
        self.hints_used += 1;
        true
    }

    // ── Timer ──

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut CountdownTimer {
        &mut self.timer
    }

    pub fn time_limit(&self) -> f64 {
        self.timer.limit()
    }

    pub fn remaining_time(&self) -> f64 {
        self.timer.remaining()
    }

    pub fn elapsed(&self) -> f64 {
        self.timer.elapsed()
    }

    pub fn is_time_up(&self) -> bool {
        self.timer.is_time_up()
    }

    pub fn pause_timer(&mut self) {
        self.timer.pause();
    }

    pub fn resume_timer(&mut self) {
        self.timer.resume();
    }

    // ── Completion ──

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Completed or out of time: no further input is accepted.
    pub fn is_finished(&self) -> bool {
        self.completed || self.timer.is_time_up()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// One-way transition to completed. Freezes the timer and fixes the score.
    pub fn complete(&mut self) -> u32 {
        if self.completed {
            return self.score;
        }
        self.timer.pause();
        self.completed = true;
        self.score = compute_score(
            self.timer.limit(),
            self.timer.remaining(),
            self.attempts,
            self.hints_used,
            self.difficulty(),
        );
        self.score
    }

    // ── Feedback ──

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn set_feedback(&mut self, msg: impl Into<String>) {
        self.feedback = Some(msg.into());
    }

    pub fn clear_feedback(&mut self) {
        self.feedback = None;
    }
}

/// Interface implemented by the three puzzle variants.
pub trait Puzzle {
    fn kind(&self) -> PuzzleKind;
    fn core(&self) -> &PuzzleCore;
    fn core_mut(&mut self) -> &mut PuzzleCore;

    /// (Re)generate randomized content and reset the timer baseline.
    fn setup(&mut self, rng: &mut dyn RngCore);

    /// True iff the input was accepted (including the completing input).
    fn handle_input(&mut self, input: &PuzzleInput) -> bool;

    /// Advance pacing state (demonstration playback).
    fn update(&mut self, _dt: f64) {}

    /// Hint text for the current state, without touching the budget.
    fn hint_text(&self) -> String;

    /// Fraction of the answer entered so far, 0.0..=1.0.
    fn progress(&self) -> f64;

    /// Human-readable rendering of the current state.
    fn prompt(&self) -> String;

    /// What the mental palace keeps when used on this puzzle.
    fn memento(&self) -> Option<String> {
        None
    }

    /// Consume one hint from the budget.
    fn hint(&mut self) -> String {
        if !self.core_mut().take_hint() {
            return NO_HINTS_LEFT.to_string();
        }
        self.hint_text()
    }

    fn is_timer_active(&self) -> bool {
        self.core().timer().is_active()
    }

    fn is_time_up(&self) -> bool {
        self.core().is_time_up()
    }

    fn is_completed(&self) -> bool {
        self.core().is_completed()
    }

    fn complete(&mut self) -> u32 {
        self.core_mut().complete()
    }
}
