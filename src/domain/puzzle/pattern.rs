/// Number pattern: read a progression, type the next term, confirm.
///
/// The progression rule is pluggable (`Progression`). The input state
/// machine is the same for every rule:
///   - digits append to the entry buffer, Backspace removes the last digit
///   - Confirm on an empty buffer is rejected, no attempt charged
///   - Confirm on a number charges one attempt; correct → completed,
///     wrong → buffer cleared and the right answer shown

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::Deserialize;

use super::{Puzzle, PuzzleCore, PuzzleInput, PuzzleKind};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressionKind {
    Arithmetic,
    Geometric,
    Fibonacci,
    Prime,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Progression {
    Arithmetic { start: u64, step: u64 },
    Geometric { start: u64, ratio: u64 },
    Fibonacci,
    Prime,
}

impl Progression {
    /// Random parameters for a rule.
    pub fn random(kind: ProgressionKind, rng: &mut dyn RngCore) -> Self {
        match kind {
            ProgressionKind::Arithmetic => Progression::Arithmetic {
                start: rng.gen_range(1..=10),
                step: rng.gen_range(2..=5),
            },
            ProgressionKind::Geometric => Progression::Geometric {
                start: rng.gen_range(2..=5),
                ratio: rng.gen_range(2..=3),
            },
            ProgressionKind::Fibonacci => Progression::Fibonacci,
            ProgressionKind::Prime => Progression::Prime,
        }
    }

    pub fn kind(&self) -> ProgressionKind {
        match self {
            Progression::Arithmetic { .. } => ProgressionKind::Arithmetic,
            Progression::Geometric { .. } => ProgressionKind::Geometric,
            Progression::Fibonacci => ProgressionKind::Fibonacci,
            Progression::Prime => ProgressionKind::Prime,
        }
    }

    /// First `len` terms.
    pub fn terms(&self, len: usize) -> Vec<u64> {
        match *self {
            Progression::Arithmetic { start, step } => {
                (0..len as u64).map(|i| start.saturating_add(i.saturating_mul(step))).collect()
            }
            Progression::Geometric { start, ratio } => {
                let mut out = Vec::with_capacity(len);
                let mut term = start;
                for _ in 0..len {
                    out.push(term);
                    term = term.saturating_mul(ratio);
                }
                out
            }
            Progression::Fibonacci => {
                let mut out: Vec<u64> = Vec::with_capacity(len);
                for i in 0..len {
                    let term = if i < 2 { 1 } else { out[i - 1].saturating_add(out[i - 2]) };
                    out.push(term);
                }
                out
            }
            Progression::Prime => {
                let mut out = Vec::with_capacity(len);
                let mut candidate = 1;
                while out.len() < len {
                    candidate = next_prime(candidate);
                    out.push(candidate);
                }
                out
            }
        }
    }

    /// The term that follows `seq` under this rule.
    pub fn next_term(&self, seq: &[u64]) -> u64 {
        let last = seq.last().copied().unwrap_or(0);
        match *self {
            Progression::Arithmetic { step, .. } => last.saturating_add(step),
            Progression::Geometric { ratio, .. } => last.saturating_mul(ratio),
            Progression::Fibonacci => match seq {
                [.., a, b] => a.saturating_add(*b),
                [b] => *b,
                [] => 1,
            },
            Progression::Prime => next_prime(last),
        }
    }

    pub fn rule_hint(&self) -> String {
        match self {
            Progression::Arithmetic { step, .. } => format!("Add {step} to the last number"),
            Progression::Geometric { ratio, .. } => format!("Multiply the last number by {ratio}"),
            Progression::Fibonacci => "Add the last two numbers".to_string(),
            Progression::Prime => "Look for the next prime number".to_string(),
        }
    }
}

pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    let mut i = 2;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}

/// Smallest prime strictly greater than `n`, by trial division.
pub fn next_prime(n: u64) -> u64 {
    let mut candidate = n + 1;
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

pub struct PatternPuzzle {
    core: PuzzleCore,
    kinds: Vec<ProgressionKind>,
    progression: Progression,
    sequence: Vec<u64>,
    entry: String,
}

impl PatternPuzzle {
    /// `kinds` is the pool a rule is drawn from on setup.
    pub fn new(core: PuzzleCore, kinds: Vec<ProgressionKind>) -> Self {
        PatternPuzzle {
            core,
            kinds,
            progression: Progression::Fibonacci,
            sequence: Vec::new(),
            entry: String::new(),
        }
    }

    /// `4 + difficulty`, truncated.
    pub fn sequence_len(difficulty: f64) -> usize {
        (4.0 + difficulty) as usize
    }

    pub fn progression(&self) -> Progression {
        self.progression
    }

    pub fn sequence(&self) -> &[u64] {
        &self.sequence
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn answer(&self) -> u64 {
        self.progression.next_term(&self.sequence)
    }

    fn submit(&mut self) -> bool {
        if self.entry.is_empty() {
            self.core.set_feedback("Enter a number before confirming!");
            return false;
        }
        self.core.record_attempt();
        let answer = self.answer();
        // entry holds digits only, so a parse failure is a number past u64 and never the answer
        if self.entry.parse::<u64>().is_ok_and(|guess| guess == answer) {
            self.core.complete();
            self.core.set_feedback(format!("Correct! The answer was {answer}"));
            true
        } else {
            self.entry.clear();
            self.core.set_feedback(format!("Wrong. The correct answer was {answer}"));
            false
        }
    }
}

impl Puzzle for PatternPuzzle {
    fn kind(&self) -> PuzzleKind {
        PuzzleKind::Pattern
    }

    fn core(&self) -> &PuzzleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PuzzleCore {
        &mut self.core
    }

    fn setup(&mut self, rng: &mut dyn RngCore) {
        let kind = self
            .kinds
            .choose(&mut *rng)
            .copied()
            .unwrap_or(ProgressionKind::Arithmetic);
        self.progression = Progression::random(kind, rng);
        self.sequence = self.progression.terms(Self::sequence_len(self.core.difficulty()));
        self.entry.clear();
        self.core.clear_feedback();
        self.core.timer_mut().restart();
    }

    fn handle_input(&mut self, input: &PuzzleInput) -> bool {
        if self.core.is_finished() {
            return false;
        }
        match input {
            PuzzleInput::Digit(d) if *d <= 9 => {
                self.entry.push(char::from(b'0' + d));
                true
            }
            PuzzleInput::Backspace => {
                self.entry.pop();
                true
            }
            PuzzleInput::Confirm => self.submit(),
            _ => false,
        }
    }

    fn hint_text(&self) -> String {
        self.progression.rule_hint()
    }

    fn progress(&self) -> f64 {
        if self.core.is_completed() { 1.0 } else { 0.0 }
    }

    fn prompt(&self) -> String {
        let seq: Vec<String> = self.sequence.iter().map(u64::to_string).collect();
        format!(
            "What number comes next?\n\n    {}  ?\n\nYour answer: {}_\n\n[0-9] type  [Backspace] erase  [Enter] submit",
            seq.join("  "),
            self.entry
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::domain::clock::ManualClock;
    use crate::domain::puzzle::tests::test_core;

    fn fixed(clock: &Rc<ManualClock>, progression: Progression, len: usize) -> PatternPuzzle {
        let mut p = PatternPuzzle::new(test_core(clock, 1.0), vec![progression.kind()]);
        p.progression = progression;
        p.sequence = progression.terms(len);
        p.core.timer_mut().restart();
        p
    }

    fn type_number(p: &mut PatternPuzzle, n: u64) {
        for ch in n.to_string().bytes() {
            assert!(p.handle_input(&PuzzleInput::Digit(ch - b'0')));
        }
    }

    #[test]
    fn arithmetic_three_step_two() {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut p = fixed(&clock, Progression::Arithmetic { start: 3, step: 2 }, 4);
        assert_eq!(p.sequence(), &[3, 5, 7, 9]);
        assert_eq!(p.answer(), 11);

        type_number(&mut p, 12);
        assert!(!p.handle_input(&PuzzleInput::Confirm));
        assert!(p.entry().is_empty());
        assert!(!p.is_completed());
        assert_eq!(p.core().attempts(), 1);
        assert_eq!(p.core().feedback(), Some("Wrong. The correct answer was 11"));

        type_number(&mut p, 11);
        assert!(p.handle_input(&PuzzleInput::Confirm));
        assert!(p.is_completed());
        assert_eq!(p.core().attempts(), 2);
    }

    #[test]
    fn empty_confirm_charges_nothing() {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut p = fixed(&clock, Progression::Fibonacci, 5);
        assert!(!p.handle_input(&PuzzleInput::Confirm));
        assert_eq!(p.core().attempts(), 0);
        assert!(p.core().feedback().is_some());
    }

    #[test]
    fn backspace_edits_entry() {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut p = fixed(&clock, Progression::Fibonacci, 5);
        assert_eq!(p.sequence(), &[1, 1, 2, 3, 5]);
        type_number(&mut p, 89);
        assert!(p.handle_input(&PuzzleInput::Backspace));
        assert_eq!(p.entry(), "8");
        assert!(p.handle_input(&PuzzleInput::Confirm));
        assert!(p.is_completed());
    }

    #[test]
    fn backspace_on_empty_entry_is_harmless() {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut p = fixed(&clock, Progression::Prime, 4);
        assert!(p.handle_input(&PuzzleInput::Backspace));
        assert_eq!(p.entry(), "");
    }

    #[test]
    fn geometric_next_term() {
        let clock = Rc::new(ManualClock::new(0.0));
        let p = fixed(&clock, Progression::Geometric { start: 2, ratio: 3 }, 4);
        assert_eq!(p.sequence(), &[2, 6, 18, 54]);
        assert_eq!(p.answer(), 162);
    }

    #[test]
    fn prime_progression_uses_trial_division() {
        assert_eq!(Progression::Prime.terms(5), vec![2, 3, 5, 7, 11]);
        assert_eq!(Progression::Prime.next_term(&[2, 3, 5, 7, 11]), 13);
        assert_eq!(next_prime(13), 17);
        assert!(!is_prime(1));
        assert!(is_prime(97));
        assert!(!is_prime(91));
    }

    #[test]
    fn oversized_entry_counts_as_wrong_answer() {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut p = fixed(&clock, Progression::Fibonacci, 5);
        for _ in 0..21 {
            p.handle_input(&PuzzleInput::Digit(9));
        }
        assert!(!p.handle_input(&PuzzleInput::Confirm));
        assert_eq!(p.core().attempts(), 1);
        assert!(p.entry().is_empty());
        assert_eq!(p.core().feedback(), Some("Wrong. The correct answer was 8"));
        assert!(!p.is_completed());
    }

    #[test]
    fn non_digit_inputs_are_rejected() {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut p = fixed(&clock, Progression::Fibonacci, 5);
        assert!(!p.handle_input(&PuzzleInput::Digit(12)));
        assert!(!p.handle_input(&PuzzleInput::Coordinate("1,1".into())));
        assert_eq!(p.entry(), "");
    }

    #[test]
    fn setup_draws_from_configured_pool() {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut rng = StdRng::seed_from_u64(9);
        let mut p = PatternPuzzle::new(test_core(&clock, 1.0), vec![ProgressionKind::Prime]);
        p.setup(&mut rng);
        assert_eq!(p.progression(), Progression::Prime);
        assert_eq!(p.sequence().len(), 5);
        assert!(p.is_timer_active());
    }

    #[test]
    fn setup_length_and_parameter_ranges() {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let mut p = PatternPuzzle::new(
                test_core(&clock, 2.4),
                vec![ProgressionKind::Arithmetic, ProgressionKind::Geometric],
            );
            p.setup(&mut rng);
            assert_eq!(p.sequence().len(), 6);
            match p.progression() {
                Progression::Arithmetic { start, step } => {
                    assert!((1..=10).contains(&start));
                    assert!((2..=5).contains(&step));
                }
                Progression::Geometric { start, ratio } => {
                    assert!((2..=5).contains(&start));
                    assert!((2..=3).contains(&ratio));
                }
                other => panic!("unexpected progression {other:?}"),
            }
        }
    }

    #[test]
    fn hints_describe_the_rule() {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut p = fixed(&clock, Progression::Arithmetic { start: 1, step: 4 }, 4);
        assert_eq!(p.hint(), "Add 4 to the last number");
    }
}
