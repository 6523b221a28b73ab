/// Sequence replay: watch a run of glyphs, then key it back in order.
///
///   Demonstrating ──(all glyphs shown)──▶ Collecting ──(full match)──▶ Completed
///                                            │  ▲
///                                            └──┘ mismatch: progress cleared, +1 attempt
///
/// Glyphs are revealed one per `reveal_interval` of `update(dt)`. The
/// countdown stays idle until the demonstration ends.

use rand::seq::SliceRandom;
use rand::RngCore;
use tracing::debug;

use super::{Glyph, Puzzle, PuzzleCore, PuzzleInput, PuzzleKind};
use crate::domain::timer::Cadence;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SequencePhase {
    Demonstrating { shown: usize },
    Collecting,
}

pub struct SequencePuzzle {
    core: PuzzleCore,
    target: Vec<Glyph>,
    entered: Vec<Glyph>,
    phase: SequencePhase,
    cadence: Cadence,
}

impl SequencePuzzle {
    pub fn new(core: PuzzleCore, reveal_interval: f64) -> Self {
        SequencePuzzle {
            core,
            target: Vec::new(),
            entered: Vec::new(),
            phase: SequencePhase::Demonstrating { shown: 0 },
            cadence: Cadence::new(reveal_interval),
        }
    }

    /// `3 + 2·difficulty`, truncated.
    pub fn target_len(difficulty: f64) -> usize {
        (3.0 + 2.0 * difficulty) as usize
    }

    pub fn phase(&self) -> SequencePhase {
        self.phase
    }

    pub fn target(&self) -> &[Glyph] {
        &self.target
    }

    pub fn entered(&self) -> &[Glyph] {
        &self.entered
    }

    /// Glyph currently on display during the demonstration.
    pub fn demo_glyph(&self) -> Option<Glyph> {
        match self.phase {
            SequencePhase::Demonstrating { shown } => self.target.get(shown).copied(),
            SequencePhase::Collecting => None,
        }
    }

    fn finish_demonstration(&mut self) {
        self.phase = SequencePhase::Collecting;
        self.core.timer_mut().start();
        debug!(len = self.target.len(), "sequence demonstration finished");
    }
}

impl Puzzle for SequencePuzzle {
    fn kind(&self) -> PuzzleKind {
        PuzzleKind::Sequence
    }

    fn core(&self) -> &PuzzleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PuzzleCore {
        &mut self.core
    }

    fn setup(&mut self, rng: &mut dyn RngCore) {
        let len = Self::target_len(self.core.difficulty());
        self.target = (0..len)
            .filter_map(|_| Glyph::ALL.choose(&mut *rng).copied())
            .collect();
        self.entered.clear();
        self.phase = SequencePhase::Demonstrating { shown: 0 };
        self.cadence.reset();
        self.core.timer_mut().reset_idle();
        self.core.clear_feedback();
    }

    fn update(&mut self, dt: f64) {
        if let SequencePhase::Demonstrating { shown } = self.phase {
            let shown = shown + self.cadence.tick(dt) as usize;
            if shown >= self.target.len() {
                self.finish_demonstration();
            } else {
                self.phase = SequencePhase::Demonstrating { shown };
            }
        }
    }

    fn handle_input(&mut self, input: &PuzzleInput) -> bool {
        if self.core.is_finished() || self.phase != SequencePhase::Collecting {
            return false;
        }
        let glyph = match input {
            PuzzleInput::Glyph(g) => *g,
            _ => return false,
        };

        let Some(&expected) = self.target.get(self.entered.len()) else {
            return false;
        };
        if glyph != expected {
            self.entered.clear();
            self.core.record_attempt();
            self.core.set_feedback("Wrong symbol. Start the sequence again.");
            return false;
        }

        self.entered.push(glyph);
        if self.entered.len() == self.target.len() {
            self.core.complete();
            self.core.set_feedback("Sequence restored!");
        } else {
            self.core.clear_feedback();
        }
        true
    }

    fn hint_text(&self) -> String {
        match self.phase {
            SequencePhase::Demonstrating { .. } => "Watch the sequence of symbols carefully".to_string(),
            SequencePhase::Collecting if !self.entered.is_empty() => match self.target.get(self.entered.len()) {
                Some(next) => format!("The next symbol is: {next}"),
                None => "The sequence is complete".to_string(),
            },
            SequencePhase::Collecting => "Repeat the sequence you saw".to_string(),
        }
    }

    fn progress(&self) -> f64 {
        if self.target.is_empty() {
            return 0.0;
        }
        self.entered.len() as f64 / self.target.len() as f64
    }

    fn prompt(&self) -> String {
        match self.phase {
            SequencePhase::Demonstrating { shown } => {
                let glyph = self.demo_glyph().map(|g| g.to_string()).unwrap_or_default();
                format!("Watch the sequence  ({}/{})\n\n        {glyph}", shown + 1, self.target.len())
            }
            SequencePhase::Collecting => {
                let entered: Vec<String> = self.entered.iter().map(|g| g.to_string()).collect();
                format!(
                    "Repeat the sequence: 1=▲ 2=● 3=■ 4=★ 5=◆ 6=▼\n\nYour sequence: {}  ({}/{})",
                    entered.join(" "),
                    self.entered.len(),
                    self.target.len()
                )
            }
        }
    }

    /// The glyphs demonstrated so far.
    fn memento(&self) -> Option<String> {
        let seen = match self.phase {
            SequencePhase::Demonstrating { shown } => shown + 1,
            SequencePhase::Collecting => self.target.len(),
        };
        let glyphs: Vec<String> = self.target.iter().take(seen).map(|g| g.to_string()).collect();
        (!glyphs.is_empty()).then(|| glyphs.join(" "))
    }
}
