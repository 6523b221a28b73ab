/// Puzzle construction by kind or tag.

use std::rc::Rc;

use tracing::debug;

use super::pattern::PatternPuzzle;
use super::sequence::SequencePuzzle;
use super::spatial::SpatialPuzzle;
use super::{Puzzle, PuzzleCore, PuzzleKind};
use crate::config::PuzzleConfig;
use crate::domain::clock::Clock;
use crate::domain::timer::CountdownTimer;
use crate::error::Result;

pub struct PuzzleFactory {
    clock: Rc<dyn Clock>,
    config: PuzzleConfig,
}

impl PuzzleFactory {
    pub fn new(clock: Rc<dyn Clock>, config: PuzzleConfig) -> Self {
        PuzzleFactory { clock, config }
    }

    pub fn available_kinds(&self) -> &'static [PuzzleKind] {
        &PuzzleKind::ALL
    }

    /// Unconfigured puzzle; the caller applies modifiers and runs `setup`.
    pub fn create(&self, kind: PuzzleKind, difficulty: f64) -> Box<dyn Puzzle> {
        let timer = CountdownTimer::idle(self.clock.clone(), self.config.timeout_secs);
        let core = PuzzleCore::new(difficulty, timer, &self.config);
        debug!(%kind, difficulty, "puzzle constructed");
        match kind {
            PuzzleKind::Sequence => Box::new(SequencePuzzle::new(core, self.config.reveal_interval_secs)),
            PuzzleKind::Pattern => Box::new(PatternPuzzle::new(core, self.config.progressions.clone())),
            PuzzleKind::Spatial => Box::new(SpatialPuzzle::new(core, self.config.reveal_interval_secs)),
        }
    }

    pub fn create_by_tag(&self, tag: &str, difficulty: f64) -> Result<Box<dyn Puzzle>> {
        let kind = tag.parse::<PuzzleKind>()?;
        Ok(self.create(kind, difficulty))
    }
}
