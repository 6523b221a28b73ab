/// Events emitted by the session.
/// The presentation layer consumes these for messages and animation.

use crate::domain::ability::AbilityKind;
use crate::domain::anomaly::AnomalyKind;
use crate::domain::puzzle::PuzzleKind;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PuzzleStarted { node: usize, kind: PuzzleKind, difficulty: f64 },
    PuzzleCompleted { kind: PuzzleKind, score: u32 },
    PuzzleFailed { kind: PuzzleKind },
    NodeCompleted { node: usize },
    AnomalyActivated(AnomalyKind),
    AnomalyExpired(AnomalyKind),
    AbilityUnlocked(AbilityKind),
    AbilityActivated(AbilityKind),
    MapCompleted { level: u32 },
}
