/// Spatial recall on a 4×4 grid.
///
/// Target cells are revealed one per `reveal_interval`, then replayed by
/// the player. A coordinate arrives either as two digit presses (column
/// then row, auto-submitted once both are buffered) or as an explicit
/// "col,row" string. Digit presses are 1-based labels; the comma form
/// names the 0-based cell directly. A wrong cell wipes replay progress
/// and charges one attempt.

use rand::{Rng, RngCore};
use tracing::debug;

use super::{Puzzle, PuzzleCore, PuzzleInput, PuzzleKind};
use crate::domain::timer::Cadence;

pub const GRID_SIZE: u8 = 4;

/// 0-based grid cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Cell {
    pub col: u8,
    pub row: u8,
}

impl Cell {
    pub fn new(col: u8, row: u8) -> Self {
        Cell { col, row }
    }

    /// From 1-based labels; None when off the grid.
    pub fn from_labels(col: u8, row: u8) -> Option<Cell> {
        let in_range = |v: u8| (1..=GRID_SIZE).contains(&v);
        if in_range(col) && in_range(row) {
            Some(Cell::new(col - 1, row - 1))
        } else {
            None
        }
    }

    /// Parse "col,row" as 0-based indices (whitespace tolerated).
    pub fn parse_coordinate(s: &str) -> Option<Cell> {
        let (col, row) = s.split_once(',')?;
        let col = col.trim().parse::<u8>().ok()?;
        let row = row.trim().parse::<u8>().ok()?;
        (col < GRID_SIZE && row < GRID_SIZE).then(|| Cell::new(col, row))
    }

    /// 1-based "(col,row)" as shown on the grid.
    pub fn label(&self) -> String {
        format!("({},{})", self.col + 1, self.row + 1)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SpatialPhase {
    Demonstrating { shown: usize },
    Collecting,
}

pub struct SpatialPuzzle {
    core: PuzzleCore,
    targets: Vec<Cell>,
    entered: Vec<Cell>,
    digits: Vec<u8>,
    phase: SpatialPhase,
    cadence: Cadence,
}

impl SpatialPuzzle {
    pub fn new(core: PuzzleCore, reveal_interval: f64) -> Self {
        SpatialPuzzle {
            core,
            targets: Vec::new(),
            entered: Vec::new(),
            digits: Vec::new(),
            phase: SpatialPhase::Demonstrating { shown: 0 },
            cadence: Cadence::new(reveal_interval),
        }
    }

    /// `2 + difficulty`, truncated.
    pub fn target_len(difficulty: f64) -> usize {
        (2.0 + difficulty) as usize
    }

    pub fn phase(&self) -> SpatialPhase {
        self.phase
    }

    pub fn targets(&self) -> &[Cell] {
        &self.targets
    }

    pub fn entered(&self) -> &[Cell] {
        &self.entered
    }

    pub fn pending_digits(&self) -> &[u8] {
        &self.digits
    }

    pub fn demo_cell(&self) -> Option<Cell> {
        match self.phase {
            SpatialPhase::Demonstrating { shown } => self.targets.get(shown).copied(),
            SpatialPhase::Collecting => None,
        }
    }

    fn finish_demonstration(&mut self) {
        self.phase = SpatialPhase::Collecting;
        self.core.timer_mut().start();
        debug!(len = self.targets.len(), "spatial demonstration finished");
    }

    fn submit(&mut self, cell: Cell) -> bool {
        let Some(&expected) = self.targets.get(self.entered.len()) else {
            return false;
        };
        if cell != expected {
            self.entered.clear();
            self.core.record_attempt();
            self.core
                .set_feedback(format!("Wrong cell. Expected {}. Start again.", expected.label()));
            return false;
        }

        self.entered.push(cell);
        if self.entered.len() == self.targets.len() {
            self.core.complete();
            self.core.set_feedback("Pattern recalled!");
        } else {
            self.core.clear_feedback();
        }
        true
    }

    fn push_digit(&mut self, d: u8) -> bool {
        if !(1..=GRID_SIZE).contains(&d) {
            self.digits.clear();
            self.core
                .set_feedback(format!("Coordinates run from 1 to {GRID_SIZE}."));
            return false;
        }
        self.digits.push(d);
        if self.digits.len() < 2 {
            return true;
        }
        let (col, row) = (self.digits[0], self.digits[1]);
        self.digits.clear();
        match Cell::from_labels(col, row) {
            Some(cell) => self.submit(cell),
            None => false,
        }
    }
}

impl Puzzle for SpatialPuzzle {
    fn kind(&self) -> PuzzleKind {
        PuzzleKind::Spatial
    }

    fn core(&self) -> &PuzzleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PuzzleCore {
        &mut self.core
    }

    fn setup(&mut self, rng: &mut dyn RngCore) {
        let len = Self::target_len(self.core.difficulty());
        self.targets = (0..len)
            .map(|_| Cell::new(rng.gen_range(0..GRID_SIZE), rng.gen_range(0..GRID_SIZE)))
            .collect();
        self.entered.clear();
        self.digits.clear();
        self.phase = SpatialPhase::Demonstrating { shown: 0 };
        self.cadence.reset();
        self.core.timer_mut().reset_idle();
        self.core.clear_feedback();
    }

    fn update(&mut self, dt: f64) {
        if let SpatialPhase::Demonstrating { shown } = self.phase {
            let shown = shown + self.cadence.tick(dt) as usize;
            if shown >= self.targets.len() {
                self.finish_demonstration();
            } else {
                self.phase = SpatialPhase::Demonstrating { shown };
            }
        }
    }

    fn handle_input(&mut self, input: &PuzzleInput) -> bool {
        if self.core.is_finished() || self.phase != SpatialPhase::Collecting {
            return false;
        }
        match input {
            PuzzleInput::Digit(d) => self.push_digit(*d),
            PuzzleInput::Backspace => self.digits.pop().is_some(),
            PuzzleInput::Coordinate(text) => match Cell::parse_coordinate(text) {
                Some(cell) => {
                    self.digits.clear();
                    self.submit(cell)
                }
                None => {
                    self.digits.clear();
                    self.core.set_feedback("Invalid coordinate. Use col,row (e.g. 0,1).");
                    false
                }
            },
            _ => false,
        }
    }

    fn hint_text(&self) -> String {
        match self.phase {
            SpatialPhase::Demonstrating { .. } => "Memorise the highlighted cells in order".to_string(),
            SpatialPhase::Collecting => match self.targets.get(self.entered.len()) {
                Some(next) => format!("The next cell is {}", next.label()),
                None => "The pattern is complete".to_string(),
            },
        }
    }

    fn progress(&self) -> f64 {
        if self.targets.is_empty() {
            return 0.0;
        }
        self.entered.len() as f64 / self.targets.len() as f64
    }

    fn prompt(&self) -> String {
        let highlight = match self.phase {
            SpatialPhase::Demonstrating { .. } => self.demo_cell(),
            SpatialPhase::Collecting => None,
        };
        let mut grid = String::from("    1 2 3 4\n");
        for row in 0..GRID_SIZE {
            grid.push_str(&format!("  {} ", row + 1));
            for col in 0..GRID_SIZE {
                let cell = Cell::new(col, row);
                let mark = if highlight == Some(cell) {
                    '█'
                } else if self.entered.contains(&cell) {
                    '▒'
                } else {
                    '·'
                };
                grid.push(mark);
                grid.push(' ');
            }
            grid.push('\n');
        }

        match self.phase {
            SpatialPhase::Demonstrating { shown } => {
                format!("Memorise the cells  ({}/{})\n\n{grid}", shown + 1, self.targets.len())
            }
            SpatialPhase::Collecting => {
                let typed: String = self.digits.iter().map(u8::to_string).collect();
                format!(
                    "Repeat the cells: type column then row (1-4)\n\n{grid}\nEntered {}/{}   input: {typed}_",
                    self.entered.len(),
                    self.targets.len()
                )
            }
        }
    }

    fn memento(&self) -> Option<String> {
        let seen = match self.phase {
            SpatialPhase::Demonstrating { shown } => shown + 1,
            SpatialPhase::Collecting => self.targets.len(),
        };
        let cells: Vec<String> = self.targets.iter().take(seen).map(Cell::label).collect();
        (!cells.is_empty()).then(|| cells.join(" "))
    }
}
