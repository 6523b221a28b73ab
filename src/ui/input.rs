/// Keyboard input.
///
/// `InputState` drains crossterm events once per frame and keeps the fresh
/// key presses. `map_key` turns one press into a session `Command`,
/// depending on the phase and the kind of puzzle on screen:
///   - map:     ←/→ browse, Space/Enter start
///   - puzzle:  1-6 glyphs (sequence) or 0-9 digits, Backspace, Enter,
///              H hint, Esc pause
///   - story:   Space/Enter continue
///   - summary: N next level
///   - always:  Q/W/E abilities, Ctrl+C quit

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::ability::AbilityKind;
use crate::domain::puzzle::{Glyph, PuzzleInput, PuzzleKind};
use crate::sim::session::Phase;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Quit,
    SelectNext,
    SelectPrevious,
    Start,
    TogglePause,
    Hint,
    Ability(AbilityKind),
    Puzzle(PuzzleInput),
    DismissStory,
    NextLevel,
}

pub struct InputState {
    /// Key presses collected during the most recent `drain_events()`.
    pub presses: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState { presses: Vec::with_capacity(8) }
    }

    /// Drain all pending terminal events without blocking.
    /// Call once per frame.
    pub fn drain_events(&mut self) {
        self.presses.clear();
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                // release events only appear with keyboard enhancement; ignore them
                if key.kind != KeyEventKind::Release {
                    self.presses.push(key);
                }
            }
        }
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.presses.iter().any(is_ctrl_c)
    }

    /// Commands for this frame, in key order.
    pub fn commands(&self, phase: Phase, puzzle: Option<PuzzleKind>) -> Vec<Command> {
        self.presses.iter().filter_map(|k| map_key(k, phase, puzzle)).collect()
    }
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
}

pub fn map_key(key: &KeyEvent, phase: Phase, puzzle: Option<PuzzleKind>) -> Option<Command> {
    if is_ctrl_c(key) {
        return Some(Command::Quit);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return Some(Command::Ability(AbilityKind::MentalPalace)),
        KeyCode::Char('w') | KeyCode::Char('W') => return Some(Command::Ability(AbilityKind::PeripheralVision)),
        KeyCode::Char('e') | KeyCode::Char('E') => return Some(Command::Ability(AbilityKind::Focus)),
        _ => {}
    }

    match phase {
        Phase::MapView => match key.code {
            KeyCode::Right | KeyCode::Down => Some(Command::SelectNext),
            KeyCode::Left | KeyCode::Up => Some(Command::SelectPrevious),
            KeyCode::Enter | KeyCode::Char(' ') => Some(Command::Start),
            _ => None,
        },
        Phase::Puzzle => match key.code {
            KeyCode::Esc => Some(Command::TogglePause),
            KeyCode::Char('h') | KeyCode::Char('H') => Some(Command::Hint),
            KeyCode::Enter => Some(Command::Puzzle(PuzzleInput::Confirm)),
            KeyCode::Backspace => Some(Command::Puzzle(PuzzleInput::Backspace)),
            KeyCode::Char(c) => {
                let d = c.to_digit(10)? as u8;
                if puzzle == Some(PuzzleKind::Sequence) {
                    Glyph::from_key(d).map(|g| Command::Puzzle(PuzzleInput::Glyph(g)))
                } else {
                    Some(Command::Puzzle(PuzzleInput::Digit(d)))
                }
            }
            _ => None,
        },
        Phase::Paused => match key.code {
            KeyCode::Esc => Some(Command::TogglePause),
            _ => None,
        },
        Phase::Story => match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => Some(Command::DismissStory),
            _ => None,
        },
        Phase::MapComplete => match key.code {
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Enter => Some(Command::NextLevel),
            _ => None,
        },
    }
}
