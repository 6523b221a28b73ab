/// Session: the complete state of one play-through.
///
/// ## Phases
///
///   MapView ──start_selected──▶ Puzzle ──completed──▶ Story ──dismiss──▶ MapView
///      ▲                        │  ▲   ──timed out──▶ Story ─┘
///      │                   pause│  │resume
///      │                        ▼  │
///      │                        Paused
///      │
///   advance_level ◀── MapComplete ◀──dismiss (map finished)── Story
///
/// The session owns the single RNG and threads it through map generation,
/// puzzle setup and anomaly rolls.

use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::domain::ability::AbilityKind;
use crate::domain::anomaly::AnomalyEffects;
use crate::domain::clock::Clock;
use crate::domain::map::MemoryMap;
use crate::domain::puzzle::{Puzzle, PuzzleInput};
use crate::error::{CoreError, Result};
use crate::sim::event::GameEvent;
use crate::sim::manager::{PuzzleInfo, PuzzleManager};

pub const TIMEOUT_STORY: &str = "Time ran out... the memory slips back into the fog.";
pub const LOCKED_MESSAGE: &str = "This memory is still locked. Restore a neighbouring one first.";
pub const RESTORED_MESSAGE: &str = "This memory has already been restored.";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    MapView,
    Puzzle,
    Paused,
    Story,
    MapComplete,
}

pub struct Session {
    rng: StdRng,
    map: MemoryMap,
    puzzles: PuzzleManager,
    phase: Phase,
    active_node: Option<usize>,
    story: Option<String>,
    message: Option<String>,
    events: Vec<GameEvent>,
}

impl Session {
    /// New session with a map generated at the configured start level.
    pub fn new(config: &GameConfig, clock: Rc<dyn Clock>) -> Self {
        let rng = match config.general.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut session = Session {
            rng,
            map: MemoryMap::new(config.map.clone()),
            puzzles: PuzzleManager::new(clock, config),
            phase: Phase::MapView,
            active_node: None,
            story: None,
            message: None,
            events: Vec::new(),
        };
        session.start_map(config.general.start_level);
        session
    }

    // ── Map ──

    /// Fresh map at `level`. Player stats, anomalies and abilities carry over.
    pub fn start_map(&mut self, level: u32) {
        self.puzzles.clear_current();
        self.map.generate(level, &mut self.rng);
        self.phase = Phase::MapView;
        self.active_node = None;
        self.story = None;
        self.message = None;
    }

    pub fn select_next(&mut self) -> Option<usize> {
        if self.phase != Phase::MapView {
            return None;
        }
        self.map.select_next_available()
    }

    pub fn select_previous(&mut self) -> Option<usize> {
        if self.phase != Phase::MapView {
            return None;
        }
        self.map.select_previous_available()
    }

    /// Start the puzzle of the selected node at node difficulty × adaptive factor.
    /// Completed or locked nodes are refused with a message. Ok(false) then.
    pub fn start_selected(&mut self) -> Result<bool> {
        if self.phase != Phase::MapView {
            return Ok(false);
        }
        let id = self.map.current_node().ok_or(CoreError::NodeNotFound(self.map.start_node()))?;
        let node = self.map.node(id).ok_or(CoreError::NodeNotFound(id))?;

        if node.completed {
            self.message = Some(RESTORED_MESSAGE.to_string());
            return Ok(false);
        }
        if !self.map.is_available(id) {
            self.message = Some(LOCKED_MESSAGE.to_string());
            return Ok(false);
        }

        let kind = node.puzzle_kind;
        let difficulty = node.difficulty * self.puzzles.adaptive_difficulty(kind);
        let effective = self.puzzles.create_puzzle(kind, difficulty, &mut self.rng).core().difficulty();

        self.active_node = Some(id);
        self.phase = Phase::Puzzle;
        self.message = None;
        self.events.push(GameEvent::PuzzleStarted { node: id, kind, difficulty: effective });
        debug!(node = id, %kind, difficulty = effective, "node entered");
        Ok(true)
    }

    // ── Puzzle play ──

    /// Forward one input to the running puzzle. False outside the puzzle phase.
    pub fn input(&mut self, input: PuzzleInput) -> Result<bool> {
        if self.phase != Phase::Puzzle {
            return Ok(false);
        }
        let accepted = self.puzzles.handle_input(&input, &mut self.rng)?;
        self.message = self.puzzles.current().and_then(|p| p.core().feedback()).map(str::to_string);
        if self.puzzles.current().is_some_and(|p| p.is_completed()) {
            self.finish_node()?;
        }
        self.collect_events();
        Ok(accepted)
    }

    pub fn request_hint(&mut self) -> Option<String> {
        if self.phase != Phase::Puzzle {
            return None;
        }
        let hint = self.puzzles.request_hint().ok()?;
        self.message = Some(hint.clone());
        Some(hint)
    }

    pub fn use_ability(&mut self, kind: AbilityKind) -> bool {
        if !matches!(self.phase, Phase::MapView | Phase::Puzzle) {
            return false;
        }
        let used = self.puzzles.use_ability(kind);
        self.message = Some(if used {
            format!("{} activated", kind.title())
        } else if !self.puzzles.abilities().is_unlocked(kind) {
            format!("{} is still locked", kind.title())
        } else {
            format!(
                "{} recharging ({:.0}s)",
                kind.title(),
                self.puzzles.abilities().cooldown_remaining(kind)
            )
        });
        self.collect_events();
        used
    }

    pub fn pause(&mut self) {
        if self.phase == Phase::Puzzle {
            self.puzzles.pause();
            self.phase = Phase::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.phase == Phase::Paused {
            self.puzzles.resume();
            self.phase = Phase::Puzzle;
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.phase {
            Phase::Puzzle => self.pause(),
            Phase::Paused => self.resume(),
            _ => {}
        }
    }

    /// Leave the story screen: back to the map, or to the level summary
    /// once every node is restored.
    pub fn dismiss_story(&mut self) {
        if self.phase != Phase::Story {
            return;
        }
        self.puzzles.clear_current();
        self.story = None;
        self.active_node = None;
        self.phase = if self.map.is_complete() { Phase::MapComplete } else { Phase::MapView };
    }

    /// Next, larger map. Only from the level summary.
    pub fn advance_level(&mut self) -> bool {
        if self.phase != Phase::MapComplete {
            return false;
        }
        let next = self.map.level() + 1;
        info!(level = next, "advancing to next map");
        self.start_map(next);
        true
    }

    /// Per-frame tick. Paused sessions stand still.
    pub fn update(&mut self, dt: f64) {
        if self.phase == Phase::Paused {
            return;
        }
        self.puzzles.update(dt);
        let events = self.puzzles.take_events();
        if self.phase == Phase::Puzzle && events.iter().any(|e| matches!(e, GameEvent::PuzzleFailed { .. })) {
            self.story = Some(TIMEOUT_STORY.to_string());
            self.message = None;
            self.phase = Phase::Story;
        }
        self.events.extend(events);
    }

    fn finish_node(&mut self) -> Result<()> {
        let Some(id) = self.active_node else {
            return Ok(());
        };
        self.map.complete_node(id)?;
        self.events.extend(self.puzzles.take_events());
        self.events.push(GameEvent::NodeCompleted { node: id });
        self.story = self.map.node(id).map(|n| n.story_fragment.clone());
        self.phase = Phase::Story;
        if self.map.is_complete() {
            info!(level = self.map.level(), "memory map restored");
            self.events.push(GameEvent::MapCompleted { level: self.map.level() });
        }
        Ok(())
    }

    fn collect_events(&mut self) {
        self.events.extend(self.puzzles.take_events());
    }

    // ── Queries ──

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn level(&self) -> u32 {
        self.map.level()
    }

    pub fn map(&self) -> &MemoryMap {
        &self.map
    }

    pub fn puzzles(&self) -> &PuzzleManager {
        &self.puzzles
    }

    pub fn puzzles_mut(&mut self) -> &mut PuzzleManager {
        &mut self.puzzles
    }

    pub fn current_puzzle(&self) -> Option<&dyn Puzzle> {
        self.puzzles.current()
    }

    pub fn puzzle_info(&self) -> Option<PuzzleInfo> {
        self.puzzles.puzzle_info()
    }

    pub fn active_node(&self) -> Option<usize> {
        self.active_node
    }

    pub fn story(&self) -> Option<&str> {
        self.story.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Current anomaly effects; distraction is re-rolled on every call.
    pub fn anomaly_effects(&mut self) -> AnomalyEffects {
        self.puzzles.anomalies().effects(&mut self.rng)
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::domain::puzzle::PuzzleKind;

    fn session(seed: u64) -> (Rc<ManualClock>, Session) {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut config = GameConfig::default();
        config.general.seed = Some(seed);
        config.anomalies.oblivion_probability = 0.0;
        config.anomalies.noise_probability = 0.0;
        config.anomalies.repetition_probability = 0.0;
        (clock.clone(), Session::new(&config, clock))
    }

    /// Run the current puzzle into its timeout.
    fn time_out(clock: &ManualClock, s: &mut Session) {
        // finish any demonstration first
        for _ in 0..20 {
            s.update(1.0);
        }
        clock.advance(1000.0);
        s.update(0.0);
    }

    #[test]
    fn new_session_shows_start_level_map() {
        let (_, s) = session(1);
        assert_eq!(s.phase(), Phase::MapView);
        assert_eq!(s.level(), 1);
        assert_eq!(s.map().len(), 7);
        assert_eq!(s.map().current_node(), Some(0));
    }

    #[test]
    fn same_seed_same_map() {
        let (_, a) = session(42);
        let (_, b) = session(42);
        let kinds = |s: &Session| s.map().nodes().map(|n| n.puzzle_kind).collect::<Vec<PuzzleKind>>();
        assert_eq!(kinds(&a), kinds(&b));
    }

    #[test]
    fn start_selected_scales_by_adaptive_factor() {
        let (_, mut s) = session(2);
        let node_difficulty = s.map().node(0).unwrap().difficulty;
        assert_eq!(s.start_selected(), Ok(true));
        assert_eq!(s.phase(), Phase::Puzzle);
        assert_eq!(s.active_node(), Some(0));
        let info = s.puzzle_info().unwrap();
        assert!((info.difficulty - node_difficulty).abs() < 1e-9);
        let events = s.take_events();
        assert!(matches!(events[0], GameEvent::PuzzleStarted { node: 0, .. }));
    }

    #[test]
    fn locked_node_is_refused() {
        let (_, mut s) = session(3);
        s.map.set_current(3).unwrap();
        assert_eq!(s.start_selected(), Ok(false));
        assert_eq!(s.phase(), Phase::MapView);
        assert_eq!(s.message(), Some(LOCKED_MESSAGE));
    }

    #[test]
    fn completed_node_is_refused() {
        let (_, mut s) = session(4);
        s.map.complete_node(0).unwrap();
        s.map.set_current(0).unwrap();
        assert_eq!(s.start_selected(), Ok(false));
        assert_eq!(s.message(), Some(RESTORED_MESSAGE));
    }

    #[test]
    fn pause_freezes_the_puzzle_and_update() {
        let (clock, mut s) = session(5);
        s.start_selected().unwrap();
        for _ in 0..20 {
            s.update(1.0);
        }
        let before = s.puzzle_info().unwrap().remaining_time;
        s.pause();
        assert_eq!(s.phase(), Phase::Paused);
        assert_eq!(s.input(PuzzleInput::Confirm), Ok(false));
        clock.advance(500.0);
        s.update(500.0);
        assert_eq!(s.phase(), Phase::Paused);
        s.resume();
        assert_eq!(s.phase(), Phase::Puzzle);
        assert!((s.puzzle_info().unwrap().remaining_time - before).abs() < 1e-9);
    }

    #[test]
    fn timeout_shows_story_and_returns_to_map() {
        let (clock, mut s) = session(6);
        s.start_selected().unwrap();
        time_out(&clock, &mut s);
        assert_eq!(s.phase(), Phase::Story);
        assert_eq!(s.story(), Some(TIMEOUT_STORY));
        assert!(s.take_events().iter().any(|e| matches!(e, GameEvent::PuzzleFailed { .. })));
        assert!(s.map().completed_nodes().is_empty());
        s.dismiss_story();
        assert_eq!(s.phase(), Phase::MapView);
        assert!(s.current_puzzle().is_none());
        // the node can be retried
        assert_eq!(s.start_selected(), Ok(true));
    }

    #[test]
    fn hints_only_during_puzzle() {
        let (_, mut s) = session(7);
        assert_eq!(s.request_hint(), None);
        s.start_selected().unwrap();
        assert!(s.request_hint().is_some());
        assert!(s.request_hint().is_some());
        assert_eq!(s.request_hint().as_deref(), Some(crate::domain::puzzle::NO_HINTS_LEFT));
    }

    #[test]
    fn locked_ability_reports_message() {
        let (_, mut s) = session(8);
        assert!(!s.use_ability(AbilityKind::Focus));
        assert_eq!(s.message(), Some("Focus is still locked"));
        assert!(s.use_ability(AbilityKind::MentalPalace));
        assert!(s.take_events().contains(&GameEvent::AbilityActivated(AbilityKind::MentalPalace)));
        assert!(!s.use_ability(AbilityKind::MentalPalace));
        assert_eq!(s.message(), Some("Mental Palace recharging (10s)"));
    }

    #[test]
    fn finished_map_leads_to_next_level() {
        let (_, mut s) = session(9);
        let n = s.map().len();
        // restore every node but the last directly, then the last one through the story flow
        for id in 0..n - 1 {
            s.map.complete_node(id).unwrap();
        }
        s.active_node = Some(n - 1);
        s.phase = Phase::Puzzle;
        s.finish_node().unwrap();
        assert_eq!(s.phase(), Phase::Story);
        assert!(s.take_events().contains(&GameEvent::MapCompleted { level: 1 }));
        assert!(!s.advance_level());
        s.dismiss_story();
        assert_eq!(s.phase(), Phase::MapComplete);
        assert!(s.advance_level());
        assert_eq!(s.level(), 2);
        assert_eq!(s.map().len(), 9);
        assert_eq!(s.phase(), Phase::MapView);
    }
}
