/// Procedural mind map: memory nodes on a spiral, linked as a chain.
///
/// Node 0 sits in the centre and is the entry point. A node becomes
/// available once any neighbour is completed; the frontier is recomputed
/// from completion state on every query.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use tracing::{debug, info};

use crate::config::MapConfig;
use crate::domain::puzzle::PuzzleKind;
use crate::error::{CoreError, Result};

pub const STORY_FRAGMENTS: [&str; 5] = [
    "In the annals of time, when memory was sacred...",
    "The ancient archivists kept their secrets in their minds...",
    "Every symbol tells a lost story...",
    "Wisdom fades like mist at dawn...",
    "Only one who masters memory can restore the codex...",
];

#[derive(Clone, Debug)]
pub struct MemoryNode {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub connections: BTreeSet<usize>,
    pub puzzle_kind: PuzzleKind,
    pub difficulty: f64,
    pub completed: bool,
    pub story_fragment: String,
}

impl MemoryNode {
    pub fn new(id: usize, x: f64, y: f64) -> Self {
        MemoryNode {
            id,
            x,
            y,
            connections: BTreeSet::new(),
            puzzle_kind: PuzzleKind::Sequence,
            difficulty: 1.0,
            completed: false,
            story_fragment: String::new(),
        }
    }

    pub fn is_connected_to(&self, other: usize) -> bool {
        self.connections.contains(&other)
    }
}

#[derive(Clone, Debug)]
pub struct MemoryMap {
    config: MapConfig,
    nodes: BTreeMap<usize, MemoryNode>,
    start_node: usize,
    current_node: Option<usize>,
    completed: BTreeSet<usize>,
    level: u32,
}

impl MemoryMap {
    /// Empty map; call `generate`.
    pub fn new(config: MapConfig) -> Self {
        MemoryMap {
            config,
            nodes: BTreeMap::new(),
            start_node: 0,
            current_node: None,
            completed: BTreeSet::new(),
            level: 0,
        }
    }

    /// `nodes_min + 2·level`, held within [nodes_min, nodes_max].
    pub fn node_count(&self, level: u32) -> usize {
        let min = self.config.nodes_min;
        let wanted = min.saturating_add(level as usize * 2);
        wanted.min(self.config.nodes_max).max(min)
    }

    /// Replace the whole map with a fresh one for `level`.
    pub fn generate(&mut self, level: u32, rng: &mut dyn RngCore) {
        self.nodes.clear();
        self.completed.clear();
        self.level = level;

        let count = self.node_count(level);
        self.place_nodes(count);
        self.link_chain();
        self.assign_content(rng);

        self.start_node = 0;
        self.current_node = self.nodes.contains_key(&0).then_some(0);
        info!(level, nodes = count, "memory map generated");
    }

    fn place_nodes(&mut self, count: usize) {
        let cx = self.config.width / 2.0;
        let cy = self.config.height / 2.0;
        for i in 0..count {
            let (x, y) = if i == 0 {
                (cx, cy)
            } else {
                let angle = (i - 1) as f64 * TAU / (count - 1) as f64;
                let radius = self.config.spiral_radius_start + (i - 1) as f64 * self.config.spiral_radius_step;
                (cx + radius * angle.cos(), cy + radius * angle.sin())
            };
            self.nodes.insert(i, MemoryNode::new(i, x, y));
        }
    }

    fn link_chain(&mut self) {
        let ids: Vec<usize> = self.nodes.keys().copied().collect();
        for pair in ids.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if let Some(node) = self.nodes.get_mut(&a) {
                node.connections.insert(b);
            }
            if let Some(node) = self.nodes.get_mut(&b) {
                node.connections.insert(a);
            }
        }
    }

    fn assign_content(&mut self, rng: &mut dyn RngCore) {
        let (lo, hi) = (self.config.difficulty_min, self.config.difficulty_max);
        for node in self.nodes.values_mut() {
            if let Some(kind) = PuzzleKind::ALL.choose(&mut *rng) {
                node.puzzle_kind = *kind;
            }
            if let Some(story) = STORY_FRAGMENTS.choose(&mut *rng) {
                node.story_fragment = story.to_string();
            }
            node.difficulty = if hi > lo { rng.gen_range(lo..hi) } else { lo };
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Width and height of the layout plane.
    pub fn bounds(&self) -> (f64, f64) {
        (self.config.width, self.config.height)
    }

    pub fn start_node(&self) -> usize {
        self.start_node
    }

    pub fn current_node(&self) -> Option<usize> {
        self.current_node
    }

    pub fn set_current(&mut self, id: usize) -> Result<()> {
        if !self.nodes.contains_key(&id) {
            return Err(CoreError::NodeNotFound(id));
        }
        self.current_node = Some(id);
        Ok(())
    }

    pub fn node(&self, id: usize) -> Option<&MemoryNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &MemoryNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn completed_nodes(&self) -> &BTreeSet<usize> {
        &self.completed
    }

    /// Unlock frontier: the start node while it is open, then every open
    /// neighbour of a completed node, in id order, without duplicates.
    pub fn available_nodes(&self) -> Vec<usize> {
        let mut available = Vec::new();
        if let Some(start) = self.nodes.get(&self.start_node) {
            if !start.completed {
                available.push(start.id);
            }
        }
        for node in self.nodes.values().filter(|n| n.completed) {
            for id in &node.connections {
                let open = self.nodes.get(id).is_some_and(|n| !n.completed);
                if open && !available.contains(id) {
                    available.push(*id);
                }
            }
        }
        available
    }

    pub fn is_available(&self, id: usize) -> bool {
        self.available_nodes().contains(&id)
    }

    /// Mark a node done. Ok(false) if it already was (nothing changes).
    pub fn complete_node(&mut self, id: usize) -> Result<bool> {
        let node = self.nodes.get_mut(&id).ok_or(CoreError::NodeNotFound(id))?;
        if node.completed {
            return Ok(false);
        }
        node.completed = true;
        self.completed.insert(id);
        debug!(node = id, "memory node completed");

        if self.current_node == Some(id) {
            if let Some(&next) = self.available_nodes().first() {
                self.current_node = Some(next);
            }
        }
        Ok(true)
    }

    pub fn progress(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        self.completed.len() as f64 / self.nodes.len() as f64
    }

    pub fn is_complete(&self) -> bool {
        !self.nodes.is_empty() && self.completed.len() == self.nodes.len()
    }

    /// Move the cursor forward through the available nodes, wrapping.
    pub fn select_next_available(&mut self) -> Option<usize> {
        self.step_selection(1)
    }

    pub fn select_previous_available(&mut self) -> Option<usize> {
        self.step_selection(-1)
    }

    fn step_selection(&mut self, dir: isize) -> Option<usize> {
        let available = self.available_nodes();
        if available.is_empty() {
            return None;
        }
        let len = available.len() as isize;
        let next = match self.current_node.and_then(|c| available.iter().position(|&id| id == c)) {
            Some(pos) => (pos as isize + dir).rem_euclid(len) as usize,
            None => 0,
        };
        self.current_node = Some(available[next]);
        self.current_node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generated(level: u32, seed: u64) -> MemoryMap {
        let mut map = MemoryMap::new(MapConfig::default());
        map.generate(level, &mut StdRng::seed_from_u64(seed));
        map
    }

    #[test]
    fn node_count_grows_with_level_and_caps() {
        let map = MemoryMap::new(MapConfig::default());
        assert_eq!(map.node_count(0), 5);
        assert_eq!(map.node_count(1), 7);
        assert_eq!(map.node_count(5), 15);
        assert_eq!(map.node_count(50), 15);
    }

    #[test]
    fn chain_topology_and_content() {
        let map = generated(1, 11);
        assert_eq!(map.len(), 7);
        for node in map.nodes() {
            let mut expected = BTreeSet::new();
            if node.id > 0 {
                expected.insert(node.id - 1);
            }
            if node.id + 1 < map.len() {
                expected.insert(node.id + 1);
            }
            assert_eq!(node.connections, expected);
            assert!((0.8..1.5).contains(&node.difficulty));
            assert!(STORY_FRAGMENTS.contains(&node.story_fragment.as_str()));
        }
        let centre = map.node(0).unwrap();
        assert_eq!((centre.x, centre.y), (600.0, 400.0));
        let first = map.node(1).unwrap();
        assert!((first.x - 750.0).abs() < 1e-9);
    }

    #[test]
    fn frontier_follows_completion() {
        let mut map = generated(0, 3);
        assert_eq!(map.available_nodes(), vec![0]);
        assert_eq!(map.complete_node(0), Ok(true));
        assert_eq!(map.available_nodes(), vec![1]);
        assert_eq!(map.current_node(), Some(1));
        map.complete_node(2).unwrap();
        assert_eq!(map.available_nodes(), vec![1, 3]);
    }

    #[test]
    fn complete_node_is_idempotent() {
        let mut map = generated(0, 4);
        assert_eq!(map.complete_node(0), Ok(true));
        assert_eq!(map.complete_node(0), Ok(false));
        assert_eq!(map.completed_nodes().len(), 1);
        assert_eq!(map.complete_node(99), Err(CoreError::NodeNotFound(99)));
    }

    #[test]
    fn progress_and_completion() {
        let mut map = MemoryMap::new(MapConfig::default());
        assert_eq!(map.progress(), 0.0);
        assert!(!map.is_complete());
        map.generate(0, &mut StdRng::seed_from_u64(1));
        for id in 0..map.len() {
            map.complete_node(id).unwrap();
        }
        assert_eq!(map.progress(), 1.0);
        assert!(map.is_complete());
        assert!(map.available_nodes().is_empty());
    }

    #[test]
    fn regenerate_discards_previous_state() {
        let mut map = generated(0, 5);
        map.complete_node(0).unwrap();
        map.generate(2, &mut StdRng::seed_from_u64(6));
        assert!(map.completed_nodes().is_empty());
        assert_eq!(map.len(), 9);
        assert_eq!(map.current_node(), Some(0));
        assert_eq!(map.level(), 2);
    }

    #[test]
    fn selection_cycles_available_nodes() {
        let mut map = generated(0, 7);
        map.complete_node(2).unwrap();
        // available: 0, then 1 and 3 from node 2
        assert_eq!(map.available_nodes(), vec![0, 1, 3]);
        map.set_current(0).unwrap();
        assert_eq!(map.select_next_available(), Some(1));
        assert_eq!(map.select_next_available(), Some(3));
        assert_eq!(map.select_next_available(), Some(0));
        assert_eq!(map.select_previous_available(), Some(3));
        assert_eq!(map.set_current(42), Err(CoreError::NodeNotFound(42)));
    }

    proptest! {
        #[test]
        fn frontier_invariants(level in 0u32..8, seed in any::<u64>(), picks in proptest::collection::vec(0usize..15, 0..10)) {
            let mut map = generated(level, seed);
            let n = map.len();
            for id in picks.into_iter().filter(|id| *id < n) {
                map.complete_node(id).unwrap();
            }
            let available = map.available_nodes();
            if map.completed_nodes().is_empty() {
                prop_assert_eq!(available.clone(), vec![0]);
            }
            for id in &available {
                let node = map.node(*id).unwrap();
                prop_assert!(!node.completed);
                let has_done_neighbour = node.connections.iter().any(|c| map.node(*c).unwrap().completed);
                prop_assert!(*id == map.start_node() || has_done_neighbour);
            }
            let mut dedup = available.clone();
            dedup.sort_unstable();
            dedup.dedup();
            prop_assert_eq!(dedup.len(), available.len());
            let flagged: BTreeSet<usize> = map.nodes().filter(|n| n.completed).map(|n| n.id).collect();
            prop_assert_eq!(&flagged, map.completed_nodes());
        }
    }
}
