/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::domain::puzzle::pattern::ProgressionKind;
use crate::error::{CoreError, Result};

// ── Public Config Struct ──

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub puzzle: PuzzleConfig,
    #[serde(default)]
    pub abilities: AbilityConfig,
    #[serde(default)]
    pub anomalies: AnomalyConfig,
    #[serde(default)]
    pub adaptive: AdaptiveConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GeneralConfig {
    /// Fixed RNG seed; absent = seeded from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_start_level")]
    pub start_level: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_nodes_min")]
    pub nodes_min: usize,
    #[serde(default = "default_nodes_max")]
    pub nodes_max: usize,
    #[serde(default = "default_map_width")]
    pub width: f64,
    #[serde(default = "default_map_height")]
    pub height: f64,
    #[serde(default = "default_radius_start")]
    pub spiral_radius_start: f64,
    #[serde(default = "default_radius_step")]
    pub spiral_radius_step: f64,
    #[serde(default = "default_node_difficulty_min")]
    pub difficulty_min: f64,
    #[serde(default = "default_node_difficulty_max")]
    pub difficulty_max: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PuzzleConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: f64,
    #[serde(default = "default_max_hints")]
    pub max_hints: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_reveal_interval")]
    pub reveal_interval_secs: f64,
    #[serde(default = "default_progressions")]
    pub progressions: Vec<ProgressionKind>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AbilityConfig {
    #[serde(default = "default_palace_capacity")]
    pub palace_capacity: usize,
    #[serde(default = "default_palace_cooldown")]
    pub palace_cooldown: f64,
    #[serde(default = "default_vision_cooldown")]
    pub vision_cooldown: f64,
    #[serde(default = "default_vision_duration")]
    pub vision_duration: f64,
    #[serde(default = "default_vision_multiplier")]
    pub vision_multiplier: f64,
    #[serde(default = "default_focus_cooldown")]
    pub focus_cooldown: f64,
    #[serde(default = "default_focus_duration")]
    pub focus_duration: f64,
    #[serde(default = "default_focus_multiplier")]
    pub focus_time_multiplier: f64,
    #[serde(default = "default_vision_unlock")]
    pub vision_unlock_at: u32,
    #[serde(default = "default_focus_unlock")]
    pub focus_unlock_at: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AnomalyConfig {
    #[serde(default = "default_activation_interval")]
    pub min_activation_interval: f64,
    #[serde(default = "default_oblivion_probability")]
    pub oblivion_probability: f64,
    #[serde(default = "default_noise_probability")]
    pub noise_probability: f64,
    #[serde(default = "default_repetition_probability")]
    pub repetition_probability: f64,
    #[serde(default = "default_oblivion_duration")]
    pub oblivion_duration: f64,
    #[serde(default = "default_noise_duration")]
    pub noise_duration: f64,
    #[serde(default = "default_repetition_max_attempts")]
    pub repetition_max_attempts: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AdaptiveConfig {
    #[serde(default = "default_strong_bonus")]
    pub strong_bonus: f64,
    #[serde(default = "default_weak_penalty")]
    pub weak_penalty: f64,
    #[serde(default = "default_progression_step")]
    pub progression_step: f64,
    #[serde(default = "default_adaptive_min")]
    pub min: f64,
    #[serde(default = "default_adaptive_max")]
    pub max: f64,
}

// ── Defaults ──

fn default_start_level() -> u32 { 1 }

fn default_nodes_min() -> usize { 5 }
fn default_nodes_max() -> usize { 15 }
fn default_map_width() -> f64 { 1200.0 }
fn default_map_height() -> f64 { 800.0 }
fn default_radius_start() -> f64 { 150.0 }
fn default_radius_step() -> f64 { 30.0 }
fn default_node_difficulty_min() -> f64 { 0.8 }
fn default_node_difficulty_max() -> f64 { 1.5 }

fn default_timeout() -> f64 { 30.0 }
fn default_max_hints() -> u32 { 2 }
fn default_max_attempts() -> u32 { 3 }
fn default_reveal_interval() -> f64 { 1.0 }
fn default_progressions() -> Vec<ProgressionKind> {
    vec![ProgressionKind::Arithmetic, ProgressionKind::Geometric, ProgressionKind::Fibonacci]
}

fn default_palace_capacity() -> usize { 3 }
fn default_palace_cooldown() -> f64 { 10.0 }
fn default_vision_cooldown() -> f64 { 15.0 }
fn default_vision_duration() -> f64 { 5.0 }
fn default_vision_multiplier() -> f64 { 2.0 }
fn default_focus_cooldown() -> f64 { 20.0 }
fn default_focus_duration() -> f64 { 3.0 }
fn default_focus_multiplier() -> f64 { 1.5 }
fn default_vision_unlock() -> u32 { 5 }
fn default_focus_unlock() -> u32 { 10 }

fn default_activation_interval() -> f64 { 30.0 }
fn default_oblivion_probability() -> f64 { 0.3 }
fn default_noise_probability() -> f64 { 0.4 }
fn default_repetition_probability() -> f64 { 0.2 } // sums to 0.9 with the others
fn default_oblivion_duration() -> f64 { 8.0 }
fn default_noise_duration() -> f64 { 6.0 }
fn default_repetition_max_attempts() -> u32 { 3 }

fn default_strong_bonus() -> f64 { 0.3 }
fn default_weak_penalty() -> f64 { 0.2 }
fn default_progression_step() -> f64 { 0.05 }
fn default_adaptive_min() -> f64 { 0.5 }
fn default_adaptive_max() -> f64 { 3.0 }

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig { seed: None, start_level: default_start_level() }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            nodes_min: default_nodes_min(),
            nodes_max: default_nodes_max(),
            width: default_map_width(),
            height: default_map_height(),
            spiral_radius_start: default_radius_start(),
            spiral_radius_step: default_radius_step(),
            difficulty_min: default_node_difficulty_min(),
            difficulty_max: default_node_difficulty_max(),
        }
    }
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        PuzzleConfig {
            timeout_secs: default_timeout(),
            max_hints: default_max_hints(),
            max_attempts: default_max_attempts(),
            reveal_interval_secs: default_reveal_interval(),
            progressions: default_progressions(),
        }
    }
}

impl Default for AbilityConfig {
    fn default() -> Self {
        AbilityConfig {
            palace_capacity: default_palace_capacity(),
            palace_cooldown: default_palace_cooldown(),
            vision_cooldown: default_vision_cooldown(),
            vision_duration: default_vision_duration(),
            vision_multiplier: default_vision_multiplier(),
            focus_cooldown: default_focus_cooldown(),
            focus_duration: default_focus_duration(),
            focus_time_multiplier: default_focus_multiplier(),
            vision_unlock_at: default_vision_unlock(),
            focus_unlock_at: default_focus_unlock(),
        }
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        AnomalyConfig {
            min_activation_interval: default_activation_interval(),
            oblivion_probability: default_oblivion_probability(),
            noise_probability: default_noise_probability(),
            repetition_probability: default_repetition_probability(),
            oblivion_duration: default_oblivion_duration(),
            noise_duration: default_noise_duration(),
            repetition_max_attempts: default_repetition_max_attempts(),
        }
    }
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        AdaptiveConfig {
            strong_bonus: default_strong_bonus(),
            weak_penalty: default_weak_penalty(),
            progression_step: default_progression_step(),
            min: default_adaptive_min(),
            max: default_adaptive_max(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: exe directory, current working directory, XDG data, system data.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        load_toml(&candidate_dirs())
    }

    /// Strict parse: a malformed document is an error instead of a fallback.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CoreError::Config(e.to_string()))
    }
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/mnemocodex");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    let sys = PathBuf::from("/usr/share/mnemocodex");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> GameConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match GameConfig::from_toml_str(&text) {
                    Ok(cfg) => {
                        debug!(path = %path.display(), "loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        warn!(path = %path.display(), "{e}; using default settings");
                        return GameConfig::default();
                    }
                },
                Err(e) => {
                    warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    GameConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.map.nodes_min, 5);
        assert_eq!(cfg.map.nodes_max, 15);
        assert_eq!(cfg.puzzle.timeout_secs, 30.0);
        assert_eq!(cfg.puzzle.max_hints, 2);
        assert_eq!(cfg.abilities.palace_capacity, 3);
        assert_eq!(cfg.anomalies.min_activation_interval, 30.0);
        assert_eq!(cfg.adaptive.max, 3.0);
        assert_eq!(cfg.general.seed, None);
        assert_eq!(cfg.puzzle.progressions.len(), 3);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[puzzle]\ntimeout_secs = 45.0\nprogressions = [\"prime\"]\n\n[general]\nseed = 7\n",
        )
        .unwrap();
        assert_eq!(cfg.puzzle.timeout_secs, 45.0);
        assert_eq!(cfg.puzzle.max_hints, 2);
        assert_eq!(cfg.puzzle.progressions, vec![ProgressionKind::Prime]);
        assert_eq!(cfg.general.seed, Some(7));
        assert_eq!(cfg.general.start_level, 1);
    }

    #[test]
    fn malformed_document_is_config_error() {
        let err = GameConfig::from_toml_str("[map\nnodes_min = ").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn unknown_progression_is_rejected() {
        let err = GameConfig::from_toml_str("[puzzle]\nprogressions = [\"squares\"]\n");
        assert!(err.is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_toml(&[PathBuf::from("/nonexistent/mnemocodex")]);
        assert_eq!(cfg.map.nodes_max, 15);
    }
}
