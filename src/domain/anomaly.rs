/// Memory anomalies: time-boxed global modifiers.
///
/// - Oblivion obscures regions of the board (presentation only).
/// - Noise injects false information and random distractions (presentation only).
/// - Repetition raises the difficulty of the next puzzles until enough
///   attempts have been recorded against it. It has no duration.
///
/// At most one instance per kind is active. A global cooldown separates
/// random activations.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use tracing::{debug, info};

use crate::config::AnomalyConfig;
use crate::domain::clock::Clock;
use crate::error::{CoreError, Result};

const FALSE_INFORMATION: [&str; 6] = [
    "Wrong symbol: ▲",
    "False number: 42",
    "Misleading pattern: ●■▲",
    "False sequence: 1,2,3,5",
    "Wrong colour: Red",
    "False direction: Left",
];

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum AnomalyKind {
    Oblivion,
    Noise,
    Repetition,
}

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 3] = [AnomalyKind::Oblivion, AnomalyKind::Noise, AnomalyKind::Repetition];

    pub fn tag(self) -> &'static str {
        match self {
            AnomalyKind::Oblivion => "oblivion",
            AnomalyKind::Noise => "noise",
            AnomalyKind::Repetition => "repetition",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AnomalyKind::Oblivion => "The Oblivion",
            AnomalyKind::Noise => "The Noise",
            AnomalyKind::Repetition => "The Repetition",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AnomalyKind::Oblivion => "Darkens parts of the board for a while",
            AnomalyKind::Noise => "Introduces false or distracting information",
            AnomalyKind::Repetition => "Forces harder versions of the next puzzles",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for AnomalyKind {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AnomalyKind::ALL
            .into_iter()
            .find(|k| k.tag() == s)
            .ok_or_else(|| CoreError::UnknownAnomaly(s.to_string()))
    }
}

/// Tags and difficulty bonus to attach to a freshly built puzzle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DifficultyModifiers {
    pub tags: Vec<AnomalyKind>,
    pub bonus: f64,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ObscuredRegion {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    pub opacity: f64,
}

/// Kind-specific payload generated at activation.
#[derive(Clone, PartialEq, Debug)]
pub enum AnomalyEffect {
    Oblivion { regions: Vec<ObscuredRegion> },
    Noise { false_information: Vec<String>, distraction_level: f64 },
    Repetition { difficulty_modifier: f64, attempts: u32, max_attempts: u32 },
}

#[derive(Clone, Debug)]
pub struct MemoryAnomaly {
    kind: AnomalyKind,
    duration: f64,
    active: bool,
    start_time: f64,
    intensity: f64,
    effect: AnomalyEffect,
}

impl MemoryAnomaly {
    /// Fresh, active instance of `kind`.
    pub fn activate(
        kind: AnomalyKind,
        intensity: f64,
        now: f64,
        config: &AnomalyConfig,
        rng: &mut dyn RngCore,
    ) -> Self {
        let (duration, effect) = match kind {
            AnomalyKind::Oblivion => {
                let count = (2.0 + intensity * 3.0) as usize;
                let regions = (0..count)
                    .map(|_| ObscuredRegion {
                        x: rng.gen_range(100..=1100),
                        y: rng.gen_range(100..=700),
                        radius: rng.gen_range(50..=150),
                        opacity: 0.7 + intensity * 0.3,
                    })
                    .collect();
                (config.oblivion_duration, AnomalyEffect::Oblivion { regions })
            }
            AnomalyKind::Noise => {
                let count = ((1.0 + intensity * 2.0) as usize).min(FALSE_INFORMATION.len());
                let false_information = FALSE_INFORMATION
                    .choose_multiple(&mut *rng, count)
                    .map(|s| s.to_string())
                    .collect();
                (
                    config.noise_duration,
                    AnomalyEffect::Noise { false_information, distraction_level: intensity },
                )
            }
            AnomalyKind::Repetition => (
                0.0,
                AnomalyEffect::Repetition {
                    difficulty_modifier: intensity * 0.5,
                    attempts: 0,
                    max_attempts: config.repetition_max_attempts,
                },
            ),
        };
        MemoryAnomaly { kind, duration, active: true, start_time: now, intensity, effect }
    }

    pub fn kind(&self) -> AnomalyKind {
        self.kind
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn effect(&self) -> &AnomalyEffect {
        &self.effect
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Zero duration never expires.
    pub fn is_expired(&self, now: f64) -> bool {
        self.active && self.duration > 0.0 && now - self.start_time >= self.duration
    }

    /// Seconds left, or None for indefinite anomalies.
    pub fn remaining(&self, now: f64) -> Option<f64> {
        (self.duration > 0.0).then(|| (self.duration - (now - self.start_time)).max(0.0))
    }

    pub fn update(&mut self, now: f64) {
        if self.is_expired(now) {
            self.deactivate();
        }
    }

    pub fn difficulty_modifier(&self) -> f64 {
        match self.effect {
            AnomalyEffect::Repetition { difficulty_modifier, .. } if self.active => difficulty_modifier,
            _ => 0.0,
        }
    }

    pub fn increment_attempts(&mut self) {
        if let AnomalyEffect::Repetition { attempts, .. } = &mut self.effect {
            *attempts += 1;
        }
    }

    pub fn should_deactivate(&self) -> bool {
        match self.effect {
            AnomalyEffect::Repetition { attempts, max_attempts, .. } => attempts >= max_attempts,
            _ => false,
        }
    }

    /// Re-rolled on every call.
    pub fn should_show_distraction(&self, rng: &mut dyn RngCore) -> bool {
        match self.effect {
            AnomalyEffect::Noise { distraction_level, .. } if self.active => {
                rng.gen::<f64>() < distraction_level * 0.3
            }
            _ => false,
        }
    }
}

/// Aggregated view of everything currently perturbing play.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnomalyEffects {
    pub obscured_regions: Vec<ObscuredRegion>,
    pub false_information: Vec<String>,
    pub show_distraction: bool,
    pub difficulty_modifier: f64,
}

pub struct AnomalyManager {
    clock: Rc<dyn Clock>,
    config: AnomalyConfig,
    active: BTreeMap<AnomalyKind, MemoryAnomaly>,
    last_activation: Option<f64>,
}

impl AnomalyManager {
    pub fn new(clock: Rc<dyn Clock>, config: AnomalyConfig) -> Self {
        AnomalyManager { clock, config, active: BTreeMap::new(), last_activation: None }
    }

    pub fn can_activate(&self) -> bool {
        match self.last_activation {
            None => true,
            Some(t) => self.clock.now() - t >= self.config.min_activation_interval,
        }
    }

    /// Cumulative-weight draw. The weights need not sum to 1; the remainder
    /// is a "nothing happens" outcome.
    pub fn select_kind(&self, rng: &mut dyn RngCore) -> Option<AnomalyKind> {
        let weights = [
            (AnomalyKind::Oblivion, self.config.oblivion_probability),
            (AnomalyKind::Noise, self.config.noise_probability),
            (AnomalyKind::Repetition, self.config.repetition_probability),
        ];
        let roll = rng.gen::<f64>();
        let mut cumulative = 0.0;
        for (kind, p) in weights {
            cumulative += p;
            if roll <= cumulative {
                return Some(kind);
            }
        }
        None
    }

    /// Random activation gated by the global cooldown. Replaces an active
    /// instance of the drawn kind.
    pub fn try_activate(&mut self, difficulty: f64, rng: &mut dyn RngCore) -> Option<AnomalyKind> {
        if !self.can_activate() {
            return None;
        }
        let kind = self.select_kind(rng)?;
        let intensity = (difficulty * 0.5 + rng.gen_range(0.5..=1.0)).min(2.0);
        let now = self.clock.now();
        let anomaly = MemoryAnomaly::activate(kind, intensity, now, &self.config, rng);
        self.active.insert(kind, anomaly);
        self.last_activation = Some(now);
        info!(%kind, intensity, "anomaly activated");
        Some(kind)
    }

    /// Explicit activation. Rejected when that kind is already active.
    /// Does not touch the cooldown.
    pub fn activate_specific(&mut self, kind: AnomalyKind, intensity: f64, rng: &mut dyn RngCore) -> bool {
        if self.active.contains_key(&kind) {
            return false;
        }
        let anomaly = MemoryAnomaly::activate(kind, intensity, self.clock.now(), &self.config, rng);
        self.active.insert(kind, anomaly);
        info!(%kind, intensity, "anomaly forced");
        true
    }

    pub fn activate_by_tag(&mut self, tag: &str, intensity: f64, rng: &mut dyn RngCore) -> Result<bool> {
        let kind = tag.parse::<AnomalyKind>()?;
        Ok(self.activate_specific(kind, intensity, rng))
    }

    pub fn deactivate(&mut self, kind: AnomalyKind) {
        if let Some(mut anomaly) = self.active.remove(&kind) {
            anomaly.deactivate();
            debug!(%kind, "anomaly deactivated");
        }
    }

    /// Expire timed anomalies and purge inactive ones. Returns what was removed.
    pub fn update(&mut self, _dt: f64) -> Vec<AnomalyKind> {
        let now = self.clock.now();
        let mut removed = Vec::new();
        for (kind, anomaly) in self.active.iter_mut() {
            anomaly.update(now);
            if !anomaly.is_active() {
                removed.push(*kind);
            }
        }
        for kind in &removed {
            self.active.remove(kind);
            info!(%kind, "anomaly expired");
        }
        removed
    }

    pub fn has_anomaly(&self, kind: AnomalyKind) -> bool {
        self.active.get(&kind).is_some_and(MemoryAnomaly::is_active)
    }

    pub fn active_kinds(&self) -> Vec<AnomalyKind> {
        self.active.values().filter(|a| a.is_active()).map(MemoryAnomaly::kind).collect()
    }

    /// Seconds left on an active anomaly; `Some(None)` for one without a time limit.
    pub fn remaining(&self, kind: AnomalyKind) -> Option<Option<f64>> {
        self.active.get(&kind).map(|a| a.remaining(self.clock.now()))
    }

    pub fn get(&self, kind: AnomalyKind) -> Option<&MemoryAnomaly> {
        self.active.get(&kind)
    }

    /// What a new puzzle inherits: every active tag plus the repetition bonus.
    pub fn modifiers(&self) -> DifficultyModifiers {
        DifficultyModifiers {
            tags: self.active_kinds(),
            bonus: self.active.values().map(MemoryAnomaly::difficulty_modifier).sum(),
        }
    }

    pub fn effects(&self, rng: &mut dyn RngCore) -> AnomalyEffects {
        let mut out = AnomalyEffects::default();
        for anomaly in self.active.values().filter(|a| a.is_active()) {
            match &anomaly.effect {
                AnomalyEffect::Oblivion { regions } => out.obscured_regions = regions.clone(),
                AnomalyEffect::Noise { false_information, .. } => {
                    out.false_information = false_information.clone();
                    out.show_distraction = anomaly.should_show_distraction(rng);
                }
                AnomalyEffect::Repetition { difficulty_modifier, .. } => {
                    out.difficulty_modifier = *difficulty_modifier;
                }
            }
        }
        out
    }

    /// Count one finished puzzle against an active repetition anomaly.
    /// Returns true when that exhausted it.
    pub fn record_repetition_attempt(&mut self) -> bool {
        let Some(anomaly) = self.active.get_mut(&AnomalyKind::Repetition) else {
            return false;
        };
        anomaly.increment_attempts();
        if anomaly.should_deactivate() {
            self.deactivate(AnomalyKind::Repetition);
            return true;
        }
        false
    }
}
