/// Cognitive abilities: player-triggered, cooldown-gated temporary effects.
///
/// Each ability is a small state machine:
///   ready ──activate──▶ active ──duration──▶ cooling down ──cooldown──▶ ready
///
/// Using an ability requires it to be unlocked and off cooldown. The
/// unlocked set only grows.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use tracing::{debug, info};

use crate::config::AbilityConfig;
use crate::domain::clock::Clock;
use crate::error::{CoreError, Result};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum AbilityKind {
    MentalPalace,
    PeripheralVision,
    Focus,
}

impl AbilityKind {
    pub const ALL: [AbilityKind; 3] = [AbilityKind::MentalPalace, AbilityKind::PeripheralVision, AbilityKind::Focus];

    pub fn tag(self) -> &'static str {
        match self {
            AbilityKind::MentalPalace => "mental_palace",
            AbilityKind::PeripheralVision => "peripheral_vision",
            AbilityKind::Focus => "focus",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AbilityKind::MentalPalace => "Mental Palace",
            AbilityKind::PeripheralVision => "Peripheral Vision",
            AbilityKind::Focus => "Focus",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AbilityKind::MentalPalace => "Stores information temporarily",
            AbilityKind::PeripheralVision => "Briefly widens the field of view",
            AbilityKind::Focus => "Stretches the puzzle countdown for a few seconds",
        }
    }
}

impl fmt::Display for AbilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for AbilityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AbilityKind::ALL
            .into_iter()
            .find(|k| k.tag() == s)
            .ok_or_else(|| CoreError::UnknownAbility(s.to_string()))
    }
}

#[derive(Clone, Debug)]
pub struct CognitiveAbility {
    kind: AbilityKind,
    cooldown: f64,
    duration: f64,
    active: bool,
    start_time: f64,
    last_used: Option<f64>,
}

impl CognitiveAbility {
    pub fn new(kind: AbilityKind, cooldown: f64, duration: f64) -> Self {
        CognitiveAbility { kind, cooldown, duration, active: false, start_time: 0.0, last_used: None }
    }

    pub fn kind(&self) -> AbilityKind {
        self.kind
    }

    pub fn cooldown(&self) -> f64 {
        self.cooldown
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn can_use(&self, now: f64) -> bool {
        match self.last_used {
            None => true,
            Some(t) => now - t >= self.cooldown,
        }
    }

    /// Seconds until usable again (0 when ready).
    pub fn cooldown_remaining(&self, now: f64) -> f64 {
        match self.last_used {
            None => 0.0,
            Some(t) => (self.cooldown - (now - t)).max(0.0),
        }
    }

    /// False while cooling down.
    pub fn activate(&mut self, now: f64) -> bool {
        if !self.can_use(now) {
            return false;
        }
        self.active = true;
        self.start_time = now;
        self.last_used = Some(now);
        true
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_expired(&self, now: f64) -> bool {
        self.active && now - self.start_time >= self.duration
    }

    pub fn update(&mut self, now: f64) {
        if self.is_expired(now) {
            self.deactivate();
        }
    }
}

/// Bounded key → value scratch store of the mental palace.
#[derive(Clone, Debug, Default)]
pub struct MentalPalace {
    capacity: usize,
    items: BTreeMap<String, String>,
}

impl MentalPalace {
    pub fn new(capacity: usize) -> Self {
        MentalPalace { capacity, items: BTreeMap::new() }
    }

    /// Rejected once full, even when overwriting an existing key.
    pub fn store(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        if self.items.len() >= self.capacity {
            return false;
        }
        self.items.insert(key.into(), value.into());
        true
    }

    /// Removes and returns the item.
    pub fn retrieve(&mut self, key: &str) -> Option<String> {
        self.items.remove(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

pub struct CognitiveAbilityManager {
    clock: Rc<dyn Clock>,
    abilities: BTreeMap<AbilityKind, CognitiveAbility>,
    unlocked: BTreeSet<AbilityKind>,
    palace: MentalPalace,
    vision_multiplier: f64,
    focus_time_multiplier: f64,
}

impl CognitiveAbilityManager {
    /// All three abilities exist from the start; only the mental palace is unlocked.
    pub fn new(clock: Rc<dyn Clock>, config: &AbilityConfig) -> Self {
        let abilities = [
            CognitiveAbility::new(AbilityKind::MentalPalace, config.palace_cooldown, 0.0),
            CognitiveAbility::new(AbilityKind::PeripheralVision, config.vision_cooldown, config.vision_duration),
            CognitiveAbility::new(AbilityKind::Focus, config.focus_cooldown, config.focus_duration),
        ]
        .into_iter()
        .map(|a| (a.kind(), a))
        .collect();

        CognitiveAbilityManager {
            clock,
            abilities,
            unlocked: BTreeSet::from([AbilityKind::MentalPalace]),
            palace: MentalPalace::new(config.palace_capacity),
            vision_multiplier: config.vision_multiplier,
            focus_time_multiplier: config.focus_time_multiplier,
        }
    }

    /// True only when newly unlocked.
    pub fn unlock(&mut self, kind: AbilityKind) -> bool {
        let added = self.unlocked.insert(kind);
        if added {
            info!(ability = %kind, "ability unlocked");
        }
        added
    }

    pub fn is_unlocked(&self, kind: AbilityKind) -> bool {
        self.unlocked.contains(&kind)
    }

    pub fn unlocked(&self) -> impl Iterator<Item = AbilityKind> + '_ {
        self.unlocked.iter().copied()
    }

    /// Needs unlocked + off cooldown.
    pub fn use_ability(&mut self, kind: AbilityKind) -> bool {
        if !self.unlocked.contains(&kind) {
            return false;
        }
        let now = self.clock.now();
        let used = self.abilities.get_mut(&kind).is_some_and(|a| a.activate(now));
        if used {
            debug!(ability = %kind, "ability activated");
        }
        used
    }

    pub fn use_by_tag(&mut self, tag: &str) -> Result<bool> {
        let kind = tag.parse::<AbilityKind>()?;
        Ok(self.use_ability(kind))
    }

    pub fn get(&self, kind: AbilityKind) -> Option<&CognitiveAbility> {
        self.abilities.get(&kind)
    }

    pub fn update(&mut self, _dt: f64) {
        let now = self.clock.now();
        for ability in self.abilities.values_mut() {
            ability.update(now);
        }
    }

    pub fn is_active(&self, kind: AbilityKind) -> bool {
        self.abilities.get(&kind).is_some_and(CognitiveAbility::is_active)
    }

    pub fn active_abilities(&self) -> Vec<AbilityKind> {
        self.abilities.values().filter(|a| a.is_active()).map(CognitiveAbility::kind).collect()
    }

    /// Unlocked and off cooldown.
    pub fn available_abilities(&self) -> Vec<AbilityKind> {
        let now = self.clock.now();
        self.abilities
            .values()
            .filter(|a| self.unlocked.contains(&a.kind()) && a.can_use(now))
            .map(CognitiveAbility::kind)
            .collect()
    }

    pub fn cooldown_remaining(&self, kind: AbilityKind) -> f64 {
        let now = self.clock.now();
        self.abilities.get(&kind).map_or(0.0, |a| a.cooldown_remaining(now))
    }

    pub fn palace(&self) -> &MentalPalace {
        &self.palace
    }

    pub fn palace_mut(&mut self) -> &mut MentalPalace {
        &mut self.palace
    }

    /// View widening factor while peripheral vision is active, else 1.
    pub fn vision_multiplier(&self) -> f64 {
        if self.is_active(AbilityKind::PeripheralVision) {
            self.vision_multiplier
        } else {
            1.0
        }
    }

    pub fn focus_time_multiplier(&self) -> f64 {
        self.focus_time_multiplier
    }
}
