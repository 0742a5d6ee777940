//! Creature statistics
//!
//! A stat is a base score adjusted by bonus, penalty and boost, clamped to
//! [min, max]. Hit points store damage taken as penalty so the base is the
//! maximum.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Statistics every creature carries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    Strength,
    Agility,
    Toughness,
    Hitpoints,
    Speed,
}

impl StatKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Strength => "strength",
            Self::Agility => "agility",
            Self::Toughness => "toughness",
            Self::Hitpoints => "hit points",
            Self::Speed => "speed",
        }
    }
}

/// Attribute modifier: floor((score - 16) / 2)
pub fn stat_modifier(score: i32) -> i32 {
    (score - 16).div_euclid(2)
}

/// A single statistic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub base: i32,
    pub bonus: i32,
    pub penalty: i32,
    pub boost: i32,
    pub min: i32,
    pub max: i32,
}

impl Stat {
    pub fn new(base: i32) -> Self {
        Self {
            base,
            bonus: 0,
            penalty: 0,
            boost: 0,
            min: 0,
            max: i32::MAX,
        }
    }

    pub fn with_bounds(mut self, min: i32, max: i32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn value(&self) -> i32 {
        (self.base + self.bonus + self.boost - self.penalty).clamp(self.min, self.max)
    }

    pub fn modifier(&self) -> i32 {
        stat_modifier(self.value())
    }
}

/// The full stat block of a creature
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    stats: HashMap<StatKind, Stat>,
}

impl Stats {
    /// Build a stat block with the given attributes and hit points
    pub fn new(strength: i32, agility: i32, toughness: i32, hitpoints: i32) -> Self {
        let mut stats = Self::default();
        stats.set(StatKind::Strength, Stat::new(strength));
        stats.set(StatKind::Agility, Stat::new(agility));
        stats.set(StatKind::Toughness, Stat::new(toughness));
        stats.set(StatKind::Hitpoints, Stat::new(hitpoints));
        stats.set(StatKind::Speed, Stat::new(100));
        stats
    }

    /// Average human attributes
    pub fn average() -> Self {
        Self::new(16, 16, 16, 20)
    }

    pub fn set(&mut self, kind: StatKind, stat: Stat) {
        self.stats.insert(kind, stat);
    }

    pub fn get(&self, kind: StatKind) -> Option<&Stat> {
        self.stats.get(&kind)
    }

    pub fn get_mut(&mut self, kind: StatKind) -> Option<&mut Stat> {
        self.stats.get_mut(&kind)
    }

    /// Current value, 0 for a stat the creature lacks
    pub fn value(&self, kind: StatKind) -> i32 {
        self.get(kind).map(Stat::value).unwrap_or(0)
    }

    pub fn modifier(&self, kind: StatKind) -> i32 {
        stat_modifier(self.value(kind))
    }

    pub fn hitpoints(&self) -> i32 {
        self.value(StatKind::Hitpoints)
    }

    pub fn max_hitpoints(&self) -> i32 {
        self.get(StatKind::Hitpoints).map(|s| s.base).unwrap_or(0)
    }

    /// Record damage taken. Negative amounts are ignored.
    pub fn take_damage(&mut self, amount: i32) {
        if let Some(hp) = self.get_mut(StatKind::Hitpoints) {
            hp.penalty += amount.max(0);
        }
    }

    pub fn heal(&mut self, amount: i32) {
        if let Some(hp) = self.get_mut(StatKind::Hitpoints) {
            hp.penalty = (hp.penalty - amount.max(0)).max(0);
        }
    }
}
