//! Creatures: a stat block, a body, and carried items

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::body::Body;
use crate::entity::{ArmorStats, ItemId, Stats};

/// Unique identifier for a creature
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreatureId(pub u64);

impl fmt::Display for CreatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Creature#{}", self.0)
    }
}

/// A creature taking part in combat
#[derive(Clone, Debug)]
pub struct Creature {
    pub id: CreatureId,
    pub name: String,
    pub stats: Stats,
    pub body: Body,
    /// Carried, unequipped items
    pub inventory: Vec<ItemId>,
    /// Armor the creature has without wearing anything (hide, scales)
    pub natural_armor: Option<ArmorStats>,
    pub alive: bool,
}

impl Creature {
    pub fn new(id: CreatureId, name: &str, stats: Stats, body: Body) -> Self {
        Self {
            id,
            name: name.to_string(),
            stats,
            body,
            inventory: Vec::new(),
            natural_armor: None,
            alive: true,
        }
    }

    pub fn with_natural_armor(mut self, armor: ArmorStats) -> Self {
        self.natural_armor = Some(armor);
        self
    }

    pub fn carries(&self, item: ItemId) -> bool {
        self.inventory.contains(&item)
    }

    pub fn take_from_inventory(&mut self, item: ItemId) -> bool {
        let before = self.inventory.len();
        self.inventory.retain(|&i| i != item);
        self.inventory.len() != before
    }
}
