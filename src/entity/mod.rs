//! Entity substrate: stats, items and creatures

pub mod creature;
pub mod item;
pub mod stats;

pub use creature::{Creature, CreatureId};
pub use item::{
    item_blueprint, ArmorStats, Item, ItemId, ItemStore, MeleeWeapon, SlotRequirement,
    ITEM_BLUEPRINTS, SEVERED_LIMB,
};
pub use stats::{stat_modifier, Stat, StatKind, Stats};
