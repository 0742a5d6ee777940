//! Anatomical combat library
//!
//! Body-part trees, equipment planning and melee resolution for roguelike
//! creatures. Re-exports modules for use by the duel runner and tests.

pub mod body;
pub mod combat;
pub mod dice;
pub mod entity;
pub mod equipment;
pub mod events;
pub mod laterality;
pub mod messages;
pub mod mutations;
pub mod params;
pub mod world;
pub mod zone;

pub use body::{Body, BodyError, BodyPart, BodyPartId, PartFlags, PartTemplate};
pub use combat::{perform_melee_attack, AttackReport, CombatError};
pub use entity::{Creature, CreatureId, Item, ItemId, Stats};
pub use equipment::{equip, unequip, EquipError, EquipPlan};
pub use laterality::Laterality;
pub use params::CombatParams;
pub use world::{World, WorldError};
