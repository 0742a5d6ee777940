//! Combat system module
//!
//! Provides melee resolution against body-part trees, and reporting.

pub mod damage;
pub mod log;
pub mod resolution;

// Re-export commonly used types
pub use damage::{
    armor_value, dismember_chance, dodge_value, penetration_value, roll_damage, roll_penetrations,
    select_hit_location,
};
pub use log::{AttackReport, SwingOutcome, SwingReport};
pub use resolution::{gather_weapons, perform_melee_attack, CombatError, WeaponSlot};
