//! Tunable parameters for body maintenance and melee combat

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dice::DiceExpr;

/// Errors raised while loading parameters
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("failed to read params file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse params file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration for combat resolution and body maintenance
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatParams {
    // Mobility
    /// Speed penalty applied when every mobility-bearing part is lost
    pub max_mobility_penalty: i32,

    // To-hit
    /// Dodge value before armor and agility
    pub base_dodge_value: i32,
    /// Added to the hit roll of every weapon except the primary
    pub off_hand_hit_penalty: i32,

    // Penetration
    /// PV reduction applied before each follow-up set after a clean sweep
    pub penetration_falloff: i32,

    // Dismemberment
    /// Fraction of max HP a hit must exceed before a limb can be severed
    pub dismember_threshold: f32,
    /// Same threshold for parts whose loss is fatal
    pub mortal_dismember_threshold: f32,
    /// Chance (percent) once the threshold is exceeded
    pub dismember_base_chance: i32,
    /// Percent added per whole threshold's worth of excess damage
    pub dismember_ratio_scale: f32,
    /// Upper bound on the severing chance (percent)
    pub dismember_max_chance: i32,

    // Misc
    /// Damage for the fallback unarmed attack
    pub unarmed_damage: DiceExpr,
    /// Drop a severed-limb item when a part is dismembered
    pub spawn_severed_limbs: bool,
}

impl Default for CombatParams {
    fn default() -> Self {
        Self {
            max_mobility_penalty: 60,
            base_dodge_value: 6,
            off_hand_hit_penalty: -2,
            penetration_falloff: 2,
            dismember_threshold: 0.25,
            mortal_dismember_threshold: 0.5,
            dismember_base_chance: 5,
            dismember_ratio_scale: 50.0,
            dismember_max_chance: 50,
            unarmed_damage: DiceExpr::new(1, 2, 0),
            spawn_severed_limbs: true,
        }
    }
}

impl CombatParams {
    /// Load parameters from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, ParamsError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ParamsError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let params = CombatParams::from_json_str(r#"{ "max_mobility_penalty": 30 }"#).unwrap();
        assert_eq!(params.max_mobility_penalty, 30);
        assert_eq!(params.base_dodge_value, 6);
        assert_eq!(params.unarmed_damage, DiceExpr::new(1, 2, 0));
    }

    #[test]
    fn test_bad_dice_rejected() {
        let result = CombatParams::from_json_str(r#"{ "unarmed_damage": "1d0" }"#);
        assert!(matches!(result, Err(ParamsError::Json(_))));
    }
}
