//! Combat reports
//!
//! Records what each swing of an attack did, for callers that want more
//! than the message log (the CLI prints them as JSON).

use serde::Serialize;

use crate::body::BodyPartId;
use crate::entity::CreatureId;

/// How a single swing ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SwingOutcome {
    Miss,
    /// Hit, but no penetration roll beat the armor
    Deflected,
    /// Penetrated, but the damage dice came up zero
    NoDamage,
    Damaged,
}

impl SwingOutcome {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Miss => "miss",
            Self::Deflected => "deflected",
            Self::NoDamage => "no damage",
            Self::Damaged => "damaged",
        }
    }
}

/// One weapon's swing within an attack
#[derive(Clone, Debug, Serialize)]
pub struct SwingReport {
    pub weapon: String,
    pub primary: bool,
    /// Natural d20
    pub natural_roll: i32,
    pub hit_total: i32,
    pub dodge_value: i32,
    pub outcome: SwingOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<BodyPartId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    pub penetrations: u32,
    pub damage: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismembered: Option<BodyPartId>,
    pub killed: bool,
}

impl SwingReport {
    pub(crate) fn new(weapon: &str, primary: bool) -> Self {
        Self {
            weapon: weapon.to_string(),
            primary,
            natural_roll: 0,
            hit_total: 0,
            dodge_value: 0,
            outcome: SwingOutcome::Miss,
            location: None,
            location_name: None,
            penetrations: 0,
            damage: 0,
            dismembered: None,
            killed: false,
        }
    }
}

/// Everything one melee attack did
#[derive(Clone, Debug, Serialize)]
pub struct AttackReport {
    pub attacker: CreatureId,
    pub defender: CreatureId,
    /// A listener vetoed the attack before any swing
    pub cancelled: bool,
    pub swings: Vec<SwingReport>,
}

impl AttackReport {
    pub fn new(attacker: CreatureId, defender: CreatureId) -> Self {
        Self {
            attacker,
            defender,
            cancelled: false,
            swings: Vec::new(),
        }
    }

    pub fn total_damage(&self) -> i32 {
        self.swings.iter().map(|s| s.damage).sum()
    }

    pub fn killed(&self) -> bool {
        self.swings.iter().any(|s| s.killed)
    }

    pub fn hits(&self) -> usize {
        self.swings
            .iter()
            .filter(|s| s.outcome != SwingOutcome::Miss)
            .count()
    }

    /// One line summarising the attack
    pub fn short_description(&self) -> String {
        if self.cancelled {
            return format!("{} -> {}: cancelled", self.attacker, self.defender);
        }
        let outcomes: Vec<&str> = self.swings.iter().map(|s| s.outcome.display_name()).collect();
        format!(
            "{} -> {}: {} ({} damage)",
            self.attacker,
            self.defender,
            outcomes.join(", "),
            self.total_damage()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_totals() {
        let mut report = AttackReport::new(CreatureId(1), CreatureId(2));
        let mut swing = SwingReport::new("long sword", true);
        swing.outcome = SwingOutcome::Damaged;
        swing.damage = 7;
        report.swings.push(swing);
        report.swings.push(SwingReport::new("fist", false));

        assert_eq!(report.total_damage(), 7);
        assert_eq!(report.hits(), 1);
        assert!(!report.killed());
        assert_eq!(
            report.short_description(),
            "Creature#1 -> Creature#2: damaged, miss (7 damage)"
        );
    }

    #[test]
    fn test_report_serializes_without_empty_fields() {
        let report = AttackReport {
            swings: vec![SwingReport::new("fist", true)],
            ..AttackReport::new(CreatureId(1), CreatureId(2))
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"outcome\":\"Miss\""));
        assert!(!json.contains("location"));
    }
}
