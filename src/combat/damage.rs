//! Damage calculation
//!
//! Penetration, armor and dodge values, hit-location selection and the
//! dismemberment chance for a damaging blow.

use rand::Rng;

use crate::body::{Body, BodyPartId};
use crate::dice::{roll_die, DiceExpr};
use crate::entity::{Creature, ItemStore, MeleeWeapon, StatKind, Stats};
use crate::params::CombatParams;

/// Penetration rolls made per set
pub const ROLLS_PER_SET: u32 = 3;

/// Count penetrations of `pv` against `av`.
///
/// Each set rolls 1d8+PV three times; every roll above AV is one
/// penetration. A set where all three get through earns another set at a
/// lower PV, until a set fails or AV can no longer be beaten.
pub fn roll_penetrations<R: Rng>(pv: i32, av: i32, falloff: i32, rng: &mut R) -> u32 {
    let falloff = falloff.max(1);
    let mut pv = pv;
    let mut penetrations = 0;
    loop {
        let successes = (0..ROLLS_PER_SET)
            .filter(|_| roll_die(&mut *rng, 8) + pv > av)
            .count() as u32;
        penetrations += successes;
        if successes < ROLLS_PER_SET {
            break;
        }
        pv -= falloff;
        if pv + 8 <= av {
            break;
        }
    }
    penetrations
}

/// Roll the weapon's damage once per penetration
pub fn roll_damage<R: Rng>(dice: &DiceExpr, penetrations: u32, rng: &mut R) -> i32 {
    (0..penetrations).map(|_| dice.roll(&mut *rng)).sum()
}

/// Attacker's penetration value with a weapon
pub fn penetration_value(stats: &Stats, weapon: &MeleeWeapon) -> i32 {
    let modifier = stats.modifier(weapon.stat);
    let capped = if weapon.max_strength_bonus >= 0 {
        modifier.min(weapon.max_strength_bonus)
    } else {
        modifier
    };
    capped + weapon.penetration_bonus
}

/// Armor value from worn armor plus any natural armor
pub fn armor_value(creature: &Creature, items: &ItemStore) -> i32 {
    let mut av = creature.natural_armor.map_or(0, |a| a.av);
    creature.body.for_each_equipped(|_, item| {
        if let Some(armor) = items.get(item).and_then(|i| i.armor) {
            av += armor.av;
        }
    });
    av
}

/// Dodge value: the base, worn armor and agility
pub fn dodge_value(creature: &Creature, items: &ItemStore, params: &CombatParams) -> i32 {
    let mut dv = params.base_dodge_value + creature.natural_armor.map_or(0, |a| a.dv);
    creature.body.for_each_equipped(|_, item| {
        if let Some(armor) = items.get(item).and_then(|i| i.armor) {
            dv += armor.dv;
        }
    });
    dv + creature.stats.modifier(StatKind::Agility)
}

/// Pick an attached, non-abstract part weighted by its target weight
pub fn select_hit_location<R: Rng>(body: &Body, rng: &mut R) -> Option<BodyPartId> {
    let targetable: Vec<_> = body
        .attached_parts()
        .filter(|p| !p.is_abstract() && p.target_weight > 0)
        .collect();
    let total_weight: i32 = targetable.iter().map(|p| p.target_weight).sum();
    if total_weight <= 0 {
        return None;
    }

    let mut roll = rng.gen_range(0..total_weight);
    for part in &targetable {
        if roll < part.target_weight {
            return Some(part.id);
        }
        roll -= part.target_weight;
    }
    targetable.last().map(|p| p.id)
}

/// Percent chance that a blow severs the part it struck.
///
/// Only damage above a fraction of maximum hit points counts; mortal parts
/// need twice the excess of other parts.
pub fn dismember_chance(damage: i32, max_hitpoints: i32, mortal: bool, params: &CombatParams) -> i32 {
    let fraction = if mortal {
        params.mortal_dismember_threshold
    } else {
        params.dismember_threshold
    };
    let threshold = max_hitpoints as f32 * fraction;
    if max_hitpoints <= 0 || threshold <= 0.0 || damage as f32 <= threshold {
        return 0;
    }
    let excess_ratio = (damage as f32 - threshold) / threshold;
    let chance = params.dismember_base_chance + (excess_ratio * params.dismember_ratio_scale).floor() as i32;
    chance.min(params.dismember_max_chance)
}
