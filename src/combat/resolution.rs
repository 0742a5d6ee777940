//! Combat resolution system
//!
//! A melee attack swings every weapon the attacker can bring to bear,
//! primary first. Each swing rolls to hit against the defender's dodge,
//! rolls penetrations against its armor, deals damage and may sever the
//! part it struck.

use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::body::{BodyPart, BodyPartId, PartFlags};
use crate::dice::roll_die;
use crate::entity::{Creature, CreatureId, ItemId, ItemStore, MeleeWeapon, StatKind};
use crate::events::GameEvent;
use crate::world::{World, WorldError};

use super::damage::{
    armor_value, dismember_chance, dodge_value, penetration_value, roll_damage, roll_penetrations,
    select_hit_location,
};
use super::log::{AttackReport, SwingOutcome, SwingReport};

#[derive(Debug, Error)]
pub enum CombatError {
    #[error("no creature with id {0}")]
    CreatureNotFound(CreatureId),
    #[error("{0} is dead")]
    Dead(CreatureId),
    #[error("a creature cannot attack itself")]
    SelfAttack,
    #[error(transparent)]
    World(#[from] WorldError),
}

/// A weapon an attacker will swing
#[derive(Clone, Debug, Serialize)]
pub struct WeaponSlot {
    /// Part the weapon is wielded with, if any
    pub part: Option<BodyPartId>,
    pub item: Option<ItemId>,
    pub name: String,
    pub weapon: MeleeWeapon,
    pub primary: bool,
}

fn natural_weapon(part: &BodyPart, items: &ItemStore) -> Option<(Option<ItemId>, String, MeleeWeapon)> {
    let id = part.default_behavior?;
    let item = items.get(id)?;
    let weapon = item.weapon.clone()?;
    Some((Some(id), item.name.clone(), weapon))
}

/// Every weapon the creature attacks with, primary first then tree order.
///
/// Hands and primary-capable parts contribute their equipped weapon, or
/// their natural weapon when they hold none. An item spanning several
/// parts is swung once.
pub fn gather_weapons(creature: &Creature, items: &ItemStore) -> Vec<WeaponSlot> {
    let body = &creature.body;
    let primary_part = body.primary_part().or_else(|| {
        body.attached_parts()
            .find(|p| p.has(PartFlags::DEFAULT_PRIMARY))
            .map(|p| p.id)
    });
    let primary_item = primary_part
        .and_then(|id| body.part(id))
        .and_then(|p| p.equipped);

    let mut slots = Vec::new();
    for part in body.attached_parts() {
        if part.is_abstract() {
            continue;
        }
        let wields = part.is_type("Hand")
            || part.flags.intersects(PartFlags::PRIMARY | PartFlags::DEFAULT_PRIMARY);
        if !wields {
            continue;
        }

        let chosen = match part.equipped {
            // already counted at its first slot
            Some(_) if !part.has(PartFlags::FIRST_SLOT_FOR_EQUIPPED) => continue,
            Some(held) => match items.get(held).and_then(|i| i.weapon.clone().map(|w| (i, w))) {
                Some((item, weapon)) => Some((Some(held), item.name.clone(), weapon)),
                None => natural_weapon(part, items),
            },
            None => natural_weapon(part, items),
        };
        let Some((item, name, weapon)) = chosen else {
            continue;
        };
        let primary = Some(part.id) == primary_part
            || (item.is_some() && item == primary_item && part.equipped == item);
        slots.push(WeaponSlot {
            part: Some(part.id),
            item,
            name,
            weapon,
            primary,
        });
    }

    let mut seen_primary = false;
    for slot in &mut slots {
        if slot.primary && seen_primary {
            slot.primary = false;
        }
        seen_primary |= slot.primary;
    }
    if !seen_primary {
        if let Some(first) = slots.first_mut() {
            first.primary = true;
        }
    }
    slots.sort_by_key(|slot| !slot.primary);
    slots
}

fn living<'a>(world: &'a World, id: CreatureId) -> Result<&'a Creature, CombatError> {
    let creature = world
        .creature(id)
        .ok_or(CombatError::CreatureNotFound(id))?;
    if !creature.alive {
        return Err(CombatError::Dead(id));
    }
    Ok(creature)
}

/// Make one melee attack from `attacker` against `defender`
pub fn perform_melee_attack<R: Rng>(
    world: &mut World,
    attacker: CreatureId,
    defender: CreatureId,
    rng: &mut R,
) -> Result<AttackReport, CombatError> {
    if attacker == defender {
        return Err(CombatError::SelfAttack);
    }
    let mut weapons = gather_weapons(living(world, attacker)?, &world.items);
    living(world, defender)?;

    let mut report = AttackReport::new(attacker, defender);
    if !world.events.fire(&GameEvent::BeforeMeleeAttack { attacker, defender }) {
        tracing::debug!(%attacker, %defender, "attack cancelled");
        report.cancelled = true;
        return Ok(report);
    }

    if weapons.is_empty() {
        weapons.push(WeaponSlot {
            part: None,
            item: None,
            name: "fist".to_string(),
            weapon: MeleeWeapon::new(world.params.unarmed_damage.clone()),
            primary: true,
        });
    }

    for slot in &weapons {
        let standing = world
            .creature(defender)
            .map_or(false, |d| d.alive && d.stats.hitpoints() > 0);
        if !standing {
            break;
        }
        let swing = swing_weapon(world, attacker, defender, slot, rng)?;
        report.swings.push(swing);
    }
    Ok(report)
}

fn swing_weapon<R: Rng>(
    world: &mut World,
    attacker: CreatureId,
    defender: CreatureId,
    slot: &WeaponSlot,
    rng: &mut R,
) -> Result<SwingReport, CombatError> {
    let mut swing = SwingReport::new(&slot.name, slot.primary);
    let (attacker_name, agility, pv) = {
        let a = living(world, attacker)?;
        (
            a.name.clone(),
            a.stats.modifier(StatKind::Agility),
            penetration_value(&a.stats, &slot.weapon),
        )
    };
    let (defender_name, dv, av, max_hp) = {
        let d = living(world, defender)?;
        (
            d.name.clone(),
            dodge_value(d, &world.items, &world.params),
            armor_value(d, &world.items),
            d.stats.max_hitpoints(),
        )
    };

    let natural = roll_die(rng, 20);
    let mut total = natural + agility + slot.weapon.hit_bonus;
    if !slot.primary {
        total += world.params.off_hand_hit_penalty;
    }
    swing.natural_roll = natural;
    swing.hit_total = total;
    swing.dodge_value = dv;
    tracing::trace!(%attacker, %defender, weapon = %slot.name, natural, total, dv, "to-hit roll");

    if natural != 20 && total <= dv {
        world.log.log(format!("{} misses {}.", attacker_name, defender_name));
        return Ok(swing);
    }

    let location = {
        let d = living(world, defender)?;
        select_hit_location(&d.body, rng).and_then(|id| {
            d.body
                .part(id)
                .map(|p| (id, p.name.clone(), p.is_severable(), p.is_mortal()))
        })
    };
    if let Some((id, name, _, _)) = &location {
        swing.location = Some(*id);
        swing.location_name = Some(name.clone());
    }
    swing.penetrations = roll_penetrations(pv, av, world.params.penetration_falloff, rng);
    if swing.penetrations == 0 {
        swing.outcome = SwingOutcome::Deflected;
        world.log.log(format!(
            "{}'s {} fails to penetrate {}'s armor.",
            attacker_name, slot.name, defender_name
        ));
        return Ok(swing);
    }

    let damage = roll_damage(&slot.weapon.damage, swing.penetrations, rng);
    if damage <= 0 {
        swing.outcome = SwingOutcome::NoDamage;
        world.log.log(format!(
            "{} hits {} but deals no damage.",
            attacker_name, defender_name
        ));
        return Ok(swing);
    }

    swing.outcome = SwingOutcome::Damaged;
    swing.damage = damage;
    world.log.log(format!(
        "{} hits {} for {} damage!",
        attacker_name, defender_name, damage
    ));
    tracing::debug!(%attacker, %defender, damage, penetrations = swing.penetrations, "hit");

    swing.killed = world.apply_damage(defender, damage, Some(attacker))?;
    if swing.killed {
        return Ok(swing);
    }

    if let Some((part, _, true, mortal)) = location {
        let chance = dismember_chance(damage, max_hp, mortal, &world.params);
        if chance > 0 && rng.gen_range(1..=100) <= chance {
            match world.dismember(defender, part, Some(attacker)) {
                Ok(report) => {
                    swing.dismembered = Some(part);
                    swing.killed = report.mortal;
                }
                Err(WorldError::Body(err)) => {
                    tracing::debug!(%defender, %part, %err, "dismemberment did not happen");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
    Ok(swing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Stats;
    use crate::equipment::equip;
    use crate::events::EventKind;
    use crate::zone::Cell;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn duel(attacker: &str, defender: &str) -> (World, CreatureId, CreatureId) {
        let mut world = World::new(10, 10);
        let a = world
            .spawn_creature("Attacker", attacker, Stats::average(), Some(Cell::new(1, 1)))
            .unwrap();
        let d = world
            .spawn_creature("Defender", defender, Stats::average(), Some(Cell::new(2, 1)))
            .unwrap();
        (world, a, d)
    }

    fn arm_with(world: &mut World, who: CreatureId, blueprint: &str) -> ItemId {
        let item = world.items.spawn_blueprint(blueprint).unwrap();
        world.give_item(who, item).unwrap();
        equip(world, who, item, None).unwrap();
        item
    }

    #[test]
    fn test_unarmed_humanoid_swings_both_fists() {
        let (world, a, _) = duel("humanoid", "humanoid");
        let weapons = gather_weapons(world.creature(a).unwrap(), &world.items);
        assert_eq!(weapons.len(), 2);
        assert!(weapons[0].primary);
        assert!(!weapons[1].primary);
        assert_eq!(weapons[0].name, "fist");
        let body = &world.creature(a).unwrap().body;
        assert_eq!(body.name_of(weapons[0].part.unwrap()), "right hand");
    }

    #[test]
    fn test_two_hander_swings_once() {
        let (mut world, a, _) = duel("humanoid", "humanoid");
        let axe = arm_with(&mut world, a, "Two-Handed Axe");
        let weapons = gather_weapons(world.creature(a).unwrap(), &world.items);
        assert_eq!(weapons.len(), 1);
        assert_eq!(weapons[0].item, Some(axe));
        assert!(weapons[0].primary);
    }

    #[test]
    fn test_weapon_in_off_hand_is_not_primary() {
        let (mut world, a, _) = duel("humanoid", "humanoid");
        let sword = arm_with(&mut world, a, "Long Sword");
        let weapons = gather_weapons(world.creature(a).unwrap(), &world.items);
        assert_eq!(weapons.len(), 2);
        // the sword lands in the left hand; the right fist stays primary
        assert_eq!(weapons[0].name, "fist");
        assert_eq!(weapons[1].item, Some(sword));
        assert!(!weapons[1].primary);
    }

    #[test]
    fn test_non_weapon_in_hand_falls_back_to_fist() {
        let (mut world, a, _) = duel("humanoid", "humanoid");
        arm_with(&mut world, a, "Buckler");
        let weapons = gather_weapons(world.creature(a).unwrap(), &world.items);
        assert!(weapons.iter().all(|w| w.name == "fist"));
        assert_eq!(weapons.len(), 2);
    }

    #[test]
    fn test_beasts_bite_with_their_head() {
        let (world, a, _) = duel("quadruped", "humanoid");
        let weapons = gather_weapons(world.creature(a).unwrap(), &world.items);
        assert_eq!(weapons.len(), 1);
        assert_eq!(weapons[0].name, "jaws");
        assert!(weapons[0].primary);
    }

    #[test]
    fn test_creature_without_weapons_attacks_unarmed() {
        let (mut world, a, d) = duel("humanoid", "humanoid");
        let hands: Vec<BodyPartId> = {
            let body = &world.creature(a).unwrap().body;
            body.find_all_by_type(body.root(), "Hand")
        };
        for hand in hands {
            world.dismember(a, hand, None).unwrap();
        }
        assert!(gather_weapons(world.creature(a).unwrap(), &world.items).is_empty());

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let report = perform_melee_attack(&mut world, a, d, &mut rng).unwrap();
        assert_eq!(report.swings.len(), 1);
        assert_eq!(report.swings[0].weapon, "fist");
    }

    #[test]
    fn test_cancelled_attack_does_nothing() {
        let (mut world, a, d) = duel("humanoid", "humanoid");
        world.events.subscribe(EventKind::BeforeMeleeAttack, |_| false);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let report = perform_melee_attack(&mut world, a, d, &mut rng).unwrap();
        assert!(report.cancelled);
        assert!(report.swings.is_empty());
        assert!(world.log.is_empty());
    }

    #[test]
    fn test_attack_validation() {
        let (mut world, a, d) = duel("humanoid", "humanoid");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            perform_melee_attack(&mut world, a, a, &mut rng),
            Err(CombatError::SelfAttack)
        ));
        assert!(matches!(
            perform_melee_attack(&mut world, a, CreatureId(99), &mut rng),
            Err(CombatError::CreatureNotFound(_))
        ));
        world.kill(d, None).unwrap();
        assert!(matches!(
            perform_melee_attack(&mut world, a, d, &mut rng),
            Err(CombatError::Dead(_))
        ));
    }

    #[test]
    fn test_every_swing_leaves_a_message() {
        let (mut world, a, d) = duel("humanoid", "humanoid");
        if let Some(defender) = world.creature_mut(d) {
            defender.stats = Stats::new(16, 16, 16, 1000);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..10 {
            let before = world.log.len();
            let report = perform_melee_attack(&mut world, a, d, &mut rng).unwrap();
            assert!(world.log.len() >= before + report.swings.len());
        }
    }

    #[test]
    fn test_only_hits_pick_a_location() {
        let (mut world, a, d) = duel("humanoid", "humanoid");
        if let Some(defender) = world.creature_mut(d) {
            defender.stats = Stats::new(16, 16, 16, 1000);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut misses = 0;
        for _ in 0..30 {
            let report = perform_melee_attack(&mut world, a, d, &mut rng).unwrap();
            for swing in &report.swings {
                if swing.outcome == SwingOutcome::Miss {
                    misses += 1;
                    assert!(swing.location.is_none());
                    assert!(swing.location_name.is_none());
                } else {
                    assert!(swing.location.is_some());
                }
            }
        }
        assert!(misses > 0);
    }

    #[test]
    fn test_same_seed_same_fight() {
        let run = |seed: u64| {
            let (mut world, a, d) = duel("humanoid", "quadruped");
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for _ in 0..5 {
                if perform_melee_attack(&mut world, a, d, &mut rng).is_err() {
                    break;
                }
            }
            world.log.lines().to_vec()
        };
        assert_eq!(run(77), run(77));
    }
}
