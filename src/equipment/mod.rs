//! Equipping and unequipping items on body parts
//!
//! Every operation validates first and only then mutates, so an `Err`
//! leaves the creature exactly as it was.

pub mod planner;

use thiserror::Error;

pub use planner::{build_plan, EquipPlan};

use crate::body::{BodyError, BodyPartId};
use crate::entity::{CreatureId, ItemId};
use crate::world::World;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EquipError {
    #[error("{0} cannot be equipped")]
    NotEquippable(String),
    #[error("{item} needs {needed} free {part_type} slot(s) but the body has {available}")]
    InsufficientSlots {
        item: String,
        part_type: String,
        needed: usize,
        available: usize,
    },
    #[error("{item} cannot be equipped on {part}")]
    IncompatibleTarget { item: String, part: String },
    #[error("no item with id {0}")]
    ItemNotFound(ItemId),
    #[error("no creature with id {0}")]
    CreatureNotFound(CreatureId),
    #[error("{0} is not being carried")]
    NotCarried(String),
    #[error("{0} is already equipped")]
    AlreadyEquipped(String),
    #[error("{0} is not equipped")]
    NotEquipped(String),
    #[error(transparent)]
    Body(#[from] BodyError),
}

/// Plan equipping a carried item without changing anything
pub fn plan_equip(
    world: &World,
    creature: CreatureId,
    item: ItemId,
    target: Option<BodyPartId>,
) -> Result<EquipPlan, EquipError> {
    let data = world.items.get(item).ok_or(EquipError::ItemNotFound(item))?;
    let wearer = world
        .creature(creature)
        .ok_or(EquipError::CreatureNotFound(creature))?;
    Ok(build_plan(&wearer.body, item, data, target))
}

/// Equip a carried item, first unequipping whatever is in the way
pub fn equip(
    world: &mut World,
    creature: CreatureId,
    item: ItemId,
    target: Option<BodyPartId>,
) -> Result<EquipPlan, EquipError> {
    let plan = plan_equip(world, creature, item, target)?;
    let item_name = world.items.name_of(item);
    let wearer = world
        .creatures
        .get_mut(&creature)
        .ok_or(EquipError::CreatureNotFound(creature))?;
    if !wearer.body.parts_holding(item).is_empty() {
        return Err(EquipError::AlreadyEquipped(item_name));
    }
    if !wearer.carries(item) {
        return Err(EquipError::NotCarried(item_name));
    }
    if let Some(failure) = &plan.failure {
        tracing::debug!(creature = %creature, item = %item, reason = %failure, "equip refused");
        return Err(failure.clone());
    }

    for (displaced, _) in &plan.displacements {
        wearer.body.clear_item(*displaced);
        wearer.inventory.push(*displaced);
        world
            .log
            .log(format!("{} unequips {}.", wearer.name, world.items.name_of(*displaced)));
    }
    wearer.take_from_inventory(item);
    wearer.body.set_equipped(&plan.claimed_parts, item);
    world.log.log(format!("{} equips {}.", wearer.name, item_name));
    tracing::debug!(creature = %creature, item = %item, slots = plan.claimed_parts.len(), "item equipped");
    Ok(plan)
}

/// Take an equipped item off every slot it occupies and put it in the
/// inventory. Returns the freed slots.
pub fn unequip(
    world: &mut World,
    creature: CreatureId,
    item: ItemId,
) -> Result<Vec<BodyPartId>, EquipError> {
    let item_name = world.items.name_of(item);
    let wearer = world
        .creatures
        .get_mut(&creature)
        .ok_or(EquipError::CreatureNotFound(creature))?;
    let freed = wearer.body.clear_item(item);
    if freed.is_empty() {
        return Err(EquipError::NotEquipped(item_name));
    }
    wearer.inventory.push(item);
    world.log.log(format!("{} unequips {}.", wearer.name, item_name));
    Ok(freed)
}

/// Install a carried implant into a body part's cybernetics slot
pub fn implant_cybernetic(
    world: &mut World,
    creature: CreatureId,
    item: ItemId,
    part: BodyPartId,
) -> Result<(), EquipError> {
    let item_name = world.items.name_of(item);
    if world.items.get(item).is_none() {
        return Err(EquipError::ItemNotFound(item));
    }
    let host = world
        .creatures
        .get_mut(&creature)
        .ok_or(EquipError::CreatureNotFound(creature))?;
    if !host.carries(item) {
        return Err(EquipError::NotCarried(item_name));
    }
    host.body.implant_cybernetic(part, item)?;
    host.take_from_inventory(item);
    tracing::debug!(creature = %creature, item = %item, part = %part, "implant installed");
    Ok(())
}

/// Remove an implant, returning it to the inventory
pub fn remove_cybernetic(
    world: &mut World,
    creature: CreatureId,
    part: BodyPartId,
) -> Result<ItemId, EquipError> {
    let host = world
        .creatures
        .get_mut(&creature)
        .ok_or(EquipError::CreatureNotFound(creature))?;
    let item = host.body.remove_cybernetic(part)?;
    host.inventory.push(item);
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Item, SlotRequirement, Stats};
    use crate::zone::Cell;

    fn setup() -> (World, CreatureId) {
        let mut world = World::new(8, 8);
        let hero = world
            .spawn_creature("Hero", "humanoid", Stats::average(), Some(Cell::new(1, 1)))
            .unwrap();
        (world, hero)
    }

    fn carried(world: &mut World, hero: CreatureId, blueprint: &str) -> ItemId {
        let item = world.items.spawn_blueprint(blueprint).unwrap();
        world.give_item(hero, item).unwrap();
        item
    }

    #[test]
    fn test_equip_moves_item_out_of_inventory() {
        let (mut world, hero) = setup();
        let sword = carried(&mut world, hero, "Long Sword");
        let plan = equip(&mut world, hero, sword, None).unwrap();
        let creature = world.creature(hero).unwrap();
        assert!(!creature.carries(sword));
        assert_eq!(creature.body.parts_holding(sword), plan.claimed_parts);
        assert_eq!(world.log.last(), Some("Hero equips long sword."));
    }

    #[test]
    fn test_two_hander_displaces_both_hands() {
        let (mut world, hero) = setup();
        let sword = carried(&mut world, hero, "Long Sword");
        let dagger = carried(&mut world, hero, "Dagger");
        equip(&mut world, hero, sword, None).unwrap();
        equip(&mut world, hero, dagger, None).unwrap();

        let axe = carried(&mut world, hero, "Two-Handed Axe");
        let plan = equip(&mut world, hero, axe, None).unwrap();
        assert_eq!(plan.displacements.len(), 2);
        let creature = world.creature(hero).unwrap();
        assert!(creature.carries(sword));
        assert!(creature.carries(dagger));
        assert_eq!(creature.body.parts_holding(axe).len(), 2);
        assert!(world.log.contains("Hero unequips long sword."));
    }

    #[test]
    fn test_failed_equip_changes_nothing() {
        let (mut world, hero) = setup();
        let sword = carried(&mut world, hero, "Long Sword");
        equip(&mut world, hero, sword, None).unwrap();
        let head = {
            let body = &world.creature(hero).unwrap().body;
            body.find_by_type(body.root(), "Head").unwrap()
        };
        let dagger = carried(&mut world, hero, "Dagger");
        let log_len = world.log.len();

        let err = equip(&mut world, hero, dagger, Some(head)).unwrap_err();
        assert!(matches!(err, EquipError::IncompatibleTarget { .. }));
        let creature = world.creature(hero).unwrap();
        assert!(creature.carries(dagger));
        assert_eq!(creature.body.parts_holding(sword).len(), 1);
        assert_eq!(world.log.len(), log_len);
    }

    #[test]
    fn test_equip_requires_carrying() {
        let (mut world, hero) = setup();
        let sword = world.items.spawn_blueprint("Long Sword").unwrap();
        assert_eq!(
            equip(&mut world, hero, sword, None),
            Err(EquipError::NotCarried("long sword".to_string()))
        );
        let rock = world.items.spawn(Item::new("rock", "Rock"));
        world.give_item(hero, rock).unwrap();
        assert_eq!(
            equip(&mut world, hero, rock, None),
            Err(EquipError::NotEquippable("rock".to_string()))
        );
    }

    #[test]
    fn test_zero_slot_item_stays_in_inventory() {
        let (mut world, hero) = setup();
        let ring = world.items.spawn(Item::new("ring", "Ring").with_slot(SlotRequirement {
            part_type: "Hand".to_string(),
            count: 0,
        }));
        world.give_item(hero, ring).unwrap();
        assert_eq!(
            equip(&mut world, hero, ring, None),
            Err(EquipError::NotEquippable("ring".to_string()))
        );
        let creature = world.creature(hero).unwrap();
        assert!(creature.carries(ring));
        assert!(creature.body.parts_holding(ring).is_empty());
    }

    #[test]
    fn test_unequip_clears_every_slot() {
        let (mut world, hero) = setup();
        let axe = carried(&mut world, hero, "Two-Handed Axe");
        equip(&mut world, hero, axe, None).unwrap();
        let freed = unequip(&mut world, hero, axe).unwrap();
        assert_eq!(freed.len(), 2);
        assert!(world.creature(hero).unwrap().carries(axe));
        assert_eq!(
            unequip(&mut world, hero, axe),
            Err(EquipError::NotEquipped("two-handed axe".to_string()))
        );
    }

    #[test]
    fn test_gloves_go_on_hand_groups() {
        let (mut world, hero) = setup();
        let gloves = carried(&mut world, hero, "Gloves");
        let plan = equip(&mut world, hero, gloves, None).unwrap();
        let body = &world.creature(hero).unwrap().body;
        assert!(body.part(plan.claimed_parts[0]).unwrap().is_type("Hands"));
    }

    #[test]
    fn test_implant_round_trip() {
        let (mut world, hero) = setup();
        let chip = world.items.spawn(Item::new("night-sight chip", "Chip"));
        world.give_item(hero, chip).unwrap();
        let head = {
            let body = &world.creature(hero).unwrap().body;
            body.find_by_type(body.root(), "Head").unwrap()
        };
        implant_cybernetic(&mut world, hero, chip, head).unwrap();
        assert!(!world.creature(hero).unwrap().carries(chip));
        assert!(matches!(
            implant_cybernetic(&mut world, hero, chip, head),
            Err(EquipError::NotCarried(_))
        ));
        assert_eq!(remove_cybernetic(&mut world, hero, head), Ok(chip));
        assert!(world.creature(hero).unwrap().carries(chip));
    }
}
