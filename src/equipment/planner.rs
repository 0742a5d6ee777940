//! Equip planning
//!
//! A plan is computed against the current body without touching it. It
//! names the slots an item would occupy and the items it would push out;
//! applying it is then a sequence of steps that cannot fail.

use serde::Serialize;

use super::EquipError;
use crate::body::{Body, BodyPartId};
use crate::entity::{Item, ItemId};

/// The outcome of planning to equip one item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquipPlan {
    pub item: ItemId,
    /// Slots the item will occupy, in the order they were chosen
    pub claimed_parts: Vec<BodyPartId>,
    /// Items to unequip first, each listed once with the slot it was found on
    pub displacements: Vec<(ItemId, BodyPartId)>,
    #[serde(skip)]
    pub failure: Option<EquipError>,
}

impl EquipPlan {
    fn failed(item: ItemId, failure: EquipError) -> Self {
        Self {
            item,
            claimed_parts: Vec::new(),
            displacements: Vec::new(),
            failure: Some(failure),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.failure.is_none()
    }

    pub fn failure_reason(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }
}

/// Work out which slots `item` would take on `body`.
///
/// Empty slots are preferred over occupied ones. When `target` is given it
/// must be one of the candidate slots and is always claimed first.
pub fn build_plan(body: &Body, id: ItemId, item: &Item, target: Option<BodyPartId>) -> EquipPlan {
    // a requirement of zero slots would equip the item onto nothing
    let Some(slot) = item.slot.as_ref().filter(|slot| slot.count > 0) else {
        return EquipPlan::failed(id, EquipError::NotEquippable(item.name.clone()));
    };
    let needed = slot.count as usize;
    let candidates = body.equippable_slots(&slot.part_type);
    if candidates.len() < needed {
        return EquipPlan::failed(
            id,
            EquipError::InsufficientSlots {
                item: item.name.clone(),
                part_type: slot.part_type.clone(),
                needed,
                available: candidates.len(),
            },
        );
    }

    let mut claimed = Vec::with_capacity(needed);
    if let Some(target) = target {
        if !candidates.contains(&target) {
            return EquipPlan::failed(
                id,
                EquipError::IncompatibleTarget {
                    item: item.name.clone(),
                    part: body.name_of(target),
                },
            );
        }
        claimed.push(target);
    }

    let occupied = |part: &BodyPartId| {
        body.part(*part)
            .and_then(|p| p.equipped)
            .map_or(false, |held| held != id)
    };
    let (free, taken): (Vec<BodyPartId>, Vec<BodyPartId>) =
        candidates.iter().copied().partition(|part| !occupied(part));
    for part in free.into_iter().chain(taken) {
        if claimed.len() >= needed {
            break;
        }
        if !claimed.contains(&part) {
            claimed.push(part);
        }
    }

    let mut displacements: Vec<(ItemId, BodyPartId)> = Vec::new();
    for part in &claimed {
        if let Some(held) = body.part(*part).and_then(|p| p.equipped) {
            if held != id && !displacements.iter().any(|(other, _)| *other == held) {
                displacements.push((held, *part));
            }
        }
    }

    EquipPlan {
        item: id,
        claimed_parts: claimed,
        displacements,
        failure: None,
    }
}
