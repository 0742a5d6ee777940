//! Body upkeep: dismemberment, regrowth, dependency cascades, implied
//! parts and the mobility penalty
//!
//! These operations touch more than the body itself (items fall to the
//! ground, stats change, events fire), so each takes a `BodyContext`
//! borrowing the rest of the owning creature and the world around it.

use serde::Serialize;

use super::{Body, BodyError, BodyPartId, PartFlags, PartTemplate};
use crate::entity::{CreatureId, Item, ItemId, ItemStore, StatKind, Stats};
use crate::events::{EventBus, GameEvent};
use crate::messages::MessageLog;
use crate::params::CombatParams;
use crate::zone::{Cell, EntityRef, Zone};

/// Everything a body operation may touch outside the body
pub struct BodyContext<'a> {
    pub owner: CreatureId,
    pub owner_name: &'a str,
    /// Where the owner stands, if it is in a zone
    pub position: Option<Cell>,
    pub stats: &'a mut Stats,
    pub inventory: &'a mut Vec<ItemId>,
    pub items: &'a mut ItemStore,
    pub zone: Option<&'a mut Zone>,
    pub events: &'a mut EventBus,
    pub log: &'a mut MessageLog,
    pub params: &'a CombatParams,
}

impl BodyContext<'_> {
    /// Drop an item at the owner's feet, or into its inventory when it
    /// stands nowhere
    fn release_item(&mut self, item: ItemId) {
        if let (Some(zone), Some(cell)) = (self.zone.as_deref_mut(), self.position) {
            if zone.add_entity(EntityRef::Item(item), cell.x, cell.y) {
                return;
            }
        }
        self.inventory.push(item);
    }

    fn on_ground(&self) -> bool {
        self.zone.is_some() && self.position.is_some()
    }
}

/// What a dismemberment did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DismemberReport {
    pub part: BodyPartId,
    pub name: String,
    /// The severed part could not be lived without
    pub mortal: bool,
    /// Equipment and implants released from the severed subtree
    pub released: Vec<ItemId>,
    pub severed_limb: Option<ItemId>,
    /// Dependent parts lost along with it
    pub cascaded: Vec<BodyPartId>,
}

impl Body {
    /// Cut a part and its subtree off the body
    pub fn dismember(
        &mut self,
        id: BodyPartId,
        ctx: &mut BodyContext<'_>,
    ) -> Result<DismemberReport, BodyError> {
        if id == self.root {
            return Err(BodyError::RootPart);
        }
        let part = self.part(id).ok_or(BodyError::PartNotFound(id))?;
        if part.is_abstract() {
            return Err(BodyError::AbstractPart(id));
        }
        if !self.is_attached(id) {
            return Err(BodyError::NotAttached(id));
        }
        let name = part.name.clone();
        let mortal = part.is_mortal();

        let before = GameEvent::BeforeDismember {
            creature: ctx.owner,
            part: id,
        };
        if !ctx.events.fire(&before) {
            return Err(BodyError::Cancelled(id));
        }

        let released = self.sever(id, ctx, false)?;
        ctx.log
            .log(format!("{}'s {} is severed!", ctx.owner_name, name));
        tracing::debug!(owner = %ctx.owner, part = %id, %name, mortal, "part severed");

        let severed_limb = if ctx.params.spawn_severed_limbs && ctx.on_ground() {
            let limb = ctx.items.spawn(Item::severed_limb(ctx.owner_name, &name));
            ctx.release_item(limb);
            Some(limb)
        } else {
            None
        };

        let cascaded = self.check_unsupported_part_loss(ctx);
        self.update_mobility_penalty(ctx);

        Ok(DismemberReport {
            part: id,
            name,
            mortal,
            released,
            severed_limb,
            cascaded,
        })
    }

    /// Detach a subtree, releasing what it held. Extrinsic parts are
    /// destroyed, native ones are recorded for regrowth.
    fn sever(
        &mut self,
        id: BodyPartId,
        ctx: &mut BodyContext<'_>,
        cascaded: bool,
    ) -> Result<Vec<ItemId>, BodyError> {
        let subtree = self.flatten(id);
        let position = self.part(id).ok_or(BodyError::PartNotFound(id))?.position;
        let parent = self.detach(id)?;

        let released = self.release_subtree_items(&subtree, ctx);

        for pid in &subtree {
            if let Some(part) = self.parts.get_mut(pid) {
                part.flags.remove(PartFlags::PRIMARY);
            }
        }

        let extrinsic = self.part(id).map_or(false, |p| p.is_extrinsic());
        if extrinsic {
            self.destroy_subtree(id);
        } else {
            self.dismembered.push(super::DismemberedRecord {
                part: id,
                original_parent: parent,
                original_position: position,
            });
        }
        self.recalculate_first_slots();

        ctx.events.fire(&GameEvent::AfterDismember {
            creature: ctx.owner,
            part: id,
            cascaded,
        });
        Ok(released)
    }

    /// Strip equipment, implants and natural weapons from a set of parts.
    /// Equipment and implants are released; natural weapons are destroyed.
    fn release_subtree_items(
        &mut self,
        subtree: &[BodyPartId],
        ctx: &mut BodyContext<'_>,
    ) -> Vec<ItemId> {
        let mut released = Vec::new();
        for pid in subtree {
            let Some(part) = self.parts.get_mut(pid) else {
                continue;
            };
            let equipped = part.equipped;
            if let Some(item) = part.cybernetics.take() {
                released.push(item);
            }
            if let Some(item) = part.default_behavior.take() {
                ctx.items.destroy(item);
            }
            if let Some(item) = equipped {
                if !released.contains(&item) {
                    self.clear_item(item);
                    released.push(item);
                }
            }
        }
        for item in &released {
            ctx.release_item(*item);
        }
        released
    }

    /// Regrow one severed part, preferring one of `part_type` when given.
    ///
    /// A part whose old parent is still attached goes back there; otherwise
    /// the first regrowable part is put back under the root.
    pub fn regenerate_limb(
        &mut self,
        part_type: Option<&str>,
        ctx: &mut BodyContext<'_>,
    ) -> Option<BodyPartId> {
        let candidates: Vec<usize> = self
            .dismembered
            .iter()
            .enumerate()
            .filter(|(_, record)| {
                self.part(record.part).map_or(false, |p| {
                    p.is_regenerable() && part_type.map_or(true, |t| p.is_type(t))
                })
            })
            .map(|(index, _)| index)
            .collect();

        let index = candidates
            .iter()
            .copied()
            .find(|&i| self.is_attached(self.dismembered[i].original_parent))
            .or_else(|| candidates.first().copied())?;

        let id = self.restore(index)?;
        ctx.events.fire(&GameEvent::LimbRegenerated {
            creature: ctx.owner,
            part: id,
        });
        ctx.log
            .log(format!("{}'s {} regrows!", ctx.owner_name, self.name_of(id)));
        tracing::debug!(owner = %ctx.owner, part = %id, "limb regenerated");

        self.check_part_recovery(ctx);
        self.update_mobility_penalty(ctx);
        Some(id)
    }

    /// Reattach a recorded part at its old place, or under the root.
    /// The record is kept when the part cannot be reattached.
    fn restore(&mut self, index: usize) -> Option<BodyPartId> {
        let record = *self.dismembered.get(index)?;
        let parent = if self.is_attached(record.original_parent) {
            record.original_parent
        } else {
            self.root
        };
        if let Err(err) = self.add_child(parent, record.part, Some(record.original_position)) {
            tracing::warn!(part = %record.part, %err, "could not restore severed part");
            return None;
        }
        self.dismembered.remove(index);
        self.recalculate_first_slots();
        Some(record.part)
    }

    /// Sever every attached part whose dependencies are no longer met,
    /// repeating until a pass finds none
    pub fn check_unsupported_part_loss(&mut self, ctx: &mut BodyContext<'_>) -> Vec<BodyPartId> {
        let mut lost = Vec::new();
        loop {
            let unsupported: Vec<BodyPartId> = self
                .attached_parts()
                .filter(|p| p.id != self.root)
                .map(|p| p.id)
                .filter(|&id| self.is_unsupported(id))
                .collect();
            if unsupported.is_empty() {
                break;
            }
            let mut severed_any = false;
            for id in unsupported {
                if !self.is_attached(id) {
                    continue;
                }
                if self.sever(id, ctx, true).is_ok() {
                    tracing::debug!(owner = %ctx.owner, part = %id, "unsupported part lost");
                    lost.push(id);
                    severed_any = true;
                }
            }
            if !severed_any {
                break;
            }
        }
        lost
    }

    /// Reattach severed parts whose dependencies are met again
    pub fn check_part_recovery(&mut self, ctx: &mut BodyContext<'_>) -> Vec<BodyPartId> {
        let mut recovered = Vec::new();
        let mut stuck: Vec<BodyPartId> = Vec::new();
        loop {
            let ready = self.dismembered.iter().position(|record| {
                !stuck.contains(&record.part)
                    && self.part(record.part).map_or(false, |p| {
                        p.has_dependency() && self.dependencies_met(record.part)
                    })
            });
            let Some(index) = ready else {
                break;
            };
            let Some(id) = self.restore(index) else {
                stuck.push(self.dismembered[index].part);
                continue;
            };
            ctx.events.fire(&GameEvent::LimbRegenerated {
                creature: ctx.owner,
                part: id,
            });
            tracing::debug!(owner = %ctx.owner, part = %id, "dependent part recovered");
            recovered.push(id);
        }
        recovered
    }

    /// Speed penalty for the share of mobility lost to severed parts
    pub fn calculate_mobility_penalty(&self, max_penalty: i32) -> i32 {
        let attached: i32 = self.attached_parts().map(|p| p.mobility).sum();
        let lost: i32 = self
            .dismembered
            .iter()
            .flat_map(|record| self.flatten(record.part))
            .filter_map(|id| self.part(id))
            .map(|p| p.mobility)
            .sum();
        let total = attached + lost;
        if total <= 0 || lost <= 0 {
            return 0;
        }
        (lost * max_penalty / total).min(max_penalty)
    }

    /// Apply the change in mobility penalty to the owner's speed
    pub fn update_mobility_penalty(&mut self, ctx: &mut BodyContext<'_>) {
        let penalty = self.calculate_mobility_penalty(ctx.params.max_mobility_penalty);
        let delta = penalty - self.applied_mobility_penalty;
        if delta == 0 {
            return;
        }
        if let Some(speed) = ctx.stats.get_mut(StatKind::Speed) {
            speed.penalty += delta;
        }
        self.applied_mobility_penalty = penalty;
        tracing::debug!(owner = %ctx.owner, penalty, "mobility penalty updated");
    }

    /// Add or remove implied parts so each rule's count matches its source
    pub fn check_implied_parts(&mut self, ctx: &mut BodyContext<'_>) -> bool {
        let mut changed = false;
        for rule in self.implied_rules.clone() {
            let manager = rule.manager_id();
            let expected = rule.expected(self.count_by_type(&rule.implied_by));
            let present = self.count_by_type(&rule.part_type);

            if present < expected {
                for _ in present..expected {
                    let root = self.root;
                    if self
                        .add_part_by_manager(root, &rule.template, &manager, ctx)
                        .is_ok()
                    {
                        changed = true;
                    }
                }
            } else if present > expected {
                let managed: Vec<BodyPartId> = self
                    .attached_parts()
                    .filter(|p| p.is_type(&rule.part_type) && p.is_managed_by(&manager))
                    .map(|p| p.id)
                    .collect();
                for id in managed.into_iter().rev().take(present - expected) {
                    self.remove_part(id, ctx);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Graft a subtree owned by `manager` under `parent`
    pub fn add_part_by_manager(
        &mut self,
        parent: BodyPartId,
        template: &PartTemplate,
        manager: &str,
        ctx: &mut BodyContext<'_>,
    ) -> Result<BodyPartId, BodyError> {
        let tagged = template.clone().managed_by(manager);
        let id = self.graft(parent, &tagged, None)?;
        ctx.events.fire(&GameEvent::BodyPartAdded {
            creature: ctx.owner,
            part: id,
            manager: Some(manager.to_string()),
        });
        tracing::debug!(owner = %ctx.owner, part = %id, manager, "managed part added");
        Ok(id)
    }

    /// Remove every part owned by `manager`, attached or severed
    pub fn remove_parts_by_manager(&mut self, manager: &str, ctx: &mut BodyContext<'_>) -> usize {
        let tops: Vec<BodyPartId> = self
            .attached_parts()
            .filter(|p| {
                p.is_managed_by(manager)
                    && !p
                        .parent
                        .and_then(|parent| self.part(parent))
                        .map_or(false, |parent| parent.is_managed_by(manager))
            })
            .map(|p| p.id)
            .collect();
        let severed: Vec<BodyPartId> = self
            .dismembered
            .iter()
            .map(|record| record.part)
            .filter(|&id| self.part(id).map_or(false, |p| p.is_managed_by(manager)))
            .collect();

        let mut removed = 0;
        for id in tops {
            self.remove_part(id, ctx);
            removed += 1;
        }
        for id in severed {
            self.dismembered.retain(|record| record.part != id);
            self.destroy_subtree(id);
            removed += 1;
        }
        removed
    }

    /// Take a subtree out of the body for good, releasing what it held
    fn remove_part(&mut self, id: BodyPartId, ctx: &mut BodyContext<'_>) {
        let subtree = self.flatten(id);
        self.release_subtree_items(&subtree, ctx);
        let manager = self.part(id).and_then(|p| p.manager.clone());
        self.destroy_subtree(id);
        self.recalculate_first_slots();
        ctx.events.fire(&GameEvent::BodyPartRemoved {
            creature: ctx.owner,
            part: id,
            manager,
        });
    }

    /// Instantiate natural weapons missing from parts that should have one
    fn regenerate_default_behaviors(&mut self, ctx: &mut BodyContext<'_>) {
        let missing: Vec<(BodyPartId, String)> = self
            .attached_parts()
            .filter(|p| p.default_behavior.is_none())
            .filter_map(|p| p.default_behavior_blueprint.clone().map(|bp| (p.id, bp)))
            .collect();
        for (id, blueprint) in missing {
            match ctx.items.spawn_blueprint(&blueprint) {
                Some(item) => {
                    if let Some(part) = self.parts.get_mut(&id) {
                        part.default_behavior = Some(item);
                    }
                }
                None => tracing::warn!(part = %id, %blueprint, "unknown natural weapon blueprint"),
            }
        }
        self.recalculate_first_default_behavior();
    }

    /// Bring the whole body back to a consistent state
    pub fn update_body_parts(&mut self, ctx: &mut BodyContext<'_>) {
        self.check_unsupported_part_loss(ctx);
        self.check_part_recovery(ctx);
        self.check_implied_parts(ctx);
        self.regenerate_primary();
        self.recalculate_first_slots();
        self.regenerate_default_behaviors(ctx);
        self.update_mobility_penalty(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::templates::{humanoid, quadruped};
    use crate::body::BodyPart;
    use crate::entity::Stats;
    use crate::laterality::Laterality;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Harness {
        stats: Stats,
        inventory: Vec<ItemId>,
        items: ItemStore,
        zone: Zone,
        events: EventBus,
        log: MessageLog,
        params: CombatParams,
        on_map: bool,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                stats: Stats::average(),
                inventory: Vec::new(),
                items: ItemStore::new(),
                zone: Zone::new(10, 10),
                events: EventBus::new(),
                log: MessageLog::new(),
                params: CombatParams::default(),
                on_map: true,
            }
        }

        fn ctx(&mut self) -> BodyContext<'_> {
            let position = self.on_map.then(|| Cell::new(3, 4));
            BodyContext {
                owner: CreatureId(1),
                owner_name: "Bob",
                position,
                stats: &mut self.stats,
                inventory: &mut self.inventory,
                items: &mut self.items,
                zone: Some(&mut self.zone),
                events: &mut self.events,
                log: &mut self.log,
                params: &self.params,
            }
        }
    }

    fn find(body: &Body, name: &str) -> BodyPartId {
        body.flatten(body.root())
            .into_iter()
            .chain(body.dismembered().iter().flat_map(|r| body.flatten(r.part)))
            .find(|&id| body.part(id).map_or(false, |p| p.name == name))
            .unwrap()
    }

    fn ready_humanoid(h: &mut Harness) -> Body {
        let mut body = humanoid();
        body.update_body_parts(&mut h.ctx());
        body
    }

    #[test]
    fn test_update_creates_natural_weapons_and_primary() {
        let mut h = Harness::new();
        let body = ready_humanoid(&mut h);
        let right = find(&body, "right hand");
        let left = find(&body, "left hand");
        assert_eq!(body.primary_part(), Some(right));
        assert!(body.part(right).unwrap().default_behavior.is_some());
        assert!(body.part(left).unwrap().default_behavior.is_some());
        assert_eq!(h.items.len(), 2);
    }

    #[test]
    fn test_dismember_records_and_cascades_hand_group() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        let arm = find(&body, "left arm");
        let group = find(&body, "left hands");

        let report = body.dismember(arm, &mut h.ctx()).unwrap();
        assert!(!report.mortal);
        assert_eq!(report.cascaded, vec![group]);
        assert!(!body.is_attached(arm));
        assert!(!body.is_attached(group));
        assert_eq!(body.dismembered().len(), 2);
        assert!(h.log.contains("Bob's left arm is severed!"));

        // the fist lived on the severed hand and is gone
        assert_eq!(h.items.len(), 2);
        let limb = report.severed_limb.unwrap();
        assert_eq!(h.items.get(limb).unwrap().name, "Bob's severed left arm");
        assert!(h.zone.items_at(Cell::new(3, 4)).contains(&limb));
    }

    #[test]
    fn test_dismember_drops_equipment_and_clears_shared_slots() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        let left = find(&body, "left hand");
        let right = find(&body, "right hand");
        let axe = h.items.spawn_blueprint("Two-Handed Axe").unwrap();
        body.set_equipped(&[left, right], axe);

        let report = body.dismember(find(&body, "left arm"), &mut h.ctx()).unwrap();
        assert_eq!(report.released, vec![axe]);
        assert!(body.parts_holding(axe).is_empty());
        assert!(body.part(right).unwrap().equipped.is_none());
        assert!(h.zone.items_at(Cell::new(3, 4)).contains(&axe));
    }

    #[test]
    fn test_dismember_off_map_returns_items_to_inventory() {
        let mut h = Harness::new();
        h.on_map = false;
        let mut body = ready_humanoid(&mut h);
        let left = find(&body, "left hand");
        let dagger = h.items.spawn_blueprint("Dagger").unwrap();
        body.set_equipped(&[left], dagger);

        let report = body.dismember(left, &mut h.ctx()).unwrap();
        assert_eq!(h.inventory, vec![dagger]);
        assert!(report.severed_limb.is_none());
    }

    #[test]
    fn test_dismember_rejections() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        let root = body.root();
        assert_eq!(body.dismember(root, &mut h.ctx()), Err(BodyError::RootPart));

        let hand = find(&body, "left hand");
        body.dismember(hand, &mut h.ctx()).unwrap();
        assert_eq!(
            body.dismember(hand, &mut h.ctx()),
            Err(BodyError::NotAttached(hand))
        );
    }

    #[test]
    fn test_cancelled_dismember_changes_nothing() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        h.events
            .subscribe(crate::events::EventKind::BeforeDismember, |_| false);
        let arm = find(&body, "left arm");
        assert_eq!(
            body.dismember(arm, &mut h.ctx()),
            Err(BodyError::Cancelled(arm))
        );
        assert!(body.is_attached(arm));
        assert!(body.dismembered().is_empty());
        assert!(h.log.is_empty());
    }

    #[test]
    fn test_mortal_part_is_reported() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        let report = body.dismember(find(&body, "head"), &mut h.ctx()).unwrap();
        assert!(report.mortal);
    }

    #[test]
    fn test_regenerate_restores_position_and_dependents() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        let root = body.root();
        let arm = find(&body, "left arm");
        let group = find(&body, "left hands");
        let position = body.part(arm).unwrap().position;
        let group_position = body.part(group).unwrap().position;
        body.dismember(arm, &mut h.ctx()).unwrap();

        let regrown = body.regenerate_limb(None, &mut h.ctx());
        assert_eq!(regrown, Some(arm));
        assert_eq!(body.part(arm).unwrap().parent, Some(root));
        assert_eq!(body.part(arm).unwrap().position, position);
        assert!(body.is_attached(find(&body, "left hand")));
        assert!(body.is_attached(group));
        assert_eq!(body.part(group).unwrap().position, group_position);
        assert!(body.dismembered().is_empty());
        assert!(h.log.contains("Bob's left arm regrows!"));
        assert!(body.validate().is_ok());

        body.update_body_parts(&mut h.ctx());
        assert!(body.part(find(&body, "left hand")).unwrap().default_behavior.is_some());
    }

    #[test]
    fn test_regenerate_prefers_attached_parent() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        let arm = find(&body, "right arm");
        let hand = find(&body, "right hand");
        body.dismember(hand, &mut h.ctx()).unwrap();
        body.dismember(arm, &mut h.ctx()).unwrap();

        // the hand's parent is gone, so the arm comes back first
        assert_eq!(body.regenerate_limb(None, &mut h.ctx()), Some(arm));
        assert_eq!(body.regenerate_limb(None, &mut h.ctx()), Some(hand));
        assert_eq!(body.part(hand).unwrap().parent, Some(arm));
    }

    #[test]
    fn test_regenerate_by_type_and_empty() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        assert_eq!(body.regenerate_limb(None, &mut h.ctx()), None);

        body.dismember(find(&body, "feet"), &mut h.ctx()).unwrap();
        body.dismember(find(&body, "left hand"), &mut h.ctx()).unwrap();
        assert_eq!(
            body.regenerate_limb(Some("Hand"), &mut h.ctx()),
            Some(find(&body, "left hand"))
        );
        assert_eq!(body.regenerate_limb(Some("Hand"), &mut h.ctx()), None);
    }

    fn fingered_arm() -> Body {
        let hand = BodyPart::new("Hand", Laterality::LEFT)
            .with_flags(PartFlags::APPENDAGE)
            .with_target_weight(1)
            .supporting("left hand");
        let fingers = BodyPart::new("Fingers", Laterality::LEFT)
            .with_flags(PartFlags::ABSTRACT)
            .with_target_weight(4)
            .depending_on("left hand");
        let template = PartTemplate::new(BodyPart::new("Body", Laterality::NONE))
            .child(
                PartTemplate::new(BodyPart::new("Arm", Laterality::LEFT).with_flags(PartFlags::APPENDAGE))
                    .child(PartTemplate::leaf(hand)),
            )
            .child(PartTemplate::leaf(fingers));
        Body::from_template("fingered", &template)
    }

    #[test]
    fn test_abstract_dependent_falls_and_returns_with_its_support() {
        let mut h = Harness::new();
        let mut body = fingered_arm();
        body.update_body_parts(&mut h.ctx());
        let hand = find(&body, "left hand");
        let fingers = find(&body, "left fingers");
        assert_eq!(body.count_by_type("Fingers"), 1);

        let report = body.dismember(hand, &mut h.ctx()).unwrap();
        assert_eq!(report.cascaded, vec![fingers]);
        assert_eq!(body.count_by_type("Fingers"), 0);
        assert_eq!(body.dismembered().len(), 2);

        // abstract parts never regrow on their own
        assert_eq!(body.regenerate_limb(Some("Fingers"), &mut h.ctx()), None);

        assert_eq!(body.regenerate_limb(Some("Hand"), &mut h.ctx()), Some(hand));
        assert!(body.is_attached(fingers));
        assert_eq!(body.count_by_type("Fingers"), 1);
        assert!(body.dismembered().is_empty());
        assert!(body.validate().is_ok());
    }

    #[test]
    fn test_abstract_dependent_recovers_during_update() {
        let mut h = Harness::new();
        let mut body = fingered_arm();
        body.update_body_parts(&mut h.ctx());
        let arm = find(&body, "left arm");
        let hand = find(&body, "left hand");
        let fingers = find(&body, "left fingers");
        body.dismember(arm, &mut h.ctx()).unwrap();
        assert!(!body.is_attached(fingers));

        // put the arm back by hand, leaving its record behind
        let root = body.root();
        body.dismembered.retain(|record| record.part != arm);
        body.add_child(root, arm, None).unwrap();
        assert!(body.is_attached(hand));

        body.update_body_parts(&mut h.ctx());
        assert!(body.is_attached(fingers));
        assert!(body.dismembered().is_empty());
    }

    #[test]
    fn test_failed_regrowth_keeps_the_record() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        let arm = find(&body, "left arm");
        let hand = find(&body, "left hand");
        body.dismember(hand, &mut h.ctx()).unwrap();
        // reattached behind the record's back: restoring it must fail
        body.add_child(arm, hand, None).unwrap();
        h.log.drain();

        assert_eq!(body.regenerate_limb(Some("Hand"), &mut h.ctx()), None);
        assert!(body.dismembered().iter().any(|record| record.part == hand));
        assert!(h.log.is_empty());

        // a ready dependent that cannot be restored is skipped, not retried
        let group = find(&body, "left hands");
        let record = *body.dismembered().iter().find(|r| r.part == group).unwrap();
        body.add_child(record.original_parent, group, None).unwrap();
        assert!(body.check_part_recovery(&mut h.ctx()).is_empty());
        assert_eq!(body.dismembered().len(), 2);
    }

    #[test]
    fn test_orphaned_record_regrows_under_root() {
        let mut h = Harness::new();
        let mut body = quadruped();
        body.update_body_parts(&mut h.ctx());
        let head = find(&body, "head");
        let root = body.root();
        body.dismember(head, &mut h.ctx()).unwrap();
        if let Some(record) = body.dismembered.first_mut() {
            record.original_parent = BodyPartId(999);
        }
        assert_eq!(body.regenerate_limb(None, &mut h.ctx()), Some(head));
        assert_eq!(body.part(head).unwrap().parent, Some(root));
    }

    #[test]
    fn test_mobility_penalty_applied_once() {
        let mut h = Harness::new();
        let mut body = quadruped();
        body.update_body_parts(&mut h.ctx());
        assert_eq!(body.calculate_mobility_penalty(60), 0);

        body.dismember(find(&body, "fore left leg"), &mut h.ctx()).unwrap();
        assert_eq!(body.applied_mobility_penalty(), 15);
        assert_eq!(h.stats.value(StatKind::Speed), 85);

        body.update_mobility_penalty(&mut h.ctx());
        body.update_body_parts(&mut h.ctx());
        assert_eq!(h.stats.value(StatKind::Speed), 85);

        body.dismember(find(&body, "hind right leg"), &mut h.ctx()).unwrap();
        assert_eq!(h.stats.value(StatKind::Speed), 70);

        body.regenerate_limb(None, &mut h.ctx());
        body.regenerate_limb(None, &mut h.ctx());
        assert_eq!(body.applied_mobility_penalty(), 0);
        assert_eq!(h.stats.value(StatKind::Speed), 100);
    }

    #[test]
    fn test_mobility_penalty_without_mobile_parts() {
        let body = crate::body::templates::simple();
        assert_eq!(body.calculate_mobility_penalty(60), 0);
    }

    #[test]
    fn test_implied_parts_follow_hand_count() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        let root = body.root();
        let extra_hand = PartTemplate::leaf(
            BodyPart::new("Hand", Laterality::LOWER).with_flags(PartFlags::APPENDAGE),
        )
        .extrinsic();
        let added = body
            .add_part_by_manager(root, &extra_hand, "Mutation::Test", &mut h.ctx())
            .unwrap();
        assert!(body.check_implied_parts(&mut h.ctx()));
        assert_eq!(body.count_by_type("Hands"), 3);
        assert!(body
            .attached_parts()
            .any(|p| p.is_type("Hands") && p.is_managed_by("Implied::Hands")));

        // nothing left to do on a second pass
        assert!(!body.check_implied_parts(&mut h.ctx()));

        assert_eq!(body.remove_parts_by_manager("Mutation::Test", &mut h.ctx()), 1);
        assert!(!body.contains(added));
        assert!(body.check_implied_parts(&mut h.ctx()));
        assert_eq!(body.count_by_type("Hands"), 2);
    }

    #[test]
    fn test_extrinsic_parts_are_destroyed_when_severed() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        let root = body.root();
        let wing = PartTemplate::leaf(
            BodyPart::new("Wing", Laterality::LEFT).with_flags(PartFlags::APPENDAGE),
        )
        .extrinsic();
        let id = body
            .add_part_by_manager(root, &wing, "Mutation::Wings", &mut h.ctx())
            .unwrap();
        body.dismember(id, &mut h.ctx()).unwrap();
        assert!(!body.contains(id));
        assert!(body.dismembered().is_empty());
    }

    #[test]
    fn test_update_body_parts_is_idempotent() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        body.dismember(find(&body, "right arm"), &mut h.ctx()).unwrap();
        body.update_body_parts(&mut h.ctx());

        let snapshot = serde_json::to_value(&body).unwrap();
        let items = h.items.len();
        let speed = h.stats.value(StatKind::Speed);
        body.update_body_parts(&mut h.ctx());
        assert_eq!(serde_json::to_value(&body).unwrap(), snapshot);
        assert_eq!(h.items.len(), items);
        assert_eq!(h.stats.value(StatKind::Speed), speed);
    }

    #[test]
    fn test_primary_moves_to_remaining_hand() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        body.dismember(find(&body, "right hand"), &mut h.ctx()).unwrap();
        body.update_body_parts(&mut h.ctx());
        assert_eq!(body.primary_part(), Some(find(&body, "left hand")));

        // the chosen primary does not snap back when the old one regrows
        body.regenerate_limb(Some("Hand"), &mut h.ctx());
        body.update_body_parts(&mut h.ctx());
        assert_eq!(body.primary_part(), Some(find(&body, "left hand")));
    }

    #[test]
    fn test_after_dismember_events_mark_cascades() {
        let mut h = Harness::new();
        let mut body = ready_humanoid(&mut h);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        h.events.subscribe(crate::events::EventKind::AfterDismember, move |event| {
            if let GameEvent::AfterDismember { cascaded, .. } = event {
                sink.borrow_mut().push(*cascaded);
            }
            true
        });
        body.dismember(find(&body, "right hand"), &mut h.ctx()).unwrap();
        assert_eq!(*seen.borrow(), vec![false, true]);
    }
}
