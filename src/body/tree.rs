//! Structural operations on the body tree
//!
//! Every ordered walk starts at the root and visits children in position
//! order, so results never depend on arena iteration order.

use std::collections::HashSet;

use super::{Body, BodyError, BodyPart, BodyPartId, PartFlags, PartTemplate};
use crate::entity::ItemId;
use crate::laterality::Laterality;

impl Body {
    /// Copy a template into the arena as a detached subtree
    pub(crate) fn insert_template(&mut self, template: &PartTemplate) -> BodyPartId {
        let id = self.next_id();
        let mut part = template.part.clone();
        part.id = id;
        part.parent = None;
        part.children = Vec::new();
        part.equipped = None;
        part.cybernetics = None;
        part.default_behavior = None;
        self.parts.insert(id, part);

        for child in &template.children {
            let child_id = self.insert_template(child);
            self.link(id, child_id, None);
        }
        id
    }

    /// Instantiate `template` under `parent`
    pub fn graft(
        &mut self,
        parent: BodyPartId,
        template: &PartTemplate,
        position: Option<i32>,
    ) -> Result<BodyPartId, BodyError> {
        if !self.contains(parent) {
            return Err(BodyError::PartNotFound(parent));
        }
        let id = self.insert_template(template);
        self.link(parent, id, position);
        Ok(id)
    }

    /// Attach a detached part under `parent`.
    ///
    /// With no position the child goes after its last sibling; a taken
    /// position shifts that sibling and every later one up by one.
    pub fn add_child(
        &mut self,
        parent: BodyPartId,
        child: BodyPartId,
        position: Option<i32>,
    ) -> Result<(), BodyError> {
        if !self.contains(parent) {
            return Err(BodyError::PartNotFound(parent));
        }
        let Some(part) = self.part(child) else {
            return Err(BodyError::PartNotFound(child));
        };
        if child == self.root {
            return Err(BodyError::RootPart);
        }
        if part.parent.is_some() {
            return Err(BodyError::AlreadyAttached(child));
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(BodyError::Cycle { parent, child });
        }
        self.link(parent, child, position);
        Ok(())
    }

    fn link(&mut self, parent: BodyPartId, child: BodyPartId, position: Option<i32>) {
        let siblings = match self.part(parent) {
            Some(p) => p.children.clone(),
            None => return,
        };
        let position = match position {
            None => siblings
                .iter()
                .filter_map(|id| self.sibling_position(id))
                .max()
                .map_or(0, |max| max + 1),
            Some(wanted) => {
                let taken = siblings
                    .iter()
                    .any(|id| self.sibling_position(id) == Some(wanted));
                if taken {
                    for id in &siblings {
                        if let Some(sibling) = self.parts.get_mut(id) {
                            if sibling.position >= wanted {
                                sibling.position += 1;
                            }
                        }
                    }
                }
                wanted
            }
        };

        if let Some(part) = self.parts.get_mut(&child) {
            part.parent = Some(parent);
            part.position = position;
        }
        let index = siblings
            .iter()
            .position(|id| self.sibling_position(id).map_or(false, |p| p > position))
            .unwrap_or(siblings.len());
        if let Some(parent_part) = self.parts.get_mut(&parent) {
            parent_part.children.insert(index, child);
        }
    }

    fn sibling_position(&self, id: &BodyPartId) -> Option<i32> {
        self.part(*id).map(|p| p.position)
    }

    /// Unlink `child` from `parent`, leaving it detached in the arena
    pub fn remove_child(&mut self, parent: BodyPartId, child: BodyPartId) -> Result<(), BodyError> {
        let parent_part = self
            .parts
            .get_mut(&parent)
            .ok_or(BodyError::PartNotFound(parent))?;
        let index = parent_part
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(BodyError::NotAChild { parent, child })?;
        parent_part.children.remove(index);
        if let Some(part) = self.parts.get_mut(&child) {
            part.parent = None;
        }
        Ok(())
    }

    /// Unlink a part from whatever parent it has, returning that parent
    pub(crate) fn detach(&mut self, id: BodyPartId) -> Result<BodyPartId, BodyError> {
        let parent = self
            .part(id)
            .ok_or(BodyError::PartNotFound(id))?
            .parent
            .ok_or(BodyError::NotAttached(id))?;
        self.remove_child(parent, id)?;
        Ok(parent)
    }

    /// Remove a subtree from the arena entirely
    pub(crate) fn destroy_subtree(&mut self, id: BodyPartId) -> Vec<BodyPart> {
        if id == self.root {
            return Vec::new();
        }
        if let Some(parent) = self.part(id).and_then(|p| p.parent) {
            let _ = self.remove_child(parent, id);
        }
        self.flatten(id)
            .into_iter()
            .filter_map(|pid| self.parts.remove(&pid))
            .collect()
    }

    /// Whether `ancestor` lies on the parent chain of `id`
    pub fn is_ancestor(&self, ancestor: BodyPartId, id: BodyPartId) -> bool {
        let mut current = self.part(id).and_then(|p| p.parent);
        while let Some(pid) = current {
            if pid == ancestor {
                return true;
            }
            current = self.part(pid).and_then(|p| p.parent);
        }
        false
    }

    /// Whether the parent chain of `id` reaches the root
    pub fn is_attached(&self, id: BodyPartId) -> bool {
        id == self.root || (self.contains(id) && self.is_ancestor(self.root, id))
    }

    /// Pre-order walk of the subtree under `start`, children in position order
    pub fn flatten(&self, start: BodyPartId) -> Vec<BodyPartId> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if let Some(part) = self.part(id) {
                order.push(id);
                stack.extend(part.children.iter().rev());
            }
        }
        order
    }

    /// Every attached part in tree order
    pub fn attached_parts(&self) -> impl Iterator<Item = &BodyPart> + '_ {
        self.flatten(self.root)
            .into_iter()
            .filter_map(move |id| self.part(id))
    }

    pub fn find_by_type(&self, start: BodyPartId, part_type: &str) -> Option<BodyPartId> {
        self.flatten(start)
            .into_iter()
            .find(|&id| self.part(id).map_or(false, |p| p.is_type(part_type)))
    }

    pub fn find_all_by_type(&self, start: BodyPartId, part_type: &str) -> Vec<BodyPartId> {
        self.flatten(start)
            .into_iter()
            .filter(|&id| self.part(id).map_or(false, |p| p.is_type(part_type)))
            .collect()
    }

    /// Attached parts of a type
    pub fn count_by_type(&self, part_type: &str) -> usize {
        self.attached_parts().filter(|p| p.is_type(part_type)).count()
    }

    /// First empty, attached, equippable part of a type
    pub fn find_free_slot(&self, part_type: &str, laterality: Laterality) -> Option<BodyPartId> {
        self.attached_parts()
            .find(|p| {
                p.is_type(part_type)
                    && !p.is_abstract()
                    && p.equipped.is_none()
                    && (laterality.is_none() || p.laterality.matches(laterality))
            })
            .map(|p| p.id)
    }

    /// Attached parts of a type that can hold equipment, in tree order
    pub fn equippable_slots(&self, part_type: &str) -> Vec<BodyPartId> {
        self.attached_parts()
            .filter(|p| p.is_type(part_type) && !p.is_abstract())
            .map(|p| p.id)
            .collect()
    }

    /// Whether the attached tree, excluding `id` itself, satisfies the
    /// part's dependency declarations
    pub fn dependencies_met(&self, id: BodyPartId) -> bool {
        let Some(part) = self.part(id) else {
            return false;
        };
        let others = || self.attached_parts().filter(move |p| p.id != id);

        if let Some(support) = &part.depends_on {
            if !others().any(|p| p.supports_dependent.as_deref() == Some(support.as_str())) {
                return false;
            }
        }
        if let Some(required) = &part.requires_type {
            let laterality = part.requires_laterality;
            let found = others().any(|p| {
                p.is_type(required) && (laterality.is_none() || p.laterality.matches(laterality))
            });
            if !found {
                return false;
            }
        }
        true
    }

    pub fn is_unsupported(&self, id: BodyPartId) -> bool {
        self.part(id).map_or(false, BodyPart::has_dependency) && !self.dependencies_met(id)
    }

    fn recalculate_first(&mut self, slot: fn(&BodyPart) -> Option<ItemId>, flag: PartFlags) {
        for part in self.parts.values_mut() {
            part.flags.remove(flag);
        }
        let mut seen = HashSet::new();
        for id in self.flatten(self.root) {
            if let Some(part) = self.parts.get_mut(&id) {
                if let Some(item) = slot(part) {
                    if seen.insert(item) {
                        part.flags.insert(flag);
                    }
                }
            }
        }
    }

    pub fn recalculate_first_equipped(&mut self) {
        self.recalculate_first(|p| p.equipped, PartFlags::FIRST_SLOT_FOR_EQUIPPED);
    }

    pub fn recalculate_first_cybernetics(&mut self) {
        self.recalculate_first(|p| p.cybernetics, PartFlags::FIRST_SLOT_FOR_CYBERNETICS);
    }

    pub fn recalculate_first_default_behavior(&mut self) {
        self.recalculate_first(
            |p| p.default_behavior,
            PartFlags::FIRST_SLOT_FOR_DEFAULT_BEHAVIOR,
        );
    }

    pub fn recalculate_first_slots(&mut self) {
        self.recalculate_first_equipped();
        self.recalculate_first_cybernetics();
        self.recalculate_first_default_behavior();
    }

    /// Visit each distinct equipped item once, at its first slot
    pub fn for_each_equipped<F: FnMut(&BodyPart, ItemId)>(&self, mut f: F) {
        for part in self.attached_parts() {
            if let Some(item) = part.equipped {
                if part.has(PartFlags::FIRST_SLOT_FOR_EQUIPPED) {
                    f(part, item);
                }
            }
        }
    }

    /// Visit each distinct natural weapon once, at its first slot
    pub fn for_each_default_behavior<F: FnMut(&BodyPart, ItemId)>(&self, mut f: F) {
        for part in self.attached_parts() {
            if let Some(item) = part.default_behavior {
                if part.has(PartFlags::FIRST_SLOT_FOR_DEFAULT_BEHAVIOR) {
                    f(part, item);
                }
            }
        }
    }

    /// Distinct equipped items in tree order
    pub fn equipped_items(&self) -> Vec<ItemId> {
        let mut items = Vec::new();
        for part in self.attached_parts() {
            if let Some(item) = part.equipped {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
        }
        items
    }

    /// Distinct implants in tree order
    pub fn cybernetic_items(&self) -> Vec<ItemId> {
        let mut items = Vec::new();
        for part in self.attached_parts() {
            if let Some(item) = part.cybernetics {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
        }
        items
    }

    /// Attached parts that hold `item` as equipment
    pub fn parts_holding(&self, item: ItemId) -> Vec<BodyPartId> {
        self.attached_parts()
            .filter(|p| p.equipped == Some(item))
            .map(|p| p.id)
            .collect()
    }

    /// Clear `item` from every part holding it, returning those parts
    pub fn clear_item(&mut self, item: ItemId) -> Vec<BodyPartId> {
        let mut cleared: Vec<BodyPartId> = self
            .parts
            .values_mut()
            .filter(|p| p.equipped == Some(item))
            .map(|p| {
                p.equipped = None;
                p.id
            })
            .collect();
        cleared.sort();
        if !cleared.is_empty() {
            self.recalculate_first_equipped();
        }
        cleared
    }

    /// Put `item` on every listed part. The caller has already cleared them.
    pub(crate) fn set_equipped(&mut self, parts: &[BodyPartId], item: ItemId) {
        for id in parts {
            if let Some(part) = self.parts.get_mut(id) {
                part.equipped = Some(item);
            }
        }
        self.recalculate_first_equipped();
    }

    /// The attached part currently flagged as primary
    pub fn primary_part(&self) -> Option<BodyPartId> {
        self.attached_parts().find(|p| p.is_primary()).map(|p| p.id)
    }

    /// Make `id` the creature's chosen primary limb
    pub fn set_primary(&mut self, id: BodyPartId) -> Result<(), BodyError> {
        let part = self.part(id).ok_or(BodyError::PartNotFound(id))?;
        if part.is_abstract() {
            return Err(BodyError::AbstractPart(id));
        }
        if !self.is_attached(id) {
            return Err(BodyError::NotAttached(id));
        }
        for part in self.parts.values_mut() {
            part.flags.remove(PartFlags::PRIMARY | PartFlags::PREFERRED_PRIMARY);
        }
        if let Some(part) = self.parts.get_mut(&id) {
            part.flags.insert(PartFlags::PRIMARY | PartFlags::PREFERRED_PRIMARY);
        }
        Ok(())
    }

    /// Pick a new primary limb if none is attached
    pub(crate) fn regenerate_primary(&mut self) -> Option<BodyPartId> {
        if let Some(primary) = self.primary_part() {
            return Some(primary);
        }
        let candidates: Vec<&BodyPart> = self.attached_parts().filter(|p| !p.is_abstract()).collect();
        let chosen = candidates
            .iter()
            .find(|p| p.has(PartFlags::PREFERRED_PRIMARY))
            .or_else(|| candidates.iter().find(|p| p.has(PartFlags::DEFAULT_PRIMARY)))
            .or_else(|| candidates.iter().find(|p| p.is_type("Hand")))
            .map(|p| p.id)?;
        if let Some(part) = self.parts.get_mut(&chosen) {
            part.flags.insert(PartFlags::PRIMARY);
        }
        Some(chosen)
    }

    pub fn implant_cybernetic(&mut self, id: BodyPartId, item: ItemId) -> Result<(), BodyError> {
        let part = self.part(id).ok_or(BodyError::PartNotFound(id))?;
        if part.is_abstract() {
            return Err(BodyError::AbstractPart(id));
        }
        if part.cybernetics.is_some() {
            return Err(BodyError::SlotOccupied(id));
        }
        if !self.is_attached(id) {
            return Err(BodyError::NotAttached(id));
        }
        if let Some(part) = self.parts.get_mut(&id) {
            part.cybernetics = Some(item);
        }
        self.recalculate_first_cybernetics();
        Ok(())
    }

    pub fn remove_cybernetic(&mut self, id: BodyPartId) -> Result<ItemId, BodyError> {
        let part = self.parts.get_mut(&id).ok_or(BodyError::PartNotFound(id))?;
        let item = part.cybernetics.take().ok_or(BodyError::SlotEmpty(id))?;
        self.recalculate_first_cybernetics();
        Ok(item)
    }

    /// Check the arena links are consistent
    pub fn validate(&self) -> Result<(), BodyError> {
        let invalid = |msg: String| Err(BodyError::Invalid(msg));

        let Some(root) = self.part(self.root) else {
            return invalid(format!("root {} is missing", self.root));
        };
        if root.parent.is_some() {
            return invalid(format!("root {} has a parent", self.root));
        }

        let mut visited = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return invalid(format!("{} is reachable twice", id));
            }
            let Some(part) = self.part(id) else {
                return invalid(format!("{} is linked but missing", id));
            };
            if part.id != id {
                return invalid(format!("{} is stored under {}", part.id, id));
            }
            let mut last_position = None;
            for child in &part.children {
                let Some(child_part) = self.part(*child) else {
                    return invalid(format!("child {} of {} is missing", child, id));
                };
                if child_part.parent != Some(id) {
                    return invalid(format!("{} does not point back to {}", child, id));
                }
                if last_position.map_or(false, |last| child_part.position <= last) {
                    return invalid(format!("children of {} are out of order", id));
                }
                last_position = Some(child_part.position);
                stack.push(*child);
            }
        }

        for record in &self.dismembered {
            match self.part(record.part) {
                None => return invalid(format!("severed {} is missing", record.part)),
                Some(part) if part.parent.is_some() => {
                    return invalid(format!("severed {} is still attached", record.part))
                }
                Some(_) => {}
            }
        }
        if self.parts.keys().any(|id| id.0 >= self.next_part_id) {
            return invalid("part ids exceed the allocator".to_string());
        }
        Ok(())
    }
}
