//! The world: creatures, items, the zone they share and the event bus
//!
//! Body operations need disjoint borrows of a creature and of the world
//! around it; `World::with_body` hands them out as a `BodyContext`.

use std::collections::HashMap;

use thiserror::Error;

use crate::body::{build_anatomy, Body, BodyContext, BodyError, BodyPartId, DismemberReport};
use crate::entity::{Creature, CreatureId, ItemId, ItemStore, Stats};
use crate::events::{EventBus, GameEvent};
use crate::messages::MessageLog;
use crate::params::CombatParams;
use crate::zone::{Cell, EntityRef, Zone};

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("no creature with id {0}")]
    CreatureNotFound(CreatureId),
    #[error("no item with id {0}")]
    ItemNotFound(ItemId),
    #[error("unknown anatomy \"{0}\"")]
    UnknownAnatomy(String),
    #[error("cell {0} is outside the zone")]
    OutOfBounds(Cell),
    #[error(transparent)]
    Body(#[from] BodyError),
}

pub struct World {
    pub creatures: HashMap<CreatureId, Creature>,
    pub items: ItemStore,
    pub zone: Zone,
    pub events: EventBus,
    pub log: MessageLog,
    pub params: CombatParams,
    next_creature_id: u64,
}

impl World {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            creatures: HashMap::new(),
            items: ItemStore::new(),
            zone: Zone::new(width, height),
            events: EventBus::new(),
            log: MessageLog::new(),
            params: CombatParams::default(),
            next_creature_id: 0,
        }
    }

    pub fn with_params(mut self, params: CombatParams) -> Self {
        self.params = params;
        self
    }

    /// Build a creature from a named anatomy, optionally placing it in the zone
    pub fn spawn_creature(
        &mut self,
        name: &str,
        anatomy: &str,
        stats: Stats,
        cell: Option<Cell>,
    ) -> Result<CreatureId, WorldError> {
        let body =
            build_anatomy(anatomy).ok_or_else(|| WorldError::UnknownAnatomy(anatomy.to_string()))?;
        self.spawn_with_body(name, body, stats, cell)
    }

    pub fn spawn_with_body(
        &mut self,
        name: &str,
        body: Body,
        stats: Stats,
        cell: Option<Cell>,
    ) -> Result<CreatureId, WorldError> {
        if let Some(cell) = cell {
            if !self.zone.in_bounds(cell) {
                return Err(WorldError::OutOfBounds(cell));
            }
        }
        self.next_creature_id += 1;
        let id = CreatureId(self.next_creature_id);
        self.creatures.insert(id, Creature::new(id, name, stats, body));
        if let Some(cell) = cell {
            self.zone.add_entity(EntityRef::Creature(id), cell.x, cell.y);
        }
        self.update_body_parts(id)?;
        tracing::debug!(creature = %id, name, "creature spawned");
        Ok(id)
    }

    pub fn creature(&self, id: CreatureId) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    pub fn creature_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        self.creatures.get_mut(&id)
    }

    pub fn position_of(&self, id: CreatureId) -> Option<Cell> {
        self.zone.get_entity_position(EntityRef::Creature(id))
    }

    pub fn name_of(&self, id: CreatureId) -> String {
        self.creature(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Put an item into a creature's inventory, picking it up off the
    /// ground if it lies there
    pub fn give_item(&mut self, creature: CreatureId, item: ItemId) -> Result<(), WorldError> {
        if self.items.get(item).is_none() {
            return Err(WorldError::ItemNotFound(item));
        }
        let holder = self
            .creatures
            .get_mut(&creature)
            .ok_or(WorldError::CreatureNotFound(creature))?;
        self.zone.remove_entity(EntityRef::Item(item));
        if !holder.carries(item) {
            holder.inventory.push(item);
        }
        Ok(())
    }

    /// Run `f` with the creature's body and a context over everything else
    pub fn with_body<R>(
        &mut self,
        id: CreatureId,
        f: impl FnOnce(&mut Body, &mut BodyContext<'_>) -> R,
    ) -> Result<R, WorldError> {
        let World {
            creatures,
            items,
            zone,
            events,
            log,
            params,
            ..
        } = self;
        let creature = creatures
            .get_mut(&id)
            .ok_or(WorldError::CreatureNotFound(id))?;
        let Creature {
            name,
            stats,
            body,
            inventory,
            ..
        } = creature;
        let position = zone.get_entity_position(EntityRef::Creature(id));
        let mut ctx = BodyContext {
            owner: id,
            owner_name: name.as_str(),
            position,
            stats,
            inventory,
            items,
            zone: Some(zone),
            events,
            log,
            params,
        };
        Ok(f(body, &mut ctx))
    }

    /// Sever a part. Losing a mortal part kills the creature, credited
    /// to `by` when given.
    pub fn dismember(
        &mut self,
        id: CreatureId,
        part: BodyPartId,
        by: Option<CreatureId>,
    ) -> Result<DismemberReport, WorldError> {
        let report = self.with_body(id, |body, ctx| body.dismember(part, ctx))??;
        if report.mortal {
            self.kill(id, by)?;
        } else {
            self.update_body_parts(id)?;
        }
        Ok(report)
    }

    /// Regrow one severed part and bring the body back up to date
    pub fn regenerate_limb(
        &mut self,
        id: CreatureId,
        part_type: Option<&str>,
    ) -> Result<Option<BodyPartId>, WorldError> {
        self.with_body(id, |body, ctx| {
            let regrown = body.regenerate_limb(part_type, ctx);
            if regrown.is_some() {
                body.update_body_parts(ctx);
            }
            regrown
        })
    }

    pub fn update_body_parts(&mut self, id: CreatureId) -> Result<(), WorldError> {
        self.with_body(id, |body, ctx| body.update_body_parts(ctx))
    }

    /// Deal damage through the damage event. Returns whether the target died.
    pub fn apply_damage(
        &mut self,
        target: CreatureId,
        amount: i32,
        attacker: Option<CreatureId>,
    ) -> Result<bool, WorldError> {
        let event = GameEvent::TakeDamage {
            target,
            attacker,
            amount,
        };
        if !self.events.fire(&event) {
            return Ok(false);
        }
        let creature = self
            .creatures
            .get_mut(&target)
            .ok_or(WorldError::CreatureNotFound(target))?;
        creature.stats.take_damage(amount);
        if creature.stats.hitpoints() <= 0 && creature.alive {
            self.kill(target, attacker)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Kill a creature: its equipment and inventory fall where it stood,
    /// the death event fires and it leaves the zone
    pub fn kill(&mut self, id: CreatureId, killer: Option<CreatureId>) -> Result<(), WorldError> {
        let killer_name = killer.map(|k| self.name_of(k));
        let World {
            creatures,
            zone,
            events,
            log,
            ..
        } = self;
        let creature = creatures
            .get_mut(&id)
            .ok_or(WorldError::CreatureNotFound(id))?;
        if !creature.alive {
            return Ok(());
        }
        creature.alive = false;

        if let Some(cell) = zone.get_entity_position(EntityRef::Creature(id)) {
            let equipped = creature.body.equipped_items();
            for item in &equipped {
                creature.body.clear_item(*item);
            }
            let carried = std::mem::take(&mut creature.inventory);
            for item in equipped.into_iter().chain(carried) {
                zone.add_entity(EntityRef::Item(item), cell.x, cell.y);
            }
        }

        events.fire(&GameEvent::Died {
            creature: id,
            killer,
        });
        zone.remove_entity(EntityRef::Creature(id));
        match killer_name {
            Some(killer) => log.log(format!("{} is killed by {}!", creature.name, killer)),
            None => log.log(format!("{} dies!", creature.name)),
        }
        tracing::info!(creature = %id, "creature died");
        Ok(())
    }
}
