//! Spatial grid for creatures and dropped items

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{CreatureId, ItemId};

/// A grid cell coordinate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Anything that can occupy a cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Creature(CreatureId),
    Item(ItemId),
}

/// Bounded grid tracking which entities stand in which cell
#[derive(Clone, Debug)]
pub struct Zone {
    pub width: i32,
    pub height: i32,
    cells: HashMap<Cell, Vec<EntityRef>>,
    positions: HashMap<EntityRef, Cell>,
}

impl Zone {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: HashMap::new(),
            positions: HashMap::new(),
        }
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    pub fn get_entity_position(&self, entity: EntityRef) -> Option<Cell> {
        self.positions.get(&entity).copied()
    }

    /// Place an entity, moving it if it is already somewhere.
    /// Returns `false` for out-of-bounds cells.
    pub fn add_entity(&mut self, entity: EntityRef, x: i32, y: i32) -> bool {
        let cell = Cell::new(x, y);
        if !self.in_bounds(cell) {
            return false;
        }
        self.remove_entity(entity);
        self.cells.entry(cell).or_default().push(entity);
        self.positions.insert(entity, cell);
        true
    }

    pub fn remove_entity(&mut self, entity: EntityRef) -> Option<Cell> {
        let cell = self.positions.remove(&entity)?;
        if let Some(occupants) = self.cells.get_mut(&cell) {
            occupants.retain(|e| *e != entity);
            if occupants.is_empty() {
                self.cells.remove(&cell);
            }
        }
        Some(cell)
    }

    pub fn entities_at(&self, cell: Cell) -> &[EntityRef] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn items_at(&self, cell: Cell) -> Vec<ItemId> {
        self.entities_at(cell)
            .iter()
            .filter_map(|e| match e {
                EntityRef::Item(id) => Some(*id),
                EntityRef::Creature(_) => None,
            })
            .collect()
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        self.positions.contains_key(&entity)
    }
}
