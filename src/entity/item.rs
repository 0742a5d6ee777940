//! Items, their combat capabilities and the item store
//!
//! Body parts never own items; they refer to them by `ItemId`. The store
//! owns every item that exists, whether carried, equipped or lying on the
//! ground.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dice::DiceExpr;
use crate::entity::StatKind;

/// Unique identifier for an item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item#{}", self.0)
    }
}

/// Body-part slots an item needs in order to be equipped
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRequirement {
    /// Body part type, e.g. "Hand"
    pub part_type: String,
    /// How many parts of that type the item occupies at once
    pub count: u8,
}

impl SlotRequirement {
    pub fn single(part_type: &str) -> Self {
        Self {
            part_type: part_type.to_string(),
            count: 1,
        }
    }

    pub fn multi(part_type: &str, count: u8) -> Self {
        Self {
            part_type: part_type.to_string(),
            count: count.max(1),
        }
    }
}

/// Melee weapon capability
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeleeWeapon {
    pub damage: DiceExpr,
    pub penetration_bonus: i32,
    pub hit_bonus: i32,
    /// Cap on the stat modifier added to PV; negative means uncapped
    pub max_strength_bonus: i32,
    /// Stat whose modifier feeds PV
    pub stat: StatKind,
}

impl MeleeWeapon {
    pub fn new(damage: DiceExpr) -> Self {
        Self {
            damage,
            penetration_bonus: 0,
            hit_bonus: 0,
            max_strength_bonus: -1,
            stat: StatKind::Strength,
        }
    }

    pub fn with_penetration(mut self, bonus: i32) -> Self {
        self.penetration_bonus = bonus;
        self
    }

    pub fn with_hit_bonus(mut self, bonus: i32) -> Self {
        self.hit_bonus = bonus;
        self
    }

    pub fn with_max_strength_bonus(mut self, cap: i32) -> Self {
        self.max_strength_bonus = cap;
        self
    }
}

/// Armor capability
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorStats {
    pub av: i32,
    pub dv: i32,
}

impl ArmorStats {
    pub fn new(av: i32, dv: i32) -> Self {
        Self { av, dv }
    }
}

/// An item and its capabilities
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub blueprint: String,
    pub slot: Option<SlotRequirement>,
    pub weapon: Option<MeleeWeapon>,
    pub armor: Option<ArmorStats>,
    /// Natural weapon living in a part's default-behavior slot
    pub natural: bool,
}

impl Item {
    pub fn new(name: &str, blueprint: &str) -> Self {
        Self {
            name: name.to_string(),
            blueprint: blueprint.to_string(),
            slot: None,
            weapon: None,
            armor: None,
            natural: false,
        }
    }

    pub fn with_slot(mut self, slot: SlotRequirement) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn with_weapon(mut self, weapon: MeleeWeapon) -> Self {
        self.weapon = Some(weapon);
        self
    }

    pub fn with_armor(mut self, armor: ArmorStats) -> Self {
        self.armor = Some(armor);
        self
    }

    pub fn natural(mut self) -> Self {
        self.natural = true;
        self
    }

    /// The physical remains of a dismembered part
    pub fn severed_limb(owner: &str, part_name: &str) -> Self {
        Item::new(&format!("{}'s severed {}", owner, part_name), SEVERED_LIMB)
    }

    pub fn is_equippable(&self) -> bool {
        self.slot.is_some()
    }
}

/// Blueprint name given to severed-limb items
pub const SEVERED_LIMB: &str = "SeveredLimb";

fn dice(count: u32, sides: u32, modifier: i32) -> DiceExpr {
    DiceExpr::new(count, sides, modifier)
}

fn default_fist() -> Item {
    Item::new("fist", "DefaultFist")
        .natural()
        .with_weapon(MeleeWeapon::new(dice(1, 2, 0)))
}

fn jaws() -> Item {
    Item::new("jaws", "Jaws")
        .natural()
        .with_weapon(MeleeWeapon::new(dice(1, 4, 0)).with_penetration(1))
}

fn mandibles() -> Item {
    Item::new("mandibles", "Mandibles")
        .natural()
        .with_weapon(MeleeWeapon::new(dice(1, 3, 0)).with_penetration(1))
}

fn slam() -> Item {
    Item::new("slam", "Slam")
        .natural()
        .with_weapon(MeleeWeapon::new(dice(1, 3, 0)))
}

fn dagger() -> Item {
    Item::new("dagger", "Dagger")
        .with_slot(SlotRequirement::single("Hand"))
        .with_weapon(
            MeleeWeapon::new(dice(1, 4, 0))
                .with_penetration(1)
                .with_hit_bonus(1)
                .with_max_strength_bonus(2),
        )
}

fn long_sword() -> Item {
    Item::new("long sword", "Long Sword")
        .with_slot(SlotRequirement::single("Hand"))
        .with_weapon(MeleeWeapon::new(dice(1, 8, 0)).with_max_strength_bonus(3))
}

fn two_handed_axe() -> Item {
    Item::new("two-handed axe", "Two-Handed Axe")
        .with_slot(SlotRequirement::multi("Hand", 2))
        .with_weapon(MeleeWeapon::new(dice(2, 6, 0)).with_penetration(1))
}

fn buckler() -> Item {
    Item::new("buckler", "Buckler")
        .with_slot(SlotRequirement::single("Hand"))
        .with_armor(ArmorStats::new(1, 1))
}

fn leather_armor() -> Item {
    Item::new("leather armor", "Leather Armor")
        .with_slot(SlotRequirement::single("Body"))
        .with_armor(ArmorStats::new(2, 0))
}

fn steel_helm() -> Item {
    Item::new("steel helm", "Steel Helm")
        .with_slot(SlotRequirement::single("Head"))
        .with_armor(ArmorStats::new(1, 0))
}

fn gloves() -> Item {
    Item::new("leather gloves", "Gloves")
        .with_slot(SlotRequirement::single("Hands"))
        .with_armor(ArmorStats::new(1, 0))
}

fn boots() -> Item {
    Item::new("leather boots", "Boots")
        .with_slot(SlotRequirement::single("Feet"))
        .with_armor(ArmorStats::new(1, 0))
}

fn cloak() -> Item {
    Item::new("cloak", "Cloak")
        .with_slot(SlotRequirement::single("Back"))
        .with_armor(ArmorStats::new(0, 1))
}

/// Constructor for a named item blueprint
pub type ItemFactory = fn() -> Item;

/// Every item blueprint that can be instantiated by name
pub const ITEM_BLUEPRINTS: &[(&str, ItemFactory)] = &[
    ("DefaultFist", default_fist),
    ("Jaws", jaws),
    ("Mandibles", mandibles),
    ("Slam", slam),
    ("Dagger", dagger),
    ("Long Sword", long_sword),
    ("Two-Handed Axe", two_handed_axe),
    ("Buckler", buckler),
    ("Leather Armor", leather_armor),
    ("Steel Helm", steel_helm),
    ("Gloves", gloves),
    ("Boots", boots),
    ("Cloak", cloak),
];

/// Look up and build an item blueprint
pub fn item_blueprint(name: &str) -> Option<Item> {
    ITEM_BLUEPRINTS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, factory)| factory())
}

/// Owner of every item in the world
#[derive(Clone, Debug, Default)]
pub struct ItemStore {
    items: HashMap<ItemId, Item>,
    next_id: u64,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, item: Item) -> ItemId {
        self.next_id += 1;
        let id = ItemId(self.next_id);
        self.items.insert(id, item);
        id
    }

    /// Instantiate a named blueprint
    pub fn spawn_blueprint(&mut self, name: &str) -> Option<ItemId> {
        item_blueprint(name).map(|item| self.spawn(item))
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    pub fn destroy(&mut self, id: ItemId) -> Option<Item> {
        self.items.remove(&id)
    }

    pub fn name_of(&self, id: ItemId) -> String {
        self.get(id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
