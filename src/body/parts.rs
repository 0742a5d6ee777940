//! Body part definitions and related types
//!
//! Defines the tree node representing one anatomical unit, its flag set,
//! its material category, and the template used to build subtrees.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::entity::ItemId;
use crate::laterality::Laterality;

/// Unique identifier for a body part within a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyPartId(pub u32);

impl BodyPartId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for BodyPartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Part#{}", self.0)
    }
}

/// Independent boolean properties of a body part
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartFlags(u32);

impl PartFlags {
    pub const NONE: Self = Self(0);
    /// Primary limb assigned by the anatomy
    pub const DEFAULT_PRIMARY: Self = Self(1);
    /// Primary limb chosen by the creature
    pub const PREFERRED_PRIMARY: Self = Self(1 << 1);
    /// Current primary limb
    pub const PRIMARY: Self = Self(1 << 2);
    /// Part of the creature's original anatomy
    pub const NATIVE: Self = Self(1 << 3);
    /// Sticks out of the body and can be cut off
    pub const APPENDAGE: Self = Self(1 << 4);
    /// Cannot be separated from its parent
    pub const INTEGRAL: Self = Self(1 << 5);
    /// Losing it kills the creature
    pub const MORTAL: Self = Self(1 << 6);
    /// Not a physical part: never severed, equipped or hit
    pub const ABSTRACT: Self = Self(1 << 7);
    /// Granted by a mutation or implant rather than grown
    pub const EXTRINSIC: Self = Self(1 << 8);
    /// Added at runtime by a manager
    pub const DYNAMIC: Self = Self(1 << 9);
    pub const PLURAL: Self = Self(1 << 10);
    pub const MASS: Self = Self(1 << 11);
    pub const CONTACT: Self = Self(1 << 12);
    pub const IGNORE_POSITION: Self = Self(1 << 13);
    /// First node, in tree order, holding its equipped item
    pub const FIRST_SLOT_FOR_EQUIPPED: Self = Self(1 << 14);
    /// First node, in tree order, holding its implant
    pub const FIRST_SLOT_FOR_CYBERNETICS: Self = Self(1 << 15);
    /// First node, in tree order, holding its natural weapon
    pub const FIRST_SLOT_FOR_DEFAULT_BEHAVIOR: Self = Self(1 << 16);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, flag: PartFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn intersects(self, flags: PartFlags) -> bool {
        self.0 & flags.0 != 0
    }

    pub fn insert(&mut self, flag: PartFlags) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: PartFlags) {
        self.0 &= !flag.0;
    }

    pub fn set(&mut self, flag: PartFlags, on: bool) {
        if on {
            self.insert(flag);
        } else {
            self.remove(flag);
        }
    }
}

impl BitOr for PartFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PartFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Material a body part is made of
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartCategory {
    #[default]
    Organic,
    Cybernetic,
    Mechanical,
    Chitinous,
    Ethereal,
}

impl PartCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Organic => "organic",
            Self::Cybernetic => "cybernetic",
            Self::Mechanical => "mechanical",
            Self::Chitinous => "chitinous",
            Self::Ethereal => "ethereal",
        }
    }
}

/// A single node of the body tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPart {
    pub id: BodyPartId,
    /// Category string, e.g. "Hand"
    pub part_type: String,
    /// Specialised form of the type, e.g. "Claw" for a clawed hand
    pub variant_type: Option<String>,
    /// Display name, e.g. "left hand"
    pub name: String,
    pub flags: PartFlags,
    pub laterality: Laterality,

    // Dependencies
    /// Name under which this part supports dependents
    pub supports_dependent: Option<String>,
    /// Support name this part needs somewhere in the tree
    pub depends_on: Option<String>,
    /// Part type that must exist elsewhere in the tree
    pub requires_type: Option<String>,
    pub requires_laterality: Laterality,

    /// Owning subsystem of a dynamically added part
    pub manager: Option<String>,
    pub category: PartCategory,
    pub mobility: i32,
    pub target_weight: i32,
    /// Order among siblings
    pub position: i32,
    pub default_behavior_blueprint: Option<String>,

    // References to items, never ownership
    pub equipped: Option<ItemId>,
    pub cybernetics: Option<ItemId>,
    pub default_behavior: Option<ItemId>,

    pub parent: Option<BodyPartId>,
    pub children: Vec<BodyPartId>,
}

impl BodyPart {
    /// Create a native part; its name is the laterality-qualified type
    pub fn new(part_type: &str, laterality: Laterality) -> Self {
        Self {
            id: BodyPartId(0),
            part_type: part_type.to_string(),
            variant_type: None,
            name: laterality.qualify(&part_type.to_lowercase()),
            flags: PartFlags::NATIVE,
            laterality,
            supports_dependent: None,
            depends_on: None,
            requires_type: None,
            requires_laterality: Laterality::NONE,
            manager: None,
            category: PartCategory::Organic,
            mobility: 0,
            target_weight: 0,
            position: 0,
            default_behavior_blueprint: None,
            equipped: None,
            cybernetics: None,
            default_behavior: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_variant(mut self, variant: &str) -> Self {
        self.variant_type = Some(variant.to_string());
        self
    }

    pub fn with_flags(mut self, flags: PartFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_category(mut self, category: PartCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_mobility(mut self, mobility: i32) -> Self {
        self.mobility = mobility;
        self
    }

    pub fn with_target_weight(mut self, weight: i32) -> Self {
        self.target_weight = weight;
        self
    }

    pub fn supporting(mut self, support: &str) -> Self {
        self.supports_dependent = Some(support.to_string());
        self
    }

    pub fn depending_on(mut self, support: &str) -> Self {
        self.depends_on = Some(support.to_string());
        self
    }

    pub fn requiring(mut self, part_type: &str, laterality: Laterality) -> Self {
        self.requires_type = Some(part_type.to_string());
        self.requires_laterality = laterality;
        self
    }

    pub fn with_default_behavior(mut self, blueprint: &str) -> Self {
        self.default_behavior_blueprint = Some(blueprint.to_string());
        self
    }

    pub fn has(&self, flag: PartFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_abstract(&self) -> bool {
        self.has(PartFlags::ABSTRACT)
    }

    pub fn is_mortal(&self) -> bool {
        self.has(PartFlags::MORTAL)
    }

    pub fn is_extrinsic(&self) -> bool {
        self.has(PartFlags::EXTRINSIC)
    }

    pub fn is_primary(&self) -> bool {
        self.has(PartFlags::PRIMARY)
    }

    /// Declares a `depends_on` or `requires_type` dependency
    pub fn has_dependency(&self) -> bool {
        self.depends_on.is_some() || self.requires_type.is_some()
    }

    /// Can be cut off directly
    pub fn is_severable(&self) -> bool {
        !self.is_abstract()
            && self.has(PartFlags::APPENDAGE)
            && !self.has(PartFlags::INTEGRAL)
            && !self.has_dependency()
    }

    /// Can be regrown on its own once lost
    pub fn is_regenerable(&self) -> bool {
        !self.is_abstract() && !self.has_dependency()
    }

    pub fn is_managed_by(&self, manager: &str) -> bool {
        self.manager.as_deref() == Some(manager)
    }

    pub fn is_type(&self, part_type: &str) -> bool {
        self.part_type == part_type
    }
}

/// A detached description of a part and its descendants, used by the
/// anatomy factory and by managers adding parts at runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartTemplate {
    pub part: BodyPart,
    pub children: Vec<PartTemplate>,
}

impl PartTemplate {
    pub fn new(part: BodyPart) -> Self {
        Self {
            part,
            children: Vec::new(),
        }
    }

    pub fn child(mut self, child: PartTemplate) -> Self {
        self.children.push(child);
        self
    }

    pub fn leaf(part: BodyPart) -> Self {
        Self::new(part)
    }

    /// Number of nodes in this template
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(PartTemplate::node_count).sum::<usize>()
    }

    /// Mark every node as granted from outside the creature's own anatomy
    pub fn extrinsic(mut self) -> Self {
        self.for_each_part(&mut |part| part.flags.insert(PartFlags::EXTRINSIC));
        self
    }

    /// Tag every node as owned by `manager` and added at runtime
    pub fn managed_by(mut self, manager: &str) -> Self {
        self.for_each_part(&mut |part| {
            part.manager = Some(manager.to_string());
            part.flags.remove(PartFlags::NATIVE);
            part.flags.insert(PartFlags::DYNAMIC);
        });
        self
    }

    fn for_each_part(&mut self, f: &mut dyn FnMut(&mut BodyPart)) {
        f(&mut self.part);
        for child in &mut self.children {
            child.for_each_part(f);
        }
    }
}

/// Where a dismembered part came from, so it can be put back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismemberedRecord {
    pub part: BodyPartId,
    pub original_parent: BodyPartId,
    pub original_position: i32,
}
