//! Body system module
//!
//! A body is an arena of parts addressed by `BodyPartId`, linked into a tree
//! by parent and child ids. Severed subtrees stay in the arena, detached,
//! so they can be regrown later.

pub mod maintenance;
pub mod parts;
pub mod persist;
pub mod templates;
pub mod tree;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use maintenance::{BodyContext, DismemberReport};
pub use parts::{BodyPart, BodyPartId, DismemberedRecord, PartCategory, PartFlags, PartTemplate};
pub use persist::{load_body, save_body, PersistError};
pub use templates::{build_anatomy, ImpliedPartRule, ANATOMIES};

/// Errors raised by body-tree operations. An `Err` never leaves the body
/// partially modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BodyError {
    #[error("body part {0} does not exist")]
    PartNotFound(BodyPartId),
    #[error("the root part cannot be removed")]
    RootPart,
    #[error("body part {0} is not attached to the body")]
    NotAttached(BodyPartId),
    #[error("body part {0} already has a parent")]
    AlreadyAttached(BodyPartId),
    #[error("body part {child} is not a child of {parent}")]
    NotAChild {
        parent: BodyPartId,
        child: BodyPartId,
    },
    #[error("attaching {child} under {parent} would form a cycle")]
    Cycle {
        parent: BodyPartId,
        child: BodyPartId,
    },
    #[error("body part {0} is abstract")]
    AbstractPart(BodyPartId),
    #[error("dismemberment of {0} was cancelled")]
    Cancelled(BodyPartId),
    #[error("body part {0} already holds an implant")]
    SlotOccupied(BodyPartId),
    #[error("body part {0} holds no implant")]
    SlotEmpty(BodyPartId),
    #[error("malformed body: {0}")]
    Invalid(String),
}

/// Complete body structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    /// Anatomy the body was built from
    pub plan: String,
    pub(crate) root: BodyPartId,
    pub(crate) parts: HashMap<BodyPartId, BodyPart>,
    pub(crate) dismembered: Vec<DismemberedRecord>,
    pub(crate) implied_rules: Vec<ImpliedPartRule>,
    /// Speed penalty currently applied for lost mobility
    pub(crate) applied_mobility_penalty: i32,
    next_part_id: u32,
}

impl Body {
    /// Build a body whose root is the top node of `template`
    pub fn from_template(plan: &str, template: &PartTemplate) -> Self {
        let mut body = Self {
            plan: plan.to_string(),
            root: BodyPartId(0),
            parts: HashMap::new(),
            dismembered: Vec::new(),
            implied_rules: Vec::new(),
            applied_mobility_penalty: 0,
            next_part_id: 0,
        };
        body.root = body.insert_template(template);
        body
    }

    pub fn with_implied_rule(mut self, rule: ImpliedPartRule) -> Self {
        self.implied_rules.push(rule);
        self
    }

    pub(crate) fn next_id(&mut self) -> BodyPartId {
        let id = BodyPartId::new(self.next_part_id);
        self.next_part_id += 1;
        id
    }

    pub fn root(&self) -> BodyPartId {
        self.root
    }

    pub fn part(&self, id: BodyPartId) -> Option<&BodyPart> {
        self.parts.get(&id)
    }

    pub fn part_mut(&mut self, id: BodyPartId) -> Option<&mut BodyPart> {
        self.parts.get_mut(&id)
    }

    /// Whether the arena holds `id`, attached or not
    pub fn contains(&self, id: BodyPartId) -> bool {
        self.parts.contains_key(&id)
    }

    /// Parts currently severed and waiting to be regrown
    pub fn dismembered(&self) -> &[DismemberedRecord] {
        &self.dismembered
    }

    pub fn implied_rules(&self) -> &[ImpliedPartRule] {
        &self.implied_rules
    }

    pub fn applied_mobility_penalty(&self) -> i32 {
        self.applied_mobility_penalty
    }

    /// Number of parts in the arena, attached or not
    pub fn arena_len(&self) -> usize {
        self.parts.len()
    }

    pub fn name_of(&self, id: BodyPartId) -> String {
        self.part(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}
