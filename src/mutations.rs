//! Mutations that reshape a body
//!
//! Each mutation grants a managed subtree tagged `Mutation::<key>`, so it
//! can later be removed without disturbing native anatomy.

use thiserror::Error;

use crate::body::{Body, BodyPart, BodyPartId, PartCategory, PartFlags, PartTemplate};
use crate::entity::CreatureId;
use crate::events::GameEvent;
use crate::laterality::Laterality;
use crate::world::{World, WorldError};

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("unknown mutation \"{0}\"")]
    Unknown(String),
    #[error("creature already has {0}")]
    AlreadyGranted(String),
    #[error("creature does not have {0}")]
    NotGranted(String),
    #[error(transparent)]
    World(#[from] WorldError),
}

/// A mutation's body hook
pub struct MutationDef {
    pub key: &'static str,
    /// Part type the granted parts attach under; the root when absent
    pub anchor: &'static str,
    pub build: fn() -> Vec<PartTemplate>,
}

fn extra_arms() -> Vec<PartTemplate> {
    [Laterality::LEFT, Laterality::RIGHT]
        .into_iter()
        .map(|side| {
            let laterality = Laterality::LOWER | side;
            let hand = BodyPart::new("Hand", laterality)
                .with_flags(PartFlags::APPENDAGE)
                .with_target_weight(1)
                .supporting(&laterality.qualify("hand"))
                .with_default_behavior("DefaultFist");
            PartTemplate::new(
                BodyPart::new("Arm", laterality)
                    .with_flags(PartFlags::APPENDAGE)
                    .with_target_weight(2),
            )
            .child(PartTemplate::leaf(hand))
        })
        .collect()
}

fn wings() -> Vec<PartTemplate> {
    vec![PartTemplate::leaf(
        BodyPart::new("Wings", Laterality::NONE)
            .with_flags(PartFlags::APPENDAGE | PartFlags::PLURAL)
            .with_mobility(2)
            .with_target_weight(2),
    )]
}

fn carapace() -> Vec<PartTemplate> {
    vec![PartTemplate::leaf(
        BodyPart::new("Carapace", Laterality::NONE)
            .with_category(PartCategory::Chitinous)
            .with_target_weight(2),
    )]
}

pub const MUTATIONS: &[MutationDef] = &[
    MutationDef {
        key: "MultipleArms",
        anchor: "Body",
        build: extra_arms,
    },
    MutationDef {
        key: "Wings",
        anchor: "Back",
        build: wings,
    },
    MutationDef {
        key: "Carapace",
        anchor: "Back",
        build: carapace,
    },
];

pub fn mutation(key: &str) -> Option<&'static MutationDef> {
    MUTATIONS.iter().find(|m| m.key == key)
}

pub fn manager_id(key: &str) -> String {
    format!("Mutation::{}", key)
}

/// Whether any part granted by `key` is on the body, attached or severed
pub fn has_mutation(body: &Body, key: &str) -> bool {
    let manager = manager_id(key);
    body.attached_parts().any(|p| p.is_managed_by(&manager))
        || body
            .dismembered()
            .iter()
            .any(|r| body.part(r.part).map_or(false, |p| p.is_managed_by(&manager)))
}

/// Grow the parts a mutation grants, returning the top of each new subtree
pub fn grant_mutation(
    world: &mut World,
    creature: CreatureId,
    key: &str,
) -> Result<Vec<BodyPartId>, MutationError> {
    let def = mutation(key).ok_or_else(|| MutationError::Unknown(key.to_string()))?;
    let host = world
        .creature(creature)
        .ok_or(WorldError::CreatureNotFound(creature))?;
    if has_mutation(&host.body, key) {
        return Err(MutationError::AlreadyGranted(key.to_string()));
    }

    let manager = manager_id(key);
    let added = world.with_body(creature, |body, ctx| {
        let anchor = body
            .find_by_type(body.root(), def.anchor)
            .unwrap_or_else(|| body.root());
        let mut added = Vec::new();
        for template in (def.build)() {
            match body.add_part_by_manager(anchor, &template.extrinsic(), &manager, ctx) {
                Ok(id) => added.push(id),
                Err(err) => tracing::warn!(%err, mutation = key, "could not graft mutation part"),
            }
        }
        ctx.events.fire(&GameEvent::MutationBodyRebuild {
            creature: ctx.owner,
            mutation: key.to_string(),
        });
        body.update_body_parts(ctx);
        added
    })?;
    tracing::debug!(%creature, mutation = key, parts = added.len(), "mutation granted");
    Ok(added)
}

/// Remove every part a mutation granted. Returns how many subtrees went.
pub fn revoke_mutation(
    world: &mut World,
    creature: CreatureId,
    key: &str,
) -> Result<usize, MutationError> {
    mutation(key).ok_or_else(|| MutationError::Unknown(key.to_string()))?;
    let host = world
        .creature(creature)
        .ok_or(WorldError::CreatureNotFound(creature))?;
    if !has_mutation(&host.body, key) {
        return Err(MutationError::NotGranted(key.to_string()));
    }

    let manager = manager_id(key);
    let removed = world.with_body(creature, |body, ctx| {
        let removed = body.remove_parts_by_manager(&manager, ctx);
        ctx.events.fire(&GameEvent::MutationBodyRebuild {
            creature: ctx.owner,
            mutation: key.to_string(),
        });
        body.update_body_parts(ctx);
        removed
    })?;
    Ok(removed)
}
