//! Body templates for different creature types
//!
//! Provides pre-built anatomies for humanoids, quadrupeds, insectoids and
//! shapeless creatures, and the implied-part rules some of them carry.

use serde::{Deserialize, Serialize};

use super::{Body, BodyPart, PartCategory, PartFlags, PartTemplate};
use crate::laterality::Laterality;

/// Declares that each `per` attached parts of type `implied_by` imply
/// `count` parts of type `part_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpliedPartRule {
    pub part_type: String,
    pub implied_by: String,
    pub per: u32,
    pub count: u32,
    /// Subtree added under the root for each missing implied part
    pub template: PartTemplate,
}

impl ImpliedPartRule {
    pub fn new(part_type: &str, implied_by: &str, template: PartTemplate) -> Self {
        Self {
            part_type: part_type.to_string(),
            implied_by: implied_by.to_string(),
            per: 1,
            count: 1,
            template,
        }
    }

    pub fn with_ratio(mut self, per: u32, count: u32) -> Self {
        self.per = per;
        self.count = count;
        self
    }

    /// Manager id tagged on parts this rule adds
    pub fn manager_id(&self) -> String {
        format!("Implied::{}", self.part_type)
    }

    /// How many implied parts `implying` source parts call for
    pub fn expected(&self, implying: usize) -> usize {
        if self.per == 0 {
            return 0;
        }
        implying / self.per as usize * self.count as usize
    }
}

fn appendage(part_type: &str, laterality: Laterality) -> BodyPart {
    BodyPart::new(part_type, laterality).with_flags(PartFlags::APPENDAGE)
}

/// Slot parts that hold thrown weapons and floating items
fn utility_slots() -> [PartTemplate; 2] {
    [
        PartTemplate::leaf(BodyPart::new("Thrown Weapon", Laterality::NONE)),
        PartTemplate::leaf(BodyPart::new("Floating Nearby", Laterality::NONE)),
    ]
}

fn hand_group(side: Laterality) -> BodyPart {
    BodyPart::new("Hands", side).named(&side.qualify("hands"))
}

fn arm(side: Laterality, primary: bool) -> PartTemplate {
    let mut hand = appendage("Hand", side)
        .with_target_weight(1)
        .supporting(&side.qualify("hand"))
        .with_default_behavior("DefaultFist");
    if primary {
        hand = hand.with_flags(PartFlags::DEFAULT_PRIMARY);
    }
    PartTemplate::new(appendage("Arm", side).with_target_weight(3)).child(PartTemplate::leaf(hand))
}

/// Two arms, a head, feet and the usual slot parts
pub fn humanoid() -> Body {
    let head = PartTemplate::new(
        appendage("Head", Laterality::NONE)
            .with_flags(PartFlags::MORTAL)
            .with_target_weight(3),
    )
    .child(PartTemplate::leaf(
        appendage("Face", Laterality::NONE).with_flags(PartFlags::INTEGRAL),
    ));

    let [thrown, floating] = utility_slots();
    let template = PartTemplate::new(BodyPart::new("Body", Laterality::NONE).with_target_weight(10))
        .child(head)
        .child(PartTemplate::leaf(BodyPart::new("Back", Laterality::NONE)))
        .child(arm(Laterality::LEFT, false))
        .child(arm(Laterality::RIGHT, true))
        .child(PartTemplate::leaf(
            hand_group(Laterality::LEFT).depending_on("left hand"),
        ))
        .child(PartTemplate::leaf(
            hand_group(Laterality::RIGHT).depending_on("right hand"),
        ))
        .child(PartTemplate::leaf(
            appendage("Feet", Laterality::NONE)
                .with_flags(PartFlags::PLURAL)
                .with_mobility(2)
                .with_target_weight(2),
        ))
        .child(thrown)
        .child(floating);

    Body::from_template("humanoid", &template).with_implied_rule(ImpliedPartRule::new(
        "Hands",
        "Hand",
        PartTemplate::leaf(BodyPart::new("Hands", Laterality::NONE).named("hand group")),
    ))
}

/// Four legs and a biting head
pub fn quadruped() -> Body {
    let head = PartTemplate::new(
        appendage("Head", Laterality::NONE)
            .with_flags(PartFlags::MORTAL | PartFlags::DEFAULT_PRIMARY)
            .with_target_weight(3)
            .with_default_behavior("Jaws"),
    )
    .child(PartTemplate::leaf(
        appendage("Face", Laterality::NONE).with_flags(PartFlags::INTEGRAL),
    ));

    let mut template = PartTemplate::new(BodyPart::new("Body", Laterality::NONE).with_target_weight(10))
        .child(head)
        .child(PartTemplate::leaf(BodyPart::new("Back", Laterality::NONE)));
    for end in [Laterality::FORE, Laterality::HIND] {
        for side in [Laterality::LEFT, Laterality::RIGHT] {
            template = template.child(PartTemplate::leaf(
                appendage("Leg", end | side).with_mobility(1).with_target_weight(2),
            ));
        }
    }
    template = template.child(PartTemplate::leaf(
        appendage("Tail", Laterality::NONE).with_target_weight(1),
    ));

    Body::from_template("quadruped", &template)
}

/// Six legs, antennae and mandibles, all in chitin
pub fn insectoid() -> Body {
    let chitin = |part: BodyPart| part.with_category(PartCategory::Chitinous);

    let mut head = PartTemplate::new(chitin(
        appendage("Head", Laterality::NONE)
            .with_flags(PartFlags::MORTAL | PartFlags::DEFAULT_PRIMARY)
            .with_target_weight(3)
            .with_default_behavior("Mandibles"),
    ))
    .child(PartTemplate::leaf(chitin(
        appendage("Face", Laterality::NONE).with_flags(PartFlags::INTEGRAL),
    )));
    for side in [Laterality::LEFT, Laterality::RIGHT] {
        head = head.child(PartTemplate::leaf(chitin(
            appendage("Antenna", side).with_target_weight(1),
        )));
    }

    let mut template = PartTemplate::new(chitin(
        BodyPart::new("Body", Laterality::NONE).with_target_weight(8),
    ))
    .child(head)
    .child(PartTemplate::leaf(chitin(BodyPart::new("Back", Laterality::NONE))));
    for pair in [Laterality::FORE, Laterality::MID, Laterality::HIND] {
        for side in [Laterality::LEFT, Laterality::RIGHT] {
            template = template.child(PartTemplate::leaf(chitin(
                appendage("Leg", pair | side).with_mobility(1).with_target_weight(1),
            )));
        }
    }

    Body::from_template("insectoid", &template)
}

/// A single mass that attacks by slamming into things
pub fn simple() -> Body {
    let template = PartTemplate::new(
        BodyPart::new("Body", Laterality::NONE)
            .with_flags(PartFlags::DEFAULT_PRIMARY | PartFlags::MASS)
            .with_target_weight(1)
            .with_default_behavior("Slam"),
    )
    .child(PartTemplate::leaf(BodyPart::new("Floating Nearby", Laterality::NONE)));

    Body::from_template("simple", &template)
}

/// Constructor for a named anatomy
pub type AnatomyFactory = fn() -> Body;

/// Every anatomy that can be built by name
pub const ANATOMIES: &[(&str, AnatomyFactory)] = &[
    ("humanoid", humanoid),
    ("quadruped", quadruped),
    ("insectoid", insectoid),
    ("simple", simple),
];

pub fn build_anatomy(name: &str) -> Option<Body> {
    ANATOMIES
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, factory)| factory())
}
