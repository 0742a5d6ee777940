//! Anatomical side/position bitmask
//!
//! A laterality is a small set of bits over three independent axes:
//! lateral (left/right), vertical (upper/lower) and longitudinal
//! (fore/mid/hind). Zero means "no constraint".

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Side/position bitmask attached to a body part
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Laterality(u8);

impl Laterality {
    pub const NONE: Self = Self(0);
    pub const LEFT: Self = Self(1);
    pub const RIGHT: Self = Self(1 << 1);
    pub const UPPER: Self = Self(1 << 2);
    pub const LOWER: Self = Self(1 << 3);
    pub const FORE: Self = Self(1 << 4);
    pub const MID: Self = Self(1 << 5);
    pub const HIND: Self = Self(1 << 6);

    const LATERAL_AXIS: u8 = Self::LEFT.0 | Self::RIGHT.0;
    const VERTICAL_AXIS: u8 = Self::UPPER.0 | Self::LOWER.0;
    const LONGITUDINAL_AXIS: u8 = Self::FORE.0 | Self::MID.0 | Self::HIND.0;
    const AXES: [u8; 3] = [
        Self::LATERAL_AXIS,
        Self::VERTICAL_AXIS,
        Self::LONGITUDINAL_AXIS,
    ];

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & (Self::LATERAL_AXIS | Self::VERTICAL_AXIS | Self::LONGITUDINAL_AXIS))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Laterality) -> bool {
        self.0 & other.0 == other.0
    }

    /// Axis-wise compatibility.
    ///
    /// On every axis where both lateralities specify something, they must
    /// share at least one bit. An axis left empty by either side matches
    /// anything, so `NONE` is compatible with every laterality.
    pub fn matches(self, other: Laterality) -> bool {
        Self::AXES.iter().all(|&axis| {
            let a = self.0 & axis;
            let b = other.0 & axis;
            a == 0 || b == 0 || a & b != 0
        })
    }

    /// Swap left and right, leaving the other axes alone
    pub fn mirrored(self) -> Self {
        let mut bits = self.0 & !Self::LATERAL_AXIS;
        if self.contains(Self::LEFT) {
            bits |= Self::RIGHT.0;
        }
        if self.contains(Self::RIGHT) {
            bits |= Self::LEFT.0;
        }
        Self(bits)
    }

    /// Adjective used in part names, e.g. "upper left" or "fore right"
    pub fn adjective(self) -> String {
        const WORDS: [(Laterality, &str); 7] = [
            (Laterality::FORE, "fore"),
            (Laterality::MID, "mid"),
            (Laterality::HIND, "hind"),
            (Laterality::UPPER, "upper"),
            (Laterality::LOWER, "lower"),
            (Laterality::LEFT, "left"),
            (Laterality::RIGHT, "right"),
        ];
        WORDS
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, word)| *word)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Prefix a noun with this laterality's adjective
    pub fn qualify(self, noun: &str) -> String {
        if self.is_none() {
            noun.to_string()
        } else {
            format!("{} {}", self.adjective(), noun)
        }
    }
}

impl BitOr for Laterality {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Laterality {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Laterality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "any")
        } else {
            write!(f, "{}", self.adjective())
        }
    }
}
