//! Dice expressions
//!
//! Parses and rolls expressions of the form `NdS`, `NdS+M` and `NdS-M`
//! (e.g. "1d4", "2d6+1", "1d2-1"). A bare integer is a constant.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing a dice expression
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiceError {
    #[error("empty dice expression")]
    Empty,
    #[error("malformed dice expression: {0}")]
    Malformed(String),
    #[error("dice expression {0} has zero sides")]
    ZeroSides(String),
}

/// A parsed dice expression
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceExpr {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceExpr {
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// Roll the expression. Never negative.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> i32 {
        let mut total = self.modifier;
        for _ in 0..self.count {
            total += roll_die(rng, self.sides);
        }
        total.max(0)
    }

    pub fn min(&self) -> i32 {
        (self.count as i32 + self.modifier).max(0)
    }

    pub fn max(&self) -> i32 {
        (self.count as i32 * self.sides as i32 + self.modifier).max(0)
    }
}

/// Roll a single die with `sides` faces
pub fn roll_die<R: Rng>(rng: &mut R, sides: u32) -> i32 {
    rng.gen_range(1..=sides.max(1)) as i32
}

fn parse_number<T: FromStr>(text: &str, whole: &str) -> Result<T, DiceError> {
    text.trim()
        .parse::<T>()
        .map_err(|_| DiceError::Malformed(whole.to_string()))
}

impl FromStr for DiceExpr {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(DiceError::Empty);
        }

        let Some((count_part, rest)) = text.split_once(['d', 'D']) else {
            // Constant expression
            let modifier = parse_number::<i32>(text, s)?;
            return Ok(DiceExpr::new(0, 1, modifier));
        };

        let count = if count_part.trim().is_empty() {
            1
        } else {
            parse_number::<u32>(count_part, s)?
        };

        let (sides_part, modifier) = match rest.find(['+', '-']) {
            Some(idx) => {
                let (sides, modifier) = rest.split_at(idx);
                (sides, parse_number::<i32>(modifier, s)?)
            }
            None => (rest, 0),
        };
        let sides = parse_number::<u32>(sides_part, s)?;
        if sides == 0 {
            return Err(DiceError::ZeroSides(s.to_string()));
        }

        Ok(DiceExpr::new(count, sides, modifier))
    }
}

impl TryFrom<String> for DiceExpr {
    type Error = DiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DiceExpr> for String {
    fn from(value: DiceExpr) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return write!(f, "{}", self.modifier);
        }
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{}", m),
            m => write!(f, "{}", m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_parse_forms() {
        assert_eq!("1d4".parse::<DiceExpr>().unwrap(), DiceExpr::new(1, 4, 0));
        assert_eq!("2d6+1".parse::<DiceExpr>().unwrap(), DiceExpr::new(2, 6, 1));
        assert_eq!("1d2-1".parse::<DiceExpr>().unwrap(), DiceExpr::new(1, 2, -1));
        assert_eq!("d8".parse::<DiceExpr>().unwrap(), DiceExpr::new(1, 8, 0));
        assert_eq!("10d6".parse::<DiceExpr>().unwrap(), DiceExpr::new(10, 6, 0));
        assert_eq!("3".parse::<DiceExpr>().unwrap(), DiceExpr::new(0, 1, 3));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<DiceExpr>(), Err(DiceError::Empty));
        assert!(matches!("1d0".parse::<DiceExpr>(), Err(DiceError::ZeroSides(_))));
        assert!(matches!("xd4".parse::<DiceExpr>(), Err(DiceError::Malformed(_))));
        assert!(matches!("1d4+".parse::<DiceExpr>(), Err(DiceError::Malformed(_))));
    }

    #[test]
    fn test_rolls_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let dice: DiceExpr = "2d6+1".parse().unwrap();
        for _ in 0..500 {
            let r = dice.roll(&mut rng);
            assert!(r >= dice.min() && r <= dice.max(), "roll {} out of range", r);
        }
    }

    #[test]
    fn test_negative_modifier_clamps_to_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let dice: DiceExpr = "1d2-5".parse().unwrap();
        for _ in 0..50 {
            assert_eq!(dice.roll(&mut rng), 0);
        }
    }

    #[test]
    fn test_display_and_serde() {
        let dice: DiceExpr = "1d2-1".parse().unwrap();
        assert_eq!(dice.to_string(), "1d2-1");
        let json = serde_json::to_string(&dice).unwrap();
        assert_eq!(json, "\"1d2-1\"");
        let back: DiceExpr = serde_json::from_str("\"3d8+2\"").unwrap();
        assert_eq!(back, DiceExpr::new(3, 8, 2));
    }
}
