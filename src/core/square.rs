use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::coord::Coord;
use crate::error::{Result, RulesError};

pub const BOARD_SIZE: i8 = 8;

/// A board square, file `x` and rank `y` both in `1..=8`.
///
/// Serialized in algebraic form (`"e4"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    x: i8,
    y: i8,
}

impl Square {
    pub fn new(x: i32, y: i32) -> Result<Square> {
        Square::checked(x, y)
            .ok_or_else(|| RulesError::invalid_value(format!("square ({x},{y}) is off the board")))
    }

    /// Used for the fixed squares of the standard setup.
    pub(crate) const fn at(x: i8, y: i8) -> Square {
        Square { x, y }
    }

    pub fn checked(x: i32, y: i32) -> Option<Square> {
        let range = 1..=BOARD_SIZE as i32;
        if range.contains(&x) && range.contains(&y) {
            Some(Square {
                x: x as i8,
                y: y as i8,
            })
        } else {
            None
        }
    }

    #[inline]
    pub fn x(self) -> i32 {
        self.x as i32
    }

    #[inline]
    pub fn y(self) -> i32 {
        self.y as i32
    }

    /// Displacement from `self` to `to`.
    #[inline]
    pub fn delta(self, to: Square) -> Coord {
        Coord::new(to.x() - self.x(), to.y() - self.y())
    }

    #[inline]
    pub fn offset(self, by: Coord) -> Option<Square> {
        Square::checked(self.x() + by.x, self.y() + by.y)
    }

    #[inline]
    pub fn is_back_rank(self) -> bool {
        self.y == 1 || self.y == BOARD_SIZE
    }

    /// All 64 squares, file-major.
    pub fn all() -> impl Iterator<Item = Square> {
        (1..=BOARD_SIZE).flat_map(|x| (1..=BOARD_SIZE).map(move |y| Square { x, y }))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = (b'a' + (self.x - 1) as u8) as char;
        write!(f, "{file}{}", self.y)
    }
}

impl FromStr for Square {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(RulesError::invalid_value(format!("bad square {s:?}")));
        }
        let x = bytes[0].wrapping_sub(b'a') as i32 + 1;
        let y = bytes[1].wrapping_sub(b'0') as i32;
        Square::new(x, y)
    }
}

impl TryFrom<String> for Square {
    type Error = RulesError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Square> for String {
    fn from(sq: Square) -> String {
        sq.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algebraic_names() {
        let e4 = Square::new(5, 4).unwrap();
        assert_eq!(e4.to_string(), "e4");
        assert_eq!("e4".parse::<Square>().unwrap(), e4);
        assert!("i1".parse::<Square>().is_err());
        assert!("a9".parse::<Square>().is_err());
        assert!(Square::new(0, 3).is_err());
    }

    #[test]
    fn every_square_once() {
        assert_eq!(Square::all().count(), 64);
    }
}
