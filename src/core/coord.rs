use std::ops::{Add, Mul, Neg, Sub};

/// A signed board displacement (file delta, rank delta).
///
/// Every move shape is classified from the displacement between its start and end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const ORIGIN: Coord = Coord { x: 0, y: 0 };

    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared euclidean length. Knights jump exactly 5, kings at most 2.
    #[inline]
    pub fn squared_norm(self) -> i32 {
        self.x * self.x + self.y * self.y
    }

    #[inline]
    pub fn chebyshev_norm(self) -> i32 {
        self.x.abs().max(self.y.abs())
    }

    #[inline]
    pub fn is_straight(self) -> bool {
        self != Coord::ORIGIN && (self.x == 0 || self.y == 0)
    }

    #[inline]
    pub fn is_diagonal(self) -> bool {
        self != Coord::ORIGIN && self.x.abs() == self.y.abs()
    }

    #[inline]
    pub fn is_knight_jump(self) -> bool {
        self.squared_norm() == 5
    }

    /// Unit step along a straight or diagonal line.
    #[inline]
    pub fn step(self) -> Coord {
        Coord::new(self.x.signum(), self.y.signum())
    }
}

impl Add for Coord {
    type Output = Coord;

    #[inline]
    fn add(self, rhs: Coord) -> Self::Output {
        Coord::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coord {
    type Output = Coord;

    #[inline]
    fn sub(self, rhs: Coord) -> Self::Output {
        Coord::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Coord {
    type Output = Coord;

    #[inline]
    fn neg(self) -> Self::Output {
        Coord::new(-self.x, -self.y)
    }
}

impl Mul<i32> for Coord {
    type Output = Coord;

    #[inline]
    fn mul(self, rhs: i32) -> Coord {
        Coord {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}
