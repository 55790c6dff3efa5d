//! Move vocabulary: the tagged move union, declaration flags, declared moves and plays.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chess::piece::{PieceKind, Side};
use crate::core::coord::Coord;
use crate::core::square::Square;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastleSide {
    Kingside,
    Queenside,
}

impl CastleSide {
    pub const ALL: [CastleSide; 2] = [CastleSide::Kingside, CastleSide::Queenside];

    #[inline]
    pub fn rook_home_file(self) -> i32 {
        match self {
            CastleSide::Kingside => 8,
            CastleSide::Queenside => 1,
        }
    }

    #[inline]
    pub fn rook_target_file(self) -> i32 {
        match self {
            CastleSide::Kingside => 6,
            CastleSide::Queenside => 4,
        }
    }

    #[inline]
    pub fn king_target_file(self) -> i32 {
        match self {
            CastleSide::Kingside => 7,
            CastleSide::Queenside => 3,
        }
    }

    /// Files strictly between king and rook; all must be empty.
    pub fn transit_files(self) -> std::ops::RangeInclusive<i32> {
        match self {
            CastleSide::Kingside => 6..=7,
            CastleSide::Queenside => 2..=4,
        }
    }
}

pub const KING_HOME_FILE: i32 = 5;

/// A move shape, discriminated by an explicit `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Move {
    Standard {
        start: Square,
        end: Square,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        promotion: Option<PieceKind>,
    },
    Castle {
        side: Side,
        direction: CastleSide,
    },
    /// `end` is the square the capturing pawn lands on.
    EnPassant { start: Square, end: Square },
    PawnDoubleMove { pushed_pawn: Square },
}

impl Move {
    #[inline]
    pub fn standard(start: Square, end: Square) -> Move {
        Move::Standard {
            start,
            end,
            promotion: None,
        }
    }

    #[inline]
    pub fn promoting(start: Square, end: Square, kind: PieceKind) -> Move {
        Move::Standard {
            start,
            end,
            promotion: Some(kind),
        }
    }

    /// Square the moving piece starts on (the king for castles).
    pub fn start(self) -> Square {
        match self {
            Move::Standard { start, .. } | Move::EnPassant { start, .. } => start,
            Move::Castle { side, .. } => Square::at(KING_HOME_FILE as i8, side.home_rank() as i8),
            Move::PawnDoubleMove { pushed_pawn } => pushed_pawn,
        }
    }

    #[inline]
    pub fn promotion(self) -> Option<PieceKind> {
        match self {
            Move::Standard { promotion, .. } => promotion,
            _ => None,
        }
    }

    #[inline]
    pub fn is_castle(self) -> bool {
        matches!(self, Move::Castle { .. })
    }

    #[inline]
    pub fn is_pawn_double_move(self) -> bool {
        matches!(self, Move::PawnDoubleMove { .. })
    }

    /// Declarations a move must carry, given the kind the mover acts as.
    pub fn required_declarations(self, kind: PieceKind) -> DeclarationSet {
        use Declaration::*;
        match self {
            Move::Standard { start, end, .. } => {
                let mut req = DeclarationSet::empty();
                if kind != PieceKind::Knight {
                    req.insert(NonLeaping);
                }
                if kind == PieceKind::Pawn {
                    let d: Coord = start.delta(end);
                    req.insert(if d.x != 0 { CaptureOnly } else { NoCapture });
                }
                req
            }
            Move::Castle { .. } | Move::PawnDoubleMove { .. } => {
                DeclarationSet::from_iter([NonLeaping, NoCapture])
            }
            Move::EnPassant { .. } => DeclarationSet::from_iter([NonLeaping, CaptureOnly]),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Move::Standard {
                start,
                end,
                promotion: None,
            } => write!(f, "{start}{end}"),
            Move::Standard {
                start,
                end,
                promotion: Some(kind),
            } => write!(f, "{start}{end}={kind}"),
            Move::Castle { side, direction } => write!(f, "{side} castles {direction:?}"),
            Move::EnPassant { start, end } => write!(f, "{start}{end} e.p."),
            Move::PawnDoubleMove { pushed_pawn } => write!(f, "{pushed_pawn} double"),
        }
    }
}

/// A modifier a player attaches to a move to restrict when it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Declaration {
    NoCapture,
    CaptureOnly,
    CheckOnly,
    NoCheck,
    NonLeaping,
}

impl Declaration {
    pub const ALL: [Declaration; 5] = [
        Declaration::NoCapture,
        Declaration::CaptureOnly,
        Declaration::CheckOnly,
        Declaration::NoCheck,
        Declaration::NonLeaping,
    ];

    #[inline]
    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// A set of [`Declaration`] flags packed into one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Declaration>", into = "Vec<Declaration>")]
pub struct DeclarationSet(u8);

impl DeclarationSet {
    #[inline]
    pub const fn empty() -> Self {
        DeclarationSet(0)
    }

    pub fn all() -> Self {
        Declaration::ALL.into_iter().collect()
    }

    #[inline]
    pub fn insert(&mut self, d: Declaration) {
        self.0 |= d.bit();
    }

    #[inline]
    pub fn with(mut self, d: Declaration) -> Self {
        self.insert(d);
        self
    }

    #[inline]
    pub fn contains(self, d: Declaration) -> bool {
        self.0 & d.bit() != 0
    }

    #[inline]
    pub fn union(self, other: DeclarationSet) -> DeclarationSet {
        DeclarationSet(self.0 | other.0)
    }

    #[inline]
    pub fn is_subset(self, other: DeclarationSet) -> bool {
        self.0 & !other.0 == 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Declaration> {
        Declaration::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl FromIterator<Declaration> for DeclarationSet {
    fn from_iter<I: IntoIterator<Item = Declaration>>(iter: I) -> Self {
        let mut set = DeclarationSet::empty();
        for d in iter {
            set.insert(d);
        }
        set
    }
}

impl From<Vec<Declaration>> for DeclarationSet {
    fn from(v: Vec<Declaration>) -> Self {
        v.into_iter().collect()
    }
}

impl From<DeclarationSet> for Vec<Declaration> {
    fn from(set: DeclarationSet) -> Self {
        set.iter().collect()
    }
}

/// A move together with the declarations it was submitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclaredMove {
    #[serde(rename = "move")]
    pub mv: Move,
    #[serde(default)]
    pub declarations: DeclarationSet,
}

impl DeclaredMove {
    #[inline]
    pub fn new(mv: Move, declarations: DeclarationSet) -> Self {
        Self { mv, declarations }
    }
}

/// One turn of input for a single object.
///
/// A primary move applies to every unit of the object standing on its start square;
/// several primary moves from the same unit split it. A default move is tried with
/// the probability mass whose primary moves failed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Play {
    pub object_index: usize,
    #[serde(default)]
    pub primary_moves: Vec<DeclaredMove>,
    #[serde(default)]
    pub default_moves: Vec<DeclaredMove>,
}

impl Play {
    pub fn new(object_index: usize, primary_moves: Vec<DeclaredMove>) -> Self {
        Self {
            object_index,
            primary_moves,
            default_moves: Vec::new(),
        }
    }

    pub fn with_default(mut self, default_move: DeclaredMove) -> Self {
        self.default_moves.push(default_move);
        self
    }

    /// A play without any primary move is a pass.
    #[inline]
    pub fn is_pass(&self) -> bool {
        self.primary_moves.is_empty()
    }

    pub fn primaries_from(&self, sq: Square) -> impl Iterator<Item = &DeclaredMove> {
        self.primary_moves.iter().filter(move |m| m.mv.start() == sq)
    }

    pub fn defaults_from(&self, sq: Square) -> impl Iterator<Item = &DeclaredMove> {
        self.default_moves.iter().filter(move |m| m.mv.start() == sq)
    }
}
