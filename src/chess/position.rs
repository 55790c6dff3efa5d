//! Per-game metadata and fully classical ("completed") positions.

use serde::{Deserialize, Serialize};

use crate::chess::moves::{CastleSide, KING_HOME_FILE};
use crate::chess::piece::{ColoredPiece, PieceKind, Side};
use crate::core::square::Square;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    pub const ALL: CastlingRights = CastlingRights {
        white_kingside: true,
        white_queenside: true,
        black_kingside: true,
        black_queenside: true,
    };

    pub const NONE: CastlingRights = CastlingRights {
        white_kingside: false,
        white_queenside: false,
        black_kingside: false,
        black_queenside: false,
    };

    pub fn get(&self, side: Side, direction: CastleSide) -> bool {
        match (side, direction) {
            (Side::White, CastleSide::Kingside) => self.white_kingside,
            (Side::White, CastleSide::Queenside) => self.white_queenside,
            (Side::Black, CastleSide::Kingside) => self.black_kingside,
            (Side::Black, CastleSide::Queenside) => self.black_queenside,
        }
    }

    pub fn set(&mut self, side: Side, direction: CastleSide, value: bool) {
        let slot = match (side, direction) {
            (Side::White, CastleSide::Kingside) => &mut self.white_kingside,
            (Side::White, CastleSide::Queenside) => &mut self.white_queenside,
            (Side::Black, CastleSide::Kingside) => &mut self.black_kingside,
            (Side::Black, CastleSide::Queenside) => &mut self.black_queenside,
        };
        *slot = value;
    }

    /// Keep a right only while its king and rook still stand on their home squares.
    ///
    /// `has(piece, square)` answers whether `piece` literally occupies `square`.
    pub fn restricted_by(self, has: impl Fn(ColoredPiece, Square) -> bool) -> CastlingRights {
        let mut out = self;
        for side in [Side::White, Side::Black] {
            for direction in CastleSide::ALL {
                let keep = self.get(side, direction)
                    && has(ColoredPiece::new(PieceKind::King, side), king_home(side))
                    && has(
                        ColoredPiece::new(PieceKind::Rook, side),
                        rook_home(side, direction),
                    );
                out.set(side, direction, keep);
            }
        }
        out
    }
}

#[inline]
pub fn king_home(side: Side) -> Square {
    Square::at(KING_HOME_FILE as i8, side.home_rank() as i8)
}

#[inline]
pub fn rook_home(side: Side, direction: CastleSide) -> Square {
    Square::at(direction.rook_home_file() as i8, side.home_rank() as i8)
}

/// Qubit balance per side. Unlimited games use `f64::INFINITY`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QubitBalance {
    pub white: f64,
    pub black: f64,
}

impl QubitBalance {
    pub fn get(&self, side: Side) -> f64 {
        match side {
            Side::White => self.white,
            Side::Black => self.black,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut f64 {
        match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        }
    }
}

/// Game metadata carried alongside the pieces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameData {
    pub whose_turn: Side,
    pub castling: CastlingRights,
    /// Square a pawn skipped with a double move on the previous play.
    pub en_passant: Option<Square>,
    pub qubits: QubitBalance,
}

impl GameData {
    pub fn standard(starting_qubits: f64) -> Self {
        Self {
            whose_turn: Side::White,
            castling: CastlingRights::ALL,
            en_passant: None,
            qubits: QubitBalance {
                white: starting_qubits,
                black: starting_qubits,
            },
        }
    }
}

/// The orthodox starting setup, white pieces first.
pub fn standard_setup() -> Vec<(ColoredPiece, Square)> {
    use PieceKind::*;
    const BACK: [PieceKind; 8] = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];

    let mut out = Vec::with_capacity(32);
    for side in [Side::White, Side::Black] {
        for (i, &kind) in BACK.iter().enumerate() {
            let sq = Square::at(i as i8 + 1, side.home_rank() as i8);
            out.push((ColoredPiece::new(kind, side), sq));
        }
        for x in 1..=8 {
            let sq = Square::at(x, side.pawn_rank() as i8);
            out.push((ColoredPiece::new(Pawn, side), sq));
        }
    }
    out
}

/// Which unit of which object a classical piece was realized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitRef {
    pub object: usize,
    pub unit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassicalPiece {
    pub piece: ColoredPiece,
    pub square: Square,
    pub promotion: Option<PieceKind>,
    pub origin: Option<UnitRef>,
}

impl ClassicalPiece {
    pub fn new(piece: ColoredPiece, square: Square) -> Self {
        Self {
            piece,
            square,
            promotion: None,
            origin: None,
        }
    }

    /// The kind this piece moves and attacks as; a promoted pawn acts as its promotion.
    #[inline]
    pub fn kind(&self) -> PieceKind {
        match (self.piece.kind, self.promotion) {
            (PieceKind::Pawn, Some(promoted)) => promoted,
            (kind, _) => kind,
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.piece.side
    }
}

/// One fully collapsed board: every piece on exactly one square.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassicalPosition {
    pub pieces: Vec<ClassicalPiece>,
    pub data: GameData,
}

impl ClassicalPosition {
    pub fn new(pieces: Vec<ClassicalPiece>, data: GameData) -> Self {
        Self { pieces, data }
    }

    pub fn standard() -> Self {
        let pieces = standard_setup()
            .into_iter()
            .map(|(piece, sq)| ClassicalPiece::new(piece, sq))
            .collect();
        Self::new(pieces, GameData::standard(f64::INFINITY))
    }

    pub fn index_at(&self, sq: Square) -> Option<usize> {
        self.pieces.iter().position(|p| p.square == sq)
    }

    pub fn piece_at(&self, sq: Square) -> Option<&ClassicalPiece> {
        self.pieces.iter().find(|p| p.square == sq)
    }

    #[inline]
    pub fn is_occupied(&self, sq: Square) -> bool {
        self.piece_at(sq).is_some()
    }

    pub fn king(&self, side: Side) -> Option<&ClassicalPiece> {
        self.pieces
            .iter()
            .find(|p| p.piece == ColoredPiece::new(PieceKind::King, side))
    }

    /// Add a piece, replacing whatever stood on its square.
    pub fn place(&mut self, piece: ClassicalPiece) {
        self.remove_at(piece.square);
        self.pieces.push(piece);
    }

    pub fn remove_at(&mut self, sq: Square) -> Option<ClassicalPiece> {
        self.index_at(sq).map(|i| self.pieces.remove(i))
    }

    /// Recompute castling rights from literal king/rook occupancy.
    pub fn refresh_castling(&mut self) {
        let pieces = &self.pieces;
        self.data.castling = self.data.castling.restricted_by(|piece, sq| {
            pieces
                .iter()
                .any(|p| p.square == sq && p.piece == piece)
        });
    }
}
