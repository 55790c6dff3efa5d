//! Classical legality: one declared move against one fully collapsed position.
//!
//! Everything here is a pure function of (move, position, settings).

use crate::chess::config::GameSettings;
use crate::chess::moves::{Declaration, DeclaredMove, Move};
use crate::chess::position::{king_home, rook_home, ClassicalPiece, ClassicalPosition};
use crate::chess::piece::{ColoredPiece, PieceKind, Side};
use crate::core::coord::Coord;
use crate::core::square::Square;
use crate::error::{Result, RulesError};

/// A move decomposed into its start, the squares it passes over, and its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveGeometry {
    pub start: Square,
    pub middle: Vec<Square>,
    pub end: Square,
}

/// Geometric reach of `kind` from `start` to `end`, ignoring every other piece.
pub fn is_in_range(start: Square, end: Square, kind: PieceKind, side: Side) -> bool {
    let d = start.delta(end);
    if d == Coord::ORIGIN {
        return false;
    }
    use PieceKind::*;
    match kind {
        Pawn => d.y == side.forward() && d.x.abs() <= 1,
        Knight => d.is_knight_jump(),
        Bishop => d.is_diagonal(),
        Rook => d.is_straight(),
        Queen => d.is_straight() || d.is_diagonal(),
        King => d.squared_norm() <= 2,
    }
}

fn line_between(start: Square, d: Coord) -> Vec<Square> {
    let step = d.step();
    (1..d.chebyshev_norm())
        .filter_map(|i| start.offset(step * i))
        .collect()
}

/// Decompose any move into (start, intermediate squares, end).
///
/// Straight and diagonal moves pass over every square strictly between their ends;
/// knight-shaped jumps pass over nothing. Castles pass over every square between
/// king and rook.
pub fn start_middle_end(mv: Move) -> Result<MoveGeometry> {
    match mv {
        Move::Standard { start, end, .. } => {
            let d = start.delta(end);
            if d == Coord::ORIGIN {
                return Err(RulesError::invalid_move(format!("null move at {start}")));
            }
            let middle = if d.is_straight() || d.is_diagonal() {
                line_between(start, d)
            } else if d.is_knight_jump() {
                Vec::new()
            } else {
                return Err(RulesError::invalid_move(format!(
                    "{start}{end} is neither a line nor a knight jump"
                )));
            };
            Ok(MoveGeometry { start, middle, end })
        }
        Move::Castle { side, direction } => {
            let rank = side.home_rank();
            let middle = direction
                .transit_files()
                .filter_map(|x| Square::checked(x, rank))
                .collect();
            let end = Square::new(direction.king_target_file(), rank)?;
            Ok(MoveGeometry {
                start: king_home(side),
                middle,
                end,
            })
        }
        Move::EnPassant { start, end } => {
            let d = start.delta(end);
            if d.x.abs() != 1 || d.y.abs() != 1 {
                return Err(RulesError::invalid_move(format!(
                    "{start}{end} is not a diagonal pawn step"
                )));
            }
            Ok(MoveGeometry {
                start,
                middle: Vec::new(),
                end,
            })
        }
        Move::PawnDoubleMove { pushed_pawn } => {
            let forward = if pushed_pawn.y() == Side::White.pawn_rank() {
                Side::White.forward()
            } else if pushed_pawn.y() == Side::Black.pawn_rank() {
                Side::Black.forward()
            } else {
                return Err(RulesError::invalid_move(format!(
                    "no double move from rank {}",
                    pushed_pawn.y()
                )));
            };
            let transit = Square::new(pushed_pawn.x(), pushed_pawn.y() + forward)?;
            let end = Square::new(pushed_pawn.x(), pushed_pawn.y() + 2 * forward)?;
            Ok(MoveGeometry {
                start: pushed_pawn,
                middle: vec![transit],
                end,
            })
        }
    }
}

/// True if any intermediate square is occupied.
pub fn is_blocked(geom: &MoveGeometry, pos: &ClassicalPosition) -> bool {
    geom.middle.iter().any(|&sq| pos.is_occupied(sq))
}

/// True if the destination holds a piece of the mover's own side.
pub fn is_endpoint_blocked(mover: Side, end: Square, pos: &ClassicalPosition) -> bool {
    pos.piece_at(end).is_some_and(|p| p.side() == mover)
}

/// Square whose occupant a move would capture. En passant captures beside its start.
pub fn captured_square(mv: Move) -> Option<Square> {
    match mv {
        Move::Standard { end, .. } => Some(end),
        Move::EnPassant { start, end } => Square::checked(end.x(), start.y()),
        Move::PawnDoubleMove { .. } => start_middle_end(mv).ok().map(|g| g.end),
        Move::Castle { .. } => None,
    }
}

pub fn is_capture(mv: Move, mover: Side, pos: &ClassicalPosition) -> bool {
    captured_square(mv)
        .and_then(|sq| pos.piece_at(sq))
        .is_some_and(|p| p.side() != mover)
}

/// Enemy pieces whose geometry reaches `side`'s king, ignoring blockers.
///
/// Pawns on the king's file are skipped: they only capture diagonally.
pub fn leap_checking_pieces(pos: &ClassicalPosition, side: Side) -> Vec<&ClassicalPiece> {
    let Some(king) = pos.king(side) else {
        return Vec::new();
    };
    pos.pieces
        .iter()
        .filter(|p| p.side() != side)
        .filter(|p| is_in_range(p.square, king.square, p.kind(), p.side()))
        .filter(|p| !(p.kind() == PieceKind::Pawn && p.square.x() == king.square.x()))
        .collect()
}

/// Leap checkers whose line to the king is clear. Knights are never blocked.
pub fn checking_pieces(pos: &ClassicalPosition, side: Side) -> Vec<&ClassicalPiece> {
    let Some(king) = pos.king(side) else {
        return Vec::new();
    };
    let king_sq = king.square;
    leap_checking_pieces(pos, side)
        .into_iter()
        .filter(|p| {
            p.kind() == PieceKind::Knight
                || start_middle_end(Move::standard(p.square, king_sq))
                    .map(|g| !is_blocked(&g, pos))
                    .unwrap_or(false)
        })
        .collect()
}

#[inline]
pub fn is_in_check(pos: &ClassicalPosition, side: Side) -> bool {
    !checking_pieces(pos, side).is_empty()
}

/// Apply `mv` to a copy of `pos`: remove the captured piece, move the mover (and
/// the rook when castling), set or clear the en-passant target, flip the turn and
/// refresh castling rights.
pub fn result_of_move(mv: Move, pos: &ClassicalPosition) -> Result<ClassicalPosition> {
    let geom = start_middle_end(mv)?;
    let mut next = pos.clone();
    next.data.en_passant = None;

    let mut mover = next
        .remove_at(geom.start)
        .ok_or_else(|| RulesError::invalid_move(format!("no piece on {}", geom.start)))?;
    if let Some(cap) = captured_square(mv) {
        next.remove_at(cap);
    }

    match mv {
        Move::Standard { promotion, .. } => {
            if promotion.is_some() {
                mover.promotion = promotion;
            }
        }
        Move::Castle { side, direction } => {
            let from = rook_home(side, direction);
            if let Some(mut rook) = next.remove_at(from) {
                rook.square = Square::new(direction.rook_target_file(), side.home_rank())?;
                next.place(rook);
            }
        }
        Move::EnPassant { .. } => {}
        Move::PawnDoubleMove { .. } => {
            next.data.en_passant = geom.middle.first().copied();
        }
    }
    mover.square = geom.end;
    next.place(mover);

    next.data.whose_turn = pos.data.whose_turn.other();
    next.refresh_castling();
    Ok(next)
}

/// Legality of declared moves under one set of [`GameSettings`].
#[derive(Debug, Clone, Default)]
pub struct Rules {
    pub settings: GameSettings,
}

impl Rules {
    pub fn new(settings: GameSettings) -> Self {
        Self { settings }
    }

    #[inline]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Whether `dm` is legal in `pos`. A move that cannot be decomposed is simply illegal.
    pub fn is_move_legal(&self, dm: &DeclaredMove, pos: &ClassicalPosition) -> bool {
        let Ok(geom) = start_middle_end(dm.mv) else {
            return false;
        };
        let Some(mover) = pos.piece_at(geom.start) else {
            return false;
        };
        let side = mover.side();
        if side != pos.data.whose_turn {
            return false;
        }
        let kind = mover.kind();

        if !self.is_shape_legal(dm.mv, mover, pos) {
            return false;
        }
        if is_endpoint_blocked(side, geom.end, pos) {
            return false;
        }

        let required = dm.mv.required_declarations(kind);
        let recognized = self.settings.allowed_move_declarations.union(required);
        if !required.is_subset(dm.declarations) || !dm.declarations.is_subset(recognized) {
            return false;
        }

        let declared = |d: Declaration| dm.declarations.contains(d);
        let capture = is_capture(dm.mv, side, pos);
        if declared(Declaration::NoCapture) && capture {
            return false;
        }
        if declared(Declaration::CaptureOnly) && !capture {
            return false;
        }
        if declared(Declaration::NonLeaping) && is_blocked(&geom, pos) {
            return false;
        }

        let check_relevant = self.settings.win_by_checkmate
            || declared(Declaration::CheckOnly)
            || declared(Declaration::NoCheck);
        if !check_relevant {
            return true;
        }

        let Ok(next) = result_of_move(dm.mv, pos) else {
            return false;
        };
        let gives_check = is_in_check(&next, side.other());
        if declared(Declaration::CheckOnly) && !gives_check {
            return false;
        }
        if declared(Declaration::NoCheck) && gives_check {
            return false;
        }
        if self.settings.win_by_checkmate {
            if is_in_check(&next, side) {
                return false;
            }
            if let Move::Castle { .. } = dm.mv {
                if is_in_check(pos, side) || passes_through_check(&geom, pos, side) {
                    return false;
                }
            }
        }
        true
    }

    fn is_shape_legal(&self, mv: Move, mover: &ClassicalPiece, pos: &ClassicalPosition) -> bool {
        let side = mover.side();
        let kind = mover.kind();
        match mv {
            Move::Standard {
                start,
                end,
                promotion,
            } => is_in_range(start, end, kind, side) && promotion_fits(mover, end, promotion),
            Move::Castle {
                side: castling_side,
                direction,
            } => {
                let rook = ColoredPiece::new(PieceKind::Rook, side);
                self.settings.allow_castling
                    && mover.piece.kind == PieceKind::King
                    && castling_side == side
                    && pos.data.castling.get(side, direction)
                    && pos
                        .piece_at(rook_home(side, direction))
                        .is_some_and(|p| p.piece == rook)
            }
            Move::EnPassant { start, end } => {
                let d = start.delta(end);
                kind == PieceKind::Pawn
                    && pos.data.en_passant == Some(end)
                    && d.y == side.forward()
                    && d.x.abs() == 1
                    && captured_square(mv)
                        .and_then(|sq| pos.piece_at(sq))
                        .is_some_and(|p| {
                            p.side() != side && p.kind() == PieceKind::Pawn
                        })
            }
            Move::PawnDoubleMove { pushed_pawn } => {
                kind == PieceKind::Pawn && pushed_pawn.y() == side.pawn_rank()
            }
        }
    }
}

/// Unpromoted pawns landing on a back rank must name a promotion; nothing else may.
fn promotion_fits(mover: &ClassicalPiece, end: Square, promotion: Option<PieceKind>) -> bool {
    let unpromoted_pawn = mover.piece.kind == PieceKind::Pawn && mover.promotion.is_none();
    match promotion {
        Some(kind) => unpromoted_pawn && end.is_back_rank() && kind.is_promotion_target(),
        None => !(unpromoted_pawn && end.is_back_rank()),
    }
}

/// Whether the king is attacked on the square it crosses while castling.
fn passes_through_check(geom: &MoveGeometry, pos: &ClassicalPosition, side: Side) -> bool {
    let crossed = geom.start.delta(geom.end).step();
    let Some(transit) = geom.start.offset(crossed) else {
        return false;
    };
    let mut shifted = pos.clone();
    if let Some(mut king) = shifted.remove_at(geom.start) {
        king.square = transit;
        shifted.place(king);
    }
    is_in_check(&shifted, side)
}
