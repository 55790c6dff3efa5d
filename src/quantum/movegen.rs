//! Candidate moves for a single unit, and checkmate detection built on them.

use tracing::debug;

use crate::chess::moves::{CastleSide, DeclaredMove, Move};
use crate::chess::piece::PieceKind;
use crate::chess::position::{king_home, UnitRef};
use crate::chess::rules::{is_in_range, Rules};
use crate::core::square::Square;
use crate::quantum::enumerate::is_move_always_legal;
use crate::quantum::measure::is_possibly_in_check;
use crate::quantum::position::QuantumPosition;

/// Every move shape the unit `r` could attempt, each with its required declarations.
///
/// Pawns reaching a back rank promote to a queen; a diagonal pawn step onto the
/// en-passant target becomes an en-passant capture. Nothing here consults occupancy.
pub fn candidate_moves(position: &QuantumPosition, r: UnitRef) -> Vec<DeclaredMove> {
    let Some(obj) = position.objects.get(r.object) else {
        return Vec::new();
    };
    let Some(unit) = obj.units.get(r.unit) else {
        return Vec::new();
    };
    let side = obj.piece.side;
    let kind = unit.promotion.unwrap_or(obj.piece.kind);
    let start = unit.square;

    let mut moves = Vec::new();
    for end in Square::all() {
        if !is_in_range(start, end, kind, side) {
            continue;
        }
        let mv = if kind == PieceKind::Pawn {
            let diagonal = start.x() != end.x();
            if diagonal && position.data.en_passant == Some(end) {
                Move::EnPassant { start, end }
            } else if end.is_back_rank() {
                Move::promoting(start, end, PieceKind::Queen)
            } else {
                Move::standard(start, end)
            }
        } else {
            Move::standard(start, end)
        };
        moves.push(mv);
    }

    if kind == PieceKind::Pawn && start.y() == side.pawn_rank() {
        moves.push(Move::PawnDoubleMove { pushed_pawn: start });
    }
    if kind == PieceKind::King && start == king_home(side) {
        for direction in CastleSide::ALL {
            if position.data.castling.get(side, direction) {
                moves.push(Move::Castle { side, direction });
            }
        }
    }

    moves
        .into_iter()
        .map(|mv| DeclaredMove::new(mv, mv.required_declarations(kind)))
        .collect()
}

/// The side to move is possibly in check and has no unit with a reply that is legal in
/// every realization where that unit is real.
pub fn detect_checkmate(rules: &Rules, position: &QuantumPosition) -> bool {
    let side = position.data.whose_turn;
    if !is_possibly_in_check(position, side) {
        return false;
    }
    for (object, obj) in position.objects.iter().enumerate() {
        if obj.piece.side != side {
            continue;
        }
        for unit in 0..obj.units.len() {
            let r = UnitRef { object, unit };
            let safe = candidate_moves(position, r)
                .iter()
                .any(|dm| is_move_always_legal(rules, dm, position, Some(r)));
            if safe {
                return false;
            }
        }
    }
    debug!(%side, "checkmate");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::config::GameSettings;
    use crate::chess::piece::{ColoredPiece, Side};
    use crate::chess::position::{CastlingRights, GameData};
    use crate::quantum::position::QuantumObject;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn object_at(pos: &QuantumPosition, s: &str) -> usize {
        pos.find_unit(sq(s), None).unwrap().object
    }

    #[test]
    fn opening_pawn_has_push_captures_and_double_move() {
        let pos = QuantumPosition::standard(&GameSettings::default());
        let r = UnitRef {
            object: object_at(&pos, "e2"),
            unit: 0,
        };
        let moves: Vec<Move> = candidate_moves(&pos, r).into_iter().map(|d| d.mv).collect();
        assert_eq!(moves.len(), 4);
        assert!(moves.contains(&Move::standard(sq("e2"), sq("e3"))));
        assert!(moves.contains(&Move::PawnDoubleMove {
            pushed_pawn: sq("e2")
        }));
    }

    #[test]
    fn opening_king_lists_castles() {
        let pos = QuantumPosition::standard(&GameSettings::default());
        let r = UnitRef {
            object: object_at(&pos, "e1"),
            unit: 0,
        };
        let castles = candidate_moves(&pos, r)
            .into_iter()
            .filter(|d| d.mv.is_castle())
            .count();
        assert_eq!(castles, 2);
    }

    #[test]
    fn opening_is_not_checkmate() {
        let rules = Rules::new(GameSettings::default());
        let pos = QuantumPosition::standard(&GameSettings::default());
        assert!(!detect_checkmate(&rules, &pos));
    }

    #[test]
    fn back_rank_mate_is_detected() {
        let white = Side::White;
        let black = Side::Black;
        let objects = vec![
            QuantumObject::classical(ColoredPiece::new(PieceKind::King, white), sq("h1")),
            QuantumObject::classical(ColoredPiece::new(PieceKind::Pawn, white), sq("g2")),
            QuantumObject::classical(ColoredPiece::new(PieceKind::Pawn, white), sq("h2")),
            QuantumObject::classical(ColoredPiece::new(PieceKind::Rook, black), sq("a1")),
            QuantumObject::classical(ColoredPiece::new(PieceKind::King, black), sq("h8")),
        ];
        let mut data = GameData::standard(5.0);
        data.castling = CastlingRights::NONE;
        let pos = QuantumPosition::new(objects, data).unwrap();
        let rules = Rules::new(GameSettings::default());
        assert!(detect_checkmate(&rules, &pos));
    }
}
