//! Pre-flight validation of a play, qubit cost and board value.
//!
//! Validation never mutates. An empty violation set means the play may be resolved.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::chess::config::GameSettings;
use crate::chess::moves::{DeclaredMove, Play};
use crate::chess::piece::Side;
use crate::chess::position::UnitRef;
use crate::chess::rules::{is_in_check, start_middle_end, Rules};
use crate::core::square::Square;
use crate::quantum::enumerate::{is_move_possible, Realizations};
use crate::quantum::position::QuantumPosition;

/// A reason a play is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Violation {
    #[error("object {0} does not exist")]
    UnknownObject(usize),
    #[error("the played object belongs to the side not on move")]
    WrongSide,
    #[error("passing is not allowed")]
    NullPlay,
    #[error("move {0} is declared more than once")]
    DuplicateMove(String),
    #[error("more than one pawn double move in a single play")]
    MultipleDoubleMoves,
    #[error("moves onto {0} promote differently and cannot merge")]
    UnmergeablePromotions(Square),
    #[error("primary move {0} is impossible")]
    ImpossiblePrimary(String),
    #[error("default move {0} is impossible")]
    ImpossibleDefault(String),
    #[error("not enough qubits for this play")]
    InsufficientQubits,
    #[error("more than one default move from {0}")]
    MultipleDefaults(Square),
    #[error("default move from {0} has no primary move")]
    DefaultWithoutPrimary(Square),
    #[error("castling is disabled")]
    CastlingDisabled,
    #[error("castles cannot be split")]
    CastleSplit,
    #[error("pawn double moves cannot be split")]
    DoubleMoveSplit,
    #[error("the unit on {0} can leave its king in check")]
    UnresolvedCheck(Square),
}

/// Number of branches unit `sq` takes in `play`: its primaries plus any default.
fn branch_count(play: &Play, sq: Square) -> usize {
    play.primaries_from(sq).count() + usize::from(play.defaults_from(sq).next().is_some())
}

/// Qubits spent by `play`. Splitting a unit into `b` branches costs `b - 1`, or
/// `sqrt(p) * (sqrt(b) - 1)` in advanced mode, scaled by the kind's multiplier.
pub fn qubit_cost(position: &QuantumPosition, play: &Play, settings: &GameSettings) -> f64 {
    let Some(obj) = position.objects.get(play.object_index) else {
        return 0.0;
    };
    obj.units
        .iter()
        .map(|u| {
            let branches = branch_count(play, u.square);
            if branches <= 1 {
                return 0.0;
            }
            let multiplier = u.promotion.unwrap_or(obj.piece.kind).qubit_multiplier();
            let b = branches as f64;
            if settings.advanced_qubit_mode {
                u.probability.value().sqrt() * (b.sqrt() - 1.0) * multiplier
            } else {
                (b - 1.0) * multiplier
            }
        })
        .sum()
}

/// Material `side` still has on the board.
///
/// With partial rewards each object counts in proportion to its surviving probability;
/// otherwise an object counts in full until it is gone.
pub fn board_value(position: &QuantumPosition, side: Side, settings: &GameSettings) -> f64 {
    position
        .objects
        .iter()
        .filter(|o| o.piece.side == side)
        .map(|o| {
            let p = o.total_probability();
            let weight = if settings.partial_qubit_rewards {
                p.value()
            } else if p.is_positive() {
                1.0
            } else {
                0.0
            };
            o.piece.kind.value() * weight
        })
        .sum()
}

/// Every reason `play` cannot be resolved in `position`.
pub fn check_play_validity(
    rules: &Rules,
    play: &Play,
    position: &QuantumPosition,
) -> BTreeSet<Violation> {
    let settings = rules.settings();
    let mut out = BTreeSet::new();

    let Some(obj) = position.objects.get(play.object_index) else {
        out.insert(Violation::UnknownObject(play.object_index));
        return out;
    };
    if obj.piece.side != position.data.whose_turn {
        out.insert(Violation::WrongSide);
    }
    if play.is_pass() {
        if !settings.null_plays {
            out.insert(Violation::NullPlay);
        }
        return out;
    }

    let mut seen: Vec<&DeclaredMove> = Vec::new();
    for dm in play.primary_moves.iter().chain(&play.default_moves) {
        if seen.iter().any(|s| s.mv == dm.mv) {
            out.insert(Violation::DuplicateMove(dm.mv.to_string()));
        }
        seen.push(dm);
    }

    let double_moves = play
        .primary_moves
        .iter()
        .chain(&play.default_moves)
        .filter(|d| d.mv.is_pawn_double_move())
        .count();
    if double_moves > 1 {
        out.insert(Violation::MultipleDoubleMoves);
    }

    for (i, a) in play.primary_moves.iter().enumerate() {
        for b in &play.primary_moves[i + 1..] {
            let (Ok(ga), Ok(gb)) = (
                start_middle_end(a.mv),
                start_middle_end(b.mv),
            ) else {
                continue;
            };
            if ga.end == gb.end && a.mv.promotion() != b.mv.promotion() {
                out.insert(Violation::UnmergeablePromotions(ga.end));
            }
        }
    }

    let pin_for = |dm: &DeclaredMove| {
        obj.unit_at(dm.mv.start()).map(|unit| UnitRef {
            object: play.object_index,
            unit,
        })
    };
    for dm in &play.primary_moves {
        let possible = pin_for(dm).is_some_and(|r| is_move_possible(rules, dm, position, Some(r)));
        if !possible {
            out.insert(Violation::ImpossiblePrimary(dm.mv.to_string()));
        }
    }
    for dm in &play.default_moves {
        let possible = pin_for(dm).is_some_and(|r| is_move_possible(rules, dm, position, Some(r)));
        if !possible {
            out.insert(Violation::ImpossibleDefault(dm.mv.to_string()));
        }
    }

    let cost = qubit_cost(position, play, settings);
    if cost > position.data.qubits.get(obj.piece.side) + 1e-10 {
        out.insert(Violation::InsufficientQubits);
    }

    for u in &obj.units {
        let primaries = play.primaries_from(u.square).count();
        let defaults = play.defaults_from(u.square).count();
        if defaults > 1 {
            out.insert(Violation::MultipleDefaults(u.square));
        }
        if defaults > 0 && primaries == 0 {
            out.insert(Violation::DefaultWithoutPrimary(u.square));
        }

        let castles = play.primaries_from(u.square).any(|d| d.mv.is_castle());
        if castles && !settings.allow_castling {
            out.insert(Violation::CastlingDisabled);
        }
        if castles && primaries > 1 && !settings.castle_splitting {
            out.insert(Violation::CastleSplit);
        }
        let doubles = play
            .primaries_from(u.square)
            .any(|d| d.mv.is_pawn_double_move());
        if doubles && primaries > 1 && !settings.pawn_double_move_splitting {
            out.insert(Violation::DoubleMoveSplit);
        }
    }
    for dm in &play.default_moves {
        if dm.mv.is_castle() && !settings.allow_castling {
            out.insert(Violation::CastlingDisabled);
        }
    }

    if settings.win_by_checkmate {
        let side = obj.piece.side;
        for (unit, u) in obj.units.iter().enumerate() {
            let r = UnitRef {
                object: play.object_index,
                unit,
            };
            let replies: Vec<&DeclaredMove> = play
                .primaries_from(u.square)
                .chain(play.defaults_from(u.square))
                .collect();
            let unresolved = Realizations::new(position, Some(r)).any(|p| {
                is_in_check(&p, side) && !replies.iter().any(|dm| rules.is_move_legal(dm, &p))
            });
            if unresolved {
                out.insert(Violation::UnresolvedCheck(u.square));
            }
        }
    }

    out
}

/// No violations.
pub fn is_play_legal(rules: &Rules, play: &Play, position: &QuantumPosition) -> bool {
    check_play_validity(rules, play, position).is_empty()
}
