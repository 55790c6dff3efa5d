//! Dependency analysis and measurement (collapse).
//!
//! A declared move can be legal in some realizations and illegal in others. The squares
//! whose occupancy decides the difference are its dependencies; measuring them one at a
//! time eventually makes the verdict uniform.

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::chess::config::MeasurementType;
use crate::chess::moves::{Declaration, DeclaredMove, Move};
use crate::chess::piece::{PieceKind, Side};
use crate::chess::position::{rook_home, ClassicalPosition, UnitRef};
use crate::chess::rules::{
    captured_square, is_in_check, leap_checking_pieces, result_of_move, start_middle_end, Rules,
};
use crate::core::entropy::{random_below, weighted_coin, weighted_index, BitSource};
use crate::core::fraction::Fraction;
use crate::core::square::Square;
use crate::error::Result;
use crate::quantum::enumerate::Realizations;
use crate::quantum::position::QuantumPosition;

/// Squares that decide whether `side`'s king is in check in `pos`: the king, every
/// geometric attacker, and every occupied square on an attacker's line.
pub fn check_dependencies(pos: &ClassicalPosition, side: Side) -> Vec<Square> {
    let Some(king) = pos.king(side) else {
        return Vec::new();
    };
    let mut out = vec![king.square];
    for attacker in leap_checking_pieces(pos, side) {
        out.push(attacker.square);
        if attacker.kind() == PieceKind::Knight {
            continue;
        }
        if let Ok(geom) = start_middle_end(Move::standard(attacker.square, king.square)) {
            out.extend(geom.middle.into_iter().filter(|&sq| pos.is_occupied(sq)));
        }
    }
    out
}

/// Copy of `pos` with the piece on `from` standing on `to` instead.
fn with_piece_moved(pos: &ClassicalPosition, from: Square, to: Square) -> ClassicalPosition {
    let mut shifted = pos.clone();
    if let Some(mut piece) = shifted.remove_at(from) {
        piece.square = to;
        shifted.place(piece);
    }
    shifted
}

/// Uncertain squares of other objects whose collapse can change whether `dm`, made by
/// the unit `mover`, is legal.
///
/// Certain units are dropped: measuring them cannot change anything.
pub fn move_dependencies(
    rules: &Rules,
    dm: &DeclaredMove,
    position: &QuantumPosition,
    mover: UnitRef,
) -> Vec<Square> {
    let Ok(geom) = start_middle_end(dm.mv) else {
        return Vec::new();
    };
    let Some(obj) = position.objects.get(mover.object) else {
        return Vec::new();
    };
    let side = obj.piece.side;

    let mut squares = vec![geom.end];
    if let Some(cap) = captured_square(dm.mv) {
        squares.push(cap);
    }
    if dm.declarations.contains(Declaration::NonLeaping) {
        squares.extend(geom.middle.iter().copied());
    }
    if let Move::Castle { side, direction } = dm.mv {
        squares.push(rook_home(side, direction));
    }

    let gives_check_relevant = dm.declarations.contains(Declaration::CheckOnly)
        || dm.declarations.contains(Declaration::NoCheck);
    let win_by_checkmate = rules.settings().win_by_checkmate;
    if win_by_checkmate || gives_check_relevant {
        for pos in Realizations::new(position, Some(mover)) {
            if let Ok(next) = result_of_move(dm.mv, &pos) {
                if win_by_checkmate {
                    squares.extend(check_dependencies(&next, side));
                }
                if gives_check_relevant {
                    squares.extend(check_dependencies(&next, side.other()));
                }
            }
            if win_by_checkmate && dm.mv.is_castle() {
                squares.extend(check_dependencies(&pos, side));
                let crossed = geom.start.delta(geom.end).step();
                if let Some(transit) = geom.start.offset(crossed) {
                    let shifted = with_piece_moved(&pos, geom.start, transit);
                    squares.extend(check_dependencies(&shifted, side));
                }
            }
        }
    }

    let mut seen = FxHashSet::default();
    squares
        .into_iter()
        .filter(|&sq| seen.insert(sq))
        .filter(|&sq| is_uncertain_other(position, sq, mover.object))
        .collect()
}

fn is_uncertain_other(position: &QuantumPosition, sq: Square, mover_object: usize) -> bool {
    position
        .objects
        .iter()
        .enumerate()
        .any(|(i, o)| i != mover_object && !o.is_certain() && o.unit_at(sq).is_some())
}

/// Every uncertain unit square outside the mover's object.
pub fn uncertain_squares(position: &QuantumPosition, mover_object: usize) -> Vec<Square> {
    position
        .objects
        .iter()
        .enumerate()
        .filter(|(i, o)| *i != mover_object && !o.is_certain())
        .flat_map(|(_, o)| o.units.iter().map(|u| u.square))
        .collect()
}

/// Uniform choice among `deps`; `None` when there is nothing to choose.
pub fn random_dependency(source: &mut dyn BitSource, deps: &[Square]) -> Result<Option<Square>> {
    if deps.is_empty() {
        return Ok(None);
    }
    let i = random_below(source, deps.len() as u128)? as usize;
    Ok(Some(deps[i]))
}

/// Collapse the unit on `target`, ignoring objects of `excluded`.
///
/// Returns whether the target square is still held by the measured object afterwards.
/// An empty square measures as `false` and changes nothing.
pub fn make_measurement(
    position: &mut QuantumPosition,
    target: Square,
    excluded: Option<Side>,
    policy: MeasurementType,
    source: &mut dyn BitSource,
) -> Result<bool> {
    let Some(r) = position.find_unit(target, excluded) else {
        trace!(%target, "measured an empty square");
        return Ok(false);
    };
    measure_unit(position, r, policy, source)
}

/// Collapse one unit together with everything entangled to it.
pub fn measure_unit(
    position: &mut QuantumPosition,
    r: UnitRef,
    policy: MeasurementType,
    source: &mut dyn BitSource,
) -> Result<bool> {
    let obj = &mut position.objects[r.object];
    let target = obj.units[r.unit].square;
    let set = obj.entangled_group(r.unit);
    let weights: Vec<Fraction> = set
        .iter()
        .map(|&i| obj.units[i].probability.clone())
        .collect();
    let inner: Fraction = weights.iter().sum();

    let occupied = match policy {
        MeasurementType::Binary => {
            if weighted_coin(source, &inner)? {
                let kept = set[weighted_index(source, &weights)?];
                obj.retain_units(|i, _| i == kept);
                obj.units[0].probability = Fraction::one();
                obj.units[0].square == target
            } else {
                let rest = Fraction::one() - &inner;
                obj.retain_units(|i, _| !set.contains(&i));
                for u in &mut obj.units {
                    u.probability = u.probability.divide(&rest)?;
                }
                false
            }
        }
        MeasurementType::Proportional => {
            let chosen = set[weighted_index(source, &weights)?];
            obj.units[chosen].probability = inner.clone();
            obj.retain_units(|i, _| i == chosen || !set.contains(&i));
            match obj.unit_at(target) {
                Some(idx) => {
                    if weighted_coin(source, &inner)? {
                        obj.retain_units(|i, _| i == idx);
                        obj.units[0].probability = Fraction::one();
                        true
                    } else {
                        // The piece turned out not to exist anywhere.
                        obj.retain_units(|_, _| false);
                        false
                    }
                }
                None => false,
            }
        }
    };

    debug!(
        object = r.object,
        piece = %obj.piece,
        %target,
        ?policy,
        occupied,
        "measured"
    );
    Ok(occupied)
}

/// Uncertain squares deciding whether `side` is in check, across every realization.
fn king_dependencies(position: &QuantumPosition, side: Side) -> Vec<Square> {
    let mut seen = FxHashSet::default();
    Realizations::new(position, None)
        .flat_map(|p| check_dependencies(&p, side))
        .filter(|&sq| seen.insert(sq))
        .filter(|&sq| {
            position
                .objects
                .iter()
                .any(|o| !o.is_certain() && o.unit_at(sq).is_some())
        })
        .collect()
}

/// Measure check dependencies of `side`'s king until the king has a single certain
/// placement or is gone.
pub fn resolve_king(
    position: &mut QuantumPosition,
    side: Side,
    policy: MeasurementType,
    source: &mut dyn BitSource,
) -> Result<()> {
    while let Some(k) = position.king_object(side) {
        if position.objects[k].is_certain() {
            break;
        }
        let deps = king_dependencies(position, side);
        let r = match random_dependency(source, &deps)? {
            Some(target) => position.find_unit_where(target, |o| !o.is_certain()),
            None => None,
        };
        // The king's squares are among the dependencies while it is uncertain.
        let r = r.unwrap_or(UnitRef { object: k, unit: 0 });
        trace!(%side, square = %position.unit(r).square, "resolving king");
        measure_unit(position, r, policy, source)?;
    }
    Ok(())
}

/// Whether `side` is in check in any realization.
pub fn is_possibly_in_check(position: &QuantumPosition, side: Side) -> bool {
    Realizations::new(position, None).any(|p| is_in_check(&p, side))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::piece::ColoredPiece;
    use crate::chess::position::GameData;
    use crate::core::entropy::BitQueue;
    use crate::quantum::position::{QuantumObject, Unit};

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn frac(n: i128, d: i128) -> Fraction {
        Fraction::new(n, d).unwrap()
    }

    fn split_knight(units: Vec<Unit>) -> QuantumPosition {
        let knight = ColoredPiece::new(PieceKind::Knight, Side::White);
        let mut data = GameData::standard(5.0);
        data.castling = crate::chess::position::CastlingRights::NONE;
        QuantumPosition {
            objects: vec![QuantumObject::new(knight, units)],
            data,
        }
    }

    #[test]
    fn binary_yes_collapses_whole_object() {
        let mut pos = split_knight(vec![
            Unit::new(sq("a3"), frac(1, 2)),
            Unit::new(sq("c3"), frac(1, 2)),
        ]);
        let mut q = BitQueue::new();
        q.add_custom([false]);
        let hit = make_measurement(&mut pos, sq("a3"), None, MeasurementType::Binary, &mut q)
            .unwrap();
        assert!(hit);
        assert_eq!(pos.objects[0].units.len(), 1);
        assert!(pos.objects[0].is_certain());
        assert!(q.is_empty());
    }

    #[test]
    fn binary_no_renormalizes_the_rest() {
        let mut pos = split_knight(vec![
            Unit::new(sq("a3"), frac(1, 2)),
            Unit::new(sq("c3"), frac(1, 4)),
            Unit::new(sq("d2"), frac(1, 4)),
        ]);
        let mut q = BitQueue::new();
        q.add_custom([true]);
        let hit = make_measurement(&mut pos, sq("a3"), None, MeasurementType::Binary, &mut q)
            .unwrap();
        assert!(!hit);
        let obj = &pos.objects[0];
        assert_eq!(obj.units.len(), 2);
        assert_eq!(obj.total_probability(), Fraction::one());
        assert_eq!(obj.units[0].probability, frac(1, 2));
    }

    #[test]
    fn proportional_keeps_target_with_combined_weight() {
        let mut units = vec![
            Unit::new(sq("a3"), frac(1, 4)),
            Unit::new(sq("c3"), frac(1, 4)),
            Unit::new(sq("d2"), frac(1, 2)),
        ];
        units[0].entangled = vec![1];
        units[1].entangled = vec![0];
        let mut pos = split_knight(units);
        let mut q = BitQueue::new();
        // pick a3 from {a3, c3}, then the 1/2 coin says yes
        q.add_custom([false, false]);
        let hit = make_measurement(
            &mut pos,
            sq("a3"),
            None,
            MeasurementType::Proportional,
            &mut q,
        )
        .unwrap();
        assert!(hit);
        assert!(pos.objects[0].is_certain());
        assert_eq!(pos.objects[0].units[0].square, sq("a3"));
    }

    #[test]
    fn proportional_no_removes_the_whole_piece() {
        let mut pos = split_knight(vec![
            Unit::new(sq("a3"), frac(1, 2)),
            Unit::new(sq("c3"), frac(1, 2)),
        ]);
        let mut q = BitQueue::new();
        // the lone a3 unit is chosen without bits, then the 1/2 coin says no
        q.add_custom([true]);
        let hit = make_measurement(
            &mut pos,
            sq("a3"),
            None,
            MeasurementType::Proportional,
            &mut q,
        )
        .unwrap();
        assert!(!hit);
        assert!(pos.objects[0].is_empty());
        assert!(q.is_empty());
    }

    #[test]
    fn proportional_partner_pick_empties_the_target() {
        let mut units = vec![
            Unit::new(sq("a3"), frac(1, 4)),
            Unit::new(sq("c3"), frac(1, 4)),
            Unit::new(sq("d2"), frac(1, 2)),
        ];
        units[0].entangled = vec![1];
        units[1].entangled = vec![0];
        let mut pos = split_knight(units);
        let mut q = BitQueue::new();
        q.add_custom([true]);
        let hit = make_measurement(
            &mut pos,
            sq("a3"),
            None,
            MeasurementType::Proportional,
            &mut q,
        )
        .unwrap();
        assert!(!hit);
        let obj = &pos.objects[0];
        assert_eq!(obj.units.len(), 2);
        assert_eq!(obj.units[0].square, sq("c3"));
        assert_eq!(obj.units[0].probability, frac(1, 2));
    }

    #[test]
    fn king_resolution_measures_until_certain() {
        let king = ColoredPiece::new(PieceKind::King, Side::Black);
        let mut data = GameData::standard(5.0);
        data.castling = crate::chess::position::CastlingRights::NONE;
        let mut pos = QuantumPosition {
            objects: vec![
                QuantumObject::classical(ColoredPiece::new(PieceKind::King, Side::White), sq("h1")),
                QuantumObject::classical(ColoredPiece::new(PieceKind::Rook, Side::White), sq("a1")),
                QuantumObject::new(
                    king,
                    vec![Unit::new(sq("e8"), frac(1, 2)), Unit::new(sq("d8"), frac(1, 2))],
                ),
            ],
            data,
        };
        let mut q = BitQueue::new();
        // pick e8 among {e8, d8}, then the 1/2 coin says yes
        q.add_custom([false, false]);
        resolve_king(&mut pos, Side::Black, MeasurementType::Binary, &mut q).unwrap();
        assert!(pos.objects[2].is_certain());
        assert_eq!(pos.objects[2].units[0].square, sq("e8"));
        assert!(q.is_empty());
    }

    #[test]
    fn king_dependencies_include_uncertain_attackers() {
        let mut data = GameData::standard(5.0);
        data.castling = crate::chess::position::CastlingRights::NONE;
        let half = frac(1, 2);
        let pos = QuantumPosition {
            objects: vec![
                QuantumObject::classical(ColoredPiece::new(PieceKind::King, Side::White), sq("a1")),
                QuantumObject::new(
                    ColoredPiece::new(PieceKind::Rook, Side::White),
                    vec![Unit::new(sq("e1"), half.clone()), Unit::new(sq("h1"), half.clone())],
                ),
                QuantumObject::new(
                    ColoredPiece::new(PieceKind::King, Side::Black),
                    vec![Unit::new(sq("e8"), half.clone()), Unit::new(sq("d8"), half)],
                ),
            ],
            data,
        };
        let mut deps = king_dependencies(&pos, Side::Black);
        deps.sort();
        // the empty e-file between rook and king is not a dependency
        assert_eq!(deps, vec![sq("d8"), sq("e1"), sq("e8")]);
    }

    #[test]
    fn excluded_side_hides_units() {
        let mut pos = split_knight(vec![
            Unit::new(sq("a3"), frac(1, 2)),
            Unit::new(sq("c3"), frac(1, 2)),
        ]);
        let mut q = BitQueue::new();
        let hit = make_measurement(
            &mut pos,
            sq("a3"),
            Some(Side::White),
            MeasurementType::Binary,
            &mut q,
        )
        .unwrap();
        assert!(!hit);
        assert_eq!(pos.objects[0].units.len(), 2);
    }

    #[test]
    fn random_dependency_of_nothing_is_none() {
        let mut q = BitQueue::new();
        assert_eq!(random_dependency(&mut q, &[]).unwrap(), None);
        assert_eq!(random_dependency(&mut q, &[sq("e4")]).unwrap(), Some(sq("e4")));
    }
}
