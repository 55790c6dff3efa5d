//! Play resolution: turning one validated [`Play`] into the next quantum position.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace, warn};

use crate::chess::config::GameSettings;
use crate::chess::moves::{CastleSide, DeclaredMove, Move, Play};
use crate::chess::piece::{ColoredPiece, PieceKind, Side};
use crate::chess::position::{rook_home, UnitRef};
use crate::chess::rules::{captured_square, start_middle_end, Rules};
use crate::core::entropy::BitSource;
use crate::core::fraction::Fraction;
use crate::core::square::Square;
use crate::error::{Result, RulesError};
use crate::quantum::enumerate::legality_verdicts;
use crate::quantum::measure::{
    is_possibly_in_check, make_measurement, measure_unit, move_dependencies, random_dependency,
    resolve_king, uncertain_squares,
};
use crate::quantum::movegen::detect_checkmate;
use crate::quantum::position::{QuantumPosition, Unit};
use crate::quantum::validity::{board_value, check_play_validity, qubit_cost};

const QUBIT_EPSILON: f64 = 1e-10;

/// What a resolved play sounded like. Later variants take priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Invalidated,
    Move,
    Castle,
    Promote,
    Split,
    Capture,
    Check,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Invalidated => "invalidated",
            Outcome::Move => "move",
            Outcome::Castle => "castle",
            Outcome::Promote => "promote",
            Outcome::Split => "split",
            Outcome::Capture => "capture",
            Outcome::Check => "check",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayResults {
    pub position: QuantumPosition,
    pub outcome: Outcome,
    pub game_over: bool,
    /// At least one primary or default move went through.
    pub success: bool,
}

/// Measure dependencies of `dm` until every realization with `mover` real agrees on its
/// legality, then return that verdict.
pub fn resolve_move(
    rules: &Rules,
    position: &mut QuantumPosition,
    dm: &DeclaredMove,
    mover: UnitRef,
    source: &mut dyn BitSource,
) -> Result<bool> {
    let policy = rules.settings().measurement_type;
    loop {
        let (any, all) = legality_verdicts(rules, dm, position, Some(mover));
        if !any {
            trace!(mv = %dm.mv, "move fails everywhere");
            return Ok(false);
        }
        if all {
            trace!(mv = %dm.mv, "move works everywhere");
            return Ok(true);
        }

        let mut deps = move_dependencies(rules, dm, position, mover);
        if deps.is_empty() {
            warn!(mv = %dm.mv, "verdicts differ without dependencies; measuring any uncertain unit");
            deps = uncertain_squares(position, mover.object);
        }
        let Some(target) = random_dependency(source, &deps)? else {
            warn!(mv = %dm.mv, "nothing left to measure");
            return Ok(false);
        };
        // Branch units of the mover may already sit on a dependency square.
        let found = position
            .objects
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != mover.object)
            .find_map(|(object, o)| o.unit_at(target).map(|unit| UnitRef { object, unit }));
        match found {
            Some(r) => {
                measure_unit(position, r, policy, source)?;
            }
            None => return Ok(false),
        }
    }
}

#[derive(Debug, Default)]
struct PlayFlags {
    moved: bool,
    castled: bool,
    promoted: bool,
    split: bool,
    double_move: Option<Square>,
}

/// The unit a successful move leaves behind.
fn branch_unit(original: &Unit, mv: Move, probability: Fraction) -> Result<Unit> {
    let geom = start_middle_end(mv)?;
    Ok(Unit {
        square: geom.end,
        promotion: mv.promotion().or(original.promotion),
        probability,
        entangled: original.entangled.clone(),
    })
}

/// Move `share` of the castling rook's home unit to its castled square.
fn castle_rook(
    position: &mut QuantumPosition,
    side: Side,
    direction: CastleSide,
    share: Fraction,
) -> Result<()> {
    let rook = ColoredPiece::new(PieceKind::Rook, side);
    let home = rook_home(side, direction);
    let target = Square::new(direction.rook_target_file(), side.home_rank())?;
    let Some(r) = position.find_unit_where(home, |o| o.piece == rook) else {
        return Ok(());
    };
    let obj = &mut position.objects[r.object];
    let held = obj.units[r.unit].probability.clone();
    if share >= held {
        obj.units[r.unit].square = target;
    } else {
        obj.units[r.unit].probability = held - &share;
        obj.units.push(Unit::new(target, share));
    }
    obj.merge_coincident();
    Ok(())
}

/// Append the branch of unit `r` produced by `mv` and record its side effects.
fn apply_branch(
    position: &mut QuantumPosition,
    r: UnitRef,
    mv: Move,
    probability: Fraction,
    flags: &mut PlayFlags,
    captures: &mut Vec<(Square, Square)>,
) -> Result<()> {
    let original = position.objects[r.object].units[r.unit].clone();
    let unit = branch_unit(&original, mv, probability.clone())?;
    let end = unit.square;
    position.objects[r.object].units.push(unit);

    flags.moved = true;
    match mv {
        Move::Castle { side, direction } => {
            flags.castled = true;
            castle_rook(position, side, direction, probability)?;
        }
        Move::PawnDoubleMove { .. } => {
            flags.double_move = start_middle_end(mv)?.middle.first().copied();
        }
        Move::Standard { promotion, .. } => {
            flags.promoted |= promotion.is_some();
            captures.push((end, end));
        }
        Move::EnPassant { .. } => {
            if let Some(cap) = captured_square(mv) {
                captures.push((end, cap));
            }
        }
    }
    Ok(())
}

/// Remove captured enemy units whose capturing branch is still on the board, measuring
/// first when the settings ask for it.
fn resolve_captures(
    position: &mut QuantumPosition,
    object: usize,
    captures: &[(Square, Square)],
    settings: &GameSettings,
    source: &mut dyn BitSource,
) -> Result<()> {
    let side = position.objects[object].piece.side;
    let policy = settings.measurement_type;
    for &(dest, cap) in captures {
        if position.objects[object].unit_at(dest).is_none() {
            continue;
        }
        let Some(victim) = position.find_unit_where(cap, |o| o.piece.side != side) else {
            continue;
        };
        let victim_kind = {
            let obj = &position.objects[victim.object];
            obj.units[victim.unit].promotion.unwrap_or(obj.piece.kind)
        };
        let measure = if victim_kind == PieceKind::King {
            settings.measure_king_captures
        } else {
            settings.measure_piece_captures
        };
        if measure {
            if !make_measurement(position, cap, Some(side), policy, source)? {
                continue;
            }
            if !make_measurement(position, dest, Some(side.other()), policy, source)? {
                continue;
            }
        }
        let Some(victim) = position.find_unit_where(cap, |o| o.piece.side != side) else {
            continue;
        };
        debug!(%cap, by = %dest, "capture");
        position.objects[victim.object].retain_units(|i, _| i != victim.unit);
    }
    Ok(())
}

fn snap_to_integer(x: f64) -> f64 {
    let nearest = x.round();
    if (x - nearest).abs() < QUBIT_EPSILON {
        nearest
    } else {
        x
    }
}

fn is_game_over(rules: &Rules, position: &QuantumPosition) -> bool {
    let king_lost = [Side::White, Side::Black]
        .into_iter()
        .any(|s| position.king_object(s).is_none());
    king_lost || (rules.settings().win_by_checkmate && detect_checkmate(rules, position))
}

/// Resolve `play` against `position`, consuming it and returning its successor.
///
/// The play is validated first; an invalid play is rejected with
/// [`RulesError::IllegalPlay`] and nothing is applied.
pub fn generate_play_results(
    rules: &Rules,
    mut position: QuantumPosition,
    play: &Play,
    source: &mut dyn BitSource,
) -> Result<PlayResults> {
    let settings = rules.settings();
    let violations = check_play_validity(rules, play, &position);
    if !violations.is_empty() {
        let reason = violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(RulesError::IllegalPlay { reason });
    }

    let object = play.object_index;
    let side = position.objects[object].piece.side;

    if play.is_pass() {
        debug!(%side, "pass");
        position.data.en_passant = None;
        position.data.whose_turn = side.other();
        let game_over = is_game_over(rules, &position);
        return Ok(PlayResults {
            position,
            outcome: Outcome::Invalidated,
            game_over,
            success: false,
        });
    }

    let was_in_check = settings.win_by_checkmate && is_possibly_in_check(&position, side);
    let cost = qubit_cost(&position, play, settings);
    *position.data.qubits.get_mut(side) -= cost;
    let enemy_value_before = board_value(&position, side.other(), settings);
    let counts_before = [
        position.object_count(Side::White),
        position.object_count(Side::Black),
    ];

    let mut flags = PlayFlags::default();
    let mut captures: Vec<(Square, Square)> = Vec::new();
    let originals = position.objects[object].units.clone();
    let mut exhausted: Vec<usize> = Vec::new();

    for (unit, original) in originals.iter().enumerate() {
        let primaries: Vec<DeclaredMove> = play.primaries_from(original.square).copied().collect();
        if primaries.is_empty() {
            continue;
        }
        let r = UnitRef { object, unit };
        let share = original
            .probability
            .divide(&Fraction::from_integer(primaries.len()))?;
        if primaries.len() > 1 {
            flags.split = true;
        }

        let mut buildup = Fraction::zero();
        for dm in &primaries {
            if resolve_move(rules, &mut position, dm, r, source)? {
                debug!(mv = %dm.mv, %share, "primary move succeeded");
                apply_branch(&mut position, r, dm.mv, share.clone(), &mut flags, &mut captures)?;
            } else {
                debug!(mv = %dm.mv, "primary move failed");
                buildup += &share;
            }
        }

        if buildup.is_positive() {
            if let Some(dm) = play.defaults_from(original.square).next() {
                if resolve_move(rules, &mut position, dm, r, source)? {
                    debug!(mv = %dm.mv, %buildup, "default move succeeded");
                    apply_branch(
                        &mut position,
                        r,
                        dm.mv,
                        buildup.clone(),
                        &mut flags,
                        &mut captures,
                    )?;
                    buildup = Fraction::zero();
                }
            }
        }

        if buildup.is_zero() {
            exhausted.push(unit);
        }
        position.objects[object].units[unit].probability = buildup;
    }

    let mover = &mut position.objects[object];
    mover.retain_units(|i, _| !exhausted.contains(&i));
    mover.merge_coincident();

    resolve_captures(&mut position, object, &captures, settings, source)?;

    if position.data.qubits.get(side).is_finite() {
        let reward = enemy_value_before - board_value(&position, side.other(), settings);
        let balance = position.data.qubits.get_mut(side);
        *balance = snap_to_integer(*balance + reward);
        debug!(%side, cost, reward, balance = *balance, "qubits");
    }

    position.data.en_passant = flags.double_move;
    position.refresh_castling();
    position.data.whose_turn = side.other();

    if settings.win_by_checkmate {
        resolve_king(
            &mut position,
            side.other(),
            settings.measurement_type,
            source,
        )?;
    }
    position.prune_empty_objects();

    let counts_after = [
        position.object_count(Side::White),
        position.object_count(Side::Black),
    ];
    let material_lost = board_value(&position, side.other(), settings) < enemy_value_before;
    let count_dropped = counts_after
        .iter()
        .zip(&counts_before)
        .any(|(after, before)| after < before);

    let mut outcome = Outcome::Invalidated;
    let mut raise = |flag: bool, o: Outcome| {
        if flag && o > outcome {
            outcome = o;
        }
    };
    raise(flags.moved, Outcome::Move);
    raise(flags.castled, Outcome::Castle);
    raise(flags.promoted, Outcome::Promote);
    raise(flags.split && flags.moved, Outcome::Split);
    raise(flags.moved && (material_lost || count_dropped), Outcome::Capture);
    raise(was_in_check, Outcome::Check);

    let game_over = is_game_over(rules, &position);
    debug!(%outcome, game_over, "play resolved");
    Ok(PlayResults {
        position,
        outcome,
        game_over,
        success: flags.moved,
    })
}
