//! The quantum position: objects, their weighted units, and entanglement.
//!
//! Units of one object live in a dense `Vec`; entanglement is stored as indices into
//! that same `Vec`. Any removal goes through [`QuantumObject::retain_units`], which owns
//! the index remapping.

use crate::chess::config::GameSettings;
use crate::chess::piece::{ColoredPiece, PieceKind, Side};
use crate::chess::position::{standard_setup, GameData, UnitRef};
use crate::core::fraction::Fraction;
use crate::core::square::Square;
use crate::error::{Result, RulesError};

/// One candidate placement of an object.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub square: Square,
    pub promotion: Option<PieceKind>,
    pub probability: Fraction,
    /// Indices of units of the same object that must collapse together with this one.
    pub entangled: Vec<usize>,
}

impl Unit {
    pub fn new(square: Square, probability: Fraction) -> Self {
        Self {
            square,
            promotion: None,
            probability,
            entangled: Vec::new(),
        }
    }

    pub fn with_promotion(mut self, promotion: Option<PieceKind>) -> Self {
        self.promotion = promotion;
        self
    }
}

/// One tracked piece across all of its superposed placements.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantumObject {
    pub piece: ColoredPiece,
    pub units: Vec<Unit>,
}

impl QuantumObject {
    pub fn new(piece: ColoredPiece, units: Vec<Unit>) -> Self {
        Self { piece, units }
    }

    /// A piece known to stand on `square`.
    pub fn classical(piece: ColoredPiece, square: Square) -> Self {
        Self::new(piece, vec![Unit::new(square, Fraction::one())])
    }

    /// Probability the piece still exists.
    pub fn total_probability(&self) -> Fraction {
        self.units.iter().map(|u| &u.probability).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Exactly one placement, with certainty.
    #[inline]
    pub fn is_certain(&self) -> bool {
        self.units.len() == 1 && self.units[0].probability == Fraction::one()
    }

    pub fn unit_at(&self, sq: Square) -> Option<usize> {
        self.units.iter().position(|u| u.square == sq)
    }

    /// Record a symmetric entanglement link between two units.
    pub fn entangle(&mut self, a: usize, b: usize) {
        if a == b || a >= self.units.len() || b >= self.units.len() {
            return;
        }
        if !self.units[a].entangled.contains(&b) {
            self.units[a].entangled.push(b);
        }
        if !self.units[b].entangled.contains(&a) {
            self.units[b].entangled.push(a);
        }
    }

    /// `idx` plus every unit directly entangled to it, ascending.
    pub fn entangled_group(&self, idx: usize) -> Vec<usize> {
        let mut group = vec![idx];
        group.extend(self.units[idx].entangled.iter().copied());
        group.sort_unstable();
        group.dedup();
        group.retain(|&i| i < self.units.len());
        group
    }

    /// Drop every unit for which `keep` is false, remapping entanglement indices
    /// and stripping links to removed units.
    pub fn retain_units(&mut self, mut keep: impl FnMut(usize, &Unit) -> bool) {
        let mut remap: Vec<Option<usize>> = Vec::with_capacity(self.units.len());
        let mut next = 0usize;
        for (i, u) in self.units.iter().enumerate() {
            if keep(i, u) {
                remap.push(Some(next));
                next += 1;
            } else {
                remap.push(None);
            }
        }

        let old = std::mem::take(&mut self.units);
        self.units = old
            .into_iter()
            .enumerate()
            .filter(|(i, _)| remap[*i].is_some())
            .map(|(_, mut u)| {
                u.entangled = u
                    .entangled
                    .iter()
                    .filter_map(|&j| remap.get(j).copied().flatten())
                    .collect();
                u
            })
            .collect();
        self.strip_dangling();
    }

    /// Remove out-of-range, self and one-sided links; sort and dedup the rest.
    pub fn strip_dangling(&mut self) {
        let n = self.units.len();
        for i in 0..n {
            let mut links = std::mem::take(&mut self.units[i].entangled);
            links.retain(|&j| j < n && j != i);
            links.sort_unstable();
            links.dedup();
            self.units[i].entangled = links;
        }
        for i in 0..n {
            let links = self.units[i].entangled.clone();
            for j in links {
                if !self.units[j].entangled.contains(&i) {
                    self.units[j].entangled.push(i);
                    self.units[j].entangled.sort_unstable();
                }
            }
        }
    }

    /// Fold units sharing a square into the first of them, summing probabilities and
    /// uniting entanglement.
    pub fn merge_coincident(&mut self) {
        let n = self.units.len();
        let mut target: Vec<usize> = (0..n).collect();
        for i in 0..n {
            if let Some(first) = (0..i).find(|&j| self.units[j].square == self.units[i].square) {
                target[i] = target[first];
            }
        }
        if (0..n).all(|i| target[i] == i) {
            return;
        }

        for i in 0..n {
            let t = target[i];
            if t == i {
                continue;
            }
            let p = self.units[i].probability.clone();
            self.units[t].probability += p;
            if self.units[t].promotion.is_none() {
                self.units[t].promotion = self.units[i].promotion;
            }
        }
        // Redirect every link to the surviving representative before dropping.
        for i in 0..n {
            let links: Vec<usize> = self.units[i].entangled.iter().map(|&j| target[j]).collect();
            let t = target[i];
            if t == i {
                self.units[i].entangled = links;
            } else {
                self.units[t].entangled.extend(links);
            }
        }
        self.retain_units(|i, _| target[i] == i);
    }
}

/// The top-level game state.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantumPosition {
    pub objects: Vec<QuantumObject>,
    pub data: GameData,
}

impl QuantumPosition {
    /// Build and validate.
    pub fn new(objects: Vec<QuantumObject>, data: GameData) -> Result<Self> {
        let pos = Self { objects, data };
        pos.validate()?;
        Ok(pos)
    }

    /// The orthodox start: one certain object per piece.
    pub fn standard(settings: &GameSettings) -> Self {
        let qubits = if settings.unlimited_qubits {
            f64::INFINITY
        } else {
            settings.starting_qubits
        };
        let objects = standard_setup()
            .into_iter()
            .map(|(piece, sq)| QuantumObject::classical(piece, sq))
            .collect();
        Self {
            objects,
            data: GameData::standard(qubits),
        }
    }

    pub fn unit(&self, r: UnitRef) -> &Unit {
        &self.objects[r.object].units[r.unit]
    }

    /// First unit on `sq`, skipping objects of `excluded`.
    pub fn find_unit(&self, sq: Square, excluded: Option<Side>) -> Option<UnitRef> {
        self.find_unit_where(sq, |obj| Some(obj.piece.side) != excluded)
    }

    /// First unit on `sq` whose object satisfies `accept`.
    pub fn find_unit_where(
        &self,
        sq: Square,
        accept: impl Fn(&QuantumObject) -> bool,
    ) -> Option<UnitRef> {
        self.objects.iter().enumerate().find_map(|(object, obj)| {
            if !accept(obj) {
                return None;
            }
            obj.unit_at(sq).map(|unit| UnitRef { object, unit })
        })
    }

    /// Index of `side`'s king object, if it still has any placement.
    pub fn king_object(&self, side: Side) -> Option<usize> {
        let king = ColoredPiece::new(PieceKind::King, side);
        self.objects
            .iter()
            .position(|o| o.piece == king && !o.is_empty())
    }

    /// Every object is certain (or gone).
    pub fn is_classical(&self) -> bool {
        self.objects.iter().all(|o| o.is_empty() || o.is_certain())
    }

    pub fn object_count(&self, side: Side) -> usize {
        self.objects
            .iter()
            .filter(|o| o.piece.side == side && !o.is_empty())
            .count()
    }

    pub fn prune_empty_objects(&mut self) {
        self.objects.retain(|o| !o.is_empty());
    }

    /// Drop castling rights whose king or rook no longer has a placement at home.
    pub fn refresh_castling(&mut self) {
        let objects = &self.objects;
        self.data.castling = self.data.castling.restricted_by(|piece, sq| {
            objects
                .iter()
                .any(|o| o.piece == piece && o.unit_at(sq).is_some())
        });
    }

    /// Check every structural invariant of a position.
    pub fn validate(&self) -> Result<()> {
        let mut seen: Vec<Square> = Vec::new();
        for (oi, obj) in self.objects.iter().enumerate() {
            let mut total = Fraction::zero();
            for (ui, u) in obj.units.iter().enumerate() {
                if !u.probability.is_positive() || u.probability > Fraction::one() {
                    return Err(RulesError::structural(format!(
                        "object {oi} unit {ui} has probability {}",
                        u.probability
                    )));
                }
                total += &u.probability;

                if seen.contains(&u.square) {
                    return Err(RulesError::structural(format!(
                        "square {} is occupied twice",
                        u.square
                    )));
                }
                seen.push(u.square);

                validate_promotion(obj.piece, u).map_err(|reason| {
                    RulesError::structural(format!("object {oi} unit {ui}: {reason}"))
                })?;

                for &j in &u.entangled {
                    if j >= obj.units.len() || j == ui {
                        return Err(RulesError::structural(format!(
                            "object {oi} unit {ui} has a bad entanglement index {j}"
                        )));
                    }
                    if !obj.units[j].entangled.contains(&ui) {
                        return Err(RulesError::structural(format!(
                            "object {oi} entanglement {ui}-{j} is one-sided"
                        )));
                    }
                }
            }
            if total > Fraction::one() {
                return Err(RulesError::structural(format!(
                    "object {oi} has total probability {total}"
                )));
            }
        }

        if let Some(target) = self.data.en_passant {
            let pusher = self.data.whose_turn.other();
            let pawn = ColoredPiece::new(PieceKind::Pawn, pusher);
            let expected_rank = pusher.pawn_rank() + pusher.forward();
            let beyond = target.offset(crate::core::coord::Coord::new(0, pusher.forward()));
            let consistent = target.y() == expected_rank
                && beyond.is_some_and(|sq| {
                    self.objects
                        .iter()
                        .any(|o| o.piece == pawn && o.unit_at(sq).is_some())
                });
            if !consistent {
                return Err(RulesError::structural(format!(
                    "en passant target {target} has no {pusher} pawn beyond it"
                )));
            }
        }

        let mut refreshed = self.clone();
        refreshed.refresh_castling();
        if refreshed.data.castling != self.data.castling {
            return Err(RulesError::structural(
                "castling rights disagree with king/rook placements",
            ));
        }

        Ok(())
    }
}

fn validate_promotion(piece: ColoredPiece, u: &Unit) -> std::result::Result<(), String> {
    match (piece.kind, u.promotion) {
        (PieceKind::Pawn, Some(k)) if !k.is_promotion_target() => {
            Err(format!("pawn cannot promote to {k}"))
        }
        (PieceKind::Pawn, Some(_)) if !u.square.is_back_rank() => {
            Err(format!("promotion recorded off the back rank at {}", u.square))
        }
        (PieceKind::Pawn, None) if u.square.is_back_rank() => {
            Err(format!("pawn on {} without a promotion", u.square))
        }
        (PieceKind::Pawn, _) => Ok(()),
        (kind, Some(_)) => Err(format!("{kind} carries a promotion")),
        (_, None) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn half() -> Fraction {
        Fraction::new(1, 2).unwrap()
    }

    fn rook() -> ColoredPiece {
        ColoredPiece::new(PieceKind::Rook, Side::White)
    }

    #[test]
    fn standard_position_is_valid() {
        let pos = QuantumPosition::standard(&GameSettings::default());
        assert_eq!(pos.objects.len(), 32);
        assert!(pos.is_classical());
        pos.validate().unwrap();
    }

    #[test]
    fn retain_remaps_entanglement() {
        let third = Fraction::new(1, 3).unwrap();
        let mut obj = QuantumObject::new(
            rook(),
            vec![
                Unit::new(sq("a1"), third.clone()),
                Unit::new(sq("a2"), third.clone()),
                Unit::new(sq("a3"), third),
            ],
        );
        obj.entangle(0, 2);
        obj.entangle(1, 2);
        obj.retain_units(|i, _| i != 0);
        assert_eq!(obj.units.len(), 2);
        assert_eq!(obj.units[0].entangled, vec![1]);
        assert_eq!(obj.units[1].entangled, vec![0]);
    }

    #[test]
    fn coincident_units_merge() {
        let quarter = Fraction::new(1, 4).unwrap();
        let mut obj = QuantumObject::new(
            rook(),
            vec![
                Unit::new(sq("a1"), half()),
                Unit::new(sq("a2"), quarter.clone()),
                Unit::new(sq("a1"), quarter),
            ],
        );
        obj.entangle(1, 2);
        obj.merge_coincident();
        assert_eq!(obj.units.len(), 2);
        assert_eq!(obj.units[0].probability, Fraction::new(3, 4).unwrap());
        assert_eq!(obj.units[0].entangled, vec![1]);
        assert_eq!(obj.units[1].entangled, vec![0]);
    }

    #[test]
    fn double_occupancy_is_structural() {
        let mut pos = QuantumPosition::standard(&GameSettings::default());
        pos.objects[0].units[0].square = sq("b1");
        assert!(matches!(
            pos.validate(),
            Err(RulesError::StructuralViolation { .. })
        ));
    }

    #[test]
    fn overfull_object_is_structural() {
        let obj = QuantumObject::new(
            rook(),
            vec![Unit::new(sq("a3"), half()), Unit::new(sq("a4"), Fraction::one())],
        );
        let mut data = GameData::standard(1.0);
        data.castling = crate::chess::position::CastlingRights::NONE;
        assert!(QuantumPosition::new(vec![obj], data).is_err());
    }
}
