//! Classical realizations of a quantum position.
//!
//! Each object independently picks one of its units, or nothing when its total
//! probability is below one. The realizations are walked with a mixed-radix odometer
//! and recomputed on every call.

use crate::chess::moves::DeclaredMove;
use crate::chess::position::{ClassicalPiece, ClassicalPosition, UnitRef};
use crate::chess::rules::Rules;
use crate::core::fraction::Fraction;
use crate::quantum::position::QuantumPosition;

/// Iterator over every classical position consistent with a quantum position.
///
/// With a pin `(object, unit)` that object's digit is fixed, giving the positions in
/// which that one unit is real.
pub struct Realizations<'a> {
    position: &'a QuantumPosition,
    radices: Vec<usize>,
    digits: Vec<usize>,
    pinned: Option<UnitRef>,
    done: bool,
}

impl<'a> Realizations<'a> {
    pub fn new(position: &'a QuantumPosition, pinned: Option<UnitRef>) -> Self {
        let radices: Vec<usize> = position
            .objects
            .iter()
            .map(|o| {
                let absent = o.total_probability() < Fraction::one();
                o.units.len() + usize::from(absent)
            })
            .collect();
        let mut digits = vec![0; radices.len()];

        let mut done = radices.iter().any(|&r| r == 0);
        if let Some(pin) = pinned {
            match position.objects.get(pin.object) {
                Some(obj) if pin.unit < obj.units.len() => digits[pin.object] = pin.unit,
                _ => done = true,
            }
        }

        Self {
            position,
            radices,
            digits,
            pinned,
            done,
        }
    }

    /// Number of realizations this iterator yields in total.
    pub fn count_all(&self) -> usize {
        self.radices
            .iter()
            .enumerate()
            .filter(|(i, _)| self.pinned.map(|p| p.object) != Some(*i))
            .map(|(_, &r)| r)
            .product()
    }

    fn current(&self) -> ClassicalPosition {
        let mut pieces = Vec::with_capacity(self.digits.len());
        for (object, (obj, &digit)) in self.position.objects.iter().zip(&self.digits).enumerate() {
            let Some(u) = obj.units.get(digit) else {
                continue;
            };
            pieces.push(ClassicalPiece {
                piece: obj.piece,
                square: u.square,
                promotion: u.promotion,
                origin: Some(UnitRef { object, unit: digit }),
            });
        }
        ClassicalPosition::new(pieces, self.position.data.clone())
    }

    fn advance(&mut self) {
        for i in 0..self.digits.len() {
            if self.pinned.is_some_and(|p| p.object == i) {
                continue;
            }
            self.digits[i] += 1;
            if self.digits[i] < self.radices[i] {
                return;
            }
            self.digits[i] = 0;
        }
        self.done = true;
    }
}

impl Iterator for Realizations<'_> {
    type Item = ClassicalPosition;

    fn next(&mut self) -> Option<ClassicalPosition> {
        if self.done {
            return None;
        }
        let out = self.current();
        self.advance();
        Some(out)
    }
}

/// Every classical realization, optionally pinned to one unit.
pub fn possible_positions(
    position: &QuantumPosition,
    pinned: Option<UnitRef>,
) -> Vec<ClassicalPosition> {
    Realizations::new(position, pinned).collect()
}

/// Legal in at least one realization.
pub fn is_move_possible(
    rules: &Rules,
    dm: &DeclaredMove,
    position: &QuantumPosition,
    pinned: Option<UnitRef>,
) -> bool {
    Realizations::new(position, pinned).any(|p| rules.is_move_legal(dm, &p))
}

/// Legal in every realization (and there is at least one).
pub fn is_move_always_legal(
    rules: &Rules,
    dm: &DeclaredMove,
    position: &QuantumPosition,
    pinned: Option<UnitRef>,
) -> bool {
    let mut seen = false;
    for p in Realizations::new(position, pinned) {
        if !rules.is_move_legal(dm, &p) {
            return false;
        }
        seen = true;
    }
    seen
}

/// `(any legal, all legal)` across the realizations, short-circuiting once they differ.
pub fn legality_verdicts(
    rules: &Rules,
    dm: &DeclaredMove,
    position: &QuantumPosition,
    pinned: Option<UnitRef>,
) -> (bool, bool) {
    let mut any = false;
    let mut all = true;
    for p in Realizations::new(position, pinned) {
        if rules.is_move_legal(dm, &p) {
            any = true;
        } else {
            all = false;
        }
        if any && !all {
            break;
        }
    }
    (any, all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::config::GameSettings;
    use crate::chess::piece::{ColoredPiece, PieceKind, Side};
    use crate::core::square::Square;
    use crate::quantum::position::{QuantumObject, Unit};

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn standard_position_has_one_realization() {
        let pos = QuantumPosition::standard(&GameSettings::default());
        let all = possible_positions(&pos, None);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].pieces.len(), 32);
    }

    #[test]
    fn absence_adds_a_branch_and_pins_fix_digits() {
        let mut pos = QuantumPosition::standard(&GameSettings::default());
        let knight = ColoredPiece::new(PieceKind::Knight, Side::White);
        let half = Fraction::new(1, 2).unwrap();
        let quarter = Fraction::new(1, 4).unwrap();
        let idx = pos.objects.iter().position(|o| o.piece == knight).unwrap();
        pos.objects[idx] = QuantumObject::new(
            knight,
            vec![Unit::new(sq("a3"), half), Unit::new(sq("c3"), quarter)],
        );

        let iter = Realizations::new(&pos, None);
        assert_eq!(iter.count_all(), 3);
        assert_eq!(iter.count(), 3);

        let pinned = possible_positions(&pos, Some(UnitRef { object: idx, unit: 1 }));
        assert_eq!(pinned.len(), 1);
        assert!(pinned[0].is_occupied(sq("c3")));
        assert!(!pinned[0].is_occupied(sq("a3")));
    }
}
