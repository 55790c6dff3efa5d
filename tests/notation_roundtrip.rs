use proptest::prelude::*;
use quantum_chess::chess::piece::{ColoredPiece, PieceKind, Side};
use quantum_chess::chess::position::{CastlingRights, GameData, QubitBalance};
use quantum_chess::core::fraction::Fraction;
use quantum_chess::core::square::Square;
use quantum_chess::notation::{decode, encode, is_valid_encoding};
use quantum_chess::quantum::position::{QuantumObject, QuantumPosition, Unit};

/// Squares off the back ranks, so no promotion or castling bookkeeping applies.
fn inner_squares() -> Vec<Square> {
    Square::all().filter(|s| !s.is_back_rank()).collect()
}

#[derive(Debug, Clone)]
struct ObjectSpec {
    kind: usize,
    white: bool,
    units: usize,
    missing: i128,
    entangled: bool,
}

fn arb_object() -> impl Strategy<Value = ObjectSpec> {
    (0..6usize, any::<bool>(), 1..=3usize, 0..3i128, any::<bool>()).prop_map(
        |(kind, white, units, missing, entangled)| ObjectSpec {
            kind,
            white,
            units,
            missing,
            entangled,
        },
    )
}

fn arb_position() -> impl Strategy<Value = QuantumPosition> {
    (
        prop::collection::vec(arb_object(), 0..8),
        prop::sample::subsequence(inner_squares(), 24),
        any::<bool>(),
        prop_oneof![Just(f64::INFINITY), (0u8..40).prop_map(|q| q as f64 / 2.0)],
    )
        .prop_map(|(specs, squares, white_to_move, qubits)| {
            let mut free = squares.into_iter();
            let objects = specs
                .into_iter()
                .map(|spec| {
                    let p = Fraction::new(1, spec.units as i128 + spec.missing).unwrap();
                    let units = (0..spec.units)
                        .map(|_| Unit::new(free.next().unwrap(), p.clone()))
                        .collect();
                    let side = if spec.white { Side::White } else { Side::Black };
                    let mut obj = QuantumObject::new(ColoredPiece::new(PieceKind::ALL[spec.kind], side), units);
                    if spec.entangled && spec.units > 1 {
                        obj.entangle(0, spec.units - 1);
                    }
                    obj
                })
                .collect();
            let data = GameData {
                whose_turn: if white_to_move { Side::White } else { Side::Black },
                castling: CastlingRights::NONE,
                en_passant: None,
                qubits: QubitBalance {
                    white: qubits,
                    black: qubits,
                },
            };
            QuantumPosition::new(objects, data).unwrap()
        })
}

proptest! {
    #[test]
    fn encode_decode_encode_is_stable(pos in arb_position()) {
        let text = encode(&pos);
        prop_assert!(is_valid_encoding(&text));
        let decoded = decode(&text).unwrap();
        prop_assert_eq!(encode(&decoded), text);
        prop_assert_eq!(decoded, pos);
    }
}

#[test]
fn one_sided_en_passant_is_rejected() {
    let text = "turn: black, castling: wl false wr false bl false br false, enpassant: e3, qubits: w 5 b 5|kingW: (e1,1/1)|kingB: (e8,1/1)";
    assert!(!is_valid_encoding(text));
    let with_pawn = "turn: black, castling: wl false wr false bl false br false, enpassant: e3, qubits: w 5 b 5|kingW: (e1,1/1)|pawnW: (e4,1/1)|kingB: (e8,1/1)";
    assert!(is_valid_encoding(with_pawn));
}

#[test]
fn castling_flags_must_match_occupancy() {
    let text = "turn: white, castling: wl false wr true bl false br false, enpassant: false, qubits: w 5 b 5|kingW: (e1,1/1)|kingB: (e8,1/1)";
    assert!(!is_valid_encoding(text));
}

#[test]
fn enormous_coprime_denominators_are_handled_exactly() {
    let header = "turn: white, castling: wl false wr false bl false br false, enpassant: false, qubits: w 5 b 5";
    let fits = format!(
        "{header}|kingW: (e1,1/1)|kingB: (e8,1/1)|knightW: (a3,1/170141183460469231731687303715884105727) (b3,1/170141183460469231731687303715884105725)"
    );
    assert!(is_valid_encoding(&fits));
    assert_eq!(encode(&decode(&fits).unwrap()), fits);

    let overfull = format!(
        "{header}|knightW: (a3,170141183460469231731687303715884105726/170141183460469231731687303715884105727) (b3,2/170141183460469231731687303715884105725)"
    );
    assert!(!is_valid_encoding(&overfull));
}

#[test]
fn non_canonical_numbers_are_rejected() {
    let base = "turn: white, castling: wl false wr false bl false br false, enpassant: false";
    let ok = format!("{base}, qubits: w 5 b 4.5|kingW: (e1,1/1)|knightB: (a6,1/2)");
    assert!(is_valid_encoding(&ok));
    let unreduced = format!("{base}, qubits: w 5 b 4.5|kingW: (e1,1/1)|knightB: (a6,2/4)");
    assert!(!is_valid_encoding(&unreduced));
    let bare = format!("{base}, qubits: w 5 b 4.5|kingW: (e1,1)");
    assert!(!is_valid_encoding(&bare));
    let padded = format!("{base}, qubits: w 5.0 b 4.5|kingW: (e1,1/1)");
    assert!(!is_valid_encoding(&padded));
}
