use quantum_chess::chess::config::GameSettings;
use quantum_chess::chess::moves::{DeclaredMove, Move};
use quantum_chess::chess::piece::{ColoredPiece, PieceKind, Side};
use quantum_chess::chess::position::{CastlingRights, GameData, UnitRef};
use quantum_chess::chess::rules::Rules;
use quantum_chess::core::fraction::Fraction;
use quantum_chess::core::square::Square;
use quantum_chess::quantum::enumerate::{
    is_move_always_legal, is_move_possible, possible_positions, Realizations,
};
use quantum_chess::quantum::position::{QuantumObject, QuantumPosition, Unit};

fn sq(s: &str) -> Square {
    s.parse().unwrap()
}

fn kings_and(extra: QuantumObject, white_king: &str) -> QuantumPosition {
    let mut data = GameData::standard(5.0);
    data.castling = CastlingRights::NONE;
    QuantumPosition::new(
        vec![
            QuantumObject::classical(ColoredPiece::new(PieceKind::King, Side::White), sq(white_king)),
            QuantumObject::classical(ColoredPiece::new(PieceKind::King, Side::Black), sq("h8")),
            extra,
        ],
        data,
    )
    .unwrap()
}

fn split_rook(side: Side, squares: &[&str], each: Fraction) -> QuantumObject {
    QuantumObject::new(
        ColoredPiece::new(PieceKind::Rook, side),
        squares.iter().map(|s| Unit::new(sq(s), each.clone())).collect(),
    )
}

#[test]
fn k_equal_units_give_k_realizations() {
    let files = ["a4", "b4", "c4", "d4", "e4", "f4"];
    for k in 1..=files.len() {
        let each = Fraction::new(1, k as i128).unwrap();
        let pos = kings_and(split_rook(Side::White, &files[..k], each), "e1");
        let all = possible_positions(&pos, None);
        assert_eq!(all.len(), k);
        for (i, p) in all.iter().enumerate() {
            let rooks: Vec<Square> = p
                .pieces
                .iter()
                .filter(|c| c.kind() == PieceKind::Rook)
                .map(|c| c.square)
                .collect();
            assert_eq!(rooks, vec![sq(files[i])]);
        }
    }
}

#[test]
fn missing_mass_adds_an_absent_realization() {
    let third = Fraction::new(1, 3).unwrap();
    let pos = kings_and(split_rook(Side::White, &["a4", "b4"], third), "e1");
    let all = possible_positions(&pos, None);
    assert_eq!(all.len(), 3);
    assert_eq!(all.iter().filter(|p| p.pieces.len() == 2).count(), 1);
}

#[test]
fn enumeration_is_restartable() {
    let half = Fraction::new(1, 2).unwrap();
    let pos = kings_and(split_rook(Side::White, &["a4", "b4"], half), "e1");
    let first: Vec<_> = Realizations::new(&pos, None).collect();
    let second: Vec<_> = Realizations::new(&pos, None).collect();
    assert_eq!(first, second);
}

#[test]
fn king_step_is_possible_but_not_always_legal() {
    let half = Fraction::new(1, 2).unwrap();
    let pos = kings_and(split_rook(Side::Black, &["a4", "e4"], half), "d1");
    let rules = Rules::new(GameSettings::default());
    let king = Some(UnitRef { object: 0, unit: 0 });

    let step = |to: &str| {
        let mv = Move::standard(sq("d1"), sq(to));
        DeclaredMove::new(mv, mv.required_declarations(PieceKind::King))
    };

    assert!(is_move_possible(&rules, &step("e2"), &pos, king));
    assert!(!is_move_always_legal(&rules, &step("e2"), &pos, king));
    assert!(is_move_always_legal(&rules, &step("c1"), &pos, king));
    assert!(!is_move_possible(&rules, &step("d3"), &pos, king));
}
