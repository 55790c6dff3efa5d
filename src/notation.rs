//! Textual position encoding.
//!
//! ```text
//! turn: white, castling: wl true wr true bl true br true, enpassant: false, qubits: w 5 b 5|rookW: (a1,1/1)|...
//! ```
//!
//! `wl`/`bl` are the queenside (a-file) rights, `wr`/`br` the kingside ones. Each object
//! segment lists `(square,n/d[,promotion])` units followed by `i-j` entanglement pairs.
//!
//! Decoding only accepts the exact text [`encode`] produces, so `encode(decode(s)) == s`
//! for every accepted `s`.

use std::fmt::Write as _;

use crate::chess::moves::CastleSide;
use crate::chess::piece::{ColoredPiece, PieceKind, Side};
use crate::chess::position::{CastlingRights, GameData, QubitBalance};
use crate::core::fraction::Fraction;
use crate::core::square::Square;
use crate::error::{Result, RulesError};
use crate::quantum::position::{QuantumObject, QuantumPosition, Unit};

const CASTLING_KEYS: [(&str, Side, CastleSide); 4] = [
    ("wl", Side::White, CastleSide::Queenside),
    ("wr", Side::White, CastleSide::Kingside),
    ("bl", Side::Black, CastleSide::Queenside),
    ("br", Side::Black, CastleSide::Kingside),
];

pub fn encode(position: &QuantumPosition) -> String {
    let data = &position.data;
    let mut out = format!("turn: {}, castling:", data.whose_turn);
    for (key, side, direction) in CASTLING_KEYS {
        let _ = write!(out, " {key} {}", data.castling.get(side, direction));
    }
    match data.en_passant {
        Some(sq) => {
            let _ = write!(out, ", enpassant: {sq}");
        }
        None => out.push_str(", enpassant: false"),
    }
    let _ = write!(
        out,
        ", qubits: w {} b {}",
        data.qubits.white, data.qubits.black
    );

    for obj in &position.objects {
        let _ = write!(out, "|{}:", obj.piece);
        for u in &obj.units {
            let _ = write!(out, " ({},{}", u.square, u.probability);
            if let Some(kind) = u.promotion {
                let _ = write!(out, ",{kind}");
            }
            out.push(')');
        }
        for (i, u) in obj.units.iter().enumerate() {
            let mut partners: Vec<usize> = u.entangled.iter().copied().filter(|&j| j > i).collect();
            partners.sort_unstable();
            partners.dedup();
            for j in partners {
                let _ = write!(out, " {i}-{j}");
            }
        }
    }
    out
}

/// Parse and validate an encoded position.
pub fn decode(text: &str) -> Result<QuantumPosition> {
    let mut segments = text.split('|');
    let header = segments
        .next()
        .ok_or_else(|| RulesError::notation("empty input"))?;
    let data = decode_header(header)?;
    let objects = segments.map(decode_object).collect::<Result<Vec<_>>>()?;
    let position = QuantumPosition::new(objects, data)?;
    if encode(&position) != text {
        return Err(RulesError::notation(
            "input is not in canonical form (unreduced fraction, padded number or unordered pairs)",
        ));
    }
    Ok(position)
}

/// Whether `text` decodes to a structurally valid position.
pub fn is_valid_encoding(text: &str) -> bool {
    decode(text).is_ok()
}

fn field<'a>(part: Option<&'a str>, key: &str) -> Result<&'a str> {
    part.and_then(|p| p.strip_prefix(key))
        .and_then(|p| p.strip_prefix(": "))
        .ok_or_else(|| RulesError::notation(format!("missing `{key}` field")))
}

fn parse_bool(token: Option<&str>) -> Result<bool> {
    match token {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        other => Err(RulesError::notation(format!("expected a boolean, got {other:?}"))),
    }
}

fn parse_side(token: &str) -> Result<Side> {
    match token {
        "white" => Ok(Side::White),
        "black" => Ok(Side::Black),
        _ => Err(RulesError::notation(format!("unknown side {token:?}"))),
    }
}

fn parse_qubits(token: Option<&str>) -> Result<f64> {
    let token = token.ok_or_else(|| RulesError::notation("missing qubit balance"))?;
    token
        .parse::<f64>()
        .map_err(|e| RulesError::notation(format!("bad qubit balance {token:?}: {e}")))
}

fn decode_header(header: &str) -> Result<GameData> {
    let mut parts = header.split(", ");
    let turn = parse_side(field(parts.next(), "turn")?)?;

    let mut castling = CastlingRights::NONE;
    let mut tokens = field(parts.next(), "castling")?.split(' ');
    for (key, side, direction) in CASTLING_KEYS {
        if tokens.next() != Some(key) {
            return Err(RulesError::notation(format!("expected castling key {key}")));
        }
        castling.set(side, direction, parse_bool(tokens.next())?);
    }

    let en_passant = match field(parts.next(), "enpassant")? {
        "false" => None,
        sq => Some(
            sq.parse::<Square>()
                .map_err(|e| RulesError::notation(format!("bad en-passant square: {e}")))?,
        ),
    };

    let mut tokens = field(parts.next(), "qubits")?.split(' ');
    if tokens.next() != Some("w") {
        return Err(RulesError::notation("expected `w` qubit balance"));
    }
    let white = parse_qubits(tokens.next())?;
    if tokens.next() != Some("b") {
        return Err(RulesError::notation("expected `b` qubit balance"));
    }
    let black = parse_qubits(tokens.next())?;

    if parts.next().is_some() {
        return Err(RulesError::notation("trailing header fields"));
    }
    Ok(GameData {
        whose_turn: turn,
        castling,
        en_passant,
        qubits: QubitBalance { white, black },
    })
}

fn decode_piece(head: &str) -> Result<ColoredPiece> {
    let side = match head.chars().last() {
        Some('W') => Side::White,
        Some('B') => Side::Black,
        _ => return Err(RulesError::notation(format!("bad piece {head:?}"))),
    };
    let name = &head[..head.len() - 1];
    let kind = PieceKind::from_name(name)
        .ok_or_else(|| RulesError::notation(format!("unknown piece kind {name:?}")))?;
    Ok(ColoredPiece::new(kind, side))
}

fn decode_unit(token: &str) -> Result<Unit> {
    let inner = token
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| RulesError::notation(format!("bad unit {token:?}")))?;
    let mut fields = inner.split(',');
    let square: Square = fields
        .next()
        .ok_or_else(|| RulesError::notation("unit without square"))?
        .parse()?;
    let probability: Fraction = fields
        .next()
        .ok_or_else(|| RulesError::notation("unit without probability"))?
        .parse()?;
    let promotion = match fields.next() {
        Some(name) => Some(
            PieceKind::from_name(name)
                .ok_or_else(|| RulesError::notation(format!("unknown promotion {name:?}")))?,
        ),
        None => None,
    };
    if fields.next().is_some() {
        return Err(RulesError::notation(format!("bad unit {token:?}")));
    }
    Ok(Unit::new(square, probability).with_promotion(promotion))
}

fn decode_pair(token: &str) -> Result<(usize, usize)> {
    let bad = || RulesError::notation(format!("bad entanglement {token:?}"));
    let (a, b) = token.split_once('-').ok_or_else(bad)?;
    let a: usize = a.parse().map_err(|_| bad())?;
    let b: usize = b.parse().map_err(|_| bad())?;
    if a >= b {
        return Err(bad());
    }
    Ok((a, b))
}

fn decode_object(segment: &str) -> Result<QuantumObject> {
    let (head, body) = segment
        .split_once(':')
        .ok_or_else(|| RulesError::notation(format!("object segment without `:` in {segment:?}")))?;
    let piece = decode_piece(head)?;

    let mut units = Vec::new();
    let mut pairs = Vec::new();
    for token in body.split_whitespace() {
        if token.starts_with('(') {
            if !pairs.is_empty() {
                return Err(RulesError::notation("unit after entanglement pairs"));
            }
            units.push(decode_unit(token)?);
        } else {
            pairs.push(decode_pair(token)?);
        }
    }

    let mut obj = QuantumObject::new(piece, units);
    for (a, b) in pairs {
        if b >= obj.units.len() {
            return Err(RulesError::structural(format!(
                "entanglement {a}-{b} out of range for {piece}"
            )));
        }
        obj.entangle(a, b);
    }
    Ok(obj)
}
