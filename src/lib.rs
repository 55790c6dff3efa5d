//! A rules engine for quantum chess: pieces may stand on several squares at once, with
//! exact rational probabilities, entangled placements and a qubit budget that limits
//! how much superposition each side may create.
//!
//! Layers, bottom up:
//!
//! - [`core`]: fractions, squares, random bit sources.
//! - [`chess`]: pieces, moves, settings and classical legality.
//! - [`quantum`]: superposed positions, enumeration, measurement and play resolution.
//! - [`notation`]: the textual position encoding.

pub mod chess;
pub mod core;
pub mod error;
pub mod notation;
pub mod quantum;

pub use error::{Result, RulesError};
