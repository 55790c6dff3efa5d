//! Low-level value types shared by every layer of the engine:
//!
//! - [`fraction`]: exact rational probabilities.
//! - [`coord`]: signed displacements used to classify move shapes.
//! - [`square`]: board squares `1..=8 x 1..=8` with algebraic names.
//! - [`entropy`]: injectable random bit sources for weighted choices.

pub mod coord;
pub mod entropy;
pub mod fraction;
pub mod square;
