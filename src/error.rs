//! Error taxonomy for the rules engine.
//!
//! Internal helpers fail fast with a [`RulesError`]. Only the decoding validator
//! ([`crate::notation::is_valid_encoding`]) and the legality predicates downgrade
//! errors to `false`.

use thiserror::Error;

/// Errors raised by the rules engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    /// Malformed fraction, out-of-range coordinate or similar bad value.
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },

    /// Reciprocal or division by a zero fraction.
    #[error("division by zero")]
    DivisionByZero,

    /// Unrecognized move shape (null move, non-line displacement, ...).
    #[error("invalid move: {reason}")]
    InvalidMove { reason: String },

    /// The bit source ran dry in the middle of a draw.
    #[error("insufficient entropy: needed {needed} bits, {remaining} remaining")]
    InsufficientEntropy { needed: u32, remaining: usize },

    /// A quantum position breaks one of its structural invariants.
    #[error("structural violation: {reason}")]
    StructuralViolation { reason: String },

    /// A play failed pre-flight validation and was not applied.
    #[error("illegal play: {reason}")]
    IllegalPlay { reason: String },

    /// Textual position encoding could not be parsed.
    #[error("notation error: {reason}")]
    Notation { reason: String },

    /// Settings file unreadable or malformed.
    #[error("settings error: {reason}")]
    Settings { reason: String },
}

impl RulesError {
    pub(crate) fn invalid_value(reason: impl Into<String>) -> Self {
        RulesError::InvalidValue {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_move(reason: impl Into<String>) -> Self {
        RulesError::InvalidMove {
            reason: reason.into(),
        }
    }

    pub(crate) fn structural(reason: impl Into<String>) -> Self {
        RulesError::StructuralViolation {
            reason: reason.into(),
        }
    }

    pub(crate) fn notation(reason: impl Into<String>) -> Self {
        RulesError::Notation {
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RulesError>;
