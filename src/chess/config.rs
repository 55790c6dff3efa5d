use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chess::moves::DeclarationSet;
use crate::error::{Result, RulesError};

/// How a measurement collapses the placements it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementType {
    /// Yes/no collapse: "yes" leaves a certain piece, "no" renormalizes the rest.
    #[default]
    Binary,
    /// Merges the measured set into one placement; lost mass is not renormalized.
    Proportional,
}

/// Rule switches for one game.
///
/// Loaded from JSON; every field is optional and falls back to [`GameSettings::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Enforce check/checkmate. When off, the game ends when a king object is gone.
    pub win_by_checkmate: bool,
    pub null_plays: bool,
    pub allow_castling: bool,
    pub castle_splitting: bool,
    pub pawn_double_move_splitting: bool,
    /// Measure captured non-king pieces before removing them.
    pub measure_piece_captures: bool,
    pub measure_king_captures: bool,
    pub partial_qubit_rewards: bool,
    pub advanced_qubit_mode: bool,
    pub unlimited_qubits: bool,
    pub allowed_move_declarations: DeclarationSet,
    pub measurement_type: MeasurementType,
    /// Balance each side starts the standard game with.
    pub starting_qubits: f64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            win_by_checkmate: true,
            null_plays: false,
            allow_castling: true,
            castle_splitting: false,
            pawn_double_move_splitting: false,
            measure_piece_captures: true,
            measure_king_captures: true,
            partial_qubit_rewards: true,
            advanced_qubit_mode: false,
            unlimited_qubits: false,
            allowed_move_declarations: DeclarationSet::all(),
            measurement_type: MeasurementType::Binary,
            starting_qubits: 5.0,
        }
    }
}

impl GameSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RulesError::Settings {
            reason: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| RulesError::Settings {
            reason: format!("{}: {e}", path.display()),
        })?;
        Self::from_json_str(&text)
    }

    pub fn with_win_by_checkmate(mut self, enabled: bool) -> Self {
        self.win_by_checkmate = enabled;
        self
    }

    pub fn with_measurement_type(mut self, measurement_type: MeasurementType) -> Self {
        self.measurement_type = measurement_type;
        self
    }

    pub fn with_unlimited_qubits(mut self, enabled: bool) -> Self {
        self.unlimited_qubits = enabled;
        self
    }
}
