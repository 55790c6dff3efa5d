//! The quantum layer: superposed positions, their classical realizations, measurement
//! and play resolution.

pub mod enumerate;
pub mod measure;
pub mod movegen;
pub mod play;
pub mod position;
pub mod validity;
