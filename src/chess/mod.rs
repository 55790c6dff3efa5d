//! Classical chess vocabulary and rules on the standard 8x8 board.

pub mod config;
pub mod moves;
pub mod piece;
pub mod position;
pub mod rules;
