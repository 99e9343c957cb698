//! Implementation of chess rules: board, move generation, game flow and
//! persistence.

pub mod board;
pub mod core;
pub mod error;
pub mod game;
pub mod movegen;
pub mod notation;
pub mod position;
pub mod save;
