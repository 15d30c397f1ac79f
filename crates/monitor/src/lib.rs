//! Stablecoin quote monitor
//!
//! Loads configuration, drives the live or simulated feed and renders a
//! text quote board.

pub mod board;
pub mod runner;
pub mod settings;

pub use board::{Board, StatusChange};
pub use runner::{run, run_live, run_simulated};
