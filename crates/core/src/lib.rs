//! Core types for the stablecoin quote monitor
//!
//! This crate provides shared types used across all components:
//! - Trading pair and top-of-book definitions
//! - Quote, snapshot and display row types
//! - Monitor and simulation configuration
//! - Error types

pub mod types;
pub mod quotes;
pub mod config;
pub mod errors;

pub use types::*;
pub use quotes::*;
pub use config::*;
pub use errors::*;
