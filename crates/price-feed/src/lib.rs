//! Multi-source quote polling
//!
//! Features:
//! - Blocking REST adapters for several exchanges behind one trait
//! - Explicit registry from source id to adapter constructor
//! - Concurrent fan-out polling with per-source failure isolation
//! - Latency measured per call, failures included
//! - Simulated per-source state tracking with staleness

pub mod engine;
pub mod feeds;
pub mod registry;
pub mod tracker;

pub use engine::{EngineConfig, EngineStats, PollingEngine};
pub use feeds::SourceAdapter;
pub use registry::AdapterRegistry;
pub use tracker::{QuoteStateTracker, TrackerStats};
