// src/engine/mod.rs

//! Supervision engine.
//!
//! This module ties together:
//! - the execution registry (admission control, id → execution)
//! - the pure stall-trigger evaluator
//! - the background monitor loop that ticks detection for all executions
//! - the statistics aggregator
//!
//! The pure detection logic lives in [`detector`]; the async/IO shell is
//! implemented in [`monitor`].

pub mod detector;
pub mod registry;
pub mod stats;

pub(crate) mod monitor;

pub use detector::{evaluate, DetectorView};
pub use registry::Registry;
pub use stats::{Stats, StatsSnapshot};
