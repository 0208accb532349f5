// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only problems that prevent an execution from being *started* (bad config,
//! malformed request, capacity) surface as `Err`. Stalls, timeouts, recovery
//! exhaustion and escalation are recorded on the execution itself and
//! returned to the caller as data, so one execution's trouble never
//! interrupts supervision of the others.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StallguardError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Concurrency limit reached: {active} executions active (max {max})")]
    CapacityExceeded { active: usize, max: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StallguardError>;
