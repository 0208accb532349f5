// src/config/mod.rs

//! Detector configuration: raw deserialized form, validated form, and a
//! TOML loader.
//!
//! - [`model`] holds `RawDetectorConfig` (what serde sees) and
//!   `DetectorConfig` (what the rest of the crate uses).
//! - [`validate`] implements `TryFrom<RawDetectorConfig>` with the range
//!   checks; out-of-range values fail fast with a `ConfigError`.
//! - [`loader`] reads a config file from disk.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{DetectorConfig, RawDetectorConfig};
