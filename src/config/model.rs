// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Raw detector configuration as deserialized from TOML (or built directly
/// in code/tests). Durations are plain seconds here; `DetectorConfig`
/// converts them once validation has passed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDetectorConfig {
    /// Seconds between detection sweeps (0.5–10).
    #[serde(default = "default_check_interval")]
    pub check_interval: f64,

    /// Max total runtime before declaring a stall, in seconds (5–300).
    #[serde(default = "default_stall_timeout")]
    pub stall_timeout: f64,

    /// Max output silence before declaring a stall, in seconds (5–120).
    #[serde(default = "default_output_timeout")]
    pub output_timeout: f64,

    /// Cap on recovery actions attempted over an execution's lifetime (1–10).
    #[serde(default = "default_max_recovery_attempts")]
    pub max_recovery_attempts: u32,

    /// Delay between consecutive recovery actions, in seconds (0.1–5).
    #[serde(default = "default_recovery_delay")]
    pub recovery_delay: f64,

    /// Factor applied to the remaining timeout by the extend-timeout action
    /// (1.0–3.0).
    #[serde(default = "default_timeout_multiplier")]
    pub timeout_multiplier: f64,

    /// Admission limit on concurrently supervised executions (1–20).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Whether stalled executions are recovered automatically by default.
    /// Requests can override this per call.
    #[serde(default = "default_enable_auto_recovery")]
    pub enable_auto_recovery: bool,
}

fn default_check_interval() -> f64 {
    1.0
}
fn default_stall_timeout() -> f64 {
    60.0
}
fn default_output_timeout() -> f64 {
    30.0
}
fn default_max_recovery_attempts() -> u32 {
    3
}
fn default_recovery_delay() -> f64 {
    1.0
}
fn default_timeout_multiplier() -> f64 {
    1.5
}
fn default_max_concurrent() -> usize {
    5
}
fn default_enable_auto_recovery() -> bool {
    true
}

impl Default for RawDetectorConfig {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
            stall_timeout: default_stall_timeout(),
            output_timeout: default_output_timeout(),
            max_recovery_attempts: default_max_recovery_attempts(),
            recovery_delay: default_recovery_delay(),
            timeout_multiplier: default_timeout_multiplier(),
            max_concurrent: default_max_concurrent(),
            enable_auto_recovery: default_enable_auto_recovery(),
        }
    }
}

/// Validated, immutable detector configuration. Constructed once via
/// `TryFrom<RawDetectorConfig>` (see `validate.rs`) and shared by reference
/// for the supervisor's lifetime.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub check_interval: Duration,
    pub stall_timeout: Duration,
    pub output_timeout: Duration,
    pub max_recovery_attempts: u32,
    pub recovery_delay: Duration,
    pub timeout_multiplier: f64,
    pub max_concurrent: usize,
    pub enable_auto_recovery: bool,
}

impl DetectorConfig {
    /// Internal constructor used by validation; assumes ranges were checked.
    pub(crate) fn new_unchecked(raw: RawDetectorConfig) -> Self {
        Self {
            check_interval: Duration::from_secs_f64(raw.check_interval),
            stall_timeout: Duration::from_secs_f64(raw.stall_timeout),
            output_timeout: Duration::from_secs_f64(raw.output_timeout),
            max_recovery_attempts: raw.max_recovery_attempts,
            recovery_delay: Duration::from_secs_f64(raw.recovery_delay),
            timeout_multiplier: raw.timeout_multiplier,
            max_concurrent: raw.max_concurrent,
            enable_auto_recovery: raw.enable_auto_recovery,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig::new_unchecked(RawDetectorConfig::default())
    }
}
