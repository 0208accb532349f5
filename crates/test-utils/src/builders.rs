#![allow(dead_code)]

use std::time::Duration;

use stallguard::config::{DetectorConfig, RawDetectorConfig};
use stallguard::execution::CommandRequest;
use stallguard::types::RecoveryAction;

/// Builder for `DetectorConfig` to simplify test setup. Starts from the
/// defaults and lets tests tighten the timing fields.
pub struct DetectorConfigBuilder {
    raw: RawDetectorConfig,
}

impl DetectorConfigBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawDetectorConfig::default(),
        }
    }

    /// Fast sweep settings used by most integration tests: tightest valid
    /// check interval and recovery delay.
    pub fn fast() -> Self {
        let mut b = Self::new();
        b.raw.check_interval = 0.5;
        b.raw.recovery_delay = 0.1;
        b
    }

    pub fn check_interval(mut self, secs: f64) -> Self {
        self.raw.check_interval = secs;
        self
    }

    pub fn stall_timeout(mut self, secs: f64) -> Self {
        self.raw.stall_timeout = secs;
        self
    }

    pub fn output_timeout(mut self, secs: f64) -> Self {
        self.raw.output_timeout = secs;
        self
    }

    pub fn max_recovery_attempts(mut self, attempts: u32) -> Self {
        self.raw.max_recovery_attempts = attempts;
        self
    }

    pub fn recovery_delay(mut self, secs: f64) -> Self {
        self.raw.recovery_delay = secs;
        self
    }

    pub fn timeout_multiplier(mut self, mult: f64) -> Self {
        self.raw.timeout_multiplier = mult;
        self
    }

    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.raw.max_concurrent = max;
        self
    }

    pub fn auto_recovery(mut self, enabled: bool) -> Self {
        self.raw.enable_auto_recovery = enabled;
        self
    }

    pub fn build(self) -> DetectorConfig {
        DetectorConfig::try_from(self.raw).expect("Failed to build valid config from builder")
    }
}

impl Default for DetectorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `CommandRequest`.
pub struct RequestBuilder {
    request: CommandRequest,
}

impl RequestBuilder {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            request: CommandRequest::new(command),
        }
    }

    /// Run the command through the platform shell.
    pub fn shell(command: &str) -> Self {
        let mut b = Self::new([command]);
        b.request.shell = true;
        b
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.request.timeout = Some(Duration::from_secs(secs));
        self
    }

    pub fn auto_recover(mut self, enabled: bool) -> Self {
        self.request.auto_recover = Some(enabled);
        self
    }

    pub fn recovery_actions(mut self, actions: Vec<RecoveryAction>) -> Self {
        self.request.recovery_actions = actions;
        self
    }

    pub fn critical(mut self) -> Self {
        self.request.critical = true;
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.request.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.request.working_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> CommandRequest {
        self.request
    }
}
