// src/config/validate.rs

use crate::config::model::{DetectorConfig, RawDetectorConfig};
use crate::errors::{Result, StallguardError};

impl TryFrom<RawDetectorConfig> for DetectorConfig {
    type Error = StallguardError;

    fn try_from(raw: RawDetectorConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(DetectorConfig::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawDetectorConfig) -> Result<()> {
    ensure_range_f64("check_interval", cfg.check_interval, 0.5, 10.0)?;
    ensure_range_f64("stall_timeout", cfg.stall_timeout, 5.0, 300.0)?;
    ensure_range_f64("output_timeout", cfg.output_timeout, 5.0, 120.0)?;
    ensure_range_u32("max_recovery_attempts", cfg.max_recovery_attempts, 1, 10)?;
    ensure_range_f64("recovery_delay", cfg.recovery_delay, 0.1, 5.0)?;
    ensure_range_f64("timeout_multiplier", cfg.timeout_multiplier, 1.0, 3.0)?;
    ensure_range_usize("max_concurrent", cfg.max_concurrent, 1, 20)?;
    Ok(())
}

fn ensure_range_f64(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(StallguardError::ConfigError(format!(
            "{field} must be in [{min}, {max}] (got {value})"
        )));
    }
    Ok(())
}

fn ensure_range_u32(field: &str, value: u32, min: u32, max: u32) -> Result<()> {
    if value < min || value > max {
        return Err(StallguardError::ConfigError(format!(
            "{field} must be in [{min}, {max}] (got {value})"
        )));
    }
    Ok(())
}

fn ensure_range_usize(field: &str, value: usize, min: usize, max: usize) -> Result<()> {
    if value < min || value > max {
        return Err(StallguardError::ConfigError(format!(
            "{field} must be in [{min}, {max}] (got {value})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_raw_config_validates() {
        let cfg = DetectorConfig::try_from(RawDetectorConfig::default());
        assert!(cfg.is_ok());
    }

    #[test]
    fn check_interval_out_of_range_is_rejected() {
        let raw = RawDetectorConfig {
            check_interval: 0.05,
            ..RawDetectorConfig::default()
        };
        let err = DetectorConfig::try_from(raw).unwrap_err();
        assert!(matches!(err, StallguardError::ConfigError(_)));
        assert!(err.to_string().contains("check_interval"));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let raw = RawDetectorConfig {
            stall_timeout: f64::NAN,
            ..RawDetectorConfig::default()
        };
        assert!(DetectorConfig::try_from(raw).is_err());
    }

    #[test]
    fn max_recovery_attempts_zero_is_rejected() {
        let raw = RawDetectorConfig {
            max_recovery_attempts: 0,
            ..RawDetectorConfig::default()
        };
        assert!(DetectorConfig::try_from(raw).is_err());
    }

    #[test]
    fn max_concurrent_above_cap_is_rejected() {
        let raw = RawDetectorConfig {
            max_concurrent: 50,
            ..RawDetectorConfig::default()
        };
        assert!(DetectorConfig::try_from(raw).is_err());
    }

    #[test]
    fn timeout_multiplier_boundaries_are_inclusive() {
        for mult in [1.0, 3.0] {
            let raw = RawDetectorConfig {
                timeout_multiplier: mult,
                ..RawDetectorConfig::default()
            };
            assert!(DetectorConfig::try_from(raw).is_ok());
        }
    }
}
