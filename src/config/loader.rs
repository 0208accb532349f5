// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{DetectorConfig, RawDetectorConfig};
use crate::errors::Result;

/// Load a detector configuration from a given path and return the raw
/// `RawDetectorConfig`.
///
/// This only performs TOML deserialization; it does **not** perform range
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawDetectorConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawDetectorConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a detector configuration from path and run range validation.
///
/// This is the recommended entry point for embedding applications:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks every field against its declared range.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<DetectorConfig> {
    let raw = load_from_path(&path)?;
    let config = DetectorConfig::try_from(raw)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_validates_a_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "check_interval = 0.5\nstall_timeout = 10.0\noutput_timeout = 6.0\nmax_concurrent = 2"
        )
        .unwrap();

        let cfg = load_and_validate(file.path()).unwrap();
        assert_eq!(cfg.check_interval, std::time::Duration::from_millis(500));
        assert_eq!(cfg.max_concurrent, 2);
        // Unspecified fields fall back to defaults.
        assert_eq!(cfg.max_recovery_attempts, 3);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "check_intervall = 1.0").unwrap();

        assert!(load_and_validate(file.path()).is_err());
    }

    #[test]
    fn out_of_range_file_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stall_timeout = 9999.0").unwrap();

        assert!(load_and_validate(file.path()).is_err());
    }
}
