//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{ExtraHidError, Result};
use crate::input::InputMapping;
use crate::timing::BASE_CLOCK_RATE_ARM11;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub input: InputMapping,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Event scheduler configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rotated log files; empty logs to stderr only
    #[serde(default)]
    pub log_dir: String,
}

/// Packet capture configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CaptureConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_capture_path")]
    pub path: String,
}

/// Interactive session configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
}

// Default value functions
fn default_ticks_per_second() -> u64 { BASE_CLOCK_RATE_ARM11 }

fn default_log_level() -> String { "info".to_string() }

fn default_capture_path() -> String { "./capture.jsonl".to_string() }

fn default_step_ms() -> u64 { 1 }

impl Default for TimingConfig {
    fn default() -> Self {
        Self { ticks_per_second: default_ticks_per_second() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_capture_path(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { step_ms: default_step_ms() }
    }
}

/// Accepted values for `logging.level`
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use extra_hid::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Below 1 kHz a millisecond period would round to zero ticks
        if self.timing.ticks_per_second < 1000 {
            return Err(invalid("ticks_per_second must be at least 1000"));
        }

        for (name, descriptor) in [
            ("zl", &self.input.zl),
            ("zr", &self.input.zr),
            ("c_stick", &self.input.c_stick),
        ] {
            if descriptor.trim().is_empty() {
                return Err(invalid(&format!("input.{} cannot be empty", name)));
            }
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid("logging level must be one of: trace, debug, info, warn, error"));
        }

        if self.capture.enabled && self.capture.path.is_empty() {
            return Err(invalid("capture path cannot be empty when enabled"));
        }

        if self.session.step_ms == 0 || self.session.step_ms > 1000 {
            return Err(invalid("step_ms must be between 1 and 1000"));
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> ExtraHidError {
    ExtraHidError::Config(toml::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[timing]
ticks_per_second = 1000

[input]
zl = "engine:evdev,path:/dev/input/event3,code:312"

[logging]
level = "debug"

[capture]
enabled = true
path = "/tmp/extra-hid.jsonl"

[session]
step_ms = 4
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.timing.ticks_per_second, 1000);
        assert_eq!(config.input.zl, "engine:evdev,path:/dev/input/event3,code:312");
        assert_eq!(config.input.zr, "engine:virtual,name:zr");
        assert_eq!(config.logging.level, "debug");
        assert!(config.capture.enabled);
        assert_eq!(config.session.step_ms, 4);
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"").unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.timing.ticks_per_second, BASE_CLOCK_RATE_ARM11);
        assert_eq!(config.input, InputMapping::default());
        assert!(!config.capture.enabled);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/extra-hid.toml");
        assert!(matches!(result, Err(ExtraHidError::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[timing\nticks_per_second = ").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(ExtraHidError::Config(_))));
    }

    #[test]
    fn test_ticks_per_second_too_low() {
        let mut config = Config::default();
        config.timing.ticks_per_second = 999;
        assert!(config.validate().is_err());

        config.timing.ticks_per_second = 1000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_input_descriptor() {
        let mut config = Config::default();
        config.input.c_stick = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_log_levels() {
        for level in LOG_LEVELS {
            let mut config = Config::default();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Log level {} should be valid", level);
        }
    }

    #[test]
    fn test_empty_capture_path_when_enabled() {
        let mut config = Config::default();
        config.capture.enabled = true;
        config.capture.path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_capture_path_when_disabled() {
        let mut config = Config::default();
        config.capture.enabled = false;
        config.capture.path = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_step_ms_bounds() {
        let mut config = Config::default();
        config.session.step_ms = 0;
        assert!(config.validate().is_err());

        config.session.step_ms = 1001;
        assert!(config.validate().is_err());

        config.session.step_ms = 1000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_ticks_per_second(), 268_111_856);
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_capture_path(), "./capture.jsonl");
        assert_eq!(default_step_ms(), 1);
    }
}
