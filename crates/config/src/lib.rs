//! Ember Interpreter Configuration
//!
//! Loads interpreter limits and compatibility switches from a
//! `key = value` options file.

use ember_core::CoreError;
use std::fs;
use std::path::Path;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Options file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed line in the options file
    #[error("Invalid config line {line}: {message}")]
    InvalidLine { line: usize, message: String },
}

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterConfig {
    /// Capacity of the deferred timer pool (from "timer_pool_size")
    pub timer_pool_size: usize,
    /// Capacity of each global variable table (from "max_global_variables")
    pub max_global_variables: usize,
    /// Capacity of each per-script variable table (from "max_local_variables")
    pub max_local_variables: usize,
    /// Maximum `gosub` nesting (from "max_call_depth")
    pub max_call_depth: usize,
    /// Statement budget for one event run (from "max_steps_per_event")
    pub max_steps_per_event: usize,
    /// Keep the asymmetric wrong-type operator results
    /// (from "legacy_operator_defaults")
    pub legacy_operator_defaults: bool,
    /// Fixed seed for the `random` command (from "rng_seed")
    pub rng_seed: Option<u64>,
    /// Default log filter (from "log_level")
    pub log_level: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            timer_pool_size: 512,
            max_global_variables: 1024,
            max_local_variables: 256,
            max_call_depth: 64,
            max_steps_per_event: 10_000,
            legacy_operator_defaults: true,
            rng_seed: None,
            log_level: "info".into(),
        }
    }
}

impl InterpreterConfig {
    /// Load configuration from an options file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse options file content
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::InvalidLine {
                    line: index + 1,
                    message: format!("expected key = value, got \"{}\"", line),
                });
            };

            config.parse_option(key.trim(), value.trim());
        }

        Ok(config)
    }

    fn parse_option(&mut self, key: &str, value: &str) {
        let defaults = Self::default();
        match key {
            "timer_pool_size" => {
                self.timer_pool_size = value.parse().unwrap_or(defaults.timer_pool_size);
            }
            "max_global_variables" => {
                self.max_global_variables =
                    value.parse().unwrap_or(defaults.max_global_variables);
            }
            "max_local_variables" => {
                self.max_local_variables = value.parse().unwrap_or(defaults.max_local_variables);
            }
            "max_call_depth" => {
                self.max_call_depth = value.parse().unwrap_or(defaults.max_call_depth);
            }
            "max_steps_per_event" => {
                self.max_steps_per_event = value.parse().unwrap_or(defaults.max_steps_per_event);
            }
            "legacy_operator_defaults" => {
                self.legacy_operator_defaults =
                    value.parse().unwrap_or(defaults.legacy_operator_defaults);
            }
            "rng_seed" => {
                self.rng_seed = value.parse().ok();
            }
            "log_level" => self.log_level = value.to_lowercase(),
            _ => {
                tracing::debug!("Unknown config option: {} = {}", key, value);
            }
        }
    }

    /// Log the effective configuration
    pub fn display(&self) {
        tracing::info!("Interpreter configuration:");
        tracing::info!("    Timer pool: {} slots", self.timer_pool_size);
        tracing::info!(
            "    Variables: {} global / {} local",
            self.max_global_variables,
            self.max_local_variables
        );
        tracing::info!("    Call depth: {}", self.max_call_depth);
        tracing::info!("    Steps per event: {}", self.max_steps_per_event);
        tracing::info!("    Legacy operator defaults: {}", self.legacy_operator_defaults);
        match self.rng_seed {
            Some(seed) => tracing::info!("    RNG seed: {}", seed),
            None => tracing::info!("    RNG seed: (entropy)"),
        }
        tracing::info!("    Log level: {}", self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = InterpreterConfig::default();
        assert_eq!(config.timer_pool_size, 512);
        assert_eq!(config.max_call_depth, 64);
        assert!(config.legacy_operator_defaults);
        assert_eq!(config.rng_seed, None);
    }

    #[test]
    fn test_parse_simple_config() {
        let config_text = r#"
# limits
timer_pool_size = 8
max_call_depth = 4
legacy_operator_defaults = false
rng_seed = 42
log_level = DEBUG
"#;
        let config = InterpreterConfig::parse(config_text).unwrap();
        assert_eq!(config.timer_pool_size, 8);
        assert_eq!(config.max_call_depth, 4);
        assert!(!config.legacy_operator_defaults);
        assert_eq!(config.rng_seed, Some(42));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_bad_values_fall_back_to_defaults() {
        let config = InterpreterConfig::parse("timer_pool_size = lots\nunknown = 1").unwrap();
        assert_eq!(config.timer_pool_size, 512);
    }

    #[test]
    fn test_line_without_equals_is_rejected() {
        let err = InterpreterConfig::parse("timer_pool_size 8").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLine { line: 1, .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_steps_per_event = 99").unwrap();

        let config = InterpreterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.max_steps_per_event, 99);
    }

    #[test]
    fn test_missing_file() {
        let err = InterpreterConfig::load_from_file("/nonexistent/ember.cfg").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
