//! Engine tuning configuration
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Explicit path (must exist), or the override in the data dir
//!    (~/.local/share/ponder/config/engine.toml)
//! 2. Fall back to embedded defaults (compiled into binary) when no
//!    explicit path was given and the data-dir override is absent

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/engine.toml");

/// Knobs shared by the insight engines
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// How many recent outcomes the engines analyze
    pub history_limit: usize,
    /// Advisory wall-clock budget for one orchestration round
    pub orchestration_budget: Duration,
    /// Absolute prediction error that still counts as correct
    pub correct_error_threshold: f64,
    /// Delay after which an outcome counts toward the planning fallacy
    pub planning_delay_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            orchestration_budget: Duration::from_millis(2000),
            correct_error_threshold: 2.0,
            planning_delay_days: 14,
        }
    }
}

impl EngineConfig {
    /// Load from the default override location, else the embedded defaults
    pub fn load() -> Result<Self> {
        load_config(None)
    }

    /// Load from an explicit file. A missing file is an error.
    pub fn from_path(path: &Path) -> Result<Self> {
        load_config(Some(path))
    }
}

/// Get the default override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("ponder").join("config").join("engine.toml"))
}

fn load_config(explicit_path: Option<&Path>) -> Result<EngineConfig> {
    let content = match explicit_path {
        Some(p) if !p.exists() => {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                p.display()
            )))
        }
        Some(p) => read_config(p)?,
        None => match default_config_path() {
            Some(p) if p.exists() => read_config(&p)?,
            _ => DEFAULT_CONFIG.to_string(),
        },
    };

    parse_config(&content)
}

fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    history: Option<RawHistory>,
    orchestration: Option<RawOrchestration>,
    accuracy: Option<RawAccuracy>,
    bias: Option<RawBias>,
}

#[derive(Debug, Deserialize)]
struct RawHistory {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawOrchestration {
    budget_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawAccuracy {
    correct_error_threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawBias {
    planning_delay_days: Option<i64>,
}

fn parse_config(content: &str) -> Result<EngineConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = EngineConfig::default();

    if let Some(limit) = raw.history.and_then(|h| h.limit) {
        if limit == 0 {
            return Err(Error::Config("history.limit must be positive".into()));
        }
        config.history_limit = limit;
    }
    if let Some(ms) = raw.orchestration.and_then(|o| o.budget_ms) {
        config.orchestration_budget = Duration::from_millis(ms);
    }
    if let Some(threshold) = raw.accuracy.and_then(|a| a.correct_error_threshold) {
        if !(0.0..=10.0).contains(&threshold) {
            return Err(Error::Config(
                "accuracy.correct_error_threshold must be between 0 and 10".into(),
            ));
        }
        config.correct_error_threshold = threshold;
    }
    if let Some(days) = raw.bias.and_then(|b| b.planning_delay_days) {
        config.planning_delay_days = days;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        let parsed = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, EngineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = parse_config("[orchestration]\nbudget_ms = 500\n").unwrap();
        assert_eq!(config.orchestration_budget, Duration::from_millis(500));
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            parse_config("[history]\nlimit = 0\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_config("[accuracy]\ncorrect_error_threshold = -1.0\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(parse_config("not toml ["), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bias]\nplanning_delay_days = 7").unwrap();

        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.planning_delay_days, 7);

        // A mistyped explicit path is reported, not silently defaulted
        let missing = file.path().with_extension("missing");
        match EngineConfig::from_path(&missing) {
            Err(Error::Config(msg)) => assert!(msg.contains("not found")),
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
