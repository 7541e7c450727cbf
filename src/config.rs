use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::exclusions::{CriteriaRegistry, Criterion};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub paths: PathsConfig,
    #[serde(default)]
    pub qc: QcConfig,
    pub tasks: TaskConfig,
    /// Task name -> ordered exclusion criteria.
    #[serde(default)]
    pub exclusion: BTreeMap<String, Vec<Criterion>>,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Root of the out-of-scanner behavioral data (one folder per subject).
    pub data_dir: PathBuf,
    pub qc_dir: PathBuf,
    pub violations_dir: PathBuf,
    pub exclusions_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QcConfig {
    /// Minimum trailing blank test trials before a trim is trusted.
    #[serde(default = "default_last_n_test_trials")]
    pub last_n_test_trials: usize,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            last_n_test_trials: default_last_n_test_trials(),
        }
    }
}

fn default_last_n_test_trials() -> usize {
    10
}

/// The battery's task taxonomy: single tasks run alone, dual tasks pair
/// a stop-signal manipulation with a second task.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskConfig {
    pub single: Vec<String>,
    pub dual: Vec<String>,
}

impl TaskConfig {
    /// All task names, single battery first, in configured order.
    pub fn all(&self) -> Vec<String> {
        self.single.iter().chain(self.dual.iter()).cloned().collect()
    }
}

/// Stop-signal tasks are the ones the violation scan applies to.
pub fn is_stop_signal_task(task_name: &str) -> bool {
    task_name.contains("stop_signal")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    pub log_level: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    pub fn load_or_default() -> Result<Self> {
        // Try config.toml first, then config.example.toml
        Self::load("config.toml")
            .or_else(|_| Self::load("config.example.toml"))
            .context("Failed to load configuration")
    }

    /// Build the immutable threshold registry from the config tables.
    pub fn criteria_registry(&self) -> CriteriaRegistry {
        CriteriaRegistry::new(self.exclusion.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusions::Direction;
    use tempfile::tempdir;

    const EXAMPLE: &str = r#"
[paths]
data_dir = "/data/out_of_scanner"
qc_dir = "/data/out_of_scanner_qc"
violations_dir = "/data/out_of_scanner_violations"
exclusions_dir = "/data/out_of_scanner_exclusions"

[qc]
last_n_test_trials = 10

[tasks]
single = ["flanker", "stop_signal"]
dual = ["stop_signal_with_flanker"]

[[exclusion.flanker]]
metric = "proportion_blank"
threshold = 0.3
direction = "greater_than"

[[exclusion.flanker]]
metric = "accuracy"
threshold = 0.55
direction = "less_than"

[monitoring]
log_level = "info"
"#;

    #[test]
    fn test_parse_example_config() {
        let config: Config = toml::from_str(EXAMPLE).unwrap();
        assert_eq!(config.qc.last_n_test_trials, 10);
        assert_eq!(
            config.tasks.all(),
            vec!["flanker", "stop_signal", "stop_signal_with_flanker"]
        );

        let registry = config.criteria_registry();
        let criteria = registry.criteria_for("flanker");
        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria[0].metric, "proportion_blank");
        assert_eq!(criteria[0].direction, Direction::GreaterThan);
        assert_eq!(criteria[1].metric, "accuracy");
        assert!(registry.criteria_for("unknown_task").is_empty());
    }

    #[test]
    fn test_defaults_when_sections_absent() {
        let minimal = r#"
[paths]
data_dir = "/data/in"
qc_dir = "/data/qc"
violations_dir = "/data/violations"
exclusions_dir = "/data/exclusions"

[tasks]
single = ["flanker"]
dual = []
"#;
        let config: Config = toml::from_str(minimal).unwrap();
        assert_eq!(config.qc.last_n_test_trials, 10);
        assert_eq!(config.monitoring.log_level, "info");
        assert!(config.exclusion.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, EXAMPLE).unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.paths.data_dir, PathBuf::from("/data/out_of_scanner"));
    }

    #[test]
    fn test_stop_signal_task_names() {
        assert!(is_stop_signal_task("stop_signal"));
        assert!(is_stop_signal_task("stop_signal_with_go_nogo"));
        assert!(!is_stop_signal_task("flanker"));
    }
}
