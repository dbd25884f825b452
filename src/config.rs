use crate::health::ThresholdPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub interval_secs: u64,
    #[serde(default = "default_disk_path")]
    pub disk_path: String,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default = "default_cpu_sample_ms")]
    pub cpu_sample_ms: u64,
    #[serde(default = "default_top_processes")]
    pub top_processes: usize,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThresholdsConfig {
    #[serde(default = "default_cpu_threshold_percent")]
    pub cpu_percent: f64,
    #[serde(default = "default_memory_threshold_percent")]
    pub memory_percent: f64,
    #[serde(default = "default_disk_threshold_percent")]
    pub disk_percent: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_secs: 0,
            disk_path: default_disk_path(),
            format: OutputFormat::Text,
            output: None,
            cpu_sample_ms: default_cpu_sample_ms(),
            top_processes: default_top_processes(),
            thresholds: ThresholdsConfig::default(),
        }
    }
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            cpu_percent: default_cpu_threshold_percent(),
            memory_percent: default_memory_threshold_percent(),
            disk_percent: default_disk_threshold_percent(),
        }
    }
}

impl ThresholdsConfig {
    pub fn policy(&self) -> Result<ThresholdPolicy, ConfigError> {
        ThresholdPolicy::new(self.cpu_percent, self.memory_percent, self.disk_percent)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub interval_secs: Option<u64>,
    pub disk_path: Option<String>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub cpu_threshold: Option<f64>,
    pub mem_threshold: Option<f64>,
    pub disk_threshold: Option<f64>,
}

impl Config {
    /// Reads and parses only. Call `validate` once CLI overrides are applied.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })
    }

    pub fn apply_overrides(&mut self, o: Overrides) {
        if let Some(v) = o.interval_secs {
            self.interval_secs = v;
        }
        if let Some(v) = o.disk_path {
            self.disk_path = v;
        }
        if o.json {
            self.format = OutputFormat::Json;
        }
        if let Some(v) = o.output {
            self.output = Some(v);
        }
        if let Some(v) = o.cpu_threshold {
            self.thresholds.cpu_percent = v;
        }
        if let Some(v) = o.mem_threshold {
            self.thresholds.memory_percent = v;
        }
        if let Some(v) = o.disk_threshold {
            self.thresholds.disk_percent = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.disk_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "disk_path must not be empty".to_string(),
            ));
        }
        if self.output.is_some() && self.format != OutputFormat::Json {
            return Err(ConfigError::Validation(
                "output file requires format: json".to_string(),
            ));
        }
        if self.cpu_sample_ms > 10_000 {
            return Err(ConfigError::Validation(
                "cpu_sample_ms must be <= 10000".to_string(),
            ));
        }
        self.thresholds.policy()?;
        Ok(())
    }

    pub fn cpu_sample_window(&self) -> Duration {
        Duration::from_millis(self.cpu_sample_ms)
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn default_disk_path() -> String {
    "/".to_string()
}

const fn default_cpu_sample_ms() -> u64 {
    1000
}

const fn default_top_processes() -> usize {
    5
}

const fn default_cpu_threshold_percent() -> f64 {
    85.0
}

const fn default_memory_threshold_percent() -> f64 {
    85.0
}

const fn default_disk_threshold_percent() -> f64 {
    90.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_yaml_uses_defaults() {
        let cfg: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.interval_secs, 0);
        assert_eq!(cfg.disk_path, "/");
        assert_eq!(cfg.format, OutputFormat::Text);
        assert_eq!(cfg.top_processes, 5);
        assert_eq!(cfg.thresholds.policy().unwrap(), ThresholdPolicy::default());
        cfg.validate().expect("defaults must be valid");
    }

    #[test]
    fn bundled_example_parses_and_validates() {
        let cfg: Config = serde_yaml::from_str(Config::example_yaml()).unwrap();
        cfg.validate().expect("example config must be valid");
    }

    #[test]
    fn partial_thresholds_keep_other_defaults() {
        let cfg: Config = serde_yaml::from_str(
            "format: json\nthresholds:\n  disk_percent: 80\n",
        )
        .unwrap();
        assert_eq!(cfg.format, OutputFormat::Json);
        assert_eq!(cfg.thresholds.disk_percent, 80.0);
        assert_eq!(cfg.thresholds.cpu_percent, 85.0);
    }

    #[test]
    fn overrides_take_precedence() {
        let mut cfg = Config::default();
        cfg.apply_overrides(Overrides {
            interval_secs: Some(30),
            disk_path: Some("/var".to_string()),
            json: true,
            output: Some(PathBuf::from("metrics.jsonl")),
            cpu_threshold: Some(70.0),
            mem_threshold: None,
            disk_threshold: Some(95.0),
        });
        assert_eq!(cfg.interval_secs, 30);
        assert_eq!(cfg.disk_path, "/var");
        assert_eq!(cfg.format, OutputFormat::Json);
        assert_eq!(cfg.thresholds.cpu_percent, 70.0);
        assert_eq!(cfg.thresholds.memory_percent, 85.0);
        assert_eq!(cfg.thresholds.disk_percent, 95.0);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut cfg = Config::default();
        cfg.thresholds.memory_percent = 120.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_output_without_json() {
        let cfg = Config {
            output: Some(PathBuf::from("out.log")),
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_empty_disk_path() {
        let cfg = Config {
            disk_path: "  ".to_string(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_from_file_reports_parse_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interval_secs: [not, a, number]").unwrap();
        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn load_from_missing_file_is_read_error() {
        let err = Config::load_from_file("/nonexistent/syswatch.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
