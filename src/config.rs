//! Harness configuration
//!
//! Defaults reproduce the TPC-H SF1000 parquet setup on `nvme2n1`. A TOML
//! file may override any subset of fields; command-line flags override the
//! file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::query::QueryRange;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// What to do when a benchmark exits non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Clean up the failing query, then stop the run
    #[default]
    Abort,
    /// Log the failure and move on to the next query
    Continue,
}

/// Settings for one harness run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Directory receiving per-query CSVs and the execution times log
    pub output_dir: PathBuf,

    /// Block device name as printed in the first iostat column
    pub device: String,

    /// Sampling interval in seconds
    pub interval_secs: u64,

    /// Queries to run, e.g. "1-22" or "5"
    pub queries: QueryRange,

    /// Benchmark binary, invoked through `sh -c` as `<runner> <definition>`
    pub runner: String,

    /// Directory holding `qNN.benchmark` definition files
    pub benchmark_dir: PathBuf,

    /// Sampler program, called as `<sampler> -dx <device> <interval>`
    pub sampler_program: String,

    /// Transient file receiving raw sampler output for the current query
    pub capture_file: PathBuf,

    /// Drop the OS page cache before each query
    pub drop_caches: bool,

    pub failure_policy: FailurePolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output-parquet-1000"),
            device: "nvme2n1".to_string(),
            interval_secs: 1,
            queries: QueryRange::all(),
            runner: "./build/release/benchmark/benchmark_runner".to_string(),
            benchmark_dir: PathBuf::from("benchmark/tpch/parquet/tpch_1000"),
            sampler_program: "iostat".to_string(),
            capture_file: PathBuf::from("iostat_tmp.txt"),
            drop_caches: true,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl HarnessConfig {
    /// Load a TOML config file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.trim().is_empty() {
            return Err(ConfigError::Invalid("device must not be empty".to_string()));
        }

        if self.device.split_whitespace().count() != 1 {
            return Err(ConfigError::Invalid(format!(
                "device must be a single word, got '{}'",
                self.device
            )));
        }

        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "interval_secs must be >= 1".to_string(),
            ));
        }

        if self.runner.trim().is_empty() {
            return Err(ConfigError::Invalid("runner must not be empty".to_string()));
        }

        if self.sampler_program.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "sampler_program must not be empty".to_string(),
            ));
        }

        if self.capture_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "capture_file must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Benchmark definition file for a query token, e.g. `<dir>/q05.benchmark`
    pub fn definition_path(&self, token: &str) -> PathBuf {
        self.benchmark_dir.join(format!("{}.benchmark", token))
    }

    /// Per-query CSV path, e.g. `<output_dir>/q05_output.csv`
    pub fn csv_path(&self, token: &str) -> PathBuf {
        self.output_dir.join(format!("{}_output.csv", token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryId;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("output-parquet-1000"));
        assert_eq!(config.device, "nvme2n1");
        assert_eq!(config.interval_secs, 1);
        assert_eq!(config.queries.len(), 22);
        assert!(config.drop_caches);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_paths() {
        let config = HarnessConfig::default();
        assert_eq!(
            config.definition_path("q05"),
            PathBuf::from("benchmark/tpch/parquet/tpch_1000/q05.benchmark")
        );
        assert_eq!(
            config.csv_path("q05"),
            PathBuf::from("output-parquet-1000/q05_output.csv")
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = HarnessConfig::from_toml(
            r#"
            device = "sdb"
            queries = "3-6"
            failure_policy = "continue"
            "#,
        )
        .unwrap();

        assert_eq!(config.device, "sdb");
        assert_eq!(config.queries.start(), QueryId::new(3).unwrap());
        assert_eq!(config.queries.end(), QueryId::new(6).unwrap());
        assert_eq!(config.failure_policy, FailurePolicy::Continue);
        assert_eq!(config.sampler_program, "iostat");
        assert_eq!(config.interval_secs, 1);
    }

    #[test]
    fn test_toml_rejects_unknown_and_bad_values() {
        assert!(matches!(
            HarnessConfig::from_toml("devise = \"sdb\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            HarnessConfig::from_toml("queries = \"0-4\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = HarnessConfig {
            interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HarnessConfig {
            device: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HarnessConfig {
            device: "sda sdb".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HarnessConfig {
            runner: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let err = HarnessConfig::from_file(Path::new("/nonexistent/benchio.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
