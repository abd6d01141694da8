//! CLI argument parsing for benchio

use clap::Parser;
use std::path::PathBuf;

use crate::config::{FailurePolicy, HarnessConfig};
use crate::query::QueryRange;

#[derive(Parser, Debug)]
#[command(name = "benchio")]
#[command(version)]
#[command(about = "Run benchmark queries while sampling block-device I/O", long_about = None)]
pub struct Cli {
    /// TOML config file (flags given here take precedence)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output directory for per-query CSVs and the execution times log
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Block device to sample (first column of iostat output)
    #[arg(short = 'd', long = "device", value_name = "NAME")]
    pub device: Option<String>,

    /// Sampling interval in seconds
    #[arg(short = 'i', long = "interval", value_name = "SECS")]
    pub interval: Option<u64>,

    /// Queries to run, e.g. 1-22 or 5
    #[arg(short = 'q', long = "queries", value_name = "RANGE")]
    pub queries: Option<QueryRange>,

    /// Benchmark runner binary
    #[arg(long = "runner", value_name = "PATH")]
    pub runner: Option<String>,

    /// Directory holding qNN.benchmark definition files
    #[arg(long = "benchmark-dir", value_name = "DIR")]
    pub benchmark_dir: Option<PathBuf>,

    /// Sampler program (called as <PROGRAM> -dx <DEVICE> <INTERVAL>)
    #[arg(long = "sampler-bin", value_name = "PROGRAM")]
    pub sampler_bin: Option<String>,

    /// Transient file receiving raw sampler output
    #[arg(long = "capture-file", value_name = "PATH")]
    pub capture_file: Option<PathBuf>,

    /// Do not drop the page cache before each query
    #[arg(long = "no-drop-cache")]
    pub no_drop_cache: bool,

    /// Keep running remaining queries when a benchmark fails
    #[arg(long = "keep-going")]
    pub keep_going: bool,

    /// Write a JSON run report to FILE
    #[arg(long = "summary-json", value_name = "FILE")]
    pub summary_json: Option<PathBuf>,

    /// Enable debug tracing output (to stderr)
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Overlay flags onto a config loaded from defaults or a file
    pub fn apply(&self, config: &mut HarnessConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(device) = &self.device {
            config.device = device.clone();
        }
        if let Some(interval) = self.interval {
            config.interval_secs = interval;
        }
        if let Some(queries) = self.queries {
            config.queries = queries;
        }
        if let Some(runner) = &self.runner {
            config.runner = runner.clone();
        }
        if let Some(dir) = &self.benchmark_dir {
            config.benchmark_dir = dir.clone();
        }
        if let Some(program) = &self.sampler_bin {
            config.sampler_program = program.clone();
        }
        if let Some(capture) = &self.capture_file {
            config.capture_file = capture.clone();
        }
        if self.no_drop_cache {
            config.drop_caches = false;
        }
        if self.keep_going {
            config.failure_policy = FailurePolicy::Continue;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_leave_config_untouched() {
        let cli = Cli::parse_from(["benchio"]);
        let mut config = HarnessConfig::default();
        cli.apply(&mut config);
        assert_eq!(config, HarnessConfig::default());
        assert!(!cli.debug);
        assert!(cli.summary_json.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "benchio",
            "-o",
            "out",
            "-d",
            "sdb",
            "-i",
            "2",
            "-q",
            "3-4",
            "--runner",
            "./runner",
            "--benchmark-dir",
            "defs",
            "--sampler-bin",
            "/usr/bin/iostat",
            "--capture-file",
            "/tmp/cap.txt",
            "--no-drop-cache",
            "--keep-going",
        ]);
        let mut config = HarnessConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.device, "sdb");
        assert_eq!(config.interval_secs, 2);
        assert_eq!(config.queries.len(), 2);
        assert_eq!(config.runner, "./runner");
        assert_eq!(config.benchmark_dir, PathBuf::from("defs"));
        assert_eq!(config.sampler_program, "/usr/bin/iostat");
        assert_eq!(config.capture_file, PathBuf::from("/tmp/cap.txt"));
        assert!(!config.drop_caches);
        assert_eq!(config.failure_policy, FailurePolicy::Continue);
    }

    #[test]
    fn test_cli_rejects_bad_query_range() {
        assert!(Cli::try_parse_from(["benchio", "--queries", "0-30"]).is_err());
        assert!(Cli::try_parse_from(["benchio", "--queries", "9-2"]).is_err());
    }

    #[test]
    fn test_cli_flags_override_file_values() {
        let mut config = HarnessConfig::from_toml("device = \"sdc\"\ninterval_secs = 5").unwrap();
        let cli = Cli::parse_from(["benchio", "--interval", "1"]);
        cli.apply(&mut config);
        assert_eq!(config.device, "sdc");
        assert_eq!(config.interval_secs, 1);
    }
}
