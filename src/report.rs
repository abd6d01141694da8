//! Run report: per-query outcomes plus the collected execution times

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::query::QueryId;
use crate::timing::ExecutionTimes;

/// How a query ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryStatus {
    /// Benchmark exited zero; `execution_time` is `None` when the output
    /// carried no result line
    Completed { execution_time: Option<String> },
    /// Benchmark failed and the run continued past it
    Failed { error: String },
}

/// Outcome of one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    pub query: QueryId,
    pub csv_path: PathBuf,
    /// Device rows written to the CSV
    pub samples: usize,
    #[serde(flatten)]
    pub status: QueryStatus,
}

impl QueryOutcome {
    pub fn execution_time(&self) -> Option<&str> {
        match &self.status {
            QueryStatus::Completed { execution_time } => execution_time.as_deref(),
            QueryStatus::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, QueryStatus::Failed { .. })
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub device: String,
    pub output_dir: PathBuf,
    pub times_path: PathBuf,
    pub queries: Vec<QueryOutcome>,
    pub execution_times: ExecutionTimes,
}

impl RunReport {
    pub fn new(device: impl Into<String>, output_dir: PathBuf, times_path: PathBuf) -> Self {
        Self {
            device: device.into(),
            output_dir,
            times_path,
            queries: Vec::new(),
            execution_times: ExecutionTimes::new(),
        }
    }

    /// Record an outcome, collecting its execution time if it has one
    pub fn push(&mut self, outcome: QueryOutcome) {
        if let Some(time) = outcome.execution_time() {
            self.execution_times.record(outcome.query, time);
        }
        self.queries.push(outcome);
    }

    pub fn failed(&self) -> usize {
        self.queries.iter().filter(|q| q.is_failed()).count()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize run report")
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write run report to {}", path.display()))
    }
}
