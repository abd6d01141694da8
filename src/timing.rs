//! Execution time extraction and the aggregate times log

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::query::QueryId;

/// Header line of the aggregate log
pub const TIMES_HEADER: &str = "Execution Times:";

/// Default aggregate log file name inside the output directory
pub const TIMES_FILE: &str = "execution_times.txt";

fn result_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Result:\s+([0-9]+\.[0-9]+)").expect("result pattern is a valid regex")
    })
}

/// Find the first `Result: <float>` in benchmark output
///
/// The matched text is returned verbatim; it is never re-parsed as a number.
pub fn extract_execution_time(output: &str) -> Option<&str> {
    result_pattern()
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// One recorded execution time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionTime {
    pub query: QueryId,
    pub seconds: String,
}

/// Execution times collected over a run, in query order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExecutionTimes {
    entries: Vec<ExecutionTime>,
}

impl ExecutionTimes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, query: QueryId, seconds: impl Into<String>) {
        self.entries.push(ExecutionTime {
            query,
            seconds: seconds.into(),
        });
    }

    pub fn entries(&self) -> &[ExecutionTime] {
        &self.entries
    }

    /// Recorded times as text, in collection order
    pub fn seconds(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.seconds.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the aggregate log: header plus one time per line
    pub fn render(&self) -> String {
        let mut output = String::from(TIMES_HEADER);
        output.push('\n');
        for entry in &self.entries {
            output.push_str(&entry.seconds);
            output.push('\n');
        }
        output
    }

    /// Write the aggregate log, replacing any previous file
    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())
            .with_context(|| format!("Failed to write execution times to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: u32) -> QueryId {
        QueryId::new(n).unwrap()
    }

    #[test]
    fn test_extract_literal_text() {
        assert_eq!(extract_execution_time("Result: 12.34"), Some("12.34"));
        assert_eq!(
            extract_execution_time("loading...\nResult:\t0.500\nDone"),
            Some("0.500")
        );
    }

    #[test]
    fn test_extract_first_match_wins() {
        let output = "Result: 1.10\nResult: 2.20\n";
        assert_eq!(extract_execution_time(output), Some("1.10"));
    }

    #[test]
    fn test_extract_requires_decimal_point() {
        assert_eq!(extract_execution_time("Result: 12"), None);
        assert_eq!(extract_execution_time("Result:12.5"), None);
        assert_eq!(extract_execution_time(""), None);
        assert_eq!(extract_execution_time("Error: out of memory"), None);
    }

    #[test]
    fn test_render_preserves_order() {
        let mut times = ExecutionTimes::new();
        times.record(q(1), "1.50");
        times.record(q(3), "0.25");

        assert_eq!(times.len(), 2);
        assert_eq!(times.render(), "Execution Times:\n1.50\n0.25\n");
    }

    #[test]
    fn test_seconds_lists_times_in_order() {
        let mut times = ExecutionTimes::new();
        times.record(q(2), "3.140");
        times.record(q(1), "0.5");

        assert_eq!(times.seconds(), vec!["3.140", "0.5"]);
        assert_eq!(format!("{:?}", times.seconds()), r#"["3.140", "0.5"]"#);
    }

    #[test]
    fn test_render_empty() {
        let times = ExecutionTimes::new();
        assert!(times.is_empty());
        assert_eq!(times.render(), "Execution Times:\n");
    }

    #[test]
    fn test_write_to_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join(TIMES_FILE);

        let mut times = ExecutionTimes::new();
        times.record(q(22), "9.99");
        times.write_to(&path).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Execution Times:\n9.99\n"
        );
    }
}
