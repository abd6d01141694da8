//! Per-query CSV output for device samples
//!
//! One file per query: a fixed header row followed by one row per accepted
//! sampler line, in capture order.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::iostat::DeviceSample;

/// Header row of every per-query CSV
pub const CSV_HEADER: &str = "Device, rs/s, rMB/s, ws/s, MB/s, %util";

/// Round to two decimals, ties away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a sample as a CSV row (no trailing newline)
pub fn format_sample(sample: &DeviceSample) -> String {
    format!(
        "{}, {:.2}, {:.2}, {:.2}, {:.2}, {:.2}",
        sample.device,
        round2(sample.reads_per_sec),
        round2(sample.read_mb_per_sec),
        round2(sample.writes_per_sec),
        round2(sample.write_mb_per_sec),
        round2(sample.util_percent),
    )
}

/// CSV file for one query's samples
#[derive(Debug)]
pub struct SampleCsv {
    path: PathBuf,
    rows: usize,
}

impl SampleCsv {
    /// Create (or truncate) the file and write the header row
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = File::create(&path)
            .with_context(|| format!("Failed to create CSV {}", path.display()))?;
        writeln!(file, "{}", CSV_HEADER)
            .with_context(|| format!("Failed to write CSV header to {}", path.display()))?;
        Ok(Self { path, rows: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows appended through this handle
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Append one row per sample
    pub fn append(&mut self, samples: &[DeviceSample]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut output = String::new();
        for sample in samples {
            output.push_str(&format_sample(sample));
            output.push('\n');
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open CSV {}", self.path.display()))?;
        file.write_all(output.as_bytes())
            .with_context(|| format!("Failed to append to CSV {}", self.path.display()))?;

        self.rows += samples.len();
        Ok(())
    }
}
