//! Parsing of `iostat -dx` device lines
//!
//! The sampler prints a table per interval. Only rows whose first column is
//! the sampled device are of interest; every other line (banners, headers,
//! blank separators, other devices) is skipped.
//!
//! Columns are read through [`IostatSchema`], which names the positions of
//! the fields we consume instead of scattering raw indices through the code.

use serde::Serialize;
use thiserror::Error;

/// Errors raised for a device line that does not fit the schema
#[derive(Error, Debug, PartialEq)]
pub enum SampleParseError {
    #[error("line {line_no}: expected at least {expected} columns for device {device}, got {actual}: '{line}'")]
    TooFewColumns {
        line_no: usize,
        device: String,
        expected: usize,
        actual: usize,
        line: String,
    },

    #[error("line {line_no}: column {column} is not a number ('{value}'): '{line}'")]
    NotANumber {
        line_no: usize,
        column: &'static str,
        value: String,
        line: String,
    },
}

/// Position of a consumed column in a whitespace-tokenized device line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Fixed index from the start of the line
    At(usize),
    /// Last token on the line
    Last,
}

impl Column {
    fn pick<'a>(self, tokens: &[&'a str]) -> Option<&'a str> {
        match self {
            Column::At(idx) => tokens.get(idx).copied(),
            Column::Last => tokens.last().copied(),
        }
    }
}

/// Column layout of an extended device statistics row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IostatSchema {
    pub reads_per_sec: Column,
    pub read_kb_per_sec: Column,
    pub writes_per_sec: Column,
    pub write_kb_per_sec: Column,
    pub util_percent: Column,
    /// Lines with fewer tokens are rejected
    pub min_columns: usize,
}

impl IostatSchema {
    /// Layout of sysstat `iostat -dx`:
    /// `Device r/s rkB/s rrqm/s %rrqm r_await rareq-sz w/s wkB/s ... %util`
    pub const SYSSTAT_EXTENDED: IostatSchema = IostatSchema {
        reads_per_sec: Column::At(1),
        read_kb_per_sec: Column::At(2),
        writes_per_sec: Column::At(7),
        write_kb_per_sec: Column::At(8),
        util_percent: Column::Last,
        min_columns: 9,
    };
}

impl Default for IostatSchema {
    fn default() -> Self {
        Self::SYSSTAT_EXTENDED
    }
}

/// One accepted sample for the monitored device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSample {
    pub device: String,
    pub reads_per_sec: f64,
    pub read_mb_per_sec: f64,
    pub writes_per_sec: f64,
    pub write_mb_per_sec: f64,
    pub util_percent: f64,
}

/// Filters and parses sampler output for a single device
#[derive(Debug, Clone)]
pub struct SampleParser {
    device: String,
    schema: IostatSchema,
}

impl SampleParser {
    pub fn new(device: impl Into<String>) -> Self {
        Self::with_schema(device, IostatSchema::default())
    }

    pub fn with_schema(device: impl Into<String>, schema: IostatSchema) -> Self {
        Self {
            device: device.into(),
            schema,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Parse one line of sampler output
    ///
    /// Returns `Ok(None)` for lines that belong to anything other than the
    /// monitored device. `line_no` is 1-based and only used in errors.
    pub fn parse_line(
        &self,
        line_no: usize,
        line: &str,
    ) -> Result<Option<DeviceSample>, SampleParseError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        if tokens.first() != Some(&self.device.as_str()) {
            return Ok(None);
        }

        if tokens.len() < self.schema.min_columns {
            return Err(SampleParseError::TooFewColumns {
                line_no,
                device: self.device.clone(),
                expected: self.schema.min_columns,
                actual: tokens.len(),
                line: line.trim_end().to_string(),
            });
        }

        let field = |column: Column, name: &'static str| -> Result<f64, SampleParseError> {
            let value = column.pick(&tokens).unwrap_or_default();
            value.parse::<f64>().map_err(|_| SampleParseError::NotANumber {
                line_no,
                column: name,
                value: value.to_string(),
                line: line.trim_end().to_string(),
            })
        };

        Ok(Some(DeviceSample {
            device: self.device.clone(),
            reads_per_sec: field(self.schema.reads_per_sec, "r/s")?,
            read_mb_per_sec: field(self.schema.read_kb_per_sec, "rkB/s")? / 1024.0,
            writes_per_sec: field(self.schema.writes_per_sec, "w/s")?,
            write_mb_per_sec: field(self.schema.write_kb_per_sec, "wkB/s")? / 1024.0,
            util_percent: field(self.schema.util_percent, "%util")?,
        }))
    }

    /// Parse a whole capture, keeping only the monitored device's rows
    pub fn parse_capture(&self, capture: &str) -> Result<Vec<DeviceSample>, SampleParseError> {
        self.parse_capture_partial(capture).into_result()
    }

    /// Parse a capture up to the first malformed device line
    ///
    /// Rows accepted before the failing line are kept alongside the error so
    /// callers can still persist them.
    pub fn parse_capture_partial(&self, capture: &str) -> ParsedCapture {
        let mut parsed = ParsedCapture::default();
        for (idx, line) in capture.lines().enumerate() {
            match self.parse_line(idx + 1, line) {
                Ok(Some(sample)) => parsed.samples.push(sample),
                Ok(None) => {}
                Err(e) => {
                    parsed.error = Some(e);
                    break;
                }
            }
        }
        parsed
    }
}

/// Outcome of [`SampleParser::parse_capture_partial`]
#[derive(Debug, Default)]
pub struct ParsedCapture {
    /// Rows accepted before parsing stopped
    pub samples: Vec<DeviceSample>,
    /// The malformed line that stopped parsing, if any
    pub error: Option<SampleParseError>,
}

impl ParsedCapture {
    pub fn into_result(self) -> Result<Vec<DeviceSample>, SampleParseError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.samples),
        }
    }
}
