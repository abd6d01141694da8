//! Benchmark query identifiers
//!
//! Queries are numbered 1 through 22 and rendered as zero-padded tokens
//! (`q01` … `q22`). A run covers an inclusive range of them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// First query in the TPC-H set
pub const FIRST_QUERY: u8 = 1;

/// Last query in the TPC-H set
pub const LAST_QUERY: u8 = 22;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryIdError {
    #[error("query number {0} is outside 1..=22")]
    OutOfRange(u32),

    #[error("invalid query range '{0}', expected N-M or N")]
    InvalidRange(String),

    #[error("query range start {start} is after end {end}")]
    Reversed { start: u8, end: u8 },
}

/// A single benchmark query number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct QueryId(u8);

impl QueryId {
    pub fn new(n: u32) -> Result<Self, QueryIdError> {
        if (FIRST_QUERY as u32..=LAST_QUERY as u32).contains(&n) {
            Ok(Self(n as u8))
        } else {
            Err(QueryIdError::OutOfRange(n))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-padded token, e.g. `q05`
    pub fn token(self) -> String {
        format!("q{:02}", self.0)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{:02}", self.0)
    }
}

impl TryFrom<u32> for QueryId {
    type Error = QueryIdError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<QueryId> for u32 {
    fn from(id: QueryId) -> u32 {
        id.0 as u32
    }
}

/// Inclusive range of queries to run, in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueryRange {
    start: QueryId,
    end: QueryId,
}

impl QueryRange {
    pub fn new(start: QueryId, end: QueryId) -> Result<Self, QueryIdError> {
        if start > end {
            return Err(QueryIdError::Reversed {
                start: start.0,
                end: end.0,
            });
        }
        Ok(Self { start, end })
    }

    /// The whole q01..=q22 set
    pub fn all() -> Self {
        Self {
            start: QueryId(FIRST_QUERY),
            end: QueryId(LAST_QUERY),
        }
    }

    pub fn start(&self) -> QueryId {
        self.start
    }

    pub fn end(&self) -> QueryId {
        self.end
    }

    pub fn iter(&self) -> impl Iterator<Item = QueryId> {
        (self.start.0..=self.end.0).map(QueryId)
    }

    pub fn len(&self) -> usize {
        usize::from(self.end.0.saturating_sub(self.start.0)) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for QueryRange {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for QueryRange {
    type Err = QueryIdError;

    /// Parse `N-M` or a single `N`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| QueryIdError::InvalidRange(s.to_string()))
                .and_then(QueryId::new)
        };

        match s.split_once('-') {
            Some((start, end)) => Self::new(parse(start)?, parse(end)?),
            None => {
                let id = parse(s)?;
                Ok(Self { start: id, end: id })
            }
        }
    }
}

impl TryFrom<String> for QueryRange {
    type Error = QueryIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<QueryRange> for String {
    fn from(range: QueryRange) -> String {
        range.to_string()
    }
}

impl fmt::Display for QueryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.0, self.end.0)
    }
}
