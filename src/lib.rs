//! benchio - TPC-H query runner with per-query block-device I/O sampling
//!
//! For each benchmark query this library drops the page cache, samples the
//! target device with `iostat -dx`, runs the benchmark binary, and writes the
//! device samples to a per-query CSV next to an aggregate execution time log.

pub mod cli;
pub mod config;
pub mod csv_output;
pub mod harness;
pub mod iostat;
pub mod process;
pub mod query;
pub mod report;
pub mod timing;
