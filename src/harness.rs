//! Benchmark and I/O sampler loop
//!
//! For every query in the configured range:
//!
//! 1. create `<query>_output.csv` with its header
//! 2. drop the page cache
//! 3. start the sampler, redirecting into the capture file
//! 4. run the benchmark
//! 5. stop the sampler, parse the capture into CSV rows, delete the capture
//! 6. record the execution time reported by the benchmark
//!
//! Step 5 runs whether or not step 4 succeeded. [`SamplingSession`] owns the
//! running sampler and the capture path, so the sampler is stopped and the
//! capture removed even when the query unwinds early.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::{FailurePolicy, HarnessConfig};
use crate::csv_output::SampleCsv;
use crate::iostat::SampleParser;
use crate::process::{
    BenchmarkRunner, CacheDropper, IostatSampler, NoopCacheDropper, Sampler, SamplerHandle,
    ShellBenchmarkRunner, SudoCacheDropper,
};
use crate::query::QueryId;
use crate::report::{QueryOutcome, QueryStatus, RunReport};
use crate::timing::{extract_execution_time, TIMES_FILE};

/// A running sampler plus the capture file it writes
///
/// Dropping the session without calling [`SamplingSession::finish`] stops
/// the sampler and deletes the capture without parsing it.
pub struct SamplingSession<'a> {
    handle: Option<Box<dyn SamplerHandle>>,
    capture: &'a Path,
}

impl<'a> SamplingSession<'a> {
    pub fn start(
        sampler: &mut dyn Sampler,
        device: &str,
        interval_secs: u64,
        capture: &'a Path,
    ) -> Result<Self> {
        let handle = sampler
            .start(device, interval_secs, capture)
            .with_context(|| format!("Failed to start sampler for {}", device))?;
        Ok(Self {
            handle: Some(handle),
            capture,
        })
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(mut handle) = self.handle.take() {
            handle.stop()?;
        }
        Ok(())
    }

    /// Stop the sampler and append everything it captured to `csv`
    ///
    /// Rows that parsed before a malformed line are still written, then the
    /// parse error is returned. The capture file is removed when the session
    /// is dropped at the end of this call, on success and on error alike.
    pub fn finish(mut self, parser: &SampleParser, csv: &mut SampleCsv) -> Result<usize> {
        self.stop()?;

        let raw = match fs::read(self.capture) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read capture {}", self.capture.display())
                })
            }
        };

        let parsed = parser.parse_capture_partial(&String::from_utf8_lossy(&raw));
        csv.append(&parsed.samples)?;
        match parsed.error {
            Some(e) => Err(e).with_context(|| {
                format!("Malformed sampler output in {}", self.capture.display())
            }),
            None => Ok(parsed.samples.len()),
        }
    }
}

impl Drop for SamplingSession<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("{:#}", e);
        }
        match fs::remove_file(self.capture) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove capture {}: {}",
                self.capture.display(),
                e
            ),
        }
    }
}

/// Drives the per-query loop
pub struct Harness {
    config: HarnessConfig,
    parser: SampleParser,
    cache: Box<dyn CacheDropper>,
    sampler: Box<dyn Sampler>,
    runner: Box<dyn BenchmarkRunner>,
}

impl Harness {
    pub fn new(
        config: HarnessConfig,
        cache: Box<dyn CacheDropper>,
        sampler: Box<dyn Sampler>,
        runner: Box<dyn BenchmarkRunner>,
    ) -> Self {
        let parser = SampleParser::new(config.device.clone());
        Self {
            config,
            parser,
            cache,
            sampler,
            runner,
        }
    }

    /// Harness wired to sudo, the configured sampler, and `sh -c`
    pub fn from_config(config: HarnessConfig) -> Self {
        let cache: Box<dyn CacheDropper> = if config.drop_caches {
            Box::new(SudoCacheDropper)
        } else {
            Box::new(NoopCacheDropper)
        };
        let sampler = Box::new(IostatSampler::new(config.sampler_program.clone()));
        let runner = Box::new(ShellBenchmarkRunner::new(config.runner.clone()));
        Self::new(config, cache, sampler, runner)
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Path of the aggregate execution times log
    pub fn times_path(&self) -> PathBuf {
        self.config.output_dir.join(TIMES_FILE)
    }

    fn create_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.config.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.config.output_dir.display()
            )
        })
    }

    /// Run every configured query and write the execution times log
    ///
    /// Under [`FailurePolicy::Abort`] the first benchmark failure ends the
    /// run after that query's cleanup and the times log is not written.
    pub fn run(&mut self) -> Result<RunReport> {
        self.create_output_dir()?;

        tracing::info!(
            device = %self.config.device,
            queries = %self.config.queries,
            output_dir = %self.config.output_dir.display(),
            "Starting benchmark run"
        );

        let mut report = RunReport::new(
            self.config.device.clone(),
            self.config.output_dir.clone(),
            self.times_path(),
        );

        for query in self.config.queries.iter() {
            let outcome = self.run_query(query)?;
            println!(
                "iostat monitoring for {} stopped and results saved to {}.",
                query,
                outcome.csv_path.display()
            );
            report.push(outcome);
        }

        tracing::info!("Execution times: {:?}", report.execution_times.seconds());
        report.execution_times.write_to(&report.times_path)?;
        println!("Execution times saved to {}.", report.times_path.display());

        if report.failed() > 0 {
            tracing::warn!("{} of {} queries failed", report.failed(), report.queries.len());
        }
        Ok(report)
    }

    /// Run a single query end to end
    pub fn run_query(&mut self, query: QueryId) -> Result<QueryOutcome> {
        let token = query.token();
        let definition = self.config.definition_path(&token);
        let csv_path = self.config.csv_path(&token);

        self.create_output_dir()?;
        let mut csv = SampleCsv::create(&csv_path)?;

        if let Err(e) = self.cache.drop_caches() {
            tracing::warn!("{}: {}", query, e);
        }

        let capture = self.config.capture_file.clone();
        let session = SamplingSession::start(
            self.sampler.as_mut(),
            &self.config.device,
            self.config.interval_secs,
            &capture,
        )?;

        let benchmark = self.runner.run(query, &definition);

        let samples = match session.finish(&self.parser, &mut csv) {
            Ok(samples) => samples,
            Err(cleanup) => {
                // A benchmark failure outranks a cleanup failure
                if let Err(e) = benchmark {
                    tracing::warn!("{}: cleanup also failed: {:#}", query, cleanup);
                    return Err(e).with_context(|| format!("Query {} failed", query));
                }
                return Err(cleanup).with_context(|| format!("Query {} failed", query));
            }
        };
        tracing::debug!(%query, samples, "Samples written");

        let status = match benchmark {
            Ok(output) => {
                let execution_time = extract_execution_time(&output).map(str::to_string);
                if execution_time.is_none() {
                    tracing::warn!(
                        "Could not find execution time for {}. Full output:\n{}",
                        query,
                        output
                    );
                }
                QueryStatus::Completed { execution_time }
            }
            Err(e) => match self.config.failure_policy {
                FailurePolicy::Abort => {
                    return Err(e).with_context(|| format!("Query {} failed", query));
                }
                FailurePolicy::Continue => {
                    tracing::warn!("{}: {}; continuing", query, e);
                    QueryStatus::Failed {
                        error: e.to_string(),
                    }
                }
            },
        };

        Ok(QueryOutcome {
            query,
            csv_path,
            samples: csv.rows(),
            status,
        })
    }
}
