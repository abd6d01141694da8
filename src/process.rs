//! External process collaborators
//!
//! The harness talks to the outside world through three seams: page cache
//! control, the device sampler, and the benchmark runner. Each seam is a
//! trait with a system implementation here; tests substitute their own.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use thiserror::Error;

use crate::query::QueryId;

/// Shell snippet that flushes dirty pages and drops the page cache
pub const DROP_CACHES_SCRIPT: &str = "sync; echo 3 > /proc/sys/vm/drop_caches";

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to drop page cache: {0}")]
    CacheDrop(String),

    #[error("Failed to start sampler '{program}': {source}")]
    SamplerSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to stop sampler: {0}")]
    SamplerStop(String),

    #[error("Failed to launch benchmark '{command}': {source}")]
    BenchmarkSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Benchmark for {query} exited with {status}: '{command}'")]
    BenchmarkFailed {
        query: QueryId,
        command: String,
        status: String,
        output: String,
    },
}

/// Drops the OS page cache before a query
pub trait CacheDropper {
    fn drop_caches(&mut self) -> Result<(), CommandError>;
}

/// Starts a background device sampler writing into a capture file
pub trait Sampler {
    fn start(
        &mut self,
        device: &str,
        interval_secs: u64,
        capture: &Path,
    ) -> Result<Box<dyn SamplerHandle>, CommandError>;
}

/// A running sampler
pub trait SamplerHandle {
    /// Terminate the sampler and wait for it to exit
    ///
    /// After this returns the capture file is no longer written.
    fn stop(&mut self) -> Result<(), CommandError>;
}

/// Runs one benchmark query to completion
pub trait BenchmarkRunner {
    /// Returns combined stdout and stderr on a zero exit status
    fn run(&mut self, query: QueryId, definition: &Path) -> Result<String, CommandError>;
}

/// `sudo bash -c "sync; echo 3 > /proc/sys/vm/drop_caches"`
#[derive(Debug, Default)]
pub struct SudoCacheDropper;

impl CacheDropper for SudoCacheDropper {
    fn drop_caches(&mut self) -> Result<(), CommandError> {
        let status = Command::new("sudo")
            .args(["bash", "-c", DROP_CACHES_SCRIPT])
            .status()
            .map_err(|e| CommandError::CacheDrop(e.to_string()))?;

        if !status.success() {
            return Err(CommandError::CacheDrop(format!("sudo exited with {}", status)));
        }
        Ok(())
    }
}

/// Leaves the page cache alone
#[derive(Debug, Default)]
pub struct NoopCacheDropper;

impl CacheDropper for NoopCacheDropper {
    fn drop_caches(&mut self) -> Result<(), CommandError> {
        tracing::debug!("Page cache drop disabled");
        Ok(())
    }
}

/// `iostat -dx <device> <interval>` with stdout redirected to the capture file
#[derive(Debug, Clone)]
pub struct IostatSampler {
    program: String,
}

impl IostatSampler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for IostatSampler {
    fn default() -> Self {
        Self::new("iostat")
    }
}

impl Sampler for IostatSampler {
    fn start(
        &mut self,
        device: &str,
        interval_secs: u64,
        capture: &Path,
    ) -> Result<Box<dyn SamplerHandle>, CommandError> {
        let spawn_err = |source| CommandError::SamplerSpawn {
            program: self.program.clone(),
            source,
        };

        let stdout = File::create(capture).map_err(spawn_err)?;
        let child = Command::new(&self.program)
            .arg("-dx")
            .arg(device)
            .arg(interval_secs.to_string())
            .stdin(Stdio::null())
            .stdout(stdout)
            .spawn()
            .map_err(spawn_err)?;

        tracing::debug!(pid = child.id(), program = %self.program, device, "Sampler started");
        Ok(Box::new(ChildSampler { child: Some(child) }))
    }
}

/// Sampler child process, terminated with SIGTERM
#[derive(Debug)]
pub struct ChildSampler {
    child: Option<Child>,
}

impl SamplerHandle for ChildSampler {
    fn stop(&mut self) -> Result<(), CommandError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let pid = Pid::from_raw(child.id() as i32);
        match kill(pid, Signal::SIGTERM) {
            // Already exited on its own; still needs reaping
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => return Err(CommandError::SamplerStop(format!("kill {}: {}", pid, e))),
        }

        let status = child
            .wait()
            .map_err(|e| CommandError::SamplerStop(format!("wait {}: {}", pid, e)))?;
        tracing::debug!(%pid, %status, "Sampler stopped");
        Ok(())
    }
}

impl Drop for ChildSampler {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.stop() {
                tracing::warn!("{}", e);
            }
        }
    }
}

/// Runs `<runner> <definition>` through `sh -c`, stderr merged into stdout
#[derive(Debug, Clone)]
pub struct ShellBenchmarkRunner {
    runner: String,
}

impl ShellBenchmarkRunner {
    pub fn new(runner: impl Into<String>) -> Self {
        Self {
            runner: runner.into(),
        }
    }

    /// Shell command line for a definition file
    pub fn command_line(&self, definition: &Path) -> String {
        format!(
            "{} {}",
            self.runner,
            shell_quote(&definition.to_string_lossy())
        )
    }
}

impl BenchmarkRunner for ShellBenchmarkRunner {
    fn run(&mut self, query: QueryId, definition: &Path) -> Result<String, CommandError> {
        let command = self.command_line(definition);
        tracing::debug!(%query, %command, "Running benchmark");

        let output = Command::new("sh")
            .arg("-c")
            .arg(format!("{} 2>&1", command))
            .stdin(Stdio::null())
            .output()
            .map_err(|source| CommandError::BenchmarkSpawn {
                command: command.clone(),
                source,
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(CommandError::BenchmarkFailed {
                query,
                command,
                status: output.status.to_string(),
                output: text,
            });
        }
        Ok(text)
    }
}

/// Single-quote a word for `sh` unless it is made of safe characters only
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+=:,@".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}
