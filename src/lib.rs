//! Batch Decompilation Library
//!
//! This library walks a directory tree for binaries matching a set of
//! extensions, skips files whose content has already been seen, and hands
//! each unique file to an external decompiler. A bounded pool limits how many
//! decompiler processes run at once and stops the run on the first fatal error.

pub mod cli;
pub mod models;
pub mod services;

pub use models::{FileRecord, JobOutcome, RunSummary};

use std::path::{Path, PathBuf};
use std::result;
use std::time::Duration;

/// Failure reported by the external decompiler for a single input file.
#[derive(Debug)]
pub struct ToolError {
    pub file: PathBuf,
    pub reason: String,
    pub output: String,
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to decompile '{}' - {} - {}",
            self.file.display(),
            self.reason,
            self.output
        )
    }
}

/// Custom error type for the library
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    InvalidInput(String),
    Traversal {
        path: PathBuf,
        source: std::io::Error,
    },
    Setup {
        path: PathBuf,
        source: std::io::Error,
    },
    Tool(ToolError),
    Report {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A job panicked; carries the panic message.
    Panicked(String),
    Aborted,
}

impl Error {
    /// True when the failure came from the decompiler itself rather than
    /// from this program's own setup or I/O.
    #[must_use]
    pub fn is_tool_error(&self) -> bool {
        matches!(self, Error::Tool(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Error::Traversal { path, source } => {
                write!(f, "failed to read '{}' - {source}", path.display())
            }
            Error::Setup { path, source } => write!(
                f,
                "failed to create output directory '{}' - {source}",
                path.display()
            ),
            Error::Tool(e) => e.fmt(f),
            Error::Report { path, source } => {
                write!(f, "failed to write '{}' - {source}", path.display())
            }
            Error::Panicked(msg) => write!(f, "worker panicked: {msg}"),
            Error::Aborted => write!(f, "run aborted after an earlier failure"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e)
            | Error::Traversal { source: e, .. }
            | Error::Setup { source: e, .. }
            | Error::Report { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

pub type Result<T> = result::Result<T, Error>;

/// How job completions are rendered while a run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// Progress bar sized to the number of queued jobs.
    Bar,
    /// One log line per completed job.
    Verbose,
    /// Nothing is rendered; tallies are still collected.
    Silent,
}

pub const DEFAULT_EXTENSIONS: &str = ".dll,.exe";
pub const DEFAULT_TOOL: &str = "ilspycmd";

/// Options for a batch decompilation run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub target_dir: PathBuf,
    pub output_dir: PathBuf,
    pub extensions: Vec<String>,
    pub respect_case: bool,
    pub recursive: bool,
    pub allow_duplicates: bool,
    pub workers: usize,
    pub tool_errors_fatal: bool,
    pub tool_path: PathBuf,
    pub tool_timeout: Option<Duration>,
    pub report: ReportMode,
    pub discovery_notice_after: Duration,
}

impl RunOptions {
    /// Build options for `target_dir` with defaults for everything else.
    ///
    /// The output directory defaults to the final component of the target.
    pub fn new<P: AsRef<Path>>(target_dir: P) -> Self {
        let target_dir = target_dir.as_ref().to_path_buf();
        let output_dir = default_output_dir(&target_dir);
        Self {
            target_dir,
            output_dir,
            extensions: parse_extensions(DEFAULT_EXTENSIONS, false),
            respect_case: false,
            recursive: false,
            allow_duplicates: false,
            workers: default_workers(),
            tool_errors_fatal: false,
            tool_path: PathBuf::from(DEFAULT_TOOL),
            tool_timeout: None,
            report: ReportMode::Bar,
            discovery_notice_after: services::progress::DISCOVERY_NOTICE_AFTER,
        }
    }

    /// Reject configurations that cannot start a run.
    pub fn validate(&self) -> Result<()> {
        let target = self.target_dir.display();

        if !self.target_dir.exists() {
            return Err(Error::InvalidInput(format!(
                "Path does not exist: {target}"
            )));
        }

        if !self.target_dir.is_dir() {
            return Err(Error::InvalidInput(format!(
                "Path is not a directory: {target}"
            )));
        }

        if self.extensions.is_empty() {
            return Err(Error::InvalidInput(
                "please specify a comma separated list of file extensions".to_string(),
            ));
        }

        if self.workers == 0 {
            return Err(Error::InvalidInput(
                "number of workers must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Split a comma separated extension list, lower-casing it unless case is respected.
#[must_use]
pub fn parse_extensions(csv: &str, respect_case: bool) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(|ext| {
            if respect_case {
                ext.to_string()
            } else {
                ext.to_lowercase()
            }
        })
        .collect()
}

/// Output directory used when none is given: the target's own name, relative
/// to the working directory.
#[must_use]
pub fn default_output_dir(target_dir: &Path) -> PathBuf {
    std::path::absolute(target_dir)
        .ok()
        .and_then(|abs| abs.file_name().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("output"))
}

#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Decompile every unique matching file under the configured target.
///
/// # Returns
/// A summary of the run, or the first fatal error encountered.
pub fn run(opts: &RunOptions) -> Result<RunSummary> {
    opts.validate()?;
    services::dispatch::run(opts)
}
