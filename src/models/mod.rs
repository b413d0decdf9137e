//! Data models for discovered files, job outcomes, and run summaries

use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::PathBuf;

/// A qualifying file reported by the walker
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub parent_dir: PathBuf,
    pub search_root: PathBuf,
    pub already_seen: bool,
    /// Hex digest of the content; empty when duplicates are allowed.
    pub hash: String,
    /// Earlier file with the same content, set only when `already_seen`.
    pub first_seen_at: Option<PathBuf>,
    pub metadata: Metadata,
}

/// How a single queued job ended, when it did not abort the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Decompiled { file: PathBuf, output_dir: PathBuf },
    ToolFailed { file: PathBuf, output_dir: PathBuf, message: String },
}

/// Totals for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub target: String,
    pub output: String,
    pub discovered: u64,
    pub unique: u64,
    pub duplicates: u64,
    pub decompiled: u64,
    pub failed: u64,
    pub elapsed_ms: u64,
}
