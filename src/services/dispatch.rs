//! One run: search, schedule, decompile, report.
//!
//! The search runs on the calling thread and queues a job per unique file as
//! soon as it is found, so decompiles start before the search finishes.
//! Duplicates are handled inline by the search. Every fatal error, whether
//! raised by the search or by a job, goes through the pool's error slot so
//! only the first one is reported.

use crate::models::{FileRecord, JobOutcome, RunSummary};
use crate::services::output;
use crate::services::pool::JobPool;
use crate::services::progress::{DiscoveryNotice, ProgressEvent, ProgressReporter};
use crate::services::runner::{self, ToolInvocation};
use crate::services::traverse::{SearchConfig, find_unique_files};
use crate::{Error, Result, RunOptions};
use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Settings every job needs, shared across worker threads.
#[derive(Debug)]
struct JobSettings {
    tool: PathBuf,
    output_root: PathBuf,
    timeout: Option<Duration>,
    tool_errors_fatal: bool,
    write_hash: bool,
}

/// Build the inclusion predicate for a set of extensions.
///
/// Extensions are matched as suffixes of the full path. Unless case is
/// respected the path is lower-cased first; `extensions` are expected to be
/// lower-cased already in that case.
pub fn extension_matcher(extensions: &[String], respect_case: bool) -> impl Fn(&Path) -> bool {
    let extensions = extensions.to_vec();
    move |path: &Path| {
        let path = path.to_string_lossy();
        let path = if respect_case {
            path.into_owned()
        } else {
            path.to_lowercase()
        };
        extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }
}

pub fn run(opts: &RunOptions) -> Result<RunSummary> {
    let started = Instant::now();

    let pool = JobPool::new(opts.workers)?;
    let reporter = ProgressReporter::spawn(opts.report)?;
    let settings = Arc::new(JobSettings {
        tool: opts.tool_path.clone(),
        output_root: opts.output_dir.clone(),
        timeout: opts.tool_timeout,
        tool_errors_fatal: opts.tool_errors_fatal,
        write_hash: !opts.allow_duplicates,
    });

    log::debug!(
        "Searching {} with {} workers",
        opts.target_dir.display(),
        pool.capacity()
    );

    let search_result = {
        let events = reporter.sender();
        let notice = DiscoveryNotice::start(opts.discovery_notice_after, reporter.sender())?;

        let config = SearchConfig::new(&opts.target_dir)
            .recursive(opts.recursive)
            .allow_duplicates(opts.allow_duplicates)
            .include(extension_matcher(&opts.extensions, opts.respect_case))
            .on_found(|record| dispatch_file(record, &pool, &settings, &events));

        let result = find_unique_files(config);
        notice.stop();
        result
    };

    match search_result {
        Ok(ledger) => log::debug!("Search finished, {} distinct hashes", ledger.len()),
        Err(Error::Aborted) => log::debug!("Search stopped early, pool already failed"),
        Err(err) => pool.report_failure(err),
    }

    let outcome = pool.wait();
    let tally = reporter.finish();
    outcome?;

    Ok(RunSummary {
        target: opts.target_dir.display().to_string(),
        output: opts.output_dir.display().to_string(),
        discovered: tally.queued + tally.duplicates,
        unique: tally.queued,
        duplicates: tally.duplicates,
        decompiled: tally.decompiled,
        failed: tally.failed,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}

fn dispatch_file(
    record: FileRecord,
    pool: &JobPool,
    settings: &Arc<JobSettings>,
    events: &Sender<ProgressEvent>,
) -> Result<()> {
    if pool.is_aborted() {
        return Err(Error::Aborted);
    }

    let output_dir =
        output::resolve_output_dir(&record.search_root, &record.path, &settings.output_root);

    if record.already_seen {
        let first_seen_at = record.first_seen_at.unwrap_or_else(|| record.path.clone());
        output::ensure_dir(&output_dir)?;
        output::write_ignored_log(&output_dir, &first_seen_at, &record.hash)?;
        let _ = events.send(ProgressEvent::Duplicate {
            file: record.path,
            first_seen_at,
        });
        return Ok(());
    }

    let _ = events.send(ProgressEvent::Queued {
        file: record.path.clone(),
    });

    let settings = Arc::clone(settings);
    let events = events.clone();
    let (file, hash) = (record.path, record.hash);
    pool.queue(move || {
        let outcome = decompile_file(&settings, &file, &hash, &output_dir)?;
        let _ = events.send(ProgressEvent::Finished(outcome));
        Ok(())
    });

    Ok(())
}

fn decompile_file(
    settings: &JobSettings,
    file: &Path,
    hash: &str,
    output_dir: &Path,
) -> Result<JobOutcome> {
    let invocation = ToolInvocation {
        tool: &settings.tool,
        file,
        output_dir,
        timeout: settings.timeout,
    };

    match runner::run_external_tool(&invocation) {
        Ok(tool_output) => {
            log::trace!("{} output: {tool_output}", settings.tool.display());
            if settings.write_hash {
                output::write_hash_marker(output_dir, hash)?;
            }
            Ok(JobOutcome::Decompiled {
                file: file.to_path_buf(),
                output_dir: output_dir.to_path_buf(),
            })
        }
        Err(Error::Tool(err)) if !settings.tool_errors_fatal => {
            output::write_failure_log(output_dir, &err)?;
            Ok(JobOutcome::ToolFailed {
                file: file.to_path_buf(),
                output_dir: output_dir.to_path_buf(),
                message: err.to_string(),
            })
        }
        Err(err) => Err(err),
    }
}
