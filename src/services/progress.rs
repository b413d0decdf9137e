//! Progress reporting for a run.
//!
//! Workers and the walker never render anything themselves; they send
//! [`ProgressEvent`]s over an unbounded channel to a reporter thread, so a
//! slow terminal can never hold up a decompile.

use crate::ReportMode;
use crate::models::JobOutcome;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Delay before the first "still searching" notice.
pub const DISCOVERY_NOTICE_AFTER: Duration = Duration::from_secs(5);
const NOTICE_BACKOFF: u32 = 3;
const NOTICE_TEXT: &str = "still searching for files to decompile, sorry for the wait";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A unique file was handed to the pool.
    Queued { file: PathBuf },
    /// A file was skipped because its content was seen earlier.
    Duplicate { file: PathBuf, first_seen_at: PathBuf },
    /// A queued job ended without aborting the run.
    Finished(JobOutcome),
    /// The search is taking a while.
    StillSearching,
}

/// Counters accumulated by the reporter thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressTally {
    pub queued: u64,
    pub duplicates: u64,
    pub decompiled: u64,
    pub failed: u64,
}

impl ProgressTally {
    pub fn record(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Queued { .. } => self.queued += 1,
            ProgressEvent::Duplicate { .. } => self.duplicates += 1,
            ProgressEvent::Finished(JobOutcome::Decompiled { .. }) => self.decompiled += 1,
            ProgressEvent::Finished(JobOutcome::ToolFailed { .. }) => self.failed += 1,
            ProgressEvent::StillSearching => {}
        }
    }
}

/// Reporter thread consuming progress events until every sender is dropped.
pub struct ProgressReporter {
    sender: Sender<ProgressEvent>,
    handle: JoinHandle<ProgressTally>,
}

impl ProgressReporter {
    pub fn spawn(mode: ReportMode) -> io::Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let handle = thread::Builder::new()
            .name("progress".to_string())
            .spawn(move || render(mode, &receiver))?;
        Ok(Self { sender, handle })
    }

    #[must_use]
    pub fn sender(&self) -> Sender<ProgressEvent> {
        self.sender.clone()
    }

    /// Wait for the reporter to drain its channel.
    ///
    /// Returns once every other sender has been dropped as well.
    #[must_use]
    pub fn finish(self) -> ProgressTally {
        drop(self.sender);
        self.handle.join().unwrap_or_default()
    }
}

fn new_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

fn render(mode: ReportMode, receiver: &Receiver<ProgressEvent>) -> ProgressTally {
    let bar = (mode == ReportMode::Bar).then(new_bar);
    let mut tally = ProgressTally::default();

    for event in receiver {
        tally.record(&event);

        if let Some(bar) = &bar {
            match &event {
                ProgressEvent::Queued { .. } => bar.inc_length(1),
                ProgressEvent::Finished(_) => bar.inc(1),
                ProgressEvent::StillSearching => bar.println(NOTICE_TEXT),
                ProgressEvent::Duplicate { .. } => {}
            }
        } else if mode == ReportMode::Verbose {
            log_event(&event);
        }
    }

    if let Some(bar) = bar {
        bar.finish();
    }
    tally
}

fn log_event(event: &ProgressEvent) {
    match event {
        ProgressEvent::Queued { file } => log::debug!("queued '{}'", file.display()),
        ProgressEvent::Duplicate {
            file,
            first_seen_at,
        } => log::info!(
            "skipped '{}', already seen at '{}'",
            file.display(),
            first_seen_at.display()
        ),
        ProgressEvent::Finished(JobOutcome::Decompiled { file, output_dir }) => log::info!(
            "decompiled '{}' to '{}'",
            file.display(),
            output_dir.display()
        ),
        ProgressEvent::Finished(JobOutcome::ToolFailed { message, .. }) => {
            log::warn!("{message}");
        }
        ProgressEvent::StillSearching => log::info!("{NOTICE_TEXT}"),
    }
}

/// Timer thread emitting [`ProgressEvent::StillSearching`] while a search runs.
///
/// The first notice fires after the initial delay and each later one waits
/// three times longer than the previous. Dropping the value stops the timer.
pub struct DiscoveryNotice {
    done: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl DiscoveryNotice {
    pub fn start(after: Duration, events: Sender<ProgressEvent>) -> io::Result<Self> {
        let (done, stopped) = crossbeam_channel::bounded::<()>(0);
        let handle = thread::Builder::new()
            .name("discovery-notice".to_string())
            .spawn(move || {
                let mut wait = after;
                loop {
                    match stopped.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            if events.send(ProgressEvent::StillSearching).is_err() {
                                return;
                            }
                            wait = wait.saturating_mul(NOTICE_BACKOFF);
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
            })?;

        Ok(Self {
            done: Some(done),
            handle: Some(handle),
        })
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for DiscoveryNotice {
    fn drop(&mut self) {
        drop(self.done.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
