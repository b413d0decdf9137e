//! Bounded job pool with first-failure-wins semantics.
//!
//! At most `capacity` jobs run at once on dedicated worker threads. The first
//! job to fail claims the error slot and aborts the pool: jobs already running
//! finish normally, jobs still waiting for a worker are skipped, and later
//! failures are dropped. A panicking job counts as a failure.

use crate::{Error, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct PoolState {
    aborted: AtomicBool,
    first_error: Mutex<Option<Error>>,
    outstanding: Mutex<usize>,
    drained: Condvar,
    skipped: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PoolState {
    fn record_failure(&self, err: Error) {
        if self
            .aborted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            log::debug!("Pool aborted by: {err}");
            *lock(&self.first_error) = Some(err);
        } else {
            log::debug!("Dropping failure after abort: {err}");
        }
    }

    fn begin_job(&self) {
        *lock(&self.outstanding) += 1;
    }

    fn finish_job(&self) {
        let mut outstanding = lock(&self.outstanding);
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.drained.notify_all();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Marks a queued job as finished on every exit path, including unwinding.
struct Completion<'a>(&'a PoolState);

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.0.finish_job();
    }
}

/// Fixed-capacity pool of worker threads.
pub struct JobPool {
    workers: rayon::ThreadPool,
    state: Arc<PoolState>,
}

impl JobPool {
    /// Create a pool running at most `capacity` jobs concurrently.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidInput(
                "pool capacity must be at least 1".to_string(),
            ));
        }

        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(capacity)
            .thread_name(|i| format!("decompile-worker-{i}"))
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to create worker pool - {e}")))?;

        Ok(Self {
            workers,
            state: Arc::new(PoolState::default()),
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.workers.current_num_threads()
    }

    /// Queue `job` for execution without blocking the caller.
    pub fn queue<F>(&self, job: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.state.begin_job();
        let state = Arc::clone(&self.state);

        self.workers.spawn(move || {
            let _done = Completion(&state);

            if state.aborted.load(Ordering::Acquire) {
                state.skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }

            match panic::catch_unwind(AssertUnwindSafe(job)) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => state.record_failure(err),
                Err(payload) => {
                    state.record_failure(Error::Panicked(panic_message(&*payload)));
                }
            }
        });
    }

    /// Record a failure that happened outside the pool's jobs.
    ///
    /// It takes the error slot only if no job has failed yet; either way the
    /// pool is aborted afterwards.
    pub fn report_failure(&self, err: Error) {
        self.state.record_failure(err);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::Acquire)
    }

    /// Jobs discarded because the pool was already aborted when they were dequeued.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.state.skipped.load(Ordering::Relaxed)
    }

    /// Block until every queued job has run or been skipped.
    ///
    /// # Returns
    /// The first failure recorded by the pool, if any.
    pub fn wait(&self) -> Result<()> {
        let mut outstanding = lock(&self.state.outstanding);
        while *outstanding > 0 {
            outstanding = self
                .state
                .drained
                .wait(outstanding)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(outstanding);

        match lock(&self.state.first_error).take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
