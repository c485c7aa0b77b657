//! Bounded worker pool for rendering and signing jobs.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use crate::error::{Error, Result};

/// A fixed-size rayon pool where every job has a deadline.
///
/// A job that misses its deadline keeps its worker until it returns; its
/// result is dropped.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// Create a pool with `threads` workers, or one per CPU when `None`.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let threads = threads
            .filter(|n| *n > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("medsign-worker-{}", i))
            .panic_handler(|_| log::error!("worker job panicked"))
            .build()
            .map_err(|e| Error::Worker(e.to_string()))?;
        log::debug!("started worker pool with {} threads", threads);
        Ok(Self { pool, threads })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `job` on the pool and wait at most `timeout` for its result.
    pub fn run<T, F>(&self, timeout: Duration, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.pool.spawn(move || {
            // The receiver is gone once the caller timed out.
            let _ = tx.send(job());
        });
        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("job exceeded {:?} timeout", timeout);
                Err(Error::Timeout(timeout))
            },
            Err(RecvTimeoutError::Disconnected) => Err(Error::Worker("worker exited without a result".to_string())),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("threads", &self.threads).finish()
    }
}
