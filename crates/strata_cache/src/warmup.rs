//! Background warmup worker.
//!
//! One thread consumes a bounded queue of jobs. Producers never block: a
//! full queue drops the job. Shutdown clears the running flag, drops the
//! sender and waits a bounded time for the thread to report completion. A
//! worker that does not finish in time is detached.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use strata_common::ContentHash;

/// A unit to compile ahead of demand.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WarmupJob {
    pub(crate) key: String,
    pub(crate) content: String,
    pub(crate) hash: ContentHash,
}

pub(crate) struct WarmupWorker {
    sender: Option<Sender<WarmupJob>>,
    running: Arc<AtomicBool>,
    done: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl WarmupWorker {
    /// Starts the worker thread. `run` is called for every job received.
    pub(crate) fn spawn<F>(capacity: usize, poll: Duration, run: F) -> std::io::Result<Self>
    where
        F: Fn(WarmupJob) + Send + 'static,
    {
        let (sender, jobs) = channel::bounded::<WarmupJob>(capacity);
        let (done_tx, done) = channel::bounded::<()>(1);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = std::thread::Builder::new()
            .name("strata-warmup".to_string())
            .spawn(move || {
                while flag.load(Ordering::Acquire) {
                    match jobs.recv_timeout(poll) {
                        Ok(job) => run(job),
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                let _ = done_tx.send(());
            })?;

        Ok(Self {
            sender: Some(sender),
            running,
            done,
            handle: Some(handle),
        })
    }

    /// Queues a job. Returns `false` if the queue is full or shut down.
    pub(crate) fn submit(&self, job: WarmupJob) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        match sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                tracing::debug!(key = %job.key, "warmup queue full, dropping job");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Stops the worker. Returns `true` if it finished within `timeout`.
    pub(crate) fn stop(mut self, timeout: Duration) -> bool {
        self.running.store(false, Ordering::Release);
        self.sender = None;
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "warmup worker did not stop in time, detaching");
                false
            }
        }
    }
}
