//! Bounded work queue for upload jobs
//!
//! A fixed-capacity FIFO shared between the collector (sole producer) and
//! the upload workers. When the queue is full the producer blocks, so a
//! fast directory walk cannot buffer more than `capacity` jobs ahead of the
//! network.
//!
//! The queue is a crossbeam bounded channel. The queue owns the only
//! long-lived sender; `close()` drops it, which disconnects the channel once
//! any in-flight `enqueue` has finished. Every blocked receiver is woken on
//! disconnection, drains whatever is left, and then observes the close.

use crate::error::QueueError;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// A single file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    /// Absolute path of the local file
    pub source_path: PathBuf,

    /// Target subdirectory on the server (may be empty)
    pub target_subdir: String,
}

impl UploadJob {
    /// Create a new upload job
    pub fn new(source_path: impl Into<PathBuf>, target_subdir: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            target_subdir: target_subdir.into(),
        }
    }

    /// File name for display
    pub fn display_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }
}

/// Statistics for the work queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total jobs enqueued
    pub enqueued: AtomicU64,

    /// Total jobs dequeued
    pub dequeued: AtomicU64,

    /// Number of times the producer had to wait for space
    pub backpressure_events: AtomicU64,

    /// Largest number of jobs observed resident in the queue
    pub high_water: AtomicUsize,
}

impl QueueStats {
    /// Get number of jobs handed to workers
    pub fn throughput(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    /// Get backpressure event count
    pub fn backpressure_count(&self) -> u64 {
        self.backpressure_events.load(Ordering::Relaxed)
    }

    /// Get the high-water mark of resident jobs
    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::Relaxed)
    }
}

/// Bounded work queue with close semantics
pub struct WorkQueue {
    /// Producer side; `None` once closed
    sender: Mutex<Option<Sender<UploadJob>>>,

    /// Queue statistics
    stats: Arc<QueueStats>,
}

impl WorkQueue {
    /// Create a new work queue with the specified capacity
    ///
    /// Returns the queue and the consumer handle to clone for each worker.
    /// The queue keeps no consumer of its own, so once every consumer is
    /// dropped a blocked `enqueue` fails instead of waiting forever.
    ///
    /// `capacity` must be at least 1; configuration validation enforces it.
    pub fn new(capacity: usize) -> (Self, WorkQueueReceiver) {
        let (sender, receiver) = bounded(capacity);
        let stats = Arc::new(QueueStats::default());

        let queue = Self {
            sender: Mutex::new(Some(sender)),
            stats: Arc::clone(&stats),
        };

        (queue, WorkQueueReceiver { receiver, stats })
    }

    /// Add a job to the tail of the queue, blocking while the queue is full
    ///
    /// Fails with `QueueError::Closed` if `close()` has already been called
    /// or every consumer is gone.
    pub fn enqueue(&self, job: UploadJob) -> Result<(), QueueError> {
        // Clone the sender so close() never waits behind a blocked send.
        let sender = self.sender.lock().clone().ok_or(QueueError::Closed)?;

        let job = match sender.try_send(job) {
            Ok(()) => {
                self.record_enqueued(sender.len());
                return Ok(());
            }
            Err(TrySendError::Full(job)) => job,
            Err(TrySendError::Disconnected(_)) => return Err(QueueError::Closed),
        };

        self.stats.backpressure_events.fetch_add(1, Ordering::Relaxed);
        sender.send(job).map_err(|_| QueueError::Closed)?;
        self.record_enqueued(sender.len());
        Ok(())
    }

    /// Close the queue
    ///
    /// Idempotent. Workers drain the remaining jobs and then see `None`
    /// from `dequeue()`.
    pub fn close(&self) {
        self.sender.lock().take();
    }

    /// Check whether `close()` has been called
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        let enqueued = self.stats.enqueued.load(Ordering::SeqCst);
        let dequeued = self.stats.dequeued.load(Ordering::SeqCst);
        enqueued.saturating_sub(dequeued) as usize
    }

    fn record_enqueued(&self, resident: usize) {
        self.stats.enqueued.fetch_add(1, Ordering::SeqCst);
        self.stats.high_water.fetch_max(resident, Ordering::Relaxed);
    }
}

/// Closes the queue when dropped
///
/// Held by the producer so the queue is closed exactly once even if the
/// walk returns early.
pub struct CloseGuard<'a> {
    queue: &'a WorkQueue,
}

impl<'a> CloseGuard<'a> {
    /// Create a guard for `queue`
    pub fn new(queue: &'a WorkQueue) -> Self {
        Self { queue }
    }
}

impl<'a> Drop for CloseGuard<'a> {
    fn drop(&mut self) {
        self.queue.close();
    }
}

/// Handle for receiving jobs from the queue
#[derive(Clone)]
pub struct WorkQueueReceiver {
    receiver: Receiver<UploadJob>,
    stats: Arc<QueueStats>,
}

impl WorkQueueReceiver {
    /// Take the next job from the queue
    ///
    /// Blocks until a job is available. Returns `None` once the queue has
    /// been closed and fully drained; that is the worker's signal to exit.
    pub fn dequeue(&self) -> Option<UploadJob> {
        match self.receiver.recv() {
            Ok(job) => {
                self.stats.dequeued.fetch_add(1, Ordering::SeqCst);
                Some(job)
            }
            Err(_) => None,
        }
    }

    /// Try to take a job without blocking
    pub fn try_dequeue(&self) -> Option<UploadJob> {
        match self.receiver.try_recv() {
            Ok(job) => {
                self.stats.dequeued.fetch_add(1, Ordering::SeqCst);
                Some(job)
            }
            Err(_) => None,
        }
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.receiver.len()
    }
}
