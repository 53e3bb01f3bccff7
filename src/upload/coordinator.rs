//! Upload coordinator - orchestrates the parallel upload
//!
//! The coordinator is responsible for:
//! - Validating the pool size and resolving the target before any thread starts
//! - Creating one transport per worker and spawning the workers
//! - Running the collector on the calling thread
//! - Joining the workers and building the final result

use crate::config::{UploadConfig, MAX_CONCURRENT, MIN_QUEUE_SIZE};
use crate::error::{ConfigError, Result, WorkerError};
use crate::progress::ProgressReporter;
use crate::transport::Connector;
use crate::upload::queue::{QueueStats, WorkQueue, WorkQueueReceiver};
use crate::upload::stats::{StatsSnapshot, UploadStats};
use crate::upload::worker::{aggregate_stats, Worker, WorkerContext};
use crate::walker::{Collector, Target};
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of an upload run
#[derive(Debug, Clone)]
pub struct UploadResult {
    /// Files uploaded successfully
    pub uploaded: u64,

    /// Files that failed validation or transport
    pub failed: u64,

    /// Files not attempted because of an interrupt
    pub skipped: u64,

    /// Files discovered
    pub total: u64,

    /// Bytes uploaded
    pub bytes_uploaded: u64,

    /// Time taken for the run
    pub duration: Duration,

    /// Wall-clock start time
    pub started_at: DateTime<Local>,

    /// Whether the run completed (vs was interrupted)
    pub completed: bool,
}

impl UploadResult {
    /// Every file was attempted and none failed
    pub fn is_success(&self) -> bool {
        self.completed && self.failed == 0
    }

    /// Final counters as a stats snapshot
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uploaded: self.uploaded,
            failed: self.failed,
            skipped: self.skipped,
            total: self.total,
            total_final: true,
            bytes_uploaded: self.bytes_uploaded,
            elapsed: self.duration,
        }
    }

    /// Process exit status for this result
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Coordinates the parallel upload
pub struct UploadCoordinator<C: Connector> {
    /// Configuration
    config: Arc<UploadConfig>,

    /// Creates one transport per worker
    connector: C,

    /// Job producer
    collector: Collector,

    /// Work queue for upload jobs
    queue: WorkQueue,

    /// Consumer handle; cloned for each worker, then released
    consumer: WorkQueueReceiver,

    /// Shared counters
    stats: Arc<UploadStats>,

    /// Per-file output
    reporter: Arc<ProgressReporter>,

    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl<C: Connector> UploadCoordinator<C> {
    /// Create a new upload coordinator
    ///
    /// Fails before any queue or thread exists if the pool size is out of
    /// range or the target cannot be used.
    pub fn new(config: UploadConfig, connector: C) -> Result<Self> {
        if config.worker_count == 0 || config.worker_count > MAX_CONCURRENT {
            return Err(ConfigError::InvalidJobCount {
                count: config.worker_count,
                max: MAX_CONCURRENT,
            }
            .into());
        }

        if config.queue_size < MIN_QUEUE_SIZE {
            return Err(ConfigError::InvalidQueueSize {
                size: config.queue_size,
                min: MIN_QUEUE_SIZE,
            }
            .into());
        }

        let target = Target::resolve(&config.target)?;
        let collector = Collector::new(target, &config);
        let reporter = Arc::new(ProgressReporter::new(&config));
        let (queue, consumer) = WorkQueue::new(config.queue_size);

        Ok(Self {
            config: Arc::new(config),
            connector,
            collector,
            queue,
            consumer,
            stats: Arc::new(UploadStats::new()),
            reporter,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace the progress reporter
    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Get the shared statistics
    pub fn stats(&self) -> Arc<UploadStats> {
        Arc::clone(&self.stats)
    }

    /// Get the work queue statistics
    pub fn queue_stats(&self) -> Arc<QueueStats> {
        self.queue.stats()
    }

    /// Get the resolved target
    pub fn target(&self) -> &Target {
        self.collector.target()
    }

    /// Run the upload
    pub fn run(self) -> Result<UploadResult> {
        info!(
            target = %self.collector.target().path().display(),
            url = %self.config.api_url,
            workers = self.config.worker_count,
            queue_size = self.config.queue_size,
            "Starting upload"
        );

        let workers = self.spawn_workers()?;

        // Only the workers hold consumers from here on; if they all die the
        // collector's next enqueue fails instead of blocking.
        drop(self.consumer);

        let summary = self
            .collector
            .run(&self.queue, &self.stats, &self.shutdown);

        let joined_cleanly = Self::join_workers(workers);
        self.reporter.finish();

        let snap = self.stats.snapshot();
        let interrupted = summary.interrupted || self.shutdown.load(Ordering::SeqCst);
        if interrupted {
            warn!(skipped = snap.skipped, "Upload interrupted");
        }

        let queue_stats = self.queue.stats();
        debug!(
            dequeued = queue_stats.throughput(),
            backpressure = queue_stats.backpressure_count(),
            high_water = queue_stats.high_water_mark(),
            "Queue statistics"
        );

        info!(
            uploaded = snap.uploaded,
            failed = snap.failed,
            skipped = snap.skipped,
            total = snap.total,
            bytes = snap.bytes_uploaded,
            duration_secs = snap.elapsed.as_secs(),
            "Upload finished"
        );

        Ok(UploadResult {
            uploaded: snap.uploaded,
            failed: snap.failed,
            skipped: snap.skipped,
            total: snap.total,
            bytes_uploaded: snap.bytes_uploaded,
            duration: snap.elapsed,
            started_at: self.stats.started_at(),
            completed: !interrupted && joined_cleanly,
        })
    }

    /// Connect and spawn every worker
    ///
    /// Transports are created here, on the coordinator thread, so a bad
    /// endpoint fails the run before any job is produced.
    fn spawn_workers(&self) -> Result<Vec<Worker>> {
        let ctx = WorkerContext {
            config: Arc::clone(&self.config),
            stats: Arc::clone(&self.stats),
            reporter: Arc::clone(&self.reporter),
            shutdown: Arc::clone(&self.shutdown),
        };

        let mut workers = Vec::with_capacity(self.config.worker_count);

        for id in 0..self.config.worker_count {
            let spawned = self
                .connector
                .connect(id)
                .map_err(|e| WorkerError::InitFailed {
                    id,
                    reason: e.to_string(),
                })
                .and_then(|transport| {
                    Worker::spawn(id, transport, self.consumer.clone(), ctx.clone())
                });

            match spawned {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    // Release the workers already running before failing
                    self.queue.close();
                    Self::join_workers(workers);
                    return Err(e.into());
                }
            }
        }

        info!(count = workers.len(), "Workers spawned");
        Ok(workers)
    }

    /// Join all worker threads
    ///
    /// Returns false if any worker died.
    fn join_workers(workers: Vec<Worker>) -> bool {
        let (uploaded, failed, bytes) = aggregate_stats(&workers);
        debug!(
            uploaded = uploaded,
            failed = failed,
            bytes = bytes,
            "Joining workers"
        );

        let mut clean = true;
        for worker in workers {
            if let Err(e) = worker.join() {
                error!(error = %e, "Worker failed to join cleanly");
                clean = false;
            }
        }
        clean
    }
}
