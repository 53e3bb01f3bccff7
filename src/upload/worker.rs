//! Worker thread logic for parallel uploads
//!
//! Each worker:
//! - Owns exactly one transport, created before the thread starts
//! - Pulls upload jobs from the work queue
//! - Validates the file, then uploads it
//! - Records the outcome in the shared statistics
//! - Exits when the queue is closed and drained

use crate::config::UploadConfig;
use crate::error::{TransportError, UploadOutcome, ValidationError, WorkerError};
use crate::progress::ProgressReporter;
use crate::transport::Transport;
use crate::upload::queue::{UploadJob, WorkQueueReceiver};
use crate::upload::stats::UploadStats;
use std::fs::File;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

/// Statistics collected by a single worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Files uploaded
    pub uploaded: AtomicU64,

    /// Files failed
    pub failed: AtomicU64,

    /// Bytes uploaded
    pub bytes: AtomicU64,
}

impl WorkerStats {
    fn record(&self, outcome: &UploadOutcome) {
        match outcome {
            UploadOutcome::Uploaded { bytes, .. } => {
                self.uploaded.fetch_add(1, Ordering::Relaxed);
                self.bytes.fetch_add(*bytes, Ordering::Relaxed);
            }
            _ => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Shared state every worker is bound to
#[derive(Clone)]
pub struct WorkerContext {
    pub config: Arc<UploadConfig>,
    pub stats: Arc<UploadStats>,
    pub reporter: Arc<ProgressReporter>,
    pub shutdown: Arc<AtomicBool>,
}

/// An upload worker thread
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread that owns `transport`
    pub fn spawn<T>(
        id: usize,
        transport: T,
        queue_rx: WorkQueueReceiver,
        ctx: WorkerContext,
    ) -> Result<Self, WorkerError>
    where
        T: Transport + Send + 'static,
    {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("uploader-{}", id))
            .spawn(move || worker_loop(id, transport, queue_rx, ctx, stats_clone))
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked {
                id: self.id,
                message: "Worker thread panicked".into(),
            }),
            None => Ok(()),
        }
    }
}

/// Main worker loop
fn worker_loop<T: Transport>(
    id: usize,
    mut transport: T,
    queue_rx: WorkQueueReceiver,
    ctx: WorkerContext,
    stats: Arc<WorkerStats>,
) {
    debug!(worker = id, "Worker starting");

    while let Some(job) = queue_rx.dequeue() {
        // After an interrupt, keep draining so the producer never stays
        // blocked on a full queue, but stop uploading.
        if ctx.shutdown.load(Ordering::Relaxed) {
            ctx.stats.record_skipped();
            trace!(worker = id, path = %job.source_path.display(), "Skipping after interrupt");
            continue;
        }

        let outcome = process_job(id, &mut transport, &job, &ctx.config);

        stats.record(&outcome);
        match &outcome {
            UploadOutcome::Uploaded { bytes, .. } => {
                ctx.stats.record_success(*bytes);
                debug!(worker = id, path = %outcome.path(), bytes = bytes, "Uploaded");
            }
            UploadOutcome::Invalid { .. } | UploadOutcome::Failed { .. } => {
                ctx.stats.record_failure();
                debug!(worker = id, path = %outcome.path(), "Upload failed");
            }
        }

        ctx.reporter.file_completed(&job, &outcome, &ctx.stats.snapshot());
    }

    debug!(
        worker = id,
        uploaded = stats.uploaded.load(Ordering::Relaxed),
        failed = stats.failed.load(Ordering::Relaxed),
        "Worker shutting down"
    );
}

/// Validate and upload a single job
///
/// Never panics: a panicking transport is reported as a failed upload so the
/// rest of the pool keeps running.
pub fn process_job<T: Transport>(
    worker_id: usize,
    transport: &mut T,
    job: &UploadJob,
    config: &UploadConfig,
) -> UploadOutcome {
    let path = job.source_path.display().to_string();

    if let Err(error) = validate_file(&job.source_path, config.max_file_size) {
        return UploadOutcome::Invalid { path, error };
    }

    trace!(
        worker = worker_id,
        path = %path,
        subdir = %job.target_subdir,
        "Uploading"
    );

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        transport.upload(&job.source_path, &job.target_subdir)
    }));

    match result {
        Ok(Ok(receipt)) => UploadOutcome::Uploaded {
            path,
            bytes: receipt.bytes,
            message: receipt.message,
        },
        Ok(Err(error)) => UploadOutcome::Failed { path, error },
        Err(_) => UploadOutcome::Failed {
            path: path.clone(),
            error: TransportError::Request {
                path,
                reason: "transport panicked".into(),
            },
        },
    }
}

/// Check that `path` is a readable regular file no larger than `max_size`
///
/// Returns the file size.
pub fn validate_file(path: &Path, max_size: u64) -> Result<u64, ValidationError> {
    let display = || path.display().to_string();

    let metadata = std::fs::metadata(path).map_err(|e| ValidationError::Unreadable {
        path: display(),
        reason: e.to_string(),
    })?;

    if !metadata.is_file() {
        return Err(ValidationError::NotAFile { path: display() });
    }

    if metadata.len() > max_size {
        return Err(ValidationError::TooLarge {
            path: display(),
            size: metadata.len(),
            max: max_size,
        });
    }

    File::open(path).map_err(|e| ValidationError::Unreadable {
        path: display(),
        reason: e.to_string(),
    })?;

    Ok(metadata.len())
}

/// Aggregate statistics from multiple workers
///
/// Returns `(uploaded, failed, bytes)`.
pub fn aggregate_stats(workers: &[Worker]) -> (u64, u64, u64) {
    workers.iter().fold((0, 0, 0), |(uploaded, failed, bytes), worker| {
        (
            uploaded + worker.stats.uploaded.load(Ordering::Relaxed),
            failed + worker.stats.failed.load(Ordering::Relaxed),
            bytes + worker.stats.bytes.load(Ordering::Relaxed),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliArgs;
    use crate::error::TransportResult;
    use crate::transport::UploadReceipt;
    use crate::upload::queue::WorkQueue;
    use clap::Parser;
    use std::io::Write;
    use tempfile::tempdir;

    struct FixedTransport {
        fail: bool,
        calls: Vec<(String, String)>,
    }

    impl Transport for FixedTransport {
        fn upload(&mut self, path: &Path, subdir: &str) -> TransportResult<UploadReceipt> {
            self.calls
                .push((path.display().to_string(), subdir.to_string()));
            if self.fail {
                Err(TransportError::Status {
                    path: path.display().to_string(),
                    status: 500,
                    message: Some("boom".into()),
                })
            } else {
                Ok(UploadReceipt {
                    status: 200,
                    bytes: std::fs::metadata(path).unwrap().len(),
                    message: None,
                })
            }
        }
    }

    struct PanickingTransport;

    impl Transport for PanickingTransport {
        fn upload(&mut self, _path: &Path, _subdir: &str) -> TransportResult<UploadReceipt> {
            panic!("transport bug");
        }
    }

    fn config(max_size: u64) -> UploadConfig {
        let args = CliArgs::parse_from([
            "file-uploader",
            "-u",
            "http://localhost/upload.php",
            "--max-size",
            &max_size.to_string(),
            "unused",
        ]);
        UploadConfig::from_args(args).unwrap()
    }

    #[test]
    fn test_validate_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("small.txt");
        std::fs::write(&path, b"0123456789").unwrap();

        assert_eq!(validate_file(&path, 10).unwrap(), 10);
        assert!(matches!(
            validate_file(&path, 9),
            Err(ValidationError::TooLarge { size: 10, max: 9, .. })
        ));
        assert!(matches!(
            validate_file(dir.path(), 100),
            Err(ValidationError::NotAFile { .. })
        ));
        assert!(matches!(
            validate_file(&dir.path().join("missing.txt"), 100),
            Err(ValidationError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_process_job_success_and_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello")
            .unwrap();
        let job = UploadJob::new(&path, "docs");
        let config = config(1024);

        let mut ok = FixedTransport {
            fail: false,
            calls: Vec::new(),
        };
        let outcome = process_job(0, &mut ok, &job, &config);
        assert!(matches!(outcome, UploadOutcome::Uploaded { bytes: 5, .. }));
        assert_eq!(ok.calls, vec![(path.display().to_string(), "docs".to_string())]);

        let mut bad = FixedTransport {
            fail: true,
            calls: Vec::new(),
        };
        let outcome = process_job(0, &mut bad, &job, &config);
        assert!(matches!(outcome, UploadOutcome::Failed { .. }));
    }

    #[test]
    fn test_oversized_file_never_reaches_transport() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0u8; 64]).unwrap();

        let mut transport = FixedTransport {
            fail: false,
            calls: Vec::new(),
        };
        let outcome = process_job(0, &mut transport, &UploadJob::new(&path, ""), &config(32));

        assert!(matches!(outcome, UploadOutcome::Invalid { .. }));
        assert!(transport.calls.is_empty());
    }

    #[test]
    fn test_panicking_transport_is_a_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"x").unwrap();

        let outcome = process_job(
            3,
            &mut PanickingTransport,
            &UploadJob::new(&path, ""),
            &config(1024),
        );
        assert!(matches!(outcome, UploadOutcome::Failed { .. }));
    }

    #[test]
    fn test_worker_drains_queue_and_exits() {
        let dir = tempdir().unwrap();
        let (queue, receiver) = WorkQueue::new(8);
        for n in 0..5 {
            let path = dir.path().join(format!("f{}.txt", n));
            std::fs::write(&path, b"abc").unwrap();
            queue.enqueue(UploadJob::new(path, "")).unwrap();
        }
        queue.close();

        let ctx = WorkerContext {
            config: Arc::new(config(1024)),
            stats: Arc::new(UploadStats::new()),
            reporter: Arc::new(ProgressReporter::silent()),
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        let transport = FixedTransport {
            fail: false,
            calls: Vec::new(),
        };

        let worker = Worker::spawn(0, transport, receiver, ctx.clone()).unwrap();
        let worker_stats = Arc::clone(&worker.stats);
        assert_eq!(worker.id(), 0);
        worker.join().unwrap();

        assert_eq!(worker_stats.uploaded.load(Ordering::Relaxed), 5);
        assert_eq!(worker_stats.bytes.load(Ordering::Relaxed), 15);

        let snap = ctx.stats.snapshot();
        assert_eq!(snap.uploaded, 5);
        assert_eq!(snap.failed, 0);
        assert_eq!(snap.bytes_uploaded, 15);
    }

    #[test]
    fn test_shutdown_skips_remaining_jobs() {
        let dir = tempdir().unwrap();
        let (queue, receiver) = WorkQueue::new(8);
        for n in 0..3 {
            let path = dir.path().join(format!("f{}.txt", n));
            std::fs::write(&path, b"abc").unwrap();
            queue.enqueue(UploadJob::new(path, "")).unwrap();
        }
        queue.close();

        let ctx = WorkerContext {
            config: Arc::new(config(1024)),
            stats: Arc::new(UploadStats::new()),
            reporter: Arc::new(ProgressReporter::silent()),
            shutdown: Arc::new(AtomicBool::new(true)),
        };
        let transport = FixedTransport {
            fail: false,
            calls: Vec::new(),
        };

        Worker::spawn(1, transport, receiver, ctx.clone())
            .unwrap()
            .join()
            .unwrap();

        let snap = ctx.stats.snapshot();
        assert_eq!(snap.uploaded, 0);
        assert_eq!(snap.skipped, 3);
        assert!(queue.is_empty());
    }
}
