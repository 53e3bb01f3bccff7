//! Integration tests for file-uploader
//!
//! These tests run the full coordinator against in-process transports and
//! temporary directory trees; no network server is required.

use clap::Parser;
use file_uploader::config::{CliArgs, UploadConfig};
use file_uploader::error::{ConfigError, TransportError, TransportResult, UploaderError};
use file_uploader::progress::ProgressReporter;
use file_uploader::transport::{Connector, Transport, UploadReceipt};
use file_uploader::upload::UploadCoordinator;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

/// Records every upload; fails for the listed file names
#[derive(Clone, Default)]
struct MockConnector {
    fail_names: Arc<HashSet<String>>,
    delay: Duration,
    uploads: Arc<Mutex<Vec<(PathBuf, String)>>>,
}

struct MockTransport {
    fail_names: Arc<HashSet<String>>,
    delay: Duration,
    uploads: Arc<Mutex<Vec<(PathBuf, String)>>>,
}

impl MockConnector {
    fn failing(names: &[&str]) -> Self {
        Self {
            fail_names: Arc::new(names.iter().map(|n| n.to_string()).collect()),
            ..Default::default()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.lock().clone()
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn connect(&self, _worker_id: usize) -> TransportResult<MockTransport> {
        Ok(MockTransport {
            fail_names: Arc::clone(&self.fail_names),
            delay: self.delay,
            uploads: Arc::clone(&self.uploads),
        })
    }
}

impl Transport for MockTransport {
    fn upload(&mut self, path: &Path, subdir: &str) -> TransportResult<UploadReceipt> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if self.fail_names.contains(&name) {
            return Err(TransportError::Status {
                path: path.display().to_string(),
                status: 500,
                message: Some("disk full".into()),
            });
        }

        self.uploads
            .lock()
            .push((path.to_path_buf(), subdir.to_string()));

        Ok(UploadReceipt {
            status: 200,
            bytes: std::fs::metadata(path).unwrap().len(),
            message: Some("File uploaded".into()),
        })
    }
}

fn config(target: &Path, extra: &[&str]) -> UploadConfig {
    let target = target.to_string_lossy().into_owned();
    let mut argv = vec!["file-uploader", "-q", "-u", "http://localhost/upload.php"];
    argv.extend_from_slice(extra);
    argv.push(&target);
    UploadConfig::from_args(CliArgs::try_parse_from(argv).unwrap()).unwrap()
}

fn files(count: usize) -> TempDir {
    let dir = tempdir().unwrap();
    for n in 0..count {
        std::fs::write(dir.path().join(format!("file{:02}.txt", n)), b"0123456789").unwrap();
    }
    dir
}

#[test]
fn test_single_file_upload() {
    let dir = files(1);
    let path = dir.path().join("file00.txt");
    let connector = MockConnector::default();

    let result = UploadCoordinator::new(config(&path, &["-j", "1"]), connector.clone())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(result.uploaded, 1);
    assert_eq!(result.failed, 0);
    assert_eq!(result.total, 1);
    assert_eq!(result.exit_code(), 0);
    assert_eq!(connector.uploads(), vec![(path, String::new())]);
}

#[test]
fn test_partial_failure() {
    let dir = files(10);
    let connector = MockConnector::failing(&["file02.txt", "file05.txt", "file09.txt"]);

    let result = UploadCoordinator::new(config(dir.path(), &["-j", "4"]), connector.clone())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(result.uploaded, 7);
    assert_eq!(result.failed, 3);
    assert_eq!(result.total, 10);
    assert!(result.completed);
    assert!(!result.is_success());
    assert_ne!(result.exit_code(), 0);
    assert_eq!(connector.uploads().len(), 7);
}

#[test]
fn test_backpressure_with_slow_transport() {
    let dir = files(5);
    let connector = MockConnector::slow(Duration::from_millis(50));

    let coordinator = UploadCoordinator::new(
        config(dir.path(), &["-j", "1", "--queue-size", "2"]),
        connector,
    )
    .unwrap()
    .with_reporter(ProgressReporter::silent());
    let queue_stats = coordinator.queue_stats();

    let result = coordinator.run().unwrap();

    assert_eq!(result.uploaded + result.failed, 5);
    assert!(queue_stats.backpressure_count() >= 1);
    assert!(queue_stats.high_water_mark() <= 2);
}

#[test]
fn test_interrupt_while_producer_blocked() {
    let dir = files(20);
    let connector = MockConnector::slow(Duration::from_millis(100));

    let coordinator = UploadCoordinator::new(
        config(dir.path(), &["-j", "1", "--queue-size", "1"]),
        connector.clone(),
    )
    .unwrap()
    .with_reporter(ProgressReporter::silent());

    let shutdown = coordinator.shutdown_flag();
    let interrupter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        shutdown.store(true, Ordering::SeqCst);
    });

    let result = coordinator.run().unwrap();
    interrupter.join().unwrap();

    assert!(!result.completed);
    assert_eq!(result.uploaded + result.failed + result.skipped, result.total);
    assert!(result.uploaded < 20);
    assert_eq!(result.uploaded as usize, connector.uploads().len());
    assert_ne!(result.exit_code(), 0);
}

#[test]
fn test_zero_workers_rejected() {
    let args = CliArgs::try_parse_from(["file-uploader", "-u", "http://h/u", "-j", "0", "x"]).unwrap();
    let err = UploadConfig::from_args(args).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidJobCount { count: 0, .. }));

    // A hand-built config is checked again before the queue is created
    let dir = files(1);
    let mut config = config(dir.path(), &[]);
    config.worker_count = 0;
    let err = UploadCoordinator::new(config, MockConnector::default())
        .err()
        .unwrap();
    assert!(matches!(err, UploaderError::Config(_)));
}

#[test]
fn test_stats_consistency() {
    let dir = files(40);
    std::fs::write(dir.path().join("big.bin"), vec![0u8; 2048]).unwrap();
    let connector = MockConnector::failing(&["file07.txt", "file31.txt"]);

    for jobs in ["1", "2", "8", "16"] {
        let result = UploadCoordinator::new(
            config(dir.path(), &["-j", jobs, "--queue-size", "3", "--max-size", "1024"]),
            connector.clone(),
        )
        .unwrap()
        .run()
        .unwrap();

        assert_eq!(result.total, 41, "jobs={}", jobs);
        assert_eq!(result.uploaded + result.failed, result.total, "jobs={}", jobs);
        assert_eq!(result.failed, 3, "jobs={}", jobs);
        assert_eq!(result.bytes_uploaded, 38 * 10, "jobs={}", jobs);
    }
}

#[test]
fn test_subdirectories_preserved() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("photos/2024/summer")).unwrap();
    std::fs::write(root.join("readme.md"), b"r").unwrap();
    std::fs::write(root.join("photos/cover.jpg"), b"c").unwrap();
    std::fs::write(root.join("photos/2024/summer/beach.jpg"), b"b").unwrap();
    std::fs::write(root.join("photos/2024/.thumbs.db"), b"t").unwrap();
    std::fs::write(root.join("photos/2024/draft.tmp"), b"t").unwrap();

    let mut config = config(root, &["-j", "2"]);
    config.subdir = "backup".into();

    let connector = MockConnector::default();
    let result = UploadCoordinator::new(config, connector.clone())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(result.uploaded, 3);

    let mut uploads: Vec<_> = connector
        .uploads()
        .into_iter()
        .map(|(path, subdir)| {
            (
                path.file_name().unwrap().to_string_lossy().into_owned(),
                subdir,
            )
        })
        .collect();
    uploads.sort();

    assert_eq!(
        uploads,
        vec![
            ("beach.jpg".to_string(), "backup/photos/2024/summer".to_string()),
            ("cover.jpg".to_string(), "backup/photos".to_string()),
            ("readme.md".to_string(), "backup".to_string()),
        ]
    );
}

#[test]
fn test_empty_directory() {
    let dir = tempdir().unwrap();
    let result = UploadCoordinator::new(config(dir.path(), &[]), MockConnector::default())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(result.total, 0);
    assert!(result.is_success());
}
