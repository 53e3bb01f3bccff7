//! Upload job producer
//!
//! Turns the command-line target into a lazy stream of upload jobs. A single
//! file becomes one job; a directory is walked depth-first in file-name order
//! and every regular file that passes the filters becomes a job whose target
//! subdirectory mirrors its parent directory relative to the walk root.

use crate::config::{sanitize_subdir, UploadConfig};
use crate::error::ConfigError;
use crate::upload::queue::{CloseGuard, UploadJob, WorkQueue};
use crate::upload::stats::UploadStats;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, trace, warn};
use walkdir::{DirEntry, WalkDir};

/// File name suffixes that are never uploaded
const SKIPPED_SUFFIXES: &[&str] = &[".tmp", ".swp", "~"];

/// What the user asked to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A single regular file
    File(PathBuf),

    /// A directory tree
    Dir(PathBuf),
}

impl Target {
    /// Check the target exists and classify it
    ///
    /// Runs before any worker is spawned; the returned path is absolute.
    pub fn resolve(path: &Path) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTarget {
            path: path.to_path_buf(),
            reason,
        };

        let metadata = std::fs::metadata(path).map_err(|e| invalid(e.to_string()))?;
        let absolute = std::path::absolute(path).map_err(|e| invalid(e.to_string()))?;

        if metadata.is_file() {
            Ok(Target::File(absolute))
        } else if metadata.is_dir() {
            Ok(Target::Dir(absolute))
        } else {
            Err(invalid("not a regular file or directory".into()))
        }
    }

    /// Path of the target
    pub fn path(&self) -> &Path {
        match self {
            Target::File(path) | Target::Dir(path) => path,
        }
    }

    /// Check if the target is a directory
    pub fn is_dir(&self) -> bool {
        matches!(self, Target::Dir(_))
    }
}

/// One item produced by the walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovered {
    /// A file to upload
    Job(UploadJob),

    /// An entry the walk could not read
    Unreadable { path: PathBuf, reason: String },
}

/// Summary of a collector run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectSummary {
    /// Jobs handed to the queue
    pub enqueued: u64,

    /// Entries that could not be read
    pub unreadable: u64,

    /// Walk stopped early because of an interrupt
    pub interrupted: bool,
}

/// Check whether a file name is eligible for upload
///
/// Hidden files and editor/temporary files are skipped.
pub fn should_upload(name: &str) -> bool {
    !name.starts_with('.') && !SKIPPED_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Server subdirectory for `path`, found under `root`
///
/// The prefix is joined with the file's parent directory relative to the
/// walk root, then sanitized.
pub fn job_subdir(prefix: &str, root: &Path, path: &Path) -> String {
    let relative = path
        .parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default();

    sanitize_subdir(&format!("{}/{}", prefix, relative))
}

/// Walks the target and feeds the work queue
pub struct Collector {
    target: Target,
    prefix: String,
    max_depth: Option<usize>,
    exclude_patterns: Vec<Regex>,
}

impl Collector {
    /// Create a collector for a resolved target
    pub fn new(target: Target, config: &UploadConfig) -> Self {
        Self {
            target,
            prefix: config.subdir.clone(),
            max_depth: config.max_depth,
            exclude_patterns: config.exclude_patterns.clone(),
        }
    }

    /// Get the target being collected
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Lazily produce every job for the target
    pub fn discover(&self) -> Box<dyn Iterator<Item = Discovered> + '_> {
        match &self.target {
            Target::File(path) => Box::new(std::iter::once(Discovered::Job(UploadJob::new(
                path.clone(),
                self.prefix.clone(),
            )))),
            Target::Dir(root) => {
                // Depth 0 in walkdir is the root itself
                let depth = self.max_depth.map_or(usize::MAX, |d| d.saturating_add(1));

                let walk = WalkDir::new(root)
                    .follow_links(false)
                    .sort_by_file_name()
                    .min_depth(1)
                    .max_depth(depth)
                    .into_iter()
                    .filter_entry(move |entry| {
                        !(entry.file_type().is_dir() && self.is_excluded(entry.path()))
                    });

                Box::new(walk.filter_map(move |entry| match entry {
                    Ok(entry) => self.classify(root, entry),
                    Err(err) => Some(Discovered::Unreadable {
                        path: err.path().map_or_else(|| root.clone(), Path::to_path_buf),
                        reason: err
                            .io_error()
                            .map_or_else(|| err.to_string(), |e| e.to_string()),
                    }),
                }))
            }
        }
    }

    /// Enqueue every discovered job, then close the queue
    ///
    /// `total` is incremented before each enqueue and finalized when the
    /// walk ends. Unreadable entries count as discovered and failed.
    pub fn run(
        &self,
        queue: &WorkQueue,
        stats: &UploadStats,
        shutdown: &AtomicBool,
    ) -> CollectSummary {
        let _close = CloseGuard::new(queue);
        let mut summary = CollectSummary::default();

        info!(path = %self.target.path().display(), "Collecting files");

        for item in self.discover() {
            if shutdown.load(Ordering::Relaxed) {
                summary.interrupted = true;
                break;
            }

            match item {
                Discovered::Job(job) => {
                    stats.record_discovered();
                    trace!(path = %job.source_path.display(), subdir = %job.target_subdir, "Enqueue");
                    if queue.enqueue(job).is_err() {
                        // Counted but never handed to a worker
                        stats.record_skipped();
                        warn!("Work queue closed while collecting");
                        summary.interrupted = true;
                        break;
                    }
                    summary.enqueued += 1;
                }
                Discovered::Unreadable { path, reason } => {
                    stats.record_discovered();
                    stats.record_failure();
                    summary.unreadable += 1;
                    error!(path = %path.display(), "Cannot read: {}", reason);
                }
            }
        }

        stats.finalize_total();

        debug!(
            enqueued = summary.enqueued,
            unreadable = summary.unreadable,
            interrupted = summary.interrupted,
            "Collection finished"
        );

        summary
    }

    fn classify(&self, root: &Path, entry: DirEntry) -> Option<Discovered> {
        let file_type = entry.file_type();
        if file_type.is_dir() {
            return None;
        }

        let path = entry.into_path();

        if file_type.is_symlink() {
            // Symlinked files are uploaded, symlinked directories are not walked
            match std::fs::metadata(&path) {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => return None,
                Err(e) => {
                    return Some(Discovered::Unreadable {
                        path,
                        reason: e.to_string(),
                    })
                }
            }
        } else if !file_type.is_file() {
            return None;
        }

        let name = path.file_name()?.to_string_lossy();
        if !should_upload(&name) || self.is_excluded(&path) {
            trace!(path = %path.display(), "Filtered");
            return None;
        }

        let subdir = job_subdir(&self.prefix, root, &path);
        Some(Discovered::Job(UploadJob::new(path, subdir)))
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if self.exclude_patterns.is_empty() {
            return false;
        }
        let path = path.to_string_lossy();
        self.exclude_patterns.iter().any(|re| re.is_match(&path))
    }
}
