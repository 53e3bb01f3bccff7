//! Filesystem side of the uploader
//!
//! The collector is the single producer of upload jobs. It runs on the
//! invoking thread while the worker pool drains the queue.
//!
//! ```text
//!   target ──► Target::resolve ──► Collector::discover (walkdir, lazy)
//!                                        │ filter: dotfiles, *.tmp, *.swp, *~,
//!                                        │         --exclude, --max-depth
//!                                        ▼
//!                                  WorkQueue::enqueue (blocks when full)
//! ```

pub mod collector;

pub use collector::{job_subdir, should_upload, CollectSummary, Collector, Discovered, Target};
