//! Upload transport
//!
//! A `Transport` performs one blocking upload of a local file into a target
//! subdirectory on the server. Every worker owns exactly one transport for
//! its whole lifetime so connection setup is paid once per worker, not once
//! per file. Transports are created by a shared `Connector`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  HttpConnector                       │
//! │  - Shared by the coordinator (Send + Sync)          │
//! │  - connect(worker_id) -> HttpTransport              │
//! └─────────────────────────┬───────────────────────────┘
//!                           │ one per worker
//!                           ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                  HttpTransport                       │
//! │  - Own blocking client + connection pool            │
//! │  - multipart POST: file + subdir                    │
//! │  - bounded per-request timeout                      │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod http;

use crate::error::TransportResult;
use std::path::Path;

pub use http::{HttpConnector, HttpTransport};

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// HTTP status returned by the server
    pub status: u16,

    /// Size of the uploaded file in bytes
    pub bytes: u64,

    /// Message returned by the server, if any
    pub message: Option<String>,
}

/// A blocking upload operation
///
/// Instances are never shared between workers, so implementations may keep
/// mutable per-connection state.
pub trait Transport {
    /// Upload `path` into `subdir` on the server
    fn upload(&mut self, path: &Path, subdir: &str) -> TransportResult<UploadReceipt>;
}

/// Creates one `Transport` per worker
pub trait Connector: Send + Sync + 'static {
    /// The transport type handed to each worker
    type Transport: Transport + Send + 'static;

    /// Create the transport for worker `worker_id`
    fn connect(&self, worker_id: usize) -> TransportResult<Self::Transport>;
}
