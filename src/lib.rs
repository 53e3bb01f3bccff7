//! file-uploader - Parallel HTTP File Uploader
//!
//! Uploads a single file, or every file under a directory tree, to an HTTP
//! upload endpoint using a fixed pool of worker threads.
//!
//! # Features
//!
//! - **Bounded Memory**: The directory walk feeds a fixed-capacity queue and
//!   blocks when it is full, so huge trees never buffer more than
//!   `--queue-size` jobs ahead of the network.
//!
//! - **Parallel Uploads**: Up to 16 worker threads, each owning its own HTTP
//!   client for the lifetime of the run.
//!
//! - **Layout Preserving**: Each file lands in the server subdirectory that
//!   mirrors its location under the uploaded directory.
//!
//! - **Failure Isolation**: A file that fails validation or upload is counted
//!   and reported; it never stops the rest of the run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Local Filesystem                             │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ walkdir
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Collector ──► Work Queue (crossbeam bounded, backpressure)      │
//! │                         │                                       │
//! │       ┌────────────┬────┴───────┬────────────────────┐          │
//! │  ┌────▼────┐  ┌────▼────┐  ┌────▼────┐         ┌────▼────┐     │
//! │  │Worker 1 │  │Worker 2 │  │Worker 3 │  ...    │Worker N │     │
//! │  │ reqwest │  │ reqwest │  │ reqwest │         │ reqwest │     │
//! │  └────┬────┘  └────┬────┘  └────┬────┘         └────┬────┘     │
//! │       └────────────┴──────┬─────┴────────────────────┘          │
//! │                           ▼                                     │
//! │                 UploadStats (atomics)                            │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ multipart POST
//!                               ▼
//!                    ┌──────────────────┐
//!                    │  upload endpoint │
//!                    └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Single file into a server subdirectory
//! file-uploader report.pdf docs/2024
//!
//! # Whole tree with 8 workers
//! file-uploader -j 8 -u https://files.example.com/upload.php ./photos
//!
//! # See what would be uploaded
//! file-uploader --dry-run --exclude '\.git/' ./project
//! ```

pub mod config;
pub mod error;
pub mod progress;
pub mod transport;
pub mod upload;
pub mod walker;

pub use config::{CliArgs, UploadConfig};
pub use error::{Result, UploaderError};
pub use upload::{UploadCoordinator, UploadResult};
