//! Error types for file-uploader
//!
//! This module defines the error hierarchy for the uploader:
//! - Configuration and CLI errors (fatal, raised before any worker starts)
//! - Per-file validation and transport errors (counted, never fatal)
//! - Work queue and worker thread errors
//!
//! Per-file errors are recovered locally by the worker pool. Only
//! configuration and startup errors propagate to a non-zero exit.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the uploader
#[derive(Error, Debug)]
pub enum UploaderError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid job (worker) count
    #[error("Invalid job count {count}: must be between 1 and {max}")]
    InvalidJobCount { count: usize, max: usize },

    /// Invalid queue size
    #[error("Invalid queue size {size}: must be at least {min}")]
    InvalidQueueSize { size: usize, min: usize },

    /// Invalid transport timeout
    #[error("Invalid timeout {secs}s: must be at least 1 second")]
    InvalidTimeout { secs: u64 },

    /// Invalid maximum file size
    #[error("Invalid maximum file size {size}: must be greater than zero")]
    InvalidMaxSize { size: u64 },

    /// Endpoint URL missing or malformed
    #[error("Invalid upload URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// Upload target cannot be used
    #[error("Cannot access path '{path}': {reason}")]
    InvalidTarget { path: PathBuf, reason: String },
}

/// Per-file validation errors, detected before the transport is called
#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    /// File is larger than the configured limit
    #[error("File {path} is too large ({size} bytes, max {max} bytes)")]
    TooLarge { path: String, size: u64, max: u64 },

    /// File cannot be read
    #[error("Cannot read file {path}: {reason}")]
    Unreadable { path: String, reason: String },

    /// Path is not a regular file
    #[error("Not a regular file: {path}")]
    NotAFile { path: String },
}

/// HTTP transport errors
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Failed to build the client
    #[error("Failed to initialize HTTP client: {0}")]
    InitFailed(String),

    /// Request could not be sent or the connection failed
    #[error("Upload failed for {path}: {reason}")]
    Request { path: String, reason: String },

    /// Request timed out
    #[error("Upload timed out for {path} after {secs}s")]
    Timeout { path: String, secs: u64 },

    /// Server responded with a non-success status
    #[error("Server error for {path}: HTTP {status}{}", format_message(.message))]
    Status {
        path: String,
        status: u16,
        message: Option<String>,
    },

    /// Server accepted the request but reported failure in the body
    #[error("Server rejected {path}: {message}")]
    Rejected { path: String, message: String },
}

fn format_message(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(" ({})", m),
        _ => String::new(),
    }
}

impl TransportError {
    /// Message provided by the server, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            TransportError::Status { message, .. } => message.as_deref(),
            TransportError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }

    /// HTTP status code, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Work queue errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Enqueue after close
    #[error("Work queue is closed")]
    Closed,
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker initialization failed
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },
}

/// Result type alias for UploaderError
pub type Result<T> = std::result::Result<T, UploaderError>;

/// Result type alias for TransportError
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Represents the outcome of uploading a single file
#[derive(Debug)]
pub enum UploadOutcome {
    /// File was uploaded
    Uploaded {
        path: String,
        bytes: u64,
        message: Option<String>,
    },

    /// File failed validation before any request was made
    Invalid { path: String, error: ValidationError },

    /// Transport failed or the server refused the file
    Failed { path: String, error: TransportError },
}

impl UploadOutcome {
    /// Returns the path associated with this outcome
    pub fn path(&self) -> &str {
        match self {
            UploadOutcome::Uploaded { path, .. } => path,
            UploadOutcome::Invalid { path, .. } => path,
            UploadOutcome::Failed { path, .. } => path,
        }
    }

    /// Error text for a failed outcome
    pub fn error_message(&self) -> Option<String> {
        match self {
            UploadOutcome::Uploaded { .. } => None,
            UploadOutcome::Invalid { error, .. } => Some(error.to_string()),
            UploadOutcome::Failed { error, .. } => Some(error.to_string()),
        }
    }
}
