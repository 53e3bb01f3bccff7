//! Configuration types for file-uploader
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Endpoint URL handling (pre-shared key query parameter)

use crate::error::ConfigError;
use clap::Parser;
use regex::Regex;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

/// Maximum number of concurrent upload workers
pub const MAX_CONCURRENT: usize = 16;

/// Default number of upload workers
pub const DEFAULT_JOBS: usize = 4;

/// Minimum queue size
pub const MIN_QUEUE_SIZE: usize = 1;

/// Default work queue capacity
pub const DEFAULT_QUEUE_SIZE: usize = 64;

/// Default maximum size of a single uploaded file (100 MiB)
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default upload endpoint
pub const DEFAULT_API_URL: &str = "http://localhost/upload.php";

/// Upload files and directory trees to an HTTP upload endpoint
#[derive(Parser, Debug, Clone)]
#[command(
    name = "file-uploader",
    version,
    about = "Upload files and directory trees to an HTTP upload endpoint",
    long_about = "Uploads a single file, or every file under a directory, to an HTTP upload endpoint.\n\n\
                  Directories are walked recursively and their layout is preserved under the\n\
                  optional server subdirectory. Uploads run in parallel on a fixed pool of workers.",
    after_help = "EXAMPLES:\n    \
        file-uploader file.txt\n    \
        file-uploader file.txt my_folder\n    \
        file-uploader file.txt \"docs/mydocs\"\n    \
        file-uploader -v -j 8 /path/to/directory\n    \
        file-uploader -u http://myserver.com/upload.php file.txt"
)]
pub struct CliArgs {
    /// File or directory to upload
    #[arg(value_name = "FILE_OR_DIR")]
    pub target: PathBuf,

    /// Optional subdirectory on the server
    #[arg(value_name = "SUBDIR")]
    pub subdir: Option<String>,

    /// Upload endpoint URL
    #[arg(short = 'u', long, env = "UPLOAD_URL", default_value = DEFAULT_API_URL, value_name = "URL")]
    pub url: String,

    /// Pre-shared upload key (sent as the `key` query parameter)
    #[arg(short = 'k', long, env = "UPLOAD_KEY", hide_env_values = true, value_name = "KEY")]
    pub key: Option<String>,

    /// Number of parallel upload workers
    #[arg(short = 'j', long, default_value_t = DEFAULT_JOBS, value_name = "N")]
    pub jobs: usize,

    /// Work queue size (bounds memory while walking large trees)
    #[arg(long, default_value_t = DEFAULT_QUEUE_SIZE, value_name = "NUM")]
    pub queue_size: usize,

    /// Per-file request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_name = "SECS")]
    pub timeout: u64,

    /// Maximum size of a single file in bytes
    #[arg(long = "max-size", default_value_t = MAX_FILE_SIZE, value_name = "BYTES")]
    pub max_size: u64,

    /// Maximum directory depth (unlimited if not set)
    #[arg(short = 'd', long, value_name = "NUM")]
    pub max_depth: Option<usize>,

    /// Exclude paths matching pattern (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Show what would be uploaded without uploading
    #[arg(long)]
    pub dry_run: bool,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// File or directory to upload
    pub target: PathBuf,

    /// Server subdirectory prefix (sanitized, may be empty)
    pub subdir: String,

    /// Endpoint URL as given by the user (for display)
    pub api_url: String,

    /// Endpoint URL including the key parameter
    pub endpoint: String,

    /// Number of worker threads
    pub worker_count: usize,

    /// Work queue capacity
    pub queue_size: usize,

    /// Per-request timeout
    pub timeout: Duration,

    /// Maximum file size in bytes
    pub max_file_size: u64,

    /// Maximum traversal depth
    pub max_depth: Option<usize>,

    /// Compiled exclude patterns
    pub exclude_patterns: Vec<Regex>,

    /// Only list planned uploads
    pub dry_run: bool,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl UploadConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        // Validate job count
        if args.jobs == 0 || args.jobs > MAX_CONCURRENT {
            return Err(ConfigError::InvalidJobCount {
                count: args.jobs,
                max: MAX_CONCURRENT,
            });
        }

        if args.queue_size < MIN_QUEUE_SIZE {
            return Err(ConfigError::InvalidQueueSize {
                size: args.queue_size,
                min: MIN_QUEUE_SIZE,
            });
        }

        if args.timeout == 0 {
            return Err(ConfigError::InvalidTimeout { secs: args.timeout });
        }

        if args.max_size == 0 {
            return Err(ConfigError::InvalidMaxSize {
                size: args.max_size,
            });
        }

        let endpoint = build_endpoint(&args.url, args.key.as_deref())?;

        // Compile exclude patterns
        let exclude_patterns = args
            .exclude_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidExcludePattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if args.target.as_os_str().is_empty() {
            return Err(ConfigError::InvalidTarget {
                path: args.target,
                reason: "path is empty".into(),
            });
        }

        Ok(Self {
            target: args.target,
            subdir: sanitize_subdir(args.subdir.as_deref().unwrap_or("")),
            api_url: args.url,
            endpoint,
            worker_count: args.jobs,
            queue_size: args.queue_size,
            timeout: Duration::from_secs(args.timeout),
            max_file_size: args.max_size,
            max_depth: args.max_depth,
            exclude_patterns,
            dry_run: args.dry_run,
            show_progress: !args.quiet,
            verbose: args.verbose,
        })
    }
}

/// Parse the endpoint URL and attach the pre-shared key
///
/// The endpoint must be an absolute http(s) URL with a host. The key is
/// appended as a percent-encoded `key` query parameter, after any query the
/// URL already carries.
pub fn build_endpoint(url: &str, key: Option<&str>) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let mut endpoint = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;

    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(invalid("expected an http:// or https:// URL".into()));
    }

    if endpoint.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".into()));
    }

    if let Some(key) = key.filter(|k| !k.is_empty()) {
        endpoint.query_pairs_mut().append_pair("key", key);
    }

    Ok(endpoint.into())
}

/// Normalize a server subdirectory
///
/// Backslashes become slashes; empty, `.` and `..` components are dropped so
/// the result can never climb out of the upload root.
pub fn sanitize_subdir(subdir: &str) -> String {
    subdir
        .split(['/', '\\'])
        .filter(|c| !c.is_empty() && *c != "." && *c != "..")
        .collect::<Vec<_>>()
        .join("/")
}
