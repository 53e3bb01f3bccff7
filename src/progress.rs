//! Progress reporting for uploads
//!
//! Prints one line per completed file with the running `done/total` count
//! and elapsed time. When stderr is a terminal an indicatif bar is kept at
//! the bottom of the screen and per-file lines are printed above it.

use crate::config::UploadConfig;
use crate::error::UploadOutcome;
use crate::upload::{StatsSnapshot, UploadJob, UploadResult};
use crate::walker::{Discovered, Target};
use console::{style, Term};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

enum Mode {
    /// Terminal progress bar
    Bar(ProgressBar),

    /// Plain lines on stdout
    Lines,

    /// No output
    Silent,
}

/// Progress reporter shared by all workers
pub struct ProgressReporter {
    mode: Mode,
    verbose: bool,
}

impl ProgressReporter {
    /// Create a reporter for the given configuration
    pub fn new(config: &UploadConfig) -> Self {
        let mode = if !config.show_progress {
            Mode::Silent
        } else if Term::stderr().is_term() {
            Mode::Bar(new_bar())
        } else {
            Mode::Lines
        };

        Self {
            mode,
            verbose: config.verbose,
        }
    }

    /// Reporter that prints nothing
    pub fn silent() -> Self {
        Self {
            mode: Mode::Silent,
            verbose: false,
        }
    }

    /// Report a finished file
    pub fn file_completed(&self, job: &UploadJob, outcome: &UploadOutcome, snap: &StatsSnapshot) {
        if let Mode::Bar(bar) = &self.mode {
            bar.set_length(snap.total);
            bar.set_position(snap.completed());
            match snap.percent() {
                Some(percent) => bar.set_message(format!("{:.0}% {}", percent, job.display_name())),
                None => bar.set_message(job.display_name()),
            }
        }

        let line = self.completion_line(job, outcome, snap);

        match &self.mode {
            Mode::Bar(bar) => bar.println(line),
            Mode::Lines => println!("{}", line),
            Mode::Silent => {}
        }
    }

    /// `✓ name (done/total, Xs)` or `✗ name (done/total, Xs): error`
    fn completion_line(&self, job: &UploadJob, outcome: &UploadOutcome, snap: &StatsSnapshot) -> String {
        match outcome {
            UploadOutcome::Uploaded { message, .. } => {
                let mut line = format!(
                    "{} {} {}",
                    style("✓").green(),
                    job.display_name(),
                    progress_suffix(snap)
                );
                if self.verbose {
                    if let Some(message) = message {
                        line.push_str(&format!(" - {}", message));
                    }
                }
                line
            }
            UploadOutcome::Invalid { .. } | UploadOutcome::Failed { .. } => format!(
                "{} {} {}: {}",
                style("✗").red(),
                job.display_name(),
                progress_suffix(snap),
                outcome.error_message().unwrap_or_default()
            ),
        }
    }

    /// Finish and clear the progress display
    pub fn finish(&self) {
        if let Mode::Bar(bar) = &self.mode {
            bar.finish_and_clear();
        }
    }
}

fn new_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);

    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}")
            .expect("Invalid progress template")
            .progress_chars("=> ")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );

    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// `(done/total, 1.2s)`, with `total+` while the walk is still running
fn progress_suffix(snap: &StatsSnapshot) -> String {
    let total = if snap.total_final {
        snap.total.to_string()
    } else {
        format!("{}+", snap.total)
    };

    format!(
        "({}/{}, {:.1}s)",
        snap.completed(),
        total,
        snap.elapsed.as_secs_f64()
    )
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the upload
pub fn print_header(config: &UploadConfig, target: &Target) {
    let kind = if target.is_dir() { "directory" } else { "file" };

    println!();
    println!(
        "{} {}",
        style("file-uploader").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {} ({})",
        style("Source:").bold(),
        target.path().display(),
        kind
    );
    println!("  {} {}", style("Endpoint:").bold(), config.api_url);
    if !config.subdir.is_empty() {
        println!("  {} {}", style("Subdir:").bold(), config.subdir);
    }
    println!("  {} {}", style("Workers:").bold(), config.worker_count);
    println!("  {} {}", style("Queue:").bold(), config.queue_size);
    println!();
}

/// Print the jobs a dry run would upload
pub fn print_plan<I>(items: I) -> (u64, u64)
where
    I: IntoIterator<Item = Discovered>,
{
    let mut jobs = 0;
    let mut unreadable = 0;

    for item in items {
        match item {
            Discovered::Job(job) => {
                jobs += 1;
                let subdir = if job.target_subdir.is_empty() {
                    "/"
                } else {
                    job.target_subdir.as_str()
                };
                println!("  {} -> {}", job.source_path.display(), subdir);
            }
            Discovered::Unreadable { path, reason } => {
                unreadable += 1;
                println!(
                    "  {} {}: {}",
                    style("unreadable").yellow(),
                    path.display(),
                    reason
                );
            }
        }
    }

    println!();
    println!(
        "{} {} file(s) would be uploaded",
        style("Dry run:").bold(),
        format_number(jobs)
    );
    if unreadable > 0 {
        println!(
            "  {} {}",
            style("Unreadable:").yellow().bold(),
            format_number(unreadable)
        );
    }

    (jobs, unreadable)
}

/// Print a summary of the upload results
pub fn print_summary(result: &UploadResult) {
    let snap = result.snapshot();

    let title = if result.completed {
        style("Upload Complete").green().bold()
    } else {
        style("Upload Interrupted").yellow().bold()
    };

    println!();
    println!("{}", title);
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Started:").bold(),
        result.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  {} {}",
        style("Uploaded:").bold(),
        format_number(result.uploaded)
    );
    if result.failed > 0 {
        println!(
            "  {} {}",
            style("Failed:").red().bold(),
            format_number(result.failed)
        );
    } else {
        println!("  {} 0", style("Failed:").bold());
    }
    if result.skipped > 0 {
        println!(
            "  {} {}",
            style("Skipped:").yellow().bold(),
            format_number(result.skipped)
        );
    }
    println!(
        "  {} {}",
        style("Total Size:").bold(),
        format_size(result.bytes_uploaded, BINARY)
    );
    println!(
        "  {} {:.1}s ({:.1} files/sec, {}/s)",
        style("Duration:").bold(),
        snap.elapsed.as_secs_f64(),
        snap.files_per_second(),
        format_size(snap.bytes_per_second() as u64, BINARY)
    );

    let verdict = if result.is_success() {
        style("SUCCESS").green().bold()
    } else {
        style("PARTIAL/FAILURE").red().bold()
    };
    println!("  {} {}", style("Result:").bold(), verdict);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TransportError, ValidationError};

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }

    #[test]
    fn test_progress_suffix() {
        let mut snap = StatsSnapshot {
            uploaded: 3,
            failed: 1,
            skipped: 0,
            total: 10,
            total_final: false,
            bytes_uploaded: 0,
            elapsed: Duration::from_millis(2500),
        };
        assert_eq!(progress_suffix(&snap), "(4/10+, 2.5s)");

        snap.total_final = true;
        assert_eq!(progress_suffix(&snap), "(4/10, 2.5s)");
    }

    #[test]
    fn test_completion_lines_carry_progress() {
        let reporter = ProgressReporter {
            mode: Mode::Silent,
            verbose: true,
        };
        let job = UploadJob::new("/data/docs/a.txt", "docs");
        let snap = StatsSnapshot {
            uploaded: 1,
            failed: 1,
            skipped: 0,
            total: 5,
            total_final: true,
            bytes_uploaded: 10,
            elapsed: Duration::from_millis(1500),
        };

        let ok = UploadOutcome::Uploaded {
            path: "/data/docs/a.txt".into(),
            bytes: 10,
            message: Some("File uploaded".into()),
        };
        let line = reporter.completion_line(&job, &ok, &snap);
        assert!(line.contains("a.txt (2/5, 1.5s) - File uploaded"), "{}", line);

        let failed = UploadOutcome::Failed {
            path: "/data/docs/a.txt".into(),
            error: TransportError::Status {
                path: "/data/docs/a.txt".into(),
                status: 500,
                message: None,
            },
        };
        let line = reporter.completion_line(&job, &failed, &snap);
        assert!(line.contains("a.txt (2/5, 1.5s): Server error"), "{}", line);

        let invalid = UploadOutcome::Invalid {
            path: "/data/docs/a.txt".into(),
            error: ValidationError::NotAFile {
                path: "/data/docs/a.txt".into(),
            },
        };
        let line = reporter.completion_line(&job, &invalid, &snap);
        assert!(line.contains("a.txt (2/5, 1.5s): Not a regular file"), "{}", line);
    }

    #[test]
    fn test_print_plan_counts() {
        let items = vec![
            Discovered::Job(UploadJob::new("/data/a.txt", "")),
            Discovered::Job(UploadJob::new("/data/b/c.txt", "b")),
            Discovered::Unreadable {
                path: "/data/locked".into(),
                reason: "Permission denied".into(),
            },
        ];
        assert_eq!(print_plan(items), (2, 1));
    }
}
