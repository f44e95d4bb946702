//! Run reporting
//!
//! A trait-based notifier so the same run can be reported as human-readable
//! lines or as one JSON document.

use inittrace_core::{FileOutcome, FileStatus, FileTransformationSummary};

/// Trait for handling run output
pub trait RunNotifier: Send + Sync {
    /// Called once per failed file, before the summary
    fn on_failure(&self, outcome: &FileOutcome);

    /// Called once at the end of a run
    fn on_summary(&self, summary: &FileTransformationSummary);

    /// Errors that stopped the run
    fn on_error(&self, content: &str);
}

/// Send a finished run to `notifier`
pub fn report(notifier: &dyn RunNotifier, summary: &FileTransformationSummary) {
    for outcome in summary.failures() {
        notifier.on_failure(outcome);
    }
    notifier.on_summary(summary);
}

/// One line describing a failed file
pub fn format_failure(outcome: &FileOutcome) -> String {
    let reason = match outcome.status {
        FileStatus::ReadFailed => "read failed",
        FileStatus::ParseFailed => "parse failed",
        FileStatus::TransformFailed => "transform failed",
        FileStatus::SerializationFailed => "serialization failed",
        FileStatus::WriteFailed => "write failed",
        _ => "failed",
    };
    match &outcome.detail {
        Some(detail) => format!("{}: {reason}: {detail}", outcome.path.display()),
        None => format!("{}: {reason}", outcome.path.display()),
    }
}

pub fn format_summary(summary: &FileTransformationSummary, dry_run: bool) -> String {
    let verb = if dry_run { "would trace" } else { "traced" };
    format!(
        "{} files processed: {} {verb} ({} initializers), {} unchanged, {} failed",
        summary.files_processed,
        summary.files_transformed,
        summary.initializers_traced,
        summary.files_unchanged,
        summary.files_failed
    )
}

/// Console notifier: failures on stderr, summary on stdout
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    dry_run: bool,
}

impl ConsoleNotifier {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl RunNotifier for ConsoleNotifier {
    fn on_failure(&self, outcome: &FileOutcome) {
        eprintln!("{}", format_failure(outcome));
    }

    fn on_summary(&self, summary: &FileTransformationSummary) {
        println!("{}", format_summary(summary, self.dry_run));
    }

    fn on_error(&self, content: &str) {
        eprintln!("error: {content}");
    }
}

/// Prints the whole summary, outcomes included, as pretty JSON
#[derive(Debug, Default)]
pub struct JsonNotifier;

impl RunNotifier for JsonNotifier {
    fn on_failure(&self, _outcome: &FileOutcome) {
        // part of the summary document
    }

    fn on_summary(&self, summary: &FileTransformationSummary) {
        match serde_json::to_string_pretty(summary) {
            Ok(json) => println!("{json}"),
            Err(e) => self.on_error(&format!("cannot encode summary: {e}")),
        }
    }

    fn on_error(&self, content: &str) {
        println!("{}", serde_json::json!({ "error": content }));
    }
}
