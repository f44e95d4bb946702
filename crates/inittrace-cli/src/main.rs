use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use inittrace_cli::{command, config_from_matches, report, ConsoleNotifier, JsonNotifier, RunNotifier};
use inittrace_core::{init_tracing, FileTracer};
use tracing::debug;

fn main() -> Result<ExitCode> {
    let matches = command().get_matches();

    // Initialize logging
    init_tracing(matches.get_flag("debug"));

    let config = config_from_matches(&matches)?;
    let notifier: Box<dyn RunNotifier> = if matches.get_flag("json") {
        Box::new(JsonNotifier)
    } else {
        Box::new(ConsoleNotifier::new(config.dry_run))
    };

    let root = matches
        .get_one::<String>("root")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    debug!(?config, root = %root.display(), "starting run");

    let tracer = FileTracer::new(config)?;
    match tracer.transform_directory(&root) {
        Ok(summary) => {
            report(notifier.as_ref(), &summary);
            for (name, stats) in tracer.stats() {
                debug!(
                    rule = %name,
                    applications = stats.applications,
                    changes = stats.changes,
                    average_ms = stats.average_time_ms(),
                    "rule stats"
                );
            }
            Ok(if summary.success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Err(e) => {
            notifier.on_error(&e.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}
