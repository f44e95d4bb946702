//! Inittrace CLI - command line front end for the init tracer
//!
//! Builds a `TracerConfig` from a JSON file and command line flags, and
//! reports run summaries to the console or as JSON.

pub mod args;
pub mod notifier;

// Re-export commonly used types for convenience
pub use args::{command, config_from_matches};
pub use notifier::{report, ConsoleNotifier, JsonNotifier, RunNotifier};
