//! # Inittrace Core
//!
//! Core implementation of the init tracer, a codemod for Go source trees:
//! - Syntax tree model for Go files (declarations, function bodies, imports)
//! - Go parser front end built on tree-sitter
//! - Source generation back to compilable Go text
//! - Transformation rules that trace `func init()` declarations
//! - File pipeline that walks a directory and rewrites files atomically
//!
//! The transformation is fixed: every package initializer gets a
//! `fmt.Println("<package>", "<file>")` call as its first statement, and a
//! renamed copy of it is appended to the end of the file.

#![warn(clippy::all)]

pub mod ast;
pub mod parser;
pub mod tracer;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use ast::{render, Block, CallStmt, Decl, FuncDecl, ImportDecl, ImportSpec, NamedDecl, SourceFile, Spaced, Spacing, Stmt, ToSource};
pub use parser::{create_parser, GoParser, Parser};
pub use tracer::{
    idents::{IdentSupplier, RandomIdents, SequentialIdents},
    file_tracer::{FileTracer, FileTransformationSummary},
    pipeline::{transform_source, FileOutcome, FileStage, FileStatus, Transformed},
    TransformationContext,
};

/// Inittrace version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for inittrace components
///
/// `RUST_LOG` wins when set; otherwise core components log at `info`, or at
/// `debug` when `debug` is true. Logs go to stderr so stdout stays free for
/// reports. Calling this twice is harmless.
pub fn init_tracing(debug: bool) {
    let default_directive = if debug {
        "inittrace_core=debug,inittrace=debug"
    } else {
        "inittrace_core=info,inittrace=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Init tracer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// File extensions to process (without the leading dot)
    pub extensions: Vec<String>,
    /// Directory names that are never descended into
    pub skip_dirs: Vec<String>,
    /// Worker threads; 1 is sequential, 0 means one per CPU
    pub jobs: usize,
    /// Seed for the identifier supplier; entropy when absent
    pub seed: Option<u64>,
    /// Prefix for the names of cloned initializers
    pub clone_prefix: String,
    /// Length of the random part of clone names
    pub ident_len: usize,
    /// Import path of the package providing the diagnostic function
    pub log_package: String,
    /// Diagnostic function called by the injected statement
    pub log_function: String,
    /// Re-render files that contain no initializer
    pub rewrite_unchanged: bool,
    /// Reparse rendered output before writing it
    pub verify_output: bool,
    /// Keep a `.backup` copy of every rewritten file
    pub backup_originals: bool,
    /// Compute everything but write nothing
    pub dry_run: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["go".to_string()],
            skip_dirs: vec![".git".to_string()],
            jobs: 1,
            seed: None,
            clone_prefix: "init".to_string(),
            ident_len: 10,
            log_package: "fmt".to_string(),
            log_function: "Println".to_string(),
            rewrite_unchanged: false,
            verify_output: true,
            backup_originals: false,
            dry_run: false,
        }
    }
}

impl TracerConfig {
    /// Load a configuration from a JSON file; missing keys take defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TracerError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: TracerConfig = serde_json::from_str(&content)
            .map_err(|e| TracerError::Config(format!("invalid config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run can work with
    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(TracerError::Config("at least one extension is required".to_string()));
        }
        if self.ident_len == 0 {
            return Err(TracerError::Config("ident_len must be positive".to_string()));
        }
        if !ast::is_identifier(&self.clone_prefix) {
            return Err(TracerError::Config(format!(
                "clone_prefix {:?} is not a Go identifier",
                self.clone_prefix
            )));
        }
        if !ast::is_identifier(&self.log_function) {
            return Err(TracerError::Config(format!(
                "log_function {:?} is not a Go identifier",
                self.log_function
            )));
        }
        if self.log_package.is_empty() {
            return Err(TracerError::Config("log_package must not be empty".to_string()));
        }
        Ok(())
    }

    /// Number of worker threads this configuration asks for
    pub fn worker_count(&self) -> usize {
        match self.jobs {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }
}

/// Error types for inittrace operations
#[derive(thiserror::Error, Debug)]
pub enum TracerError {
    /// Malformed Go source
    #[error("Parse error at {line}:{column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// A tree that cannot be rendered into valid source
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A rule failed while transforming a tree
    #[error("Transformation error: {0}")]
    Transform(#[from] anyhow::Error),

    /// Reading a source file failed
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisting a rendered file failed
    #[error("Failed to write {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The root directory could not be walked
    #[error("Cannot scan {}: {}", .path.display(), .message)]
    Discovery { path: PathBuf, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for inittrace operations
pub type Result<T> = std::result::Result<T, TracerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TracerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.extensions, vec!["go".to_string()]);
        assert_eq!(config.clone_prefix, "init");
        assert_eq!(config.ident_len, 10);
        assert_eq!(config.worker_count(), 1);
    }

    #[test]
    fn test_partial_json_config_uses_defaults() {
        let config: TracerConfig = serde_json::from_str(r#"{"jobs": 4, "dry_run": true}"#).unwrap();
        assert_eq!(config.jobs, 4);
        assert!(config.dry_run);
        assert_eq!(config.log_package, "fmt");
        assert!(config.verify_output);
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        let config = TracerConfig {
            clone_prefix: "9init".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TracerError::Config(_))));
    }

    #[test]
    fn test_jobs_zero_means_all_cpus() {
        let config = TracerConfig {
            jobs: 0,
            ..Default::default()
        };
        assert!(config.worker_count() >= 1);
    }
}
