/*!
# Init Tracer - Go Source Transformation System

Rule-based transformation of parsed Go files, applied file by file over a
directory tree.

## Architecture

- `TransformationRule`: trait for rules that mutate a `SourceFile`
- `PatternMatcher` / `locate`: find the declarations a rule works on
- `InjectDiagnostic`: prepends `fmt.Println(pkg, file)` to every `func init()`
- `CloneInitializers`: appends a renamed copy of every `func init()`
- `IdentSupplier`: fresh names for the copies
- `transform_source`: text in, text out, for one file
- `FileTracer`: walks a directory, runs the pipeline per file, writes atomically

## Example Usage

```rust,no_run
use inittrace_core::{FileTracer, TracerConfig};

let tracer = FileTracer::new(TracerConfig::default())?;
let summary = tracer.transform_directory("./service")?;
println!("{} files traced", summary.files_transformed);
# Ok::<(), inittrace_core::TracerError>(())
```
*/

pub mod file_tracer;
pub mod idents;
pub mod init_rules;
pub mod patterns;
pub mod pipeline;
pub mod rules;

use std::path::{Path, PathBuf};

// Re-export main types
pub use file_tracer::{FileTracer, FileTransformationSummary};
pub use idents::{IdentSupplier, RandomIdents, SequentialIdents};
pub use init_rules::{standard_rules, CloneInitializers, InjectDiagnostic};
pub use patterns::{locate, locate_initializers, AstPattern, PatternMatcher};
pub use rules::{RuleStats, TransformationRule};

// Common result type for transformations
pub type TransformResult<T> = anyhow::Result<T>;

/// Per-file information handed to every rule
#[derive(Debug, Clone, Default)]
pub struct TransformationContext {
    /// Base name of the file being transformed, e.g. `server.go`
    pub source_file: Option<String>,
    /// Full path, when the source came from disk
    pub source_path: Option<PathBuf>,
}

impl TransformationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a file on disk
    pub fn for_path(path: &Path) -> Self {
        let base = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Self {
            source_file: base,
            source_path: Some(path.to_path_buf()),
        }
    }

    pub fn with_source_file(mut self, file: impl Into<String>) -> Self {
        self.source_file = Some(file.into());
        self
    }

    /// Base name used in diagnostics; empty for in-memory sources
    pub fn file_name(&self) -> &str {
        self.source_file.as_deref().unwrap_or("")
    }
}
