/*!
# Per-File Pipeline

Text in, text out: parse one source, run the rule chain on the tree, render
it and make sure the result parses again. Disk access lives in
`FileTracer`; everything here works on strings.
*/

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;
use tracing::debug;

use crate::ast::{render, SourceFile};
use crate::parser::Parser;
use crate::{Result, TracerError};

use super::patterns::locate_initializers;
use super::rules::TransformationRule;
use super::TransformationContext;

/// Furthest point a file got to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileStage {
    Discovered,
    Read,
    Parsed,
    Transformed,
    Serialized,
    Written,
}

/// Final status of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileStatus {
    /// Rewritten on disk
    Success,
    /// Nothing to trace, left untouched
    Unchanged,
    /// Would have been rewritten
    DryRun,
    ReadFailed,
    ParseFailed,
    TransformFailed,
    SerializationFailed,
    WriteFailed,
}

impl FileStatus {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            FileStatus::ReadFailed
                | FileStatus::ParseFailed
                | FileStatus::TransformFailed
                | FileStatus::SerializationFailed
                | FileStatus::WriteFailed
        )
    }

    /// Status a file ends in when processing fails with `err`
    pub fn from_error(err: &TracerError) -> Self {
        match err {
            TracerError::Read { .. } | TracerError::Discovery { .. } => FileStatus::ReadFailed,
            TracerError::Parse { .. } => FileStatus::ParseFailed,
            TracerError::Transform(_) | TracerError::Config(_) => FileStatus::TransformFailed,
            TracerError::Serialization(_) => FileStatus::SerializationFailed,
            TracerError::Write { .. } => FileStatus::WriteFailed,
        }
    }

    /// Last stage completed by a file with this status
    pub fn stage(self) -> FileStage {
        match self {
            FileStatus::Success => FileStage::Written,
            FileStatus::Unchanged | FileStatus::DryRun | FileStatus::WriteFailed => FileStage::Serialized,
            FileStatus::ReadFailed => FileStage::Discovered,
            FileStatus::ParseFailed => FileStage::Read,
            FileStatus::TransformFailed => FileStage::Parsed,
            FileStatus::SerializationFailed => FileStage::Transformed,
        }
    }
}

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    pub stage: FileStage,
    /// Initializers found in the input
    pub initializers: usize,
    /// Clones appended to the output
    pub clones: usize,
    /// Error message for failures
    pub detail: Option<String>,
}

impl FileOutcome {
    pub fn new(path: &Path, status: FileStatus, transformed: &Transformed) -> Self {
        Self {
            path: path.to_path_buf(),
            status,
            stage: status.stage(),
            initializers: transformed.initializers,
            clones: transformed.clones,
            detail: None,
        }
    }

    pub fn failed(path: &Path, err: &TracerError) -> Self {
        let status = FileStatus::from_error(err);
        Self {
            path: path.to_path_buf(),
            status,
            stage: status.stage(),
            initializers: 0,
            clones: 0,
            detail: Some(err.to_string()),
        }
    }
}

/// One rule application
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleRun {
    pub rule: &'static str,
    pub changes: usize,
    pub elapsed_ms: u64,
}

/// Result of running the pipeline over one source text
#[derive(Debug, Clone)]
pub struct Transformed {
    /// Tree after every rule ran
    pub file: SourceFile,
    /// Rendered source of `file`
    pub output: String,
    pub initializers: usize,
    pub clones: usize,
    /// True when at least one rule changed the tree
    pub changed: bool,
    pub runs: Vec<RuleRun>,
}

/// Run `rules` over `file` in the order given
///
/// Each matching rule transforms the tree and then validates the result
/// against a snapshot taken before it ran. The first failure stops the chain.
pub fn apply_rules(
    file: &mut SourceFile,
    context: &TransformationContext,
    rules: &[Box<dyn TransformationRule>],
) -> Result<Vec<RuleRun>> {
    let mut runs = Vec::with_capacity(rules.len());
    for rule in rules {
        if !rule.matches(file, context) {
            continue;
        }

        let before = file.clone();
        let start = Instant::now();
        let changes = rule
            .transform(file, context)
            .with_context(|| format!("{} failed on {}", rule.name(), context.file_name()))?;
        rule.validate(&before, file, context)
            .with_context(|| format!("{} produced an invalid tree", rule.name()))?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        debug!(rule = rule.name(), changes, elapsed_ms, "applied rule");
        runs.push(RuleRun {
            rule: rule.name(),
            changes,
            elapsed_ms,
        });
    }
    Ok(runs)
}

/// Parse `source`, apply `rules`, render the tree
///
/// With `verify` the rendered text is parsed again; output that does not
/// parse is reported as a serialization error instead of being returned.
pub fn transform_source(
    parser: &mut dyn Parser,
    source: &str,
    context: &TransformationContext,
    rules: &[Box<dyn TransformationRule>],
    verify: bool,
) -> Result<Transformed> {
    let mut file = parser.parse(source)?;
    let initializers = locate_initializers(&file).len();
    let funcs_before = file.funcs().count();

    let runs = apply_rules(&mut file, context, rules)?;
    let output = render(&file)?;

    if verify {
        parser.parse(&output).map_err(|e| {
            TracerError::Serialization(format!("rendered source does not parse again: {e}"))
        })?;
    }

    let clones = file.funcs().count().saturating_sub(funcs_before);
    let changed = runs.iter().any(|run| run.changes > 0);
    Ok(Transformed {
        file,
        output,
        initializers,
        clones,
        changed,
        runs,
    })
}
