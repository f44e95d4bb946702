/*!
# FileTracer - Directory Transformation

Walks a source tree, runs the pipeline on every matching file and writes
the results back in place. Every file ends with a `FileOutcome`; only a
root that cannot be walked stops a run.
*/

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::parser::{GoParser, Parser};
use crate::{Result, TracerConfig, TracerError};

use super::idents::{IdentSupplier, RandomIdents};
use super::init_rules::standard_rules;
use super::pipeline::{transform_source, FileOutcome, FileStatus};
use super::rules::{RuleStats, TransformationRule};
use super::TransformationContext;

/// File-based transformation system
///
/// Owns the configuration, the rule chain (highest priority first) and the
/// statistics of every rule. Safe to share between worker threads.
pub struct FileTracer {
    config: TracerConfig,
    rules: Vec<Box<dyn TransformationRule>>,
    stats: Mutex<HashMap<String, RuleStats>>,
}

impl FileTracer {
    /// Tracer with the standard rules and a random identifier supplier
    pub fn new(config: TracerConfig) -> Result<Self> {
        config.validate()?;
        let supplier = Arc::new(RandomIdents::from_seed(config.seed, config.ident_len));
        Ok(Self::with_supplier(config, supplier))
    }

    /// Tracer with the standard rules drawing clone names from `supplier`
    pub fn with_supplier(config: TracerConfig, supplier: Arc<dyn IdentSupplier>) -> Self {
        let rules = standard_rules(&config, supplier);
        Self::with_rules(config, rules)
    }

    /// Tracer running exactly `rules`
    pub fn with_rules(config: TracerConfig, rules: Vec<Box<dyn TransformationRule>>) -> Self {
        let mut tracer = Self {
            config,
            rules: Vec::new(),
            stats: Mutex::new(HashMap::new()),
        };
        for rule in rules {
            tracer.add_rule(rule);
        }
        tracer
    }

    /// Add a transformation rule, keeping the chain in priority order
    pub fn add_rule(&mut self, rule: Box<dyn TransformationRule>) {
        let rule_name = rule.name().to_string();
        self.stats.get_mut().insert(rule_name.clone(), RuleStats::new(rule_name));
        self.rules.push(rule);
        self.rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority()));
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Names of the rules in the order they run
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Files under `root` this tracer would process, in path order
    ///
    /// Unreadable entries below the root are skipped with a warning; an
    /// unreadable root is an error.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !entry.file_type().is_dir() || !self.is_skipped_dir(entry.file_name())
            });

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(TracerError::Discovery {
                        path: root.to_path_buf(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_file() && self.should_process_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Transform every matching file under `root`
    pub fn transform_directory<P: AsRef<Path>>(&self, root: P) -> Result<FileTransformationSummary> {
        let root = root.as_ref();
        let files = self.discover(root)?;
        let workers = self.config.worker_count();
        info!(
            root = %root.display(),
            files = files.len(),
            workers,
            dry_run = self.config.dry_run,
            "tracing initializers"
        );

        let outcomes: Vec<FileOutcome> = if workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| TracerError::Config(format!("cannot start worker pool: {e}")))?;
            pool.install(|| {
                files
                    .par_iter()
                    .map_init(GoParser::new, |parser, path| match parser {
                        Ok(parser) => self.outcome(parser, path),
                        Err(e) => FileOutcome::failed(path, e),
                    })
                    .collect()
            })
        } else {
            let mut parser = GoParser::new()?;
            files.iter().map(|path| self.outcome(&mut parser, path)).collect()
        };

        let mut summary = FileTransformationSummary::new();
        for outcome in outcomes {
            summary.record(outcome);
        }
        info!(
            processed = summary.files_processed,
            transformed = summary.files_transformed,
            unchanged = summary.files_unchanged,
            failed = summary.files_failed,
            "run finished"
        );
        Ok(summary)
    }

    /// Transform a single file
    pub fn transform_file<P: AsRef<Path>>(&self, path: P) -> FileOutcome {
        let path = path.as_ref();
        match GoParser::new() {
            Ok(mut parser) => self.outcome(&mut parser, path),
            Err(e) => FileOutcome::failed(path, &e),
        }
    }

    /// Snapshot of per-rule statistics
    pub fn stats(&self) -> HashMap<String, RuleStats> {
        self.stats.lock().clone()
    }

    fn outcome(&self, parser: &mut dyn Parser, path: &Path) -> FileOutcome {
        match self.process(parser, path) {
            Ok(outcome) => {
                debug!(path = %path.display(), status = ?outcome.status, clones = outcome.clones, "file done");
                outcome
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "file failed");
                FileOutcome::failed(path, &e)
            }
        }
    }

    fn process(&self, parser: &mut dyn Parser, path: &Path) -> Result<FileOutcome> {
        let source = fs::read_to_string(path).map_err(|source| TracerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let context = TransformationContext::for_path(path);
        let transformed = transform_source(parser, &source, &context, &self.rules, self.config.verify_output)?;

        {
            let mut stats = self.stats.lock();
            for run in &transformed.runs {
                stats
                    .entry(run.rule.to_string())
                    .or_insert_with(|| RuleStats::new(run.rule.to_string()))
                    .record(run.changes, run.elapsed_ms);
            }
        }

        if !transformed.changed && !self.config.rewrite_unchanged {
            return Ok(FileOutcome::new(path, FileStatus::Unchanged, &transformed));
        }
        if self.config.dry_run {
            return Ok(FileOutcome::new(path, FileStatus::DryRun, &transformed));
        }

        if self.config.backup_originals {
            backup(path)?;
        }
        write_atomically(path, &transformed.output)?;
        Ok(FileOutcome::new(path, FileStatus::Success, &transformed))
    }

    fn is_skipped_dir(&self, name: &OsStr) -> bool {
        let name = name.to_string_lossy();
        self.config.skip_dirs.iter().any(|skip| *skip == name)
    }

    /// Check if a file should be processed based on its extension
    fn should_process_file(&self, path: &Path) -> bool {
        if let Some(extension) = path.extension() {
            let ext_str = extension.to_string_lossy().to_lowercase();
            self.config
                .extensions
                .iter()
                .any(|ext| ext.trim_start_matches('.').to_lowercase() == ext_str)
        } else {
            false
        }
    }
}

/// Copy `path` to `<path>.backup`, e.g. `main.go.backup`
fn backup(path: &Path) -> Result<PathBuf> {
    let backup_path = path.with_extension(format!(
        "{}.backup",
        path.extension().unwrap_or_default().to_string_lossy()
    ));
    fs::copy(path, &backup_path).map_err(|source| TracerError::Write {
        path: backup_path.clone(),
        source,
    })?;
    Ok(backup_path)
}

/// Replace `path` with `contents` so that readers see either the old or the
/// new file, never a partial one
fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let write_err = |source: std::io::Error| TracerError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions()).map_err(write_err)?;
    }
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Summary of file transformation results
#[derive(Debug, Default, Clone, Serialize)]
pub struct FileTransformationSummary {
    pub files_processed: u64,
    /// Rewritten, or would have been in a dry run
    pub files_transformed: u64,
    pub files_unchanged: u64,
    pub files_failed: u64,
    pub initializers_traced: u64,
    pub outcomes: Vec<FileOutcome>,
}

impl FileTransformationSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: FileOutcome) {
        self.files_processed += 1;
        match outcome.status {
            FileStatus::Success | FileStatus::DryRun => {
                self.files_transformed += 1;
                self.initializers_traced += outcome.initializers as u64;
            }
            FileStatus::Unchanged => self.files_unchanged += 1,
            _ => self.files_failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Files that did not fail, over files processed
    pub fn success_rate(&self) -> f64 {
        if self.files_processed == 0 {
            0.0
        } else {
            ((self.files_processed - self.files_failed) as f64) / (self.files_processed as f64)
        }
    }

    pub fn success(&self) -> bool {
        self.files_failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.status.is_failure())
    }
}
