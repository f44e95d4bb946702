/*!
# FileTracer Integration Tests

Runs the tracer over temporary Go source trees and checks what ends up on
disk.
*/

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use inittrace_core::tracer::{standard_rules, TransformResult, TransformationRule};
use inittrace_core::{
    Block, Decl, FileStage, FileStatus, FileTracer, FuncDecl, GoParser, IdentSupplier, Parser,
    SequentialIdents, SourceFile, Stmt, TracerConfig, TransformationContext,
};
use pretty_assertions::assert_eq;

const SERVER_GO: &str = "package server\n\nimport \"net/http\"\n\nvar mux = http.NewServeMux()\n\nfunc init() {\n\tmux.HandleFunc(\"/\", nil)\n}\n";

const UTIL_GO: &str = "package server\n\nfunc clamp(x, lo, hi int) int {\n\tif x < lo {\n\t\treturn lo\n\t}\n\tif x > hi {\n\t\treturn hi\n\t}\n\treturn x\n}\n";

const BROKEN_GO: &str = "package server\n\nfunc init() {\n\tif {\n";

fn write(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

fn tracer(config: TracerConfig) -> FileTracer {
    FileTracer::with_supplier(config, Arc::new(SequentialIdents::default()))
}

#[test]
fn test_directory_run_traces_initializers() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let server = write(dir.path(), "server.go", SERVER_GO);
    let util = write(dir.path(), "internal/util.go", UTIL_GO);

    let summary = tracer(TracerConfig::default()).transform_directory(dir.path())?;

    assert_eq!(summary.files_processed, 2);
    assert_eq!(summary.files_transformed, 1);
    assert_eq!(summary.files_unchanged, 1);
    assert_eq!(summary.files_failed, 0);
    assert_eq!(summary.initializers_traced, 1);
    assert!(summary.success());

    let expected = "package server\n\nimport \"net/http\"\n\nimport \"fmt\"\n\nvar mux = http.NewServeMux()\n\nfunc init() {\n\tfmt.Println(\"server\", \"server.go\")\n\tmux.HandleFunc(\"/\", nil)\n}\n\nfunc initaaaaaaaaaa() {\n\tfmt.Println(\"server\", \"server.go\")\n\tmux.HandleFunc(\"/\", nil)\n}\n";
    assert_eq!(fs::read_to_string(&server)?, expected);
    assert_eq!(fs::read_to_string(&util)?, UTIL_GO);
    Ok(())
}

#[test]
fn test_rewritten_files_parse() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(
        dir.path(),
        "main.go",
        "package main\n\nimport (\n\t\"fmt\"\n\t\"os\"\n)\n\nfunc init() {\n\tif len(os.Args) > 1 {\n\t\tfmt.Println(os.Args[1])\n\t}\n}\n\nfunc main() {}\n\nfunc init() {}\n",
    );

    tracer(TracerConfig::default()).transform_directory(dir.path())?;

    let file = GoParser::new()?.parse(&fs::read_to_string(&path)?)?;
    let names = file.function_names();
    assert_eq!(names.len(), 5);
    assert_eq!(&names[..3], &["init", "main", "init"]);
    assert!(names[3].starts_with("init") && names[4].starts_with("init"));

    for func in file.funcs() {
        if func.name == "main" {
            continue;
        }
        // reparsed statements are verbatim text
        assert_eq!(
            func.body.as_ref().and_then(|b| b.first_stmt()),
            Some(&Stmt::Opaque(r#"fmt.Println("main", "main.go")"#.to_string())),
            "{} does not start with the diagnostic call",
            func.name
        );
    }
    Ok(())
}

#[test]
fn test_failed_file_does_not_stop_the_run() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write(dir.path(), "a.go", SERVER_GO);
    let broken = write(dir.path(), "b.go", BROKEN_GO);
    let c = write(dir.path(), "c.go", SERVER_GO);

    let summary = tracer(TracerConfig::default()).transform_directory(dir.path())?;

    assert_eq!(summary.files_processed, 3);
    assert_eq!(summary.files_transformed, 2);
    assert_eq!(summary.files_failed, 1);
    assert!(!summary.success());

    let failures: Vec<_> = summary.failures().collect();
    assert_eq!(failures[0].path, broken);
    assert_eq!(failures[0].status, FileStatus::ParseFailed);
    assert!(failures[0].detail.as_deref().unwrap_or("").contains("Parse error"));

    // the broken file is untouched, its neighbours are rewritten
    assert_eq!(fs::read_to_string(&broken)?, BROKEN_GO);
    assert_ne!(fs::read_to_string(&a)?, SERVER_GO);
    assert_ne!(fs::read_to_string(&c)?, SERVER_GO);
    Ok(())
}

#[test]
fn test_dry_run_writes_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "server.go", SERVER_GO);

    let config = TracerConfig {
        dry_run: true,
        ..Default::default()
    };
    let summary = tracer(config).transform_directory(dir.path())?;

    assert_eq!(summary.outcomes[0].status, FileStatus::DryRun);
    assert_eq!(summary.outcomes[0].clones, 1);
    assert_eq!(fs::read_to_string(&path)?, SERVER_GO);
    Ok(())
}

#[test]
fn test_unchanged_files_can_be_rewritten() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    // one-line body: a rewrite splits the statements
    let source = "package server\n\nfunc clamp() { a := 1; _ = a }\n";
    let path = write(dir.path(), "util.go", source);

    let summary = tracer(TracerConfig::default()).transform_directory(dir.path())?;
    assert_eq!(summary.outcomes[0].status, FileStatus::Unchanged);
    assert_eq!(fs::read_to_string(&path)?, source);

    let config = TracerConfig {
        rewrite_unchanged: true,
        ..Default::default()
    };
    let summary = tracer(config).transform_directory(dir.path())?;
    assert_eq!(summary.outcomes[0].status, FileStatus::Success);
    assert_eq!(summary.outcomes[0].clones, 0);
    assert_eq!(
        fs::read_to_string(&path)?,
        "package server\n\nfunc clamp() {\n\ta := 1\n\t_ = a\n}\n"
    );
    Ok(())
}

#[test]
fn test_backup_keeps_original() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "server.go", SERVER_GO);

    let config = TracerConfig {
        backup_originals: true,
        ..Default::default()
    };
    tracer(config).transform_directory(dir.path())?;

    assert_eq!(fs::read_to_string(dir.path().join("server.go.backup"))?, SERVER_GO);
    assert_ne!(fs::read_to_string(&path)?, SERVER_GO);
    Ok(())
}

#[test]
fn test_skip_dirs_and_extensions() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "server.go", SERVER_GO);
    let vendored = write(dir.path(), "vendor/lib/lib.go", SERVER_GO);
    let notes = write(dir.path(), "notes.txt", "func init() {}");

    let config = TracerConfig {
        skip_dirs: vec!["vendor".to_string()],
        ..Default::default()
    };
    let tracer = tracer(config);

    let files = tracer.discover(dir.path())?;
    assert_eq!(files, vec![dir.path().join("server.go")]);

    tracer.transform_directory(dir.path())?;
    assert_eq!(fs::read_to_string(vendored)?, SERVER_GO);
    assert_eq!(fs::read_to_string(notes)?, "func init() {}");
    Ok(())
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let result = tracer(TracerConfig::default()).transform_directory(&missing);
    assert!(matches!(result, Err(inittrace_core::TracerError::Discovery { .. })));
}

#[test]
fn test_parallel_and_sequential_runs_agree() -> anyhow::Result<()> {
    let sequential = tempfile::tempdir()?;
    let parallel = tempfile::tempdir()?;
    for root in [sequential.path(), parallel.path()] {
        for i in 0..12 {
            let source = if i % 3 == 0 { UTIL_GO } else { SERVER_GO };
            write(root, &format!("pkg{i}/file{i}.go"), source);
        }
        write(root, "pkg5/broken.go", BROKEN_GO);
    }

    let seq = tracer(TracerConfig::default()).transform_directory(sequential.path())?;
    let par = tracer(TracerConfig {
        jobs: 4,
        ..Default::default()
    })
    .transform_directory(parallel.path())?;

    let statuses = |summary: &inittrace_core::FileTransformationSummary, root: &Path| {
        summary
            .outcomes
            .iter()
            .map(|o| (o.path.strip_prefix(root).unwrap().to_path_buf(), o.status))
            .collect::<Vec<_>>()
    };
    assert_eq!(statuses(&seq, sequential.path()), statuses(&par, parallel.path()));
    assert_eq!(par.files_transformed, 8);
    assert_eq!(par.files_failed, 1);

    // clone names are unique across the whole parallel run
    let mut clone_names = HashSet::new();
    for outcome in par.outcomes.iter().filter(|o| o.status == FileStatus::Success) {
        let file = GoParser::new()?.parse(&fs::read_to_string(&outcome.path)?)?;
        for name in file.function_names().into_iter().filter(|n| *n != "init") {
            assert!(clone_names.insert(name.to_string()), "duplicate clone {name}");
        }
    }
    assert_eq!(clone_names.len(), 8);
    Ok(())
}

#[test]
fn test_transform_single_file_and_stats() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "server.go", SERVER_GO);
    let tracer = tracer(TracerConfig::default());

    let outcome = tracer.transform_file(&path);
    assert_eq!(outcome.status, FileStatus::Success);
    assert_eq!(outcome.initializers, 1);
    assert_eq!(outcome.clones, 1);

    let stats = tracer.stats();
    assert_eq!(stats["InjectDiagnostic"].applications, 1);
    assert_eq!(stats["CloneInitializers"].changes, 1);

    let missing = tracer.transform_file(dir.path().join("gone.go"));
    assert_eq!(missing.status, FileStatus::ReadFailed);
    Ok(())
}

#[test]
fn test_seeded_runs_are_reproducible() -> anyhow::Result<()> {
    let first = tempfile::tempdir()?;
    let second = tempfile::tempdir()?;
    let config = TracerConfig {
        seed: Some(2024),
        ..Default::default()
    };

    for root in [first.path(), second.path()] {
        write(root, "server.go", SERVER_GO);
        FileTracer::new(config.clone())?.transform_directory(root)?;
    }

    assert_eq!(
        fs::read_to_string(first.path().join("server.go"))?,
        fs::read_to_string(second.path().join("server.go"))?
    );
    Ok(())
}

/// Side effect applied by `Sabotage` to one file of a run
#[derive(Clone, Copy)]
enum Damage {
    /// Append a function whose name is not an identifier
    BadName,
    /// Replace the file on disk with a directory
    Directory,
}

/// Runs after the standard rules and damages the file named `target`
struct Sabotage {
    target: &'static str,
    damage: Damage,
}

impl TransformationRule for Sabotage {
    fn name(&self) -> &'static str {
        "Sabotage"
    }

    fn description(&self) -> &'static str {
        "Damages one file"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn matches(&self, _file: &SourceFile, context: &TransformationContext) -> bool {
        context.file_name() == self.target
    }

    fn transform(&self, file: &mut SourceFile, context: &TransformationContext) -> TransformResult<usize> {
        match self.damage {
            Damage::BadName => file.push_decl(Decl::Func(FuncDecl {
                receiver: None,
                name: "1bad".to_string(),
                type_params: None,
                params: "()".to_string(),
                result: None,
                comments: Vec::new(),
                body: Some(Block::default()),
            })),
            Damage::Directory => {
                let path = context.source_path.as_ref().expect("path");
                fs::remove_file(path)?;
                fs::create_dir(path)?;
            }
        }
        Ok(1)
    }
}

fn sabotaged(target: &'static str, damage: Damage) -> FileTracer {
    let config = TracerConfig::default();
    let mut rules = standard_rules(&config, Arc::new(SequentialIdents::default()));
    rules.push(Box::new(Sabotage { target, damage }));
    FileTracer::with_rules(config, rules)
}

/// Always hands out the same identifier
struct Constant(&'static str);

impl IdentSupplier for Constant {
    fn next_ident(&self) -> String {
        self.0.to_string()
    }
}

#[test]
fn test_unrenderable_tree_is_a_serialization_failure() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write(dir.path(), "a.go", SERVER_GO);
    let b = write(dir.path(), "b.go", SERVER_GO);
    let c = write(dir.path(), "c.go", SERVER_GO);

    let summary = sabotaged("b.go", Damage::BadName).transform_directory(dir.path())?;

    assert_eq!(summary.files_transformed, 2);
    assert_eq!(summary.files_failed, 1);
    let failures: Vec<_> = summary.failures().collect();
    assert_eq!(failures[0].path, b);
    assert_eq!(failures[0].status, FileStatus::SerializationFailed);
    assert_eq!(failures[0].stage, FileStage::Transformed);

    assert_eq!(fs::read_to_string(&b)?, SERVER_GO);
    assert_ne!(fs::read_to_string(&a)?, SERVER_GO);
    assert_ne!(fs::read_to_string(&c)?, SERVER_GO);
    Ok(())
}

#[test]
fn test_exhausted_clone_names_are_a_transform_failure() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    // every draw yields initX, which b.go already declares
    let taken = "package server\n\nfunc initX() {}\n\nfunc init() {\n\tinitX()\n}\n";
    let a = write(dir.path(), "a.go", SERVER_GO);
    let b = write(dir.path(), "b.go", taken);

    let tracer = FileTracer::with_supplier(TracerConfig::default(), Arc::new(Constant("X")));
    let summary = tracer.transform_directory(dir.path())?;

    assert_eq!(summary.outcomes[0].status, FileStatus::Success);
    assert_eq!(summary.outcomes[1].path, b);
    assert_eq!(summary.outcomes[1].status, FileStatus::TransformFailed);
    assert_eq!(summary.outcomes[1].stage, FileStage::Parsed);
    assert!(summary.outcomes[1]
        .detail
        .as_deref()
        .unwrap_or("")
        .contains("CloneInitializers"));

    assert_eq!(fs::read_to_string(&b)?, taken);
    assert!(fs::read_to_string(&a)?.contains("func initX() {"));
    Ok(())
}

#[test]
fn test_unwritable_target_is_a_write_failure() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write(dir.path(), "a.go", SERVER_GO);
    let b = write(dir.path(), "b.go", SERVER_GO);
    let c = write(dir.path(), "c.go", SERVER_GO);

    let summary = sabotaged("b.go", Damage::Directory).transform_directory(dir.path())?;

    assert_eq!(summary.files_processed, 3);
    assert_eq!(summary.files_failed, 1);
    let failures: Vec<_> = summary.failures().collect();
    assert_eq!(failures[0].path, b);
    assert_eq!(failures[0].status, FileStatus::WriteFailed);
    assert_eq!(failures[0].stage, FileStage::Serialized);

    // the directory is left as it was, no temp file is left behind
    assert!(b.is_dir());
    assert_eq!(fs::read_dir(dir.path())?.count(), 3);
    assert_ne!(fs::read_to_string(&a)?, SERVER_GO);
    assert_ne!(fs::read_to_string(&c)?, SERVER_GO);
    Ok(())
}
