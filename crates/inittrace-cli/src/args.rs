//! Command line definition and its mapping onto `TracerConfig`

use std::path::Path;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use inittrace_core::TracerConfig;

pub fn command() -> Command {
    Command::new("inittrace")
        .version(inittrace_core::VERSION)
        .about("Trace every func init() in a Go source tree")
        .arg(
            Arg::new("root")
                .value_name("ROOT")
                .help("Directory to transform in place")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("ext")
                .long("ext")
                .value_name("EXT")
                .help("File extension to process (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("skip-dir")
                .long("skip-dir")
                .value_name("NAME")
                .help("Directory name never descended into (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("jobs")
                .long("jobs")
                .short('j')
                .value_name("N")
                .help("Worker threads, 0 for one per CPU")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed for clone names, for reproducible output")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .value_name("PREFIX")
                .help("Prefix of cloned initializer names"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Report what would change without writing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rewrite-unchanged")
                .long("rewrite-unchanged")
                .help("Re-render files that have no initializer")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("backup")
                .long("backup")
                .help("Keep a .backup copy of every rewritten file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-verify")
                .long("no-verify")
                .help("Skip reparsing rendered output before writing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file; flags override it"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the run summary as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
}

/// Configuration file (or defaults) with command line flags applied on top
pub fn config_from_matches(matches: &ArgMatches) -> Result<TracerConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => TracerConfig::from_json_file(Path::new(path))
            .with_context(|| format!("loading configuration from {path}"))?,
        None => TracerConfig::default(),
    };

    if let Some(exts) = matches.get_many::<String>("ext") {
        config.extensions = exts.map(|ext| ext.trim_start_matches('.').to_string()).collect();
    }
    if let Some(dirs) = matches.get_many::<String>("skip-dir") {
        config.skip_dirs.extend(dirs.cloned());
    }
    if let Some(jobs) = matches.get_one::<usize>("jobs") {
        config.jobs = *jobs;
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.seed = Some(*seed);
    }
    if let Some(prefix) = matches.get_one::<String>("prefix") {
        config.clone_prefix = prefix.clone();
    }
    config.dry_run |= matches.get_flag("dry-run");
    config.rewrite_unchanged |= matches.get_flag("rewrite-unchanged");
    config.backup_originals |= matches.get_flag("backup");
    if matches.get_flag("no-verify") {
        config.verify_output = false;
    }

    config.validate()?;
    Ok(config)
}
