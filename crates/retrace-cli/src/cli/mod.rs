//! Command-line definition and the single `run` entry point
//!
//! Flags map onto `RetraceConfig`; everything else is handled by
//! `retrace_core::FileTracer`.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use retrace_core::{load_rules, FileTracer, FileTransformationSummary, RetraceConfig, WriteMode};
use tracing::debug;

/// Options for one invocation
#[derive(Debug, Clone)]
pub struct CliOptions {
    pub rules: PathBuf,
    pub file: PathBuf,
    pub report: bool,
    pub verbose: bool,
    pub config: RetraceConfig,
}

/// Build the `retrace` command
pub fn build_command() -> Command {
    Command::new("retrace")
        .version(retrace_core::VERSION)
        .about("Apply ordered multiline regex rules to a source file")
        .arg(
            Arg::new("rules")
                .long("rules")
                .short('r')
                .value_name("RULES")
                .help("JSON rule file; rules run in file order")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Source file to rewrite")
                .required(true)
                .index(1)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("PATH")
                .help("Write the result here instead of overwriting FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Apply rules and report without writing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Fail, writing nothing, if any rule matches nothing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("atomic")
                .long("atomic")
                .help("Write through a temp file, fsync, then rename")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("backup")
                .long("backup")
                .help("Copy the target to <target>.bak before writing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .help("Print the per-rule report as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
}

impl CliOptions {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let rules = matches
            .get_one::<PathBuf>("rules")
            .cloned()
            .context("missing --rules")?;
        let file = matches
            .get_one::<PathBuf>("file")
            .cloned()
            .context("missing FILE")?;

        let config = RetraceConfig {
            write_mode: if matches.get_flag("atomic") {
                WriteMode::Atomic
            } else {
                WriteMode::InPlace
            },
            backup: matches.get_flag("backup"),
            dry_run: matches.get_flag("dry-run"),
            strict: matches.get_flag("strict"),
            output: matches.get_one::<PathBuf>("output").cloned(),
            ..Default::default()
        };

        Ok(Self {
            rules,
            file,
            report: matches.get_flag("report"),
            verbose: matches.get_flag("verbose"),
            config,
        })
    }
}

/// Load the rules, rewrite the file and print the outcome to `out`
pub fn run(options: &CliOptions, out: &mut impl Write) -> Result<FileTransformationSummary> {
    let specs = load_rules(&options.rules)
        .with_context(|| format!("Failed to load rules from {}", options.rules.display()))?;
    debug!(rules = specs.len(), "rules loaded");

    let tracer = FileTracer::from_specs(&specs, options.config.clone())
        .with_context(|| format!("Invalid rule in {}", options.rules.display()))?;
    let summary = tracer
        .transform_file(&options.file)
        .with_context(|| format!("Failed to rewrite {}", options.file.display()))?;

    match &summary.output {
        Some(output) => writeln!(
            out,
            "Rewrite complete: {} now has {} lines",
            output.display(),
            summary.line_count
        )?,
        None => writeln!(
            out,
            "Dry run: {} would have {} lines",
            options.file.display(),
            summary.line_count
        )?,
    }

    if options.report {
        writeln!(out, "{}", serde_json::to_string_pretty(&summary.report)?)?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let matches = build_command()
            .try_get_matches_from([
                "retrace", "--rules", "rules.json", "src/Client.ts", "--atomic", "--strict",
                "--backup", "-o", "out.ts",
            ])
            .unwrap();
        let options = CliOptions::from_matches(&matches).unwrap();

        assert_eq!(options.rules, PathBuf::from("rules.json"));
        assert_eq!(options.file, PathBuf::from("src/Client.ts"));
        assert_eq!(options.config.write_mode, WriteMode::Atomic);
        assert!(options.config.strict);
        assert!(options.config.backup);
        assert!(!options.config.dry_run);
        assert_eq!(options.config.output, Some(PathBuf::from("out.ts")));
        assert!(!options.report);
    }

    #[test]
    fn test_rules_and_file_are_required() {
        assert!(build_command().try_get_matches_from(["retrace", "file.ts"]).is_err());
        assert!(build_command()
            .try_get_matches_from(["retrace", "--rules", "r.json"])
            .is_err());
    }

    #[test]
    fn test_command_is_well_formed() {
        build_command().debug_assert();
    }
}
