/*!
# FileTracer Integration Tests

Load, rewrite and write-back behaviour against real files.
*/

use std::fs;

use pretty_assertions::assert_eq;
use retrace_core::tracer::file_tracer::backup_path;
use retrace_core::tracer::{FileTracer, RuleSpec, WriteMode};
use retrace_core::{RetraceConfig, RetraceError};

fn rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec::first_match("rename", r"fn old_name\(", "fn new_name("),
        RuleSpec::erase_region("drop-helper", r"\n// helper start.*?// helper end\n"),
    ]
}

const SOURCE: &str = "fn old_name() {}\n// helper start\nfn helper() {}\n// helper end\nfn main() {}\n";
const EXPECTED: &str = "fn new_name() {}fn main() {}\n";

#[test]
fn test_rewrites_file_in_place() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lib.rs");
    fs::write(&path, SOURCE)?;

    let tracer = FileTracer::from_specs(&rules(), RetraceConfig::default())?;
    let summary = tracer.transform_file(&path)?;

    assert_eq!(fs::read_to_string(&path)?, EXPECTED);
    assert!(summary.changed);
    assert!(summary.written());
    assert_eq!(summary.line_count, 1);
    assert_eq!(summary.output.as_deref(), Some(path.as_path()));
    assert!(summary.report.all_applied());
    Ok(())
}

#[test]
fn test_atomic_write_with_backup() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lib.rs");
    fs::write(&path, SOURCE)?;

    let config = RetraceConfig {
        write_mode: WriteMode::Atomic,
        backup: true,
        ..Default::default()
    };
    let summary = FileTracer::from_specs(&rules(), config)?.transform_file(&path)?;

    assert_eq!(fs::read_to_string(&path)?, EXPECTED);
    let backup = backup_path(&path);
    assert_eq!(summary.backup.as_deref(), Some(backup.as_path()));
    assert_eq!(fs::read_to_string(&backup)?, SOURCE);

    // Only the target and its backup remain; the temp file was renamed away
    assert_eq!(fs::read_dir(dir.path())?.count(), 2);
    Ok(())
}

#[test]
fn test_writes_to_separate_output() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("input.rs");
    let output = dir.path().join("out/nested/output.rs");
    fs::write(&input, SOURCE)?;

    let config = RetraceConfig {
        output: Some(output.clone()),
        ..Default::default()
    };
    FileTracer::from_specs(&rules(), config)?.transform_file(&input)?;

    assert_eq!(fs::read_to_string(&input)?, SOURCE);
    assert_eq!(fs::read_to_string(&output)?, EXPECTED);
    Ok(())
}

#[test]
fn test_dry_run_writes_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lib.rs");
    fs::write(&path, SOURCE)?;

    let config = RetraceConfig {
        dry_run: true,
        backup: true,
        ..Default::default()
    };
    let summary = FileTracer::from_specs(&rules(), config)?.transform_file(&path)?;

    assert!(!summary.written());
    assert!(summary.changed);
    assert_eq!(summary.line_count, 1);
    assert_eq!(fs::read_to_string(&path)?, SOURCE);
    assert!(!backup_path(&path).exists());
    Ok(())
}

#[test]
fn test_strict_mode_leaves_file_untouched() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lib.rs");
    fs::write(&path, SOURCE)?;

    let mut specs = rules();
    specs.push(RuleSpec::first_match("stale", "no_longer_here", ""));
    let config = RetraceConfig {
        strict: true,
        ..Default::default()
    };
    let err = FileTracer::from_specs(&specs, config)?
        .transform_file(&path)
        .unwrap_err();

    assert!(matches!(err, RetraceError::Unapplied { ref rules } if rules == &["stale".to_string()]));
    assert_eq!(fs::read_to_string(&path)?, SOURCE);
    Ok(())
}

#[test]
fn test_unapplied_rules_are_not_fatal_by_default() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lib.rs");
    fs::write(&path, "nothing to see\n")?;

    let summary = FileTracer::from_specs(&rules(), RetraceConfig::default())?.transform_file(&path)?;

    assert!(!summary.changed);
    assert_eq!(summary.report.unapplied().count(), 2);
    assert_eq!(fs::read_to_string(&path)?, "nothing to see\n");
    Ok(())
}

#[test]
fn test_missing_input_is_io_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("missing.rs");

    let err = FileTracer::from_specs(&rules(), RetraceConfig::default())?
        .transform_file(&missing)
        .unwrap_err();

    match err {
        RetraceError::Io { path, .. } => assert_eq!(path, missing),
        other => panic!("Expected Io error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_bad_rule_is_rejected_before_reading() {
    let specs = [RuleSpec::first_match("bad", "[unclosed", "")];
    let result = FileTracer::from_specs(&specs, RetraceConfig::default());
    assert!(matches!(result, Err(RetraceError::Pattern { .. })));
}
