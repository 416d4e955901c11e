/*!
# FileTracer - File-based Transformation

Loads a whole file, runs the rule set over it, and writes the result back.
Write-back is all-or-nothing: nothing touches disk until every rule has run
(and, in strict mode, applied).
*/

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use super::applier::{Report, RuleSetApplier};
use super::rules::RuleSpec;
use super::TransformationContext;
use crate::{line_count, RetraceConfig, RetraceError, Result};

/// How the final buffer reaches disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Truncate and rewrite the target
    #[default]
    InPlace,
    /// Write a sibling temp file, fsync it, then rename it over the target
    Atomic,
}

/// Read a whole file into memory
pub fn load(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| RetraceError::io(path, e))
}

/// Overwrite `path` with `text`
pub fn save(path: impl AsRef<Path>, text: &str) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, text).map_err(|e| RetraceError::io(path, e))
}

/// Replace `path` with `text` via temp file, fsync and rename
pub fn save_atomic(path: impl AsRef<Path>, text: &str) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(parent).map_err(|e| RetraceError::io(parent, e))?;
    temp_file
        .write_all(text.as_bytes())
        .map_err(|e| RetraceError::io(temp_file.path().to_path_buf(), e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| RetraceError::io(temp_file.path().to_path_buf(), e))?;
    temp_file
        .persist(path)
        .map_err(|e| RetraceError::io(path, e.error))?;
    Ok(())
}

/// Path of the backup copy made for `path`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// File-based transformation
///
/// Reads a source file, applies the rule set and writes the transformed text
/// to the configured target.
pub struct FileTracer {
    applier: RuleSetApplier,
    config: RetraceConfig,
}

impl FileTracer {
    pub fn new(applier: RuleSetApplier, config: RetraceConfig) -> Self {
        Self { applier, config }
    }

    /// Compile `specs` with the configured size limit
    pub fn from_specs(specs: &[RuleSpec], config: RetraceConfig) -> Result<Self> {
        let applier = RuleSetApplier::from_specs_with_limit(specs, config.regex_size_limit)?;
        Ok(Self::new(applier, config))
    }

    /// Transform a single file
    pub fn transform_file<P: AsRef<Path>>(&self, source_file: P) -> Result<FileTransformationSummary> {
        let source_path = source_file.as_ref();
        let original = load(source_path)?;

        let context = TransformationContext::new()
            .with_source_file(source_path.to_string_lossy().to_string());
        let rewrite = self.applier.apply_with_context(original.clone(), &context);

        if self.config.strict {
            rewrite.report.require_all_applied()?;
        }

        let mut summary = FileTransformationSummary {
            source: source_path.to_path_buf(),
            output: None,
            backup: None,
            changed: rewrite.buffer != original,
            line_count: line_count(&rewrite.buffer),
            report: rewrite.report,
        };

        if self.config.dry_run {
            info!(source = %source_path.display(), "dry run; nothing written");
            return Ok(summary);
        }

        let output_path = self
            .config
            .output
            .clone()
            .unwrap_or_else(|| source_path.to_path_buf());

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| RetraceError::io(parent, e))?;
            }
        }

        if self.config.backup && output_path.exists() {
            let backup = backup_path(&output_path);
            fs::copy(&output_path, &backup).map_err(|e| RetraceError::io(&backup, e))?;
            summary.backup = Some(backup);
        }

        match self.config.write_mode {
            WriteMode::InPlace => save(&output_path, &rewrite.buffer)?,
            WriteMode::Atomic => save_atomic(&output_path, &rewrite.buffer)?,
        }

        info!(
            output = %output_path.display(),
            lines = summary.line_count,
            matches = summary.report.total_matches(),
            "file rewritten"
        );
        summary.output = Some(output_path);
        Ok(summary)
    }
}

/// Summary of one file transformation
#[derive(Debug, Clone)]
pub struct FileTransformationSummary {
    pub source: PathBuf,
    /// Where the result was written; `None` on a dry run
    pub output: Option<PathBuf>,
    pub backup: Option<PathBuf>,
    pub changed: bool,
    /// Line count of the final buffer
    pub line_count: usize,
    pub report: Report,
}

impl FileTransformationSummary {
    pub fn written(&self) -> bool {
        self.output.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(backup_path(Path::new("src/api/Client.ts")), PathBuf::from("src/api/Client.ts.bak"));
        assert_eq!(backup_path(Path::new("Makefile")), PathBuf::from("Makefile.bak"));
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = load("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, RetraceError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }
}
