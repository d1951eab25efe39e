//! Formatting adapter: wraps the opaque formatter and converts every
//! failure mode into a per-file result. Nothing escapes this boundary as an
//! error; a bad file never aborts the batch.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::include::InclusionSpec;
use crate::style;

/// Options forwarded to the formatter. Serializable so they can travel to
/// subprocess workers and live in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormattingOptions {
    /// Maximum line width the formatter aims for.
    pub max_width: usize,
    /// Indentation step for a nested block.
    pub block_indent: usize,
    /// Extra indentation for expression continuations.
    pub continuation_indent: usize,
    /// Drop single-name imports that are never referenced.
    pub remove_unused_imports: bool,
    /// Add trailing commas to multi-line argument and collection lists.
    pub manage_trailing_commas: bool,
    /// Log formatting operation counts at debug level.
    pub debugging_print_ops: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            max_width: 100,
            block_indent: 4,
            continuation_indent: 8,
            remove_unused_imports: true,
            manage_trailing_commas: false,
            debugging_print_ops: false,
        }
    }
}

/// Worker-side formatting result, richer than the wire-level outcome: it
/// still carries the formatted text and the diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatResult {
    Success {
        path: PathBuf,
        was_conformant: bool,
        formatted: String,
    },
    Failure {
        path: PathBuf,
        message: String,
    },
    Skipped {
        path: PathBuf,
        reason: String,
    },
}

/// Everything one formatting call needs.
#[derive(Debug)]
pub struct FormatContext<'a> {
    pub source_file: &'a Path,
    pub project_root: &'a Path,
    pub spec: &'a InclusionSpec,
    pub options: &'a FormattingOptions,
}

/// Format a single file. Applies the inclusion filter first so excluded
/// files never hit the formatter, then distinguishes read errors from parse
/// errors in the diagnostic.
pub fn format_file(ctx: &FormatContext<'_>) -> FormatResult {
    debug!(file = %ctx.source_file.display(), "formatting");

    if !ctx.spec.should_process(ctx.source_file, ctx.project_root) {
        return FormatResult::Skipped {
            path: ctx.source_file.to_path_buf(),
            reason: "not included inside --include-only".into(),
        };
    }

    let original = match fs::read_to_string(ctx.source_file) {
        Ok(text) => text,
        Err(e) => {
            return FormatResult::Failure {
                path: ctx.source_file.to_path_buf(),
                message: format!("Unable to read file: {e}"),
            };
        }
    };

    match style::reformat(ctx.options, &original) {
        Ok(formatted) => FormatResult::Success {
            path: ctx.source_file.to_path_buf(),
            // Exact string equality; a whitespace-only difference is still
            // non-conformant.
            was_conformant: original == formatted,
            formatted,
        },
        Err(style::StyleError::Parse { line, message }) => FormatResult::Failure {
            path: ctx.source_file.to_path_buf(),
            message: format!("Failed to parse file: line {line}: {message}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_conformant_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "Ok.kt", "fun main() {\n    println(\"hi\")\n}\n");
        let spec = InclusionSpec::default();
        let options = FormattingOptions::default();
        let ctx = FormatContext {
            source_file: &file,
            project_root: dir.path(),
            spec: &spec,
            options: &options,
        };
        match format_file(&ctx) {
            FormatResult::Success { was_conformant, .. } => assert!(was_conformant),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_non_conformant_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "Messy.kt", "fun main() {\nprintln(\"hi\")\n}\n");
        let spec = InclusionSpec::default();
        let options = FormattingOptions::default();
        let ctx = FormatContext {
            source_file: &file,
            project_root: dir.path(),
            spec: &spec,
            options: &options,
        };
        match format_file(&ctx) {
            FormatResult::Success {
                was_conformant,
                formatted,
                ..
            } => {
                assert!(!was_conformant);
                assert!(formatted.contains("    println"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "Broken.kt", "fun broken() {\n");
        let spec = InclusionSpec::default();
        let options = FormattingOptions::default();
        let ctx = FormatContext {
            source_file: &file,
            project_root: dir.path(),
            spec: &spec,
            options: &options,
        };
        match format_file(&ctx) {
            FormatResult::Failure { message, .. } => {
                assert!(message.starts_with("Failed to parse file"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Gone.kt");
        let spec = InclusionSpec::default();
        let options = FormattingOptions::default();
        let ctx = FormatContext {
            source_file: &file,
            project_root: dir.path(),
            spec: &spec,
            options: &options,
        };
        match format_file(&ctx) {
            FormatResult::Failure { message, .. } => {
                assert!(message.starts_with("Unable to read file"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_not_included_file_is_skipped_without_reading() {
        let dir = tempfile::tempdir().unwrap();
        // The file does not exist; a skip must be decided before any read.
        let file = dir.path().join("NotListed.kt");
        let spec = InclusionSpec::new("Other.kt", None);
        let options = FormattingOptions::default();
        let ctx = FormatContext {
            source_file: &file,
            project_root: dir.path(),
            spec: &spec,
            options: &options,
        };
        assert!(matches!(format_file(&ctx), FormatResult::Skipped { .. }));
    }
}
