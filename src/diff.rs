//! Line-level diff reporting for non-conformant files.
//!
//! Pure reporting aid: computes an LCS-based edit script between the
//! original and formatted text and renders one annotated entry per hunk.
//! Never mutates its inputs.

use std::path::{Path, PathBuf};

use tracing::info;

/// Kind of edit a hunk represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Changed,
    Deleted,
    Inserted,
}

/// One hunk of the edit script. `line_number` is 1-based and refers to the
/// original text's numbering at the start of the hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub path: PathBuf,
    pub line_number: usize,
    pub kind: DiffKind,
    pub message: String,
}

/// Compute the edit script between `original` and `formatted` for `path`.
pub fn compute_diff(path: &Path, original: &str, formatted: &str) -> Vec<DiffEntry> {
    let chunks = diff::lines(original, formatted);
    let mut entries = Vec::new();
    let mut consumed = 0usize; // original lines consumed so far
    let mut i = 0;

    while i < chunks.len() {
        match &chunks[i] {
            diff::Result::Both(..) => {
                consumed += 1;
                i += 1;
            }
            diff::Result::Left(first) => {
                let start = consumed + 1;
                while matches!(chunks.get(i), Some(diff::Result::Left(..))) {
                    consumed += 1;
                    i += 1;
                }
                let mut replaced = false;
                while matches!(chunks.get(i), Some(diff::Result::Right(..))) {
                    replaced = true;
                    i += 1;
                }
                if replaced {
                    entries.push(DiffEntry {
                        path: path.to_path_buf(),
                        line_number: start,
                        kind: DiffKind::Changed,
                        message: format!("Line changed: {first}"),
                    });
                } else {
                    entries.push(DiffEntry {
                        path: path.to_path_buf(),
                        line_number: start,
                        kind: DiffKind::Deleted,
                        message: "Line deleted".into(),
                    });
                }
            }
            diff::Result::Right(..) => {
                let start = consumed + 1;
                while matches!(chunks.get(i), Some(diff::Result::Right(..))) {
                    i += 1;
                }
                entries.push(DiffEntry {
                    path: path.to_path_buf(),
                    line_number: start,
                    kind: DiffKind::Inserted,
                    message: "Line added".into(),
                });
            }
        }
    }
    entries
}

/// Render entries as `path:line - message` lines, in input order.
pub fn render_diff(entries: &[DiffEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{}:{} - {}",
                entry.path.display(),
                entry.line_number,
                entry.message
            )
        })
        .collect()
}

/// Log every entry at the time the non-conformant file is reported.
pub fn print_diff(entries: &[DiffEntry]) {
    for line in render_diff(entries) {
        info!("{line}");
    }
}
