//! Result aggregation: classify per-file outcomes into a summary and decide
//! overall pass/fail per run mode.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::outcome::FileOutcome;

/// Aggregate of one dispatch round. The four lists partition the dispatched
/// file set exactly: every file lands in one list, none in two.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSummary {
    /// Files whose text already matched their formatted output.
    pub valid_formatted: Vec<PathBuf>,
    /// Files that need (or, in format mode, received) a rewrite.
    pub invalid_formatted: Vec<PathBuf>,
    /// Files excluded by the include-only filter.
    pub skipped: Vec<PathBuf>,
    /// Files the formatter could not process.
    pub failed: Vec<PathBuf>,
}

impl ResultSummary {
    /// Classify outcomes into the four categories. Completion order carries
    /// no meaning, so this is a pure bucketing step.
    pub fn from_outcomes(outcomes: &[FileOutcome]) -> Self {
        let mut summary = ResultSummary::default();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Success {
                    path,
                    was_conformant: true,
                } => summary.valid_formatted.push(path.clone()),
                FileOutcome::Success {
                    path,
                    was_conformant: false,
                } => summary.invalid_formatted.push(path.clone()),
                FileOutcome::Skipped { path } => summary.skipped.push(path.clone()),
                FileOutcome::Failure { path } => summary.failed.push(path.clone()),
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.valid_formatted.len()
            + self.invalid_formatted.len()
            + self.skipped.len()
            + self.failed.len()
    }

    /// Deterministic human-readable rendering, used for logging and the
    /// optional report file.
    pub fn pretty_print(&self) -> String {
        format!(
            "Format summary:\n  - Valid formatted files: {}\n  - Invalid formatted files: {}\n  - Skipped files: {}\n  - Failed files: {}",
            self.valid_formatted.len(),
            self.invalid_formatted.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }

    /// Check-mode decision: failures first, then every non-conformant path,
    /// itemized so the operator knows exactly what to fix.
    pub fn check_verdict(&self, project_root: &Path) -> Result<String> {
        if !self.failed.is_empty() {
            return Err(Error::WorkerFailures(self.failed.len()));
        }
        if !self.invalid_formatted.is_empty() {
            let file_list = self
                .invalid_formatted
                .iter()
                .map(|path| relative_display(path, project_root))
                .collect::<Vec<_>>()
                .join("\n");
            return Err(Error::FormatViolations {
                count: self.invalid_formatted.len(),
                file_list,
            });
        }
        Ok(format!("Successfully checked {} files", self.total()))
    }

    /// Format-mode decision: the invalid list is the set of rewritten files
    /// and never fails the run; leftover failures still do, since those
    /// files were left untouched.
    pub fn format_verdict(&self) -> Result<String> {
        if !self.failed.is_empty() {
            return Err(Error::WorkerFailures(self.failed.len()));
        }
        Ok(format!(
            "Successfully reformatted {} files",
            self.invalid_formatted.len()
        ))
    }
}

fn relative_display(path: &Path, project_root: &Path) -> String {
    path.strip_prefix(project_root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn outcomes() -> Vec<FileOutcome> {
        vec![
            FileOutcome::Success {
                path: PathBuf::from("/p/src/Ok.kt"),
                was_conformant: true,
            },
            FileOutcome::Success {
                path: PathBuf::from("/p/src/Messy.kt"),
                was_conformant: false,
            },
            FileOutcome::Failure {
                path: PathBuf::from("/p/src/Broken.kt"),
            },
            FileOutcome::Skipped {
                path: PathBuf::from("/p/src/Ignored.kt"),
            },
        ]
    }

    #[test]
    fn test_partition_invariant() {
        let outcomes = outcomes();
        let summary = ResultSummary::from_outcomes(&outcomes);

        let mut all: Vec<&PathBuf> = summary
            .valid_formatted
            .iter()
            .chain(&summary.invalid_formatted)
            .chain(&summary.skipped)
            .chain(&summary.failed)
            .collect();
        assert_eq!(all.len(), outcomes.len());

        let distinct: BTreeSet<&PathBuf> = all.drain(..).collect();
        assert_eq!(distinct.len(), outcomes.len());

        let dispatched: BTreeSet<PathBuf> =
            outcomes.iter().map(|o| o.path().to_path_buf()).collect();
        assert_eq!(
            distinct.into_iter().cloned().collect::<BTreeSet<_>>(),
            dispatched
        );
    }

    #[test]
    fn test_classification() {
        let summary = ResultSummary::from_outcomes(&outcomes());
        assert_eq!(summary.valid_formatted, vec![PathBuf::from("/p/src/Ok.kt")]);
        assert_eq!(
            summary.invalid_formatted,
            vec![PathBuf::from("/p/src/Messy.kt")]
        );
        assert_eq!(summary.failed, vec![PathBuf::from("/p/src/Broken.kt")]);
        assert_eq!(summary.skipped, vec![PathBuf::from("/p/src/Ignored.kt")]);
    }

    #[test]
    fn test_pretty_print_counts() {
        let rendered = ResultSummary::from_outcomes(&outcomes()).pretty_print();
        assert!(rendered.contains("Valid formatted files: 1"));
        assert!(rendered.contains("Invalid formatted files: 1"));
        assert!(rendered.contains("Skipped files: 1"));
        assert!(rendered.contains("Failed files: 1"));
    }

    #[test]
    fn test_check_verdict_prefers_failures() {
        let summary = ResultSummary::from_outcomes(&outcomes());
        let err = summary.check_verdict(Path::new("/p")).unwrap_err();
        assert!(matches!(err, Error::WorkerFailures(1)));
    }

    #[test]
    fn test_check_verdict_lists_every_offender() {
        let summary = ResultSummary {
            invalid_formatted: vec![
                PathBuf::from("/p/src/One.kt"),
                PathBuf::from("/p/src/Two.kt"),
            ],
            ..ResultSummary::default()
        };
        let err = summary.check_verdict(Path::new("/p")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("2 files"));
        assert!(message.contains("src/One.kt"));
        assert!(message.contains("src/Two.kt"));
    }

    #[test]
    fn test_check_verdict_passes_when_clean() {
        let summary = ResultSummary {
            valid_formatted: vec![PathBuf::from("/p/src/Ok.kt")],
            skipped: vec![PathBuf::from("/p/src/Ignored.kt")],
            ..ResultSummary::default()
        };
        let message = summary.check_verdict(Path::new("/p")).unwrap();
        assert_eq!(message, "Successfully checked 2 files");
    }

    #[test]
    fn test_format_verdict_ignores_invalid_but_not_failed() {
        let mut summary = ResultSummary {
            invalid_formatted: vec![PathBuf::from("/p/src/Messy.kt")],
            ..ResultSummary::default()
        };
        assert_eq!(
            summary.format_verdict().unwrap(),
            "Successfully reformatted 1 files"
        );

        summary.failed.push(PathBuf::from("/p/src/Broken.kt"));
        assert!(matches!(
            summary.format_verdict().unwrap_err(),
            Error::WorkerFailures(1)
        ));
    }
}
