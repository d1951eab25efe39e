//! Inclusion filtering: the `--include-only` selective-run specification
//! and the discovery-time exclusion pattern.
//!
//! Exclusion prunes candidates while the source tree is being walked;
//! include-only is decided per file inside the work unit. Both compare
//! `/`-normalized paths so the same spec behaves identically regardless of
//! which separator the caller used.

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;

/// Resolved inclusion specification for one invocation.
#[derive(Debug, Clone, Default)]
pub struct InclusionSpec {
    /// Normalized relative paths to process exclusively. Empty means "no
    /// restriction", not "exclude everything".
    include_only: BTreeSet<String>,
    /// Pattern matched against the normalized absolute path at discovery
    /// time.
    exclusion: Option<Regex>,
}

impl InclusionSpec {
    pub fn new(include_only: &str, exclusion: Option<Regex>) -> Self {
        Self {
            include_only: parse_include_only(include_only),
            exclusion,
        }
    }

    /// Whether a candidate file should be handed to the formatter.
    ///
    /// With a non-empty include-only set the file's relative path must
    /// exactly match one entry; no prefix or substring matching. Otherwise
    /// any file not caught by the exclusion pattern is processed.
    pub fn should_process(&self, file: &Path, project_root: &Path) -> bool {
        if !self.include_only.is_empty() {
            return match relative_key(file, project_root) {
                Some(key) => self.include_only.contains(&key),
                None => false,
            };
        }
        !self.is_excluded(file)
    }

    /// Discovery-time check against the exclusion pattern.
    pub fn is_excluded(&self, path: &Path) -> bool {
        match &self.exclusion {
            Some(pattern) => pattern.is_match(&normalize_separators(&path.display().to_string())),
            None => false,
        }
    }

    pub fn has_include_only(&self) -> bool {
        !self.include_only.is_empty()
    }

    /// Rebuild a spec from already-normalized entries, as received by a
    /// worker subprocess. Exclusion is a discovery-time concern and does not
    /// travel with the job.
    pub fn from_entries<I: IntoIterator<Item = String>>(entries: I) -> Self {
        Self {
            include_only: entries.into_iter().collect(),
            exclusion: None,
        }
    }

    /// Normalized include-only entries, for embedding in a worker job.
    pub fn include_entries(&self) -> Vec<String> {
        self.include_only.iter().cloned().collect()
    }
}

/// Parse a comma- or colon-delimited list of relative paths into the
/// normalized include-only set.
pub fn parse_include_only(value: &str) -> BTreeSet<String> {
    value
        .split([',', ':'])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let entry = entry.trim_start_matches(['/', '\\']);
            normalize_separators(entry)
        })
        .collect()
}

/// Replace backslash separators so `/`- and `\`-delimited spellings of the
/// same path compare equal.
fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Normalized path of `file` relative to the project root. Files outside
/// the root have no key and can never match an include-only entry.
fn relative_key(file: &Path, project_root: &Path) -> Option<String> {
    let relative = file.strip_prefix(project_root).unwrap_or(file);
    if relative.is_absolute() {
        return None;
    }
    Some(normalize_separators(&relative.display().to_string()))
}
