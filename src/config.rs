//! Configuration types for batchfmt

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::FormattingOptions;

/// How work units are isolated from the host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IsolationMode {
    /// Run units on the shared in-process thread pool
    #[default]
    None,
    /// Run units on a dedicated thread pool created for this dispatch call
    Pool,
    /// Run each unit in its own worker subprocess
    Process,
}

/// Whether a run reports only or also rewrites files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Report non-conformant files, never mutate them
    Check,
    /// Rewrite non-conformant files in place
    Format,
}

/// Configuration for a batchfmt invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project root all relative paths are resolved against
    pub project_root: PathBuf,

    /// Source directories to scan, relative to the project root
    pub source_dirs: Vec<PathBuf>,

    /// Regex matched against `/`-normalized absolute paths; matching
    /// candidates are pruned at discovery time
    pub exclude_pattern: String,

    /// File extensions handed to the formatter
    pub extensions: Vec<String>,

    /// Formatter options
    pub formatting: FormattingOptions,

    /// Work unit isolation mode
    pub isolation: IsolationMode,

    /// Number of worker threads, or concurrent worker processes (0 = auto)
    pub threads: usize,

    /// Optional plain-text report destination for the run summary
    pub report_file: Option<PathBuf>,

    /// Verbose output
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            source_dirs: vec![PathBuf::from("src")],
            exclude_pattern: "/build/".into(),
            extensions: vec!["kt".into(), "kts".into()],
            formatting: FormattingOptions::default(),
            isolation: IsolationMode::default(),
            threads: 0,
            report_file: None,
            verbose: false,
        }
    }
}

impl Config {
    /// Check if a file extension is handled by the formatter
    pub fn is_supported(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.extensions.iter().any(|e| e == &ext_lower)
    }

    /// Compile the exclusion pattern
    pub fn exclusion_regex(&self) -> Result<Regex> {
        Ok(Regex::new(&self.exclude_pattern)?)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# batchfmt configuration file (TOML)

# Project root all relative paths are resolved against
project_root = "."

# Source directories to scan, relative to the project root
source_dirs = ["src", "test"]

# Candidates whose normalized absolute path matches this regex are pruned
# before any work unit is created
exclude_pattern = "/build/"

# File extensions handed to the formatter
extensions = ["kt", "kts"]

# Work unit isolation: "none", "pool" or "process"
isolation = "none"

# Number of worker threads or concurrent worker processes (0 = auto)
threads = 0

[formatting]
max_width = 100
block_indent = 4
continuation_indent = 8
remove_unused_imports = true
manage_trailing_commas = false
debugging_print_ops = false
"#
        .to_string()
    }
}
