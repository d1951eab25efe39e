//! CLI argument parsing with clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, IsolationMode, RunMode};

/// batchfmt - parallel source format checker and rewriter
///
/// Scans the configured source directories, formats every candidate file in
/// an isolated work unit and reports which files do not conform to the
/// configured style.
#[derive(Parser, Debug)]
#[command(name = "batchfmt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Project root all relative paths are resolved against
    #[arg(short, long)]
    pub project_root: Option<PathBuf>,

    /// Source directories to scan, relative to the project root
    #[arg(short, long, num_args = 1..)]
    pub source: Option<Vec<PathBuf>>,

    /// Exclusion regex applied to normalized absolute paths at discovery time
    #[arg(long)]
    pub exclude: Option<String>,

    /// Work unit isolation mode
    #[arg(short, long, value_enum)]
    pub isolation: Option<IsolationMode>,

    /// Number of worker threads or concurrent worker processes (0 = auto)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Write the run summary to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify every file matches its formatted output, without rewriting
    Check {
        /// Comma or colon separated list of relative file paths to process
        /// exclusively; all other files are skipped
        #[arg(long, default_value = "")]
        include_only: String,
    },
    /// Rewrite non-conformant files in place
    Format {
        /// Comma or colon separated list of relative file paths to process
        /// exclusively; all other files are skipped
        #[arg(long, default_value = "")]
        include_only: String,
    },
    /// Format a single file described by a JSON job on stdin (internal)
    #[command(hide = true)]
    Worker,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Run mode implied by the subcommand; `None` for the internal worker
    pub fn run_mode(&self) -> Option<RunMode> {
        match self.command {
            Command::Check { .. } => Some(RunMode::Check),
            Command::Format { .. } => Some(RunMode::Format),
            Command::Worker => None,
        }
    }

    /// Raw include-only specification from the subcommand
    pub fn include_only(&self) -> &str {
        match &self.command {
            Command::Check { include_only } | Command::Format { include_only } => include_only,
            Command::Worker => "",
        }
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref project_root) = self.project_root {
            config.project_root = project_root.clone();
        }
        if let Some(ref sources) = self.source {
            config.source_dirs = sources.clone();
        }
        if let Some(ref exclude) = self.exclude {
            config.exclude_pattern = exclude.clone();
        }
        if let Some(isolation) = self.isolation {
            config.isolation = isolation;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(ref report) = self.report {
            config.report_file = Some(report.clone());
        }
        if self.verbose {
            config.verbose = true;
        }
        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
