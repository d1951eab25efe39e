//! batchfmt - a concurrent batch formatter runner
//!
//! This library checks and reformats large source trees by farming one
//! work unit per file out to isolated execution contexts:
//! - selectable isolation modes (shared pool, dedicated pool, subprocess)
//! - crash-tolerant result transport through encoded scratch-directory slots
//! - exact include-only selection and discovery-time exclusion patterns
//! - line-level diff reporting for non-conformant files
//! - check and format run modes with per-mode pass/fail policies

pub mod cli;
pub mod config;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod include;
pub mod outcome;
pub mod scan;
pub mod style;
pub mod summary;

pub use cli::{Cli, Command};
pub use config::{Config, IsolationMode, RunMode};
pub use dispatch::dispatch;
pub use error::{Error, Result};
pub use format::{FormatResult, FormattingOptions};
pub use include::InclusionSpec;
pub use outcome::FileOutcome;
pub use summary::ResultSummary;
