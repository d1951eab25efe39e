//! Error types for batchfmt

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for batchfmt operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for batchfmt
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed result slot '{record}': {message}")]
    Decode { record: String, message: String },

    #[error(
        "Result read-back mismatch: dispatched {expected} work units but found {actual} result slots"
    )]
    MissingResults { expected: usize, actual: usize },

    #[error("Failed to spawn worker for {path}: {message}")]
    WorkerSpawn { path: PathBuf, message: String },

    #[error("batchfmt failed to run with {0} failures")]
    WorkerFailures(usize),

    #[error("Found {count} files that are not properly formatted:\n{file_list}")]
    FormatViolations { count: usize, file_list: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
