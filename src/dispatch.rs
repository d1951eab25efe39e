//! Work dispatcher: one independent work unit per file, executed under the
//! configured isolation mode, with results marshalled back through a
//! scratch directory of encoded result slots.
//!
//! Every mode funnels results through the same slot protocol, so the
//! read-back and aggregation contract never changes when a mode is added.
//! The dispatch call is a synchronous barrier: it returns only after every
//! unit has reported, and a failing unit never cancels its siblings.

use std::fs;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{Config, IsolationMode, RunMode};
use crate::diff;
use crate::error::{Error, Result};
use crate::format::{self, FormatContext, FormatResult, FormattingOptions};
use crate::include::InclusionSpec;
use crate::outcome::FileOutcome;

/// Job payload handed to a worker subprocess on stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerJob {
    pub source_file: PathBuf,
    pub project_root: PathBuf,
    pub include_only: Vec<String>,
    pub options: FormattingOptions,
    pub reformat: bool,
    pub result_dir: PathBuf,
}

/// Run one work unit per file and gather every outcome.
///
/// The scratch directory is owned by this call alone and removed on every
/// exit path. A slot-count mismatch or a malformed slot is fatal: it means
/// the transport is broken, not that a file failed.
pub fn dispatch(
    files: &[PathBuf],
    config: &Config,
    spec: &InclusionSpec,
    mode: RunMode,
) -> Result<Vec<FileOutcome>> {
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let scratch = tempfile::Builder::new().prefix("batchfmt-").tempdir()?;
    debug!(
        scratch = %scratch.path().display(),
        count = files.len(),
        isolation = ?config.isolation,
        "dispatching work units"
    );

    match config.isolation {
        IsolationMode::None => run_in_process(files, config, spec, mode, scratch.path()),
        IsolationMode::Pool => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .build()?;
            pool.install(|| run_in_process(files, config, spec, mode, scratch.path()));
        }
        IsolationMode::Process => run_subprocesses(files, config, spec, mode, scratch.path())?,
    }

    let outcomes = read_slots(scratch.path())?;
    if outcomes.len() != files.len() {
        return Err(Error::MissingResults {
            expected: files.len(),
            actual: outcomes.len(),
        });
    }
    Ok(outcomes)
}

/// Execute units on the current rayon pool. Panics are contained per unit
/// and recorded as failure slots so one bad file cannot take down the
/// batch.
fn run_in_process(
    files: &[PathBuf],
    config: &Config,
    spec: &InclusionSpec,
    mode: RunMode,
    scratch: &Path,
) {
    files.par_iter().for_each(|file| {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_unit(file, &config.project_root, spec, &config.formatting, mode)
        }))
        .unwrap_or_else(|_| {
            error!(file = %file.display(), "Work unit panicked");
            FileOutcome::Failure { path: file.clone() }
        });
        if let Err(e) = write_slot(scratch, &outcome) {
            error!(file = %file.display(), error = %e, "Failed to write result slot");
        }
    });
}

/// Execute units as worker subprocesses, one per file, bounded by the
/// current pool size. A child that cannot be spawned or dies before writing
/// its slot gets a failure slot written by the parent.
fn run_subprocesses(
    files: &[PathBuf],
    config: &Config,
    spec: &InclusionSpec,
    mode: RunMode,
    scratch: &Path,
) -> Result<()> {
    let exe = std::env::current_exe()?;
    let include_only = spec.include_entries();

    files.par_iter().for_each(|file| {
        let job = WorkerJob {
            source_file: file.clone(),
            project_root: config.project_root.clone(),
            include_only: include_only.clone(),
            options: config.formatting.clone(),
            reformat: matches!(mode, RunMode::Format),
            result_dir: scratch.to_path_buf(),
        };
        if let Err(e) = spawn_worker(&exe, &job) {
            error!(file = %file.display(), error = %e, "Worker process failed");
            if let Err(write_err) = write_slot(scratch, &FileOutcome::Failure { path: file.clone() })
            {
                error!(error = %write_err, "Failed to record worker failure");
            }
        }
    });
    Ok(())
}

fn spawn_worker(exe: &Path, job: &WorkerJob) -> Result<()> {
    let spawn_err = |message: String| Error::WorkerSpawn {
        path: job.source_file.clone(),
        message,
    };

    let mut child = Command::new(exe)
        .arg("worker")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .map_err(|e| spawn_err(e.to_string()))?;

    {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_err("worker stdin unavailable".into()))?;
        stdin.write_all(&serde_json::to_vec(job)?)?;
    }

    let status = child.wait()?;
    if !status.success() {
        return Err(spawn_err(format!("worker exited with {status}")));
    }
    Ok(())
}

/// Worker subprocess entry point: read one job from stdin, process it and
/// write the result slot. Writing the slot is the last step, so a crash can
/// never be mistaken for a clean result.
pub fn run_worker_from_stdin() -> Result<()> {
    let job: WorkerJob = serde_json::from_reader(std::io::stdin().lock())?;
    let spec = InclusionSpec::from_entries(job.include_only.clone());
    let mode = if job.reformat {
        RunMode::Format
    } else {
        RunMode::Check
    };
    let outcome = run_unit(&job.source_file, &job.project_root, &spec, &job.options, mode);
    write_slot(&job.result_dir, &outcome)
}

/// Process a single file: format it, apply the rewrite policy and log every
/// diagnostic at the moment it occurs.
fn run_unit(
    file: &Path,
    project_root: &Path,
    spec: &InclusionSpec,
    options: &FormattingOptions,
    mode: RunMode,
) -> FileOutcome {
    let ctx = FormatContext {
        source_file: file,
        project_root,
        spec,
        options,
    };

    match format::format_file(&ctx) {
        FormatResult::Success {
            path,
            was_conformant: true,
            ..
        } => {
            info!(file = %path.display(), "Valid formatting");
            FileOutcome::Success {
                path,
                was_conformant: true,
            }
        }
        FormatResult::Success {
            path,
            was_conformant: false,
            formatted,
        } => match mode {
            RunMode::Format => match fs::write(&path, &formatted) {
                Ok(()) => {
                    info!(file = %path.display(), "Reformatted");
                    FileOutcome::Success {
                        path,
                        was_conformant: false,
                    }
                }
                Err(e) => {
                    error!(file = %path.display(), error = %e, "Failed to rewrite file");
                    FileOutcome::Failure { path }
                }
            },
            RunMode::Check => {
                warn!(file = %path.display(), "Invalid formatting");
                match fs::read_to_string(&path) {
                    Ok(original) => {
                        diff::print_diff(&diff::compute_diff(&path, &original, &formatted));
                    }
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "Could not re-read file for diff")
                    }
                }
                FileOutcome::Success {
                    path,
                    was_conformant: false,
                }
            }
        },
        FormatResult::Failure { path, message } => {
            error!(file = %path.display(), reason = %message, "Failed to format file");
            FileOutcome::Failure { path }
        }
        FormatResult::Skipped { path, reason } => {
            info!(file = %path.display(), reason = %reason, "Skipping file");
            FileOutcome::Skipped { path }
        }
    }
}

/// Write one encoded outcome into a fresh, collision-free slot.
fn write_slot(scratch: &Path, outcome: &FileOutcome) -> Result<()> {
    let slot = scratch.join(format!("{}.txt", Uuid::new_v4()));
    fs::write(slot, outcome.encode())?;
    Ok(())
}

/// Read every slot back after the barrier. Decode errors abort the dispatch
/// rather than silently dropping a file.
fn read_slots(scratch: &Path) -> Result<Vec<FileOutcome>> {
    let mut outcomes = Vec::new();
    for entry in fs::read_dir(scratch)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        let content = fs::read_to_string(&path)?;
        outcomes.push(FileOutcome::decode(&content)?);
    }
    Ok(outcomes)
}
