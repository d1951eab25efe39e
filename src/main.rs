//! batchfmt - parallel source format checker and rewriter
//!
//! Dispatches one isolated work unit per source file, gathers per-file
//! outcomes and reports which files do not conform to the configured style.

use anyhow::Result;
use batchfmt::{Cli, Command, Config, InclusionSpec, ResultSummary, RunMode, dispatch, scan};
use chrono::Local;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI output module
mod cli_output {
    //! Unified colors and formatting for command-line output.

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = style(value).with(color).bold();
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // The hidden worker subcommand handles exactly one file per process and
    // reports through the result-slot protocol, not stdout.
    if matches!(cli.command, Command::Worker) {
        run_worker()?;
        return Ok(ExitCode::SUCCESS);
    }

    // Failures surface as an exit code, not process::exit: the log guard
    // inside run_cli_mode must drop first, or the tail of the file log is
    // lost on exactly the runs worth reading.
    run_cli_mode(cli)
}

/// Subprocess worker: stderr-only logging, one job from stdin.
fn run_worker() -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    batchfmt::dispatch::run_worker_from_stdin()?;
    Ok(())
}

fn run_cli_mode(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;

    let Some(mode) = cli.run_mode() else {
        return Ok(ExitCode::SUCCESS);
    };

    let log_path = get_log_path(&config, &cli, mode);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "batchfmt starting");
    if cli.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    // Configure the shared pool; also bounds concurrent worker processes.
    if config.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build_global()
            .ok();
    }

    let spec = InclusionSpec::new(cli.include_only(), Some(config.exclusion_regex()?));
    if spec.has_include_only() {
        info!(include_only = cli.include_only(), "Restricting run to included files");
    }

    info!("Scanning source directories...");
    let files = scan::collect_files(&config, &spec)?;
    info!(count = files.len(), "Found source files");

    let outcomes = match dispatch(&files, &config, &spec, mode) {
        Ok(outcomes) => outcomes,
        Err(e) => {
            error!(error = %e, "Dispatch failed");
            eprintln!("Error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let summary = ResultSummary::from_outcomes(&outcomes);
    info!("{}", summary.pretty_print());
    print_summary(&summary, mode);

    let verdict = match mode {
        RunMode::Check => summary.check_verdict(&config.project_root),
        RunMode::Format => summary.format_verdict(),
    };
    write_report(&config, &summary, &verdict)?;

    match verdict {
        Ok(message) => {
            info!("{message}");
            cli_output::print_hint(&message);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            cli_output::print_separator();
            cli_output::print_error(&e.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Print the colored per-category summary.
fn print_summary(summary: &ResultSummary, mode: RunMode) {
    use cli_output::*;

    let invalid_label = match mode {
        RunMode::Check => "Not formatted",
        RunMode::Format => "Reformatted",
    };
    let invalid_color = match mode {
        RunMode::Check => CliTheme::WARNING,
        RunMode::Format => CliTheme::ACCENT,
    };

    print_separator();
    print_blank();
    print_stat(
        "Valid",
        &summary.valid_formatted.len().to_string(),
        CliTheme::SUCCESS,
    );
    print_stat(
        invalid_label,
        &summary.invalid_formatted.len().to_string(),
        invalid_color,
    );
    print_stat(
        "Skipped",
        &summary.skipped.len().to_string(),
        CliTheme::HINT,
    );
    print_stat(
        "Failed",
        &summary.failed.len().to_string(),
        CliTheme::ERROR,
    );
    print_blank();
}

/// Write the plain-text run report when one was requested.
fn write_report(
    config: &Config,
    summary: &ResultSummary,
    verdict: &batchfmt::Result<String>,
) -> Result<()> {
    let Some(report_path) = &config.report_file else {
        return Ok(());
    };

    let outcome_line = match verdict {
        Ok(message) => message.clone(),
        Err(e) => e.to_string(),
    };
    let content = format!("{}\n{}\n", summary.pretty_print(), outcome_line);

    if let Some(parent) = report_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(report_path, content)?;
    info!(report = %report_path.display(), "Wrote run report");
    Ok(())
}

/// Determine the log file path under the project's build directory.
fn get_log_path(config: &Config, cli: &Cli, mode: RunMode) -> PathBuf {
    let log_dir = config.project_root.join("build").join("batchfmt");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let mode_name = match mode {
        RunMode::Check => "Check",
        RunMode::Format => "Format",
    };

    if let Some(config_name) = cli.config_name() {
        log_dir.join(format!("{}_{}_{}.log", config_name, mode_name, timestamp))
    } else {
        log_dir.join(format!("{}_{}.log", mode_name, timestamp))
    }
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        cli.merge_with_config(Config::load_from_file(config_path)?)
    } else {
        let root = cli
            .project_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let default_path = root.join("batchfmt.toml");
        if default_path.exists() {
            cli.merge_with_config(Config::load_from_file(&default_path)?)
        } else {
            cli.to_config()
        }
    };

    if config.source_dirs.is_empty() {
        anyhow::bail!("No source directories configured");
    }

    Ok(config)
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(Some(guard))
}
