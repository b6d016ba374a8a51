//! CLI entry point for docwatch.
//!
//! Watches a Go source tree and keeps a JSON documentation index of it up to
//! date until interrupted.
//!
//! # Usage
//!
//! ```bash
//! docwatch [OPTIONS] <ROOT>
//!
//! # Aggregate index in ./reference.json
//! docwatch ./src
//!
//! # One JSON file per source file under ./out/references
//! docwatch ./src --mode mirror --output-dir ./out
//!
//! # Settings from a file, with a longer debounce window
//! docwatch ./src --config docwatch.json --debounce-ms 250
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use color_eyre::eyre::WrapErr;
use dw_core::{Config, DedupPolicy, OutputMode};
use dw_index::{RunSummary, WatchLoop};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Keeps a JSON documentation index of a Go source tree up to date.
///
/// Every `.go` file under ROOT is parsed for its package, imports, functions
/// and top-level variables. Files are re-parsed as they change.
#[derive(Debug, Parser)]
#[command(name = "docwatch", version, about, long_about = None)]
struct Cli {
    /// Root of the Go source tree to watch.
    root: Utf8PathBuf,

    /// JSON configuration file. Missing keys take their defaults.
    #[arg(short, long)]
    config: Option<Utf8PathBuf>,

    /// Shape of the index on disk.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// How repeated notifications for one file are suppressed.
    #[arg(long, value_enum)]
    dedup: Option<DedupArg>,

    /// Quiescence window for the windowed policy, in milliseconds.
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Directory receiving the index and the event log.
    #[arg(short, long)]
    output_dir: Option<Utf8PathBuf>,

    /// Skip indexing the whole tree before watching.
    #[arg(long)]
    no_initial_index: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
}

/// Index layout.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// One `reference.json` holding every file.
    Aggregate,
    /// One JSON file per source file under `references/`.
    Mirror,
}

impl From<ModeArg> for OutputMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Aggregate => Self::Aggregate,
            ModeArg::Mirror => Self::Mirror,
        }
    }
}

/// Duplicate-suppression policy.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum DedupArg {
    /// Drop an event identical to the one just accepted.
    Immediate,
    /// Wait for the file to settle before extracting.
    Windowed,
}

impl From<DedupArg> for DedupPolicy {
    fn from(policy: DedupArg) -> Self {
        match policy {
            DedupArg::Immediate => Self::Immediate,
            DedupArg::Windowed => Self::Windowed,
        }
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// The `notify` backend is filtered to `warn` level.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds a [`Config`] from the optional config file and the CLI overrides.
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded or the resulting
/// configuration is invalid.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .wrap_err_with(|| format!("Failed to load config file {path}"))?,
        None => Config::default(),
    };

    if let Some(mode) = cli.mode {
        config.output.mode = mode.into();
    }
    if let Some(policy) = cli.dedup {
        config.watch.dedup = policy.into();
    }
    if let Some(ms) = cli.debounce_ms {
        config.watch.debounce_ms = ms;
    }
    if let Some(dir) = &cli.output_dir {
        config.output.base_dir.clone_from(dir);
    }
    if cli.no_initial_index {
        config.extract.initial_index = false;
    }

    config.validate()?;
    Ok(config)
}

// =============================================================================
// SIGNAL HANDLING
// =============================================================================

/// Cancels `token` on SIGINT or SIGTERM.
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            () = wait_for_sigint() => info!("Received SIGINT"),
            () = wait_for_sigterm() => info!("Received SIGTERM"),
        }
        token.cancel();
    });
}

async fn wait_for_sigint() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(error = %error, "Cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(error) => {
            warn!(error = %error, "Cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await;
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints the end-of-run summary.
fn print_summary(summary: &RunSummary) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let stats = &summary.stats;

    let _ = writeln!(handle);
    let _ = writeln!(handle, "docwatch summary");
    let _ = writeln!(handle, "================");
    let _ = writeln!(handle, "Indexed files:      {}", summary.indexed_files);
    let _ = writeln!(handle, "Events received:    {}", stats.events_received);
    let _ = writeln!(handle, "  Accepted:         {}", stats.events_accepted);
    let _ = writeln!(
        handle,
        "  Suppressed:       {} ({:.1}%)",
        stats.events_suppressed,
        stats.suppression_percent()
    );
    let _ = writeln!(handle, "  Ignored:          {}", stats.events_ignored);
    let _ = writeln!(handle, "Extractions:        {}", stats.extractions());
    let _ = writeln!(handle, "  Failed:           {}", stats.extractions_failed);
    let _ = writeln!(handle, "  Stale:            {}", stats.stale_dropped);
    let _ = writeln!(handle, "Event log:          {}", summary.log_path);
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Assemble configuration and open the event log
    let config = build_config(&cli)?;
    info!(
        root = %cli.root,
        mode = ?config.output.mode,
        dedup = ?config.watch.dedup,
        "Starting docwatch"
    );
    let watch_loop = WatchLoop::new(config, &cli.root)?;

    // 5. Run until interrupted
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());
    let summary = watch_loop.run(cancel).await?;

    print_summary(&summary);
    Ok(())
}
