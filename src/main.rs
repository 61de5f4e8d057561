//! # ChatVault CLI (`cvault`)
//!
//! The `cvault` binary is the interface for ChatVault. It archives
//! configured chat channels into local JSON snapshots and inspects or
//! exports what has been archived.
//!
//! ## Usage
//!
//! ```bash
//! cvault --config ./config/cvault.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cvault sync <source>` | Archive new messages for a source (or `all`) |
//! | `cvault sources` | List configured sources and their archive state |
//! | `cvault show <source>` | Print a source's newest archived messages |
//! | `cvault export` | Combined chronological JSON export of every archive |
//!
//! ## Examples
//!
//! ```bash
//! # Archive everything configured
//! cvault sync all --config ./config/cvault.toml
//!
//! # Preview what a sync would fetch, without writing
//! cvault sync team --dry-run
//!
//! # Re-archive a source from scratch (recovers a corrupt snapshot)
//! cvault sync team --full
//!
//! # Inspect the newest 20 messages of one archive
//! cvault show team --last 20
//!
//! # Export all archives to one file
//! cvault export --output backup.json
//! ```
//!
//! Progress and diagnostics go to stderr so stdout stays parseable.
//! Structured diagnostics are opt-in via `RUST_LOG` (e.g.
//! `RUST_LOG=chatvault=debug`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use chatvault::client;
use chatvault::config;
use chatvault::export;
use chatvault::progress::ProgressMode;
use chatvault::show;
use chatvault::sources;
use chatvault::sync::{self, SyncOptions};

/// Command-line interface for ChatVault, an incremental archiver for
/// chat history.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cvault.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cvault",
    about = "ChatVault — an incremental archiver for chat history",
    version,
    long_about = "ChatVault mirrors the messages of configured chat channels into local JSON \
    snapshots, one per source. Syncs are incremental: each run fetches only the messages the \
    backend accumulated since the last run and appends them atomically."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cvault.toml`. Archive location, fetch tuning,
    /// client selection, and sources are read from this file.
    #[arg(long, global = true, default_value = "./config/cvault.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Archive new messages for a source.
    ///
    /// Loads the source's snapshot, fetches everything newer than its
    /// watermark from the backend, and appends the new messages
    /// atomically. Sources are synced independently: one failure does
    /// not stop the rest, and the exit code is nonzero if any failed.
    Sync {
        /// Source name from the config, or `all`.
        source: String,

        /// Ignore the existing snapshot and re-archive the full history.
        #[arg(long)]
        full: bool,

        /// Fetch and report counts without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of new messages to archive, newest first.
        #[arg(long)]
        limit: Option<usize>,

        /// Progress on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a terminal, else `off`.
        #[arg(long)]
        progress: Option<String>,
    },

    /// List configured sources and their archive state.
    ///
    /// Shows each source's record count and watermark, and flags
    /// snapshots that can no longer be read.
    Sources,

    /// Print a source's newest archived messages.
    ///
    /// Reads only the local snapshot; no network access.
    Show {
        /// Source name from the config.
        source: String,

        /// How many of the newest messages to print.
        #[arg(long, default_value_t = 10)]
        last: usize,
    },

    /// Export every archive as one chronological JSON stream.
    ///
    /// Messages from all sources are interleaved by timestamp and
    /// tagged with their source name. Unreadable snapshots are skipped
    /// with a warning.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sync {
            source,
            full,
            dry_run,
            limit,
            progress,
        } => {
            let mode = match progress.as_deref() {
                None => ProgressMode::default_for_tty(),
                Some("off") => ProgressMode::Off,
                Some("human") => ProgressMode::Human,
                Some("json") => ProgressMode::Json,
                Some(other) => {
                    anyhow::bail!(
                        "Unknown progress mode: '{}'. Must be off, human, or json.",
                        other
                    )
                }
            };
            let reporter = mode.reporter();
            let client = client::from_config(&cfg)?;
            let opts = SyncOptions {
                full,
                dry_run,
                limit,
            };
            let summary =
                sync::run_sync(&cfg, client.as_ref(), &source, &opts, reporter.as_ref()).await?;
            if !summary.all_ok() {
                anyhow::bail!("{} source(s) failed", summary.failed());
            }
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Show { source, last } => {
            show::run_show(&cfg, &source, last)?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref())?;
        }
    }

    Ok(())
}
