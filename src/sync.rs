//! Sync orchestration.
//!
//! Coordinates the full archive flow per source: load snapshot → compute
//! watermark → fetch newer messages → merge → persist. Sources are isolated
//! from each other: one failing source never blocks or corrupts the rest,
//! and the run reports per-source outcomes at the end.

use anyhow::{Context, Result};

use crate::archive;
use crate::client::SourceClient;
use crate::config::{Config, FetchConfig, SourceDescriptor};
use crate::error::SyncError;
use crate::fetch;
use crate::merge;
use crate::progress::SyncProgressReporter;

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Ignore the existing snapshot and re-archive the full history.
    pub full: bool,
    /// Fetch and report, but write nothing.
    pub dry_run: bool,
    /// Cap on new messages per source, newest first.
    pub limit: Option<usize>,
}

/// How one source's sync ended.
#[derive(Debug)]
pub enum SourceOutcome {
    Synced {
        fetched: usize,
        total: usize,
        watermark: Option<i64>,
        retries: u32,
    },
    Failed(SyncError),
}

#[derive(Debug)]
pub struct SourceReport {
    pub source: SourceDescriptor,
    pub outcome: SourceOutcome,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<SourceReport>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, SourceOutcome::Synced { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }

    pub fn all_ok(&self) -> bool {
        self.failed() == 0
    }
}

pub async fn run_sync(
    config: &Config,
    client: &dyn SourceClient,
    selector: &str,
    opts: &SyncOptions,
    progress: &dyn SyncProgressReporter,
) -> Result<RunSummary> {
    let sources = config.select_sources(selector)?;
    if sources.is_empty() {
        println!("No sources configured.");
        return Ok(RunSummary::default());
    }

    client
        .authenticate()
        .await
        .context("Failed to establish source session")?;

    let mut reports = Vec::with_capacity(sources.len());
    for source in sources {
        tracing::debug!(source = %source.name, channel = %source.channel, "syncing source");
        let outcome = match sync_source(client, &source, &config.fetch, opts, progress).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(source = %source.name, kind = err.kind(), "source failed: {}", err);
                SourceOutcome::Failed(err)
            }
        };
        print_outcome(&source, &outcome, opts.dry_run);
        reports.push(SourceReport { source, outcome });
    }

    let summary = RunSummary { reports };
    println!(
        "{} source(s) synced, {} failed",
        summary.succeeded(),
        summary.failed()
    );
    if summary.all_ok() {
        println!("ok");
    }
    Ok(summary)
}

async fn sync_source(
    client: &dyn SourceClient,
    source: &SourceDescriptor,
    fetch_config: &FetchConfig,
    opts: &SyncOptions,
    progress: &dyn SyncProgressReporter,
) -> Result<SourceOutcome, SyncError> {
    // --full skips the load entirely, which doubles as the recovery path
    // for a corrupt snapshot.
    let existing = if opts.full {
        Vec::new()
    } else {
        archive::load(&source.path)?
    };
    let watermark = merge::high_watermark(&existing);

    let outcome =
        fetch::fetch_new(client, source, watermark, fetch_config, opts.limit, progress).await?;
    let fetched = outcome.records.len();
    let retries = outcome.retries;

    if opts.dry_run {
        let new_watermark = outcome.records.first().map(|r| r.id).or(watermark);
        return Ok(SourceOutcome::Synced {
            fetched,
            total: existing.len() + fetched,
            watermark: new_watermark,
            retries,
        });
    }

    let had_snapshot = source.path.exists();
    let merged = merge::merge(existing, outcome.records)?;

    // Nothing new and a snapshot already on disk: skip the rewrite so an
    // up-to-date run leaves the file untouched.
    if opts.full || fetched > 0 || !had_snapshot {
        archive::save(&source.path, &merged)?;
    }

    Ok(SourceOutcome::Synced {
        fetched,
        total: merged.len(),
        watermark: merge::high_watermark(&merged),
        retries,
    })
}

fn print_outcome(source: &SourceDescriptor, outcome: &SourceOutcome, dry_run: bool) {
    match outcome {
        SourceOutcome::Synced {
            fetched,
            total,
            watermark,
            retries,
        } => {
            if dry_run {
                println!("sync {} (dry-run)", source.name);
            } else {
                println!("sync {}", source.name);
            }
            println!("  new messages: {}", fetched);
            println!("  archived total: {}", total);
            match watermark {
                Some(id) => println!("  watermark: {}", id),
                None => println!("  watermark: (empty)"),
            }
            if *retries > 0 {
                println!("  retries: {}", retries);
            }
        }
        SourceOutcome::Failed(err) => {
            println!("sync {}", source.name);
            println!("  failed: {}", err);
        }
    }
}
