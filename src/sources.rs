use anyhow::Result;

use crate::archive;
use crate::config::Config;
use crate::error::SyncError;
use crate::merge;

/// Print a table of configured sources and their archive state.
pub fn list_sources(config: &Config) -> Result<()> {
    let sources = config.resolved_sources();
    if sources.is_empty() {
        println!("No sources configured.");
        return Ok(());
    }

    println!(
        "{:<20} {:<24} {:>8} {:>12}  STATUS",
        "SOURCE", "CHANNEL", "RECORDS", "WATERMARK"
    );
    for source in sources {
        match archive::load(&source.path) {
            Ok(records) => {
                let watermark = merge::high_watermark(&records)
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let status = if records.is_empty() { "empty" } else { "ok" };
                println!(
                    "{:<20} {:<24} {:>8} {:>12}  {}",
                    source.name,
                    source.channel,
                    records.len(),
                    watermark,
                    status
                );
            }
            Err(SyncError::CorruptArchive { .. }) => {
                println!(
                    "{:<20} {:<24} {:>8} {:>12}  corrupt",
                    source.name, source.channel, "-", "-"
                );
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
