//! Archive inspection.
//!
//! Prints one source's snapshot summary and its most recent messages.
//! Reads only the local archive, so it works offline.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::archive;
use crate::config::Config;
use crate::merge;
use crate::models::MessageRecord;

pub fn run_show(config: &Config, source_name: &str, last: usize) -> Result<()> {
    let sources = config.resolved_sources();
    let source = sources
        .iter()
        .find(|s| s.name == source_name)
        .ok_or_else(|| anyhow::anyhow!("Unknown source: '{}'", source_name))?;

    let records = archive::load(&source.path)?;

    println!("--- Archive {} ---", source.name);
    println!("channel:   {}", source.channel);
    println!("path:      {}", source.path.display());
    println!("records:   {}", records.len());
    match merge::high_watermark(&records) {
        Some(id) => println!("watermark: {}", id),
        None => println!("watermark: (empty)"),
    }
    if let (Some(oldest), Some(newest)) = (records.first(), records.last()) {
        println!(
            "span:      {} .. {}",
            format_ts(&oldest.timestamp),
            format_ts(&newest.timestamp)
        );
    }
    println!();

    let start = records.len().saturating_sub(last);
    println!("--- Last {} message(s) ---", records.len() - start);
    for record in &records[start..] {
        print_record(record);
    }

    Ok(())
}

fn print_record(record: &MessageRecord) {
    println!(
        "[{}] {} {}",
        record.id,
        format_ts(&record.timestamp),
        record.sender
    );
    for line in record.body.lines() {
        println!("  {}", line);
    }
    if let Some(media) = &record.media {
        println!("  ({}: {})", media.kind, media.locator);
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
