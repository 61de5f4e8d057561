//! Export the combined archive as a single JSON document.
//!
//! Produces one chronologically-ordered stream across every configured
//! source, suitable for piping into other tools or publishing a backup.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::archive;
use crate::config::Config;
use crate::models::MessageRecord;

#[derive(Serialize)]
struct ExportData {
    generated_at: String,
    sources: usize,
    messages: Vec<ExportedMessage>,
}

#[derive(Serialize)]
struct ExportedMessage {
    source: String,
    #[serde(flatten)]
    record: MessageRecord,
}

/// Export every source's archive as one JSON stream.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping. Sources whose snapshot cannot be read are
/// skipped with a warning rather than failing the export.
pub fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let sources = config.resolved_sources();
    let mut exported = 0usize;
    let mut messages: Vec<ExportedMessage> = Vec::new();

    for source in &sources {
        match archive::load(&source.path) {
            Ok(records) => {
                messages.extend(records.into_iter().map(|record| ExportedMessage {
                    source: source.name.clone(),
                    record,
                }));
                exported += 1;
            }
            Err(err) => {
                eprintln!("Skipping {}: {}", source.name, err);
            }
        }
    }

    messages.sort_by(|a, b| {
        (a.record.timestamp, &a.source, a.record.id).cmp(&(
            b.record.timestamp,
            &b.source,
            b.record.id,
        ))
    });

    let message_count = messages.len();
    let data = ExportData {
        generated_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        sources: exported,
        messages,
    };
    let json = serde_json::to_string_pretty(&data)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            eprintln!(
                "Exported {} messages from {} source(s) to {}",
                message_count,
                exported,
                path.display()
            );
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}
