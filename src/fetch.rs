//! The fetch cursor.
//!
//! Pulls a source's history newest-to-oldest in bounded pages, anchored at
//! the last-seen id, and stops at the first record at or below the archive
//! watermark. Transient client errors are retried with bounded exponential
//! backoff; a server-suggested retry-after wins over the computed delay.

use std::time::Duration;

use crate::client::{Page, SourceClient};
use crate::config::{FetchConfig, SourceDescriptor};
use crate::error::SyncError;
use crate::models::MessageRecord;
use crate::progress::{SyncProgressEvent, SyncProgressReporter};

/// What one source's fetch produced.
#[derive(Debug)]
pub struct FetchOutcome {
    /// New records, newest first, all strictly above the watermark.
    pub records: Vec<MessageRecord>,
    pub pages: u32,
    pub retries: u32,
}

/// Fetch every message of `source` newer than `watermark`.
///
/// With no watermark (first run) this walks the full history until the
/// source reports exhaustion. `limit` caps the number of records taken,
/// newest first.
pub async fn fetch_new(
    client: &dyn SourceClient,
    source: &SourceDescriptor,
    watermark: Option<i64>,
    fetch: &FetchConfig,
    limit: Option<usize>,
    progress: &dyn SyncProgressReporter,
) -> Result<FetchOutcome, SyncError> {
    let mut records: Vec<MessageRecord> = Vec::new();
    let mut anchor: Option<i64> = None;
    let mut pages = 0u32;
    let mut retries = 0u32;

    loop {
        if limit.map_or(false, |l| records.len() >= l) {
            break;
        }
        let page = request_page(client, source, anchor, fetch, &mut retries, progress).await?;
        pages += 1;

        if page.messages.is_empty() {
            break;
        }

        let mut done = !page.has_more;
        for record in page.messages {
            if watermark.map_or(false, |w| record.id <= w) {
                // The boundary is exclusive: this record and everything
                // older than it is already archived.
                done = true;
                break;
            }
            anchor = Some(record.id);
            records.push(record);
            if limit.map_or(false, |l| records.len() >= l) {
                done = true;
                break;
            }
        }

        progress.report(SyncProgressEvent::Fetched {
            source: source.name.clone(),
            messages: records.len() as u64,
            pages,
        });

        if done {
            break;
        }
        if fetch.throttle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(fetch.throttle_ms)).await;
        }
    }

    Ok(FetchOutcome {
        records,
        pages,
        retries,
    })
}

/// One page request with the per-request retry budget applied.
async fn request_page(
    client: &dyn SourceClient,
    source: &SourceDescriptor,
    anchor: Option<i64>,
    fetch: &FetchConfig,
    retries: &mut u32,
    progress: &dyn SyncProgressReporter,
) -> Result<Page, SyncError> {
    let mut attempt = 0u32;
    loop {
        match client
            .list_messages(&source.channel, anchor, fetch.page_size)
            .await
        {
            Ok(page) => return Ok(page),
            Err(err) if err.is_transient() && attempt < fetch.max_retries => {
                attempt += 1;
                *retries += 1;
                let delay = err
                    .retry_after_secs()
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| backoff_delay(fetch.backoff_base_secs, attempt));
                tracing::warn!(
                    source = %source.name,
                    attempt,
                    delay_secs = delay.as_secs(),
                    "transient source error, backing off: {}",
                    err
                );
                progress.report(SyncProgressEvent::Backoff {
                    source: source.name.clone(),
                    attempt,
                    delay_secs: delay.as_secs(),
                });
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                return Err(SyncError::SourceUnavailable {
                    attempts: attempt + 1,
                    source: err,
                });
            }
        }
    }
}

/// Shifted exponential: base, 2*base, 4*base, ... capped at 60s.
fn backoff_delay(base_secs: u64, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(5);
    Duration::from_secs(base_secs.saturating_mul(1 << shift).min(60))
}
