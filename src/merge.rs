//! Watermark derivation and snapshot merging.
//!
//! The watermark (highest archived id) is the only signal for what counts
//! as new; sender-reported timestamps are not monotonic or unique, platform
//! ids are. Merging appends the fetched batch in ascending order after
//! checking that it lies strictly above the watermark. An inconsistent
//! batch aborts the merge instead of being sorted or deduplicated, so
//! cursor bugs and inconsistent sources surface as errors.

use crate::error::SyncError;
use crate::models::MessageRecord;

/// Highest id present, or `None` for an empty archive.
pub fn high_watermark(records: &[MessageRecord]) -> Option<i64> {
    records.iter().map(|r| r.id).max()
}

/// Append `fetched` (newest first) to `existing` (ascending), returning the
/// next snapshot in ascending order.
///
/// Every fetched id must be strictly greater than the watermark of
/// `existing`, and `fetched` must be strictly descending. Together these
/// rule out duplicates without any dedup pass.
pub fn merge(
    existing: Vec<MessageRecord>,
    fetched: Vec<MessageRecord>,
) -> Result<Vec<MessageRecord>, SyncError> {
    let watermark = high_watermark(&existing);

    let mut previous: Option<i64> = None;
    for record in &fetched {
        if let Some(w) = watermark {
            if record.id <= w {
                return Err(SyncError::MergeInvariantViolation {
                    id: record.id,
                    detail: format!("does not exceed archive watermark {}", w),
                });
            }
        }
        if let Some(p) = previous {
            if record.id >= p {
                return Err(SyncError::MergeInvariantViolation {
                    id: record.id,
                    detail: format!("fetched batch not newest-first (follows id {})", p),
                });
            }
        }
        previous = Some(record.id);
    }

    let mut merged = existing;
    merged.reserve(fetched.len());
    merged.extend(fetched.into_iter().rev());
    Ok(merged)
}
