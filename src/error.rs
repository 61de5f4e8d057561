//! Error taxonomy for the synchronization pipeline.
//!
//! Every per-source failure folds into one of these four kinds. The
//! orchestrator catches them at the source boundary and reports them with
//! the source name; none of them aborts the whole run.

use std::path::PathBuf;

use crate::client::ClientError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The persisted archive could not be read, parsed, or fails the
    /// ascending-unique-id invariant. The file is left untouched; recovery
    /// is an explicit `sync <source> --full`.
    #[error("corrupt archive {path}: {reason}")]
    CorruptArchive { path: PathBuf, reason: String },

    /// The source could not be reached within the retry budget, or answered
    /// with a non-retryable client error.
    #[error("source unavailable after {attempts} attempt(s): {source}")]
    SourceUnavailable {
        attempts: u32,
        #[source]
        source: ClientError,
    },

    /// A fetched id did not line up with the archive watermark or the batch
    /// order. Signals a cursor bug or inconsistent source data; the merge
    /// aborts rather than sorting or deduplicating.
    #[error("merge invariant violated for id {id}: {detail}")]
    MergeInvariantViolation { id: i64, detail: String },

    /// Persisting the merged snapshot failed. The previous snapshot is
    /// still intact on disk.
    #[error("failed to write archive {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Short kind label used in run summaries and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::CorruptArchive { .. } => "corrupt archive",
            SyncError::SourceUnavailable { .. } => "source unavailable",
            SyncError::MergeInvariantViolation { .. } => "merge invariant violation",
            SyncError::WriteFailure { .. } => "write failure",
        }
    }
}
