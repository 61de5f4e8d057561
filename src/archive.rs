//! Archive snapshot persistence.
//!
//! One JSON file per source holds the full ordered record sequence. `save`
//! never touches the live file directly: it writes a temporary sibling,
//! syncs it, and renames it into place, so a crash mid-write leaves the
//! previous snapshot readable.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::SyncError;
use crate::models::MessageRecord;

/// Load the persisted sequence for one source.
///
/// A missing file is an empty archive. Anything unreadable, unparseable, or
/// out of ascending-unique-id order is `CorruptArchive`.
pub fn load(path: &Path) -> Result<Vec<MessageRecord>, SyncError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(corrupt(path, format!("unreadable: {}", e))),
    };

    let records: Vec<MessageRecord> =
        serde_json::from_slice(&bytes).map_err(|e| corrupt(path, e.to_string()))?;

    for pair in records.windows(2) {
        if pair[1].id <= pair[0].id {
            return Err(corrupt(
                path,
                format!(
                    "record order violated: id {} follows id {}",
                    pair[1].id, pair[0].id
                ),
            ));
        }
    }

    Ok(records)
}

/// Atomically replace the archive for one source.
pub fn save(path: &Path, records: &[MessageRecord]) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| write_failure(path, e))?;
        }
    }

    let bytes = serde_json::to_vec_pretty(records).map_err(|e| write_failure(path, e.into()))?;

    let tmp = path.with_extension("tmp");
    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(write_failure(path, e));
    }
    Ok(())
}

fn corrupt(path: &Path, reason: String) -> SyncError {
    SyncError::CorruptArchive {
        path: path.to_path_buf(),
        reason,
    }
}

fn write_failure(path: &Path, source: std::io::Error) -> SyncError {
    SyncError::WriteFailure {
        path: path.to_path_buf(),
        source,
    }
}
