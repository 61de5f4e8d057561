//! Core data models used throughout ChatVault.
//!
//! These types represent the archived messages that flow through the fetch
//! and merge pipeline and define the on-disk snapshot format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One archived message, exactly as persisted in a source's snapshot.
///
/// `id` is assigned by the source platform; within a source it is unique and
/// monotonically increasing, and it is never generated locally. Fields the
/// platform sends that this struct does not model are carried verbatim in
/// `extra`, so they survive load/save round-trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    /// Opaque author reference (user or channel id), a back-reference only.
    pub sender: String,
    #[serde(default)]
    pub body: String,
    /// Attached media descriptor, if any. Binary payloads are never stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRef>,
    /// Source-specific fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Kind + locator for an attachment (e.g. `photo`, `document`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: String,
    pub locator: String,
}
