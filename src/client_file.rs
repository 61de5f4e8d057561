//! Local feed client.
//!
//! Serves `<feed_root>/<channel>.json` (a JSON array of message records, in
//! any order) with the same newest-first, exclusive-anchor paging as the
//! HTTP client. Used for offline imports and end-to-end tests.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::client::{ClientError, Page, SourceClient};
use crate::models::MessageRecord;

pub struct FileSourceClient {
    root: PathBuf,
}

impl FileSourceClient {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn read_feed(&self, channel: &str) -> Result<Vec<MessageRecord>, ClientError> {
        let path = self.root.join(format!("{}.json", channel));
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ClientError::UnknownChannel(channel.to_string()))
            }
            Err(e) => return Err(ClientError::Transport(e.to_string())),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::Decode(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl SourceClient for FileSourceClient {
    async fn authenticate(&self) -> Result<(), ClientError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(ClientError::Session(format!(
                "feed root does not exist: {}",
                self.root.display()
            )))
        }
    }

    async fn list_messages(
        &self,
        channel: &str,
        anchor: Option<i64>,
        page_size: u32,
    ) -> Result<Page, ClientError> {
        let mut newest_first = self.read_feed(channel)?;
        newest_first.sort_by(|a, b| b.id.cmp(&a.id));
        newest_first.retain(|r| anchor.map_or(true, |a| r.id < a));
        let remaining = newest_first.len();
        newest_first.truncate(page_size as usize);
        Ok(Page {
            has_more: remaining > newest_first.len(),
            messages: newest_first,
        })
    }
}
