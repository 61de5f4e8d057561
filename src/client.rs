//! The source client seam.
//!
//! The sync pipeline depends only on [`SourceClient`]: one authenticated
//! session per run, plus a paginated, newest-first message listing. Concrete
//! implementations live in [`client_http`](crate::client_http) and
//! [`client_file`](crate::client_file).

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::models::MessageRecord;

/// One bounded batch of messages from a single client request.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Newest first. When an anchor was given, strictly older than it.
    pub messages: Vec<MessageRecord>,
    /// Whether the source reports more (older) messages past this page.
    pub has_more: bool,
}

/// Errors surfaced by a source client.
///
/// [`is_transient`](ClientError::is_transient) splits the kinds the fetch
/// cursor may retry from those that fail the source immediately.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The platform asked us to slow down, optionally saying for how long.
    #[error("rate limited by source")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Connection-level failure (DNS, reset, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The platform answered with a server-side error.
    #[error("server error: HTTP {0}")]
    Server(u16),

    /// The session could not be established or was rejected.
    #[error("session error: {0}")]
    Session(String),

    /// The channel reference does not exist on the platform.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// The response arrived but could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),

    /// Any other definitive rejection from the platform.
    #[error("request failed: HTTP {status}: {message}")]
    Request { status: u16, message: String },
}

impl ClientError {
    /// Whether the fetch cursor should retry this error with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::RateLimited { .. } | ClientError::Transport(_) | ClientError::Server(_)
        )
    }

    /// Server-suggested delay, if the platform provided one.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            ClientError::RateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        }
    }
}

/// A live connection to the chat platform.
///
/// The CLI constructs one client per run; the orchestrator authenticates it
/// once and then pulls pages serially. Listing takes `&self` so the same
/// session can serve every source.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Establish or verify the session. Called once, before any listing.
    async fn authenticate(&self) -> Result<(), ClientError>;

    /// List up to `page_size` messages of `channel`, newest first, strictly
    /// older than `anchor` when one is given. An empty page means the
    /// history is exhausted.
    async fn list_messages(
        &self,
        channel: &str,
        anchor: Option<i64>,
        page_size: u32,
    ) -> Result<Page, ClientError>;
}

/// Build the configured client kind.
pub fn from_config(config: &Config) -> Result<Box<dyn SourceClient>> {
    match config.client.kind.as_str() {
        "http" => {
            if config.client.base_url.is_empty() {
                anyhow::bail!("client.base_url must be set when client.kind is 'http'");
            }
            Ok(Box::new(crate::client_http::HttpSourceClient::new(
                &config.client,
                &config.fetch,
            )?))
        }
        "file" => {
            let root = config.client.feed_root.clone().ok_or_else(|| {
                anyhow::anyhow!("client.feed_root must be set when client.kind is 'file'")
            })?;
            Ok(Box::new(crate::client_file::FileSourceClient::new(root)))
        }
        other => anyhow::bail!("Unknown client kind: '{}'. Must be http or file.", other),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable in-memory client for exercising the fetch cursor.

    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct State {
        channels: BTreeMap<String, Vec<MessageRecord>>,
        failures: VecDeque<ClientError>,
        failures_at: BTreeMap<usize, ClientError>,
        pages_at: BTreeMap<usize, Page>,
        fail_auth: bool,
        anchors: Vec<Option<i64>>,
    }

    /// Serves scripted channels with the real paging semantics and lets
    /// tests inject errors or fixed pages at chosen calls.
    #[derive(Default)]
    pub struct ScriptedClient {
        state: Mutex<State>,
    }

    impl ScriptedClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_channel(self, name: &str, records: Vec<MessageRecord>) -> Self {
            self.set_channel(name, records);
            self
        }

        pub fn set_channel(&self, name: &str, records: Vec<MessageRecord>) {
            self.state
                .lock()
                .unwrap()
                .channels
                .insert(name.to_string(), records);
        }

        /// Queue an error to be returned before the next successful page.
        pub fn fail_next(&self, err: ClientError) {
            self.state.lock().unwrap().failures.push_back(err);
        }

        /// Fail the n-th `list_messages` call (zero-based) with `err`.
        pub fn fail_on_call(&self, call: usize, err: ClientError) {
            self.state.lock().unwrap().failures_at.insert(call, err);
        }

        /// Serve a fixed page for the n-th `list_messages` call (zero-based)
        /// instead of reading the channel.
        pub fn respond_on_call(&self, call: usize, page: Page) {
            self.state.lock().unwrap().pages_at.insert(call, page);
        }

        pub fn fail_auth(&self) {
            self.state.lock().unwrap().fail_auth = true;
        }

        /// The anchor of every `list_messages` call, in order.
        pub fn anchors(&self) -> Vec<Option<i64>> {
            self.state.lock().unwrap().anchors.clone()
        }
    }

    #[async_trait]
    impl SourceClient for ScriptedClient {
        async fn authenticate(&self) -> Result<(), ClientError> {
            if self.state.lock().unwrap().fail_auth {
                return Err(ClientError::Session("scripted auth failure".to_string()));
            }
            Ok(())
        }

        async fn list_messages(
            &self,
            channel: &str,
            anchor: Option<i64>,
            page_size: u32,
        ) -> Result<Page, ClientError> {
            let mut state = self.state.lock().unwrap();
            let call = state.anchors.len();
            state.anchors.push(anchor);
            if let Some(err) = state.failures_at.remove(&call) {
                return Err(err);
            }
            if let Some(err) = state.failures.pop_front() {
                return Err(err);
            }
            if let Some(page) = state.pages_at.remove(&call) {
                return Ok(page);
            }
            let records = state
                .channels
                .get(channel)
                .ok_or_else(|| ClientError::UnknownChannel(channel.to_string()))?;
            let mut newest_first: Vec<MessageRecord> = records
                .iter()
                .filter(|r| anchor.map_or(true, |a| r.id < a))
                .cloned()
                .collect();
            newest_first.sort_by(|a, b| b.id.cmp(&a.id));
            let remaining = newest_first.len();
            newest_first.truncate(page_size as usize);
            Ok(Page {
                has_more: remaining > newest_first.len(),
                messages: newest_first,
            })
        }
    }
}
