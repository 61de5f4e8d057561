//! HTTP gateway client.
//!
//! Talks to a bearer-token message gateway: `GET /v1/me` verifies the
//! session, `GET /v1/channels/{channel}/messages?limit=N[&before=anchor]`
//! pages through history newest-first. The channel reference is
//! percent-encoded as a single path segment. The gateway answers with
//! `{ "messages": [...], "has_more": bool }`.
//!
//! Status mapping:
//! - HTTP 429 → rate limited (honoring a `Retry-After` value in seconds)
//! - HTTP 5xx → server error (retryable)
//! - HTTP 401/403 → session rejected (fatal)
//! - HTTP 404 → unknown channel (fatal)
//! - other non-2xx → request error (fatal)

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::client::{ClientError, Page, SourceClient};
use crate::config::{ClientConfig, FetchConfig};
use crate::models::MessageRecord;

pub struct HttpSourceClient {
    http: reqwest::Client,
    base: reqwest::Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PagePayload {
    messages: Vec<MessageRecord>,
    #[serde(default)]
    has_more: bool,
}

impl HttpSourceClient {
    /// Build the client from configuration.
    ///
    /// The bearer token is read from the environment variable named by
    /// `client.token_env`; construction fails if it is not set.
    pub fn new(client: &ClientConfig, fetch: &FetchConfig) -> Result<Self> {
        let token = match std::env::var(&client.token_env) {
            Ok(t) if !t.is_empty() => t,
            _ => bail!("{} environment variable not set", client.token_env),
        };

        let base = parse_base_url(&client.base_url)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .build()?;

        Ok(Self { http, base, token })
    }

    /// Join percent-encoded path segments onto the base URL.
    fn endpoint(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base.clone();
        // new() rejects cannot-be-a-base URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn page_request(
        &self,
        channel: &str,
        anchor: Option<i64>,
        page_size: u32,
    ) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .get(self.endpoint(&["v1", "channels", channel, "messages"]))
            .query(&[("limit", page_size)])
            .bearer_auth(&self.token);
        if let Some(a) = anchor {
            request = request.query(&[("before", a)]);
        }
        request
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    async fn authenticate(&self) -> Result<(), ClientError> {
        let resp = self
            .http
            .get(self.endpoint(&["v1", "me"]))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        if (200..300).contains(&status) {
            return Ok(());
        }
        if status == 401 || status == 403 {
            return Err(ClientError::Session(format!(
                "token rejected (HTTP {})",
                status
            )));
        }
        let message = resp.text().await.unwrap_or_default();
        Err(ClientError::Request { status, message })
    }

    async fn list_messages(
        &self,
        channel: &str,
        anchor: Option<i64>,
        page_size: u32,
    ) -> Result<Page, ClientError> {
        let resp = self
            .page_request(channel, anchor, page_size)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let retry_after = parse_retry_after(
                resp.headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok()),
            );
            let message = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, channel, retry_after, message));
        }

        let payload: PagePayload = resp
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(Page {
            messages: payload.messages,
            has_more: payload.has_more,
        })
    }
}

/// Map a non-2xx listing status to the client error taxonomy.
fn classify_status(
    status: u16,
    channel: &str,
    retry_after_secs: Option<u64>,
    message: String,
) -> ClientError {
    match status {
        429 => ClientError::RateLimited { retry_after_secs },
        500..=599 => ClientError::Server(status),
        401 | 403 => ClientError::Session(format!("token rejected (HTTP {})", status)),
        404 => ClientError::UnknownChannel(channel.to_string()),
        _ => ClientError::Request { status, message },
    }
}

/// Parse a `Retry-After` header value given in whole seconds.
fn parse_retry_after(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.trim().parse::<u64>().ok())
}

/// Parse and validate the configured gateway base URL.
fn parse_base_url(raw: &str) -> Result<reqwest::Url> {
    let base = reqwest::Url::parse(raw)
        .with_context(|| format!("Invalid client.base_url: '{}'", raw))?;
    if base.cannot_be_a_base() {
        bail!("Invalid client.base_url: '{}'. Must be an absolute http(s) URL.", raw);
    }
    Ok(base)
}
