//! Sync progress reporting.
//!
//! Reports observable progress during `cvault sync` so users see how far a
//! source's history walk has gotten and when the client is backing off.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for sync.
#[derive(Clone, Debug)]
pub enum SyncProgressEvent {
    /// A page landed: running count of new messages pulled so far.
    Fetched {
        source: String,
        messages: u64,
        pages: u32,
    },
    /// A transient error triggered a backoff before the next attempt.
    Backoff {
        source: String,
        attempt: u32,
        delay_secs: u64,
    },
}

/// Reports sync progress. Implementations write to stderr (human or JSON).
pub trait SyncProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the fetch loop.
    fn report(&self, event: SyncProgressEvent);
}

/// Human-friendly progress on stderr: "sync alpha  fetched 1,234 messages (page 13)".
pub struct StderrProgress;

impl SyncProgressReporter for StderrProgress {
    fn report(&self, event: SyncProgressEvent) {
        let line = match &event {
            SyncProgressEvent::Fetched {
                source,
                messages,
                pages,
            } => {
                format!(
                    "sync {}  fetched {} messages (page {})\n",
                    source,
                    format_number(*messages),
                    pages
                )
            }
            SyncProgressEvent::Backoff {
                source,
                attempt,
                delay_secs,
            } => {
                format!(
                    "sync {}  backing off {}s (attempt {})\n",
                    source, delay_secs, attempt
                )
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl SyncProgressReporter for JsonProgress {
    fn report(&self, event: SyncProgressEvent) {
        let obj = match &event {
            SyncProgressEvent::Fetched {
                source,
                messages,
                pages,
            } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "fetching",
                "messages": messages,
                "pages": pages
            }),
            SyncProgressEvent::Backoff {
                source,
                attempt,
                delay_secs,
            } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "backoff",
                "attempt": attempt,
                "delay_secs": delay_secs
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl SyncProgressReporter for NoProgress {
    fn report(&self, _event: SyncProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller can pass it to sync.
    pub fn reporter(&self) -> Box<dyn SyncProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
