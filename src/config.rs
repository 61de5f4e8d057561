use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    /// Directory snapshots live under. Relative source paths resolve here.
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    /// Pause between pages, in milliseconds. 0 disables throttling.
    #[serde(default)]
    pub throttle_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_retries: 5,
            backoff_base_secs: 2,
            throttle_ms: 0,
            timeout_secs: 30,
        }
    }
}

fn default_page_size() -> u32 {
    100
}
fn default_max_retries() -> u32 {
    5
}
fn default_backoff_base_secs() -> u64 {
    2
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Which client talks to the source: "http" or "file".
    #[serde(default = "default_client_kind")]
    pub kind: String,
    #[serde(default)]
    pub base_url: String,
    /// Environment variable holding the API token for the http client.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Directory of per-channel JSON feeds for the file client.
    #[serde(default)]
    pub feed_root: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            kind: "http".to_string(),
            base_url: String::new(),
            token_env: "CHATVAULT_TOKEN".to_string(),
            feed_root: None,
        }
    }
}

fn default_client_kind() -> String {
    "http".to_string()
}
fn default_token_env() -> String {
    "CHATVAULT_TOKEN".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Channel identifier the client passes to the backend.
    pub channel: String,
    /// Snapshot path override. Relative paths resolve under archive.root.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// A configured source with its archive path resolved.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub name: String,
    pub channel: String,
    pub path: PathBuf,
}

impl Config {
    /// All configured sources in name order, with resolved snapshot paths.
    pub fn resolved_sources(&self) -> Vec<SourceDescriptor> {
        self.sources
            .iter()
            .map(|(name, source)| SourceDescriptor {
                name: name.clone(),
                channel: source.channel.clone(),
                path: self.archive_path(name, source),
            })
            .collect()
    }

    /// Resolve a sync selector: "all" or a configured source name.
    pub fn select_sources(&self, selector: &str) -> Result<Vec<SourceDescriptor>> {
        let all = self.resolved_sources();
        if selector == "all" {
            return Ok(all);
        }
        match all.into_iter().find(|s| s.name == selector) {
            Some(source) => Ok(vec![source]),
            None => {
                let known: Vec<&str> = self.sources.keys().map(String::as_str).collect();
                let known = if known.is_empty() {
                    "(none)".to_string()
                } else {
                    known.join(", ")
                };
                anyhow::bail!("Unknown source: '{}'. Configured sources: {}", selector, known)
            }
        }
    }

    fn archive_path(&self, name: &str, source: &SourceConfig) -> PathBuf {
        match &source.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.archive.root.join(path),
            None => self
                .archive
                .root
                .join(format!("{}.json", sanitize_name(name))),
        }
    }
}

/// Make a source name safe as a filename stem.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.fetch.page_size == 0 {
        anyhow::bail!("fetch.page_size must be > 0");
    }

    match config.client.kind.as_str() {
        "http" | "file" => {}
        other => anyhow::bail!("Unknown client kind: '{}'. Must be http or file.", other),
    }

    Ok(config)
}
