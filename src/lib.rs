//! # ChatVault
//!
//! An incremental archiver for chat history.
//!
//! ChatVault mirrors the messages of configured chat channels into local
//! JSON snapshots, one per source. Runs are incremental: the highest
//! archived message id is the watermark, and each sync fetches only what
//! the backend has accumulated since, walking pages newest-to-oldest and
//! appending the new tail to the snapshot atomically.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌───────────┐
//! │ SourceClient │──▶│    Sync     │──▶│ Snapshots │
//! │  HTTP/File   │   │ Fetch+Merge │   │ JSON (fs) │
//! └──────────────┘   └─────────────┘   └─────┬─────┘
//!                                            │
//!                              ┌─────────────┤
//!                              ▼             ▼
//!                        ┌──────────┐  ┌──────────┐
//!                        │ Show/Ls  │  │  Export  │
//!                        │ (cvault) │  │  (JSON)  │
//!                        └──────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cvault sync all               # archive every configured source
//! cvault sync team --dry-run    # preview what a sync would fetch
//! cvault sources                # list archives and their watermarks
//! cvault show team --last 20    # print the newest archived messages
//! cvault export -o backup.json  # combined chronological export
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`client`] | Source backend abstraction |
//! | [`client_http`] | HTTP API client |
//! | [`client_file`] | Local JSON feed client |
//! | [`archive`] | Snapshot load and atomic save |
//! | [`merge`] | Watermark and append-merge rules |
//! | [`fetch`] | Paged fetch with retry/backoff |
//! | [`sync`] | Per-source sync orchestration |
//! | [`export`] | Combined archive export |

pub mod archive;
pub mod client;
pub mod client_file;
pub mod client_http;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod merge;
pub mod models;
pub mod progress;
pub mod show;
pub mod sources;
pub mod sync;
