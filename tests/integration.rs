use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cvault_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cvault");
    path
}

fn feed_message(id: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "timestamp": format!("2026-08-20T10:{:02}:00Z", id % 60),
        "sender": format!("user:{}", id % 3),
        "body": format!("message {}", id),
    })
}

fn write_feed(feeds_dir: &Path, channel: &str, ids: &[i64]) {
    let feed: Vec<serde_json::Value> = ids.iter().map(|&id| feed_message(id)).collect();
    fs::write(
        feeds_dir.join(format!("{}.json", channel)),
        serde_json::to_string_pretty(&feed).unwrap(),
    )
    .unwrap();
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    // Create config
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Create local feeds standing in for the live platform
    let feeds_dir = root.join("feeds");
    fs::create_dir_all(&feeds_dir).unwrap();
    write_feed(&feeds_dir, "alpha", &[10, 11, 12]);
    write_feed(&feeds_dir, "beta", &[1, 2, 3, 4, 5]);

    let config_content = format!(
        r#"[archive]
root = "{}/archive"

[fetch]
page_size = 2
backoff_base_secs = 0

[client]
kind = "file"
feed_root = "{}/feeds"

[sources.alpha]
channel = "alpha"

[sources.beta]
channel = "beta"
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("cvault.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_cvault(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = cvault_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run cvault binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn archived_ids(tmp: &TempDir, source: &str) -> Vec<i64> {
    let path = tmp.path().join("archive").join(format!("{}.json", source));
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read archive at {:?}: {}", path, e));
    let records: Vec<serde_json::Value> = serde_json::from_str(&content).unwrap();
    records
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect()
}

#[test]
fn test_sync_all_creates_archives() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cvault(&config_path, &["sync", "all"]);
    assert!(success, "sync failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("sync alpha"));
    assert!(stdout.contains("new messages: 3"));
    assert!(stdout.contains("new messages: 5"));
    assert!(stdout.contains("2 source(s) synced, 0 failed"));
    assert!(stdout.contains("ok"));

    assert_eq!(archived_ids(&tmp, "alpha"), vec![10, 11, 12]);
    assert_eq!(archived_ids(&tmp, "beta"), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_sync_idempotent() {
    let (tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_cvault(&config_path, &["sync", "all"]);
    assert!(success1, "First sync failed");
    let archive_path = tmp.path().join("archive").join("alpha.json");
    let first = fs::read(&archive_path).unwrap();

    // Second sync finds nothing new and leaves the file byte-identical
    let (stdout, _, success2) = run_cvault(&config_path, &["sync", "all"]);
    assert!(success2, "Second sync failed");
    assert!(stdout.contains("new messages: 0"));
    let second = fs::read(&archive_path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_sync_incremental_appends() {
    let (tmp, config_path) = setup_test_env();

    run_cvault(&config_path, &["sync", "all"]);

    // The channel grows upstream
    write_feed(&tmp.path().join("feeds"), "alpha", &[10, 11, 12, 13, 14]);

    let (stdout, _, success) = run_cvault(&config_path, &["sync", "alpha"]);
    assert!(success, "Incremental sync failed: {}", stdout);
    assert!(
        stdout.contains("new messages: 2"),
        "Expected 2 new messages, got: {}",
        stdout
    );
    assert!(stdout.contains("watermark: 14"));
    assert_eq!(archived_ids(&tmp, "alpha"), vec![10, 11, 12, 13, 14]);
}

#[test]
fn test_sync_unknown_source() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_cvault(&config_path, &["sync", "gamma"]);
    assert!(!success, "Unknown source should fail");
    assert!(stderr.contains("Unknown source"));
}

#[test]
fn test_corrupt_archive_isolates_source() {
    let (tmp, config_path) = setup_test_env();

    run_cvault(&config_path, &["sync", "all"]);

    // Wreck one snapshot; the other source must still sync
    let alpha_path = tmp.path().join("archive").join("alpha.json");
    fs::write(&alpha_path, b"{ definitely not json").unwrap();
    write_feed(&tmp.path().join("feeds"), "beta", &[1, 2, 3, 4, 5, 6]);

    let (stdout, _, success) = run_cvault(&config_path, &["sync", "all"]);
    assert!(!success, "Run with a corrupt snapshot should exit nonzero");
    assert!(
        stdout.contains("failed: corrupt archive"),
        "Expected corrupt archive report, got: {}",
        stdout
    );
    assert!(stdout.contains("1 source(s) synced, 1 failed"));

    // The bad file is left for inspection, beta still advanced
    assert_eq!(fs::read(&alpha_path).unwrap(), b"{ definitely not json");
    assert_eq!(archived_ids(&tmp, "beta"), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_sync_full_recovers_corrupt_archive() {
    let (tmp, config_path) = setup_test_env();

    run_cvault(&config_path, &["sync", "all"]);
    let alpha_path = tmp.path().join("archive").join("alpha.json");
    fs::write(&alpha_path, b"{ definitely not json").unwrap();

    let (stdout, _, success) = run_cvault(&config_path, &["sync", "alpha", "--full"]);
    assert!(success, "--full should recover: {}", stdout);
    assert_eq!(archived_ids(&tmp, "alpha"), vec![10, 11, 12]);
}

#[test]
fn test_sync_limit_takes_newest() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_cvault(&config_path, &["sync", "alpha", "--limit", "2"]);
    assert!(success);
    assert!(stdout.contains("new messages: 2"));
    assert_eq!(archived_ids(&tmp, "alpha"), vec![11, 12]);

    // The next unbounded run cannot backfill below the watermark
    let (stdout, _, _) = run_cvault(&config_path, &["sync", "alpha"]);
    assert!(stdout.contains("new messages: 0"));
}

#[test]
fn test_sync_dry_run_writes_nothing() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_cvault(&config_path, &["sync", "all", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("(dry-run)"));
    assert!(stdout.contains("new messages: 3"));
    assert!(!tmp.path().join("archive").exists());
}

#[test]
fn test_sources_listing() {
    let (_tmp, config_path) = setup_test_env();

    run_cvault(&config_path, &["sync", "all"]);

    let (stdout, _, success) = run_cvault(&config_path, &["sources"]);
    assert!(success);
    assert!(stdout.contains("SOURCE"));
    assert!(stdout.contains("alpha"));
    assert!(stdout.contains("beta"));
    assert!(stdout.contains("12"), "Expected alpha watermark 12: {}", stdout);
    assert!(stdout.contains("ok"));
}

#[test]
fn test_show_last_messages() {
    let (_tmp, config_path) = setup_test_env();

    run_cvault(&config_path, &["sync", "all"]);

    let (stdout, _, success) = run_cvault(&config_path, &["show", "alpha", "--last", "2"]);
    assert!(success, "show failed: {}", stdout);
    assert!(stdout.contains("Archive alpha"));
    assert!(stdout.contains("watermark: 12"));
    assert!(stdout.contains("[11]"));
    assert!(stdout.contains("[12]"));
    assert!(stdout.contains("message 12"));
    assert!(!stdout.contains("[10]"));
}

#[test]
fn test_export_combines_sources() {
    let (tmp, config_path) = setup_test_env();

    run_cvault(&config_path, &["sync", "all"]);

    let out_path = tmp.path().join("export.json");
    let (_, stderr, success) = run_cvault(
        &config_path,
        &["export", "--output", out_path.to_str().unwrap()],
    );
    assert!(success, "export failed: {}", stderr);
    assert!(stderr.contains("Exported 8 messages from 2 source(s)"));

    let data: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(data["sources"], 2);
    let messages = data["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 8);
    let timestamps: Vec<&str> = messages
        .iter()
        .map(|m| m["timestamp"].as_str().unwrap())
        .collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted, "Export should be chronological");
}

#[test]
fn test_auth_failure_reported() {
    let (tmp, config_path) = setup_test_env();

    // Point the client at a feed root that does not exist
    fs::remove_dir_all(tmp.path().join("feeds")).unwrap();

    let (_, stderr, success) = run_cvault(&config_path, &["sync", "all"]);
    assert!(!success, "sync without a reachable source should fail");
    assert!(
        stderr.contains("Failed to establish source session"),
        "Expected session failure, got: {}",
        stderr
    );
}

#[test]
fn test_unknown_progress_mode() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) =
        run_cvault(&config_path, &["sync", "all", "--progress", "confetti"]);
    assert!(!success);
    assert!(stderr.contains("Unknown progress mode"));
}
