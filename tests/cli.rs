//! CLI tests: run the `pagegrep` binary against a temporary config.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn pagegrep_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("pagegrep");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/pagegrep.sqlite"

[server]
bind = "127.0.0.1:7340"

[ocr]
provider = "disabled"
"#,
        root.display()
    );
    let config_path = config_dir.join("pagegrep.toml");
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

fn run(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = pagegrep_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run pagegrep binary at {:?}: {}", binary, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn test_init_is_idempotent() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, ok) = run(&config, &["init"]);
    assert!(ok, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully"));
    let (_, stderr, ok) = run(&config, &["init"]);
    assert!(ok, "second init failed: {}", stderr);
}

#[test]
fn test_search_empty_index() {
    let (_tmp, config) = setup_test_env();
    run(&config, &["init"]);
    let (stdout, stderr, ok) = run(
        &config,
        &[
            "search",
            r#"{"search":{"text":"alpha","page_number":1,"coordinates":[[0,1],[1,0]]}}"#,
        ],
    );
    assert!(ok, "search failed: {}", stderr);
    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body, serde_json::json!({"message": "success", "data": {}}));
}

#[test]
fn test_search_reports_validation_error() {
    let (_tmp, config) = setup_test_env();
    run(&config, &["init"]);
    let (_, stderr, ok) = run(
        &config,
        &[
            "search",
            r#"{"search":{"text":"","page_number":1,"coordinates":[[0,1],[1,0]]}}"#,
        ],
    );
    assert!(!ok);
    assert!(stderr.contains("MISSING_TEXT"), "stderr: {}", stderr);
}

#[test]
fn test_index_with_disabled_ocr_fails() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, ok) = run(&config, &["index", "b1", "p.jpg"]);
    assert!(!ok);
    assert!(stderr.contains("PARSE_FAILED"), "stderr: {}", stderr);
}

#[test]
fn test_ingest_skips_and_removes() {
    let (tmp, config) = setup_test_env();
    let events = tmp.path().join("events.json");
    fs::write(
        &events,
        r#"[
            {"event_name": "OBJECT_CREATED", "bucket": "b1", "key": "notes.txt"},
            {"event_name": "OBJECT_REMOVED", "bucket": "b1", "key": "gone.jpg"}
        ]"#,
    )
    .unwrap();
    let (stdout, stderr, ok) = run(&config, &["ingest", events.to_str().unwrap()]);
    assert!(ok, "ingest failed: {}", stderr);
    assert!(stdout.contains("upserted: 0"));
    assert!(stdout.contains("deleted: 0"));
    assert!(stdout.contains("skipped: 1"));
}

#[test]
fn test_missing_config() {
    let (_, stderr, ok) = run(Path::new("/nonexistent/pagegrep.toml"), &["init"]);
    assert!(!ok);
    assert!(stderr.contains("Failed to read config file"));
}
