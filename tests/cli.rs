use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn hindsight_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("hindsight");
    path
}

fn setup_test_env(embedding_provider: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let batch = r#"{
  "user_id": "tester",
  "items": [
    {
      "id": "1",
      "lastVisitTime": 1721743200000.0,
      "title": "Rick Astley - Never Gonna Give You Up",
      "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
      "domain": "youtube.com",
      "dayOfWeek": 2,
      "hour": 14,
      "collectedAt": 1721743300000.0
    },
    {
      "id": "2",
      "lastVisitTime": 1721746800000.0,
      "title": "rust-lang/rust: Empowering everyone",
      "url": "https://github.com/rust-lang/rust",
      "domain": "github.com",
      "dayOfWeek": 2,
      "hour": 15,
      "collectedAt": 1721746900000.0
    }
  ]
}"#;
    fs::write(root.join("batch.json"), batch).unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/hindsight.sqlite"

[embedding]
provider = "{provider}"

[server]
bind = "127.0.0.1:7431"
"#,
        root = root.display(),
        provider = embedding_provider
    );

    let config_path = config_dir.join("hindsight.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_hindsight(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = hindsight_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("OPENAI_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run hindsight binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env("disabled");

    let (stdout, stderr, success) = run_hindsight(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/hindsight.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env("disabled");

    let (_, _, success1) = run_hindsight(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_hindsight(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_dry_run_reports_counts() {
    let (tmp, config_path) = setup_test_env("disabled");

    run_hindsight(&config_path, &["init"]);
    let batch_path = tmp.path().join("batch.json");
    let (stdout, stderr, success) = run_hindsight(
        &config_path,
        &["ingest", batch_path.to_str().unwrap(), "--dry-run"],
    );
    assert!(success, "dry-run failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("(dry-run)"));
    assert!(stdout.contains("items found: 2"));
    assert!(stdout.contains("estimated chunks: 2"));
}

#[test]
fn test_ingest_requires_an_embedding_provider() {
    let (tmp, config_path) = setup_test_env("disabled");

    run_hindsight(&config_path, &["init"]);
    let batch_path = tmp.path().join("batch.json");
    let (_, stderr, success) =
        run_hindsight(&config_path, &["ingest", batch_path.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "stderr: {}", stderr);
}

#[test]
fn test_ask_requires_an_embedding_provider() {
    let (_tmp, config_path) = setup_test_env("disabled");

    run_hindsight(&config_path, &["init"]);
    let (_, stderr, success) = run_hindsight(&config_path, &["ask", "what did I browse"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "stderr: {}", stderr);
}

#[test]
fn test_missing_credential_surfaces_before_any_work() {
    let (_tmp, config_path) = setup_test_env("openai");

    run_hindsight(&config_path, &["init"]);
    let (_, stderr, success) = run_hindsight(&config_path, &["ask", "what did I browse"]);
    assert!(!success);
    assert!(stderr.contains("OPENAI_API_KEY"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_embedding_provider_is_rejected() {
    let (_tmp, config_path) = setup_test_env("quantum");

    let (_, stderr, success) = run_hindsight(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("Unknown embedding provider"), "stderr: {}", stderr);
}
