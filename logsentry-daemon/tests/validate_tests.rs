//! End-to-end configuration validation tests.
//!
//! Structural checks run at load time; pattern compilation is the extra
//! step `--validate` (and reactor assembly) performs on top.

use logsentry_core::LogsentryConfig;
use logsentry_daemon::orchestrator::validate_config;

fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("logsentry.toml");
    std::fs::write(&path, content).expect("should write config file");
    (dir, path)
}

#[tokio::test]
async fn good_config_passes_full_validation() {
    let (_dir, path) = write_config(
        r#"
[bus]
url = "mqtt://broker.lan:1883"
topic_prefix = "sensors/"

[[tail.feeds]]
file = "/var/log/door.log"
topic = "door/{id}"
states = [
    { state = "open", pattern = '^DOOR (?<id>\d+) OPEN$', payload = "1" },
    { state = "closed", pattern = '^DOOR (?<id>\d+) CLOSED$', payload = "0" },
]
"#,
    );

    let config = LogsentryConfig::load(&path).await.unwrap();
    validate_config(&config).unwrap();
}

#[tokio::test]
async fn invalid_pattern_passes_load_but_fails_validation() {
    let (_dir, path) = write_config(
        r#"
[[tail.feeds]]
file = "/var/log/door.log"
topic = "door"
states = [
    { state = "open", pattern = "[unclosed" },
]
"#,
    );

    // The raw pattern is just a string to the config layer...
    let config = LogsentryConfig::load(&path).await.unwrap();

    // ...but compilation catches it before the daemon would start.
    let err = validate_config(&config).unwrap_err();
    assert!(err.to_string().contains("/var/log/door.log"));
}

#[tokio::test]
async fn structural_errors_fail_at_load() {
    let (_dir, path) = write_config(
        r#"
[[tail.feeds]]
file = "relative/path.log"
topic = "door"
states = [
    { state = "open", pattern = "OPEN" },
]
"#,
    );

    assert!(LogsentryConfig::load(&path).await.is_err());
}
