//! CLI tests for `aiterate show`, `list`, and `new` preconditions.
//!
//! Spawns the binary against a temporary storage directory and verifies exit codes
//! and printed records.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use aiterate::core::language::Language;
use aiterate::exit_codes;
use aiterate::io::config::{AiterateConfig, write_config};
use aiterate::io::session_store::SessionStore;

fn setup(root: &Path) -> (std::path::PathBuf, SessionStore) {
    let storage = root.join("sessions");
    let config_path = root.join("config.toml");
    write_config(
        &config_path,
        &AiterateConfig {
            storage_dir: Some(storage.clone()),
            output_root: root.join("out"),
            ..AiterateConfig::default()
        },
    )
    .expect("write config");
    let store = SessionStore::open(&storage).expect("store");
    (config_path, store)
}

fn aiterate(root: &Path, config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aiterate"))
        .current_dir(root)
        .env("HOME", root)
        .env("NO_COLOR", "1")
        .env_remove("OPENAI_API_KEY")
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("spawn aiterate")
}

#[test]
fn list_on_empty_store_succeeds() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (config, _store) = setup(temp.path());

    let output = aiterate(temp.path(), &config, &["list"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&output.stdout).contains("No sessions found"));
}

#[test]
fn show_prints_stored_session() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (config, store) = setup(temp.path());
    let session = store
        .create_session("reverse a string", Language::Python)
        .expect("create");
    store
        .add_iteration(&session.id, "def test_r(): ...", "def r(s): ...", "1 passed", true)
        .expect("add");

    let output = aiterate(temp.path(), &config, &["show", &session.id]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("reverse a string"));
    assert!(stdout.contains("passed"));

    let output = aiterate(temp.path(), &config, &["show", &session.id, "--json"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["id"], session.id.as_str());
    assert_eq!(value["iterations"][0]["number"], 1);

    let output = aiterate(temp.path(), &config, &["list"]);
    assert!(String::from_utf8_lossy(&output.stdout).contains(&session.id));
}

#[test]
fn show_unknown_session_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (config, _store) = setup(temp.path());

    let output = aiterate(
        temp.path(),
        &config,
        &["show", "00000000-0000-4000-8000-000000000000"],
    );
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn new_without_credential_fails_before_creating_anything() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (config, store) = setup(temp.path());

    let output = aiterate(
        temp.path(),
        &config,
        &["new", "add two integers", "--language", "go"],
    );
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("OPENAI_API_KEY"));
    assert!(store.list_sessions().expect("list").is_empty());
    assert!(!temp.path().join("out").exists());
}

#[test]
fn invalid_config_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("bad.toml");
    fs::write(&config, "max_iterations = 0\n").expect("write");

    let output = aiterate(temp.path(), &config, &["list"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_iterations"));
}
