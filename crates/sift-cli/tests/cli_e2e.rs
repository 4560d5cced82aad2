//! End-to-end CLI tests using `assert_cmd`
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const POLICY: &str = "\
Pre-existing conditions are covered after 36 months of continuous cover.
Knee surgery is covered after a 6 month waiting period.
Cosmetic dental treatment is excluded from the policy.
";

/// Helper to create temp dir or fail test
fn temp_dir() -> TempDir {
    TempDir::new().unwrap_or_else(|err| panic!("Failed to create temp dir: {err}"))
}

/// Binary isolated to `home` with the offline embedder
fn sift(home: &TempDir) -> Command {
    let mut command =
        Command::cargo_bin("sift").unwrap_or_else(|err| panic!("Binary not found: {err}"));
    command
        .env("HOME", home.path())
        .env("SIFT_FOLDER", home.path().join("sift"))
        .env_remove("EMBEDDING_MODEL")
        .env_remove("OLLAMA_HOST")
        .env_remove("RUST_LOG")
        .args(["--backend", "hashing"]);
    command
}

fn write_policy(home: &TempDir) -> PathBuf {
    let path = home.path().join("policy.txt");
    fs::write(&path, POLICY).expect("Failed to write policy");
    path
}

#[test]
fn test_cli_help() {
    sift(&temp_dir())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("query"));
}

#[test]
fn test_cli_invalid_command() {
    sift(&temp_dir()).arg("invalid-command-xyz").assert().failure();
}

#[test]
fn test_index_then_query() {
    let home = temp_dir();
    let policy = write_policy(&home);

    sift(&home)
        .arg("index")
        .arg(&policy)
        .args(["--location", "policy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexed 3 chunks at 'policy'"));

    sift(&home)
        .args(["query", "knee surgery waiting period", "-k", "1", "--location", "policy"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "[Chunk 1] Knee surgery is covered after a 6 month waiting period.",
        ));
}

#[test]
fn test_query_scores_are_shown() {
    let home = temp_dir();
    let policy = write_policy(&home);

    sift(&home).arg("index").arg(&policy).assert().success();

    sift(&home)
        .args(["query", "dental treatment", "-k", "2", "--scores"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(distance "));
}

#[test]
fn test_query_json_output() {
    let home = temp_dir();
    let policy = write_policy(&home);

    sift(&home).arg("index").arg(&policy).assert().success();

    let output = sift(&home)
        .args(["query", "pre-existing conditions", "-k", "3", "--json"])
        .output()
        .expect("Failed to run sift");
    assert!(output.status.success());

    let results: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let results = results.as_array().expect("JSON array");
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["ordinal"], 0);
    assert!(results[0]["distance"].is_number());
    assert!(results[0]["text"].as_str().unwrap().starts_with("Pre-existing"));
}

#[test]
fn test_index_json_format() {
    let home = temp_dir();
    let input = home.path().join("chunks.json");
    fs::write(&input, r#"["Clause one\nspans two lines", "Clause two"]"#).unwrap();

    sift(&home)
        .arg("index")
        .arg(&input)
        .args(["--format", "json", "--location", "multi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexed 2 chunks"));

    sift(&home)
        .args(["info", "--location", "multi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Chunks:    2"))
        .stdout(predicate::str::contains("hashing-384"));
}

#[test]
fn test_query_before_index_fails() {
    sift(&temp_dir())
        .args(["query", "anything", "--location", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No index found"));
}

#[test]
fn test_query_missing_index_skips_model_check() {
    let home = temp_dir();
    Command::cargo_bin("sift")
        .unwrap_or_else(|err| panic!("Binary not found: {err}"))
        .env("HOME", home.path())
        .env("SIFT_FOLDER", home.path().join("sift"))
        .env("OLLAMA_HOST", "http://127.0.0.1:9")
        .env_remove("EMBEDDING_MODEL")
        .env_remove("RUST_LOG")
        .args(["--backend", "ollama", "query", "anything", "--location", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No index found"));
}

#[test]
fn test_zero_top_k_fails() {
    let home = temp_dir();
    let policy = write_policy(&home);

    sift(&home).arg("index").arg(&policy).assert().success();

    sift(&home)
        .args(["query", "knee", "-k", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("top-k"));
}

#[test]
fn test_empty_input_fails() {
    let home = temp_dir();
    let input = home.path().join("empty.txt");
    fs::write(&input, "\n  \n").unwrap();

    sift(&home).arg("index").arg(&input).assert().failure();
}

#[test]
fn test_store_flag_overrides_folder() {
    let home = temp_dir();
    let policy = write_policy(&home);
    let store = home.path().join("elsewhere");

    sift(&home)
        .arg("--store")
        .arg(&store)
        .arg("index")
        .arg(&policy)
        .assert()
        .success();

    assert!(store.join("default").join("index.bin").exists());
    assert!(store.join("default").join("chunks.json").exists());
}

#[test]
fn test_config_command_prints_toml() {
    sift(&temp_dir())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("backend = \"hashing\""))
        .stdout(predicate::str::contains("default_top_k = 5"));
}
