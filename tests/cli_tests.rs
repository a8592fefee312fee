//! Integration tests for the CLI interface
//!
//! Runs the `docbatch` binary against a file store in a temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn docbatch(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("docbatch").unwrap();
    cmd.env("HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("DOCBATCH_STORE_DIR")
        .env_remove("DOCBATCH_BATCH_SIZE")
        .env_remove("DOCBATCH_PAGE_SIZE")
        .env_remove("DOCBATCH_LOG_LEVEL");
    cmd
}

fn write_collection(dir: &Path, collection: &str, docs: serde_json::Value) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join(format!("{collection}.json")),
        serde_json::to_string_pretty(&docs).unwrap(),
    )
    .unwrap();
}

fn read_collection(dir: &Path, collection: &str) -> serde_json::Value {
    let content = std::fs::read_to_string(dir.join(format!("{collection}.json"))).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[test]
fn test_cli_help_flag() {
    let temp = TempDir::new().unwrap();
    docbatch(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("purge-logs"))
        .stdout(predicate::str::contains("migrate-dates"))
        .stdout(predicate::str::contains("backfill-company"));
}

#[test]
fn test_missing_subcommand_fails() {
    let temp = TempDir::new().unwrap();
    docbatch(temp.path()).assert().failure();
}

#[test]
fn test_purge_logs_on_file_store() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    write_collection(
        &data,
        "logs",
        json!({
            "l1": { "level": { "string": "info" } },
            "l2": { "level": { "string": "warn" } },
            "l3": { "level": { "string": "error" } },
        }),
    );

    docbatch(temp.path())
        .arg("--store-dir")
        .arg(&data)
        .args(["purge-logs", "--batch-size", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("documents affected: 3"));

    assert_eq!(read_collection(&data, "logs"), json!({}));
}

#[test]
fn test_dry_run_leaves_data_alone() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    let members = json!({
        "m1": { "name": { "string": "Ada" } },
        "m2": { "name": { "string": "Bob" }, "company": { "string": "Acme" } },
    });
    write_collection(&data, "members", members.clone());

    docbatch(temp.path())
        .arg("--store-dir")
        .arg(&data)
        .args(["backfill-company", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry run] documents affected: 1"));

    assert_eq!(read_collection(&data, "members"), members);
}

#[test]
fn test_empty_collection_is_success() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");

    docbatch(temp.path())
        .arg("--store-dir")
        .arg(&data)
        .arg("migrate-dates")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to do"))
        .stdout(predicate::str::contains("documents affected: 0"));
}

#[test]
fn test_run_uses_job_file() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    write_collection(
        &data,
        "contracts",
        json!({ "c1": { "signedOn": { "string": "2023-07-04" } } }),
    );
    let config = temp.path().join("job.toml");
    std::fs::write(
        &config,
        format!(
            r#"
job = "migrate-dates"
collection = "contracts"

[policy]
kind = "normalize_dates"
fields = ["signedOn"]

[store]
base_dir = "{}"

[checkpoint]
path = "{}"
"#,
            data.display(),
            temp.path().join("checkpoints").display()
        ),
    )
    .unwrap();

    docbatch(temp.path())
        .arg("run")
        .arg("-c")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("documents affected: 1"));

    let contracts = read_collection(&data, "contracts");
    assert!(contracts["c1"]["signedOn"]["timestamp"].is_string());
}

#[test]
fn test_batch_size_above_limit_is_rejected() {
    let temp = TempDir::new().unwrap();
    docbatch(temp.path())
        .arg("--store-dir")
        .arg(temp.path().join("data"))
        .args(["purge-logs", "--batch-size", "501"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("E1008"));
}

#[test]
fn test_missing_config_file_is_reported() {
    let temp = TempDir::new().unwrap();
    docbatch(temp.path())
        .arg("run")
        .arg("-c")
        .arg(temp.path().join("absent.toml"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("E1001"));
}

#[test]
fn test_env_batch_size_is_applied() {
    let temp = TempDir::new().unwrap();
    docbatch(temp.path())
        .env("DOCBATCH_STORE_DIR", temp.path().join("data"))
        .env("DOCBATCH_BATCH_SIZE", "0")
        .arg("purge-logs")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("max_batch_size must be positive"));
}
