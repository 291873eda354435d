//! CLI integration tests
//!
//! These run the built binary against a database in a temp directory and
//! check its JSON output and exit status.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn run(db: &Path, args: &[&str]) -> Output {
    let cli_bin = env!("CARGO_BIN_EXE_relstore-cli");
    Command::new(cli_bin)
        .arg("--db")
        .arg(db)
        .args(args)
        .output()
        .expect("Failed to run CLI")
}

fn run_json(db: &Path, args: &[&str]) -> Value {
    let output = run(db, args);
    assert!(
        output.status.success(),
        "args {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_cli_init_reports_revision() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("nested").join("store.db");

    let status = run_json(&db, &["init"]);

    assert_eq!(status["ready"], true);
    assert_eq!(status["revision"], "001_initial_schema");
    assert!(db.exists());
}

#[test]
fn test_cli_tuple_lifecycle() {
    // Given: A store
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    run_json(&db, &["store", "create", "--name", "acme", "--id", "s1"]);

    // When: Tuples are written and one is deleted
    run_json(
        &db,
        &[
            "tuple",
            "write",
            "--store",
            "s1",
            "doc:1#viewer@user:anne",
            "doc:1#viewer@group:eng#member",
        ],
    );
    run_json(&db, &["tuple", "delete", "--store", "s1", "doc:1#viewer@user:anne"]);

    // Then: One tuple remains
    let page = run_json(&db, &["tuple", "read", "--store", "s1", "--object", "doc:1"]);
    let tuples = page["tuples"].as_array().unwrap();
    assert_eq!(tuples.len(), 1);
    assert_eq!(tuples[0]["key"]["user"], "group:eng#member");

    // And: The changelog holds three entries, newest first with --desc
    let changes = run_json(&db, &["changes", "--store", "s1", "--desc"]);
    let changes = changes["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 3);
    assert_eq!(changes[0]["operation"], "Delete");
}

#[test]
fn test_cli_missing_delete_fails() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    run_json(&db, &["store", "create", "--name", "acme", "--id", "s1"]);

    let output = run(&db, &["tuple", "delete", "--store", "s1", "doc:1#viewer@user:anne"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("ERR_INVALID_WRITE_INPUT"),
        "stderr: {}",
        stderr
    );

    // ignoring missing deletes turns it into a no-op
    run_json(
        &db,
        &["tuple", "delete", "--store", "s1", "--ignore-missing", "doc:1#viewer@user:anne"],
    );
}

#[test]
fn test_cli_store_list_and_delete() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    run_json(&db, &["store", "create", "--name", "a", "--id", "s1"]);
    run_json(&db, &["store", "create", "--name", "b", "--id", "s2"]);

    let listed = run_json(&db, &["store", "list"]);
    assert_eq!(listed["stores"].as_array().unwrap().len(), 2);

    run_json(&db, &["store", "delete", "s1"]);
    let listed = run_json(&db, &["store", "list"]);
    assert_eq!(listed["stores"].as_array().unwrap().len(), 1);
    assert!(!run(&db, &["store", "get", "s1"]).status.success());
}

#[test]
fn test_cli_rejects_malformed_tuple() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");

    let output = run(&db, &["tuple", "write", "--store", "s1", "doc:1-viewer-user:anne"]);

    assert!(!output.status.success());
}
