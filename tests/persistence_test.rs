#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

fn run(db_path: &std::path::Path, args: &[&str]) -> String {
    let output = Command::new(cargo_bin!("kadamay-ledger"))
        .arg("--db-path")
        .arg(db_path)
        .args(args)
        .output()
        .expect("Failed to execute command");
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

const GCASH_DUES: [&str; 15] = [
    "record",
    "--contributor",
    "1",
    "--contribution-type",
    "1",
    "--amount",
    "300.00",
    "--method",
    "gcash",
    "--gcash-ref",
    "GC123",
    "--alloc",
    "1:150.00:payer",
    "--alloc",
    "2:150.00",
];

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: record a GCash payment, left pending
    let stdout1 = run(&db_path, &GCASH_DUES);
    assert!(stdout1.contains("PENDING_VALIDATION"));
    assert!(stdout1.contains("-0001,"));

    // 2. Second run: the counter survived, so the next number follows on
    let stdout2 = run(&db_path, &GCASH_DUES);
    assert!(stdout2.contains("-0002,"));

    // 3. Validate and cancel the first payment in separate runs
    let stdout3 = run(&db_path, &["--role", "validator", "validate", "1"]);
    assert!(stdout3.contains("VALIDATED"));

    let stdout4 = run(
        &db_path,
        &["--role", "canceller", "cancel", "1", "--reason", "duplicate entry"],
    );
    assert!(stdout4.contains("CANCELLED"));
    assert!(stdout4.contains("duplicate entry"));

    // 4. Everything is still there on the next open
    let listing = run(&db_path, &["list"]);
    assert_eq!(listing.lines().count(), 3);
    let cancelled = run(&db_path, &["list", "--status", "cancelled"]);
    assert_eq!(cancelled.lines().count(), 2);
    assert!(run(&db_path, &["show", "2"]).contains("PENDING_VALIDATION"));
}
