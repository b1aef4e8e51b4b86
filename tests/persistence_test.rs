#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use serde_json::Value;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn run(db_path: &Path, args: &[&str]) -> String {
    let output = Command::new(cargo_bin!("payment-tracker"))
        .args(args)
        .arg("--db-path")
        .arg(db_path)
        .env_remove("SMTP_HOST")
        .output()
        .expect("Failed to execute command");
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_payment_survives_restarts() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("payments_db");

    // 1. Open a payment in one process
    let created: Value = serde_json::from_str(&run(
        &db_path,
        &[
            "create",
            "--tier",
            "diamond",
            "--cryptocurrency",
            "litecoin",
            "--email",
            "disk@example.com",
            "--first-name",
            "Disk",
            "--last-name",
            "Store",
        ],
    ))
    .unwrap();
    let id = created["paymentId"].as_str().unwrap().to_string();

    // 2. Report progress from a second one
    let view: Value = serde_json::from_str(&run(
        &db_path,
        &["report", &id, "--confirmations", "6", "--transaction-hash", "ltc-disk"],
    ))
    .unwrap();
    assert_eq!(view["status"], "completed");

    // 3. A third sees the completed record
    let view: Value = serde_json::from_str(&run(&db_path, &["status", &id])).unwrap();
    assert_eq!(view["status"], "completed");
    assert_eq!(view["transactionHash"], "ltc-disk");

    let page: Value =
        serde_json::from_str(&run(&db_path, &["admin", "list", "--status", "completed"])).unwrap();
    assert_eq!(page["stats"]["total"], 1);

    let csv = run(&db_path, &["export"]);
    assert!(csv.contains("disk@example.com"));
    assert!(csv.contains("ltc-disk"));
}

#[test]
fn test_free_signup_is_unique_across_runs() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("users_db");
    let args = [
        "signup",
        "--email",
        "once@example.com",
        "--first-name",
        "Once",
        "--last-name",
        "Only",
    ];

    run(&db_path, &args);

    let output = Command::new(cargo_bin!("payment-tracker"))
        .args(args)
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .unwrap();
    assert!(!output.status.success());
}
