//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

const TENANT: &str = "0b7c3a5e-8f1d-4c2a-9e6b-3d4f5a6b7c8d";

#[test]
fn test_serve_help() {
    let mut cmd = Command::cargo_bin("sfa").unwrap();
    cmd.arg("serve").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("APP_PORT"))
        .stdout(predicate::str::contains("APP_DATABASE_URL"));
}

#[test]
fn test_import_help() {
    let mut cmd = Command::cargo_bin("sfa").unwrap();
    cmd.arg("import").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("CSV file with a header row"));
}

#[test]
fn test_export_help() {
    let mut cmd = Command::cargo_bin("sfa").unwrap();
    cmd.arg("export").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("instead of stdout"));
}

#[test]
fn test_unknown_entity_is_rejected() {
    let mut cmd = Command::cargo_bin("sfa").unwrap();
    cmd.args(["export", "contacts", "--tenant", TENANT]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown entity"));
}

#[test]
fn test_malformed_tenant_is_rejected() {
    let mut cmd = Command::cargo_bin("sfa").unwrap();
    cmd.args(["export", "accounts", "--tenant", "not-a-uuid"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("valid UUID"));
}

#[test]
fn test_import_missing_file_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.csv");

    let mut cmd = Command::cargo_bin("sfa").unwrap();
    cmd.arg("import")
        .arg("accounts")
        .arg(&missing)
        .args(["--tenant", TENANT]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_import_header_only_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("accounts.csv");
    std::fs::write(&path, "owner_user_id,name\n").unwrap();

    let mut cmd = Command::cargo_bin("sfa").unwrap();
    cmd.arg("import")
        .arg("accounts")
        .arg(&path)
        .args(["--tenant", TENANT]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not a usable CSV file"));
}
