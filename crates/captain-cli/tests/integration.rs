#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn captain(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("captain").unwrap();
    cmd.current_dir(dir.path())
        .env("CAPTAIN_CONFIG", dir.path().join("config.yaml"))
        .env_remove("CAPTAIN_API")
        .env_remove("CAPTAIN_CARD_SECRET");
    cmd
}

// ---------------------------------------------------------------------------
// captain catalog
// ---------------------------------------------------------------------------

#[test]
fn catalog_lists_every_kind() {
    let dir = TempDir::new().unwrap();
    captain(&dir)
        .arg("catalog")
        .assert()
        .success()
        .stdout(predicate::str::contains("MoveForward"))
        .stdout(predicate::str::contains("SetBottomColor"))
        .stdout(predicate::str::contains("UntilBlackFloor"));
}

#[test]
fn catalog_json_is_parseable() {
    let dir = TempDir::new().unwrap();
    let out = captain(&dir).args(["catalog", "-j"]).output().unwrap();
    assert!(out.status.success());
    let specs: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let specs = specs.as_array().unwrap();
    assert_eq!(specs.len(), 6);
    assert_eq!(specs[0]["kind"], "MoveForward");
}

// ---------------------------------------------------------------------------
// captain card new / verify
// ---------------------------------------------------------------------------

#[test]
fn card_new_then_verify() {
    let dir = TempDir::new().unwrap();
    let out = captain(&dir)
        .args(["card", "new", "-n", "2", "--secret", "s3cret", "-j"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let ids: Vec<String> = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);

    captain(&dir)
        .args(["card", "verify", &ids[0], "--secret", "s3cret"])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));

    captain(&dir)
        .args(["card", "verify", &ids[0], "--secret", "other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not signed"));
}

#[test]
fn card_new_uses_configured_secret() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.yaml"),
        "server:\n  card_secret: from-config\n",
    )
    .unwrap();
    let out = captain(&dir).args(["card", "new"]).output().unwrap();
    assert!(out.status.success());
    let id = String::from_utf8(out.stdout).unwrap();
    captain(&dir)
        .args(["card", "verify", id.trim(), "--secret", "from-config"])
        .assert()
        .success();
}

#[test]
fn card_new_without_secret_fails() {
    let dir = TempDir::new().unwrap();
    captain(&dir)
        .args(["card", "new"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no card secret"));
}

// ---------------------------------------------------------------------------
// captain config
// ---------------------------------------------------------------------------

#[test]
fn config_defaults_are_valid() {
    let dir = TempDir::new().unwrap();
    captain(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No warnings"));
}

#[test]
fn config_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.yaml"),
        "client:\n  api_url: localhost\n",
    )
    .unwrap();
    captain(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"));
}

#[test]
fn config_init_writes_file() {
    let dir = TempDir::new().unwrap();
    captain(&dir).args(["config", "init"]).assert().success();
    let written = std::fs::read_to_string(dir.path().join("config.yaml")).unwrap();
    assert!(written.contains("api_url"));
    assert!(written.contains("port: 8081"));
}

// ---------------------------------------------------------------------------
// API errors
// ---------------------------------------------------------------------------

#[test]
fn unreachable_api_is_reported() {
    let dir = TempDir::new().unwrap();
    captain(&dir)
        .args(["--api", "http://127.0.0.1:9/v1", "card", "show", "A1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: failed to load card A1"));
}
