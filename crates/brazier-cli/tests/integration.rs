#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn brazier(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("brazier").unwrap();
    cmd.current_dir(dir.path())
        .env("BRAZIER_CONFIG", dir.path().join("brazier.yaml"))
        .env_remove("RUST_LOG");
    cmd
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.arg("--json").output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// brazier config
// ---------------------------------------------------------------------------

#[test]
fn config_init_writes_default_file() {
    let dir = TempDir::new().unwrap();
    brazier(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    let content = std::fs::read_to_string(dir.path().join("brazier.yaml")).unwrap();
    assert!(content.contains("warmth_threshold: 65"));
    assert!(content.contains("south-west"));
}

#[test]
fn config_init_keeps_existing_file_without_force() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("brazier.yaml"), "supplies:\n  root_target: 7\n").unwrap();

    brazier(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
    let content = std::fs::read_to_string(dir.path().join("brazier.yaml")).unwrap();
    assert!(content.contains("root_target: 7"));

    brazier(&dir).args(["config", "init", "--force"]).assert().success();
    let content = std::fs::read_to_string(dir.path().join("brazier.yaml")).unwrap();
    assert!(content.contains("root_target: 10"));
}

#[test]
fn config_show_fills_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("brazier.yaml"), "supplies:\n  herb_target: 3\n").unwrap();
    let value = json_output(brazier(&dir).args(["config", "show"]));
    assert_eq!(value["supplies"]["herb_target"], 3);
    assert_eq!(value["supplies"]["retry_ticks"], 4);
    assert_eq!(value["sites"].as_array().unwrap().len(), 4);
}

#[test]
fn config_validate_accepts_defaults() {
    let dir = TempDir::new().unwrap();
    brazier(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No warnings"));
}

#[test]
fn config_validate_fails_on_empty_sites() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("brazier.yaml"), "sites: []\n").unwrap();
    brazier(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] no sites configured"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn malformed_config_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("brazier.yaml"), "sites: [unterminated").unwrap();
    brazier(&dir)
        .arg("sites")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: failed to load config"));
}

// ---------------------------------------------------------------------------
// brazier sites
// ---------------------------------------------------------------------------

#[test]
fn sites_lists_the_four_corners() {
    let dir = TempDir::new().unwrap();
    brazier(&dir)
        .arg("sites")
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME"))
        .stdout(predicate::str::contains("north-east"))
        .stdout(predicate::str::contains("(1621, 3998, 0)"));
}

#[test]
fn sites_json_reflects_config_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("brazier.yaml"),
        "sites:\n  - name: only\n    bank: {x: 1640, y: 3944}\n    brazier: {x: 1621, y: 3998}\n    roots: {x: 1621, y: 3988}\n    herb_roots: {x: 1611, y: 4004}\n",
    )
    .unwrap();
    let value = json_output(brazier(&dir).arg("sites"));
    let sites = value.as_array().unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0]["name"], "only");
    assert_eq!(sites[0]["brazier"]["plane"], 0);
}

// ---------------------------------------------------------------------------
// brazier run
// ---------------------------------------------------------------------------

#[test]
fn run_reaches_the_game_phase() {
    let dir = TempDir::new().unwrap();
    let value = json_output(brazier(&dir).args(["run", "--ticks", "3000", "--seed", "1"]));

    assert_eq!(value["ticks"], 3000);
    assert_eq!(value["cycles"], 1);
    assert!(value["phase"].is_string());
    assert!(value["site"].is_string());
    assert!(value["outcomes"]["advanced"].as_u64().unwrap() >= 2);
    assert!(value["phase_ticks"]["game"].as_u64().unwrap() > 0);
    assert!(value["world"]["rounds_completed"].as_u64().unwrap() >= 1);
    assert!(value["experience"]["firemaking"].as_u64().unwrap() > 0);
}

#[test]
fn run_stop_at_goes_inactive() {
    let dir = TempDir::new().unwrap();
    let value = json_output(brazier(&dir).args(["run", "--ticks", "200", "--stop-at", "50"]));

    assert!(value["phase"].is_null());
    assert!(value["site"].is_null());
    assert_eq!(value["status"]["text"], "Inactive");
    assert_eq!(value["status"]["color"], "red");
    assert_eq!(value["outcomes"]["stopped"], 1);
    assert_eq!(value["outcomes"]["idle"], 149);
}

#[test]
fn run_prints_summary_table() {
    let dir = TempDir::new().unwrap();
    brazier(&dir)
        .args(["run", "--ticks", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FIELD"))
        .stdout(predicate::str::contains("cycles"))
        .stdout(predicate::str::contains("woodcutting"));
}

#[test]
fn run_refuses_invalid_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("brazier.yaml"), "sites: []\n").unwrap();
    brazier(&dir)
        .args(["run", "--ticks", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no sites configured"));
}
