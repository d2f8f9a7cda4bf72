use assert_cmd::Command;
use predicates::str::contains;

fn cmd(root: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("deskcoach").unwrap();
    cmd.arg("--storage-root").arg(root);
    cmd
}

#[test]
fn status_on_empty_root_reports_not_running() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("not running"));
}

#[test]
fn health_on_fresh_root_reports_uncalibrated() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .arg("health")
        .assert()
        .success()
        .stdout(contains("calibrated: false"));
}

#[test]
fn stop_on_empty_root_is_a_no_op_success() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path()).arg("stop").assert().success();
}

#[test]
fn purge_events_truncates_existing_log() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path()).unwrap();
    let events_path = dir.path().join("events.jsonl");
    std::fs::write(&events_path, b"{\"ts\":1.0}\n{\"ts\":2.0}\n").unwrap();

    cmd(dir.path())
        .arg("purge-events")
        .assert()
        .success()
        .stdout(contains("purged"));

    let contents = std::fs::read_to_string(&events_path).unwrap();
    assert!(contents.is_empty());
}

#[test]
fn json_mode_emits_structured_status() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .arg("--json")
        .arg("status")
        .assert()
        .success()
        .stdout(contains("\"running\":false"));
}

#[test]
fn run_perf_profile_prints_resolution_and_exits() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .arg("run")
        .arg("--perf-profile")
        .arg("--perf-mode")
        .arg("lightweight")
        .assert()
        .success()
        .stdout(contains("lightweight"));
}

#[test]
fn calibrate_with_tiny_duration_reports_insufficient_samples() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .arg("calibrate")
        .arg("--duration-sec")
        .arg("15")
        .assert()
        .failure()
        .stderr(contains("calibration failed"));
}
