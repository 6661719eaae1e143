// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box tests driving the `mc` binary against a throwaway project root,
//! with no `mcd` daemon running — exercising the embedded local-kernel
//! fallback end to end.

use assert_cmd::Command;
use serial_test::serial;
use tempfile::TempDir;

fn mc(root: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mc").expect("mc binary builds");
    cmd.arg("--root").arg(root.path());
    cmd
}

#[test]
#[serial]
fn init_creates_mission_directory_with_discovery_stage() {
    let root = TempDir::new().expect("tempdir");
    mc(&root).arg("init").assert().success();
    assert!(root.path().join(".mission").exists());

    let status = mc(&root).arg("status").output().expect("status runs");
    assert!(status.status.success());
    let stdout = String::from_utf8(status.stdout).expect("utf8");
    assert!(stdout.contains("discovery"));
}

#[test]
#[serial]
fn task_create_then_ready_round_trips_through_local_fallback() {
    let root = TempDir::new().expect("tempdir");
    mc(&root).arg("init").assert().success();

    let create = mc(&root)
        .args(["task", "create", "write the onboarding doc", "discovery", "docs", "writer"])
        .output()
        .expect("task create runs");
    assert!(create.status.success(), "stderr: {}", String::from_utf8_lossy(&create.stderr));
    let created: serde_json::Value = serde_json::from_slice(&create.stdout).expect("json response");
    assert_eq!(created["type"], "TaskCreated");

    let ready = mc(&root).args(["task", "ready"]).output().expect("task ready runs");
    assert!(ready.status.success());
    let body: serde_json::Value = serde_json::from_slice(&ready.stdout).expect("json response");
    let tasks = body["tasks"].as_array().expect("tasks array");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "write the onboarding doc");
}

#[test]
#[serial]
fn unknown_stage_name_fails_with_usage_exit_code() {
    let root = TempDir::new().expect("tempdir");
    mc(&root).arg("init").assert().success();

    mc(&root)
        .args(["task", "create", "bogus", "not-a-real-stage", "docs", "writer"])
        .assert()
        .failure()
        .code(2);
}

#[test]
#[serial]
fn gate_status_for_unapproved_stage_reports_pending() {
    let root = TempDir::new().expect("tempdir");
    mc(&root).arg("init").assert().success();

    let output = mc(&root).args(["gate", "status", "discovery"]).output().expect("gate status runs");
    assert!(output.status.success());
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json response");
    assert_eq!(body["gate"]["status"], "closed");
}

#[test]
#[serial]
fn commit_validate_only_strict_fails_with_usage_exit_code_before_any_gate_work() {
    let root = TempDir::new().expect("tempdir");
    mc(&root).arg("init").assert().success();

    mc(&root).args(["commit", "--validate-only", "--strict"]).assert().failure().code(2);
}

#[test]
#[serial]
fn task_dep_add_then_remove_moves_the_dependent_back_into_the_ready_set() {
    let root = TempDir::new().expect("tempdir");
    mc(&root).arg("init").assert().success();

    let dep = mc(&root)
        .args(["task", "create", "design schema", "design", "backend", "architect"])
        .output()
        .expect("task create runs");
    let dep_id = serde_json::from_slice::<serde_json::Value>(&dep.stdout).unwrap()["id"].as_str().unwrap().to_string();

    let dependent = mc(&root)
        .args(["task", "create", "write migration", "implement", "backend", "developer"])
        .output()
        .expect("task create runs");
    let dependent_id = serde_json::from_slice::<serde_json::Value>(&dependent.stdout).unwrap()["id"].as_str().unwrap().to_string();

    mc(&root).args(["task", "dep", "add", &dependent_id, &dep_id]).assert().success();
    let ready = mc(&root).args(["task", "ready"]).output().expect("task ready runs");
    let body: serde_json::Value = serde_json::from_slice(&ready.stdout).unwrap();
    assert!(!body["tasks"].as_array().unwrap().iter().any(|t| t["id"] == dependent_id));

    mc(&root).args(["task", "dep", "remove", &dependent_id, &dep_id]).assert().success();
    let ready = mc(&root).args(["task", "ready"]).output().expect("task ready runs");
    let body: serde_json::Value = serde_json::from_slice(&ready.stdout).unwrap();
    assert!(body["tasks"].as_array().unwrap().iter().any(|t| t["id"] == dependent_id));
}

#[test]
#[serial]
fn checkpoint_create_then_restart_round_trips() {
    let root = TempDir::new().expect("tempdir");
    mc(&root).arg("init").assert().success();

    let created = mc(&root).args(["checkpoint", "create"]).output().expect("checkpoint create runs");
    assert!(created.status.success(), "stderr: {}", String::from_utf8_lossy(&created.stderr));
    let body: serde_json::Value = serde_json::from_slice(&created.stdout).unwrap();
    let id = body["checkpoint"]["id"].as_str().unwrap().to_string();

    mc(&root).args(["checkpoint", "restart", &id]).assert().success();
}
