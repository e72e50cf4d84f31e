//! Integration tests for cadence-queue

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Escape a path for use inside a TOML string
fn escape_path_for_toml(path: &str) -> String {
    path.replace('\\', "\\\\")
}

fn setup_test_env() -> (TempDir, String) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let db_path = temp_dir.path().join("data").join("cadence.db");

    let config_content = format!(
        r#"
[database]
path = "{}"
"#,
        escape_path_for_toml(&db_path.to_string_lossy())
    );
    fs::write(&config_path, config_content).unwrap();

    (temp_dir, config_path.to_string_lossy().to_string())
}

fn queue(config_path: &str) -> Command {
    let mut cmd = Command::cargo_bin("cadence-queue").unwrap();
    cmd.env("CADENCE_CONFIG", config_path);
    cmd.env_remove("CADENCE_DB_PATH");
    cmd
}

fn add_task(config_path: &str, args: &[&str]) -> String {
    let output = queue(config_path)
        .args(["task", "add"])
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "task add failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn list_tasks_json(config_path: &str) -> Vec<serde_json::Value> {
    let output = queue(config_path)
        .args(["task", "list", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_task_add_then_list() {
    let (_temp_dir, config_path) = setup_test_env();

    let id = add_task(
        &config_path,
        &["--type", "follow", "--platform", "twitter", "--target", "rustlang", "--priority", "9"],
    );
    assert_eq!(id.len(), 36);

    let tasks = list_tasks_json(&config_path);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], id.as_str());
    assert_eq!(tasks[0]["status"], "pending");
    assert_eq!(tasks[0]["priority"], 5);
    assert_eq!(tasks[0]["action"], "follow");

    queue(&config_path)
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()))
        .stdout(predicate::str::contains("follow | twitter | pending | p5"));
}

#[test]
fn test_task_add_scrape_filters_stored() {
    let (_temp_dir, config_path) = setup_test_env();

    add_task(
        &config_path,
        &[
            "--type",
            "scrape",
            "--platform",
            "reddit",
            "--target",
            "r/rust",
            "--min-followers",
            "100",
            "--verified-only",
            "--keyword",
            "rust",
            "--max-results",
            "20",
            "--at",
            "+1h",
        ],
    );

    let tasks = list_tasks_json(&config_path);
    let metadata = &tasks[0]["metadata"];
    assert_eq!(metadata["filters"]["min_followers"], 100);
    assert_eq!(metadata["filters"]["verified_only"], true);
    assert_eq!(metadata["filters"]["keywords"][0], "rust");
    assert_eq!(metadata["limits"]["max_results"], 20);

    let scheduled = tasks[0]["scheduled_time"].as_i64().unwrap();
    let now = chrono::Utc::now().timestamp();
    assert!(scheduled > now + 3500 && scheduled <= now + 3600);
}

#[test]
fn test_task_add_unsupported_pair_rejected() {
    let (_temp_dir, config_path) = setup_test_env();

    queue(&config_path)
        .args([
            "task", "add", "--type", "retweet", "--platform", "reddit", "--target", "t3_x",
        ])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Unsupported retweet task for reddit"));
}

#[test]
fn test_task_add_unknown_platform_rejected() {
    let (_temp_dir, config_path) = setup_test_env();

    queue(&config_path)
        .args([
            "task", "add", "--type", "like", "--platform", "myspace", "--target", "1",
        ])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Unknown platform"));
}

#[test]
fn test_task_add_bad_time_rejected() {
    let (_temp_dir, config_path) = setup_test_env();

    queue(&config_path)
        .args([
            "task", "add", "--type", "like", "--platform", "twitter", "--target", "1", "--at",
            "whenever",
        ])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn test_task_import_reports_each_item() {
    let (temp_dir, config_path) = setup_test_env();
    let import_path = temp_dir.path().join("tasks.json");
    fs::write(
        &import_path,
        r#"[
            {"type": "like", "platform": "twitter", "target": "111", "action": "like"},
            {"type": "follow", "platform": "facebook", "target": "someone", "action": "follow"},
            {"type": "comment", "platform": "reddit", "target": "t3_abc", "action": "Nice", "priority": 4}
        ]"#,
    )
    .unwrap();

    queue(&config_path)
        .args(["task", "import", import_path.to_str().unwrap()])
        .assert()
        .failure()
        .code(3)
        .stdout(predicate::str::contains("error #1"))
        .stdout(predicate::str::contains("ok ").count(2))
        .stderr(predicate::str::contains("1 of 3 tasks rejected"));

    assert_eq!(list_tasks_json(&config_path).len(), 2);
}

#[test]
fn test_task_import_from_stdin() {
    let (_temp_dir, config_path) = setup_test_env();

    queue(&config_path)
        .args(["task", "import", "-"])
        .write_stdin(r##"[{"type": "trend_monitor", "platform": "twitter", "target": "#rust", "action": "watch"}]"##)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ok "));
}

#[test]
fn test_task_import_rejects_non_array() {
    let (_temp_dir, config_path) = setup_test_env();

    queue(&config_path)
        .args(["task", "import", "-"])
        .write_stdin("{\"type\": \"like\"}")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("JSON array"));
}

#[test]
fn test_task_edit_pending() {
    let (_temp_dir, config_path) = setup_test_env();
    let id = add_task(
        &config_path,
        &["--type", "comment", "--platform", "reddit", "--target", "t3_abc", "--action", "Nice", "--at", "+2h"],
    );

    queue(&config_path)
        .args(["task", "edit", &id, "--action", "Great post", "--priority", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("priority 1"))
        .stdout(predicate::str::contains("Great post"));

    let tasks = list_tasks_json(&config_path);
    assert_eq!(tasks[0]["action"], "Great post");
    assert_eq!(tasks[0]["priority"], 1);
}

#[test]
fn test_task_edit_needs_a_change() {
    let (_temp_dir, config_path) = setup_test_env();
    let id = add_task(
        &config_path,
        &["--type", "like", "--platform", "instagram", "--target", "abc"],
    );

    queue(&config_path)
        .args(["task", "edit", &id])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Nothing to update"));
}

#[test]
fn test_task_edit_unknown_id() {
    let (_temp_dir, config_path) = setup_test_env();

    queue(&config_path)
        .args(["task", "edit", "missing-id", "--priority", "4"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Task not found"));
}

#[test]
fn test_task_list_status_filter() {
    let (_temp_dir, config_path) = setup_test_env();
    add_task(
        &config_path,
        &["--type", "like", "--platform", "twitter", "--target", "1"],
    );

    queue(&config_path)
        .args(["task", "list", "--status", "failed"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    queue(&config_path)
        .args(["task", "list", "--status", "bogus"])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn test_task_list_invalid_format() {
    let (_temp_dir, config_path) = setup_test_env();

    queue(&config_path)
        .args(["task", "list", "--format", "yaml"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Invalid format"));
}

#[test]
fn test_post_add_and_list() {
    let (_temp_dir, config_path) = setup_test_env();

    let output = queue(&config_path)
        .args(["post", "add", "Hello from the queue", "--platform", "twitter", "--at", "+1h"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let id = String::from_utf8(output.stdout).unwrap().trim().to_string();

    queue(&config_path)
        .args(["post", "list", "--pending"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()))
        .stdout(predicate::str::contains("Hello from the queue"))
        .stdout(predicate::str::contains("in "));

    queue(&config_path)
        .args(["post", "list", "--posted"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_post_add_reads_stdin() {
    let (_temp_dir, config_path) = setup_test_env();

    queue(&config_path)
        .args(["post", "add", "--platform", "reddit", "--at", "tomorrow"])
        .write_stdin("Piped content\n")
        .assert()
        .success();

    let output = queue(&config_path)
        .args(["post", "list", "--format", "json"])
        .output()
        .unwrap();
    let posts: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(posts[0]["content"], "Piped content");
    assert_eq!(posts[0]["posted"], false);
}

#[test]
fn test_post_add_rejects_past_time() {
    let (_temp_dir, config_path) = setup_test_env();

    queue(&config_path)
        .args(["post", "add", "Too late", "--platform", "twitter", "--at", "1000"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Scheduled time must be in the future"));
}

#[test]
fn test_post_add_rejects_empty_content() {
    let (_temp_dir, config_path) = setup_test_env();

    queue(&config_path)
        .args(["post", "add", "   ", "--platform", "twitter", "--at", "+1h"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Content cannot be empty"));
}

#[test]
fn test_stats_json_for_empty_day() {
    let (_temp_dir, config_path) = setup_test_env();

    let output = queue(&config_path)
        .args(["stats", "--day", "2025-01-01", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rollup: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rollup["day"], "2025-01-01");
    assert_eq!(rollup["tasks_completed"], 0);
    assert_eq!(rollup["rate_limited"], 0);
}

#[test]
fn test_stats_text_and_bad_day() {
    let (_temp_dir, config_path) = setup_test_env();

    queue(&config_path)
        .args(["stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tasks completed:  0"));

    queue(&config_path)
        .args(["stats", "--day", "someday"])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn test_invalid_config_exit_code() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[scheduling]\nbatch_limit = 0\n").unwrap();

    queue(config_path.to_str().unwrap())
        .args(["task", "list"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("scheduling.batch_limit"));
}

#[test]
fn test_help() {
    Command::cargo_bin("cadence-queue")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("task import"))
        .stdout(predicate::str::contains("CADENCE_DB_PATH"));
}
