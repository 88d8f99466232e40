//! Command line behavior for the offline commands

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SNAPSHOT: &str = r#"{
  "timestamp": "2015-11-27T04:39:45.737Z",
  "members": {
    "amy": { "last7Days": 40, "allTime": 832 },
    "bob": { "last7Days": 55, "allTime": 120 }
  }
}"#;

fn statshop() -> Command {
    let mut cmd = Command::cargo_bin("statshop").unwrap();
    cmd.env_remove("RUST_LOG").arg("--log-level").arg("error");
    cmd
}

fn write_snapshot(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, SNAPSHOT).unwrap();
    path
}

#[test]
fn test_table_merge_prints_new_table() {
    let dir = TempDir::new().unwrap();
    let snapshot = write_snapshot(&dir);

    statshop()
        .args(["table", "merge", "--table"])
        .arg(dir.path().join("missing.tsv"))
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout("Entity\t2015-11-27T04:39:45.737Z\namy\t832\nbob\t120\n");

    assert!(!dir.path().join("missing.tsv").exists());
}

#[test]
fn test_table_merge_write_appends_column() {
    let dir = TempDir::new().unwrap();
    let snapshot = write_snapshot(&dir);
    let table = dir.path().join("slack_stats.tsv");
    std::fs::write(&table, "Users\t2015-11-20T00:00:00.000Z\namy\t800\n").unwrap();

    statshop()
        .args(["--quiet", "table", "merge", "--write", "--table"])
        .arg(&table)
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout("");

    assert_eq!(
        std::fs::read_to_string(&table).unwrap(),
        "Users\t2015-11-20T00:00:00.000Z\t2015-11-27T04:39:45.737Z\n\
         amy\t800\t832\n\
         bob\t\t120\n"
    );
}

#[test]
fn test_table_merge_conflict_exit_code() {
    let dir = TempDir::new().unwrap();
    let snapshot = write_snapshot(&dir);
    let table = dir.path().join("slack_stats.tsv");
    std::fs::write(&table, "Entity\t2015-11-27T04:39:45.737Z\namy\t1\n").unwrap();

    statshop()
        .args(["--json", "table", "merge", "--table"])
        .arg(&table)
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("\"code\": \"merge_conflict_in_table\""));
}

#[test]
fn test_summary_json() {
    let dir = TempDir::new().unwrap();
    let snapshot = write_snapshot(&dir);

    statshop()
        .args(["--json", "summary", "--snapshot"])
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": true"))
        .stdout(predicate::str::contains("2015-11-27@04-39-45"))
        .stdout(predicate::str::contains("Add latest Slack stats from 2015-11-27"))
        .stdout(predicate::str::contains("there have been 952 messages"));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("statshop.toml");

    statshop()
        .args(["config", "init", "--upstream", "hackclub/stats", "--path"])
        .arg(&path)
        .assert()
        .success();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("upstream = \"hackclub/stats\""));
    assert!(content.contains("[fork_poll]"));

    statshop()
        .args(["config", "init", "--upstream", "hackclub/stats", "--path"])
        .arg(&path)
        .assert()
        .code(2);
}

#[test]
fn test_publish_without_token() {
    let dir = TempDir::new().unwrap();
    let snapshot = write_snapshot(&dir);
    let config = dir.path().join("statshop.toml");
    std::fs::write(&config, "upstream = \"hackclub/stats\"\n").unwrap();

    statshop()
        .env_remove("STATSHOP_TEST_TOKEN")
        .args(["--json", "publish", "--token-env", "STATSHOP_TEST_TOKEN", "--config"])
        .arg(&config)
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("\"code\": \"missing_token\""));
}
