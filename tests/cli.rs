use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    let data = "src/language";
    write(
        temp.path(),
        &format!("{data}/kotlin/index.yaml"),
        "id: kotlin\ntitle: Kotlin\ndocuments:\n  - kotlinlang.org\nchildren:\n  - loop\n  - array\n",
    );
    write(
        temp.path(),
        &format!("{data}/kotlin/loop/index.yaml"),
        "id: loop\ntitle: Loops\nchildren:\n  - for\n  - while\n",
    );
    write(
        temp.path(),
        &format!("{data}/kotlin/loop/for.yaml"),
        "id: for\ntitle: for\ndescription: Iterate.\nusage:\n  - title: range\n    example: for (i in 1..3) {}\n",
    );
    write(temp.path(), &format!("{data}/kotlin/loop/while.yaml"), "id: while\ntitle: while\n");
    write(temp.path(), &format!("{data}/kotlin/array.yaml"), "id: array\ntitle: Arrays\n");
    temp
}

fn cheatdoc(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cheatdoc").unwrap();
    cmd.arg("--root").arg(root).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    Command::cargo_bin("cheatdoc")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("feature"))
        .stdout(predicate::str::contains("references"));
}

#[test]
fn test_tree_prints_outline() {
    let temp = workspace();

    cheatdoc(temp.path())
        .args(["tree", "kotlin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id: kotlin"))
        .stdout(predicate::str::contains("id: while"));
}

#[test]
fn test_tree_json() {
    let temp = workspace();

    let output = cheatdoc(temp.path())
        .args(["tree", "kotlin:loop", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["id"], "loop");
    assert_eq!(value["children"][1]["id"], "while");
}

#[test]
fn test_status_lists_pending_leaves() {
    let temp = workspace();

    cheatdoc(temp.path())
        .args(["status", "kotlin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Leaves: 3"))
        .stdout(predicate::str::contains("kotlin:loop/while"))
        .stdout(predicate::str::contains("kotlin:array"));
}

#[test]
fn test_missing_feature_fails() {
    let temp = workspace();

    cheatdoc(temp.path())
        .args(["feature", "kotlin:nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Feature kotlin:nope not found"));
}

#[test]
fn test_init_then_config() {
    let temp = workspace();

    cheatdoc(temp.path()).arg("init").assert().success();
    assert!(temp.path().join(".cheatdoc/config.toml").exists());
    assert!(temp.path().join("cache").is_dir());

    cheatdoc(temp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));

    cheatdoc(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("data_dir = \"src/language\""));
}

#[test]
fn test_empty_cache_stats() {
    let temp = workspace();

    cheatdoc(temp.path())
        .arg("cache")
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries: 0"));
}
