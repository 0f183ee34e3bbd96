use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

use rusqlite::Connection;
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_recordkit");

/// Writes a project file declaring `Person` and `Pet`.
fn write_project(dir: &TempDir) -> PathBuf {
    let yaml = format!(
        r#"database: {db}
models:
  - name: Person
    fields:
      - {{ name: name, type: str }}
      - {{ name: age, type: int }}
  - name: Pet
    fields:
      - {{ name: owner, references: Person }}
"#,
        db = dir.path().join("project.db").display()
    );
    let path = dir.path().join("recordkit.yaml");
    fs::write(&path, yaml).expect("failed to write project file");
    path
}

fn run(args: &[&str]) -> Output {
    std::process::Command::new(BIN)
        .args(args)
        .output()
        .expect("failed to run recordkit")
}

fn tables(db: &Path) -> Vec<String> {
    let conn = Connection::open(db).unwrap();
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn no_arguments_prints_usage_and_fails() {
    let out = run(&[]);
    assert!(!out.status.success(), "running without a command should fail");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Usage"), "stderr: {stderr}");
}

#[test]
fn unknown_command_is_reported() {
    let out = run(&["frobnicate"]);
    assert!(out.status.success(), "unknown command should exit 0");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.contains("unknown command: frobnicate"),
        "stdout: {stdout}"
    );
}

#[test]
fn migrate_creates_tables() {
    let dir = TempDir::new().unwrap();
    let config = write_project(&dir);

    let out = run(&["migrate", "--config", config.to_str().unwrap()]);
    assert!(
        out.status.success(),
        "migrate should succeed. stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("2 table(s) ensured"), "stdout: {stdout}");
    assert_eq!(tables(&dir.path().join("project.db")), ["person", "pet"]);
}

#[test]
fn migrate_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = write_project(&dir);

    for _ in 0..2 {
        let out = run(&["migrate", "up", "--config", config.to_str().unwrap()]);
        assert!(out.status.success());
    }
    assert_eq!(tables(&dir.path().join("project.db")), ["person", "pet"]);
}

#[test]
fn db_flag_overrides_project_database() {
    let dir = TempDir::new().unwrap();
    let config = write_project(&dir);
    let other = dir.path().join("other.db");

    let out = run(&[
        "migrate",
        "--config",
        config.to_str().unwrap(),
        "--db",
        other.to_str().unwrap(),
    ]);
    assert!(out.status.success());
    assert_eq!(tables(&other), ["person", "pet"]);
    assert!(!dir.path().join("project.db").exists());
}

#[test]
fn migrate_status_and_down() {
    let dir = TempDir::new().unwrap();
    let config = write_project(&dir);
    let config = config.to_str().unwrap();

    let out = run(&["migrate", "status", "--config", config]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("person: missing"), "stdout: {stdout}");
    assert!(stdout.contains("Tables exist: no"), "stdout: {stdout}");

    assert!(run(&["migrate", "--config", config]).status.success());
    let conn = Connection::open(dir.path().join("project.db")).unwrap();
    conn.execute("INSERT INTO person (name, age) VALUES ('Ana', 20)", [])
        .unwrap();
    drop(conn);

    let out = run(&["migrate", "status", "--config", config]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("person: 1 row(s)"), "stdout: {stdout}");
    assert!(stdout.contains("Tables exist: yes"), "stdout: {stdout}");

    let out = run(&["migrate", "down", "--config", config]);
    assert!(out.status.success());
    assert!(tables(&dir.path().join("project.db")).is_empty());
}

#[test]
fn missing_project_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.yaml");

    let out = run(&["migrate", "--config", missing.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error: Failed to load project file"), "stderr: {stderr}");
}

#[test]
fn invalid_model_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("recordkit.yaml");
    fs::write(
        &config,
        "models:\n  - name: Person\n    fields:\n      - { name: tags, type: list }\n",
    )
    .unwrap();

    let out = run(&["migrate", "--config", config.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("unsupported type: list"), "stderr: {stderr}");
}
