//! Integration tests for the codeweave binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn codeweave_cmd() -> Command {
    Command::cargo_bin("codeweave").unwrap()
}

/// Command isolated from the user's config, services and index
fn isolated_cmd(home: &TempDir) -> Command {
    let mut cmd = codeweave_cmd();
    cmd.env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_CACHE_HOME", home.path().join("cache"))
        .env("CODEWEAVE_DB", home.path().join("index.sqlite"))
        .env_remove("CODEWEAVE_EMBEDDINGS_URL")
        .env_remove("CODEWEAVE_RERANK_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn write_dataset(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const TUNE_ROWS: &str = concat!(
    r#"{"id":"1","query":"login flow","vectorRetrieved":["x","r"],"lexicalRetrieved":["r","x"],"relevant":{"r":1}}"#,
    "\n",
    r#"{"id":"2","query":"session store","vector_retrieved":["y","s"],"lexical_retrieved":["s","y"],"relevant":{"s":1}}"#,
    "\n"
);

#[test]
fn test_help_lists_subcommands() {
    codeweave_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("tune"))
        .stdout(predicate::str::contains("benchmark"))
        .stdout(predicate::str::contains("feedback"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn test_tune_prefers_lexical_weighting() {
    let home = TempDir::new().unwrap();
    let dataset = write_dataset(&home, "tune.jsonl", TUNE_ROWS);

    isolated_cmd(&home)
        .arg("tune")
        .arg(&dataset)
        .args(["--grid", r#"{"w_vec":[0.3,0.7],"rrf_k0":[10]}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Auto Tune Summary ==="))
        .stdout(predicate::str::contains("Candidates:  4"))
        .stdout(predicate::str::contains("Best:        w_vec=0.3000 | w_lex=0.7000"))
        .stdout(predicate::str::contains("Best Score:  1.000000"));
}

#[test]
fn test_tune_json_output() {
    let home = TempDir::new().unwrap();
    let dataset = write_dataset(&home, "tune.jsonl", TUNE_ROWS);

    isolated_cmd(&home)
        .args(["--format", "json", "tune"])
        .arg(&dataset)
        .args(["--target", "recall@1", "--top", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""target": "recall@1""#))
        .stdout(predicate::str::contains(r#""total_candidates": 18"#));
}

#[test]
fn test_tune_rejects_invalid_grid() {
    let home = TempDir::new().unwrap();
    let dataset = write_dataset(&home, "tune.jsonl", TUNE_ROWS);

    isolated_cmd(&home)
        .arg("tune")
        .arg(&dataset)
        .args(["--grid", r#"{"w_vec":[1.0]}"#])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("grid.w_vec"))
        .stderr(predicate::str::contains("Usage: codeweave tune"));
}

#[test]
fn test_tune_rejects_unknown_target() {
    let home = TempDir::new().unwrap();
    let dataset = write_dataset(&home, "tune.jsonl", TUNE_ROWS);

    isolated_cmd(&home)
        .arg("tune")
        .arg(&dataset)
        .args(["--target", "precision"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("target"));
}

#[test]
fn test_tune_reports_bad_dataset_row() {
    let home = TempDir::new().unwrap();
    let dataset = write_dataset(
        &home,
        "tune.jsonl",
        concat!(
            r#"{"id":"1","query":"ok","vectorRetrieved":[],"lexicalRetrieved":[],"relevant":{}}"#,
            "\n",
            r#"{"id":"2","vectorRetrieved":[],"lexicalRetrieved":[],"relevant":{}}"#,
            "\n"
        ),
    );

    isolated_cmd(&home)
        .arg("tune")
        .arg(&dataset)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("row 2"));
}

#[test]
fn test_benchmark_summary() {
    let home = TempDir::new().unwrap();
    let dataset = write_dataset(
        &home,
        "bench.json",
        r#"[{"id":"1","query":"where is login","retrieved":["a","b","c"],"relevant":{"b":1}}]"#,
    );

    isolated_cmd(&home)
        .arg("benchmark")
        .arg(&dataset)
        .args(["--k", "1,3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Offline Benchmark Summary ==="))
        .stdout(predicate::str::contains("Queries:  1"))
        .stdout(predicate::str::contains("MRR:      0.500000"))
        .stdout(predicate::str::contains("Recall@1: 0.000000"))
        .stdout(predicate::str::contains("Recall@3: 1.000000"));
}

#[test]
fn test_feedback_on_empty_index() {
    let home = TempDir::new().unwrap();

    isolated_cmd(&home)
        .arg("feedback")
        .arg(home.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Events:            0"));

    isolated_cmd(&home)
        .args(["--format", "json", "feedback"])
        .arg(home.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""total_events": 0"#));
}

#[test]
fn test_doctor_on_empty_index() {
    let home = TempDir::new().unwrap();

    isolated_cmd(&home)
        .arg("doctor")
        .arg(home.path())
        .arg("--repair")
        .assert()
        .success()
        .stdout(predicate::str::contains("Status:            consistent"));
}

#[test]
fn test_search_requires_embeddings_endpoint() {
    let home = TempDir::new().unwrap();

    isolated_cmd(&home)
        .args(["search", "where is login handled", "-C"])
        .arg(home.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("CODEWEAVE_EMBEDDINGS_URL"));
}

#[test]
fn test_search_rejects_conflicting_language_options() {
    let home = TempDir::new().unwrap();

    isolated_cmd(&home)
        .args(["search", "auth", "--source-code-only", "--lang", "rust", "-C"])
        .arg(home.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("mutually exclusive"));
}
