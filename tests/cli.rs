// Drives the macrojs binary end to end.
// Requires: assert_cmd, predicates, tempfile in [dev-dependencies]

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const HYGIENE: &str = "macro foo {\n    ($name:ident) => {\n        let $name = 1;\n        let two = 2;\n    }\n}\nfoo(bar);\nfoo(baz);\n";

fn write_source(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn macrojs() -> Command {
    Command::cargo_bin("macrojs").unwrap()
}

#[test]
fn expand_prints_plain_code() {
    let dir = TempDir::new().unwrap();
    let file = write_source(&dir, "in.js", HYGIENE);
    macrojs()
        .arg("expand")
        .arg(&file)
        .assert()
        .success()
        .stdout("let bar = 1;\nlet two_1 = 2;\nlet baz = 1;\nlet two_2 = 2;\n");
}

#[test]
fn expand_writes_output_and_source_map() {
    let dir = TempDir::new().unwrap();
    let file = write_source(&dir, "in.js", HYGIENE);
    let out = dir.path().join("out.js");
    let map = dir.path().join("out.js.map");
    macrojs()
        .arg("expand")
        .arg(&file)
        .arg("-o")
        .arg(&out)
        .arg("--source-map")
        .arg(&map)
        .arg("--sources-content")
        .assert()
        .success()
        .stdout("");

    assert!(fs::read_to_string(&out).unwrap().contains("let two_2 = 2;"));
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&map).unwrap()).unwrap();
    assert_eq!(json["version"], 3);
    assert_eq!(json["file"], "out.js");
    assert_eq!(json["sourcesContent"][0], HYGIENE);
    assert!(json["names"].as_array().unwrap().iter().any(|name| name == "two"));
}

#[test]
fn expansion_errors_are_rendered_as_diagnostics() {
    let dir = TempDir::new().unwrap();
    let file = write_source(&dir, "bad.js", "macro m { (1) => { 1 } }\nm(2);\n");
    macrojs()
        .arg("expand")
        .arg(&file)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("macrojs::expansion").and(contains("no matches found for macro m")));
}

#[test]
fn syntax_errors_are_rendered_as_diagnostics() {
    let dir = TempDir::new().unwrap();
    let file = write_source(&dir, "bad.js", "let x = ;\n");
    macrojs()
        .arg("expand")
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("macrojs::syntax"));
}

#[test]
fn trace_shows_each_step() {
    let dir = TempDir::new().unwrap();
    let file = write_source(&dir, "in.js", HYGIENE);
    macrojs()
        .arg("trace")
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("Step 0: foo(bar)").and(contains("Step 1: foo(baz)")));
}

#[test]
fn trace_without_macros() {
    let dir = TempDir::new().unwrap();
    let file = write_source(&dir, "plain.js", "let x = 1;\n");
    macrojs()
        .arg("trace")
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("No macro expansions."));
}

#[test]
fn tokens_and_macros_listings() {
    let dir = TempDir::new().unwrap();
    let file = write_source(&dir, "in.js", HYGIENE);
    macrojs()
        .arg("tokens")
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("macro").and(contains("foo")));
    macrojs()
        .arg("macros")
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("foo").and(contains("($name:ident)")));
}

#[test]
fn ast_prints_json() {
    let dir = TempDir::new().unwrap();
    let file = write_source(&dir, "in.js", HYGIENE);
    let output = macrojs().arg("ast").arg("--expanded").arg(&file).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json.is_object());
    assert!(!String::from_utf8_lossy(&output.stdout).contains("MacroInvocation"));
}

#[test]
fn test_command_runs_fixture_suites() {
    let dir = TempDir::new().unwrap();
    write_source(
        &dir,
        "ok.yaml",
        "- name: identity\n  input: \"macro id { ($e:expr) => { $e } } id(1);\"\n  expected: \"1;\"\n",
    );
    macrojs()
        .arg("test")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(contains("PASS: identity"));

    write_source(&dir, "bad.yaml", "- name: wrong\n  input: \"1;\"\n  expected: \"2;\"\n");
    macrojs()
        .arg("test")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(contains("FAIL: wrong").and(contains("1 of 2 tests failed")));
}

#[test]
fn missing_file_is_reported() {
    macrojs()
        .arg("expand")
        .arg("does/not/exist.js")
        .assert()
        .failure()
        .stderr(contains("failed to read"));
}
