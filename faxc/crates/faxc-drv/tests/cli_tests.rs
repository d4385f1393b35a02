//! End-to-end CLI tests driving the real `faxc` binary, per §8's worked
//! examples and §6.2/§6.3's exit-code contract.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn faxc() -> Command {
    Command::cargo_bin("faxc").unwrap()
}

fn write_source(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn compiles_minimal_exit_program() {
    let dir = tempdir().unwrap();
    let input = write_source(&dir, "main.fax", "fn main() { exit(0); }");

    faxc().arg(&input).assert().success();

    let output = input.with_extension("ll");
    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("fn main"));
    assert!(text.contains("call extern"));
}

#[test]
fn field_projection_lowers_to_load_with_field_projection() {
    let dir = tempdir().unwrap();
    let input = write_source(
        &dir,
        "fields.fax",
        "struct P { x: i32, y: i32 }\nfn main() { let p = P{ x: 1, y: 2 }; let q = p.y; exit(0); }",
    );

    faxc().arg(&input).arg("--dump-mir").assert().success().stdout(
        predicate::str::contains("init").and(predicate::str::contains(".1")),
    );
}

#[test]
fn if_with_unified_branches_produces_a_phi() {
    let dir = tempdir().unwrap();
    let input = write_source(
        &dir,
        "if_branch.fax",
        "fn main() { let b = true; let x = if b { 1 } else { 2 }; exit(x); }",
    );

    faxc()
        .arg(&input)
        .arg("--dump-mir")
        .assert()
        .success()
        .stdout(predicate::str::contains("phi"));
}

#[test]
fn break_with_value_flows_through_a_phi() {
    let dir = tempdir().unwrap();
    let input = write_source(
        &dir,
        "break_value.fax",
        "fn main() {\n    let v = loop { break 42; };\n    exit(v);\n}",
    );

    faxc()
        .arg(&input)
        .arg("--dump-mir")
        .assert()
        .success()
        .stdout(predicate::str::contains("42"));
}

#[test]
fn auto_ref_method_call_on_string_literal() {
    let dir = tempdir().unwrap();
    let input = write_source(
        &dir,
        "method_call.fax",
        "fn main() {\n    let s = \"hello\".len();\n    exit(s as i32);\n}",
    );

    faxc().arg(&input).assert().success();
}

#[test]
fn exit_outside_main_is_rejected() {
    let dir = tempdir().unwrap();
    let input = write_source(
        &dir,
        "bad_exit.fax",
        "fn helper() { exit(0); }\nfn main() { helper(); }",
    );

    faxc()
        .arg(&input)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("exit"));

    assert!(!input.with_extension("ll").exists());
}

#[test]
fn explicit_output_path_is_honored() {
    let dir = tempdir().unwrap();
    let input = write_source(&dir, "main.fax", "fn main() { exit(0); }");
    let output = dir.path().join("custom.out");

    faxc().arg(&input).arg(&output).assert().success();

    assert!(output.exists());
    assert!(!input.with_extension("ll").exists());
}

#[test]
fn missing_input_file_is_an_error() {
    faxc()
        .arg("/nonexistent/path/does_not_exist.fax")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn undefined_name_is_rejected_with_exit_one() {
    let dir = tempdir().unwrap();
    let input = write_source(&dir, "undefined.fax", "fn main() { exit(undefined_name); }");

    faxc().arg(&input).assert().failure().code(1);
}
