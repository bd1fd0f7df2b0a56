//! Integration tests for the command line (-c, --set, --json, --diagnostics)

use std::fs;
use std::path::Path;
use std::process::Command;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn run_command(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_gridcalc"))
        // Tests must not depend on a user's ~/.config/gridcalc/config.toml.
        .arg("--no-config")
        .args(args)
        .env_remove("GRIDCALC_LOG")
        .output()
        .expect("Failed to execute gridcalc");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn write_grid(dir: &Path, json: &str) -> String {
    let path = dir.join("sheet.json");
    fs::write(&path, json).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_basic_arithmetic() {
    let (stdout, _, code) = run_command(&["-c", "5 + 3"]);
    assert_eq!(stdout.trim(), "8");
    assert_eq!(code, 0);
}

#[test]
fn test_formula_with_leading_equals() {
    let (stdout, _, code) = run_command(&["-c", "=(1 + 2) * 3 / 4"]);
    assert_eq!(stdout.trim(), "2.25");
    assert_eq!(code, 0);
}

#[test]
fn test_rejected_expression_prints_zero() {
    let (stdout, stderr, code) = run_command(&["-c", "1; DROP TABLE x", "--diagnostics"]);
    assert_eq!(stdout.trim(), "0");
    assert!(stderr.contains("invalid character"));
    assert_eq!(code, 0);
}

#[test]
fn test_set_then_command() {
    let (stdout, _, code) = run_command(&[
        "--set", "A1=10", "--set", "A2=32", "-c", "SUM(A1:A2)",
    ]);
    assert_eq!(stdout.trim(), "42");
    assert_eq!(code, 0);
}

#[test]
fn test_display_grid_from_file() {
    let dir = tempdir().unwrap();
    let file = write_grid(dir.path(), r#"[[1, 2, "=SUM(A1:B1)"], [3, 4, "=A1+B2"]]"#);
    let (stdout, _, code) = run_command(&[&file]);
    assert_eq!(stdout, "1\t2\t3\n3\t4\t5\n");
    assert_eq!(code, 0);
}

#[test]
fn test_json_output() {
    let dir = tempdir().unwrap();
    let file = write_grid(dir.path(), r#"[[null, "a", "=1/3", "=1/0"]]"#);
    let (stdout, _, code) = run_command(&[&file, "--json"]);
    assert_eq!(stdout.trim(), r#"[[null,"a",0.3333333333333333,0.0]]"#);
    assert_eq!(code, 0);

    let (stdout, _, _) = run_command(&[&file, "--json", "--errors", "tagged"]);
    assert_eq!(stdout.trim(), r##"[[null,"a",0.3333333333333333,"#DIV/0!"]]"##);
}

#[test]
fn test_diagnostics_name_the_cell() {
    let dir = tempdir().unwrap();
    let file = write_grid(dir.path(), r#"[["=B1+1", "=A1+1"]]"#);
    let (stdout, stderr, code) = run_command(&[&file, "--diagnostics"]);
    assert_eq!(stdout.trim(), "1\t1");
    assert!(stderr.contains("A1: circular reference at A1"));
    assert!(stderr.contains("B1: circular reference at B1"));
    assert_eq!(code, 0);
}

#[test]
fn test_memoized_strategy_matches() {
    let dir = tempdir().unwrap();
    let file = write_grid(
        dir.path(),
        r#"[["=B1*2", "=C1+1", 3], ["=AVERAGE(A1:C1)", "=A2-B1"]]"#,
    );
    let (recursive, _, _) = run_command(&[&file]);
    let (memoized, _, code) = run_command(&[&file, "--strategy", "memoized"]);
    assert_eq!(recursive, memoized);
    assert_eq!(recursive, "8\t4\t3\n5\t1\n");
    assert_eq!(code, 0);
}

#[test]
fn test_output_writes_raw_grid() {
    let dir = tempdir().unwrap();
    let file = write_grid(dir.path(), r#"[[1, "=A1*2"]]"#);
    let out = dir.path().join("out.json");
    let out_str = out.to_string_lossy().into_owned();
    let (_, _, code) = run_command(&[&file, "--set", "A1=5", "-o", &out_str]);
    assert_eq!(code, 0);
    let written = fs::read_to_string(&out).unwrap();
    assert_eq!(written.trim(), r#"[[5.0,"=A1*2"]]"#);
}

#[test]
fn test_invalid_assignment_fails() {
    let (_, stderr, code) = run_command(&["--set", "a1=5"]);
    assert!(stderr.contains("Invalid cell reference"));
    assert_eq!(code, 1);
}

#[test]
fn test_assignment_past_sheet_limits_fails() {
    let (stdout, stderr, code) = run_command(&["--set", "A99999999999=1", "-c", "1"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("beyond the sheet limits"));
}

#[test]
fn test_oversized_max_depth_is_rejected() {
    let (_, stderr, code) = run_command(&["--max-depth", "100000", "-c", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("max_depth must be between 1 and 128"));

    let (stdout, _, code) = run_command(&["--max-depth", "128", "-c", "=2*3"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "6");
}

#[test]
fn test_missing_config_file_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_gridcalc"))
        .args(["--config", "/definitely/not/here.toml", "-c", "1"])
        .output()
        .expect("Failed to execute gridcalc");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Config file not found"));
}
