//! Integration tests for the vmlab CLI.
//!
//! These tests invoke the `vmlab` binary as a subprocess and check
//! exit codes, stdout, and stderr.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[allow(deprecated)]
fn vmlab() -> Command {
    let mut cmd = Command::cargo_bin("vmlab").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Return the workspace root (parent of vmlab-cli/).
fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

/// Return the absolute path to a sample program, as a string argument.
fn test_program(name: &str) -> String {
    workspace_root()
        .join("tests/programs")
        .join(name)
        .to_str()
        .unwrap()
        .to_string()
}

/// Write `content` to `name` inside `dir`, returning the path.
fn write_temp(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

// ============================================================
// No-args / help
// ============================================================

#[test]
fn no_args_prints_usage_and_exits_1() {
    vmlab()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Usage: vmlab"));
}

#[test]
fn help_exits_0() {
    vmlab()
        .arg("help")
        .assert()
        .success()
        .stderr(predicate::str::contains("Commands:"));
}

#[test]
fn unknown_command_exits_1() {
    vmlab()
        .arg("frobnicate")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown command"));
}

#[test]
fn missing_input_file_argument() {
    vmlab()
        .arg("run")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("run requires an input file"));
}

// ============================================================
// Check
// ============================================================

#[test]
fn check_functional_program() {
    vmlab()
        .args(["check", &test_program("factorial.mama")])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK:"))
        .stdout(predicate::str::contains("mama"));
}

#[test]
fn check_logic_program() {
    vmlab()
        .args(["check", &test_program("append.wim")])
        .assert()
        .success()
        .stdout(predicate::str::contains("wim"));
}

#[test]
fn check_reports_assembly_error_with_line() {
    vmlab()
        .args(["check", &test_program("bad_mnemonic.mama")])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "line 2: unknown mnemonic 'frobnicate'",
        ));
}

#[test]
fn check_reports_undefined_predicate_as_link_error() {
    vmlab()
        .args(["check", &test_program("undefined.wim")])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unresolved label 'missing/1'"));
}

#[test]
fn unreadable_file_exits_1() {
    vmlab()
        .args(["check", "/nonexistent/prog.mama"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

// ============================================================
// Run
// ============================================================

#[test]
fn run_factorial() {
    vmlab()
        .args(["run", &test_program("factorial.mama")])
        .assert()
        .success()
        .stdout("120\n");
}

#[test]
fn run_append() {
    vmlab()
        .args(["run", &test_program("append.wim")])
        .assert()
        .success()
        .stdout("X = [1, 2, 3]\n");
}

#[test]
fn run_prints_first_answer_only_by_default() {
    vmlab()
        .args(["run", &test_program("colors.wim")])
        .assert()
        .success()
        .stdout("X = red\n");
}

#[test]
fn run_all_enumerates_answers() {
    vmlab()
        .args(["run", &test_program("colors.wim"), "--all"])
        .assert()
        .success()
        .stdout("X = red\nX = green\nX = blue\n");
}

#[test]
fn run_failing_query_answers_no() {
    vmlab()
        .args(["run", &test_program("purple.wim")])
        .assert()
        .success()
        .stdout("no\n");
}

#[test]
fn run_fault_exits_3() {
    vmlab()
        .args(["run", &test_program("divzero.mama")])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("division by zero"))
        .stderr(predicate::str::contains("opbin /"));
}

#[test]
fn run_step_limit_exits_3() {
    vmlab()
        .args(["run", &test_program("loop.mama"), "--max-steps", "100"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("step limit of 100 exceeded"));
}

#[test]
fn run_with_explicit_machine() {
    let dir = TempDir::new().unwrap();
    let text = fs::read_to_string(test_program("factorial.mama")).unwrap();
    let input = write_temp(&dir, "fac.txt", &text);

    vmlab()
        .args(["run", &input])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cannot tell the machine"));

    vmlab()
        .args(["run", &input, "--machine", "mama"])
        .assert()
        .success()
        .stdout("120\n");
}

#[test]
fn wrong_machine_is_an_assembly_error() {
    vmlab()
        .args(["check", &test_program("factorial.mama"), "--machine", "wim"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown mnemonic 'alloc'"));
}

#[test]
fn bad_option_value_exits_1() {
    vmlab()
        .args(["run", &test_program("loop.mama"), "--max-steps", "lots"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--max-steps"));
}

// ============================================================
// Trace
// ============================================================

#[test]
fn trace_prints_each_step_and_result() {
    vmlab()
        .args(["trace", &test_program("factorial.mama")])
        .assert()
        .success()
        .stdout(predicate::str::contains("targ 1"))
        .stdout(predicate::str::contains("gp="))
        .stdout(predicate::str::ends_with("120\n"));
}

#[test]
fn trace_honours_step_limit() {
    let output = vmlab()
        .args(["trace", &test_program("loop.mama"), "--max-steps", "5"])
        .assert()
        .failure()
        .code(3)
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    assert_eq!(stdout.lines().count(), 5);
    assert!(stdout.lines().all(|line| line.contains("jump loop")));
}

// ============================================================
// Disassemble
// ============================================================

#[test]
fn disassemble_is_canonical() {
    vmlab()
        .args(["disassemble", &test_program("factorial.mama")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("alloc 1\npushloc 0\n"))
        .stdout(predicate::str::contains("fac:\ntarg 1\n"))
        .stdout(predicate::str::contains(";").not());
}

#[test]
fn disassembly_reassembles_to_same_behaviour() {
    let dir = TempDir::new().unwrap();
    let output = vmlab()
        .args(["disassemble", &test_program("append.wim")])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let input = write_temp(&dir, "canonical.wim", &String::from_utf8(output).unwrap());

    vmlab()
        .args(["run", &input])
        .assert()
        .success()
        .stdout("X = [1, 2, 3]\n");
}

#[test]
fn disassemble_listing_has_addresses() {
    vmlab()
        .args(["disassemble", &test_program("factorial.mama"), "--listing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("    0  alloc 1\n"));
}

// ============================================================
// Logging
// ============================================================

#[test]
fn verbose_flag_enables_debug_logging() {
    vmlab()
        .args(["run", &test_program("factorial.mama"), "-v"])
        .assert()
        .success()
        .stdout("120\n")
        .stderr(predicate::str::contains("run finished"));
}

#[test]
fn quiet_by_default() {
    vmlab()
        .args(["run", &test_program("factorial.mama")])
        .assert()
        .success()
        .stderr(predicate::str::contains("run finished").not());
}
