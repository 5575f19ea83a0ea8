//! # CLI Backend Tests
//!
//! Drives the batch backend against stub engine executables (shell
//! scripts in a tempdir) to exercise exit-code classification, stderr
//! propagation, timeout expiry and script-file cleanup without a real
//! engine installation.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use spudrun::backend::{Backend, CliBackend};
use spudrun::{CliConfig, Command, CommandSequence, ErrorKind};

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Write an executable stub named like the engine front-end
fn write_stub(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("plaxis2dx");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn backend_for(executable: PathBuf, timeout_secs: u64) -> CliBackend {
    CliBackend::new(CliConfig {
        executable,
        timeout_secs,
    })
}

fn small_sequence() -> CommandSequence {
    CommandSequence::new(vec![
        Command::comment("stub run"),
        Command::statement("a", "statement a"),
        Command::statement("b", "statement b"),
    ])
}

// ============================================================================
// SUCCESS PATH
// ============================================================================

#[test]
fn test_zero_exit_is_success_with_captured_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let stub = write_stub(dir.path(), "echo 'engine run finished'; exit 0");
    let mut backend = backend_for(stub, 10);

    let outcome = backend.execute(&small_sequence(), "calculation").unwrap();
    assert_eq!(outcome.commands_run, 3);
    assert!(outcome.diagnostic.unwrap().contains("engine run finished"));
}

#[test]
fn test_stub_receives_runscript_flag_and_script_content() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("args.txt");
    let copy = dir.path().join("script-copy.txt");
    let stub = write_stub(
        dir.path(),
        &format!(
            "echo \"$1\" > {}\ncp \"${{1#--runscript=}}\" {}\nexit 0",
            capture.display(),
            copy.display()
        ),
    );
    let mut backend = backend_for(stub, 10);
    backend.execute(&small_sequence(), "model setup").unwrap();

    let args = fs::read_to_string(&capture).unwrap();
    assert!(args.starts_with("--runscript="));

    let script = fs::read_to_string(&copy).unwrap();
    assert_eq!(script, "# stub run\nstatement a\nstatement b\n");
}

#[test]
fn test_script_file_removed_after_run() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("args.txt");
    let stub = write_stub(
        dir.path(),
        &format!("echo \"${{1#--runscript=}}\" > {}\nexit 0", capture.display()),
    );
    let mut backend = backend_for(stub, 10);
    backend.execute(&small_sequence(), "model setup").unwrap();

    let script_path = fs::read_to_string(&capture).unwrap().trim().to_string();
    assert!(!script_path.is_empty());
    assert!(
        !Path::new(&script_path).exists(),
        "script file '{script_path}' must be removed after the run"
    );
}

#[test]
fn test_script_file_removed_after_failed_run() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("args.txt");
    let stub = write_stub(
        dir.path(),
        &format!("echo \"${{1#--runscript=}}\" > {}\nexit 3", capture.display()),
    );
    let mut backend = backend_for(stub, 10);
    backend.execute(&small_sequence(), "model setup").unwrap_err();

    let script_path = fs::read_to_string(&capture).unwrap().trim().to_string();
    assert!(!Path::new(&script_path).exists());
}

// ============================================================================
// FAILURE CLASSIFICATION
// ============================================================================

#[test]
fn test_nonzero_exit_with_stderr_is_cli_scripting_error() {
    let dir = tempfile::tempdir().unwrap();
    let stub = write_stub(dir.path(), "echo 'CLI ERROR XYZ' >&2; exit 1");
    let mut backend = backend_for(stub, 10);

    let err = backend.execute(&small_sequence(), "calculation").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CliScripting);
    assert!(err.message().contains("CLI ERROR XYZ"));
    assert!(err.raw().contains("CLI ERROR XYZ"));
    assert_eq!(err.context(), "calculation");
}

#[test]
fn test_empty_stderr_falls_back_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let stub = write_stub(dir.path(), "echo 'wrote nothing to stderr'; exit 2");
    let mut backend = backend_for(stub, 10);

    let err = backend.execute(&small_sequence(), "calculation").unwrap_err();
    assert!(err.raw().contains("wrote nothing to stderr"));
}

#[test]
fn test_solver_message_in_stderr_keeps_calculation_kind() {
    let dir = tempfile::tempdir().unwrap();
    let stub = write_stub(dir.path(), "echo 'phase 1 did not converge' >&2; exit 1");
    let mut backend = backend_for(stub, 10);

    let err = backend.execute(&small_sequence(), "calculation").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Calculation);
}

#[test]
fn test_timeout_expiry_is_calculation_error() {
    let dir = tempfile::tempdir().unwrap();
    let stub = write_stub(dir.path(), "sleep 30");
    let mut backend = backend_for(stub, 1);

    let start = std::time::Instant::now();
    let err = backend.execute(&small_sequence(), "calculation").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Calculation);
    assert!(err.message().contains("timeout") || err.message().contains("wall-clock"));
    // the child was killed, not waited out
    assert!(start.elapsed() < std::time::Duration::from_secs(10));
}

#[test]
fn test_unrecognized_executable_rejected_without_running() {
    let dir = tempfile::tempdir().unwrap();
    // executable exists and would succeed, but the name is wrong
    let path = dir.path().join("some-other-tool");
    fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();

    let mut backend = backend_for(path, 10);
    let err = backend.execute(&small_sequence(), "model setup").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CliScripting);
}
