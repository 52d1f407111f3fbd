//! End-to-end runs of the built shell through `-c`.
//!
//! Everything here sticks to builtins and files under a tempdir, so the
//! tests do not depend on what the host has installed.

use std::path::Path;
use std::process::{Command, Output};

fn cshell(dir: &Path, command: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cshell"))
        .arg("-c")
        .arg(command)
        .current_dir(dir)
        .output()
        .expect("failed to run cshell")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn echo_writes_its_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(dir.path(), "echo hello world");
    assert_eq!(stdout(&out), "hello world\n");
    assert!(out.status.success());
}

#[test]
fn exit_status_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(dir.path(), "exit 3");
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn command_not_found_is_127() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(dir.path(), "no-such-program-xyz");
    assert_eq!(out.status.code(), Some(127));
    assert!(stderr(&out).contains("command not found"));
}

#[test]
fn last_status_expands() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(dir.path(), "cat /definitely/not/there; echo $?");
    assert_eq!(stdout(&out), "1\n");
}

#[test]
fn and_or_short_circuit() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(dir.path(), "echo a && echo b || echo c");
    assert_eq!(stdout(&out), "a\nb\n");

    let out = cshell(dir.path(), "cat /nope || echo rescued");
    assert_eq!(stdout(&out), "rescued\n");

    let out = cshell(dir.path(), "cat /nope && echo skipped");
    assert_eq!(stdout(&out), "");
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn semicolons_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(dir.path(), "echo one; echo two");
    assert_eq!(stdout(&out), "one\ntwo\n");
}

#[test]
fn pipeline_connects_stages() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(dir.path(), "echo through the pipe | cat");
    assert_eq!(stdout(&out), "through the pipe\n");
    assert!(out.status.success());
}

#[test]
fn three_stage_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(dir.path(), "echo deep | cat | cat");
    assert_eq!(stdout(&out), "deep\n");
}

#[test]
fn output_redirection_truncates_and_appends() {
    let dir = tempfile::tempdir().unwrap();
    cshell(dir.path(), "echo first > log");
    cshell(dir.path(), "echo second >> log");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("log")).unwrap(),
        "first\nsecond\n"
    );

    cshell(dir.path(), "echo replaced > log");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("log")).unwrap(),
        "replaced\n"
    );
}

#[test]
fn input_redirection_feeds_stdin() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("data"), "from a file\n").unwrap();
    let out = cshell(dir.path(), "cat < data");
    assert_eq!(stdout(&out), "from a file\n");
}

#[test]
fn redirection_inside_a_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("src"), "payload\n").unwrap();
    let out = cshell(dir.path(), "cat < src | cat > dst");
    assert!(out.status.success());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("dst")).unwrap(),
        "payload\n"
    );
}

#[test]
fn quoting_preserves_spacing_and_dollars() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(dir.path(), "echo 'two  spaces $HOME'");
    assert_eq!(stdout(&out), "two  spaces $HOME\n");
}

#[test]
fn variables_set_and_expand() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(dir.path(), "set NAME=world; echo hi $NAME");
    assert_eq!(stdout(&out), "hi world\n");
}

#[test]
fn command_substitution_feeds_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(dir.path(), "echo got $(echo inner)");
    assert_eq!(stdout(&out), "got inner\n");

    let out = cshell(dir.path(), "echo got `echo ticks`");
    assert_eq!(stdout(&out), "got ticks\n");
}

#[test]
fn syntax_errors_are_status_2() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(dir.path(), "echo a &&");
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("missing command"));

    let out = cshell(dir.path(), "| cat");
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn background_job_is_announced() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(dir.path(), "cat /dev/null &");
    assert!(out.status.success());
    assert!(stdout(&out).starts_with("[1] "), "got: {}", stdout(&out));
}

#[test]
fn utilities_compose_through_the_shell() {
    let dir = tempfile::tempdir().unwrap();
    let out = cshell(
        dir.path(),
        "mkdir sub && touch sub/file && ls sub && cp sub/file copied && cat copied",
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("file"));
    assert!(dir.path().join("copied").exists());
}

#[test]
fn scripts_run_from_stdin() {
    use std::io::Write;
    use std::process::Stdio;

    let dir = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_cshell"))
        .current_dir(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"echo line one\necho line two\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert_eq!(String::from_utf8_lossy(&out.stdout), "line one\nline two\n");
}
