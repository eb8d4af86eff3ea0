#![allow(deprecated)] // assert_cmd::Command::cargo_bin is deprecated but replacement requires nightly

use predicates::prelude::*;
use std::fs;

fn promptty_cmd() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("promptty").unwrap()
}

#[test]
fn test_missing_command_prints_usage() {
    promptty_cmd()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_invalid_regex_is_rejected_before_running() {
    let temp_dir = tempfile::tempdir().unwrap();
    let marker = temp_dir.path().join("ran");

    promptty_cmd()
        .arg("--command")
        .arg(format!("touch {}", marker.display()))
        .arg("--prompt-regex")
        .arg("(unclosed")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("compile regex"));

    assert!(!marker.exists(), "command must not start");
}

#[test]
fn test_invalid_timeout_is_rejected() {
    promptty_cmd()
        .args(["--command", "true", "--timeout-duration", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid duration"));
}

#[test]
fn test_stdout_and_exit_code_pass_through() {
    promptty_cmd()
        .args(["--command", "sh -c 'echo hello; echo oops >&2; exit 3'"])
        .assert()
        .code(3)
        .stdout("hello\n")
        .stderr(predicate::str::contains("oops"));
}

#[test]
fn test_escape_stdout() {
    promptty_cmd()
        .args(["--command", "echo hello", "--escape-stdout"])
        .assert()
        .success()
        .stdout(r#""hello\n""#);
}

#[test]
fn test_quiet_suppresses_output() {
    promptty_cmd()
        .args(["--command", "sh -c 'echo hello; exit 4'", "--quiet"])
        .assert()
        .code(4)
        .stdout("");
}

#[test]
fn test_timeout_exits_with_sentinel() {
    promptty_cmd()
        .args(["--command", "sleep 5", "--timeout-duration", "100ms", "--quiet"])
        .assert()
        .code(255);
}

#[test]
fn test_timeout_keeps_stderr_clean_by_default() {
    promptty_cmd()
        .args(["--command", "sleep 5", "--timeout-duration", "100ms"])
        .assert()
        .code(255)
        .stdout("")
        .stderr("");

    promptty_cmd()
        .args(["--command", "sleep 5", "--timeout-duration", "100ms"])
        .args(["--stdin", "secret", "--prompt-contains", "Password"])
        .assert()
        .code(255)
        .stderr("");
}

#[test]
fn test_prompt_answered_with_legacy_flag_names() {
    let temp_dir = tempfile::tempdir().unwrap();
    let script = temp_dir.path().join("confirm.sh");
    fs::write(
        &script,
        "printf 'Really delete? [y/N] '\nread reply\necho \"reply=$reply\"\n",
    )
    .unwrap();

    for flag in ["--prompt-endsWith", "--stdinRule-endsWith", "--prompt-ends-with"] {
        promptty_cmd()
            .arg("--command")
            .arg(format!("sh {}", script.display()))
            .args(["--stdin", "y", "--timeout-duration", "10s"])
            .args([flag, "[y/N] "])
            .assert()
            .success()
            .stdout(predicate::str::contains("reply=y"));
    }
}

#[test]
fn test_verbose_logs_prompt() {
    let temp_dir = tempfile::tempdir().unwrap();
    let script = temp_dir.path().join("login.sh");
    fs::write(&script, "printf 'Password: '\nread pw\necho ok\n").unwrap();

    promptty_cmd()
        .arg("--command")
        .arg(format!("sh {}", script.display()))
        .args(["--stdin", "pw", "--prompt-contains", "Password"])
        .args(["--verbose", "--escape-prompt"])
        .assert()
        .success()
        .stderr(predicate::str::contains(r#"[Prompt] '"Password: "'"#));
}

#[test]
fn test_shared_quote_policy() {
    promptty_cmd()
        .args(["--command", r#"echo 'a"b c'"#, "--quote-policy", "shared"])
        .assert()
        .success()
        .stdout("ab c\n");

    promptty_cmd()
        .args(["--command", r#"echo 'a"b  c'"#])
        .assert()
        .success()
        .stdout("ab  c\n");
}
