use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Run the binary against `project` with a scrubbed environment
fn ecc_guard(project: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_ecc-guard"))
        .args(args)
        .env_clear()
        .env("PATH", std::env::var_os("PATH").unwrap_or_default())
        .env("HOME", project)
        .env("XDG_CONFIG_HOME", project.join(".config"))
        .env("CLAUDE_PROJECT_DIR", project)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn ecc-guard");

    child
        .stdin
        .take()
        .expect("Failed to open stdin")
        .write_all(stdin.as_bytes())
        .expect("Failed to write to stdin");

    child.wait_with_output().expect("Failed to wait for ecc-guard")
}

#[test]
fn test_cli_help_command() {
    let dir = TempDir::new().unwrap();
    let output = ecc_guard(dir.path(), &["--help"], "");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("run"));
    assert!(stdout.contains("tooling"));
    assert!(stdout.contains("state"));
}

#[test]
fn test_run_blocks_destructive_command() {
    let dir = TempDir::new().unwrap();
    let event = r#"{"hook_event_name":"PreToolUse","tool_name":"Bash","tool_input":{"command":"rm -rf ~"}}"#;
    let output = ecc_guard(dir.path(), &["run"], event);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("[BashGuard]"), "stderr: {stderr}");
}

#[test]
fn test_run_allows_and_persists_state_in_project() {
    let dir = TempDir::new().unwrap();
    let event = r#"{"tool_name":"Bash","session_id":"cli-1","tool_input":{"command":"ls"}}"#;
    let output = ecc_guard(dir.path(), &["run"], event);

    assert_eq!(output.status.code(), Some(0));
    assert!(dir
        .path()
        .join(".cursor/.hook_state/sessions/cli-1/tool-count.json")
        .is_file());
}

#[test]
fn test_run_json_format_denies_on_stdout() {
    let dir = TempDir::new().unwrap();
    let event = r#"{"tool_name":"Write","tool_input":{"file_path":"notes/idea.md"}}"#;
    let output = ecc_guard(dir.path(), &["run", "--format", "json"], event);

    assert_eq!(output.status.code(), Some(2));
    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["hookSpecificOutput"]["permissionDecision"], "deny");
}

#[test]
fn test_run_with_garbage_stdin_allows() {
    let dir = TempDir::new().unwrap();
    let output = ecc_guard(dir.path(), &["run"], "{{{ not json");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_stop_then_state_clear() {
    let dir = TempDir::new().unwrap();
    let output = ecc_guard(dir.path(), &["stop"], "");
    assert_eq!(output.status.code(), Some(0));

    let output = ecc_guard(dir.path(), &["state", "clear"], "");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("Removed"));
}
