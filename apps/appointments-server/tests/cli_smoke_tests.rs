//! CLI smoke tests for the appointments-server binary
//!
//! These drive the compiled binary: help output, configuration validation,
//! and a short live run answering real HTTP requests.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

fn run_appointments_server(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_appointments-server"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute appointments-server")
}

/// Write `body` as a config file; `{HOME}` expands to a per-test home dir.
fn write_config(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let home = dir.path().join("home").to_string_lossy().replace('\\', "/");
    let path = dir.path().join(name);
    std::fs::write(&path, body.replace("{HOME}", &home)).expect("Failed to write config file");
    path
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("Failed to pick a free port")
}

/// Minimal HTTP/1.1 client: returns the raw response text.
async fn http(port: u16, method: &str, path: &str, body: &str) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await?;
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Type: application/json\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await?;
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await?;
    Ok(raw)
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_cli_help_command() {
    let output = run_appointments_server(&["--help"]);
    assert!(output.status.success(), "Help command should succeed");

    let stdout = stdout_of(&output);
    assert!(stdout.contains("appointments-server"));
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("check"));
    assert!(stdout.contains("--config"));
    assert!(stdout.contains("--mock"));
}

#[test]
fn test_cli_version_command() {
    let output = run_appointments_server(&["--version"]);
    assert!(output.status.success(), "Version command should succeed");

    let stdout = stdout_of(&output);
    assert!(stdout.contains("appointments-server"));
    assert!(stdout.contains("0.1.0"));
}

#[test]
fn test_cli_invalid_command() {
    let output = run_appointments_server(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
    assert!(stderr_of(&output).contains("error"));
}

#[test]
fn test_cli_config_validation_missing_file() {
    for flag in ["--config", "-c"] {
        let output = run_appointments_server(&[flag, "/nonexistent/config.yaml", "check"]);
        assert!(!output.status.success(), "Should fail with missing config");
        let stderr = stderr_of(&output);
        assert!(
            stderr.contains("config file not found"),
            "Should mention the missing file ({flag}): {stderr}"
        );
    }
}

#[test]
fn test_cli_config_validation_invalid_yaml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&temp_dir, "invalid.yaml", "invalid: yaml: content: [unclosed");

    let output = run_appointments_server(&["--config", config_path.to_str().unwrap(), "check"]);
    assert!(!output.status.success(), "Should fail with invalid YAML");
    let stderr = stderr_of(&output);
    assert!(
        stderr.contains("invalid configuration"),
        "Should mention the config parse failure: {stderr}"
    );
}

#[test]
fn test_cli_config_validation_valid_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        &temp_dir,
        "valid.yaml",
        r#"
server:
  home_dir: "{HOME}"
  host: "127.0.0.1"
  port: 8087

database:
  url: "sqlite://database/appointments.db"

logging:
  default:
    console_level: info
    file: "logs/appointments.log"
    file_level: info
    max_backups: 3
    max_size_mb: 10

modules:
  appointments:
    collection: "appointments"
"#,
    );

    let output = run_appointments_server(&["--config", config_path.to_str().unwrap(), "check"]);
    if !output.status.success() {
        eprintln!("STDERR: {}", stderr_of(&output));
        eprintln!("STDOUT: {}", stdout_of(&output));
    }
    assert!(output.status.success(), "Should succeed with valid config");
    assert!(stdout_of(&output).contains("Configuration check passed"));
}

#[test]
fn test_cli_rejects_unsupported_database() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        &temp_dir,
        "mongo.yaml",
        r#"
server:
  home_dir: "{HOME}"
database:
  url: "mongodb://localhost:27017"
"#,
    );

    let output = run_appointments_server(&["--config", config_path.to_str().unwrap(), "check"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("unsupported database url"));
}

#[test]
fn test_cli_mock_flag() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        &temp_dir,
        "mock.yaml",
        r#"
server:
  home_dir: "{HOME}"
database:
  url: "mongodb://localhost:27017"
"#,
    );

    // --mock swaps the unsupported URL for the in-memory store
    let output =
        run_appointments_server(&["--config", config_path.to_str().unwrap(), "--mock", "check"]);
    if !output.status.success() {
        eprintln!("STDERR: {}", stderr_of(&output));
    }
    assert!(output.status.success(), "Should succeed with the in-memory store");
    assert!(stdout_of(&output).contains("memory://"));
}

#[test]
fn test_cli_invalid_module_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        &temp_dir,
        "module.yaml",
        r#"
server:
  home_dir: "{HOME}"
modules:
  appointments:
    colection: "typo"
"#,
    );

    let output =
        run_appointments_server(&["--config", config_path.to_str().unwrap(), "--mock", "check"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("modules.appointments"));
}

#[test]
fn test_cli_print_config_applies_overrides() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        &temp_dir,
        "print.yaml",
        r#"
server:
  home_dir: "{HOME}"
  host: "127.0.0.1"
  port: 8080
"#,
    );

    let output = run_appointments_server(&[
        "--config",
        config_path.to_str().unwrap(),
        "--port",
        "9123",
        "--print-config",
    ]);
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("port: 9123"), "{stdout}");
}

#[test]
fn test_cli_subcommand_help() {
    let output = run_appointments_server(&["run", "--help"]);
    assert!(output.status.success(), "Run subcommand help should succeed");
    assert!(stdout_of(&output).contains("Start the server"));

    let output = run_appointments_server(&["check", "--help"]);
    assert!(output.status.success(), "Check subcommand help should succeed");
    assert!(stdout_of(&output).contains("Check configuration"));
}

async fn wait_until_healthy(port: u16) -> bool {
    for _ in 0..100 {
        if let Ok(raw) = http(port, "GET", "/health", "").await {
            if raw.starts_with("HTTP/1.1 200") {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

fn spawn_server(config_path: &Path, port: u16) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_appointments-server"))
        .args([
            "--config",
            config_path.to_str().unwrap(),
            "--mock",
            "--port",
            &port.to_string(),
            "run",
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to start appointments-server")
}

#[tokio::test]
async fn test_cli_run_serves_appointments() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        &temp_dir,
        "run.yaml",
        r#"
server:
  home_dir: "{HOME}"
  host: "127.0.0.1"
  port: 8080
"#,
    );
    let port = free_port();
    let mut child = spawn_server(&config_path, port);

    assert!(wait_until_healthy(port).await, "server never became healthy");

    let raw = http(
        port,
        "POST",
        "/rest/insertAppointment",
        r#"{"id":"42","createdTime":1500000000000,"appointmentDate":1500003600000,"appointmentDuration":30,"doctorName":"Dr. Who","status":"AVAILABLE","price":120.5}"#,
    )
    .await
    .unwrap();
    assert!(raw.starts_with("HTTP/1.1 200"), "{raw}");
    assert!(raw.contains(r#"{"result":true}"#), "{raw}");

    let raw = http(port, "GET", "/rest/findAppointment", r#"{"id":"42"}"#)
        .await
        .unwrap();
    assert!(raw.contains(r#""price":120.5"#), "{raw}");
    assert!(!raw.contains("_id"), "{raw}");

    let raw = http(port, "GET", "/rest/allAppointments/", "").await.unwrap();
    assert!(raw.contains(r#""doctorName":"Dr. Who""#), "{raw}");

    let raw = http(port, "GET", "/", "").await.unwrap();
    assert!(raw.contains("Available services"), "{raw}");

    child.kill().await.unwrap();
}

#[tokio::test]
async fn test_cli_run_keeps_running_until_stopped() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        &temp_dir,
        "idle.yaml",
        r#"
server:
  home_dir: "{HOME}"
"#,
    );
    let mut child = spawn_server(&config_path, free_port());

    // Still running after the deadline means startup succeeded.
    let exited = timeout(Duration::from_secs(3), child.wait()).await;
    assert!(exited.is_err(), "server exited early: {exited:?}");

    child.kill().await.unwrap();
}
