//! CLI integration tests
//!
//! Tests the devproxy CLI using assert_cmd. Everything here exercises the
//! pre-tunnel validation path, which fails before any cloud tool or tunnel
//! process is needed.

use assert_cmd::Command;
use predicates::prelude::*;

fn devproxy() -> Command {
    Command::cargo_bin("devproxy")
        .expect("Failed to locate devproxy binary - ensure it's built before running tests")
}

fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).expect("write config fixture");
    (dir, path)
}

#[test]
fn test_cli_help() {
    devproxy()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("devproxy"))
        .stdout(predicate::str::contains("local-port tunnels"));
}

#[test]
fn test_cli_version() {
    devproxy()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("devproxy"));
}

#[test]
fn test_cli_missing_explicit_config_fails() {
    devproxy()
        .args(["--config", "/nonexistent/devproxy.toml", "--env", "dev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_cli_no_environment_fails() {
    let (_dir, path) = write_config("");

    devproxy()
        .args(["--config", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Environment is not set"));
}

#[test]
fn test_cli_unknown_environment_fails() {
    let (_dir, path) = write_config(
        r#"
[[proxies]]
environment = "dev"
cloud_project = "acme-dev"

[proxies.bastion]
name = "bastion-dev"
"#,
    );

    devproxy()
        .args(["--config", path.to_str().unwrap(), "--env", "prod"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("prod"));
}

#[test]
fn test_cli_duplicate_local_port_fails_before_any_tunnel() {
    // Workload and bastion connection both claim 8080
    let (_dir, path) = write_config(
        r#"
[[proxies]]
environment = "dev"
cloud_project = "acme-dev"

[proxies.bastion]
name = "bastion-dev"
connections = [
    { local_port = 8080, remote_host = "db.internal", remote_port = 5432 },
]

[[proxies.workloads]]
namespace = "default"
app = "api"
local_port = 8080
remote_port = 80
"#,
    );

    devproxy()
        .args(["--config", path.to_str().unwrap(), "--env", "dev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate local port 8080"));
}

#[test]
fn test_cli_missing_cloud_project_fails() {
    let (_dir, path) = write_config(
        r#"
[[proxies]]
environment = "dev"

[proxies.bastion]
name = "bastion-dev"
"#,
    );

    devproxy()
        .args(["--config", path.to_str().unwrap(), "--env", "dev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cloud_project"));
}
