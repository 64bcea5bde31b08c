//! Smoke tests of the `hostkeep` binary. None of these reach the network.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn hostkeep(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hostkeep").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("HOSTKEEP_ENGINE_VERSION")
        .env_remove("HOSTKEEP_PLUGIN_VERSION")
        .arg("--config")
        .arg(config);
    cmd
}

fn write_config(temp: &TempDir) -> std::path::PathBuf {
    let root = temp.path();
    let config = root.join("host.toml");
    std::fs::write(
        &config,
        format!(
            r#"
runtime_dir = "{runtime}"
work_dir = "{work}"
state_dir = "{state}"

[server]
executable = "NotARealServer.bin"
"#,
            runtime = root.join("server").display(),
            work = root.join("work").display(),
            state = root.join("state").display(),
        ),
    )
    .unwrap();
    config
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("hostkeep")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("mod"))
        .stdout(predicate::str::contains("server"));
}

#[test]
fn test_init_writes_config_once() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("nested/host.toml");

    hostkeep(&config).args(["init", "--runtime-dir", "/srv/game"]).assert().success();
    let content = std::fs::read_to_string(&config).unwrap();
    assert!(content.contains("/srv/game"));
    assert!(content.contains("[fetch]"));

    hostkeep(&config)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_status_uses_version_env_override() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);

    hostkeep(&config)
        .env("HOSTKEEP_ENGINE_VERSION", "3.9.0")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Engine: 3.9.0"))
        .stdout(predicate::str::contains("stopped"));
}

#[test]
fn test_status_reads_version_file() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    std::fs::create_dir_all(temp.path().join("state")).unwrap();
    std::fs::write(temp.path().join("state/plugin.version"), "2.4.0\n").unwrap();

    hostkeep(&config)
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""plugin_version": "2.4.0""#))
        .stdout(predicate::str::contains(r#""maintenance": false"#));
}

#[test]
fn test_mod_status_and_url_install_without_slug() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);

    hostkeep(&config)
        .args(["mod", "status", "my-mod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not installed"));

    hostkeep(&config)
        .args(["mod", "install", "https://forge.test/files/a.zip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--slug"));
}

#[test]
fn test_invalid_config_gets_a_suggestion() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("broken.toml");
    std::fs::write(&config, "runtime_dir = [unclosed").unwrap();

    hostkeep(&config)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TOML"));
}

#[test]
fn test_unknown_artifact_kind_is_rejected() {
    let temp = TempDir::new().unwrap();
    hostkeep(&temp.path().join("host.toml"))
        .args(["check", "launcher"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
