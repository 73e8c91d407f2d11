//! Command-line behaviour that does not need a running engine.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn devnet() -> Command {
    let mut cmd = Command::cargo_bin("devnet").unwrap();
    cmd.env_remove("DEVNET_CONFIG").env_remove("DEVNET_HOST");
    cmd
}

#[test]
fn test_help_lists_commands() {
    devnet()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("network"))
        .stdout(predicate::str::contains("attach"))
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("teardown"));
}

#[test]
fn test_exec_requires_command() {
    devnet()
        .args(["exec", "metricbeat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_unknown_profile_is_recoverable() {
    devnet()
        .args(["--profile", "staging", "network", "up"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("staging"));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devnet.toml");

    devnet()
        .arg("--config")
        .arg(&path)
        .args(["network", "up"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[engine]\napi_version = \"one.thirty\"").unwrap();

    devnet()
        .arg("--config")
        .arg(file.path())
        .args(["network", "up"])
        .assert()
        .code(1);
}

#[test]
fn test_unreachable_engine_is_fatal() {
    devnet()
        .args(["--host", "tcp://127.0.0.1:1", "network", "up"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not reachable"));
}
