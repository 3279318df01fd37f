//! End-to-end tests for the `cluster` and `kapps` commands
//!
//! These tests invoke the actual CLI binary and validate its behavior
//! from a user's perspective. They never reach a real cluster: every
//! scenario fails (or completes) before any external tool would run.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

fn stackform() -> Command {
    Command::cargo_bin("stackform").unwrap()
}

/// Test that --help shows the cluster create command
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_cluster_create_help() {
    stackform()
        .args(["cluster", "create", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Create a cluster"));
}

/// A stack name without a stack config file is rejected
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_cluster_create_stack_name_requires_config() {
    stackform()
        .args(["cluster", "create", "--stack-name", "dev1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "stack config file is required",
        ));
}

/// An unknown provisioner fails fast with a suggestion, before any
/// external tool runs
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_cluster_create_unknown_provisioner_suggests() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("local/profiles/dev/clusters/dev1")
        .create_dir_all()
        .unwrap();

    stackform()
        .args(["cluster", "create"])
        .args(["--provider", "local"])
        .args(["--provisioner", "kopz"])
        .args(["--profile", "dev"])
        .args(["--cluster", "dev1"])
        .args(["--vars-file-or-dir", temp.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Did you mean 'kops'?"));
}

/// A missing profile directory dies with the exact expected path
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_cluster_create_missing_value_dir_fails_fast() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("local").create_dir_all().unwrap();

    stackform()
        .args(["cluster", "create"])
        .args(["--provider", "local"])
        .args(["--provisioner", "minikube"])
        .args(["--profile", "dev"])
        .args(["--cluster", "dev1"])
        .args(["--vars-file-or-dir", temp.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing directory"))
        .stderr(predicate::str::contains("local/profiles"));
}

/// kapps install without manifests is a configuration error
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_kapps_install_requires_manifests() {
    stackform()
        .args(["kapps", "install"])
        .args(["--provider", "local"])
        .args(["--profile", "dev"])
        .args(["--cluster", "dev1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no manifests configured"));
}

/// A malformed manifest aborts before anything touches a cluster
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_kapps_install_rejects_manifest_typo() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("local/profiles/dev/clusters/dev1")
        .create_dir_all()
        .unwrap();
    temp.child("manifest.yaml")
        .write_str(
            "present:\n  wordpress:\n    sources:\n    - uri: git@github.com:e/r.git\n      bracnh: typo\n",
        )
        .unwrap();

    stackform()
        .args(["kapps", "install"])
        .args(["--provider", "local"])
        .args(["--profile", "dev"])
        .args(["--cluster", "dev1"])
        .args(["--vars-file-or-dir", temp.path().to_str().unwrap()])
        .args(["--manifest", temp.child("manifest.yaml").path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Manifest error"));
}

/// Completions generate without error
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_completions_bash() {
    stackform()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stackform"));
}
