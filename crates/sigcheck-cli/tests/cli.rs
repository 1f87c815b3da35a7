//! Integration tests for the sigcheck CLI.
//!
//! Each test runs the `sigcheck` binary via `assert_cmd` against the
//! fixtures in `testdata/` and checks outputs and exit codes.

#![allow(deprecated)] // cargo_bin deprecation

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

const SUCCESS: &str = "Verification successful!";

fn testdata(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../testdata")
        .join(name)
}

/// A `sigcheck` command with the fixture trust root and a clean environment.
fn sigcheck() -> Command {
    let mut cmd = Command::cargo_bin("sigcheck").expect("sigcheck binary not found");
    for var in [
        "SIGCHECK_EXPECTED_OIDC_ISSUER",
        "SIGCHECK_EXPECTED_SAN",
        "SIGCHECK_REQUIRE_TSA",
        "SIGCHECK_REQUIRE_TLOG",
        "SIGCHECK_ONLINE_TLOG",
        "SIGCHECK_MIN_BUNDLE_VERSION",
        "SIGCHECK_TRUSTED_ROOT",
        "SIGCHECK_TUF_ROOT_URL",
        "SIGCHECK_ARTIFACT",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.arg("--trusted-root").arg(testdata("trusted_root.json"));
    cmd
}

fn successes(output: &std::process::Output) -> usize {
    String::from_utf8_lossy(&output.stdout).matches(SUCCESS).count()
}

// ─── success ────────────────────────────────────────────────

#[test]
fn verify_valid_bundle() {
    sigcheck()
        .arg(testdata("bundle_v03.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains(SUCCESS));
}

#[test]
fn verify_several_bundles() {
    let output = sigcheck()
        .arg(testdata("bundle_v03.json"))
        .arg(testdata("bundle_v01.json"))
        .arg(testdata("bundle_dsse.json"))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(successes(&output), 3);
}

#[test]
fn verify_with_expected_identity() {
    sigcheck()
        .args(["--expected-san", "signer@example.com"])
        .args(["--expected-oidc-issuer", "https://accounts.example.com"])
        .arg(testdata("bundle_v03.json"))
        .assert()
        .success();
}

#[test]
fn verify_artifact_file_and_digest() {
    sigcheck()
        .arg("--artifact")
        .arg(testdata("artifact.txt"))
        .arg(testdata("bundle_v03.json"))
        .arg(testdata("bundle_dsse.json"))
        .assert()
        .success();

    let digest = "sha256:19b61526e4959976e1dd129e64fbf90a5aa433777ea5830e48c970d7488efcf7";
    sigcheck()
        .args(["--artifact", digest])
        .arg(testdata("bundle_v03.json"))
        .assert()
        .success();
}

#[test]
fn verify_timestamp_only_bundle() {
    sigcheck()
        .args(["--require-tlog", "false", "--require-tsa"])
        .arg(testdata("bundle_tsa_only.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains(SUCCESS));
}

// ─── failure ────────────────────────────────────────────────

#[test]
fn first_failure_stops_the_run() {
    let output = sigcheck()
        .arg(testdata("bundle_v03.json"))
        .arg(testdata("bundle_untrusted_chain.json"))
        .arg(testdata("bundle_v01.json"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(successes(&output), 1);
    assert!(String::from_utf8_lossy(&output.stderr).contains("bundle_untrusted_chain.json"));
}

#[test]
fn identity_mismatch_fails() {
    sigcheck()
        .args(["--expected-san", "someone@else.com"])
        .arg(testdata("bundle_v03.json"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains(SUCCESS).not())
        .stderr(predicate::str::contains("someone@else.com"));
}

#[test]
fn identity_from_environment() {
    sigcheck()
        .env("SIGCHECK_EXPECTED_OIDC_ISSUER", "https://other.example.com")
        .arg(testdata("bundle_v03.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("https://other.example.com"));
}

#[test]
fn wrong_artifact_fails() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("other.txt");
    std::fs::write(&artifact, b"not what was signed\n").unwrap();

    sigcheck()
        .arg("--artifact")
        .arg(&artifact)
        .arg(testdata("bundle_v03.json"))
        .assert()
        .code(1);
}

#[test]
fn timestamp_only_bundle_needs_tlog_disabled() {
    sigcheck()
        .arg(testdata("bundle_tsa_only.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("transparency log threshold not met"));
}

#[test]
fn old_bundle_version_fails() {
    sigcheck()
        .args(["--min-bundle-version", "0.3"])
        .arg(testdata("bundle_v01.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("bundle version 0.1"));
}

#[test]
fn unknown_log_fails() {
    sigcheck()
        .arg(testdata("bundle_unknown_log.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown"));
}

#[test]
fn trusted_root_with_other_version_fails() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("trusted_root.json");
    let json = std::fs::read_to_string(testdata("trusted_root.json"))
        .unwrap()
        .replace("trustedroot+json;version=0.1", "trustedroot+json;version=0.2");
    std::fs::write(&root, json).unwrap();

    Command::cargo_bin("sigcheck")
        .unwrap()
        .env_remove("SIGCHECK_TRUSTED_ROOT")
        .arg("--trusted-root")
        .arg(&root)
        .arg(testdata("bundle_v03.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to load trusted root"));
}

#[test]
fn default_trusted_root_is_production() {
    // the fixture CA is not part of the public Sigstore instance
    Command::cargo_bin("sigcheck")
        .unwrap()
        .env_remove("SIGCHECK_TRUSTED_ROOT")
        .env_remove("SIGCHECK_TUF_ROOT_URL")
        .arg("-vv")
        .arg(testdata("bundle_v03.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("embedded Sigstore production trusted root"))
        .stderr(predicate::str::contains("certificate chain verification failed"))
        .stderr(predicate::str::contains("failed to load trusted root").not());
}

#[test]
fn missing_bundle_file_fails() {
    sigcheck()
        .arg(testdata("does_not_exist.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read bundle"));
}

#[test]
fn online_requires_tlog() {
    sigcheck()
        .args(["--require-tlog", "false", "--online-tlog"])
        .arg(testdata("bundle_v03.json"))
        .assert()
        .code(1);
}

#[test]
fn no_bundles_is_usage_error() {
    sigcheck().assert().failure().stderr(predicate::str::contains("BUNDLE"));
}
