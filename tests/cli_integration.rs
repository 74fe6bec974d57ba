//! Integration tests for the sops-transit CLI.
//!
//! These exercise the binary end-to-end using `assert_cmd`.  Nothing
//! here talks to a real Vault: `encrypt` runs against a wiremock server,
//! and the other cases either need no credentials (`config`,
//! `completions`) or fail before the first request.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: a Command for the binary with no Vault variables inherited.
fn sops_transit() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("sops-transit").expect("binary should exist");
    for var in ["VAULT_ADDR", "VAULT_TOKEN", "VAULT_ROLE_ID", "VAULT_SECRET_ID", "RUST_LOG"] {
        cmd.env_remove(var);
    }
    cmd
}

/// Helper: a mock Vault answering Transit encrypt calls for key `app`.
async fn mock_vault(engine: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/{engine}/encrypt/app")))
        .and(header("X-Vault-Token", "s.cli-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "ciphertext": "vault:v1:from-cli" } })),
        )
        .mount(&server)
        .await;
    server
}

/// Helper: run the binary in `dir` on the blocking pool and return stdout.
async fn run_blocking(dir: PathBuf, args: Vec<String>, env_token: Option<&'static str>) -> String {
    tokio::task::spawn_blocking(move || {
        let mut cmd = sops_transit();
        cmd.current_dir(&dir).args(&args);
        if let Some(token) = env_token {
            cmd.env("VAULT_TOKEN", token);
        }
        let output = cmd.output().unwrap();
        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    })
    .await
    .unwrap()
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

#[test]
fn help_flag_shows_usage() {
    sops_transit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Vault Transit"))
        .stdout(predicate::str::contains("encrypt"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn version_flag_shows_version() {
    sops_transit()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sops-transit"));
}

#[test]
fn no_args_shows_help() {
    sops_transit()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn config_prints_sops_yaml() {
    let tmp = TempDir::new().unwrap();
    sops_transit()
        .current_dir(tmp.path())
        .args([
            "--vault-address",
            "http://vault:8200/",
            "config",
            "--key",
            "app",
            "--path-regex",
            "secrets/.*",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("creation_rules:"))
        .stdout(predicate::str::contains("path_regex:"))
        .stdout(predicate::str::contains("secrets/.*"))
        .stdout(predicate::str::contains(
            "hc_vault_transit_uri: http://vault:8200/v1/transit/keys/app",
        ));
}

#[test]
fn config_reads_address_and_engine_from_settings_file() {
    let tmp = TempDir::new().unwrap();
    tmp.child(".sops-transit.toml")
        .write_str("vault_address = \"https://vault.internal\"\ntransit_engine = \"kms\"\n")
        .unwrap();

    sops_transit()
        .current_dir(tmp.path())
        .args(["config", "--key", "k", "-o", ".sops.yaml"])
        .assert()
        .success()
        .stderr(predicate::str::contains("config id:"));

    tmp.child(".sops.yaml")
        .assert(predicate::str::contains("https://vault.internal/v1/kms/keys/k"))
        .assert(predicate::str::contains("path_regex").not());
}

#[test]
fn config_without_address_fails() {
    let tmp = TempDir::new().unwrap();
    sops_transit()
        .current_dir(tmp.path())
        .args(["config", "--key", "k"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing Vault address"));
}

#[test]
fn encrypt_rejects_conflicting_scope_options() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.child("secrets.json");
    input.write_str(r#"{"password":"x"}"#).unwrap();

    sops_transit()
        .current_dir(tmp.path())
        .args([
            "--vault-address",
            "http://127.0.0.1:1",
            "--vault-token",
            "s.unused",
            "encrypt",
        ])
        .arg(input.path())
        .args([
            "--key",
            "app",
            "--encrypted-regex",
            "^password$",
            "--unencrypted-suffix",
            "_plain",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Conflicting scope options"));
}

#[test]
fn encrypt_rejects_token_with_approle() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.child("secrets.json");
    input.write_str(r#"{"password":"x"}"#).unwrap();

    sops_transit()
        .current_dir(tmp.path())
        .args([
            "--vault-address",
            "http://127.0.0.1:1",
            "--vault-token",
            "s.token",
            "--role-id",
            "role",
            "encrypt",
        ])
        .arg(input.path())
        .args(["--key", "app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("conflicting Vault credentials"));
}

#[test]
fn encrypt_missing_input_file_fails() {
    let tmp = TempDir::new().unwrap();
    sops_transit()
        .current_dir(tmp.path())
        .args(["--vault-address", "http://127.0.0.1:1", "--vault-token", "t"])
        .args(["encrypt", "nope.json", "--key", "app"])
        .assert()
        .failure();
}

#[test]
fn completions_for_unknown_shell_fail() {
    sops_transit()
        .args(["completions", "csh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown shell"));
}

#[test]
fn completions_for_bash_succeed() {
    sops_transit()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sops-transit"));
}

// ---------------------------------------------------------------------------
// encrypt against a mock Vault
// ---------------------------------------------------------------------------

#[tokio::test]
async fn encrypt_writes_a_sops_yaml_file() {
    let server = mock_vault("transit").await;
    let tmp = TempDir::new().unwrap();
    tmp.child("secrets.json")
        .write_str(r#"{"db":{"host":"h","password":"p"}}"#)
        .unwrap();

    let uri = server.uri();
    run_blocking(
        tmp.path().to_path_buf(),
        strings(&[
            "--vault-address",
            &uri,
            "--vault-token",
            "s.cli-token",
            "encrypt",
            "secrets.json",
            "--key",
            "app",
            "--encrypted-regex",
            "^password$",
            "-o",
            "secrets.enc.yaml",
        ]),
        None,
    )
    .await;

    let text = std::fs::read_to_string(tmp.path().join("secrets.enc.yaml")).unwrap();
    let doc: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
    assert_eq!(doc["db"]["host"].as_str(), Some("h"));
    assert!(doc["db"]["password"]
        .as_str()
        .unwrap()
        .starts_with("ENC[AES256_GCM,"));
    let entry = &doc["sops"]["hc_vault"][0];
    assert_eq!(entry["vault_address"].as_str(), Some(uri.as_str()));
    assert_eq!(entry["key_name"].as_str(), Some("app"));
    assert_eq!(entry["enc"].as_str(), Some("vault:v1:from-cli"));
    assert_eq!(doc["sops"]["encrypted_regex"].as_str(), Some("^password$"));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn encrypt_follows_settings_and_no_pretty_overrides_them() {
    let server = mock_vault("team-transit").await;
    let tmp = TempDir::new().unwrap();
    tmp.child(".sops-transit.toml")
        .write_str(&format!(
            "vault_address = \"{}\"\ntransit_engine = \"team-transit\"\npretty = true\n",
            server.uri()
        ))
        .unwrap();
    tmp.child("secrets.json").write_str(r#"{"token":"t"}"#).unwrap();

    run_blocking(
        tmp.path().to_path_buf(),
        strings(&["encrypt", "secrets.json", "-k", "app", "-o", "out.json"]),
        Some("s.cli-token"),
    )
    .await;
    let pretty = std::fs::read_to_string(tmp.path().join("out.json")).unwrap();
    assert!(pretty.starts_with("{\n  \""), "{pretty}");
    let doc: serde_json::Value = serde_json::from_str(&pretty).unwrap();
    assert_eq!(doc["sops"]["hc_vault"][0]["engine_path"], "team-transit");

    let compact = run_blocking(
        tmp.path().to_path_buf(),
        strings(&["encrypt", "secrets.json", "-k", "app", "-f", "json", "--no-pretty"]),
        Some("s.cli-token"),
    )
    .await;
    assert!(compact.starts_with("{\"token\":\"ENC[AES256_GCM,"), "{compact}");
    assert!(!compact.trim_end().contains('\n'));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
