//! HashiCorp Vault Transit key wrapping over HTTP.
//!
//! - `wrap` calls `POST /v1/<engine>/encrypt/<key>` with the base64 data
//!   key and returns the `vault:v1:...` ciphertext.
//! - `approle_login` exchanges an AppRole role/secret ID pair for a token.
//!
//! Address and token are always explicit constructor arguments; nothing
//! in here reads the process environment.  Every request is bounded by
//! the agent's global timeout, and a timeout is reported as a key-wrap
//! failure like any other transport error.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use ureq::Agent;
use zeroize::Zeroizing;

use super::{KeyLocation, KeyWrapClient};
use crate::crypto::DATA_KEY_LEN;
use crate::errors::{Result, SopsTransitError};

/// Default bound on a single Vault request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Vault Transit implementation of `KeyWrapClient`.
pub struct VaultTransitClient {
    agent: Agent,
    address: String,
    token: Zeroizing<String>,
    engine_path: String,
}

#[derive(Serialize)]
struct EncryptRequest<'a> {
    plaintext: &'a str,
}

#[derive(Serialize)]
struct AppRoleLoginRequest<'a> {
    role_id: &'a str,
    secret_id: &'a str,
}

impl VaultTransitClient {
    /// Build a client for the Transit engine mounted at `engine_path`.
    pub fn new(address: &str, token: &str, engine_path: &str, timeout: Duration) -> Result<Self> {
        let address = normalize_address(address)?;
        let engine_path = engine_path.trim_matches('/');
        if engine_path.is_empty() {
            return Err(SopsTransitError::ConfigError(
                "transit engine path cannot be empty".into(),
            ));
        }

        Ok(Self {
            agent: build_agent(timeout),
            address,
            token: Zeroizing::new(token.to_string()),
            engine_path: engine_path.to_string(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn engine_path(&self) -> &str {
        &self.engine_path
    }
}

impl fmt::Debug for VaultTransitClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultTransitClient")
            .field("address", &self.address)
            .field("engine_path", &self.engine_path)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl KeyWrapClient for VaultTransitClient {
    fn wrap(&self, key_name: &str, plaintext_key: &[u8; DATA_KEY_LEN]) -> Result<String> {
        let path = format!("{}/encrypt/{key_name}", self.engine_path);
        let encoded = Zeroizing::new(BASE64.encode(plaintext_key));

        debug!(path = %path, "requesting transit encrypt");
        let reply = post_json(
            &self.agent,
            &self.address,
            &path,
            Some(self.token.as_str()),
            &EncryptRequest {
                plaintext: encoded.as_str(),
            },
        )?;

        let ciphertext = reply
            .pointer("/data/ciphertext")
            .and_then(Value::as_str)
            .filter(|ct| !ct.is_empty())
            .ok_or_else(|| {
                SopsTransitError::KeyWrap(format!(
                    "unexpected response from {path}: data.ciphertext is missing or not a string"
                ))
            })?;

        Ok(ciphertext.to_string())
    }

    fn location(&self) -> KeyLocation {
        KeyLocation {
            vault_address: self.address.clone(),
            engine_path: self.engine_path.clone(),
        }
    }
}

/// Log in with AppRole credentials and return the client token.
///
/// `mount` is the auth mount path, usually `approle`.
pub fn approle_login(
    address: &str,
    mount: &str,
    role_id: &str,
    secret_id: &str,
    timeout: Duration,
) -> Result<Zeroizing<String>> {
    let address = normalize_address(address)?;
    let path = format!("auth/{}/login", mount.trim_matches('/'));

    let reply = post_json(
        &build_agent(timeout),
        &address,
        &path,
        None,
        &AppRoleLoginRequest { role_id, secret_id },
    )?;

    let token = reply
        .pointer("/auth/client_token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            SopsTransitError::KeyWrap(format!("approle login at {path}: empty auth response"))
        })?;

    info!(mount = %mount, "authenticated to Vault with AppRole");
    Ok(Zeroizing::new(token.to_string()))
}

fn build_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

fn normalize_address(address: &str) -> Result<String> {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(SopsTransitError::ConfigError(
            "Vault address cannot be empty".into(),
        ));
    }
    Ok(trimmed.to_string())
}

/// POST `body` to `<address>/v1/<path>` and decode the JSON reply.
///
/// Non-2xx answers are turned into errors carrying Vault's `errors` list.
fn post_json<B: Serialize>(
    agent: &Agent,
    address: &str,
    path: &str,
    token: Option<&str>,
    body: &B,
) -> Result<Value> {
    let url = format!("{address}/v1/{path}");

    let mut request = agent.post(&url);
    if let Some(token) = token {
        request = request.header("X-Vault-Token", token);
    }

    let mut response = request.send_json(body).map_err(|e| match e {
        ureq::Error::Timeout(which) => {
            SopsTransitError::KeyWrap(format!("POST {path}: request timed out ({which:?})"))
        }
        other => SopsTransitError::KeyWrap(format!("POST {path}: {other}")),
    })?;

    let status = response.status();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|e| SopsTransitError::KeyWrap(format!("POST {path}: reading response: {e}")))?;

    if !status.is_success() {
        return Err(SopsTransitError::KeyWrap(format!(
            "POST {path} returned {status}: {}",
            vault_error_message(&text)
        )));
    }

    serde_json::from_str(&text).map_err(|e| {
        SopsTransitError::KeyWrap(format!("POST {path}: response is not JSON: {e}"))
    })
}

/// Extract Vault's `{"errors": [...]}` list, falling back to the raw body.
fn vault_error_message(body: &str) -> String {
    let listed = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("errors").and_then(Value::as_array).map(|errors| {
            errors
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; ")
        })
    });

    match listed {
        Some(msg) if !msg.is_empty() => msg,
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_trailing_slashes_are_trimmed() {
        let client =
            VaultTransitClient::new("http://vault:8200//", "t", "/transit/", DEFAULT_TIMEOUT)
                .unwrap();
        assert_eq!(client.address(), "http://vault:8200");
        assert_eq!(client.engine_path(), "transit");
    }

    #[test]
    fn empty_address_is_rejected() {
        assert!(VaultTransitClient::new("  ", "t", "transit", DEFAULT_TIMEOUT).is_err());
    }

    #[test]
    fn debug_hides_token() {
        let client =
            VaultTransitClient::new("http://vault:8200", "s.secret", "transit", DEFAULT_TIMEOUT)
                .unwrap();
        let shown = format!("{client:?}");
        assert!(!shown.contains("s.secret"));
    }

    #[test]
    fn vault_errors_are_joined() {
        let body = r#"{"errors":["permission denied","1 error occurred"]}"#;
        assert_eq!(
            vault_error_message(body),
            "permission denied; 1 error occurred"
        );
        assert_eq!(vault_error_message(""), "empty response body");
        assert_eq!(vault_error_message("bad gateway\n"), "bad gateway");
    }
}
