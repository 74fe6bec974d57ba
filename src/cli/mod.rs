//! Command-line interface and Vault credential resolution.
//!
//! This is the calling layer: it is the only place that reads process
//! environment variables or prompts the user.  Everything it resolves is
//! passed into the library as explicit arguments.

pub mod commands;
pub mod output;

use std::path::Path;

use clap::Parser;
use tracing::debug;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, SopsTransitError};
use crate::keywrap::{approle_login, VaultTransitClient};
use crate::scope::ScopeFields;

/// sops-transit CLI: SOPS encryption backed by Vault Transit.
#[derive(Parser)]
#[command(
    name = "sops-transit",
    about = "Encrypt JSON and YAML documents into SOPS files with Vault Transit",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault server URL
    #[arg(long, env = "VAULT_ADDR", global = true)]
    pub vault_address: Option<String>,

    /// Vault token (mutually exclusive with --role-id/--secret-id)
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true, global = true)]
    pub vault_token: Option<String>,

    /// Mount path of the Transit engine (default: transit)
    #[arg(long, global = true)]
    pub transit_engine: Option<String>,

    /// AppRole role ID
    #[arg(long, env = "VAULT_ROLE_ID", global = true)]
    pub role_id: Option<String>,

    /// AppRole secret ID
    #[arg(long, env = "VAULT_SECRET_ID", hide_env_values = true, global = true)]
    pub secret_id: Option<String>,

    /// Mount path of the AppRole auth method (default: approle)
    #[arg(long, global = true)]
    pub approle_path: Option<String>,

    /// Config file (default: ./.sops-transit.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log diagnostic events to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Encrypt a document into a SOPS file
    Encrypt(EncryptArgs),

    /// Render a .sops.yaml pointing at a Transit key
    Config {
        /// Name of the Transit key referenced by every creation rule
        #[arg(short, long)]
        key: String,

        /// Path regex for one creation rule (repeatable; omit for a catch-all rule)
        #[arg(long = "path-regex")]
        path_regexes: Vec<String>,

        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

/// Arguments of `sops-transit encrypt`.
#[derive(clap::Args)]
pub struct EncryptArgs {
    /// Input file, or `-` for stdin
    pub input: String,

    /// Name of the Transit key that wraps the data key
    #[arg(short, long)]
    pub key: String,

    /// Output format: json or yaml (default: from --output extension, then config)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Input format: json or yaml (default: from the input extension, then json)
    #[arg(long)]
    pub input_type: Option<String>,

    /// Indent JSON output with two spaces
    #[arg(long, overrides_with = "no_pretty")]
    pub pretty: bool,

    /// Compact JSON output, even when the config file sets `pretty = true`
    #[arg(long, overrides_with = "pretty")]
    pub no_pretty: bool,

    /// Leave keys ending with this suffix in plaintext
    #[arg(long)]
    pub unencrypted_suffix: Option<String>,

    /// Encrypt only keys ending with this suffix
    #[arg(long)]
    pub encrypted_suffix: Option<String>,

    /// Leave keys matching this regex in plaintext
    #[arg(long)]
    pub unencrypted_regex: Option<String>,

    /// Encrypt only keys matching this regex
    #[arg(long)]
    pub encrypted_regex: Option<String>,

    /// Output file path (prints to stdout if omitted)
    #[arg(short, long)]
    pub output: Option<String>,
}

impl EncryptArgs {
    pub fn scope_fields(&self) -> ScopeFields {
        ScopeFields {
            unencrypted_suffix: self.unencrypted_suffix.clone(),
            encrypted_suffix: self.encrypted_suffix.clone(),
            unencrypted_regex: self.unencrypted_regex.clone(),
            encrypted_regex: self.encrypted_regex.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load settings from `--config`, or from the current directory.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    match &cli.config {
        Some(path) => Settings::load_file(Path::new(path)),
        None => Settings::load(&std::env::current_dir()?),
    }
}

/// Resolve the Vault address: flag / `VAULT_ADDR`, then the config file.
pub fn vault_address(cli: &Cli, settings: &Settings) -> Result<String> {
    non_empty(&cli.vault_address)
        .or_else(|| non_empty(&settings.vault_address))
        .map(str::to_string)
        .ok_or_else(|| {
            SopsTransitError::ConfigError(format!(
                "missing Vault address — set --vault-address, VAULT_ADDR, or vault_address in {}",
                Settings::FILE_NAME
            ))
        })
}

/// Resolve the Transit engine mount path.
pub fn transit_engine(cli: &Cli, settings: &Settings) -> String {
    non_empty(&cli.transit_engine)
        .unwrap_or(&settings.transit_engine)
        .to_string()
}

/// Get a Vault token, trying in order:
/// 1. `--vault-token` / `VAULT_TOKEN`
/// 2. AppRole login with `--role-id` and `--secret-id`
/// 3. Interactive prompt (only when attached to a terminal)
///
/// A token and AppRole credentials together are rejected, as is only one
/// half of the AppRole pair.
pub fn resolve_token(cli: &Cli, settings: &Settings, address: &str) -> Result<Zeroizing<String>> {
    let token = non_empty(&cli.vault_token);
    let role_id = non_empty(&cli.role_id);
    let secret_id = non_empty(&cli.secret_id);

    if token.is_some() && (role_id.is_some() || secret_id.is_some()) {
        return Err(SopsTransitError::ConfigError(
            "conflicting Vault credentials — provide either a token or AppRole credentials (--role-id + --secret-id), not both".into(),
        ));
    }

    match (token, role_id, secret_id) {
        (Some(token), _, _) => Ok(Zeroizing::new(token.to_string())),
        (None, Some(role_id), Some(secret_id)) => {
            let mount = non_empty(&cli.approle_path).unwrap_or(&settings.approle_path);
            debug!(mount, "logging in with AppRole");
            approle_login(address, mount, role_id, secret_id, settings.timeout())
        }
        (None, Some(_), None) | (None, None, Some(_)) => Err(SopsTransitError::ConfigError(
            "incomplete AppRole credentials — both --role-id and --secret-id are required".into(),
        )),
        (None, None, None) => prompt_token(),
    }
}

/// Build a Transit client from the resolved address, token and engine.
pub fn transit_client(cli: &Cli, settings: &Settings) -> Result<VaultTransitClient> {
    let address = vault_address(cli, settings)?;
    let token = resolve_token(cli, settings, &address)?;
    VaultTransitClient::new(
        &address,
        &token,
        &transit_engine(cli, settings),
        settings.timeout(),
    )
}

fn prompt_token() -> Result<Zeroizing<String>> {
    if !console::user_attended() {
        return Err(SopsTransitError::ConfigError(
            "missing Vault credentials — set --vault-token (or VAULT_TOKEN), or --role-id and --secret-id".into(),
        ));
    }

    let token = dialoguer::Password::new()
        .with_prompt("Enter Vault token")
        .interact()
        .map_err(|e| SopsTransitError::CommandFailed(format!("token prompt: {e}")))?;
    Ok(Zeroizing::new(token))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
