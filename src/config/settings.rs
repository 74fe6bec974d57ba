use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SopsTransitError};
use crate::format::DocumentFormat;

/// Project-level configuration, loaded from `.sops-transit.toml`.
///
/// Every field has a sensible default so sops-transit works out-of-the-box
/// without any config file at all.  Command-line flags override these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vault server URL.  Falls back to `VAULT_ADDR` when unset.
    #[serde(default)]
    pub vault_address: Option<String>,

    /// Mount path of the Transit secrets engine (default: transit).
    #[serde(default = "default_transit_engine")]
    pub transit_engine: String,

    /// Mount path of the AppRole auth method (default: approle).
    #[serde(default = "default_approle_path")]
    pub approle_path: String,

    /// Upper bound on each Vault request, in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Output format when `--format` is not given (default: json).
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Pretty-print JSON output by default.
    #[serde(default)]
    pub pretty: bool,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_transit_engine() -> String {
    "transit".to_string()
}

fn default_approle_path() -> String {
    "approle".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_output_format() -> String {
    "json".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_address: None,
            transit_engine: default_transit_engine(),
            approle_path: default_approle_path(),
            timeout_secs: default_timeout_secs(),
            output_format: default_output_format(),
            pretty: false,
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".sops-transit.toml";

    /// Load settings from `<project_dir>/.sops-transit.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_file(&config_path)
    }

    /// Load settings from an explicit file, which must exist.
    pub fn load_file(config_path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            SopsTransitError::ConfigError(format!("cannot read {}: {e}", config_path.display()))
        })?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            SopsTransitError::ConfigError(format!(
                "Failed to parse {}: {e}",
                config_path.display()
            ))
        })?;

        if settings.timeout_secs == 0 {
            return Err(SopsTransitError::ConfigError(format!(
                "timeout_secs in {} must be at least 1",
                config_path.display()
            )));
        }

        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn default_output_format(&self) -> Result<DocumentFormat> {
        self.output_format.parse()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.vault_address, None);
        assert_eq!(s.transit_engine, "transit");
        assert_eq!(s.approle_path, "approle");
        assert_eq!(s.timeout(), Duration::from_secs(30));
        assert_eq!(s.default_output_format().unwrap(), DocumentFormat::Json);
        assert!(!s.pretty);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.transit_engine, "transit");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
vault_address = "https://vault.internal:8200"
transit_engine = "secret-transit"
approle_path = "ci-approle"
timeout_secs = 5
output_format = "yaml"
pretty = true
"#;
        fs::write(tmp.path().join(".sops-transit.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(
            settings.vault_address.as_deref(),
            Some("https://vault.internal:8200")
        );
        assert_eq!(settings.transit_engine, "secret-transit");
        assert_eq!(settings.approle_path, "ci-approle");
        assert_eq!(settings.timeout(), Duration::from_secs(5));
        assert_eq!(settings.default_output_format().unwrap(), DocumentFormat::Yaml);
        assert!(settings.pretty);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".sops-transit.toml"), "pretty = true\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert!(settings.pretty);
        assert_eq!(settings.transit_engine, "transit");
        assert_eq!(settings.timeout_secs, 30);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".sops-transit.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn load_rejects_zero_timeout() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".sops-transit.toml"), "timeout_secs = 0\n").unwrap();

        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn load_file_requires_existing_file() {
        let tmp = TempDir::new().unwrap();
        assert!(Settings::load_file(&tmp.path().join("missing.toml")).is_err());
    }
}
