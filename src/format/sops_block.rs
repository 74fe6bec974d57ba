//! The `sops` metadata block as it appears in emitted files.
//!
//! Field names match what the `sops` CLI reads back:
//!
//! ```text
//! sops:
//!   hc_vault: [{vault_address, engine_path, key_name, created_at, enc}]
//!   lastmodified: <RFC 3339>
//!   mac: ENC[...]
//!   <scope field>: <value>      # only when a scope rule is active
//!   version: <format version>
//! ```

use serde::Serialize;

use crate::envelope::metadata::{rfc3339, KEY_PROVIDER};
use crate::envelope::Metadata;
use crate::scope::{ENCRYPTED_REGEX, ENCRYPTED_SUFFIX, UNENCRYPTED_REGEX, UNENCRYPTED_SUFFIX};

#[derive(Debug, Serialize)]
pub struct SopsBlock<'a> {
    pub hc_vault: Vec<VaultKeyEntry<'a>>,
    pub lastmodified: String,
    pub mac: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unencrypted_suffix: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_suffix: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unencrypted_regex: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_regex: Option<&'a str>,
    pub version: &'a str,
}

#[derive(Debug, Serialize)]
pub struct VaultKeyEntry<'a> {
    pub vault_address: &'a str,
    pub engine_path: &'a str,
    pub key_name: &'a str,
    pub created_at: String,
    pub enc: &'a str,
}

impl<'a> SopsBlock<'a> {
    pub fn from_metadata(metadata: &'a Metadata) -> Self {
        let hc_vault = metadata
            .key_groups
            .iter()
            .filter(|entry| entry.provider == KEY_PROVIDER)
            .map(|entry| VaultKeyEntry {
                vault_address: &entry.vault_address,
                engine_path: &entry.engine_path,
                key_name: &entry.key_name,
                created_at: rfc3339(&entry.created_at),
                enc: &entry.wrapped_data_key,
            })
            .collect();

        let scope_value = |field: &str| match &metadata.scope {
            Some((name, value)) if *name == field => Some(value.as_str()),
            _ => None,
        };

        Self {
            hc_vault,
            lastmodified: metadata.last_modified_rfc3339(),
            mac: metadata.mac.to_string(),
            unencrypted_suffix: scope_value(UNENCRYPTED_SUFFIX),
            encrypted_suffix: scope_value(ENCRYPTED_SUFFIX),
            unencrypted_regex: scope_value(UNENCRYPTED_REGEX),
            encrypted_regex: scope_value(ENCRYPTED_REGEX),
            version: metadata.format_version,
        }
    }
}
