//! Metadata attached once to every encrypted document.
//!
//! Built at the end of an encryption call and never mutated afterwards.
//! The codecs in `crate::format` render it as the top-level `sops` block.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use crate::document::EncryptedLeaf;
use crate::keywrap::KeyLocation;

/// Cipher used for every leaf and for the MAC.
pub const ALGORITHM: &str = crate::document::leaf::ENVELOPE_ALGORITHM;

/// Provider name of the single key group entry.
pub const KEY_PROVIDER: &str = "hc_vault";

/// SOPS file-format version written into the metadata block.
pub const FORMAT_VERSION: &str = "3.9.4";

/// One wrapped copy of the data key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyGroupEntry {
    pub provider: &'static str,
    pub vault_address: String,
    pub engine_path: String,
    pub key_name: String,
    /// Opaque token returned by the key wrapper (e.g. `vault:v1:...`).
    pub wrapped_data_key: String,
    pub created_at: DateTime<Utc>,
}

impl KeyGroupEntry {
    pub fn new(location: KeyLocation, key_name: &str, wrapped_data_key: String) -> Self {
        Self {
            provider: KEY_PROVIDER,
            vault_address: location.vault_address,
            engine_path: location.engine_path,
            key_name: key_name.to_string(),
            wrapped_data_key,
            created_at: now_utc(),
        }
    }
}

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub algorithm: &'static str,
    /// Exactly one entry; multiple recipients are not supported.
    pub key_groups: Vec<KeyGroupEntry>,
    /// The active scope rule as `(field name, value)`, if any.
    pub scope: Option<(&'static str, String)>,
    pub last_modified: DateTime<Utc>,
    /// The encrypted document MAC.
    pub mac: EncryptedLeaf,
    pub format_version: &'static str,
}

impl Metadata {
    /// `last_modified` in the exact form used as the MAC's AAD.
    pub fn last_modified_rfc3339(&self) -> String {
        rfc3339(&self.last_modified)
    }
}

/// Current UTC time truncated to whole seconds.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// RFC 3339 with second precision and a `Z` suffix.
pub fn rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
