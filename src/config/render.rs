//! `.sops.yaml` rendering.
//!
//! Produces the creation rules that point the `sops` CLI at a Vault
//! Transit key.  One rule per path regex; with no regexes, a single
//! catch-all rule whose `path_regex` key is omitted entirely (an empty
//! string would match nothing useful and reads as a mistake).

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::{Result, SopsTransitError};
use crate::format::yaml::to_block_yaml;

#[derive(Debug, Serialize)]
struct SopsConfigFile<'a> {
    creation_rules: Vec<CreationRule<'a>>,
}

#[derive(Debug, Serialize)]
struct CreationRule<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    path_regex: Option<&'a str>,
    hc_vault_transit_uri: &'a str,
}

/// `<base>/v1/<engine>/keys/<key>`, with trailing slashes on `base` removed.
pub fn transit_key_uri(base_url: &str, engine_path: &str, key_name: &str) -> String {
    format!(
        "{}/v1/{engine_path}/keys/{key_name}",
        base_url.trim_end_matches('/')
    )
}

/// Render a `.sops.yaml` document.
///
/// `None` and an empty slice produce identical output.
pub fn render_sops_config(
    base_url: &str,
    engine_path: &str,
    key_name: &str,
    path_regexes: Option<&[String]>,
) -> Result<String> {
    let uri = transit_key_uri(base_url, engine_path, key_name);

    let creation_rules = match path_regexes {
        Some(regexes) if !regexes.is_empty() => regexes
            .iter()
            .map(|re| CreationRule {
                path_regex: Some(re.as_str()),
                hc_vault_transit_uri: &uri,
            })
            .collect(),
        _ => vec![CreationRule {
            path_regex: None,
            hc_vault_transit_uri: &uri,
        }],
    };

    let value = serde_yaml::to_value(SopsConfigFile { creation_rules })
        .map_err(|e| SopsTransitError::Serialization(format!("sops config: {e}")))?;
    to_block_yaml(&value)
}

/// Stable identity of a rendered config: lowercase hex SHA-256.
pub fn config_id(content: &str) -> String {
    Sha256::digest(content.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
