//! Document codecs.
//!
//! This module provides:
//! - JSON parsing and SOPS-JSON emission (`json`)
//! - YAML parsing and SOPS-YAML emission (`yaml`)
//! - The `sops` metadata block shared by both (`sops_block`)
//!
//! Both emitters write the original document keys first, in their
//! original order, followed by a top-level `sops` key.

pub mod json;
pub mod sops_block;
pub mod yaml;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::document::Node;
use crate::envelope::EncryptedDocument;
use crate::errors::{Result, SopsTransitError};

/// Name of the top-level metadata key.
pub const METADATA_KEY: &str = "sops";

/// A textual document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Parse plaintext input into a tree.
    pub fn parse(self, text: &str) -> Result<Node> {
        match self {
            DocumentFormat::Json => json::parse(text),
            DocumentFormat::Yaml => yaml::parse(text),
        }
    }

    /// Serialize an encrypted document.  `pretty` only affects JSON.
    pub fn serialize(self, document: &EncryptedDocument, pretty: bool) -> Result<String> {
        match self {
            DocumentFormat::Json => json::serialize(&document.tree, &document.metadata, pretty),
            DocumentFormat::Yaml => yaml::serialize(&document.tree, &document.metadata),
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl FromStr for DocumentFormat {
    type Err = SopsTransitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(DocumentFormat::Json),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            other => Err(SopsTransitError::ConfigError(format!(
                "unknown document format '{other}' — use 'json' or 'yaml'"
            ))),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentFormat::Json => "json",
            DocumentFormat::Yaml => "yaml",
        })
    }
}

/// The root pairs of a tree about to be emitted.
///
/// The root must be a mapping, and must not already use the metadata key.
pub(crate) fn root_pairs(tree: &Node) -> Result<&[(String, Node)]> {
    let Node::Mapping(pairs) = tree else {
        return Err(SopsTransitError::Serialization(
            "document root must be a mapping".into(),
        ));
    };
    if pairs.iter().any(|(k, _)| k == METADATA_KEY) {
        return Err(SopsTransitError::Serialization(format!(
            "document already has a top-level '{METADATA_KEY}' key, which is reserved for metadata"
        )));
    }
    Ok(pairs)
}

/// A short excerpt of `text` around `line`/`column` (both 1-based), for
/// parse error messages.
pub(crate) fn excerpt(text: &str, line: usize, column: usize) -> String {
    const WIDTH: usize = 40;

    let Some(src) = text.lines().nth(line.saturating_sub(1)) else {
        return String::new();
    };
    let chars: Vec<char> = src.chars().collect();
    let center = column.saturating_sub(1).min(chars.len());
    let start = center.saturating_sub(WIDTH / 2);
    let end = (start + WIDTH).min(chars.len());
    chars[start..end].iter().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_parse() {
        assert_eq!("json".parse::<DocumentFormat>().unwrap(), DocumentFormat::Json);
        assert_eq!("YML".parse::<DocumentFormat>().unwrap(), DocumentFormat::Yaml);
        assert!("toml".parse::<DocumentFormat>().is_err());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("secrets.yaml")),
            Some(DocumentFormat::Yaml)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/b.json")),
            Some(DocumentFormat::Json)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn root_with_sops_key_is_rejected() {
        let tree = Node::mapping(vec![("sops".into(), Node::string("x"))]).unwrap();
        assert!(matches!(
            root_pairs(&tree),
            Err(SopsTransitError::Serialization(_))
        ));
    }

    #[test]
    fn excerpt_centers_on_column() {
        let text = "line one\n{\"a\": tru }";
        assert_eq!(excerpt(text, 2, 7), "{\"a\": tru }");
        assert_eq!(excerpt(text, 9, 1), "");
    }
}
