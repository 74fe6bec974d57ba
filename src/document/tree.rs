//! Recursive document tree.
//!
//! Mappings keep their pairs in a `Vec` so insertion order survives
//! parse → encrypt → serialize untouched.  Sequences are plain vectors.

use serde_json::Number;

use super::leaf::{EncryptedLeaf, ScalarKind};
use crate::errors::{Result, SopsTransitError};

/// A scalar value at the bottom of the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    /// The type tag recorded next to the ciphertext, or `None` for null.
    pub fn kind(&self) -> Option<ScalarKind> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(_) => Some(ScalarKind::Bool),
            Scalar::Number(n) if n.is_i64() || n.is_u64() => Some(ScalarKind::Int),
            Scalar::Number(_) => Some(ScalarKind::Float),
            Scalar::String(_) => Some(ScalarKind::Str),
        }
    }

    /// Whether this scalar has a ciphertext representation at all.
    ///
    /// The `ENC[...]` grammar needs a non-empty `data:` field and has no
    /// null type, so nulls and empty strings are carried through as-is.
    pub fn is_encryptable(&self) -> bool {
        match self {
            Scalar::Null => false,
            Scalar::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Whether an integer reads back as `type:int`, which decrypting tools
    /// parse as a signed 64-bit value.  Non-integers always fit.
    pub fn fits_signed_int(&self) -> bool {
        match self {
            Scalar::Number(n) if n.is_u64() => n.as_i64().is_some(),
            _ => true,
        }
    }

    /// Canonical bytes fed to the cipher.
    pub fn plaintext_bytes(&self) -> Vec<u8> {
        match self {
            Scalar::Null => Vec::new(),
            Scalar::Bool(b) => b.to_string().into_bytes(),
            Scalar::Number(n) => canonical_number(n).into_bytes(),
            Scalar::String(s) => s.as_bytes().to_vec(),
        }
    }

    /// Canonical bytes fed to the document MAC.
    ///
    /// Identical to `plaintext_bytes` except booleans, which the
    /// decrypting tool hashes as `True` / `False`.
    pub fn mac_bytes(&self) -> Vec<u8> {
        match self {
            Scalar::Bool(true) => b"True".to_vec(),
            Scalar::Bool(false) => b"False".to_vec(),
            other => other.plaintext_bytes(),
        }
    }
}

/// Integers in plain decimal; floats in shortest round-trip form, never
/// with an exponent.
fn canonical_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    // Display for f64 is shortest-round-trip and exponent-free.
    n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string())
}

/// One step on the way from the root to a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    Mapping(Vec<(String, Node)>),
    Sequence(Vec<Node>),
    /// A scalar that has been replaced by its ciphertext.
    Encrypted(EncryptedLeaf),
}

impl Node {
    /// Build a mapping, rejecting duplicate keys.
    pub fn mapping(pairs: Vec<(String, Node)>) -> Result<Self> {
        for (i, (key, _)) in pairs.iter().enumerate() {
            if pairs[..i].iter().any(|(k, _)| k == key) {
                return Err(SopsTransitError::InputFormat(format!(
                    "duplicate mapping key '{key}'"
                )));
            }
        }
        Ok(Node::Mapping(pairs))
    }

    /// Shorthand for a string scalar.
    pub fn string(value: impl Into<String>) -> Self {
        Node::Scalar(Scalar::String(value.into()))
    }

    /// Look up a key in a mapping node.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Mapping(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Follow a dotted path of mapping keys (e.g. `"database.password"`).
    pub fn pointer(&self, dotted: &str) -> Option<&Node> {
        dotted.split('.').try_fold(self, |node, key| node.get(key))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Node::Mapping(_))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Mapping keys in order, or an empty list for non-mappings.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Node::Mapping(pairs) => pairs.iter().map(|(k, _)| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Number of encrypted leaves anywhere below this node.
    pub fn encrypted_count(&self) -> usize {
        match self {
            Node::Encrypted(_) => 1,
            Node::Scalar(_) => 0,
            Node::Mapping(pairs) => pairs.iter().map(|(_, v)| v.encrypted_count()).sum(),
            Node::Sequence(items) => items.iter().map(Node::encrypted_count).sum(),
        }
    }
}
