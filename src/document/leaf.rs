//! Encrypted leaf values and their `ENC[...]` envelope string.
//!
//! ```text
//! ENC[AES256_GCM,data:<base64>,iv:<base64>,tag:<base64>,type:<str|int|float|bool>]
//! ```

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::errors::{Result, SopsTransitError};

/// Cipher identifier embedded in every envelope string.
pub const ENVELOPE_ALGORITHM: &str = "AES256_GCM";

/// Original type of an encrypted scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Str,
    Int,
    Float,
    Bool,
}

impl ScalarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarKind::Str => "str",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
        }
    }
}

impl FromStr for ScalarKind {
    type Err = SopsTransitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "str" => Ok(ScalarKind::Str),
            "int" => Ok(ScalarKind::Int),
            "float" => Ok(ScalarKind::Float),
            "bool" => Ok(ScalarKind::Bool),
            other => Err(SopsTransitError::InputFormat(format!(
                "unknown encrypted value type '{other}'"
            ))),
        }
    }
}

/// A scalar replaced by its AES-256-GCM ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedLeaf {
    pub data: Vec<u8>,
    pub iv: Vec<u8>,
    pub tag: Vec<u8>,
    pub kind: ScalarKind,
}

impl fmt::Display for EncryptedLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ENC[{},data:{},iv:{},tag:{},type:{}]",
            ENVELOPE_ALGORITHM,
            BASE64.encode(&self.data),
            BASE64.encode(&self.iv),
            BASE64.encode(&self.tag),
            self.kind.as_str()
        )
    }
}

impl FromStr for EncryptedLeaf {
    type Err = SopsTransitError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = |why: &str| {
            SopsTransitError::InputFormat(format!("malformed encrypted value '{s}': {why}"))
        };

        let body = s
            .strip_prefix("ENC[")
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| malformed("missing ENC[...] framing"))?;

        let mut parts = body.split(',');
        if parts.next() != Some(ENVELOPE_ALGORITHM) {
            return Err(malformed("unsupported algorithm"));
        }

        let mut field = |name: &str| {
            take_field(&mut parts, name).ok_or_else(|| malformed(&format!("missing {name} field")))
        };

        let data = field("data")?;
        let iv = field("iv")?;
        let tag = field("tag")?;
        let kind = field("type")?;

        let decode = |name: &str, value: &str| {
            BASE64
                .decode(value)
                .map_err(|e| malformed(&format!("{name} is not base64: {e}")))
        };

        Ok(EncryptedLeaf {
            data: decode("data", data)?,
            iv: decode("iv", iv)?,
            tag: decode("tag", tag)?,
            kind: kind.parse()?,
        })
    }
}

/// Pop the next `name:value` part, returning `value`.
fn take_field<'a>(parts: &mut std::str::Split<'a, char>, name: &str) -> Option<&'a str> {
    parts.next()?.strip_prefix(name)?.strip_prefix(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedLeaf {
        EncryptedLeaf {
            data: b"cipher".to_vec(),
            iv: vec![1u8; 12],
            tag: vec![2u8; 16],
            kind: ScalarKind::Int,
        }
    }

    #[test]
    fn display_uses_envelope_grammar() {
        let text = sample().to_string();
        assert!(text.starts_with("ENC[AES256_GCM,data:Y2lwaGVy,iv:"));
        assert!(text.ends_with(",type:int]"));
    }

    #[test]
    fn parse_reads_back_display_output() {
        let leaf = sample();
        let parsed: EncryptedLeaf = leaf.to_string().parse().unwrap();
        assert_eq!(parsed, leaf);
    }

    #[test]
    fn parse_rejects_plain_strings() {
        assert!("hello".parse::<EncryptedLeaf>().is_err());
        assert!("ENC[AES256_GCM,data:AA==]".parse::<EncryptedLeaf>().is_err());
        assert!("ENC[OTHER,data:AA==,iv:AA==,tag:AA==,type:str]"
            .parse::<EncryptedLeaf>()
            .is_err());
    }

    #[test]
    fn parse_rejects_unknown_type() {
        assert!("ENC[AES256_GCM,data:AA==,iv:AA==,tag:AA==,type:blob]"
            .parse::<EncryptedLeaf>()
            .is_err());
    }
}
