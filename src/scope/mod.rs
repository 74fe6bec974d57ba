//! Scope policy: which leaves get encrypted and which stay plaintext.
//!
//! Callers hand us four optional option strings (`ScopeFields`), mirroring
//! the SOPS CLI flags.  At most one may be non-empty; converting them into
//! a `ScopePolicy` enforces that and compiles regexes up front, so the
//! policy itself can never be in a conflicting state.
//!
//! Matching is done on the nearest enclosing mapping key of a leaf.
//! Sequence indices are skipped, so array elements inherit the decision
//! of the key that holds the array.

use regex::Regex;
use tracing::debug;

use crate::document::PathSegment;
use crate::errors::{Result, SopsTransitError};

pub const UNENCRYPTED_SUFFIX: &str = "unencrypted_suffix";
pub const ENCRYPTED_SUFFIX: &str = "encrypted_suffix";
pub const UNENCRYPTED_REGEX: &str = "unencrypted_regex";
pub const ENCRYPTED_REGEX: &str = "encrypted_regex";

/// Raw scope options as supplied by the caller.
///
/// Empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFields {
    pub unencrypted_suffix: Option<String>,
    pub encrypted_suffix: Option<String>,
    pub unencrypted_regex: Option<String>,
    pub encrypted_regex: Option<String>,
}

impl ScopeFields {
    /// The `(field name, value)` pairs that are actually set.
    fn active(&self) -> Vec<(&'static str, &str)> {
        [
            (UNENCRYPTED_SUFFIX, &self.unencrypted_suffix),
            (ENCRYPTED_SUFFIX, &self.encrypted_suffix),
            (UNENCRYPTED_REGEX, &self.unencrypted_regex),
            (ENCRYPTED_REGEX, &self.encrypted_regex),
        ]
        .into_iter()
        .filter_map(|(name, value)| match value.as_deref() {
            Some(v) if !v.is_empty() => Some((name, v)),
            _ => None,
        })
        .collect()
    }
}

/// The single active scope rule for one encryption call.
#[derive(Debug, Clone, Default)]
pub enum ScopePolicy {
    /// Encrypt every leaf.
    #[default]
    None,
    UnencryptedSuffix(String),
    EncryptedSuffix(String),
    UnencryptedRegex(Regex),
    EncryptedRegex(Regex),
}

impl ScopePolicy {
    /// Validate raw caller options and build the policy.
    ///
    /// Fails with `ScopeConflict` when more than one field is set and with
    /// `InvalidScopeRegex` when a regex does not compile.
    pub fn from_fields(fields: &ScopeFields) -> Result<Self> {
        let active = fields.active();

        if active.len() > 1 {
            return Err(SopsTransitError::ScopeConflict(
                active.iter().map(|(name, _)| *name).collect(),
            ));
        }

        let Some(&(name, value)) = active.first() else {
            return Ok(ScopePolicy::None);
        };

        let policy = match name {
            UNENCRYPTED_SUFFIX => ScopePolicy::UnencryptedSuffix(value.to_string()),
            ENCRYPTED_SUFFIX => ScopePolicy::EncryptedSuffix(value.to_string()),
            UNENCRYPTED_REGEX => ScopePolicy::UnencryptedRegex(compile(name, value)?),
            _ => ScopePolicy::EncryptedRegex(compile(name, value)?),
        };

        debug!(rule = name, pattern = value, "scope policy selected");
        Ok(policy)
    }

    /// The metadata field name and value recording this policy, if any.
    pub fn field(&self) -> Option<(&'static str, &str)> {
        match self {
            ScopePolicy::None => None,
            ScopePolicy::UnencryptedSuffix(s) => Some((UNENCRYPTED_SUFFIX, s)),
            ScopePolicy::EncryptedSuffix(s) => Some((ENCRYPTED_SUFFIX, s)),
            ScopePolicy::UnencryptedRegex(r) => Some((UNENCRYPTED_REGEX, r.as_str())),
            ScopePolicy::EncryptedRegex(r) => Some((ENCRYPTED_REGEX, r.as_str())),
        }
    }

    /// Decide whether the leaf at `path` should be encrypted.
    pub fn should_encrypt(&self, path: &[PathSegment]) -> bool {
        should_encrypt(path, self)
    }
}

fn compile(field: &'static str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| SopsTransitError::InvalidScopeRegex {
        field,
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Name of the nearest enclosing mapping key, skipping sequence indices.
pub fn leaf_name(path: &[PathSegment]) -> Option<&str> {
    path.iter().rev().find_map(|segment| match segment {
        PathSegment::Key(k) => Some(k.as_str()),
        PathSegment::Index(_) => None,
    })
}

/// Decide whether the leaf at `path` is encrypted under `policy`.
///
/// A leaf with no enclosing mapping key has no name, which never matches
/// a suffix or regex.
pub fn should_encrypt(path: &[PathSegment], policy: &ScopePolicy) -> bool {
    let name = leaf_name(path);
    match policy {
        ScopePolicy::None => true,
        ScopePolicy::UnencryptedSuffix(s) => !name.is_some_and(|n| n.ends_with(s.as_str())),
        ScopePolicy::EncryptedSuffix(s) => name.is_some_and(|n| n.ends_with(s.as_str())),
        ScopePolicy::UnencryptedRegex(r) => !name.is_some_and(|n| r.is_match(n)),
        ScopePolicy::EncryptedRegex(r) => name.is_some_and(|n| r.is_match(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.to_string())
    }

    fn fields_with_encrypted_regex(r: &str) -> ScopeFields {
        ScopeFields {
            encrypted_regex: Some(r.to_string()),
            ..ScopeFields::default()
        }
    }

    #[test]
    fn no_fields_means_encrypt_everything() {
        let policy = ScopePolicy::from_fields(&ScopeFields::default()).unwrap();
        assert!(matches!(policy, ScopePolicy::None));
        assert!(policy.should_encrypt(&[key("anything")]));
        assert!(policy.should_encrypt(&[PathSegment::Index(0)]));
        assert!(policy.field().is_none());
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let fields = ScopeFields {
            unencrypted_suffix: Some(String::new()),
            encrypted_regex: Some("^pw$".into()),
            ..ScopeFields::default()
        };
        let policy = ScopePolicy::from_fields(&fields).unwrap();
        assert_eq!(policy.field(), Some((ENCRYPTED_REGEX, "^pw$")));
    }

    #[test]
    fn two_fields_conflict() {
        let fields = ScopeFields {
            unencrypted_suffix: Some("_plain".into()),
            encrypted_regex: Some("^pw$".into()),
            ..ScopeFields::default()
        };
        match ScopePolicy::from_fields(&fields) {
            Err(SopsTransitError::ScopeConflict(names)) => {
                assert_eq!(names, vec![UNENCRYPTED_SUFFIX, ENCRYPTED_REGEX]);
            }
            other => panic!("expected ScopeConflict, got {other:?}"),
        }
    }

    #[test]
    fn bad_regex_is_reported_with_field_and_pattern() {
        let err = ScopePolicy::from_fields(&fields_with_encrypted_regex("(unclosed")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(ENCRYPTED_REGEX));
        assert!(msg.contains("(unclosed"));
    }

    #[test]
    fn unencrypted_suffix_leaves_matching_keys_plain() {
        let policy = ScopePolicy::UnencryptedSuffix("_unencrypted".into());
        assert!(!policy.should_encrypt(&[key("host_unencrypted")]));
        assert!(policy.should_encrypt(&[key("password")]));
    }

    #[test]
    fn encrypted_suffix_only_encrypts_matching_keys() {
        let policy = ScopePolicy::EncryptedSuffix("_secret".into());
        assert!(policy.should_encrypt(&[key("db"), key("pass_secret")]));
        assert!(!policy.should_encrypt(&[key("db_secret"), key("host")]));
    }

    #[test]
    fn regex_matches_leaf_name_regardless_of_depth() {
        let policy =
            ScopePolicy::from_fields(&fields_with_encrypted_regex("^(password|api_key)$")).unwrap();
        assert!(policy.should_encrypt(&[key("database"), key("password")]));
        assert!(!policy.should_encrypt(&[key("database"), key("host")]));
        assert!(policy.should_encrypt(&[key("api_key")]));
    }

    #[test]
    fn regex_is_a_partial_match() {
        let policy = ScopePolicy::UnencryptedRegex(Regex::new("host").unwrap());
        assert!(!policy.should_encrypt(&[key("db_hostname")]));
        assert!(policy.should_encrypt(&[key("port")]));
    }

    #[test]
    fn sequence_elements_inherit_enclosing_key() {
        let policy = ScopePolicy::EncryptedSuffix("_keys".into());
        let path = [key("api_keys"), PathSegment::Index(3)];
        assert!(policy.should_encrypt(&path));
        let nested = [key("hosts"), PathSegment::Index(0), PathSegment::Index(1)];
        assert!(!policy.should_encrypt(&nested));
    }

    #[test]
    fn nameless_leaf_never_matches_rules() {
        let path = [PathSegment::Index(0)];
        assert!(!ScopePolicy::EncryptedSuffix("x".into()).should_encrypt(&path));
        assert!(ScopePolicy::UnencryptedSuffix("x".into()).should_encrypt(&path));
    }
}
