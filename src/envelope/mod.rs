//! Envelope encryption of a whole document.
//!
//! One call, in order:
//! 1. Validate the scope options (nothing else happens if they conflict).
//! 2. Generate a fresh data key.
//! 3. Wrap it with the external key service, exactly once.
//! 4. Walk the tree depth-first, encrypting selected leaves in place and
//!    hashing every leaf into the document MAC.
//! 5. Seal the MAC and build the metadata.
//!
//! Any failure aborts the call; the caller never sees a partially
//! encrypted tree.  The data key is zeroed when the call returns.

pub mod metadata;

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto::{encrypt_leaf, DataKey, MacHasher};
use crate::document::{Node, PathSegment, ScalarKind};
use crate::errors::{Result, SopsTransitError};
use crate::format::DocumentFormat;
use crate::keywrap::KeyWrapClient;
use crate::scope::{ScopeFields, ScopePolicy};

pub use metadata::{KeyGroupEntry, Metadata};

/// What to encrypt with, and which leaves.
#[derive(Debug, Clone, Default)]
pub struct EncryptRequest {
    /// Name of the master key that wraps the data key.
    pub key_name: String,
    pub scope: ScopeFields,
}

/// Full "create document" request: text in, encrypted text out.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub encrypt: EncryptRequest,
    pub input_format: DocumentFormat,
    pub output_format: DocumentFormat,
    /// Indent JSON output.  Ignored for YAML.
    pub pretty: bool,
}

/// An encrypted tree together with its metadata.
#[derive(Debug, Clone)]
pub struct EncryptedDocument {
    pub tree: Node,
    pub metadata: Metadata,
}

impl EncryptedDocument {
    /// Render in `format`.
    pub fn serialize(&self, format: DocumentFormat, pretty: bool) -> Result<String> {
        format.serialize(self, pretty)
    }
}

/// Parse `content`, encrypt it, and serialize it in the requested format.
pub fn create_document(
    content: &str,
    request: &CreateRequest,
    client: &dyn KeyWrapClient,
) -> Result<String> {
    let policy = ScopePolicy::from_fields(&request.encrypt.scope)?;
    let tree = request.input_format.parse(content)?;
    let document = encrypt_with_policy(tree, &request.encrypt.key_name, &policy, client)?;
    document.serialize(request.output_format, request.pretty)
}

/// Encrypt an already-parsed tree.
pub fn encrypt_document(
    tree: Node,
    request: &EncryptRequest,
    client: &dyn KeyWrapClient,
) -> Result<EncryptedDocument> {
    let policy = ScopePolicy::from_fields(&request.scope)?;
    encrypt_with_policy(tree, &request.key_name, &policy, client)
}

/// Encrypt a tree under an already-validated policy.
pub fn encrypt_with_policy(
    mut tree: Node,
    key_name: &str,
    policy: &ScopePolicy,
    client: &dyn KeyWrapClient,
) -> Result<EncryptedDocument> {
    if key_name.trim().is_empty() {
        return Err(SopsTransitError::ConfigError(
            "key name cannot be empty".into(),
        ));
    }
    if !tree.is_mapping() {
        return Err(SopsTransitError::InputFormat(
            "document root must be a mapping (JSON object)".into(),
        ));
    }

    let data_key = DataKey::generate();

    let wrapped = client.wrap(key_name, data_key.as_bytes())?;
    if wrapped.trim().is_empty() {
        return Err(SopsTransitError::KeyWrap(format!(
            "key service returned an empty wrapped key for '{key_name}'"
        )));
    }
    debug!(key_name, "data key wrapped");

    let mut walker = LeafWalker {
        key: &data_key,
        policy,
        mac: MacHasher::new(),
        path: Vec::new(),
        encrypted: 0,
        plaintext: 0,
    };
    walker.visit(&mut tree)?;
    let LeafWalker {
        mac,
        encrypted,
        plaintext,
        ..
    } = walker;

    let entry = KeyGroupEntry::new(client.location(), key_name, wrapped);
    let last_modified = metadata::now_utc();
    let mac = mac.seal(&data_key, &metadata::rfc3339(&last_modified))?;

    info!(key_name, encrypted, plaintext, "document encrypted");

    Ok(EncryptedDocument {
        tree,
        metadata: Metadata {
            algorithm: metadata::ALGORITHM,
            key_groups: vec![entry],
            scope: policy.field().map(|(name, value)| (name, value.to_string())),
            last_modified,
            mac,
            format_version: metadata::FORMAT_VERSION,
        },
    })
}

/// Depth-first walk state.
struct LeafWalker<'a> {
    key: &'a DataKey,
    policy: &'a ScopePolicy,
    mac: MacHasher,
    path: Vec<PathSegment>,
    encrypted: usize,
    plaintext: usize,
}

impl LeafWalker<'_> {
    fn visit(&mut self, node: &mut Node) -> Result<()> {
        match node {
            Node::Mapping(pairs) => {
                for (key, value) in pairs.iter_mut() {
                    self.path.push(PathSegment::Key(key.clone()));
                    self.visit(value)?;
                    self.path.pop();
                }
            }
            Node::Sequence(items) => {
                for (index, item) in items.iter_mut().enumerate() {
                    self.path.push(PathSegment::Index(index));
                    self.visit(item)?;
                    self.path.pop();
                }
            }
            Node::Scalar(scalar) => {
                self.mac.update(scalar);

                let kind = match scalar.kind() {
                    Some(kind) if scalar.is_encryptable() => kind,
                    _ => {
                        self.plaintext += 1;
                        return Ok(());
                    }
                };
                if !self.policy.should_encrypt(&self.path) {
                    self.plaintext += 1;
                    return Ok(());
                }

                if kind == ScalarKind::Int && !scalar.fits_signed_int() {
                    return Err(SopsTransitError::InputFormat(format!(
                        "integer at '{}' is larger than a signed 64-bit value and cannot be stored as an encrypted int",
                        self.aad().trim_end_matches(':')
                    )));
                }

                let plaintext = Zeroizing::new(scalar.plaintext_bytes());
                let leaf = encrypt_leaf(self.key, &plaintext, self.aad().as_bytes(), kind)?;
                *node = Node::Encrypted(leaf);
                self.encrypted += 1;
            }
            Node::Encrypted(_) => {
                return Err(SopsTransitError::InputFormat(format!(
                    "value at '{}' is already encrypted",
                    self.aad().trim_end_matches(':')
                )));
            }
        }
        Ok(())
    }

    /// Mapping keys from the root joined with `:`, plus a trailing `:`.
    /// Sequence indices do not appear.
    fn aad(&self) -> String {
        let mut aad = String::new();
        for segment in &self.path {
            if let PathSegment::Key(key) = segment {
                aad.push_str(key);
                aad.push(':');
            }
        }
        aad
    }
}
