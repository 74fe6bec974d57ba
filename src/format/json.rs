//! JSON codec.
//!
//! Parsing deserializes straight into a `Node`, so object keys come out in
//! document order and a repeated key is an error rather than a silent
//! overwrite.  Emission relies on `serde_json`'s `preserve_order` feature
//! and is either compact (no inserted whitespace) or pretty-printed with
//! two-space indentation.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};

use super::sops_block::SopsBlock;
use super::{excerpt, root_pairs, METADATA_KEY};
use crate::document::{Node, Scalar};
use crate::envelope::Metadata;
use crate::errors::{Result, SopsTransitError};

/// Parse a JSON document into a tree.
pub fn parse(text: &str) -> Result<Node> {
    let JsonNode(node) = serde_json::from_str(text).map_err(|e| {
        SopsTransitError::InputFormat(format!(
            "JSON parse error: {e} (near `{}`)",
            excerpt(text, e.line(), e.column())
        ))
    })?;
    Ok(node)
}

/// Serialize an encrypted tree plus its metadata as SOPS JSON.
pub fn serialize(tree: &Node, metadata: &Metadata, pretty: bool) -> Result<String> {
    let pairs = root_pairs(tree)?;

    let mut root = Map::with_capacity(pairs.len() + 1);
    for (key, value) in pairs {
        root.insert(key.clone(), to_value(value));
    }

    let block = serde_json::to_value(SopsBlock::from_metadata(metadata))
        .map_err(|e| SopsTransitError::Serialization(format!("sops metadata: {e}")))?;
    root.insert(METADATA_KEY.to_string(), block);

    let root = Value::Object(root);
    let out = if pretty {
        serde_json::to_string_pretty(&root)
    } else {
        serde_json::to_string(&root)
    };
    out.map_err(|e| SopsTransitError::Serialization(format!("JSON output: {e}")))
}

struct JsonNode(Node);

impl<'de> Deserialize<'de> for JsonNode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor).map(JsonNode)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E>(self) -> std::result::Result<Node, E> {
        Ok(Node::Scalar(Scalar::Null))
    }

    fn visit_bool<E>(self, v: bool) -> std::result::Result<Node, E> {
        Ok(Node::Scalar(Scalar::Bool(v)))
    }

    fn visit_i64<E>(self, v: i64) -> std::result::Result<Node, E> {
        Ok(Node::Scalar(Scalar::Number(v.into())))
    }

    fn visit_u64<E>(self, v: u64) -> std::result::Result<Node, E> {
        Ok(Node::Scalar(Scalar::Number(v.into())))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Node, E> {
        Number::from_f64(v)
            .map(|n| Node::Scalar(Scalar::Number(n)))
            .ok_or_else(|| E::custom(format!("number {v} is not finite")))
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Node, E> {
        Ok(Node::string(v))
    }

    fn visit_string<E>(self, v: String) -> std::result::Result<Node, E> {
        Ok(Node::string(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Node, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(JsonNode(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Node::Sequence(items))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Node, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut pairs: Vec<(String, Node)> = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            if pairs.iter().any(|(k, _)| *k == key) {
                return Err(de::Error::custom(format!("duplicate mapping key '{key}'")));
            }
            let JsonNode(value) = map.next_value()?;
            pairs.push((key, value));
        }
        Ok(Node::Mapping(pairs))
    }
}

fn to_value(node: &Node) -> Value {
    match node {
        Node::Scalar(Scalar::Null) => Value::Null,
        Node::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
        Node::Scalar(Scalar::Number(n)) => Value::Number(n.clone()),
        Node::Scalar(Scalar::String(s)) => Value::String(s.clone()),
        Node::Encrypted(leaf) => Value::String(leaf.to_string()),
        Node::Sequence(items) => Value::Array(items.iter().map(to_value).collect()),
        Node::Mapping(pairs) => Value::Object(
            pairs
                .iter()
                .map(|(k, v)| (k.clone(), to_value(v)))
                .collect(),
        ),
    }
}
