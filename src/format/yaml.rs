//! YAML codec.
//!
//! Emits block-style YAML with two-space indentation for mappings and
//! sequences alike (`key:\n  - item`).  `serde_yaml` mappings keep
//! insertion order, so the document keys appear exactly as they were
//! parsed, followed by the `sops` block.  `serde_yaml` still renders each
//! scalar, so quoting follows its rules.

use serde_json::Number;
use serde_yaml::{Mapping, Value};

use super::sops_block::SopsBlock;
use super::{excerpt, root_pairs, METADATA_KEY};
use crate::document::{Node, Scalar};
use crate::envelope::Metadata;
use crate::errors::{Result, SopsTransitError};

/// Parse a YAML document into a tree.
pub fn parse(text: &str) -> Result<Node> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| {
        let near = e
            .location()
            .map(|loc| excerpt(text, loc.line(), loc.column()))
            .unwrap_or_default();
        SopsTransitError::InputFormat(format!("YAML parse error: {e} (near `{near}`)"))
    })?;
    from_value(value)
}

/// Serialize an encrypted tree plus its metadata as SOPS YAML.
pub fn serialize(tree: &Node, metadata: &Metadata) -> Result<String> {
    let pairs = root_pairs(tree)?;

    let mut root = Mapping::with_capacity(pairs.len() + 1);
    for (key, value) in pairs {
        root.insert(Value::String(key.clone()), to_value(value));
    }

    let block = serde_yaml::to_value(SopsBlock::from_metadata(metadata))
        .map_err(|e| SopsTransitError::Serialization(format!("sops metadata: {e}")))?;
    root.insert(Value::String(METADATA_KEY.to_string()), block);

    to_block_yaml(&Value::Mapping(root))
}

/// Render a value as block YAML with two-space indentation at every level.
pub(crate) fn to_block_yaml(value: &Value) -> Result<String> {
    let mut out = String::new();
    match value {
        Value::Mapping(map) if !map.is_empty() => write_mapping(&mut out, map, 0, false)?,
        Value::Sequence(items) if !items.is_empty() => write_sequence(&mut out, items, 0)?,
        other => {
            out.push_str(&scalar(other)?);
            out.push('\n');
        }
    }
    Ok(out)
}

/// `inline_first`: the first key continues a `- ` already on the line.
fn write_mapping(out: &mut String, map: &Mapping, indent: usize, inline_first: bool) -> Result<()> {
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 || !inline_first {
            pad(out, indent);
        }
        out.push_str(&scalar(key)?);
        out.push(':');
        write_child(out, value, indent)?;
    }
    Ok(())
}

fn write_sequence(out: &mut String, items: &[Value], indent: usize) -> Result<()> {
    for item in items {
        pad(out, indent);
        out.push('-');
        match item {
            Value::Mapping(map) if !map.is_empty() => {
                out.push(' ');
                write_mapping(out, map, indent + 2, true)?;
            }
            other => write_child(out, other, indent)?,
        }
    }
    Ok(())
}

/// Value part after `key:` or `-`: nested collections go on the next
/// lines, two spaces deeper; everything else stays on the same line.
fn write_child(out: &mut String, value: &Value, indent: usize) -> Result<()> {
    match value {
        Value::Mapping(map) if !map.is_empty() => {
            out.push('\n');
            write_mapping(out, map, indent + 2, false)
        }
        Value::Sequence(items) if !items.is_empty() => {
            out.push('\n');
            write_sequence(out, items, indent + 2)
        }
        other => {
            out.push(' ');
            out.push_str(&scalar(other)?);
            out.push('\n');
            Ok(())
        }
    }
}

/// One scalar on a single line.  Strings that `serde_yaml` would write as
/// a multi-line block fall back to a JSON double-quoted string, which is
/// also valid YAML.
fn scalar(value: &Value) -> Result<String> {
    let rendered = match value {
        Value::Mapping(_) => return Ok("{}".to_string()),
        Value::Sequence(_) => return Ok("[]".to_string()),
        Value::Tagged(tagged) => return scalar(&tagged.value),
        other => serde_yaml::to_string(other)
            .map_err(|e| SopsTransitError::Serialization(format!("YAML output: {e}")))?,
    };
    let rendered = rendered.trim_end_matches('\n');
    if !rendered.contains('\n') {
        return Ok(rendered.to_string());
    }
    match value {
        Value::String(s) => serde_json::to_string(s)
            .map_err(|e| SopsTransitError::Serialization(format!("YAML output: {e}"))),
        _ => Err(SopsTransitError::Serialization(format!(
            "YAML output: cannot render {value:?} on one line"
        ))),
    }
}

fn pad(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat(' ').take(indent));
}

fn from_value(value: Value) -> Result<Node> {
    Ok(match value {
        Value::Null => Node::Scalar(Scalar::Null),
        Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
        Value::Number(n) => Node::Scalar(Scalar::Number(number_from_yaml(&n)?)),
        Value::String(s) => Node::Scalar(Scalar::String(s)),
        Value::Sequence(items) => Node::Sequence(
            items
                .into_iter()
                .map(from_value)
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Mapping(map) => {
            let mut pairs = Vec::with_capacity(map.len());
            for (k, v) in map {
                pairs.push((key_to_string(k)?, from_value(v)?));
            }
            Node::mapping(pairs)?
        }
        // Tags carry no meaning for encryption; keep the tagged value.
        Value::Tagged(tagged) => from_value(tagged.value)?,
    })
}

fn number_from_yaml(n: &serde_yaml::Number) -> Result<Number> {
    if let Some(i) = n.as_i64() {
        return Ok(i.into());
    }
    if let Some(u) = n.as_u64() {
        return Ok(u.into());
    }
    n.as_f64().and_then(Number::from_f64).ok_or_else(|| {
        SopsTransitError::InputFormat(format!("number {n} cannot be represented (NaN or infinite)"))
    })
}

fn key_to_string(key: Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(SopsTransitError::InputFormat(format!(
            "mapping keys must be scalars, found {other:?}"
        ))),
    }
}

fn to_value(node: &Node) -> Value {
    match node {
        Node::Scalar(Scalar::Null) => Value::Null,
        Node::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
        Node::Scalar(Scalar::Number(n)) => Value::Number(number_to_yaml(n)),
        Node::Scalar(Scalar::String(s)) => Value::String(s.clone()),
        Node::Encrypted(leaf) => Value::String(leaf.to_string()),
        Node::Sequence(items) => Value::Sequence(items.iter().map(to_value).collect()),
        Node::Mapping(pairs) => Value::Mapping(
            pairs
                .iter()
                .map(|(k, v)| (Value::String(k.clone()), to_value(v)))
                .collect(),
        ),
    }
}

fn number_to_yaml(n: &Number) -> serde_yaml::Number {
    if let Some(i) = n.as_i64() {
        i.into()
    } else if let Some(u) = n.as_u64() {
        u.into()
    } else {
        n.as_f64().unwrap_or_default().into()
    }
}
