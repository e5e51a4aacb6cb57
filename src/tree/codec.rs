//! YAML codec for configuration documents.

use serde_yaml::Value as YamlValue;
use thiserror::Error;

use crate::tree::{ConfigTree, Mapping, Value};

/// Errors produced while decoding document text.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The text is not valid YAML.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document root is a scalar or a sequence.
    #[error("document root must be a mapping, found {0}")]
    RootNotMapping(&'static str),

    /// A mapping key that cannot be expressed as a string.
    #[error("unsupported mapping key at '{0}'")]
    UnsupportedKey(String),
}

/// Parses and serializes configuration trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeCodec;

impl TreeCodec {
    /// Parse document text. Empty and comment-only documents are empty trees.
    pub fn parse(text: &str) -> Result<ConfigTree, ParseError> {
        if text.trim().is_empty() {
            return Ok(ConfigTree::new());
        }
        match serde_yaml::from_str::<YamlValue>(text)? {
            YamlValue::Null => Ok(ConfigTree::new()),
            YamlValue::Mapping(map) => Ok(ConfigTree::from_mapping(mapping_from_yaml(map, "")?)),
            other => Err(ParseError::RootNotMapping(yaml_kind(&other))),
        }
    }

    /// Serialize a tree back to YAML text, keeping key order.
    pub fn serialize(tree: &ConfigTree) -> Result<String, serde_yaml::Error> {
        if tree.is_empty() {
            return Ok(String::new());
        }
        serde_yaml::to_string(&mapping_to_yaml(tree.as_mapping()))
    }

    /// Render a single scalar the way it should appear after `key: `.
    pub fn scalar_text(value: &Value) -> Option<String> {
        match value {
            Value::Null => Some("null".to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if s.contains('\n') => serde_json::to_string(s).ok(),
            Value::String(s) => serde_yaml::to_string(&YamlValue::String(s.clone()))
                .ok()
                .map(|text| text.trim_end().to_string()),
            Value::Sequence(_) | Value::Mapping(_) => None,
        }
    }
}

fn yaml_kind(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "a boolean",
        YamlValue::Number(_) => "a number",
        YamlValue::String(_) => "a string",
        YamlValue::Sequence(_) => "a sequence",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
    }
}

fn value_from_yaml(value: YamlValue, path: &str) -> Result<Value, ParseError> {
    Ok(match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => Value::Number(n),
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(seq) => Value::Sequence(
            seq.into_iter()
                .enumerate()
                .map(|(i, item)| value_from_yaml(item, &format!("{}[{}]", path, i)))
                .collect::<Result<_, _>>()?,
        ),
        YamlValue::Mapping(map) => Value::Mapping(mapping_from_yaml(map, path)?),
        YamlValue::Tagged(tagged) => value_from_yaml(tagged.value, path)?,
    })
}

fn mapping_from_yaml(map: serde_yaml::Mapping, path: &str) -> Result<Mapping, ParseError> {
    let mut out = Mapping::with_capacity(map.len());
    for (key, value) in map {
        let key = match key {
            YamlValue::String(s) => s,
            YamlValue::Number(n) => n.to_string(),
            YamlValue::Bool(b) => b.to_string(),
            _ => return Err(ParseError::UnsupportedKey(path.to_string())),
        };
        let child = crate::tree::join_path(path, &key);
        let value = value_from_yaml(value, &child)?;
        out.insert(key, value);
    }
    Ok(out)
}

fn value_to_yaml(value: &Value) -> YamlValue {
    match value {
        Value::Null => YamlValue::Null,
        Value::Bool(b) => YamlValue::Bool(*b),
        Value::Number(n) => YamlValue::Number(n.clone()),
        Value::String(s) => YamlValue::String(s.clone()),
        Value::Sequence(seq) => YamlValue::Sequence(seq.iter().map(value_to_yaml).collect()),
        Value::Mapping(map) => YamlValue::Mapping(mapping_to_yaml(map)),
    }
}

fn mapping_to_yaml(map: &Mapping) -> serde_yaml::Mapping {
    map.iter()
        .map(|(k, v)| (YamlValue::String(k.clone()), value_to_yaml(v)))
        .collect()
}
