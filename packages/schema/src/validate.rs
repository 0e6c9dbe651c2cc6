//! Schema validation of raw block payloads.

use crate::block::*;
use crate::registry::{schema_for, FieldRule, FieldSpec};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Unknown block type: {0}")]
    UnknownType(String),

    #[error("{block_type}: data must be a JSON object")]
    NotAnObject { block_type: BlockType },

    #[error("{block_type}: missing required field `{field}`")]
    MissingField { block_type: BlockType, field: String },

    #[error("{block_type}: unknown field `{field}`")]
    UnknownField { block_type: BlockType, field: String },

    #[error("{block_type}: invalid field `{field}`: {reason}")]
    InvalidField {
        block_type: BlockType,
        field: String,
        reason: String,
    },

    #[error("Cannot change block type from {from} to {to}")]
    TypeChange { from: BlockType, to: BlockType },

    #[error("{block_type}: {message}")]
    Malformed { block_type: BlockType, message: String },
}

/// Validate `data` against the schema registered for `block_type`
pub fn validate(block_type: &str, data: &Value) -> Result<BlockData, SchemaError> {
    let kind: BlockType = block_type.parse()?;
    validate_kind(kind, data)
}

/// Validate `data` against the schema of an already-known block type
pub fn validate_kind(kind: BlockType, data: &Value) -> Result<BlockData, SchemaError> {
    let object = data
        .as_object()
        .ok_or(SchemaError::NotAnObject { block_type: kind })?;

    check_fields(kind, "", object, schema_for(kind).fields)?;

    match kind {
        BlockType::Hero => decode(kind, data).map(BlockData::Hero),
        BlockType::Text => decode(kind, data).map(BlockData::Text),
        BlockType::Image => decode(kind, data).map(BlockData::Image),
        BlockType::Gallery => decode(kind, data).map(BlockData::Gallery),
        BlockType::Features => decode(kind, data).map(BlockData::Features),
        BlockType::Pricing => decode(kind, data).map(BlockData::Pricing),
        BlockType::Cta => decode(kind, data).map(BlockData::Cta),
        BlockType::Form => decode(kind, data).map(BlockData::Form),
        BlockType::Product => decode(kind, data).map(BlockData::Product),
        BlockType::Embed => decode(kind, data).map(BlockData::Embed),
        BlockType::Footer => decode(kind, data).map(BlockData::Footer),
    }
}

fn decode<T: DeserializeOwned>(kind: BlockType, data: &Value) -> Result<T, SchemaError> {
    serde_json::from_value(data.clone()).map_err(|e| SchemaError::Malformed {
        block_type: kind,
        message: e.to_string(),
    })
}

fn field_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn check_fields(
    kind: BlockType,
    prefix: &str,
    object: &Map<String, Value>,
    fields: &[FieldSpec],
) -> Result<(), SchemaError> {
    if let Some(unknown) = object.keys().find(|k| !fields.iter().any(|f| f.name == *k)) {
        return Err(SchemaError::UnknownField {
            block_type: kind,
            field: field_path(prefix, unknown),
        });
    }

    for spec in fields {
        let path = field_path(prefix, spec.name);
        match object.get(spec.name) {
            None | Some(Value::Null) if spec.required => {
                return Err(SchemaError::MissingField {
                    block_type: kind,
                    field: path,
                });
            }
            None | Some(Value::Null) => {}
            Some(value) => check_rule(kind, &path, value, spec.rule)?,
        }
    }

    Ok(())
}

/// ASCII letter first, then letters, digits, `-` or `_`; at most `max` bytes
pub fn is_identifier(text: &str, max: usize) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && text.len() <= max
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn check_rule(kind: BlockType, path: &str, value: &Value, rule: FieldRule) -> Result<(), SchemaError> {
    let invalid = |reason: String| SchemaError::InvalidField {
        block_type: kind,
        field: path.to_string(),
        reason,
    };

    match rule {
        FieldRule::Text { min, max } => {
            let text = value.as_str().ok_or_else(|| invalid("expected a string".into()))?;
            check_text(text, min, max).map_err(invalid)
        }
        FieldRule::Identifier { max } => {
            let text = value.as_str().ok_or_else(|| invalid("expected a string".into()))?;
            if is_identifier(text, max) {
                Ok(())
            } else {
                Err(invalid(format!(
                    "`{text}` must start with a letter and use only letters, digits, `-` or `_` (at most {max})"
                )))
            }
        }
        FieldRule::Url => {
            let text = value.as_str().ok_or_else(|| invalid("expected a string".into()))?;
            if is_well_formed_url(text) {
                Ok(())
            } else {
                Err(invalid(format!("`{text}` is not a well-formed URL")))
            }
        }
        FieldRule::Choice(options) => {
            let text = value.as_str().ok_or_else(|| invalid("expected a string".into()))?;
            if options.contains(&text) {
                Ok(())
            } else {
                Err(invalid(format!("must be one of: {}", options.join(", "))))
            }
        }
        FieldRule::Integer { min, max } => {
            let n = value.as_i64().ok_or_else(|| invalid("expected an integer".into()))?;
            if (min..=max).contains(&n) {
                Ok(())
            } else {
                Err(invalid(format!("must be between {min} and {max}")))
            }
        }
        FieldRule::Flag => {
            if value.is_boolean() {
                Ok(())
            } else {
                Err(invalid("expected true or false".into()))
            }
        }
        FieldRule::TextList { min, max, max_len } => {
            let items = value.as_array().ok_or_else(|| invalid("expected a list".into()))?;
            check_count(items.len(), min, max).map_err(&invalid)?;
            for (i, item) in items.iter().enumerate() {
                let text = item
                    .as_str()
                    .ok_or_else(|| invalid(format!("item {i} is not a string")))?;
                check_text(text, 1, max_len).map_err(|reason| invalid(format!("item {i} {reason}")))?;
            }
            Ok(())
        }
        FieldRule::List { min, max, item } => {
            let items = value.as_array().ok_or_else(|| invalid("expected a list".into()))?;
            check_count(items.len(), min, max).map_err(&invalid)?;
            for (i, entry) in items.iter().enumerate() {
                let entry_path = format!("{path}[{i}]");
                let object = entry.as_object().ok_or_else(|| SchemaError::InvalidField {
                    block_type: kind,
                    field: entry_path.clone(),
                    reason: "expected an object".into(),
                })?;
                check_fields(kind, &entry_path, object, item)?;
            }
            Ok(())
        }
    }
}

fn check_text(text: &str, min: usize, max: usize) -> Result<(), String> {
    let len = text.chars().count();
    if min > 0 && text.trim().is_empty() {
        Err("must not be blank".into())
    } else if len < min {
        Err(format!("must be at least {min} characters"))
    } else if len > max {
        Err(format!("must be at most {max} characters"))
    } else {
        Ok(())
    }
}

fn check_count(len: usize, min: usize, max: usize) -> Result<(), String> {
    if len < min {
        Err(format!("needs at least {min} entries"))
    } else if len > max {
        Err(format!("allows at most {max} entries"))
    } else {
        Ok(())
    }
}

/// Whether `url` is acceptable as a link or asset reference.
///
/// Accepted: `http(s)://host[...]`, root-relative paths (`/about`),
/// in-page anchors (`#contact`) and `mailto:` addresses. Anything else,
/// including `javascript:` and protocol-relative `//host`, is refused.
pub fn is_well_formed_url(url: &str) -> bool {
    if url.is_empty() || url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }

    if let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    {
        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        return !host.is_empty()
            && !host.starts_with(['.', '-', ':'])
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'));
    }

    if let Some(address) = url.strip_prefix("mailto:") {
        return address
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
    }

    (url.starts_with('/') && !url.starts_with("//")) || (url.starts_with('#') && url.len() > 1)
}
