//! The value tree and the YAML decoding of synthesized documents.
//!
//! [`synthesize`](crate::synthesize) emits block YAML: `"key": value` mapping entries,
//! `- value` sequence items, bare `"key":` and `-` openers for nested blocks and `#`
//! comments. Parsing is left to `serde_yaml`; this module only folds its values into the
//! text-scalar [`Value`] tree the decoder works on.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    io::Read,
};

use crate::{CfgErrorKind, Result};

/// An untyped configuration tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Absent value: `null`, `~` or an opener without a nested block.
    Null,
    /// A scalar, kept as text until it is decoded into a typed field.
    Scalar(String),
    /// Key/value pairs.
    Mapping(BTreeMap<String, Value>),
    /// Ordered items.
    Sequence(Vec<Value>),
}

impl Value {
    /// `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The scalar text, if this is a scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(text) => Some(text),
            _ => None,
        }
    }

    /// Looks up a key, if this is a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(entries) => entries.get(key),
            _ => None,
        }
    }

    /// The items, if this is a sequence.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Scalar(text) => write!(f, "{text}"),
            Value::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Mapping(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Parses a YAML document from a reader.
///
/// An empty document (only blank lines and comments) parses to [`Value::Null`]. Booleans
/// and numbers keep their text, so `port: 8080` yields the scalar `8080`.
pub fn parse_document<R: Read>(mut reader: R) -> Result<Value> {
    log::trace!("Entering `parse_document` function");

    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let has_content = text.lines().any(|line| {
        let line = line.trim();
        !line.is_empty() && !line.starts_with('#')
    });
    if !has_content {
        log::debug!("Document has no content lines");
        return Ok(Value::Null);
    }

    let yaml: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|err| {
        let line = err.location().map(|location| location.line()).unwrap_or(0);
        CfgErrorKind::Document {
            line,
            message: err.to_string(),
        }
    })?;
    let value = from_yaml(yaml)?;

    log::trace!("Exiting `parse_document` function");
    Ok(value)
}

fn from_yaml(yaml: serde_yaml::Value) -> Result<Value> {
    Ok(match yaml {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Sequence(items) => Value::Sequence(
            items
                .into_iter()
                .map(from_yaml)
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_yaml::Value::Mapping(mapping) => {
            let mut entries = BTreeMap::new();
            for (key, value) in mapping {
                entries.insert(key_text(key)?, from_yaml(value)?);
            }
            Value::Mapping(entries)
        }
        serde_yaml::Value::Tagged(tagged) => from_yaml(tagged.value)?,
        scalar => match scalar_text(&scalar) {
            Some(text) => Value::Scalar(text),
            None => Value::Null,
        },
    })
}

fn scalar_text(yaml: &serde_yaml::Value) -> Option<String> {
    match yaml {
        serde_yaml::Value::Bool(flag) => Some(flag.to_string()),
        serde_yaml::Value::Number(number) => Some(number.to_string()),
        serde_yaml::Value::String(text) => Some(text.clone()),
        _ => None,
    }
}

fn key_text(key: serde_yaml::Value) -> Result<String> {
    scalar_text(&key).ok_or_else(|| {
        CfgErrorKind::Document {
            line: 0,
            message: format!("mapping key must be a scalar, found {key:?}"),
        }
        .into()
    })
}
