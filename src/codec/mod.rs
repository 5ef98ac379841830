//! Hash codec - converts entities to and from flat field/value pairs.
//!
//! Encoding rules:
//!
//! - every non-ignored field becomes one name/value pair
//! - null (`None`) scalars are omitted
//! - composite fields are stored as a single JSON blob
//! - date/time fields are stored as `"<ticks>|UTC"` or `"<ticks>|LOC"`
//! - enums are stored as their integer discriminant
//! - other scalars use their default string form
//!
//! An empty hash means "not found"; callers check for that before decoding.

use thiserror::Error;

use crate::entity::{Entity, FieldValue, Timestamp, ValueType};

/// One field of a stored hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashEntry {
    pub name: String,
    pub value: String,
}

impl HashEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Error type for field conversion and hash encoding/decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("expected {expected} value but found {found}")]
    TypeMismatch {
        expected: ValueType,
        found: &'static str,
    },
    #[error("value {value} is out of range for {expected}")]
    OutOfRange { expected: ValueType, value: String },
    #[error("cannot parse {value:?} as {expected}")]
    Parse { expected: ValueType, value: String },
    #[error("{value} is not a discriminant of {ty}")]
    UnknownDiscriminant { ty: &'static str, value: i64 },
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("json error: {0}")]
    Json(String),
    #[error("field {field}: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: Box<CodecError>,
    },
}

impl CodecError {
    /// Attaches the field name, once.
    pub fn in_field(self, field: &'static str) -> Self {
        match self {
            CodecError::Field { .. } => self,
            other => CodecError::Field {
                field,
                source: Box::new(other),
            },
        }
    }
}

/// Encodes an entity into hash entries.
pub fn encode<T: Entity>(entity: &T) -> Result<Vec<HashEntry>, CodecError> {
    let mut entries = Vec::new();
    for field in T::fields() {
        if field.ignore {
            continue;
        }
        let text = encode_value(field.read(entity)?).map_err(|e| e.in_field(field.name))?;
        if let Some(text) = text {
            entries.push(HashEntry::new(field.name, text));
        }
    }
    Ok(entries)
}

/// Decodes hash entries into an entity. Missing, empty and ignored fields keep
/// their `Default` value.
pub fn decode<T: Entity>(entries: &[HashEntry]) -> Result<T, CodecError> {
    let mut entity = T::default();
    for field in T::fields() {
        if field.ignore {
            continue;
        }
        let Some(entry) = entries.iter().find(|e| e.name == field.name) else {
            continue;
        };
        if entry.value.is_empty() {
            continue;
        }
        let value = decode_value(field.value_type, &entry.value).map_err(|e| e.in_field(field.name))?;
        field.write(&mut entity, value)?;
    }
    Ok(entity)
}

fn encode_value(value: FieldValue) -> Result<Option<String>, CodecError> {
    let text = match value {
        FieldValue::Null => return Ok(None),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Char(c) => c.to_string(),
        FieldValue::Int(n) => n.to_string(),
        FieldValue::UInt(n) => n.to_string(),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Str(s) => s,
        FieldValue::Enum(e) => e.discriminant.to_string(),
        FieldValue::DateTime(ts) => ts.encode()?,
        FieldValue::Json(json) => {
            serde_json::to_string(&json).map_err(|e| CodecError::Json(e.to_string()))?
        }
    };
    Ok(Some(text))
}

fn parse_error(expected: ValueType, raw: &str) -> CodecError {
    CodecError::Parse {
        expected,
        value: raw.to_string(),
    }
}

fn decode_value(value_type: ValueType, raw: &str) -> Result<FieldValue, CodecError> {
    let value = match value_type {
        ValueType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" => FieldValue::Bool(true),
            "false" => FieldValue::Bool(false),
            _ => return Err(parse_error(value_type, raw)),
        },
        ValueType::Char => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => FieldValue::Char(c),
                _ => return Err(parse_error(value_type, raw)),
            }
        }
        ValueType::Int16 | ValueType::Int32 | ValueType::Int64 | ValueType::Enum => raw
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| parse_error(value_type, raw))?,
        ValueType::Byte | ValueType::UInt16 | ValueType::UInt32 | ValueType::UInt64 => raw
            .parse::<u64>()
            .map(FieldValue::UInt)
            .map_err(|_| parse_error(value_type, raw))?,
        ValueType::Single | ValueType::Double => raw
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|_| parse_error(value_type, raw))?,
        ValueType::String => FieldValue::Str(raw.to_string()),
        ValueType::DateTime => FieldValue::DateTime(Timestamp::decode(raw)?),
        ValueType::Composite => serde_json::from_str(raw)
            .map(FieldValue::Json)
            .map_err(|e| CodecError::Json(e.to_string()))?,
    };
    Ok(value)
}
