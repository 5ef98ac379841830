//! Entities - typed records stored as flat hashes and indexed by branches.
//!
//! Every entity carries a statically declared field table instead of runtime
//! reflection. The table is normally produced by `#[derive(Entity)]`:
//!
//! ```ignore
//! use kv_branch::{Entity, FieldEnum};
//!
//! #[derive(Clone, Copy, Debug, Default, PartialEq, FieldEnum)]
//! pub enum Sector {
//!     #[default]
//!     None = 0,
//!     Technology = 1,
//! }
//!
//! #[derive(Clone, Debug, Default, Entity)]
//! #[branch(name = "Stock", queryable)]
//! pub struct Stock {
//!     pub id: String,
//!     pub sector: Sector,
//!     pub price: f64,
//!     #[branch(ignore)]
//!     pub scratch: String,
//! }
//! ```

mod field;
mod timestamp;

use std::fmt;

use crate::codec::CodecError;
use crate::key;

pub use field::{json_field, json_value, FieldType, IntoFieldValue};
pub use timestamp::{TimeKind, Timestamp};

/// Semantic type tag of a field.
///
/// The tag decides how a field is encoded, whether it may be grouped on, and
/// which kind of query index it gets. Its `code()` is embedded in postfix
/// query tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    Char,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    String,
    DateTime,
    Enum,
    /// Nested value stored as a JSON blob.
    Composite,
}

impl ValueType {
    pub fn code(&self) -> &'static str {
        match self {
            ValueType::Boolean => "Boolean",
            ValueType::Char => "Char",
            ValueType::Byte => "Byte",
            ValueType::Int16 => "Int16",
            ValueType::UInt16 => "UInt16",
            ValueType::Int32 => "Int32",
            ValueType::UInt32 => "UInt32",
            ValueType::Int64 => "Int64",
            ValueType::UInt64 => "UInt64",
            ValueType::Single => "Single",
            ValueType::Double => "Double",
            ValueType::String => "String",
            ValueType::DateTime => "DateTime",
            ValueType::Enum => "Enum",
            ValueType::Composite => "Composite",
        }
    }

    pub fn from_code(code: &str) -> Option<ValueType> {
        let value_type = match code {
            "Boolean" => ValueType::Boolean,
            "Char" => ValueType::Char,
            "Byte" => ValueType::Byte,
            "Int16" => ValueType::Int16,
            "UInt16" => ValueType::UInt16,
            "Int32" => ValueType::Int32,
            "UInt32" => ValueType::UInt32,
            "Int64" => ValueType::Int64,
            "UInt64" => ValueType::UInt64,
            "Single" => ValueType::Single,
            "Double" => ValueType::Double,
            "String" => ValueType::String,
            "DateTime" => ValueType::DateTime,
            "Enum" => ValueType::Enum,
            "Composite" => ValueType::Composite,
            _ => return None,
        };
        Some(value_type)
    }

    /// Integer and floating point types (chars count as their code point).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueType::Char
                | ValueType::Byte
                | ValueType::Int16
                | ValueType::UInt16
                | ValueType::Int32
                | ValueType::UInt32
                | ValueType::Int64
                | ValueType::UInt64
                | ValueType::Single
                | ValueType::Double
        )
    }

    /// Whether the query index for this type is a score range index.
    /// Booleans and strings get one membership set per distinct value instead.
    pub fn is_range_indexed(&self) -> bool {
        self.is_numeric() || matches!(self, ValueType::DateTime | ValueType::Enum)
    }

    /// Whether values of this type can be grouped on or indexed at all.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, ValueType::Composite)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Enum value as seen by branches: the stored integer plus the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    pub discriminant: i64,
    pub label: &'static str,
}

/// A single field value read from, or written into, an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Char(char),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Enum(EnumValue),
    DateTime(Timestamp),
    Json(serde_json::Value),
}

impl FieldValue {
    /// Text form used in group keys and in value-scoped query keys.
    pub fn key_text(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Char(c) => c.to_string(),
            FieldValue::Int(n) => n.to_string(),
            FieldValue::UInt(n) => n.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Str(s) => s.clone(),
            FieldValue::Enum(e) => e.label.to_string(),
            FieldValue::DateTime(ts) => ts.ticks.to_string(),
            FieldValue::Json(v) => v.to_string(),
        }
    }

    /// Numeric interpretation used by sort branches. `None` when the value
    /// cannot be read as a number.
    pub fn as_score(&self) -> Option<f64> {
        match self {
            FieldValue::Int(n) => Some(*n as f64),
            FieldValue::UInt(n) => Some(*n as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Str(s) => s.trim().parse::<f64>().ok(),
            FieldValue::Enum(e) => Some(e.discriminant as f64),
            FieldValue::DateTime(ts) => Some(ts.ticks as f64),
            FieldValue::Null | FieldValue::Bool(_) | FieldValue::Char(_) | FieldValue::Json(_) => {
                None
            }
        }
    }

    /// Score stored in a per-property query index. Set-valued indexes
    /// (booleans, strings) always score zero.
    pub fn index_score(&self) -> f64 {
        match self {
            FieldValue::Char(c) => u32::from(*c) as f64,
            FieldValue::Str(_) | FieldValue::Bool(_) | FieldValue::Null | FieldValue::Json(_) => {
                0.0
            }
            other => other.as_score().unwrap_or(0.0),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Char(_) => "char",
            FieldValue::Int(_) => "int",
            FieldValue::UInt(_) => "uint",
            FieldValue::Float(_) => "float",
            FieldValue::Str(_) => "string",
            FieldValue::Enum(_) => "enum",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Json(_) => "json",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_text())
    }
}

/// Accessors for one entity field, built once per entity type.
pub struct FieldDescriptor<T> {
    pub name: &'static str,
    pub value_type: ValueType,
    /// Field type as written in the entity declaration.
    pub type_name: &'static str,
    /// Skipped by the codec and by query branch generation.
    pub ignore: bool,
    pub get: fn(&T) -> Result<FieldValue, CodecError>,
    pub set: fn(&mut T, FieldValue) -> Result<(), CodecError>,
}

impl<T> FieldDescriptor<T> {
    pub fn read(&self, entity: &T) -> Result<FieldValue, CodecError> {
        (self.get)(entity).map_err(|e| e.in_field(self.name))
    }

    pub fn write(&self, entity: &mut T, value: FieldValue) -> Result<(), CodecError> {
        (self.set)(entity, value).map_err(|e| e.in_field(self.name))
    }
}

impl<T> Clone for FieldDescriptor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldDescriptor<T> {}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("type_name", &self.type_name)
            .field("ignore", &self.ignore)
            .finish()
    }
}

/// Trait for types that can be persisted and indexed by a repository.
pub trait Entity: Default + Clone + Send + Sync + 'static {
    /// Entity name, the first segment of every key (e.g. "Stock").
    const NAME: &'static str;

    /// Name of the id field.
    const ID_FIELD: &'static str;

    /// Whether per-property query branches are generated for this type.
    const QUERYABLE: bool = false;

    /// Returns the unique identifier of this entity.
    fn id(&self) -> &str;

    /// The field table, in declaration order.
    fn fields() -> Vec<FieldDescriptor<Self>>;

    /// Looks up a field by name.
    fn field(name: &str) -> Option<FieldDescriptor<Self>> {
        Self::fields().into_iter().find(|f| f.name == name)
    }

    /// Primary record key, `"<Entity>:data:<id>"`.
    fn data_key(&self) -> String {
        key::data_key(Self::NAME, self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_codes_round_trip() {
        for value_type in [
            ValueType::Boolean,
            ValueType::Char,
            ValueType::UInt64,
            ValueType::Double,
            ValueType::DateTime,
            ValueType::Enum,
        ] {
            assert_eq!(ValueType::from_code(value_type.code()), Some(value_type));
        }
        assert_eq!(ValueType::from_code("Decimal"), None);
    }

    #[test]
    fn range_indexed_types() {
        assert!(ValueType::Double.is_range_indexed());
        assert!(ValueType::DateTime.is_range_indexed());
        assert!(ValueType::Enum.is_range_indexed());
        assert!(!ValueType::Boolean.is_range_indexed());
        assert!(!ValueType::String.is_range_indexed());
    }

    #[test]
    fn scores() {
        assert_eq!(FieldValue::Int(-4).as_score(), Some(-4.0));
        assert_eq!(FieldValue::Str(" 12.5 ".into()).as_score(), Some(12.5));
        assert_eq!(FieldValue::Str("abc".into()).as_score(), None);
        assert_eq!(FieldValue::Bool(true).as_score(), None);
        assert_eq!(FieldValue::Char('A').index_score(), 65.0);
        assert_eq!(FieldValue::Str("x".into()).index_score(), 0.0);
        let sector = FieldValue::Enum(EnumValue {
            discriminant: 3,
            label: "Energy",
        });
        assert_eq!(sector.index_score(), 3.0);
        assert_eq!(sector.key_text(), "Energy");
    }
}
