//! Key encoding for primary records and branch indexes.
//!
//! Keys follow a `:`-separated schema rooted at the entity name:
//!
//! - `{entity}:data:{id}` - primary record (hash)
//! - `{entity}:grouped:{by}:{value}` - group membership (set or sorted set)
//! - `{entity}:grouped:{by}` - group segment with no value
//! - `{entity}:sorted:{by}` - sort index (sorted set)
//! - `{entity}:properties:{property}` - range query index (sorted set)
//! - `{entity}:properties:{property}:{value}` - value query index (sorted set)
//!
//! Values are concatenated verbatim and never escaped, so property values used
//! in keys must not contain `:`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Placeholder rendered for a group segment whose value is not known yet.
/// Callers resolving a single entity replace it with the actual value.
pub const PLACEHOLDER: &str = "{propertyValue}";

/// Key delimiter.
pub const DELIMITER: char = ':';

const DATA: &str = "data";
const SORTED: &str = "sorted";
const GROUPED: &str = "grouped";
const PROPERTIES: &str = "properties";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} is not a valid key kind")]
pub struct UnknownKeyKind(pub String);

/// The four kinds of key segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Data,
    Sort,
    Group,
    Query,
}

impl FromStr for KeyKind {
    type Err = UnknownKeyKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(KeyKind::Data),
            "sort" | "sorted" => Ok(KeyKind::Sort),
            "group" | "grouped" => Ok(KeyKind::Group),
            "query" => Ok(KeyKind::Query),
            other => Err(UnknownKeyKind(other.to_string())),
        }
    }
}

/// One segment of a branch key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySegment {
    /// Primary record id.
    Data { id: String },
    /// Sort index name.
    Sort { by: String },
    /// Grouping name and, once known, the grouped value.
    Group { by: String, value: Option<String> },
    /// Verbatim key text produced for query indexes.
    Query { expr: String },
}

impl KeySegment {
    /// Builds a segment from its kind and its single parameter: the id for
    /// `Data`, the name for `Sort`/`Group`, the verbatim text for `Query`.
    pub fn new(kind: KeyKind, by_or_value: impl Into<String>) -> Self {
        let by_or_value = by_or_value.into();
        match kind {
            KeyKind::Data => KeySegment::Data { id: by_or_value },
            KeyKind::Sort => KeySegment::Sort { by: by_or_value },
            KeyKind::Group => KeySegment::Group {
                by: by_or_value,
                value: None,
            },
            KeyKind::Query => KeySegment::Query { expr: by_or_value },
        }
    }

    /// Parses the kind by name first; unknown kinds are rejected.
    pub fn parse(kind: &str, by_or_value: impl Into<String>) -> Result<Self, UnknownKeyKind> {
        Ok(Self::new(kind.parse()?, by_or_value))
    }

    pub fn group(by: impl Into<String>, value: impl Into<String>) -> Self {
        KeySegment::Group {
            by: by.into(),
            value: Some(value.into()),
        }
    }

    pub fn kind(&self) -> KeyKind {
        match self {
            KeySegment::Data { .. } => KeyKind::Data,
            KeySegment::Sort { .. } => KeyKind::Sort,
            KeySegment::Group { .. } => KeyKind::Group,
            KeySegment::Query { .. } => KeyKind::Query,
        }
    }
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Data { id } => write!(f, "{}:{}", DATA, id),
            KeySegment::Sort { by } => write!(f, "{}:{}", SORTED, by),
            KeySegment::Group { by, value } => match value.as_deref() {
                Some(value) if !value.is_empty() => write!(f, "{}:{}:{}", GROUPED, by, value),
                _ => write!(f, "{}:{}", GROUPED, by),
            },
            KeySegment::Query { expr } => f.write_str(expr),
        }
    }
}

/// Joins the entity name and segments into a full key.
pub fn compose<'a>(entity: &str, segments: impl IntoIterator<Item = &'a KeySegment>) -> String {
    let mut key = entity.to_string();
    for segment in segments {
        key.push(DELIMITER);
        key.push_str(&segment.to_string());
    }
    key
}

/// Primary record key.
///
/// Schema: `{entity}:data:{id}`
#[inline]
pub fn data_key(entity: &str, id: &str) -> String {
    format!("{}:{}:{}", entity, DATA, id)
}

/// Query index segment for a range-indexed property.
///
/// Schema: `properties:{property}`
#[inline]
pub fn range_query_segment(property: &str) -> String {
    format!("{}:{}", PROPERTIES, property)
}

/// Query index segment for one value of a set-indexed property.
///
/// Schema: `properties:{property}:{value}`
#[inline]
pub fn value_query_segment(property: &str, value: &str) -> String {
    format!("{}:{}:{}", PROPERTIES, property, value)
}

/// Full key of a range query index.
///
/// Schema: `{entity}:properties:{property}`
#[inline]
pub fn range_query_key(entity: &str, property: &str) -> String {
    format!("{}:{}", entity, range_query_segment(property))
}

/// Full key of a value query index.
///
/// Schema: `{entity}:properties:{property}:{value}`
#[inline]
pub fn value_query_key(entity: &str, property: &str, value: &str) -> String {
    format!("{}:{}", entity, value_query_segment(property, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_render() {
        assert_eq!(KeySegment::new(KeyKind::Data, "A1").to_string(), "data:A1");
        assert_eq!(KeySegment::new(KeyKind::Sort, "price").to_string(), "sorted:price");
        assert_eq!(KeySegment::group("sector", "Tech").to_string(), "grouped:sector:Tech");
        assert_eq!(KeySegment::new(KeyKind::Group, "all").to_string(), "grouped:all");
        assert_eq!(
            KeySegment::new(KeyKind::Query, "properties:price").to_string(),
            "properties:price"
        );
    }

    #[test]
    fn empty_group_value_renders_without_value() {
        assert_eq!(KeySegment::group("sector", "").to_string(), "grouped:sector");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert_eq!(
            KeySegment::parse("hashed", "x"),
            Err(UnknownKeyKind("hashed".into()))
        );
        assert_eq!(
            KeySegment::parse("grouped", "sector").unwrap().kind(),
            KeyKind::Group
        );
    }

    #[test]
    fn data_keys_are_stable() {
        let composed = compose("Stock", &[KeySegment::new(KeyKind::Data, "A1")]);
        assert_eq!(composed, data_key("Stock", "A1"));
        assert_eq!(composed, "Stock:data:A1");
    }

    #[test]
    fn query_keys() {
        assert_eq!(range_query_key("Stock", "price"), "Stock:properties:price");
        assert_eq!(
            value_query_key("Stock", "is_active", "true"),
            "Stock:properties:is_active:true"
        );
    }

    #[test]
    fn compose_joins_in_order() {
        let key = compose(
            "Stock",
            &[
                KeySegment::group("sector", "Energy"),
                KeySegment::new(KeyKind::Sort, "price"),
            ],
        );
        assert_eq!(key, "Stock:grouped:sector:Energy:sorted:price");
    }
}
