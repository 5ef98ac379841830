use std::fmt;
use std::sync::Arc;

use super::BranchError;
use crate::entity::{Entity, FieldDescriptor, FieldValue};
use crate::key::{self, KeySegment, PLACEHOLDER};

/// What puts a branch in a sorted set: an explicit sort, or an automatic
/// per-property query index.
pub(crate) enum Scoring<T> {
    Sort(Sort<T>),
    Query(FieldDescriptor<T>),
}

pub(crate) enum Sort<T> {
    /// Score is the property value read as a number.
    Property(FieldDescriptor<T>),
    Function {
        name: String,
        score: Arc<dyn Fn(&T) -> f64 + Send + Sync>,
    },
}

impl<T: Entity> Scoring<T> {
    pub(crate) fn sort_property(property: &str) -> Result<Self, BranchError> {
        Ok(Scoring::Sort(Sort::Property(lookup::<T>(property)?)))
    }

    pub(crate) fn sort_function(
        name: impl Into<String>,
        score: impl Fn(&T) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Scoring::Sort(Sort::Function {
            name: name.into(),
            score: Arc::new(score),
        })
    }

    pub(crate) fn query_property(property: &str) -> Result<Self, BranchError> {
        let field = lookup::<T>(property)?;
        if !field.value_type.is_scalar() {
            return Err(BranchError::UnqueryableProperty {
                property: property.to_string(),
                value_type: field.value_type,
            });
        }
        Ok(Scoring::Query(field))
    }

    /// Whether the key carries the property value (set-valued query index).
    pub(crate) fn is_value_keyed(&self) -> bool {
        matches!(self, Scoring::Query(field) if !field.value_type.is_range_indexed())
    }

    /// Trailing key segment. `value` fills value-keyed query segments; `None`
    /// renders the placeholder.
    pub(crate) fn segment(&self, value: Option<&str>) -> KeySegment {
        match self {
            Scoring::Sort(Sort::Property(field)) => KeySegment::Sort {
                by: field.name.to_string(),
            },
            Scoring::Sort(Sort::Function { name, .. }) => KeySegment::Sort { by: name.clone() },
            Scoring::Query(field) if field.value_type.is_range_indexed() => KeySegment::Query {
                expr: key::range_query_segment(field.name),
            },
            Scoring::Query(field) => KeySegment::Query {
                expr: key::value_query_segment(field.name, value.unwrap_or(PLACEHOLDER)),
            },
        }
    }

    pub(crate) fn segment_for(&self, entity: &T) -> Result<KeySegment, BranchError> {
        if self.is_value_keyed() {
            if let Scoring::Query(field) = self {
                let text = field.read(entity)?.key_text();
                return Ok(self.segment(Some(&text)));
            }
        }
        Ok(self.segment(None))
    }

    /// Query indexes leave out entities whose property is null.
    pub(crate) fn indexes(&self, entity: &T) -> Result<bool, BranchError> {
        match self {
            Scoring::Query(field) => Ok(!matches!(field.read(entity)?, FieldValue::Null)),
            Scoring::Sort(_) => Ok(true),
        }
    }

    pub(crate) fn score(&self, entity: &T) -> Result<f64, BranchError> {
        match self {
            Scoring::Sort(Sort::Property(field)) => {
                let value = field.read(entity)?;
                value.as_score().ok_or_else(|| BranchError::InvalidScore {
                    property: field.name.to_string(),
                    value: value.key_text(),
                })
            }
            Scoring::Sort(Sort::Function { score, .. }) => Ok(score(entity)),
            Scoring::Query(field) => Ok(field.read(entity)?.index_score()),
        }
    }
}

fn lookup<T: Entity>(property: &str) -> Result<FieldDescriptor<T>, BranchError> {
    T::field(property).ok_or_else(|| BranchError::UnknownProperty {
        entity: T::NAME,
        property: property.to_string(),
    })
}

impl<T> Clone for Scoring<T> {
    fn clone(&self) -> Self {
        match self {
            Scoring::Sort(Sort::Property(field)) => Scoring::Sort(Sort::Property(*field)),
            Scoring::Sort(Sort::Function { name, score }) => Scoring::Sort(Sort::Function {
                name: name.clone(),
                score: Arc::clone(score),
            }),
            Scoring::Query(field) => Scoring::Query(*field),
        }
    }
}

impl<T> fmt::Debug for Scoring<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scoring::Sort(Sort::Property(field)) => {
                f.debug_tuple("SortProperty").field(&field.name).finish()
            }
            Scoring::Sort(Sort::Function { name, .. }) => {
                f.debug_tuple("SortFunction").field(name).finish()
            }
            Scoring::Query(field) => f.debug_tuple("Query").field(&field.name).finish(),
        }
    }
}
