//! Branches - declarative secondary indexes over one entity type.
//!
//! A branch is a filter list, a group list and an optional score source. The
//! group list determines the key an entity lands in; filters decide whether
//! it lands there at all; the score source (a sort, or a per-property query
//! index) turns the membership set into a sorted set.
//!
//! ```ignore
//! let branch = Branch::<Stock>::new("GROUPBY_SECTOR_SORTBY_PRICE")
//!     .filter_by(|s| s.is_active)
//!     .group_by("sector")?
//!     .sort_by("price")?;
//!
//! assert_eq!(branch.key_template(), "Stock:grouped:sector:{propertyValue}:sorted:price");
//! ```

mod filter;
mod group;
mod score;

use std::fmt;

use thiserror::Error;

use crate::codec::CodecError;
use crate::entity::{Entity, ValueType};
use crate::key::{self, KeySegment};

use filter::Filter;
use group::Group;
use score::Scoring;

/// Errors raised while declaring a branch or computing its keys and scores.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BranchError {
    #[error("{property} is not a property of {entity}")]
    UnknownProperty {
        entity: &'static str,
        property: String,
    },
    #[error("cannot group by {property}: {type_name} ({value_type}) values have no key form")]
    UngroupableProperty {
        property: String,
        type_name: &'static str,
        value_type: ValueType,
    },
    #[error("cannot index {property} for queries: {value_type} values have no key form")]
    UnqueryableProperty {
        property: String,
        value_type: ValueType,
    },
    #[error(
        "parameters are not equal to branch group parameters. \
         branch group parameters: {expected}, parameters: {actual}"
    )]
    GroupArity { expected: usize, actual: usize },
    #[error("branch {branch_id} is not sortable")]
    NotSortable { branch_id: String },
    #[error("{property} with value '{value}' cannot be converted to a score")]
    InvalidScore { property: String, value: String },
    #[error("branch id must not be empty")]
    MissingBranchId,
    #[error("branch {0} is already registered")]
    DuplicateBranchId(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A secondary index declaration for entities of type `T`.
pub struct Branch<T> {
    id: String,
    filters: Vec<Filter<T>>,
    groups: Vec<Group<T>>,
    scoring: Option<Scoring<T>>,
}

impl<T: Entity> Branch<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filters: Vec::new(),
            groups: Vec::new(),
            scoring: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entity_name(&self) -> &'static str {
        T::NAME
    }

    /// Adds a membership predicate. All filters must pass.
    pub fn filter_by(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.filters.push(Filter::new(predicate));
        self
    }

    /// Groups by the id field, producing one key per entity.
    pub fn group_by_id(mut self) -> Self {
        self.groups.push(Group::Id);
        self
    }

    /// Groups by a property; its value becomes a key segment.
    pub fn group_by(mut self, property: &str) -> Result<Self, BranchError> {
        self.groups.push(Group::property(property)?);
        Ok(self)
    }

    /// Groups by the text a function computes, named `name` in the key.
    pub fn group_by_fn(
        mut self,
        name: impl Into<String>,
        group: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        self.groups.push(Group::function(name, group));
        self
    }

    pub fn sort_by_id(self) -> Result<Self, BranchError> {
        self.sort_by(T::ID_FIELD)
    }

    /// Scores members by a property value. Replaces any earlier score source.
    pub fn sort_by(mut self, property: &str) -> Result<Self, BranchError> {
        self.scoring = Some(Scoring::sort_property(property)?);
        Ok(self)
    }

    /// Scores members with a function, named `name` in the key. Replaces any
    /// earlier score source.
    pub fn sort_by_fn(
        mut self,
        name: impl Into<String>,
        score: impl Fn(&T) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.scoring = Some(Scoring::sort_function(name, score));
        self
    }

    /// Turns the branch into the query index of `property`.
    pub(crate) fn query_by(mut self, property: &str) -> Result<Self, BranchError> {
        self.scoring = Some(Scoring::query_property(property)?);
        Ok(self)
    }

    /// Key with a placeholder in place of every group value.
    pub fn key_template(&self) -> String {
        let mut segments: Vec<KeySegment> = self.groups.iter().map(|g| g.segment(None)).collect();
        if let Some(scoring) = &self.scoring {
            segments.push(scoring.segment(None));
        }
        key::compose(T::NAME, &segments)
    }

    /// Key the entity belongs in, from its own values.
    pub fn key_for(&self, entity: &T) -> Result<String, BranchError> {
        let mut segments = Vec::with_capacity(self.groups.len() + 1);
        for group in &self.groups {
            let value = group.value_of(entity)?;
            segments.push(group.segment(Some(&value)));
        }
        if let Some(scoring) = &self.scoring {
            segments.push(scoring.segment_for(entity)?);
        }
        Ok(key::compose(T::NAME, &segments))
    }

    /// Key for explicit group values, in group declaration order. Value-keyed
    /// query branches take the property value as one extra trailing value.
    pub fn key_for_values(&self, values: &[&str]) -> Result<String, BranchError> {
        let expected = self.arity();
        if values.len() != expected {
            return Err(BranchError::GroupArity {
                expected,
                actual: values.len(),
            });
        }

        let mut segments: Vec<KeySegment> = self
            .groups
            .iter()
            .zip(values)
            .map(|(group, value)| group.segment(Some(*value)))
            .collect();
        if let Some(scoring) = &self.scoring {
            segments.push(scoring.segment(values.get(self.groups.len()).copied()));
        }
        Ok(key::compose(T::NAME, &segments))
    }

    /// Number of values `key_for_values` expects.
    pub fn arity(&self) -> usize {
        let extra = match &self.scoring {
            Some(scoring) if scoring.is_value_keyed() => 1,
            _ => 0,
        };
        self.groups.len() + extra
    }

    pub(crate) fn apply_filters(&self, entity: &T) -> bool {
        self.filters.iter().all(|filter| filter.invoke(entity))
    }

    /// Whether the entity is a member: every filter passes and, for query
    /// indexes, the property has a value.
    pub(crate) fn admits(&self, entity: &T) -> Result<bool, BranchError> {
        if !self.apply_filters(entity) {
            return Ok(false);
        }
        match &self.scoring {
            Some(scoring) => scoring.indexes(entity),
            None => Ok(true),
        }
    }

    pub(crate) fn score(&self, entity: &T) -> Result<f64, BranchError> {
        match &self.scoring {
            Some(scoring) => scoring.score(entity),
            None => Err(BranchError::NotSortable {
                branch_id: self.id.clone(),
            }),
        }
    }

    /// Whether the branch was declared with a sort.
    pub fn is_sortable(&self) -> bool {
        matches!(self.scoring, Some(Scoring::Sort(_)))
    }

    /// Whether the branch is an automatic query index.
    pub fn is_queryable(&self) -> bool {
        matches!(self.scoring, Some(Scoring::Query(_)))
    }

    /// Sorted-set backed branches support ranges; the rest are plain sets.
    pub fn uses_sorted_set(&self) -> bool {
        self.scoring.is_some()
    }
}

impl<T> Clone for Branch<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            filters: self.filters.clone(),
            groups: self.groups.clone(),
            scoring: self.scoring.clone(),
        }
    }
}

impl<T> fmt::Debug for Branch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch")
            .field("id", &self.id)
            .field("filters", &self.filters.len())
            .field("groups", &self.groups)
            .field("scoring", &self.scoring)
            .finish()
    }
}
