use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// How an update reconciles branch memberships with the previous version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStrategy {
    /// Delete the previous version from every branch, then insert the new one.
    #[default]
    DeleteAndReinsert,
    /// Only remove the id from branch keys the entity no longer maps to.
    DiffKeys,
}

/// Whether per-property query branches are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIndexes {
    /// Follow the entity's `queryable` declaration.
    #[default]
    Auto,
    Enabled,
    Disabled,
}

/// Repository settings. Deserializable so applications can load it from
/// their own configuration files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub write_strategy: WriteStrategy,
    pub query_indexes: QueryIndexes,
}

impl RepositoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_write_strategy(mut self, write_strategy: WriteStrategy) -> Self {
        self.write_strategy = write_strategy;
        self
    }

    pub fn with_query_indexes(mut self, query_indexes: QueryIndexes) -> Self {
        self.query_indexes = query_indexes;
        self
    }

    pub(crate) fn indexes_queries<T: Entity>(&self) -> bool {
        match self.query_indexes {
            QueryIndexes::Auto => T::QUERYABLE,
            QueryIndexes::Enabled => true,
            QueryIndexes::Disabled => false,
        }
    }
}
