//! Repository - primary records plus the branches that index them.
//!
//! Every repository registers a data branch (`BRANCH_DATA`) grouped by id,
//! then the branches its declarations add, then (for queryable entities) one
//! query branch per indexable property.
//!
//! ## Example
//!
//! ```ignore
//! use kv_branch::{Branch, BranchRange, BranchRegistry, InMemoryStore, Repository};
//!
//! let repository = Repository::new(InMemoryStore::new(), &|branches: &mut BranchRegistry<Stock>| {
//!     branches.add(Branch::new("GROUPBY_SECTOR_SORTBY_PRICE").group_by("sector")?.sort_by("price")?)
//! })?;
//!
//! repository.add(&stock).await?;
//! let cheap = repository
//!     .get_range("GROUPBY_SECTOR_SORTBY_PRICE", BranchRange::between(0.0, 100.0), &["Technology"])
//!     .await?;
//! ```

mod config;
mod range;
mod registry;

use std::time::Duration;

use tracing::{debug, warn};

use crate::branch::{Branch, BranchError};
use crate::codec;
use crate::entity::Entity;
use crate::error::RepositoryError;
use crate::key::{self, PLACEHOLDER};
use crate::query::{Predicate, QueryError, QueryEvaluator, QueryResult, QueryTranslator};
use crate::store::{BranchStore, Order, ScoreRange, StoreError};

pub use config::{QueryIndexes, RepositoryConfig, WriteStrategy};
pub use range::BranchRange;
pub use registry::{
    BranchDeclarations, BranchRegistry, NoBranches, BRANCH_DATA, BRANCH_QUERY_PREFIX,
};

/// Where an entity belongs in one branch, computed before anything is written.
struct Placement<'b, T> {
    branch: &'b Branch<T>,
    key: String,
    /// `None` when the filters reject the entity.
    score: Option<Membership>,
}

#[derive(Clone, Copy)]
enum Membership {
    Set,
    Sorted(f64),
}

/// Stores entities of type `T` in `S` and keeps their branches current.
pub struct Repository<T, S> {
    store: S,
    branches: BranchRegistry<T>,
    config: RepositoryConfig,
}

impl<T: Entity, S: BranchStore> Repository<T, S> {
    pub fn new<D>(store: S, declarations: &D) -> Result<Self, RepositoryError>
    where
        D: BranchDeclarations<T> + ?Sized,
    {
        Self::with_config(store, declarations, RepositoryConfig::default())
    }

    pub fn with_config<D>(
        store: S,
        declarations: &D,
        config: RepositoryConfig,
    ) -> Result<Self, RepositoryError>
    where
        D: BranchDeclarations<T> + ?Sized,
    {
        let mut branches = BranchRegistry::new();
        branches.add(Branch::new(BRANCH_DATA).group_by_id())?;
        declarations.create_branches(&mut branches)?;

        if config.indexes_queries::<T>() {
            for field in T::fields() {
                if field.ignore || field.name == T::ID_FIELD || !field.value_type.is_scalar() {
                    continue;
                }
                let branch = Branch::new(registry::query_branch_id(field.name)).query_by(field.name)?;
                branches.add(branch)?;
            }
        }

        debug!(entity = T::NAME, branches = branches.len(), "repository ready");
        Ok(Self {
            store,
            branches,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Registers one more branch. Entities already stored are not back-filled.
    pub fn add_branch(&mut self, branch: Branch<T>) -> Result<(), RepositoryError> {
        self.branches.add(branch)?;
        Ok(())
    }

    /// Key templates of every registered branch, in registration order.
    pub fn branches(&self) -> Vec<String> {
        self.branches.iter().map(Branch::key_template).collect()
    }

    pub fn branch(&self, id: &str) -> Option<&Branch<T>> {
        self.branches.get(id)
    }

    /// Writes the primary record and places the entity in every branch.
    #[tracing::instrument(skip(self, entity), fields(entity = T::NAME, id = %entity.id()))]
    pub async fn add(&self, entity: &T) -> Result<(), RepositoryError> {
        self.save(entity).await
    }

    /// Same as [`Repository::add`]; the previous version is replaced.
    #[tracing::instrument(skip(self, entity), fields(entity = T::NAME, id = %entity.id()))]
    pub async fn update(&self, entity: &T) -> Result<(), RepositoryError> {
        self.save(entity).await
    }

    /// Removes the primary record and every branch membership. Returns whether
    /// a primary record existed.
    #[tracing::instrument(skip(self, entity), fields(entity = T::NAME, id = %entity.id()))]
    pub async fn delete(&self, entity: &T) -> Result<bool, RepositoryError> {
        let existed = self.store.key_delete(&entity.data_key()).await?;
        self.detach_all(entity).await?;
        debug!(existed, "entity deleted");
        Ok(existed)
    }

    /// Deletes the stored entity with this id. `false` when none is stored.
    pub async fn delete_by_id(&self, id: &str) -> Result<bool, RepositoryError> {
        match self.get_by_id(id).await? {
            Some(entity) => self.delete(&entity).await,
            None => Ok(false),
        }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<T>, RepositoryError> {
        let data = self.resolve(BRANCH_DATA)?;
        let key = data.key_template().replace(PLACEHOLDER, id);
        self.load(&key).await
    }

    /// Every entity in the branch key selected by `groups`, one value per
    /// group in declaration order.
    #[tracing::instrument(skip(self), fields(entity = T::NAME))]
    pub async fn get(&self, branch_id: &str, groups: &[&str]) -> Result<Vec<T>, RepositoryError> {
        let branch = self.resolve(branch_id)?;
        let key = branch.key_for_values(groups)?;
        if branch.id() == BRANCH_DATA {
            return Ok(self.load(&key).await?.into_iter().collect());
        }

        let ids = if branch.uses_sorted_set() {
            self.store
                .sorted_set_range_by_score(&key, ScoreRange::all(), Order::Ascending, 0, None)
                .await?
        } else {
            self.store.set_members(&key).await?
        };
        self.load_all(&ids).await
    }

    /// Entities of a sorted branch within a score window, ascending.
    #[tracing::instrument(skip(self), fields(entity = T::NAME))]
    pub async fn get_range(
        &self,
        branch_id: &str,
        range: BranchRange,
        groups: &[&str],
    ) -> Result<Vec<T>, RepositoryError> {
        let branch = self.resolve_sorted(branch_id)?;
        let key = branch.key_for_values(groups)?;
        let ids = self
            .store
            .sorted_set_range_by_score(&key, range.scores(), Order::Ascending, range.skip, range.take)
            .await?;
        self.load_all(&ids).await
    }

    pub async fn count(&self, branch_id: &str, groups: &[&str]) -> Result<u64, RepositoryError> {
        let branch = self.resolve(branch_id)?;
        let key = branch.key_for_values(groups)?;
        if branch.id() == BRANCH_DATA {
            let exists = !self.store.hash_get_all(&key).await?.is_empty();
            return Ok(u64::from(exists));
        }

        let count = if branch.uses_sorted_set() {
            self.store.sorted_set_length(&key, ScoreRange::all()).await?
        } else {
            self.store.set_length(&key).await?
        };
        Ok(count)
    }

    /// Number of members `get_range` would return for the same arguments.
    pub async fn count_range(
        &self,
        branch_id: &str,
        range: BranchRange,
        groups: &[&str],
    ) -> Result<u64, RepositoryError> {
        let branch = self.resolve_sorted(branch_id)?;
        let key = branch.key_for_values(groups)?;
        let total = self.store.sorted_set_length(&key, range.scores()).await?;
        let remaining = total.saturating_sub(range.skip);
        Ok(range.take.map_or(remaining, |take| remaining.min(take)))
    }

    /// Expires the stored entity with this id. `false` when none is stored.
    pub async fn set_key_expire(&self, id: &str, ttl: Duration) -> Result<bool, RepositoryError> {
        match self.get_by_id(id).await? {
            Some(entity) => self.set_entity_expire(&entity, ttl).await,
            None => Ok(false),
        }
    }

    /// Puts a TTL on the primary record and removes the entity from every
    /// branch right away; branches never outlive the record.
    #[tracing::instrument(skip(self, entity), fields(entity = T::NAME, id = %entity.id()))]
    pub async fn set_entity_expire(&self, entity: &T, ttl: Duration) -> Result<bool, RepositoryError> {
        let expiring = self.store.key_expire(&entity.data_key(), ttl).await?;
        self.detach_all(entity).await?;
        debug!(expiring, ttl_ms = ttl.as_millis() as u64, "entity expiry set");
        Ok(expiring)
    }

    /// Postfix text the predicate translates to.
    pub fn query_text(&self, predicate: &Predicate) -> Result<String, RepositoryError> {
        Ok(QueryTranslator::<T>::new().translate(predicate)?.to_string())
    }

    /// Entities matching the predicate, looked up through the query branches.
    #[tracing::instrument(skip(self, predicate), fields(entity = T::NAME))]
    pub async fn query(&self, predicate: &Predicate) -> Result<QueryResult<'_, T, S>, RepositoryError> {
        if !self.branches.iter().any(Branch::is_queryable) {
            return Err(QueryError::NotQueryable { entity: T::NAME }.into());
        }
        let program = QueryTranslator::<T>::new().translate(predicate)?;
        debug!(program = %program, "query translated");
        let keys = QueryEvaluator::new(&self.store).run(&program).await?;
        Ok(QueryResult::new(&self.store, keys))
    }

    fn resolve(&self, branch_id: &str) -> Result<&Branch<T>, RepositoryError> {
        self.branches
            .get(branch_id)
            .ok_or_else(|| RepositoryError::BranchNotFound {
                branch_id: branch_id.to_string(),
                known: self.branches(),
            })
    }

    fn resolve_sorted(&self, branch_id: &str) -> Result<&Branch<T>, RepositoryError> {
        let branch = self.resolve(branch_id)?;
        if !branch.uses_sorted_set() {
            return Err(RepositoryError::InvalidOperation(format!(
                "{} ({}) is not a sortable branch",
                branch.id(),
                branch.key_template()
            )));
        }
        Ok(branch)
    }

    async fn save(&self, entity: &T) -> Result<(), RepositoryError> {
        let id = entity.id();
        if id.is_empty() {
            return Err(RepositoryError::InvalidEntity(format!(
                "{} has an empty id",
                T::NAME
            )));
        }

        // Everything that can fail on the entity's values fails here, before
        // the store is touched.
        let entries = codec::encode(entity)?;
        let placements = self.place(entity)?;

        let previous = self.get_by_id(id).await?;
        if let Some(previous) = &previous {
            match self.config.write_strategy {
                WriteStrategy::DeleteAndReinsert => {
                    self.delete(previous).await?;
                }
                WriteStrategy::DiffKeys => {
                    for placement in &placements {
                        let stale = placement.branch.key_for(previous)?;
                        if stale != placement.key {
                            self.detach(placement.branch, &stale, id).await?;
                        }
                    }
                }
            }
        }

        let data_key = entity.data_key();
        self.store.key_delete(&data_key).await?;
        self.store.hash_set(&data_key, &entries).await?;

        for placement in &placements {
            match placement.score {
                Some(Membership::Sorted(score)) => {
                    self.store.sorted_set_add(&placement.key, id, score).await?;
                    debug!(branch = placement.branch.id(), key = %placement.key, score, "member added");
                }
                Some(Membership::Set) => {
                    self.store.set_add(&placement.key, id).await?;
                    debug!(branch = placement.branch.id(), key = %placement.key, "member added");
                }
                None => {
                    self.detach(placement.branch, &placement.key, id).await?;
                }
            }
        }

        debug!(replaced = previous.is_some(), "entity saved");
        Ok(())
    }

    fn place<'b>(&'b self, entity: &T) -> Result<Vec<Placement<'b, T>>, BranchError> {
        self.branches
            .indexes()
            .map(|branch| {
                let key = branch.key_for(entity)?;
                let score = if !branch.admits(entity)? {
                    None
                } else if branch.uses_sorted_set() {
                    Some(Membership::Sorted(branch.score(entity)?))
                } else {
                    Some(Membership::Set)
                };
                Ok(Placement { branch, key, score })
            })
            .collect()
    }

    async fn detach_all(&self, entity: &T) -> Result<(), RepositoryError> {
        for branch in self.branches.indexes() {
            let key = branch.key_for(entity)?;
            self.detach(branch, &key, entity.id()).await?;
        }
        Ok(())
    }

    async fn detach(&self, branch: &Branch<T>, key: &str, id: &str) -> Result<(), StoreError> {
        let removed = if branch.uses_sorted_set() {
            self.store.sorted_set_remove(key, id).await?
        } else {
            self.store.set_remove(key, id).await?
        };
        if removed {
            debug!(branch = branch.id(), key, "member removed");
        }
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        let entries = self.store.hash_get_all(key).await?;
        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(codec::decode(&entries)?))
    }

    async fn load_all(&self, ids: &[String]) -> Result<Vec<T>, RepositoryError> {
        let mut entities = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load(&key::data_key(T::NAME, id)).await? {
                Some(entity) => entities.push(entity),
                None => warn!(entity = T::NAME, id = %id, "branch member has no primary record"),
            }
        }
        Ok(entities)
    }
}

impl<T: Entity, S> std::fmt::Debug for Repository<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("branches", &self.branches)
            .field("config", &self.config)
            .finish()
    }
}
