use std::collections::BTreeSet;
use std::marker::PhantomData;

use tracing::warn;

use super::QueryError;
use crate::codec;
use crate::entity::Entity;
use crate::error::RepositoryError;
use crate::store::BranchStore;

/// Keys matched by a query. Entities are loaded lazily and only once: the
/// first call to [`QueryResult::entities`] takes the keys.
pub struct QueryResult<'a, T, S: ?Sized> {
    store: &'a S,
    keys: Option<Vec<String>>,
    _entity: PhantomData<fn() -> T>,
}

impl<'a, T: Entity, S: BranchStore + ?Sized> QueryResult<'a, T, S> {
    pub(crate) fn new(store: &'a S, keys: BTreeSet<String>) -> Self {
        Self {
            store,
            keys: Some(keys.into_iter().collect()),
            _entity: PhantomData,
        }
    }

    /// Number of matched primary keys not yet enumerated.
    pub fn matched(&self) -> usize {
        self.keys.as_ref().map_or(0, Vec::len)
    }

    /// Primary keys in result order, if not yet enumerated.
    pub fn keys(&self) -> Option<&[String]> {
        self.keys.as_deref()
    }

    pub fn entities(&mut self) -> Result<EntityCursor<'a, T, S>, QueryError> {
        let keys = self.keys.take().ok_or(QueryError::AlreadyEnumerated)?;
        Ok(EntityCursor {
            store: self.store,
            keys: keys.into_iter(),
            _entity: PhantomData,
        })
    }

    pub async fn collect(mut self) -> Result<Vec<T>, RepositoryError> {
        self.entities()?.collect().await
    }
}

/// Loads matched entities one primary record at a time.
pub struct EntityCursor<'a, T, S: ?Sized> {
    store: &'a S,
    keys: std::vec::IntoIter<String>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity, S: BranchStore + ?Sized> EntityCursor<'_, T, S> {
    /// Next entity, skipping keys whose primary record has disappeared.
    pub async fn try_next(&mut self) -> Result<Option<T>, RepositoryError> {
        for key in self.keys.by_ref() {
            let entries = self.store.hash_get_all(&key).await?;
            if entries.is_empty() {
                warn!(key = %key, "query index points at a missing record");
                continue;
            }
            return Ok(Some(codec::decode(&entries)?));
        }
        Ok(None)
    }

    pub async fn collect(mut self) -> Result<Vec<T>, RepositoryError> {
        let mut entities = Vec::with_capacity(self.keys.len());
        while let Some(entity) = self.try_next().await? {
            entities.push(entity);
        }
        Ok(entities)
    }
}
