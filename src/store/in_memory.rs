//! InMemoryStore - HashMap-backed store for testing and development.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{BranchStore, Order, ScoreRange, StoreError};
use crate::codec::HashEntry;

/// Value held by a key.
#[derive(Debug, Clone)]
enum Stored {
    Hash(Vec<HashEntry>),
    Set(BTreeSet<String>),
    SortedSet(HashMap<String, f64>),
}

impl Stored {
    fn kind(&self) -> &'static str {
        match self {
            Stored::Hash(_) => "hash",
            Stored::Set(_) => "set",
            Stored::SortedSet(_) => "sorted set",
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Stored::Hash(entries) => entries.is_empty(),
            Stored::Set(members) => members.is_empty(),
            Stored::SortedSet(members) => members.is_empty(),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: Stored,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

type Storage = HashMap<String, Slot>;

/// In-memory store with Redis-like semantics.
///
/// Clone-friendly via Arc: clones share the same keyspace. Expired keys are
/// dropped lazily when touched; empty collections disappear like they do on
/// a Redis server.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    storage: Arc<RwLock<Storage>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Live keys, sorted. Handy for asserting on index layout in tests.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::LockPoisoned("keys"))?;
        let now = Instant::now();
        let mut keys: Vec<String> = storage
            .iter()
            .filter(|(_, slot)| !slot.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Score of a sorted set member, if present.
    pub fn score(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        self.read(key, "score", |stored| match stored {
            Some(Stored::SortedSet(members)) => Ok(members.get(member).copied()),
            Some(other) => Err(wrong_type(key, "sorted set", other)),
            None => Ok(None),
        })
    }

    fn read<R>(
        &self,
        key: &str,
        operation: &'static str,
        f: impl FnOnce(Option<&Stored>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::LockPoisoned(operation))?;
        let now = Instant::now();
        let stored = storage
            .get(key)
            .filter(|slot| !slot.is_expired(now))
            .map(|slot| &slot.value);
        f(stored)
    }

    fn write<R>(
        &self,
        key: &str,
        operation: &'static str,
        f: impl FnOnce(&mut Option<Slot>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::LockPoisoned(operation))?;
        let now = Instant::now();
        let mut slot = storage.remove(key).filter(|slot| !slot.is_expired(now));
        let result = f(&mut slot);
        if let Some(slot) = slot {
            if !slot.value.is_empty() {
                storage.insert(key.to_string(), slot);
            }
        }
        result
    }
}

fn wrong_type(key: &str, expected: &'static str, actual: &Stored) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
        expected,
        actual: actual.kind(),
    }
}

fn set_mut<'a>(key: &str, slot: &'a mut Option<Slot>) -> Result<&'a mut BTreeSet<String>, StoreError> {
    let slot = slot.get_or_insert_with(|| Slot {
        value: Stored::Set(BTreeSet::new()),
        expires_at: None,
    });
    match &mut slot.value {
        Stored::Set(members) => Ok(members),
        other => Err(wrong_type(key, "set", other)),
    }
}

fn sorted_set_mut<'a>(
    key: &str,
    slot: &'a mut Option<Slot>,
) -> Result<&'a mut HashMap<String, f64>, StoreError> {
    let slot = slot.get_or_insert_with(|| Slot {
        value: Stored::SortedSet(HashMap::new()),
        expires_at: None,
    });
    match &mut slot.value {
        Stored::SortedSet(members) => Ok(members),
        other => Err(wrong_type(key, "sorted set", other)),
    }
}

fn by_score(a: &(&String, &f64), b: &(&String, &f64)) -> Ordering {
    a.1.partial_cmp(b.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(b.0))
}

#[async_trait]
impl BranchStore for InMemoryStore {
    async fn hash_set(&self, key: &str, fields: &[HashEntry]) -> Result<(), StoreError> {
        self.write(key, "hash_set", |slot| {
            let slot = slot.get_or_insert_with(|| Slot {
                value: Stored::Hash(Vec::new()),
                expires_at: None,
            });
            let entries = match &mut slot.value {
                Stored::Hash(entries) => entries,
                other => return Err(wrong_type(key, "hash", other)),
            };
            for field in fields {
                match entries.iter_mut().find(|e| e.name == field.name) {
                    Some(existing) => existing.value = field.value.clone(),
                    None => entries.push(field.clone()),
                }
            }
            Ok(())
        })
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<HashEntry>, StoreError> {
        self.read(key, "hash_get_all", |stored| match stored {
            Some(Stored::Hash(entries)) => Ok(entries.clone()),
            Some(other) => Err(wrong_type(key, "hash", other)),
            None => Ok(Vec::new()),
        })
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.write(key, "set_add", |slot| {
            Ok(set_mut(key, slot)?.insert(member.to_string()))
        })
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.write(key, "set_remove", |slot| {
            if slot.is_none() {
                return Ok(false);
            }
            Ok(set_mut(key, slot)?.remove(member))
        })
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.read(key, "set_members", |stored| match stored {
            Some(Stored::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(other) => Err(wrong_type(key, "set", other)),
            None => Ok(Vec::new()),
        })
    }

    async fn set_length(&self, key: &str) -> Result<u64, StoreError> {
        self.read(key, "set_length", |stored| match stored {
            Some(Stored::Set(members)) => Ok(members.len() as u64),
            Some(other) => Err(wrong_type(key, "set", other)),
            None => Ok(0),
        })
    }

    async fn sorted_set_add(
        &self,
        key: &str,
        member: &str,
        score: f64,
    ) -> Result<bool, StoreError> {
        self.write(key, "sorted_set_add", |slot| {
            Ok(sorted_set_mut(key, slot)?
                .insert(member.to_string(), score)
                .is_none())
        })
    }

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.write(key, "sorted_set_remove", |slot| {
            if slot.is_none() {
                return Ok(false);
            }
            Ok(sorted_set_mut(key, slot)?.remove(member).is_some())
        })
    }

    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        order: Order,
        skip: u64,
        take: Option<u64>,
    ) -> Result<Vec<String>, StoreError> {
        self.read(key, "sorted_set_range_by_score", |stored| {
            let members = match stored {
                Some(Stored::SortedSet(members)) => members,
                Some(other) => return Err(wrong_type(key, "sorted set", other)),
                None => return Ok(Vec::new()),
            };
            let mut hits: Vec<(&String, &f64)> = members
                .iter()
                .filter(|(_, score)| range.contains(**score))
                .collect();
            hits.sort_by(by_score);
            if order == Order::Descending {
                hits.reverse();
            }
            let take = take.map_or(usize::MAX, |t| usize::try_from(t).unwrap_or(usize::MAX));
            Ok(hits
                .into_iter()
                .skip(usize::try_from(skip).unwrap_or(usize::MAX))
                .take(take)
                .map(|(member, _)| member.clone())
                .collect())
        })
    }

    async fn sorted_set_length(&self, key: &str, range: ScoreRange) -> Result<u64, StoreError> {
        self.read(key, "sorted_set_length", |stored| match stored {
            Some(Stored::SortedSet(members)) => Ok(members
                .values()
                .filter(|score| range.contains(**score))
                .count() as u64),
            Some(other) => Err(wrong_type(key, "sorted set", other)),
            None => Ok(0),
        })
    }

    async fn key_delete(&self, key: &str) -> Result<bool, StoreError> {
        self.write(key, "key_delete", |slot| Ok(slot.take().is_some()))
    }

    async fn key_expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.write(key, "key_expire", |slot| match slot {
            Some(slot) => {
                // A TTL past the clock's range never fires.
                slot.expires_at = Instant::now().checked_add(ttl);
                Ok(true)
            }
            None => Ok(false),
        })
    }
}
