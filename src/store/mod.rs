//! Store - the narrow key-value/sorted-set interface branches are kept in.
//!
//! The trait mirrors the handful of commands a Redis-like server offers for
//! hashes, sets and sorted sets. Connection handling, pipelining and the wire
//! protocol belong to the implementation.

mod in_memory;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::codec::HashEntry;

pub use in_memory::InMemoryStore;

/// Which ends of a score range are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Exclude {
    #[default]
    None,
    Start,
    Stop,
    Both,
}

/// Result ordering for sorted set reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

/// A score interval over a sorted set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
    pub exclude: Exclude,
}

impl ScoreRange {
    pub fn new(min: f64, max: f64, exclude: Exclude) -> Self {
        Self { min, max, exclude }
    }

    /// Inclusive `[min, max]`.
    pub fn inclusive(min: f64, max: f64) -> Self {
        Self::new(min, max, Exclude::None)
    }

    /// Every score.
    pub fn all() -> Self {
        Self::inclusive(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn contains(&self, score: f64) -> bool {
        let above_min = match self.exclude {
            Exclude::Start | Exclude::Both => score > self.min,
            Exclude::None | Exclude::Stop => score >= self.min,
        };
        let below_max = match self.exclude {
            Exclude::Stop | Exclude::Both => score < self.max,
            Exclude::None | Exclude::Start => score <= self.max,
        };
        above_min && below_max
    }
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for ScoreRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = match self.exclude {
            Exclude::Start | Exclude::Both => '(',
            Exclude::None | Exclude::Stop => '[',
        };
        let close = match self.exclude {
            Exclude::Stop | Exclude::Both => ')',
            Exclude::None | Exclude::Start => ']',
        };
        write!(f, "{}{}, {}{}", open, self.min, self.max, close)
    }
}

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The key holds a different kind of value than the command expects.
    #[error("key {key} holds a {actual}, not a {expected}")]
    WrongType {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// Connection or command failure reported by the backend.
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

/// Store primitives consumed by repositories and the query evaluator.
///
/// Removal and deletion are idempotent: they report whether anything changed
/// and never fail because the member or key is absent.
#[async_trait]
pub trait BranchStore: Send + Sync {
    /// Writes the given fields of a hash, creating it if needed.
    async fn hash_set(&self, key: &str, fields: &[HashEntry]) -> Result<(), StoreError>;

    /// Reads every field of a hash. Empty when the key does not exist.
    async fn hash_get_all(&self, key: &str) -> Result<Vec<HashEntry>, StoreError>;

    /// Adds a member to a set. Returns true if it was not present.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Removes a member from a set. Returns true if it was present.
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn set_length(&self, key: &str) -> Result<u64, StoreError>;

    /// Adds a member or updates its score. Returns true if it was not present.
    async fn sorted_set_add(&self, key: &str, member: &str, score: f64)
        -> Result<bool, StoreError>;

    /// Removes a member from a sorted set. Returns true if it was present.
    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Members whose score lies in `range`, ordered by score (ties by member),
    /// after skipping `skip` and keeping at most `take`.
    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        order: Order,
        skip: u64,
        take: Option<u64>,
    ) -> Result<Vec<String>, StoreError>;

    /// Number of members whose score lies in `range`.
    async fn sorted_set_length(&self, key: &str, range: ScoreRange) -> Result<u64, StoreError>;

    /// Deletes a key of any kind. Returns true if it existed.
    async fn key_delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Sets a time to live on a key. Returns false if the key does not exist.
    async fn key_expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;
}
