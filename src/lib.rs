extern crate self as kv_branch;

pub mod branch;
pub mod codec;
pub mod entity;
mod error;
pub mod key;
pub mod query;
pub mod repository;
pub mod store;

pub use branch::{Branch, BranchError};
pub use codec::{CodecError, HashEntry};
pub use entity::{
    json_field, json_value, Entity, EnumValue, FieldDescriptor, FieldType, FieldValue,
    IntoFieldValue, TimeKind, Timestamp, ValueType,
};
pub use error::RepositoryError;
pub use key::{KeyKind, KeySegment, PLACEHOLDER};
pub use query::{
    field, CompareOp, EntityCursor, PostfixProgram, Predicate, QueryError, QueryEvaluator,
    QueryResult, QueryTranslator, TranslateError,
};
pub use repository::{
    BranchDeclarations, BranchRange, BranchRegistry, NoBranches, QueryIndexes, Repository,
    RepositoryConfig, WriteStrategy, BRANCH_DATA, BRANCH_QUERY_PREFIX,
};
pub use store::{BranchStore, Exclude, InMemoryStore, Order, ScoreRange, StoreError};

// Derive macros for entities and their enum fields.
pub use kv_branch_macros::{Entity, FieldEnum};
