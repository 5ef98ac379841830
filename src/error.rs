use thiserror::Error;

use crate::branch::BranchError;
use crate::codec::CodecError;
use crate::query::{QueryError, TranslateError};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("branch {branch_id} not found. possible branches: {}", .known.join(", "))]
    BranchNotFound {
        branch_id: String,
        /// Key templates of every registered branch.
        known: Vec<String>,
    },
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("invalid entity: {0}")]
    InvalidEntity(String),
    #[error(transparent)]
    Branch(#[from] BranchError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error(transparent)]
    Query(#[from] QueryError),
}
