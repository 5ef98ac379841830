use std::fmt;

use crate::branch::{Branch, BranchError};
use crate::entity::Entity;

/// Id of the primary record branch every repository registers first.
pub const BRANCH_DATA: &str = "BRANCH_DATA";

/// Prefix of generated query branch ids, `BRANCH_QUERY_<property>`.
pub const BRANCH_QUERY_PREFIX: &str = "BRANCH_QUERY";

pub(crate) fn query_branch_id(property: &str) -> String {
    format!("{}_{}", BRANCH_QUERY_PREFIX, property)
}

/// Ordered set of branches for one entity type. Ids are unique.
pub struct BranchRegistry<T> {
    branches: Vec<Branch<T>>,
}

impl<T: Entity> BranchRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            branches: Vec::new(),
        }
    }

    pub fn add(&mut self, branch: Branch<T>) -> Result<(), BranchError> {
        if branch.id().is_empty() {
            return Err(BranchError::MissingBranchId);
        }
        if self.get(branch.id()).is_some() {
            return Err(BranchError::DuplicateBranchId(branch.id().to_string()));
        }
        self.branches.push(branch);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Branch<T>> {
        self.branches.iter().find(|b| b.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Branch<T>> {
        self.branches.iter()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Every branch except the primary record branch.
    pub(crate) fn indexes(&self) -> impl Iterator<Item = &Branch<T>> {
        self.branches.iter().filter(|b| b.id() != BRANCH_DATA)
    }
}

impl<T: Entity> fmt::Debug for BranchRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.branches.iter().map(Branch::id))
            .finish()
    }
}

/// Declares the branches of an entity type.
///
/// Implemented by dedicated declaration types and by closures:
///
/// ```ignore
/// let repository = Repository::new(store, &|branches: &mut BranchRegistry<Stock>| {
///     branches.add(Branch::new("GROUPBY_SECTOR").group_by("sector")?)
/// })?;
/// ```
pub trait BranchDeclarations<T: Entity> {
    fn create_branches(&self, branches: &mut BranchRegistry<T>) -> Result<(), BranchError>;
}

impl<T, F> BranchDeclarations<T> for F
where
    T: Entity,
    F: Fn(&mut BranchRegistry<T>) -> Result<(), BranchError>,
{
    fn create_branches(&self, branches: &mut BranchRegistry<T>) -> Result<(), BranchError> {
        self(branches)
    }
}

/// Declares no branches beyond the ones every repository gets.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBranches;

impl<T: Entity> BranchDeclarations<T> for NoBranches {
    fn create_branches(&self, _branches: &mut BranchRegistry<T>) -> Result<(), BranchError> {
        Ok(())
    }
}
