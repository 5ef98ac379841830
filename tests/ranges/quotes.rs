//! A minimal priced entity for range properties.

use kv_branch::{Branch, BranchError, BranchRegistry, Entity};

pub const BY_DESK_BY_PRICE: &str = "BY_DESK_BY_PRICE";

#[derive(Debug, Clone, PartialEq, Default, Entity)]
#[branch(name = "Quote")]
pub struct Quote {
    pub id: String,
    pub desk: String,
    pub price: f64,
    pub live: bool,
}

pub fn branches(registry: &mut BranchRegistry<Quote>) -> Result<(), BranchError> {
    registry.add(
        Branch::new(BY_DESK_BY_PRICE)
            .filter_by(|q: &Quote| q.live)
            .group_by("desk")?
            .sort_by("price")?,
    )
}
