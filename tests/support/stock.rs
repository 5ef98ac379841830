use chrono::{DateTime, TimeZone, Utc};
use kv_branch::{
    Branch, BranchDeclarations, BranchError, BranchRegistry, Entity, FieldEnum, InMemoryStore,
    Repository, RepositoryConfig,
};
use serde::{Deserialize, Serialize};

pub const GROUP_ALL: &str = "GROUPALL";
pub const GROUP_ALL_SORTBY_PRICE: &str = "GROUPALL_SORTBY_PRICE";
pub const GROUPBY_SECTOR: &str = "GROUPBY_SECTOR";
pub const GROUPBY_SECTOR_SORTBY_PRICE: &str = "GROUPBY_SECTOR_SORTBY_PRICE";
pub const SORTBY_CREATED_AT: &str = "SORTBY_CREATEDAT";
pub const GROUPBY_PROFIT_LEVEL_SORTBY_CHANGE_RATE: &str = "GROUPBY_PROFITLEVEL_SORTBY_PRICECHANGERATE";
pub const GROUPBY_COUNTRY: &str = "GROUPBY_COUNTRY";
pub const GROUPBY_SECTOR_COUNTRY: &str = "GROUPBY_SECTOR_COUNTRY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FieldEnum)]
pub enum Sector {
    #[default]
    Technology = 1,
    Energy = 2,
    Finance = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurrencyCode {
    #[default]
    Usd,
    Eur,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StockMetaData {
    pub country: String,
    pub currency: CurrencyCode,
}

#[derive(Debug, Clone, PartialEq, Default, Entity)]
#[branch(name = "Stock", queryable)]
pub struct Stock {
    #[branch(id)]
    pub id: String,
    pub name: String,
    pub sector: Sector,
    pub price: f64,
    pub price_change_rate: f64,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub first_letter: char,
    pub volume: Option<u64>,
    #[branch(json)]
    pub meta: StockMetaData,
    #[branch(ignore)]
    pub scratch: Vec<String>,
}

impl Stock {
    pub fn new(id: &str, name: &str, sector: Sector, price: f64, price_change_rate: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            sector,
            price,
            price_change_rate,
            created_at: day(1),
            is_active: true,
            first_letter: name.chars().next().unwrap_or_default(),
            volume: None,
            meta: StockMetaData {
                country: "USA".to_string(),
                currency: CurrencyCode::Usd,
            },
            scratch: Vec::new(),
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn created(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn listed_in(mut self, country: &str, currency: CurrencyCode) -> Self {
        self.meta = StockMetaData {
            country: country.to_string(),
            currency,
        };
        self
    }
}

/// Midnight UTC on the given day of January 2024.
pub fn day(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, n, 0, 0, 0).unwrap()
}

pub struct StockBranches;

impl BranchDeclarations<Stock> for StockBranches {
    fn create_branches(&self, branches: &mut BranchRegistry<Stock>) -> Result<(), BranchError> {
        branches.add(
            Branch::new(GROUP_ALL)
                .filter_by(|s: &Stock| s.is_active)
                .group_by_fn("all", |_| "All".to_string()),
        )?;
        branches.add(
            Branch::new(GROUP_ALL_SORTBY_PRICE)
                .filter_by(|s: &Stock| s.is_active)
                .group_by_fn("all", |_| "All".to_string())
                .sort_by("price")?,
        )?;
        branches.add(
            Branch::new(GROUPBY_SECTOR)
                .filter_by(|s: &Stock| s.is_active)
                .group_by("sector")?,
        )?;
        branches.add(
            Branch::new(GROUPBY_SECTOR_SORTBY_PRICE)
                .filter_by(|s: &Stock| s.is_active)
                .group_by("sector")?
                .sort_by("price")?,
        )?;
        branches.add(Branch::new(SORTBY_CREATED_AT).sort_by("created_at")?)?;
        branches.add(
            Branch::new(GROUPBY_PROFIT_LEVEL_SORTBY_CHANGE_RATE)
                .filter_by(|s: &Stock| s.is_active)
                .group_by_fn("profit_level", |s: &Stock| {
                    if s.price_change_rate >= 10.0 {
                        "High".to_string()
                    } else {
                        "Low".to_string()
                    }
                })
                .sort_by("price_change_rate")?,
        )?;
        branches.add(
            Branch::new(GROUPBY_COUNTRY).group_by_fn("country", |s: &Stock| s.meta.country.clone()),
        )?;
        branches.add(
            Branch::new(GROUPBY_SECTOR_COUNTRY)
                .group_by("sector")?
                .group_by_fn("country", |s: &Stock| s.meta.country.clone()),
        )?;
        Ok(())
    }
}

pub type StockRepository = Repository<Stock, InMemoryStore>;

pub fn repository() -> StockRepository {
    Repository::new(InMemoryStore::new(), &StockBranches).unwrap()
}

pub fn repository_with(config: RepositoryConfig) -> StockRepository {
    Repository::with_config(InMemoryStore::new(), &StockBranches, config).unwrap()
}

pub fn ids(stocks: &[Stock]) -> Vec<&str> {
    stocks.iter().map(|s| s.id()).collect()
}
