//! Store capability: query execution with bound parameters and transactions.
//! `PgStore` runs against PostgreSQL; `MemoryStore` keeps the same semantics in process.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::bootstrap::{Seed, SeedReport};
use crate::config::{ResolvedEntity, ResolvedModel, ResolvedRelation};
use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Data column values keyed by column name.
pub type Values = BTreeMap<String, Option<String>>;

/// One entity row: `id` plus its data columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    #[serde(flatten)]
    pub fields: Values,
}

/// Changes applied by one Update call; applied atomically.
#[derive(Clone, Debug, Default)]
pub struct RowChange {
    pub values: Values,
    /// Other-side id to link this row to.
    pub link_to: Option<i64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// A column update matched the row.
    pub updated: bool,
    /// Some(true) when a link row was inserted, Some(false) when it already existed.
    pub linked: Option<bool>,
}

impl UpdateOutcome {
    pub fn modified(&self) -> bool {
        self.updated || self.linked == Some(true)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;

    /// Drop and recreate every table of the model and load the seed, all or nothing.
    async fn reset(&self, model: &ResolvedModel, seed: &Seed) -> Result<SeedReport, AppError>;

    async fn insert(&self, entity: &ResolvedEntity, values: &Values) -> Result<i64, AppError>;

    async fn fetch_one(&self, entity: &ResolvedEntity, id: i64) -> Result<Option<Record>, AppError>;

    async fn fetch_all(&self, entity: &ResolvedEntity) -> Result<Vec<Record>, AppError>;

    /// Column update then link upsert in one transaction. A column update matching no row
    /// fails with NotFound and nothing is applied.
    async fn update(&self, entity: &ResolvedEntity, id: i64, change: &RowChange) -> Result<UpdateOutcome, AppError>;

    /// Returns whether a row was removed. Link rows go with it by referential action.
    async fn delete(&self, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError>;

    /// Idempotent link insert. Returns true only when a new pair was stored.
    async fn link(&self, relation: &ResolvedRelation, self_id: i64, other_id: i64) -> Result<bool, AppError>;

    async fn count_related(&self, relation: &ResolvedRelation, id: i64) -> Result<i64, AppError>;

    async fn list_related(&self, relation: &ResolvedRelation, id: i64) -> Result<Vec<Record>, AppError>;
}
