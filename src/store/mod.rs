//! Store capability: the predicate/mutation vocabulary the resource service needs from persistence.
//!
//! Implementations: [`PgStore`] (PostgreSQL via sqlx) and [`MemoryStore`] (in-process).

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::StoreError;
use crate::query::{FilterValue, SelectQuery};
use async_trait::async_trait;
use serde_json::Value;

/// Entity rows are opaque JSON objects.
pub type Record = serde_json::Map<String, Value>;

/// Where a record lives and how it is keyed.
#[derive(Clone, Debug, PartialEq)]
pub struct Collection {
    pub schema: String,
    pub name: String,
    pub primary_key: String,
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Record>, StoreError>;

    /// Insert one row and return it with store-assigned fields.
    async fn insert(&self, collection: &Collection, payload: &Record) -> Result<Record, StoreError>;

    /// Update rows whose primary key equals `id`; returns every row touched.
    async fn update(
        &self,
        collection: &Collection,
        id: &FilterValue,
        payload: &Record,
    ) -> Result<Vec<Record>, StoreError>;

    /// Delete rows whose primary key equals `id`; returns every row removed.
    async fn delete(&self, collection: &Collection, id: &FilterValue) -> Result<Vec<Record>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
