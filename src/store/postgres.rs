use crate::error::StoreError;
use crate::query::{FilterValue, SelectQuery};
use crate::sql::{self, QueryBuf};
use crate::store::{Collection, Record, Store};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

/// PostgreSQL store. Every statement returns whole rows as JSONB so records stay schema-agnostic.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    async fn fetch_rows(&self, q: QueryBuf) -> Result<Vec<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "executing");
        let mut query = sqlx::query_scalar::<_, Value>(&q.sql);
        for p in q.params {
            query = query.bind(p);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(into_record).collect()
    }
}

fn into_record(v: Value) -> Result<Record, StoreError> {
    match v {
        Value::Object(m) => Ok(m),
        other => Err(StoreError::Rejected(format!(
            "expected a row object, got {}",
            other
        ))),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Record>, StoreError> {
        self.fetch_rows(sql::select(query)).await
    }

    async fn insert(&self, collection: &Collection, payload: &Record) -> Result<Record, StoreError> {
        self.fetch_rows(sql::insert(collection, payload))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Rejected("insert returned no row".into()))
    }

    async fn update(
        &self,
        collection: &Collection,
        id: &FilterValue,
        payload: &Record,
    ) -> Result<Vec<Record>, StoreError> {
        self.fetch_rows(sql::update(collection, id, payload)).await
    }

    async fn delete(&self, collection: &Collection, id: &FilterValue) -> Result<Vec<Record>, StoreError> {
        self.fetch_rows(sql::delete(collection, id)).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
