use crate::error::StoreError;
use crate::query::{Condition, Direction, FilterValue, Operator, OrderBy, SelectQuery};
use crate::resource::{Entity, Expansion};
use crate::resource::{ContactMessages, Products, Quotes, Services, Testimonials};
use crate::store::{Collection, Record, Store};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    rows: HashMap<String, Vec<Record>>,
    last_stamp: Option<DateTime<Utc>>,
}

impl Tables {
    fn table(&self, name: &str) -> Result<&Vec<Record>, StoreError> {
        self.rows
            .get(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Vec<Record>, StoreError> {
        self.rows
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    /// Strictly increasing so creation order is always recoverable from `created_at`.
    fn stamp(&mut self) -> String {
        let mut now = Utc::now();
        if let Some(last) = self.last_stamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_stamp = Some(now);
        now.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

/// In-process store holding rows as JSON objects. Used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

impl MemoryStore {
    /// A store with no collections; register them with [`MemoryStore::with_collection`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding every admin collection.
    pub fn admin() -> Self {
        [
            Testimonials::descriptor(),
            Services::descriptor(),
            Products::descriptor(),
            Quotes::descriptor(),
            ContactMessages::descriptor(),
        ]
        .iter()
        .fold(Self::new(), |s, d| s.with_collection(&d.collection))
    }

    pub fn with_collection(self, name: &str) -> Self {
        let mut tables = self.inner.into_inner();
        tables.rows.entry(name.to_string()).or_default();
        MemoryStore {
            inner: RwLock::new(tables),
        }
    }

    /// Append rows verbatim, bypassing key and timestamp assignment.
    pub async fn seed(&self, collection: &str, rows: Vec<Record>) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        tables.table_mut(collection)?.extend(rows);
        Ok(())
    }

    pub async fn len(&self, collection: &str) -> Result<usize, StoreError> {
        Ok(self.inner.read().await.table(collection)?.len())
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    v.as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Order of a stored value relative to a filter operand; `None` when incomparable or null.
fn compare(stored: &Value, operand: &FilterValue) -> Option<Ordering> {
    match operand {
        FilterValue::Text(t) => as_text(stored).map(|s| s.as_str().cmp(t.as_str())),
        FilterValue::Int(n) => as_f64(stored).and_then(|s| s.partial_cmp(&(*n as f64))),
        FilterValue::Float(n) => as_f64(stored).and_then(|s| s.partial_cmp(n)),
        FilterValue::Bool(b) => stored.as_bool().map(|s| s.cmp(b)),
        FilterValue::Uuid(u) => stored
            .as_str()
            .and_then(|s| uuid::Uuid::parse_str(s).ok())
            .map(|s| s.cmp(u)),
        FilterValue::Timestamp(t) => as_timestamp(stored).map(|s| s.cmp(t)),
        FilterValue::List(_) => None,
    }
}

fn holds(record: &Record, field: &str, cond: &Condition) -> bool {
    let stored = record.get(field).unwrap_or(&Value::Null);
    match (&cond.op, &cond.value) {
        (Operator::In, FilterValue::List(items)) => items
            .iter()
            .any(|item| compare(stored, item) == Some(Ordering::Equal)),
        (Operator::Eq, v) | (Operator::In, v) => compare(stored, v) == Some(Ordering::Equal),
        (Operator::Gte, v) => matches!(compare(stored, v), Some(Ordering::Greater | Ordering::Equal)),
        (Operator::Lte, v) => matches!(compare(stored, v), Some(Ordering::Less | Ordering::Equal)),
    }
}

/// Sort order between two stored values. Nulls sort after everything, as in PostgreSQL.
fn value_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => match (as_timestamp(a), as_timestamp(b)) {
            (Some(tx), Some(ty)) => tx.cmp(&ty),
            _ => x.cmp(y),
        },
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn order_rows(rows: &mut [Record], order: &[OrderBy]) {
    rows.sort_by(|a, b| {
        for o in order {
            let ord = value_order(
                a.get(&o.field).unwrap_or(&Value::Null),
                b.get(&o.field).unwrap_or(&Value::Null),
            );
            let ord = match o.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn project(row: &Record, columns: &[String]) -> Value {
    if columns.is_empty() {
        return Value::Object(row.clone());
    }
    Value::Object(
        columns
            .iter()
            .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
            .collect(),
    )
}

fn expand(tables: &Tables, record: &mut Record, exp: &Expansion) -> Result<(), StoreError> {
    let related = tables.table(&exp.collection)?;
    let key = record.get(&exp.local_key).cloned().unwrap_or(Value::Null);
    let value = related
        .iter()
        .find(|r| !key.is_null() && r.get(&exp.foreign_key) == Some(&key))
        .map(|r| project(r, &exp.columns))
        .unwrap_or(Value::Null);
    record.insert(exp.name.clone(), value);
    Ok(())
}

fn key_matches(record: &Record, collection: &Collection, id: &FilterValue) -> bool {
    let cond = Condition {
        op: Operator::Eq,
        value: id.clone(),
    };
    holds(record, &collection.primary_key, &cond)
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Record>, StoreError> {
        let tables = self.inner.read().await;
        let mut rows: Vec<Record> = tables
            .table(&query.collection.name)?
            .iter()
            .filter(|r| query.filter.iter().all(|(f, c)| holds(r, f, c)))
            .cloned()
            .collect();
        order_rows(&mut rows, &query.order);
        for row in rows.iter_mut() {
            for exp in &query.expansions {
                expand(&tables, row, exp)?;
            }
        }
        Ok(rows)
    }

    async fn insert(&self, collection: &Collection, payload: &Record) -> Result<Record, StoreError> {
        let mut tables = self.inner.write().await;
        tables.table(&collection.name)?;
        let mut row = payload.clone();
        let pk = collection.primary_key.clone();
        if row.get(&pk).map_or(true, Value::is_null) {
            row.insert(pk.clone(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        let rows = tables.table(&collection.name)?;
        if rows.iter().any(|r| r.get(&pk) == row.get(&pk)) {
            return Err(StoreError::Rejected(format!(
                "duplicate key value violates unique constraint on {}.{}",
                collection.name, pk
            )));
        }
        let stamp = tables.stamp();
        for field in ["created_at", "updated_at"] {
            row.entry(field).or_insert_with(|| Value::String(stamp.clone()));
        }
        tables.table_mut(&collection.name)?.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        collection: &Collection,
        id: &FilterValue,
        payload: &Record,
    ) -> Result<Vec<Record>, StoreError> {
        let mut tables = self.inner.write().await;
        let rows = tables.table_mut(&collection.name)?;
        let mut touched = Vec::new();
        for row in rows.iter_mut().filter(|r| key_matches(r, collection, id)) {
            for (k, v) in payload {
                if *k != collection.primary_key {
                    row.insert(k.clone(), v.clone());
                }
            }
            touched.push(row.clone());
        }
        Ok(touched)
    }

    async fn delete(&self, collection: &Collection, id: &FilterValue) -> Result<Vec<Record>, StoreError> {
        let mut tables = self.inner.write().await;
        let rows = tables.table_mut(&collection.name)?;
        let (removed, kept): (Vec<Record>, Vec<Record>) = rows
            .drain(..)
            .partition(|r| key_matches(r, collection, id));
        *rows = kept;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryFilter;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn products() -> Collection {
        Products::descriptor().collection_in("public")
    }

    #[tokio::test]
    async fn insert_assigns_key_and_timestamps() {
        let store = MemoryStore::admin();
        let row = store
            .insert(&products(), &record(json!({"name": "Lamp"})))
            .await
            .unwrap();
        assert!(uuid::Uuid::parse_str(row["id"].as_str().unwrap()).is_ok());
        assert!(row["created_at"].is_string());
        assert_eq!(row["created_at"], row["updated_at"]);
    }

    #[tokio::test]
    async fn unregistered_collection_is_an_error() {
        let store = MemoryStore::new();
        let err = store
            .insert(&products(), &record(json!({"name": "Lamp"})))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownCollection("products".into()));
    }

    #[tokio::test]
    async fn select_filters_and_orders() {
        let store = MemoryStore::admin();
        for (name, price) in [("a", 5.0), ("b", 15.0), ("c", 25.0)] {
            store
                .insert(&products(), &record(json!({"name": name, "price": price})))
                .await
                .unwrap();
        }
        let q = SelectQuery::from(products())
            .gte("price", FilterValue::Float(10.0))
            .order("created_at", Direction::Desc);
        let rows = store.select(&q).await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn in_filter_matches_any() {
        let store = MemoryStore::admin();
        for cat in ["lamps", "chairs", "tables"] {
            store
                .insert(&products(), &record(json!({"name": cat, "category": cat})))
                .await
                .unwrap();
        }
        let mut q = SelectQuery::from(products());
        q.filter = QueryFilter::new().with(
            "category",
            Operator::In,
            FilterValue::List(vec![
                FilterValue::Text("lamps".into()),
                FilterValue::Text("tables".into()),
            ]),
        );
        assert_eq!(store.select(&q).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn expansions_embed_related_rows() {
        let store = MemoryStore::admin();
        let quotes = Quotes::descriptor();
        let service = store
            .insert(
                &Services::descriptor().collection_in("public"),
                &record(json!({"name": "Design", "description": "d", "is_active": true})),
            )
            .await
            .unwrap();
        store
            .insert(
                &quotes.collection_in("public"),
                &record(json!({"service_id": service["id"], "status": "pending"})),
            )
            .await
            .unwrap();
        let rows = store
            .select(&SelectQuery::from(quotes.collection_in("public")).expand(&quotes.expansions))
            .await
            .unwrap();
        assert_eq!(
            rows[0]["services"],
            json!({"id": service["id"], "name": "Design", "description": "d"})
        );
        assert_eq!(rows[0]["clients"], Value::Null);
    }

    #[tokio::test]
    async fn update_and_delete_report_touched_rows() {
        let store = MemoryStore::admin();
        let row = store
            .insert(&products(), &record(json!({"name": "Lamp"})))
            .await
            .unwrap();
        let id = FilterValue::Uuid(uuid::Uuid::parse_str(row["id"].as_str().unwrap()).unwrap());
        let updated = store
            .update(&products(), &id, &record(json!({"name": "Desk lamp"})))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["name"], "Desk lamp");

        assert_eq!(store.delete(&products(), &id).await.unwrap().len(), 1);
        assert!(store.delete(&products(), &id).await.unwrap().is_empty());
        assert_eq!(store.len("products").await.unwrap(), 0);
    }
}
