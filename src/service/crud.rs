//! Generic list/get/create/update/remove over any [`Store`], driven by a resource descriptor.

use crate::error::{AppError, StoreError};
use crate::query::{translate, FilterValue, SelectQuery};
use crate::resource::{Entity, ResourceDescriptor};
use crate::store::{Collection, Record, Store};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// One per entity; cheap to clone into each request. Holds no mutable state.
pub struct ResourceService<S: Store> {
    descriptor: Arc<ResourceDescriptor>,
    collection: Collection,
    store: Arc<S>,
}

impl<S: Store> Clone for ResourceService<S> {
    fn clone(&self) -> Self {
        ResourceService {
            descriptor: Arc::clone(&self.descriptor),
            collection: self.collection.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> ResourceService<S> {
    pub fn new(descriptor: ResourceDescriptor, store: Arc<S>, schema: &str) -> Self {
        let collection = descriptor.collection_in(schema);
        ResourceService {
            descriptor: Arc::new(descriptor),
            collection,
            store,
        }
    }

    pub fn for_entity<E: Entity>(store: Arc<S>, schema: &str) -> Self {
        Self::new(E::descriptor(), store, schema)
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// Records matching the query-string filters, newest first, with expansions embedded.
    pub async fn list(&self, params: &[(String, String)]) -> Result<Vec<Record>, AppError> {
        let list = translate(&self.descriptor, params)?;
        let query = SelectQuery::from(self.collection.clone())
            .list(list)
            .expand(&self.descriptor.expansions);
        self.store
            .select(&query)
            .await
            .map_err(|e| self.store_failure("list", e))
    }

    pub async fn get_one(&self, raw_id: &str) -> Result<Record, AppError> {
        let id = self.parse_id(raw_id)?;
        let query = SelectQuery::from(self.collection.clone())
            .eq(&self.collection.primary_key, id)
            .expand(&self.descriptor.expansions);
        let rows = self
            .store
            .select(&query)
            .await
            .map_err(|e| self.store_failure("get", e))?;
        self.exactly_one("get", raw_id, rows)
    }

    /// Insert after a structural check only; field rules are the validator's job.
    /// Returns the stored row as written; expansions are embedded by reads only.
    pub async fn create(&self, payload: Value) -> Result<Record, AppError> {
        let payload = non_empty_object(payload)?;
        self.store
            .insert(&self.collection, &payload)
            .await
            .map_err(|e| self.store_failure("create", e))
    }

    /// Patch one record and return its full post-update row, without expansions.
    /// Key and creation time are never written.
    pub async fn update(&self, raw_id: &str, payload: Value) -> Result<Record, AppError> {
        let id = self.parse_id(raw_id)?;
        let mut payload = non_empty_object(payload)?;
        payload.retain(|k, _| !self.descriptor.immutable.contains(k));
        if payload.is_empty() {
            return Err(AppError::Validation(
                "request body has no updatable fields".into(),
            ));
        }
        self.descriptor.apply_transforms(&mut payload, Utc::now());
        let rows = self
            .store
            .update(&self.collection, &id, &payload)
            .await
            .map_err(|e| self.store_failure("update", e))?;
        self.exactly_one("update", raw_id, rows)
    }

    /// Delete by key. Deleting an absent id is NotFound for every store.
    pub async fn remove(&self, raw_id: &str) -> Result<Record, AppError> {
        let id = self.parse_id(raw_id)?;
        let rows = self
            .store
            .delete(&self.collection, &id)
            .await
            .map_err(|e| self.store_failure("delete", e))?;
        self.exactly_one("delete", raw_id, rows)
    }

    fn parse_id(&self, raw: &str) -> Result<FilterValue, AppError> {
        let bad = || {
            AppError::Validation(format!(
                "invalid {} id: {}",
                self.descriptor.collection, raw
            ))
        };
        uuid::Uuid::parse_str(raw)
            .map(FilterValue::Uuid)
            .map_err(|_| bad())
    }

    fn exactly_one(&self, operation: &str, raw_id: &str, mut rows: Vec<Record>) -> Result<Record, AppError> {
        match rows.len() {
            0 => Err(AppError::NotFound(format!(
                "{} record {} not found",
                self.descriptor.collection, raw_id
            ))),
            1 => Ok(rows.remove(0)),
            n => {
                tracing::error!(
                    operation,
                    collection = %self.descriptor.collection,
                    rows = n,
                    "primary key matched more than one row"
                );
                Err(AppError::Inconsistent(format!(
                    "{} id {} matched {} records",
                    self.descriptor.collection, raw_id, n
                )))
            }
        }
    }

    fn store_failure(&self, operation: &str, e: StoreError) -> AppError {
        tracing::error!(
            operation,
            collection = %self.descriptor.collection,
            error = %e,
            "store operation failed"
        );
        AppError::Store(e)
    }
}

fn non_empty_object(payload: Value) -> Result<Record, AppError> {
    match payload {
        Value::Object(m) if !m.is_empty() => Ok(m),
        Value::Object(_) => Err(AppError::Validation("request body must not be empty".into())),
        _ => Err(AppError::Validation("request body must be a JSON object".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ContactMessages, Products, Quotes, Services, Testimonials};
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::collections::HashSet;

    fn service<E: Entity>(store: &Arc<MemoryStore>) -> ResourceService<MemoryStore> {
        ResourceService::for_entity::<E>(Arc::clone(store), "public")
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn id_of(r: &Record) -> String {
        r["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = Arc::new(MemoryStore::admin());
        let svc = service::<Services>(&store);
        for name in ["first", "second", "third"] {
            svc.create(json!({"name": name})).await.unwrap();
        }
        let rows = svc.list(&[]).await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn empty_collection_lists_nothing() {
        let store = Arc::new(MemoryStore::admin());
        assert!(service::<Products>(&store).list(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = Arc::new(MemoryStore::admin());
        let err = service::<Testimonials>(&store)
            .get_one(&uuid::Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_id_is_validation_error() {
        let store = Arc::new(MemoryStore::admin());
        let err = service::<Testimonials>(&store).get_one("42").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn create_then_get_round_trips_payload() {
        let store = Arc::new(MemoryStore::admin());
        let svc = service::<Products>(&store);
        let created = svc
            .create(json!({"name": "Lamp", "price": 12.5, "in_stock": true}))
            .await
            .unwrap();
        let fetched = svc.get_one(&id_of(&created)).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched["name"], "Lamp");
        assert!(fetched.contains_key("created_at"));
    }

    #[tokio::test]
    async fn create_rejects_empty_and_non_object_bodies() {
        let store = Arc::new(MemoryStore::admin());
        let svc = service::<Services>(&store);
        assert!(matches!(svc.create(json!({})).await, Err(AppError::Validation(_))));
        assert!(matches!(svc.create(json!([1, 2])).await, Err(AppError::Validation(_))));
        assert_eq!(store.len("services").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn approval_stamps_only_on_approved() {
        let store = Arc::new(MemoryStore::admin());
        let svc = service::<Testimonials>(&store);
        let a = svc.create(json!({"name": "A", "status": "pending"})).await.unwrap();
        let b = svc.create(json!({"name": "B", "status": "pending"})).await.unwrap();

        let approved = svc.update(&id_of(&a), json!({"status": "approved"})).await.unwrap();
        assert!(approved["approved_at"].is_string());
        assert_eq!(approved["name"], "A");

        let rejected = svc.update(&id_of(&b), json!({"status": "rejected"})).await.unwrap();
        assert!(!rejected.contains_key("approved_at"));
    }

    #[tokio::test]
    async fn leaving_approved_keeps_the_stamp() {
        let store = Arc::new(MemoryStore::admin());
        let svc = service::<Testimonials>(&store);
        let t = svc.create(json!({"name": "A", "status": "pending"})).await.unwrap();
        let approved = svc.update(&id_of(&t), json!({"status": "approved"})).await.unwrap();
        let stamp = approved["approved_at"].clone();
        assert!(stamp.is_string());

        let back = svc.update(&id_of(&t), json!({"status": "pending"})).await.unwrap();
        assert_eq!(back["status"], "pending");
        assert_eq!(back["approved_at"], stamp);
        assert_eq!(svc.get_one(&id_of(&t)).await.unwrap()["approved_at"], stamp);
    }

    #[tokio::test]
    async fn writes_return_the_stored_row_without_expansions() {
        let store = Arc::new(MemoryStore::admin());
        let quotes = service::<Quotes>(&store);
        let s = service::<Services>(&store)
            .create(json!({"name": "Branding"}))
            .await
            .unwrap();
        let q = quotes
            .create(json!({"service_id": s["id"], "status": "pending"}))
            .await
            .unwrap();
        assert!(!q.contains_key("services"));
        let updated = quotes.update(&id_of(&q), json!({"status": "sent"})).await.unwrap();
        assert!(!updated.contains_key("services"));
        assert_eq!(quotes.get_one(&id_of(&q)).await.unwrap()["services"]["name"], "Branding");
    }

    #[tokio::test]
    async fn replied_contacts_are_stamped() {
        let store = Arc::new(MemoryStore::admin());
        let svc = service::<ContactMessages>(&store);
        let row = store
            .insert(
                &svc.collection,
                &json!({"name": "Kim", "email": "kim@example.com", "status": "new"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
        let updated = svc.update(&id_of(&row), json!({"status": "replied"})).await.unwrap();
        assert!(updated["replied_at"].is_string());
    }

    #[tokio::test]
    async fn update_ignores_key_and_creation_time() {
        let store = Arc::new(MemoryStore::admin());
        let svc = service::<Services>(&store);
        let row = svc.create(json!({"name": "Design"})).await.unwrap();
        let id = id_of(&row);
        let updated = svc
            .update(
                &id,
                json!({"id": uuid::Uuid::new_v4(), "created_at": "2000-01-01T00:00:00Z", "name": "UX"}),
            )
            .await
            .unwrap();
        assert_eq!(updated["id"], row["id"]);
        assert_eq!(updated["created_at"], row["created_at"]);
        assert_eq!(updated["name"], "UX");
        assert!(updated["updated_at"].is_string());

        let err = svc
            .update(&id, json!({"id": uuid::Uuid::new_v4()}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = Arc::new(MemoryStore::admin());
        let err = service::<Services>(&store)
            .update(&uuid::Uuid::new_v4().to_string(), json!({"name": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn remove_then_get_is_not_found() {
        let store = Arc::new(MemoryStore::admin());
        let svc = service::<Products>(&store);
        let row = svc.create(json!({"name": "Lamp"})).await.unwrap();
        let id = id_of(&row);
        assert_eq!(svc.remove(&id).await.unwrap(), row);
        assert!(matches!(svc.get_one(&id).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.remove(&id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_keys_are_inconsistent() {
        let store = Arc::new(MemoryStore::admin());
        let id = uuid::Uuid::new_v4();
        let row = json!({"id": id, "name": "twin", "created_at": "2024-01-01T00:00:00Z"});
        store
            .seed(
                "services",
                vec![row.as_object().cloned().unwrap(), row.as_object().cloned().unwrap()],
            )
            .await
            .unwrap();
        let err = service::<Services>(&store).get_one(&id.to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::Inconsistent(_)));
    }

    #[tokio::test]
    async fn store_failures_become_store_errors() {
        let store = Arc::new(MemoryStore::new());
        let err = service::<Services>(&store).list(&[]).await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::UnknownCollection(_))));
    }

    #[tokio::test]
    async fn date_range_filters_inclusively() {
        let store = Arc::new(MemoryStore::admin());
        let rows: Vec<Record> = [
            "2023-12-31T23:59:59Z",
            "2024-01-01T00:00:00Z",
            "2024-01-15T12:00:00Z",
            "2024-01-31T23:59:00Z",
            "2024-02-01T00:00:00Z",
        ]
        .iter()
        .map(|ts| {
            json!({"id": uuid::Uuid::new_v4(), "status": "pending", "created_at": ts})
                .as_object()
                .cloned()
                .unwrap()
        })
        .collect();
        store.seed("quotes", rows).await.unwrap();
        let svc = service::<Quotes>(&store);
        let found = svc
            .list(&params(&[("dateFrom", "2024-01-01"), ("dateTo", "2024-01-31")]))
            .await
            .unwrap();
        let stamps: Vec<_> = found.iter().map(|r| r["created_at"].as_str().unwrap()).collect();
        assert_eq!(
            stamps,
            vec!["2024-01-31T23:59:00Z", "2024-01-15T12:00:00Z", "2024-01-01T00:00:00Z"]
        );

        let with_foo = svc
            .list(&params(&[("dateFrom", "2024-01-01"), ("dateTo", "2024-01-31"), ("foo", "bar")]))
            .await
            .unwrap();
        assert_eq!(with_foo, found);
    }

    #[tokio::test]
    async fn quotes_embed_service_and_client() {
        let store = Arc::new(MemoryStore::admin());
        let services = service::<Services>(&store);
        let design = services.create(json!({"name": "Design", "description": "UI"})).await.unwrap();
        let quotes = service::<Quotes>(&store);
        let q = quotes
            .create(json!({"service_id": design["id"], "status": "pending"}))
            .await
            .unwrap();
        let fetched = quotes.get_one(&id_of(&q)).await.unwrap();
        assert_eq!(fetched["services"]["name"], "Design");
        assert!(fetched["clients"].is_null());

        let by_service = quotes
            .list(&params(&[("serviceId", design["id"].as_str().unwrap())]))
            .await
            .unwrap();
        assert_eq!(by_service.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_creates_get_distinct_ids() {
        let store = Arc::new(MemoryStore::admin());
        let svc = service::<Services>(&store);
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.create(json!({"name": format!("s{}", i)})).await })
            })
            .collect();
        let mut ids = HashSet::new();
        for h in handles {
            let row = h.await.unwrap().unwrap();
            ids.insert(id_of(&row));
        }
        assert_eq!(ids.len(), 32);
        assert_eq!(store.len("services").await.unwrap(), 32);
    }
}
