//! Per-entity CRUD routers. Only the operations an entity allows are registered.

use crate::auth::{require_admin, AuthGate};
use crate::handlers::resource::{create, get_one, list, remove, update};
use crate::resource::{ContactMessages, Entity, Operation, Products, Quotes, Services, Testimonials};
use crate::service::ResourceService;
use crate::store::Store;
use axum::{middleware, routing::MethodRouter, Router};
use std::sync::Arc;

/// `GET|POST /` and `GET|PUT|DELETE /:id` for one entity.
pub fn resource_routes<S: Store>(svc: ResourceService<S>) -> Router {
    let d = svc.descriptor();
    let mut collection: MethodRouter<ResourceService<S>> = MethodRouter::new();
    if d.allows(Operation::List) {
        collection = collection.get(list::<S>);
    }
    if d.allows(Operation::Create) {
        collection = collection.post(create::<S>);
    }
    let mut item: MethodRouter<ResourceService<S>> = MethodRouter::new();
    if d.allows(Operation::Get) {
        item = item.get(get_one::<S>);
    }
    if d.allows(Operation::Update) {
        item = item.put(update::<S>);
    }
    if d.allows(Operation::Delete) {
        item = item.delete(remove::<S>);
    }
    Router::new()
        .route("/", collection)
        .route("/:id", item)
        .with_state(svc)
}

fn gated<S: Store, E: Entity>(store: &Arc<S>, schema: &str, gate: &Arc<dyn AuthGate>) -> (String, Router) {
    let svc = ResourceService::<S>::for_entity::<E>(Arc::clone(store), schema);
    let path = format!("/{}", svc.descriptor().path_segment);
    let router = resource_routes(svc).route_layer(middleware::from_fn_with_state(
        Arc::clone(gate),
        require_admin,
    ));
    (path, router)
}

/// Every admin entity, each behind the auth gate. Mount under `/api/admin`.
pub fn admin_routes<S: Store>(store: Arc<S>, schema: &str, gate: Arc<dyn AuthGate>) -> Router {
    [
        gated::<S, Testimonials>(&store, schema, &gate),
        gated::<S, Services>(&store, schema, &gate),
        gated::<S, Products>(&store, schema, &gate),
        gated::<S, Quotes>(&store, schema, &gate),
        gated::<S, ContactMessages>(&store, schema, &gate),
    ]
    .into_iter()
    .fold(Router::new(), |router, (path, entity)| router.nest(&path, entity))
}
