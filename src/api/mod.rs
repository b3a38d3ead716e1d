//! HTTP surface: router assembly, shared state, identity plumbing.

pub mod session;
pub mod task_routes;

use std::sync::Arc;

use axum::{middleware, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::store::TaskStore;
use session::SessionStore;

/// Application state shared across all handlers. The store and session
/// collaborators are injected here; nothing reaches for globals.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn TaskStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { store, sessions }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(task_routes::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    session::identity_layer,
                )),
        )
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
