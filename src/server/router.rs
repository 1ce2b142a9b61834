use super::generate::{self, GenerateState};
use crate::upstream::InferenceClient;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub fn create_router(inference: Arc<InferenceClient>) -> Router {
    let state = GenerateState { inference };

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/generate",
            get(generate::service_info).post(generate::handle_generate),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
