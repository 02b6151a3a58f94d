use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::api::{handlers, state::AppState};

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|v| HeaderValue::from_str(v.trim()).ok())
        .collect();

    if origins.is_empty() {
        origins.push(HeaderValue::from_static("http://localhost:3000"));
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static("idempotency-key"),
        ])
}

pub fn create_router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    let cors = build_cors_layer(cors_allowed_origins);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/orders", post(handlers::create_order_handler))
        .with_state(state)
        .layer(cors)
}
