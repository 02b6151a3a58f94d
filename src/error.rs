use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Main error type for the order service.
///
/// Variants carry no HTTP knowledge; `IntoResponse` below is the only place
/// a `CoreError` is translated into a wire status code.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("one or more requested products do not exist: {0:?}")]
    ProductsNotFound(Vec<String>),

    #[error("no single warehouse can supply every requested item")]
    SplitShipmentNotSupported {
        closest_warehouse_id: Option<String>,
        shortfalls: Vec<ProductShortfall>,
    },

    #[error("payment authorization was denied")]
    PaymentFailed,

    #[error("a request with this idempotency key is already being processed")]
    IdempotencyInFlight,

    #[error("idempotency key reused with a different request body")]
    IdempotencyParamsMismatch,

    #[error("geocoding failed: {0}")]
    Geocoding(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// A single product that fell short of a requested quantity at some warehouse,
/// surfaced to the client when a split-shipment rejection occurs.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProductShortfall {
    pub product_id: String,
    pub requested: i64,
    pub available: i64,
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// True for errors that are a deterministic property of the request
    /// itself: replaying the same request will always produce the same
    /// error, so an idempotency record can be finalized as FAILED. A 5xx
    /// is not deterministic in this sense and leaves the record PROCESSING.
    pub fn is_client_error(&self) -> bool {
        self.status_and_body().0.is_client_error()
    }

    pub fn status_and_body(&self) -> (StatusCode, serde_json::Value) {
        let (status, code, message) = match self {
            CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION", msg.clone()),
            CoreError::ProductsNotFound(ids) => (
                StatusCode::NOT_FOUND,
                "PRODUCTS_NOT_FOUND",
                format!("unknown product ids: {}", ids.join(", ")),
            ),
            CoreError::SplitShipmentNotSupported { .. } => (
                StatusCode::BAD_REQUEST,
                "SPLIT_SHIPMENT_NOT_SUPPORTED",
                "no single warehouse can supply every requested item".to_string(),
            ),
            CoreError::PaymentFailed => (
                StatusCode::PAYMENT_REQUIRED,
                "PAYMENT_FAILED",
                "payment authorization was denied".to_string(),
            ),
            CoreError::IdempotencyInFlight => (
                StatusCode::CONFLICT,
                "IDEMPOTENCY_IN_FLIGHT",
                "a request with this idempotency key is already being processed".to_string(),
            ),
            CoreError::IdempotencyParamsMismatch => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "IDEMPOTENCY_PARAMS_MISMATCH",
                "idempotency key reused with a different request body".to_string(),
            ),
            CoreError::Geocoding(msg) => (StatusCode::BAD_GATEWAY, "GEOCODING_FAILED", msg.clone()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "an internal error occurred".to_string(),
            ),
        };

        let mut body = json!({ "error": { "code": code, "message": message } });
        if let CoreError::SplitShipmentNotSupported {
            closest_warehouse_id,
            shortfalls,
        } = self
        {
            body["error"]["closestWarehouseExcluded"] = json!(closest_warehouse_id);
            body["error"]["shortfalls"] = json!(shortfalls);
        }

        (status, body)
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}
