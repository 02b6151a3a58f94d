use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};

use crate::api::state::AppState;
use crate::core::{CreateOrderRequest, OrderOutcome};

fn extract_idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn create_order_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateOrderRequest>,
) -> Response {
    let idempotency_key = extract_idempotency_key(&headers);

    match state
        .order_service
        .create_order(&request, idempotency_key.as_deref())
        .await
    {
        Ok(OrderOutcome::Created(body)) => (StatusCode::CREATED, Json(body)).into_response(),
        Ok(OrderOutcome::Replayed { status, body }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
            (status, Json(body)).into_response()
        }
        Err(err) => err.into_response(),
    }
}
