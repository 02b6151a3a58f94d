use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::OrderService;

/// Shared application state for API handlers.
#[derive(Clone)]
pub struct AppState {
    pub order_service: Arc<OrderService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(order_service: Arc<OrderService>) -> Self {
        Self {
            order_service,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
