use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of an admitted idempotency record. A record moves from
/// `Processing` to exactly one terminal state, or stays `Processing` forever
/// if the holder crashed before finalizing — in which case a stale lock
/// makes it eligible for takeover (see the idempotency layer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdempotencyStatus {
    Processing,
    Completed,
    Failed,
}

impl IdempotencyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdempotencyStatus::Processing => "PROCESSING",
            IdempotencyStatus::Completed => "COMPLETED",
            IdempotencyStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, IdempotencyStatus::Completed | IdempotencyStatus::Failed)
    }
}

impl fmt::Display for IdempotencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for IdempotencyStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "PROCESSING" => Ok(IdempotencyStatus::Processing),
            "COMPLETED" => Ok(IdempotencyStatus::Completed),
            "FAILED" => Ok(IdempotencyStatus::Failed),
            other => Err(format!("unknown idempotency status: {other}")),
        }
    }
}

/// One admission record, scoped to (customer_key, key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub id: Uuid,
    pub customer_key: String,
    pub key: String,
    pub request_hash: String,
    pub status: IdempotencyStatus,
    pub response_status: Option<i32>,
    pub response_body: Option<serde_json::Value>,
    pub locked_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn is_stale(&self, now: DateTime<Utc>, stale_after_ms: i64) -> bool {
        let age_ms = (now - self.locked_at).num_milliseconds();
        age_ms > stale_after_ms
    }
}
