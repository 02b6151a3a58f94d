//! The idempotency admission protocol (customerKey, clientKey) -> outcome.
//!
//! Mirrors the commit engine's own transaction discipline: a single atomic
//! insert decides who gets to proceed, a unique-constraint collision decides
//! everyone else's fate, and a stale `PROCESSING` holder can be taken over
//! rather than blocking retries forever.

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::request::CreateOrderRequest;
use crate::domain::{IdempotencyRecord, IdempotencyStatus};
use crate::error::{CoreError, Result};

pub struct IdempotencyLayer {
    pool: PgPool,
    stale_after_ms: i64,
}

#[derive(Debug)]
pub enum Admission {
    /// No prior record exists for this key, or the prior holder went stale
    /// and this caller has taken over. Proceed with the commit engine.
    Admitted { record_id: Uuid },
    /// A terminal record already exists with a matching request hash;
    /// replay its cached response rather than re-executing anything.
    Replay { status: i32, body: serde_json::Value },
}

impl IdempotencyLayer {
    pub fn new(pool: PgPool) -> Self {
        Self::with_stale_after(pool, 30_000)
    }

    pub fn with_stale_after(pool: PgPool, stale_after_ms: i64) -> Self {
        Self { pool, stale_after_ms }
    }

    pub fn hash_request(request: &CreateOrderRequest) -> String {
        let mut hasher = Sha256::new();
        hasher.update(request.canonical_json().to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Admit a (customer_key, key) pair, or resolve it against an existing
    /// record per the admission protocol.
    pub async fn admit(
        &self,
        customer_key: &str,
        key: &str,
        request: &CreateOrderRequest,
    ) -> Result<Admission> {
        let hash = Self::hash_request(request);
        let now = Utc::now();
        let id = Uuid::new_v4();

        let inserted = sqlx::query(
            r#"
            INSERT INTO idempotency_records
                (id, customer_key, key, request_hash, status, locked_at, created_at)
            VALUES ($1, $2, $3, $4, 'PROCESSING', $5, $5)
            ON CONFLICT (customer_key, key) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(customer_key)
        .bind(key)
        .bind(&hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if inserted.is_some() {
            debug!(%customer_key, %key, "admitted new idempotency key");
            return Ok(Admission::Admitted { record_id: id });
        }

        let existing = self.fetch_record(customer_key, key).await?;

        if existing.request_hash != hash {
            warn!(%customer_key, %key, "idempotency key reused with a different request body");
            return Err(CoreError::IdempotencyParamsMismatch);
        }

        if existing.status.is_terminal() {
            let status = existing.response_status.unwrap_or(500);
            let body = existing.response_body.unwrap_or(serde_json::json!({}));
            return Ok(Admission::Replay { status, body });
        }

        if existing.is_stale(now, self.stale_after_ms) {
            info!(%customer_key, %key, "taking over stale idempotency lock");
            let updated = sqlx::query(
                r#"
                UPDATE idempotency_records
                SET locked_at = $3
                WHERE customer_key = $1 AND key = $2 AND status = 'PROCESSING' AND locked_at = $4
                RETURNING id
                "#,
            )
            .bind(customer_key)
            .bind(key)
            .bind(now)
            .bind(existing.locked_at)
            .fetch_optional(&self.pool)
            .await?;

            return match updated {
                Some(row) => Ok(Admission::Admitted {
                    record_id: row.get("id"),
                }),
                // Someone else took it over between our read and write; the
                // caller should treat this the same as a fresh in-flight lock.
                None => Err(CoreError::IdempotencyInFlight),
            };
        }

        Err(CoreError::IdempotencyInFlight)
    }

    pub async fn fetch_record(&self, customer_key: &str, key: &str) -> Result<IdempotencyRecord> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_key, key, request_hash, status,
                   response_status, response_body, locked_at, created_at
            FROM idempotency_records
            WHERE customer_key = $1 AND key = $2
            "#,
        )
        .bind(customer_key)
        .bind(key)
        .fetch_one(&self.pool)
        .await?;

        let status_str: String = row.get("status");
        Ok(IdempotencyRecord {
            id: row.get("id"),
            customer_key: row.get("customer_key"),
            key: row.get("key"),
            request_hash: row.get("request_hash"),
            status: IdempotencyStatus::try_from(status_str.as_str())
                .map_err(CoreError::Internal)?,
            response_status: row.try_get("response_status").ok(),
            response_body: row.try_get("response_body").ok(),
            locked_at: row.get("locked_at"),
            created_at: row.get("created_at"),
        })
    }

    pub async fn mark_completed<T: Serialize>(&self, record_id: Uuid, status: i32, body: &T) -> Result<()> {
        let body_json = serde_json::to_value(body)?;
        sqlx::query(
            r#"
            UPDATE idempotency_records
            SET status = 'COMPLETED', response_status = $2, response_body = $3
            WHERE id = $1
            "#,
        )
        .bind(record_id)
        .bind(status)
        .bind(&body_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, record_id: Uuid, status: i32, body: &serde_json::Value) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE idempotency_records
            SET status = 'FAILED', response_status = $2, response_body = $3
            WHERE id = $1
            "#,
        )
        .bind(record_id)
        .bind(status)
        .bind(body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Deletes terminal records older than `retention_hours`. Intended to be
    /// called on a periodic sweep, not from the request path.
    pub async fn cleanup_expired(&self, retention_hours: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM idempotency_records
            WHERE status IN ('COMPLETED', 'FAILED')
              AND created_at < now() - ($1 || ' hours')::interval
            "#,
        )
        .bind(retention_hours.to_string())
        .execute(&self.pool)
        .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            info!(deleted, "swept expired idempotency records");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::request::{CustomerInfo, PaymentDetails, RequestedItemDto};

    fn req(items: Vec<(&str, u32)>) -> CreateOrderRequest {
        CreateOrderRequest {
            customer: CustomerInfo { email: "c@x.com".into() },
            address: "New York, NY".into(),
            payment_details: PaymentDetails { credit_card: "4111111111111111".into() },
            items: items
                .into_iter()
                .map(|(id, q)| RequestedItemDto { product_id: id.into(), quantity: q })
                .collect(),
        }
    }

    #[test]
    fn hash_is_stable_across_item_order() {
        let a = req(vec![("p2", 1), ("p1", 2)]);
        let b = req(vec![("p1", 2), ("p2", 1)]);
        assert_eq!(IdempotencyLayer::hash_request(&a), IdempotencyLayer::hash_request(&b));
    }

    #[test]
    fn hash_changes_when_quantity_changes() {
        let a = req(vec![("p1", 1)]);
        let b = req(vec![("p1", 2)]);
        assert_ne!(IdempotencyLayer::hash_request(&a), IdempotencyLayer::hash_request(&b));
    }

    #[test]
    fn hash_ignores_payment_details() {
        let mut a = req(vec![("p1", 1)]);
        let mut b = a.clone();
        a.payment_details.credit_card = "4111111111111111".into();
        b.payment_details.credit_card = "5555555555554444".into();
        assert_eq!(IdempotencyLayer::hash_request(&a), IdempotencyLayer::hash_request(&b));
    }
}
