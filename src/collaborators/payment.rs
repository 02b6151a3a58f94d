use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::Result;

/// An amount that always denies, used by the integration test suite so
/// payment-failure scenarios do not depend on a particular gateway's
/// business rules.
pub const DETERMINISTIC_DENIAL_AMOUNT_CENTS: i64 = 9999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResult {
    pub success: bool,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundResult {
    pub success: bool,
}

/// Capability for authorizing a charge and, if the enclosing order
/// transaction later fails to commit, refunding it.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(&self, card: &str, amount_cents: i64, memo: &str) -> Result<AuthorizationResult>;
    async fn refund(&self, transaction_id: &str, amount_cents: i64, reason: &str) -> Result<RefundResult>;
}

/// A deterministic in-process gateway: denies exactly the test-reserved
/// amount, otherwise authorizes, and tracks refunds in memory. Suitable for
/// the integration test suite and for running the service without external
/// payment credentials.
pub struct TestPaymentGateway {
    next_transaction_id: AtomicU64,
    refunded: Mutex<Vec<(String, i64, String)>>,
}

impl TestPaymentGateway {
    pub fn new() -> Self {
        Self {
            next_transaction_id: AtomicU64::new(1),
            refunded: Mutex::new(Vec::new()),
        }
    }

    pub fn refunded_transactions(&self) -> Vec<(String, i64, String)> {
        self.refunded.lock().expect("refund log mutex poisoned").clone()
    }
}

impl Default for TestPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for TestPaymentGateway {
    async fn authorize(&self, _card: &str, amount_cents: i64, _memo: &str) -> Result<AuthorizationResult> {
        if amount_cents == DETERMINISTIC_DENIAL_AMOUNT_CENTS {
            return Ok(AuthorizationResult {
                success: false,
                transaction_id: None,
            });
        }

        let id = self.next_transaction_id.fetch_add(1, Ordering::SeqCst);
        Ok(AuthorizationResult {
            success: true,
            transaction_id: Some(format!("txn_{id}")),
        })
    }

    async fn refund(&self, transaction_id: &str, amount_cents: i64, reason: &str) -> Result<RefundResult> {
        self.refunded
            .lock()
            .expect("refund log mutex poisoned")
            .push((transaction_id.to_string(), amount_cents, reason.to_string()));
        Ok(RefundResult { success: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn denies_the_reserved_test_amount() {
        let gw = TestPaymentGateway::new();
        let result = gw
            .authorize("4111111111111111", DETERMINISTIC_DENIAL_AMOUNT_CENTS, "order")
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.transaction_id.is_none());
    }

    #[tokio::test]
    async fn authorizes_any_other_amount() {
        let gw = TestPaymentGateway::new();
        let result = gw.authorize("4111111111111111", 1500, "order").await.unwrap();
        assert!(result.success);
        assert!(result.transaction_id.is_some());
    }

    #[tokio::test]
    async fn refund_is_recorded() {
        let gw = TestPaymentGateway::new();
        gw.refund("txn_1", 1500, "commit failed").await.unwrap();
        assert_eq!(gw.refunded_transactions(), vec![("txn_1".to_string(), 1500, "commit failed".to_string())]);
    }
}
