use serde::{Deserialize, Serialize};
use serde_json::json;

/// Wire-level request for `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub customer: CustomerInfo,
    pub address: String,
    #[serde(rename = "paymentDetails")]
    pub payment_details: PaymentDetails,
    pub items: Vec<RequestedItemDto>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomerInfo {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentDetails {
    #[serde(rename = "creditCard")]
    pub credit_card: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestedItemDto {
    #[serde(rename = "productId")]
    pub product_id: String,
    pub quantity: u32,
}

impl CreateOrderRequest {
    /// Canonical JSON of everything that makes two requests "the same
    /// logical request" for idempotency purposes. Payment details are never
    /// included: they must not be persisted or hashed.
    pub fn canonical_json(&self) -> serde_json::Value {
        let mut items = self.items.clone();
        items.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        json!({
            "customer": { "email": self.customer.email },
            "address": self.address,
            "items": items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn canonical_json_is_stable_under_item_reordering() {
        let a = req(vec![("p2", 1), ("p1", 2)]);
        let b = req(vec![("p1", 2), ("p2", 1)]);
        assert_eq!(a.canonical_json(), b.canonical_json());
    }

    #[test]
    fn canonical_json_excludes_payment_details() {
        let value = req(vec![("p1", 1)]).canonical_json();
        assert!(value.get("paymentDetails").is_none());
        assert!(value.get("payment_details").is_none());
    }
}
