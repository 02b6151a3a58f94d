use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog product. Owned by the catalog subsystem; the core only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    /// Price in integer cents. Never negative.
    pub price_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_is_carried_verbatim() {
        let p = Product {
            id: Uuid::nil(),
            sku: "SKU-1".into(),
            name: "Widget".into(),
            price_cents: 1999,
        };
        assert_eq!(p.price_cents, 1999);
    }
}
