use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock of one product at one warehouse. Mutated only inside the commit
/// transaction (or by out-of-scope catalog admin operations).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
}

impl InventoryRow {
    pub fn can_satisfy(&self, requested: i64) -> bool {
        self.quantity >= requested
    }
}
