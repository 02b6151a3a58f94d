pub mod idempotency;
pub mod inventory;
pub mod order;
pub mod product;
pub mod warehouse;

pub use idempotency::{IdempotencyRecord, IdempotencyStatus};
pub use inventory::InventoryRow;
pub use order::{Order, OrderItem, OrderStatus};
pub use product::Product;
pub use warehouse::Warehouse;
