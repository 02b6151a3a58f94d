use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Order, OrderItem, OrderStatus};
use crate::selector::Selection;

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    #[serde(rename = "customerEmail")]
    pub customer_email: String,
    #[serde(rename = "shippingAddress")]
    pub shipping_address: String,
    #[serde(rename = "totalAmount")]
    pub total_amount: i64,
    pub status: OrderStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub warehouse: WarehouseSummary,
    #[serde(rename = "orderItems")]
    pub order_items: Vec<OrderItemResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarehouseSummary {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    #[serde(rename = "distanceKm", skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(rename = "selectionReason", skip_serializing_if = "Option::is_none")]
    pub selection_reason: Option<String>,
    #[serde(rename = "closestWarehouseExcluded", skip_serializing_if = "Option::is_none")]
    pub closest_warehouse_excluded: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    #[serde(rename = "productId")]
    pub product_id: Uuid,
    pub quantity: i64,
    #[serde(rename = "priceAtPurchase")]
    pub price_at_purchase: i64,
}

impl OrderResponse {
    pub fn build(order: &Order, items: &[OrderItem], selection: &Selection) -> Self {
        let (selection_reason, closest_warehouse_excluded) = match &selection.closer_warehouse_skipped {
            Some(skipped) => (
                Some(format!(
                    "closest warehouse {} could not supply every item",
                    skipped.warehouse_id
                )),
                Some(skipped.warehouse_id),
            ),
            None => (None, None),
        };

        OrderResponse {
            id: order.id,
            customer_email: order.customer_email.clone(),
            shipping_address: order.shipping_address.clone(),
            total_amount: order.total_cents,
            status: order.status,
            created_at: order.created_at,
            warehouse: WarehouseSummary {
                id: selection.warehouse.id,
                name: selection.warehouse.name.clone(),
                address: selection.warehouse.address.clone(),
                distance_km: Some(selection.distance_km),
                selection_reason,
                closest_warehouse_excluded,
            },
            order_items: items
                .iter()
                .map(|item| OrderItemResponse {
                    id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price_at_purchase: item.price_at_purchase_cents,
                })
                .collect(),
        }
    }
}
