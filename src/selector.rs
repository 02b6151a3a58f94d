//! Distance-ranked, inventory-constrained warehouse selection.
//!
//! Pure over its inputs: given the full warehouse list, the inventory rows
//! relevant to the requested products, and the customer's coordinates, it
//! never touches the store itself. The commit engine is responsible for
//! fetching those rows (with or without a row lock) before calling in here.

use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::{InventoryRow, Warehouse};
use crate::error::{CoreError, ProductShortfall};
use crate::geo::{distance_km, GeoPoint};

#[derive(Debug, Clone, Copy)]
pub struct RequestedItem {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub warehouse: Warehouse,
    pub distance_km: f64,
    /// Set when the chosen warehouse was not the globally closest one that
    /// could be reached; explains why it was skipped.
    pub closer_warehouse_skipped: Option<SkippedWarehouse>,
}

#[derive(Debug, Clone)]
pub struct SkippedWarehouse {
    pub warehouse_id: Uuid,
    pub distance_km: f64,
    pub shortfalls: Vec<ProductShortfall>,
}

fn round_km(d: f64) -> f64 {
    (d * 10.0).round() / 10.0
}

fn shortfalls_for(
    warehouse_id: Uuid,
    items: &[RequestedItem],
    inventory_by_key: &HashMap<(Uuid, Uuid), i64>,
) -> Vec<ProductShortfall> {
    items
        .iter()
        .filter_map(|item| {
            let available = inventory_by_key
                .get(&(warehouse_id, item.product_id))
                .copied()
                .unwrap_or(0);
            if available < item.quantity {
                Some(ProductShortfall {
                    product_id: item.product_id.to_string(),
                    requested: item.quantity,
                    available,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Selects the single warehouse that can supply every requested item,
/// ranked by distance to `customer` with a lexicographic id tie-break.
pub fn select_warehouse(
    warehouses: &[Warehouse],
    inventory: &[InventoryRow],
    items: &[RequestedItem],
    customer: GeoPoint,
) -> Result<Selection, CoreError> {
    let inventory_by_key: HashMap<(Uuid, Uuid), i64> = inventory
        .iter()
        .map(|row| ((row.warehouse_id, row.product_id), row.quantity))
        .collect();

    let mut ranked: Vec<&Warehouse> = warehouses.iter().collect();
    ranked.sort_by(|a, b| {
        let da = distance_km(GeoPoint::new(a.latitude, a.longitude), customer);
        let db = distance_km(GeoPoint::new(b.latitude, b.longitude), customer);
        da.partial_cmp(&db)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    let satisfies = |w: &Warehouse| -> bool {
        items.iter().all(|item| {
            inventory_by_key
                .get(&(w.id, item.product_id))
                .copied()
                .unwrap_or(0)
                >= item.quantity
        })
    };

    let closest = ranked.first().copied();

    for w in &ranked {
        if satisfies(w) {
            let dist = round_km(distance_km(GeoPoint::new(w.latitude, w.longitude), customer));
            let closer_warehouse_skipped = closest.and_then(|c| {
                if c.id == w.id {
                    None
                } else {
                    Some(SkippedWarehouse {
                        warehouse_id: c.id,
                        distance_km: round_km(distance_km(
                            GeoPoint::new(c.latitude, c.longitude),
                            customer,
                        )),
                        shortfalls: shortfalls_for(c.id, items, &inventory_by_key),
                    })
                }
            });
            return Ok(Selection {
                warehouse: (*w).clone(),
                distance_km: dist,
                closer_warehouse_skipped,
            });
        }
    }

    let closest_id = closest.map(|w| w.id.to_string());
    let shortfalls = closest
        .map(|w| shortfalls_for(w.id, items, &inventory_by_key))
        .unwrap_or_default();
    Err(CoreError::SplitShipmentNotSupported {
        closest_warehouse_id: closest_id,
        shortfalls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wh(id: u128, name: &str, lat: f64, lng: f64) -> Warehouse {
        Warehouse {
            id: Uuid::from_u128(id),
            name: name.to_string(),
            address: format!("{name} address"),
            latitude: lat,
            longitude: lng,
        }
    }

    fn inv(warehouse_id: u128, product_id: u128, quantity: i64) -> InventoryRow {
        InventoryRow {
            warehouse_id: Uuid::from_u128(warehouse_id),
            product_id: Uuid::from_u128(product_id),
            quantity,
        }
    }

    #[test]
    fn picks_the_closest_warehouse_with_sufficient_stock() {
        let ny = wh(1, "NY", 40.7128, -74.0060);
        let sf = wh(2, "SF", 37.7749, -122.4194);
        let warehouses = vec![ny.clone(), sf.clone()];
        let inventory = vec![inv(1, 100, 10), inv(2, 100, 10)];
        let items = vec![RequestedItem { product_id: Uuid::from_u128(100), quantity: 1 }];
        let customer = GeoPoint::new(40.7, -74.0);

        let selection = select_warehouse(&warehouses, &inventory, &items, customer).unwrap();
        assert_eq!(selection.warehouse.id, ny.id);
        assert!(selection.closer_warehouse_skipped.is_none());
    }

    #[test]
    fn skips_a_closer_warehouse_that_cannot_cover_the_order() {
        let ny = wh(1, "NY", 40.7128, -74.0060);
        let denver = wh(2, "Denver", 39.7392, -104.9903);
        let warehouses = vec![denver.clone(), ny.clone()];
        // Denver only has 4 units, NY has 10; customer requests 5, near Denver.
        let inventory = vec![inv(2, 100, 4), inv(1, 100, 10)];
        let items = vec![RequestedItem { product_id: Uuid::from_u128(100), quantity: 5 }];
        let customer = GeoPoint::new(39.0, -105.0);

        let selection = select_warehouse(&warehouses, &inventory, &items, customer).unwrap();
        assert_eq!(selection.warehouse.id, ny.id);
        let skipped = selection.closer_warehouse_skipped.unwrap();
        assert_eq!(skipped.warehouse_id, denver.id);
        assert_eq!(skipped.shortfalls[0].available, 4);
        assert_eq!(skipped.shortfalls[0].requested, 5);
    }

    #[test]
    fn rejects_when_no_single_warehouse_covers_every_item() {
        let ny = wh(1, "NY", 40.7128, -74.0060);
        let sf = wh(2, "SF", 37.7749, -122.4194);
        let warehouses = vec![ny, sf];
        // product X only at NY, product Y only at SF
        let inventory = vec![inv(1, 200, 5), inv(2, 201, 5)];
        let items = vec![
            RequestedItem { product_id: Uuid::from_u128(200), quantity: 1 },
            RequestedItem { product_id: Uuid::from_u128(201), quantity: 1 },
        ];
        let customer = GeoPoint::new(40.0, -90.0);

        let err = select_warehouse(&warehouses, &inventory, &items, customer).unwrap_err();
        assert!(matches!(err, CoreError::SplitShipmentNotSupported { .. }));
    }

    #[test]
    fn equal_distance_breaks_tie_by_warehouse_id() {
        // Two warehouses at the exact same coordinates as the customer.
        let a = wh(1, "A", 0.0, 0.0);
        let b = wh(2, "B", 0.0, 0.0);
        let warehouses = vec![b.clone(), a.clone()];
        let inventory = vec![inv(1, 100, 5), inv(2, 100, 5)];
        let items = vec![RequestedItem { product_id: Uuid::from_u128(100), quantity: 1 }];
        let customer = GeoPoint::new(0.0, 0.0);

        let selection = select_warehouse(&warehouses, &inventory, &items, customer).unwrap();
        assert_eq!(selection.warehouse.id, a.id);
    }
}
