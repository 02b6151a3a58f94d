//! End-to-end scenarios exercised against the pure, DB-independent parts of
//! the order pipeline: warehouse selection, payment authorization, and the
//! inventory bookkeeping the commit engine performs inside its transaction.
//! A live Postgres instance is required to exercise the transaction itself;
//! these tests pin down the arithmetic and control flow around it.

use uuid::Uuid;
use warehouse_orders::collaborators::{PaymentGateway, TestPaymentGateway};
use warehouse_orders::domain::{InventoryRow, Warehouse};
use warehouse_orders::error::CoreError;
use warehouse_orders::geo::GeoPoint;
use warehouse_orders::selector::{select_warehouse, RequestedItem};

fn warehouse(id: u128, name: &str, lat: f64, lng: f64) -> Warehouse {
    Warehouse {
        id: Uuid::from_u128(id),
        name: name.to_string(),
        address: format!("{name} warehouse"),
        latitude: lat,
        longitude: lng,
    }
}

fn decrement(inventory: &mut [InventoryRow], warehouse_id: Uuid, product_id: Uuid, qty: i64) {
    for row in inventory.iter_mut() {
        if row.warehouse_id == warehouse_id && row.product_id == product_id {
            row.quantity -= qty;
        }
    }
}

#[tokio::test]
async fn perfect_order_decrements_the_selected_warehouse_only() {
    let ny = warehouse(1, "NY", 40.7128, -74.0060);
    let product_a = Uuid::from_u128(100);
    let mut inventory = vec![InventoryRow { warehouse_id: ny.id, product_id: product_a, quantity: 10 }];
    let items = vec![RequestedItem { product_id: product_a, quantity: 1 }];
    let customer = GeoPoint::new(40.7128, -74.0060);

    let selection = select_warehouse(&[ny.clone()], &inventory, &items, customer).unwrap();
    assert_eq!(selection.warehouse.id, ny.id);

    let gateway = TestPaymentGateway::new();
    let auth = gateway.authorize("4111111111111111", 1000, "order").await.unwrap();
    assert!(auth.success);

    decrement(&mut inventory, ny.id, product_a, 1);
    assert_eq!(inventory[0].quantity, 9);
}

#[tokio::test]
async fn bundle_order_totals_and_decrements_every_line_item() {
    let ny = warehouse(1, "NY", 40.7128, -74.0060);
    let keyboard = Uuid::from_u128(1);
    let mouse = Uuid::from_u128(2);
    let monitor = Uuid::from_u128(3);
    let mut inventory = vec![
        InventoryRow { warehouse_id: ny.id, product_id: keyboard, quantity: 20 },
        InventoryRow { warehouse_id: ny.id, product_id: mouse, quantity: 30 },
        InventoryRow { warehouse_id: ny.id, product_id: monitor, quantity: 15 },
    ];
    let items = vec![
        RequestedItem { product_id: keyboard, quantity: 1 },
        RequestedItem { product_id: mouse, quantity: 1 },
        RequestedItem { product_id: monitor, quantity: 1 },
    ];
    let customer = GeoPoint::new(40.7, -74.0);

    let selection = select_warehouse(&[ny.clone()], &inventory, &items, customer).unwrap();
    assert_eq!(selection.warehouse.id, ny.id);

    let prices = [(keyboard, 8999i64), (mouse, 2999), (monitor, 19999)];
    let total: i64 = prices.iter().map(|(_, p)| p).sum();
    assert_eq!(total, 31997);

    for item in &items {
        decrement(&mut inventory, ny.id, item.product_id, item.quantity);
    }
    assert_eq!(inventory[0].quantity, 19);
    assert_eq!(inventory[1].quantity, 29);
    assert_eq!(inventory[2].quantity, 14);
}

#[tokio::test]
async fn austin_address_routes_to_the_closest_warehouse_denver() {
    let ny = warehouse(1, "NY", 40.7128, -74.0060);
    let sf = warehouse(2, "SF", 37.7749, -122.4194);
    let denver = warehouse(3, "Denver", 39.7392, -104.9903);
    let product_t = Uuid::from_u128(900);
    let inventory = vec![
        InventoryRow { warehouse_id: ny.id, product_id: product_t, quantity: 20 },
        InventoryRow { warehouse_id: sf.id, product_id: product_t, quantity: 20 },
        InventoryRow { warehouse_id: denver.id, product_id: product_t, quantity: 20 },
    ];
    let items = vec![RequestedItem { product_id: product_t, quantity: 1 }];
    let austin = GeoPoint::new(30.2672, -97.7431);

    let selection = select_warehouse(&[ny, sf, denver.clone()], &inventory, &items, austin).unwrap();
    assert_eq!(selection.warehouse.id, denver.id);
}

#[tokio::test]
async fn split_shipment_across_warehouses_is_rejected() {
    let ny = warehouse(1, "NY", 40.7128, -74.0060);
    let sf = warehouse(2, "SF", 37.7749, -122.4194);
    let product_x = Uuid::from_u128(200);
    let product_y = Uuid::from_u128(201);
    let inventory = vec![
        InventoryRow { warehouse_id: ny.id, product_id: product_x, quantity: 5 },
        InventoryRow { warehouse_id: sf.id, product_id: product_y, quantity: 5 },
    ];
    let items = vec![
        RequestedItem { product_id: product_x, quantity: 1 },
        RequestedItem { product_id: product_y, quantity: 1 },
    ];
    let customer = GeoPoint::new(40.0, -90.0);

    let err = select_warehouse(&[ny, sf], &inventory, &items, customer).unwrap_err();
    assert!(matches!(err, CoreError::SplitShipmentNotSupported { .. }));
}

#[tokio::test]
async fn the_reserved_test_amount_is_always_denied() {
    let gateway = TestPaymentGateway::new();
    let auth = gateway
        .authorize(
            "4111111111111111",
            warehouse_orders::collaborators::payment::DETERMINISTIC_DENIAL_AMOUNT_CENTS,
            "order",
        )
        .await
        .unwrap();
    assert!(!auth.success);
}

#[tokio::test]
async fn a_failed_authorization_never_produces_a_refund() {
    let gateway = TestPaymentGateway::new();
    let _ = gateway
        .authorize(
            "4111111111111111",
            warehouse_orders::collaborators::payment::DETERMINISTIC_DENIAL_AMOUNT_CENTS,
            "order",
        )
        .await
        .unwrap();
    assert!(gateway.refunded_transactions().is_empty());
}
