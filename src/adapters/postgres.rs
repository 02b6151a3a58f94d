use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::{InventoryRow, Order, OrderItem, Product, Warehouse};
use crate::error::Result;

/// PostgreSQL storage adapter for the catalog and order tables.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("database migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ==================== Catalog reads (outside any transaction) ====================

    #[instrument(skip(self))]
    pub async fn fetch_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let rows = sqlx::query("SELECT id, sku, name, price_cents FROM products WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| Product {
                id: r.get("id"),
                sku: r.get("sku"),
                name: r.get("name"),
                price_cents: r.get("price_cents"),
            })
            .collect())
    }

    pub async fn fetch_warehouses(&self) -> Result<Vec<Warehouse>> {
        let rows = sqlx::query("SELECT id, name, address, latitude, longitude FROM warehouses")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| Warehouse {
                id: r.get("id"),
                name: r.get("name"),
                address: r.get("address"),
                latitude: r.get("latitude"),
                longitude: r.get("longitude"),
            })
            .collect())
    }

    /// Snapshot read, for previews that are not part of a commit.
    pub async fn fetch_inventory_for_products(&self, product_ids: &[Uuid]) -> Result<Vec<InventoryRow>> {
        let rows = sqlx::query(
            "SELECT warehouse_id, product_id, quantity FROM inventory WHERE product_id = ANY($1)",
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_inventory).collect())
    }

    /// Locked read for use inside the commit transaction. Rows are ordered by
    /// (warehouse_id, product_id) so that any two concurrent orders acquire
    /// their locks in the same order, which rules out lock-ordering deadlocks.
    #[instrument(skip(tx))]
    pub async fn fetch_inventory_for_products_locked(
        tx: &mut Transaction<'_, Postgres>,
        product_ids: &[Uuid],
    ) -> Result<Vec<InventoryRow>> {
        let rows = sqlx::query(
            r#"
            SELECT warehouse_id, product_id, quantity
            FROM inventory
            WHERE product_id = ANY($1)
            ORDER BY warehouse_id, product_id
            FOR UPDATE
            "#,
        )
        .bind(product_ids)
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows.into_iter().map(row_to_inventory).collect())
    }

    pub async fn decrement_inventory(
        tx: &mut Transaction<'_, Postgres>,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = quantity - $3
            WHERE warehouse_id = $1 AND product_id = $2 AND quantity >= $3
            "#,
        )
        .bind(warehouse_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn insert_order(tx: &mut Transaction<'_, Postgres>, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_email, shipping_address, total_cents, status, warehouse_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id)
        .bind(&order.customer_email)
        .bind(&order.shipping_address)
        .bind(order.total_cents)
        .bind(order.status.as_str())
        .bind(order.warehouse_id)
        .bind(order.created_at)
        .execute(&mut **tx)
        .await?;
        debug!(order_id = %order.id, "inserted order");
        Ok(())
    }

    pub async fn insert_order_items(tx: &mut Transaction<'_, Postgres>, items: &[OrderItem]) -> Result<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, price_at_purchase_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price_at_purchase_cents)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

fn row_to_inventory(r: sqlx::postgres::PgRow) -> InventoryRow {
    InventoryRow {
        warehouse_id: r.get("warehouse_id"),
        product_id: r.get("product_id"),
        quantity: r.get("quantity"),
    }
}
