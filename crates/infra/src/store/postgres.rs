//! Postgres-backed storefront store.
//!
//! Persists products, the inventory adjustment ledger, orders and order
//! items, with tenant isolation and the non-negative-stock invariant
//! enforced at the database level.
//!
//! ## Schema expectations
//!
//! - `products(id, tenant_id, name, slug, description, sku, price, quantity,
//!   low_stock_threshold, is_active, created_at, deleted_at)` with a partial
//!   unique index on `(tenant_id, slug) WHERE deleted_at IS NULL` and a
//!   check constraint `quantity >= 0`.
//! - `inventory_adjustments(id, tenant_id, product_id, action,
//!   quantity_change, quantity_before, quantity_after, reason, created_at)`,
//!   append-only.
//! - `orders(...)` with a global unique index on `order_number` (numbers
//!   are unique across tenants).
//! - `order_items(id, order_id, product_id, product_name, unit_price,
//!   quantity, subtotal, attributes)`.
//!
//! ## Error mapping
//!
//! | PostgreSQL error code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` (unique violation) | `Conflict` | Slug or order number race |
//! | `23514` (check violation) | `Domain(InsufficientStock)` is produced before this can fire; anything else is `Backend` |
//! | other | `Backend` | Connection loss, pool closed, corrupt rows |
//!
//! ## Concurrency
//!
//! Placement runs in one transaction. Each reservation is a conditional
//! `UPDATE ... SET quantity = quantity - $n WHERE quantity >= $n`; the row
//! lock taken by the update serializes competing placements per product, and
//! a zero-row update distinguishes "not found" from "not enough stock".
//! Reservations arrive sorted by product id so transactions acquire row
//! locks in a stable order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use storeflow_catalog::Product;
use storeflow_core::{
    AdjustmentId, DomainError, Money, OrderId, OrderItemId, ProductId, TenantId,
};
use storeflow_inventory::{AdjustmentAction, InventoryAdjustment};
use storeflow_orders::{
    Channel, ChannelCounts, CustomerInfo, Order, OrderAmounts, OrderFilter, OrderItem,
    OrderParts, OrderStatistics, OrderStatus, Page, PaymentMethod, PaymentState,
    PaymentStatus, ShippingAddress,
};

use super::r#trait::{StoreError, StoreResult, StorefrontStore};

/// Postgres-backed storefront store.
///
/// Thread-safe via the SQLx connection pool. The synchronous
/// [`StorefrontStore`] impl bridges onto the ambient tokio runtime with
/// `Handle::block_on`, which is only legal from threads allowed to block.
/// Callers inside the runtime must hop through `spawn_blocking` first, as
/// the API handlers do; plain worker threads with a runtime entered (the
/// blocking pool) work directly.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self, product), fields(tenant_id = %product.tenant_id, product_id = %product.id), err)]
    pub async fn insert_product_async(&self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, name, slug, description, sku, price, quantity,
                low_stock_threshold, is_active, created_at, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.tenant_id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(&product.sku)
        .bind(product.price.minor())
        .bind(product.quantity())
        .bind(product.low_stock_threshold)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.deleted_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %product_id), err)]
    pub async fn get_product_async(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, name, slug, description, sku, price, quantity,
                   low_stock_threshold, is_active, created_at, deleted_at
            FROM products
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub async fn slug_exists_async(&self, tenant_id: TenantId, slug: &str) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM products WHERE tenant_id = $1 AND slug = $2 AND deleted_at IS NULL) AS taken",
        )
        .bind(tenant_id.as_uuid())
        .bind(slug)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("slug_exists", e))?;

        row.try_get("taken")
            .map_err(|e| StoreError::backend(format!("failed to read exists flag: {e}")))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub async fn list_low_stock_async(&self, tenant_id: TenantId) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, name, slug, description, sku, price, quantity,
                   low_stock_threshold, is_active, created_at, deleted_at
            FROM products
            WHERE tenant_id = $1
              AND deleted_at IS NULL
              AND is_active
              AND quantity <= low_stock_threshold
            ORDER BY quantity ASC, id ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_low_stock", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(
        skip(self, reason),
        fields(tenant_id = %tenant_id, product_id = %product_id, delta, action = %action),
        err
    )]
    pub async fn apply_adjustment_async(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
        action: AdjustmentAction,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreResult<InventoryAdjustment> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let change =
            reserve_quantity(&mut tx, tenant_id, product_id, -delta, false).await?;

        let adjustment = InventoryAdjustment {
            id: AdjustmentId::new(),
            tenant_id,
            product_id,
            action,
            quantity_change: delta,
            quantity_before: change.before,
            quantity_after: change.after,
            reason,
            created_at: now,
        };
        insert_adjustment(&mut tx, &adjustment).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(adjustment)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %product_id), err)]
    pub async fn list_adjustments_async(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Vec<InventoryAdjustment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, product_id, action, quantity_change,
                   quantity_before, quantity_after, reason, created_at
            FROM inventory_adjustments
            WHERE tenant_id = $1 AND product_id = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_adjustments", e))?;

        rows.iter().map(adjustment_from_row).collect()
    }

    #[instrument(
        skip(self, order, items, reservations),
        fields(
            tenant_id = %order.tenant_id,
            order_id = %order.id,
            order_number = %order.order_number,
            item_count = items.len()
        ),
        err
    )]
    pub async fn place_order_async(
        &self,
        order: &Order,
        items: &[OrderItem],
        reservations: &[(ProductId, i64)],
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // The global unique order_number index turns a numbering race into
        // a Conflict before any stock is touched.
        insert_order(&mut tx, order).await?;

        for &(product_id, quantity) in reservations {
            let change =
                reserve_quantity(&mut tx, order.tenant_id, product_id, quantity, true).await?;
            let adjustment = InventoryAdjustment {
                id: AdjustmentId::new(),
                tenant_id: order.tenant_id,
                product_id,
                action: AdjustmentAction::Sale,
                quantity_change: -quantity,
                quantity_before: change.before,
                quantity_after: change.after,
                reason: Some(format!("order {}", order.order_number)),
                created_at: now,
            };
            insert_adjustment(&mut tx, &adjustment).await?;
        }

        for item in items {
            insert_order_item(&mut tx, item).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, order_id = %order_id), err)]
    pub async fn get_order_async(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> StoreResult<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id.as_uuid())
        .bind(order_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;

        row.map(|r| order_from_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, order_id = %order_id), err)]
    pub async fn get_order_items_async(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> StoreResult<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, oi.product_name,
                   oi.unit_price, oi.quantity, oi.subtotal, oi.attributes
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE o.tenant_id = $1 AND oi.order_id = $2
            ORDER BY oi.id ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(order_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order_items", e))?;

        rows.iter().map(order_item_from_row).collect()
    }

    /// Compare-and-swap on the status pair: the row is only written when it
    /// still carries the state the caller read. A lost compare surfaces as
    /// `Conflict` so the caller re-reads instead of clobbering a concurrent
    /// transition.
    #[instrument(skip(self, order), fields(tenant_id = %order.tenant_id, order_id = %order.id), err)]
    pub async fn update_order_async(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        expected_payment: PaymentStatus,
    ) -> StoreResult<()> {
        let payment = order.payment();
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = $3,
                payment_status = $4,
                payment_method = $5,
                transaction_id = $6,
                paid_at = $7,
                notes = $8,
                shipped_at = $9,
                deleted_at = $10
            WHERE tenant_id = $1 AND id = $2
              AND status = $11 AND payment_status = $12
            "#,
        )
        .bind(order.tenant_id.as_uuid())
        .bind(order.id.as_uuid())
        .bind(order.status().as_str())
        .bind(payment.status.as_str())
        .bind(payment.method.map(|m| m.as_str()))
        .bind(&payment.transaction_id)
        .bind(payment.paid_at)
        .bind(&order.notes)
        .bind(order.shipped_at())
        .bind(order.deleted_at)
        .bind(expected_status.as_str())
        .bind(expected_payment.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;

        if result.rows_affected() == 0 {
            return Err(self
                .stale_order_error(order.tenant_id, order.id, &order.order_number)
                .await?);
        }
        Ok(())
    }

    /// Cancellation in one transaction: compare-and-swap the order row, then
    /// return each reversed product's stock with its ledger entry. Nothing
    /// is written when the swap loses.
    #[instrument(
        skip(self, order, reversals),
        fields(tenant_id = %order.tenant_id, order_id = %order.id, reversal_count = reversals.len()),
        err
    )]
    pub async fn cancel_order_async(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        reversals: &[(ProductId, i64)],
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let payment = order.payment();
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = $3,
                payment_status = $4,
                payment_method = $5,
                transaction_id = $6,
                paid_at = $7,
                notes = $8,
                shipped_at = $9,
                deleted_at = $10
            WHERE tenant_id = $1 AND id = $2 AND status = $11
            "#,
        )
        .bind(order.tenant_id.as_uuid())
        .bind(order.id.as_uuid())
        .bind(order.status().as_str())
        .bind(payment.status.as_str())
        .bind(payment.method.map(|m| m.as_str()))
        .bind(&payment.transaction_id)
        .bind(payment.paid_at)
        .bind(&order.notes)
        .bind(order.shipped_at())
        .bind(order.deleted_at)
        .bind(expected_status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("cancel_order", e))?;

        if result.rows_affected() == 0 {
            return Err(self
                .stale_order_error(order.tenant_id, order.id, &order.order_number)
                .await?);
        }

        for &(product_id, quantity) in reversals {
            let change =
                reserve_quantity(&mut tx, order.tenant_id, product_id, -quantity, false).await?;
            let adjustment = InventoryAdjustment {
                id: AdjustmentId::new(),
                tenant_id: order.tenant_id,
                product_id,
                action: AdjustmentAction::CancellationReversal,
                quantity_change: quantity,
                quantity_before: change.before,
                quantity_after: change.after,
                reason: Some(format!("order {} cancelled", order.order_number)),
                created_at: now,
            };
            insert_adjustment(&mut tx, &adjustment).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    /// Disambiguate a zero-row order update: absent row or lost compare.
    async fn stale_order_error(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        order_number: &str,
    ) -> StoreResult<StoreError> {
        let exists = sqlx::query("SELECT 1 FROM orders WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(order_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("stale_order_error", e))?;

        Ok(match exists {
            Some(_) => StoreError::conflict(format!(
                "order {order_number} was modified concurrently"
            )),
            None => StoreError::Domain(DomainError::NotFound),
        })
    }

    #[instrument(skip(self), err)]
    pub async fn order_number_exists_async(&self, order_number: &str) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = $1) AS taken",
        )
        .bind(order_number)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("order_number_exists", e))?;

        row.try_get("taken")
            .map_err(|e| StoreError::backend(format!("failed to read exists flag: {e}")))
    }

    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id), err)]
    pub async fn list_orders_async(
        &self,
        tenant_id: TenantId,
        filter: &OrderFilter,
        page: Page,
    ) -> StoreResult<Vec<Order>> {
        let search = filter.search.as_deref().map(|s| format!("%{s}%"));
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE tenant_id = $1
              AND deleted_at IS NULL
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR payment_status = $3)
              AND ($4::text IS NULL OR channel = $4)
              AND ($5::text IS NULL
                   OR order_number ILIKE $5
                   OR customer_name ILIKE $5
                   OR customer_phone ILIKE $5)
            ORDER BY created_at DESC, id DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.payment_status.map(|s| s.as_str()))
        .bind(filter.channel.map(|c| c.as_str()))
        .bind(search)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        rows.iter().map(order_from_row).collect()
    }

    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id), err)]
    pub async fn count_orders_async(
        &self,
        tenant_id: TenantId,
        filter: &OrderFilter,
    ) -> StoreResult<u64> {
        let search = filter.search.as_deref().map(|s| format!("%{s}%"));
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM orders
            WHERE tenant_id = $1
              AND deleted_at IS NULL
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR payment_status = $3)
              AND ($4::text IS NULL OR channel = $4)
              AND ($5::text IS NULL
                   OR order_number ILIKE $5
                   OR customer_name ILIKE $5
                   OR customer_phone ILIKE $5)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.payment_status.map(|s| s.as_str()))
        .bind(filter.channel.map(|c| c.as_str()))
        .bind(search)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_orders", e))?;

        let total: i64 = row
            .try_get("total")
            .map_err(|e| StoreError::backend(format!("failed to read count: {e}")))?;
        Ok(total as u64)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub async fn statistics_async(&self, tenant_id: TenantId) -> StoreResult<OrderStatistics> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_orders,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending_orders,
                COUNT(*) FILTER (WHERE payment_status = 'paid') AS paid_orders,
                COALESCE(SUM(total) FILTER (WHERE payment_status = 'paid'), 0) AS total_revenue,
                COUNT(*) FILTER (WHERE channel = 'web') AS web_orders,
                COUNT(*) FILTER (WHERE channel = 'instagram') AS instagram_orders,
                COUNT(*) FILTER (WHERE channel = 'whatsapp') AS whatsapp_orders
            FROM orders
            WHERE tenant_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("statistics", e))?;

        let count = |name: &str| -> StoreResult<u64> {
            let v: i64 = row
                .try_get(name)
                .map_err(|e| StoreError::backend(format!("failed to read {name}: {e}")))?;
            Ok(v as u64)
        };
        let revenue: i64 = row
            .try_get("total_revenue")
            .map_err(|e| StoreError::backend(format!("failed to read total_revenue: {e}")))?;

        Ok(OrderStatistics {
            total_orders: count("total_orders")?,
            pending_orders: count("pending_orders")?,
            paid_orders: count("paid_orders")?,
            total_revenue: money(revenue)?,
            orders_by_channel: ChannelCounts {
                web: count("web_orders")?,
                instagram: count("instagram_orders")?,
                whatsapp: count("whatsapp_orders")?,
            },
        })
    }
}

const ORDER_COLUMNS: &str = "id, tenant_id, order_number, customer_name, customer_email, \
     customer_phone, status, payment_status, payment_method, transaction_id, paid_at, \
     subtotal, tax, shipping_cost, total, street, city, state, postal_code, notes, \
     channel, created_at, shipped_at, deleted_at";

struct QuantityChange {
    before: i64,
    after: i64,
}

/// Conditionally decrement a product's quantity inside a transaction.
///
/// `quantity` is the amount to subtract; pass a negative value to add stock.
/// With `sellable_only`, soft-deleted and inactive products are treated as
/// not found. A zero-row update is disambiguated by re-reading the row.
async fn reserve_quantity(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    product_id: ProductId,
    quantity: i64,
    sellable_only: bool,
) -> StoreResult<QuantityChange> {
    let row = sqlx::query(
        r#"
        UPDATE products
        SET quantity = quantity - $3
        WHERE tenant_id = $1 AND id = $2
          AND quantity >= $3
          AND ($4 = FALSE OR (deleted_at IS NULL AND is_active))
        RETURNING quantity
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(product_id.as_uuid())
    .bind(quantity)
    .bind(sellable_only)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("reserve_quantity", e))?;

    if let Some(row) = row {
        let after: i64 = row
            .try_get("quantity")
            .map_err(|e| StoreError::backend(format!("failed to read quantity: {e}")))?;
        return Ok(QuantityChange {
            before: after + quantity,
            after,
        });
    }

    let current = sqlx::query(
        r#"
        SELECT quantity FROM products
        WHERE tenant_id = $1 AND id = $2
          AND ($3 = FALSE OR (deleted_at IS NULL AND is_active))
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(product_id.as_uuid())
    .bind(sellable_only)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("reserve_quantity", e))?;

    match current {
        Some(row) => {
            let available: i64 = row
                .try_get("quantity")
                .map_err(|e| StoreError::backend(format!("failed to read quantity: {e}")))?;
            Err(StoreError::Domain(DomainError::insufficient_stock(
                product_id, quantity, available,
            )))
        }
        None => Err(StoreError::Domain(DomainError::ProductNotFound {
            product_id,
        })),
    }
}

async fn insert_adjustment(
    tx: &mut Transaction<'_, Postgres>,
    adjustment: &InventoryAdjustment,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_adjustments (
            id, tenant_id, product_id, action, quantity_change,
            quantity_before, quantity_after, reason, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(adjustment.id.as_uuid())
    .bind(adjustment.tenant_id.as_uuid())
    .bind(adjustment.product_id.as_uuid())
    .bind(adjustment.action.as_str())
    .bind(adjustment.quantity_change)
    .bind(adjustment.quantity_before)
    .bind(adjustment.quantity_after)
    .bind(&adjustment.reason)
    .bind(adjustment.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_adjustment", e))?;
    Ok(())
}

async fn insert_order(tx: &mut Transaction<'_, Postgres>, order: &Order) -> StoreResult<()> {
    let payment = order.payment();
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, tenant_id, order_number, customer_name, customer_email,
            customer_phone, status, payment_status, payment_method,
            transaction_id, paid_at, subtotal, tax, shipping_cost, total,
            street, city, state, postal_code, notes, channel, created_at,
            shipped_at, deleted_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
        "#,
    )
    .bind(order.id.as_uuid())
    .bind(order.tenant_id.as_uuid())
    .bind(&order.order_number)
    .bind(&order.customer.name)
    .bind(&order.customer.email)
    .bind(&order.customer.phone)
    .bind(order.status().as_str())
    .bind(payment.status.as_str())
    .bind(payment.method.map(|m| m.as_str()))
    .bind(&payment.transaction_id)
    .bind(payment.paid_at)
    .bind(order.amounts.subtotal.minor())
    .bind(order.amounts.tax.minor())
    .bind(order.amounts.shipping_cost.minor())
    .bind(order.amounts.total.minor())
    .bind(&order.shipping_address.street)
    .bind(&order.shipping_address.city)
    .bind(&order.shipping_address.state)
    .bind(&order.shipping_address.postal_code)
    .bind(&order.notes)
    .bind(order.channel.as_str())
    .bind(order.created_at)
    .bind(order.shipped_at())
    .bind(order.deleted_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_order", e))?;
    Ok(())
}

async fn insert_order_item(
    tx: &mut Transaction<'_, Postgres>,
    item: &OrderItem,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, product_id, product_name, unit_price, quantity,
            subtotal, attributes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(item.id.as_uuid())
    .bind(item.order_id.as_uuid())
    .bind(item.product_id.as_uuid())
    .bind(&item.product_name)
    .bind(item.unit_price.minor())
    .bind(item.quantity)
    .bind(item.subtotal.minor())
    .bind(&item.attributes)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_order_item", e))?;
    Ok(())
}

fn money(minor: i64) -> StoreResult<Money> {
    Money::from_minor(minor).map_err(|e| StoreError::backend(format!("corrupt amount column: {e}")))
}

fn decode<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::backend(format!("failed to read column {name}: {e}")))
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    Ok(Product::rehydrate(
        ProductId::from_uuid(decode(row, "id")?),
        TenantId::from_uuid(decode(row, "tenant_id")?),
        decode(row, "name")?,
        decode(row, "slug")?,
        decode(row, "description")?,
        decode(row, "sku")?,
        money(decode(row, "price")?)?,
        decode(row, "quantity")?,
        decode(row, "low_stock_threshold")?,
        decode(row, "is_active")?,
        decode(row, "created_at")?,
        decode(row, "deleted_at")?,
    ))
}

fn adjustment_from_row(row: &PgRow) -> StoreResult<InventoryAdjustment> {
    let action: String = decode(row, "action")?;
    Ok(InventoryAdjustment {
        id: AdjustmentId::from_uuid(decode(row, "id")?),
        tenant_id: TenantId::from_uuid(decode(row, "tenant_id")?),
        product_id: ProductId::from_uuid(decode(row, "product_id")?),
        action: AdjustmentAction::parse(&action)
            .map_err(|e| StoreError::backend(format!("corrupt action column: {e}")))?,
        quantity_change: decode(row, "quantity_change")?,
        quantity_before: decode(row, "quantity_before")?,
        quantity_after: decode(row, "quantity_after")?,
        reason: decode(row, "reason")?,
        created_at: decode(row, "created_at")?,
    })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    let status: String = decode(row, "status")?;
    let payment_status: String = decode(row, "payment_status")?;
    let payment_method: Option<String> = decode(row, "payment_method")?;
    let channel: String = decode(row, "channel")?;

    let corrupt = |e: DomainError| StoreError::backend(format!("corrupt order row: {e}"));

    Ok(Order::rehydrate(OrderParts {
        id: OrderId::from_uuid(decode(row, "id")?),
        tenant_id: TenantId::from_uuid(decode(row, "tenant_id")?),
        order_number: decode(row, "order_number")?,
        customer: CustomerInfo {
            name: decode(row, "customer_name")?,
            email: decode(row, "customer_email")?,
            phone: decode(row, "customer_phone")?,
        },
        status: OrderStatus::parse(&status).map_err(corrupt)?,
        payment: PaymentState {
            status: PaymentStatus::parse(&payment_status).map_err(corrupt)?,
            method: payment_method
                .as_deref()
                .map(PaymentMethod::parse)
                .transpose()
                .map_err(corrupt)?,
            transaction_id: decode(row, "transaction_id")?,
            paid_at: decode(row, "paid_at")?,
        },
        amounts: OrderAmounts {
            subtotal: money(decode(row, "subtotal")?)?,
            tax: money(decode(row, "tax")?)?,
            shipping_cost: money(decode(row, "shipping_cost")?)?,
            total: money(decode(row, "total")?)?,
        },
        shipping_address: ShippingAddress {
            street: decode(row, "street")?,
            city: decode(row, "city")?,
            state: decode(row, "state")?,
            postal_code: decode(row, "postal_code")?,
        },
        notes: decode(row, "notes")?,
        channel: Channel::parse(&channel).map_err(corrupt)?,
        created_at: decode(row, "created_at")?,
        shipped_at: decode(row, "shipped_at")?,
        deleted_at: decode(row, "deleted_at")?,
    }))
}

fn order_item_from_row(row: &PgRow) -> StoreResult<OrderItem> {
    Ok(OrderItem {
        id: OrderItemId::from_uuid(decode(row, "id")?),
        order_id: OrderId::from_uuid(decode(row, "order_id")?),
        product_id: ProductId::from_uuid(decode(row, "product_id")?),
        product_name: decode(row, "product_name")?,
        unit_price: money(decode(row, "unit_price")?)?,
        quantity: decode(row, "quantity")?,
        subtotal: money(decode(row, "subtotal")?)?,
        attributes: decode(row, "attributes")?,
    })
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation: slug or order number race.
                Some("23505") => StoreError::Conflict(msg),
                // Serialization failure / deadlock: retryable.
                Some("40001") | Some("40P01") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn runtime_handle() -> StoreResult<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::backend(
            "PostgresStore requires an ambient tokio runtime; call it from async context",
        )
    })
}

// The StorefrontStore trait is synchronous; bridge onto the ambient tokio
// runtime the same way the async backends are consumed elsewhere.
impl StorefrontStore for PostgresStore {
    fn insert_product(&self, product: &Product) -> StoreResult<()> {
        runtime_handle()?.block_on(self.insert_product_async(product))
    }

    fn get_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Option<Product>> {
        runtime_handle()?.block_on(self.get_product_async(tenant_id, product_id))
    }

    fn slug_exists(&self, tenant_id: TenantId, slug: &str) -> StoreResult<bool> {
        runtime_handle()?.block_on(self.slug_exists_async(tenant_id, slug))
    }

    fn list_low_stock(&self, tenant_id: TenantId) -> StoreResult<Vec<Product>> {
        runtime_handle()?.block_on(self.list_low_stock_async(tenant_id))
    }

    fn apply_adjustment(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
        action: AdjustmentAction,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreResult<InventoryAdjustment> {
        runtime_handle()?.block_on(
            self.apply_adjustment_async(tenant_id, product_id, delta, action, reason, now),
        )
    }

    fn list_adjustments(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Vec<InventoryAdjustment>> {
        runtime_handle()?.block_on(self.list_adjustments_async(tenant_id, product_id))
    }

    fn place_order(
        &self,
        order: &Order,
        items: &[OrderItem],
        reservations: &[(ProductId, i64)],
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        runtime_handle()?.block_on(self.place_order_async(order, items, reservations, now))
    }

    fn get_order(&self, tenant_id: TenantId, order_id: OrderId) -> StoreResult<Option<Order>> {
        runtime_handle()?.block_on(self.get_order_async(tenant_id, order_id))
    }

    fn get_order_items(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> StoreResult<Vec<OrderItem>> {
        runtime_handle()?.block_on(self.get_order_items_async(tenant_id, order_id))
    }

    fn update_order(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        expected_payment: PaymentStatus,
    ) -> StoreResult<()> {
        runtime_handle()?.block_on(self.update_order_async(order, expected_status, expected_payment))
    }

    fn cancel_order(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        reversals: &[(ProductId, i64)],
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        runtime_handle()?.block_on(self.cancel_order_async(order, expected_status, reversals, now))
    }

    fn order_number_exists(&self, order_number: &str) -> StoreResult<bool> {
        runtime_handle()?.block_on(self.order_number_exists_async(order_number))
    }

    fn list_orders(
        &self,
        tenant_id: TenantId,
        filter: &OrderFilter,
        page: Page,
    ) -> StoreResult<Vec<Order>> {
        runtime_handle()?.block_on(self.list_orders_async(tenant_id, filter, page))
    }

    fn count_orders(&self, tenant_id: TenantId, filter: &OrderFilter) -> StoreResult<u64> {
        runtime_handle()?.block_on(self.count_orders_async(tenant_id, filter))
    }

    fn statistics(&self, tenant_id: TenantId) -> StoreResult<OrderStatistics> {
        runtime_handle()?.block_on(self.statistics_async(tenant_id))
    }
}
