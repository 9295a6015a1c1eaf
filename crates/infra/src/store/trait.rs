use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use storeflow_catalog::Product;
use storeflow_core::{DomainError, OrderId, ProductId, TenantId};
use storeflow_inventory::{AdjustmentAction, InventoryAdjustment};
use storeflow_orders::{
    Order, OrderFilter, OrderItem, OrderStatistics, OrderStatus, Page, PaymentStatus,
};

/// Storage operation error.
///
/// `Domain` carries deterministic rule failures surfaced by the store
/// (insufficient stock, unknown product). `Conflict` marks transient
/// uniqueness/serialization races that callers may retry with fresh input.
/// `Backend` is everything environmental (connection loss, pool closed).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        StoreError::Conflict(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        StoreError::Backend(msg.into())
    }

    /// Whether retrying the whole operation with fresh state can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Tenant-scoped storefront storage.
///
/// Every operation takes a `tenant_id` and must never observe or touch
/// another tenant's rows. Quantity-bearing writes (`apply_adjustment`,
/// `place_order`) are atomic: the product quantity change and its ledger
/// entry commit together or not at all, and quantities never go negative.
///
/// The trait is synchronous so the services built on it stay testable with
/// plain threads; async backends bridge via the runtime handle.
pub trait StorefrontStore: Send + Sync {
    // Catalog

    /// Insert a new product. Fails with `Conflict` when the tenant already
    /// has a product with the same slug.
    fn insert_product(&self, product: &Product) -> StoreResult<()>;

    fn get_product(&self, tenant_id: TenantId, product_id: ProductId)
    -> StoreResult<Option<Product>>;

    /// Whether a live (not soft-deleted) product with this slug exists for
    /// the tenant.
    fn slug_exists(&self, tenant_id: TenantId, slug: &str) -> StoreResult<bool>;

    /// Active products at or below their low-stock threshold, lowest first.
    fn list_low_stock(&self, tenant_id: TenantId) -> StoreResult<Vec<Product>>;

    // Inventory ledger

    /// Atomically apply a quantity delta to one product and append the
    /// matching ledger entry. Rejects deltas that would drive the quantity
    /// negative, leaving both product and ledger untouched.
    fn apply_adjustment(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
        action: AdjustmentAction,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreResult<InventoryAdjustment>;

    /// A product's full ledger, oldest first.
    fn list_adjustments(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Vec<InventoryAdjustment>>;

    // Orders

    /// Persist a placed order in one atomic unit: decrement each reserved
    /// product (failing the whole placement if any lacks stock), append the
    /// sale ledger entries, and insert the order with its items. Fails with
    /// `Conflict` when the order number is already taken by any tenant.
    ///
    /// `reservations` must be merged per product and sorted ascending by
    /// product id so concurrent placements lock rows in a stable order.
    fn place_order(
        &self,
        order: &Order,
        items: &[OrderItem],
        reservations: &[(ProductId, i64)],
        now: DateTime<Utc>,
    ) -> StoreResult<()>;

    fn get_order(&self, tenant_id: TenantId, order_id: OrderId) -> StoreResult<Option<Order>>;

    fn get_order_items(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> StoreResult<Vec<OrderItem>>;

    /// Persist updated order state (status, payment, soft delete) only if the
    /// stored order still carries the given status pair. A lost compare fails
    /// with `Conflict` so the caller re-reads instead of clobbering a
    /// concurrent transition; an absent order fails with `NotFound`.
    fn update_order(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        expected_payment: PaymentStatus,
    ) -> StoreResult<()>;

    /// Persist a cancellation and return the reserved stock in one atomic
    /// unit: compare-and-swap the order from `expected_status` to its new
    /// state, increment each reversed product, and append the matching
    /// cancellation-reversal ledger entries. A lost compare fails with
    /// `Conflict` and writes nothing, so two racing cancels can never both
    /// return stock.
    fn cancel_order(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        reversals: &[(ProductId, i64)],
        now: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Whether any order, across all tenants, already carries this number.
    fn order_number_exists(&self, order_number: &str) -> StoreResult<bool>;

    /// Live orders matching the filter, newest first, paginated.
    fn list_orders(
        &self,
        tenant_id: TenantId,
        filter: &OrderFilter,
        page: Page,
    ) -> StoreResult<Vec<Order>>;

    /// Total live orders matching the filter (for pagination metadata).
    fn count_orders(&self, tenant_id: TenantId, filter: &OrderFilter) -> StoreResult<u64>;

    fn statistics(&self, tenant_id: TenantId) -> StoreResult<OrderStatistics>;
}

impl<S> StorefrontStore for Arc<S>
where
    S: StorefrontStore + ?Sized,
{
    fn insert_product(&self, product: &Product) -> StoreResult<()> {
        (**self).insert_product(product)
    }

    fn get_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Option<Product>> {
        (**self).get_product(tenant_id, product_id)
    }

    fn slug_exists(&self, tenant_id: TenantId, slug: &str) -> StoreResult<bool> {
        (**self).slug_exists(tenant_id, slug)
    }

    fn list_low_stock(&self, tenant_id: TenantId) -> StoreResult<Vec<Product>> {
        (**self).list_low_stock(tenant_id)
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
        (**self).apply_adjustment(tenant_id, product_id, delta, action, reason, now)
    }

    fn list_adjustments(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Vec<InventoryAdjustment>> {
        (**self).list_adjustments(tenant_id, product_id)
    }

    fn place_order(
        &self,
        order: &Order,
        items: &[OrderItem],
        reservations: &[(ProductId, i64)],
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        (**self).place_order(order, items, reservations, now)
    }

    fn get_order(&self, tenant_id: TenantId, order_id: OrderId) -> StoreResult<Option<Order>> {
        (**self).get_order(tenant_id, order_id)
    }

    fn get_order_items(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> StoreResult<Vec<OrderItem>> {
        (**self).get_order_items(tenant_id, order_id)
    }

    fn update_order(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        expected_payment: PaymentStatus,
    ) -> StoreResult<()> {
        (**self).update_order(order, expected_status, expected_payment)
    }

    fn cancel_order(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        reversals: &[(ProductId, i64)],
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        (**self).cancel_order(order, expected_status, reversals, now)
    }

    fn order_number_exists(&self, order_number: &str) -> StoreResult<bool> {
        (**self).order_number_exists(order_number)
    }

    fn list_orders(
        &self,
        tenant_id: TenantId,
        filter: &OrderFilter,
        page: Page,
    ) -> StoreResult<Vec<Order>> {
        (**self).list_orders(tenant_id, filter, page)
    }

    fn count_orders(&self, tenant_id: TenantId, filter: &OrderFilter) -> StoreResult<u64> {
        (**self).count_orders(tenant_id, filter)
    }

    fn statistics(&self, tenant_id: TenantId) -> StoreResult<OrderStatistics> {
        (**self).statistics(tenant_id)
    }
}
