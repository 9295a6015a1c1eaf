use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use storeflow_catalog::Product;
use storeflow_core::{AdjustmentId, DomainError, OrderId, ProductId, TenantId};
use storeflow_inventory::{AdjustmentAction, InventoryAdjustment};
use storeflow_orders::{
    compute_statistics, Order, OrderFilter, OrderItem, OrderStatistics, OrderStatus, Page,
    PaymentStatus,
};

use super::r#trait::{StoreError, StoreResult, StorefrontStore};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    adjustments: Vec<InventoryAdjustment>,
    orders: HashMap<OrderId, Order>,
    order_items: HashMap<OrderId, Vec<OrderItem>>,
}

/// In-memory storefront store.
///
/// Intended for tests/dev. A single lock guards all tables, which makes
/// multi-row operations (placement, adjustment plus ledger entry) trivially
/// atomic. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_adjustment(
        product: &Product,
        before: i64,
        delta: i64,
        action: AdjustmentAction,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> InventoryAdjustment {
        InventoryAdjustment {
            id: AdjustmentId::new(),
            tenant_id: product.tenant_id,
            product_id: product.id,
            action,
            quantity_change: delta,
            quantity_before: before,
            quantity_after: before + delta,
            reason,
            created_at: now,
        }
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::backend("lock poisoned")
}

impl StorefrontStore for InMemoryStore {
    fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut state = self.inner.write().map_err(poisoned)?;

        let slug_taken = state.products.values().any(|p| {
            p.tenant_id == product.tenant_id && p.slug == product.slug && !p.is_deleted()
        });
        if slug_taken {
            return Err(StoreError::conflict(format!(
                "slug '{}' already exists",
                product.slug
            )));
        }

        state.products.insert(product.id, product.clone());
        Ok(())
    }

    fn get_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Option<Product>> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state
            .products
            .get(&product_id)
            .filter(|p| p.tenant_id == tenant_id)
            .cloned())
    }

    fn slug_exists(&self, tenant_id: TenantId, slug: &str) -> StoreResult<bool> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state
            .products
            .values()
            .any(|p| p.tenant_id == tenant_id && p.slug == slug && !p.is_deleted()))
    }

    fn list_low_stock(&self, tenant_id: TenantId) -> StoreResult<Vec<Product>> {
        let state = self.inner.read().map_err(poisoned)?;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.tenant_id == tenant_id && p.is_sellable() && p.is_low_stock())
            .cloned()
            .collect();
        products.sort_by_key(|p| (p.quantity(), p.id));
        Ok(products)
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
        let mut state = self.inner.write().map_err(poisoned)?;

        let product = state
            .products
            .get(&product_id)
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .ok_or(DomainError::ProductNotFound { product_id })?;

        // Mutate a copy, commit only on success.
        let mut updated = product;
        let change = updated.apply_stock_delta(delta).map_err(StoreError::Domain)?;
        let adjustment = Self::build_adjustment(
            &updated,
            change.quantity_before,
            delta,
            action,
            reason,
            now,
        );

        state.products.insert(product_id, updated);
        state.adjustments.push(adjustment.clone());
        Ok(adjustment)
    }

    fn list_adjustments(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Vec<InventoryAdjustment>> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state
            .adjustments
            .iter()
            .filter(|a| a.tenant_id == tenant_id && a.product_id == product_id)
            .cloned()
            .collect())
    }

    fn place_order(
        &self,
        order: &Order,
        items: &[OrderItem],
        reservations: &[(ProductId, i64)],
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.inner.write().map_err(poisoned)?;

        let number_taken = state
            .orders
            .values()
            .any(|o| o.order_number == order.order_number);
        if number_taken {
            return Err(StoreError::conflict(format!(
                "order number '{}' already exists",
                order.order_number
            )));
        }

        // Stage every decrement on copies first so a failing reservation
        // leaves no partial writes behind.
        let mut staged: Vec<(Product, InventoryAdjustment)> = Vec::with_capacity(reservations.len());
        for &(product_id, quantity) in reservations {
            let mut product = state
                .products
                .get(&product_id)
                .filter(|p| p.tenant_id == order.tenant_id && p.is_sellable())
                .cloned()
                .ok_or(DomainError::ProductNotFound { product_id })?;

            let change = product
                .apply_stock_delta(-quantity)
                .map_err(StoreError::Domain)?;
            let adjustment = Self::build_adjustment(
                &product,
                change.quantity_before,
                -quantity,
                AdjustmentAction::Sale,
                Some(format!("order {}", order.order_number)),
                now,
            );
            staged.push((product, adjustment));
        }

        for (product, adjustment) in staged {
            state.products.insert(product.id, product);
            state.adjustments.push(adjustment);
        }
        state.orders.insert(order.id, order.clone());
        state.order_items.insert(order.id, items.to_vec());
        Ok(())
    }

    fn get_order(&self, tenant_id: TenantId, order_id: OrderId) -> StoreResult<Option<Order>> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state
            .orders
            .get(&order_id)
            .filter(|o| o.tenant_id == tenant_id)
            .cloned())
    }

    fn get_order_items(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> StoreResult<Vec<OrderItem>> {
        let state = self.inner.read().map_err(poisoned)?;
        let owned = state
            .orders
            .get(&order_id)
            .is_some_and(|o| o.tenant_id == tenant_id);
        if !owned {
            return Ok(vec![]);
        }
        Ok(state.order_items.get(&order_id).cloned().unwrap_or_default())
    }

    fn update_order(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        expected_payment: PaymentStatus,
    ) -> StoreResult<()> {
        let mut state = self.inner.write().map_err(poisoned)?;
        let existing = state
            .orders
            .get(&order.id)
            .filter(|o| o.tenant_id == order.tenant_id)
            .ok_or(DomainError::NotFound)?;

        if existing.status() != expected_status || existing.payment().status != expected_payment {
            return Err(StoreError::conflict(format!(
                "order {} was modified concurrently",
                order.order_number
            )));
        }

        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    fn cancel_order(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        reversals: &[(ProductId, i64)],
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.inner.write().map_err(poisoned)?;
        let existing = state
            .orders
            .get(&order.id)
            .filter(|o| o.tenant_id == order.tenant_id)
            .ok_or(DomainError::NotFound)?;

        if existing.status() != expected_status {
            return Err(StoreError::conflict(format!(
                "order {} was modified concurrently",
                order.order_number
            )));
        }

        // Stage every increment on copies so the swap and the reversals
        // commit together.
        let mut staged: Vec<(Product, InventoryAdjustment)> = Vec::with_capacity(reversals.len());
        for &(product_id, quantity) in reversals {
            let mut product = state
                .products
                .get(&product_id)
                .filter(|p| p.tenant_id == order.tenant_id)
                .cloned()
                .ok_or(DomainError::ProductNotFound { product_id })?;

            let change = product
                .apply_stock_delta(quantity)
                .map_err(StoreError::Domain)?;
            let adjustment = Self::build_adjustment(
                &product,
                change.quantity_before,
                quantity,
                AdjustmentAction::CancellationReversal,
                Some(format!("order {} cancelled", order.order_number)),
                now,
            );
            staged.push((product, adjustment));
        }

        for (product, adjustment) in staged {
            state.products.insert(product.id, product);
            state.adjustments.push(adjustment);
        }
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    fn order_number_exists(&self, order_number: &str) -> StoreResult<bool> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state.orders.values().any(|o| o.order_number == order_number))
    }

    fn list_orders(
        &self,
        tenant_id: TenantId,
        filter: &OrderFilter,
        page: Page,
    ) -> StoreResult<Vec<Order>> {
        let state = self.inner.read().map_err(poisoned)?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.tenant_id == tenant_id && o.deleted_at.is_none() && filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(orders
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .collect())
    }

    fn count_orders(&self, tenant_id: TenantId, filter: &OrderFilter) -> StoreResult<u64> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state
            .orders
            .values()
            .filter(|o| o.tenant_id == tenant_id && o.deleted_at.is_none() && filter.matches(o))
            .count() as u64)
    }

    fn statistics(&self, tenant_id: TenantId) -> StoreResult<OrderStatistics> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(compute_statistics(
            state.orders.values().filter(|o| o.tenant_id == tenant_id),
        ))
    }
}
