use chrono::Utc;
use tracing::instrument;

use storeflow_catalog::{NewProduct, Product};
use storeflow_core::{DomainError, ProductId, TenantId};
use storeflow_inventory::{AdjustmentAction, InventoryAdjustment};

use crate::slug_registry::SlugRegistry;
use crate::store::{StoreError, StoreResult, StorefrontStore};

const CREATE_ATTEMPTS: u32 = 3;

/// Merchant-facing inventory operations.
///
/// All quantity changes outside order placement flow through here, so every
/// change carries a ledger entry. Multi-item placement writes its sale
/// reservations inside the store's atomic placement; cancellation reversals
/// are written by the order service.
#[derive(Debug, Clone)]
pub struct StockLedger<S> {
    store: S,
    slugs: SlugRegistry<S>,
}

impl<S: StorefrontStore + Clone> StockLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            slugs: SlugRegistry::new(store.clone()),
            store,
        }
    }

    /// Create a product with a tenant-unique slug. Initial stock is recorded
    /// as a restock entry so the ledger chain starts at zero.
    ///
    /// A slug probe can lose the race against a concurrent creation with the
    /// same name; the unique index reports it and we re-probe.
    #[instrument(skip(self, new), fields(tenant_id = %tenant_id, name = %new.name), err)]
    pub fn create_product(&self, tenant_id: TenantId, new: NewProduct) -> StoreResult<Product> {
        new.validate()?;
        let now = Utc::now();
        let initial_quantity = new.quantity;
        let seed = NewProduct {
            quantity: 0,
            ..new
        };

        let mut attempt = 0;
        loop {
            let slug = self.slugs.unique_slug(tenant_id, &seed.name)?;
            let product = Product::create(tenant_id, seed.clone(), slug, now)?;
            match self.store.insert_product(&product) {
                Ok(()) => {
                    if initial_quantity > 0 {
                        self.store.apply_adjustment(
                            tenant_id,
                            product.id,
                            initial_quantity,
                            AdjustmentAction::Restock,
                            Some("initial stock".to_string()),
                            now,
                        )?;
                        return self
                            .store
                            .get_product(tenant_id, product.id)?
                            .ok_or(StoreError::Domain(DomainError::NotFound));
                    }
                    return Ok(product);
                }
                Err(e) if e.is_transient() && attempt + 1 < CREATE_ATTEMPTS => {
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Atomic check-and-decrement for one product, appending a sale entry.
    ///
    /// Fails with `InsufficientStock` at the instant of the update, not at
    /// an earlier read. Multi-item placement runs its reservations inside
    /// the placement transaction instead of calling this per item.
    #[instrument(skip(self, reason), fields(tenant_id = %tenant_id, product_id = %product_id, quantity), err)]
    pub fn reserve(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: i64,
        reason: Option<String>,
    ) -> StoreResult<InventoryAdjustment> {
        if quantity < 1 {
            return Err(StoreError::Domain(DomainError::validation(
                "reservation quantity must be at least 1",
            )));
        }
        self.store.apply_adjustment(
            tenant_id,
            product_id,
            -quantity,
            AdjustmentAction::Sale,
            reason,
            Utc::now(),
        )
    }

    /// Incoming stock.
    #[instrument(skip(self, reason), fields(tenant_id = %tenant_id, product_id = %product_id, quantity), err)]
    pub fn restock(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: i64,
        reason: Option<String>,
    ) -> StoreResult<InventoryAdjustment> {
        if quantity < 1 {
            return Err(StoreError::Domain(DomainError::validation(
                "restock quantity must be at least 1",
            )));
        }
        self.store.apply_adjustment(
            tenant_id,
            product_id,
            quantity,
            AdjustmentAction::Restock,
            reason,
            Utc::now(),
        )
    }

    /// Manual merchant correction, positive or negative. A negative delta
    /// larger than the available quantity is rejected.
    #[instrument(skip(self, reason), fields(tenant_id = %tenant_id, product_id = %product_id, delta), err)]
    pub fn adjust(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
        reason: Option<String>,
    ) -> StoreResult<InventoryAdjustment> {
        if delta == 0 {
            return Err(StoreError::Domain(DomainError::validation(
                "adjustment delta cannot be zero",
            )));
        }
        self.store.apply_adjustment(
            tenant_id,
            product_id,
            delta,
            AdjustmentAction::ManualAdjust,
            reason,
            Utc::now(),
        )
    }

    pub fn get_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Product> {
        self.store
            .get_product(tenant_id, product_id)?
            .ok_or(StoreError::Domain(DomainError::ProductNotFound {
                product_id,
            }))
    }

    /// A product's ledger, oldest first.
    pub fn history(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Vec<InventoryAdjustment>> {
        // Surface unknown products instead of an empty ledger.
        self.get_product(tenant_id, product_id)?;
        self.store.list_adjustments(tenant_id, product_id)
    }

    pub fn low_stock(&self, tenant_id: TenantId) -> StoreResult<Vec<Product>> {
        self.store.list_low_stock(tenant_id)
    }
}
