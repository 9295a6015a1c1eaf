use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storeflow_core::{DomainError, DomainResult, Entity, Money, ProductId, TenantId};

/// Default low-stock threshold when the merchant does not set one.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Result of a constrained stock mutation, captured for the ledger row.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StockLevelChange {
    pub quantity_before: i64,
    pub quantity_after: i64,
}

/// Catalog product owned by one tenant.
///
/// `quantity` has no setter: the only way to change it is
/// [`Product::apply_stock_delta`], which enforces the non-negativity
/// invariant and reports before/after levels for the adjustment ledger.
/// Storage layers call it inside their atomic check-and-update unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Money,
    quantity: i64,
    pub low_stock_threshold: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Validated input for creating a product. The slug is assigned by the
/// slug registry, not by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Money,
    pub quantity: i64,
    pub low_stock_threshold: Option<i64>,
    pub is_active: bool,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.name.len() > 255 {
            return Err(DomainError::validation("name cannot exceed 255 characters"));
        }
        if self.quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if self.low_stock_threshold.is_some_and(|t| t < 0) {
            return Err(DomainError::validation(
                "low_stock_threshold cannot be negative",
            ));
        }
        Ok(())
    }
}

impl Product {
    pub fn create(
        tenant_id: TenantId,
        new: NewProduct,
        slug: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        new.validate()?;
        Ok(Self {
            id: ProductId::new(),
            tenant_id,
            name: new.name,
            slug,
            description: new.description,
            sku: new.sku,
            price: new.price,
            quantity: new.quantity,
            low_stock_threshold: new.low_stock_threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
            is_active: new.is_active,
            created_at: now,
            deleted_at: None,
        })
    }

    /// Rebuild a product from persisted state (storage layer only).
    #[allow(clippy::too_many_arguments)]
    pub fn rehydrate(
        id: ProductId,
        tenant_id: TenantId,
        name: String,
        slug: String,
        description: Option<String>,
        sku: Option<String>,
        price: Money,
        quantity: i64,
        low_stock_threshold: i64,
        is_active: bool,
        created_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            name,
            slug,
            description,
            sku,
            price,
            quantity,
            low_stock_threshold,
            is_active,
            created_at,
            deleted_at,
        }
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn is_in_stock(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether order assembly may sell this product.
    pub fn is_sellable(&self) -> bool {
        self.is_active && !self.is_deleted()
    }

    /// Apply a signed stock delta, enforcing that quantity never goes
    /// negative. Returns the before/after pair for the adjustment record.
    pub fn apply_stock_delta(&mut self, delta: i64) -> DomainResult<StockLevelChange> {
        let before = self.quantity;
        let after = before
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("stock delta overflow"))?;
        if after < 0 {
            return Err(DomainError::insufficient_stock(self.id, -delta, before));
        }
        self.quantity = after;
        Ok(StockLevelChange {
            quantity_before: before,
            quantity_after: after,
        })
    }

    /// Soft delete: retained for order history and audit, never erased.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted_at.get_or_insert(now);
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
