use chrono::{DateTime, Utc};
use tracing::instrument;

use storeflow_catalog::slugify;
use storeflow_core::{DomainError, TenantId};
use storeflow_orders::generate_order_number;

use crate::store::{StoreError, StoreResult, StorefrontStore};

/// Probes appended to the base slug before giving up.
const MAX_SLUG_PROBES: u32 = 200;

/// Fresh order-number draws before reporting exhaustion.
const MAX_NUMBER_DRAWS: u32 = 5;

/// Allocates human-readable identifiers: product slugs (unique per tenant)
/// and order numbers (unique across all tenants).
///
/// The probe-then-insert pattern is racy by itself; the store's unique
/// indexes are the real guarantee, and callers retry on `Conflict` with a
/// fresh draw.
#[derive(Debug, Clone)]
pub struct SlugRegistry<S> {
    store: S,
}

impl<S: StorefrontStore> SlugRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Slug for a new product: the slugified name, or the first free
    /// `name-N` variant when the base is taken.
    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub fn unique_slug(&self, tenant_id: TenantId, name: &str) -> StoreResult<String> {
        let base = slugify(name);
        if !self.store.slug_exists(tenant_id, &base)? {
            return Ok(base);
        }
        for n in 1..=MAX_SLUG_PROBES {
            let candidate = format!("{base}-{n}");
            if !self.store.slug_exists(tenant_id, &candidate)? {
                return Ok(candidate);
            }
        }
        Err(StoreError::conflict(format!(
            "no free slug for '{base}' within {MAX_SLUG_PROBES} probes"
        )))
    }

    /// A currently unused order number, checked against every tenant's
    /// orders. Collisions within the same second are resolved by redrawing
    /// the random suffix; a small fixed number of draws bounds the worst
    /// case under heavy per-second volume.
    #[instrument(skip(self), err)]
    pub fn unique_order_number(&self, now: DateTime<Utc>) -> StoreResult<String> {
        for _ in 0..MAX_NUMBER_DRAWS {
            let number = generate_order_number(now);
            if !self.store.order_number_exists(&number)? {
                return Ok(number);
            }
        }
        Err(StoreError::Domain(DomainError::OrderNumberExhausted))
    }
}
