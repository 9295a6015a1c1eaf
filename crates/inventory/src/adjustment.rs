use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storeflow_core::{AdjustmentId, DomainError, DomainResult, ProductId, TenantId};

/// Why a product's quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentAction {
    /// Stock reserved at order placement.
    Sale,
    /// Incoming stock.
    Restock,
    /// Manual merchant correction.
    ManualAdjust,
    /// Stock returned by cancelling an order before shipment.
    CancellationReversal,
}

impl AdjustmentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentAction::Sale => "sale",
            AdjustmentAction::Restock => "restock",
            AdjustmentAction::ManualAdjust => "manual_adjust",
            AdjustmentAction::CancellationReversal => "cancellation_reversal",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "sale" => Ok(AdjustmentAction::Sale),
            "restock" => Ok(AdjustmentAction::Restock),
            "manual_adjust" => Ok(AdjustmentAction::ManualAdjust),
            "cancellation_reversal" => Ok(AdjustmentAction::CancellationReversal),
            other => Err(DomainError::validation(format!(
                "unknown adjustment action '{other}'"
            ))),
        }
    }
}

impl core::fmt::Display for AdjustmentAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable entry in a product's stock ledger.
///
/// Never mutated or deleted once written. For each product the entries form
/// a chain: `quantity_after == quantity_before + quantity_change`, and each
/// entry's `quantity_before` equals its predecessor's `quantity_after`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAdjustment {
    pub id: AdjustmentId,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub action: AdjustmentAction,
    pub quantity_change: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryAdjustment {
    /// Internal consistency of a single entry.
    pub fn is_consistent(&self) -> bool {
        self.quantity_after == self.quantity_before + self.quantity_change
            && self.quantity_after >= 0
    }
}

/// Violation found while checking a per-product ledger chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// `quantity_after != quantity_before + quantity_change` (or negative).
    InconsistentEntry { index: usize },
    /// Entry's `quantity_before` does not match the predecessor's
    /// `quantity_after`.
    BrokenLink { index: usize },
    /// Entry belongs to a different product than the chain under check.
    ForeignProduct { index: usize },
}

/// Verify the ledger-chain invariant over one product's adjustments,
/// ordered by creation. Used by tests and consistency audits.
pub fn verify_chain(
    product_id: ProductId,
    entries: &[InventoryAdjustment],
) -> Result<(), ChainError> {
    let mut previous_after: Option<i64> = None;
    for (index, entry) in entries.iter().enumerate() {
        if entry.product_id != product_id {
            return Err(ChainError::ForeignProduct { index });
        }
        if !entry.is_consistent() {
            return Err(ChainError::InconsistentEntry { index });
        }
        if let Some(after) = previous_after {
            if entry.quantity_before != after {
                return Err(ChainError::BrokenLink { index });
            }
        }
        previous_after = Some(entry.quantity_after);
    }
    Ok(())
}
