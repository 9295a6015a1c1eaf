//! `storeflow-inventory` — append-only stock adjustment ledger types.

pub mod adjustment;

pub use adjustment::{verify_chain, AdjustmentAction, ChainError, InventoryAdjustment};
