//! `storeflow-catalog` — product catalog domain types.
//!
//! Catalog CRUD itself lives at the boundary; the order/inventory core only
//! reads products and mutates quantity through constrained stock operations.

pub mod product;
pub mod slug;

pub use product::{NewProduct, Product, StockLevelChange};
pub use slug::slugify;
