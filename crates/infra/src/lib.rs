//! Infrastructure layer: storage backends and application services.

pub mod notifications;
pub mod order_service;
pub mod slug_registry;
pub mod stock_ledger;
pub mod store;

mod integration_tests;

pub use notifications::{NoopNotifier, OrderNotifier, RecordingNotifier};
pub use order_service::OrderService;
pub use slug_registry::SlugRegistry;
pub use stock_ledger::StockLedger;
pub use store::{InMemoryStore, PostgresStore, StoreError, StoreResult, StorefrontStore};
