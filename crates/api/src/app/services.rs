use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use storeflow_infra::{
    InMemoryStore, NoopNotifier, OrderService, PostgresStore, StockLedger, StoreError,
    StoreResult, StorefrontStore,
};

/// Shared service handles for the HTTP handlers.
pub struct AppServices {
    pub ledger: StockLedger<Arc<dyn StorefrontStore>>,
    pub orders: OrderService<Arc<dyn StorefrontStore>>,
}

/// Build the service stack.
///
/// When `DATABASE_URL` is set the Postgres store backs everything;
/// otherwise an in-memory store is used, which is only suitable for
/// local development.
pub async fn build_services() -> AppServices {
    let store: Arc<dyn StorefrontStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to Postgres");

            tracing::info!("using Postgres store");
            Arc::new(PostgresStore::new(pool))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    AppServices {
        ledger: StockLedger::new(store.clone()),
        orders: OrderService::new(store, Arc::new(NoopNotifier)),
    }
}

/// Run a synchronous service call on the blocking pool.
///
/// The store trait is synchronous and the Postgres backend blocks on the
/// runtime handle internally, which is forbidden on async worker threads.
/// Every handler goes through here instead of calling the services inline.
pub async fn run_blocking<T, F>(f: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StoreResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(StoreError::backend(format!("blocking task failed: {e}"))),
    }
}
