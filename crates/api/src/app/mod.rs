use std::sync::Arc;

use axum::{Extension, Router, middleware::from_fn, routing::get};
use tower::ServiceBuilder;

use crate::middleware::tenant_middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Assemble the full application router.
///
/// Storefront routes sit behind the tenant middleware; the health probe
/// does not.
pub async fn build_app() -> Router {
    let services = Arc::new(services::build_services().await);

    let storefront = routes::router().layer(
        ServiceBuilder::new()
            .layer(Extension(services))
            .layer(from_fn(tenant_middleware)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(storefront)
}
