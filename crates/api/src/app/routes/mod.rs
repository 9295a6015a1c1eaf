use axum::Router;

pub mod orders;
pub mod products;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .nest("/api/products", products::router())
        .nest("/api/orders", orders::router())
}
