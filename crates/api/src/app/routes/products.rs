use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use storeflow_core::ProductId;

use crate::app::services::{run_blocking, AppServices};
use crate::app::{dto, errors};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product))
        .route("/low-stock", get(low_stock))
        .route("/:id", get(get_product))
        .route("/:id/adjust-stock", post(adjust_stock))
        .route("/:id/restock", post(restock))
        .route("/:id/adjustments", get(list_adjustments))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    let new = match body.into_new_product() {
        Ok(v) => v,
        Err(e) => return errors::store_error_to_response(e.into()),
    };
    let tenant_id = tenant.tenant_id();
    match run_blocking(move || services.ledger.create_product(tenant_id, new)).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
        }
    };
    let tenant_id = tenant.tenant_id();
    match run_blocking(move || services.ledger.get_product(tenant_id, product_id)).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AdjustStockRequest>,
) -> axum::response::Response {
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
        }
    };
    let tenant_id = tenant.tenant_id();
    match run_blocking(move || {
        services
            .ledger
            .adjust(tenant_id, product_id, body.delta, body.reason)
    })
    .await
    {
        Ok(adjustment) => (StatusCode::OK, Json(adjustment)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn restock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RestockRequest>,
) -> axum::response::Response {
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
        }
    };
    let tenant_id = tenant.tenant_id();
    match run_blocking(move || {
        services
            .ledger
            .restock(tenant_id, product_id, body.quantity, body.reason)
    })
    .await
    {
        Ok(adjustment) => (StatusCode::OK, Json(adjustment)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_adjustments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
        }
    };
    let tenant_id = tenant.tenant_id();
    match run_blocking(move || services.ledger.history(tenant_id, product_id)).await {
        Ok(adjustments) => (StatusCode::OK, Json(adjustments)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    let tenant_id = tenant.tenant_id();
    match run_blocking(move || services.ledger.low_stock(tenant_id)).await {
        Ok(products) => (StatusCode::OK, Json(products)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
