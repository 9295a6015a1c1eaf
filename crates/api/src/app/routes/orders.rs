use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use storeflow_core::OrderId;
use storeflow_orders::{OrderStatus, PaymentMethod, PlaceOrderRequest};

use crate::app::services::{run_blocking, AppServices};
use crate::app::{dto, errors};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(place_order).get(list_orders))
        .route("/statistics", get(statistics))
        .route("/:id", get(get_order).delete(delete_order))
        .route("/:id/status", post(update_status))
        .route("/:id/mark-paid", post(mark_paid))
        .route("/:id/refund", post(refund))
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<PlaceOrderRequest>,
) -> axum::response::Response {
    let tenant_id = tenant.tenant_id();
    match run_blocking(move || services.orders.place_order(tenant_id, body)).await {
        Ok((order, items)) => {
            (StatusCode::CREATED, Json(dto::OrderWithItems { order, items })).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<dto::ListOrdersQuery>,
) -> axum::response::Response {
    let tenant_id = tenant.tenant_id();
    let filter = query.filter();
    let page = query.page();
    match run_blocking(move || services.orders.list_orders(tenant_id, &filter, page)).await {
        Ok((orders, total)) => (
            StatusCode::OK,
            Json(dto::OrderListResponse {
                orders,
                total,
                limit: page.limit,
                offset: page.offset,
            }),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn statistics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    let tenant_id = tenant.tenant_id();
    match run_blocking(move || services.orders.statistics(tenant_id)).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let tenant_id = tenant.tenant_id();
    match run_blocking(move || services.orders.get_order(tenant_id, order_id)).await {
        Ok((order, items)) => {
            (StatusCode::OK, Json(dto::OrderWithItems { order, items })).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let tenant_id = tenant.tenant_id();
    match run_blocking(move || services.orders.delete_order(tenant_id, order_id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStatusRequest>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let to = match OrderStatus::parse(&body.status) {
        Ok(v) => v,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_status", e.to_string()),
    };
    let tenant_id = tenant.tenant_id();
    match run_blocking(move || services.orders.update_status(tenant_id, order_id, to)).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn mark_paid(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::MarkPaidRequest>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let method = match PaymentMethod::parse(&body.payment_method) {
        Ok(v) => v,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_payment_method", e.to_string());
        }
    };
    let tenant_id = tenant.tenant_id();
    let transaction_id = body.transaction_id;
    match run_blocking(move || {
        services
            .orders
            .mark_as_paid(tenant_id, order_id, method, transaction_id)
    })
    .await
    {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn refund(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let tenant_id = tenant.tenant_id();
    match run_blocking(move || services.orders.mark_refunded(tenant_id, order_id)).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
