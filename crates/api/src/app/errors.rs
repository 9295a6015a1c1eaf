use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storeflow_core::DomainError;
use storeflow_infra::StoreError;

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Backend(msg) => {
            // Backend detail stays in the logs, not the response body.
            tracing::error!(error = %msg, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "internal storage failure",
            )
        }
    }
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        e @ DomainError::ProductNotFound { .. } => {
            json_error(StatusCode::NOT_FOUND, "product_not_found", e.to_string())
        }
        e @ DomainError::InsufficientStock { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "insufficient_stock", e.to_string())
        }
        e @ DomainError::InvalidStatusTransition { .. } => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_status_transition",
            e.to_string(),
        ),
        // Not client-correctable; a retry cannot pick a free number when the
        // per-second space is exhausted.
        e @ DomainError::OrderNumberExhausted => {
            tracing::error!(error = %e, "order numbering failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "order_number_exhausted",
                "internal numbering failure",
            )
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storeflow_core::ProductId;

    #[test]
    fn exhausted_numbering_is_an_internal_failure() {
        let resp = store_error_to_response(StoreError::Domain(DomainError::OrderNumberExhausted));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn insufficient_stock_is_unprocessable() {
        let resp = store_error_to_response(StoreError::Domain(DomainError::insufficient_stock(
            ProductId::new(),
            5,
            2,
        )));
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn storage_conflicts_map_to_409() {
        let resp = store_error_to_response(StoreError::conflict("number race"));
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
