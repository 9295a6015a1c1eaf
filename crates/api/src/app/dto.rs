use serde::{Deserialize, Serialize};

use storeflow_catalog::NewProduct;
use storeflow_core::{DomainResult, Money};
use storeflow_orders::{
    Channel, Order, OrderFilter, OrderItem, OrderStatus, Page, PaymentStatus,
};

fn default_true() -> bool {
    true
}

/// Body for `POST /api/products`. Prices are minor units (cents).
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CreateProductRequest {
    pub fn into_new_product(self) -> DomainResult<NewProduct> {
        Ok(NewProduct {
            name: self.name,
            description: self.description,
            sku: self.sku,
            price: Money::from_minor(self.price)?,
            quantity: self.quantity,
            low_stock_threshold: self.low_stock_threshold,
            is_active: self.is_active,
        })
    }
}

/// Body for `POST /api/products/:id/adjust-stock`. Negative deltas remove
/// stock, positive ones add it.
#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body for `POST /api/products/:id/restock`.
#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body for `POST /api/orders/:id/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Body for `POST /api/orders/:id/mark-paid`.
#[derive(Debug, Deserialize)]
pub struct MarkPaidRequest {
    pub payment_method: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Query string for `GET /api/orders`.
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl ListOrdersQuery {
    pub fn filter(&self) -> OrderFilter {
        OrderFilter {
            status: self.status,
            payment_status: self.payment_status,
            channel: self.channel,
            search: self.search.clone(),
        }
    }

    pub fn page(&self) -> Page {
        Page::clamped(self.limit, self.offset)
    }
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
    pub total: u64,
    pub limit: i64,
    pub offset: i64,
}
