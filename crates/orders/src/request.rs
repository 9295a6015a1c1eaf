use serde::{Deserialize, Serialize};

use storeflow_core::{DomainError, DomainResult};

use crate::draft::RequestedItem;
use crate::order::{Channel, CustomerInfo, ShippingAddress};

/// Inbound order placement payload, validated before any stock is touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub customer: CustomerInfo,
    pub items: Vec<RequestedItem>,
    pub shipping_address: ShippingAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub channel: Channel,
}

impl PlaceOrderRequest {
    pub fn validate(&self) -> DomainResult<()> {
        let name = self.customer.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }
        if name.len() > 255 {
            return Err(DomainError::validation("customer name must be at most 255 characters"));
        }

        let phone = self.customer.phone.trim();
        if phone.is_empty() {
            return Err(DomainError::validation("customer phone is required"));
        }
        if phone.len() > 20 {
            return Err(DomainError::validation("customer phone must be at most 20 characters"));
        }

        if let Some(email) = &self.customer.email {
            let email = email.trim();
            if email.is_empty() || !email.contains('@') {
                return Err(DomainError::validation("customer email is not a valid address"));
            }
        }

        if self.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        for item in &self.items {
            if item.quantity < 1 {
                return Err(DomainError::validation("item quantity must be at least 1"));
            }
        }

        for (value, field) in [
            (&self.shipping_address.street, "street"),
            (&self.shipping_address.city, "city"),
            (&self.shipping_address.state, "state"),
            (&self.shipping_address.postal_code, "postal_code"),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "shipping address {field} is required"
                )));
            }
        }

        Ok(())
    }
}
