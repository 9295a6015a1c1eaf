use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use storeflow_catalog::Product;
use storeflow_core::{DomainError, DomainResult, Money, ProductId, TenantId};

/// One requested line as it arrives from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<JsonValue>,
}

/// A priced line inside an order draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub subtotal: Money,
    pub attributes: Option<JsonValue>,
}

/// An unpersisted, fully priced representation of the requested items.
/// Produced by [`OrderAssembler::assemble`]; reserves no stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub tenant_id: TenantId,
    pub items: Vec<DraftItem>,
    pub subtotal: Money,
}

impl OrderDraft {
    /// Per-product quantities to reserve, ascending by product id so that
    /// concurrent placements over overlapping product sets always lock in
    /// the same order. Duplicate lines for one product are merged.
    pub fn reservations(&self) -> Vec<(ProductId, i64)> {
        let mut merged: Vec<(ProductId, i64)> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match merged.iter_mut().find(|(id, _)| *id == item.product_id) {
                Some((_, qty)) => *qty += item.quantity,
                None => merged.push((item.product_id, item.quantity)),
            }
        }
        merged.sort_by_key(|(id, _)| *id);
        merged
    }
}

/// Validates and prices a requested item list against a point-in-time
/// catalog read. Pure: the stock check here is advisory only, the
/// authoritative check happens inside the ledger's atomic reserve.
#[derive(Debug, Default)]
pub struct OrderAssembler;

impl OrderAssembler {
    pub fn assemble(
        tenant_id: TenantId,
        requested: &[RequestedItem],
        mut lookup: impl FnMut(ProductId) -> Option<Product>,
    ) -> DomainResult<OrderDraft> {
        if requested.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }

        let mut items = Vec::with_capacity(requested.len());
        let mut subtotal = Money::ZERO;

        for line in requested {
            if line.quantity < 1 {
                return Err(DomainError::validation("item quantity must be at least 1"));
            }

            let product = lookup(line.product_id)
                .filter(|p| p.tenant_id == tenant_id && p.is_sellable())
                .ok_or_else(|| DomainError::product_not_found(line.product_id))?;

            if product.quantity() < line.quantity {
                return Err(DomainError::insufficient_stock(
                    product.id,
                    line.quantity,
                    product.quantity(),
                ));
            }

            let line_subtotal = product.price.checked_mul(line.quantity)?;
            subtotal = subtotal.checked_add(line_subtotal)?;

            items.push(DraftItem {
                product_id: product.id,
                product_name: product.name.clone(),
                unit_price: product.price,
                quantity: line.quantity,
                subtotal: line_subtotal,
                attributes: line.attributes.clone(),
            });
        }

        Ok(OrderDraft {
            tenant_id,
            items,
            subtotal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use storeflow_catalog::NewProduct;

    fn product(tenant_id: TenantId, price: i64, quantity: i64) -> Product {
        Product::create(
            tenant_id,
            NewProduct {
                name: "Tote Bag".to_string(),
                description: None,
                sku: None,
                price: Money::from_minor(price).unwrap(),
                quantity,
                low_stock_threshold: None,
                is_active: true,
            },
            "tote-bag".to_string(),
            Utc::now(),
        )
        .unwrap()
    }

    fn catalog(products: Vec<Product>) -> HashMap<ProductId, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn prices_items_and_sums_subtotal() {
        let tenant_id = TenantId::new();
        let p = product(tenant_id, 5000, 10);
        let product_id = p.id;
        let catalog = catalog(vec![p]);

        let draft = OrderAssembler::assemble(
            tenant_id,
            &[RequestedItem {
                product_id,
                quantity: 2,
                attributes: None,
            }],
            |id| catalog.get(&id).cloned(),
        )
        .unwrap();

        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].unit_price, Money::from_minor(5000).unwrap());
        assert_eq!(draft.items[0].subtotal, Money::from_minor(10000).unwrap());
        assert_eq!(draft.subtotal, Money::from_minor(10000).unwrap());
    }

    #[test]
    fn subtotal_equals_sum_of_line_subtotals() {
        let tenant_id = TenantId::new();
        let a = product(tenant_id, 1250, 10);
        let b = product(tenant_id, 990, 10);
        let (id_a, id_b) = (a.id, b.id);
        let catalog = catalog(vec![a, b]);

        let draft = OrderAssembler::assemble(
            tenant_id,
            &[
                RequestedItem { product_id: id_a, quantity: 3, attributes: None },
                RequestedItem { product_id: id_b, quantity: 2, attributes: None },
            ],
            |id| catalog.get(&id).cloned(),
        )
        .unwrap();

        let sum = draft
            .items
            .iter()
            .fold(Money::ZERO, |acc, i| acc.checked_add(i.subtotal).unwrap());
        assert_eq!(draft.subtotal, sum);
    }

    #[test]
    fn unknown_or_foreign_products_fail_with_product_not_found() {
        let tenant_id = TenantId::new();
        let foreign = product(TenantId::new(), 1000, 5);
        let foreign_id = foreign.id;
        let catalog = catalog(vec![foreign]);

        let err = OrderAssembler::assemble(
            tenant_id,
            &[RequestedItem { product_id: foreign_id, quantity: 1, attributes: None }],
            |id| catalog.get(&id).cloned(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::ProductNotFound { .. }));
    }

    #[test]
    fn inactive_products_are_not_sellable() {
        let tenant_id = TenantId::new();
        let mut p = product(tenant_id, 1000, 5);
        p.is_active = false;
        let id = p.id;
        let catalog = catalog(vec![p]);

        let err = OrderAssembler::assemble(
            tenant_id,
            &[RequestedItem { product_id: id, quantity: 1, attributes: None }],
            |pid| catalog.get(&pid).cloned(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::product_not_found(id));
    }

    #[test]
    fn advisory_stock_check_rejects_over_request() {
        let tenant_id = TenantId::new();
        let p = product(tenant_id, 1000, 3);
        let id = p.id;
        let catalog = catalog(vec![p]);

        let err = OrderAssembler::assemble(
            tenant_id,
            &[RequestedItem { product_id: id, quantity: 4, attributes: None }],
            |pid| catalog.get(&pid).cloned(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(id, 4, 3));
    }

    #[test]
    fn reservations_are_merged_and_ascending() {
        let tenant_id = TenantId::new();
        let a = product(tenant_id, 1000, 10);
        let b = product(tenant_id, 2000, 10);
        let (id_a, id_b) = (a.id, b.id);
        let catalog = catalog(vec![a, b]);

        let draft = OrderAssembler::assemble(
            tenant_id,
            &[
                RequestedItem { product_id: id_b, quantity: 1, attributes: None },
                RequestedItem { product_id: id_a, quantity: 2, attributes: None },
                RequestedItem { product_id: id_b, quantity: 3, attributes: None },
            ],
            |id| catalog.get(&id).cloned(),
        )
        .unwrap();

        let reservations = draft.reservations();
        assert_eq!(reservations.len(), 2);
        assert!(reservations.windows(2).all(|w| w[0].0 < w[1].0));
        let b_total = reservations.iter().find(|(id, _)| *id == id_b).unwrap().1;
        assert_eq!(b_total, 4);
    }
}
