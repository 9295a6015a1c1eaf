//! Integration tests for the full placement pipeline.
//!
//! Tests: request validation → assembly → atomic placement → ledger →
//! lifecycle transitions → listing and statistics.
//!
//! Verifies:
//! - Stock is never oversold, even under concurrent placements
//! - Placement is all-or-nothing across multi-product orders
//! - Every quantity change leaves a consistent ledger chain
//! - Tenant isolation is preserved

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use storeflow_catalog::NewProduct;
    use storeflow_core::{DomainError, Money, ProductId, TenantId};
    use storeflow_inventory::{verify_chain, AdjustmentAction};
    use storeflow_orders::{
        Channel, CustomerInfo, Order, OrderAmounts, OrderFilter, OrderItem, OrderStatus, Page,
        PaymentMethod, PaymentStatus, PlaceOrderRequest, RequestedItem, ShippingAddress,
    };

    use crate::notifications::RecordingNotifier;
    use crate::order_service::OrderService;
    use crate::stock_ledger::StockLedger;
    use crate::store::{InMemoryStore, StoreError, StorefrontStore};

    type Store = Arc<InMemoryStore>;

    fn setup() -> (
        Store,
        StockLedger<Store>,
        OrderService<Store>,
        Arc<RecordingNotifier>,
        TenantId,
    ) {
        let store: Store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let ledger = StockLedger::new(store.clone());
        let service = OrderService::new(store.clone(), notifier.clone());
        (store, ledger, service, notifier, TenantId::new())
    }

    fn new_product(name: &str, price: i64, quantity: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            sku: None,
            price: Money::from_minor(price).unwrap(),
            quantity,
            low_stock_threshold: None,
            is_active: true,
        }
    }

    fn request(items: Vec<(ProductId, i64)>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            customer: CustomerInfo {
                name: "Ada Obi".to_string(),
                email: Some("ada@example.com".to_string()),
                phone: "+2348012345678".to_string(),
            },
            items: items
                .into_iter()
                .map(|(product_id, quantity)| RequestedItem {
                    product_id,
                    quantity,
                    attributes: None,
                })
                .collect(),
            shipping_address: ShippingAddress {
                street: "12 Allen Avenue".to_string(),
                city: "Ikeja".to_string(),
                state: "Lagos".to_string(),
                postal_code: "100001".to_string(),
            },
            notes: None,
            channel: Channel::Web,
        }
    }

    #[test]
    fn create_product_assigns_unique_slugs_and_seeds_ledger() {
        let (_, ledger, _, _, tenant) = setup();

        let first = ledger
            .create_product(tenant, new_product("Blue Hoodie", 5000, 10))
            .unwrap();
        let second = ledger
            .create_product(tenant, new_product("Blue Hoodie", 5000, 0))
            .unwrap();

        assert_eq!(first.slug, "blue-hoodie");
        assert_eq!(second.slug, "blue-hoodie-1");
        assert_eq!(first.quantity(), 10);
        assert_eq!(second.quantity(), 0);

        let history = ledger.history(tenant, first.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, AdjustmentAction::Restock);
        assert_eq!(history[0].quantity_before, 0);
        assert_eq!(history[0].quantity_after, 10);
        assert!(ledger.history(tenant, second.id).unwrap().is_empty());
    }

    #[test]
    fn placement_reserves_stock_and_writes_sale_entries() {
        let (_, ledger, service, notifier, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Tote Bag", 2500, 5))
            .unwrap();

        let (order, items) = service
            .place_order(tenant, request(vec![(product.id, 2)]))
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment().status, PaymentStatus::Unpaid);
        assert_eq!(order.amounts.subtotal, Money::from_minor(5000).unwrap());
        assert_eq!(order.amounts.total, Money::from_minor(5000).unwrap());
        assert!(order.order_number.starts_with("ORD-"));

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_name, "Tote Bag");
        assert_eq!(items[0].unit_price, Money::from_minor(2500).unwrap());

        assert_eq!(ledger.get_product(tenant, product.id).unwrap().quantity(), 3);

        let history = ledger.history(tenant, product.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].action, AdjustmentAction::Sale);
        assert_eq!(history[1].quantity_change, -2);
        assert_eq!(verify_chain(product.id, &history), Ok(()));

        assert_eq!(
            notifier.events(),
            vec![format!("placed:{}", order.order_number)]
        );
    }

    #[test]
    fn placement_is_atomic_across_products() {
        let (store, ledger, _, _, tenant) = setup();
        let plenty = ledger
            .create_product(tenant, new_product("Mug", 1000, 5))
            .unwrap();
        let scarce = ledger
            .create_product(tenant, new_product("Poster", 1500, 1))
            .unwrap();

        // Drive the store directly so the advisory assembly check cannot
        // reject the request first.
        let order = Order::create(
            tenant,
            "ORD-20260101000000-001".to_string(),
            CustomerInfo {
                name: "Ada Obi".to_string(),
                email: None,
                phone: "0801".to_string(),
            },
            OrderAmounts::new(Money::from_minor(6500).unwrap(), Money::ZERO, Money::ZERO)
                .unwrap(),
            ShippingAddress {
                street: "a".into(),
                city: "b".into(),
                state: "c".into(),
                postal_code: "d".into(),
            },
            None,
            Channel::Web,
            chrono::Utc::now(),
        );
        let items: Vec<OrderItem> = vec![];
        let reservations = [(plenty.id.min(scarce.id), 2), (plenty.id.max(scarce.id), 2)];
        // One of the two products has only 1 unit; whichever order the ids
        // sort in, the placement must fail and leave both untouched.
        let err = store
            .place_order(&order, &items, &reservations, chrono::Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::InsufficientStock { .. })
        ));

        assert_eq!(ledger.get_product(tenant, plenty.id).unwrap().quantity(), 5);
        assert_eq!(ledger.get_product(tenant, scarce.id).unwrap().quantity(), 1);
        assert!(store.get_order(tenant, order.id).unwrap().is_none());
        // No sale entries were written for either product.
        assert_eq!(ledger.history(tenant, plenty.id).unwrap().len(), 1);
        assert_eq!(ledger.history(tenant, scarce.id).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_placements_never_oversell() {
        let (_, ledger, service, _, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Sticker Pack", 500, 10))
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let product_id = product.id;
            handles.push(std::thread::spawn(move || {
                service.place_order(tenant, request(vec![(product_id, 2)]))
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => successes += 1,
                Err(StoreError::Domain(DomainError::InsufficientStock { .. })) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(successes, 5);
        assert_eq!(ledger.get_product(tenant, product.id).unwrap().quantity(), 0);

        let history = ledger.history(tenant, product.id).unwrap();
        assert_eq!(verify_chain(product.id, &history), Ok(()));
        let sold: i64 = history
            .iter()
            .filter(|a| a.action == AdjustmentAction::Sale)
            .map(|a| a.quantity_change)
            .sum();
        assert_eq!(sold, -10);
    }

    #[test]
    fn exact_quantity_boundary() {
        let (_, ledger, service, _, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Print", 2000, 5))
            .unwrap();

        service
            .place_order(tenant, request(vec![(product.id, 5)]))
            .unwrap();
        assert_eq!(ledger.get_product(tenant, product.id).unwrap().quantity(), 0);

        let err = service
            .place_order(tenant, request(vec![(product.id, 1)]))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::InsufficientStock { .. })
        ));
    }

    #[test]
    fn cancellation_returns_stock_exactly_once() {
        let (_, ledger, service, _, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Cap", 3000, 10))
            .unwrap();

        let (order, _) = service
            .place_order(tenant, request(vec![(product.id, 3)]))
            .unwrap();
        assert_eq!(ledger.get_product(tenant, product.id).unwrap().quantity(), 7);

        let cancelled = service
            .update_status(tenant, order.id, OrderStatus::Cancelled)
            .unwrap();
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        assert_eq!(ledger.get_product(tenant, product.id).unwrap().quantity(), 10);

        // Repeat cancel is a no-op, not a second reversal.
        service
            .update_status(tenant, order.id, OrderStatus::Cancelled)
            .unwrap();
        assert_eq!(ledger.get_product(tenant, product.id).unwrap().quantity(), 10);

        let history = ledger.history(tenant, product.id).unwrap();
        let reversals = history
            .iter()
            .filter(|a| a.action == AdjustmentAction::CancellationReversal)
            .count();
        assert_eq!(reversals, 1);
        assert_eq!(verify_chain(product.id, &history), Ok(()));
    }

    #[test]
    fn shipped_orders_cannot_be_cancelled() {
        let (_, ledger, service, _, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Scarf", 4000, 4))
            .unwrap();
        let (order, _) = service
            .place_order(tenant, request(vec![(product.id, 1)]))
            .unwrap();

        service
            .update_status(tenant, order.id, OrderStatus::Shipped)
            .unwrap();
        let err = service
            .update_status(tenant, order.id, OrderStatus::Cancelled)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::InvalidStatusTransition { .. })
        ));
        // The reservation stays committed.
        assert_eq!(ledger.get_product(tenant, product.id).unwrap().quantity(), 3);
    }

    #[test]
    fn mark_paid_is_idempotent_per_transaction() {
        let (_, ledger, service, notifier, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Candle", 2200, 3))
            .unwrap();
        let (order, _) = service
            .place_order(tenant, request(vec![(product.id, 1)]))
            .unwrap();

        service
            .mark_as_paid(tenant, order.id, PaymentMethod::Transfer, Some("TX1".into()))
            .unwrap();
        service
            .mark_as_paid(tenant, order.id, PaymentMethod::Transfer, Some("TX1".into()))
            .unwrap();

        let paid_events = notifier
            .events()
            .iter()
            .filter(|e| e.starts_with("paid:"))
            .count();
        assert_eq!(paid_events, 1);

        let stats = service.statistics(tenant).unwrap();
        assert_eq!(stats.paid_orders, 1);
        assert_eq!(stats.total_revenue, Money::from_minor(2200).unwrap());
    }

    #[test]
    fn order_numbers_are_unique_and_listing_is_newest_first() {
        let (_, ledger, service, _, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Pin", 800, 50))
            .unwrap();

        let mut numbers = std::collections::HashSet::new();
        let mut last_id = None;
        for _ in 0..10 {
            let (order, _) = service
                .place_order(tenant, request(vec![(product.id, 1)]))
                .unwrap();
            assert!(numbers.insert(order.order_number.clone()));
            last_id = Some(order.id);
        }

        let (orders, total) = service
            .list_orders(tenant, &OrderFilter::default(), Page::default())
            .unwrap();
        assert_eq!(total, 10);
        assert_eq!(orders.len(), 10);
        assert_eq!(Some(orders[0].id), last_id);
    }

    #[test]
    fn listing_filters_and_paginates() {
        let (_, ledger, service, _, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Notebook", 1200, 50))
            .unwrap();

        for channel in [Channel::Web, Channel::Instagram, Channel::Instagram] {
            let mut req = request(vec![(product.id, 1)]);
            req.channel = channel;
            service.place_order(tenant, req).unwrap();
        }

        let instagram = OrderFilter {
            channel: Some(Channel::Instagram),
            ..Default::default()
        };
        let (orders, total) = service
            .list_orders(tenant, &instagram, Page::default())
            .unwrap();
        assert_eq!(total, 2);
        assert!(orders.iter().all(|o| o.channel == Channel::Instagram));

        let (page, total) = service
            .list_orders(tenant, &instagram, Page { limit: 1, offset: 1 })
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);

        let by_name = OrderFilter {
            search: Some("ada".to_string()),
            ..Default::default()
        };
        let (_, total) = service.list_orders(tenant, &by_name, Page::default()).unwrap();
        assert_eq!(total, 3);
    }

    #[test]
    fn soft_deleted_orders_drop_out_of_listings_and_statistics() {
        let (_, ledger, service, _, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Vase", 6000, 5))
            .unwrap();
        let (order, _) = service
            .place_order(tenant, request(vec![(product.id, 1)]))
            .unwrap();

        service.delete_order(tenant, order.id).unwrap();

        let (orders, total) = service
            .list_orders(tenant, &OrderFilter::default(), Page::default())
            .unwrap();
        assert!(orders.is_empty());
        assert_eq!(total, 0);
        assert_eq!(service.statistics(tenant).unwrap().total_orders, 0);

        // Still fetchable by id for audit.
        let (fetched, _) = service.get_order(tenant, order.id).unwrap();
        assert!(fetched.deleted_at.is_some());
    }

    #[test]
    fn tenants_cannot_see_each_other() {
        let (_, ledger, service, _, tenant_a) = setup();
        let tenant_b = TenantId::new();

        let product = ledger
            .create_product(tenant_a, new_product("Lamp", 9000, 5))
            .unwrap();
        let (order, _) = service
            .place_order(tenant_a, request(vec![(product.id, 1)]))
            .unwrap();

        // Tenant B cannot buy tenant A's product.
        let err = service
            .place_order(tenant_b, request(vec![(product.id, 1)]))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::ProductNotFound { .. })
        ));

        // Nor see its orders or statistics.
        assert!(matches!(
            service.get_order(tenant_b, order.id).unwrap_err(),
            StoreError::Domain(DomainError::NotFound)
        ));
        assert_eq!(service.statistics(tenant_b).unwrap().total_orders, 0);
        assert_eq!(service.statistics(tenant_a).unwrap().total_orders, 1);
    }

    #[test]
    fn ledger_chain_stays_consistent_across_mixed_operations() {
        let (_, ledger, service, _, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Tea Tin", 3500, 6))
            .unwrap();

        ledger.restock(tenant, product.id, 4, None).unwrap();
        ledger
            .adjust(tenant, product.id, -2, Some("damaged".to_string()))
            .unwrap();
        let (order, _) = service
            .place_order(tenant, request(vec![(product.id, 3)]))
            .unwrap();
        service
            .update_status(tenant, order.id, OrderStatus::Cancelled)
            .unwrap();

        let history = ledger.history(tenant, product.id).unwrap();
        assert_eq!(verify_chain(product.id, &history), Ok(()));
        let net: i64 = history.iter().map(|a| a.quantity_change).sum();
        assert_eq!(net, 8);
        assert_eq!(ledger.get_product(tenant, product.id).unwrap().quantity(), 8);
    }

    #[test]
    fn manual_adjustment_cannot_drive_stock_negative() {
        let (_, ledger, _, _, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Bowl", 2800, 2))
            .unwrap();

        let err = ledger.adjust(tenant, product.id, -3, None).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::InsufficientStock { .. })
        ));
        assert_eq!(ledger.get_product(tenant, product.id).unwrap().quantity(), 2);
    }

    #[test]
    fn low_stock_reports_sellable_products_at_or_below_threshold() {
        let (_, ledger, _, _, tenant) = setup();
        // Default threshold is 5.
        let low = ledger
            .create_product(tenant, new_product("Ribbon", 300, 4))
            .unwrap();
        ledger
            .create_product(tenant, new_product("Box", 700, 20))
            .unwrap();

        let reported = ledger.low_stock(tenant).unwrap();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].id, low.id);
    }

    #[test]
    fn standalone_reservation_decrements_and_records_sale() {
        let (_, ledger, _, _, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Candle", 1800, 5))
            .unwrap();

        let adjustment = ledger
            .reserve(tenant, product.id, 2, Some("pos sale".to_string()))
            .unwrap();
        assert_eq!(adjustment.action, AdjustmentAction::Sale);
        assert_eq!(adjustment.quantity_change, -2);
        assert_eq!(ledger.get_product(tenant, product.id).unwrap().quantity(), 3);

        let err = ledger.reserve(tenant, product.id, 4, None).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::InsufficientStock { .. })
        ));
        assert_eq!(ledger.get_product(tenant, product.id).unwrap().quantity(), 3);
    }

    #[test]
    fn concurrent_product_creations_resolve_slug_collisions() {
        let (_, ledger, _, _, tenant) = setup();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let ledger = ledger.clone();
            handles.push(std::thread::spawn(move || {
                ledger.create_product(tenant, new_product("Gift Card", 5000, 1))
            }));
        }

        let mut slugs: Vec<String> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap().slug)
            .collect();
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), 4);
    }

    #[test]
    fn concurrent_cancels_reverse_stock_exactly_once() {
        let (_, ledger, service, _, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Throw Pillow", 4500, 10))
            .unwrap();
        let (order, _) = service
            .place_order(tenant, request(vec![(product.id, 3)]))
            .unwrap();
        assert_eq!(ledger.get_product(tenant, product.id).unwrap().quantity(), 7);

        let mut handles = Vec::new();
        for _ in 0..2 {
            let service = service.clone();
            let order_id = order.id;
            handles.push(std::thread::spawn(move || {
                service.update_status(tenant, order_id, OrderStatus::Cancelled)
            }));
        }

        // The loser of the swap gets a conflict; either way only one
        // reversal may land.
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => {}
                Err(StoreError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(ledger.get_product(tenant, product.id).unwrap().quantity(), 10);
        let history = ledger.history(tenant, product.id).unwrap();
        let reversals = history
            .iter()
            .filter(|a| a.action == AdjustmentAction::CancellationReversal)
            .count();
        assert_eq!(reversals, 1);
        assert_eq!(verify_chain(product.id, &history), Ok(()));
    }

    #[test]
    fn stale_order_writes_are_rejected() {
        let (store, ledger, service, _, tenant) = setup();
        let product = ledger
            .create_product(tenant, new_product("Coaster Set", 1500, 5))
            .unwrap();
        let (order, _) = service
            .place_order(tenant, request(vec![(product.id, 1)]))
            .unwrap();

        let mut stale = store.get_order(tenant, order.id).unwrap().unwrap();
        service
            .update_status(tenant, order.id, OrderStatus::Processing)
            .unwrap();

        // A write based on the pre-update read must lose.
        stale
            .transition_status(OrderStatus::Processing, chrono::Utc::now())
            .unwrap();
        let err = store
            .update_order(&stale, OrderStatus::Pending, PaymentStatus::Unpaid)
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn order_numbers_are_globally_unique_across_tenants() {
        let (store, ledger, service, _, tenant_a) = setup();
        let tenant_b = TenantId::new();
        let product = ledger
            .create_product(tenant_a, new_product("Keychain", 900, 5))
            .unwrap();
        let (order, _) = service
            .place_order(tenant_a, request(vec![(product.id, 1)]))
            .unwrap();

        let duplicate = Order::create(
            tenant_b,
            order.order_number.clone(),
            CustomerInfo {
                name: "Bisi Ade".to_string(),
                email: None,
                phone: "0802".to_string(),
            },
            OrderAmounts::new(Money::ZERO, Money::ZERO, Money::ZERO).unwrap(),
            ShippingAddress {
                street: "a".into(),
                city: "b".into(),
                state: "c".into(),
                postal_code: "d".into(),
            },
            None,
            Channel::Web,
            chrono::Utc::now(),
        );
        let err = store
            .place_order(&duplicate, &[], &[], chrono::Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    proptest! {
        #[test]
        fn random_reservations_never_oversell(
            initial in 0i64..40,
            requests in proptest::collection::vec(1i64..8, 0..25),
        ) {
            let (_, ledger, _, _, tenant) = setup();
            let product = ledger
                .create_product(tenant, new_product("Mystery Box", 1000, initial))
                .unwrap();

            let mut reserved = 0i64;
            for quantity in requests {
                match ledger.reserve(tenant, product.id, quantity, None) {
                    Ok(_) => reserved += quantity,
                    Err(StoreError::Domain(DomainError::InsufficientStock { .. })) => {}
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
            }

            prop_assert!(reserved <= initial);
            prop_assert_eq!(
                ledger.get_product(tenant, product.id).unwrap().quantity(),
                initial - reserved
            );
            let history = ledger.history(tenant, product.id).unwrap();
            prop_assert_eq!(verify_chain(product.id, &history), Ok(()));
        }
    }
}
