use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use storeflow_catalog::NewProduct;
use storeflow_core::{Money, ProductId, TenantId};
use storeflow_infra::{InMemoryStore, NoopNotifier, OrderService, StockLedger, StorefrontStore};
use storeflow_orders::{
    Channel, CustomerInfo, OrderFilter, Page, PlaceOrderRequest, RequestedItem, ShippingAddress,
};

type Store = Arc<InMemoryStore>;

fn setup() -> (Store, StockLedger<Store>, OrderService<Store>, TenantId) {
    let store: Store = Arc::new(InMemoryStore::new());
    let ledger = StockLedger::new(store.clone());
    let service = OrderService::new(store.clone(), Arc::new(NoopNotifier));
    (store, ledger, service, TenantId::new())
}

fn seed_product(ledger: &StockLedger<Store>, tenant_id: TenantId, quantity: i64) -> ProductId {
    ledger
        .create_product(
            tenant_id,
            NewProduct {
                name: "Bench Product".to_string(),
                description: None,
                sku: None,
                price: Money::from_minor(2500).unwrap(),
                quantity,
                low_stock_threshold: None,
                is_active: true,
            },
        )
        .unwrap()
        .id
}

fn request(items: Vec<(ProductId, i64)>) -> PlaceOrderRequest {
    PlaceOrderRequest {
        customer: CustomerInfo {
            name: "Bench Customer".to_string(),
            email: None,
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

fn bench_order_placement_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_placement_latency");
    group.sample_size(1000);

    group.bench_function("single_line_order", |b| {
        let (_, ledger, service, tenant_id) = setup();
        let product_id = seed_product(&ledger, tenant_id, i64::MAX / 2);

        // The order number space is 1000 per second per tenant, so a long
        // run exhausts it; exhaustion results are discarded, not unwrapped.
        b.iter(|| {
            black_box(service.place_order(tenant_id, request(vec![(product_id, 1)])).ok());
        });
    });

    for line_count in [2usize, 5, 10].iter() {
        group.bench_with_input(
            BenchmarkId::new("multi_line_order", line_count),
            line_count,
            |b, &lines| {
                let (_, ledger, service, tenant_id) = setup();
                let products: Vec<ProductId> = (0..lines)
                    .map(|_| seed_product(&ledger, tenant_id, i64::MAX / 2))
                    .collect();
                let items: Vec<(ProductId, i64)> =
                    products.iter().map(|&id| (id, 1)).collect();

                b.iter(|| {
                    black_box(service.place_order(tenant_id, request(items.clone())).ok());
                });
            },
        );
    }

    group.finish();
}

fn bench_adjustment_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjustment_throughput");
    group.throughput(Throughput::Elements(1));

    group.bench_function("restock", |b| {
        let (_, ledger, _, tenant_id) = setup();
        let product_id = seed_product(&ledger, tenant_id, 0);

        b.iter(|| {
            black_box(ledger.restock(tenant_id, product_id, 1, None).unwrap());
        });
    });

    group.finish();
}

fn bench_order_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_listing");

    for order_count in [50usize, 100].iter() {
        group.bench_with_input(
            BenchmarkId::new("filtered_page", order_count),
            order_count,
            |b, &count| {
                let (store, ledger, service, tenant_id) = setup();
                let product_id = seed_product(&ledger, tenant_id, i64::MAX / 2);
                for _ in 0..count {
                    service
                        .place_order(tenant_id, request(vec![(product_id, 1)]))
                        .unwrap();
                }

                let filter = OrderFilter {
                    search: Some("bench".to_string()),
                    ..Default::default()
                };
                b.iter(|| {
                    black_box(
                        store
                            .list_orders(tenant_id, &filter, Page::default())
                            .unwrap(),
                    );
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_order_placement_latency,
    bench_adjustment_throughput,
    bench_order_listing
);
criterion_main!(benches);
