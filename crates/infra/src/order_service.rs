use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use storeflow_core::{DomainError, Money, OrderId, OrderItemId, ProductId, TenantId};
use storeflow_orders::{
    Order, OrderAmounts, OrderAssembler, OrderFilter, OrderItem, OrderStatistics, OrderStatus,
    Page, PaymentMethod, PlaceOrderRequest,
};

use crate::notifications::OrderNotifier;
use crate::slug_registry::SlugRegistry;
use crate::store::{StoreError, StoreResult, StorefrontStore};

/// Whole-placement retries on transient storage conflicts (order number
/// race, serialization failure). Each retry re-reads the catalog and draws
/// a fresh number.
const PLACEMENT_ATTEMPTS: u32 = 3;

/// Order lifecycle orchestration: placement, fulfilment status, payment.
///
/// The service composes pure domain logic (assembly, state machines) with
/// the store's atomic operations. It is the only caller of
/// `StorefrontStore::place_order`.
#[derive(Clone)]
pub struct OrderService<S> {
    store: S,
    numbers: SlugRegistry<S>,
    notifier: Arc<dyn OrderNotifier>,
}

impl<S: StorefrontStore + Clone> OrderService<S> {
    pub fn new(store: S, notifier: Arc<dyn OrderNotifier>) -> Self {
        Self {
            numbers: SlugRegistry::new(store.clone()),
            store,
            notifier,
        }
    }

    /// Place an order: validate the request, price it against the catalog,
    /// then commit the reservation, ledger entries, order and items in one
    /// atomic store operation.
    ///
    /// The advisory stock check during assembly gives early, friendly
    /// failures; the store's conditional decrement is what actually
    /// prevents overselling under concurrency.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, channel = %request.channel), err)]
    pub fn place_order(
        &self,
        tenant_id: TenantId,
        request: PlaceOrderRequest,
    ) -> StoreResult<(Order, Vec<OrderItem>)> {
        request.validate()?;

        let mut last_conflict: Option<StoreError> = None;
        for _ in 0..PLACEMENT_ATTEMPTS {
            let products = self.load_products(tenant_id, &request)?;
            let draft = OrderAssembler::assemble(tenant_id, &request.items, |id| {
                products.get(&id).cloned()
            })?;

            let now = Utc::now();
            let amounts = OrderAmounts::new(draft.subtotal, Money::ZERO, Money::ZERO)?;
            let number = self.numbers.unique_order_number(now)?;
            let order = Order::create(
                tenant_id,
                number,
                request.customer.clone(),
                amounts,
                request.shipping_address.clone(),
                request.notes.clone(),
                request.channel,
                now,
            );
            let items: Vec<OrderItem> = draft
                .items
                .iter()
                .map(|line| OrderItem {
                    id: OrderItemId::new(),
                    order_id: order.id,
                    product_id: line.product_id,
                    product_name: line.product_name.clone(),
                    unit_price: line.unit_price,
                    quantity: line.quantity,
                    subtotal: line.subtotal,
                    attributes: line.attributes.clone(),
                })
                .collect();

            match self
                .store
                .place_order(&order, &items, &draft.reservations(), now)
            {
                Ok(()) => {
                    self.notifier.order_placed(&order);
                    return Ok((order, items));
                }
                Err(e) if e.is_transient() => {
                    last_conflict = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_conflict
            .unwrap_or_else(|| StoreError::conflict("order placement retries exhausted")))
    }

    /// Move an order along its fulfilment lifecycle. Cancelling an unshipped
    /// order returns every reserved item to stock through the ledger.
    ///
    /// Writes are compare-and-swapped on the state the order was read in, so
    /// two racing cancels resolve to one winner; the loser gets a `Conflict`
    /// and a retry observes the terminal state as a no-op. The cancellation
    /// swap and its stock reversals commit as one store operation.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, order_id = %order_id, to = %to), err)]
    pub fn update_status(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        to: OrderStatus,
    ) -> StoreResult<Order> {
        let mut order = self
            .store
            .get_order(tenant_id, order_id)?
            .ok_or(DomainError::NotFound)?;
        let expected_status = order.status();
        let expected_payment = order.payment().status;

        let transition = order.transition_status(to, Utc::now())?;
        if transition.no_op {
            return Ok(order);
        }

        if transition.reverses_stock {
            let items = self.store.get_order_items(tenant_id, order_id)?;
            let mut merged: BTreeMap<ProductId, i64> = BTreeMap::new();
            for item in &items {
                *merged.entry(item.product_id).or_insert(0) += item.quantity;
            }
            let reversals: Vec<(ProductId, i64)> = merged.into_iter().collect();
            self.store
                .cancel_order(&order, expected_status, &reversals, Utc::now())?;
        } else {
            self.store
                .update_order(&order, expected_status, expected_payment)?;
        }

        self.notifier.order_status_changed(&order, transition);
        Ok(order)
    }

    /// Record a payment confirmation. Replays of the same transaction id
    /// are absorbed silently.
    #[instrument(skip(self, transaction_id), fields(tenant_id = %tenant_id, order_id = %order_id, method = %method), err)]
    pub fn mark_as_paid(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        method: PaymentMethod,
        transaction_id: Option<String>,
    ) -> StoreResult<Order> {
        let mut order = self
            .store
            .get_order(tenant_id, order_id)?
            .ok_or(DomainError::NotFound)?;
        let expected_status = order.status();
        let expected_payment = order.payment().status;

        let update = order.mark_as_paid(method, transaction_id, Utc::now())?;
        if update.no_op {
            return Ok(order);
        }

        self.store
            .update_order(&order, expected_status, expected_payment)?;
        self.notifier.payment_confirmed(&order);
        Ok(order)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, order_id = %order_id), err)]
    pub fn mark_refunded(&self, tenant_id: TenantId, order_id: OrderId) -> StoreResult<Order> {
        let mut order = self
            .store
            .get_order(tenant_id, order_id)?
            .ok_or(DomainError::NotFound)?;
        let expected_status = order.status();
        let expected_payment = order.payment().status;

        order.mark_refunded()?;
        self.store
            .update_order(&order, expected_status, expected_payment)?;
        Ok(order)
    }

    /// Soft-delete an order. It stays queryable by id for audit but drops
    /// out of listings and statistics.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, order_id = %order_id), err)]
    pub fn delete_order(&self, tenant_id: TenantId, order_id: OrderId) -> StoreResult<()> {
        let mut order = self
            .store
            .get_order(tenant_id, order_id)?
            .ok_or(DomainError::NotFound)?;
        let expected_status = order.status();
        let expected_payment = order.payment().status;

        order.mark_deleted(Utc::now());
        self.store
            .update_order(&order, expected_status, expected_payment)
    }

    pub fn get_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> StoreResult<(Order, Vec<OrderItem>)> {
        let order = self
            .store
            .get_order(tenant_id, order_id)?
            .ok_or(DomainError::NotFound)?;
        let items = self.store.get_order_items(tenant_id, order_id)?;
        Ok((order, items))
    }

    /// Filtered listing, newest first, with the total match count for
    /// pagination metadata.
    pub fn list_orders(
        &self,
        tenant_id: TenantId,
        filter: &OrderFilter,
        page: Page,
    ) -> StoreResult<(Vec<Order>, u64)> {
        let orders = self.store.list_orders(tenant_id, filter, page)?;
        let total = self.store.count_orders(tenant_id, filter)?;
        Ok((orders, total))
    }

    pub fn statistics(&self, tenant_id: TenantId) -> StoreResult<OrderStatistics> {
        self.store.statistics(tenant_id)
    }

    fn load_products(
        &self,
        tenant_id: TenantId,
        request: &PlaceOrderRequest,
    ) -> StoreResult<HashMap<ProductId, storeflow_catalog::Product>> {
        let mut products = HashMap::with_capacity(request.items.len());
        for item in &request.items {
            if products.contains_key(&item.product_id) {
                continue;
            }
            if let Some(product) = self.store.get_product(tenant_id, item.product_id)? {
                products.insert(item.product_id, product);
            }
        }
        Ok(products)
    }
}
