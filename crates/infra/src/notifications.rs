use std::sync::Mutex;

use storeflow_orders::{Order, StatusTransition};

/// Outbound order notifications (customer email/WhatsApp hooks).
///
/// Delivery is best-effort: implementations must not fail the operation
/// that triggered them. A lost notification is logged, never propagated.
pub trait OrderNotifier: Send + Sync {
    fn order_placed(&self, order: &Order);
    fn order_status_changed(&self, order: &Order, transition: StatusTransition);
    fn payment_confirmed(&self, order: &Order);
}

/// Logs and discards. Default wiring until a delivery channel lands.
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl OrderNotifier for NoopNotifier {
    fn order_placed(&self, order: &Order) {
        tracing::debug!(order_number = %order.order_number, "order placed");
    }

    fn order_status_changed(&self, order: &Order, transition: StatusTransition) {
        tracing::debug!(
            order_number = %order.order_number,
            from = %transition.from,
            to = %transition.to,
            "order status changed"
        );
    }

    fn payment_confirmed(&self, order: &Order) {
        tracing::debug!(order_number = %order.order_number, "payment confirmed");
    }
}

/// Captures notifications in memory; test double.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn record(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl OrderNotifier for RecordingNotifier {
    fn order_placed(&self, order: &Order) {
        self.record(format!("placed:{}", order.order_number));
    }

    fn order_status_changed(&self, order: &Order, transition: StatusTransition) {
        self.record(format!(
            "status:{}:{}->{}",
            order.order_number, transition.from, transition.to
        ));
    }

    fn payment_confirmed(&self, order: &Order) {
        self.record(format!("paid:{}", order.order_number));
    }
}
