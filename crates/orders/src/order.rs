use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use storeflow_core::{
    DomainError, DomainResult, Entity, Money, OrderId, OrderItemId, ProductId, TenantId,
};

/// Fulfilment status lifecycle: pending → processing → shipped → delivered,
/// forward-only; pending/processing may move to cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Position along the forward-only fulfilment track. Cancelled is a
    /// terminal side exit, not part of the track.
    fn rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(DomainError::validation(format!(
                "unknown payment status '{other}'"
            ))),
        }
    }
}

impl core::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Web,
    Instagram,
    Whatsapp,
}

impl Default for Channel {
    fn default() -> Self {
        Channel::Web
    }
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Web => "web",
            Channel::Instagram => "instagram",
            Channel::Whatsapp => "whatsapp",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "web" => Ok(Channel::Web),
            "instagram" => Ok(Channel::Instagram),
            "whatsapp" => Ok(Channel::Whatsapp),
            other => Err(DomainError::validation(format!("unknown channel '{other}'"))),
        }
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Transfer,
    Crypto,
    Cash,
    Whatsapp,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Crypto => "crypto",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Whatsapp => "whatsapp",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "transfer" => Ok(PaymentMethod::Transfer),
            "crypto" => Ok(PaymentMethod::Crypto),
            "cash" => Ok(PaymentMethod::Cash),
            "whatsapp" => Ok(PaymentMethod::Whatsapp),
            other => Err(DomainError::validation(format!(
                "unknown payment method '{other}'"
            ))),
        }
    }
}

impl core::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// Monetary breakdown fixed at creation: `total = subtotal + tax + shipping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAmounts {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping_cost: Money,
    pub total: Money,
}

impl OrderAmounts {
    pub fn new(subtotal: Money, tax: Money, shipping_cost: Money) -> DomainResult<Self> {
        let total = subtotal.checked_add(tax)?.checked_add(shipping_cost)?;
        Ok(Self {
            subtotal,
            tax,
            shipping_cost,
            total,
        })
    }
}

/// One order line, immutable after creation. Name and unit price are
/// snapshots taken at order time, independent of later catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub subtotal: Money,
    pub attributes: Option<JsonValue>,
}

/// Payment-side state, changed only through [`Order::mark_as_paid`],
/// [`Order::mark_refunded`] and [`Order::mark_payment_failed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentState {
    pub status: PaymentStatus,
    pub method: Option<PaymentMethod>,
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentState {
    pub fn unpaid() -> Self {
        Self {
            status: PaymentStatus::Unpaid,
            method: None,
            transaction_id: None,
            paid_at: None,
        }
    }
}

/// Outcome of a status transition, for the orchestration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// The order was already in the requested state; nothing changed.
    pub no_op: bool,
    /// Cancellation before shipment: reserved stock must be returned.
    pub reverses_stock: bool,
}

/// Outcome of a payment confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentUpdate {
    /// Same transaction id re-submitted; nothing changed.
    pub no_op: bool,
}

/// An order owned by one tenant. Status and payment fields are private:
/// the only way to change them is through the transition methods below,
/// which enforce the state machine. Totals are fixed at creation and never
/// recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub tenant_id: TenantId,
    pub order_number: String,
    pub customer: CustomerInfo,
    status: OrderStatus,
    payment: PaymentState,
    pub amounts: OrderAmounts,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub channel: Channel,
    pub created_at: DateTime<Utc>,
    shipped_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Raw field set for storage-layer rehydration.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub tenant_id: TenantId,
    pub order_number: String,
    pub customer: CustomerInfo,
    pub status: OrderStatus,
    pub payment: PaymentState,
    pub amounts: OrderAmounts,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub channel: Channel,
    pub created_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    /// A freshly placed order: pending, unpaid.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        tenant_id: TenantId,
        order_number: String,
        customer: CustomerInfo,
        amounts: OrderAmounts,
        shipping_address: ShippingAddress,
        notes: Option<String>,
        channel: Channel,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            tenant_id,
            order_number,
            customer,
            status: OrderStatus::Pending,
            payment: PaymentState::unpaid(),
            amounts,
            shipping_address,
            notes,
            channel,
            created_at: now,
            shipped_at: None,
            deleted_at: None,
        }
    }

    /// Rebuild an order from persisted state (storage layer only).
    pub fn rehydrate(parts: OrderParts) -> Self {
        Self {
            id: parts.id,
            tenant_id: parts.tenant_id,
            order_number: parts.order_number,
            customer: parts.customer,
            status: parts.status,
            payment: parts.payment,
            amounts: parts.amounts,
            shipping_address: parts.shipping_address,
            notes: parts.notes,
            channel: parts.channel,
            created_at: parts.created_at,
            shipped_at: parts.shipped_at,
            deleted_at: parts.deleted_at,
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment(&self) -> &PaymentState {
        &self.payment
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    pub fn is_paid(&self) -> bool {
        self.payment.status == PaymentStatus::Paid
    }

    /// Move the fulfilment status. Forward moves along
    /// pending → processing → shipped → delivered are allowed (including
    /// skips); cancellation only from pending/processing; everything else
    /// is rejected. Requesting the current state is a no-op.
    pub fn transition_status(
        &mut self,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<StatusTransition> {
        let from = self.status;

        if to == from {
            return Ok(StatusTransition {
                from,
                to,
                no_op: true,
                reverses_stock: false,
            });
        }

        let rejected = || DomainError::invalid_transition(from.as_str(), to.as_str());

        let reverses_stock = match (from.rank(), to) {
            // Terminal: nothing leaves cancelled.
            (None, _) => return Err(rejected()),
            (Some(from_rank), OrderStatus::Cancelled) => {
                // Stock was committed at placement; it comes back only if
                // the order never shipped.
                if from_rank >= OrderStatus::Shipped.rank().unwrap_or(u8::MAX) {
                    return Err(rejected());
                }
                true
            }
            (Some(from_rank), _) => {
                let to_rank = to.rank().ok_or_else(rejected)?;
                if to_rank < from_rank {
                    return Err(rejected());
                }
                false
            }
        };

        if to == OrderStatus::Shipped {
            self.shipped_at = Some(now);
        }
        self.status = to;

        Ok(StatusTransition {
            from,
            to,
            no_op: false,
            reverses_stock,
        })
    }

    /// Record payment confirmation. Re-invoking with the same transaction
    /// id is a no-op; with a different id the method/transaction are
    /// overwritten as a correction (the original `paid_at` is kept).
    pub fn mark_as_paid(
        &mut self,
        method: PaymentMethod,
        transaction_id: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<PaymentUpdate> {
        match self.payment.status {
            PaymentStatus::Unpaid | PaymentStatus::Failed => {
                self.payment = PaymentState {
                    status: PaymentStatus::Paid,
                    method: Some(method),
                    transaction_id,
                    paid_at: Some(now),
                };
                Ok(PaymentUpdate { no_op: false })
            }
            PaymentStatus::Paid => {
                if self.payment.transaction_id == transaction_id {
                    return Ok(PaymentUpdate { no_op: true });
                }
                self.payment.method = Some(method);
                self.payment.transaction_id = transaction_id;
                Ok(PaymentUpdate { no_op: false })
            }
            PaymentStatus::Refunded => Err(DomainError::invalid_transition(
                self.payment.status.as_str(),
                PaymentStatus::Paid.as_str(),
            )),
        }
    }

    /// Refund is only valid for a paid order.
    pub fn mark_refunded(&mut self) -> DomainResult<()> {
        if self.payment.status != PaymentStatus::Paid {
            return Err(DomainError::invalid_transition(
                self.payment.status.as_str(),
                PaymentStatus::Refunded.as_str(),
            ));
        }
        self.payment.status = PaymentStatus::Refunded;
        Ok(())
    }

    /// A failed payment attempt on a not-yet-paid order.
    pub fn mark_payment_failed(&mut self) -> DomainResult<()> {
        if self.payment.status != PaymentStatus::Unpaid {
            return Err(DomainError::invalid_transition(
                self.payment.status.as_str(),
                PaymentStatus::Failed.as_str(),
            ));
        }
        self.payment.status = PaymentStatus::Failed;
        Ok(())
    }

    /// Soft delete: retained for audit, excluded from listings.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted_at.get_or_insert(now);
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
