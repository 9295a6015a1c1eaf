//! `storeflow-orders` — order domain: entities, state machines, assembly.
//!
//! Everything here is pure decision logic. Reservation, persistence, and
//! numbering-uniqueness live behind the storage layer in `storeflow-infra`.

pub mod draft;
pub mod number;
pub mod order;
pub mod query;
pub mod request;

pub use draft::{DraftItem, OrderAssembler, OrderDraft, RequestedItem};
pub use number::generate_order_number;
pub use order::{
    Channel, CustomerInfo, Order, OrderAmounts, OrderItem, OrderParts, OrderStatus,
    PaymentMethod, PaymentState, PaymentStatus, PaymentUpdate, ShippingAddress,
    StatusTransition,
};
pub use query::{
    compute_statistics, ChannelCounts, OrderFilter, OrderStatistics, Page, DEFAULT_PAGE_SIZE,
};
pub use request::PlaceOrderRequest;
