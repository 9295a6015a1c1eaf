use serde::{Deserialize, Serialize};

use storeflow_core::Money;

use crate::order::{Channel, Order, OrderStatus, PaymentStatus};

/// Listing filter. All predicates are conjunctive; `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    /// Case-insensitive substring over order number, customer name and
    /// customer phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        if self.status.is_some_and(|s| s != order.status()) {
            return false;
        }
        if self.payment_status.is_some_and(|s| s != order.payment().status) {
            return false;
        }
        if self.channel.is_some_and(|c| c != order.channel) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = order.order_number.to_lowercase().contains(&needle)
                || order.customer.name.to_lowercase().contains(&needle)
                || order.customer.phone.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }
}

pub const DEFAULT_PAGE_SIZE: i64 = 15;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Offset pagination over a newest-first listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl Page {
    /// Clamp caller-supplied values into a sane window.
    pub fn clamped(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCounts {
    pub web: u64,
    pub instagram: u64,
    pub whatsapp: u64,
}

impl ChannelCounts {
    fn bump(&mut self, channel: Channel) {
        match channel {
            Channel::Web => self.web += 1,
            Channel::Instagram => self.instagram += 1,
            Channel::Whatsapp => self.whatsapp += 1,
        }
    }
}

/// Tenant-wide order counters. Revenue counts paid orders only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatistics {
    pub total_orders: u64,
    pub pending_orders: u64,
    pub paid_orders: u64,
    pub total_revenue: Money,
    pub orders_by_channel: ChannelCounts,
}

/// Fold statistics over a tenant's live (not soft-deleted) orders.
pub fn compute_statistics<'a>(orders: impl Iterator<Item = &'a Order>) -> OrderStatistics {
    let mut stats = OrderStatistics::default();
    for order in orders {
        if order.deleted_at.is_some() {
            continue;
        }
        stats.total_orders += 1;
        if order.status() == OrderStatus::Pending {
            stats.pending_orders += 1;
        }
        if order.payment().status == PaymentStatus::Paid {
            stats.paid_orders += 1;
            stats.total_revenue = stats.total_revenue.saturating_add(order.amounts.total);
        }
        stats.orders_by_channel.bump(order.channel);
    }
    stats
}
