//! Sub-order lifecycle and order status derivation.
//!
//! ```text
//! pending ──► processing ──► shipped ──► delivered
//!    │             │            │
//!    └─────────────┴────────────┴──► cancelled
//! ```
//!
//! `shipped → cancelled` exists for the return workflow only.

use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// Status of one vendor's part of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubOrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl SubOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubOrderStatus::Pending => "pending",
            SubOrderStatus::Processing => "processing",
            SubOrderStatus::Shipped => "shipped",
            SubOrderStatus::Delivered => "delivered",
            SubOrderStatus::Cancelled => "cancelled",
        }
    }

    /// States reachable in one step.
    pub fn allowed_next(&self) -> &'static [SubOrderStatus] {
        use SubOrderStatus::*;
        match self {
            Pending => &[Processing, Cancelled],
            Processing => &[Shipped, Cancelled],
            Shipped => &[Delivered, Cancelled],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: SubOrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Validate a transition, returning the new status.
    pub fn transition(&self, next: SubOrderStatus) -> Result<SubOrderStatus, OrderError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(OrderError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }

    /// A customer may cancel before shipment.
    pub fn customer_cancellable(&self) -> bool {
        matches!(self, SubOrderStatus::Pending | SubOrderStatus::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }
}

/// Aggregate status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    /// Set by the return workflow; never derived.
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }

    /// Whether stock for this order may be put back.
    pub fn allows_stock_restore(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }
}

/// Derive the order status from its sub-order statuses.
///
/// Unanimity is checked first: all cancelled is cancelled, all live
/// sub-orders delivered is delivered. Then partial progress: nothing left
/// pending or processing means shipped, any progress means processing,
/// otherwise pending. An empty set is pending.
pub fn derive_order_status(statuses: &[SubOrderStatus]) -> OrderStatus {
    use SubOrderStatus::*;

    if statuses.is_empty() {
        return OrderStatus::Pending;
    }
    if statuses.iter().all(|s| *s == Cancelled) {
        return OrderStatus::Cancelled;
    }

    let live: Vec<SubOrderStatus> = statuses.iter().copied().filter(|s| *s != Cancelled).collect();
    if live.iter().all(|s| *s == Delivered) {
        return OrderStatus::Delivered;
    }
    if live.iter().all(|s| matches!(s, Shipped | Delivered)) {
        return OrderStatus::Shipped;
    }
    if live.iter().any(|s| matches!(s, Processing | Shipped | Delivered)) {
        return OrderStatus::Processing;
    }
    OrderStatus::Pending
}
