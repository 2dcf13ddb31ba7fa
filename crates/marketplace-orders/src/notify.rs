//! Order event notifications.
//!
//! Events are published after the transaction that caused them has
//! committed. A failing sink is logged and otherwise ignored.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::fulfillment::SubOrderStatus;
use crate::ids::{OrderId, VendorId};
use crate::money::Money;

/// Something that happened to an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    OrderPlaced {
        order_id: OrderId,
        order_number: String,
        vendors: Vec<VendorId>,
        total: Money,
    },
    SubOrderStatusChanged {
        order_id: OrderId,
        vendor_id: VendorId,
        from: SubOrderStatus,
        to: SubOrderStatus,
    },
    OrderCancelled {
        order_id: OrderId,
        order_number: String,
    },
    StockReconciled {
        order_id: OrderId,
        /// Units put back across all lines.
        units: i64,
    },
}

impl OrderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced { .. } => "order_placed",
            OrderEvent::SubOrderStatusChanged { .. } => "sub_order_status_changed",
            OrderEvent::OrderCancelled { .. } => "order_cancelled",
            OrderEvent::StockReconciled { .. } => "stock_reconciled",
        }
    }

    pub fn order_id(&self) -> &OrderId {
        match self {
            OrderEvent::OrderPlaced { order_id, .. }
            | OrderEvent::SubOrderStatusChanged { order_id, .. }
            | OrderEvent::OrderCancelled { order_id, .. }
            | OrderEvent::StockReconciled { order_id, .. } => order_id,
        }
    }
}

/// Receiver for order events (mail, push, vendor dashboards).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &OrderEvent) -> anyhow::Result<()>;
}

/// Sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn notify(&self, event: &OrderEvent) -> anyhow::Result<()> {
        info!(event = event.name(), order_id = %event.order_id(), "order event");
        Ok(())
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<OrderEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<OrderEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, event: &OrderEvent) -> anyhow::Result<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

/// Deliver `event`, logging instead of failing.
pub(crate) async fn publish(sink: &dyn NotificationSink, event: OrderEvent) {
    if let Err(err) = sink.notify(&event).await {
        warn!(
            event = event.name(),
            order_id = %event.order_id(),
            error = %err,
            "notification failed"
        );
    }
}
