//! Stock-state derivation and adjustment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OrderId, ProductId};

/// Derived stock label for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Derive the label from a quantity and a low-stock threshold.
    ///
    /// Zero or less is out of stock; at or below the threshold is low stock.
    pub fn derive(quantity: i64, low_stock_threshold: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= low_stock_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

/// Stock figures returned by a conditional stock write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    /// Quantity after the write.
    pub quantity: i64,
    /// Threshold configured on the product, if any.
    pub low_stock_threshold: Option<i64>,
}

impl StockLevel {
    /// Stock label for this level, using `default_threshold` when the
    /// product has none of its own.
    pub fn status(&self, default_threshold: i64) -> StockStatus {
        StockStatus::derive(
            self.quantity,
            self.low_stock_threshold.unwrap_or(default_threshold),
        )
    }
}

/// Reason for an inventory adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// Sold by a committed order.
    Sale,
    /// Put back after an order was cancelled.
    Cancellation,
    /// Put back after a return completed.
    Return,
}

/// An inventory adjustment record (for audit trail).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    /// Change in quantity (negative for sales).
    pub quantity_change: i64,
    /// Quantity after the change.
    pub resulting_quantity: i64,
    /// Stock label after the change.
    pub resulting_status: StockStatus,
    pub reason: AdjustmentReason,
    pub order_id: OrderId,
    pub timestamp: DateTime<Utc>,
}
