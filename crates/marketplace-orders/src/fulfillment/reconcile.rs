//! Putting stock back after a cancellation or return.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::catalog::{AdjustmentReason, StockAdjustment};
use crate::checkout::Order;
use crate::commit::OrderTransaction;
use crate::error::{OrderError, StoreError};

/// Restock every line of `order` inside `tx` and re-derive each product's
/// stock flag with the same thresholds the commit uses.
///
/// Products that no longer exist are skipped. The caller is responsible for
/// marking the order so this runs at most once.
pub async fn restore_order_stock(
    tx: &mut dyn OrderTransaction,
    order: &Order,
    reason: AdjustmentReason,
    default_low_stock_threshold: i64,
    now: DateTime<Utc>,
) -> Result<Vec<StockAdjustment>, OrderError> {
    let mut adjustments = Vec::new();

    for item in order.items() {
        let level = match tx.restock(&item.product_id, item.quantity).await {
            Ok(level) => level,
            Err(StoreError::NotFound(_)) => {
                warn!(
                    order_id = %order.id,
                    product_id = %item.product_id,
                    "product gone, skipping restock"
                );
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let status = level.status(default_low_stock_threshold);
        tx.set_stock_status(&item.product_id, status).await?;

        let adjustment = StockAdjustment {
            product_id: item.product_id.clone(),
            quantity_change: item.quantity,
            resulting_quantity: level.quantity,
            resulting_status: status,
            reason,
            order_id: order.id.clone(),
            timestamp: now,
        };
        tx.record_stock_adjustment(adjustment.clone()).await?;
        debug!(
            product_id = %item.product_id,
            restored = item.quantity,
            quantity = level.quantity,
            status = status.as_str(),
            "stock restored"
        );
        adjustments.push(adjustment);
    }

    Ok(adjustments)
}
