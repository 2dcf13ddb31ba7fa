//! The commit unit of work.
//!
//! All writes of a checkout pass through one [`OrderTransaction`]:
//!
//! 1. re-check `(scope, key)`
//! 2. insert the order with its sub-orders, regenerating a taken order
//!    number once
//! 3. conditionally decrement stock per cart line, in validation order; a
//!    line whose product is gone counts as a conflict
//! 4. persist the re-derived stock flag and an adjustment record
//! 5. insert one commission record per sub-order
//! 6. bump coupon usage
//! 7. commit
//!
//! Any failure returns early and the dropped transaction rolls back.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::catalog::{AdjustmentReason, StockAdjustment};
use crate::checkout::{AssembledOrder, Order};
use crate::commit::OrderTransaction;
use crate::error::{OrderError, StoreError, UniqueConstraint};
use crate::ids::regenerate_order_number;

/// How a commit ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// This transaction created the order.
    Committed(Order),
    /// An order with the same `(scope, key)` already existed.
    Replayed(Order),
}

impl CommitOutcome {
    pub fn order(&self) -> &Order {
        match self {
            CommitOutcome::Committed(order) | CommitOutcome::Replayed(order) => order,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, CommitOutcome::Replayed(_))
    }
}

/// Run steps 1 to 7 on `tx`.
///
/// A `(scope, key)` violation raised by the store itself comes back as
/// `OrderError::Store(StoreError::UniqueViolation { .. })`; the caller turns
/// it into a replay once this transaction is gone.
pub async fn commit_assembled_order(
    mut tx: Box<dyn OrderTransaction>,
    assembled: &AssembledOrder,
    default_low_stock_threshold: i64,
    now: DateTime<Utc>,
) -> Result<CommitOutcome, OrderError> {
    let mut order = assembled.order.clone();

    if let Some(key) = &order.idempotency_key {
        if let Some(existing) = tx.find_by_idempotency(&order.idempotency_scope, key).await? {
            debug!(order_id = %existing.id, scope = %order.idempotency_scope, "key already committed inside transaction");
            return Ok(CommitOutcome::Replayed(existing));
        }
    }

    match tx.insert_order(order.clone()).await {
        Err(StoreError::UniqueViolation {
            constraint: UniqueConstraint::OrderNumber,
        }) => {
            let fresh = regenerate_order_number(&order.order_number, now);
            warn!(order_id = %order.id, taken = %order.order_number, fresh = %fresh, "order number taken, retrying once");
            order.order_number = fresh;
            tx.insert_order(order.clone()).await?;
        }
        result => result?,
    }

    for reservation in &assembled.reservations {
        let decremented = match tx
            .conditional_decrement_stock(&reservation.product_id, reservation.quantity)
            .await
        {
            Ok(level) => level,
            // The product was removed after the cart was priced.
            Err(StoreError::NotFound(_)) => None,
            Err(err) => return Err(err.into()),
        };
        let level = decremented.ok_or_else(|| {
            warn!(
                order_id = %order.id,
                product_id = %reservation.product_id,
                quantity = reservation.quantity,
                "conditional stock decrement matched nothing"
            );
            OrderError::StockConflict {
                product_id: reservation.product_id.clone(),
            }
        })?;

        let status = level.status(default_low_stock_threshold);
        tx.set_stock_status(&reservation.product_id, status).await?;
        tx.record_stock_adjustment(StockAdjustment {
            product_id: reservation.product_id.clone(),
            quantity_change: -reservation.quantity,
            resulting_quantity: level.quantity,
            resulting_status: status,
            reason: AdjustmentReason::Sale,
            order_id: order.id.clone(),
            timestamp: now,
        })
        .await?;
    }

    tx.insert_commissions(assembled.commissions.clone()).await?;

    if let Some(coupon) = &assembled.coupon {
        tx.increment_coupon_usage(&coupon.coupon_id)
            .await
            .map_err(|err| match err {
                StoreError::Conflict(_) => OrderError::CouponLimitReached(coupon.code.clone()),
                other => OrderError::Store(other),
            })?;
    }

    tx.commit().await?;
    Ok(CommitOutcome::Committed(order))
}
