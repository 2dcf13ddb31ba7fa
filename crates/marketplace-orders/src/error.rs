//! Order engine error types.

use http::StatusCode;
use thiserror::Error;

use crate::ids::{OrderId, ProductId, VendorId};

/// Broad failure category, used to decide how a caller should react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed request; rejected before any store access.
    Validation,
    /// Product missing or short on stock; rejected after a read, before mutation.
    Catalog,
    /// Coupon could not be applied.
    Coupon,
    /// Lost a race inside the commit transaction; the caller may resubmit.
    Concurrency,
    /// Caller asked for something the order lifecycle does not allow.
    Invariant,
    /// Backing store or runtime failure.
    Infrastructure,
}

/// Errors raised by the store backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint was violated at commit.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: UniqueConstraint },

    /// A conditional write no longer holds at commit.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// A referenced record does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Any other backend failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Named uniqueness constraints on the order table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueConstraint {
    /// `(idempotency_scope, idempotency_key)`.
    IdempotencyKey,
    /// Public order number.
    OrderNumber,
    /// Internal order id.
    OrderId,
}

impl std::fmt::Display for UniqueConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueConstraint::IdempotencyKey => f.write_str("orders(idempotency_scope, idempotency_key)"),
            UniqueConstraint::OrderNumber => f.write_str("orders(order_number)"),
            UniqueConstraint::OrderId => f.write_str("orders(id)"),
        }
    }
}

/// Errors that can occur while pricing, committing or fulfilling an order.
#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Product is not available for sale: {0}")]
    ProductUnavailable(ProductId),

    #[error("Product {name} ({product_id}) is out of stock")]
    OutOfStock { product_id: ProductId, name: String },

    #[error("Insufficient stock for {name} ({product_id}): requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: i64,
        available: i64,
    },

    #[error("Invalid coupon {code}: {reason}")]
    InvalidCoupon { code: String, reason: String },

    #[error("Coupon {0} has expired")]
    CouponExpired(String),

    #[error("Coupon {0} has reached its usage limit")]
    CouponLimitReached(String),

    #[error("Coupon {code} requires a minimum order of {minimum}, cart subtotal is {subtotal}")]
    MinOrderNotMet {
        code: String,
        minimum: String,
        subtotal: String,
    },

    #[error("Stock changed for product {product_id} while committing; refresh the cart and retry")]
    StockConflict { product_id: ProductId },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order {order_id} has no sub-order for vendor {vendor_id}")]
    SubOrderNotFound { order_id: OrderId, vendor_id: VendorId },

    #[error("Order {0} is not cancelled or returned")]
    NotCancelled(OrderId),

    #[error("Stock for order {0} has already been restored")]
    AlreadyReconciled(OrderId),

    #[error("Order {0} was modified concurrently; reload and retry")]
    ConcurrentModification(OrderId),

    #[error("Commit transaction timed out after {0}ms")]
    CommitTimeout(u64),

    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OrderError {
    /// Failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::Validation(_) | OrderError::Overflow => ErrorKind::Validation,
            OrderError::ProductNotFound(_)
            | OrderError::ProductUnavailable(_)
            | OrderError::OutOfStock { .. }
            | OrderError::InsufficientStock { .. } => ErrorKind::Catalog,
            OrderError::InvalidCoupon { .. }
            | OrderError::CouponExpired(_)
            | OrderError::CouponLimitReached(_)
            | OrderError::MinOrderNotMet { .. } => ErrorKind::Coupon,
            OrderError::StockConflict { .. }
            | OrderError::ConcurrentModification(_)
            | OrderError::CommitTimeout(_) => ErrorKind::Concurrency,
            OrderError::InvalidTransition { .. }
            | OrderError::OrderNotFound(_)
            | OrderError::SubOrderNotFound { .. }
            | OrderError::NotCancelled(_)
            | OrderError::AlreadyReconciled(_) => ErrorKind::Invariant,
            OrderError::Store(_) => ErrorKind::Infrastructure,
        }
    }

    /// Whether resubmitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Concurrency
    }

    /// HTTP-equivalent status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderError::Validation(_) | OrderError::Overflow => StatusCode::BAD_REQUEST,
            OrderError::ProductNotFound(_)
            | OrderError::OrderNotFound(_)
            | OrderError::SubOrderNotFound { .. } => StatusCode::NOT_FOUND,
            OrderError::ProductUnavailable(_)
            | OrderError::OutOfStock { .. }
            | OrderError::InsufficientStock { .. }
            | OrderError::InvalidCoupon { .. }
            | OrderError::CouponExpired(_)
            | OrderError::CouponLimitReached(_)
            | OrderError::MinOrderNotMet { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            OrderError::StockConflict { .. }
            | OrderError::ConcurrentModification(_)
            | OrderError::InvalidTransition { .. }
            | OrderError::NotCancelled(_)
            | OrderError::AlreadyReconciled(_) => StatusCode::CONFLICT,
            OrderError::CommitTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            OrderError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_conflict_is_retryable_409() {
        let err = OrderError::StockConflict {
            product_id: ProductId::new("p-1"),
        };
        assert_eq!(err.kind(), ErrorKind::Concurrency);
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_failures_are_not_retryable() {
        let err = OrderError::InsufficientStock {
            product_id: ProductId::new("p-1"),
            name: "Mug".to_string(),
            requested: 3,
            available: 1,
        };
        assert_eq!(err.kind(), ErrorKind::Catalog);
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("requested 3, available 1"));
    }

    #[test]
    fn test_store_error_converts() {
        let err: OrderError = StoreError::Backend("disk full".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(err.to_string(), "Store backend error: disk full");
    }
}
