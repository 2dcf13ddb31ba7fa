//! Storage seams used by the engine.
//!
//! Reads go through the per-collaborator traits. Every write goes through
//! an [`OrderTransaction`] obtained from [`OrderStore::begin`], so one
//! commit spans orders, stock, commissions and coupon usage.

use async_trait::async_trait;

use crate::cart::Coupon;
use crate::catalog::{Product, StockAdjustment, StockLevel, StockStatus, Vendor};
use crate::checkout::{CommissionRecord, CommissionStatus, Order};
use crate::commit::{IdempotencyKey, IdempotencyScope};
use crate::error::StoreError;
use crate::ids::{CouponId, OrderId, ProductId, VendorId};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Product lookups.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_product(&self, id: &ProductId) -> StoreResult<Option<Product>>;
}

/// Vendor lookups.
#[async_trait]
pub trait VendorDirectory: Send + Sync {
    async fn get_vendor(&self, id: &VendorId) -> StoreResult<Option<Vendor>>;
}

/// Coupon lookups.
#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Find a coupon by normalized code. Inactive coupons are returned too,
    /// the evaluator decides what to do with them.
    async fn find_active_coupon(&self, code: &str) -> StoreResult<Option<Coupon>>;
}

/// Order reads and the transaction entry point.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, id: &OrderId) -> StoreResult<Option<Order>>;

    async fn find_by_idempotency(
        &self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
    ) -> StoreResult<Option<Order>>;

    async fn commissions_for_order(&self, id: &OrderId) -> StoreResult<Vec<CommissionRecord>>;

    /// Open a unit of work. Nothing is visible to other readers until
    /// [`OrderTransaction::commit`] succeeds.
    async fn begin(&self) -> StoreResult<Box<dyn OrderTransaction>>;
}

/// Explicit unit of work. Dropping it without committing rolls back.
#[async_trait]
pub trait OrderTransaction: Send {
    /// Idempotency lookup that sees this transaction's own writes.
    async fn find_by_idempotency(
        &mut self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
    ) -> StoreResult<Option<Order>>;

    async fn get_order(&mut self, id: &OrderId) -> StoreResult<Option<Order>>;

    /// Insert a new order. Fails with [`StoreError::UniqueViolation`] when
    /// the id, order number or `(scope, key)` pair already exists; a rejected
    /// insert writes nothing and leaves the transaction usable.
    async fn insert_order(&mut self, order: Order) -> StoreResult<()>;

    /// Replace an order, provided its stored version still equals
    /// `order.version`. The stored copy gets `version + 1`.
    async fn update_order(&mut self, order: Order) -> StoreResult<Order>;

    /// Decrement stock only if at least `quantity` units remain and the
    /// product is not flagged out of stock. `None` means the condition
    /// did not hold and nothing was written.
    async fn conditional_decrement_stock(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> StoreResult<Option<StockLevel>>;

    /// Add units back unconditionally.
    async fn restock(&mut self, product_id: &ProductId, quantity: i64) -> StoreResult<StockLevel>;

    async fn set_stock_status(&mut self, product_id: &ProductId, status: StockStatus) -> StoreResult<()>;

    async fn record_stock_adjustment(&mut self, adjustment: StockAdjustment) -> StoreResult<()>;

    async fn insert_commissions(&mut self, records: Vec<CommissionRecord>) -> StoreResult<()>;

    /// Set the status of one vendor's commission records on an order.
    async fn set_commission_status(
        &mut self,
        order_id: &OrderId,
        vendor_id: &VendorId,
        status: CommissionStatus,
    ) -> StoreResult<u64>;

    async fn increment_coupon_usage(&mut self, coupon_id: &CouponId) -> StoreResult<()>;

    /// Make every write visible at once, or none of them.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Everything the engine needs from its backing store.
pub trait CommerceStore: CatalogStore + VendorDirectory + CouponStore + OrderStore {}

impl<T> CommerceStore for T where T: CatalogStore + VendorDirectory + CouponStore + OrderStore {}
