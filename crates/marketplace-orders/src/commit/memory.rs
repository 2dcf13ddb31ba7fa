//! In-process store backend.
//!
//! A transaction holds the store lock from `begin` until it is committed or
//! dropped, and writes into a private copy of the state. Commit swaps the
//! copy in; drop discards it. Transactions are therefore serializable and
//! every conditional write sees the latest committed stock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::cart::{normalize_code, Coupon};
use crate::catalog::{Product, StockAdjustment, StockLevel, StockStatus, Vendor};
use crate::checkout::{CommissionRecord, CommissionStatus, Order};
use crate::commit::store::{
    CatalogStore, CouponStore, OrderStore, OrderTransaction, StoreResult, VendorDirectory,
};
use crate::commit::{IdempotencyKey, IdempotencyScope};
use crate::error::{StoreError, UniqueConstraint};
use crate::ids::{CouponId, OrderId, ProductId, VendorId};

#[derive(Debug, Clone, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    vendors: HashMap<VendorId, Vendor>,
    /// Keyed by normalized code.
    coupons: HashMap<String, Coupon>,
    orders: HashMap<OrderId, Order>,
    idempotency: HashMap<(IdempotencyScope, IdempotencyKey), OrderId>,
    order_numbers: HashMap<String, OrderId>,
    commissions: Vec<CommissionRecord>,
    adjustments: Vec<StockAdjustment>,
}

impl State {
    fn find_by_idempotency(&self, scope: &IdempotencyScope, key: &IdempotencyKey) -> Option<Order> {
        self.idempotency
            .get(&(scope.clone(), key.clone()))
            .and_then(|id| self.orders.get(id))
            .cloned()
    }

    fn product_mut(&mut self, id: &ProductId) -> StoreResult<&mut Product> {
        self.products
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("product {}", id)))
    }
}

/// In-memory [`CommerceStore`](crate::commit::CommerceStore).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id.clone(), product);
    }

    pub async fn put_vendor(&self, vendor: Vendor) {
        self.state.lock().await.vendors.insert(vendor.id.clone(), vendor);
    }

    pub async fn put_coupon(&self, coupon: Coupon) {
        self.state
            .lock()
            .await
            .coupons
            .insert(normalize_code(&coupon.code), coupon);
    }

    pub async fn product(&self, id: &ProductId) -> Option<Product> {
        self.state.lock().await.products.get(id).cloned()
    }

    /// Delist a product, as an admin would between pricing and commit.
    pub async fn remove_product(&self, id: &ProductId) -> Option<Product> {
        self.state.lock().await.products.remove(id)
    }

    pub async fn coupon(&self, code: &str) -> Option<Coupon> {
        self.state.lock().await.coupons.get(&normalize_code(code)).cloned()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.values().cloned().collect()
    }

    /// Stock adjustments recorded for one product, oldest first.
    pub async fn adjustments_for(&self, id: &ProductId) -> Vec<StockAdjustment> {
        self.state
            .lock()
            .await
            .adjustments
            .iter()
            .filter(|a| &a.product_id == id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_product(&self, id: &ProductId) -> StoreResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(id).cloned())
    }
}

#[async_trait]
impl VendorDirectory for MemoryStore {
    async fn get_vendor(&self, id: &VendorId) -> StoreResult<Option<Vendor>> {
        Ok(self.state.lock().await.vendors.get(id).cloned())
    }
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn find_active_coupon(&self, code: &str) -> StoreResult<Option<Coupon>> {
        Ok(self.state.lock().await.coupons.get(&normalize_code(code)).cloned())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn get_order(&self, id: &OrderId) -> StoreResult<Option<Order>> {
        Ok(self.state.lock().await.orders.get(id).cloned())
    }

    async fn find_by_idempotency(
        &self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
    ) -> StoreResult<Option<Order>> {
        Ok(self.state.lock().await.find_by_idempotency(scope, key))
    }

    async fn commissions_for_order(&self, id: &OrderId) -> StoreResult<Vec<CommissionRecord>> {
        Ok(self
            .state
            .lock()
            .await
            .commissions
            .iter()
            .filter(|c| &c.order_id == id)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> StoreResult<Box<dyn OrderTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = State::clone(&guard);
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

/// Transaction over a [`MemoryStore`].
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<State>,
    working: State,
}

#[async_trait]
impl OrderTransaction for MemoryTransaction {
    async fn find_by_idempotency(
        &mut self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
    ) -> StoreResult<Option<Order>> {
        Ok(self.working.find_by_idempotency(scope, key))
    }

    async fn get_order(&mut self, id: &OrderId) -> StoreResult<Option<Order>> {
        Ok(self.working.orders.get(id).cloned())
    }

    async fn insert_order(&mut self, order: Order) -> StoreResult<()> {
        if self.working.orders.contains_key(&order.id) {
            return Err(StoreError::UniqueViolation {
                constraint: UniqueConstraint::OrderId,
            });
        }
        if self.working.order_numbers.contains_key(&order.order_number) {
            return Err(StoreError::UniqueViolation {
                constraint: UniqueConstraint::OrderNumber,
            });
        }
        if let Some(key) = &order.idempotency_key {
            let pair = (order.idempotency_scope.clone(), key.clone());
            if self.working.idempotency.contains_key(&pair) {
                return Err(StoreError::UniqueViolation {
                    constraint: UniqueConstraint::IdempotencyKey,
                });
            }
            self.working.idempotency.insert(pair, order.id.clone());
        }
        self.working
            .order_numbers
            .insert(order.order_number.clone(), order.id.clone());
        self.working.orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn update_order(&mut self, mut order: Order) -> StoreResult<Order> {
        let stored = self
            .working
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| StoreError::NotFound(format!("order {}", order.id)))?;
        if stored.version != order.version {
            return Err(StoreError::Conflict(format!(
                "order {} is at version {}, update was based on {}",
                order.id, stored.version, order.version
            )));
        }
        order.version += 1;
        *stored = order.clone();
        Ok(order)
    }

    async fn conditional_decrement_stock(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> StoreResult<Option<StockLevel>> {
        let product = self.working.product_mut(product_id)?;
        if product.stock_quantity < quantity || product.stock_status == StockStatus::OutOfStock {
            return Ok(None);
        }
        product.stock_quantity -= quantity;
        Ok(Some(StockLevel {
            quantity: product.stock_quantity,
            low_stock_threshold: product.low_stock_threshold,
        }))
    }

    async fn restock(&mut self, product_id: &ProductId, quantity: i64) -> StoreResult<StockLevel> {
        let product = self.working.product_mut(product_id)?;
        product.stock_quantity = product
            .stock_quantity
            .checked_add(quantity)
            .ok_or_else(|| StoreError::Backend(format!("stock overflow for product {}", product_id)))?;
        Ok(StockLevel {
            quantity: product.stock_quantity,
            low_stock_threshold: product.low_stock_threshold,
        })
    }

    async fn set_stock_status(&mut self, product_id: &ProductId, status: StockStatus) -> StoreResult<()> {
        self.working.product_mut(product_id)?.stock_status = status;
        Ok(())
    }

    async fn record_stock_adjustment(&mut self, adjustment: StockAdjustment) -> StoreResult<()> {
        self.working.adjustments.push(adjustment);
        Ok(())
    }

    async fn insert_commissions(&mut self, records: Vec<CommissionRecord>) -> StoreResult<()> {
        self.working.commissions.extend(records);
        Ok(())
    }

    async fn set_commission_status(
        &mut self,
        order_id: &OrderId,
        vendor_id: &VendorId,
        status: CommissionStatus,
    ) -> StoreResult<u64> {
        let mut updated = 0;
        for record in self
            .working
            .commissions
            .iter_mut()
            .filter(|c| &c.order_id == order_id && &c.vendor_id == vendor_id)
        {
            record.status = status;
            updated += 1;
        }
        Ok(updated)
    }

    async fn increment_coupon_usage(&mut self, coupon_id: &CouponId) -> StoreResult<()> {
        let coupon = self
            .working
            .coupons
            .values_mut()
            .find(|c| &c.id == coupon_id)
            .ok_or_else(|| StoreError::NotFound(format!("coupon {}", coupon_id)))?;
        if coupon.is_exhausted() {
            return Err(StoreError::Conflict(format!(
                "coupon {} reached its usage limit",
                coupon.code
            )));
        }
        coupon.used_count += 1;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
