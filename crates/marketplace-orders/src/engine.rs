//! The order-commit engine.
//!
//! ```text
//! submit_checkout
//!   ├─ validate request            (no store access)
//!   ├─ idempotency pre-check       (replay short-circuits here)
//!   ├─ prepare                     (read-only)
//!   │    price cart → coupon → shipping → assemble
//!   └─ commit                      (one transaction, bounded by commit_timeout)
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cart::{evaluate_coupon, normalize_code, validate_and_price, CartLine};
use crate::catalog::{AdjustmentReason, StockAdjustment, Vendor};
use crate::checkout::{
    Address, AssembledOrder, AssemblyInput, CheckoutReceipt, CommissionStatus, Order, OrderAssembler,
    PaymentMethod, ShippingRateResolver, ShippingRequest, ShippingSpeed, VendorShippingConfig,
};
use crate::commit::{
    commit_assembled_order, Buyer, CommerceStore, CommitOutcome, IdempotencyKey, OrderTransaction,
};
use crate::config::EngineConfig;
use crate::error::{OrderError, StoreError, UniqueConstraint};
use crate::fulfillment::{restore_order_stock, OrderStatus, SubOrderStatus};
use crate::ids::{OrderId, VendorId};
use crate::notify::{publish, NotificationSink, OrderEvent, TracingSink};

/// A checkout submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    pub buyer: Buyer,
    pub shipping_address: Address,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub shipping_speed: ShippingSpeed,
    /// Opaque retry token, usually from an `Idempotency-Key` header.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl CheckoutRequest {
    pub fn new(buyer: Buyer, shipping_address: Address, items: Vec<CartLine>) -> Self {
        Self {
            items,
            buyer,
            shipping_address,
            payment_method: PaymentMethod::default(),
            coupon_code: None,
            shipping_speed: ShippingSpeed::default(),
            idempotency_key: None,
        }
    }

    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.coupon_code = Some(code.into());
        self
    }

    pub fn with_speed(mut self, speed: ShippingSpeed) -> Self {
        self.shipping_speed = speed;
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// A fully priced order that has not been committed yet.
#[derive(Debug, Clone)]
pub struct PreparedCheckout {
    assembled: AssembledOrder,
}

impl PreparedCheckout {
    /// The order as it will be written.
    pub fn order(&self) -> &Order {
        &self.assembled.order
    }
}

/// Multi-vendor checkout and order lifecycle over a [`CommerceStore`].
pub struct CheckoutEngine<S: CommerceStore> {
    store: Arc<S>,
    notifier: Arc<dyn NotificationSink>,
    config: EngineConfig,
    shipping: ShippingRateResolver,
    assembler: OrderAssembler,
}

impl<S: CommerceStore> Clone for CheckoutEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            config: self.config.clone(),
            shipping: self.shipping.clone(),
            assembler: self.assembler.clone(),
        }
    }
}

impl<S: CommerceStore> CheckoutEngine<S> {
    /// Create an engine that logs its events.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    pub fn with_shared_store(store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            store,
            notifier: Arc::new(TracingSink),
            shipping: ShippingRateResolver::new(config.currency, config.shipping.clone()),
            assembler: OrderAssembler::new(
                config.tax_rate_percent,
                config.default_commission_rate,
                config.order_number_prefix.clone(),
            ),
            config,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate, price and commit a checkout.
    ///
    /// A request whose `(scope, key)` already produced an order returns that
    /// order's receipt with `replay = true` and touches nothing.
    #[instrument(skip(self, request), fields(scope = %request.buyer.scope(), lines = request.items.len()))]
    pub async fn submit_checkout(&self, request: CheckoutRequest) -> Result<CheckoutReceipt, OrderError> {
        let key = self.validate_request(&request)?;

        if let Some(key) = &key {
            let scope = request.buyer.scope();
            if let Some(existing) = self.store.find_by_idempotency(&scope, key).await? {
                info!(order_id = %existing.id, key = %key, "idempotent replay");
                return Ok(CheckoutReceipt::from_order(&existing, true));
            }
        }

        let prepared = self.prepare_validated(request, key).await?;
        self.commit(prepared).await
    }

    /// Validate and price a checkout without writing anything.
    #[instrument(skip(self, request), fields(scope = %request.buyer.scope()))]
    pub async fn prepare(&self, request: CheckoutRequest) -> Result<PreparedCheckout, OrderError> {
        let key = self.validate_request(&request)?;
        self.prepare_validated(request, key).await
    }

    /// Commit a prepared checkout in one transaction.
    #[instrument(skip_all, fields(order_id = %prepared.order().id))]
    pub async fn commit(&self, prepared: PreparedCheckout) -> Result<CheckoutReceipt, OrderError> {
        let assembled = &prepared.assembled;
        let threshold = self.config.default_low_stock_threshold;

        let result = self
            .bounded(async {
                let tx = self.store.begin().await?;
                commit_assembled_order(tx, assembled, threshold, Utc::now()).await
            })
            .await;

        match result {
            Ok(CommitOutcome::Committed(order)) => {
                info!(
                    order_number = %order.order_number,
                    vendors = order.sub_orders.len(),
                    total = %order.total,
                    "order committed"
                );
                publish(
                    self.notifier.as_ref(),
                    OrderEvent::OrderPlaced {
                        order_id: order.id.clone(),
                        order_number: order.order_number.clone(),
                        vendors: order.sub_orders.iter().map(|s| s.vendor_id.clone()).collect(),
                        total: order.total,
                    },
                )
                .await;
                Ok(CheckoutReceipt::from_order(&order, false))
            }
            Ok(CommitOutcome::Replayed(order)) => {
                info!(existing_order_id = %order.id, "idempotent replay inside transaction");
                Ok(CheckoutReceipt::from_order(&order, true))
            }
            Err(OrderError::Store(StoreError::UniqueViolation {
                constraint: UniqueConstraint::IdempotencyKey,
            })) => self.replay_after_violation(&assembled.order).await,
            Err(err) => {
                if err.is_retryable() {
                    warn!(error = %err, "checkout commit aborted");
                }
                Err(err)
            }
        }
    }

    /// Move one vendor's sub-order to `next`.
    #[instrument(skip(self, next), fields(next = next.as_str()))]
    pub async fn advance_sub_order_status(
        &self,
        order_id: &OrderId,
        vendor_id: &VendorId,
        next: SubOrderStatus,
    ) -> Result<Order, OrderError> {
        let (order, previous) = self
            .bounded(async {
                let mut tx = self.store.begin().await?;
                let mut order = load_order(tx.as_mut(), order_id).await?;
                let previous = order.advance_sub_order(vendor_id, next, Utc::now())?;
                if next == SubOrderStatus::Cancelled {
                    tx.set_commission_status(order_id, vendor_id, CommissionStatus::Cancelled)
                        .await?;
                }
                let order = save_order(tx.as_mut(), order).await?;
                tx.commit().await?;
                Ok::<_, OrderError>((order, previous))
            })
            .await?;

        info!(
            from = previous.as_str(),
            order_status = order.status.as_str(),
            "sub-order status changed"
        );
        publish(
            self.notifier.as_ref(),
            OrderEvent::SubOrderStatusChanged {
                order_id: order.id.clone(),
                vendor_id: vendor_id.clone(),
                from: previous,
                to: next,
            },
        )
        .await;
        Ok(order)
    }

    /// Customer cancellation before shipment.
    ///
    /// Every live sub-order is cancelled, commissions are voided and stock is
    /// restored, all in one transaction.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, OrderError> {
        let threshold = self.config.default_low_stock_threshold;
        let (order, adjustments) = self
            .bounded(async {
                let mut tx = self.store.begin().await?;
                let mut order = load_order(tx.as_mut(), order_id).await?;
                let now = Utc::now();
                order.cancel_by_customer(now)?;

                for sub_order in &order.sub_orders {
                    tx.set_commission_status(order_id, &sub_order.vendor_id, CommissionStatus::Cancelled)
                        .await?;
                }

                let adjustments = if order.stock_restored_at.is_none() {
                    let adjustments =
                        restore_order_stock(tx.as_mut(), &order, AdjustmentReason::Cancellation, threshold, now)
                            .await?;
                    order.stock_restored_at = Some(now);
                    adjustments
                } else {
                    Vec::new()
                };

                let order = save_order(tx.as_mut(), order).await?;
                tx.commit().await?;
                Ok::<_, OrderError>((order, adjustments))
            })
            .await?;

        info!(order_number = %order.order_number, restored_lines = adjustments.len(), "order cancelled");
        publish(
            self.notifier.as_ref(),
            OrderEvent::OrderCancelled {
                order_id: order.id.clone(),
                order_number: order.order_number.clone(),
            },
        )
        .await;
        if !adjustments.is_empty() {
            self.publish_reconciled(&order.id, &adjustments).await;
        }
        Ok(order)
    }

    /// Put back the stock of a cancelled or returned order.
    ///
    /// Fails with [`OrderError::AlreadyReconciled`] on a second call.
    #[instrument(skip(self))]
    pub async fn reconcile_stock_for_cancelled_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<StockAdjustment>, OrderError> {
        let threshold = self.config.default_low_stock_threshold;
        let adjustments = self
            .bounded(async {
                let mut tx = self.store.begin().await?;
                let mut order = load_order(tx.as_mut(), order_id).await?;
                if !order.status.allows_stock_restore() {
                    return Err(OrderError::NotCancelled(order.id));
                }
                if order.stock_restored_at.is_some() {
                    return Err(OrderError::AlreadyReconciled(order.id));
                }

                let reason = if order.status == OrderStatus::Returned {
                    AdjustmentReason::Return
                } else {
                    AdjustmentReason::Cancellation
                };
                let now = Utc::now();
                let adjustments = restore_order_stock(tx.as_mut(), &order, reason, threshold, now).await?;
                order.stock_restored_at = Some(now);
                order.updated_at = now;
                save_order(tx.as_mut(), order).await?;
                tx.commit().await?;
                Ok::<_, OrderError>(adjustments)
            })
            .await?;

        info!(restored_lines = adjustments.len(), "stock reconciled");
        self.publish_reconciled(order_id, &adjustments).await;
        Ok(adjustments)
    }

    /// Read an order.
    pub async fn order(&self, order_id: &OrderId) -> Result<Order, OrderError> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    fn validate_request(&self, request: &CheckoutRequest) -> Result<Option<IdempotencyKey>, OrderError> {
        if request.items.is_empty() {
            return Err(OrderError::Validation("cart is empty".to_string()));
        }
        if request.items.len() > self.config.max_line_items {
            return Err(OrderError::Validation(format!(
                "cart has {} lines, at most {} are allowed",
                request.items.len(),
                self.config.max_line_items
            )));
        }
        if let Some(line) = request
            .items
            .iter()
            .find(|l| l.quantity < 1 || l.quantity > self.config.max_quantity_per_item)
        {
            return Err(OrderError::Validation(format!(
                "quantity for {} must be between 1 and {}, got {}",
                line.product_id, self.config.max_quantity_per_item, line.quantity
            )));
        }

        let missing = request.shipping_address.missing_fields();
        if !missing.is_empty() {
            return Err(OrderError::Validation(format!(
                "shipping address is missing: {}",
                missing.join(", ")
            )));
        }

        if let Some(contact) = request.buyer.guest_contact() {
            if contact.name.trim().is_empty() || !contact.has_contact() {
                return Err(OrderError::Validation(
                    "guest checkout needs a name and an email or phone".to_string(),
                ));
            }
        }

        IdempotencyKey::parse(request.idempotency_key.as_deref())
    }

    async fn prepare_validated(
        &self,
        request: CheckoutRequest,
        idempotency_key: Option<IdempotencyKey>,
    ) -> Result<PreparedCheckout, OrderError> {
        let now = Utc::now();
        let cart = validate_and_price(self.store.as_ref(), &request.items, self.config.currency).await?;
        let groups = cart.vendor_groups();

        let vendors: HashMap<VendorId, Vendor> = try_join_all(
            groups
                .iter()
                .map(|group| self.store.get_vendor(&group.vendor_id)),
        )
        .await?
        .into_iter()
        .flatten()
        .map(|vendor| (vendor.id.clone(), vendor))
        .collect();

        let coupon = match request.coupon_code.as_deref().map(normalize_code) {
            Some(code) if !code.is_empty() => {
                let found = self.store.find_active_coupon(&code).await?;
                Some(evaluate_coupon(&code, found.as_ref(), cart.subtotal, now)?)
            }
            _ => None,
        };

        let default_shipping = VendorShippingConfig::default();
        let requests: Vec<ShippingRequest<'_>> = groups
            .iter()
            .map(|group| ShippingRequest {
                vendor_id: &group.vendor_id,
                subtotal: group.subtotal,
                config: vendors
                    .get(&group.vendor_id)
                    .map(|v| &v.shipping)
                    .unwrap_or(&default_shipping),
            })
            .collect();
        let freeship = coupon.as_ref().is_some_and(|c| c.waives_shipping());
        let shipping = self
            .shipping
            .resolve(&requests, &request.shipping_address, request.shipping_speed, freeship);

        for group in groups.iter().filter(|g| !vendors.contains_key(&g.vendor_id)) {
            warn!(vendor_id = %group.vendor_id, "vendor not in directory, using defaults");
        }

        let assembled = self.assembler.assemble(
            AssemblyInput {
                cart,
                vendors,
                coupon,
                shipping,
                buyer: request.buyer,
                address: request.shipping_address,
                speed: request.shipping_speed,
                payment_method: request.payment_method,
                idempotency_key,
            },
            now,
        )?;

        debug!(
            subtotal = %assembled.order.subtotal,
            discount = %assembled.order.discount_total,
            shipping = %assembled.order.shipping_total,
            tax = %assembled.order.tax_total,
            total = %assembled.order.total,
            "checkout prepared"
        );
        Ok(PreparedCheckout { assembled })
    }

    /// Another attempt with the same key won the race at commit time.
    async fn replay_after_violation(&self, attempted: &Order) -> Result<CheckoutReceipt, OrderError> {
        let violation = || {
            OrderError::Store(StoreError::UniqueViolation {
                constraint: UniqueConstraint::IdempotencyKey,
            })
        };
        let key = attempted.idempotency_key.as_ref().ok_or_else(violation)?;
        let existing = self
            .store
            .find_by_idempotency(&attempted.idempotency_scope, key)
            .await?
            .ok_or_else(violation)?;

        info!(existing_order_id = %existing.id, key = %key, "concurrent duplicate converted to replay");
        Ok(CheckoutReceipt::from_order(&existing, true))
    }

    async fn publish_reconciled(&self, order_id: &OrderId, adjustments: &[StockAdjustment]) {
        publish(
            self.notifier.as_ref(),
            OrderEvent::StockReconciled {
                order_id: order_id.clone(),
                units: adjustments.iter().map(|a| a.quantity_change).sum(),
            },
        )
        .await;
    }

    /// Bound a unit of work by the commit timeout. Timing out drops the
    /// transaction, which rolls it back.
    async fn bounded<T, F>(&self, work: F) -> Result<T, OrderError>
    where
        F: Future<Output = Result<T, OrderError>>,
    {
        match tokio::time::timeout(self.config.commit_timeout(), work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = self.config.commit_timeout_ms, "transaction timed out");
                Err(OrderError::CommitTimeout(self.config.commit_timeout_ms))
            }
        }
    }
}

async fn load_order(tx: &mut dyn OrderTransaction, order_id: &OrderId) -> Result<Order, OrderError> {
    tx.get_order(order_id)
        .await?
        .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
}

async fn save_order(tx: &mut dyn OrderTransaction, order: Order) -> Result<Order, OrderError> {
    let order_id = order.id.clone();
    tx.update_order(order).await.map_err(|err| match err {
        StoreError::Conflict(_) => OrderError::ConcurrentModification(order_id),
        other => OrderError::Store(other),
    })
}
