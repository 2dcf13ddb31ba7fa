//! Order types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::VariantSelection;
use crate::checkout::{Address, GuestContact, ShippingSpeed};
use crate::commit::{IdempotencyKey, IdempotencyScope};
use crate::error::OrderError;
use crate::fulfillment::{derive_order_status, OrderStatus, SubOrderStatus};
use crate::ids::{CustomerId, OrderId, ProductId, VendorId};
use crate::money::{Currency, Money};

/// How the customer intends to pay. Settlement happens outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CashOnDelivery,
    Card,
    Upi,
    Wallet,
    NetBanking,
}

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// A line of an order; price and names are frozen at commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub vendor_id: VendorId,
    pub name: String,
    pub image_url: Option<String>,
    pub unit_price: Money,
    pub quantity: i64,
    #[serde(default)]
    pub variant: VariantSelection,
}

/// One vendor's share of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VendorSubOrder {
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub items: Vec<OrderLineItem>,
    pub subtotal: Money,
    pub shipping: Money,
    /// Tax on this vendor's own subtotal, for reporting.
    pub tax: Money,
    /// Always zero: coupons apply at order level.
    pub discount: Money,
    pub status: SubOrderStatus,
}

impl VendorSubOrder {
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// A committed multi-vendor order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Internal durable identifier.
    pub id: OrderId,
    /// Human-readable order number.
    pub order_number: String,
    /// `None` for guest checkout.
    pub customer_id: Option<CustomerId>,
    pub guest_contact: Option<GuestContact>,
    pub shipping_address: Address,
    pub shipping_speed: ShippingSpeed,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub sub_orders: Vec<VendorSubOrder>,
    pub currency: Currency,
    pub subtotal: Money,
    pub shipping_total: Money,
    pub tax_total: Money,
    pub discount_total: Money,
    pub coupon_code: Option<String>,
    pub total: Money,
    pub tracking_code: String,
    pub idempotency_scope: IdempotencyScope,
    pub idempotency_key: Option<IdempotencyKey>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Set once stock for this order has been put back.
    pub stock_restored_at: Option<DateTime<Utc>>,
    /// Soft-archive flag; orders are never deleted.
    pub archived: bool,
    /// Bumped on every update; used for optimistic writes.
    pub version: u64,
}

impl Order {
    pub fn sub_order(&self, vendor_id: &VendorId) -> Option<&VendorSubOrder> {
        self.sub_orders.iter().find(|s| &s.vendor_id == vendor_id)
    }

    pub fn items(&self) -> impl Iterator<Item = &OrderLineItem> {
        self.sub_orders.iter().flat_map(|s| s.items.iter())
    }

    pub fn item_count(&self) -> i64 {
        self.sub_orders.iter().map(|s| s.item_count()).sum()
    }

    /// `subtotal - discount + shipping + tax`.
    pub fn expected_total(&self) -> Money {
        self.subtotal - self.discount_total + self.shipping_total + self.tax_total
    }

    /// Move one vendor's sub-order along its lifecycle and re-derive the
    /// order status. Leaves the order untouched on error.
    pub fn advance_sub_order(
        &mut self,
        vendor_id: &VendorId,
        next: SubOrderStatus,
        now: DateTime<Utc>,
    ) -> Result<SubOrderStatus, OrderError> {
        let sub_order = self
            .sub_orders
            .iter_mut()
            .find(|s| &s.vendor_id == vendor_id)
            .ok_or_else(|| OrderError::SubOrderNotFound {
                order_id: self.id.clone(),
                vendor_id: vendor_id.clone(),
            })?;

        let previous = sub_order.status;
        sub_order.status = previous.transition(next)?;
        self.refresh_status(now);
        Ok(previous)
    }

    /// Cancel every sub-order on behalf of the customer. Fails without
    /// changes if any sub-order is past processing.
    pub fn cancel_by_customer(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        if let Some(blocking) = self
            .sub_orders
            .iter()
            .find(|s| !s.status.customer_cancellable() && s.status != SubOrderStatus::Cancelled)
        {
            return Err(OrderError::InvalidTransition {
                from: blocking.status.as_str().to_string(),
                to: SubOrderStatus::Cancelled.as_str().to_string(),
            });
        }
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::InvalidTransition {
                from: OrderStatus::Cancelled.as_str().to_string(),
                to: OrderStatus::Cancelled.as_str().to_string(),
            });
        }

        for sub_order in &mut self.sub_orders {
            if sub_order.status != SubOrderStatus::Cancelled {
                sub_order.status = SubOrderStatus::Cancelled;
            }
        }
        self.refresh_status(now);
        Ok(())
    }

    fn refresh_status(&mut self, now: DateTime<Utc>) {
        if self.status != OrderStatus::Returned {
            let statuses: Vec<SubOrderStatus> = self.sub_orders.iter().map(|s| s.status).collect();
            self.status = derive_order_status(&statuses);
        }
        if self.status == OrderStatus::Cancelled && self.cancelled_at.is_none() {
            self.cancelled_at = Some(now);
        }
        self.updated_at = now;
    }
}

/// What a checkout caller gets back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub order_number: String,
    pub total: Money,
    pub tracking_code: String,
    /// True when an earlier checkout with the same key produced this order.
    pub replay: bool,
}

impl CheckoutReceipt {
    pub fn from_order(order: &Order, replay: bool) -> Self {
        Self {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            total: order.total,
            tracking_code: order.tracking_code.clone(),
            replay,
        }
    }

    /// 201 on first commit, 200 on replay.
    pub fn status_code(&self) -> http::StatusCode {
        if self.replay {
            http::StatusCode::OK
        } else {
            http::StatusCode::CREATED
        }
    }
}
