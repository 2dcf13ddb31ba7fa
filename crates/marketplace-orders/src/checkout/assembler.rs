//! Turns a priced cart into an unsaved order.
//!
//! Tax is charged on `subtotal - discount` at order level. Each sub-order
//! also carries tax on its own subtotal for vendor reporting. The two are
//! computed from different bases and rounded separately, so the sub-order
//! figures need not add up to the order's tax.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::cart::{AppliedCoupon, PricedCart};
use crate::catalog::Vendor;
use crate::checkout::{
    Address, CommissionRecord, Order, OrderLineItem, PaymentMethod, PaymentStatus, ShippingQuote,
    ShippingSpeed, VendorSubOrder,
};
use crate::commit::{Buyer, IdempotencyKey};
use crate::error::OrderError;
use crate::fulfillment::{OrderStatus, SubOrderStatus};
use crate::ids::{generate_order_number, generate_tracking_code, OrderId, ProductId, VendorId};
use crate::money::Money;

/// Everything the assembler needs besides its own settings.
#[derive(Debug, Clone)]
pub struct AssemblyInput {
    pub cart: PricedCart,
    /// Vendors present in the cart, keyed by id.
    pub vendors: HashMap<VendorId, Vendor>,
    pub coupon: Option<AppliedCoupon>,
    pub shipping: Vec<ShippingQuote>,
    pub buyer: Buyer,
    pub address: Address,
    pub speed: ShippingSpeed,
    pub payment_method: PaymentMethod,
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Units one cart line takes from stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReservation {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// An order ready to commit, with its commission split.
#[derive(Debug, Clone)]
pub struct AssembledOrder {
    pub order: Order,
    pub commissions: Vec<CommissionRecord>,
    pub coupon: Option<AppliedCoupon>,
    /// Stock to take, in the order the cart lines were validated.
    pub reservations: Vec<StockReservation>,
}

/// Order assembly settings.
#[derive(Debug, Clone)]
pub struct OrderAssembler {
    tax_rate_percent: f64,
    default_commission_rate: f64,
    order_number_prefix: String,
}

impl OrderAssembler {
    pub fn new(tax_rate_percent: f64, default_commission_rate: f64, order_number_prefix: impl Into<String>) -> Self {
        Self {
            tax_rate_percent,
            default_commission_rate,
            order_number_prefix: order_number_prefix.into(),
        }
    }

    pub fn assemble(&self, input: AssemblyInput, now: DateTime<Utc>) -> Result<AssembledOrder, OrderError> {
        let currency = input.cart.currency;
        let reservations = input
            .cart
            .lines
            .iter()
            .map(|line| StockReservation {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            })
            .collect();
        let zero = Money::zero(currency);
        let order_id = OrderId::generate();

        let mut sub_orders = Vec::new();
        let mut commissions = Vec::new();
        for group in input.cart.vendor_groups() {
            let vendor = input.vendors.get(&group.vendor_id);
            let shipping = input
                .shipping
                .iter()
                .find(|q| q.vendor_id == group.vendor_id)
                .map(|q| q.amount)
                .unwrap_or(zero);
            let rate = vendor
                .and_then(|v| v.commission_rate)
                .unwrap_or(self.default_commission_rate);

            commissions.push(CommissionRecord::compute(
                order_id.clone(),
                group.vendor_id.clone(),
                group.subtotal,
                rate,
                now,
            ));

            sub_orders.push(VendorSubOrder {
                vendor_id: group.vendor_id.clone(),
                vendor_name: vendor
                    .map(|v| v.display_name.clone())
                    .unwrap_or_else(|| group.vendor_id.to_string()),
                items: group
                    .lines
                    .into_iter()
                    .map(|line| OrderLineItem {
                        product_id: line.product_id,
                        vendor_id: line.vendor_id,
                        name: line.name,
                        image_url: line.image_url,
                        unit_price: line.unit_price,
                        quantity: line.quantity,
                        variant: line.variant,
                    })
                    .collect(),
                subtotal: group.subtotal,
                shipping,
                tax: group.subtotal.percentage(self.tax_rate_percent),
                discount: zero,
                status: SubOrderStatus::Pending,
            });
        }

        let subtotal = input.cart.subtotal;
        let sub_total_sum =
            Money::try_sum(sub_orders.iter().map(|s| &s.subtotal), currency).ok_or(OrderError::Overflow)?;
        if sub_total_sum != subtotal {
            return Err(OrderError::Validation(format!(
                "sub-order subtotals add up to {} but the cart subtotal is {}",
                sub_total_sum, subtotal
            )));
        }

        let discount = input.coupon.as_ref().map(|c| c.discount).unwrap_or(zero).min(subtotal);
        let shipping_total =
            Money::try_sum(sub_orders.iter().map(|s| &s.shipping), currency).ok_or(OrderError::Overflow)?;
        let taxable = subtotal.try_subtract(&discount).ok_or(OrderError::Overflow)?.non_negative();
        let tax_total = taxable.percentage(self.tax_rate_percent);
        let total = taxable
            .try_add(&shipping_total)
            .and_then(|t| t.try_add(&tax_total))
            .ok_or(OrderError::Overflow)?;

        let order = Order {
            id: order_id,
            order_number: generate_order_number(&self.order_number_prefix, now),
            customer_id: input.buyer.customer_id().cloned(),
            guest_contact: input.buyer.guest_contact().cloned(),
            shipping_address: input.address,
            shipping_speed: input.speed,
            payment_method: input.payment_method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            sub_orders,
            currency,
            subtotal,
            shipping_total,
            tax_total,
            discount_total: discount,
            coupon_code: input.coupon.as_ref().map(|c| c.code.clone()),
            total,
            tracking_code: generate_tracking_code(),
            idempotency_scope: input.buyer.scope(),
            idempotency_key: input.idempotency_key,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            stock_restored_at: None,
            archived: false,
            version: 0,
        };

        Ok(AssembledOrder {
            order,
            commissions,
            coupon: input.coupon,
            reservations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CouponKind, PricedLine};
    use crate::catalog::VariantSelection;
    use crate::checkout::ShippingSource;
    use crate::ids::CouponId;
    use crate::money::Currency;

    fn inr(v: f64) -> Money {
        Money::from_decimal(v, Currency::INR)
    }

    fn line(product: &str, vendor: &str, price: f64, qty: i64) -> PricedLine {
        PricedLine {
            product_id: ProductId::new(product),
            vendor_id: VendorId::new(vendor),
            name: product.to_string(),
            image_url: None,
            variant: VariantSelection::none(),
            unit_price: inr(price),
            quantity: qty,
            line_total: inr(price * qty as f64),
        }
    }

    fn quote(vendor: &str, amount: f64) -> ShippingQuote {
        ShippingQuote {
            vendor_id: VendorId::new(vendor),
            amount: inr(amount),
            source: ShippingSource::GlobalFallback,
            threshold_waived: false,
        }
    }

    fn input(coupon: Option<AppliedCoupon>) -> AssemblyInput {
        let lines = vec![line("a", "v-1", 333.33, 1), line("b", "v-2", 666.67, 1), line("c", "v-1", 100.0, 2)];
        let vendors = [
            Vendor::new("v-1", "Loom House").with_commission_rate(12.0),
            Vendor::new("v-2", "Clay Co"),
        ]
        .into_iter()
        .map(|v| (v.id.clone(), v))
        .collect();
        AssemblyInput {
            cart: PricedCart {
                lines,
                subtotal: inr(1200.0),
                currency: Currency::INR,
            },
            vendors,
            coupon,
            shipping: vec![quote("v-1", 49.0), quote("v-2", 0.0)],
            buyer: Buyer::customer("c-1"),
            address: Address::new("Asha", "Rao", "12 MG Road", "Bengaluru", "India", "IN", "560001"),
            speed: ShippingSpeed::Standard,
            payment_method: PaymentMethod::CashOnDelivery,
            idempotency_key: None,
        }
    }

    fn assembler() -> OrderAssembler {
        OrderAssembler::new(18.0, 10.0, "ORD")
    }

    #[test]
    fn test_groups_and_totals() {
        let assembled = assembler().assemble(input(None), Utc::now()).unwrap();
        let order = &assembled.order;

        assert_eq!(order.sub_orders.len(), 2);
        assert_eq!(order.sub_orders[0].vendor_name, "Loom House");
        assert_eq!(order.sub_orders[0].subtotal, inr(533.33));
        assert_eq!(order.sub_orders[1].subtotal, inr(666.67));
        assert_eq!(order.shipping_total, inr(49.0));
        assert_eq!(order.tax_total, inr(216.0));
        assert_eq!(order.total, order.expected_total());
        assert_eq!(order.total, inr(1200.0 + 49.0 + 216.0));
        assert!(order.order_number.starts_with("ORD-"));
        assert!(order.sub_orders.iter().all(|s| s.discount.is_zero()));

        let reserved: Vec<&str> = assembled.reservations.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(reserved, ["a", "b", "c"]);
    }

    #[test]
    fn test_tax_on_discounted_subtotal() {
        let coupon = AppliedCoupon {
            coupon_id: CouponId::new("cp-1"),
            code: "SAVE200".to_string(),
            kind: CouponKind::Fixed,
            discount: inr(200.0),
        };
        let order = assembler().assemble(input(Some(coupon)), Utc::now()).unwrap().order;
        assert_eq!(order.discount_total, inr(200.0));
        assert_eq!(order.tax_total, inr(180.0));
        assert_eq!(order.total, inr(1000.0 + 49.0 + 180.0));
        assert_eq!(order.coupon_code.as_deref(), Some("SAVE200"));
    }

    #[test]
    fn test_vendor_tax_is_independent_of_order_tax() {
        let order = assembler().assemble(input(None), Utc::now()).unwrap().order;
        // 533.33 * 18% = 95.9994 -> 96.00, 666.67 * 18% = 120.0006 -> 120.00
        assert_eq!(order.sub_orders[0].tax, inr(96.0));
        assert_eq!(order.sub_orders[1].tax, inr(120.0));
        assert_eq!(order.tax_total, inr(216.0));
    }

    #[test]
    fn test_commission_uses_vendor_rate_or_default() {
        let assembled = assembler().assemble(input(None), Utc::now()).unwrap();
        assert_eq!(assembled.commissions.len(), 2);
        assert_eq!(assembled.commissions[0].commission_rate, 12.0);
        assert_eq!(assembled.commissions[0].commission, inr(64.0));
        assert_eq!(assembled.commissions[1].commission_rate, 10.0);
        assert_eq!(assembled.commissions[1].commission, inr(66.67));
        assert!(assembled
            .commissions
            .iter()
            .all(|c| c.order_id == assembled.order.id));
    }

    #[test]
    fn test_mismatched_subtotal_rejected() {
        let mut bad = input(None);
        bad.cart.subtotal = inr(1.0);
        assert!(matches!(
            assembler().assemble(bad, Utc::now()),
            Err(OrderError::Validation(_))
        ));
    }
}
