//! Coupon definitions and evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::ids::CouponId;
use crate::money::Money;

/// Kind of coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponKind {
    /// `value` percent off the subtotal, optionally capped.
    Percentage,
    /// `value` off the subtotal.
    Fixed,
    /// Waives shipping for every vendor; no monetary discount.
    Freeship,
}

/// A coupon as stored in the coupon store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    pub id: CouponId,
    /// Code as entered by customers; matched case-insensitively.
    pub code: String,
    pub kind: CouponKind,
    /// Percent for [`CouponKind::Percentage`], major units for [`CouponKind::Fixed`].
    pub value: f64,
    #[serde(default)]
    pub min_order_value: Option<Money>,
    /// Cap on a percentage discount.
    #[serde(default)]
    pub max_discount: Option<Money>,
    #[serde(default)]
    pub usage_limit: Option<i64>,
    pub used_count: i64,
    pub active: bool,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Coupon {
    fn base(code: &str, kind: CouponKind, value: f64) -> Self {
        Self {
            id: CouponId::generate(),
            code: normalize_code(code),
            kind,
            value,
            min_order_value: None,
            max_discount: None,
            usage_limit: None,
            used_count: 0,
            active: true,
            starts_at: None,
            expires_at: None,
        }
    }

    pub fn percentage(code: &str, percent: f64) -> Self {
        Self::base(code, CouponKind::Percentage, percent)
    }

    pub fn fixed(code: &str, amount: f64) -> Self {
        Self::base(code, CouponKind::Fixed, amount)
    }

    pub fn freeship(code: &str) -> Self {
        Self::base(code, CouponKind::Freeship, 0.0)
    }

    pub fn with_max_discount(mut self, cap: Money) -> Self {
        self.max_discount = Some(cap);
        self
    }

    pub fn with_min_order(mut self, min: Money) -> Self {
        self.min_order_value = Some(min);
        self
    }

    pub fn with_usage_limit(mut self, limit: i64) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    pub fn with_window(mut self, starts_at: Option<DateTime<Utc>>, expires_at: Option<DateTime<Utc>>) -> Self {
        self.starts_at = starts_at;
        self.expires_at = expires_at;
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.usage_limit.is_some_and(|limit| self.used_count >= limit)
    }
}

/// Canonical form used for lookups.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// A coupon accepted for an order.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedCoupon {
    pub coupon_id: CouponId,
    pub code: String,
    pub kind: CouponKind,
    /// Monetary discount; zero for freeship.
    pub discount: Money,
}

impl AppliedCoupon {
    pub fn waives_shipping(&self) -> bool {
        self.kind == CouponKind::Freeship
    }
}

/// Validate `coupon` against `subtotal` at `now` and compute its discount.
///
/// `coupon` is `None` when the store has no active coupon for `code`.
/// Rules are checked in order: exists and active, inside the window, under
/// the usage limit, amounts in the cart's currency, minimum order met.
pub fn evaluate_coupon(
    code: &str,
    coupon: Option<&Coupon>,
    subtotal: Money,
    now: DateTime<Utc>,
) -> Result<AppliedCoupon, OrderError> {
    let code = normalize_code(code);
    let coupon = match coupon {
        Some(c) if c.active => c,
        _ => {
            return Err(OrderError::InvalidCoupon {
                code,
                reason: "code does not exist or is not active".to_string(),
            })
        }
    };

    if coupon.starts_at.is_some_and(|starts| now < starts) {
        return Err(OrderError::InvalidCoupon {
            code,
            reason: "coupon is not active yet".to_string(),
        });
    }
    if coupon.expires_at.is_some_and(|expires| now > expires) {
        return Err(OrderError::CouponExpired(code));
    }
    if coupon.is_exhausted() {
        return Err(OrderError::CouponLimitReached(code));
    }
    if let Some(foreign) = [coupon.min_order_value, coupon.max_discount]
        .into_iter()
        .flatten()
        .find(|m| m.currency != subtotal.currency)
    {
        return Err(OrderError::InvalidCoupon {
            code,
            reason: format!(
                "coupon amounts are in {}, cart is in {}",
                foreign.currency, subtotal.currency
            ),
        });
    }
    if let Some(min) = coupon.min_order_value {
        if subtotal < min {
            return Err(OrderError::MinOrderNotMet {
                code,
                minimum: min.display(),
                subtotal: subtotal.display(),
            });
        }
    }

    let discount = match coupon.kind {
        CouponKind::Percentage => {
            let raw = subtotal.percentage(coupon.value);
            match coupon.max_discount {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
        // Never more than the subtotal, so totals stay non-negative.
        CouponKind::Fixed => Money::from_decimal(coupon.value, subtotal.currency).min(subtotal),
        CouponKind::Freeship => Money::zero(subtotal.currency),
    };

    Ok(AppliedCoupon {
        coupon_id: coupon.id.clone(),
        code,
        kind: coupon.kind,
        discount: discount.non_negative(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use chrono::Duration;

    fn inr(v: f64) -> Money {
        Money::from_decimal(v, Currency::INR)
    }

    #[test]
    fn test_percentage_capped() {
        let coupon = Coupon::percentage("save20", 20.0).with_max_discount(inr(150.0));
        let applied = evaluate_coupon("SAVE20", Some(&coupon), inr(1000.0), Utc::now()).unwrap();
        assert_eq!(applied.discount, inr(150.0));
        assert_eq!(applied.code, "SAVE20");
    }

    #[test]
    fn test_percentage_uncapped() {
        let coupon = Coupon::percentage("SAVE20", 20.0);
        let applied = evaluate_coupon("save20", Some(&coupon), inr(1000.0), Utc::now()).unwrap();
        assert_eq!(applied.discount, inr(200.0));
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let coupon = Coupon::fixed("FLAT100", 100.0);
        let applied = evaluate_coupon("FLAT100", Some(&coupon), inr(1000.0), Utc::now()).unwrap();
        assert_eq!(applied.discount, inr(100.0));

        let applied = evaluate_coupon("FLAT100", Some(&coupon), inr(60.0), Utc::now()).unwrap();
        assert_eq!(applied.discount, inr(60.0));
    }

    #[test]
    fn test_freeship_has_no_monetary_discount() {
        let coupon = Coupon::freeship("SHIPFREE");
        let applied = evaluate_coupon("SHIPFREE", Some(&coupon), inr(10.0), Utc::now()).unwrap();
        assert!(applied.discount.is_zero());
        assert!(applied.waives_shipping());
    }

    #[test]
    fn test_missing_or_inactive() {
        let err = evaluate_coupon("NOPE", None, inr(10.0), Utc::now()).unwrap_err();
        assert!(matches!(err, OrderError::InvalidCoupon { .. }));

        let mut coupon = Coupon::fixed("OFF", 5.0);
        coupon.active = false;
        let err = evaluate_coupon("OFF", Some(&coupon), inr(10.0), Utc::now()).unwrap_err();
        assert!(matches!(err, OrderError::InvalidCoupon { .. }));
    }

    #[test]
    fn test_window() {
        let now = Utc::now();
        let future = Coupon::fixed("SOON", 5.0).with_window(Some(now + Duration::days(1)), None);
        assert!(matches!(
            evaluate_coupon("SOON", Some(&future), inr(10.0), now),
            Err(OrderError::InvalidCoupon { .. })
        ));

        let past = Coupon::fixed("OLD", 5.0).with_window(None, Some(now - Duration::seconds(1)));
        assert!(matches!(
            evaluate_coupon("OLD", Some(&past), inr(10.0), now),
            Err(OrderError::CouponExpired(_))
        ));

        let open = Coupon::fixed("NOW", 5.0)
            .with_window(Some(now - Duration::days(1)), Some(now + Duration::days(1)));
        assert!(evaluate_coupon("NOW", Some(&open), inr(10.0), now).is_ok());
    }

    #[test]
    fn test_usage_limit() {
        let mut coupon = Coupon::fixed("ONCE", 5.0).with_usage_limit(1);
        assert!(evaluate_coupon("ONCE", Some(&coupon), inr(10.0), Utc::now()).is_ok());

        coupon.used_count = 1;
        assert!(matches!(
            evaluate_coupon("ONCE", Some(&coupon), inr(10.0), Utc::now()),
            Err(OrderError::CouponLimitReached(_))
        ));
    }

    #[test]
    fn test_amounts_in_another_currency_are_rejected() {
        let usd = |v: f64| Money::from_decimal(v, Currency::USD);

        let min_in_usd = Coupon::percentage("BIG", 10.0).with_min_order(usd(5.0));
        let err = evaluate_coupon("BIG", Some(&min_in_usd), inr(1000.0), Utc::now()).unwrap_err();
        assert!(matches!(err, OrderError::InvalidCoupon { ref reason, .. } if reason.contains("USD")));

        let cap_in_usd = Coupon::percentage("CAP", 20.0).with_max_discount(usd(10.0));
        assert!(matches!(
            evaluate_coupon("CAP", Some(&cap_in_usd), inr(1000.0), Utc::now()),
            Err(OrderError::InvalidCoupon { .. })
        ));
    }

    #[test]
    fn test_min_order() {
        let coupon = Coupon::percentage("BIG", 10.0).with_min_order(inr(500.0));
        assert!(matches!(
            evaluate_coupon("BIG", Some(&coupon), inr(499.0), Utc::now()),
            Err(OrderError::MinOrderNotMet { .. })
        ));
        assert!(evaluate_coupon("BIG", Some(&coupon), inr(500.0), Utc::now()).is_ok());
    }
}
