//! Cart module.
//!
//! Server-side cart validation, pricing, and coupon evaluation.

mod coupon;
mod validator;

pub use coupon::{evaluate_coupon, normalize_code, AppliedCoupon, Coupon, CouponKind};
pub use validator::{validate_and_price, CartLine, PricedCart, PricedLine, VendorGroup};
