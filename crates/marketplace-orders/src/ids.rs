//! Newtype IDs for type-safe identifiers.
//!
//! Orders touch products, vendors, customers and coupons in the same code
//! path; newtypes keep a `VendorId` from being passed where a `ProductId`
//! is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($name:ident) => {
        /// A unique identifier.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a new unique ID.
            pub fn generate() -> Self {
                Self(generate_id())
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(VendorId);
define_id!(CustomerId);
define_id!(OrderId);
define_id!(CouponId);
define_id!(CommissionId);

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_sequence() -> u64 {
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

fn unix_nanos() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

/// Unique within the process: the nanosecond clock is suffixed with a
/// monotonically increasing counter.
fn generate_id() -> String {
    format!("{:x}{:06x}", unix_nanos(), next_sequence() & 0xff_ffff)
}

/// Human-readable order number, e.g. `ORD-20261016-00A1F3`.
pub fn generate_order_number(prefix: &str, now: DateTime<Utc>) -> String {
    // Odd multiplier keeps the sequence a bijection mod 2^24.
    let mixed = next_sequence().wrapping_mul(0x9E37_79B1) ^ (unix_nanos() >> 30) as u64;
    let suffix = mixed & 0xff_ffff;
    format!("{}-{}-{:06X}", prefix, now.format("%Y%m%d"), suffix)
}

/// A fresh order number with the same prefix as `taken`.
///
/// The suffix is only collision-free within one process, so a backend may
/// still reject a number that another instance issued.
pub fn regenerate_order_number(taken: &str, now: DateTime<Utc>) -> String {
    let prefix = taken.rsplitn(3, '-').nth(2).unwrap_or(taken);
    generate_order_number(prefix, now)
}

/// Tracking code handed back to the customer with the confirmation.
pub fn generate_tracking_code() -> String {
    format!("TRK{:X}{:04X}", unix_nanos() as u64 & 0xffff_ffff, next_sequence() & 0xffff)
}
