//! Marketplace commission records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CommissionId, OrderId, VendorId};
use crate::money::Money;

/// Payout status of a commission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
}

/// The marketplace's cut of one vendor sub-order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommissionRecord {
    pub id: CommissionId,
    pub order_id: OrderId,
    pub vendor_id: VendorId,
    pub subtotal: Money,
    /// Percent, snapshotted from the vendor when the order was committed.
    pub commission_rate: f64,
    pub commission: Money,
    pub vendor_earnings: Money,
    pub status: CommissionStatus,
    pub created_at: DateTime<Utc>,
}

impl CommissionRecord {
    /// Split `subtotal` at `rate` percent. Earnings are whatever the
    /// commission leaves, so the two always add up to the subtotal.
    pub fn compute(
        order_id: OrderId,
        vendor_id: VendorId,
        subtotal: Money,
        rate: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        let commission = subtotal.percentage(rate);
        Self {
            id: CommissionId::generate(),
            order_id,
            vendor_id,
            subtotal,
            commission_rate: rate,
            commission,
            vendor_earnings: subtotal - commission,
            status: CommissionStatus::Pending,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_ten_percent_of_thousand() {
        let record = CommissionRecord::compute(
            OrderId::new("o-1"),
            VendorId::new("v-1"),
            Money::from_decimal(1000.0, Currency::INR),
            10.0,
            Utc::now(),
        );
        assert_eq!(record.commission, Money::from_decimal(100.0, Currency::INR));
        assert_eq!(record.vendor_earnings, Money::from_decimal(900.0, Currency::INR));
        assert_eq!(record.status, CommissionStatus::Pending);
    }

    #[test]
    fn test_rounds_to_cents() {
        // 12.5% of 99.99 = 12.49875
        let record = CommissionRecord::compute(
            OrderId::new("o-1"),
            VendorId::new("v-1"),
            Money::new(9999, Currency::INR),
            12.5,
            Utc::now(),
        );
        assert_eq!(record.commission.amount_cents, 1250);
        assert_eq!(record.vendor_earnings.amount_cents, 8749);
    }
}
