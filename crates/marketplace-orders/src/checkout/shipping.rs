//! Per-vendor shipping rates.
//!
//! Each vendor group in an order is charged independently. Resolution order
//! for one vendor:
//!
//! 1. shipping disabled on the vendor: free
//! 2. freeship coupon on the order: free
//! 3. zone covering the destination country (or the unrestricted zone),
//!    rate best matching the requested speed, free above its threshold
//! 4. the vendor's own default rate and threshold
//! 5. the global fallback from [`ShippingFallbackConfig`]

use serde::{Deserialize, Serialize};

use crate::checkout::Address;
use crate::config::ShippingFallbackConfig;
use crate::ids::VendorId;
use crate::money::{Currency, Money};

/// Requested delivery speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShippingSpeed {
    #[default]
    Standard,
    Express,
}

impl ShippingSpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingSpeed::Standard => "standard",
            ShippingSpeed::Express => "express",
        }
    }
}

/// A named rate inside a shipping zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingRate {
    /// Method name, e.g. "Standard Delivery", "Express".
    pub name: String,
    /// Flat charge for the vendor group.
    pub amount: Money,
    /// Vendor subtotal at or above which this rate is waived.
    #[serde(default)]
    pub free_above: Option<Money>,
}

impl ShippingRate {
    pub fn new(name: impl Into<String>, amount: Money) -> Self {
        Self {
            name: name.into(),
            amount,
            free_above: None,
        }
    }

    pub fn free_above(mut self, threshold: Money) -> Self {
        self.free_above = Some(threshold);
        self
    }
}

/// Countries a vendor ships to with a given set of rates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingZone {
    pub name: String,
    /// Country codes or names. Empty means "everywhere else".
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub rates: Vec<ShippingRate>,
}

impl ShippingZone {
    pub fn new(name: impl Into<String>, countries: &[&str]) -> Self {
        Self {
            name: name.into(),
            countries: countries.iter().map(|c| c.to_string()).collect(),
            rates: Vec::new(),
        }
    }

    pub fn with_rate(mut self, rate: ShippingRate) -> Self {
        self.rates.push(rate);
        self
    }

    fn covers(&self, address: &Address) -> bool {
        self.countries.iter().any(|c| {
            let c = c.trim();
            c.eq_ignore_ascii_case(address.country_code.trim())
                || c.eq_ignore_ascii_case(address.country.trim())
        })
    }

    fn is_unrestricted(&self) -> bool {
        self.countries.is_empty()
    }

    /// Rate whose name mentions the speed, else the first rate.
    fn rate_for(&self, speed: ShippingSpeed) -> Option<&ShippingRate> {
        self.rates
            .iter()
            .find(|r| r.name.to_lowercase().contains(speed.as_str()))
            .or_else(|| self.rates.first())
    }
}

/// Shipping settings of one vendor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VendorShippingConfig {
    /// When false the vendor never charges shipping.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub zones: Vec<ShippingZone>,
    /// Vendor-wide standard rate used when no zone applies.
    #[serde(default)]
    pub default_rate: Option<Money>,
    /// Vendor-wide express rate used when no zone applies.
    #[serde(default)]
    pub default_express_rate: Option<Money>,
    /// Vendor-wide free shipping threshold used with the default rates.
    #[serde(default)]
    pub free_shipping_threshold: Option<Money>,
}

fn default_true() -> bool {
    true
}

impl Default for VendorShippingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            zones: Vec::new(),
            default_rate: None,
            default_express_rate: None,
            free_shipping_threshold: None,
        }
    }
}

impl VendorShippingConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_zone(mut self, zone: ShippingZone) -> Self {
        self.zones.push(zone);
        self
    }

    fn zone_for(&self, address: &Address) -> Option<&ShippingZone> {
        self.zones
            .iter()
            .find(|z| z.covers(address))
            .or_else(|| self.zones.iter().find(|z| z.is_unrestricted()))
    }
}

/// Where a vendor's shipping charge came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ShippingSource {
    VendorDisabled,
    FreeshipCoupon,
    ZoneRate { zone: String, rate: String },
    VendorDefault,
    GlobalFallback,
}

/// Shipping charge for one vendor group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub vendor_id: VendorId,
    pub amount: Money,
    pub source: ShippingSource,
    /// True when a threshold waived an otherwise non-zero rate.
    pub threshold_waived: bool,
}

/// One vendor group to be quoted.
#[derive(Debug, Clone, Copy)]
pub struct ShippingRequest<'a> {
    pub vendor_id: &'a VendorId,
    pub subtotal: Money,
    pub config: &'a VendorShippingConfig,
}

/// Deterministic per-vendor shipping calculator.
#[derive(Debug, Clone)]
pub struct ShippingRateResolver {
    currency: Currency,
    fallback: ShippingFallbackConfig,
}

impl ShippingRateResolver {
    pub fn new(currency: Currency, fallback: ShippingFallbackConfig) -> Self {
        Self { currency, fallback }
    }

    /// Quote every vendor group, in input order.
    pub fn resolve(
        &self,
        groups: &[ShippingRequest<'_>],
        destination: &Address,
        speed: ShippingSpeed,
        freeship: bool,
    ) -> Vec<ShippingQuote> {
        groups
            .iter()
            .map(|group| self.quote(group, destination, speed, freeship))
            .collect()
    }

    fn quote(
        &self,
        group: &ShippingRequest<'_>,
        destination: &Address,
        speed: ShippingSpeed,
        freeship: bool,
    ) -> ShippingQuote {
        let zero = Money::zero(self.currency);
        let vendor_id = group.vendor_id.clone();

        if !group.config.enabled {
            return ShippingQuote {
                vendor_id,
                amount: zero,
                source: ShippingSource::VendorDisabled,
                threshold_waived: false,
            };
        }
        if freeship {
            return ShippingQuote {
                vendor_id,
                amount: zero,
                source: ShippingSource::FreeshipCoupon,
                threshold_waived: false,
            };
        }

        let (amount, threshold, source) = match group
            .config
            .zone_for(destination)
            .and_then(|zone| zone.rate_for(speed).map(|rate| (zone, rate)))
        {
            Some((zone, rate)) => (
                rate.amount,
                rate.free_above,
                ShippingSource::ZoneRate {
                    zone: zone.name.clone(),
                    rate: rate.name.clone(),
                },
            ),
            None => self.default_rate(group.config, speed),
        };

        let waived = threshold.is_some_and(|t| group.subtotal >= t) && !amount.is_zero();
        ShippingQuote {
            vendor_id,
            amount: if waived { zero } else { amount.non_negative() },
            source,
            threshold_waived: waived,
        }
    }

    fn default_rate(
        &self,
        config: &VendorShippingConfig,
        speed: ShippingSpeed,
    ) -> (Money, Option<Money>, ShippingSource) {
        let vendor_rate = match speed {
            ShippingSpeed::Standard => config.default_rate,
            ShippingSpeed::Express => config.default_express_rate,
        };
        if let Some(rate) = vendor_rate {
            return (rate, config.free_shipping_threshold, ShippingSource::VendorDefault);
        }

        let rate = match speed {
            ShippingSpeed::Standard => self.fallback.standard_rate(self.currency),
            ShippingSpeed::Express => self.fallback.express_rate(self.currency),
        };
        (
            rate,
            self.fallback.free_threshold(self.currency),
            ShippingSource::GlobalFallback,
        )
    }
}
