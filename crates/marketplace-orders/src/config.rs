//! Engine configuration.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::money::{Currency, Money};

/// Order engine configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Currency every order is priced in.
    pub currency: Currency,

    /// Tax rate applied to the discounted subtotal, in percent.
    pub tax_rate_percent: f64,

    /// Commission rate used when a vendor has none configured, in percent.
    pub default_commission_rate: f64,

    /// Low-stock threshold used when a product has none configured.
    pub default_low_stock_threshold: i64,

    /// Maximum number of lines in one checkout.
    pub max_line_items: usize,

    /// Maximum quantity of a single line.
    pub max_quantity_per_item: i64,

    /// Prefix of generated order numbers.
    pub order_number_prefix: String,

    /// Upper bound on one commit transaction, in milliseconds.
    pub commit_timeout_ms: u64,

    /// Last-resort shipping rates.
    pub shipping: ShippingFallbackConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: Currency::INR,
            tax_rate_percent: 18.0,
            default_commission_rate: 10.0,
            default_low_stock_threshold: 5,
            max_line_items: 50,
            max_quantity_per_item: 9999,
            order_number_prefix: "ORD".to_string(),
            commit_timeout_ms: 5000,
            shipping: ShippingFallbackConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load config from a file (`.json` or TOML).
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: EngineConfig = if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.tax_rate_percent) {
            bail!("tax_rate_percent must be within 0..=100, got {}", self.tax_rate_percent);
        }
        if !(0.0..=100.0).contains(&self.default_commission_rate) {
            bail!(
                "default_commission_rate must be within 0..=100, got {}",
                self.default_commission_rate
            );
        }
        if self.default_low_stock_threshold < 0 {
            bail!("default_low_stock_threshold must not be negative");
        }
        if self.max_line_items == 0 || self.max_quantity_per_item <= 0 {
            bail!("line item limits must be positive");
        }
        if self.commit_timeout_ms == 0 {
            bail!("commit_timeout_ms must be positive");
        }
        if self.order_number_prefix.trim().is_empty() {
            bail!("order_number_prefix must not be empty");
        }
        if self.shipping.standard < 0.0 || self.shipping.express < 0.0 {
            bail!("fallback shipping rates must not be negative");
        }
        Ok(())
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }
}

/// Global fallback shipping, applied when a vendor configures nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShippingFallbackConfig {
    /// Flat standard rate (major units).
    pub standard: f64,

    /// Flat express rate (major units).
    pub express: f64,

    /// Vendor subtotal at or above which fallback shipping is free.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_shipping_threshold: Option<f64>,
}

impl Default for ShippingFallbackConfig {
    fn default() -> Self {
        Self {
            standard: 49.0,
            express: 99.0,
            free_shipping_threshold: None,
        }
    }
}

impl ShippingFallbackConfig {
    pub fn standard_rate(&self, currency: Currency) -> Money {
        Money::from_decimal(self.standard, currency)
    }

    pub fn express_rate(&self, currency: Currency) -> Money {
        Money::from_decimal(self.express, currency)
    }

    pub fn free_threshold(&self, currency: Currency) -> Option<Money> {
        self.free_shipping_threshold
            .map(|t| Money::from_decimal(t, currency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tax_rate_percent, 18.0);
        assert_eq!(config.commit_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            tax_rate_percent = 12.0
            currency = "USD"

            [shipping]
            express = 150.0
            "#,
        )
        .unwrap();

        assert_eq!(config.tax_rate_percent, 12.0);
        assert_eq!(config.currency, Currency::USD);
        assert_eq!(config.shipping.express, 150.0);
        assert_eq!(config.shipping.standard, 49.0);
        assert_eq!(config.max_quantity_per_item, 9999);
    }

    #[test]
    fn test_rejects_out_of_range_tax() {
        let err = EngineConfig::from_toml_str("tax_rate_percent = 180.0").unwrap_err();
        assert!(err.to_string().contains("tax_rate_percent"));
    }

    #[test]
    fn test_load_json_file() {
        let path = std::env::temp_dir().join(format!("engine-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"commit_timeout_ms": 250, "order_number_prefix": "MKT"}"#).unwrap();

        let config = EngineConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.commit_timeout_ms, 250);
        assert_eq!(config.order_number_prefix, "MKT");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/engine.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
