//! Product and vendor records as the engine reads them from the catalog.

use serde::{Deserialize, Serialize};

use crate::catalog::{StockStatus, VariantPriceTable, VariantSelection};
use crate::checkout::VendorShippingConfig;
use crate::ids::{ProductId, VendorId};
use crate::money::Money;

/// Product status in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Not visible to customers.
    Draft,
    #[default]
    Active,
    /// Not visible, data preserved.
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }
}

/// A sellable product owned by one vendor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: VendorId,
    pub name: String,
    /// Primary image, captured onto order lines.
    #[serde(default)]
    pub image_url: Option<String>,
    pub status: ProductStatus,
    /// Price when no variant price applies.
    pub base_price: Money,
    /// Prices keyed by variant selection.
    #[serde(default)]
    pub variant_prices: VariantPriceTable,
    /// Units on hand.
    pub stock_quantity: i64,
    /// Derived label, persisted next to the quantity.
    pub stock_status: StockStatus,
    /// Per-product low-stock threshold; engine default when `None`.
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
}

impl Product {
    /// Create an active product with `stock_quantity` units.
    pub fn new(
        id: impl Into<ProductId>,
        vendor_id: impl Into<VendorId>,
        name: impl Into<String>,
        base_price: Money,
        stock_quantity: i64,
    ) -> Self {
        Self {
            id: id.into(),
            vendor_id: vendor_id.into(),
            name: name.into(),
            image_url: None,
            status: ProductStatus::Active,
            base_price,
            variant_prices: VariantPriceTable::new(),
            stock_quantity,
            stock_status: if stock_quantity > 0 {
                StockStatus::InStock
            } else {
                StockStatus::OutOfStock
            },
            low_stock_threshold: None,
        }
    }

    pub fn with_variant_price(mut self, selection: &VariantSelection, price: Money) -> Self {
        self.variant_prices.insert(selection, price);
        self
    }

    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = Some(threshold);
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Active
    }

    pub fn is_flagged_out_of_stock(&self) -> bool {
        self.stock_status == StockStatus::OutOfStock
    }

    /// Threshold to use for this product.
    pub fn threshold_or(&self, default_threshold: i64) -> i64 {
        self.low_stock_threshold.unwrap_or(default_threshold)
    }
}

/// A marketplace seller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vendor {
    pub id: VendorId,
    pub display_name: String,
    /// Marketplace commission in percent; engine default when `None`.
    #[serde(default)]
    pub commission_rate: Option<f64>,
    #[serde(default)]
    pub shipping: VendorShippingConfig,
}

impl Vendor {
    pub fn new(id: impl Into<VendorId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            commission_rate: None,
            shipping: VendorShippingConfig::default(),
        }
    }

    pub fn with_commission_rate(mut self, rate: f64) -> Self {
        self.commission_rate = Some(rate);
        self
    }

    pub fn with_shipping(mut self, shipping: VendorShippingConfig) -> Self {
        self.shipping = shipping;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_new_product_stock_flag() {
        let p = Product::new("p-1", "v-1", "Mug", Money::new(29900, Currency::INR), 3);
        assert!(p.is_available());
        assert_eq!(p.stock_status, StockStatus::InStock);

        let empty = Product::new("p-2", "v-1", "Cup", Money::new(100, Currency::INR), 0);
        assert!(empty.is_flagged_out_of_stock());
    }

    #[test]
    fn test_threshold_default() {
        let p = Product::new("p-1", "v-1", "Mug", Money::new(100, Currency::INR), 3);
        assert_eq!(p.threshold_or(5), 5);
        assert_eq!(p.with_low_stock_threshold(2).threshold_or(5), 2);
    }

    #[test]
    fn test_product_json_shape() {
        let p = Product::new("p-1", "v-1", "Mug", Money::new(100, Currency::INR), 3);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["id"], "p-1");
        assert_eq!(json["status"], "active");
        assert_eq!(json["stock_status"], "in_stock");
    }
}
