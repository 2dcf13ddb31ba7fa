//! Catalog module.
//!
//! Products, vendors, variant pricing and stock-state derivation.

mod inventory;
mod product;
mod variant;

pub use inventory::{AdjustmentReason, StockAdjustment, StockLevel, StockStatus};
pub use product::{Product, ProductStatus, Vendor};
pub use variant::{legacy_keys, resolve_unit_price, VariantPriceTable, VariantSelection};
