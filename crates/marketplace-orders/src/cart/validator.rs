//! Cart validation and server-side pricing.
//!
//! Every line is re-read from the catalog; prices come from the variant
//! resolver, never from the request. The first failing line aborts the
//! whole cart. Nothing is written here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{resolve_unit_price, Product, VariantSelection};
use crate::commit::CatalogStore;
use crate::error::OrderError;
use crate::ids::{ProductId, VendorId};
use crate::money::{Currency, Money};

/// One requested line, as submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub variant: VariantSelection,
}

impl CartLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            variant: VariantSelection::none(),
        }
    }

    pub fn with_variant(mut self, variant: VariantSelection) -> Self {
        self.variant = variant;
        self
    }
}

/// A line after validation, carrying server-trusted data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub vendor_id: VendorId,
    pub name: String,
    pub image_url: Option<String>,
    pub variant: VariantSelection,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

/// Lines of one vendor with their subtotal.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorGroup {
    pub vendor_id: VendorId,
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
}

/// Result of validating a cart.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedCart {
    /// Lines in request order.
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub currency: Currency,
}

impl PricedCart {
    /// Lines grouped by vendor, vendors in order of first appearance.
    pub fn vendor_groups(&self) -> Vec<VendorGroup> {
        let mut groups: Vec<VendorGroup> = Vec::new();
        for line in &self.lines {
            match groups.iter_mut().find(|g| g.vendor_id == line.vendor_id) {
                Some(group) => {
                    group.subtotal += line.line_total;
                    group.lines.push(line.clone());
                }
                None => groups.push(VendorGroup {
                    vendor_id: line.vendor_id.clone(),
                    lines: vec![line.clone()],
                    subtotal: line.line_total,
                }),
            }
        }
        groups
    }
}

/// Re-read, check stock, and price every line.
pub async fn validate_and_price<C>(
    catalog: &C,
    lines: &[CartLine],
    currency: Currency,
) -> Result<PricedCart, OrderError>
where
    C: CatalogStore + ?Sized,
{
    let mut products: HashMap<ProductId, Product> = HashMap::new();
    let mut requested: HashMap<ProductId, i64> = HashMap::new();
    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal = Money::zero(currency);

    for line in lines {
        if !products.contains_key(&line.product_id) {
            let product = catalog
                .get_product(&line.product_id)
                .await?
                .ok_or_else(|| OrderError::ProductNotFound(line.product_id.clone()))?;
            products.insert(line.product_id.clone(), product);
        }
        let product = &products[&line.product_id];

        if !product.is_available() {
            return Err(OrderError::ProductUnavailable(product.id.clone()));
        }
        if product.is_flagged_out_of_stock() {
            return Err(OrderError::OutOfStock {
                product_id: product.id.clone(),
                name: product.name.clone(),
            });
        }

        // Repeated lines for one product draw on the same stock.
        let total_requested = requested.entry(product.id.clone()).or_insert(0);
        *total_requested += line.quantity;
        if *total_requested > product.stock_quantity {
            return Err(OrderError::InsufficientStock {
                product_id: product.id.clone(),
                name: product.name.clone(),
                requested: *total_requested,
                available: product.stock_quantity,
            });
        }

        let unit_price = resolve_unit_price(product.base_price, &product.variant_prices, &line.variant);
        if unit_price.currency != currency {
            return Err(OrderError::Validation(format!(
                "product {} is priced in {}, orders are in {}",
                product.id, unit_price.currency, currency
            )));
        }
        let line_total = unit_price
            .try_multiply(line.quantity)
            .ok_or(OrderError::Overflow)?;
        subtotal = subtotal.try_add(&line_total).ok_or(OrderError::Overflow)?;

        debug!(
            product_id = %product.id,
            vendor_id = %product.vendor_id,
            quantity = line.quantity,
            unit_price = unit_price.amount_cents,
            "priced cart line"
        );

        priced.push(PricedLine {
            product_id: product.id.clone(),
            vendor_id: product.vendor_id.clone(),
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            variant: line.variant.clone(),
            unit_price,
            quantity: line.quantity,
            line_total,
        });
    }

    Ok(PricedCart {
        lines: priced,
        subtotal,
        currency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ProductStatus, StockStatus};
    use crate::commit::MemoryStore;

    fn inr(v: f64) -> Money {
        Money::from_decimal(v, Currency::INR)
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .put_product(
                Product::new("tee", "v-a", "Tee", inr(500.0), 10).with_variant_price(
                    &VariantSelection::none().with("size", "xl"),
                    inr(600.0),
                ),
            )
            .await;
        store.put_product(Product::new("mug", "v-b", "Mug", inr(250.0), 2)).await;
        store
    }

    #[tokio::test]
    async fn test_prices_from_catalog_and_groups_by_vendor() {
        let store = store().await;
        let lines = vec![
            CartLine::new("tee", 2).with_variant(VariantSelection::none().with("Size", "XL")),
            CartLine::new("mug", 1),
            CartLine::new("tee", 1),
        ];
        let cart = validate_and_price(&store, &lines, Currency::INR).await.unwrap();

        assert_eq!(cart.lines[0].unit_price, inr(600.0));
        assert_eq!(cart.lines[2].unit_price, inr(500.0));
        assert_eq!(cart.subtotal, inr(1200.0 + 250.0 + 500.0));

        let groups = cart.vendor_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].vendor_id, VendorId::new("v-a"));
        assert_eq!(groups[0].subtotal, inr(1700.0));
        assert_eq!(groups[1].subtotal, inr(250.0));
    }

    #[tokio::test]
    async fn test_insufficient_stock_counts_repeated_lines() {
        let store = store().await;
        let lines = vec![CartLine::new("mug", 1), CartLine::new("mug", 2)];
        let err = validate_and_price(&store, &lines, Currency::INR).await.unwrap_err();
        match err {
            OrderError::InsufficientStock { requested, available, .. } => {
                assert_eq!((requested, available), (3, 2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_stock_flag_rejected() {
        let store = store().await;
        let mut p = Product::new("old", "v-a", "Old", inr(1.0), 4);
        p.stock_status = StockStatus::OutOfStock;
        store.put_product(p).await;

        let err = validate_and_price(&store, &[CartLine::new("old", 1)], Currency::INR)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::OutOfStock { .. }));
    }

    #[tokio::test]
    async fn test_unknown_and_inactive_products() {
        let store = store().await;
        let err = validate_and_price(&store, &[CartLine::new("ghost", 1)], Currency::INR)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::ProductNotFound(_)));

        let mut p = Product::new("draft", "v-a", "Draft", inr(1.0), 4);
        p.status = ProductStatus::Draft;
        store.put_product(p).await;
        let err = validate_and_price(&store, &[CartLine::new("draft", 1)], Currency::INR)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::ProductUnavailable(_)));
    }

    #[tokio::test]
    async fn test_first_failure_aborts() {
        let store = store().await;
        let lines = vec![CartLine::new("mug", 5), CartLine::new("ghost", 1)];
        let err = validate_and_price(&store, &lines, Currency::INR).await.unwrap_err();
        assert!(matches!(err, OrderError::InsufficientStock { .. }));
    }
}
