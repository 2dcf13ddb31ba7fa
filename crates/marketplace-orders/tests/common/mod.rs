//! Shared marketplace fixture for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use marketplace_orders::prelude::*;

pub fn inr(v: f64) -> Money {
    Money::from_decimal(v, Currency::INR)
}

pub fn address() -> Address {
    Address::new("Asha", "Rao", "12 MG Road", "Bengaluru", "India", "IN", "560001")
}

/// Vendors:
/// - `v-loom`: 12% commission, domestic zone (standard 40 free from 1000, express 120)
/// - `v-clay`: default commission, vendor default rate 60 free from 2000
/// - `v-books`: shipping disabled
/// - `v-pop`: not in the directory
pub async fn marketplace() -> MemoryStore {
    let store = MemoryStore::new();

    store
        .put_vendor(
            Vendor::new("v-loom", "Loom House")
                .with_commission_rate(12.0)
                .with_shipping(
                    VendorShippingConfig::default().with_zone(
                        ShippingZone::new("Domestic", &["IN"])
                            .with_rate(ShippingRate::new("Standard Delivery", inr(40.0)).free_above(inr(1000.0)))
                            .with_rate(ShippingRate::new("Express Delivery", inr(120.0))),
                    ),
                ),
        )
        .await;

    let mut clay_shipping = VendorShippingConfig::default();
    clay_shipping.default_rate = Some(inr(60.0));
    clay_shipping.free_shipping_threshold = Some(inr(2000.0));
    store
        .put_vendor(Vendor::new("v-clay", "Clay Co").with_shipping(clay_shipping))
        .await;

    store
        .put_vendor(Vendor::new("v-books", "Paper Trail").with_shipping(VendorShippingConfig::disabled()))
        .await;

    store
        .put_product(
            Product::new("tee", "v-loom", "Cotton Tee", inr(499.0), 20)
                .with_variant_price(&VariantSelection::none().with("size", "xl"), inr(549.0))
                .with_image("https://cdn.example.com/tee.jpg"),
        )
        .await;
    store
        .put_product(Product::new("scarf", "v-loom", "Silk Scarf", inr(899.0), 10))
        .await;
    store
        .put_product(Product::new("mug", "v-clay", "Stoneware Mug", inr(250.0), 8).with_low_stock_threshold(3))
        .await;
    store
        .put_product(Product::new("vase", "v-clay", "Tall Vase", inr(1500.0), 2))
        .await;
    store
        .put_product(Product::new("novel", "v-books", "Paperback Novel", inr(399.0), 50))
        .await;
    store
        .put_product(Product::new("candle", "v-pop", "Soy Candle", inr(150.0), 30))
        .await;

    store
        .put_coupon(Coupon::percentage("SAVE20", 20.0).with_max_discount(inr(150.0)))
        .await;
    store
        .put_coupon(Coupon::fixed("FLAT100", 100.0).with_min_order(inr(500.0)))
        .await;
    store.put_coupon(Coupon::freeship("FREESHIP")).await;
    store
        .put_coupon(Coupon::fixed("ONCE", 50.0).with_usage_limit(1))
        .await;

    store
}

pub fn engine(store: MemoryStore) -> CheckoutEngine<MemoryStore> {
    CheckoutEngine::new(store, EngineConfig::default())
}

pub fn engine_with_sink(store: MemoryStore) -> (CheckoutEngine<MemoryStore>, RecordingSink) {
    let sink = RecordingSink::new();
    let engine = CheckoutEngine::new(store, EngineConfig::default()).with_notifier(Arc::new(sink.clone()));
    (engine, sink)
}

pub fn request(customer: &str, items: Vec<CartLine>) -> CheckoutRequest {
    CheckoutRequest::new(Buyer::customer(customer), address(), items)
}

/// tee x2 (998), mug x2 (500), novel x1 (399): three vendors, subtotal 1897.
pub fn three_vendor_cart() -> Vec<CartLine> {
    vec![
        CartLine::new("tee", 2),
        CartLine::new("mug", 2),
        CartLine::new("novel", 1),
    ]
}

pub async fn stock(store: &MemoryStore, id: &str) -> Product {
    store
        .product(&ProductId::new(id))
        .await
        .expect("fixture product exists")
}
