//! Multi-vendor order-commit engine.
//!
//! Turns a cart into a durable order split into per-vendor sub-orders:
//!
//! - **Catalog**: products, vendors, variant prices, stock flags
//! - **Cart**: server-side pricing and coupon evaluation
//! - **Checkout**: shipping quotes, order assembly, commissions
//! - **Commit**: idempotency, the store seams, the commit transaction
//! - **Fulfillment**: sub-order lifecycle and stock reconciliation
//!
//! # Example
//!
//! ```rust,ignore
//! use marketplace_orders::prelude::*;
//!
//! let store = MemoryStore::new();
//! store.put_vendor(Vendor::new("v-1", "Loom House")).await;
//! store
//!     .put_product(Product::new("p-1", "v-1", "Cotton Tee", Money::from_decimal(499.0, Currency::INR), 20))
//!     .await;
//!
//! let engine = CheckoutEngine::new(store, EngineConfig::default());
//! let request = CheckoutRequest::new(
//!     Buyer::customer("c-42"),
//!     Address::new("Asha", "Rao", "12 MG Road", "Bengaluru", "India", "IN", "560001"),
//!     vec![CartLine::new("p-1", 2)],
//! )
//! .with_idempotency_key("checkout-7f3a");
//!
//! let receipt = engine.submit_checkout(request).await?;
//! println!("{} total {}", receipt.order_number, receipt.total);
//! ```

pub mod error;
pub mod ids;
pub mod money;
pub mod config;

pub mod catalog;
pub mod cart;
pub mod checkout;
pub mod commit;
pub mod fulfillment;
pub mod notify;
pub mod engine;

pub use config::EngineConfig;
pub use engine::{CheckoutEngine, CheckoutRequest, PreparedCheckout};
pub use error::{ErrorKind, OrderError, StoreError};
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{EngineConfig, ShippingFallbackConfig};
    pub use crate::engine::{CheckoutEngine, CheckoutRequest, PreparedCheckout};
    pub use crate::error::{ErrorKind, OrderError, StoreError};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Catalog
    pub use crate::catalog::{
        Product, ProductStatus, StockAdjustment, StockStatus, VariantSelection, Vendor,
    };

    // Cart
    pub use crate::cart::{CartLine, Coupon, CouponKind};

    // Checkout
    pub use crate::checkout::{
        Address, CheckoutReceipt, CommissionRecord, CommissionStatus, GuestContact, Order,
        OrderLineItem, PaymentMethod, PaymentStatus, ShippingRate, ShippingSpeed, ShippingZone,
        VendorShippingConfig, VendorSubOrder,
    };

    // Commit
    pub use crate::commit::{
        Buyer, CatalogStore, CommerceStore, CouponStore, MemoryStore, OrderStore, VendorDirectory,
    };

    // Fulfillment
    pub use crate::fulfillment::{OrderStatus, SubOrderStatus};

    pub use crate::notify::{NotificationSink, OrderEvent, RecordingSink, TracingSink};
}
