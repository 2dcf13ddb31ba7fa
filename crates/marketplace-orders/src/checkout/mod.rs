//! Checkout module.
//!
//! Addresses, shipping quotes, order assembly and the order types it
//! produces.

mod address;
mod assembler;
mod commission;
mod order;
mod shipping;

pub use address::{Address, GuestContact};
pub use assembler::{AssembledOrder, AssemblyInput, OrderAssembler, StockReservation};
pub use commission::{CommissionRecord, CommissionStatus};
pub use order::{CheckoutReceipt, Order, OrderLineItem, PaymentMethod, PaymentStatus, VendorSubOrder};
pub use shipping::{
    ShippingQuote, ShippingRate, ShippingRateResolver, ShippingRequest, ShippingSource, ShippingSpeed,
    ShippingZone, VendorShippingConfig,
};
