//! Fulfillment module.
//!
//! Sub-order lifecycle after commit and stock reconciliation.

mod reconcile;
mod status;

pub use reconcile::restore_order_stock;
pub use status::{derive_order_status, OrderStatus, SubOrderStatus};
