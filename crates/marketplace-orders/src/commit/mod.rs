//! Commit module.
//!
//! Idempotency, the storage seams, the commit unit of work, and the
//! in-memory backend.

mod idempotency;
mod memory;
mod store;
mod transaction;

pub use idempotency::{Buyer, IdempotencyKey, IdempotencyScope};
pub use memory::{MemoryStore, MemoryTransaction};
pub use store::{
    CatalogStore, CommerceStore, CouponStore, OrderStore, OrderTransaction, StoreResult, VendorDirectory,
};
pub use transaction::{commit_assembled_order, CommitOutcome};
