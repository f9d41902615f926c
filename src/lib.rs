//! Sequential order-ID allocation over a durable document store.
//!
//! Customers of a pre-order storefront get human-readable identifiers
//! (`A1`, `A2`, …) minted uniquely and without gaps even when submissions
//! race. [`allocator::OrderAllocator`] owns the durable counter and commits
//! each increment atomically with the new order record;
//! [`allocator::OrderAllocator::resync_counter`] recomputes the counter
//! from stored identifiers after manual edits, restores, or first-time
//! migration.
//!
//! The store itself is behind the [`contracts::DocumentStore`] trait;
//! [`store::MemoryStore`] and [`store::RocksDbStore`] are the bundled
//! implementations.

pub mod allocator;
pub mod contracts;
pub mod model;
pub mod store;
