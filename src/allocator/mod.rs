//! Sequential order-ID allocation.
//!
//! One durable counter, one operation that matters: mint the next `A<n>`
//! identifier and commit it together with its order record in a single
//! atomic transaction. A secondary maintenance routine recomputes the
//! counter from the identifiers actually present in storage.
//!
//! # Invariants
//! - No two `allocate_next` calls ever return the same identifier, even
//!   from concurrent independent processes.
//! - The committed sequence has no gaps under normal operation.
//! - Failed allocations leave no observable state: no counter mutation, no
//!   partial order record.

mod order_id;
mod retry;

pub use order_id::OrderId;
pub use retry::RetryConfig;

use std::sync::Arc;

use backon::BlockingRetryable;
use chrono::Utc;
use serde_json::{json, Value};

use crate::contracts::{
    AllocatorError, DocumentStore, Precondition, StoreError, VersionedDocument, Write,
};
use crate::model::{Order, OrderDraft};

/// Collection holding order records, keyed by their identifier.
pub const ORDERS_COLLECTION: &str = "orders";
/// Collection holding allocator counters.
pub const COUNTERS_COLLECTION: &str = "counters";
/// Well-known key of the order counter document.
pub const COUNTER_KEY: &str = "orders";
/// Counter field holding the highest sequence number issued so far.
const COUNTER_FIELD: &str = "current";

/// Mints sequential order identifiers against a durable document store.
///
/// Owns only the counter-and-order-write responsibility; it is injected
/// into the order-creation workflow rather than reached through shared
/// globals, and no other code path may write the counter.
pub struct OrderAllocator<S: DocumentStore> {
    store: Arc<S>,
    retry: RetryConfig,
}

impl<S: DocumentStore> OrderAllocator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_retry(store, RetryConfig::default())
    }

    pub fn with_retry(store: Arc<S>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    /// Mints the next identifier and commits the order record under it.
    ///
    /// The counter increment and the order write land in one atomic commit,
    /// preconditioned on the counter version read at the start. A conflicting
    /// concurrent allocation fails that precondition and the whole
    /// read-modify-write is retried from a fresh read, within the bounded
    /// retry budget.
    ///
    /// # Errors
    ///
    /// [`AllocatorError::AllocationFailed`] when the commit cannot land
    /// within the retry budget, [`AllocatorError::StoreUnavailable`] when
    /// the store is unreachable. Neither leaves any state behind, so the
    /// caller may reattempt the whole submission without risking a
    /// duplicate or partial order.
    pub fn allocate_next(&self, draft: &OrderDraft) -> Result<Order, AllocatorError> {
        (|| self.try_allocate(draft))
            .retry(self.retry.backoff())
            .when(|e: &StoreError| matches!(e, StoreError::Conflict { .. }))
            .notify(|err, dur| {
                tracing::warn!(
                    error = %err,
                    retry_in = ?dur,
                    "allocation commit conflicted, retrying"
                );
            })
            .call()
            .map_err(|e| match e {
                StoreError::Unavailable(reason) => AllocatorError::StoreUnavailable(reason),
                other => AllocatorError::AllocationFailed {
                    attempts: self.retry.max_retries + 1,
                    reason: other.to_string(),
                },
            })
    }

    /// One allocation attempt: read counter, compute next, commit both writes.
    fn try_allocate(&self, draft: &OrderDraft) -> Result<Order, StoreError> {
        let counter = self.store.get(COUNTERS_COLLECTION, COUNTER_KEY)?;
        let (current, precondition) = match &counter {
            Some(doc) => (read_counter_value(doc)?, Precondition::Version(doc.version)),
            // First allocation ever: initialize from the migration scan.
            None => (self.initial_counter_value()?, Precondition::Absent),
        };

        let next = current + 1;
        let id = OrderId::new(next);
        let order = Order::from_draft(id, draft, Utc::now());
        let order_doc =
            serde_json::to_value(&order).map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.store.commit(&[
            Write::new(
                COUNTERS_COLLECTION,
                COUNTER_KEY,
                json!({ COUNTER_FIELD: next }),
                precondition,
            ),
            // Absent precondition on the order key is the last line of
            // defense: even a counter lowered by a concurrent resync turns
            // into a retried conflict here, never a duplicate identifier.
            Write::new(
                ORDERS_COLLECTION,
                id.to_string(),
                order_doc,
                Precondition::Absent,
            ),
        ])?;

        Ok(order)
    }

    /// Recomputes the counter from the maximum identifier present in storage.
    ///
    /// Used after manual data edits, restores from backup, or first-time
    /// migration from unmanaged identifiers. Unconditionally overwrites the
    /// counter with the observed maximum, so the next allocation cannot
    /// collide with any stored identifier.
    ///
    /// Not transactional against in-flight allocations; it is an
    /// administrative maintenance action meant for low-traffic moments. All
    /// failures are swallowed and logged, leaving the counter unchanged, so
    /// a denied or failed scan can never block a user-facing flow.
    ///
    /// Returns the counter value after the operation.
    pub fn resync_counter(&self) -> u64 {
        let max = match self.scan_max_suffix() {
            Ok(max) => max,
            Err(e) => {
                tracing::warn!(error = %e, "counter resync scan failed, counter left unchanged");
                return self.current().unwrap_or(0);
            }
        };

        let write = Write::new(
            COUNTERS_COLLECTION,
            COUNTER_KEY,
            json!({ COUNTER_FIELD: max }),
            Precondition::Any,
        );
        if let Err(e) = self.store.commit(&[write]) {
            tracing::warn!(error = %e, "counter resync write failed, counter left unchanged");
            return self.current().unwrap_or(0);
        }

        tracing::info!(current = max, "order counter resynchronized");
        max
    }

    /// Reads the counter without mutating it. Absent counter reads as 0.
    pub fn current(&self) -> Result<u64, StoreError> {
        match self.store.get(COUNTERS_COLLECTION, COUNTER_KEY)? {
            Some(doc) => read_counter_value(&doc),
            None => Ok(0),
        }
    }

    /// Migration fallback for a missing counter: the same scan resync uses.
    ///
    /// A scan denied by store-side access rules starts the sequence from
    /// zero instead of failing the allocation.
    fn initial_counter_value(&self) -> Result<u64, StoreError> {
        match self.scan_max_suffix() {
            Ok(max) => Ok(max),
            Err(StoreError::Unauthorized(reason)) => {
                tracing::warn!(
                    %reason,
                    "order scan unauthorized during counter init, starting from zero"
                );
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    /// Maximum `A<n>` suffix over all stored order keys, 0 when none match.
    fn scan_max_suffix(&self) -> Result<u64, StoreError> {
        let records = self.store.scan(ORDERS_COLLECTION)?;
        Ok(OrderId::max_suffix(records.iter().map(|(key, _)| key.as_str())))
    }
}

fn read_counter_value(doc: &VersionedDocument) -> Result<u64, StoreError> {
    doc.document
        .get(COUNTER_FIELD)
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            StoreError::Serialization(format!(
                "counter document missing integer field `{COUNTER_FIELD}`"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderItem, OrderStatus, PaymentStatus};
    use crate::store::MemoryStore;

    fn allocator() -> OrderAllocator<MemoryStore> {
        OrderAllocator::new(Arc::new(MemoryStore::new()))
    }

    fn draft() -> OrderDraft {
        OrderDraft {
            name: "Lin".into(),
            phone: "0987654321".into(),
            note: "no cilantro".into(),
            items: vec![OrderItem {
                name: "Rice Cake".into(),
                price: 580,
                quantity: 3,
            }],
        }
    }

    #[test]
    fn first_allocation_on_empty_store_is_a1() {
        let alloc = allocator();
        let order = alloc.allocate_next(&draft()).unwrap();
        assert_eq!(order.id.to_string(), "A1");
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert_eq!(order.total_amount, 1740);
    }

    #[test]
    fn allocations_are_sequential() {
        let alloc = allocator();
        assert_eq!(alloc.allocate_next(&draft()).unwrap().id, OrderId::new(1));
        assert_eq!(alloc.allocate_next(&draft()).unwrap().id, OrderId::new(2));
        assert_eq!(alloc.allocate_next(&draft()).unwrap().id, OrderId::new(3));
        assert_eq!(alloc.current().unwrap(), 3);
    }

    #[test]
    fn order_record_is_committed_under_its_identifier() {
        let store = Arc::new(MemoryStore::new());
        let alloc = OrderAllocator::new(Arc::clone(&store));
        let order = alloc.allocate_next(&draft()).unwrap();

        let stored = store
            .get(ORDERS_COLLECTION, &order.id.to_string())
            .unwrap()
            .expect("order should be stored under its identifier");
        assert_eq!(stored.document["id"], "A1");
        assert_eq!(stored.document["phone"], "0987654321");
    }

    #[test]
    fn resync_after_allocations_is_a_no_op() {
        let alloc = allocator();
        alloc.allocate_next(&draft()).unwrap();
        alloc.allocate_next(&draft()).unwrap();
        assert_eq!(alloc.resync_counter(), 2);
        assert_eq!(alloc.allocate_next(&draft()).unwrap().id, OrderId::new(3));
    }

    #[test]
    fn current_is_zero_on_empty_store() {
        assert_eq!(allocator().current().unwrap(), 0);
    }
}
