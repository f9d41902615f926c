//! Property tests for identifier parsing and allocation.
//!
//! Run with: cargo test --test property_tests

use std::sync::Arc;

use orderseq::allocator::{OrderAllocator, OrderId, ORDERS_COLLECTION};
use orderseq::contracts::{DocumentStore, Precondition, Write};
use orderseq::model::{OrderDraft, OrderItem};
use orderseq::store::MemoryStore;
use proptest::prelude::*;
use serde_json::json;

fn draft() -> OrderDraft {
    OrderDraft {
        name: "Tsai".into(),
        phone: "0955666777".into(),
        note: String::new(),
        items: vec![OrderItem {
            name: "Lion's Head Meatball".into(),
            price: 680,
            quantity: 1,
        }],
    }
}

proptest! {
    /// The computed maximum equals the true maximum of the well-formed
    /// identifiers, no matter how much malformed noise surrounds them.
    #[test]
    fn max_suffix_equals_true_max(
        ns in prop::collection::vec(1u64..100_000, 1..50),
        noise in prop::collection::vec("[b-z][a-z0-9-]{0,8}", 0..20),
    ) {
        let mut keys: Vec<String> = ns.iter().map(|n| format!("A{}", n)).collect();
        keys.extend(noise);
        let expected = *ns.iter().max().unwrap();
        prop_assert_eq!(OrderId::max_suffix(&keys), expected);
    }

    /// Noise alone computes to zero, never to an error.
    #[test]
    fn noise_alone_computes_zero(
        noise in prop::collection::vec("[b-z][a-z0-9-]{0,8}", 0..20),
    ) {
        prop_assert_eq!(OrderId::max_suffix(&noise), 0);
    }

    /// Any run of n allocations from an empty store mints exactly A1..An.
    #[test]
    fn allocation_run_is_gap_free(n in 1usize..40) {
        let alloc = OrderAllocator::new(Arc::new(MemoryStore::new()));
        for expected in 1..=n as u64 {
            let order = alloc.allocate_next(&draft()).unwrap();
            prop_assert_eq!(order.id.sequence(), expected);
        }
        prop_assert_eq!(alloc.current().unwrap(), n as u64);
    }

    /// Whatever identifiers are already stored, resync followed by an
    /// allocation never collides with any of them.
    #[test]
    fn allocation_after_resync_never_collides(
        ns in prop::collection::vec(1u64..1000, 0..30),
    ) {
        let store = Arc::new(MemoryStore::new());
        for n in &ns {
            store
                .commit(&[Write::new(
                    ORDERS_COLLECTION,
                    format!("A{}", n),
                    json!({ "id": format!("A{}", n) }),
                    Precondition::Any,
                )])
                .unwrap();
        }

        let alloc = OrderAllocator::new(Arc::clone(&store));
        let max = alloc.resync_counter();
        let order = alloc.allocate_next(&draft()).unwrap();

        prop_assert_eq!(order.id.sequence(), max + 1);
        prop_assert!(!ns.contains(&order.id.sequence()));
    }
}
