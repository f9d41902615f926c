use serde_json::Value;

use crate::contracts::error::StoreError;

/// A stored document. The store is schema-free JSON; typed records are
/// converted at the edges.
pub type Document = Value;

/// A document together with the version stamped by its last commit.
#[derive(Debug, Clone)]
pub struct VersionedDocument {
    pub document: Document,
    pub version: u64,
}

/// Condition a write imposes on the live state of its target key.
///
/// Commits verify every precondition against current versions before
/// applying anything, which is what makes read-modify-write sequences
/// built on [`DocumentStore::get`] + [`DocumentStore::commit`] safe under
/// concurrent writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The key must not exist.
    Absent,
    /// The key must still be at exactly this version.
    Version(u64),
    /// No condition; the write always applies.
    Any,
}

/// A single conditional write within a commit.
#[derive(Debug, Clone)]
pub struct Write {
    pub collection: String,
    pub key: String,
    pub document: Document,
    pub precondition: Precondition,
}

impl Write {
    pub fn new(
        collection: impl Into<String>,
        key: impl Into<String>,
        document: Document,
        precondition: Precondition,
    ) -> Self {
        Self {
            collection: collection.into(),
            key: key.into(),
            document,
            precondition,
        }
    }
}

/// Durable document store consumed by the allocator.
///
/// # Invariants
/// - Commits are all-or-nothing: either every write in the batch is applied
///   or none is observable.
/// - A violated precondition fails the whole commit with
///   [`StoreError::Conflict`] and applies nothing.
/// - Versions are per-key and strictly increasing across successful commits.
pub trait DocumentStore: Send + Sync {
    /// Reads a single document by key, with its current version.
    fn get(&self, collection: &str, key: &str) -> Result<Option<VersionedDocument>, StoreError>;

    /// Atomically applies a batch of conditional writes.
    ///
    /// Verifies every precondition against live versions first; if any no
    /// longer holds, fails with [`StoreError::Conflict`] and applies nothing.
    fn commit(&self, writes: &[Write]) -> Result<(), StoreError>;

    /// Returns every document in a collection, keyed.
    ///
    /// May fail with [`StoreError::Unauthorized`] when store-side access
    /// rules deny collection-wide reads to the caller.
    fn scan(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError>;
}
