use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::contracts::{
    Document, DocumentStore, LockResultExt, Precondition, StoreError, VersionedDocument, Write,
};

struct Entry {
    document: Document,
    version: u64,
}

/// In-process document store with optimistic-concurrency commits.
///
/// Backs tests and single-process deployments. Commits verify every
/// precondition against live versions before applying anything, so a stale
/// read surfaces as [`StoreError::Conflict`] exactly like a remote document
/// database reporting a failed transaction.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Entry>>>,
    scan_allowed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            scan_allowed: AtomicBool::new(true),
        }
    }

    /// Models store-side access rules: with access revoked, `scan` fails
    /// with [`StoreError::Unauthorized`]. Keyed reads and commits are
    /// unaffected, matching rules that admit single-document access while
    /// denying collection-wide reads.
    pub fn set_scan_access(&self, allowed: bool) {
        self.scan_allowed.store(allowed, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<VersionedDocument>, StoreError> {
        let collections = self.collections.read().map_lock_err()?;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(key))
            .map(|e| VersionedDocument {
                document: e.document.clone(),
                version: e.version,
            }))
    }

    fn commit(&self, writes: &[Write]) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_lock_err()?;

        // Verify every precondition before touching anything.
        for w in writes {
            let existing = collections.get(&w.collection).and_then(|c| c.get(&w.key));
            match (&w.precondition, existing) {
                (Precondition::Any, _) => {}
                (Precondition::Absent, None) => {}
                (Precondition::Absent, Some(_)) => {
                    return Err(conflict(w, "document already exists".into()));
                }
                (Precondition::Version(v), Some(e)) if e.version == *v => {}
                (Precondition::Version(v), Some(e)) => {
                    return Err(conflict(
                        w,
                        format!("version changed: expected {v}, found {}", e.version),
                    ));
                }
                (Precondition::Version(_), None) => {
                    return Err(conflict(w, "document no longer exists".into()));
                }
            }
        }

        for w in writes {
            let coll = collections.entry(w.collection.clone()).or_default();
            match coll.get_mut(&w.key) {
                Some(e) => {
                    e.version += 1;
                    e.document = w.document.clone();
                }
                None => {
                    coll.insert(
                        w.key.clone(),
                        Entry {
                            document: w.document.clone(),
                            version: 1,
                        },
                    );
                }
            }
        }

        Ok(())
    }

    fn scan(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        if !self.scan_allowed.load(Ordering::SeqCst) {
            return Err(StoreError::Unauthorized(format!(
                "collection read denied: {collection}"
            )));
        }

        let collections = self.collections.read().map_lock_err()?;
        let mut records: Vec<(String, Document)> = collections
            .get(collection)
            .map(|c| {
                c.iter()
                    .map(|(k, e)| (k.clone(), e.document.clone()))
                    .collect()
            })
            .unwrap_or_default();
        records.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(records)
    }
}

fn conflict(w: &Write, reason: String) -> StoreError {
    StoreError::Conflict {
        collection: w.collection.clone(),
        key: w.key.clone(),
        reason,
    }
}
