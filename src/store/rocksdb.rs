use std::path::Path;
use std::sync::Mutex;

use rocksdb::{Direction, IteratorMode, Options, ReadOptions, WriteBatch, DB};
use serde::{Deserialize, Serialize};

use crate::contracts::{
    Document, DocumentStore, LockResultExt, Precondition, StoreError, VersionedDocument, Write,
};

/// Key prefix for document data
const DOC_PREFIX: &str = "doc";

/// On-disk envelope: the document plus its commit version.
#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u64,
    document: Document,
}

/// RocksDB-backed document store for single-node deployments.
///
/// Commits are serialized under a commit lock: preconditions are verified
/// against the live envelopes, then every write lands in one atomic
/// `WriteBatch`. Readers never block behind the lock.
///
/// Collection names must not contain ':'.
pub struct RocksDbStore {
    db: DB,
    commit_lock: Mutex<()>,
}

impl RocksDbStore {
    /// Opens or creates a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path).map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self {
            db,
            commit_lock: Mutex::new(()),
        })
    }

    /// Creates a document key.
    fn doc_key(collection: &str, key: &str) -> String {
        format!("{}:{}:{}", DOC_PREFIX, collection, key)
    }

    /// Creates a key prefix for a collection as bytes.
    fn doc_prefix_bytes(collection: &str) -> Vec<u8> {
        format!("{}:{}:", DOC_PREFIX, collection).into_bytes()
    }

    /// Creates an upper bound key for a collection scan (next byte after ':').
    fn doc_upper_bound(collection: &str) -> Vec<u8> {
        let mut bound = format!("{}:{}", DOC_PREFIX, collection).into_bytes();
        bound.push(b':' + 1);
        bound
    }

    fn serialize_envelope(envelope: &Envelope) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(envelope).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn deserialize_envelope(bytes: &[u8]) -> Result<Envelope, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn load(&self, collection: &str, key: &str) -> Result<Option<Envelope>, StoreError> {
        let db_key = Self::doc_key(collection, key);
        match self.db.get(db_key.as_bytes()) {
            Ok(Some(bytes)) => Ok(Some(Self::deserialize_envelope(&bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    /// Creates read options for scanning with an upper bound.
    fn read_options_with_bound(upper_bound: &[u8]) -> ReadOptions {
        let mut opts = ReadOptions::default();
        opts.set_iterate_upper_bound(upper_bound.to_vec());
        opts
    }
}

impl DocumentStore for RocksDbStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<VersionedDocument>, StoreError> {
        Ok(self.load(collection, key)?.map(|e| VersionedDocument {
            document: e.document,
            version: e.version,
        }))
    }

    fn commit(&self, writes: &[Write]) -> Result<(), StoreError> {
        let _guard = self.commit_lock.lock().map_lock_err()?;

        // Verify every precondition before building the batch.
        let mut versions = Vec::with_capacity(writes.len());
        for w in writes {
            let existing = self.load(&w.collection, &w.key)?;
            let existing_version = existing.as_ref().map(|e| e.version);
            match (&w.precondition, existing_version) {
                (Precondition::Any, v) => versions.push(v.unwrap_or(0)),
                (Precondition::Absent, None) => versions.push(0),
                (Precondition::Absent, Some(_)) => {
                    return Err(conflict(w, "document already exists".into()));
                }
                (Precondition::Version(expected), Some(found)) if found == *expected => {
                    versions.push(found);
                }
                (Precondition::Version(expected), Some(found)) => {
                    return Err(conflict(
                        w,
                        format!("version changed: expected {expected}, found {found}"),
                    ));
                }
                (Precondition::Version(_), None) => {
                    return Err(conflict(w, "document no longer exists".into()));
                }
            }
        }

        let mut batch = WriteBatch::default();
        for (w, version) in writes.iter().zip(versions) {
            let envelope = Envelope {
                version: version + 1,
                document: w.document.clone(),
            };
            let bytes = Self::serialize_envelope(&envelope)?;
            batch.put(Self::doc_key(&w.collection, &w.key).as_bytes(), &bytes);
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn scan(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let prefix_bytes = Self::doc_prefix_bytes(collection);
        let upper_bound = Self::doc_upper_bound(collection);
        let read_opts = Self::read_options_with_bound(&upper_bound);

        let iter = self.db.iterator_opt(
            IteratorMode::From(&prefix_bytes, Direction::Forward),
            read_opts,
        );

        let mut records = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Backend(e.to_string()))?;

            // Byte-based prefix check (no String allocation)
            if !key.starts_with(&prefix_bytes) {
                break;
            }

            let doc_key = String::from_utf8_lossy(&key[prefix_bytes.len()..]).into_owned();
            let envelope = Self::deserialize_envelope(&value)?;
            records.push((doc_key, envelope.document));
        }

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
