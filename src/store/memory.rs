//! Single-node in-memory document store
//!
//! `MemoryStore` backs the test suite and embedders that need no external
//! persistence. Collections are `DashMap`s keyed by document id; individual
//! CRUD calls are atomic through DashMap's internal locking, and atomic
//! units serialize on an in-process mutex, which is sufficient
//! read-modify-write isolation for a single-node store.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{DocRef, Document, DocumentStore, Snapshot, TransactionalApply, WriteOp};
use crate::types::{LedgerError, StoreError};

/// In-memory [`DocumentStore`] implementation
///
/// Tracks the number of I/O operations it has served; tests use the
/// counter to assert that rejected mutations never reached storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, DashMap<String, Document>>,
    unit_gate: Mutex<()>,
    io_ops: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total I/O operations served since creation (reads and writes,
    /// including each access inside an atomic unit).
    pub fn io_operations(&self) -> u64 {
        self.io_ops.load(Ordering::Relaxed)
    }

    fn record_io(&self) {
        self.io_ops.fetch_add(1, Ordering::Relaxed);
    }

    fn read_doc(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(id).map(|entry| entry.value().clone()))
    }

    fn write_doc(&self, collection: &str, id: &str, doc: Document) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
    }

    fn merge_doc(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError> {
        let docs = self
            .collections
            .entry(collection.to_string())
            .or_default();
        let mut entry = docs.get_mut(id).ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;
        merge_into(entry.value_mut(), patch);
        Ok(())
    }

    fn remove_doc(&self, collection: &str, id: &str) {
        if let Some(docs) = self.collections.get(collection) {
            docs.remove(id);
        }
    }
}

/// Shallow merge: object patches overwrite matching top-level fields;
/// a non-object patch replaces the document wholesale.
fn merge_into(doc: &mut Document, patch: Document) {
    match (doc.as_object_mut(), patch) {
        (Some(target), Document::Object(fields)) => {
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        (_, other) => *doc = other,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.record_io();
        Ok(self.read_doc(collection, id))
    }

    async fn add(&self, collection: &str, mut doc: Document) -> Result<String, StoreError> {
        self.record_io();
        let id = Uuid::new_v4().to_string();
        if let Some(fields) = doc.as_object_mut() {
            fields.insert("id".to_string(), Document::String(id.clone()));
        }
        self.write_doc(collection, &id, doc);
        Ok(id)
    }

    async fn put(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        self.record_io();
        self.write_doc(collection, id, doc);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError> {
        self.record_io();
        self.merge_doc(collection, id, patch)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.record_io();
        self.remove_doc(collection, id);
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.record_io();
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.iter().map(|entry| entry.value().clone()).collect())
            .unwrap_or_default())
    }

    async fn read_modify_write(
        &self,
        refs: Vec<DocRef>,
        apply: TransactionalApply,
    ) -> Result<(), LedgerError> {
        let _guard = self.unit_gate.lock().await;

        let mut snapshot = Snapshot::new();
        for doc_ref in refs {
            self.record_io();
            let doc = self.read_doc(&doc_ref.collection, &doc_ref.id);
            snapshot.insert(doc_ref, doc);
        }

        let writes = apply(&snapshot)?;

        // Abort with no partial write: every update target must exist
        // before the first write is applied.
        for op in &writes {
            if let WriteOp::Update { target, .. } = op {
                if self.read_doc(&target.collection, &target.id).is_none() {
                    return Err(StoreError::NotFound {
                        collection: target.collection.clone(),
                        id: target.id.clone(),
                    }
                    .into());
                }
            }
        }

        for op in writes {
            self.record_io();
            match op {
                WriteOp::Put { target, doc } => self.write_doc(&target.collection, &target.id, doc),
                WriteOp::Update { target, patch } => {
                    self.merge_doc(&target.collection, &target.id, patch)?
                }
                WriteOp::Delete { target } => self.remove_doc(&target.collection, &target.id),
            }
        }

        Ok(())
    }
}
