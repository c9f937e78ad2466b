//! External capabilities consumed by the ledger core
//!
//! The core depends on exactly three environment-provided capabilities,
//! defined here as traits so persistence and platform concerns stay out of
//! the derivation logic:
//!
//! - [`DocumentStore`] — per-collection CRUD plus a transactional
//!   read-modify-write primitive for multi-document atomic units.
//! - [`NetworkMonitor`] — an online/offline signal the offline queue
//!   subscribes to for drain triggering.
//! - [`NotificationSink`] — a fire-and-forget channel for surfacing
//!   validation failures and duplicate advisories; the core never blocks
//!   on it.
//!
//! [`memory::MemoryStore`] is the bundled single-node implementation used
//! by the test suite and by embedders without an external backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::types::{LedgerError, StoreError};

pub mod memory;

pub use memory::MemoryStore;

/// Collection holding transaction documents
pub const TRANSACTIONS: &str = "transactions";
/// Collection holding account documents
pub const ACCOUNTS: &str = "accounts";
/// Collection holding debt documents
pub const DEBTS: &str = "debts";
/// Collection holding queued offline operations
pub const QUEUE: &str = "offline_queue";

/// A persisted document; flat JSON matching the types in [`crate::types`]
pub type Document = serde_json::Value;

/// Fully-qualified reference to one document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocRef {
    /// Collection name
    pub collection: String,
    /// Document id within the collection
    pub id: String,
}

impl DocRef {
    /// Create a document reference
    pub fn new(collection: &str, id: &str) -> Self {
        DocRef {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

/// One write inside an atomic unit
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Create-or-replace the document at `target`
    Put {
        /// Destination of the write
        target: DocRef,
        /// Full document body
        doc: Document,
    },

    /// Shallow-merge `patch` into the document at `target`
    Update {
        /// Destination of the write
        target: DocRef,
        /// Fields to merge
        patch: Document,
    },

    /// Remove the document at `target`; absent documents are a no-op
    Delete {
        /// Destination of the delete
        target: DocRef,
    },
}

/// Snapshot handed to the apply step of an atomic unit: every requested
/// [`DocRef`] maps to its document, or `None` when it does not exist.
pub type Snapshot = HashMap<DocRef, Option<Document>>;

/// The apply step of an atomic unit: inspects the snapshot and either
/// returns the write set to commit or an error that aborts the whole unit
/// with no partial write.
pub type TransactionalApply =
    Box<dyn FnOnce(&Snapshot) -> Result<Vec<WriteOp>, LedgerError> + Send>;

/// Document-store capability
///
/// Any backend offering per-collection CRUD and read-modify-write
/// atomicity across two or more documents satisfies this contract: a
/// relational transaction, an optimistic-concurrency document store, or an
/// in-process mutex for a single-node store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, or `None` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Insert a document under a freshly generated id; returns the id.
    async fn add(&self, collection: &str, doc: Document) -> Result<String, StoreError>;

    /// Create-or-replace the document at `id`.
    ///
    /// This is the idempotent-replay primitive: putting the same document
    /// under the same id twice leaves the store in the same state as once.
    async fn put(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError>;

    /// Shallow-merge `patch` into the document at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the document does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError>;

    /// Delete the document at `id`; deleting an absent document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// List every document in a collection.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Execute one atomic unit: snapshot the referenced documents, run
    /// `apply` to produce the write set, and commit it all-or-nothing.
    ///
    /// Existence checks belong inside `apply`, not before the call — the
    /// snapshot and the commit happen under the same isolation, closing
    /// the check-then-act race.
    async fn read_modify_write(
        &self,
        refs: Vec<DocRef>,
        apply: TransactionalApply,
    ) -> Result<(), LedgerError>;
}

/// Network-status signal
///
/// Wraps a watch channel: the producer side (platform glue) flips the
/// flag, consumers poll [`NetworkMonitor::is_online`] or subscribe for
/// transitions. Every `set_online` call notifies subscribers, so watchers
/// must compare against the previous value to detect true transitions.
#[derive(Debug)]
pub struct NetworkMonitor {
    sender: watch::Sender<bool>,
}

impl NetworkMonitor {
    /// Create a monitor with the given initial connectivity.
    pub fn new(initially_online: bool) -> Self {
        let (sender, _) = watch::channel(initially_online);
        NetworkMonitor { sender }
    }

    /// Report a connectivity change.
    pub fn set_online(&self, online: bool) {
        self.sender.send_replace(online);
    }

    /// Current connectivity as last reported.
    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Subscribe to connectivity changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Category of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// A mutation was rejected by business-rule validation
    ValidationFailed,

    /// A candidate transaction closely matches existing history
    DuplicateSuspected,

    /// The offline queue finished a drain pass
    QueueDrained,

    /// A queued operation exhausted its automatic retries
    QueueStalled,
}

/// Fire-and-forget notification channel
///
/// Implementations must not block; the core calls `notify` synchronously
/// on its own task and never awaits delivery.
pub trait NotificationSink: Send + Sync {
    /// Surface a message to the user.
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Sink that drops every notice; useful for tests and headless embedding.
#[derive(Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _kind: NoticeKind, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_monitor_reports_latest_state() {
        let monitor = NetworkMonitor::new(true);
        assert!(monitor.is_online());

        monitor.set_online(false);
        assert!(!monitor.is_online());

        monitor.set_online(true);
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let monitor = NetworkMonitor::new(false);
        let mut rx = monitor.subscribe();

        monitor.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[test]
    fn test_doc_ref_equality_and_hashing() {
        use std::collections::HashSet;

        let a = DocRef::new(ACCOUNTS, "acc-1");
        let b = DocRef::new(ACCOUNTS, "acc-1");
        let c = DocRef::new(ACCOUNTS, "acc-2");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
    }
}
