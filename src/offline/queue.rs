//! Durable local queue of pending mutations
//!
//! Mutations attempted while offline — or failing online with a
//! recoverable classification — land here and are replayed against the
//! document store when connectivity returns. Operations are keyed by a
//! caller-assigned id, replay independently of each other, and are never
//! silently dropped: after [`MAX_REPLAY_FAILURES`] consecutive failures an
//! operation is parked for manual retry.

use std::sync::Arc;

use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::retry::{RetryConfig, RetryExecutor};
use crate::store::DocumentStore;
use crate::types::{LedgerError, MutationKind, OperationId, QueuedOperation};

/// Consecutive replay failures after which an operation is parked for
/// manual retry (never auto-dropped — data loss is never silent).
pub const MAX_REPLAY_FAILURES: u32 = 3;

/// Queue-drain configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainConfig {
    /// Maximum operations replaying concurrently during a drain
    pub max_concurrent: usize,
}

impl Default for DrainConfig {
    fn default() -> Self {
        DrainConfig {
            max_concurrent: num_cpus::get().max(1),
        }
    }
}

impl DrainConfig {
    /// Create a config; zero concurrency is clamped to one.
    pub fn new(max_concurrent: usize) -> Self {
        DrainConfig {
            max_concurrent: max_concurrent.max(1),
        }
    }
}

/// Outcome of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Operations replayed this pass
    pub attempted: usize,

    /// Operations confirmed and removed
    pub succeeded: usize,

    /// Operations retained with an incremented retry count
    pub failed: usize,

    /// Operations skipped because they are parked for manual retry
    pub stalled: usize,
}

/// Pending-mutation queue with retry/backoff replay
pub struct OfflineQueue<S> {
    store: Arc<S>,
    pending: DashMap<OperationId, QueuedOperation>,
    retry: RetryExecutor,
    config: DrainConfig,
}

impl<S: DocumentStore> OfflineQueue<S> {
    /// Create a queue replaying against the given store.
    pub fn new(store: Arc<S>, retry: RetryConfig, config: DrainConfig) -> Self {
        OfflineQueue {
            store,
            pending: DashMap::new(),
            retry: RetryExecutor::new(retry),
            config,
        }
    }

    /// Add an operation to the queue.
    ///
    /// Operations are de-duplicated by id: enqueueing an id already
    /// present replaces the stored operation rather than queueing a
    /// second copy.
    pub fn enqueue(&self, operation: QueuedOperation) {
        debug!(
            "queued {:?} on {}/{} (op {})",
            operation.kind, operation.collection, operation.document_id, operation.id
        );
        self.pending.insert(operation.id.clone(), operation);
    }

    /// Number of operations currently queued (including parked ones).
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the queue holds no operations.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Snapshot of all queued operations in enqueue order.
    pub fn pending_operations(&self) -> Vec<QueuedOperation> {
        let mut operations: Vec<QueuedOperation> =
            self.pending.iter().map(|entry| entry.value().clone()).collect();
        operations.sort_by_key(|op| op.enqueued_at);
        operations
    }

    /// Operations parked after exhausting their automatic replays.
    pub fn stalled_operations(&self) -> Vec<QueuedOperation> {
        self.pending_operations()
            .into_iter()
            .filter(|op| op.retry_count >= MAX_REPLAY_FAILURES)
            .collect()
    }

    /// Replay every eligible operation against the store.
    ///
    /// Operations run concurrently with independent outcomes: one
    /// failure never blocks its siblings. Successes are removed;
    /// failures stay queued with an incremented retry count and the
    /// recorded error. Parked operations are skipped (see
    /// [`OfflineQueue::retry_operation`]).
    pub async fn drain(&self) -> DrainReport {
        let snapshot = self.pending_operations();
        let (eligible, parked): (Vec<_>, Vec<_>) = snapshot
            .into_iter()
            .partition(|op| op.retry_count < MAX_REPLAY_FAILURES);

        let mut report = DrainReport {
            attempted: eligible.len(),
            stalled: parked.len(),
            ..DrainReport::default()
        };

        let outcomes: Vec<(QueuedOperation, Result<(), LedgerError>)> =
            stream::iter(eligible.into_iter().map(|operation| async move {
                let outcome = self.replay(&operation).await;
                (operation, outcome)
            }))
            .buffer_unordered(self.config.max_concurrent)
            .collect()
            .await;

        for (operation, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    self.pending.remove(&operation.id);
                    report.succeeded += 1;
                }
                Err(error) => {
                    report.failed += 1;
                    if let Some(mut entry) = self.pending.get_mut(&operation.id) {
                        entry.retry_count += 1;
                        entry.last_error = Some(error.to_string());
                        if entry.retry_count >= MAX_REPLAY_FAILURES {
                            warn!(
                                "operation {} parked after {} failures: {}",
                                operation.id, entry.retry_count, error
                            );
                        }
                    }
                }
            }
        }

        info!(
            "queue drained: {} attempted, {} ok, {} failed, {} parked",
            report.attempted, report.succeeded, report.failed, report.stalled
        );
        report
    }

    /// Manually replay one operation, parked or not.
    ///
    /// On success the operation is removed; on failure it stays queued
    /// with the updated retry count and error.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidOperation`] for an unknown id, or
    /// the replay failure itself.
    pub async fn retry_operation(&self, id: &str) -> Result<(), LedgerError> {
        let operation = self
            .pending
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                LedgerError::invalid_operation(format!("no queued operation with id {id}"))
            })?;

        match self.replay(&operation).await {
            Ok(()) => {
                self.pending.remove(id);
                Ok(())
            }
            Err(error) => {
                if let Some(mut entry) = self.pending.get_mut(id) {
                    entry.retry_count += 1;
                    entry.last_error = Some(error.to_string());
                }
                Err(error)
            }
        }
    }

    /// Replay one operation with in-flight retry/backoff.
    ///
    /// Replay is idempotent by construction: creates are keyed `put`s on
    /// the caller-assigned document id, updates merge the same patch,
    /// and deleting an absent document is a no-op.
    async fn replay(&self, operation: &QueuedOperation) -> Result<(), LedgerError> {
        let label = format!("replay of operation {}", operation.id);
        self.retry
            .run(&label, || async move {
                match operation.kind {
                    MutationKind::Create => {
                        self.store
                            .put(
                                &operation.collection,
                                &operation.document_id,
                                operation.payload.clone(),
                            )
                            .await?
                    }
                    MutationKind::Update => {
                        self.store
                            .update(
                                &operation.collection,
                                &operation.document_id,
                                operation.payload.clone(),
                            )
                            .await?
                    }
                    MutationKind::Delete => {
                        self.store
                            .delete(&operation.collection, &operation.document_id)
                            .await?
                    }
                }
                Ok(())
            })
            .await
    }
}

/// Drain the queue whenever connectivity transitions from offline to
/// online. Watches a [`crate::store::NetworkMonitor`] subscription until
/// the monitor is dropped.
pub fn spawn_drain_on_reconnect<S>(
    queue: Arc<OfflineQueue<S>>,
    mut network: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    S: DocumentStore + 'static,
{
    tokio::spawn(async move {
        let mut was_online = *network.borrow();
        while network.changed().await.is_ok() {
            let online = *network.borrow();
            if online && !was_online {
                debug!("connectivity restored, draining offline queue");
                queue.drain().await;
            }
            was_online = online;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::retry::BackoffStrategy;
    use crate::store::{MemoryStore, NetworkMonitor, TRANSACTIONS};
    use crate::types::StoreError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Store whose writes fail with a transient error until the fuse
    /// burns down, then delegate to an inner MemoryStore.
    struct FlakyStore {
        inner: MemoryStore,
        failures_remaining: AtomicU32,
    }

    impl FlakyStore {
        fn failing(times: u32) -> Self {
            FlakyStore {
                inner: MemoryStore::new(),
                failures_remaining: AtomicU32::new(times),
            }
        }

        fn trip(&self) -> Result<(), StoreError> {
            let tripped = self
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1))
                .is_ok();
            if tripped {
                return Err(StoreError::unavailable("simulated outage"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn get(
            &self,
            collection: &str,
            id: &str,
        ) -> Result<Option<crate::store::Document>, StoreError> {
            self.inner.get(collection, id).await
        }

        async fn add(
            &self,
            collection: &str,
            doc: crate::store::Document,
        ) -> Result<String, StoreError> {
            self.trip()?;
            self.inner.add(collection, doc).await
        }

        async fn put(
            &self,
            collection: &str,
            id: &str,
            doc: crate::store::Document,
        ) -> Result<(), StoreError> {
            self.trip()?;
            self.inner.put(collection, id, doc).await
        }

        async fn update(
            &self,
            collection: &str,
            id: &str,
            patch: crate::store::Document,
        ) -> Result<(), StoreError> {
            self.trip()?;
            self.inner.update(collection, id, patch).await
        }

        async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
            self.trip()?;
            self.inner.delete(collection, id).await
        }

        async fn list(&self, collection: &str) -> Result<Vec<crate::store::Document>, StoreError> {
            self.inner.list(collection).await
        }

        async fn read_modify_write(
            &self,
            refs: Vec<crate::store::DocRef>,
            apply: crate::store::TransactionalApply,
        ) -> Result<(), LedgerError> {
            self.trip().map_err(LedgerError::from)?;
            self.inner.read_modify_write(refs, apply).await
        }
    }

    fn single_attempt() -> RetryConfig {
        RetryConfig::new(1, Duration::from_millis(1), BackoffStrategy::Fixed)
    }

    fn queue_over<S: DocumentStore>(store: Arc<S>, retry: RetryConfig) -> OfflineQueue<S> {
        OfflineQueue::new(store, retry, DrainConfig::new(4))
    }

    fn create_op(id: &str, doc_id: &str) -> QueuedOperation {
        QueuedOperation::create(id, TRANSACTIONS, doc_id, json!({"id": doc_id, "amount": "100"}))
    }

    #[test]
    fn test_enqueue_deduplicates_by_operation_id() {
        let store = Arc::new(MemoryStore::new());
        let queue = queue_over(store, RetryConfig::default());

        queue.enqueue(create_op("op-1", "txn-1"));
        queue.enqueue(create_op("op-1", "txn-1"));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_drain_replays_and_removes_successes() {
        let store = Arc::new(MemoryStore::new());
        let queue = queue_over(Arc::clone(&store), RetryConfig::default());

        queue.enqueue(create_op("op-1", "txn-1"));
        queue.enqueue(create_op("op-2", "txn-2"));

        let report = queue.drain().await;
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 0);
        assert!(queue.is_empty());
        assert_eq!(store.list(TRANSACTIONS).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_siblings() {
        let store = Arc::new(MemoryStore::new());
        let queue = queue_over(Arc::clone(&store), single_attempt());

        // Update on a missing document fails referentially; the create
        // alongside it must still land.
        queue.enqueue(QueuedOperation::update(
            "op-bad",
            TRANSACTIONS,
            "ghost",
            json!({"settled": true}),
        ));
        queue.enqueue(create_op("op-good", "txn-1"));

        let report = queue.drain().await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(queue.len(), 1);

        let retained = &queue.pending_operations()[0];
        assert_eq!(retained.id, "op-bad");
        assert_eq!(retained.retry_count, 1);
        assert!(retained.last_error.as_deref().unwrap().contains("not found"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried_within_one_drain() {
        let store = Arc::new(FlakyStore::failing(2));
        let retry = RetryConfig::new(3, Duration::from_millis(10), BackoffStrategy::Exponential);
        let queue = queue_over(store, retry);

        queue.enqueue(create_op("op-1", "txn-1"));

        let report = queue.drain().await;
        assert_eq!(report.succeeded, 1);
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_parks_after_three_failed_drains() {
        let store = Arc::new(FlakyStore::failing(u32::MAX));
        let queue = queue_over(store, single_attempt());

        queue.enqueue(create_op("op-1", "txn-1"));

        for expected_failures in 1..=MAX_REPLAY_FAILURES {
            let report = queue.drain().await;
            assert_eq!(report.failed, 1);
            assert_eq!(queue.pending_operations()[0].retry_count, expected_failures);
        }

        // Parked, not dropped: skipped by automatic drains but still queued.
        let report = queue.drain().await;
        assert_eq!(report.attempted, 0);
        assert_eq!(report.stalled, 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.stalled_operations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_retry_revives_parked_operation() {
        let store = Arc::new(FlakyStore::failing(MAX_REPLAY_FAILURES));
        let queue = queue_over(Arc::clone(&store), single_attempt());

        queue.enqueue(create_op("op-1", "txn-1"));
        for _ in 0..MAX_REPLAY_FAILURES {
            queue.drain().await;
        }
        assert_eq!(queue.stalled_operations().len(), 1);

        // The outage is over; a manual retry succeeds and clears it.
        queue.retry_operation("op-1").await.unwrap();
        assert!(queue.is_empty());
        assert_eq!(store.list(TRANSACTIONS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_manual_retry_of_unknown_id_fails() {
        let store = Arc::new(MemoryStore::new());
        let queue = queue_over(store, RetryConfig::default());

        let err = queue.retry_operation("ghost").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOperation { .. }));
    }

    #[tokio::test]
    async fn test_replaying_same_id_twice_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let queue = queue_over(Arc::clone(&store), RetryConfig::default());

        queue.enqueue(create_op("op-1", "txn-1"));
        queue.drain().await;

        // A crash mid-drain loses the removal but not the replay; the
        // operation comes back and is replayed a second time.
        queue.enqueue(create_op("op-1", "txn-1"));
        queue.drain().await;

        let docs = store.list(TRANSACTIONS).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["amount"], "100");
    }

    #[tokio::test]
    async fn test_delete_replay_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(TRANSACTIONS, "txn-1", json!({"id": "txn-1"}))
            .await
            .unwrap();
        let queue = queue_over(Arc::clone(&store), RetryConfig::default());

        queue.enqueue(QueuedOperation::delete("op-1", TRANSACTIONS, "txn-1"));
        queue.drain().await;
        queue.enqueue(QueuedOperation::delete("op-1", TRANSACTIONS, "txn-1"));
        let report = queue.drain().await;

        assert_eq!(report.succeeded, 1);
        assert!(store.get(TRANSACTIONS, "txn-1").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_transition_triggers_drain() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(queue_over(Arc::clone(&store), RetryConfig::default()));
        queue.enqueue(create_op("op-1", "txn-1"));

        let monitor = NetworkMonitor::new(false);
        let watcher = spawn_drain_on_reconnect(Arc::clone(&queue), monitor.subscribe());

        monitor.set_online(true);

        // The watcher drains asynchronously; poll until it lands.
        for _ in 0..100 {
            if queue.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(queue.is_empty());
        assert_eq!(store.list(TRANSACTIONS).await.unwrap().len(), 1);
        watcher.abort();
    }
}
