//! Queued-mutation types for offline replay
//!
//! A [`QueuedOperation`] captures a pending mutation awaiting replay against
//! the document store. Operations are keyed by a caller-assigned unique id
//! so that a replay interrupted mid-drain can run again without duplicating
//! effects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Queued-operation identifier, assigned by the caller at enqueue time
pub type OperationId = String;

/// The CRUD shape of a queued mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    /// Create (or re-create, idempotently) a document with a known id
    Create,

    /// Partially update an existing document
    Update,

    /// Delete a document; deleting an absent document is a no-op
    Delete,
}

/// A pending mutation awaiting replay
///
/// Created when a mutation is attempted while offline, or when an online
/// attempt fails with a recoverable classification. Removed only after a
/// confirmed successful replay; after
/// [`MAX_REPLAY_FAILURES`](crate::offline::MAX_REPLAY_FAILURES)
/// consecutive failures it is retained for manual retry, never dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Unique id; replaying the same id twice must be a no-op
    pub id: OperationId,

    /// Create, Update, or Delete
    pub kind: MutationKind,

    /// Target collection name
    pub collection: String,

    /// Target document id within the collection
    pub document_id: String,

    /// Document body (Create) or partial patch (Update); null for Delete
    #[serde(default)]
    pub payload: Value,

    /// When the operation entered the queue
    pub enqueued_at: DateTime<Utc>,

    /// Consecutive replay failures so far
    #[serde(default)]
    pub retry_count: u32,

    /// Message of the most recent replay failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueuedOperation {
    /// Create-operation constructor; the document id doubles as the
    /// idempotency key for replay.
    pub fn create(id: impl Into<OperationId>, collection: &str, document_id: &str, payload: Value) -> Self {
        QueuedOperation {
            id: id.into(),
            kind: MutationKind::Create,
            collection: collection.to_string(),
            document_id: document_id.to_string(),
            payload,
            enqueued_at: Utc::now(),
            retry_count: 0,
            last_error: None,
        }
    }

    /// Update-operation constructor.
    pub fn update(id: impl Into<OperationId>, collection: &str, document_id: &str, patch: Value) -> Self {
        QueuedOperation {
            kind: MutationKind::Update,
            ..QueuedOperation::create(id, collection, document_id, patch)
        }
    }

    /// Delete-operation constructor.
    pub fn delete(id: impl Into<OperationId>, collection: &str, document_id: &str) -> Self {
        QueuedOperation {
            kind: MutationKind::Delete,
            ..QueuedOperation::create(id, collection, document_id, Value::Null)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constructors_set_kind_and_payload() {
        let create = QueuedOperation::create("op-1", "transactions", "txn-1", json!({"amount": "100"}));
        assert_eq!(create.kind, MutationKind::Create);
        assert_eq!(create.retry_count, 0);
        assert!(create.last_error.is_none());

        let update = QueuedOperation::update("op-2", "debts", "debt-1", json!({"remaining": "0"}));
        assert_eq!(update.kind, MutationKind::Update);

        let delete = QueuedOperation::delete("op-3", "transactions", "txn-1");
        assert_eq!(delete.kind, MutationKind::Delete);
        assert_eq!(delete.payload, Value::Null);
    }

    #[test]
    fn test_queued_operation_serde_round_trip() {
        let op = QueuedOperation::create("op-1", "transactions", "txn-1", json!({"x": 1}));
        let json = serde_json::to_value(&op).unwrap();
        let back: QueuedOperation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }
}
