//! Transaction-related types for the ledger engine
//!
//! A transaction is an immutable financial event once committed; edits and
//! deletions are themselves mutations against the log, never in-place
//! changes to derived state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountId;

/// Transaction identifier (document-store key)
pub type TransactionId = String;

/// The kinds of financial event the ledger records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money entering an account (including credit-card payments)
    Income,

    /// Money leaving an account (including credit-card purchases)
    Expense,

    /// Money moving between two accounts of the same user
    Transfer,
}

/// Division of a purchase into equal future charges
///
/// `total_interest` is the interest amortized evenly across the
/// installments; it may be absent for interest-free plans, in which case
/// the transaction contributes nothing to interest aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentPlan {
    /// Number of monthly installments; non-positive plans are inert
    pub count: i32,

    /// Total interest to amortize across the plan, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_interest: Option<Decimal>,

    /// Principal charged per installment
    pub per_installment_amount: Decimal,
}

/// A single financial event
///
/// Invariants (enforced at validation, not by construction): `amount` is
/// always positive; a Transfer carries a destination distinct from its
/// source; a category is required unless the transaction is a transfer or
/// a credit-card payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Document id of this transaction
    pub id: TransactionId,

    /// Income, Expense, or Transfer
    pub kind: TransactionKind,

    /// Positive amount in currency minor units
    pub amount: Decimal,

    /// Spending category; optional only for transfers and card payments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// When the event occurred
    pub occurred_at: DateTime<Utc>,

    /// Whether the event has settled ("paid"); unsettled events are
    /// excluded from depository balances but still consume credit capacity
    pub settled: bool,

    /// Account the event is recorded against (transfer source)
    pub source_account_id: AccountId,

    /// Transfer destination; present iff kind is Transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_account_id: Option<AccountId>,

    /// Installment plan for financed purchases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<InstallmentPlan>,

    /// Link to the recurring payment that generated this event, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_payment_id: Option<String>,

    /// When the document was created
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Whether this transaction touches the given account on either leg.
    pub fn touches(&self, account_id: &str) -> bool {
        self.source_account_id == account_id
            || self
                .destination_account_id
                .as_deref()
                .is_some_and(|dest| dest == account_id)
    }

    /// Whether this is a transfer arriving at the given account.
    pub fn is_incoming_transfer(&self, account_id: &str) -> bool {
        self.kind == TransactionKind::Transfer
            && self
                .destination_account_id
                .as_deref()
                .is_some_and(|dest| dest == account_id)
    }

    /// Whether this is a transfer leaving the given account.
    pub fn is_outgoing_transfer(&self, account_id: &str) -> bool {
        self.kind == TransactionKind::Transfer && self.source_account_id == account_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn transfer(source: &str, dest: &str) -> Transaction {
        Transaction {
            id: "txn-1".to_string(),
            kind: TransactionKind::Transfer,
            amount: dec!(100),
            category: None,
            description: String::new(),
            occurred_at: Utc::now(),
            settled: true,
            source_account_id: source.to_string(),
            destination_account_id: Some(dest.to_string()),
            installments: None,
            recurring_payment_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_touches_both_legs_of_transfer() {
        let txn = transfer("a", "b");
        assert!(txn.touches("a"));
        assert!(txn.touches("b"));
        assert!(!txn.touches("c"));
    }

    #[test]
    fn test_transfer_direction_helpers() {
        let txn = transfer("a", "b");
        assert!(txn.is_outgoing_transfer("a"));
        assert!(!txn.is_outgoing_transfer("b"));
        assert!(txn.is_incoming_transfer("b"));
        assert!(!txn.is_incoming_transfer("a"));
    }

    #[test]
    fn test_non_transfer_is_never_directional() {
        let txn = Transaction {
            kind: TransactionKind::Expense,
            destination_account_id: None,
            ..transfer("a", "b")
        };
        assert!(!txn.is_outgoing_transfer("a"));
        assert!(!txn.is_incoming_transfer("a"));
    }

    #[test]
    fn test_serde_round_trip_preserves_amount_precision() {
        let txn = Transaction {
            amount: dec!(1234.56),
            ..transfer("a", "b")
        };
        let json = serde_json::to_value(&txn).unwrap();
        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back.amount, dec!(1234.56));
    }
}
