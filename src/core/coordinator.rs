//! Atomic multi-document mutations
//!
//! Transfers and credit-card payments touch two accounts and must commit
//! together or not at all, under concurrent access from other clients.
//! Account existence is verified *inside* the atomic unit — the snapshot
//! and the commit share one isolation scope, so there is no window for a
//! check-then-act race.
//!
//! Business-rule validation (balance sufficiency, §strategy) runs before
//! the coordinator is invoked; this layer enforces only referential and
//! atomicity invariants.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::store::{DocRef, DocumentStore, WriteOp, ACCOUNTS, TRANSACTIONS};
use crate::types::{AccountId, LedgerError, StoreError, Transaction, TransactionKind};

/// A transfer between two depository accounts
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Account the money leaves
    pub source_account_id: AccountId,

    /// Account the money arrives at
    pub destination_account_id: AccountId,

    /// Positive transfer amount
    pub amount: Decimal,

    /// Free-form description carried onto the transaction
    pub description: String,

    /// When the transfer occurred
    pub occurred_at: DateTime<Utc>,

    /// Whether the transfer is already settled
    pub settled: bool,
}

impl TransferRequest {
    /// Materialize the transfer transaction this request describes.
    /// Transfers carry no category.
    pub(crate) fn build_transaction(&self) -> Transaction {
        Transaction {
            id: Uuid::new_v4().to_string(),
            kind: TransactionKind::Transfer,
            amount: self.amount,
            category: None,
            description: self.description.clone(),
            occurred_at: self.occurred_at,
            settled: self.settled,
            source_account_id: self.source_account_id.clone(),
            destination_account_id: Some(self.destination_account_id.clone()),
            installments: None,
            recurring_payment_id: None,
            created_at: Utc::now(),
        }
    }
}

/// One leg of a credit-card payment
#[derive(Debug, Clone)]
pub struct PaymentLeg {
    /// Account this leg is recorded against
    pub account_id: AccountId,

    /// Positive leg amount
    pub amount: Decimal,

    /// Free-form description carried onto the transaction
    pub description: String,

    /// When the payment occurred
    pub occurred_at: DateTime<Utc>,

    /// Whether the leg is already settled
    pub settled: bool,
}

/// Executes multi-account writes as all-or-nothing units
#[derive(Debug, Clone)]
pub struct MutationCoordinator<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> MutationCoordinator<S> {
    /// Create a coordinator over the given store.
    pub fn new(store: Arc<S>) -> Self {
        MutationCoordinator { store }
    }

    /// Execute a transfer between two accounts.
    ///
    /// `source == destination` is rejected before any I/O. Both accounts
    /// are read-verified inside the atomic unit; if either is missing the
    /// whole unit aborts with no partial write. On success the committed
    /// transfer transaction is returned.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::TransferToSelf`] when both legs name one account
    /// - [`LedgerError::InvalidAmount`] for a non-positive amount
    /// - [`LedgerError::AccountNotFound`] when either account is missing
    /// - [`LedgerError::Store`] for storage failures
    pub async fn execute_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<Transaction, LedgerError> {
        if request.source_account_id == request.destination_account_id {
            return Err(LedgerError::TransferToSelf {
                account: request.source_account_id,
            });
        }
        if request.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                amount: request.amount,
            });
        }

        let transaction = request.build_transaction();
        let doc = to_document(&transaction)?;

        let source_ref = DocRef::new(ACCOUNTS, &request.source_account_id);
        let dest_ref = DocRef::new(ACCOUNTS, &request.destination_account_id);
        let txn_ref = DocRef::new(TRANSACTIONS, &transaction.id);

        self.store
            .read_modify_write(
                vec![source_ref.clone(), dest_ref.clone()],
                Box::new(move |snapshot| {
                    require_account(snapshot, &source_ref)?;
                    require_account(snapshot, &dest_ref)?;
                    Ok(vec![WriteOp::Put {
                        target: txn_ref,
                        doc,
                    }])
                }),
            )
            .await?;

        debug!(
            "transfer committed: {} -> {} ({})",
            transaction.source_account_id, request.destination_account_id, transaction.amount
        );
        Ok(transaction)
    }

    /// Execute a credit-card payment sourced from another account.
    ///
    /// Commits the paired transaction documents — an income on the credit
    /// account and an expense on the funding account — in one atomic
    /// unit, after read-verifying both accounts inside it.
    pub async fn execute_credit_payment(
        &self,
        credit_leg: PaymentLeg,
        source_leg: PaymentLeg,
    ) -> Result<(Transaction, Transaction), LedgerError> {
        if credit_leg.account_id == source_leg.account_id {
            return Err(LedgerError::TransferToSelf {
                account: credit_leg.account_id,
            });
        }
        if credit_leg.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                amount: credit_leg.amount,
            });
        }
        if source_leg.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                amount: source_leg.amount,
            });
        }

        let payment = leg_transaction(&credit_leg, TransactionKind::Income);
        let funding = leg_transaction(&source_leg, TransactionKind::Expense);
        let payment_doc = to_document(&payment)?;
        let funding_doc = to_document(&funding)?;

        let credit_ref = DocRef::new(ACCOUNTS, &credit_leg.account_id);
        let source_ref = DocRef::new(ACCOUNTS, &source_leg.account_id);
        let payment_ref = DocRef::new(TRANSACTIONS, &payment.id);
        let funding_ref = DocRef::new(TRANSACTIONS, &funding.id);

        self.store
            .read_modify_write(
                vec![credit_ref.clone(), source_ref.clone()],
                Box::new(move |snapshot| {
                    require_account(snapshot, &credit_ref)?;
                    require_account(snapshot, &source_ref)?;
                    Ok(vec![
                        WriteOp::Put {
                            target: payment_ref,
                            doc: payment_doc,
                        },
                        WriteOp::Put {
                            target: funding_ref,
                            doc: funding_doc,
                        },
                    ])
                }),
            )
            .await?;

        debug!(
            "credit payment committed: {} pays {} from {}",
            credit_leg.account_id, payment.amount, source_leg.account_id
        );
        Ok((payment, funding))
    }
}

/// Build one leg's transaction document. Card-payment legs carry no
/// category — the pairing itself documents the purpose.
pub(crate) fn leg_transaction(leg: &PaymentLeg, kind: TransactionKind) -> Transaction {
    Transaction {
        id: Uuid::new_v4().to_string(),
        kind,
        amount: leg.amount,
        category: None,
        description: leg.description.clone(),
        occurred_at: leg.occurred_at,
        settled: leg.settled,
        source_account_id: leg.account_id.clone(),
        destination_account_id: None,
        installments: None,
        recurring_payment_id: None,
        created_at: Utc::now(),
    }
}

fn to_document(transaction: &Transaction) -> Result<crate::store::Document, LedgerError> {
    serde_json::to_value(transaction)
        .map_err(|e| StoreError::corrupt(TRANSACTIONS, e.to_string()).into())
}

fn require_account(
    snapshot: &crate::store::Snapshot,
    doc_ref: &DocRef,
) -> Result<(), LedgerError> {
    match snapshot.get(doc_ref) {
        Some(Some(_)) => Ok(()),
        _ => Err(LedgerError::account_not_found(&doc_ref.id)),
    }
}
