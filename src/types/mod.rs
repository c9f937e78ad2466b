//! Core data types for the ledger engine
//!
//! Flat, serde-serializable records matching the persisted document layout:
//! accounts, transactions, debts, queued mutations, and the error taxonomy.

pub mod account;
pub mod debt;
pub mod error;
pub mod queue;
pub mod transaction;

pub use account::{Account, AccountId, AccountKind, CreditTerms};
pub use debt::{Debt, DebtDirection, DebtId};
pub use error::{ErrorClass, LedgerError, LedgerResult, StoreError};
pub use queue::{MutationKind, OperationId, QueuedOperation};
pub use transaction::{InstallmentPlan, Transaction, TransactionId, TransactionKind};
