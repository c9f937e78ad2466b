//! Error types for the ledger engine
//!
//! This module defines all error types that can occur while deriving balances
//! or applying mutations. Every rejection carries a human-readable reason
//! string so callers can surface it directly to the user.
//!
//! # Error Categories
//!
//! - **Validation errors**: insufficient balance/credit, over-payment,
//!   transfer-to-self, bad amounts. Surfaced synchronously, never retried,
//!   never queued.
//! - **Referential errors**: a referenced account/document does not exist.
//!   Fatal to that operation; not retried automatically.
//! - **Recoverable errors**: transient storage/network failures. The only
//!   class eligible for retry with backoff and for the offline queue.
//! - **Fatal errors**: contract violations (misconfigured accounts, invalid
//!   operation kinds). Propagated to the caller, never retried.

use rust_decimal::Decimal;
use thiserror::Error;

use super::{AccountId, DebtId};

/// Convenience alias used throughout the crate.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Coarse classification of an error, driving retry and queue eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// User-input violation; reported synchronously, never retried.
    Validation,
    /// A referenced entity does not exist; retrying will not help.
    Referential,
    /// Transient infrastructure failure; eligible for retry/backoff and
    /// for the offline queue.
    Recoverable,
    /// Contract violation upstream; propagated, never retried.
    Fatal,
}

/// Failures reported by the document-store capability
///
/// The store distinguishes transient infrastructure faults (connectivity
/// loss, timeout, write conflict) from permanent ones; only transient
/// failures are retried or queued.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The backing store cannot be reached (connectivity loss,
    /// service-unavailable). Transient.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Description of the connectivity failure
        message: String,
    },

    /// The operation did not complete in time. Transient.
    #[error("storage operation timed out: {message}")]
    Timeout {
        /// Description of the timed-out operation
        message: String,
    },

    /// A concurrent writer invalidated this atomic unit. Transient —
    /// re-running the unit re-reads fresh snapshots.
    #[error("write conflict: {message}")]
    Conflict {
        /// Description of the conflicting write
        message: String,
    },

    /// The referenced document does not exist.
    #[error("document '{id}' not found in '{collection}'")]
    NotFound {
        /// Collection that was searched
        collection: String,
        /// Document id that was not found
        id: String,
    },

    /// A persisted document failed to (de)serialize.
    #[error("malformed document in '{collection}': {message}")]
    Corrupt {
        /// Collection holding the malformed document
        collection: String,
        /// Description of the serialization failure
        message: String,
    },
}

impl StoreError {
    /// Whether this failure matches a known transient signature and is
    /// therefore eligible for retry/backoff and the offline queue.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable { .. } | StoreError::Timeout { .. } | StoreError::Conflict { .. }
        )
    }

    /// Create an Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }

    /// Create a Corrupt error
    pub fn corrupt(collection: &str, message: impl Into<String>) -> Self {
        StoreError::Corrupt {
            collection: collection.to_string(),
            message: message.into(),
        }
    }
}

/// Main error type for the ledger engine
///
/// Each variant includes the context needed to render an actionable
/// message. Use [`LedgerError::class`] to decide how a failure should be
/// handled (reject, abort, retry, or queue).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// An expense or outgoing transfer exceeds the account's computed
    /// balance. The operation is rejected, never clamped.
    #[error("insufficient balance in account {account}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Account the operation targeted
        account: AccountId,
        /// Balance computed at validation time
        available: Decimal,
        /// Amount the caller asked for
        requested: Decimal,
    },

    /// A credit-card expense exceeds the remaining available credit.
    #[error("insufficient credit in account {account}: available {available}, requested {requested}")]
    InsufficientCredit {
        /// Credit account the expense targeted
        account: AccountId,
        /// Available credit at validation time
        available: Decimal,
        /// Amount the caller asked for
        requested: Decimal,
    },

    /// A credit-card payment exceeds the credit currently in use.
    #[error("payment of {requested} exceeds used credit {used} on account {account}")]
    PaymentExceedsUsedCredit {
        /// Credit account receiving the payment
        account: AccountId,
        /// Credit currently consumed
        used: Decimal,
        /// Payment amount the caller asked for
        requested: Decimal,
    },

    /// A payment was attempted against a card with no credit in use.
    #[error("account {account} has no used credit to pay")]
    NoCreditToPay {
        /// Credit account receiving the payment
        account: AccountId,
    },

    /// Transfers out of a credit account are categorically rejected.
    #[error("transfers from credit account {account} are not allowed")]
    TransferFromCredit {
        /// Credit account named as transfer source
        account: AccountId,
    },

    /// A transfer named the same account as source and destination.
    #[error("cannot transfer from account {account} to itself")]
    TransferToSelf {
        /// The account named on both legs
        account: AccountId,
    },

    /// A transfer is missing its destination account.
    #[error("transfer requires a destination account")]
    MissingDestination,

    /// The amount is zero, negative, or unparsable.
    #[error("amount must be positive, got {amount}")]
    InvalidAmount {
        /// The offending amount
        amount: Decimal,
    },

    /// A category is required for this transaction kind.
    #[error("a category is required for this transaction")]
    MissingCategory,

    /// A debt subtraction exceeds the remaining balance. Never clamped.
    #[error("amount {requested} exceeds remaining balance {remaining} of debt {debt}")]
    DebtOverpayment {
        /// Debt record the operation targeted
        debt: DebtId,
        /// Remaining balance at validation time
        remaining: Decimal,
        /// Amount the caller asked to subtract
        requested: Decimal,
    },

    /// The debt is settled; settled is terminal.
    #[error("debt {debt} is already settled")]
    DebtAlreadySettled {
        /// The settled debt record
        debt: DebtId,
    },

    /// A referenced account does not exist at execution time.
    #[error("account {account} does not exist")]
    AccountNotFound {
        /// The missing account id
        account: AccountId,
    },

    /// An entity's stored shape contradicts its declared kind (e.g. a
    /// credit account without credit terms). Configuration error, fatal.
    #[error("misconfigured entity: {message}")]
    Misconfigured {
        /// Description of the configuration violation
        message: String,
    },

    /// An operation kind that validation upstream should have rejected.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of the contract violation
        message: String,
    },

    /// A storage failure, classified by [`StoreError::is_transient`].
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Classify this error per the handling taxonomy.
    ///
    /// The offline queue and the retry executor consult this exclusively
    /// through [`LedgerError::is_recoverable`]; everything else is either
    /// surfaced to the caller or aborts the operation.
    pub fn class(&self) -> ErrorClass {
        match self {
            LedgerError::InsufficientBalance { .. }
            | LedgerError::InsufficientCredit { .. }
            | LedgerError::PaymentExceedsUsedCredit { .. }
            | LedgerError::NoCreditToPay { .. }
            | LedgerError::TransferFromCredit { .. }
            | LedgerError::TransferToSelf { .. }
            | LedgerError::MissingDestination
            | LedgerError::InvalidAmount { .. }
            | LedgerError::MissingCategory
            | LedgerError::DebtOverpayment { .. }
            | LedgerError::DebtAlreadySettled { .. } => ErrorClass::Validation,

            LedgerError::AccountNotFound { .. } => ErrorClass::Referential,

            LedgerError::Misconfigured { .. } | LedgerError::InvalidOperation { .. } => {
                ErrorClass::Fatal
            }

            LedgerError::Store(e) => {
                if e.is_transient() {
                    ErrorClass::Recoverable
                } else if matches!(e, StoreError::NotFound { .. }) {
                    ErrorClass::Referential
                } else {
                    ErrorClass::Fatal
                }
            }
        }
    }

    /// Whether this failure is eligible for retry with backoff and for
    /// the offline queue.
    pub fn is_recoverable(&self) -> bool {
        self.class() == ErrorClass::Recoverable
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(account: &str, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientBalance {
            account: account.to_string(),
            available,
            requested,
        }
    }

    /// Create an InsufficientCredit error
    pub fn insufficient_credit(account: &str, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientCredit {
            account: account.to_string(),
            available,
            requested,
        }
    }

    /// Create a PaymentExceedsUsedCredit error
    pub fn payment_exceeds_used(account: &str, used: Decimal, requested: Decimal) -> Self {
        LedgerError::PaymentExceedsUsedCredit {
            account: account.to_string(),
            used,
            requested,
        }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(account: &str) -> Self {
        LedgerError::AccountNotFound {
            account: account.to_string(),
        }
    }

    /// Create a Misconfigured error
    pub fn misconfigured(message: impl Into<String>) -> Self {
        LedgerError::Misconfigured {
            message: message.into(),
        }
    }

    /// Create an InvalidOperation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        LedgerError::InvalidOperation {
            message: message.into(),
        }
    }
}
