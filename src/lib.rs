//! Centavo — Balance & Credit Derivation Engine
//! # Overview
//!
//! This library is the ledger computation core of a single-currency
//! personal finance tracker: it derives per-account financial state
//! (balances, available credit, pending installment debt, loan balances)
//! from an append-mostly log of transaction events, and keeps that state
//! consistent across partial failures, offline writes, and concurrent
//! multi-account mutations.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Transaction, Debt, errors)
//! - [`strategy`] - Per-account-kind balance derivation and validation
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Consumer-facing facade and mutation routing
//!   - [`core::coordinator`] - Atomic multi-account mutations
//!   - [`core::amortization`] - Installment interest amortization
//!   - [`core::debt_ledger`] - Loan lifecycle transitions
//!   - [`core::dedup`] - Fuzzy duplicate-transaction detection
//! - [`offline`] - Durable mutation queue with retry/backoff replay
//! - [`store`] - Injected capabilities (document store, network signal,
//!   notification sink) and the in-memory reference store
//!
//! # Derivation model
//!
//! Balances are never stored. Every read recomputes from the latest
//! observed transaction set, so derived state cannot go stale and
//! self-heals once all writes land. The only coordination points are the
//! atomic units guarding multi-account writes (transfers, credit-card
//! payments) and the offline queue's idempotent replay.
//!
//! # Account kinds
//!
//! - **Savings / Cash**: settled-only cash balance on top of an initial
//!   balance
//! - **Credit**: derived *available credit*; expenses consume capacity
//!   immediately, settled or not

// Module declarations
pub mod core;
pub mod offline;
pub mod store;
pub mod strategy;
pub mod types;

pub use crate::core::{
    DebtOperation, DraftTransaction, DuplicateMatch, LedgerEngine, MutationCoordinator,
    MutationOutcome, PaymentLeg, PortfolioInterestSummary, TransferRequest,
};
pub use offline::{DrainConfig, DrainReport, OfflineQueue, RetryConfig};
pub use store::{DocumentStore, MemoryStore, NetworkMonitor, NoticeKind, NotificationSink};
pub use types::{
    Account, AccountId, AccountKind, Debt, DebtDirection, ErrorClass, LedgerError, LedgerResult,
    QueuedOperation, StoreError, Transaction, TransactionId, TransactionKind,
};
