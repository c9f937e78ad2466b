//! Business-logic components of the ledger engine
//!
//! - [`engine`] - consumer-facing facade wiring capabilities to components
//! - [`coordinator`] - atomic multi-account mutations
//! - [`amortization`] - installment interest math
//! - [`debt_ledger`] - debt lifecycle transitions
//! - [`dedup`] - fuzzy duplicate-transaction detection

pub mod amortization;
pub mod coordinator;
pub mod debt_ledger;
pub mod dedup;
pub mod engine;

pub use amortization::{CardInterestSummary, InstallmentStatus, PortfolioInterestSummary};
pub use coordinator::{MutationCoordinator, PaymentLeg, TransferRequest};
pub use debt_ledger::DebtOperation;
pub use dedup::{DraftTransaction, DuplicateMatch, MatchReason};
pub use engine::{LedgerEngine, MutationOutcome};
