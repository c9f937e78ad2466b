//! Ledger engine facade
//!
//! `LedgerEngine` is the consumer-facing surface of the crate. It wires the
//! injected capabilities (document store, network monitor, notification
//! sink) to the derivation and consistency components, and owns the
//! online/offline routing decision for every mutation entry point.
//!
//! Derived state is never cached: every read-side call reloads the
//! account's transaction set and recomputes, so state self-heals as soon
//! as all writes land.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::{debug, warn};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::amortization::{self, PortfolioInterestSummary};
use crate::core::coordinator::{leg_transaction, MutationCoordinator, PaymentLeg, TransferRequest};
use crate::core::debt_ledger::{self, DebtOperation};
use crate::core::dedup::{self, DraftTransaction, DuplicateMatch};
use crate::offline::{
    spawn_drain_on_reconnect, DrainConfig, DrainReport, OfflineQueue, RetryConfig,
};
use crate::store::{
    DocumentStore, NetworkMonitor, NoticeKind, NotificationSink, ACCOUNTS, DEBTS, TRANSACTIONS,
};
use crate::strategy::{BalanceStrategy, OperationKind};
use crate::types::{
    Account, AccountKind, Debt, LedgerError, OperationId, QueuedOperation, StoreError,
    Transaction, TransactionKind,
};

/// How a mutation entry point disposed of the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Durably committed to the store
    Committed,

    /// Parked in the offline queue under this operation id
    Queued(OperationId),
}

/// The consumer-facing ledger engine
///
/// Holds the injected capabilities and exposes the balance, credit, debt,
/// duplicate-detection, and mutation operations. Cheap to share: wrap it
/// in an `Arc` and clone across tasks.
pub struct LedgerEngine<S> {
    store: Arc<S>,
    coordinator: MutationCoordinator<S>,
    queue: Arc<OfflineQueue<S>>,
    network: Arc<NetworkMonitor>,
    sink: Arc<dyn NotificationSink>,
}

impl<S: DocumentStore + 'static> LedgerEngine<S> {
    /// Create an engine with default retry and drain configuration.
    pub fn new(
        store: Arc<S>,
        network: Arc<NetworkMonitor>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_configs(
            store,
            network,
            sink,
            RetryConfig::default(),
            DrainConfig::default(),
        )
    }

    /// Create an engine with explicit retry and drain configuration.
    pub fn with_configs(
        store: Arc<S>,
        network: Arc<NetworkMonitor>,
        sink: Arc<dyn NotificationSink>,
        retry: RetryConfig,
        drain: DrainConfig,
    ) -> Self {
        let coordinator = MutationCoordinator::new(Arc::clone(&store));
        let queue = Arc::new(OfflineQueue::new(Arc::clone(&store), retry, drain));
        LedgerEngine {
            store,
            coordinator,
            queue,
            network,
            sink,
        }
    }

    /// Spawn the background task that drains the queue whenever
    /// connectivity transitions to online.
    pub fn watch_connectivity(&self) -> tokio::task::JoinHandle<()> {
        spawn_drain_on_reconnect(Arc::clone(&self.queue), self.network.subscribe())
    }

    // ---- Read side ----------------------------------------------------

    /// Derive an account's headline figure (balance, or available credit
    /// for credit accounts) from its current transaction set.
    pub async fn calculate_balance(&self, account_id: &str) -> Result<Decimal, LedgerError> {
        let account = self.load_account(account_id).await?;
        let transactions = self.transactions_for(account_id).await?;
        BalanceStrategy::for_kind(account.kind).calculate_balance(&account, &transactions)
    }

    /// Derive the available credit of a credit account.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidOperation`] when the account is not
    /// a credit account.
    pub async fn calculate_available_credit(
        &self,
        account_id: &str,
    ) -> Result<Decimal, LedgerError> {
        let account = self.load_account(account_id).await?;
        if account.kind != AccountKind::Credit {
            return Err(LedgerError::invalid_operation(format!(
                "account {account_id} is not a credit account"
            )));
        }
        let transactions = self.transactions_for(account_id).await?;
        BalanceStrategy::Credit.calculate_balance(&account, &transactions)
    }

    /// Aggregate installment interest across all credit accounts.
    ///
    /// `as_of` defaults to today. Cards without a configured rate or
    /// without interest-bearing transactions are excluded, not zeroed.
    pub async fn compute_interest_summary(
        &self,
        as_of: Option<NaiveDate>,
    ) -> Result<PortfolioInterestSummary, LedgerError> {
        let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
        let accounts = self.load_accounts().await?;
        let transactions = self.load_transactions().await?;

        let cards: Vec<(&Account, Vec<Transaction>)> = accounts
            .iter()
            .filter(|account| account.kind == AccountKind::Credit)
            .map(|account| {
                let owned: Vec<Transaction> = transactions
                    .iter()
                    .filter(|txn| txn.source_account_id == account.id)
                    .cloned()
                    .collect();
                (account, owned)
            })
            .collect();
        let borrowed: Vec<(&Account, &[Transaction])> = cards
            .iter()
            .map(|(account, txns)| (*account, txns.as_slice()))
            .collect();

        Ok(amortization::portfolio_interest_summary(&borrowed, as_of))
    }

    /// Score a draft transaction against existing history and surface an
    /// advisory when suspected duplicates exist. Never blocks a write.
    pub async fn detect_duplicates(
        &self,
        draft: &DraftTransaction,
    ) -> Result<Vec<DuplicateMatch>, LedgerError> {
        let history = self.load_transactions().await?;
        let matches = dedup::detect_duplicates(draft, &history);
        if let Some(best) = matches.first() {
            self.sink.notify(
                NoticeKind::DuplicateSuspected,
                &format!(
                    "{} similar transaction(s) found, closest match scores {}",
                    matches.len(),
                    best.score
                ),
            );
        }
        Ok(matches)
    }

    /// Validate a prospective transaction against the data-model
    /// invariants and the account's balance strategy. Validation failures
    /// are surfaced through the notification sink as well as returned.
    pub async fn validate_transaction(&self, draft: &Transaction) -> Result<(), LedgerError> {
        self.surface_validation(self.validate_transaction_inner(draft).await)
    }

    async fn validate_transaction_inner(&self, draft: &Transaction) -> Result<(), LedgerError> {
        if draft.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                amount: draft.amount,
            });
        }
        // Shape checks run before the first storage read: a transfer to
        // self must be rejected without any document I/O.
        if draft.kind == TransactionKind::Transfer {
            let dest_id = draft
                .destination_account_id
                .as_deref()
                .ok_or(LedgerError::MissingDestination)?;
            if dest_id == draft.source_account_id {
                return Err(LedgerError::TransferToSelf {
                    account: draft.source_account_id.clone(),
                });
            }
        }

        let source = self.load_account(&draft.source_account_id).await?;
        let source_txns = self.transactions_for(&source.id).await?;
        let source_strategy = BalanceStrategy::for_kind(source.kind);

        match draft.kind {
            TransactionKind::Income => {
                // Categories are mandatory except for transfers and
                // credit-card payments (incomes on a credit account).
                if source.kind != AccountKind::Credit && is_blank(&draft.category) {
                    return Err(LedgerError::MissingCategory);
                }
                source_strategy.validate(&source, draft.amount, &source_txns, OperationKind::Income)
            }
            TransactionKind::Expense => {
                if is_blank(&draft.category) {
                    return Err(LedgerError::MissingCategory);
                }
                source_strategy.validate(
                    &source,
                    draft.amount,
                    &source_txns,
                    OperationKind::Expense,
                )
            }
            TransactionKind::Transfer => {
                let dest_id = draft
                    .destination_account_id
                    .as_deref()
                    .ok_or(LedgerError::MissingDestination)?;
                source_strategy.validate(
                    &source,
                    draft.amount,
                    &source_txns,
                    OperationKind::TransferOut,
                )?;

                let dest = self.load_account(dest_id).await?;
                let dest_txns = self.transactions_for(dest_id).await?;
                BalanceStrategy::for_kind(dest.kind).validate(
                    &dest,
                    draft.amount,
                    &dest_txns,
                    OperationKind::TransferIn,
                )
            }
        }
    }

    // ---- Mutation side ------------------------------------------------

    /// Validate and persist a new transaction; offline or transient
    /// failures park it in the queue instead of losing it.
    pub async fn create_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<MutationOutcome, LedgerError> {
        self.validate_transaction(&transaction).await?;
        let doc = to_document(&transaction)?;
        self.persist_put(TRANSACTIONS, &transaction.id, doc).await
    }

    /// Apply a partial update to a transaction document.
    ///
    /// The patch is raw document fields; business-rule validation of the
    /// resulting state is the caller's responsibility.
    pub async fn update_transaction(
        &self,
        transaction_id: &str,
        patch: serde_json::Value,
    ) -> Result<MutationOutcome, LedgerError> {
        if !self.network.is_online() {
            return Ok(self.enqueue(QueuedOperation::update(
                Uuid::new_v4().to_string(),
                TRANSACTIONS,
                transaction_id,
                patch,
            )));
        }
        match self.store.update(TRANSACTIONS, transaction_id, patch.clone()).await {
            Ok(()) => Ok(MutationOutcome::Committed),
            Err(error) if error.is_transient() => {
                warn!("update of {transaction_id} failed transiently, queueing: {error}");
                Ok(self.enqueue(QueuedOperation::update(
                    Uuid::new_v4().to_string(),
                    TRANSACTIONS,
                    transaction_id,
                    patch,
                )))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Delete a transaction document.
    pub async fn delete_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<MutationOutcome, LedgerError> {
        if !self.network.is_online() {
            return Ok(self.enqueue(QueuedOperation::delete(
                Uuid::new_v4().to_string(),
                TRANSACTIONS,
                transaction_id,
            )));
        }
        match self.store.delete(TRANSACTIONS, transaction_id).await {
            Ok(()) => Ok(MutationOutcome::Committed),
            Err(error) if error.is_transient() => {
                warn!("delete of {transaction_id} failed transiently, queueing: {error}");
                Ok(self.enqueue(QueuedOperation::delete(
                    Uuid::new_v4().to_string(),
                    TRANSACTIONS,
                    transaction_id,
                )))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Execute a transfer between two accounts.
    ///
    /// Business-rule validation runs first; the atomic commit (or the
    /// offline enqueue) follows. The returned transaction is the one
    /// committed or queued.
    pub async fn execute_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<(Transaction, MutationOutcome), LedgerError> {
        let draft = request.build_transaction();
        self.validate_transaction(&draft).await?;

        if !self.network.is_online() {
            debug!("offline: queueing transfer {}", draft.id);
            return self.queue_transaction(draft);
        }
        match self.coordinator.execute_transfer(request).await {
            Ok(transaction) => Ok((transaction, MutationOutcome::Committed)),
            Err(error) if error.is_recoverable() => {
                warn!("transfer failed transiently, queueing: {error}");
                self.queue_transaction(draft)
            }
            Err(error) => Err(error),
        }
    }

    /// Execute a credit-card payment sourced from another account.
    ///
    /// Validates the payment against the card's used credit and the
    /// funding leg against the source balance, then commits both legs
    /// atomically (or queues them together while offline).
    pub async fn execute_credit_payment(
        &self,
        credit_leg: PaymentLeg,
        source_leg: PaymentLeg,
    ) -> Result<(Vec<Transaction>, MutationOutcome), LedgerError> {
        if credit_leg.account_id == source_leg.account_id {
            return self.surface_validation(Err(LedgerError::TransferToSelf {
                account: credit_leg.account_id,
            }));
        }

        let credit_account = self.load_account(&credit_leg.account_id).await?;
        let credit_txns = self.transactions_for(&credit_account.id).await?;
        self.surface_validation(BalanceStrategy::for_kind(credit_account.kind).validate(
            &credit_account,
            credit_leg.amount,
            &credit_txns,
            OperationKind::Income,
        ))?;

        let source_account = self.load_account(&source_leg.account_id).await?;
        let source_txns = self.transactions_for(&source_account.id).await?;
        self.surface_validation(BalanceStrategy::for_kind(source_account.kind).validate(
            &source_account,
            source_leg.amount,
            &source_txns,
            OperationKind::Expense,
        ))?;

        if !self.network.is_online() {
            debug!("offline: queueing credit payment for {}", credit_leg.account_id);
            let payment = leg_transaction(&credit_leg, TransactionKind::Income);
            let funding = leg_transaction(&source_leg, TransactionKind::Expense);
            let (payment, _) = self.queue_transaction(payment)?;
            let (funding, _) = self.queue_transaction(funding)?;
            let id = payment.id.clone();
            return Ok((vec![payment, funding], MutationOutcome::Queued(id)));
        }

        match self
            .coordinator
            .execute_credit_payment(credit_leg.clone(), source_leg.clone())
            .await
        {
            Ok((payment, funding)) => Ok((vec![payment, funding], MutationOutcome::Committed)),
            Err(error) if error.is_recoverable() => {
                warn!("credit payment failed transiently, queueing: {error}");
                let payment = leg_transaction(&credit_leg, TransactionKind::Income);
                let funding = leg_transaction(&source_leg, TransactionKind::Expense);
                let (payment, _) = self.queue_transaction(payment)?;
                let (funding, _) = self.queue_transaction(funding)?;
                let id = payment.id.clone();
                Ok((vec![payment, funding], MutationOutcome::Queued(id)))
            }
            Err(error) => Err(error),
        }
    }

    /// Apply an add/subtract operation to a debt and persist the result.
    pub async fn modify_debt(
        &self,
        debt_id: &str,
        amount: Decimal,
        operation: DebtOperation,
    ) -> Result<Debt, LedgerError> {
        let doc = self
            .store
            .get(DEBTS, debt_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: DEBTS.to_string(),
                id: debt_id.to_string(),
            })?;
        let mut debt: Debt = from_document(DEBTS, doc)?;

        self.surface_validation(debt_ledger::modify(&mut debt, amount, operation))?;

        let updated = to_document(&debt)?;
        self.persist_put(DEBTS, debt_id, updated).await?;
        Ok(debt)
    }

    // ---- Queue surface --------------------------------------------------

    /// Park a mutation in the offline queue; returns its operation id.
    pub fn enqueue_offline(&self, operation: QueuedOperation) -> OperationId {
        let id = operation.id.clone();
        self.queue.enqueue(operation);
        id
    }

    /// Replay all eligible queued operations now.
    pub async fn drain_queue(&self) -> DrainReport {
        let report = self.queue.drain().await;
        if report.attempted > 0 {
            self.sink.notify(
                NoticeKind::QueueDrained,
                &format!(
                    "{} of {} pending operation(s) synced",
                    report.succeeded, report.attempted
                ),
            );
        }
        if report.failed > 0 && !self.queue.stalled_operations().is_empty() {
            self.sink.notify(
                NoticeKind::QueueStalled,
                "some pending operations need a manual retry",
            );
        }
        report
    }

    /// Operations currently awaiting replay.
    pub fn pending_operations(&self) -> Vec<QueuedOperation> {
        self.queue.pending_operations()
    }

    // ---- Internals ------------------------------------------------------

    fn enqueue(&self, operation: QueuedOperation) -> MutationOutcome {
        MutationOutcome::Queued(self.enqueue_offline(operation))
    }

    fn queue_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<(Transaction, MutationOutcome), LedgerError> {
        let doc = to_document(&transaction)?;
        let outcome = self.enqueue(QueuedOperation::create(
            Uuid::new_v4().to_string(),
            TRANSACTIONS,
            &transaction.id,
            doc,
        ));
        Ok((transaction, outcome))
    }

    /// Put a document, falling back to the queue when offline or when the
    /// write fails with a recoverable error.
    async fn persist_put(
        &self,
        collection: &str,
        id: &str,
        doc: serde_json::Value,
    ) -> Result<MutationOutcome, LedgerError> {
        if !self.network.is_online() {
            return Ok(self.enqueue(QueuedOperation::create(
                Uuid::new_v4().to_string(),
                collection,
                id,
                doc,
            )));
        }
        match self.store.put(collection, id, doc.clone()).await {
            Ok(()) => Ok(MutationOutcome::Committed),
            Err(error) if error.is_transient() => {
                warn!("write to {collection}/{id} failed transiently, queueing: {error}");
                Ok(self.enqueue(QueuedOperation::create(
                    Uuid::new_v4().to_string(),
                    collection,
                    id,
                    doc,
                )))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn load_account(&self, account_id: &str) -> Result<Account, LedgerError> {
        let doc = self
            .store
            .get(ACCOUNTS, account_id)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(account_id))?;
        from_document(ACCOUNTS, doc)
    }

    async fn load_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        self.store
            .list(ACCOUNTS)
            .await?
            .into_iter()
            .map(|doc| from_document(ACCOUNTS, doc))
            .collect()
    }

    async fn load_transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        self.store
            .list(TRANSACTIONS)
            .await?
            .into_iter()
            .map(|doc| from_document(TRANSACTIONS, doc))
            .collect()
    }

    async fn transactions_for(&self, account_id: &str) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self
            .load_transactions()
            .await?
            .into_iter()
            .filter(|txn| txn.touches(account_id))
            .collect())
    }

    /// Pass validation failures to the notification sink on their way
    /// out; everything else flows through untouched.
    fn surface_validation<T>(&self, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
        if let Err(error) = &result {
            if error.class() == crate::types::ErrorClass::Validation {
                self.sink.notify(NoticeKind::ValidationFailed, &error.to_string());
            }
        }
        result
    }
}

fn is_blank(category: &Option<String>) -> bool {
    category.as_deref().map_or(true, |c| c.trim().is_empty())
}

fn to_document<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, LedgerError> {
    serde_json::to_value(value).map_err(|e| StoreError::corrupt("document", e.to_string()).into())
}

fn from_document<T: serde::de::DeserializeOwned>(
    collection: &str,
    doc: serde_json::Value,
) -> Result<T, LedgerError> {
    serde_json::from_value(doc).map_err(|e| StoreError::corrupt(collection, e.to_string()).into())
}
