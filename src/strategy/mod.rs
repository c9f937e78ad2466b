//! Per-account-kind balance derivation strategies
//!
//! Each account kind maps to exactly one derivation strategy. The kind set
//! is closed and stable, so selection is a total function over
//! [`AccountKind`] with exhaustive matching — no runtime registry and no
//! open-ended dynamic dispatch. Savings and Cash share the depository
//! strategy (behaviorally identical today, kept as distinct kinds for
//! future divergence); Credit derives available credit instead of a cash
//! balance.

use rust_decimal::Decimal;

use crate::types::{Account, AccountKind, LedgerError, Transaction};

pub mod credit;
pub mod depository;

/// The direction of a mutation being validated against an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Money leaving the account as an expense
    Expense,

    /// Money entering the account (a payment, for credit accounts)
    Income,

    /// The account is the source leg of a transfer
    TransferOut,

    /// The account is the destination leg of a transfer
    TransferIn,
}

/// Balance derivation strategy, selected per account kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceStrategy {
    /// Savings and Cash: settled-only cash balance
    Depository,

    /// Credit cards: available credit derived from the credit limit
    Credit,
}

impl BalanceStrategy {
    /// Select the strategy for an account kind.
    ///
    /// Total over the closed kind set; adding a kind without extending
    /// this match is a compile error, which is the intended failure mode
    /// for configuration drift.
    pub fn for_kind(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Savings | AccountKind::Cash => BalanceStrategy::Depository,
            AccountKind::Credit => BalanceStrategy::Credit,
        }
    }

    /// Derive the account's headline figure from its transaction set.
    ///
    /// For depository accounts this is the cash balance (initial balance
    /// plus settled movements); for credit accounts it is the *available
    /// credit*. Derived on every call — never cached.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Misconfigured`] for a credit account with
    /// no credit terms.
    pub fn calculate_balance(
        &self,
        account: &Account,
        transactions: &[Transaction],
    ) -> Result<Decimal, LedgerError> {
        match self {
            BalanceStrategy::Depository => Ok(depository::balance(account, transactions)),
            BalanceStrategy::Credit => credit::available_credit(account, transactions),
        }
    }

    /// Credit currently consumed on the account; zero for depository
    /// accounts, which have no credit line.
    pub fn used_credit(
        &self,
        account: &Account,
        transactions: &[Transaction],
    ) -> Result<Decimal, LedgerError> {
        match self {
            BalanceStrategy::Depository => Ok(Decimal::ZERO),
            BalanceStrategy::Credit => Ok(credit::used_credit(account, transactions)),
        }
    }

    /// Validate a prospective mutation of `amount` against the account's
    /// current derived state.
    ///
    /// Violations are reported, never clamped. A non-positive amount is
    /// rejected before any derivation runs.
    pub fn validate(
        &self,
        account: &Account,
        amount: Decimal,
        transactions: &[Transaction],
        operation: OperationKind,
    ) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount { amount });
        }
        match self {
            BalanceStrategy::Depository => {
                depository::validate(account, amount, transactions, operation)
            }
            BalanceStrategy::Credit => credit::validate(account, amount, transactions, operation),
        }
    }

    /// Whether balances derived by this strategy count toward net worth.
    ///
    /// Available credit is spending capacity, not an asset, so credit
    /// accounts are excluded.
    pub fn include_in_net_worth(&self) -> bool {
        match self {
            BalanceStrategy::Depository => true,
            BalanceStrategy::Credit => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case::savings(AccountKind::Savings, BalanceStrategy::Depository)]
    #[case::cash(AccountKind::Cash, BalanceStrategy::Depository)]
    #[case::credit(AccountKind::Credit, BalanceStrategy::Credit)]
    fn test_strategy_selection_is_total(
        #[case] kind: AccountKind,
        #[case] expected: BalanceStrategy,
    ) {
        assert_eq!(BalanceStrategy::for_kind(kind), expected);
    }

    #[rstest]
    #[case::depository(BalanceStrategy::Depository, true)]
    #[case::credit(BalanceStrategy::Credit, false)]
    fn test_net_worth_inclusion(#[case] strategy: BalanceStrategy, #[case] expected: bool) {
        assert_eq!(strategy.include_in_net_worth(), expected);
    }

    #[rstest]
    #[case::zero(dec!(0))]
    #[case::negative(dec!(-10))]
    fn test_non_positive_amounts_rejected_before_derivation(#[case] amount: Decimal) {
        let account = depository::tests::savings_account(dec!(100));
        let err = BalanceStrategy::Depository
            .validate(&account, amount, &[], OperationKind::Expense)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
    }
}
