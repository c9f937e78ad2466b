//! Depository balance derivation (Savings and Cash accounts)
//!
//! Balance is the initial balance plus all **settled** movements touching
//! the account. Unsettled transactions are excluded entirely: a pending
//! expense has not left the account yet.

use rust_decimal::Decimal;

use super::OperationKind;
use crate::types::{Account, LedgerError, Transaction, TransactionKind};

/// Derive the cash balance from the settled transaction set.
pub(crate) fn balance(account: &Account, transactions: &[Transaction]) -> Decimal {
    let mut balance = account.initial_balance;

    for txn in transactions.iter().filter(|t| t.settled) {
        match txn.kind {
            TransactionKind::Income if txn.source_account_id == account.id => {
                balance += txn.amount;
            }
            TransactionKind::Expense if txn.source_account_id == account.id => {
                balance -= txn.amount;
            }
            TransactionKind::Transfer => {
                if txn.is_outgoing_transfer(&account.id) {
                    balance -= txn.amount;
                }
                if txn.is_incoming_transfer(&account.id) {
                    balance += txn.amount;
                }
            }
            _ => {}
        }
    }

    balance
}

/// Validate a prospective movement against the derived balance.
///
/// Outgoing money (expense, transfer-out) must not exceed the current
/// balance; incoming money is always accepted.
pub(crate) fn validate(
    account: &Account,
    amount: Decimal,
    transactions: &[Transaction],
    operation: OperationKind,
) -> Result<(), LedgerError> {
    match operation {
        OperationKind::Expense | OperationKind::TransferOut => {
            let available = balance(account, transactions);
            if amount > available {
                return Err(LedgerError::insufficient_balance(
                    &account.id,
                    available,
                    amount,
                ));
            }
            Ok(())
        }
        OperationKind::Income | OperationKind::TransferIn => Ok(()),
    }
}
