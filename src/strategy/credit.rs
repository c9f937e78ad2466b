//! Credit-card derivation: used and available credit
//!
//! A credit account has no cash balance; its derived state is how much of
//! the credit line remains. Expenses consume capacity immediately whether
//! or not they have settled — a purchase holds the credit line from the
//! moment it is made, not from statement settlement. Payments (incomes)
//! and incoming transfers release capacity.

use rust_decimal::Decimal;

use super::OperationKind;
use crate::types::{Account, LedgerError, Transaction, TransactionKind};

/// Credit currently consumed: all expenses (settled or not) net of
/// payments and incoming transfers, floored at zero.
pub(crate) fn used_credit(account: &Account, transactions: &[Transaction]) -> Decimal {
    let mut used = Decimal::ZERO;

    for txn in transactions {
        match txn.kind {
            TransactionKind::Expense if txn.source_account_id == account.id => {
                used += txn.amount;
            }
            TransactionKind::Income if txn.source_account_id == account.id => {
                used -= txn.amount;
            }
            TransactionKind::Transfer if txn.is_incoming_transfer(&account.id) => {
                used -= txn.amount;
            }
            _ => {}
        }
    }

    used.max(Decimal::ZERO)
}

/// Remaining spending capacity: `credit_limit - used_credit`, floored at
/// zero. Combined with the floor in [`used_credit`], the result always
/// satisfies `0 <= available <= credit_limit`.
pub(crate) fn available_credit(
    account: &Account,
    transactions: &[Transaction],
) -> Result<Decimal, LedgerError> {
    let terms = account.credit_terms()?;
    let available = terms.credit_limit - used_credit(account, transactions);
    Ok(available.max(Decimal::ZERO))
}

/// Validate a prospective movement against the card's derived state.
///
/// - An expense must fit in the available credit.
/// - A payment (income or incoming transfer) must not exceed the used
///   credit, and is rejected outright when nothing is owed.
/// - Any transfer *out of* a credit account is categorically rejected.
pub(crate) fn validate(
    account: &Account,
    amount: Decimal,
    transactions: &[Transaction],
    operation: OperationKind,
) -> Result<(), LedgerError> {
    match operation {
        OperationKind::Expense => {
            let available = available_credit(account, transactions)?;
            if amount > available {
                return Err(LedgerError::insufficient_credit(
                    &account.id,
                    available,
                    amount,
                ));
            }
            Ok(())
        }
        OperationKind::Income | OperationKind::TransferIn => {
            let used = used_credit(account, transactions);
            if used == Decimal::ZERO {
                return Err(LedgerError::NoCreditToPay {
                    account: account.id.clone(),
                });
            }
            if amount > used {
                return Err(LedgerError::payment_exceeds_used(&account.id, used, amount));
            }
            Ok(())
        }
        OperationKind::TransferOut => Err(LedgerError::TransferFromCredit {
            account: account.id.clone(),
        }),
    }
}
