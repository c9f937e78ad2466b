//! Debt lifecycle state transitions
//!
//! A debt is Active until its remaining amount reaches zero, then Settled
//! forever. Both states are driven exclusively through [`modify`]; nothing
//! else in the crate mutates a debt record.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::types::{Debt, LedgerError};

/// How a debt's balance is being changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebtOperation {
    /// The same person borrows/lends more under the existing record
    Add,

    /// A (partial) repayment against the record
    Subtract,
}

/// Apply one add/subtract operation to a debt record.
///
/// Rules, checked in order before any mutation:
/// - `amount` must be positive,
/// - a settled debt accepts no further operations,
/// - a subtraction must not exceed the remaining balance (it is rejected,
///   never clamped).
///
/// When the remaining amount reaches exactly zero the debt transitions to
/// settled and `settled_at` is stamped. Amounts are decimal values, not
/// computed ratios, so the zero comparison is exact — no epsilon.
pub fn modify(debt: &mut Debt, amount: Decimal, operation: DebtOperation) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount { amount });
    }
    if debt.is_settled {
        return Err(LedgerError::DebtAlreadySettled {
            debt: debt.id.clone(),
        });
    }

    match operation {
        DebtOperation::Add => {
            debt.original_amount += amount;
            debt.remaining_amount += amount;
        }
        DebtOperation::Subtract => {
            if amount > debt.remaining_amount {
                return Err(LedgerError::DebtOverpayment {
                    debt: debt.id.clone(),
                    remaining: debt.remaining_amount,
                    requested: amount,
                });
            }
            debt.original_amount -= amount;
            debt.remaining_amount -= amount;
        }
    }

    if debt.remaining_amount == Decimal::ZERO {
        debt.is_settled = true;
        debt.settled_at = Some(Utc::now());
    }

    Ok(())
}
