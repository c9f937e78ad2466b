//! Interpersonal loan records
//!
//! A Debt tracks money lent to or borrowed from a person, independently of
//! accounts and transactions. Its lifecycle runs through
//! [`crate::core::debt_ledger`]; once settled it is never mutated again.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Debt identifier (document-store key)
pub type DebtId = String;

/// Which way the money flowed when the debt was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtDirection {
    /// The user lent money to the person
    Lent,

    /// The user borrowed money from the person
    Borrowed,
}

/// A person-to-person loan record
///
/// Invariant: `0 <= remaining_amount <= original_amount`, and
/// `is_settled` holds exactly when `remaining_amount` is zero.
/// `settled_at` is stamped once, on the false→true transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    /// Document id of this debt
    pub id: DebtId,

    /// Counterparty name
    pub person_name: String,

    /// Lent or Borrowed
    pub direction: DebtDirection,

    /// Total amount ever lent/borrowed under this record
    pub original_amount: Decimal,

    /// Portion not yet repaid
    pub remaining_amount: Decimal,

    /// Terminal flag; true iff remaining_amount is zero
    pub is_settled: bool,

    /// When the debt reached zero, set exactly once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,

    /// When the record was created
    pub created_at: DateTime<Utc>,
}

impl Debt {
    /// Create an active debt with the full amount outstanding.
    pub fn new(id: impl Into<DebtId>, person_name: impl Into<String>, direction: DebtDirection, amount: Decimal) -> Self {
        Debt {
            id: id.into(),
            person_name: person_name.into(),
            direction,
            original_amount: amount,
            remaining_amount: amount,
            is_settled: false,
            settled_at: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_debt_starts_fully_outstanding() {
        let debt = Debt::new("debt-1", "Maria", DebtDirection::Lent, dec!(1000000));
        assert_eq!(debt.original_amount, dec!(1000000));
        assert_eq!(debt.remaining_amount, dec!(1000000));
        assert!(!debt.is_settled);
        assert!(debt.settled_at.is_none());
    }

    #[test]
    fn test_direction_serde_round_trip() {
        let json = serde_json::to_string(&DebtDirection::Borrowed).unwrap();
        assert_eq!(json, "\"borrowed\"");
        let direction: DebtDirection = serde_json::from_str("\"lent\"").unwrap();
        assert_eq!(direction, DebtDirection::Lent);
    }
}
