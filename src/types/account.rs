//! Account-related types for the ledger engine
//!
//! This module defines the Account structure and the closed set of account
//! kinds. Accounts are money containers referenced by transactions; they own
//! no transactions themselves and carry no stored balance — balances are
//! derived on read from the transaction log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Account identifier (document-store key)
pub type AccountId = String;

/// The closed set of account kinds
///
/// Savings and Cash behave identically today; they remain distinct kinds so
/// their behavior can diverge later without a data migration. Credit
/// accounts derive *available credit* rather than a cash balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Bank or savings account holding a cash balance
    Savings,

    /// Physical cash; behaviorally identical to Savings
    Cash,

    /// Credit card; derived state is available credit, not a balance
    Credit,
}

/// Credit-card terms, present only on accounts of kind [`AccountKind::Credit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTerms {
    /// Total credit line granted by the issuer
    pub credit_limit: Decimal,

    /// Day of month the statement closes (1-28)
    pub statement_cutoff_day: u8,

    /// Day of month the payment is due (1-28)
    pub payment_due_day: u8,

    /// Annual interest rate as a fraction (e.g. 0.32 for 32% EA)
    ///
    /// Cards without a configured rate are excluded from interest
    /// aggregates rather than shown as zero.
    pub annual_interest_rate: Option<Decimal>,
}

/// A named money container
///
/// `initial_balance` is meaningful for Savings/Cash only (it may be negative
/// within bounds configured by the caller); credit accounts never carry
/// initial-balance semantics. `display_order` exists for the presentation
/// layer and is never consulted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Document id of this account
    pub id: AccountId,

    /// User-facing account name
    pub name: String,

    /// Which balance derivation applies to this account
    pub kind: AccountKind,

    /// Starting balance for Savings/Cash; zero for Credit
    #[serde(default)]
    pub initial_balance: Decimal,

    /// Credit terms; present iff kind is Credit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit: Option<CreditTerms>,

    /// Presentation ordering index (not used by the core)
    #[serde(default)]
    pub display_order: u32,

    /// When the account document was created
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Access this account's credit terms
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Misconfigured`] when the account is not a
    /// credit account, or is declared Credit but carries no terms. Both
    /// indicate a configuration error upstream, not user input.
    pub fn credit_terms(&self) -> Result<&CreditTerms, LedgerError> {
        if self.kind != AccountKind::Credit {
            return Err(LedgerError::misconfigured(format!(
                "account {} is not a credit account",
                self.id
            )));
        }
        self.credit.as_ref().ok_or_else(|| {
            LedgerError::misconfigured(format!("credit account {} has no credit terms", self.id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn savings() -> Account {
        Account {
            id: "acc-1".to_string(),
            name: "Main".to_string(),
            kind: AccountKind::Savings,
            initial_balance: dec!(1000),
            credit: None,
            display_order: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_credit_terms_on_savings_is_misconfigured() {
        let account = savings();
        let err = account.credit_terms().unwrap_err();
        assert!(matches!(err, LedgerError::Misconfigured { .. }));
    }

    #[test]
    fn test_credit_account_without_terms_is_misconfigured() {
        let account = Account {
            kind: AccountKind::Credit,
            ..savings()
        };
        let err = account.credit_terms().unwrap_err();
        assert!(matches!(err, LedgerError::Misconfigured { .. }));
    }

    #[test]
    fn test_credit_terms_returned_for_configured_card() {
        let account = Account {
            kind: AccountKind::Credit,
            credit: Some(CreditTerms {
                credit_limit: dec!(5000000),
                statement_cutoff_day: 15,
                payment_due_day: 28,
                annual_interest_rate: Some(dec!(0.32)),
            }),
            ..savings()
        };
        let terms = account.credit_terms().unwrap();
        assert_eq!(terms.credit_limit, dec!(5000000));
    }

    #[test]
    fn test_account_kind_serde_round_trip() {
        let json = serde_json::to_string(&AccountKind::Credit).unwrap();
        assert_eq!(json, "\"credit\"");
        let kind: AccountKind = serde_json::from_str("\"savings\"").unwrap();
        assert_eq!(kind, AccountKind::Savings);
    }
}
