//! Credit-card installment and interest amortization
//!
//! Pure functions deriving per-period interest and pending installment
//! totals from a transaction's installment plan. Time is measured in whole
//! calendar months (a deliberate simplification: month difference, not
//! exact day counts against the card's statement-cutoff day).
//!
//! A plan with a non-positive installment count or without a positive
//! total interest contributes nothing to any aggregate — it never errors.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{Account, AccountId, Transaction};

/// Point-in-time view of one transaction's installment plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallmentStatus {
    /// Interest charged per installment (`total_interest / count`)
    pub per_installment_interest: Decimal,

    /// Whole months between the purchase month and the as-of month
    pub months_elapsed: i32,

    /// Installments not yet reached, floored at zero
    pub remaining_installments: i32,

    /// Principal still to be charged across the remaining installments
    pub pending_principal: Decimal,

    /// Interest still to be charged across the remaining installments
    pub pending_interest: Decimal,
}

/// Per-card aggregation across its interest-bearing transactions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardInterestSummary {
    /// The credit account these totals belong to
    pub account_id: AccountId,

    /// Interest falling due in the as-of month
    pub monthly_interest: Decimal,

    /// Interest falling due across the as-of calendar year
    pub yearly_interest: Decimal,

    /// Principal pending across all active plans
    pub pending_principal: Decimal,

    /// Interest pending across all active plans
    pub pending_interest: Decimal,
}

/// Portfolio-wide aggregation across cards
///
/// Cards without a configured interest rate or without any
/// interest-bearing transaction do not appear in `cards` — they are
/// excluded from the aggregate, not shown as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioInterestSummary {
    /// One entry per card that qualifies for aggregation
    pub cards: Vec<CardInterestSummary>,

    /// Sum of monthly interest across qualifying cards
    pub monthly_interest: Decimal,

    /// Sum of yearly interest across qualifying cards
    pub yearly_interest: Decimal,

    /// Sum of pending principal across qualifying cards
    pub pending_principal: Decimal,

    /// Sum of pending interest across qualifying cards
    pub pending_interest: Decimal,
}

/// Zero-based month index on a continuous axis (year*12 + month).
fn month_index(year: i32, month: u32) -> i32 {
    year * 12 + month as i32 - 1
}

/// Extract (count, per-installment interest, per-installment principal)
/// from a transaction, or `None` when the plan contributes nothing.
fn plan_params(txn: &Transaction) -> Option<(i32, Decimal, Decimal)> {
    let plan = txn.installments.as_ref()?;
    if plan.count <= 0 {
        return None;
    }
    let total_interest = plan.total_interest?;
    if total_interest <= Decimal::ZERO {
        return None;
    }
    let per_interest = total_interest / Decimal::from(plan.count);
    Some((plan.count, per_interest, plan.per_installment_amount))
}

/// Whole months elapsed from the transaction's month to the as-of month.
fn months_elapsed(txn: &Transaction, as_of: NaiveDate) -> i32 {
    let occurred = txn.occurred_at.date_naive();
    month_index(as_of.year(), as_of.month()) - month_index(occurred.year(), occurred.month())
}

/// Whether the given calendar month carries an active installment.
fn active_in_month(txn: &Transaction, count: i32, year: i32, month: u32) -> bool {
    let occurred = txn.occurred_at.date_naive();
    let elapsed = month_index(year, month) - month_index(occurred.year(), occurred.month());
    elapsed >= 0 && elapsed < count
}

/// Point-in-time installment status, or `None` for inert plans.
pub fn installment_status(txn: &Transaction, as_of: NaiveDate) -> Option<InstallmentStatus> {
    let (count, per_interest, per_amount) = plan_params(txn)?;
    let elapsed = months_elapsed(txn, as_of);
    let remaining = (count - elapsed).max(0);
    Some(InstallmentStatus {
        per_installment_interest: per_interest,
        months_elapsed: elapsed,
        remaining_installments: remaining,
        pending_principal: Decimal::from(remaining) * per_amount,
        pending_interest: Decimal::from(remaining) * per_interest,
    })
}

/// Interest this transaction charges in the as-of month: the
/// per-installment interest while the plan is active, zero otherwise.
pub fn monthly_interest(txn: &Transaction, as_of: NaiveDate) -> Decimal {
    match plan_params(txn) {
        Some((count, per_interest, _)) if active_in_month(txn, count, as_of.year(), as_of.month()) => {
            per_interest
        }
        _ => Decimal::ZERO,
    }
}

/// Interest this transaction charges across a calendar year, iterating
/// its 12 months so plans spanning a year boundary are split correctly.
pub fn yearly_interest(txn: &Transaction, year: i32) -> Decimal {
    let Some((count, per_interest, _)) = plan_params(txn) else {
        return Decimal::ZERO;
    };
    let active_months = (1..=12)
        .filter(|&month| active_in_month(txn, count, year, month))
        .count();
    per_interest * Decimal::from(active_months as i64)
}

/// Aggregate one card's interest-bearing transactions.
///
/// Returns `None` — excluding the card from portfolio aggregates — when
/// the account is not a credit card, carries no configured interest rate,
/// or has no transaction with an active-or-future interest plan.
pub fn card_interest_summary(
    account: &Account,
    transactions: &[Transaction],
    as_of: NaiveDate,
) -> Option<CardInterestSummary> {
    let terms = account.credit.as_ref()?;
    terms.annual_interest_rate?;

    let mut qualifying = 0usize;
    let mut summary = CardInterestSummary {
        account_id: account.id.clone(),
        monthly_interest: Decimal::ZERO,
        yearly_interest: Decimal::ZERO,
        pending_principal: Decimal::ZERO,
        pending_interest: Decimal::ZERO,
    };

    for txn in transactions
        .iter()
        .filter(|t| t.source_account_id == account.id)
    {
        let Some(status) = installment_status(txn, as_of) else {
            continue;
        };
        qualifying += 1;
        summary.monthly_interest += monthly_interest(txn, as_of);
        summary.yearly_interest += yearly_interest(txn, as_of.year());
        summary.pending_principal += status.pending_principal;
        summary.pending_interest += status.pending_interest;
    }

    (qualifying > 0).then_some(summary)
}

/// Aggregate interest across a portfolio of cards.
pub fn portfolio_interest_summary(
    cards: &[(&Account, &[Transaction])],
    as_of: NaiveDate,
) -> PortfolioInterestSummary {
    let mut portfolio = PortfolioInterestSummary {
        cards: Vec::new(),
        monthly_interest: Decimal::ZERO,
        yearly_interest: Decimal::ZERO,
        pending_principal: Decimal::ZERO,
        pending_interest: Decimal::ZERO,
    };

    for (account, transactions) in cards {
        if let Some(summary) = card_interest_summary(account, transactions, as_of) {
            portfolio.monthly_interest += summary.monthly_interest;
            portfolio.yearly_interest += summary.yearly_interest;
            portfolio.pending_principal += summary.pending_principal;
            portfolio.pending_interest += summary.pending_interest;
            portfolio.cards.push(summary);
        }
    }

    portfolio
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountKind, CreditTerms, InstallmentPlan, TransactionKind};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn financed_txn(year: i32, month: u32, count: i32, total_interest: Option<Decimal>) -> Transaction {
        Transaction {
            id: "txn-1".to_string(),
            kind: TransactionKind::Expense,
            amount: dec!(1200000),
            category: Some("Tecnología".to_string()),
            description: "Laptop".to_string(),
            occurred_at: Utc.with_ymd_and_hms(year, month, 10, 12, 0, 0).unwrap(),
            settled: false,
            source_account_id: "card-1".to_string(),
            destination_account_id: None,
            installments: Some(InstallmentPlan {
                count,
                total_interest,
                per_installment_amount: dec!(100000),
            }),
            recurring_payment_id: None,
            created_at: Utc::now(),
        }
    }

    fn card(rate: Option<Decimal>) -> Account {
        Account {
            id: "card-1".to_string(),
            name: "Visa".to_string(),
            kind: AccountKind::Credit,
            initial_balance: Decimal::ZERO,
            credit: Some(CreditTerms {
                credit_limit: dec!(5000000),
                statement_cutoff_day: 15,
                payment_due_day: 28,
                annual_interest_rate: rate,
            }),
            display_order: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_per_installment_interest_split_evenly() {
        let txn = financed_txn(2024, 3, 12, Some(dec!(120000)));
        let status = installment_status(&txn, date(2024, 3, 20)).unwrap();
        assert_eq!(status.per_installment_interest, dec!(10000));
        assert_eq!(status.months_elapsed, 0);
        assert_eq!(status.remaining_installments, 12);
        assert_eq!(status.pending_principal, dec!(1200000));
        assert_eq!(status.pending_interest, dec!(120000));
    }

    #[test]
    fn test_pending_shrinks_as_months_elapse() {
        let txn = financed_txn(2024, 3, 12, Some(dec!(120000)));
        let status = installment_status(&txn, date(2024, 8, 1)).unwrap();
        assert_eq!(status.months_elapsed, 5);
        assert_eq!(status.remaining_installments, 7);
        assert_eq!(status.pending_principal, dec!(700000));
        assert_eq!(status.pending_interest, dec!(70000));
    }

    #[test]
    fn test_expired_plan_has_nothing_pending() {
        let txn = financed_txn(2023, 1, 6, Some(dec!(60000)));
        let status = installment_status(&txn, date(2024, 6, 1)).unwrap();
        assert_eq!(status.remaining_installments, 0);
        assert_eq!(status.pending_principal, dec!(0));
        assert_eq!(status.pending_interest, dec!(0));
    }

    #[rstest]
    #[case::first_month(date(2024, 3, 1), dec!(10000))]
    #[case::mid_plan(date(2024, 9, 28), dec!(10000))]
    #[case::last_active_month(date(2025, 2, 1), dec!(10000))]
    #[case::month_after_plan(date(2025, 3, 1), dec!(0))]
    #[case::month_before_purchase(date(2024, 2, 1), dec!(0))]
    fn test_monthly_interest_tracks_plan_window(#[case] as_of: NaiveDate, #[case] expected: Decimal) {
        // 12 installments starting March 2024: active March 2024..February 2025.
        let txn = financed_txn(2024, 3, 12, Some(dec!(120000)));
        assert_eq!(monthly_interest(&txn, as_of), expected);
    }

    #[test]
    fn test_yearly_interest_splits_across_year_boundary() {
        // 12 installments from March 2024: 10 active months in 2024,
        // 2 in 2025.
        let txn = financed_txn(2024, 3, 12, Some(dec!(120000)));
        assert_eq!(yearly_interest(&txn, 2024), dec!(100000));
        assert_eq!(yearly_interest(&txn, 2025), dec!(20000));
        assert_eq!(yearly_interest(&txn, 2023), dec!(0));
    }

    #[test]
    fn test_interest_sums_to_total_across_full_span() {
        let txn = financed_txn(2024, 3, 12, Some(dec!(120000)));
        let total: Decimal = (2024..=2025).map(|y| yearly_interest(&txn, y)).sum();
        assert_eq!(total, dec!(120000));
    }

    #[test]
    fn test_uneven_split_drift_stays_below_minor_unit() {
        // 100,000 across 3 installments does not divide evenly.
        let txn = financed_txn(2024, 1, 3, Some(dec!(100000)));
        let recomposed = yearly_interest(&txn, 2024);
        assert!((recomposed - dec!(100000)).abs() < dec!(0.01));
    }

    #[rstest]
    #[case::zero_count(financed_txn(2024, 3, 0, Some(dec!(120000))))]
    #[case::negative_count(financed_txn(2024, 3, -4, Some(dec!(120000))))]
    #[case::missing_interest(financed_txn(2024, 3, 12, None))]
    #[case::zero_interest(financed_txn(2024, 3, 12, Some(dec!(0))))]
    fn test_inert_plans_contribute_nothing(#[case] txn: Transaction) {
        assert!(installment_status(&txn, date(2024, 6, 1)).is_none());
        assert_eq!(monthly_interest(&txn, date(2024, 6, 1)), dec!(0));
        assert_eq!(yearly_interest(&txn, 2024), dec!(0));
    }

    #[test]
    fn test_plain_transaction_without_plan_is_inert() {
        let mut txn = financed_txn(2024, 3, 12, Some(dec!(120000)));
        txn.installments = None;
        assert!(installment_status(&txn, date(2024, 6, 1)).is_none());
    }

    #[test]
    fn test_card_summary_aggregates_transactions() {
        let account = card(Some(dec!(0.32)));
        let txns = vec![
            financed_txn(2024, 3, 12, Some(dec!(120000))),
            financed_txn(2024, 5, 6, Some(dec!(30000))),
        ];
        let summary = card_interest_summary(&account, &txns, date(2024, 6, 1)).unwrap();
        // Both plans active in June 2024: 10,000 + 5,000.
        assert_eq!(summary.monthly_interest, dec!(15000));
        // March plan: 9 installments left; May plan: 5 left.
        assert_eq!(summary.pending_principal, dec!(1400000));
        assert_eq!(summary.pending_interest, dec!(115000));
    }

    #[test]
    fn test_card_without_rate_is_excluded_not_zeroed() {
        let account = card(None);
        let txns = vec![financed_txn(2024, 3, 12, Some(dec!(120000)))];
        assert!(card_interest_summary(&account, &txns, date(2024, 6, 1)).is_none());
    }

    #[test]
    fn test_card_without_interest_bearing_transactions_is_excluded() {
        let account = card(Some(dec!(0.32)));
        let txns = vec![financed_txn(2024, 3, 12, None)];
        assert!(card_interest_summary(&account, &txns, date(2024, 6, 1)).is_none());
    }

    #[test]
    fn test_portfolio_totals_span_qualifying_cards_only() {
        let visa = card(Some(dec!(0.32)));
        let mut amex = card(Some(dec!(0.28)));
        amex.id = "card-2".to_string();
        let mut no_rate = card(None);
        no_rate.id = "card-3".to_string();

        let visa_txns = vec![financed_txn(2024, 3, 12, Some(dec!(120000)))];
        let mut amex_txn = financed_txn(2024, 5, 6, Some(dec!(30000)));
        amex_txn.source_account_id = "card-2".to_string();
        let amex_txns = vec![amex_txn];
        let mut ignored = financed_txn(2024, 5, 6, Some(dec!(30000)));
        ignored.source_account_id = "card-3".to_string();
        let no_rate_txns = vec![ignored];

        let portfolio = portfolio_interest_summary(
            &[
                (&visa, visa_txns.as_slice()),
                (&amex, amex_txns.as_slice()),
                (&no_rate, no_rate_txns.as_slice()),
            ],
            date(2024, 6, 1),
        );

        assert_eq!(portfolio.cards.len(), 2);
        assert_eq!(portfolio.monthly_interest, dec!(15000));
    }
}
