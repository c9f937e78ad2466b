//! Fuzzy duplicate-transaction detection
//!
//! Pure scoring of an unsaved candidate against a window of existing
//! transactions. The result is advisory: it informs the caller, it never
//! blocks a write.
//!
//! Scoring (same-kind transactions only, out of 100):
//! - exact amount match: +40
//! - same non-empty category: +20
//! - description: exact +20, substring either direction +10 (exclusive)
//! - occurred within 48 hours: +20
//!
//! A candidate with neither description nor category is never scored —
//! minimal entries would otherwise match half the history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{Transaction, TransactionId, TransactionKind};

/// Minimum score for a transaction to be reported as a suspected duplicate
const SCORE_THRESHOLD: u8 = 60;

/// At most this many matches are returned
const MAX_MATCHES: usize = 3;

/// Time window for the date-proximity bonus
const PROXIMITY_HOURS: i64 = 48;

/// An unsaved transaction as entered by the user
///
/// The amount arrives as raw input text; parsing accepts both the
/// es-CO convention (`1.234.567,89`) and plain `1234567.89`.
#[derive(Debug, Clone)]
pub struct DraftTransaction {
    /// Kind of the candidate; only same-kind history is scored
    pub kind: TransactionKind,

    /// Raw amount text as typed
    pub amount_input: String,

    /// Category, if already chosen
    pub category: Option<String>,

    /// Description, possibly empty
    pub description: String,

    /// When the candidate occurred
    pub occurred_at: DateTime<Utc>,
}

/// Why a transaction scored against the candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    /// Amounts are identical
    SameAmount,

    /// Categories are identical and non-empty
    SameCategory,

    /// Descriptions are identical
    SameDescription,

    /// One description contains the other
    SimilarDescription,

    /// Occurred within 48 hours of each other
    CloseInTime,
}

/// A suspected duplicate of the candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateMatch {
    /// Id of the existing transaction
    pub transaction_id: TransactionId,

    /// Score out of 100
    pub score: u8,

    /// The scoring rules that fired
    pub reasons: Vec<MatchReason>,
}

/// Parse user-entered amount text.
///
/// When both separators appear, whichever comes last is the decimal
/// separator and the other is stripped as grouping. A lone comma is the
/// decimal separator (es-CO). Lone dots are grouping when there is more
/// than one, or when a single dot is followed by exactly three digits —
/// amounts carry at most two decimals, so `50.000` reads as fifty
/// thousand, not fifty.
pub(crate) fn parse_amount(input: &str) -> Option<Decimal> {
    let cleaned: String = input.trim().chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => {
            if comma > dot {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (None, Some(_)) => cleaned.replace(',', "."),
        (Some(dot), None) => {
            let grouping =
                cleaned.matches('.').count() > 1 || cleaned.len().saturating_sub(dot + 1) == 3;
            if grouping {
                cleaned.replace('.', "")
            } else {
                cleaned
            }
        }
        (None, None) => cleaned,
    };

    normalized.parse::<Decimal>().ok()
}

/// Score the candidate against a window of existing transactions.
///
/// Returns at most three matches scoring 60 or more, sorted by
/// descending score. Yields no matches when the candidate has neither
/// description nor category, or when its amount is unparsable or
/// non-positive.
pub fn detect_duplicates(
    draft: &DraftTransaction,
    history: &[Transaction],
) -> Vec<DuplicateMatch> {
    let description = draft.description.trim();
    let category = draft.category.as_deref().unwrap_or("").trim();
    if description.is_empty() && category.is_empty() {
        return Vec::new();
    }

    let amount = match parse_amount(&draft.amount_input) {
        Some(a) if a > Decimal::ZERO => a,
        _ => return Vec::new(),
    };

    let mut matches: Vec<DuplicateMatch> = history
        .iter()
        .filter(|txn| txn.kind == draft.kind)
        .filter_map(|txn| {
            let (score, reasons) = score_against(draft, amount, txn);
            (score >= SCORE_THRESHOLD).then(|| DuplicateMatch {
                transaction_id: txn.id.clone(),
                score,
                reasons,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches.truncate(MAX_MATCHES);
    matches
}

fn score_against(
    draft: &DraftTransaction,
    amount: Decimal,
    txn: &Transaction,
) -> (u8, Vec<MatchReason>) {
    let mut score = 0u8;
    let mut reasons = Vec::new();

    if txn.amount == amount {
        score += 40;
        reasons.push(MatchReason::SameAmount);
    }

    let draft_category = draft.category.as_deref().unwrap_or("").trim();
    let txn_category = txn.category.as_deref().unwrap_or("").trim();
    if !draft_category.is_empty()
        && !txn_category.is_empty()
        && draft_category.eq_ignore_ascii_case(txn_category)
    {
        score += 20;
        reasons.push(MatchReason::SameCategory);
    }

    let draft_desc = draft.description.trim().to_lowercase();
    let txn_desc = txn.description.trim().to_lowercase();
    if !draft_desc.is_empty() && !txn_desc.is_empty() {
        if draft_desc == txn_desc {
            score += 20;
            reasons.push(MatchReason::SameDescription);
        } else if draft_desc.contains(&txn_desc) || txn_desc.contains(&draft_desc) {
            score += 10;
            reasons.push(MatchReason::SimilarDescription);
        }
    }

    let gap = (draft.occurred_at - txn.occurred_at).num_hours().abs();
    if gap <= PROXIMITY_HOURS {
        score += 20;
        reasons.push(MatchReason::CloseInTime);
    }

    (score, reasons)
}
