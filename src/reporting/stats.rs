use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::models::{Transaction, TransactionKind};

/// Aggregated view of one user's calendar month. Income and expenses are
/// totalled separately; only expenses are broken down by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyStats {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expenses: Decimal,
    pub by_category: BTreeMap<String, Decimal>,
    pub transaction_count: usize,
}

impl MonthlyStats {
    pub fn net_income(&self) -> Decimal {
        self.total_income - self.total_expenses
    }
}

pub fn compute(transactions: &[Transaction]) -> MonthlyStats {
    let mut stats = MonthlyStats {
        transaction_count: transactions.len(),
        ..Default::default()
    };

    for tx in transactions {
        match tx.kind {
            TransactionKind::Income => stats.total_income += tx.amount,
            TransactionKind::Expense => {
                stats.total_expenses += tx.amount;
                let category = if tx.category.is_empty() {
                    "Uncategorized".to_string()
                } else {
                    tx.category.clone()
                };
                *stats.by_category.entry(category).or_insert(Decimal::ZERO) += tx.amount;
            }
        }
    }
    stats
}

/// Half-open UTC window covering one calendar month: midnight on the first
/// up to (not including) midnight on the first of the next month.
pub fn month_bounds(year: i32, month: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    (month_start(year, month), month_start(next_year, next_month))
}

/// Calendar month preceding `now`, as (year, month).
pub fn previous_month(now: DateTime<Utc>) -> (i32, u32) {
    if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    }
}

/// Human month name, e.g. "March".
pub fn month_label(year: i32, month: u32) -> String {
    month_start(year, month).format("%B").to_string()
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default());
    Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN))
}
