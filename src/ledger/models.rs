use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Type, prelude::FromRow};
use uuid::Uuid;
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, AppResult, ScheduleError};

/// NUMERIC columns come back as BigDecimal; the domain wants Decimal.
pub(crate) fn decimal_from_db(value: sqlx::types::BigDecimal) -> AppResult<Decimal> {
    Decimal::from_str(&value.to_string())
        .map_err(|_| AppError::InvalidInput(format!("Invalid decimal value: {}", value)))
}

fn decimal_column(row: &sqlx::postgres::PgRow, column: &str) -> AppResult<Decimal> {
    use sqlx::Row;

    let value: sqlx::types::BigDecimal = row.try_get(column)?;
    decimal_from_db(value)
}

/// Account kind enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "account_kind", rename_all = "UPPERCASE")]
pub enum AccountKind {
    Current,
    Savings,
}

/// Transaction kind enum - every ledger entry is one or the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "EXPENSE",
            TransactionKind::Income => "INCOME",
        }
    }

    /// Balance delta contributed by an amount of this kind.
    /// Expenses subtract, income adds.
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            TransactionKind::Expense => -amount,
            TransactionKind::Income => amount,
        }
    }
}

/// Transaction status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "transaction_status", rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// Recurrence interval enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "recurrence_interval", rename_all = "UPPERCASE")]
pub enum RecurrenceInterval {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl fmt::Display for RecurrenceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl RecurrenceInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceInterval::Daily => "DAILY",
            RecurrenceInterval::Weekly => "WEEKLY",
            RecurrenceInterval::Monthly => "MONTHLY",
            RecurrenceInterval::Yearly => "YEARLY",
        }
    }

    pub fn all() -> Vec<RecurrenceInterval> {
        vec![
            RecurrenceInterval::Daily,
            RecurrenceInterval::Weekly,
            RecurrenceInterval::Monthly,
            RecurrenceInterval::Yearly,
        ]
    }
}

impl FromStr for RecurrenceInterval {
    type Err = ScheduleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "DAILY" => Ok(RecurrenceInterval::Daily),
            "WEEKLY" => Ok(RecurrenceInterval::Weekly),
            "MONTHLY" => Ok(RecurrenceInterval::Monthly),
            "YEARLY" => Ok(RecurrenceInterval::Yearly),
            other => Err(ScheduleError::InvalidInterval(other.to_string())),
        }
    }
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Display name for outbound messages, falling back to the mailbox part
    /// of the email address.
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) if !name.is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}

/// Account entity - balance is mutated only through committed replays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub kind: AccountKind,

    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,

    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn from_row(row: &sqlx::postgres::PgRow) -> AppResult<Self> {
        use sqlx::Row;

        Ok(Account {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            kind: row.try_get("kind")?,
            balance: decimal_column(row, "balance")?,
            is_default: row.try_get("is_default")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Transaction entity. Rows with `is_recurring` set are templates: they are
/// never ledger entries themselves, each due replay materializes plain rows
/// dated at the missed occurrences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub kind: TransactionKind,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub category: String,
    pub is_recurring: bool,
    pub recurring_interval: Option<RecurrenceInterval>,
    pub last_processed: Option<DateTime<Utc>>,
    pub next_recurring_date: Option<DateTime<Utc>>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Due check mirrored by the selector query: never-processed templates
    /// are always due, otherwise the stored next date must have arrived.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match (self.last_processed, self.next_recurring_date) {
            (None, _) => true,
            (Some(_), Some(next)) => next <= now,
            (Some(_), None) => false,
        }
    }

    pub fn from_row(row: &sqlx::postgres::PgRow) -> AppResult<Self> {
        use sqlx::Row;

        Ok(Transaction {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            account_id: row.try_get("account_id")?,
            kind: row.try_get("kind")?,
            amount: decimal_column(row, "amount")?,
            description: row.try_get("description")?,
            date: row.try_get("date")?,
            category: row.try_get("category")?,
            is_recurring: row.try_get("is_recurring")?,
            recurring_interval: row.try_get("recurring_interval")?,
            last_processed: row.try_get("last_processed")?,
            next_recurring_date: row.try_get("next_recurring_date")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Budget entity - one per user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    pub last_alert_sent: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn from_row(row: &sqlx::postgres::PgRow) -> AppResult<Self> {
        use sqlx::Row;

        Ok(Budget {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            amount: decimal_column(row, "amount")?,
            last_alert_sent: row.try_get("last_alert_sent")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// One entry of the due set: just enough to re-read and process the
/// template inside its own unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueItem {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
}

/// A materialized occurrence waiting to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub date: DateTime<Utc>,
    pub category: String,
}

impl TransactionDraft {
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }
}
