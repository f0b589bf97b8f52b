//! Seed-data constructors shared by the test modules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::models::{
    Account, AccountKind, Budget, RecurrenceInterval, Transaction, TransactionKind,
    TransactionStatus, User,
};

pub fn user(email: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn account(user_id: Uuid, balance: Decimal, is_default: bool) -> Account {
    let now = Utc::now();
    Account {
        id: Uuid::new_v4(),
        user_id,
        name: "Main".to_string(),
        kind: AccountKind::Current,
        balance,
        is_default,
        created_at: now,
        updated_at: now,
    }
}

/// A recurring template dated at its first occurrence, never processed.
pub fn template(
    account: &Account,
    kind: TransactionKind,
    amount: Decimal,
    interval: RecurrenceInterval,
    date: DateTime<Utc>,
    description: &str,
) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        user_id: account.user_id,
        account_id: account.id,
        kind,
        amount,
        description: Some(description.to_string()),
        date,
        category: "subscriptions".to_string(),
        is_recurring: true,
        recurring_interval: Some(interval),
        last_processed: None,
        next_recurring_date: None,
        status: TransactionStatus::Completed,
        created_at: date,
        updated_at: date,
    }
}

pub fn one_off(
    account: &Account,
    kind: TransactionKind,
    amount: Decimal,
    category: &str,
    date: DateTime<Utc>,
) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        user_id: account.user_id,
        account_id: account.id,
        kind,
        amount,
        description: None,
        date,
        category: category.to_string(),
        is_recurring: false,
        recurring_interval: None,
        last_processed: None,
        next_recurring_date: None,
        status: TransactionStatus::Completed,
        created_at: date,
        updated_at: date,
    }
}

pub fn budget(user_id: Uuid, amount: Decimal, last_alert_sent: Option<DateTime<Utc>>) -> Budget {
    let now = Utc::now();
    Budget {
        id: Uuid::new_v4(),
        user_id,
        amount,
        last_alert_sent,
        created_at: now,
        updated_at: now,
    }
}
