use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppResult;

use super::models::{Account, Budget, DueItem, Transaction, TransactionDraft, User};

/// Value of the template's recurrence cursor at planning time. A commit
/// applies only while the stored cursor still matches this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayGuard {
    NeverProcessed,
    NextDueAt(DateTime<Utc>),
}

/// Everything needed to apply one catch-up replay atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayPlan {
    pub template_id: Uuid,
    pub account_id: Uuid,
    /// Missed occurrences in chronological order.
    pub drafts: Vec<TransactionDraft>,
    /// Signed sum of the drafts. Expenses negative, income positive.
    pub net_delta: Decimal,
    /// New value for the template's next_recurring_date.
    pub next_due: DateTime<Utc>,
    pub guard: ReplayGuard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Drafts inserted, balance moved, cursor advanced.
    Applied,
    /// Another worker advanced the cursor first. Nothing was written.
    Superseded,
}

/// Durable, transactional storage of users, accounts, transactions and
/// budgets. Postgres in production, in-memory in tests.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Templates eligible for processing: recurring, COMPLETED, and either
    /// never processed or with next_recurring_date at or before `now`.
    async fn find_due_recurring(&self, now: DateTime<Utc>) -> AppResult<Vec<DueItem>>;

    async fn get_transaction(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<Transaction>>;

    /// Applies one replay plan in a single store transaction: inserts the
    /// drafts in chronological order, moves the account balance by the net
    /// delta, and advances the template cursor. All-or-nothing.
    async fn commit_replay(
        &self,
        plan: &ReplayPlan,
        processed_at: DateTime<Utc>,
    ) -> AppResult<CommitOutcome>;

    /// Sum of EXPENSE amounts on one account dated within [start, end).
    async fn aggregate_expenses(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Decimal>;

    async fn find_budgets(&self) -> AppResult<Vec<Budget>>;

    async fn find_default_account(&self, user_id: Uuid) -> AppResult<Option<Account>>;

    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>>;

    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// One user's transactions dated within [start, end), all accounts.
    async fn find_transactions_in_range(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Transaction>>;

    async fn update_budget_alert_timestamp(
        &self,
        budget_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> AppResult<()>;
}
