use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

use super::models::{
    Account, Budget, DueItem, Transaction, TransactionKind, TransactionStatus, User,
};
use super::store::{CommitOutcome, LedgerStore, ReplayGuard, ReplayPlan};

/// In-memory ledger used by tests. Same commit-guard semantics as the
/// Postgres repository; one write lock per commit keeps it atomic.
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    accounts: HashMap<Uuid, Account>,
    transactions: HashMap<Uuid, Transaction>,
    budgets: HashMap<Uuid, Budget>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }

    pub async fn add_account(&self, account: Account) {
        self.state.write().await.accounts.insert(account.id, account);
    }

    pub async fn add_transaction(&self, transaction: Transaction) {
        self.state
            .write()
            .await
            .transactions
            .insert(transaction.id, transaction);
    }

    pub async fn add_budget(&self, budget: Budget) {
        self.state.write().await.budgets.insert(budget.id, budget);
    }

    pub async fn account_balance(&self, account_id: Uuid) -> Option<Decimal> {
        self.state
            .read()
            .await
            .accounts
            .get(&account_id)
            .map(|account| account.balance)
    }

    pub async fn stored_transaction(&self, id: Uuid) -> Option<Transaction> {
        self.state.read().await.transactions.get(&id).cloned()
    }

    pub async fn stored_budget(&self, id: Uuid) -> Option<Budget> {
        self.state.read().await.budgets.get(&id).cloned()
    }

    /// Materialized (non-template) rows on one account, oldest first.
    pub async fn materialized_for_account(&self, account_id: Uuid) -> Vec<Transaction> {
        let state = self.state.read().await;
        let mut rows: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| t.account_id == account_id && !t.is_recurring)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.date);
        rows
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn find_due_recurring(&self, now: DateTime<Utc>) -> AppResult<Vec<DueItem>> {
        let state = self.state.read().await;
        let mut due: Vec<&Transaction> = state
            .transactions
            .values()
            .filter(|t| {
                t.is_recurring && t.status == TransactionStatus::Completed && t.is_due(now)
            })
            .collect();
        due.sort_by_key(|t| t.next_recurring_date);

        Ok(due
            .into_iter()
            .map(|t| DueItem {
                transaction_id: t.id,
                user_id: t.user_id,
            })
            .collect())
    }

    async fn get_transaction(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .get(&id)
            .filter(|t| t.user_id == user_id)
            .cloned())
    }

    async fn commit_replay(
        &self,
        plan: &ReplayPlan,
        processed_at: DateTime<Utc>,
    ) -> AppResult<CommitOutcome> {
        let mut state = self.state.write().await;

        let guard_holds = match state.transactions.get(&plan.template_id) {
            Some(template) if template.is_recurring => match plan.guard {
                ReplayGuard::NeverProcessed => template.last_processed.is_none(),
                ReplayGuard::NextDueAt(expected) => {
                    template.next_recurring_date == Some(expected)
                }
            },
            _ => false,
        };
        if !guard_holds {
            return Ok(CommitOutcome::Superseded);
        }

        if !plan.drafts.is_empty() && !state.accounts.contains_key(&plan.account_id) {
            return Err(AppError::NotFound(format!(
                "Account not found: {}",
                plan.account_id
            )));
        }

        // Validation done, now apply everything.
        if let Some(template) = state.transactions.get_mut(&plan.template_id) {
            template.last_processed = Some(processed_at);
            template.next_recurring_date = Some(plan.next_due);
            template.updated_at = processed_at;
        }

        for draft in &plan.drafts {
            let id = Uuid::new_v4();
            state.transactions.insert(
                id,
                Transaction {
                    id,
                    user_id: draft.user_id,
                    account_id: draft.account_id,
                    kind: draft.kind,
                    amount: draft.amount,
                    description: Some(draft.description.clone()),
                    date: draft.date,
                    category: draft.category.clone(),
                    is_recurring: false,
                    recurring_interval: None,
                    last_processed: None,
                    next_recurring_date: None,
                    status: TransactionStatus::Completed,
                    created_at: processed_at,
                    updated_at: processed_at,
                },
            );
        }

        if !plan.drafts.is_empty() {
            if let Some(account) = state.accounts.get_mut(&plan.account_id) {
                account.balance += plan.net_delta;
                account.updated_at = processed_at;
            }
        }

        Ok(CommitOutcome::Applied)
    }

    async fn aggregate_expenses(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Decimal> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .values()
            .filter(|t| {
                t.user_id == user_id
                    && t.account_id == account_id
                    && t.kind == TransactionKind::Expense
                    && !t.is_recurring
                    && t.date >= start
                    && t.date < end
            })
            .map(|t| t.amount)
            .sum())
    }

    async fn find_budgets(&self) -> AppResult<Vec<Budget>> {
        let state = self.state.read().await;
        let mut budgets: Vec<Budget> = state.budgets.values().cloned().collect();
        budgets.sort_by_key(|b| b.created_at);
        Ok(budgets)
    }

    async fn find_default_account(&self, user_id: Uuid) -> AppResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.user_id == user_id && a.is_default)
            .cloned())
    }

    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn find_transactions_in_range(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Transaction>> {
        let state = self.state.read().await;
        let mut rows: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| !t.is_recurring && t.user_id == user_id && t.date >= start && t.date < end)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.date);
        Ok(rows)
    }

    async fn update_budget_alert_timestamp(
        &self,
        budget_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(budget) = state.budgets.get_mut(&budget_id) {
            budget.last_alert_sent = Some(sent_at);
            budget.updated_at = sent_at;
        }
        Ok(())
    }
}
