use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::BigDecimal;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

use super::models::{decimal_from_db, Account, Budget, DueItem, Transaction, User};
use super::store::{CommitOutcome, LedgerStore, ReplayGuard, ReplayPlan};

/// Ledger repository - THE source of truth for all state
pub struct LedgerRepository {
    pub pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_db(value: Decimal) -> AppResult<BigDecimal> {
    BigDecimal::from_str(&value.to_string())
        .map_err(|_| AppError::Internal(format!("Decimal conversion failed: {}", value)))
}

#[async_trait]
impl LedgerStore for LedgerRepository {
    // ========== DUE-SET SELECTION ==========

    async fn find_due_recurring(&self, now: DateTime<Utc>) -> AppResult<Vec<DueItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id
            FROM transactions
            WHERE is_recurring = TRUE
              AND status = 'COMPLETED'
              AND (last_processed IS NULL OR next_recurring_date <= $1)
            ORDER BY next_recurring_date ASC NULLS FIRST
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(DueItem {
                    transaction_id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                })
            })
            .collect()
    }

    async fn get_transaction(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM transactions
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Transaction::from_row(&r)).transpose()
    }

    // ========== REPLAY COMMIT ==========

    async fn commit_replay(
        &self,
        plan: &ReplayPlan,
        processed_at: DateTime<Utc>,
    ) -> AppResult<CommitOutcome> {
        let mut tx = self.pool.begin().await?;

        // Advance the cursor first, guarded by the value the plan was built
        // from. A concurrent worker that already advanced it makes this a
        // zero-row update and the whole commit backs out untouched.
        let advanced = match plan.guard {
            ReplayGuard::NeverProcessed => {
                sqlx::query(
                    r#"
                    UPDATE transactions
                    SET last_processed = $2, next_recurring_date = $3, updated_at = NOW()
                    WHERE id = $1 AND is_recurring = TRUE AND last_processed IS NULL
                    "#,
                )
                .bind(plan.template_id)
                .bind(processed_at)
                .bind(plan.next_due)
                .execute(&mut *tx)
                .await?
            }
            ReplayGuard::NextDueAt(expected) => {
                sqlx::query(
                    r#"
                    UPDATE transactions
                    SET last_processed = $2, next_recurring_date = $3, updated_at = NOW()
                    WHERE id = $1 AND is_recurring = TRUE AND next_recurring_date = $4
                    "#,
                )
                .bind(plan.template_id)
                .bind(processed_at)
                .bind(plan.next_due)
                .bind(expected)
                .execute(&mut *tx)
                .await?
            }
        };

        if advanced.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CommitOutcome::Superseded);
        }

        for draft in &plan.drafts {
            sqlx::query(
                r#"
                INSERT INTO transactions
                    (user_id, account_id, kind, amount, description, date, category, is_recurring, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, 'COMPLETED')
                "#,
            )
            .bind(draft.user_id)
            .bind(draft.account_id)
            .bind(draft.kind)
            .bind(to_db(draft.amount)?)
            .bind(&draft.description)
            .bind(draft.date)
            .bind(&draft.category)
            .execute(&mut *tx)
            .await?;
        }

        if !plan.drafts.is_empty() {
            let moved = sqlx::query(
                r#"
                UPDATE accounts
                SET balance = balance + $2, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(plan.account_id)
            .bind(to_db(plan.net_delta)?)
            .execute(&mut *tx)
            .await?;

            if moved.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(AppError::NotFound(format!(
                    "Account not found: {}",
                    plan.account_id
                )));
            }
        }

        tx.commit().await?;
        Ok(CommitOutcome::Applied)
    }

    // ========== AGGREGATION ==========

    /// Template rows are not ledger entries; only materialized occurrences
    /// and plain one-off transactions count toward spend.
    async fn aggregate_expenses(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Decimal> {
        let total: BigDecimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM transactions
            WHERE user_id = $1
              AND account_id = $2
              AND kind = 'EXPENSE'
              AND is_recurring = FALSE
              AND date >= $3 AND date < $4
            "#,
        )
        .bind(user_id)
        .bind(account_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        decimal_from_db(total)
    }

    // ========== BUDGET OPERATIONS ==========

    async fn find_budgets(&self) -> AppResult<Vec<Budget>> {
        let rows = sqlx::query("SELECT * FROM budgets ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Budget::from_row).collect()
    }

    async fn find_default_account(&self, user_id: Uuid) -> AppResult<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM accounts
            WHERE user_id = $1 AND is_default = TRUE
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Account::from_row(&r)).transpose()
    }

    async fn update_budget_alert_timestamp(
        &self,
        budget_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE budgets
            SET last_alert_sent = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(budget_id)
        .bind(sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ========== USER OPERATIONS ==========

    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, created_at, updated_at
            FROM users
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn find_transactions_in_range(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM transactions
            WHERE user_id = $1
              AND is_recurring = FALSE
              AND date >= $2 AND date < $3
            ORDER BY date ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Transaction::from_row).collect()
    }
}
