use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::ledger::models::Budget;
use crate::ledger::store::LedgerStore;
use crate::notify::{render, Notifier};
use crate::reporting::stats::month_bounds;

const ALERT_THRESHOLD_PCT: Decimal = dec!(80);

/// Why a budget produced no alert on this sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSkip {
    MissingDefaultAccount,
    ZeroBudgetTarget,
    BelowThreshold,
    AlreadyAlertedThisMonth,
    UserMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Sent,
    Skipped(AlertSkip),
}

/// Totals for one alert sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertRunSummary {
    pub budgets: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Walks every budget and mails the owner once their month-to-date spend on
/// the default account crosses the threshold. At most one alert per budget
/// per calendar month; the dedup stamp is written only after a successful
/// send, so a failed delivery is retried on the next sweep.
pub struct BudgetAlertEvaluator {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn Notifier>,
}

impl BudgetAlertEvaluator {
    pub fn new(store: Arc<dyn LedgerStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn run(&self) -> AppResult<AlertRunSummary> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> AppResult<AlertRunSummary> {
        let budgets = self.store.find_budgets().await?;
        let mut summary = AlertRunSummary {
            budgets: budgets.len(),
            ..Default::default()
        };

        for budget in budgets {
            match self.evaluate(&budget, now).await {
                Ok(AlertOutcome::Sent) => summary.sent += 1,
                Ok(AlertOutcome::Skipped(reason)) => {
                    debug!("Budget {} produced no alert: {:?}", budget.id, reason);
                    summary.skipped += 1;
                }
                Err(error) => {
                    warn!("⚠️  Failed to evaluate budget {}: {:?}", budget.id, error);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "📊 Budget alert sweep done: {} budget(s), {} sent, {} skipped, {} failed",
            summary.budgets, summary.sent, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    async fn evaluate(&self, budget: &Budget, now: DateTime<Utc>) -> AppResult<AlertOutcome> {
        let account = match self.store.find_default_account(budget.user_id).await? {
            Some(account) => account,
            None => return Ok(AlertOutcome::Skipped(AlertSkip::MissingDefaultAccount)),
        };

        // Checked before dividing.
        if budget.amount.is_zero() {
            return Ok(AlertOutcome::Skipped(AlertSkip::ZeroBudgetTarget));
        }

        let (month_start, _) = month_bounds(now.year(), now.month());
        let spent = self
            .store
            .aggregate_expenses(budget.user_id, account.id, month_start, now)
            .await?;
        let percentage_used = spent / budget.amount * dec!(100);

        if percentage_used < ALERT_THRESHOLD_PCT {
            return Ok(AlertOutcome::Skipped(AlertSkip::BelowThreshold));
        }
        if !is_new_month(budget.last_alert_sent, now) {
            return Ok(AlertOutcome::Skipped(AlertSkip::AlreadyAlertedThisMonth));
        }

        let user = match self.store.get_user(budget.user_id).await? {
            Some(user) => user,
            None => return Ok(AlertOutcome::Skipped(AlertSkip::UserMissing)),
        };

        let (subject, html) = render::budget_alert_email(
            user.display_name(),
            &account.name,
            percentage_used,
            budget.amount,
            spent,
        );
        self.notifier.send(&user.email, &subject, &html).await?;
        self.store
            .update_budget_alert_timestamp(budget.id, now)
            .await?;

        info!(
            "✅ Budget alert sent to {} ({}% used)",
            user.email,
            percentage_used.round_dp(1)
        );
        Ok(AlertOutcome::Sent)
    }
}

/// True when the last alert landed in a different calendar month than `now`.
/// Day-of-month is ignored: an alert on March 31 still blocks April 1 only
/// if month and year both match.
fn is_new_month(last_alert: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_alert {
        None => true,
        Some(last) => last.month() != now.month() || last.year() != now.year(),
    }
}
