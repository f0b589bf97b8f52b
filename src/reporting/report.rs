use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::ledger::models::User;
use crate::ledger::store::LedgerStore;
use crate::notify::{render, Notifier};

use super::insights::{fallback_insights, InsightGenerator};
use super::stats::{self, month_bounds, month_label, previous_month};

/// Totals for one report run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportRunSummary {
    pub users: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Builds and mails every user's financial report for one calendar month.
/// Scheduled runs cover the month that just ended; the manual trigger can
/// rebuild any month. Per-user failures are logged and skipped, and a
/// generator failure downgrades to the canned insight list.
pub struct MonthlyReporter {
    store: Arc<dyn LedgerStore>,
    insights: Arc<dyn InsightGenerator>,
    notifier: Arc<dyn Notifier>,
}

impl MonthlyReporter {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        insights: Arc<dyn InsightGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            insights,
            notifier,
        }
    }

    /// Report on the calendar month preceding `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> AppResult<ReportRunSummary> {
        let (year, month) = previous_month(now);
        self.run_for_month(year, month).await
    }

    pub async fn run_for_month(&self, year: i32, month: u32) -> AppResult<ReportRunSummary> {
        let users = self.store.list_users().await?;
        let mut summary = ReportRunSummary {
            users: users.len(),
            ..Default::default()
        };

        for user in users {
            match self.report_for_user(&user, year, month).await {
                Ok(()) => summary.sent += 1,
                Err(error) => {
                    warn!(
                        "⚠️  Monthly report failed for {}: {:?}",
                        user.email, error
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            "📊 Monthly report run done ({}/{}): {} user(s), {} sent, {} failed",
            year, month, summary.users, summary.sent, summary.failed
        );
        Ok(summary)
    }

    async fn report_for_user(&self, user: &User, year: i32, month: u32) -> AppResult<()> {
        let (start, end) = month_bounds(year, month);
        let transactions = self
            .store
            .find_transactions_in_range(user.id, start, end)
            .await?;
        let monthly = stats::compute(&transactions);
        let label = month_label(year, month);

        let insights = match self.insights.generate(&monthly, &label).await {
            Ok(insights) if !insights.is_empty() => insights,
            Ok(_) => fallback_insights(),
            Err(error) => {
                warn!(
                    "⚠️  Insight generation failed for {}, using fallback: {:?}",
                    user.email, error
                );
                fallback_insights()
            }
        };

        let (subject, html) =
            render::monthly_report_email(user.display_name(), &label, &monthly, &insights);
        self.notifier.send(&user.email, &subject, &html).await
    }
}
