use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use serde::Serialize;
use tokio::time::{timeout, Duration};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ScheduleError};
use crate::ledger::models::DueItem;

use super::processor::{RecurringProcessor, UnitOutcome};

type UserRateLimiter = RateLimiter<Uuid, DefaultKeyedStateStore<Uuid>, DefaultClock>;

/// Dispatcher knobs. Ten replays per user per rolling minute, eight units
/// in flight, 30 seconds per unit.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub per_user_per_minute: u32,
    pub max_concurrency: usize,
    pub unit_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            per_user_per_minute: 10,
            max_concurrency: 8,
            unit_timeout: Duration::from_secs(30),
        }
    }
}

/// Totals for one scan run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecurringRunSummary {
    pub due: usize,
    pub applied: usize,
    pub occurrences: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Fans the due set out as independent units of work under a shared
/// per-user quota. At-least-once: a unit that fails or times out stays due
/// and is retried by the next scheduled scan.
pub struct ThrottledDispatcher {
    processor: Arc<RecurringProcessor>,
    limiter: UserRateLimiter,
    config: DispatchConfig,
}

impl ThrottledDispatcher {
    pub fn new(processor: Arc<RecurringProcessor>, config: DispatchConfig) -> AppResult<Self> {
        let quota = NonZeroU32::new(config.per_user_per_minute).ok_or_else(|| {
            AppError::Config("per-user replay quota must be nonzero".to_string())
        })?;

        Ok(Self {
            processor,
            limiter: RateLimiter::keyed(Quota::per_minute(quota)),
            config,
        })
    }

    pub async fn dispatch(&self, due: Vec<DueItem>, now: DateTime<Utc>) -> RecurringRunSummary {
        let mut summary = RecurringRunSummary {
            due: due.len(),
            ..Default::default()
        };

        let outcomes: Vec<Result<UnitOutcome, AppError>> = stream::iter(due)
            .map(|item| self.run_unit(item, now))
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Ok(UnitOutcome::Applied { occurrences }) => {
                    summary.applied += 1;
                    summary.occurrences += occurrences;
                }
                Ok(UnitOutcome::Skipped(_)) => summary.skipped += 1,
                Err(_) => summary.failed += 1,
            }
        }

        info!(
            "📊 Recurring dispatch done: {} due, {} applied ({} occurrences), {} skipped, {} failed",
            summary.due, summary.applied, summary.occurrences, summary.skipped, summary.failed
        );
        summary
    }

    async fn run_unit(&self, item: DueItem, now: DateTime<Utc>) -> Result<UnitOutcome, AppError> {
        self.limiter.until_key_ready(&item.user_id).await;

        let result = match timeout(self.config.unit_timeout, self.processor.process(item, now))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ScheduleError::UnitTimeout(self.config.unit_timeout).into()),
        };

        if let Err(error) = &result {
            error!(
                "Failed to process recurring template {}: {:?}",
                item.transaction_id, error
            );
        }
        result
    }
}
