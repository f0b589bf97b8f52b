pub mod dispatcher;
pub mod interval;
pub mod processor;
pub mod replay;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::AppResult;
use crate::ledger::store::LedgerStore;

use dispatcher::{RecurringRunSummary, ThrottledDispatcher};

/// Entry point for the daily scan: selects the due set and fans it out
/// through the throttled dispatcher.
pub struct RecurringPipeline {
    store: Arc<dyn LedgerStore>,
    dispatcher: ThrottledDispatcher,
}

impl RecurringPipeline {
    pub fn new(store: Arc<dyn LedgerStore>, dispatcher: ThrottledDispatcher) -> Self {
        Self { store, dispatcher }
    }

    pub async fn run_scan(&self) -> AppResult<RecurringRunSummary> {
        self.run_scan_at(Utc::now()).await
    }

    pub async fn run_scan_at(&self, now: DateTime<Utc>) -> AppResult<RecurringRunSummary> {
        let due = self.store.find_due_recurring(now).await?;
        info!("🔄 Recurring scan selected {} due template(s)", due.len());
        Ok(self.dispatcher.dispatch(due, now).await)
    }
}
