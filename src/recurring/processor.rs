use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::ledger::models::DueItem;
use crate::ledger::store::{CommitOutcome, LedgerStore};

use super::replay::plan_replay;

/// Why a unit of work finished without writing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSkip {
    TemplateMissing,
    NotDue,
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Committed this many materialized occurrences.
    Applied { occurrences: usize },
    Skipped(UnitSkip),
}

/// Runs one due item end to end: re-read the template, re-check that it is
/// still due, plan the catch-up replay, commit it.
pub struct RecurringProcessor {
    store: Arc<dyn LedgerStore>,
}

impl RecurringProcessor {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn process(&self, item: DueItem, now: DateTime<Utc>) -> AppResult<UnitOutcome> {
        let template = match self
            .store
            .get_transaction(item.transaction_id, item.user_id)
            .await?
        {
            Some(template) => template,
            None => {
                debug!(
                    "Recurring template {} vanished before processing",
                    item.transaction_id
                );
                return Ok(UnitOutcome::Skipped(UnitSkip::TemplateMissing));
            }
        };

        // The due set was computed earlier; state may have moved since.
        if !template.is_recurring || !template.is_due(now) {
            debug!("Template {} no longer due, skipping", template.id);
            return Ok(UnitOutcome::Skipped(UnitSkip::NotDue));
        }

        let plan = plan_replay(&template, now)?;
        let occurrences = plan.drafts.len();

        match self.store.commit_replay(&plan, now).await? {
            CommitOutcome::Applied => {
                info!(
                    "✅ Replayed {} occurrence(s) for template {} (next due {})",
                    occurrences, template.id, plan.next_due
                );
                Ok(UnitOutcome::Applied { occurrences })
            }
            CommitOutcome::Superseded => {
                warn!(
                    "⚠️  Template {} advanced concurrently, commit backed out",
                    template.id
                );
                Ok(UnitOutcome::Skipped(UnitSkip::Superseded))
            }
        }
    }
}
