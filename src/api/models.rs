use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::budget::AlertRunSummary;
use crate::recurring::dispatcher::RecurringRunSummary;
use crate::reporting::report::ReportRunSummary;
use crate::scheduler::JobRecord;

// ========== REQUEST MODELS ==========

/// Optional target month for a manual report run. Defaults to the month
/// that just ended.
#[derive(Debug, Default, Deserialize)]
pub struct MonthlyReportParams {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

// ========== RESPONSE MODELS ==========

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RecurringRunResponse {
    pub job: &'static str,
    pub summary: RecurringRunSummary,
}

#[derive(Debug, Serialize)]
pub struct AlertRunResponse {
    pub job: &'static str,
    pub summary: AlertRunSummary,
}

#[derive(Debug, Serialize)]
pub struct ReportRunResponse {
    pub job: &'static str,
    pub year: i32,
    pub month: u32,
    pub summary: ReportRunSummary,
}

#[derive(Debug, Serialize)]
pub struct JobsStatusResponse {
    pub jobs: BTreeMap<&'static str, JobRecord>,
}
