use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use super::models::*;
use crate::{
    alerts::budget::BudgetAlertEvaluator,
    error::{AppError, AppResult},
    recurring::RecurringPipeline,
    reporting::report::MonthlyReporter,
    reporting::stats::previous_month,
    scheduler::{JobKind, JobOutcome, JobStatusBoard},
};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RecurringPipeline>,
    pub alerts: Arc<BudgetAlertEvaluator>,
    pub reporter: Arc<MonthlyReporter>,
    pub board: Arc<JobStatusBoard>,
}

/// GET /health
pub async fn health_check() -> AppResult<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
    }))
}

/// Run the recurring scan inline and return its summary
/// POST /api/v1/jobs/recurring/run
pub async fn run_recurring_job(
    State(state): State<AppState>,
) -> AppResult<Json<RecurringRunResponse>> {
    info!("🔧 Manual recurring scan requested");

    state.board.job_started(JobKind::RecurringScan);
    let result = state.pipeline.run_scan().await;
    state
        .board
        .job_finished(JobKind::RecurringScan, outcome_of(&result));
    let summary = result?;

    Ok(Json(RecurringRunResponse {
        job: JobKind::RecurringScan.as_str(),
        summary,
    }))
}

/// Run the budget alert sweep inline and return its summary
/// POST /api/v1/jobs/budget-alerts/run
pub async fn run_budget_alerts_job(
    State(state): State<AppState>,
) -> AppResult<Json<AlertRunResponse>> {
    info!("🔧 Manual budget alert sweep requested");

    state.board.job_started(JobKind::BudgetAlerts);
    let result = state.alerts.run().await;
    state
        .board
        .job_finished(JobKind::BudgetAlerts, outcome_of(&result));
    let summary = result?;

    Ok(Json(AlertRunResponse {
        job: JobKind::BudgetAlerts.as_str(),
        summary,
    }))
}

/// Rebuild and send the monthly report, by default for the month that just
/// ended
/// POST /api/v1/jobs/monthly-report/run?year=2025&month=3
pub async fn run_monthly_report_job(
    State(state): State<AppState>,
    Query(params): Query<MonthlyReportParams>,
) -> AppResult<Json<ReportRunResponse>> {
    let (year, month) = validate_report_params(&params)?;
    info!("🔧 Manual monthly report requested for {}-{:02}", year, month);

    state.board.job_started(JobKind::MonthlyReport);
    let result = state.reporter.run_for_month(year, month).await;
    state
        .board
        .job_finished(JobKind::MonthlyReport, outcome_of(&result));
    let summary = result?;

    Ok(Json(ReportRunResponse {
        job: JobKind::MonthlyReport.as_str(),
        year,
        month,
        summary,
    }))
}

/// GET /api/v1/jobs - last run record per job
pub async fn get_job_status(State(state): State<AppState>) -> AppResult<Json<JobsStatusResponse>> {
    Ok(Json(JobsStatusResponse {
        jobs: state.board.snapshot(),
    }))
}

fn outcome_of<T: serde::Serialize>(result: &AppResult<T>) -> JobOutcome {
    match result {
        Ok(summary) => JobOutcome::Succeeded {
            summary: serde_json::json!(summary),
        },
        Err(e) => JobOutcome::Failed {
            error: format!("{:?}", e),
        },
    }
}

fn validate_report_params(params: &MonthlyReportParams) -> AppResult<(i32, u32)> {
    // Both given or neither; a bare year (or month) is ambiguous.
    let (year, month) = match (params.year, params.month) {
        (Some(year), Some(month)) => (year, month),
        (None, None) => previous_month(Utc::now()),
        _ => {
            return Err(AppError::InvalidInput(
                "year and month must be provided together".to_string(),
            ))
        }
    };

    if !(1..=12).contains(&month) {
        return Err(AppError::InvalidInput(format!(
            "month must be 1-12, got {}",
            month
        )));
    }
    if !(2000..=9999).contains(&year) {
        return Err(AppError::InvalidInput(format!(
            "year out of range: {}",
            year
        )));
    }
    Ok((year, month))
}
