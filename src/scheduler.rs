// Background triggers for the three jobs: the daily recurring scan, the
// six-hourly budget-alert sweep, and the monthly report on the first of
// the month. Each tick spawns its run, so a slow run never delays the
// next one; overlap is safe because every job is idempotent.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{error, info};

use crate::alerts::budget::BudgetAlertEvaluator;
use crate::recurring::RecurringPipeline;
use crate::reporting::report::MonthlyReporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    RecurringScan,
    BudgetAlerts,
    MonthlyReport,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::RecurringScan => "recurring_scan",
            JobKind::BudgetAlerts => "budget_alerts",
            JobKind::MonthlyReport => "monthly_report",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded { summary: serde_json::Value },
    Failed { error: String },
}

/// Last-run record for one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: Option<JobOutcome>,
}

/// In-process view of when each job last ran and how it went. Updated by
/// scheduled and manual runs alike.
#[derive(Default)]
pub struct JobStatusBoard {
    records: RwLock<BTreeMap<&'static str, JobRecord>>,
}

impl JobStatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_started(&self, kind: JobKind) {
        self.records.write().insert(
            kind.as_str(),
            JobRecord {
                started_at: Utc::now(),
                finished_at: None,
                outcome: None,
            },
        );
    }

    pub fn job_finished(&self, kind: JobKind, outcome: JobOutcome) {
        let mut records = self.records.write();
        let record = records.entry(kind.as_str()).or_insert(JobRecord {
            started_at: Utc::now(),
            finished_at: None,
            outcome: None,
        });
        record.finished_at = Some(Utc::now());
        record.outcome = Some(outcome);
    }

    pub fn snapshot(&self) -> BTreeMap<&'static str, JobRecord> {
        self.records.read().clone()
    }
}

/// Schedule configuration, all hours in UTC.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub recurring_scan_hour: u32,
    pub budget_alert_interval_hours: u64,
    pub monthly_report_hour: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            recurring_scan_hour: 0,
            budget_alert_interval_hours: 6,
            monthly_report_hour: 0,
        }
    }
}

pub struct JobScheduler {
    config: ScheduleConfig,
    pipeline: Arc<RecurringPipeline>,
    alerts: Arc<BudgetAlertEvaluator>,
    reporter: Arc<MonthlyReporter>,
    board: Arc<JobStatusBoard>,
}

impl JobScheduler {
    pub fn new(
        config: ScheduleConfig,
        pipeline: Arc<RecurringPipeline>,
        alerts: Arc<BudgetAlertEvaluator>,
        reporter: Arc<MonthlyReporter>,
        board: Arc<JobStatusBoard>,
    ) -> Self {
        Self {
            config,
            pipeline,
            alerts,
            reporter,
            board,
        }
    }

    /// Start all three background loops.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        vec![
            self.start_recurring_loop(),
            self.start_alert_loop(),
            self.start_report_loop(),
        ]
    }

    fn start_recurring_loop(&self) -> JoinHandle<()> {
        let hour = self.config.recurring_scan_hour;
        let pipeline = self.pipeline.clone();
        let board = self.board.clone();

        tokio::spawn(async move {
            loop {
                sleep_until(next_daily_execution(Utc::now(), hour)).await;

                let pipeline = pipeline.clone();
                let board = board.clone();
                tokio::spawn(async move {
                    run_recurring_scan(&pipeline, &board).await;
                });
            }
        })
    }

    fn start_alert_loop(&self) -> JoinHandle<()> {
        let period = Duration::from_secs(self.config.budget_alert_interval_hours.max(1) * 3600);
        let alerts = self.alerts.clone();
        let board = self.board.clone();

        tokio::spawn(async move {
            let mut ticker = interval(period);
            // The first tick fires immediately; skip it so startup is quiet.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let alerts = alerts.clone();
                let board = board.clone();
                tokio::spawn(async move {
                    run_budget_alerts(&alerts, &board).await;
                });
            }
        })
    }

    fn start_report_loop(&self) -> JoinHandle<()> {
        let hour = self.config.monthly_report_hour;
        let reporter = self.reporter.clone();
        let board = self.board.clone();

        tokio::spawn(async move {
            loop {
                sleep_until(next_monthly_execution(Utc::now(), hour)).await;

                let reporter = reporter.clone();
                let board = board.clone();
                tokio::spawn(async move {
                    run_monthly_report(&reporter, &board).await;
                });
            }
        })
    }
}

pub async fn run_recurring_scan(pipeline: &RecurringPipeline, board: &JobStatusBoard) {
    info!("🔄 Starting scheduled recurring scan");
    board.job_started(JobKind::RecurringScan);

    let outcome = match pipeline.run_scan().await {
        Ok(summary) => JobOutcome::Succeeded {
            summary: serde_json::json!(summary),
        },
        Err(e) => {
            error!("❌ Recurring scan failed: {:?}", e);
            JobOutcome::Failed {
                error: format!("{:?}", e),
            }
        }
    };
    board.job_finished(JobKind::RecurringScan, outcome);
}

pub async fn run_budget_alerts(alerts: &BudgetAlertEvaluator, board: &JobStatusBoard) {
    info!("🔄 Starting scheduled budget alert sweep");
    board.job_started(JobKind::BudgetAlerts);

    let outcome = match alerts.run().await {
        Ok(summary) => JobOutcome::Succeeded {
            summary: serde_json::json!(summary),
        },
        Err(e) => {
            error!("❌ Budget alert sweep failed: {:?}", e);
            JobOutcome::Failed {
                error: format!("{:?}", e),
            }
        }
    };
    board.job_finished(JobKind::BudgetAlerts, outcome);
}

pub async fn run_monthly_report(reporter: &MonthlyReporter, board: &JobStatusBoard) {
    info!("🔄 Starting scheduled monthly report run");
    board.job_started(JobKind::MonthlyReport);

    let outcome = match reporter.run_at(Utc::now()).await {
        Ok(summary) => JobOutcome::Succeeded {
            summary: serde_json::json!(summary),
        },
        Err(e) => {
            error!("❌ Monthly report run failed: {:?}", e);
            JobOutcome::Failed {
                error: format!("{:?}", e),
            }
        }
    };
    board.job_finished(JobKind::MonthlyReport, outcome);
}

/// Sleeps past `next`. Millisecond resolution, rounded up beyond the
/// boundary, so a caller looping on this fires exactly once per boundary;
/// a whole-second wait would undershoot and let the loop spin through the
/// final sub-second window.
async fn sleep_until(next: DateTime<Utc>) {
    if Utc::now() < next {
        info!("⏰ Next run scheduled for {} UTC", next.format("%Y-%m-%d %H:%M:%S"));
    }
    while Utc::now() < next {
        let wait = next.signed_duration_since(Utc::now());
        let millis = wait.num_milliseconds().max(0) as u64 + 50;
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

/// Next occurrence of `execution_hour`, today if it has not passed yet.
/// Hours above 23 clamp to 23.
fn next_daily_execution(now: DateTime<Utc>, execution_hour: u32) -> DateTime<Utc> {
    let execution_hour = execution_hour.min(23);
    let today = now.date_naive().and_hms_opt(execution_hour, 0, 0).unwrap();
    let today_dt = Utc.from_utc_datetime(&today);

    if today_dt <= now {
        let tomorrow = (now.date_naive() + chrono::Duration::days(1))
            .and_hms_opt(execution_hour, 0, 0)
            .unwrap();
        Utc.from_utc_datetime(&tomorrow)
    } else {
        today_dt
    }
}

/// Next first-of-month at `execution_hour`. Hours above 23 clamp to 23.
fn next_monthly_execution(now: DateTime<Utc>, execution_hour: u32) -> DateTime<Utc> {
    let execution_hour = execution_hour.min(23);
    let this_month = now
        .date_naive()
        .with_day(1)
        .unwrap()
        .and_hms_opt(execution_hour, 0, 0)
        .unwrap();
    let this_month_dt = Utc.from_utc_datetime(&this_month);

    if this_month_dt > now {
        return this_month_dt;
    }

    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    let next = chrono::NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap()
        .and_hms_opt(execution_hour, 0, 0)
        .unwrap();
    Utc.from_utc_datetime(&next)
}
