use std::{sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::time::Duration as TokioDuration;
use tracing::info;

use crate::{
    alerts::budget::BudgetAlertEvaluator,
    api::handler::AppState,
    config::Config,
    error::AppResult,
    ledger::repository::LedgerRepository,
    notify::resend::ResendNotifier,
    recurring::{
        dispatcher::{DispatchConfig, ThrottledDispatcher},
        processor::RecurringProcessor,
        RecurringPipeline,
    },
    reporting::{insights::GeminiInsightGenerator, report::MonthlyReporter},
    scheduler::{JobScheduler, JobStatusBoard, ScheduleConfig},
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    // Database pool
    let pool = initialize_database(&config.database_url).await?;

    // Core components
    let store = Arc::new(LedgerRepository::new(pool.clone()));

    let notifier = Arc::new(ResendNotifier::new(
        config.resend_api_key.clone(),
        config.resend_from_address.clone(),
    ));
    info!("✅ Resend notifier initialized");

    let insights = Arc::new(GeminiInsightGenerator::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    ));
    info!("✅ Gemini insight generator initialized ({})", config.gemini_model);

    // Recurring pipeline: processor behind a per-user throttle
    let processor = Arc::new(RecurringProcessor::new(store.clone()));
    let dispatch_config = DispatchConfig {
        per_user_per_minute: config.per_user_replay_quota,
        max_concurrency: config.replay_concurrency,
        unit_timeout: TokioDuration::from_secs(config.unit_timeout_secs),
    };
    let dispatcher = ThrottledDispatcher::new(processor, dispatch_config)?;
    let pipeline = Arc::new(RecurringPipeline::new(store.clone(), dispatcher));
    info!(
        "✅ Recurring pipeline initialized ({} replays/user/min, {} in flight)",
        config.per_user_replay_quota, config.replay_concurrency
    );

    let alerts = Arc::new(BudgetAlertEvaluator::new(store.clone(), notifier.clone()));
    let reporter = Arc::new(MonthlyReporter::new(store, insights, notifier));
    let board = Arc::new(JobStatusBoard::new());

    // Background triggers
    let schedule = ScheduleConfig {
        recurring_scan_hour: config.recurring_scan_hour_utc,
        budget_alert_interval_hours: config.budget_alert_interval_hours,
        monthly_report_hour: config.monthly_report_hour_utc,
    };
    let scheduler = JobScheduler::new(
        schedule,
        pipeline.clone(),
        alerts.clone(),
        reporter.clone(),
        board.clone(),
    );
    scheduler.start();
    info!(
        "✅ Job scheduler started (recurring scan {:02}:00 UTC, alerts every {}h, report on the 1st)",
        config.recurring_scan_hour_utc, config.budget_alert_interval_hours
    );

    Ok(AppState {
        pipeline,
        alerts,
        reporter,
        board,
    })
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    // Run migrations
    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
