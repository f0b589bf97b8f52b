use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use http::{HeaderName, HeaderValue};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::info;

use crate::{
    api::handler::{
        get_job_status, health_check, run_budget_alerts_job, run_monthly_report_job,
        run_recurring_job, AppState,
    },
    middleware::{create_cors_layer, rate_limit_middleware, RateLimitLayer},
};

pub async fn create_app(state: AppState) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    // The manual triggers run whole jobs inline; keep them behind a tight
    // shared quota (original fronted them with a token bucket as well).
    let trigger_limiter = Arc::new(RateLimitLayer::new(10, 60));

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                .route("/jobs", get(get_job_status))
                .route(
                    "/jobs/recurring/run",
                    post(run_recurring_job)
                        .route_layer(from_fn_with_state(trigger_limiter.clone(), rate_limit_middleware)),
                )
                .route(
                    "/jobs/budget-alerts/run",
                    post(run_budget_alerts_job)
                        .route_layer(from_fn_with_state(trigger_limiter.clone(), rate_limit_middleware)),
                )
                .route(
                    "/jobs/monthly-report/run",
                    post(run_monthly_report_job)
                        .route_layer(from_fn_with_state(trigger_limiter, rate_limit_middleware)),
                ),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(create_cors_layer()),
        )
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
