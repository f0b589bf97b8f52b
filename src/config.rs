use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub resend_api_key: String,
    pub resend_from_address: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub recurring_scan_hour_utc: u32,
    pub budget_alert_interval_hours: u64,
    pub monthly_report_hour_utc: u32,
    pub per_user_replay_quota: u32,
    pub replay_concurrency: usize,
    pub unit_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/fintrack".to_string()),
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            resend_api_key: std::env::var("RESEND_API_KEY").unwrap_or_default(),
            resend_from_address: std::env::var("RESEND_FROM_ADDRESS")
                .unwrap_or_else(|_| "FinTrack App <onboarding@resend.dev>".to_string()),
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            recurring_scan_hour_utc: parse_env("RECURRING_SCAN_HOUR_UTC", 0),
            budget_alert_interval_hours: parse_env("BUDGET_ALERT_INTERVAL_HOURS", 6),
            monthly_report_hour_utc: parse_env("MONTHLY_REPORT_HOUR_UTC", 0),
            per_user_replay_quota: parse_env("PER_USER_REPLAY_QUOTA", 10),
            replay_concurrency: parse_env("REPLAY_CONCURRENCY", 8),
            unit_timeout_secs: parse_env("UNIT_TIMEOUT_SECS", 30),
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
