use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Shared limiter fronting the manual job-trigger routes. The scheduled
/// loops do not go through it.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, governor::clock::DefaultClock>>,
}

impl RateLimitLayer {
    pub fn new(requests: u32, per_seconds: u64) -> Self {
        let quota = Quota::with_period(Duration::from_secs(per_seconds))
            .unwrap()
            .allow_burst(NonZeroU32::new(requests).unwrap());

        RateLimitLayer {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

// Rate limiting middleware for the job-trigger endpoints
pub async fn rate_limit_middleware(
    State(rate_limit): State<Arc<RateLimitLayer>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, Response> {
    if !rate_limit.check() {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Please try again later.",
        )
            .into_response());
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_is_enforced_after_the_burst() {
        let layer = RateLimitLayer::new(3, 60);
        assert!(layer.check());
        assert!(layer.check());
        assert!(layer.check());
        assert!(!layer.check());
    }
}
