pub mod render;
pub mod resend;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;

use crate::error::AppResult;

/// Outbound email channel. Sends are fire-and-forget from the caller's
/// point of view: a failed send is reported, and the job that requested it
/// decides whether a later run retries.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> AppResult<()>;
}
