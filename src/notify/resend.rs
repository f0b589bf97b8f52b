// Email delivery via Resend (modern, easy to use, good rates).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};

use super::Notifier;

/// Resend email client.
pub struct ResendNotifier {
    api_key: String,
    from_email: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ResendEmailRequest {
    to: String,
    from: String,
    subject: String,
    html: String,
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    id: String,
}

impl ResendNotifier {
    pub fn new(api_key: String, from_email: String) -> Self {
        Self {
            api_key,
            from_email,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> AppResult<()> {
        let request = ResendEmailRequest {
            to: to.to_string(),
            from: self.from_email.clone(),
            subject: subject.to_string(),
            html: html_body.to_string(),
        };

        let response = self
            .client
            .post("https://api.resend.com/emails")
            .timeout(std::time::Duration::from_secs(10))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalError(format!(
                "Resend API error: {}",
                error_text
            )));
        }

        let result: ResendEmailResponse = response.json().await?;
        info!("📧 Email sent via Resend: {}", result.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resend_client_creation() {
        let client = ResendNotifier::new(
            "test_key".to_string(),
            "FinTrack App <onboarding@resend.dev>".to_string(),
        );
        assert_eq!(client.from_email, "FinTrack App <onboarding@resend.dev>");
    }
}
