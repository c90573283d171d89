//! Webhook delivery.
//!
//! Reports are posted as JSON:
//!
//! ```json
//! {
//!   "recipient": "ops@example.com",
//!   "subject": "Network Monitor Report for Tuesday October 2026",
//!   "body": "<p>Hello</p>...",
//!   "is_html": true,
//!   "sent_at": "2026-10-20T09:00:00+00:00"
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;

use super::{Notifier, SendError};
use crate::config::WebhookConfig;

/// Longest response body kept in a rejection error.
const MAX_ERROR_BODY: usize = 512;

/// Posts reports to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    auth_token: Option<String>,
}

impl WebhookNotifier {
    /// Build a notifier from endpoint settings.
    pub fn new(config: &WebhookConfig) -> Result<Self, SendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SendError::Build(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            auth_token: config.resolved_auth_token(),
        })
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_payload(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> serde_json::Value {
        serde_json::json!({
            "recipient": recipient,
            "subject": subject,
            "body": body,
            "is_html": is_html,
            "sent_at": chrono::Utc::now().to_rfc3339(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> Result<(), SendError> {
        let payload = self.build_payload(recipient, subject, body, is_html);

        let mut request = self.client.post(&self.url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let mut body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(SendError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(url = %self.url, status = %status, "Webhook accepted report");
        Ok(())
    }
}
