//! Outbound report delivery.
//!
//! A [`Notifier`] delivers one message and reports the outcome directly to
//! its caller. Notifiers never retry; whether a failed report is attempted
//! again is decided by the report scheduler.

mod smtp;
mod webhook;

pub use smtp::SmtpNotifier;
pub use webhook::WebhookNotifier;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::TransportConfig;

/// Errors that can occur while delivering a report.
#[derive(Debug, Error)]
pub enum SendError {
    /// Sender or recipient is not a valid address.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress {
        /// Address as given.
        address: String,
        /// Parser message.
        reason: String,
    },

    /// The message or client could not be built.
    #[error("failed to build message: {0}")]
    Build(String),

    /// SMTP relay failure.
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// HTTP request failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("rejected with HTTP {status}: {body}")]
    Rejected {
        /// Response status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },
}

/// Delivers a composed report to a recipient.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Transport name used in logs.
    fn name(&self) -> &str;

    /// Send one message.
    ///
    /// # Errors
    /// Returns `SendError` when the message was not accepted for delivery.
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> Result<(), SendError>;
}

/// Build the notifier selected by the transport configuration.
///
/// # Errors
/// Returns `SendError` when the transport cannot be constructed.
pub fn from_config(transport: &TransportConfig) -> Result<Arc<dyn Notifier>, SendError> {
    let notifier: Arc<dyn Notifier> = match transport {
        TransportConfig::Smtp(smtp) => Arc::new(SmtpNotifier::new(smtp)?),
        TransportConfig::Webhook(webhook) => Arc::new(WebhookNotifier::new(webhook)?),
    };
    tracing::debug!(transport = notifier.name(), "Notifier initialized");
    Ok(notifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SmtpConfig, WebhookConfig};

    #[test]
    fn test_from_config_selects_transport() {
        let webhook = from_config(&TransportConfig::Webhook(WebhookConfig::new(
            "https://hooks.example.com/netmon",
        )))
        .unwrap();
        assert_eq!(webhook.name(), "webhook");

        let smtp = from_config(&TransportConfig::Smtp(SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "monitor@example.com".to_string(),
            password: "secret".to_string(),
            from: None,
        }))
        .unwrap();
        assert_eq!(smtp.name(), "smtp");
    }

    #[test]
    fn test_send_error_display() {
        let err = SendError::Rejected {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "rejected with HTTP 503: maintenance");
    }
}
