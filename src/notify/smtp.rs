//! Authenticated SMTP delivery.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Notifier, SendError};
use crate::config::SmtpConfig;

/// Sends reports through a STARTTLS relay.
///
/// Connections are opened lazily on the first send.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    relay: String,
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("relay", &self.relay)
            .field("sender", &self.sender.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpNotifier {
    /// Build a notifier from relay settings.
    pub fn new(config: &SmtpConfig) -> Result<Self, SendError> {
        let sender = parse_mailbox(config.sender())?;
        let credentials = Credentials::new(config.username.clone(), config.resolved_password());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            sender,
            relay: format!("{}:{}", config.host, config.port),
        })
    }

    fn build_message(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> Result<Message, SendError> {
        let content_type = if is_html {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };
        Message::builder()
            .from(self.sender.clone())
            .to(parse_mailbox(recipient)?)
            .subject(subject)
            .header(content_type)
            .body(body.to_string())
            .map_err(|e| SendError::Build(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, SendError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| SendError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> Result<(), SendError> {
        let message = self.build_message(recipient, subject, body, is_html)?;
        let response = self.transport.send(message).await?;
        tracing::debug!(
            relay = %self.relay,
            recipient = %recipient,
            code = %response.code(),
            "SMTP relay accepted message"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 2525,
            username: "monitor@example.com".to_string(),
            password: "secret".to_string(),
            from: Some("Network Monitor <noreply@example.com>".to_string()),
        }
    }

    #[test]
    fn test_sender_prefers_from() {
        let notifier = SmtpNotifier::new(&config()).unwrap();
        assert_eq!(notifier.sender.email.to_string(), "noreply@example.com");
        assert_eq!(notifier.relay, "smtp.example.com:2525");
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let mut config = config();
        config.from = Some("not an address".to_string());
        let err = SmtpNotifier::new(&config).unwrap_err();
        assert!(matches!(err, SendError::InvalidAddress { .. }));
    }

    #[test]
    fn test_build_message_html() {
        let notifier = SmtpNotifier::new(&config()).unwrap();
        let message = notifier
            .build_message("ops@example.com", "Report", "<b>ok</b>", true)
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Report"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("To: ops@example.com"));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let notifier = SmtpNotifier::new(&config()).unwrap();
        let err = notifier
            .build_message("nobody", "Report", "body", false)
            .unwrap_err();
        assert!(matches!(err, SendError::InvalidAddress { .. }));
    }
}
