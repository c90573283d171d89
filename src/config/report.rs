//! Report and notification transport configuration.

use std::time::Duration;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::report::CadenceSchedule;

use super::validation::{ConfigError, expand_env_vars};

/// Default SMTP submission port.
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default webhook request timeout (10 seconds).
const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

fn default_mark_failed_sends() -> bool {
    true
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_webhook_timeout() -> Duration {
    DEFAULT_WEBHOOK_TIMEOUT
}

/// Periodic report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Address (or channel identifier) receiving the reports.
    pub recipient: String,

    /// Daily report schedule; absent disables daily reports.
    #[serde(default)]
    pub daily: Option<CadenceConfig>,

    /// Weekly report schedule; absent disables weekly reports.
    #[serde(default)]
    pub weekly: Option<CadenceConfig>,

    /// Write the dispatch marker even when the send fails (default: true).
    ///
    /// With `false`, a failed send leaves the period unmarked and a later
    /// cycle in the same period tries again.
    #[serde(default = "default_mark_failed_sends")]
    pub mark_failed_sends: bool,

    /// Outbound notification channel.
    pub transport: TransportConfig,
}

/// Send time for one cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Reports go out once the local hour is strictly past this value (0-23).
    pub send_hour: u32,

    /// Target weekday; required for the weekly cadence.
    #[serde(default)]
    pub weekday: Option<Weekday>,
}

/// Notification transport selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Authenticated SMTP relay.
    Smtp(SmtpConfig),
    /// JSON POST to an HTTP endpoint.
    Webhook(WebhookConfig),
}

/// SMTP relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Relay host name.
    pub host: String,
    /// Relay port (default: 587, STARTTLS).
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Login; also used as the sender address unless `from` is set.
    pub username: String,
    /// Password; `${VAR}` references are expanded at use.
    pub password: String,
    /// Explicit sender address.
    #[serde(default)]
    pub from: Option<String>,
}

impl SmtpConfig {
    /// Password with environment references expanded.
    pub fn resolved_password(&self) -> String {
        expand_env_vars(&self.password)
    }

    /// Sender mailbox.
    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.username)
    }
}

/// Webhook endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Endpoint URL.
    pub url: String,
    /// Optional bearer token; `${VAR}` references are expanded at use.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Request timeout (default: 10s).
    #[serde(default = "default_webhook_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl WebhookConfig {
    /// Create a webhook configuration with the default timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            timeout: DEFAULT_WEBHOOK_TIMEOUT,
        }
    }

    /// Bearer token with environment references expanded.
    pub fn resolved_auth_token(&self) -> Option<String> {
        self.auth_token.as_deref().map(expand_env_vars)
    }
}

impl ReportConfig {
    /// Enabled cadences with their send windows.
    pub fn schedules(&self) -> Vec<CadenceSchedule> {
        let mut schedules = Vec::with_capacity(2);
        if let Some(daily) = &self.daily {
            schedules.push(CadenceSchedule::daily(daily.send_hour));
        }
        if let Some(weekly) = &self.weekly
            && let Some(weekday) = weekly.weekday
        {
            schedules.push(CadenceSchedule::weekly(weekly.send_hour, weekday));
        }
        schedules
    }

    /// Validate recipient, cadences and transport settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recipient.trim().is_empty() {
            return Err(ConfigError::invalid("report recipient cannot be empty"));
        }

        if self.daily.is_none() && self.weekly.is_none() {
            return Err(ConfigError::invalid(
                "report section needs at least one of 'daily' or 'weekly'",
            ));
        }

        for (name, cadence) in [("daily", &self.daily), ("weekly", &self.weekly)] {
            let Some(cadence) = cadence else {
                continue;
            };
            if cadence.send_hour > 23 {
                return Err(ConfigError::invalid(format!(
                    "report {} send_hour must be within 0-23, got {}",
                    name, cadence.send_hour
                )));
            }
            if cadence.send_hour == 23 {
                tracing::warn!(
                    cadence = name,
                    "send_hour 23 never opens a send window; reports go out once the hour is past it"
                );
            }
        }

        if let Some(weekly) = &self.weekly
            && weekly.weekday.is_none()
        {
            return Err(ConfigError::invalid("report weekly cadence requires a weekday"));
        }

        match &self.transport {
            TransportConfig::Smtp(smtp) => {
                if smtp.host.trim().is_empty() {
                    return Err(ConfigError::invalid("smtp host cannot be empty"));
                }
                if smtp.username.trim().is_empty() {
                    return Err(ConfigError::invalid("smtp username cannot be empty"));
                }
                if smtp.port == 0 {
                    return Err(ConfigError::invalid("smtp port must be non-zero"));
                }
            }
            TransportConfig::Webhook(webhook) => {
                url::Url::parse(&webhook.url).map_err(|e| {
                    ConfigError::invalid(format!("invalid webhook URL '{}': {}", webhook.url, e))
                })?;
                if webhook.timeout.is_zero() {
                    return Err(ConfigError::invalid("webhook timeout must be positive"));
                }
            }
        }

        Ok(())
    }
}
