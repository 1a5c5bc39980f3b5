//! Outgoing mail. The only message the authorization core sends is the
//! verification link; adapters decide where it goes.

mod console;
mod smtp;

use std::sync::Arc;

use time::OffsetDateTime;

use crate::app::{config::Config, domain::Email, APP_NAME};

pub use console::ConsoleMailer;
pub use smtp::SmtpMailer;

/// A rendered plain-text message.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: Email,
    pub from: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    /// Verification mail carrying `link`, valid until `expires_at`.
    pub fn verification(to: Email, from: impl Into<String>, link: &str, expires_at: OffsetDateTime) -> Self {
        let remaining = (expires_at - OffsetDateTime::now_utc()).whole_hours().max(1);
        Self {
            to,
            from: from.into(),
            subject: format!("Verify your {APP_NAME} account"),
            body: format!(
                "Confirm your email address to finish creating your account:\n\n{link}\n\n\
                 The link expires in {remaining} hours. If you did not sign up, ignore this message."
            ),
        }
    }
}

#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("mail configuration: {0}")]
    Config(String),
    #[error("invalid address {address}: {reason}")]
    Address { address: String, reason: String },
    #[error("smtp: {0}")]
    Smtp(String),
}

/// Pick the adapter named by `MAIL_ADAPTER`.
pub fn from_config(config: &Config) -> Result<Arc<dyn EmailSender>, EmailError> {
    match config.mail_adapter.as_str() {
        "console" => Ok(Arc::new(ConsoleMailer)),
        "smtp" => {
            let host = config
                .smtp_host
                .as_deref()
                .ok_or_else(|| EmailError::Config("SMTP_HOST is required when MAIL_ADAPTER=smtp".to_string()))?;
            let credentials = config.smtp_user.clone().zip(config.smtp_pass.clone());
            Ok(Arc::new(SmtpMailer::new(host, config.smtp_port, credentials, &config.mail_from)?))
        }
        other => Err(EmailError::Config(format!("unknown MAIL_ADAPTER {other:?}"))),
    }
}
