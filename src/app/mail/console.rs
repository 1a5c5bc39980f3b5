use async_trait::async_trait;

use super::{EmailError, EmailMessage, EmailSender};

/// Writes mail to the log instead of sending it. Used in development and tests,
/// where the verification link is read straight from the output.
#[derive(Debug, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl EmailSender for ConsoleMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(to = %message.to, subject = %message.subject, "mail (console)");
        tracing::debug!(body = %message.body);
        Ok(())
    }
}
