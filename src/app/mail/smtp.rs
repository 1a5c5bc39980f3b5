use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};

use super::{EmailError, EmailMessage, EmailSender};

/// Delivers through an SMTP relay. Port 465 uses implicit TLS, 587 STARTTLS,
/// anything else plain SMTP (local catchers such as Mailpit).
#[derive(Debug)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

fn mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address.parse().map_err(|e: lettre::address::AddressError| EmailError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        credentials: Option<(String, String)>,
        from: &str,
    ) -> Result<Self, EmailError> {
        let from = mailbox(from)?;

        let builder = match port {
            465 => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
            587 => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
            _ => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)),
        }
        .map_err(|e| EmailError::Config(format!("SMTP relay {host}: {e}")))?;

        let mut builder = builder.port(port);
        if let Some((user, pass)) = credentials {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(mailbox(message.to.as_str())?)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| EmailError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| EmailError::Smtp(e.to_string()))?;

        tracing::debug!(to = %message.to, "mail delivered");
        Ok(())
    }
}
