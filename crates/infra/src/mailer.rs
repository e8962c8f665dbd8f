use formcast_domain::notification::{MessageReceipt, OutboundEmail};
use formcast_domain::ports::BoxFuture;
use formcast_domain::ports::mail::{MailRelay, MailRelayError};
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use uuid::Uuid;

use crate::config::AppConfig;

/// STARTTLS SMTP relay with a fixed sender identity.
#[derive(Clone)]
pub struct SmtpMailRelay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailRelay {
    pub fn from_config(config: &AppConfig) -> Result<Self, MailRelayError> {
        let from = parse_mailbox(&config.mail_from)?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|err| MailRelayError::Configuration(err.to_string()))?
            .port(config.smtp_port);
        if !config.smtp_username.trim().is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: &OutboundEmail) -> Result<(Message, String), MailRelayError> {
        let to = parse_mailbox(&email.to)?;
        let message_id = message_id_for(&self.from);
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|err| MailRelayError::Configuration(err.to_string()))?;
        Ok((message, message_id))
    }
}

impl MailRelay for SmtpMailRelay {
    fn send(&self, email: &OutboundEmail) -> BoxFuture<'_, Result<MessageReceipt, MailRelayError>> {
        let built = self.build_message(email);
        Box::pin(async move {
            let (message, message_id) = built?;
            self.transport.send(message).await.map_err(|err| {
                if err.is_permanent() {
                    MailRelayError::Rejected(err.to_string())
                } else {
                    MailRelayError::Transport(err.to_string())
                }
            })?;
            tracing::info!(message_id = %message_id, "email accepted by smtp relay");
            Ok(MessageReceipt { message_id })
        })
    }
}

/// Development relay: logs the envelope and reports success.
#[derive(Clone, Debug)]
pub struct LogMailRelay {
    from: String,
}

impl LogMailRelay {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

impl MailRelay for LogMailRelay {
    fn send(&self, email: &OutboundEmail) -> BoxFuture<'_, Result<MessageReceipt, MailRelayError>> {
        let to = email.to.clone();
        let subject = email.subject.clone();
        let html_bytes = email.html.len();
        Box::pin(async move {
            let message_id = match parse_mailbox(&self.from) {
                Ok(from) => message_id_for(&from),
                Err(_) => format!("<{}@localhost>", Uuid::now_v7().simple()),
            };
            tracing::info!(
                from = %self.from,
                to = %to,
                subject = %subject,
                html_bytes,
                message_id = %message_id,
                "email logged instead of sent"
            );
            Ok(MessageReceipt { message_id })
        })
    }
}

fn parse_mailbox(value: &str) -> Result<Mailbox, MailRelayError> {
    value
        .trim()
        .parse::<Mailbox>()
        .map_err(|err| MailRelayError::Configuration(format!("invalid address '{value}': {err}")))
}

fn message_id_for(from: &Mailbox) -> String {
    format!("<{}@{}>", Uuid::now_v7().simple(), from.email.domain())
}
