use thiserror::Error;

use super::BoxFuture;
use crate::notification::{MessageReceipt, OutboundEmail};

#[derive(Debug, Error)]
pub enum MailRelayError {
    #[error("mail relay configuration error: {0}")]
    Configuration(String),
    #[error("mail relay rejected message: {0}")]
    Rejected(String),
    #[error("mail relay transport error: {0}")]
    Transport(String),
}

/// Outbound transactional mail relay. The sender identity is owned by the
/// implementation, callers only supply recipient and content.
pub trait MailRelay: Send + Sync {
    fn send(&self, email: &OutboundEmail) -> BoxFuture<'_, Result<MessageReceipt, MailRelayError>>;
}
