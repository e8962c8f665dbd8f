use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("template '{0}' not found")]
    TemplateNotFound(String),
    #[error("form creation failed: {0}")]
    FormCreationFailed(String),
    #[error("email delivery failed: {0}")]
    EmailDeliveryFailed(String),
    #[error("ledger write failed: {0}")]
    LedgerWriteFailed(String),
    #[error("ledger query failed: {0}")]
    Ledger(String),
}
