use thiserror::Error;

use super::BoxFuture;
use crate::forms::FormItemRequest;

#[derive(Debug, Error)]
pub enum FormsApiError {
    #[error("forms api unauthorized: {0}")]
    Unauthorized(String),
    #[error("forms api upstream error: {0}")]
    Upstream(String),
    #[error("forms api transport error: {0}")]
    Transport(String),
    #[error("forms api response decode error: {0}")]
    InvalidResponse(String),
}

/// Remote form-hosting service. Each method is one network round trip.
pub trait FormsApi: Send + Sync {
    /// Creates an empty form carrying only `title` and returns its identifier.
    fn create_shell(&self, title: &str) -> BoxFuture<'_, Result<String, FormsApiError>>;

    fn update_description(
        &self,
        form_id: &str,
        description: &str,
    ) -> BoxFuture<'_, Result<(), FormsApiError>>;

    /// Submits every item in a single batched update, in slice order.
    fn batch_create_items(
        &self,
        form_id: &str,
        items: &[FormItemRequest],
    ) -> BoxFuture<'_, Result<(), FormsApiError>>;
}
