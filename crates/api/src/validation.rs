use crate::error::ApiError;
use validator::{Validate, ValidationErrors};

pub fn validate<T: Validate>(value: &T) -> Result<(), ApiError> {
    value
        .validate()
        .map_err(|errors| ApiError::Validation(describe(&errors)))
}

/// `validator` accepts whitespace-only strings for `length(min = 1)`.
pub fn require_non_blank<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("{field}: must not be blank")));
    }
    Ok(trimmed)
}

fn describe(errors: &ValidationErrors) -> String {
    let mut fields = errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let reasons = errors
                .iter()
                .map(|error| {
                    error
                        .message
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| error.code.to_string())
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{field}: {reasons}")
        })
        .collect::<Vec<_>>();
    fields.sort();
    fields.join("; ")
}
