use std::time::Instant;

use axum::Json;
use axum::extract::State;
use formcast_domain::error::DomainError;
use formcast_domain::forms::FormSpec;
use formcast_domain::orders::{OrderCompletedEvent, PipelineStage};
use formcast_domain::questions::Question;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{DataResponse, map_domain_error};
use crate::{error::ApiError, observability, state::AppState, validation};

const ORDER_COMPLETED_MESSAGE: &str = "表單建立並郵件寄送成功";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(super) struct OrderCompletedRequest {
    #[validate(length(min = 1, max = 128))]
    order_id: String,
    #[validate(email)]
    customer_email: String,
    #[validate(length(max = 128))]
    customer_name: Option<String>,
    #[validate(length(max = 64))]
    template_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OrderCompletedBody {
    form_url: String,
    message_id: String,
    message: &'static str,
}

pub(super) async fn order_completed(
    State(state): State<AppState>,
    Json(payload): Json<OrderCompletedRequest>,
) -> Result<Json<DataResponse<OrderCompletedBody>>, ApiError> {
    validation::validate(&payload)?;
    let event = OrderCompletedEvent::new(
        payload.order_id,
        payload.customer_email,
        payload.customer_name,
        payload.template_id,
    )
    .map_err(map_domain_error)?;

    // Detached so a response timeout or client disconnect cannot cancel the
    // pipeline before its outcome is in the ledger.
    let orders = state.orders.clone();
    let pipeline = tokio::spawn(async move {
        let started = Instant::now();
        let result = orders.handle(&event).await;
        let (outcome, stage) = match &result {
            Ok(_) => ("success", PipelineStage::LedgerWritten.as_str()),
            Err(err) => ("failed", failed_stage(err)),
        };
        observability::register_order_processed(outcome, stage, started.elapsed());
        result
    });

    let completion = pipeline
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "order completion task aborted");
            ApiError::Internal
        })?
        .map_err(map_domain_error)?;

    Ok(DataResponse::ok(OrderCompletedBody {
        form_url: completion.form_url,
        message_id: completion.message_id,
        message: ORDER_COMPLETED_MESSAGE,
    }))
}

fn failed_stage(err: &DomainError) -> &'static str {
    match err {
        DomainError::TemplateNotFound(_) | DomainError::Validation(_) => "template",
        DomainError::FormCreationFailed(_) => "form",
        DomainError::EmailDeliveryFailed(_) => "email",
        DomainError::LedgerWriteFailed(_) | DomainError::Ledger(_) | DomainError::NotFound => {
            "ledger"
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct CreateFormRequest {
    #[validate(length(min = 1, max = 300))]
    title: String,
    description: Option<String>,
    #[validate(length(min = 1, message = "at least one question is required"))]
    questions: Vec<Question>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateFormResponse {
    success: bool,
    form_url: String,
}

pub(super) async fn create_form(
    State(state): State<AppState>,
    Json(payload): Json<CreateFormRequest>,
) -> Result<Json<CreateFormResponse>, ApiError> {
    validation::validate(&payload)?;
    let title = validation::require_non_blank("title", &payload.title)?;

    let spec = FormSpec {
        title: title.to_string(),
        description: payload.description.unwrap_or_default(),
        questions: payload.questions,
    };
    let form_url = state
        .orders
        .forms()
        .create_form(&spec)
        .await
        .map_err(map_domain_error)?;
    tracing::info!(form_url = %form_url, "ad-hoc form created");

    Ok(Json(CreateFormResponse {
        success: true,
        form_url,
    }))
}
