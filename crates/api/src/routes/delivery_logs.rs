use axum::Json;
use axum::extract::{Path, Query, State};
use formcast_domain::ledger::{DeliveryRecord, DeliveryStats, DeliveryStatus, Page, PageRequest};
use formcast_domain::util::format_ms_rfc3339;
use serde::{Deserialize, Serialize};

use super::{DataResponse, map_domain_error};
use crate::{error::ApiError, state::AppState};

/// Raw strings so that unparsable values fall back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub(super) struct PageQuery {
    page: Option<String>,
    limit: Option<String>,
}

impl PageQuery {
    fn to_request(&self) -> PageRequest {
        PageRequest::new(
            self.page.as_deref().and_then(|value| value.trim().parse().ok()),
            self.limit.as_deref().and_then(|value| value.trim().parse().ok()),
        )
    }
}

#[derive(Debug, Serialize)]
pub(super) struct DeliveryLogView {
    order_id: String,
    recipient_email: String,
    form_url: String,
    status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<DeliveryRecord> for DeliveryLogView {
    fn from(record: DeliveryRecord) -> Self {
        Self {
            order_id: record.order_id,
            recipient_email: record.recipient_email,
            form_url: record.form_url,
            status: record.status,
            error_message: record.error_message,
            created_at: format_ms_rfc3339(record.created_at_ms),
            updated_at: format_ms_rfc3339(record.updated_at_ms),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Pagination {
    page: u32,
    limit: u32,
    total: u64,
    total_pages: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct PagedLogsResponse {
    success: bool,
    data: Vec<DeliveryLogView>,
    pagination: Pagination,
}

impl From<Page<DeliveryRecord>> for PagedLogsResponse {
    fn from(page: Page<DeliveryRecord>) -> Self {
        Self {
            success: true,
            pagination: Pagination {
                page: page.page,
                limit: page.limit,
                total: page.total,
                total_pages: page.total_pages,
            },
            data: page.data.into_iter().map(DeliveryLogView::from).collect(),
        }
    }
}

pub(super) async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedLogsResponse>, ApiError> {
    let page = state
        .orders
        .ledger()
        .list(query.to_request())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(page.into()))
}

pub(super) async fn logs_by_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<DataResponse<Vec<DeliveryLogView>>>, ApiError> {
    let records = state
        .orders
        .ledger()
        .find_by_order_id(&order_id)
        .await
        .map_err(map_domain_error)?;
    Ok(DataResponse::ok(
        records.into_iter().map(DeliveryLogView::from).collect(),
    ))
}

pub(super) async fn logs_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedLogsResponse>, ApiError> {
    let page = state
        .orders
        .ledger()
        .list_by_recipient(&email, query.to_request())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(page.into()))
}

pub(super) async fn logs_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedLogsResponse>, ApiError> {
    let status = DeliveryStatus::parse(&status)
        .ok_or_else(|| ApiError::Validation(format!("invalid status '{status}'")))?;
    let page = state
        .orders
        .ledger()
        .list_by_status(status, query.to_request())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(page.into()))
}

pub(super) async fn stats(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<DeliveryStats>>, ApiError> {
    let stats = state
        .orders
        .ledger()
        .stats()
        .await
        .map_err(map_domain_error)?;
    Ok(DataResponse::ok(stats))
}
