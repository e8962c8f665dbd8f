mod delivery_logs;
mod orders;

use axum::extract::State;
use axum::{
    Json, Router,
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use formcast_domain::error::DomainError;
use formcast_domain::templates::{self, TemplateSummary};
use serde::Serialize;

use crate::{error::ApiError, middleware as app_middleware, observability, state::AppState};

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/v1/orders/completed", post(orders::order_completed))
        .route("/v1/forms", post(orders::create_form))
        .route("/v1/templates", get(list_templates))
        .route("/v1/delivery-logs", get(delivery_logs::list_logs))
        .route("/v1/delivery-logs/stats", get(delivery_logs::stats))
        .route(
            "/v1/delivery-logs/order/:order_id",
            get(delivery_logs::logs_by_order),
        )
        .route(
            "/v1/delivery-logs/email/:email",
            get(delivery_logs::logs_by_email),
        )
        .route(
            "/v1/delivery-logs/status/:status",
            get(delivery_logs::logs_by_status),
        )
        .route_layer(middleware::from_fn(app_middleware::metrics_layer));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(api)
        .layer(app_middleware::cors_layer(&state.config.frontend_url))
        .layer(app_middleware::timeout_layer())
        .layer(app_middleware::trace_layer())
        .layer(app_middleware::propagate_request_id_layer())
        .layer(app_middleware::set_request_id_layer())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
    ledger: LedgerHealth,
}

#[derive(Serialize)]
struct LedgerHealth {
    backend: &'static str,
    healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let check = state.db.health_check().await;
    if let Err(err) = &check {
        tracing::warn!(backend = state.db.name(), error = %err, "ledger health check failed");
    }
    let (status_code, status) = if check.is_ok() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        status_code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            environment: state.config.app_env.clone(),
            ledger: LedgerHealth {
                backend: state.db.name(),
                healthy: check.is_ok(),
                error: check.err().map(|err| err.to_string()),
            },
        }),
    )
}

async fn metrics() -> Response {
    match observability::render_metrics() {
        Some(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

#[derive(Serialize)]
struct DataResponse<T> {
    success: bool,
    data: T,
}

impl<T> DataResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

async fn list_templates() -> Json<DataResponse<Vec<TemplateSummary>>> {
    DataResponse::ok(
        templates::catalog()
            .iter()
            .map(TemplateSummary::from)
            .collect(),
    )
}

fn map_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::Validation(message) => ApiError::Validation(message),
        err @ DomainError::TemplateNotFound(_) => ApiError::Validation(err.to_string()),
        DomainError::NotFound => ApiError::NotFound,
        err @ (DomainError::FormCreationFailed(_) | DomainError::EmailDeliveryFailed(_)) => {
            ApiError::BadGateway(err.to_string())
        }
        err @ (DomainError::LedgerWriteFailed(_) | DomainError::Ledger(_)) => {
            tracing::error!(error = %err, "delivery ledger unavailable");
            ApiError::Internal
        }
    }
}
