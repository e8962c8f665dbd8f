use std::sync::Arc;

use formcast_domain::DomainResult;
use formcast_domain::error::DomainError;
use formcast_domain::ledger::{
    DeliveryFilter, DeliveryOutcome, DeliveryRecord, DeliveryStatus, PageRequest,
};
use formcast_domain::ports::BoxFuture;
use formcast_domain::ports::ledger::DeliveryLedgerRepository;
use formcast_domain::util::{format_ms_rfc3339, parse_rfc3339_ms};
use serde::Deserialize;
use serde_json::Value;
use surrealdb::{Surreal, engine::remote::ws::Client};

use crate::db::{DbConfig, connect};

const RECORD_COLUMNS: &str = "order_id, recipient_email, form_url, status, error_message, \
     <string>created_at AS created_at, <string>updated_at AS updated_at";

#[derive(Clone)]
pub struct SurrealDeliveryLedgerRepository {
    client: Arc<Surreal<Client>>,
}

#[derive(Debug, Deserialize)]
struct SurrealDeliveryRow {
    order_id: String,
    recipient_email: String,
    #[serde(default)]
    form_url: String,
    status: String,
    error_message: Option<String>,
    created_at: String,
    updated_at: String,
}

impl SurrealDeliveryLedgerRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    pub async fn new(db_config: &DbConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: connect(db_config).await?,
        })
    }

    fn map_surreal_error(err: surrealdb::Error) -> DomainError {
        DomainError::Ledger(format!("surreal query failed: {err}"))
    }

    fn decode_rows(rows: Vec<Value>) -> DomainResult<Vec<DeliveryRecord>> {
        rows.into_iter()
            .map(|row| {
                let row = serde_json::from_value::<SurrealDeliveryRow>(row)
                    .map_err(|err| DomainError::Ledger(format!("invalid delivery row: {err}")))?;
                Self::decode_row(row)
            })
            .collect()
    }

    fn decode_row(row: SurrealDeliveryRow) -> DomainResult<DeliveryRecord> {
        let status = DeliveryStatus::parse(&row.status)
            .ok_or_else(|| DomainError::Ledger(format!("invalid delivery status '{}'", row.status)))?;
        let created_at_ms = parse_rfc3339_ms(&row.created_at)
            .ok_or_else(|| DomainError::Ledger(format!("invalid created_at '{}'", row.created_at)))?;
        let updated_at_ms = parse_rfc3339_ms(&row.updated_at)
            .ok_or_else(|| DomainError::Ledger(format!("invalid updated_at '{}'", row.updated_at)))?;
        Ok(DeliveryRecord {
            order_id: row.order_id,
            recipient_email: row.recipient_email,
            form_url: row.form_url,
            status,
            error_message: row.error_message,
            created_at_ms,
            updated_at_ms,
        })
    }

    fn filter_clause(filter: &DeliveryFilter) -> (&'static str, Option<String>) {
        match filter {
            DeliveryFilter::All => ("", None),
            DeliveryFilter::Recipient(email) => {
                (" WHERE recipient_email = $filter_value", Some(email.clone()))
            }
            DeliveryFilter::Status(status) => {
                (" WHERE status = $filter_value", Some(status.as_str().to_string()))
            }
        }
    }
}

impl DeliveryLedgerRepository for SurrealDeliveryLedgerRepository {
    fn upsert(&self, outcome: &DeliveryOutcome) -> BoxFuture<'_, DomainResult<DeliveryRecord>> {
        let outcome = outcome.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let recorded_at = format_ms_rfc3339(outcome.recorded_at_ms);
            let query = format!(
                "UPSERT type::record('delivery_record', $order_id) SET \
                    order_id = $order_id, \
                    recipient_email = $recipient_email, \
                    form_url = $form_url, \
                    status = $status, \
                    error_message = $error_message, \
                    created_at = created_at ?? <datetime>$recorded_at, \
                    updated_at = <datetime>$recorded_at \
                 RETURN NONE;\n\
                 SELECT {RECORD_COLUMNS} FROM type::record('delivery_record', $order_id);"
            );
            let mut response = client
                .query(query)
                .bind(("order_id", outcome.order_id.clone()))
                .bind(("recipient_email", outcome.recipient_email.clone()))
                .bind(("form_url", outcome.form_url.clone()))
                .bind(("status", outcome.status.as_str()))
                .bind(("error_message", outcome.error_message.clone()))
                .bind(("recorded_at", recorded_at))
                .await
                .map_err(|err| DomainError::LedgerWriteFailed(err.to_string()))?;
            let rows: Vec<Value> = response.take(1).map_err(|err| {
                DomainError::LedgerWriteFailed(format!("invalid query result: {err}"))
            })?;
            Self::decode_rows(rows)
                .map_err(|err| DomainError::LedgerWriteFailed(err.to_string()))?
                .pop()
                .ok_or_else(|| DomainError::LedgerWriteFailed("upsert returned no row".to_string()))
        })
    }

    fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<DeliveryRecord>>> {
        let order_id = order_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!(
                    "SELECT {RECORD_COLUMNS} FROM delivery_record WHERE order_id = $order_id"
                ))
                .bind(("order_id", order_id))
                .await
                .map_err(Self::map_surreal_error)?;
            let rows: Vec<Value> = response
                .take(0)
                .map_err(|err| DomainError::Ledger(format!("invalid query result: {err}")))?;
            Self::decode_rows(rows)
        })
    }

    fn list(
        &self,
        filter: &DeliveryFilter,
        page: &PageRequest,
    ) -> BoxFuture<'_, DomainResult<Vec<DeliveryRecord>>> {
        let (clause, value) = Self::filter_clause(filter);
        let limit = i64::from(page.limit);
        let start = page.offset() as i64;
        let client = self.client.clone();
        Box::pin(async move {
            let mut pending = client
                .query(format!(
                    "SELECT {RECORD_COLUMNS} FROM delivery_record{clause} \
                     ORDER BY created_at DESC, order_id DESC LIMIT $limit START $start"
                ))
                .bind(("limit", limit))
                .bind(("start", start));
            if let Some(value) = value {
                pending = pending.bind(("filter_value", value));
            }
            let mut response = pending.await.map_err(Self::map_surreal_error)?;
            let rows: Vec<Value> = response
                .take(0)
                .map_err(|err| DomainError::Ledger(format!("invalid query result: {err}")))?;
            Self::decode_rows(rows)
        })
    }

    fn count(&self, filter: &DeliveryFilter) -> BoxFuture<'_, DomainResult<u64>> {
        let (clause, value) = Self::filter_clause(filter);
        let client = self.client.clone();
        Box::pin(async move {
            let mut pending = client.query(format!(
                "SELECT count() AS total FROM delivery_record{clause} GROUP ALL"
            ));
            if let Some(value) = value {
                pending = pending.bind(("filter_value", value));
            }
            let mut response = pending.await.map_err(Self::map_surreal_error)?;
            let rows: Vec<Value> = response
                .take(0)
                .map_err(|err| DomainError::Ledger(format!("invalid query result: {err}")))?;
            let total = rows
                .first()
                .and_then(|row| row.get("total"))
                .and_then(|value| {
                    value
                        .as_u64()
                        .or_else(|| value.as_i64().and_then(|number| u64::try_from(number).ok()))
                })
                .unwrap_or(0);
            Ok(total)
        })
    }
}
