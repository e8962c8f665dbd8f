use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::BoxFuture;
use crate::ports::ledger::DeliveryLedgerRepository;
use crate::util::now_ms;

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Success,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl FromStr for DeliveryStatus {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err("unknown delivery status"),
        }
    }
}

/// One row per order id, overwritten by every later attempt.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryRecord {
    pub order_id: String,
    pub recipient_email: String,
    pub form_url: String,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl DeliveryRecord {
    pub fn from_outcome(outcome: &DeliveryOutcome) -> Self {
        Self {
            order_id: outcome.order_id.clone(),
            recipient_email: outcome.recipient_email.clone(),
            form_url: outcome.form_url.clone(),
            status: outcome.status,
            error_message: outcome.error_message.clone(),
            created_at_ms: outcome.recorded_at_ms,
            updated_at_ms: outcome.recorded_at_ms,
        }
    }

    /// Replaces every mutable field, keeping `order_id` and `created_at_ms`.
    pub fn apply(&mut self, outcome: &DeliveryOutcome) {
        self.recipient_email = outcome.recipient_email.clone();
        self.form_url = outcome.form_url.clone();
        self.status = outcome.status;
        self.error_message = outcome.error_message.clone();
        self.updated_at_ms = outcome.recorded_at_ms;
    }
}

/// The result of one orchestration attempt, as written to the ledger.
/// `error_message` is present exactly when `status` is `Failed`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub order_id: String,
    pub recipient_email: String,
    pub form_url: String,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub recorded_at_ms: i64,
}

impl DeliveryOutcome {
    pub fn success(
        order_id: impl Into<String>,
        recipient_email: impl Into<String>,
        form_url: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            recipient_email: recipient_email.into(),
            form_url: form_url.into(),
            status: DeliveryStatus::Success,
            error_message: None,
            recorded_at_ms: now_ms(),
        }
    }

    pub fn failed(
        order_id: impl Into<String>,
        recipient_email: impl Into<String>,
        form_url: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            recipient_email: recipient_email.into(),
            form_url: form_url.into(),
            status: DeliveryStatus::Failed,
            error_message: Some(error_message.into()),
            recorded_at_ms: now_ms(),
        }
    }

    pub fn at(mut self, recorded_at_ms: i64) -> Self {
        self.recorded_at_ms = recorded_at_ms;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryFilter {
    All,
    Recipient(String),
    Status(DeliveryStatus),
}

impl DeliveryFilter {
    pub fn matches(&self, record: &DeliveryRecord) -> bool {
        match self {
            Self::All => true,
            Self::Recipient(email) => record.recipient_email == *email,
            Self::Status(status) => record.status == *status,
        }
    }
}

/// 1-indexed page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            data,
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(u64::from(request.limit)),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStats {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub success_rate: String,
}

pub fn success_rate(success: u64, total: u64) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.2}%", success as f64 / total as f64 * 100.0)
}

#[derive(Clone)]
pub struct DeliveryLedger {
    repository: Arc<dyn DeliveryLedgerRepository>,
}

impl DeliveryLedger {
    pub fn new(repository: Arc<dyn DeliveryLedgerRepository>) -> Self {
        Self { repository }
    }

    pub async fn record_outcome(&self, outcome: DeliveryOutcome) -> DomainResult<DeliveryRecord> {
        validate_outcome(&outcome)?;
        self.repository.upsert(&outcome).await
    }

    pub async fn list(&self, page: PageRequest) -> DomainResult<Page<DeliveryRecord>> {
        self.page(DeliveryFilter::All, page).await
    }

    pub async fn find_by_order_id(&self, order_id: &str) -> DomainResult<Vec<DeliveryRecord>> {
        self.repository.find_by_order_id(order_id).await
    }

    pub async fn list_by_recipient(
        &self,
        recipient_email: &str,
        page: PageRequest,
    ) -> DomainResult<Page<DeliveryRecord>> {
        self.page(
            DeliveryFilter::Recipient(recipient_email.trim().to_string()),
            page,
        )
        .await
    }

    pub async fn list_by_status(
        &self,
        status: DeliveryStatus,
        page: PageRequest,
    ) -> DomainResult<Page<DeliveryRecord>> {
        self.page(DeliveryFilter::Status(status), page).await
    }

    pub async fn stats(&self) -> DomainResult<DeliveryStats> {
        let total = self.repository.count(&DeliveryFilter::All).await?;
        let success = self
            .repository
            .count(&DeliveryFilter::Status(DeliveryStatus::Success))
            .await?;
        let failed = self
            .repository
            .count(&DeliveryFilter::Status(DeliveryStatus::Failed))
            .await?;
        Ok(DeliveryStats {
            total,
            success,
            failed,
            success_rate: success_rate(success, total),
        })
    }

    async fn page(
        &self,
        filter: DeliveryFilter,
        request: PageRequest,
    ) -> DomainResult<Page<DeliveryRecord>> {
        let data = self.repository.list(&filter, &request).await?;
        let total = self.repository.count(&filter).await?;
        Ok(Page::new(data, request, total))
    }
}

fn validate_outcome(outcome: &DeliveryOutcome) -> DomainResult<()> {
    if outcome.order_id.trim().is_empty() {
        return Err(DomainError::Validation("order_id is required".into()));
    }
    let has_error = outcome.error_message.is_some();
    if has_error != (outcome.status == DeliveryStatus::Failed) {
        return Err(DomainError::Validation(
            "error_message must be present exactly for failed outcomes".into(),
        ));
    }
    Ok(())
}

fn newest_first(left: &DeliveryRecord, right: &DeliveryRecord) -> std::cmp::Ordering {
    right
        .created_at_ms
        .cmp(&left.created_at_ms)
        .then_with(|| right.order_id.cmp(&left.order_id))
}

#[derive(Default)]
pub struct InMemoryDeliveryLedgerRepository {
    records: Arc<RwLock<HashMap<String, DeliveryRecord>>>,
}

impl InMemoryDeliveryLedgerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeliveryLedgerRepository for InMemoryDeliveryLedgerRepository {
    fn upsert(&self, outcome: &DeliveryOutcome) -> BoxFuture<'_, DomainResult<DeliveryRecord>> {
        let outcome = outcome.clone();
        let records = self.records.clone();
        Box::pin(async move {
            let mut records = records.write().await;
            let record = records
                .entry(outcome.order_id.clone())
                .and_modify(|existing| existing.apply(&outcome))
                .or_insert_with(|| DeliveryRecord::from_outcome(&outcome));
            Ok(record.clone())
        })
    }

    fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<DeliveryRecord>>> {
        let order_id = order_id.to_string();
        let records = self.records.clone();
        Box::pin(async move {
            let records = records.read().await;
            Ok(records.get(&order_id).cloned().into_iter().collect())
        })
    }

    fn list(
        &self,
        filter: &DeliveryFilter,
        page: &PageRequest,
    ) -> BoxFuture<'_, DomainResult<Vec<DeliveryRecord>>> {
        let filter = filter.clone();
        let page = *page;
        let records = self.records.clone();
        Box::pin(async move {
            let records = records.read().await;
            let mut matched = records
                .values()
                .filter(|record| filter.matches(record))
                .cloned()
                .collect::<Vec<_>>();
            matched.sort_by(newest_first);
            Ok(matched
                .into_iter()
                .skip(page.offset() as usize)
                .take(page.limit as usize)
                .collect())
        })
    }

    fn count(&self, filter: &DeliveryFilter) -> BoxFuture<'_, DomainResult<u64>> {
        let filter = filter.clone();
        let records = self.records.clone();
        Box::pin(async move {
            let records = records.read().await;
            Ok(records.values().filter(|record| filter.matches(record)).count() as u64)
        })
    }
}
