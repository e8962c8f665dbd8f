use crate::DomainResult;
use crate::ledger::{DeliveryFilter, DeliveryOutcome, DeliveryRecord, PageRequest};
use crate::ports::BoxFuture;

pub trait DeliveryLedgerRepository: Send + Sync {
    /// Inserts the record for `outcome.order_id` or replaces it in place.
    /// Must be a single atomic write per order id; `created_at` survives
    /// replacement. Failures surface as `DomainError::LedgerWriteFailed`.
    fn upsert(&self, outcome: &DeliveryOutcome) -> BoxFuture<'_, DomainResult<DeliveryRecord>>;

    fn find_by_order_id(&self, order_id: &str)
    -> BoxFuture<'_, DomainResult<Vec<DeliveryRecord>>>;

    /// Newest first by `created_at`.
    fn list(
        &self,
        filter: &DeliveryFilter,
        page: &PageRequest,
    ) -> BoxFuture<'_, DomainResult<Vec<DeliveryRecord>>>;

    fn count(&self, filter: &DeliveryFilter) -> BoxFuture<'_, DomainResult<u64>>;
}
