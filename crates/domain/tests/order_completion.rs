use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use formcast_domain::DomainResult;
use formcast_domain::error::DomainError;
use formcast_domain::forms::{FormBuilder, FormItemRequest};
use formcast_domain::ledger::{
    DeliveryFilter, DeliveryLedger, DeliveryOutcome, DeliveryRecord, DeliveryStatus,
    InMemoryDeliveryLedgerRepository, PageRequest,
};
use formcast_domain::notification::{MessageReceipt, NotificationSender, OutboundEmail};
use formcast_domain::orders::{OrderCompletedEvent, OrderCompletionService};
use formcast_domain::ports::BoxFuture;
use formcast_domain::ports::forms::{FormsApi, FormsApiError};
use formcast_domain::ports::ledger::DeliveryLedgerRepository;
use formcast_domain::ports::mail::{MailRelay, MailRelayError};
use tokio::sync::Mutex;

const VIEW_BASE: &str = "https://docs.google.com/forms";

#[derive(Default)]
struct FakeFormsApi {
    fail: AtomicBool,
    created: AtomicUsize,
}

impl FormsApi for FakeFormsApi {
    fn create_shell(&self, _title: &str) -> BoxFuture<'_, Result<String, FormsApiError>> {
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) {
                return Err(FormsApiError::Upstream("status 503: unavailable".into()));
            }
            let n = self.created.fetch_add(1, Ordering::SeqCst);
            Ok(format!("form-{n}"))
        })
    }

    fn update_description(
        &self,
        _form_id: &str,
        _description: &str,
    ) -> BoxFuture<'_, Result<(), FormsApiError>> {
        Box::pin(async { Ok(()) })
    }

    fn batch_create_items(
        &self,
        _form_id: &str,
        _items: &[FormItemRequest],
    ) -> BoxFuture<'_, Result<(), FormsApiError>> {
        Box::pin(async { Ok(()) })
    }
}

#[derive(Default)]
struct FakeMailRelay {
    fail: AtomicBool,
    sent: Mutex<Vec<OutboundEmail>>,
}

impl MailRelay for FakeMailRelay {
    fn send(&self, email: &OutboundEmail) -> BoxFuture<'_, Result<MessageReceipt, MailRelayError>> {
        let email = email.clone();
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) {
                return Err(MailRelayError::Transport("connection reset".into()));
            }
            let mut sent = self.sent.lock().await;
            sent.push(email);
            Ok(MessageReceipt {
                message_id: format!("<msg-{}@test>", sent.len()),
            })
        })
    }
}

struct BrokenLedgerRepository;

impl DeliveryLedgerRepository for BrokenLedgerRepository {
    fn upsert(&self, _outcome: &DeliveryOutcome) -> BoxFuture<'_, DomainResult<DeliveryRecord>> {
        Box::pin(async { Err(DomainError::LedgerWriteFailed("db offline".into())) })
    }

    fn find_by_order_id(
        &self,
        _order_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<DeliveryRecord>>> {
        Box::pin(async { Err(DomainError::Ledger("db offline".into())) })
    }

    fn list(
        &self,
        _filter: &DeliveryFilter,
        _page: &PageRequest,
    ) -> BoxFuture<'_, DomainResult<Vec<DeliveryRecord>>> {
        Box::pin(async { Err(DomainError::Ledger("db offline".into())) })
    }

    fn count(&self, _filter: &DeliveryFilter) -> BoxFuture<'_, DomainResult<u64>> {
        Box::pin(async { Err(DomainError::Ledger("db offline".into())) })
    }
}

struct Harness {
    forms: Arc<FakeFormsApi>,
    mail: Arc<FakeMailRelay>,
    service: OrderCompletionService,
}

fn harness_with_repo(repo: Arc<dyn DeliveryLedgerRepository>) -> Harness {
    let forms = Arc::new(FakeFormsApi::default());
    let mail = Arc::new(FakeMailRelay::default());
    let service = OrderCompletionService::new(
        FormBuilder::new(forms.clone(), VIEW_BASE),
        NotificationSender::new(mail.clone()),
        DeliveryLedger::new(repo),
    );
    Harness {
        forms,
        mail,
        service,
    }
}

fn harness() -> Harness {
    harness_with_repo(Arc::new(InMemoryDeliveryLedgerRepository::new()))
}

fn event(order_id: &str) -> OrderCompletedEvent {
    OrderCompletedEvent::new(order_id, "a@x.com", None, None).expect("event")
}

#[tokio::test]
async fn happy_path_records_single_success() {
    let h = harness();

    let completion = h.service.handle(&event("O1")).await.expect("completion");

    assert_eq!(completion.form_url, format!("{VIEW_BASE}/d/form-0/viewform"));
    let records = h.service.ledger().find_by_order_id("O1").await.expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, DeliveryStatus::Success);
    assert_eq!(records[0].form_url, completion.form_url);
    assert_eq!(records[0].error_message, None);

    let sent = h.mail.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "a@x.com");
    assert!(sent[0].html.contains(&completion.form_url));
}

#[tokio::test]
async fn form_failure_records_failed_with_empty_url_and_reraises() {
    let h = harness();
    h.forms.fail.store(true, Ordering::SeqCst);

    let err = h.service.handle(&event("O2")).await.expect_err("error");

    assert!(matches!(err, DomainError::FormCreationFailed(ref message) if message.contains("503")));
    let records = h.service.ledger().find_by_order_id("O2").await.expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, DeliveryStatus::Failed);
    assert_eq!(records[0].form_url, "");
    assert!(records[0]
        .error_message
        .as_deref()
        .is_some_and(|message| message.contains("503")));
    assert!(h.mail.sent.lock().await.is_empty());
}

#[tokio::test]
async fn email_failure_keeps_created_form_url() {
    let h = harness();
    h.mail.fail.store(true, Ordering::SeqCst);

    let err = h.service.handle(&event("O3")).await.expect_err("error");

    assert!(matches!(err, DomainError::EmailDeliveryFailed(_)));
    let records = h.service.ledger().find_by_order_id("O3").await.expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, DeliveryStatus::Failed);
    assert_eq!(records[0].form_url, format!("{VIEW_BASE}/d/form-0/viewform"));
}

#[tokio::test]
async fn retry_after_failure_converges_to_single_success() {
    let h = harness();
    h.forms.fail.store(true, Ordering::SeqCst);
    h.service.handle(&event("O2")).await.expect_err("first attempt fails");

    h.forms.fail.store(false, Ordering::SeqCst);
    h.service.handle(&event("O2")).await.expect("retry succeeds");

    let records = h.service.ledger().find_by_order_id("O2").await.expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, DeliveryStatus::Success);
    assert_eq!(records[0].error_message, None);
    let stats = h.service.ledger().stats().await.expect("stats");
    assert_eq!(stats.total, 1);
}

#[tokio::test]
async fn unknown_template_is_recorded_and_reraised() {
    let h = harness();
    let event = OrderCompletedEvent::new("O4", "a@x.com", None, Some("nope".to_string()))
        .expect("event");

    let err = h.service.handle(&event).await.expect_err("error");

    assert!(matches!(err, DomainError::TemplateNotFound(_)));
    assert_eq!(h.forms.created.load(Ordering::SeqCst), 0);
    let records = h.service.ledger().find_by_order_id("O4").await.expect("records");
    assert_eq!(records[0].status, DeliveryStatus::Failed);
}

#[tokio::test]
async fn ledger_outage_does_not_mask_original_failure() {
    let h = harness_with_repo(Arc::new(BrokenLedgerRepository));
    h.mail.fail.store(true, Ordering::SeqCst);

    let err = h.service.handle(&event("O5")).await.expect_err("error");

    assert!(matches!(err, DomainError::EmailDeliveryFailed(_)));
}

#[tokio::test]
async fn ledger_outage_on_success_path_is_reported() {
    let h = harness_with_repo(Arc::new(BrokenLedgerRepository));

    let err = h.service.handle(&event("O6")).await.expect_err("error");

    assert!(matches!(err, DomainError::LedgerWriteFailed(_)));
    assert_eq!(h.mail.sent.lock().await.len(), 1);
}

#[tokio::test]
async fn named_customer_is_greeted_in_email() {
    let h = harness();
    let event = OrderCompletedEvent::new(
        "O7",
        "b@x.com",
        Some("Ann".to_string()),
        Some("customer-satisfaction".to_string()),
    )
    .expect("event");

    h.service.handle(&event).await.expect("completion");

    let sent = h.mail.sent.lock().await;
    assert!(sent[0].html.contains("親愛的 Ann，"));
    assert_eq!(sent[0].subject, "訂單 O7 產品意見調查表單");
}
