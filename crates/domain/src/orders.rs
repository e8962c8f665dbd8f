use serde::Serialize;

use crate::DomainResult;
use crate::error::DomainError;
use crate::forms::FormBuilder;
use crate::ledger::{DeliveryLedger, DeliveryOutcome, DeliveryRecord};
use crate::notification::NotificationSender;
use crate::templates;
use crate::util::non_blank;

/// A validated order-completed event. Only constructible through
/// [`OrderCompletedEvent::new`], so required fields are always present.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct OrderCompletedEvent {
    order_id: String,
    customer_email: String,
    customer_name: Option<String>,
    template_id: Option<String>,
}

impl OrderCompletedEvent {
    pub fn new(
        order_id: impl Into<String>,
        customer_email: impl Into<String>,
        customer_name: Option<String>,
        template_id: Option<String>,
    ) -> DomainResult<Self> {
        let order_id = order_id.into().trim().to_string();
        let customer_email = customer_email.into().trim().to_string();
        if order_id.is_empty() || customer_email.is_empty() {
            return Err(DomainError::Validation(
                "order_id and customer_email are required".into(),
            ));
        }
        Ok(Self {
            order_id,
            customer_email,
            customer_name: non_blank(customer_name.as_deref()).map(str::to_string),
            template_id: non_blank(template_id.as_deref()).map(str::to_string),
        })
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    pub fn customer_name(&self) -> Option<&str> {
        self.customer_name.as_deref()
    }

    pub fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Started,
    TemplateResolved,
    FormCreated,
    EmailSent,
    LedgerWritten,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::TemplateResolved => "template_resolved",
            Self::FormCreated => "form_created",
            Self::EmailSent => "email_sent",
            Self::LedgerWritten => "ledger_written",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderCompletion {
    pub form_url: String,
    pub message_id: String,
    pub record: DeliveryRecord,
}

/// Runs template resolution, form creation, email and ledger write-back for
/// one order. Every failure is recorded in the ledger before the original
/// error is returned; a ledger error on that path is logged, never returned.
#[derive(Clone)]
pub struct OrderCompletionService {
    forms: FormBuilder,
    notifier: NotificationSender,
    ledger: DeliveryLedger,
}

impl OrderCompletionService {
    pub fn new(forms: FormBuilder, notifier: NotificationSender, ledger: DeliveryLedger) -> Self {
        Self {
            forms,
            notifier,
            ledger,
        }
    }

    pub fn ledger(&self) -> &DeliveryLedger {
        &self.ledger
    }

    pub fn forms(&self) -> &FormBuilder {
        &self.forms
    }

    pub async fn handle(&self, event: &OrderCompletedEvent) -> DomainResult<OrderCompletion> {
        let order_id = event.order_id();
        tracing::info!(
            order_id,
            stage = PipelineStage::Started.as_str(),
            "order completion started"
        );

        let spec = match templates::resolve(
            event.template_id(),
            order_id,
            event.customer_name(),
        ) {
            Ok(spec) => spec,
            Err(err) => return Err(self.fail(event, PipelineStage::Started, "", err).await),
        };
        tracing::debug!(
            order_id,
            stage = PipelineStage::TemplateResolved.as_str(),
            title = %spec.title,
            "template resolved"
        );

        let form_url = match self.forms.create_form(&spec).await {
            Ok(url) => url,
            Err(err) => {
                return Err(self
                    .fail(event, PipelineStage::TemplateResolved, "", err)
                    .await);
            }
        };
        tracing::info!(
            order_id,
            stage = PipelineStage::FormCreated.as_str(),
            form_url = %form_url,
            "form created"
        );

        let receipt = match self
            .notifier
            .send_form_link(
                event.customer_email(),
                order_id,
                event.customer_name(),
                &form_url,
            )
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => {
                return Err(self
                    .fail(event, PipelineStage::FormCreated, &form_url, err)
                    .await);
            }
        };
        tracing::info!(
            order_id,
            stage = PipelineStage::EmailSent.as_str(),
            message_id = %receipt.message_id,
            "form link emailed"
        );

        let record = self
            .ledger
            .record_outcome(DeliveryOutcome::success(
                order_id,
                event.customer_email(),
                &form_url,
            ))
            .await?;
        tracing::info!(
            order_id,
            stage = PipelineStage::LedgerWritten.as_str(),
            "order completion recorded"
        );

        Ok(OrderCompletion {
            form_url,
            message_id: receipt.message_id,
            record,
        })
    }

    async fn fail(
        &self,
        event: &OrderCompletedEvent,
        stage: PipelineStage,
        form_url: &str,
        err: DomainError,
    ) -> DomainError {
        tracing::warn!(
            order_id = event.order_id(),
            stage = stage.as_str(),
            error = %err,
            "order completion failed"
        );
        let outcome = DeliveryOutcome::failed(
            event.order_id(),
            event.customer_email(),
            form_url,
            err.to_string(),
        );
        if let Err(ledger_err) = self.ledger.record_outcome(outcome).await {
            tracing::error!(
                order_id = event.order_id(),
                error = %ledger_err,
                "failed to record delivery failure"
            );
        }
        err
    }
}
