use std::sync::Arc;

use formcast_domain::forms::FormBuilder;
use formcast_domain::ledger::{DeliveryLedger, InMemoryDeliveryLedgerRepository};
use formcast_domain::notification::NotificationSender;
use formcast_domain::orders::OrderCompletionService;
use formcast_domain::ports::db::DbAdapter;
use formcast_domain::ports::forms::FormsApi;
use formcast_domain::ports::ledger::DeliveryLedgerRepository;
use formcast_domain::ports::mail::MailRelay;
use formcast_infra::config::AppConfig;
use formcast_infra::db::{DbConfig, MemoryAdapter, SurrealAdapter};
use formcast_infra::forms_client::GoogleFormsClient;
use formcast_infra::mailer::{LogMailRelay, SmtpMailRelay};
use formcast_infra::repositories::SurrealDeliveryLedgerRepository;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub orders: OrderCompletionService,
    pub db: Arc<dyn DbAdapter>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let ledger: Arc<dyn DeliveryLedgerRepository>;
        let db: Arc<dyn DbAdapter>;
        if config.uses_surreal() {
            let db_config = DbConfig::from_app_config(&config);
            ledger = Arc::new(SurrealDeliveryLedgerRepository::new(&db_config).await?);
            db = Arc::new(SurrealAdapter::new(db_config));
        } else {
            tracing::info!("using in-memory delivery ledger");
            ledger = Arc::new(InMemoryDeliveryLedgerRepository::new());
            db = Arc::new(MemoryAdapter);
        }

        let relay: Arc<dyn MailRelay> = if config.uses_smtp() {
            Arc::new(SmtpMailRelay::from_config(&config)?)
        } else {
            tracing::info!("mail backend is 'log'; emails will not leave this process");
            Arc::new(LogMailRelay::new(config.mail_from.clone()))
        };

        if config.forms_access_token.trim().is_empty() {
            tracing::warn!("forms_access_token is empty; form creation will be rejected");
        }
        let forms = Arc::new(GoogleFormsClient::from_config(&config));

        Ok(Self::with_services(config, forms, relay, ledger, db))
    }

    pub fn with_services(
        config: AppConfig,
        forms: Arc<dyn FormsApi>,
        relay: Arc<dyn MailRelay>,
        ledger: Arc<dyn DeliveryLedgerRepository>,
        db: Arc<dyn DbAdapter>,
    ) -> Self {
        let builder = FormBuilder::new(forms, config.forms_view_base_url.clone());
        let orders = OrderCompletionService::new(
            builder,
            NotificationSender::new(relay),
            DeliveryLedger::new(ledger),
        );
        Self { config, orders, db }
    }
}
