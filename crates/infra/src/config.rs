use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub port: u16,
    pub log_level: String,
    pub data_backend: String,
    pub surreal_endpoint: String,
    pub surreal_ns: String,
    pub surreal_db: String,
    pub surreal_user: String,
    pub surreal_pass: String,
    pub forms_api_base_url: String,
    pub forms_view_base_url: String,
    pub forms_access_token: String,
    pub forms_timeout_ms: u64,
    pub mail_backend: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub mail_from: String,
    pub frontend_url: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let cfg = config::Config::builder()
            .set_default("app_env", "development")?
            .set_default("port", 3001)?
            .set_default("log_level", "info")?
            .set_default("data_backend", "memory")?
            .set_default("surreal_endpoint", "ws://127.0.0.1:8000")?
            .set_default("surreal_ns", "formcast")?
            .set_default("surreal_db", "ledger")?
            .set_default("surreal_user", "root")?
            .set_default("surreal_pass", "root")?
            .set_default("forms_api_base_url", "https://forms.googleapis.com/v1")?
            .set_default("forms_view_base_url", "https://docs.google.com/forms")?
            .set_default("forms_access_token", "")?
            .set_default("forms_timeout_ms", 10_000)?
            .set_default("mail_backend", "log")?
            .set_default("smtp_host", "smtp.gmail.com")?
            .set_default("smtp_port", 587)?
            .set_default("smtp_username", "")?
            .set_default("smtp_password", "")?
            .set_default("mail_from", "noreply@formcast.local")?
            .set_default("frontend_url", "http://localhost:5173")?
            .add_source(config::Environment::default().separator("__"))
            .build()?;
        cfg.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn uses_surreal(&self) -> bool {
        self.data_backend.eq_ignore_ascii_case("surreal")
    }

    pub fn uses_smtp(&self) -> bool {
        self.mail_backend.eq_ignore_ascii_case("smtp")
    }
}
