pub mod config;
pub mod db;
pub mod forms_client;
pub mod logging;
pub mod mailer;
pub mod repositories;
