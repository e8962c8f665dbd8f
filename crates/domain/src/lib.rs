pub mod error;
pub mod forms;
pub mod ledger;
pub mod notification;
pub mod orders;
pub mod ports;
pub mod questions;
pub mod templates;
pub mod util;

pub type DomainResult<T> = Result<T, error::DomainError>;
