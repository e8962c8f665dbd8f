mod delivery;

pub use delivery::SurrealDeliveryLedgerRepository;
