use thiserror::Error;

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Publication blocked by {} failing check(s)", .failed_checks.len())]
    PublishBlocked { failed_checks: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(String),
}
