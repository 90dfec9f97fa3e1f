use crate::blockchain::LedgerError;

/// Errors raised while starting the tracker. The query surface never returns these;
/// once a `YieldTracker` exists every request degrades instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
