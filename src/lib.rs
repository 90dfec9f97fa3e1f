pub mod adapters;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use blockchain::{EthereumClient, GuardedLedger, LedgerClient, LedgerError};
pub use config::Settings;
pub use error::AppError;
pub use models::*;
pub use services::YieldTracker;
