use crate::blockchain::LedgerError;
use crate::models::{Position, Protocol, TokenPrices};
use alloy::primitives::Address;
use async_trait::async_trait;

/// Common error type for all DeFi protocol adapters
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("No contract deployed at {0}")]
    ContractMissing(Address),

    #[error("Invalid position data: {0}")]
    InvalidData(String),
}

/// Reads one protocol's positions for an owner and prices them.
#[async_trait]
pub trait DeFiAdapter: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Positions currently held by `owner`. Errors are reported to the caller, which
    /// decides how to degrade; see `ProtocolAdapter::fetch`.
    async fn fetch_positions(
        &self,
        owner: Address,
        prices: &TokenPrices,
    ) -> Result<Vec<Position>, AdapterError>;
}
