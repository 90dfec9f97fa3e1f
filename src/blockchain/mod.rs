pub mod ethereum_client;
pub mod guarded;

pub use ethereum_client::EthereumClient;
pub use guarded::{CallPolicy, GuardedLedger};

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC call timed out after {0}ms")]
    Timeout(u64),

    #[error("Execution reverted: {0}")]
    Revert(String),

    #[error("Failed to decode return data: {0}")]
    Decode(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),
}

impl LedgerError {
    /// Transport hiccups and deadlines are worth another attempt; reverts and bad
    /// return data will fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transport(_) | LedgerError::Timeout(_))
    }
}

/// Read-only view of the chain. Everything the tracker needs from a node goes through
/// this seam so it can be wrapped (deadlines, retries) or scripted in tests.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Deployed bytecode at `address`; empty for EOAs and undeployed contracts.
    async fn get_code(&self, address: Address) -> Result<Bytes, LedgerError>;

    /// `eth_call` against the latest block with pre-encoded calldata.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, LedgerError>;

    async fn chain_id(&self) -> Result<u64, LedgerError>;

    async fn block_number(&self) -> Result<u64, LedgerError>;

    async fn balance(&self, address: Address) -> Result<U256, LedgerError>;

    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError>;
}

pub async fn has_code(client: &dyn LedgerClient, address: Address) -> Result<bool, LedgerError> {
    Ok(!client.get_code(address).await?.is_empty())
}

/// Encode a typed `sol!` call, send it, and decode the typed return.
pub async fn read_contract<C: SolCall>(
    client: &dyn LedgerClient,
    to: Address,
    call: &C,
) -> Result<C::Return, LedgerError> {
    let data = client.call(to, Bytes::from(call.abi_encode())).await?;
    C::abi_decode_returns(&data, true).map_err(|e| {
        LedgerError::Decode(format!("{} at {}: {}", C::SIGNATURE, to, e))
    })
}
