use super::{LedgerClient, LedgerError};
use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionRequest,
    transports::{
        http::{Client, Http},
        RpcError, TransportError,
    },
};
use async_trait::async_trait;
use std::str::FromStr;

/// HTTP JSON-RPC client backed by an alloy provider.
#[derive(Debug, Clone)]
pub struct EthereumClient {
    provider: RootProvider<Http<Client>>,
    rpc_url: String,
}

impl EthereumClient {
    /// Build a client for `rpc_url`. No request is sent until the first read.
    pub fn new(rpc_url: &str) -> Result<Self, LedgerError> {
        let url = rpc_url
            .parse()
            .map_err(|e| LedgerError::InvalidUrl(format!("{}: {}", rpc_url, e)))?;
        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self {
            provider,
            rpc_url: rpc_url.to_string(),
        })
    }

    pub fn from_provider(provider: RootProvider<Http<Client>>) -> Self {
        Self {
            provider,
            rpc_url: "from_existing_provider".to_string(),
        }
    }

    /// Test the RPC connection by getting the latest block number
    pub async fn test_connection(&self) -> Result<u64, LedgerError> {
        let block_number = self.provider.get_block_number().await.map_err(map_transport)?;
        tracing::info!(
            rpc_url = %self.rpc_url,
            block_number = %block_number,
            "RPC connection established"
        );
        Ok(block_number)
    }

    pub fn validate_address(address: &str) -> Result<Address, LedgerError> {
        let trimmed = address.trim();
        if trimmed.ends_with(".eth") {
            return Err(LedgerError::InvalidAddress(format!(
                "ENS names are not supported: {}",
                trimmed
            )));
        }

        Address::from_str(trimmed)
            .map_err(|e| LedgerError::InvalidAddress(format!("{}: {}", trimmed, e)))
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn provider(&self) -> &RootProvider<Http<Client>> {
        &self.provider
    }
}

/// Error codes providers use for throttling and temporary unavailability.
const RETRYABLE_CODES: [i64; 4] = [-32005, -32029, 429, 503];

/// Message fragments that mark a provider-side failure rather than an execution result.
const RETRYABLE_PATTERNS: [&str; 8] = [
    "rate limit",
    "too many requests",
    "limit exceeded",
    "request count exceeded",
    "service unavailable",
    "temporarily unavailable",
    "timeout",
    "try again",
];

/// Classify a JSON-RPC error response. Execution reverts (code 3 or a revert message)
/// are permanent; throttling and unavailability are transport failures.
fn classify_error_response(code: i64, message: &str) -> LedgerError {
    let lowered = message.to_lowercase();
    if code == 3 || lowered.contains("execution reverted") {
        return LedgerError::Revert(message.to_string());
    }
    if RETRYABLE_CODES.contains(&code) || RETRYABLE_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return LedgerError::Transport(format!("RPC error {}: {}", code, message));
    }
    LedgerError::Revert(message.to_string())
}

fn map_transport(err: TransportError) -> LedgerError {
    match err {
        RpcError::ErrorResp(payload) => classify_error_response(payload.code, &payload.message),
        other => LedgerError::Transport(other.to_string()),
    }
}

#[async_trait]
impl LedgerClient for EthereumClient {
    async fn get_code(&self, address: Address) -> Result<Bytes, LedgerError> {
        self.provider.get_code_at(address).await.map_err(map_transport)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, LedgerError> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);
        self.provider.call(&tx).await.map_err(map_transport)
    }

    async fn chain_id(&self) -> Result<u64, LedgerError> {
        self.provider.get_chain_id().await.map_err(map_transport)
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        self.provider.get_block_number().await.map_err(map_transport)
    }

    async fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        self.provider.get_balance(address).await.map_err(map_transport)
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError> {
        self.provider
            .get_transaction_count(address)
            .await
            .map_err(map_transport)
    }
}
