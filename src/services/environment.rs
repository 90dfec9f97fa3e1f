use crate::adapters::rates::WAD;
use crate::adapters::tokens::u256_to_f64;
use crate::blockchain::{read_contract, LedgerClient};
use alloy::primitives::{Address, U256};
use alloy::sol;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

sol! {
    interface IERC20Metadata {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    /// A devnet or local fork, where fixture wallets get canned data.
    Local,
    Live,
    /// The chain id could not be read.
    Unknown,
}

impl NetworkKind {
    pub fn is_local(&self) -> bool {
        matches!(self, NetworkKind::Local)
    }
}

/// Decides whether the connected node is a local test network.
#[derive(Debug, Clone)]
pub struct NetworkEnvironment {
    local_chain_ids: Vec<u64>,
}

impl NetworkEnvironment {
    pub fn new(local_chain_ids: Vec<u64>) -> Self {
        Self { local_chain_ids }
    }

    pub async fn detect(&self, client: &dyn LedgerClient) -> NetworkKind {
        match client.chain_id().await {
            Ok(chain_id) if self.local_chain_ids.contains(&chain_id) => {
                debug!(chain_id, "Connected to a local network");
                NetworkKind::Local
            }
            Ok(_) => NetworkKind::Live,
            Err(e) => {
                warn!(error = %e, "Could not read chain id");
                NetworkKind::Unknown
            }
        }
    }
}

/// Quick account-level facts for a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletProbe {
    pub block_number: u64,
    pub balance_eth: f64,
    pub nonce: u64,
}

pub async fn probe_wallet(client: &dyn LedgerClient, address: Address) -> Option<WalletProbe> {
    let probe = tokio::try_join!(
        client.block_number(),
        client.balance(address),
        client.transaction_count(address),
    );

    match probe {
        Ok((block_number, balance, nonce)) => Some(WalletProbe {
            block_number,
            balance_eth: u256_to_f64(balance) / WAD,
            nonce,
        }),
        Err(e) => {
            warn!(wallet = %address, error = %e, "Wallet probe failed");
            None
        }
    }
}

/// What can be learned about a contract without knowing its ABI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    pub address: Address,
    pub balance: U256,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

/// `None` when nothing is deployed at `address`. ERC-20 metadata fields are filled in
/// only where the contract answers.
pub async fn inspect_contract(client: &dyn LedgerClient, address: Address) -> Option<ContractInfo> {
    let code = match client.get_code(address).await {
        Ok(code) => code,
        Err(e) => {
            warn!(contract = %address, error = %e, "Failed to read contract code");
            return None;
        }
    };
    if code.is_empty() {
        return None;
    }

    let name_call = IERC20Metadata::nameCall {};
    let symbol_call = IERC20Metadata::symbolCall {};
    let decimals_call = IERC20Metadata::decimalsCall {};
    let (balance, name, symbol, decimals) = tokio::join!(
        client.balance(address),
        read_contract(client, address, &name_call),
        read_contract(client, address, &symbol_call),
        read_contract(client, address, &decimals_call),
    );

    Some(ContractInfo {
        address,
        balance: balance.unwrap_or(U256::ZERO),
        name: name.ok().map(|r| r._0),
        symbol: symbol.ok().map(|r| r._0),
        decimals: decimals.ok().map(|r| r._0),
    })
}
