use super::position::Position;
use super::protocol::{Protocol, ProtocolStatus};
use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_value: f64,
    pub total_accrued: f64,
    pub weighted_apy: f64,
    pub positions: Vec<Position>,
    pub last_updated: DateTime<Utc>,
}

impl PortfolioSummary {
    /// All-zero summary with no positions.
    pub fn empty() -> Self {
        Self {
            total_value: 0.0,
            total_accrued: 0.0,
            weighted_apy: 0.0,
            positions: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletData {
    pub address: Address,
    pub positions: Vec<Position>,
    pub summary: PortfolioSummary,
    /// How each protocol's fetch went. Lets callers tell "holds nothing" from
    /// "could not be read".
    pub protocol_status: BTreeMap<Protocol, ProtocolStatus>,
}

impl WalletData {
    /// Zero-valued data for a wallet that could not be loaded.
    pub fn empty(address: Address) -> Self {
        Self {
            address,
            positions: Vec::new(),
            summary: PortfolioSummary::empty(),
            protocol_status: BTreeMap::new(),
        }
    }

    pub fn status(&self, protocol: Protocol) -> Option<ProtocolStatus> {
        self.protocol_status.get(&protocol).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiWalletData {
    pub wallets: Vec<WalletData>,
    pub aggregated: PortfolioSummary,
}

/// One protocol's share of a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSlice {
    pub positions: Vec<Position>,
    pub summary: PortfolioSummary,
}

impl ProtocolSlice {
    pub fn empty() -> Self {
        Self {
            positions: Vec::new(),
            summary: PortfolioSummary::empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolBreakdown {
    pub aave: ProtocolSlice,
    pub uniswap: ProtocolSlice,
    pub curve: ProtocolSlice,
}

impl ProtocolBreakdown {
    pub fn empty() -> Self {
        Self {
            aave: ProtocolSlice::empty(),
            uniswap: ProtocolSlice::empty(),
            curve: ProtocolSlice::empty(),
        }
    }

    pub fn slice(&self, protocol: Protocol) -> &ProtocolSlice {
        match protocol {
            Protocol::Aave => &self.aave,
            Protocol::UniswapV3 => &self.uniswap,
            Protocol::Curve => &self.curve,
        }
    }
}
