use super::protocol::Protocol;
use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Protocol-specific extras attached to a position (pool address, rate sources, ticks ...).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Turn a `json!({...})` literal into position metadata. Non-object values yield an empty map.
pub fn metadata(value: serde_json::Value) -> Metadata {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

/// One token leg of a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    /// Amount in the token's smallest unit.
    pub amount: U256,
    pub usd_value: Option<f64>,
}

impl Asset {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8, amount: U256) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
            amount,
            usd_value: None,
        }
    }

    pub fn with_usd_value(mut self, usd_value: f64) -> Self {
        self.usd_value = Some(usd_value);
        self
    }
}

/// A yield-bearing (or cost-bearing) position held by one owner in one protocol.
///
/// Positive `apy`/`accrued` is yield earned by the holder; negative values are a cost,
/// e.g. interest on a borrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub protocol: Protocol,
    pub chain_id: u64,
    pub owner: Address,
    pub assets: Vec<Asset>,
    pub apr: Option<f64>,
    pub apy: Option<f64>,
    pub accrued: Option<f64>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Metadata,
}

impl Position {
    pub fn new(protocol: Protocol, chain_id: u64, owner: Address, assets: Vec<Asset>) -> Self {
        Self {
            protocol,
            chain_id,
            owner,
            assets,
            apr: None,
            apy: None,
            accrued: None,
            updated_at: Utc::now(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_rates(mut self, apr: f64, apy: f64) -> Self {
        self.apr = Some(apr);
        self.apy = Some(apy);
        self
    }

    pub fn with_accrued(mut self, accrued: f64) -> Self {
        self.accrued = Some(accrued);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Sum of the assets' USD values, missing values counted as zero.
    pub fn value_usd(&self) -> f64 {
        self.assets.iter().map(|a| a.usd_value.unwrap_or(0.0)).sum()
    }

    /// `positionType` metadata entry ("supply", "borrow", "lp", "gauge"), if present.
    pub fn position_type(&self) -> Option<&str> {
        self.metadata.get("positionType").and_then(|v| v.as_str())
    }
}
