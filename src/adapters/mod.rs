pub mod aave_v3;
pub mod curve;
pub mod rates;
pub mod tokens;
pub mod traits;
pub mod uniswap_v3;

pub use aave_v3::AaveV3Adapter;
pub use curve::CurveAdapter;
pub use traits::*;
pub use uniswap_v3::UniswapV3Adapter;

use crate::blockchain::LedgerClient;
use crate::models::{Position, Protocol, ProtocolStatus, TokenPrices};
use alloy::primitives::Address;
use std::sync::Arc;

/// The supported protocols as one closed set. Adding a protocol means adding a variant.
pub enum ProtocolAdapter {
    Aave(AaveV3Adapter),
    UniswapV3(UniswapV3Adapter),
    Curve(CurveAdapter),
}

/// What one adapter produced for one wallet.
#[derive(Debug, Clone)]
pub struct AdapterOutcome {
    pub protocol: Protocol,
    pub positions: Vec<Position>,
    pub status: ProtocolStatus,
}

impl ProtocolAdapter {
    /// One adapter per supported protocol, in `Protocol::ALL` order.
    pub fn all(client: Arc<dyn LedgerClient>, chain_id: u64) -> Vec<ProtocolAdapter> {
        Protocol::ALL
            .iter()
            .map(|protocol| Self::for_protocol(*protocol, client.clone(), chain_id))
            .collect()
    }

    pub fn for_protocol(protocol: Protocol, client: Arc<dyn LedgerClient>, chain_id: u64) -> Self {
        match protocol {
            Protocol::Aave => ProtocolAdapter::Aave(AaveV3Adapter::new(client, chain_id)),
            Protocol::UniswapV3 => ProtocolAdapter::UniswapV3(UniswapV3Adapter::new(client, chain_id)),
            Protocol::Curve => ProtocolAdapter::Curve(CurveAdapter::new(client, chain_id)),
        }
    }

    fn inner(&self) -> &dyn DeFiAdapter {
        match self {
            ProtocolAdapter::Aave(adapter) => adapter,
            ProtocolAdapter::UniswapV3(adapter) => adapter,
            ProtocolAdapter::Curve(adapter) => adapter,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.inner().protocol()
    }

    /// Fetch positions without ever failing: errors are logged and reported as
    /// `ProtocolStatus::Failed` with no positions.
    pub async fn fetch(&self, owner: Address, prices: &TokenPrices) -> AdapterOutcome {
        let protocol = self.protocol();
        match self.inner().fetch_positions(owner, prices).await {
            Ok(mut positions) => {
                positions.retain(|p| !p.assets.is_empty());
                let status = if positions.is_empty() {
                    ProtocolStatus::Empty
                } else {
                    ProtocolStatus::Ok
                };
                AdapterOutcome {
                    protocol,
                    positions,
                    status,
                }
            }
            Err(e) => {
                tracing::warn!(
                    wallet = %owner,
                    protocol = %protocol,
                    error = %e,
                    "Adapter failed, continuing without its positions"
                );
                AdapterOutcome {
                    protocol,
                    positions: Vec::new(),
                    status: ProtocolStatus::Failed,
                }
            }
        }
    }

    pub async fn fetch_positions(&self, owner: Address, prices: &TokenPrices) -> Vec<Position> {
        self.fetch(owner, prices).await.positions
    }
}
