use crate::adapters::rates::{daily_compound_apy, DAYS_PER_YEAR};
use crate::adapters::tokens::{token_info, token_usd_value};
use crate::adapters::traits::{AdapterError, DeFiAdapter};
use crate::blockchain::{read_contract, LedgerClient};
use crate::models::{metadata, Asset, Position, Protocol, TokenPrices};
use alloy::{
    primitives::{address, Address, U256},
    sol,
};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// NonfungiblePositionManager on Arbitrum One.
pub const POSITION_MANAGER_ADDRESS: Address = address!("C36442b4a4522E871399CD717aBDD847Ab11FE88");

/// Uncollected fees are taken as 1% of the position's notional. The position's real
/// value is never read, so apr/apy derived from it are a rough indicator only.
pub const FEE_NOTIONAL_MULTIPLIER: f64 = 100.0;

/// Upper bound on NFTs enumerated per owner.
pub const MAX_POSITIONS: u64 = 256;

// Uniswap V3 contract ABIs using alloy sol! macro
sol! {
    interface INonfungiblePositionManager {
        function balanceOf(address owner) external view returns (uint256);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256);
        function positions(uint256 tokenId) external view returns (
            uint96 nonce,
            address operator,
            address token0,
            address token1,
            uint24 fee,
            int24 tickLower,
            int24 tickUpper,
            uint128 liquidity,
            uint256 feeGrowthInside0LastX128,
            uint256 feeGrowthInside1LastX128,
            uint128 tokensOwed0,
            uint128 tokensOwed1
        );
    }
}

/// Uniswap V3 protocol adapter
pub struct UniswapV3Adapter {
    client: Arc<dyn LedgerClient>,
    chain_id: u64,
    position_manager: Address,
}

impl UniswapV3Adapter {
    pub fn new(client: Arc<dyn LedgerClient>, chain_id: u64) -> Self {
        Self {
            client,
            chain_id,
            position_manager: POSITION_MANAGER_ADDRESS,
        }
    }

    async fn token_ids(&self, owner: Address) -> Result<Vec<U256>, AdapterError> {
        let balance = read_contract(
            self.client.as_ref(),
            self.position_manager,
            &INonfungiblePositionManager::balanceOfCall { owner },
        )
        .await?
        ._0;

        if balance.is_zero() {
            return Ok(Vec::new());
        }

        let count = if balance > U256::from(MAX_POSITIONS) {
            tracing::warn!(
                wallet = %owner,
                balance = %balance,
                limit = MAX_POSITIONS,
                "Owner holds more Uniswap positions than will be scanned"
            );
            MAX_POSITIONS
        } else {
            balance.to::<u64>()
        };

        let lookups = (0..count).map(|index| {
            let call = INonfungiblePositionManager::tokenOfOwnerByIndexCall {
                owner,
                index: U256::from(index),
            };
            async move {
                read_contract(self.client.as_ref(), self.position_manager, &call)
                    .await
                    .map(|ret| ret._0)
                    .map_err(|e| (index, e))
            }
        });

        let mut ids = Vec::with_capacity(count as usize);
        for result in join_all(lookups).await {
            match result {
                Ok(id) => ids.push(id),
                Err((index, e)) => tracing::warn!(
                    wallet = %owner,
                    index,
                    error = %e,
                    "Failed to read Uniswap position id"
                ),
            }
        }
        Ok(ids)
    }

    async fn position(
        &self,
        owner: Address,
        token_id: U256,
        prices: &TokenPrices,
    ) -> Result<Option<Position>, AdapterError> {
        let data = read_contract(
            self.client.as_ref(),
            self.position_manager,
            &INonfungiblePositionManager::positionsCall { tokenId: token_id },
        )
        .await?;

        if data.liquidity == 0 {
            return Ok(None);
        }

        let (Some(token0), Some(token1)) = (token_info(data.token0), token_info(data.token1)) else {
            tracing::debug!(
                wallet = %owner,
                token_id = %token_id,
                token0 = %data.token0,
                token1 = %data.token1,
                "Skipping Uniswap position with unsupported tokens"
            );
            return Ok(None);
        };

        let owed0 = U256::from(data.tokensOwed0);
        let owed1 = U256::from(data.tokensOwed1);
        let fees0 = token_usd_value(owed0, token0.address, prices);
        let fees1 = token_usd_value(owed1, token1.address, prices);
        let total_fees = fees0 + fees1;

        let (apr, apy) = if total_fees > 0.0 {
            let estimated_value = total_fees * FEE_NOTIONAL_MULTIPLIER;
            let daily_rate = total_fees / estimated_value;
            (daily_rate * DAYS_PER_YEAR, daily_compound_apy(daily_rate))
        } else {
            (0.0, 0.0)
        };

        let assets = vec![
            Asset::new(token0.address, token0.symbol, token0.decimals, owed0).with_usd_value(fees0),
            Asset::new(token1.address, token1.symbol, token1.decimals, owed1).with_usd_value(fees1),
        ];

        let position = Position::new(Protocol::UniswapV3, self.chain_id, owner, assets)
            .with_rates(apr, apy)
            .with_accrued(total_fees)
            .with_metadata(metadata(json!({
                "positionType": "lp",
                "positionId": token_id.to_string(),
                "poolAddress": self.position_manager,
                "token0": data.token0,
                "token1": data.token1,
                "fee": data.fee,
                "tickLower": data.tickLower,
                "tickUpper": data.tickUpper,
                "liquidity": data.liquidity.to_string(),
            })));

        Ok(Some(position))
    }
}

#[async_trait]
impl DeFiAdapter for UniswapV3Adapter {
    fn protocol(&self) -> Protocol {
        Protocol::UniswapV3
    }

    async fn fetch_positions(
        &self,
        owner: Address,
        prices: &TokenPrices,
    ) -> Result<Vec<Position>, AdapterError> {
        let token_ids = self.token_ids(owner).await?;
        if token_ids.is_empty() {
            return Ok(Vec::new());
        }

        let lookups = token_ids.iter().map(|id| self.position(owner, *id, prices));
        let mut positions = Vec::new();
        for (id, result) in token_ids.iter().zip(join_all(lookups).await) {
            match result {
                Ok(Some(position)) => positions.push(position),
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    wallet = %owner,
                    token_id = %id,
                    error = %e,
                    "Failed to read Uniswap position"
                ),
            }
        }

        tracing::info!(
            wallet = %owner,
            nft_count = token_ids.len(),
            position_count = positions.len(),
            "Fetched Uniswap V3 positions"
        );
        Ok(positions)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniswapUserSummary {
    pub total_positions: usize,
    pub total_fees: f64,
    pub weighted_apy: f64,
}

pub fn summarize(positions: &[Position]) -> UniswapUserSummary {
    let uniswap: Vec<&Position> = positions
        .iter()
        .filter(|p| p.protocol == Protocol::UniswapV3)
        .collect();

    let total_fees = uniswap.iter().map(|p| p.accrued.unwrap_or(0.0)).sum();
    let (weighted, weight) = uniswap.iter().fold((0.0, 0.0), |(num, den), p| {
        let value = p.value_usd();
        (num + value * p.apy.unwrap_or(0.0), den + value)
    });

    UniswapUserSummary {
        total_positions: uniswap.len(),
        total_fees,
        weighted_apy: if weight > 0.0 { weighted / weight } else { 0.0 },
    }
}
