use crate::adapters::rates::{daily_compound_apy, wad_to_f64, DAYS_PER_YEAR, WAD};
use crate::adapters::tokens::{to_units, token_usd_value, u256_to_f64};
use crate::adapters::traits::{AdapterError, DeFiAdapter};
use crate::blockchain::{has_code, read_contract, LedgerClient, LedgerError};
use crate::models::{metadata, Asset, Position, Protocol, TokenPrices};
use alloy::{
    primitives::{address, Address, U256},
    sol,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Curve tricrypto pool on Arbitrum One; the pool contract is also its LP token.
pub const TRICRYPTO_POOL: Address = address!("7f90122BF0700F9E7e1F688fe926940E8839F353");
/// Liquidity gauge staking the tricrypto LP token.
pub const TRICRYPTO_GAUGE: Address = address!("97E2768e8E73511cA874545DC5Ff8067eB19B787");
/// CRV, the gauge reward token.
pub const CRV: Address = address!("11cDb42B0EB46D95f990BeDD4695A6e3fA034978");

const LP_SYMBOL: &str = "3CRV";
const LP_DECIMALS: u8 = 18;

sol! {
    interface ICurvePool {
        function balanceOf(address account) external view returns (uint256);
        function get_virtual_price() external view returns (uint256);
    }

    interface ICurveGauge {
        function balanceOf(address account) external view returns (uint256);
        function working_supply() external view returns (uint256);
        function working_balance(address account) external view returns (uint256);
        function inflation_rate() external view returns (uint256);
        function gauge_relative_weight(uint256 time) external view returns (uint256);
        function claimable_tokens(address account) external view returns (uint256);
    }
}

/// Curve adapter for one pool and its gauge.
pub struct CurveAdapter {
    client: Arc<dyn LedgerClient>,
    chain_id: u64,
    pool: Address,
    gauge: Address,
}

struct GaugeSnapshot {
    staked: U256,
    working_balance: U256,
    working_supply: U256,
    inflation_rate: U256,
    relative_weight: U256,
    claimable: U256,
}

impl CurveAdapter {
    pub fn new(client: Arc<dyn LedgerClient>, chain_id: u64) -> Self {
        Self {
            client,
            chain_id,
            pool: TRICRYPTO_POOL,
            gauge: TRICRYPTO_GAUGE,
        }
    }

    /// Reads that only refine a position fall back to `default` instead of failing it.
    fn or_default(
        result: Result<U256, LedgerError>,
        default: U256,
        field: &str,
        owner: Address,
    ) -> U256 {
        result.unwrap_or_else(|e| {
            tracing::warn!(wallet = %owner, field, error = %e, "Curve read failed, using default");
            default
        })
    }

    fn lp_position(&self, owner: Address, lp_balance: U256, virtual_price: U256) -> Position {
        let usd_value = to_units(lp_balance, LP_DECIMALS) * u256_to_f64(virtual_price) / WAD;

        Position::new(
            Protocol::Curve,
            self.chain_id,
            owner,
            vec![Asset::new(self.pool, LP_SYMBOL, LP_DECIMALS, lp_balance).with_usd_value(usd_value)],
        )
        .with_rates(0.0, 0.0)
        .with_accrued(0.0)
        .with_metadata(metadata(json!({
            "positionType": "lp",
            "poolAddress": self.pool,
            "virtualPrice": wad_to_f64(virtual_price),
        })))
    }

    fn gauge_position(&self, owner: Address, gauge: &GaugeSnapshot, prices: &TokenPrices) -> Position {
        let user_share = if gauge.working_supply.is_zero() {
            0.0
        } else {
            u256_to_f64(gauge.working_balance) / u256_to_f64(gauge.working_supply)
        };
        let gauge_share = wad_to_f64(gauge.relative_weight);
        let daily_emissions = wad_to_f64(gauge.inflation_rate) / DAYS_PER_YEAR;
        let daily_reward = daily_emissions * gauge_share * user_share;

        // Zero unless the caller's price map carries CRV.
        let claimable_usd = token_usd_value(gauge.claimable, CRV, prices);

        Position::new(
            Protocol::Curve,
            self.chain_id,
            owner,
            // Staked LP is already counted by the LP position; the stake carries no value.
            vec![Asset::new(self.gauge, LP_SYMBOL, LP_DECIMALS, gauge.staked).with_usd_value(0.0)],
        )
        .with_rates(daily_reward * DAYS_PER_YEAR, daily_compound_apy(daily_reward))
        .with_accrued(claimable_usd)
        .with_metadata(metadata(json!({
            "positionType": "gauge",
            "poolAddress": self.pool,
            "gaugeAddress": self.gauge,
            "userShare": user_share,
            "gaugeWeight": gauge_share,
            "claimableRewards": gauge.claimable.to_string(),
        })))
    }

    async fn gauge_snapshot(&self, owner: Address, staked: U256) -> Result<GaugeSnapshot, AdapterError> {
        let client = self.client.as_ref();
        let now = U256::from(chrono::Utc::now().timestamp().max(0) as u64);

        let working_supply = read_contract(client, self.gauge, &ICurveGauge::working_supplyCall {})
            .await?
            ._0;

        let balance_call = ICurveGauge::working_balanceCall { account: owner };
        let inflation_call = ICurveGauge::inflation_rateCall {};
        let weight_call = ICurveGauge::gauge_relative_weightCall { time: now };
        let claimable_call = ICurveGauge::claimable_tokensCall { account: owner };
        let (working_balance, inflation_rate, relative_weight, claimable) = tokio::join!(
            read_contract(client, self.gauge, &balance_call),
            read_contract(client, self.gauge, &inflation_call),
            read_contract(client, self.gauge, &weight_call),
            read_contract(client, self.gauge, &claimable_call),
        );

        Ok(GaugeSnapshot {
            staked,
            working_balance: Self::or_default(
                working_balance.map(|r| r._0),
                staked,
                "working_balance",
                owner,
            ),
            working_supply,
            inflation_rate: Self::or_default(
                inflation_rate.map(|r| r._0),
                U256::ZERO,
                "inflation_rate",
                owner,
            ),
            relative_weight: Self::or_default(
                relative_weight.map(|r| r._0),
                U256::ZERO,
                "gauge_relative_weight",
                owner,
            ),
            claimable: Self::or_default(claimable.map(|r| r._0), U256::ZERO, "claimable_tokens", owner),
        })
    }
}

#[async_trait]
impl DeFiAdapter for CurveAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Curve
    }

    async fn fetch_positions(
        &self,
        owner: Address,
        prices: &TokenPrices,
    ) -> Result<Vec<Position>, AdapterError> {
        let client = self.client.as_ref();

        let (pool_deployed, gauge_deployed) = tokio::try_join!(
            has_code(client, self.pool),
            has_code(client, self.gauge),
        )?;
        if !pool_deployed {
            return Err(AdapterError::ContractMissing(self.pool));
        }
        if !gauge_deployed {
            return Err(AdapterError::ContractMissing(self.gauge));
        }

        let lp_call = ICurvePool::balanceOfCall { account: owner };
        let staked_call = ICurveGauge::balanceOfCall { account: owner };
        let price_call = ICurvePool::get_virtual_priceCall {};
        let (lp_balance, staked, virtual_price) = tokio::join!(
            read_contract(client, self.pool, &lp_call),
            read_contract(client, self.gauge, &staked_call),
            read_contract(client, self.pool, &price_call),
        );
        let lp_balance = lp_balance?._0;
        let staked = Self::or_default(staked.map(|r| r._0), U256::ZERO, "gauge balanceOf", owner);
        // 1:1 when the pool will not report a virtual price
        let virtual_price = Self::or_default(
            virtual_price.map(|r| r._0),
            U256::from(1_000_000_000_000_000_000u64),
            "get_virtual_price",
            owner,
        );

        if virtual_price.is_zero() && !lp_balance.is_zero() {
            return Err(AdapterError::InvalidData(format!(
                "pool {} reports a zero virtual price",
                self.pool
            )));
        }

        let mut positions = Vec::new();
        if !lp_balance.is_zero() {
            positions.push(self.lp_position(owner, lp_balance, virtual_price));
        }

        if !staked.is_zero() {
            match self.gauge_snapshot(owner, staked).await {
                Ok(snapshot) => positions.push(self.gauge_position(owner, &snapshot, prices)),
                Err(e) => tracing::warn!(
                    wallet = %owner,
                    gauge = %self.gauge,
                    error = %e,
                    "Failed to read Curve gauge state"
                ),
            }
        }

        tracing::info!(
            wallet = %owner,
            position_count = positions.len(),
            "Fetched Curve positions"
        );
        Ok(positions)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveUserSummary {
    pub total_lp_value: f64,
    pub total_staked: f64,
    pub total_rewards: f64,
    pub weighted_apy: f64,
}

pub fn summarize(positions: &[Position]) -> CurveUserSummary {
    let mut lp_value = 0.0;
    let mut staked = 0.0;
    let mut rewards = 0.0;
    let mut weighted = 0.0;

    for position in positions.iter().filter(|p| p.protocol == Protocol::Curve) {
        let value = position.value_usd();
        if position.position_type() == Some("gauge") {
            staked += position
                .assets
                .iter()
                .map(|a| to_units(a.amount, a.decimals))
                .sum::<f64>();
            rewards += position.accrued.unwrap_or(0.0);
        } else {
            lp_value += value;
        }
        weighted += value * position.apy.unwrap_or(0.0);
    }

    CurveUserSummary {
        total_lp_value: lp_value,
        total_staked: staked,
        total_rewards: rewards,
        weighted_apy: if lp_value > 0.0 { weighted / lp_value } else { 0.0 },
    }
}
