pub mod contracts;

use crate::adapters::rates::{calculate_apy, ray_to_f64, DAYS_PER_YEAR};
use crate::adapters::tokens::{token_usd_value, TokenInfo, SUPPORTED_TOKENS};
use crate::adapters::traits::{AdapterError, DeFiAdapter};
use crate::blockchain::{has_code, read_contract, LedgerClient};
use crate::models::{metadata, Asset, Position, Protocol, TokenPrices};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use contracts::IPoolDataProvider;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub use contracts::{POOL, POOL_DATA_PROVIDER};

/// Aave V3 lending adapter. Emits a supply position per non-zero aToken balance and a
/// negative-yield position per non-zero stable or variable debt.
pub struct AaveV3Adapter {
    client: Arc<dyn LedgerClient>,
    chain_id: u64,
    data_provider: Address,
    pool: Address,
}

struct ReserveSnapshot {
    token: &'static TokenInfo,
    user: IPoolDataProvider::getUserReserveDataReturn,
    reserve: IPoolDataProvider::getReserveDataReturn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Supply,
    StableDebt,
    VariableDebt,
}

impl AaveV3Adapter {
    pub fn new(client: Arc<dyn LedgerClient>, chain_id: u64) -> Self {
        Self {
            client,
            chain_id,
            data_provider: POOL_DATA_PROVIDER,
            pool: POOL,
        }
    }

    pub fn with_data_provider(mut self, data_provider: Address) -> Self {
        self.data_provider = data_provider;
        self
    }

    async fn fetch_reserve(
        &self,
        token: &'static TokenInfo,
        owner: Address,
    ) -> Result<ReserveSnapshot, AdapterError> {
        let user_call = IPoolDataProvider::getUserReserveDataCall {
            asset: token.address,
            user: owner,
        };
        let reserve_call = IPoolDataProvider::getReserveDataCall {
            asset: token.address,
        };

        let client = self.client.as_ref();
        let (user, reserve) = tokio::try_join!(
            read_contract(client, self.data_provider, &user_call),
            read_contract(client, self.data_provider, &reserve_call),
        )?;

        Ok(ReserveSnapshot {
            token,
            user,
            reserve,
        })
    }

    fn build_positions(
        &self,
        owner: Address,
        snapshot: &ReserveSnapshot,
        prices: &TokenPrices,
    ) -> Vec<Position> {
        let user = &snapshot.user;
        let reserve = &snapshot.reserve;
        let mut positions = Vec::new();

        if !user.currentATokenBalance.is_zero() {
            positions.push(self.lending_position(
                owner,
                snapshot.token,
                user.currentATokenBalance,
                reserve.liquidityRate,
                Side::Supply,
                prices,
            ));
        }
        if !user.currentStableDebt.is_zero() {
            positions.push(self.lending_position(
                owner,
                snapshot.token,
                user.currentStableDebt,
                user.stableBorrowRate,
                Side::StableDebt,
                prices,
            ));
        }
        if !user.currentVariableDebt.is_zero() {
            positions.push(self.lending_position(
                owner,
                snapshot.token,
                user.currentVariableDebt,
                reserve.variableBorrowRate,
                Side::VariableDebt,
                prices,
            ));
        }

        positions
    }

    fn lending_position(
        &self,
        owner: Address,
        token: &TokenInfo,
        amount: U256,
        rate_ray: U256,
        side: Side,
        prices: &TokenPrices,
    ) -> Position {
        let usd_value = token_usd_value(amount, token.address, prices);
        let apr = ray_to_f64(rate_ray);
        let apy = calculate_apy(apr);
        let accrued = usd_value * apy / DAYS_PER_YEAR;

        let asset = Asset::new(token.address, token.symbol, token.decimals, amount)
            .with_usd_value(usd_value);
        let position = Position::new(Protocol::Aave, self.chain_id, owner, vec![asset]);

        match side {
            Side::Supply => position
                .with_rates(apr, apy)
                .with_accrued(accrued)
                .with_metadata(metadata(json!({
                    "poolAddress": self.pool,
                    "positionType": "supply",
                    "reserve": token.address,
                    "liquidityRate": apr,
                }))),
            Side::StableDebt | Side::VariableDebt => {
                let debt_type = if side == Side::StableDebt {
                    "stable"
                } else {
                    "variable"
                };
                position
                    .with_rates(-apr, -apy)
                    .with_accrued(-accrued)
                    .with_metadata(metadata(json!({
                        "poolAddress": self.pool,
                        "positionType": "borrow",
                        "debtType": debt_type,
                        "reserve": token.address,
                        "borrowRate": apr,
                    })))
            }
        }
    }
}

#[async_trait]
impl DeFiAdapter for AaveV3Adapter {
    fn protocol(&self) -> Protocol {
        Protocol::Aave
    }

    async fn fetch_positions(
        &self,
        owner: Address,
        prices: &TokenPrices,
    ) -> Result<Vec<Position>, AdapterError> {
        if !has_code(self.client.as_ref(), self.data_provider).await? {
            return Err(AdapterError::ContractMissing(self.data_provider));
        }

        let lookups = SUPPORTED_TOKENS
            .iter()
            .map(|token| self.fetch_reserve(token, owner));
        let results = join_all(lookups).await;

        let mut positions = Vec::new();
        let mut last_error = None;
        let mut failed = 0usize;
        for (token, result) in SUPPORTED_TOKENS.iter().zip(results) {
            match result {
                Ok(snapshot) => positions.extend(self.build_positions(owner, &snapshot, prices)),
                Err(e) => {
                    tracing::warn!(
                        wallet = %owner,
                        reserve = token.symbol,
                        error = %e,
                        "Failed to read Aave reserve"
                    );
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        // Every reserve failing means the provider is unusable, not that the wallet is empty.
        if failed == SUPPORTED_TOKENS.len() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        tracing::info!(
            wallet = %owner,
            position_count = positions.len(),
            "Fetched Aave V3 positions"
        );
        Ok(positions)
    }
}

/// Lending totals for one wallet's Aave positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AaveUserSummary {
    pub total_supplied: f64,
    pub total_borrowed: f64,
    pub net_position: f64,
    pub weighted_supply_apy: f64,
    /// Borrow cost as a positive rate.
    pub weighted_borrow_apy: f64,
}

pub fn summarize(positions: &[Position]) -> AaveUserSummary {
    let mut supplied = 0.0;
    let mut borrowed = 0.0;
    let mut supply_weight = 0.0;
    let mut borrow_weight = 0.0;

    for position in positions.iter().filter(|p| p.protocol == Protocol::Aave) {
        let value = position.value_usd();
        let apy = position.apy.unwrap_or(0.0).abs();
        if position.position_type() == Some("borrow") {
            borrowed += value;
            borrow_weight += value * apy;
        } else {
            supplied += value;
            supply_weight += value * apy;
        }
    }

    AaveUserSummary {
        total_supplied: supplied,
        total_borrowed: borrowed,
        net_position: supplied - borrowed,
        weighted_supply_apy: if supplied > 0.0 { supply_weight / supplied } else { 0.0 },
        weighted_borrow_apy: if borrowed > 0.0 { borrow_weight / borrowed } else { 0.0 },
    }
}
