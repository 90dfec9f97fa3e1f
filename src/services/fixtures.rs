//! Canned wallets and datasets. The local dataset stands in for live reads on a devnet;
//! the mock dataset backs a handful of well-known Arbitrum wallets when live reads
//! come back empty or fail.

use crate::adapters::aave_v3::POOL;
use crate::adapters::curve::TRICRYPTO_POOL;
use crate::adapters::tokens::{USDC, WBTC, WETH};
use crate::adapters::uniswap_v3::POSITION_MANAGER_ADDRESS;
use crate::config::ARBITRUM_CHAIN_ID;
use crate::models::{metadata, Asset, Position, Protocol};
use alloy::primitives::{address, Address, U256};
use chrono::{DateTime, Utc};
use serde_json::json;

/// Funded account on the local nitro devnode.
pub const LOCAL_TEST_WALLET: Address = address!("3f1Eae7D46d88F08fc2F8ed27FCb2AB183EB2d0E");

/// Chain id of the local nitro devnode the local dataset is stamped with.
pub const LOCAL_CHAIN_ID: u64 = 412346;

pub const TEST_WALLETS: [Address; 5] = [
    address!("2FAF487A441AFeD3D3342d8730Bd51114a491327"),
    address!("4d7C363DED4B3b4e1F954494d2Bc3955e49699cC"),
    address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
    address!("28C6c06298d514Db089934071355E5743bf21d60"),
    address!("21a31Ee1afC51d94C2eFcCAa2092aD1028285549"),
];

/// Uniswap WETH/USDC pool referenced by the mock LP position.
const WETH_USDC_POOL: Address = address!("C31E54c7a869B9FcBEcc14363CF510d1c41fa443");

pub fn is_local_test_wallet(address: Address) -> bool {
    address == LOCAL_TEST_WALLET
}

pub fn is_test_wallet(address: Address) -> bool {
    TEST_WALLETS.contains(&address)
}

fn units(value: u64) -> U256 {
    U256::from(value)
}

/// Deterministic positions for `owner` on the local devnode.
pub fn local_positions(owner: Address, now: DateTime<Utc>) -> Vec<Position> {
    let reserve_data = json!({
        "liquidityRate": "45000000000000000000000000",
        "variableBorrowRate": "32000000000000000000000000",
    });

    vec![
        Position::new(
            Protocol::Aave,
            LOCAL_CHAIN_ID,
            owner,
            vec![Asset::new(WETH, "WETH", 18, units(1_500_000_000_000_000_000)).with_usd_value(3750.0)],
        )
        .with_rates(0.045, 0.046)
        .with_accrued(45.5)
        .with_updated_at(now)
        .with_metadata(metadata(json!({
            "poolAddress": POOL,
            "positionType": "supply",
            "reserveData": reserve_data.clone(),
        }))),
        Position::new(
            Protocol::Aave,
            LOCAL_CHAIN_ID,
            owner,
            vec![Asset::new(USDC, "USDC", 6, units(1_000_000_000)).with_usd_value(1000.0)],
        )
        .with_rates(0.032, 0.033)
        .with_accrued(-12.5)
        .with_updated_at(now)
        .with_metadata(metadata(json!({
            "poolAddress": POOL,
            "positionType": "borrow",
            "debtType": "variable",
            "reserveData": reserve_data,
        }))),
        Position::new(
            Protocol::UniswapV3,
            LOCAL_CHAIN_ID,
            owner,
            vec![
                Asset::new(WETH, "WETH", 18, units(500_000_000_000_000_000)).with_usd_value(1250.0),
                Asset::new(USDC, "USDC", 6, units(1_250_000_000)).with_usd_value(1250.0),
            ],
        )
        .with_rates(0.12, 0.127)
        .with_accrued(75.25)
        .with_updated_at(now)
        .with_metadata(metadata(json!({
            "positionType": "lp",
            "positionId": "12345",
            "poolAddress": POSITION_MANAGER_ADDRESS,
            "token0": WETH,
            "token1": USDC,
            "fee": 3000,
            "tickLower": -887220,
            "tickUpper": 887220,
            "liquidity": "1000000000000000000",
        }))),
        Position::new(
            Protocol::Curve,
            LOCAL_CHAIN_ID,
            owner,
            vec![Asset::new(WBTC, "WBTC", 8, units(10_000_000)).with_usd_value(4500.0)],
        )
        .with_rates(0.08, 0.083)
        .with_accrued(17.25)
        .with_updated_at(now)
        .with_metadata(metadata(json!({
            "poolAddress": TRICRYPTO_POOL,
            "positionType": "lp",
            "virtualPrice": "1000000000000000000",
        }))),
    ]
}

/// The canned mainnet dataset across all test wallets.
pub fn mock_positions(now: DateTime<Utc>) -> Vec<Position> {
    vec![
        Position::new(
            Protocol::Aave,
            ARBITRUM_CHAIN_ID,
            TEST_WALLETS[0],
            vec![Asset::new(WETH, "WETH", 18, units(1_000_000_000_000_000_000)).with_usd_value(2500.0)],
        )
        .with_rates(0.045, 0.046)
        .with_accrued(3.15)
        .with_updated_at(now)
        .with_metadata(metadata(json!({
            "poolAddress": POOL,
            "positionType": "supply",
        }))),
        Position::new(
            Protocol::UniswapV3,
            ARBITRUM_CHAIN_ID,
            TEST_WALLETS[1],
            vec![
                Asset::new(WETH, "WETH", 18, units(500_000_000_000_000_000)).with_usd_value(1250.0),
                Asset::new(USDC, "USDC", 6, units(1_250_000_000)).with_usd_value(1250.0),
            ],
        )
        .with_rates(0.12, 0.127)
        .with_accrued(8.22)
        .with_updated_at(now)
        .with_metadata(metadata(json!({
            "positionType": "lp",
            "positionId": "12345",
            "poolAddress": WETH_USDC_POOL,
            "fee": 3000,
            "liquidity": "1000000000000000000",
            "token0": WETH,
            "token1": USDC,
        }))),
        Position::new(
            Protocol::Curve,
            ARBITRUM_CHAIN_ID,
            TEST_WALLETS[2],
            vec![Asset::new(TRICRYPTO_POOL, "3CRV", 18, units(5_000_000_000_000_000_000)).with_usd_value(5000.0)],
        )
        .with_rates(0.08, 0.083)
        .with_accrued(11.42)
        .with_updated_at(now)
        .with_metadata(metadata(json!({
            "poolAddress": TRICRYPTO_POOL,
            "positionType": "lp",
            "virtualPrice": "1000000000000000000",
        }))),
    ]
}

/// Canned positions owned by `owner`; empty for wallets without any.
pub fn mock_positions_for(owner: Address, now: DateTime<Utc>) -> Vec<Position> {
    mock_positions(now)
        .into_iter()
        .filter(|p| p.owner == owner)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_dataset_shape() {
        let positions = local_positions(LOCAL_TEST_WALLET, Utc::now());
        assert_eq!(positions.len(), 4);
        assert!(positions.iter().all(|p| p.chain_id == LOCAL_CHAIN_ID));
        assert!(positions.iter().all(|p| p.owner == LOCAL_TEST_WALLET));
        assert!(positions.iter().all(|p| !p.assets.is_empty()));

        let values: Vec<f64> = positions.iter().map(|p| p.value_usd()).collect();
        assert_eq!(values, vec![3750.0, 1000.0, 2500.0, 4500.0]);
    }

    #[test]
    fn test_mock_positions_filtered_by_owner() {
        let now = Utc::now();
        assert_eq!(mock_positions_for(TEST_WALLETS[0], now).len(), 1);
        assert_eq!(mock_positions_for(TEST_WALLETS[1], now)[0].protocol, Protocol::UniswapV3);
        assert!(mock_positions_for(TEST_WALLETS[3], now).is_empty());
        assert!(mock_positions_for(LOCAL_TEST_WALLET, now).is_empty());
    }

    #[test]
    fn test_wallet_membership() {
        assert!(is_test_wallet(TEST_WALLETS[4]));
        assert!(!is_test_wallet(LOCAL_TEST_WALLET));
        assert!(is_local_test_wallet(LOCAL_TEST_WALLET));
    }
}
