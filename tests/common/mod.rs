#![allow(dead_code)]

use alloy::primitives::aliases::{U40, U80};
use alloy::primitives::{Address, Bytes, I256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use yield_tracker::adapters::aave_v3::contracts::IPoolDataProvider;
use yield_tracker::adapters::aave_v3::POOL_DATA_PROVIDER;
use yield_tracker::adapters::curve::{ICurveGauge, ICurvePool, TRICRYPTO_GAUGE, TRICRYPTO_POOL};
use yield_tracker::adapters::tokens::{USDC_USD_FEED, WBTC_USD_FEED, WETH_USD_FEED};
use yield_tracker::adapters::uniswap_v3::{INonfungiblePositionManager, POSITION_MANAGER_ADDRESS};
use yield_tracker::services::price_oracle::IAggregatorV3;
use yield_tracker::{LedgerClient, LedgerError};

pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Scripted chain. Calls are answered by exact calldata first, then by selector;
/// anything unscripted reverts.
pub struct MockLedger {
    chain_id: Mutex<Option<u64>>,
    code: Mutex<HashSet<Address>>,
    responses: Mutex<HashMap<(Address, Vec<u8>), Bytes>>,
    selector_responses: Mutex<HashMap<(Address, [u8; 4]), Bytes>>,
    failing: Mutex<HashSet<Address>>,
    balances: Mutex<HashMap<Address, U256>>,
    nonce: u64,
    block_number: u64,
    latency: Mutex<Option<Duration>>,
    calls: AtomicUsize,
    calls_by_address: Mutex<HashMap<Address, usize>>,
}

impl MockLedger {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id: Mutex::new(Some(chain_id)),
            code: Mutex::new(HashSet::new()),
            responses: Mutex::new(HashMap::new()),
            selector_responses: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            balances: Mutex::new(HashMap::new()),
            nonce: 7,
            block_number: 1_000,
            latency: Mutex::new(None),
            calls: AtomicUsize::new(0),
            calls_by_address: Mutex::new(HashMap::new()),
        }
    }

    pub fn deploy(&self, address: Address) {
        self.code.lock().unwrap().insert(address);
    }

    /// Answer exactly `call` sent to `to`.
    pub fn respond<C: SolCall>(&self, to: Address, call: &C, ret: Vec<u8>) {
        self.responses
            .lock()
            .unwrap()
            .insert((to, call.abi_encode()), Bytes::from(ret));
    }

    /// Answer any call with `C`'s selector sent to `to`.
    pub fn respond_any<C: SolCall>(&self, to: Address, ret: Vec<u8>) {
        self.selector_responses
            .lock()
            .unwrap()
            .insert((to, C::SELECTOR), Bytes::from(ret));
    }

    /// Every read touching `address` fails with a transport error.
    pub fn fail(&self, address: Address) {
        self.failing.lock().unwrap().insert(address);
    }

    pub fn fail_chain_id(&self) {
        *self.chain_id.lock().unwrap() = None;
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.balances.lock().unwrap().insert(address, balance);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Reads that touched `address` (code, calls, balance, nonce).
    pub fn calls_to(&self, address: Address) -> usize {
        self.calls_by_address
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    async fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check(&self, address: Address) -> Result<(), LedgerError> {
        *self.calls_by_address.lock().unwrap().entry(address).or_insert(0) += 1;
        if self.failing.lock().unwrap().contains(&address) {
            return Err(LedgerError::Transport(format!("connection refused for {address}")));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_code(&self, address: Address) -> Result<Bytes, LedgerError> {
        self.tick().await;
        self.check(address)?;
        if self.code.lock().unwrap().contains(&address) {
            Ok(Bytes::from_static(&[0x60, 0x80]))
        } else {
            Ok(Bytes::new())
        }
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, LedgerError> {
        self.tick().await;
        self.check(to)?;
        if let Some(ret) = self.responses.lock().unwrap().get(&(to, data.to_vec())) {
            return Ok(ret.clone());
        }
        if data.len() >= 4 {
            let selector: [u8; 4] = [data[0], data[1], data[2], data[3]];
            if let Some(ret) = self.selector_responses.lock().unwrap().get(&(to, selector)) {
                return Ok(ret.clone());
            }
        }
        Err(LedgerError::Revert(format!("no response scripted at {to}")))
    }

    async fn chain_id(&self) -> Result<u64, LedgerError> {
        self.tick().await;
        let chain_id = *self.chain_id.lock().unwrap();
        chain_id.ok_or_else(|| LedgerError::Transport("chain id unavailable".to_string()))
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        self.tick().await;
        Ok(self.block_number)
    }

    async fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        self.tick().await;
        self.check(address)?;
        Ok(self.balances.lock().unwrap().get(&address).copied().unwrap_or(U256::ZERO))
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError> {
        self.tick().await;
        self.check(address)?;
        Ok(self.nonce)
    }
}

pub fn wad(units: f64) -> U256 {
    U256::from((units * WAD as f64) as u128)
}

/// A Chainlink feed answering `price` with 8 decimals.
pub fn script_feed(ledger: &MockLedger, feed: Address, price: f64) {
    let answer = I256::try_from((price * 1e8) as i128).unwrap();
    ledger.respond(
        feed,
        &IAggregatorV3::latestRoundDataCall {},
        IAggregatorV3::latestRoundDataCall::abi_encode_returns(&(
            U80::from(1u64),
            answer,
            U256::from(1_700_000_000u64),
            U256::from(1_700_000_000u64),
            U80::from(1u64),
        )),
    );
    ledger.respond(
        feed,
        &IAggregatorV3::decimalsCall {},
        IAggregatorV3::decimalsCall::abi_encode_returns(&(8u8,)),
    );
}

/// WETH 2500, USDC 1, WBTC 45000.
pub fn script_prices(ledger: &MockLedger) {
    script_feed(ledger, WETH_USD_FEED, 2500.0);
    script_feed(ledger, USDC_USD_FEED, 1.0);
    script_feed(ledger, WBTC_USD_FEED, 45000.0);
}

pub fn user_reserve(a_token: U256, stable_debt: U256, variable_debt: U256, stable_rate: U256) -> Vec<u8> {
    IPoolDataProvider::getUserReserveDataCall::abi_encode_returns(&(
        a_token,
        stable_debt,
        variable_debt,
        stable_debt,
        variable_debt,
        stable_rate,
        U256::ZERO,
        U40::ZERO,
        true,
    ))
}

pub fn reserve(liquidity_rate: U256, variable_rate: U256) -> Vec<u8> {
    IPoolDataProvider::getReserveDataCall::abi_encode_returns(&(
        U256::ZERO,
        U256::ZERO,
        U256::ZERO,
        U256::ZERO,
        U256::ZERO,
        liquidity_rate,
        variable_rate,
        U256::ZERO,
        U256::ZERO,
        U256::ZERO,
        U256::ZERO,
        U40::ZERO,
    ))
}

/// Aave with no balances in any reserve.
pub fn script_empty_aave(ledger: &MockLedger) {
    ledger.deploy(POOL_DATA_PROVIDER);
    ledger.respond_any::<IPoolDataProvider::getUserReserveDataCall>(
        POOL_DATA_PROVIDER,
        user_reserve(U256::ZERO, U256::ZERO, U256::ZERO, U256::ZERO),
    );
    ledger.respond_any::<IPoolDataProvider::getReserveDataCall>(
        POOL_DATA_PROVIDER,
        reserve(U256::ZERO, U256::ZERO),
    );
}

pub fn script_empty_uniswap(ledger: &MockLedger, owner: Address) {
    ledger.respond(
        POSITION_MANAGER_ADDRESS,
        &INonfungiblePositionManager::balanceOfCall { owner },
        INonfungiblePositionManager::balanceOfCall::abi_encode_returns(&(U256::ZERO,)),
    );
}

pub fn script_curve_balances(ledger: &MockLedger, owner: Address, lp: U256, staked: U256) {
    ledger.deploy(TRICRYPTO_POOL);
    ledger.deploy(TRICRYPTO_GAUGE);
    ledger.respond(
        TRICRYPTO_POOL,
        &ICurvePool::balanceOfCall { account: owner },
        ICurvePool::balanceOfCall::abi_encode_returns(&(lp,)),
    );
    ledger.respond(
        TRICRYPTO_GAUGE,
        &ICurveGauge::balanceOfCall { account: owner },
        ICurveGauge::balanceOfCall::abi_encode_returns(&(staked,)),
    );
}

pub fn script_empty_curve(ledger: &MockLedger, owner: Address) {
    script_curve_balances(ledger, owner, U256::ZERO, U256::ZERO);
    ledger.respond(
        TRICRYPTO_POOL,
        &ICurvePool::get_virtual_priceCall {},
        ICurvePool::get_virtual_priceCall::abi_encode_returns(&(U256::from(WAD),)),
    );
}

/// A live chain where `owner` holds nothing in any protocol.
pub fn script_empty_wallet(ledger: &MockLedger, owner: Address) {
    script_empty_aave(ledger);
    script_empty_uniswap(ledger, owner);
    script_empty_curve(ledger, owner);
}
