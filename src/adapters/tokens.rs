use crate::models::TokenPrices;
use alloy::primitives::{address, Address, U256};

/// Static description of a token the tracker knows how to price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: &'static str,
    pub decimals: u8,
    /// Chainlink USD aggregator, if one is wired up.
    pub price_feed: Option<Address>,
}

pub const WETH: Address = address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1");
pub const USDC: Address = address!("af88d065e77c8cC2239327C5EDb3A432268e5831");
pub const USDT: Address = address!("Fd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9");
pub const WBTC: Address = address!("2f2a2543B76A4166549F7aaB2e75Bef0aefC5B0f");

pub const WETH_USD_FEED: Address = address!("639Fe6ab55C921f74e7fac1ee960C0b6293ba612");
pub const USDC_USD_FEED: Address = address!("50834F3163758fcC1Df9973b6e91f0F0F0434aD3");
pub const WBTC_USD_FEED: Address = address!("6ce185860a4963106506C203335A2910413708e9");

/// Arbitrum One tokens. USDT has no feed wired up and is priced only when a caller
/// supplies one.
pub static SUPPORTED_TOKENS: [TokenInfo; 4] = [
    TokenInfo {
        address: WETH,
        symbol: "WETH",
        decimals: 18,
        price_feed: Some(WETH_USD_FEED),
    },
    TokenInfo {
        address: USDC,
        symbol: "USDC",
        decimals: 6,
        price_feed: Some(USDC_USD_FEED),
    },
    TokenInfo {
        address: USDT,
        symbol: "USDT",
        decimals: 6,
        price_feed: None,
    },
    TokenInfo {
        address: WBTC,
        symbol: "WBTC",
        decimals: 8,
        price_feed: Some(WBTC_USD_FEED),
    },
];

pub fn token_info(address: Address) -> Option<&'static TokenInfo> {
    SUPPORTED_TOKENS.iter().find(|t| t.address == address)
}

pub fn supported_token_addresses() -> Vec<Address> {
    SUPPORTED_TOKENS.iter().map(|t| t.address).collect()
}

/// Lossy conversion for display math. Exact below 2^53.
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64)
}

/// `amount` in base units scaled down by `decimals`.
pub fn to_units(amount: U256, decimals: u8) -> f64 {
    u256_to_f64(amount) / 10f64.powi(decimals as i32)
}

/// USD value of `amount` base units of `token`. Zero when the token or its price is unknown.
pub fn token_usd_value(amount: U256, token: Address, prices: &TokenPrices) -> f64 {
    match (token_info(token), prices.get(&token)) {
        (Some(info), Some(price)) => to_units(amount, info.decimals) * price.price,
        _ => 0.0,
    }
}
