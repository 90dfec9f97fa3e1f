use crate::adapters::tokens::{token_info, u256_to_f64, USDC, WBTC, WETH};
use crate::blockchain::{read_contract, LedgerClient, LedgerError};
use crate::models::{PriceData, TokenPrices};
use crate::utils::cache_key;
use alloy::primitives::{Address, U256};
use alloy::sol;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

sol! {
    interface IAggregatorV3 {
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );
        function decimals() external view returns (uint8);
    }
}

const FALLBACK_DECIMALS: u8 = 8;
const MAX_CACHED_TOKEN_SETS: u64 = 64;

/// Static prices served when no feed can be read.
pub fn fallback_prices() -> TokenPrices {
    let now = Utc::now();
    [(WETH, 2500.0), (USDC, 1.0), (WBTC, 45000.0)]
        .into_iter()
        .map(|(token, price)| {
            (
                token,
                PriceData {
                    price,
                    decimals: FALLBACK_DECIMALS,
                    updated_at: now,
                },
            )
        })
        .collect()
}

/// Chainlink-backed USD prices with a short-lived cache per requested token set.
pub struct PriceOracle {
    client: Arc<dyn LedgerClient>,
    cache: Cache<String, TokenPrices>,
}

impl PriceOracle {
    pub fn new(client: Arc<dyn LedgerClient>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CACHED_TOKEN_SETS)
            .time_to_live(ttl)
            .build();
        Self { client, cache }
    }

    /// Prices for `tokens`. Never fails: tokens without a feed or whose feed cannot be
    /// read are left out, and when nothing at all can be priced the static fallback
    /// table is returned instead.
    pub async fn get_prices(&self, tokens: &[Address]) -> TokenPrices {
        let key = Self::key(tokens);
        if let Some(prices) = self.cache.get(&key).await {
            debug!(key = %key, "Oracle price cache hit");
            return prices;
        }

        let feeds: Vec<(Address, Address)> = tokens
            .iter()
            .filter_map(|token| match token_info(*token).and_then(|t| t.price_feed) {
                Some(feed) => Some((*token, feed)),
                None => {
                    warn!(token = %token, "No price feed for token");
                    None
                }
            })
            .collect();

        if feeds.is_empty() {
            info!("No requested token has a price feed, serving fallback prices");
            return fallback_prices();
        }

        let reads = feeds.iter().map(|(token, feed)| async move {
            (*token, *feed, self.read_feed(*feed).await)
        });

        let mut prices = TokenPrices::new();
        for (token, feed, result) in join_all(reads).await {
            match result {
                Ok(price) => {
                    prices.insert(token, price);
                }
                Err(e) => warn!(token = %token, feed = %feed, error = %e, "Price feed read failed"),
            }
        }

        if prices.is_empty() {
            warn!("Every price feed failed, serving fallback prices");
            return fallback_prices();
        }

        self.cache.insert(key, prices.clone()).await;
        prices
    }

    pub async fn read_feed(&self, feed: Address) -> Result<PriceData, LedgerError> {
        let client = self.client.as_ref();
        let round_call = IAggregatorV3::latestRoundDataCall {};
        let decimals_call = IAggregatorV3::decimalsCall {};
        let (round, decimals) = tokio::try_join!(
            read_contract(client, feed, &round_call),
            read_contract(client, feed, &decimals_call),
        )?;
        let decimals = decimals._0;

        if round.answer.is_negative() {
            return Err(LedgerError::Decode(format!(
                "negative answer {} from feed {}",
                round.answer, feed
            )));
        }

        let price = u256_to_f64(round.answer.into_raw()) / 10f64.powi(decimals as i32);
        Ok(PriceData {
            price,
            decimals,
            updated_at: timestamp(round.updatedAt),
        })
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    fn key(tokens: &[Address]) -> String {
        let parts: Vec<String> = tokens.iter().map(|t| format!("{t:#x}")).collect();
        cache_key("prices", &parts)
    }
}

fn timestamp(seconds: U256) -> DateTime<Utc> {
    let secs = if seconds > U256::from(i64::MAX as u64) {
        i64::MAX
    } else {
        seconds.to::<u64>() as i64
    };
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}
