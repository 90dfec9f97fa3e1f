use crate::adapters::tokens::supported_token_addresses;
use crate::adapters::{AdapterOutcome, ProtocolAdapter};
use crate::blockchain::{CallPolicy, EthereumClient, GuardedLedger, LedgerClient};
use crate::config::Settings;
use crate::error::AppError;
use crate::models::{
    MultiWalletData, Position, Protocol, ProtocolBreakdown, ProtocolSlice, ProtocolStatus,
    TokenPrices, WalletData,
};
use crate::services::environment::{self, ContractInfo, NetworkEnvironment, NetworkKind, WalletProbe};
use crate::services::fixtures;
use crate::services::price_oracle::PriceOracle;
use crate::services::summarizer::summarize;
use crate::utils::{cache_key, format_percentage, format_usd, CacheConfig, CacheStats, TtlCache};
use alloy::primitives::Address;
use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

type StatusMap = BTreeMap<Protocol, ProtocolStatus>;
type InFlight = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Drops a key's in-flight gate once its holder finishes or is cancelled, unless a
/// newer gate has replaced it.
struct GateRelease<'a> {
    in_flight: &'a InFlight,
    key: &'a str,
    gate: Arc<AsyncMutex<()>>,
}

impl Drop for GateRelease<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if in_flight
            .get(self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.gate))
        {
            in_flight.remove(self.key);
        }
    }
}

/// Values held by the data cache. Keys are built so each key only ever holds one variant.
#[derive(Debug, Clone)]
enum CachedData {
    Wallet(WalletData),
    MultiWallet(MultiWalletData),
    Breakdown(ProtocolBreakdown),
}

trait Cacheable: Clone {
    fn into_cached(self) -> CachedData;
    fn from_cached(data: CachedData) -> Option<Self>;
}

impl Cacheable for WalletData {
    fn into_cached(self) -> CachedData {
        CachedData::Wallet(self)
    }

    fn from_cached(data: CachedData) -> Option<Self> {
        match data {
            CachedData::Wallet(wallet) => Some(wallet),
            _ => None,
        }
    }
}

impl Cacheable for MultiWalletData {
    fn into_cached(self) -> CachedData {
        CachedData::MultiWallet(self)
    }

    fn from_cached(data: CachedData) -> Option<Self> {
        match data {
            CachedData::MultiWallet(multi) => Some(multi),
            _ => None,
        }
    }
}

impl Cacheable for ProtocolBreakdown {
    fn into_cached(self) -> CachedData {
        CachedData::Breakdown(self)
    }

    fn from_cached(data: CachedData) -> Option<Self> {
        match data {
            CachedData::Breakdown(breakdown) => Some(breakdown),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum OrchestrationError {
    #[error("every protocol adapter failed")]
    AllProtocolsFailed(StatusMap),

    #[error("live fetch panicked")]
    Panicked,
}

/// Result of a load: the value and whether it may be cached.
struct Loaded<T> {
    value: T,
    cacheable: bool,
}

impl<T> Loaded<T> {
    fn fresh(value: T) -> Self {
        Self {
            value,
            cacheable: true,
        }
    }

    fn degraded(value: T) -> Self {
        Self {
            value,
            cacheable: false,
        }
    }
}

/// Cross-protocol yield aggregation for one or many wallets.
///
/// Every public query returns well-formed data: adapter failures drop that protocol's
/// positions, and a failed live fetch degrades to canned data for known test wallets or
/// to a zero-valued wallet otherwise. Degraded results are not cached.
pub struct YieldTracker {
    client: Arc<dyn LedgerClient>,
    adapters: Vec<ProtocolAdapter>,
    oracle: PriceOracle,
    environment: NetworkEnvironment,
    data_cache: TtlCache<CachedData>,
    price_cache: TtlCache<TokenPrices>,
    in_flight: InFlight,
    tokens: Vec<Address>,
}

impl YieldTracker {
    pub fn new(client: Arc<dyn LedgerClient>, settings: &Settings) -> Self {
        let cache = &settings.cache;
        Self {
            adapters: ProtocolAdapter::all(client.clone(), settings.network.chain_id),
            oracle: PriceOracle::new(client.clone(), cache.oracle_ttl()),
            environment: NetworkEnvironment::new(settings.network.local_chain_ids.clone()),
            data_cache: TtlCache::new(
                "wallet_data",
                CacheConfig::wallet_data()
                    .with_ttl(cache.data_ttl())
                    .with_max_entries(cache.max_entries),
            ),
            price_cache: TtlCache::new(
                "price_data",
                CacheConfig::price_data()
                    .with_ttl(cache.price_ttl())
                    .with_max_entries(cache.max_entries),
            ),
            in_flight: Mutex::new(HashMap::new()),
            tokens: supported_token_addresses(),
            client,
        }
    }

    /// Connect to the configured RPC endpoint with the configured deadline and retry policy.
    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let rpc = EthereumClient::new(&settings.rpc.url)?;
        let guarded = GuardedLedger::new(Arc::new(rpc), CallPolicy::from(&settings.rpc));
        Ok(Self::new(Arc::new(guarded), settings))
    }

    pub async fn get_wallet_data(&self, address: Address) -> WalletData {
        self.wallet(address).await.value
    }

    /// Per-wallet data for every address plus one summary over all of their positions.
    /// A wallet that cannot be loaded contributes a zero-valued entry, and the combined
    /// result is only cached when every wallet in it was.
    pub async fn get_multi_wallet_data(&self, addresses: &[Address]) -> MultiWalletData {
        let mut parts: Vec<String> = addresses.iter().map(|a| format!("{a:#x}")).collect();
        parts.sort_unstable();
        let key = cache_key(&format!("multi-{}", parts.join("-")), &["all"]);

        self.cached(&key, || async {
            info!(wallet_count = addresses.len(), "Fetching multi-wallet data");
            let loads = addresses.iter().map(|address| async move {
                match AssertUnwindSafe(self.wallet(*address)).catch_unwind().await {
                    Ok(loaded) => loaded,
                    Err(_) => {
                        error!(wallet = %address, "Wallet load panicked, using empty data");
                        Loaded::degraded(WalletData::empty(*address))
                    }
                }
            });
            let loads = join_all(loads).await;

            let cacheable = loads.iter().all(|l| l.cacheable);
            let wallets: Vec<WalletData> = loads.into_iter().map(|l| l.value).collect();
            let merged: Vec<Position> = wallets
                .iter()
                .flat_map(|w| w.positions.iter().cloned())
                .collect();
            Loaded {
                value: MultiWalletData {
                    wallets,
                    aggregated: summarize(merged),
                },
                cacheable,
            }
        })
        .await
        .value
    }

    /// The wallet's positions split by protocol, each with its own summary.
    pub async fn get_protocol_breakdown(&self, address: Address) -> ProtocolBreakdown {
        let key = cache_key(&format!("{address:#x}"), &["breakdown"]);
        self.cached(&key, || async move {
            if self.serves_local_fixture(address).await {
                return Loaded::fresh(breakdown(fixtures::local_positions(address, Utc::now())));
            }

            match AssertUnwindSafe(self.fetch_protocols(address)).catch_unwind().await {
                Ok(outcomes) if outcomes.iter().any(|o| o.status != ProtocolStatus::Failed) => {
                    let positions = outcomes.into_iter().flat_map(|o| o.positions).collect();
                    Loaded::fresh(breakdown(positions))
                }
                _ => {
                    warn!(wallet = %address, "Protocol breakdown unavailable");
                    Loaded::degraded(ProtocolBreakdown::empty())
                }
            }
        })
        .await
        .value
    }

    /// Drop everything cached: wallet data, orchestration prices and oracle prices.
    pub fn clear_cache(&self) {
        self.data_cache.clear();
        self.price_cache.clear();
        self.oracle.clear();
        info!("Cleared yield tracker caches");
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            data_entries: self.data_cache.len(),
            price_entries: self.price_cache.len(),
        }
    }

    pub fn format_portfolio_value(&self, value: f64) -> String {
        format_usd(value)
    }

    pub fn format_apy(&self, apy: f64) -> String {
        format_percentage(apy)
    }

    pub fn format_accrued(&self, accrued: f64) -> String {
        format_usd(accrued)
    }

    pub async fn network_kind(&self) -> NetworkKind {
        self.environment.detect(self.client.as_ref()).await
    }

    pub async fn probe_wallet(&self, address: Address) -> Option<WalletProbe> {
        environment::probe_wallet(self.client.as_ref(), address).await
    }

    pub async fn inspect_contract(&self, address: Address) -> Option<ContractInfo> {
        environment::inspect_contract(self.client.as_ref(), address).await
    }

    async fn wallet(&self, address: Address) -> Loaded<WalletData> {
        let key = cache_key(&format!("{address:#x}"), &["all"]);
        self.cached(&key, || self.load_wallet(address)).await
    }

    /// Serve `key` from the data cache, or run `load` once for all concurrent callers
    /// asking for the same key. Cache hits are always cacheable.
    async fn cached<T, F, Fut>(&self, key: &str, load: F) -> Loaded<T>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Loaded<T>>,
    {
        if let Some(hit) = self.data_cache.get(key).and_then(T::from_cached) {
            return Loaded::fresh(hit);
        }

        let gate = self.gate(key);
        let _release = GateRelease {
            in_flight: &self.in_flight,
            key,
            gate: gate.clone(),
        };
        let _guard = gate.lock_owned().await;

        // A concurrent caller may have filled the cache while this one waited.
        if let Some(hit) = self.data_cache.get(key).and_then(T::from_cached) {
            debug!(key, "Served by concurrent fetch");
            return Loaded::fresh(hit);
        }

        let loaded = load().await;
        if loaded.cacheable {
            self.data_cache.set(key, loaded.value.clone().into_cached());
        }
        loaded
    }

    fn gate(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn serves_local_fixture(&self, address: Address) -> bool {
        fixtures::is_local_test_wallet(address) && self.network_kind().await.is_local()
    }

    async fn load_wallet(&self, address: Address) -> Loaded<WalletData> {
        if self.serves_local_fixture(address).await {
            info!(wallet = %address, "Local network detected, serving local fixture data");
            let positions = fixtures::local_positions(address, Utc::now());
            return Loaded::fresh(wallet_data(address, positions, skipped()));
        }

        let result = match AssertUnwindSafe(self.live_fetch(address)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(OrchestrationError::Panicked),
        };

        match result {
            Ok(wallet) => Loaded::fresh(wallet),
            Err(e) => {
                let status = match e {
                    OrchestrationError::AllProtocolsFailed(ref status) => status.clone(),
                    OrchestrationError::Panicked => StatusMap::new(),
                };
                if fixtures::is_test_wallet(address) {
                    warn!(wallet = %address, error = %e, "Live fetch failed, serving mock data");
                    Loaded::degraded(mock_wallet(address))
                } else {
                    warn!(wallet = %address, error = %e, "Live fetch failed, returning empty wallet");
                    let mut wallet = WalletData::empty(address);
                    wallet.protocol_status = status;
                    Loaded::degraded(wallet)
                }
            }
        }
    }

    async fn live_fetch(&self, address: Address) -> Result<WalletData, OrchestrationError> {
        let outcomes = self.fetch_protocols(address).await;
        let status: StatusMap = outcomes.iter().map(|o| (o.protocol, o.status)).collect();

        if outcomes.iter().all(|o| o.status == ProtocolStatus::Failed) {
            return Err(OrchestrationError::AllProtocolsFailed(status));
        }

        let positions: Vec<Position> = outcomes.into_iter().flat_map(|o| o.positions).collect();

        if positions.is_empty() && fixtures::is_test_wallet(address) {
            info!(wallet = %address, "No live positions for test wallet, serving mock data");
            return Ok(mock_wallet(address));
        }

        info!(
            wallet = %address,
            position_count = positions.len(),
            "Fetched live wallet data"
        );
        Ok(wallet_data(address, positions, status))
    }

    /// Prices, then every adapter concurrently. Each adapter reports its own outcome.
    async fn fetch_protocols(&self, address: Address) -> Vec<AdapterOutcome> {
        let prices = self.prices().await;
        let fetches = self.adapters.iter().map(|adapter| adapter.fetch(address, &prices));
        join_all(fetches).await
    }

    /// Orchestration-level price map, cached independently of the oracle's own cache.
    async fn prices(&self) -> TokenPrices {
        let parts: Vec<String> = self.tokens.iter().map(|t| format!("{t:#x}")).collect();
        let key = cache_key("prices", &parts);
        if let Some(prices) = self.price_cache.get(&key) {
            return prices;
        }

        let prices = self.oracle.get_prices(&self.tokens).await;
        if !prices.is_empty() {
            self.price_cache.set(key, prices.clone());
        }
        prices
    }
}

fn skipped() -> StatusMap {
    Protocol::ALL
        .iter()
        .map(|p| (*p, ProtocolStatus::Skipped))
        .collect()
}

fn wallet_data(address: Address, positions: Vec<Position>, protocol_status: StatusMap) -> WalletData {
    WalletData {
        address,
        positions: positions.clone(),
        summary: summarize(positions),
        protocol_status,
    }
}

fn mock_wallet(address: Address) -> WalletData {
    wallet_data(address, fixtures::mock_positions_for(address, Utc::now()), skipped())
}

fn breakdown(positions: Vec<Position>) -> ProtocolBreakdown {
    let slice = |protocol: Protocol| {
        let own: Vec<Position> = positions
            .iter()
            .filter(|p| p.protocol == protocol)
            .cloned()
            .collect();
        ProtocolSlice {
            positions: own.clone(),
            summary: summarize(own),
        }
    };

    ProtocolBreakdown {
        aave: slice(Protocol::Aave),
        uniswap: slice(Protocol::UniswapV3),
        curve: slice(Protocol::Curve),
    }
}
