use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Public Arbitrum One endpoint used when nothing else is configured.
pub const DEFAULT_RPC_URL: &str = "https://arb1.arbitrum.io/rpc";

/// Chain id stamped on live positions (Arbitrum One).
pub const ARBITRUM_CHAIN_ID: u64 = 42161;

const ENV_PREFIX: &str = "YIELD_TRACKER";
const CONFIG_FILE: &str = "yield-tracker";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub rpc: RpcSettings,
    pub cache: CacheSettings,
    pub network: NetworkSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSettings {
    pub url: String,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub data_ttl_secs: u64,
    pub price_ttl_secs: u64,
    pub oracle_ttl_secs: u64,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub chain_id: u64,
    pub local_chain_ids: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            rpc: RpcSettings::default(),
            cache: CacheSettings::default(),
            network: NetworkSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for RpcSettings {
    fn default() -> Self {
        RpcSettings {
            url: DEFAULT_RPC_URL.to_string(),
            timeout_ms: 10_000,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            data_ttl_secs: 60,
            price_ttl_secs: 300,
            oracle_ttl_secs: 30,
            max_entries: 100,
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        NetworkSettings {
            chain_id: ARBITRUM_CHAIN_ID,
            // Arbitrum nitro devnode, anvil/hardhat, ganache
            local_chain_ids: vec![412346, 31337, 1337],
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from compiled defaults, an optional `yield-tracker.toml`, and
    /// `YIELD_TRACKER__<SECTION>__<KEY>` environment variables, in that order.
    pub fn new() -> Result<Self, AppError> {
        let defaults = config::Config::try_from(&Settings::default())?;

        let built = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("network.local_chain_ids"),
            )
            .build()?;

        let mut settings: Settings = built.try_deserialize()?;

        if let Ok(url) = env::var("ARBITRUM_RPC_URL") {
            if !url.trim().is_empty() {
                settings.rpc.url = url;
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.rpc.url.trim().is_empty() {
            return Err(AppError::Config("rpc.url must not be empty".to_string()));
        }
        if self.rpc.max_attempts == 0 {
            return Err(AppError::Config("rpc.max_attempts must be at least 1".to_string()));
        }
        if self.rpc.timeout_ms == 0 {
            return Err(AppError::Config("rpc.timeout_ms must be positive".to_string()));
        }
        if self.cache.max_entries == 0 {
            return Err(AppError::Config("cache.max_entries must be at least 1".to_string()));
        }
        if self.cache.data_ttl_secs == 0
            || self.cache.price_ttl_secs == 0
            || self.cache.oracle_ttl_secs == 0
        {
            return Err(AppError::Config("cache TTLs must be positive".to_string()));
        }
        Ok(())
    }
}

impl CacheSettings {
    pub fn data_ttl(&self) -> Duration {
        Duration::from_secs(self.data_ttl_secs)
    }

    pub fn price_ttl(&self) -> Duration {
        Duration::from_secs(self.price_ttl_secs)
    }

    pub fn oracle_ttl(&self) -> Duration {
        Duration::from_secs(self.oracle_ttl_secs)
    }
}
