use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Cache configuration for different data types
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::wallet_data()
    }
}

impl CacheConfig {
    /// Wallet, multi-wallet and breakdown results
    pub fn wallet_data() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_entries: 100,
        }
    }

    /// Price maps at the orchestration layer
    pub fn price_data() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 100,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    inserted_at: Instant,
}

#[derive(Debug)]
struct CacheState<T> {
    entries: HashMap<String, CacheEntry<T>>,
    /// Keys in first-insertion order; the front is evicted first.
    order: VecDeque<String>,
}

/// Bounded in-memory store with a fixed TTL.
///
/// When full, inserting a new key evicts the key that was inserted first, regardless
/// of how recently it was read. Expired entries are ignored by `get` but keep their
/// slot until evicted or overwritten.
#[derive(Debug)]
pub struct TtlCache<T> {
    name: &'static str,
    config: CacheConfig,
    state: Mutex<CacheState<T>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(name: &'static str, config: CacheConfig) -> Self {
        let config = CacheConfig {
            max_entries: config.max_entries.max(1),
            ..config
        };
        Self {
            name,
            config,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Value for `key` if present and younger than the TTL.
    pub fn get(&self, key: &str) -> Option<T> {
        let state = self.lock();
        match state.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.config.ttl => {
                debug!(cache = self.name, key, "Cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!(cache = self.name, key, "Cache entry expired");
                None
            }
            None => {
                debug!(cache = self.name, key, "Cache miss");
                None
            }
        }
    }

    pub fn is_valid(&self, key: &str) -> bool {
        self.lock()
            .entries
            .get(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() < self.config.ttl)
    }

    /// Store `value` under `key`, restarting its TTL. Overwriting keeps the key's
    /// original position in the eviction order.
    pub fn set(&self, key: impl Into<String>, value: T) {
        let key = key.into();
        let mut state = self.lock();
        let now = Instant::now();

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.value = value;
            entry.inserted_at = now;
            return;
        }

        while state.entries.len() >= self.config.max_entries {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
            debug!(cache = self.name, key = %oldest, "Evicted oldest cache entry");
        }

        state.order.push_back(key.clone());
        state.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }

    pub fn remove(&self, key: &str) -> Option<T> {
        let mut state = self.lock();
        let removed = state.entries.remove(key)?;
        state.order.retain(|k| k != key);
        Some(removed.value)
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }

    /// Resident entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

/// Entry counts across the tracker's caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub data_entries: usize,
    pub price_entries: usize,
}

/// `subject-d1-d2-...` with discriminators sorted so argument order never changes the key.
pub fn cache_key<S: AsRef<str>>(subject: &str, discriminators: &[S]) -> String {
    let mut parts: Vec<&str> = discriminators.iter().map(|d| d.as_ref()).collect();
    parts.sort_unstable();
    let mut key = String::from(subject);
    for part in parts {
        key.push('-');
        key.push_str(part);
    }
    key
}
