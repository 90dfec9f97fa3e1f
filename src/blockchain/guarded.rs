use super::{LedgerClient, LedgerError};
use crate::config::RpcSettings;
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

/// Deadline and retry budget applied to every remote read.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub timeout: Duration,
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::from(&RpcSettings::default())
    }
}

impl From<&RpcSettings> for CallPolicy {
    fn from(settings: &RpcSettings) -> Self {
        Self {
            timeout: Duration::from_millis(settings.timeout_ms),
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }
}

impl CallPolicy {
    /// Delays between attempts: base, 2×base, 4×base ... capped at `max_delay`, jittered.
    fn backoff(&self) -> impl Iterator<Item = Duration> {
        let factor = (self.base_delay.as_millis() as u64 / 2).max(1);
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.max_delay)
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// Wraps another `LedgerClient` with a per-call deadline and retry with backoff
/// for transient failures. Reverts and decode errors are returned immediately.
pub struct GuardedLedger {
    inner: Arc<dyn LedgerClient>,
    policy: CallPolicy,
}

impl GuardedLedger {
    pub fn new(inner: Arc<dyn LedgerClient>, policy: CallPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    async fn guarded<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let deadline = self.policy.timeout;
        let mut attempt = 0u32;

        let action = || {
            attempt += 1;
            let current = attempt;
            let fut = op();
            async move {
                match timeout(deadline, fut).await {
                    Ok(result) => result,
                    Err(_) => {
                        debug!(operation, attempt = current, "RPC call hit its deadline");
                        Err(LedgerError::Timeout(deadline.as_millis() as u64))
                    }
                }
            }
        };

        let should_retry = |err: &LedgerError| {
            let transient = err.is_transient();
            if transient {
                warn!(operation, error = %err, "Transient RPC failure, retrying");
            }
            transient
        };

        RetryIf::spawn(self.policy.backoff(), action, should_retry).await
    }
}

#[async_trait]
impl LedgerClient for GuardedLedger {
    async fn get_code(&self, address: Address) -> Result<Bytes, LedgerError> {
        self.guarded("eth_getCode", || self.inner.get_code(address)).await
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, LedgerError> {
        self.guarded("eth_call", || self.inner.call(to, data.clone())).await
    }

    async fn chain_id(&self) -> Result<u64, LedgerError> {
        self.guarded("eth_chainId", || self.inner.chain_id()).await
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        self.guarded("eth_blockNumber", || self.inner.block_number()).await
    }

    async fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        self.guarded("eth_getBalance", || self.inner.balance(address)).await
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError> {
        self.guarded("eth_getTransactionCount", || self.inner.transaction_count(address))
            .await
    }
}
