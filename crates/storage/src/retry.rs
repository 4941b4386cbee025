//! Bounded exponential-backoff retry for object access.

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use catalog_common::CatalogResult;

use crate::gateway::{ObjectGateway, ObjectSummary};

/// Retry settings. The delay doubles after every failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first failure
    pub max_retries: u32,
    /// Initial retry delay in milliseconds
    pub initial_delay_ms: u64,
    /// Upper bound for the delay in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// policy's retries are exhausted.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> CatalogResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CatalogResult<T>>,
{
    let mut retry_count = 0;
    let mut delay = policy.initial_delay();

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                retry_count += 1;
                if retry_count > policy.max_retries {
                    return Err(e);
                }

                warn!(
                    target_key = %what,
                    error = %e,
                    retry = retry_count,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Object access failed, retrying"
                );

                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, policy.max_delay());
            }
        }
    }
}

/// Gateway decorator applying a [`RetryPolicy`] to every remote call.
pub struct RetryingGateway {
    inner: Arc<dyn ObjectGateway>,
    policy: RetryPolicy,
}

impl RetryingGateway {
    pub fn new(inner: Arc<dyn ObjectGateway>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl ObjectGateway for RetryingGateway {
    async fn list(&self, prefix: &str, pattern: Option<&Regex>) -> CatalogResult<Vec<ObjectSummary>> {
        with_retry(&self.policy, prefix, || self.inner.list(prefix, pattern)).await
    }

    async fn fetch(&self, key: &str) -> CatalogResult<Bytes> {
        with_retry(&self.policy, key, || self.inner.fetch(key)).await
    }

    async fn put(&self, key: &str, data: Bytes) -> CatalogResult<()> {
        with_retry(&self.policy, key, || self.inner.put(key, data.clone())).await
    }

    fn href(&self, key: &str) -> String {
        self.inner.href(key)
    }
}
