//! Per-API-key fee budget tracker, per spec §4.8: optimistic periodic
//! reset, custom-per-key limits, concurrent-safe increments under a
//! scoped KV lock — a small struct layered directly over the KV store,
//! with each read-modify-write guarded by its own lock.

use std::sync::Arc;

use gateway_core::constants::{
    FEE_USAGE_LOCK_BACKOFF_MAX_MS, FEE_USAGE_LOCK_BACKOFF_MIN_MS, FEE_USAGE_LOCK_MAX_RETRIES,
    FEE_USAGE_LOCK_TTL_SECONDS,
};
use gateway_core::error::{GatewayError, GatewayResult};
use gateway_core::types::{ApiKey, Network};
use gateway_kv::{with_lock, KvStore, OnBusy};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// `<net>:api-key-fees:<key>` value shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UsageDoc {
    #[serde(default)]
    consumed: u64,
    #[serde(rename = "periodStart", default, skip_serializing_if = "Option::is_none")]
    period_start: Option<u64>,
}

/// `<net>:api-key-limit:<key>` value shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LimitDoc {
    limit: u64,
}

/// Public view of `getUsageInfo` (spec §4.8 period-expiry law): zeroed and
/// timestamp-less when the period has expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageInfo {
    pub consumed: u64,
    pub period_start: Option<u64>,
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn usage_key(network: Network, api_key: &str) -> String {
    format!("{network}:api-key-fees:{api_key}")
}

fn limit_key(network: Network, api_key: &str) -> String {
    format!("{network}:api-key-limit:{api_key}")
}

/// Apply period expiry in place: if `reset_period_ms` is configured and
/// `now - period_start >= reset_period_ms`, the doc is treated as freshly
/// zeroed with no period start (spec §4.8 "Period expiry").
fn apply_period_expiry(doc: &UsageDoc, reset_period_ms: Option<u64>, now: u64) -> UsageDoc {
    let Some(reset_period_ms) = reset_period_ms else {
        return doc.clone();
    };
    match doc.period_start {
        Some(start) if now.saturating_sub(start) >= reset_period_ms => UsageDoc::default(),
        _ => doc.clone(),
    }
}

pub struct FeeTracker {
    kv: Arc<dyn KvStore>,
    network: Network,
    api_key: ApiKey,
    default_limit: Option<u64>,
    reset_period_ms: Option<u64>,
}

impl FeeTracker {
    pub fn new(
        kv: Arc<dyn KvStore>,
        network: Network,
        api_key: ApiKey,
        default_limit: Option<u64>,
        reset_period_ms: Option<u64>,
    ) -> Self {
        Self {
            kv,
            network,
            api_key,
            default_limit,
            reset_period_ms,
        }
    }

    async fn read_usage(&self) -> GatewayResult<UsageDoc> {
        let key = usage_key(self.network, self.api_key.as_str());
        let doc = gateway_kv::get_typed::<UsageDoc>(self.kv.as_ref(), &key)
            .await?
            .unwrap_or_default();
        Ok(apply_period_expiry(&doc, self.reset_period_ms, now_ms()))
    }

    async fn effective_limit(&self) -> GatewayResult<Option<u64>> {
        let key = limit_key(self.network, self.api_key.as_str());
        let custom = gateway_kv::get_typed::<LimitDoc>(self.kv.as_ref(), &key)
            .await?
            .map(|d| d.limit);
        Ok(custom.or(self.default_limit))
    }

    /// `checkBudget(fee)` per spec §4.8: no-op when there is no effective
    /// limit; else fails `FEE_LIMIT_EXCEEDED` when `consumed + fee > limit`.
    pub async fn check_budget(&self, fee: u64) -> GatewayResult<()> {
        let Some(limit) = self.effective_limit().await? else {
            return Ok(());
        };
        let usage = self.read_usage().await?;
        if usage.consumed + fee > limit {
            return Err(GatewayError::FeeLimitExceeded {
                consumed: usage.consumed,
                fee,
                remaining: limit.saturating_sub(usage.consumed),
                limit,
            });
        }
        Ok(())
    }

    /// `recordUsage(fee)` per spec §4.8: read-modify-write under a scoped
    /// lock on the usage key, retried up to `FEE_USAGE_LOCK_MAX_RETRIES`
    /// times on contention; persistent contention logs a warning and
    /// returns without error (non-blocking). All KV errors are logged and
    /// swallowed — usage recording must never break submission.
    pub async fn record_usage(&self, fee: u64) {
        let key = usage_key(self.network, self.api_key.as_str());
        let mut rng = rand::thread_rng();

        for attempt in 0..=FEE_USAGE_LOCK_MAX_RETRIES {
            let result = with_lock(
                self.kv.as_ref(),
                &format!("{key}:lock"),
                FEE_USAGE_LOCK_TTL_SECONDS,
                OnBusy::Skip,
                || self.do_record(fee),
            )
            .await;

            match result {
                Ok(Some(())) => return,
                Ok(None) => {
                    if attempt == FEE_USAGE_LOCK_MAX_RETRIES {
                        warn!(
                            api_key = self.api_key.as_str(),
                            "record_usage: lock contended after max retries, skipping"
                        );
                        return;
                    }
                    let backoff = rng
                        .gen_range(FEE_USAGE_LOCK_BACKOFF_MIN_MS..=FEE_USAGE_LOCK_BACKOFF_MAX_MS);
                    tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    warn!(error = %e, api_key = self.api_key.as_str(), "record_usage: KV error, swallowed");
                    return;
                }
            }
        }
    }

    async fn do_record(&self, fee: u64) -> GatewayResult<()> {
        let usage = self.read_usage().await?;
        let period_start = usage.period_start.unwrap_or_else(now_ms);
        let updated = UsageDoc {
            consumed: usage.consumed + fee,
            period_start: Some(period_start),
        };
        let key = usage_key(self.network, self.api_key.as_str());
        gateway_kv::set_typed(self.kv.as_ref(), &key, &updated, None).await
    }

    /// `getUsageInfo` per spec §4.8: zeroed consumed and `None` period
    /// timestamps when the period has expired.
    pub async fn get_usage_info(&self) -> GatewayResult<UsageInfo> {
        let usage = self.read_usage().await?;
        Ok(UsageInfo {
            consumed: usage.consumed,
            period_start: usage.period_start,
        })
    }

    pub async fn get_custom_limit(&self) -> GatewayResult<Option<u64>> {
        let key = limit_key(self.network, self.api_key.as_str());
        Ok(gateway_kv::get_typed::<LimitDoc>(self.kv.as_ref(), &key)
            .await?
            .map(|d| d.limit))
    }

    pub async fn set_custom_limit(&self, limit: u64) -> GatewayResult<()> {
        let key = limit_key(self.network, self.api_key.as_str());
        gateway_kv::set_typed(self.kv.as_ref(), &key, &LimitDoc { limit }, None).await
    }

    pub async fn delete_custom_limit(&self) -> GatewayResult<()> {
        let key = limit_key(self.network, self.api_key.as_str());
        self.kv.del(&key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_kv::InMemoryKvStore;

    fn tracker(
        kv: Arc<dyn KvStore>,
        default_limit: Option<u64>,
        reset_period_ms: Option<u64>,
    ) -> FeeTracker {
        FeeTracker::new(
            kv,
            Network::Testnet,
            ApiKey("key-1".to_string()),
            default_limit,
            reset_period_ms,
        )
    }

    #[tokio::test]
    async fn no_limit_configured_never_blocks() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let t = tracker(kv, None, None);
        t.check_budget(1_000_000).await.unwrap();
    }

    #[tokio::test]
    async fn exceeding_limit_fails_with_details() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let t = tracker(Arc::clone(&kv), Some(10_000), None);
        t.record_usage(9_000).await;

        let err = t.check_budget(2_000).await.unwrap_err();
        match err {
            GatewayError::FeeLimitExceeded {
                consumed,
                fee,
                remaining,
                limit,
            } => {
                assert_eq!(consumed, 9_000);
                assert_eq!(fee, 2_000);
                assert_eq!(remaining, 1_000);
                assert_eq!(limit, 10_000);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn within_limit_passes() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let t = tracker(Arc::clone(&kv), Some(10_000), None);
        t.record_usage(5_000).await;
        t.check_budget(4_000).await.unwrap();
    }

    #[tokio::test]
    async fn period_reset_zeroes_usage() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let key = usage_key(Network::Testnet, "key-1");
        let stale = UsageDoc {
            consumed: 5_000,
            period_start: Some(now_ms().saturating_sub(120_000)),
        };
        gateway_kv::set_typed(kv.as_ref(), &key, &stale, None)
            .await
            .unwrap();

        let t = tracker(Arc::clone(&kv), Some(10_000), Some(60_000));
        let info = t.get_usage_info().await.unwrap();
        assert_eq!(info.consumed, 0);
        assert_eq!(info.period_start, None);
    }

    #[tokio::test]
    async fn custom_limit_overrides_default() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let t = tracker(Arc::clone(&kv), Some(10_000), None);
        t.set_custom_limit(500).await.unwrap();
        t.record_usage(400).await;

        let err = t.check_budget(200).await.unwrap_err();
        assert_eq!(err.code(), "FEE_LIMIT_EXCEEDED");

        t.delete_custom_limit().await.unwrap();
        t.check_budget(200).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_record_usage_is_linearizable() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let t = Arc::new(tracker(Arc::clone(&kv), Some(1_000_000), None));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let t = Arc::clone(&t);
            handles.push(tokio::spawn(async move {
                t.record_usage(100).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let info = t.get_usage_info().await.unwrap();
        assert_eq!(info.consumed, 1_000);
    }
}
