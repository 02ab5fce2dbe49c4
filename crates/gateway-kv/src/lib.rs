//! gateway-kv
//!
//! The typed key/value abstraction spec §4.1 builds the rest of the gateway
//! on top of: `get`/`set`/`del`/`exists`/`listKeys` plus a scoped lock
//! primitive. `KvStore` stays object-safe (no generic trait methods) so it
//! can be shared as `Arc<dyn KvStore>` across every crate; the spec's
//! generic `get<T>`/`withLock<T>` pseudocode is expressed instead as free
//! functions layered on top (`get_typed`, `set_typed`, `with_lock`).

pub mod memory;
pub mod sled_store;

pub use memory::InMemoryKvStore;
pub use sled_store::SledKvStore;

use std::future::Future;

use async_trait::async_trait;
use gateway_core::error::{GatewayError, GatewayResult};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Behavior of `with_lock` when the key is already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnBusy {
    Throw,
    Skip,
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> GatewayResult<Option<Value>>;
    async fn set(&self, key: &str, value: Value, ttl_sec: Option<u64>) -> GatewayResult<()>;
    async fn del(&self, key: &str) -> GatewayResult<()>;
    async fn exists(&self, key: &str) -> GatewayResult<bool>;
    async fn list_keys(&self, prefix: &str) -> GatewayResult<Vec<String>>;

    /// Atomically claim `key` for `token` iff it is absent or its prior
    /// lock has expired. Implementations must make this a single CAS-style
    /// operation — two concurrent callers must never both succeed.
    async fn try_acquire_lock(&self, key: &str, token: &str, ttl_sec: u64) -> GatewayResult<bool>;

    /// Best-effort, idempotent: delete `key` only if the stored token
    /// matches `token`. A mismatch (late release after TTL expiry and
    /// reacquisition by someone else) is a no-op, never an error.
    async fn release_lock(&self, key: &str, token: &str) -> GatewayResult<()>;
}

/// `get<T>` from spec §4.1, expressed as a free function over the
/// object-safe `get`.
pub async fn get_typed<T: DeserializeOwned>(
    kv: &dyn KvStore,
    key: &str,
) -> GatewayResult<Option<T>> {
    match kv.get(key).await? {
        Some(v) => serde_json::from_value(v)
            .map(Some)
            .map_err(|e| GatewayError::kv(format!("decoding {key}: {e}"))),
        None => Ok(None),
    }
}

/// `set(k, v, {ttlSec?})` from spec §4.1, expressed as a free function.
pub async fn set_typed<T: Serialize + Sync>(
    kv: &dyn KvStore,
    key: &str,
    value: &T,
    ttl_sec: Option<u64>,
) -> GatewayResult<()> {
    let v = serde_json::to_value(value)
        .map_err(|e| GatewayError::kv(format!("encoding {key}: {e}")))?;
    kv.set(key, v, ttl_sec).await
}

/// A cryptographically random 128-bit token, hex-encoded, matching the
/// Channel Lock's token shape in spec §3.
pub fn random_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// `withLock(k, fn, {ttlSec, onBusy})` from spec §4.1. Acquires a lock on
/// `key`, invokes `f` if acquired, releases on all exit paths (including
/// panics unwinding through `f`, since release happens after `f` returns
/// control — a panicking `f` leaves the lock for its TTL to reclaim, same
/// stance taken elsewhere: release/extend errors are swallowed, the TTL
/// will reclaim), and returns `Ok(None)` without invoking `f` when
/// `on_busy == Skip` and the key is held.
pub async fn with_lock<F, Fut, T>(
    kv: &dyn KvStore,
    key: &str,
    ttl_sec: u64,
    on_busy: OnBusy,
    f: F,
) -> GatewayResult<Option<T>>
where
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = GatewayResult<T>> + Send,
{
    let token = random_token();
    let acquired = kv.try_acquire_lock(key, &token, ttl_sec).await?;
    if !acquired {
        return match on_busy {
            OnBusy::Skip => Ok(None),
            OnBusy::Throw => Err(GatewayError::kv(format!("lock busy: {key}"))),
        };
    }

    let result = f().await;
    if let Err(e) = kv.release_lock(key, &token).await {
        warn!(%key, error = %e, "with_lock: release failed, TTL will reclaim");
    }
    result.map(Some)
}
