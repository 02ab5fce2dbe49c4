//! sled-backed `KvStore`, for a durable single-node deployment shared across
//! worker processes on the same machine. A single `kv` tree covers every
//! value the gateway stores, since each is already namespaced by its own
//! key prefix (`<net>:channel:...`, etc.) rather than needing separate
//! trees per entity kind.
//!
//! sled has no native per-key TTL, so expiry is modeled as a timestamp
//! stored alongside the value; a key is treated as absent once read past
//! expiry (lazily reclaimed on next write to that key). sled operations
//! are blocking; every call here runs inside `tokio::task::spawn_blocking`
//! so it never stalls the async runtime.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use gateway_core::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::KvStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredValue {
    value: Value,
    /// Epoch milliseconds after which this value is considered absent.
    /// `None` means no expiry.
    expires_at: Option<u64>,
}

impl StoredValue {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => now_ms() >= exp,
            None => false,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn kv_err(e: impl std::fmt::Display) -> GatewayError {
    GatewayError::kv(e.to_string())
}

pub struct SledKvStore {
    tree: sled::Tree,
}

impl SledKvStore {
    pub fn open<P: AsRef<Path>>(path: P) -> GatewayResult<Self> {
        let db = sled::open(path).map_err(kv_err)?;
        let tree = db.open_tree("kv").map_err(kv_err)?;
        Ok(Self { tree })
    }

    fn decode(bytes: &[u8]) -> Option<StoredValue> {
        serde_json::from_slice(bytes).ok()
    }
}

#[async_trait]
impl KvStore for SledKvStore {
    async fn get(&self, key: &str) -> GatewayResult<Option<Value>> {
        let tree = self.tree.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let raw = tree.get(key.as_bytes()).map_err(kv_err)?;
            Ok(match raw.and_then(|b| Self::decode(&b)) {
                Some(sv) if !sv.is_expired() => Some(sv.value),
                _ => None,
            })
        })
        .await
        .map_err(kv_err)?
    }

    async fn set(&self, key: &str, value: Value, ttl_sec: Option<u64>) -> GatewayResult<()> {
        let tree = self.tree.clone();
        let key = key.to_string();
        let sv = StoredValue {
            value,
            expires_at: ttl_sec.map(|s| now_ms() + s * 1000),
        };
        tokio::task::spawn_blocking(move || {
            let bytes = serde_json::to_vec(&sv).map_err(kv_err)?;
            tree.insert(key.as_bytes(), bytes).map_err(kv_err)?;
            Ok(())
        })
        .await
        .map_err(kv_err)?
    }

    async fn del(&self, key: &str) -> GatewayResult<()> {
        let tree = self.tree.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            tree.remove(key.as_bytes()).map_err(kv_err)?;
            Ok(())
        })
        .await
        .map_err(kv_err)?
    }

    async fn exists(&self, key: &str) -> GatewayResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn list_keys(&self, prefix: &str) -> GatewayResult<Vec<String>> {
        let tree = self.tree.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || {
            let mut keys = Vec::new();
            for item in tree.scan_prefix(prefix.as_bytes()) {
                let (k, v) = item.map_err(kv_err)?;
                let Some(sv) = Self::decode(&v) else { continue };
                if sv.is_expired() {
                    continue;
                }
                if let Ok(s) = std::str::from_utf8(&k) {
                    keys.push(s.to_string());
                }
            }
            Ok(keys)
        })
        .await
        .map_err(kv_err)?
    }

    async fn try_acquire_lock(&self, key: &str, token: &str, ttl_sec: u64) -> GatewayResult<bool> {
        let tree = self.tree.clone();
        let key = key.to_string();
        let new_sv = StoredValue {
            value: serde_json::json!({ "token": token }),
            expires_at: Some(now_ms() + ttl_sec * 1000),
        };
        tokio::task::spawn_blocking(move || {
            let new_bytes = serde_json::to_vec(&new_sv).map_err(kv_err)?;
            loop {
                let current = tree.get(key.as_bytes()).map_err(kv_err)?;
                let free = match current.as_ref().and_then(|b| Self::decode(b)) {
                    Some(sv) => sv.is_expired(),
                    None => true,
                };
                if !free {
                    return Ok(false);
                }
                match tree.compare_and_swap(key.as_bytes(), current.clone(), Some(new_bytes.clone()))
                {
                    Ok(Ok(())) => return Ok(true),
                    Ok(Err(_)) => continue, // lost the race, state changed; re-check
                    Err(e) => return Err(kv_err(e)),
                }
            }
        })
        .await
        .map_err(kv_err)?
    }

    async fn release_lock(&self, key: &str, token: &str) -> GatewayResult<()> {
        let tree = self.tree.clone();
        let key = key.to_string();
        let token = token.to_string();
        tokio::task::spawn_blocking(move || {
            if let Some(bytes) = tree.get(key.as_bytes()).map_err(kv_err)? {
                if let Some(sv) = Self::decode(&bytes) {
                    if sv.value.get("token").and_then(Value::as_str) == Some(token.as_str()) {
                        let _ = tree.compare_and_swap(key.as_bytes(), Some(bytes), None::<Vec<u8>>);
                    }
                }
            }
            Ok(())
        })
        .await
        .map_err(kv_err)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (SledKvStore, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("gateway_kv_sled_test_{}", now_ms()));
        let _ = std::fs::remove_dir_all(&dir);
        (SledKvStore::open(&dir).unwrap(), dir)
    }

    #[tokio::test]
    async fn set_get_roundtrip() {
        let (kv, dir) = temp_store();
        kv.set("a", serde_json::json!({"x": 1}), None).await.unwrap();
        assert_eq!(kv.get("a").await.unwrap(), Some(serde_json::json!({"x": 1})));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_released() {
        let (kv, dir) = temp_store();
        assert!(kv.try_acquire_lock("lock", "t1", 30).await.unwrap());
        assert!(!kv.try_acquire_lock("lock", "t2", 30).await.unwrap());
        kv.release_lock("lock", "t1").await.unwrap();
        assert!(kv.try_acquire_lock("lock", "t2", 30).await.unwrap());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn expired_lock_can_be_reclaimed() {
        let (kv, dir) = temp_store();
        assert!(kv.try_acquire_lock("lock", "t1", 0).await.unwrap());
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(kv.try_acquire_lock("lock", "t2", 30).await.unwrap());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
