//! In-process `KvStore`. Backs unit/integration tests and single-replica
//! deployments; coordination is a plain `tokio::sync::Mutex` over one map,
//! which is sufficient because nothing outside this process ever observes
//! the map.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gateway_core::error::GatewayResult;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::KvStore;

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.map(|t| Instant::now() >= t).unwrap_or(false)
    }
}

#[derive(Default)]
pub struct InMemoryKvStore {
    data: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> GatewayResult<Option<Value>> {
        let mut data = self.data.lock().await;
        match data.get(key) {
            Some(e) if e.is_expired() => {
                data.remove(key);
                Ok(None)
            }
            Some(e) => Ok(Some(e.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl_sec: Option<u64>) -> GatewayResult<()> {
        let mut data = self.data.lock().await;
        let expires_at = ttl_sec.map(|s| Instant::now() + Duration::from_secs(s));
        data.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn del(&self, key: &str) -> GatewayResult<()> {
        self.data.lock().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> GatewayResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn list_keys(&self, prefix: &str) -> GatewayResult<Vec<String>> {
        let mut data = self.data.lock().await;
        let expired: Vec<String> = data
            .iter()
            .filter(|(_, e)| e.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        for k in expired {
            data.remove(&k);
        }
        Ok(data
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn try_acquire_lock(&self, key: &str, token: &str, ttl_sec: u64) -> GatewayResult<bool> {
        let mut data = self.data.lock().await;
        let free = match data.get(key) {
            Some(e) => e.is_expired(),
            None => true,
        };
        if !free {
            return Ok(false);
        }
        data.insert(
            key.to_string(),
            Entry {
                value: json!({ "token": token }),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_sec)),
            },
        );
        Ok(true)
    }

    async fn release_lock(&self, key: &str, token: &str) -> GatewayResult<()> {
        let mut data = self.data.lock().await;
        if let Some(e) = data.get(key) {
            if e.value.get("token").and_then(Value::as_str) == Some(token) {
                data.remove(key);
            }
        }
        Ok(())
    }
}
