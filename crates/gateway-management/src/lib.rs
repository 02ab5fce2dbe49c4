//! gateway-management
//!
//! The management plane (spec §4.10): admin-secret-gated membership and
//! per-API-key budget administration. Dispatch is a flat
//! `match action.as_str() { ... }` over a flat enum of payload shapes
//! rather than a trait, since there is exactly one caller (the handler
//! orchestrator) and no need for dynamic dispatch.

use std::collections::HashSet;
use std::sync::Arc;

use gateway_core::error::{GatewayError, GatewayResult};
use gateway_core::types::{ApiKey, Network, RelayerId};
use gateway_fees::FeeTracker;
use gateway_kv::KvStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// `params.management` payload, pre-dispatch. `action`-specific fields are
/// left as raw `Value`s and pulled out per action — a loosely typed params
/// shape validated by hand after dispatch rather than a typed enum up front.
#[derive(Debug, Clone, Deserialize)]
pub struct ManagementRequest {
    #[serde(rename = "adminSecret", default)]
    pub admin_secret: String,
    pub action: String,
    #[serde(flatten)]
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged, rename_all = "camelCase")]
pub enum ManagementResponse {
    ChannelAccounts {
        #[serde(rename = "relayerIds")]
        relayer_ids: Vec<String>,
    },
    FeeUsage {
        consumed: u64,
        #[serde(rename = "periodStart")]
        period_start: Option<u64>,
    },
    FeeLimit { limit: Option<u64> },
    Ack,
    Stats(StatsResponse),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub pool_size: usize,
    pub locked_count: Option<usize>,
    pub available_count: Option<usize>,
    pub inclusion_fee_default: u64,
    pub inclusion_fee_limited: u64,
    pub contract_capacity_ratio: f64,
}

/// Config fields the management plane needs to echo/operate against; kept
/// as a narrow struct rather than depending on the whole `gateway-core`
/// `Config` so this crate's surface stays focused on what it actually uses.
#[derive(Debug, Clone)]
pub struct ManagementConfig {
    pub admin_secret: Option<String>,
    pub fee_limit_default: Option<u64>,
    pub fee_reset_period_ms: Option<u64>,
    pub inclusion_fee_default: u64,
    pub inclusion_fee_limited: u64,
    pub contract_capacity_ratio: f64,
}

/// Verifies `adminSecret` per spec §4.10: both configured and supplied
/// values trimmed; empty configured secret ⇒ management disabled.
fn check_admin(config: &ManagementConfig, supplied: &str) -> GatewayResult<()> {
    let configured = config
        .admin_secret
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let Some(configured) = configured else {
        return Err(GatewayError::ManagementDisabled);
    };
    if supplied.trim() != configured {
        return Err(GatewayError::Unauthorized);
    }
    Ok(())
}

fn parse_relayer_ids(raw: &Value) -> GatewayResult<Vec<RelayerId>> {
    let arr = raw
        .get("relayerIds")
        .and_then(Value::as_array)
        .ok_or_else(|| GatewayError::InvalidPayload("relayerIds must be an array".to_string()))?;

    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(arr.len());
    for entry in arr {
        let raw_id = entry
            .as_str()
            .ok_or_else(|| GatewayError::InvalidPayload("relayerIds entries must be strings".to_string()))?;
        let id = RelayerId::normalize(raw_id)
            .ok_or_else(|| GatewayError::InvalidPayload(format!("invalid relayer id: {raw_id}")))?;
        if seen.insert(id.clone()) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn parse_api_key(raw: &Value) -> GatewayResult<ApiKey> {
    raw.get("apiKey")
        .and_then(Value::as_str)
        .map(|s| ApiKey(s.trim().to_string()))
        .filter(|k| !k.0.is_empty())
        .ok_or_else(|| GatewayError::InvalidPayload("apiKey is required".to_string()))
}

fn parse_limit(raw: &Value) -> GatewayResult<u64> {
    raw.get("limit")
        .and_then(Value::as_u64)
        .ok_or_else(|| GatewayError::InvalidPayload("limit must be a non-negative integer".to_string()))
}

pub struct ManagementPlane {
    kv: Arc<dyn KvStore>,
    network: Network,
    config: ManagementConfig,
}

impl ManagementPlane {
    pub fn new(kv: Arc<dyn KvStore>, network: Network, config: ManagementConfig) -> Self {
        Self { kv, network, config }
    }

    fn fee_tracker(&self, api_key: ApiKey) -> FeeTracker {
        FeeTracker::new(
            Arc::clone(&self.kv),
            self.network,
            api_key,
            self.config.fee_limit_default,
            self.config.fee_reset_period_ms,
        )
    }

    /// Dispatches `params.management.action` per spec §4.10. The admin
    /// check runs before every action, including read-only ones — the
    /// spec draws no distinction between read and write actions here.
    pub async fn handle(&self, req: ManagementRequest) -> GatewayResult<ManagementResponse> {
        check_admin(&self.config, &req.admin_secret)?;

        match req.action.as_str() {
            "listChannelAccounts" => self.list_channel_accounts().await,
            "setChannelAccounts" => self.set_channel_accounts(&req.payload).await,
            "getFeeUsage" => self.get_fee_usage(&req.payload).await,
            "getFeeLimit" => self.get_fee_limit(&req.payload).await,
            "setFeeLimit" => self.set_fee_limit(&req.payload).await,
            "deleteFeeLimit" => self.delete_fee_limit(&req.payload).await,
            "stats" => self.stats().await,
            other => Err(GatewayError::InvalidAction(other.to_string())),
        }
    }

    async fn list_channel_accounts(&self) -> GatewayResult<ManagementResponse> {
        let members = gateway_pool::list_members(self.kv.as_ref(), self.network).await?;
        Ok(ManagementResponse::ChannelAccounts {
            relayer_ids: members.into_iter().map(|r| r.0).collect(),
        })
    }

    /// `setChannelAccounts` per spec §4.10: for every id being removed
    /// (present in the stored list, absent from the new one), fail
    /// `LOCKED_CONFLICT` if it is currently locked. Otherwise write the new
    /// list wholesale.
    async fn set_channel_accounts(&self, payload: &Value) -> GatewayResult<ManagementResponse> {
        let new_ids = parse_relayer_ids(payload)?;
        let new_set: HashSet<&RelayerId> = new_ids.iter().collect();

        let existing = gateway_pool::list_members(self.kv.as_ref(), self.network).await?;
        let removed: Vec<&RelayerId> = existing.iter().filter(|id| !new_set.contains(id)).collect();

        let mut locked = Vec::new();
        for id in removed {
            if gateway_pool::is_locked(self.kv.as_ref(), self.network, id).await? {
                locked.push(id.0.clone());
            }
        }
        if !locked.is_empty() {
            return Err(GatewayError::LockedConflict(locked));
        }

        gateway_pool::set_members(self.kv.as_ref(), self.network, &new_ids).await?;
        debug!(count = new_ids.len(), "channel accounts updated");
        Ok(ManagementResponse::Ack)
    }

    async fn get_fee_usage(&self, payload: &Value) -> GatewayResult<ManagementResponse> {
        let api_key = parse_api_key(payload)?;
        let usage = self.fee_tracker(api_key).get_usage_info().await?;
        Ok(ManagementResponse::FeeUsage {
            consumed: usage.consumed,
            period_start: usage.period_start,
        })
    }

    async fn get_fee_limit(&self, payload: &Value) -> GatewayResult<ManagementResponse> {
        let api_key = parse_api_key(payload)?;
        let limit = self.fee_tracker(api_key).get_custom_limit().await?;
        Ok(ManagementResponse::FeeLimit { limit })
    }

    async fn set_fee_limit(&self, payload: &Value) -> GatewayResult<ManagementResponse> {
        let api_key = parse_api_key(payload)?;
        let limit = parse_limit(payload)?;
        self.fee_tracker(api_key).set_custom_limit(limit).await?;
        Ok(ManagementResponse::Ack)
    }

    async fn delete_fee_limit(&self, payload: &Value) -> GatewayResult<ManagementResponse> {
        let api_key = parse_api_key(payload)?;
        self.fee_tracker(api_key).delete_custom_limit().await?;
        Ok(ManagementResponse::Ack)
    }

    /// `stats` per spec §4.10: best-effort — a probe failure leaves
    /// `locked_count`/`available_count` as `None` rather than failing the
    /// whole action.
    async fn stats(&self) -> GatewayResult<ManagementResponse> {
        let members = gateway_pool::list_members(self.kv.as_ref(), self.network).await?;
        let pool_size = members.len();

        let mut locked_count = Some(0usize);
        for id in &members {
            match gateway_pool::is_locked(self.kv.as_ref(), self.network, id).await {
                Ok(true) => locked_count = locked_count.map(|c| c + 1),
                Ok(false) => {}
                Err(e) => {
                    debug!(error = %e, "stats: lock probe failed, leaving counts undefined");
                    locked_count = None;
                    break;
                }
            }
        }
        let available_count = locked_count.map(|locked| pool_size.saturating_sub(locked));

        Ok(ManagementResponse::Stats(StatsResponse {
            pool_size,
            locked_count,
            available_count,
            inclusion_fee_default: self.config.inclusion_fee_default,
            inclusion_fee_limited: self.config.inclusion_fee_limited,
            contract_capacity_ratio: self.config.contract_capacity_ratio,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_kv::InMemoryKvStore;
    use serde_json::json;

    fn config(admin_secret: Option<&str>) -> ManagementConfig {
        ManagementConfig {
            admin_secret: admin_secret.map(str::to_string),
            fee_limit_default: None,
            fee_reset_period_ms: None,
            inclusion_fee_default: 203,
            inclusion_fee_limited: 201,
            contract_capacity_ratio: 0.8,
        }
    }

    fn plane(kv: Arc<dyn KvStore>, admin_secret: Option<&str>) -> ManagementPlane {
        ManagementPlane::new(kv, Network::Testnet, config(admin_secret))
    }

    fn req(admin_secret: &str, action: &str, payload: Value) -> ManagementRequest {
        ManagementRequest {
            admin_secret: admin_secret.to_string(),
            action: action.to_string(),
            payload,
        }
    }

    #[tokio::test]
    async fn management_disabled_when_no_admin_secret_configured() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let plane = plane(Arc::clone(&kv), None);
        let err = plane
            .handle(req("whatever", "listChannelAccounts", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MANAGEMENT_DISABLED");
    }

    #[tokio::test]
    async fn wrong_secret_is_unauthorized() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let plane = plane(Arc::clone(&kv), Some("s3cret"));
        let err = plane
            .handle(req("nope", "listChannelAccounts", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn set_then_list_channel_accounts_round_trips() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let plane = plane(Arc::clone(&kv), Some("s3cret"));

        plane
            .handle(req(
                "s3cret",
                "setChannelAccounts",
                json!({ "relayerIds": ["P1", "p2", "p1"] }),
            ))
            .await
            .unwrap();

        match plane
            .handle(req("s3cret", "listChannelAccounts", json!({})))
            .await
            .unwrap()
        {
            ManagementResponse::ChannelAccounts { relayer_ids } => {
                assert_eq!(relayer_ids, vec!["p1".to_string(), "p2".to_string()]);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn removing_a_locked_channel_is_a_conflict() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let plane = plane(Arc::clone(&kv), Some("s3cret"));

        plane
            .handle(req(
                "s3cret",
                "setChannelAccounts",
                json!({ "relayerIds": ["p1", "p2"] }),
            ))
            .await
            .unwrap();

        let pool = gateway_pool::ChannelPool::new(Arc::clone(&kv), Network::Testnet);
        let opts = gateway_pool::AcquireOptions {
            contract_id: None,
            limited_contracts: HashSet::new(),
            capacity_ratio: 0.8,
            lock_ttl_sec: 30,
        };
        let lease = pool.acquire(&opts).await.unwrap();

        let remaining = if lease.relayer_id.as_str() == "p1" { "p2" } else { "p1" };
        let err = plane
            .handle(req(
                "s3cret",
                "setChannelAccounts",
                json!({ "relayerIds": [remaining] }),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "LOCKED_CONFLICT");
    }

    #[tokio::test]
    async fn fee_limit_lifecycle() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let plane = plane(Arc::clone(&kv), Some("s3cret"));

        plane
            .handle(req(
                "s3cret",
                "setFeeLimit",
                json!({ "apiKey": "key-1", "limit": 500 }),
            ))
            .await
            .unwrap();

        match plane
            .handle(req("s3cret", "getFeeLimit", json!({ "apiKey": "key-1" })))
            .await
            .unwrap()
        {
            ManagementResponse::FeeLimit { limit } => assert_eq!(limit, Some(500)),
            other => panic!("unexpected response: {other:?}"),
        }

        plane
            .handle(req("s3cret", "deleteFeeLimit", json!({ "apiKey": "key-1" })))
            .await
            .unwrap();

        match plane
            .handle(req("s3cret", "getFeeLimit", json!({ "apiKey": "key-1" })))
            .await
            .unwrap()
        {
            ManagementResponse::FeeLimit { limit } => assert_eq!(limit, None),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stats_reports_pool_size_and_locked_count() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let plane = plane(Arc::clone(&kv), Some("s3cret"));
        plane
            .handle(req(
                "s3cret",
                "setChannelAccounts",
                json!({ "relayerIds": ["p1", "p2"] }),
            ))
            .await
            .unwrap();

        let pool = gateway_pool::ChannelPool::new(Arc::clone(&kv), Network::Testnet);
        let opts = gateway_pool::AcquireOptions {
            contract_id: None,
            limited_contracts: HashSet::new(),
            capacity_ratio: 0.8,
            lock_ttl_sec: 30,
        };
        pool.acquire(&opts).await.unwrap();

        match plane.handle(req("s3cret", "stats", json!({}))).await.unwrap() {
            ManagementResponse::Stats(stats) => {
                assert_eq!(stats.pool_size, 2);
                assert_eq!(stats.locked_count, Some(1));
                assert_eq!(stats.available_count, Some(1));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
