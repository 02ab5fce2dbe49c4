//! gateway-pool
//!
//! Distributed mutual exclusion over the shared KV store, with contract-class
//! capacity partitioning, per spec §4.4. `RelayerId`/`ContractId` (defined in
//! `gateway_core::types`) use the same newtype-with-validating-constructor
//! style as the rest of the workspace, and the pool mutex's acquire/retry
//! loop follows the same spin-and-backoff shape used elsewhere for transient
//! contention.

use std::collections::HashSet;
use std::sync::Arc;

use gateway_core::constants::{
    MAX_SPINS, POOL_MUTEX_TTL_SECONDS, SPIN_BACKOFF_MAX_MS, SPIN_BACKOFF_MIN_MS,
};
use gateway_core::error::{GatewayError, GatewayResult};
use gateway_core::types::{ContractId, Network, RelayerId};
use gateway_kv::{with_lock, KvStore, OnBusy};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// `<net>:channel:relayer-ids` value shape (spec §6 KV schema table).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MembershipDoc {
    #[serde(rename = "relayerIds")]
    relayer_ids: Vec<String>,
}

/// `<net>:channel:in-use:<id>` value shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockDoc {
    token: String,
    #[serde(rename = "lockedAt")]
    locked_at: u64,
}

fn membership_key(network: Network) -> String {
    format!("{network}:channel:relayer-ids")
}

fn lock_key(network: Network, id: &RelayerId) -> String {
    format!("{network}:channel:in-use:{}", id.as_str())
}

fn pool_mutex_key(network: Network) -> String {
    format!("{network}:channel-pool-lock")
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A weak, deliberately non-cryptographic string hash: sum of byte values,
/// shifted. Spec §9 Design Notes names this exact construction ("sum-of-
/// char-code shifted") and explicitly allows any stable deterministic hash —
/// distribution quality, not adversarial robustness, is the requirement.
pub fn simple_hash(id: &str) -> u32 {
    let mut h: u32 = 0;
    for b in id.bytes() {
        h = h.wrapping_shl(1).wrapping_add(b as u32);
    }
    h
}

/// Read the normalized membership list for `network`.
pub async fn list_members(
    kv: &dyn KvStore,
    network: Network,
) -> GatewayResult<Vec<RelayerId>> {
    let doc: MembershipDoc = gateway_kv::get_typed(kv, &membership_key(network))
        .await?
        .unwrap_or_default();
    Ok(doc.relayer_ids.into_iter().map(RelayerId).collect())
}

/// Overwrite the membership list for `network`. Callers (the management
/// plane) are responsible for normalizing/deduping and for the
/// lock-conflict check on removed ids; this function performs the write
/// only.
pub async fn set_members(
    kv: &dyn KvStore,
    network: Network,
    ids: &[RelayerId],
) -> GatewayResult<()> {
    let doc = MembershipDoc {
        relayer_ids: ids.iter().map(|i| i.as_str().to_string()).collect(),
    };
    gateway_kv::set_typed(kv, &membership_key(network), &doc, None).await
}

/// True iff `id`'s lock key is currently held.
pub async fn is_locked(kv: &dyn KvStore, network: Network, id: &RelayerId) -> GatewayResult<bool> {
    kv.exists(&lock_key(network, id)).await
}

/// Deterministically partition `members` down to the candidate set a
/// limited contract may use: sort by `simple_hash(id)` ascending (stable
/// tie-break on id), keep the first `max(1, floor(ratio * N))` (spec §4.4
/// step 2).
pub fn partition_for_limited_contract(members: &[RelayerId], ratio: f64) -> Vec<RelayerId> {
    let mut sorted = members.to_vec();
    sorted.sort_by(|a, b| {
        simple_hash(a.as_str())
            .cmp(&simple_hash(b.as_str()))
            .then_with(|| a.as_str().cmp(b.as_str()))
    });
    let k = ((ratio * sorted.len() as f64).floor() as usize).max(1);
    sorted.truncate(k.min(sorted.len()));
    sorted
}

#[derive(Debug, Clone)]
pub struct AcquireOptions {
    pub contract_id: Option<ContractId>,
    pub limited_contracts: HashSet<ContractId>,
    pub capacity_ratio: f64,
    pub lock_ttl_sec: u64,
}

/// An exclusive claim on one channel account. Holds the token needed to
/// release or extend it; dropping this without calling `release` leaves
/// the lock for its TTL to reclaim (no `Drop` impl — an async release
/// can't run from `Drop`, matching the spec's "destroyed on release, on
/// TTL expiry, or by a release with matching token").
#[derive(Debug, Clone)]
pub struct ChannelLease {
    pub relayer_id: RelayerId,
    pub token: String,
}

pub struct ChannelPool {
    kv: Arc<dyn KvStore>,
    network: Network,
}

impl ChannelPool {
    pub fn new(kv: Arc<dyn KvStore>, network: Network) -> Self {
        Self { kv, network }
    }

    /// Acquire contract per spec §4.4: up to `MAX_SPINS` attempts, each
    /// under the pool's global mutex.
    pub async fn acquire(&self, opts: &AcquireOptions) -> GatewayResult<ChannelLease> {
        let mut rng = StdRng::from_entropy();
        let mutex_key = pool_mutex_key(self.network);

        for attempt in 0..MAX_SPINS {
            let claimed = with_lock(
                self.kv.as_ref(),
                &mutex_key,
                POOL_MUTEX_TTL_SECONDS,
                OnBusy::Skip,
                || self.try_claim(opts),
            )
            .await?;

            match claimed {
                Some(Some(lease)) => return Ok(lease),
                Some(None) => debug!(attempt, "no free channel this spin"),
                None => debug!(attempt, "pool mutex busy this spin"),
            }

            let backoff = rng.gen_range(SPIN_BACKOFF_MIN_MS..=SPIN_BACKOFF_MAX_MS);
            tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
        }

        // Exhausted MAX_SPINS: report the last-seen shape of the pool.
        let members = list_members(self.kv.as_ref(), self.network).await?;
        if members.is_empty() {
            return Err(GatewayError::NoChannelsConfigured);
        }
        let limited = opts
            .contract_id
            .as_ref()
            .map(|c| opts.limited_contracts.contains(c))
            .unwrap_or(false);
        if limited {
            let candidates = partition_for_limited_contract(&members, opts.capacity_ratio);
            Err(GatewayError::PoolCapacity {
                reason: "limited_contract_capacity",
                total_channels: members.len(),
                candidates: candidates.len(),
            })
        } else {
            Err(GatewayError::PoolCapacity {
                reason: "all_channels_busy_or_mutex_contention",
                total_channels: members.len(),
                candidates: members.len(),
            })
        }
    }

    /// The select-and-claim critical section, run once per spin while
    /// holding the pool mutex (spec §4.4 steps 1-4). `Ok(None)` means no
    /// candidate was free this spin — the caller retries; a hard error
    /// (e.g. empty membership) aborts the whole acquire loop.
    async fn try_claim(&self, opts: &AcquireOptions) -> GatewayResult<Option<ChannelLease>> {
        let members = list_members(self.kv.as_ref(), self.network).await?;
        if members.is_empty() {
            return Err(GatewayError::NoChannelsConfigured);
        }

        let limited = opts
            .contract_id
            .as_ref()
            .map(|c| opts.limited_contracts.contains(c))
            .unwrap_or(false);

        let candidates = if limited {
            partition_for_limited_contract(&members, opts.capacity_ratio)
        } else {
            members
        };

        let mut shuffled = candidates;
        shuffled.shuffle(&mut StdRng::from_entropy());

        for id in &shuffled {
            if !self.is_locked(id).await? {
                let token = gateway_kv::random_token();
                let doc = LockDoc {
                    token: token.clone(),
                    locked_at: now_ms(),
                };
                gateway_kv::set_typed(
                    self.kv.as_ref(),
                    &lock_key(self.network, id),
                    &doc,
                    Some(opts.lock_ttl_sec),
                )
                .await?;
                return Ok(Some(ChannelLease {
                    relayer_id: id.clone(),
                    token,
                }));
            }
        }

        Ok(None)
    }

    async fn is_locked(&self, id: &RelayerId) -> GatewayResult<bool> {
        is_locked(self.kv.as_ref(), self.network, id).await
    }

    /// Release per spec §4.4: read the lock entry, delete only if its
    /// token matches. All KV errors swallowed (logged at `debug!`).
    pub async fn release(&self, lease: &ChannelLease) {
        if let Err(e) = self
            .kv
            .release_lock(&lock_key(self.network, &lease.relayer_id), &lease.token)
            .await
        {
            debug!(error = %e, relayer = %lease.relayer_id, "channel release failed, TTL will reclaim");
        }
    }

    /// Extend per spec §4.4: read the lock entry, rewrite with the same
    /// TTL if the token matches. All KV errors swallowed.
    pub async fn extend(&self, lease: &ChannelLease, lock_ttl_sec: u64) {
        let key = lock_key(self.network, &lease.relayer_id);
        match gateway_kv::get_typed::<LockDoc>(self.kv.as_ref(), &key).await {
            Ok(Some(doc)) if doc.token == lease.token => {
                let refreshed = LockDoc {
                    token: lease.token.clone(),
                    locked_at: now_ms(),
                };
                if let Err(e) =
                    gateway_kv::set_typed(self.kv.as_ref(), &key, &refreshed, Some(lock_ttl_sec)).await
                {
                    warn!(error = %e, relayer = %lease.relayer_id, "channel extend failed");
                }
            }
            Ok(_) => {
                // token mismatch or key gone — someone else's lock, or TTL already reclaimed it
            }
            Err(e) => warn!(error = %e, relayer = %lease.relayer_id, "channel extend read failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_kv::InMemoryKvStore;

    fn id(s: &str) -> RelayerId {
        RelayerId::normalize(s).unwrap()
    }

    #[test]
    fn simple_hash_is_deterministic() {
        assert_eq!(simple_hash("p1"), simple_hash("p1"));
    }

    #[test]
    fn partition_bound_is_floor_ratio_n_at_least_one() {
        let members = vec![id("p1"), id("p2"), id("p3"), id("p4")];
        let candidates = partition_for_limited_contract(&members, 0.5);
        assert_eq!(candidates.len(), 2);

        let candidates_small = partition_for_limited_contract(&members, 0.1);
        assert_eq!(candidates_small.len(), 1);
    }

    #[test]
    fn partition_is_deterministic_across_calls() {
        let members = vec![id("p1"), id("p2"), id("p3")];
        let a = partition_for_limited_contract(&members, 0.5);
        let b = partition_for_limited_contract(&members, 0.5);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn parallel_acquire_hands_out_distinct_channels() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        set_members(kv.as_ref(), Network::Testnet, &[id("p1"), id("p2")])
            .await
            .unwrap();
        let pool = ChannelPool::new(Arc::clone(&kv), Network::Testnet);

        let opts = AcquireOptions {
            contract_id: None,
            limited_contracts: HashSet::new(),
            capacity_ratio: 0.8,
            lock_ttl_sec: 30,
        };

        let lease1 = pool.acquire(&opts).await.unwrap();
        let lease2 = pool.acquire(&opts).await.unwrap();
        assert_ne!(lease1.relayer_id, lease2.relayer_id);

        let err = pool.acquire(&opts).await.unwrap_err();
        assert_eq!(err.code(), "POOL_CAPACITY");
    }

    #[tokio::test]
    async fn release_then_reacquire_succeeds() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        set_members(kv.as_ref(), Network::Testnet, &[id("p1")])
            .await
            .unwrap();
        let pool = ChannelPool::new(Arc::clone(&kv), Network::Testnet);
        let opts = AcquireOptions {
            contract_id: None,
            limited_contracts: HashSet::new(),
            capacity_ratio: 0.8,
            lock_ttl_sec: 30,
        };

        let lease = pool.acquire(&opts).await.unwrap();
        pool.release(&lease).await;
        let lease2 = pool.acquire(&opts).await.unwrap();
        assert_eq!(lease2.relayer_id, lease.relayer_id);
    }

    #[tokio::test]
    async fn limited_contract_capacity_error_distinguishes_reason() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        set_members(kv.as_ref(), Network::Testnet, &[id("p1"), id("p2")])
            .await
            .unwrap();
        let pool = ChannelPool::new(Arc::clone(&kv), Network::Testnet);

        let contract = ContractId::normalize("C").unwrap();
        let mut limited_contracts = HashSet::new();
        limited_contracts.insert(contract.clone());
        let opts = AcquireOptions {
            contract_id: Some(contract),
            limited_contracts,
            capacity_ratio: 0.5,
            lock_ttl_sec: 30,
        };

        let _lease = pool.acquire(&opts).await.unwrap();
        let err = pool.acquire(&opts).await.unwrap_err();
        match err {
            GatewayError::PoolCapacity { reason, candidates, .. } => {
                assert_eq!(reason, "limited_contract_capacity");
                assert_eq!(candidates, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
