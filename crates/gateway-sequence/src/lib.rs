//! gateway-sequence
//!
//! Sequence-number cache with chain fallback, per spec §4.5: after a
//! transaction confirms, the ledger-entries RPC can still return the
//! pre-increment sequence due to read-after-write lag, so the gateway
//! caches the *next expected* sequence and trusts it while fresh, built as
//! a thin get/put cache layered on the KV abstraction rather than talking
//! to sled directly (the KV abstraction already sits on sled via
//! `gateway-kv::SledKvStore`).

use std::sync::Arc;

use gateway_chain::ChainClient;
use gateway_core::error::{GatewayError, GatewayResult};
use gateway_core::types::Network;
use gateway_core::xdr::account_ledger_key;
use gateway_kv::KvStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// `<net>:channel:seq:<address>` value shape (spec §6 KV schema table).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SequenceEntry {
    sequence: String,
    #[serde(rename = "storedAt")]
    stored_at: u64,
}

fn sequence_key(network: Network, address: &str) -> String {
    format!("{network}:channel:seq:{address}")
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Decimal-string sequence arithmetic: `used + 1`. Sequence numbers are
/// kept as decimal strings throughout (see `gateway_core::xdr::
/// InnerTransaction::sequence`) rather than a fixed-width integer, since
/// Soroban sequence numbers can exceed the safe range of an `i64` in
/// pathological cases; this does a `u128` round-trip, which comfortably
/// covers every sequence value a real ledger produces.
fn decimal_increment(used: &str) -> GatewayResult<String> {
    let n: u128 = used
        .trim()
        .parse()
        .map_err(|_| GatewayError::FailedToGetSequence(format!("non-decimal sequence: {used}")))?;
    Ok((n + 1).to_string())
}

pub struct SequenceCache {
    kv: Arc<dyn KvStore>,
    chain: Arc<dyn ChainClient>,
    network: Network,
    max_age_ms: u64,
}

impl SequenceCache {
    pub fn new(
        kv: Arc<dyn KvStore>,
        chain: Arc<dyn ChainClient>,
        network: Network,
        max_age_ms: u64,
    ) -> Self {
        Self {
            kv,
            chain,
            network,
            max_age_ms,
        }
    }

    /// If a fresh cache entry exists, return it; otherwise fetch from
    /// chain (spec §4.5 `getSequence`). A chain fetch is never written
    /// back to the cache — only `commit_sequence` populates it.
    pub async fn get_sequence(&self, address: &str) -> GatewayResult<String> {
        let key = sequence_key(self.network, address);
        if let Some(entry) = gateway_kv::get_typed::<SequenceEntry>(self.kv.as_ref(), &key).await? {
            if now_ms().saturating_sub(entry.stored_at) < self.max_age_ms {
                return Ok(entry.sequence);
            }
        }
        self.fetch_from_chain(address).await
    }

    async fn fetch_from_chain(&self, address: &str) -> GatewayResult<String> {
        let key = account_ledger_key(address);
        let entries = self.chain.get_ledger_entries(&[key]).await?;
        let entry = entries
            .first()
            .ok_or_else(|| GatewayError::AccountNotFound(address.to_string()))?;
        let account = entry
            .account
            .as_ref()
            .ok_or_else(|| GatewayError::AccountNotFound(address.to_string()))?;
        Ok(account.sequence.clone())
    }

    /// Write `{sequence: used+1, storedAt: now}` (spec §4.5
    /// `commitSequence`). KV errors logged and swallowed.
    pub async fn commit_sequence(&self, address: &str, used: &str) {
        let next = match decimal_increment(used) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, address, used, "commit_sequence: non-decimal used value");
                return;
            }
        };
        let entry = SequenceEntry {
            sequence: next,
            stored_at: now_ms(),
        };
        let key = sequence_key(self.network, address);
        if let Err(e) = gateway_kv::set_typed(self.kv.as_ref(), &key, &entry, None).await {
            warn!(error = %e, address, "commit_sequence: KV write failed");
        }
    }

    /// Delete the cache entry (spec §4.5 `clearSequence`). Idempotent; KV
    /// errors logged and swallowed.
    pub async fn clear_sequence(&self, address: &str) {
        let key = sequence_key(self.network, address);
        if let Err(e) = self.kv.del(&key).await {
            debug!(error = %e, address, "clear_sequence: KV delete failed");
        }
    }
}
