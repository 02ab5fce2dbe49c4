//! `submit_and_wait` — the send/poll/classify sequence spec §4.9 describes,
//! layered over the [`crate::runtime::RelayerRuntime`] collaborator and the
//! fee tracker. Usage is always recorded before returning a terminal
//! outcome, except on timeout.

use std::sync::Arc;

use gateway_core::constants::{WAIT_POLL_INTERVAL_MS, WAIT_TIMEOUT_MS};
use gateway_core::error::{sanitize_message, GatewayError, GatewayResult};
use gateway_core::types::{ContractId, Network, TxResultSummary, TxStatus};
use gateway_fees::FeeTracker;
use tracing::{debug, warn};

use crate::runtime::{RelayerRuntime, SendTransactionRequest, TerminalStatusKind};

/// Everything `submit_and_wait` needs about the transaction beyond its XDR,
/// for fee recording after the fact — the channel pool and fee calculator
/// have already done their work by this point, so this is just their output
/// carried forward (spec §4.9 "after determining the outcome, record the
/// computed fee against the caller's budget").
pub struct SubmitContext {
    pub network: Network,
    pub transaction_xdr: String,
    pub max_fee: u64,
    pub fee: u64,
    pub contract_id: Option<ContractId>,
}

/// `sendTransaction` + `transactionWait`, branching on the terminal status
/// exactly as spec §4.9 lays out:
/// - `confirmed`/`pending` ⇒ record the fee, return a summary.
/// - `failed` ⇒ record the fee, decode a best-effort failure reason, build a
///   lab URL, fail with `ONCHAIN_FAILED`.
/// - poll exhausted with no terminal status ⇒ do **not** record the fee,
///   fail with `WAIT_TIMEOUT`.
pub async fn submit_and_wait(
    runtime: &dyn RelayerRuntime,
    fee_tracker: &FeeTracker,
    ctx: SubmitContext,
) -> GatewayResult<TxResultSummary> {
    let submission = runtime
        .send_transaction(SendTransactionRequest {
            network: ctx.network.as_str().to_string(),
            transaction_xdr: ctx.transaction_xdr,
            fee_bump: true,
            max_fee: ctx.max_fee,
        })
        .await?;

    let terminal = runtime
        .transaction_wait(&submission, WAIT_POLL_INTERVAL_MS, WAIT_TIMEOUT_MS)
        .await?;

    match terminal.status {
        TerminalStatusKind::Confirmed | TerminalStatusKind::Pending => {
            fee_tracker.record_usage(ctx.fee).await;
            Ok(TxResultSummary {
                transaction_id: terminal.id,
                hash: terminal.hash,
                status: if terminal.status == TerminalStatusKind::Confirmed {
                    TxStatus::Confirmed
                } else {
                    TxStatus::Pending
                },
                return_value: None,
                latest_ledger: None,
                error: None,
            })
        }
        TerminalStatusKind::Failed => {
            fee_tracker.record_usage(ctx.fee).await;
            let raw_reason = terminal.reason.unwrap_or_default();
            let reason = sanitize_reason(&raw_reason);
            let result_code = extract_result_code(&raw_reason);
            let lab_url = build_lab_url(ctx.network, terminal.hash.as_deref());
            debug!(
                contract_id = ?ctx.contract_id,
                reason = %reason,
                "submit_and_wait: transaction failed on chain"
            );
            Err(GatewayError::OnchainFailed {
                status: "failed".to_string(),
                reason,
                id: terminal.id,
                hash: terminal.hash,
                result_code,
                lab_url,
            })
        }
    }
}

/// Called instead of `submit_and_wait` when `transactionWait` itself times
/// out (the runtime surfaces this as a poll exhaustion, not a `failed`
/// status) — kept as a free function so `HttpRelayerRuntime`'s timeout path
/// and any mock's timeout path converge on identical, un-fee-recorded
/// behavior (spec §4.9: "on timeout, do not record usage — the caller may
/// retry or the transaction may still land").
pub fn wait_timeout_error(id: Option<String>, hash: Option<String>) -> GatewayError {
    warn!(?id, ?hash, "submit_and_wait: poll timed out, fee not recorded");
    GatewayError::WaitTimeout { id, hash }
}

/// Best-effort extraction of a transaction-result "code" out of the raw
/// reason text — fee-bump inner failures are reported as `outerCode:innerCode`
/// (spec §4.9); this takes the segment after the last colon when it reads
/// like a result code (short, no spaces) and falls back to `None` otherwise.
fn extract_result_code(raw: &str) -> Option<String> {
    let last = raw.rsplit(':').next()?.trim();
    if last.is_empty() || last.len() > 40 || last.contains(' ') {
        None
    } else {
        Some(last.to_string())
    }
}

/// Sanitizes a provider-supplied failure reason for the wire (spec §4.9):
/// the last colon-separated segment when it is at least 3 characters and
/// does not mention "provider" (providers sometimes embed their own name in
/// the tail segment, which the spec treats as not informative enough to
/// surface), else the raw text truncated to 100 characters.
pub fn sanitize_reason(raw: &str) -> String {
    if let Some(last) = raw.rsplit(':').next() {
        let candidate = last.trim();
        if candidate.len() >= 3 && !candidate.to_ascii_lowercase().contains("provider") {
            return sanitize_message(candidate);
        }
    }
    let mut msg = sanitize_message(raw);
    if msg.len() > 100 {
        msg.truncate(100);
    }
    msg
}

/// Builds a network-scoped debug/inspector URL for a failed transaction
/// hash, honoring `EXPLORER_BASE_URL` when set (SPEC_FULL.md §4.9).
pub fn build_lab_url(network: Network, hash: Option<&str>) -> String {
    let base = std::env::var("EXPLORER_BASE_URL")
        .unwrap_or_else(|_| "https://lab.stellar.org/transactions/lab".to_string());
    let hash = hash.unwrap_or("");
    format!("{base}?network={}&hash={}", network.as_str(), hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRelayerRuntime;
    use gateway_core::types::ApiKey;
    use gateway_kv::{InMemoryKvStore, KvStore};

    fn fee_tracker(kv: Arc<dyn KvStore>) -> FeeTracker {
        FeeTracker::new(
            kv,
            Network::Testnet,
            ApiKey("key-1".to_string()),
            None,
            None,
        )
    }

    fn ctx(fee: u64) -> SubmitContext {
        SubmitContext {
            network: Network::Testnet,
            transaction_xdr: "AAAA".to_string(),
            max_fee: 100_000,
            fee,
            contract_id: None,
        }
    }

    #[tokio::test]
    async fn confirmed_records_fee_and_returns_summary() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let tracker = fee_tracker(Arc::clone(&kv));
        let runtime = MockRelayerRuntime::confirmed("tx-1", "hash-1");

        let result = submit_and_wait(&runtime, &tracker, ctx(500)).await.unwrap();
        assert_eq!(result.status, TxStatus::Confirmed);
        assert_eq!(result.transaction_id.as_deref(), Some("tx-1"));

        let usage = tracker.get_usage_info().await.unwrap();
        assert_eq!(usage.consumed, 500);
    }

    #[tokio::test]
    async fn failed_records_fee_and_returns_onchain_failed() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let tracker = fee_tracker(Arc::clone(&kv));
        let runtime = MockRelayerRuntime::failed("tx-2", "hash-2", "txFAILED:opINVALID_ACTION");

        let err = submit_and_wait(&runtime, &tracker, ctx(500)).await.unwrap_err();
        match err {
            GatewayError::OnchainFailed { reason, result_code, .. } => {
                assert_eq!(reason, "opINVALID_ACTION");
                assert_eq!(result_code.as_deref(), Some("opINVALID_ACTION"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let usage = tracker.get_usage_info().await.unwrap();
        assert_eq!(usage.consumed, 500);
    }

    #[tokio::test]
    async fn timeout_does_not_record_fee() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let tracker = fee_tracker(Arc::clone(&kv));
        let runtime = MockRelayerRuntime::timeout("tx-3", "hash-3");

        let err = submit_and_wait(&runtime, &tracker, ctx(500)).await.unwrap_err();
        assert_eq!(err.code(), "WAIT_TIMEOUT");

        let usage = tracker.get_usage_info().await.unwrap();
        assert_eq!(usage.consumed, 0);
    }

    #[test]
    fn sanitize_reason_prefers_last_colon_segment() {
        assert_eq!(sanitize_reason("txFAILED:opNO_ACCOUNT"), "opNO_ACCOUNT");
    }

    #[test]
    fn sanitize_reason_falls_back_when_segment_too_short() {
        assert_eq!(sanitize_reason("txFAILED:ab"), "txFAILED:ab");
    }

    #[test]
    fn sanitize_reason_falls_back_when_segment_mentions_provider() {
        assert_eq!(
            sanitize_reason("txFAILED:rejected by provider"),
            "txFAILED:rejected by provider"
        );
    }

    #[test]
    fn build_lab_url_includes_network_and_hash() {
        let url = build_lab_url(Network::Testnet, Some("abc123"));
        assert!(url.contains("network=testnet"));
        assert!(url.contains("hash=abc123"));
    }
}
