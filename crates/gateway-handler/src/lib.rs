//! gateway-handler
//!
//! The request orchestrator: routes a decoded inbound envelope through
//! management dispatch or the submit-only/build-and-submit transaction
//! pipelines, owning the lifecycle rules that tie the channel pool and the
//! sequence cache to how a submission settles — a single top-level
//! request-dispatch function that ties together validation, its
//! collaborators, and a uniform response shape.

use std::collections::HashSet;
use std::sync::Arc;

use gateway_chain::assemble::{assemble_inner_transaction, build_simulation_transaction};
use gateway_chain::simulate::is_read_only;
use gateway_chain::{AuthMode, ChainClient, SimulateResponse};
use gateway_core::config::Config;
use gateway_core::constants::{SEQUENCE_MAX_AGE_MS_DEFAULT, SUBMIT_ONLY_FEE_SANITY_OFFSET, TIME_BOUNDS_WINDOW_SECONDS};
use gateway_core::error::{GatewayError, GatewayResult};
use gateway_core::types::{ApiKey, ContractId, GatewayRequest, InboundEnvelope, OutboundEnvelope, RelayerId, TxResultSummary, TxStatus};
use gateway_core::validation::validate_request;
use gateway_core::xdr::{
    AuthorizationEntry, EnvelopeType, HostFunctionValue, TransactionEnvelope,
};
use gateway_fees::{calculate_fee, extract_contract_id, FeeTracker};
use gateway_kv::KvStore;
use gateway_management::{ManagementConfig, ManagementPlane, ManagementRequest};
use gateway_pool::{AcquireOptions, ChannelLease, ChannelPool};
use gateway_sequence::SequenceCache;
use gateway_submit::{submit_and_wait, RelayerInfo, RelayerNetworkType, RelayerRuntime, SubmitContext};
use tracing::debug;

/// Where a submission landed, once known — drives both the lock and the
/// sequence-cache lifecycle rules at the end of the build-and-submit path.
enum Settlement {
    Confirmed,
    Pending,
    Other,
}

impl Settlement {
    fn of(result: &GatewayResult<TxResultSummary>) -> Self {
        match result {
            Ok(summary) => match summary.status {
                TxStatus::Confirmed => Settlement::Confirmed,
                TxStatus::Pending => Settlement::Pending,
                _ => Settlement::Other,
            },
            Err(GatewayError::WaitTimeout { .. }) => Settlement::Pending,
            Err(_) => Settlement::Other,
        }
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// If the caller set `returnTxHash`, a timeout or on-chain failure is folded
/// into a `pending`/`failed` summary instead of propagating as an error —
/// every other error still propagates untouched.
fn apply_return_tx_hash(
    result: GatewayResult<TxResultSummary>,
    return_tx_hash: bool,
) -> GatewayResult<TxResultSummary> {
    if !return_tx_hash {
        return result;
    }
    match result {
        Ok(summary) => Ok(summary),
        Err(GatewayError::WaitTimeout { id, hash }) => Ok(TxResultSummary {
            transaction_id: id,
            hash,
            status: TxStatus::Pending,
            return_value: None,
            latest_ledger: None,
            error: None,
        }),
        Err(GatewayError::OnchainFailed { reason, id, hash, .. }) => Ok(TxResultSummary {
            transaction_id: id,
            hash,
            status: TxStatus::Failed,
            return_value: None,
            latest_ledger: None,
            error: Some(reason),
        }),
        Err(other) => Err(other),
    }
}

/// Owns the per-process collaborators and dispatches every inbound request.
/// Config is loaded once at construction rather than re-read per request —
/// process environment doesn't change between requests, so there's nothing
/// to gain from the per-request re-parse spec.md describes.
pub struct Handler {
    config: Config,
    kv: Arc<dyn KvStore>,
    chain: Arc<dyn ChainClient>,
    relayer: Arc<dyn RelayerRuntime>,
}

impl Handler {
    pub fn new(
        config: Config,
        kv: Arc<dyn KvStore>,
        chain: Arc<dyn ChainClient>,
        relayer: Arc<dyn RelayerRuntime>,
    ) -> Self {
        Self { config, kv, chain, relayer }
    }

    pub async fn dispatch(&self, envelope: InboundEnvelope) -> OutboundEnvelope {
        if let Some(mgmt_raw) = envelope.params.get("management") {
            return self.dispatch_management(mgmt_raw).await;
        }

        match self.dispatch_transaction(&envelope).await {
            Ok(summary) => OutboundEnvelope::ok(summary),
            Err(e) => OutboundEnvelope::err(&e),
        }
    }

    async fn dispatch_management(&self, raw: &serde_json::Value) -> OutboundEnvelope {
        let req: ManagementRequest = match serde_json::from_value(raw.clone()) {
            Ok(r) => r,
            Err(e) => return OutboundEnvelope::err(&GatewayError::InvalidPayload(e.to_string())),
        };
        let plane = ManagementPlane::new(
            Arc::clone(&self.kv),
            self.config.network,
            ManagementConfig {
                admin_secret: self.config.admin_secret.clone(),
                fee_limit_default: self.config.fee_limit,
                fee_reset_period_ms: self.config.fee_reset_period_ms,
                inclusion_fee_default: self.config.inclusion_fee_default,
                inclusion_fee_limited: self.config.inclusion_fee_limited,
                contract_capacity_ratio: self.config.contract_capacity_ratio,
            },
        );
        match plane.handle(req).await {
            Ok(resp) => OutboundEnvelope::ok(resp),
            Err(e) => OutboundEnvelope::err(&e),
        }
    }

    async fn dispatch_transaction(&self, envelope: &InboundEnvelope) -> GatewayResult<TxResultSummary> {
        let api_key = envelope.api_key(&self.config.api_key_header);
        if self.config.fee_limit.is_some() && api_key.is_none() {
            return Err(GatewayError::ApiKeyRequired);
        }
        let fee_tracker = FeeTracker::new(
            Arc::clone(&self.kv),
            self.config.network,
            api_key.unwrap_or_else(|| ApiKey(String::new())),
            self.config.fee_limit,
            self.config.fee_reset_period_ms,
        );

        let request = validate_request(&envelope.params)?;

        let fund_relayer_id = RelayerId::normalize(&self.config.fund_relayer_id).ok_or(
            GatewayError::ConfigMissing { field: "FUND_RELAYER_ID" },
        )?;
        let fund = self.relayer.get_relayer(&fund_relayer_id).await?;
        if fund.network_type != RelayerNetworkType::Stellar {
            return Err(GatewayError::RelayerNotFound(fund_relayer_id.as_str().to_string()));
        }

        match request {
            GatewayRequest::Submit { xdr } => self.submit_only(&xdr, &fund, &fee_tracker).await,
            GatewayRequest::Build { func, auth, return_tx_hash } => {
                self.build_and_submit(&func, &auth, return_tx_hash, &fund, &fee_tracker).await
            }
        }
    }

    /// The submit-only path (spec.md §4.11): an already-built, caller-signed
    /// envelope. An unsigned single-invoke envelope is funneled straight
    /// into the build-and-submit path instead, since the gateway still owns
    /// assembling and co-signing it.
    async fn submit_only(
        &self,
        xdr: &str,
        fund: &RelayerInfo,
        fee_tracker: &FeeTracker,
    ) -> GatewayResult<TxResultSummary> {
        let envelope = TransactionEnvelope::from_base64(xdr)?;

        if envelope.is_unsigned_single_invoke() {
            let func = envelope.inner.operation.host_function.to_base64();
            let auth: Vec<String> = envelope
                .inner
                .operation
                .auth
                .iter()
                .map(AuthorizationEntry::to_base64)
                .collect();
            return self.build_and_submit(&func, &auth, false, fund, fee_tracker).await;
        }

        if !envelope.signed {
            return Err(GatewayError::InvalidUnsignedXdr(
                "envelope is flagged unsigned but does not decompose into a single invoke-host-function call".to_string(),
            ));
        }
        if envelope.signatures.is_empty() {
            return Err(GatewayError::InvalidSignature);
        }
        if envelope.envelope_type != EnvelopeType::Regular {
            return Err(GatewayError::InvalidEnvelopeType);
        }

        let now = now_unix();
        let bounds = envelope.inner.time_bounds;
        if bounds.max_time < now {
            return Err(GatewayError::InvalidTimeBounds(format!(
                "maxTime {} has already elapsed",
                bounds.max_time
            )));
        }
        let limit = now + TIME_BOUNDS_WINDOW_SECONDS;
        if bounds.max_time > limit {
            return Err(GatewayError::TimeboundsTooFar { max_time: bounds.max_time, limit });
        }

        let resource_fee = envelope
            .inner
            .soroban_data
            .as_ref()
            .map(|d| d.resource_fee)
            .unwrap_or(0);
        if envelope.inner.fee > resource_fee + SUBMIT_ONLY_FEE_SANITY_OFFSET {
            return Err(GatewayError::FeeMismatch { fee: envelope.inner.fee, resource_fee });
        }

        let max_fee = calculate_fee(
            &envelope.inner,
            &self.config.limited_contracts,
            self.config.inclusion_fee_default,
            self.config.inclusion_fee_limited,
        );
        fee_tracker.check_budget(max_fee).await?;

        let contract_id = extract_contract_id(&envelope.inner);
        let address = envelope.inner.source.clone();
        let used_sequence = envelope.inner.sequence.clone();
        let sequence_cache = self.sequence_cache();

        let result = submit_and_wait(
            self.relayer.as_ref(),
            fee_tracker,
            SubmitContext {
                network: self.config.network,
                transaction_xdr: xdr.to_string(),
                max_fee,
                fee: max_fee,
                contract_id,
            },
        )
        .await;

        match Settlement::of(&result) {
            Settlement::Confirmed => sequence_cache.commit_sequence(&address, &used_sequence).await,
            _ => sequence_cache.clear_sequence(&address).await,
        }

        result
    }

    /// The build-and-submit path (spec.md §4.11): simulate the host function
    /// call, return immediately if it turns out to be read-only, otherwise
    /// acquire a channel and carry the submission through to completion.
    async fn build_and_submit(
        &self,
        func_b64: &str,
        auth_b64: &[String],
        return_tx_hash: bool,
        fund: &RelayerInfo,
        fee_tracker: &FeeTracker,
    ) -> GatewayResult<TxResultSummary> {
        let func = HostFunctionValue::from_base64(func_b64)?;
        let mut auth = Vec::with_capacity(auth_b64.len());
        for entry in auth_b64 {
            auth.push(AuthorizationEntry::from_base64(entry)?);
        }

        let now = now_unix();
        let sim_tx = build_simulation_transaction(&fund.address, &func, &auth, now);
        let sim = self.chain.simulate_transaction(&sim_tx, AuthMode::Enforce).await?;

        if is_read_only(&sim) {
            let return_value = sim.results.first().map(|r| r.xdr.clone()).unwrap_or_default();
            return Ok(TxResultSummary::readonly(return_value, sim.latest_ledger));
        }

        let contract_id = func
            .contract_id
            .as_deref()
            .and_then(ContractId::normalize);

        let pool = self.channel_pool();
        let lease = pool
            .acquire(&AcquireOptions {
                contract_id: contract_id.clone(),
                limited_contracts: self.config.limited_contracts.clone(),
                capacity_ratio: self.config.contract_capacity_ratio,
                lock_ttl_sec: self.config.lock_ttl_seconds,
            })
            .await?;

        let outcome = self
            .run_leased_submission(&lease, &func, &auth, &sim, contract_id, now, fee_tracker)
            .await;

        match Settlement::of(&outcome) {
            Settlement::Pending => pool.extend(&lease, self.config.lock_ttl_seconds).await,
            _ => pool.release(&lease).await,
        }

        apply_return_tx_hash(outcome, return_tx_hash)
    }

    /// Resolves the leased channel account, fetches its sequence number, and
    /// hands off to [`Self::finish_leased_submission`] — a separate method
    /// so any failure past the sequence fetch still clears the cache
    /// through the one `Settlement::of` match below, rather than bypassing
    /// it via `?`.
    async fn run_leased_submission(
        &self,
        lease: &ChannelLease,
        func: &HostFunctionValue,
        auth: &[AuthorizationEntry],
        sim: &SimulateResponse,
        contract_id: Option<ContractId>,
        now: i64,
        fee_tracker: &FeeTracker,
    ) -> GatewayResult<TxResultSummary> {
        let channel = self.relayer.get_relayer(&lease.relayer_id).await?;
        if channel.network_type != RelayerNetworkType::Stellar {
            return Err(GatewayError::RelayerNotFound(lease.relayer_id.as_str().to_string()));
        }

        let sequence_cache = self.sequence_cache();
        let used_sequence = sequence_cache.get_sequence(&channel.address).await?;

        let result = self
            .finish_leased_submission(
                lease,
                func,
                auth,
                sim,
                contract_id,
                now,
                fee_tracker,
                &channel.address,
                &used_sequence,
            )
            .await;

        match Settlement::of(&result) {
            Settlement::Confirmed => {
                sequence_cache.commit_sequence(&channel.address, &used_sequence).await
            }
            _ => sequence_cache.clear_sequence(&channel.address).await,
        }

        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish_leased_submission(
        &self,
        lease: &ChannelLease,
        func: &HostFunctionValue,
        auth: &[AuthorizationEntry],
        sim: &SimulateResponse,
        contract_id: Option<ContractId>,
        now: i64,
        fee_tracker: &FeeTracker,
        channel_address: &str,
        used_sequence: &str,
    ) -> GatewayResult<TxResultSummary> {
        let inner = assemble_inner_transaction(channel_address, used_sequence, func, auth, sim, now)?;

        let signature = self.relayer.sign_transaction(&lease.relayer_id, &inner).await?;
        let envelope = TransactionEnvelope {
            envelope_type: EnvelopeType::Regular,
            signed: true,
            inner: inner.clone(),
            signatures: vec![signature],
        };

        let max_fee = calculate_fee(
            &inner,
            &self.config.limited_contracts,
            self.config.inclusion_fee_default,
            self.config.inclusion_fee_limited,
        );
        fee_tracker.check_budget(max_fee).await?;

        debug!(relayer = %lease.relayer_id, ?contract_id, max_fee, "submitting assembled transaction");

        submit_and_wait(
            self.relayer.as_ref(),
            fee_tracker,
            SubmitContext {
                network: self.config.network,
                transaction_xdr: envelope.to_base64(),
                max_fee,
                fee: max_fee,
                contract_id,
            },
        )
        .await
    }

    fn channel_pool(&self) -> ChannelPool {
        ChannelPool::new(Arc::clone(&self.kv), self.config.network)
    }

    fn sequence_cache(&self) -> SequenceCache {
        SequenceCache::new(
            Arc::clone(&self.kv),
            Arc::clone(&self.chain),
            self.config.network,
            SEQUENCE_MAX_AGE_MS_DEFAULT,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_chain::mock::{MockChainClient, SimulateOutcome};
    use gateway_chain::SimulateResult;
    use gateway_core::types::Network;
    use gateway_core::xdr::{
        account_ledger_key, AccountEntry, InvokeHostFunctionOp, LedgerEntry, LedgerFootprint,
        SorobanTransactionData, TimeBounds,
    };
    use gateway_kv::InMemoryKvStore;
    use gateway_submit::MockRelayerRuntime;
    use serde_json::json;

    fn test_config(fee_limit: Option<u64>) -> Config {
        Config {
            network: Network::Testnet,
            fund_relayer_id: "fund1".to_string(),
            lock_ttl_seconds: 30,
            fee_limit,
            fee_reset_period_ms: None,
            api_key_header: "x-api-key".to_string(),
            admin_secret: Some("s3cret".to_string()),
            limited_contracts: HashSet::new(),
            contract_capacity_ratio: 0.8,
            inclusion_fee_default: 203,
            inclusion_fee_limited: 201,
        }
    }

    fn envelope(params: serde_json::Value) -> InboundEnvelope {
        InboundEnvelope { params, headers: Default::default() }
    }

    fn host_fn() -> HostFunctionValue {
        HostFunctionValue {
            contract_id: Some("CONTRACTX".to_string()),
            function_name: "transfer".to_string(),
            args: vec![],
        }
    }

    fn non_read_only_sim() -> SimulateResponse {
        SimulateResponse {
            results: vec![SimulateResult {
                xdr: "return-value".to_string(),
                auth: vec![AuthorizationEntry::Address {
                    address: "GADDRESS".to_string(),
                    nonce: Some(1),
                    signature: None,
                }],
            }],
            error: None,
            latest_ledger: Some(100),
            transaction_data: Some(SorobanTransactionData {
                resource_fee: 5_000,
                footprint: LedgerFootprint { read_only: vec![], read_write: vec!["k".to_string()] },
            }),
            min_resource_fee: Some(5_000),
        }
    }

    fn read_only_sim() -> SimulateResponse {
        SimulateResponse {
            results: vec![SimulateResult { xdr: "42".to_string(), auth: vec![] }],
            error: None,
            latest_ledger: Some(50),
            transaction_data: Some(SorobanTransactionData {
                resource_fee: 0,
                footprint: LedgerFootprint::default(),
            }),
            min_resource_fee: None,
        }
    }

    #[tokio::test]
    async fn read_only_call_short_circuits_without_touching_the_pool() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let chain: Arc<dyn ChainClient> =
            Arc::new(MockChainClient::new(SimulateOutcome::Success(read_only_sim()), vec![]));
        let relayer: Arc<dyn RelayerRuntime> = Arc::new(MockRelayerRuntime::confirmed("tx", "hash"));
        let handler = Handler::new(test_config(None), kv, chain, relayer);

        let resp = handler
            .dispatch(envelope(json!({ "func": host_fn().to_base64(), "auth": [] })))
            .await;

        assert!(resp.success);
        assert_eq!(resp.data["status"], "readonly");
        assert_eq!(resp.data["returnValue"], "42");
    }

    #[tokio::test]
    async fn confirmed_build_and_submit_commits_sequence_and_releases_the_lock() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        gateway_pool::set_members(kv.as_ref(), Network::Testnet, &[RelayerId::normalize("p1").unwrap()])
            .await
            .unwrap();

        let ledger_entries = vec![LedgerEntry {
            key: account_ledger_key("GP1"),
            account: Some(AccountEntry { address: "GP1".to_string(), sequence: "41".to_string() }),
        }];
        let chain: Arc<dyn ChainClient> = Arc::new(MockChainClient::new(
            SimulateOutcome::Success(non_read_only_sim()),
            ledger_entries,
        ));
        let relayer: Arc<dyn RelayerRuntime> =
            Arc::new(MockRelayerRuntime::confirmed("tx-1", "hash-1"));
        let handler = Handler::new(test_config(None), Arc::clone(&kv), chain, relayer);

        let resp = handler
            .dispatch(envelope(json!({ "func": host_fn().to_base64(), "auth": [] })))
            .await;

        assert!(resp.success);
        assert_eq!(resp.data["status"], "confirmed");
        assert_eq!(resp.data["transactionId"], "tx-1");

        let relayer_id = RelayerId::normalize("p1").unwrap();
        assert!(!gateway_pool::is_locked(kv.as_ref(), Network::Testnet, &relayer_id).await.unwrap());
    }

    #[tokio::test]
    async fn timeout_with_return_tx_hash_yields_pending_instead_of_erroring() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        gateway_pool::set_members(kv.as_ref(), Network::Testnet, &[RelayerId::normalize("p1").unwrap()])
            .await
            .unwrap();

        let ledger_entries = vec![LedgerEntry {
            key: account_ledger_key("GP1"),
            account: Some(AccountEntry { address: "GP1".to_string(), sequence: "41".to_string() }),
        }];
        let chain: Arc<dyn ChainClient> = Arc::new(MockChainClient::new(
            SimulateOutcome::Success(non_read_only_sim()),
            ledger_entries,
        ));
        let relayer: Arc<dyn RelayerRuntime> = Arc::new(MockRelayerRuntime::timeout("tx-2", "hash-2"));
        let handler = Handler::new(test_config(None), Arc::clone(&kv), chain, relayer);

        let resp = handler
            .dispatch(envelope(json!({
                "func": host_fn().to_base64(),
                "auth": [],
                "returnTxHash": true,
            })))
            .await;

        assert!(resp.success);
        assert_eq!(resp.data["status"], "pending");

        let relayer_id = RelayerId::normalize("p1").unwrap();
        assert!(gateway_pool::is_locked(kv.as_ref(), Network::Testnet, &relayer_id).await.unwrap());
    }

    #[tokio::test]
    async fn missing_api_key_is_rejected_when_a_default_limit_is_configured() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let chain: Arc<dyn ChainClient> =
            Arc::new(MockChainClient::new(SimulateOutcome::Success(read_only_sim()), vec![]));
        let relayer: Arc<dyn RelayerRuntime> = Arc::new(MockRelayerRuntime::confirmed("tx", "hash"));
        let handler = Handler::new(test_config(Some(10_000)), kv, chain, relayer);

        let resp = handler
            .dispatch(envelope(json!({ "func": host_fn().to_base64(), "auth": [] })))
            .await;

        assert!(!resp.success);
        assert_eq!(resp.data["code"], "API_KEY_REQUIRED");
    }

    #[tokio::test]
    async fn invalid_request_shape_surfaces_as_invalid_params() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let chain: Arc<dyn ChainClient> =
            Arc::new(MockChainClient::new(SimulateOutcome::Success(read_only_sim()), vec![]));
        let relayer: Arc<dyn RelayerRuntime> = Arc::new(MockRelayerRuntime::confirmed("tx", "hash"));
        let handler = Handler::new(test_config(None), kv, chain, relayer);

        let resp = handler.dispatch(envelope(json!({ "nonsense": true }))).await;

        assert!(!resp.success);
        assert_eq!(resp.data["code"], "INVALID_PARAMS");
    }

    #[tokio::test]
    async fn no_channels_configured_surfaces_pool_capacity() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let chain: Arc<dyn ChainClient> = Arc::new(MockChainClient::new(
            SimulateOutcome::Success(non_read_only_sim()),
            vec![],
        ));
        let relayer: Arc<dyn RelayerRuntime> = Arc::new(MockRelayerRuntime::confirmed("tx", "hash"));
        let handler = Handler::new(test_config(None), kv, chain, relayer);

        let resp = handler
            .dispatch(envelope(json!({ "func": host_fn().to_base64(), "auth": [] })))
            .await;

        assert!(!resp.success);
        assert_eq!(resp.data["code"], "NO_CHANNELS_CONFIGURED");
    }

    #[tokio::test]
    async fn management_request_routes_past_the_transaction_pipeline() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let chain: Arc<dyn ChainClient> =
            Arc::new(MockChainClient::new(SimulateOutcome::Success(read_only_sim()), vec![]));
        let relayer: Arc<dyn RelayerRuntime> = Arc::new(MockRelayerRuntime::confirmed("tx", "hash"));
        let handler = Handler::new(test_config(None), kv, chain, relayer);

        let resp = handler
            .dispatch(envelope(json!({
                "management": { "adminSecret": "s3cret", "action": "stats" }
            })))
            .await;

        assert!(resp.success);
        assert_eq!(resp.data["poolSize"], 0);
    }

    #[tokio::test]
    async fn submit_only_signed_envelope_confirms() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let chain: Arc<dyn ChainClient> =
            Arc::new(MockChainClient::new(SimulateOutcome::Success(read_only_sim()), vec![]));
        let relayer: Arc<dyn RelayerRuntime> =
            Arc::new(MockRelayerRuntime::confirmed("tx-3", "hash-3"));
        let handler = Handler::new(test_config(None), kv, chain, relayer);

        let signed = TransactionEnvelope {
            envelope_type: EnvelopeType::Regular,
            signed: true,
            inner: gateway_core::xdr::InnerTransaction {
                source: "GSOURCE".to_string(),
                sequence: "7".to_string(),
                fee: 100,
                time_bounds: TimeBounds { min_time: 0, max_time: now_unix() + 60 },
                operation: InvokeHostFunctionOp { host_function: host_fn(), auth: vec![] },
                soroban_data: None,
            },
            signatures: vec!["sig".to_string()],
        };

        let resp = handler
            .dispatch(envelope(json!({ "xdr": signed.to_base64() })))
            .await;

        assert!(resp.success);
        assert_eq!(resp.data["status"], "confirmed");
        assert_eq!(resp.data["transactionId"], "tx-3");
    }
}
