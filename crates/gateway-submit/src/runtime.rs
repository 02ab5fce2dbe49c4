//! The hosting runtime's relayer-handle collaborator (spec §1/§6: "the
//! hosting runtime that provides... the per-relayer sign/send calls, and
//! the transaction-wait poller"), named explicitly out of scope — this
//! module defines only the interface plus one concrete HTTP-sidecar
//! implementation (reqwest-over-JSON) for a runnable node binary.

use async_trait::async_trait;
use gateway_core::error::{GatewayError, GatewayResult};
use gateway_core::types::RelayerId;
use gateway_core::xdr::InnerTransaction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct SendTransactionRequest {
    pub network: String,
    pub transaction_xdr: String,
    pub fee_bump: bool,
    pub max_fee: u64,
}

/// A handle to an in-flight submission — whatever the runtime needs to
/// later poll for terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionHandle {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatusKind {
    Confirmed,
    Pending,
    Failed,
}

/// Ledger network family a relayer handle belongs to. The gateway only
/// speaks Stellar/Soroban; spec §4.11's "must exist, stellar network type"
/// check on the fund relayer and on each channel account guards against a
/// hosting runtime that multiplexes relayer handles across chains from
/// accidentally handing the gateway a non-Stellar one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayerNetworkType {
    Stellar,
    Other,
}

/// `useRelayer(id).getRelayer()` per spec §6: the hosting runtime's handle
/// on a single relayer account, resolved before the gateway trusts it as a
/// fund or channel source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayerInfo {
    pub address: String,
    pub network_type: RelayerNetworkType,
}

/// The terminal (or still-pending, on timeout) status record returned by
/// `transactionWait` (spec §6's hosting-runtime collaborator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalStatus {
    pub status: TerminalStatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// On `failed`, the raw transaction-result XDR/reason text the
    /// runtime surfaced (spec §4.9 step 3: "attempt to decode the
    /// transaction-result XDR from the status reason").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[async_trait]
pub trait RelayerRuntime: Send + Sync {
    async fn sign_transaction(
        &self,
        relayer_id: &RelayerId,
        inner_tx: &InnerTransaction,
    ) -> GatewayResult<String>;

    async fn send_transaction(
        &self,
        req: SendTransactionRequest,
    ) -> GatewayResult<SubmissionHandle>;

    async fn transaction_wait(
        &self,
        submission: &SubmissionHandle,
        interval_ms: u64,
        timeout_ms: u64,
    ) -> GatewayResult<TerminalStatus>;

    /// `useRelayer(id).getRelayer()` — resolves a relayer handle so callers
    /// can confirm it exists and is Stellar-backed before trusting it as a
    /// fund or channel account.
    async fn get_relayer(&self, relayer_id: &RelayerId) -> GatewayResult<RelayerInfo>;
}

/// A reqwest-backed client against a relayer sidecar process. Kept as its
/// own type rather than reusing `HttpChainClient` because the two
/// collaborators have distinct base URLs and JSON shapes in production —
/// see `DESIGN.md`.
pub struct HttpRelayerRuntime {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRelayerRuntime {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RelayerRuntime for HttpRelayerRuntime {
    async fn sign_transaction(
        &self,
        relayer_id: &RelayerId,
        inner_tx: &InnerTransaction,
    ) -> GatewayResult<String> {
        let url = format!("{}/relayers/{}/sign", self.base_url, relayer_id.as_str());
        let resp: serde_json::Value = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "transaction": inner_tx }))
            .send()
            .await
            .map_err(|e| GatewayError::RelayerUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| GatewayError::RelayerUnavailable(format!("parsing sign response: {e}")))?;

        resp["signature"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| GatewayError::RelayerUnavailable("sign response missing signature".into()))
    }

    async fn send_transaction(
        &self,
        req: SendTransactionRequest,
    ) -> GatewayResult<SubmissionHandle> {
        let url = format!("{}/submit", self.base_url);
        self.client
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| GatewayError::RelayerUnavailable(e.to_string()))?
            .json::<SubmissionHandle>()
            .await
            .map_err(|e| GatewayError::RelayerUnavailable(format!("parsing submit response: {e}")))
    }

    async fn transaction_wait(
        &self,
        submission: &SubmissionHandle,
        interval_ms: u64,
        timeout_ms: u64,
    ) -> GatewayResult<TerminalStatus> {
        let url = format!("{}/wait", self.base_url);
        self.client
            .post(&url)
            .json(&serde_json::json!({
                "id": submission.id,
                "intervalMs": interval_ms,
                "timeoutMs": timeout_ms,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::RelayerUnavailable(e.to_string()))?
            .json::<TerminalStatus>()
            .await
            .map_err(|e| GatewayError::RelayerUnavailable(format!("parsing wait response: {e}")))
    }

    async fn get_relayer(&self, relayer_id: &RelayerId) -> GatewayResult<RelayerInfo> {
        let url = format!("{}/relayers/{}", self.base_url, relayer_id.as_str());
        let resp = self.client.get(&url).send().await.map_err(|e| {
            GatewayError::RelayerUnavailable(e.to_string())
        })?;

        if resp.status().as_u16() == 404 {
            return Err(GatewayError::RelayerNotFound(relayer_id.as_str().to_string()));
        }

        let value: serde_json::Value = resp.json().await.map_err(|e| {
            GatewayError::RelayerUnavailable(format!("parsing relayer response: {e}"))
        })?;

        let address = value["address"]
            .as_str()
            .ok_or_else(|| GatewayError::RelayerUnavailable("relayer response missing address".into()))?
            .to_string();
        let network_type = match value["networkType"].as_str() {
            Some("stellar") => RelayerNetworkType::Stellar,
            _ => RelayerNetworkType::Other,
        };

        Ok(RelayerInfo { address, network_type })
    }
}
