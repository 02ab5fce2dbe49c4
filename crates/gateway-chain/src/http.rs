//! `HttpChainClient` — a reqwest-backed JSON-RPC client for the chain's
//! `simulateTransaction`/`getLedgerEntries` methods: build
//! `{"jsonrpc":"2.0","method":...,"params":...,"id":1}`, POST, check
//! the `error` field, return `result`.

use async_trait::async_trait;
use gateway_core::error::{GatewayError, GatewayResult};
use gateway_core::xdr::{InnerTransaction, LedgerEntry, LedgerKey};
use serde_json::json;
use tracing::warn;

use crate::simulate::classify_simulation_error;
use crate::{AuthMode, ChainClient, SimulateResponse};

pub struct HttpChainClient {
    rpc_url: String,
    client: reqwest::Client,
}

impl HttpChainClient {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> GatewayResult<serde_json::Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let resp = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::SimulationNetworkError(e.to_string()))?;

        let json_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::SimulationNetworkError(format!("parsing RPC response: {e}")))?;

        if let Some(err) = json_body.get("error") {
            return Err(GatewayError::SimulationRpcFailure(err.to_string()));
        }

        Ok(json_body["result"].clone())
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn simulate_transaction(
        &self,
        tx: &InnerTransaction,
        auth_mode: AuthMode,
    ) -> GatewayResult<SimulateResponse> {
        let result = self
            .call(
                "simulateTransaction",
                json!({ "transaction": tx, "authMode": auth_mode.as_str() }),
            )
            .await?;

        let sim: SimulateResponse = serde_json::from_value(result).map_err(|e| {
            GatewayError::SimulationRpcFailure(format!("malformed simulate response: {e}"))
        })?;

        if let Some(raw_error) = &sim.error {
            warn!(error = %raw_error, "simulateTransaction returned a simulation-level error");
            return Err(classify_simulation_error(raw_error));
        }

        Ok(sim)
    }

    async fn get_ledger_entries(&self, keys: &[LedgerKey]) -> GatewayResult<Vec<LedgerEntry>> {
        let result = self
            .call("getLedgerEntries", json!({ "keys": keys }))
            .await
            .map_err(|e| match e {
                GatewayError::SimulationNetworkError(m) | GatewayError::SimulationRpcFailure(m) => {
                    GatewayError::FailedToGetSequence(m)
                }
                other => other,
            })?;

        serde_json::from_value(result).map_err(|e| {
            GatewayError::FailedToGetSequence(format!("malformed getLedgerEntries response: {e}"))
        })
    }
}
