//! gateway-chain
//!
//! The chain-RPC collaborator named in spec §6: "Assumed JSON-RPC with
//! methods `simulateTransaction(transaction, authMode)` and
//! `getLedgerEntries(keys)`." `ChainClient` is the trait boundary;
//! `HttpChainClient` is a real reqwest-backed implementation built around a
//! `call(method, params) -> Value` helper, and `MockChainClient` is a
//! deterministic in-memory stand-in used by `gateway-handler`'s integration
//! tests.

pub mod assemble;
pub mod http;
pub mod mock;
pub mod simulate;

pub use http::HttpChainClient;
pub use mock::MockChainClient;

use async_trait::async_trait;
use gateway_core::error::GatewayResult;
use gateway_core::xdr::{AuthorizationEntry, InnerTransaction, LedgerEntry, LedgerKey, SorobanTransactionData};
use serde::{Deserialize, Serialize};

/// Simulation auth mode. Spec §4.6 always sends `"enforce"` — the mode that
/// validates authorization-entry signatures during simulation so expired or
/// invalid auth is caught before a channel is ever acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Enforce,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Enforce => "enforce",
        }
    }
}

/// One entry of a simulation's `results` array: the return-value XDR plus
/// the authorization entries the simulator observed (spec §4.6's read-only
/// predicate inspects `results[0]`'s auth).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulateResult {
    #[serde(default)]
    pub xdr: String,
    #[serde(default)]
    pub auth: Vec<AuthorizationEntry>,
}

/// The simulator's raw response, prior to classification. `error` carries
/// the raw simulation-failure text (spec §4.6's "Simulation `error`
/// field"); `rpc_error` carries a JSON-RPC-level `error` field distinct
/// from a simulation-level failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulateResponse {
    #[serde(default)]
    pub results: Vec<SimulateResult>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub latest_ledger: Option<u32>,
    #[serde(default)]
    pub transaction_data: Option<SorobanTransactionData>,
    #[serde(default)]
    pub min_resource_fee: Option<u64>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn simulate_transaction(
        &self,
        tx: &InnerTransaction,
        auth_mode: AuthMode,
    ) -> GatewayResult<SimulateResponse>;

    async fn get_ledger_entries(&self, keys: &[LedgerKey]) -> GatewayResult<Vec<LedgerEntry>>;
}
