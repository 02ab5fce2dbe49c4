//! `MockChainClient` — a deterministic, in-memory `ChainClient` used by
//! `gateway-handler`'s integration tests in place of a real Soroban RPC
//! endpoint (the "thin client SDK"/chain RPC is explicitly out of scope
//! per spec §1; tests stand in their own fixture rather than hitting a
//! network).

use async_trait::async_trait;
use gateway_core::error::{GatewayError, GatewayResult};
use gateway_core::xdr::{InnerTransaction, LedgerEntry, LedgerKey};
use tokio::sync::Mutex;

use crate::simulate::classify_simulation_error;
use crate::{AuthMode, ChainClient, SimulateResponse};

#[derive(Clone)]
pub enum SimulateOutcome {
    Success(SimulateResponse),
    /// Raw simulation-level error text, classified the same way the real
    /// client classifies it.
    SimulationError(String),
    NetworkError(String),
    RpcFailure(String),
}

pub struct MockChainClient {
    simulate_outcome: Mutex<SimulateOutcome>,
    ledger_entries: Mutex<Vec<LedgerEntry>>,
}

impl MockChainClient {
    pub fn new(simulate_outcome: SimulateOutcome, ledger_entries: Vec<LedgerEntry>) -> Self {
        Self {
            simulate_outcome: Mutex::new(simulate_outcome),
            ledger_entries: Mutex::new(ledger_entries),
        }
    }

    pub fn with_simulate_success(sim: SimulateResponse) -> Self {
        Self::new(SimulateOutcome::Success(sim), Vec::new())
    }

    pub async fn set_simulate_outcome(&self, outcome: SimulateOutcome) {
        *self.simulate_outcome.lock().await = outcome;
    }

    pub async fn set_ledger_entries(&self, entries: Vec<LedgerEntry>) {
        *self.ledger_entries.lock().await = entries;
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn simulate_transaction(
        &self,
        _tx: &InnerTransaction,
        _auth_mode: AuthMode,
    ) -> GatewayResult<SimulateResponse> {
        match &*self.simulate_outcome.lock().await {
            SimulateOutcome::Success(resp) => Ok(resp.clone()),
            SimulateOutcome::SimulationError(raw) => Err(classify_simulation_error(raw)),
            SimulateOutcome::NetworkError(msg) => Err(GatewayError::SimulationNetworkError(msg.clone())),
            SimulateOutcome::RpcFailure(msg) => Err(GatewayError::SimulationRpcFailure(msg.clone())),
        }
    }

    async fn get_ledger_entries(&self, _keys: &[LedgerKey]) -> GatewayResult<Vec<LedgerEntry>> {
        Ok(self.ledger_entries.lock().await.clone())
    }
}
