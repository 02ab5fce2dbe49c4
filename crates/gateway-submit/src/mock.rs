//! An in-memory [`RelayerRuntime`] for tests, grounded on
//! `gateway-chain::mock::MockChainClient`'s outcome-enum style.

use async_trait::async_trait;
use gateway_core::error::GatewayResult;
use gateway_core::types::RelayerId;
use gateway_core::xdr::InnerTransaction;

use crate::runtime::{
    RelayerInfo, RelayerNetworkType, RelayerRuntime, SendTransactionRequest, SubmissionHandle,
    TerminalStatus, TerminalStatusKind,
};
use crate::submit::wait_timeout_error;

enum Outcome {
    Confirmed,
    Failed(String),
    Timeout,
}

pub struct MockRelayerRuntime {
    id: String,
    hash: String,
    outcome: Outcome,
}

impl MockRelayerRuntime {
    pub fn confirmed(id: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hash: hash.into(),
            outcome: Outcome::Confirmed,
        }
    }

    pub fn failed(id: impl Into<String>, hash: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hash: hash.into(),
            outcome: Outcome::Failed(reason.into()),
        }
    }

    pub fn timeout(id: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hash: hash.into(),
            outcome: Outcome::Timeout,
        }
    }
}

#[async_trait]
impl RelayerRuntime for MockRelayerRuntime {
    async fn sign_transaction(
        &self,
        _relayer_id: &RelayerId,
        _inner_tx: &InnerTransaction,
    ) -> GatewayResult<String> {
        Ok("mock-signature".to_string())
    }

    async fn send_transaction(
        &self,
        _req: SendTransactionRequest,
    ) -> GatewayResult<SubmissionHandle> {
        Ok(SubmissionHandle {
            id: self.id.clone(),
            hash: Some(self.hash.clone()),
        })
    }

    async fn transaction_wait(
        &self,
        submission: &SubmissionHandle,
        _interval_ms: u64,
        _timeout_ms: u64,
    ) -> GatewayResult<TerminalStatus> {
        match &self.outcome {
            Outcome::Confirmed => Ok(TerminalStatus {
                status: TerminalStatusKind::Confirmed,
                id: Some(submission.id.clone()),
                hash: submission.hash.clone(),
                reason: None,
            }),
            Outcome::Failed(reason) => Ok(TerminalStatus {
                status: TerminalStatusKind::Failed,
                id: Some(submission.id.clone()),
                hash: submission.hash.clone(),
                reason: Some(reason.clone()),
            }),
            Outcome::Timeout => Err(wait_timeout_error(
                Some(submission.id.clone()),
                submission.hash.clone(),
            )),
        }
    }

    async fn get_relayer(&self, relayer_id: &RelayerId) -> GatewayResult<RelayerInfo> {
        Ok(RelayerInfo {
            address: format!("G{}", relayer_id.as_str().to_uppercase()),
            network_type: RelayerNetworkType::Stellar,
        })
    }
}
