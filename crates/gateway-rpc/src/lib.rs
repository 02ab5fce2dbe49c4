//! gateway-rpc
//!
//! JSON-RPC 2.0 server exposing the gateway's inbound envelope over HTTP.
//!
//! Namespace: "gateway"
//! Methods:
//!   gateway_submit — submit a request (submit-only, build-and-submit, or
//!                    management, all dispatched per spec.md §6/§4.11)
//!
//! Server bootstrap uses jsonrpsee plus tower-http CORS, collapsed to a
//! single method since the gateway's wire contract is one tagged envelope
//! rather than many typed RPC calls.

pub mod api;
pub mod server;

pub use api::{GatewayApiClient, GatewayApiServer};
pub use server::{RpcServer, RpcServerState};

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use gateway_chain::mock::{MockChainClient, SimulateOutcome};
    use gateway_chain::{ChainClient, SimulateResponse, SimulateResult};
    use gateway_core::config::Config;
    use gateway_core::types::Network;
    use gateway_core::xdr::{HostFunctionValue, LedgerFootprint, SorobanTransactionData};
    use gateway_handler::Handler;
    use gateway_kv::{InMemoryKvStore, KvStore};
    use gateway_submit::{MockRelayerRuntime, RelayerRuntime};
    use serde_json::json;

    use super::api::GatewayApiServer;
    use super::server::{RpcServer, RpcServerState};

    fn test_config() -> Config {
        Config {
            network: Network::Testnet,
            fund_relayer_id: "fund1".to_string(),
            lock_ttl_seconds: 30,
            fee_limit: None,
            fee_reset_period_ms: None,
            api_key_header: "x-api-key".to_string(),
            admin_secret: None,
            limited_contracts: HashSet::new(),
            contract_capacity_ratio: 0.8,
            inclusion_fee_default: 203,
            inclusion_fee_limited: 201,
        }
    }

    fn read_only_sim() -> SimulateResponse {
        SimulateResponse {
            results: vec![SimulateResult { xdr: "7".to_string(), auth: vec![] }],
            error: None,
            latest_ledger: Some(12),
            transaction_data: Some(SorobanTransactionData {
                resource_fee: 0,
                footprint: LedgerFootprint::default(),
            }),
            min_resource_fee: None,
        }
    }

    #[tokio::test]
    async fn submit_method_round_trips_a_readonly_call_through_the_envelope() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let chain: Arc<dyn ChainClient> =
            Arc::new(MockChainClient::new(SimulateOutcome::Success(read_only_sim()), vec![]));
        let relayer: Arc<dyn RelayerRuntime> = Arc::new(MockRelayerRuntime::confirmed("tx", "hash"));
        let handler = Arc::new(Handler::new(test_config(), kv, chain, relayer));
        let server = RpcServer::new(Arc::new(RpcServerState { handler }));

        let func = HostFunctionValue {
            contract_id: None,
            function_name: "ping".to_string(),
            args: vec![],
        };
        let params = json!({ "func": func.to_base64(), "auth": Vec::<String>::new() });

        let resp = server.submit(params, Default::default()).await.unwrap();
        assert_eq!(resp["success"], true);
        assert_eq!(resp["data"]["status"], "readonly");
    }
}
