use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use gateway_core::types::InboundEnvelope;
use gateway_handler::Handler;

use crate::api::{GatewayApiServer, HeaderMap};

fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

/// Shared state passed to the RPC server — just the orchestrator, since
/// `Handler` already owns config plus its KV/chain/relayer collaborators.
pub struct RpcServerState {
    pub handler: Arc<Handler>,
}

/// The RPC server implementation.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Start the JSON-RPC server on `addr` with permissive CORS headers. Returns a handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let cors = CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any);

        let server = Server::builder()
            .set_http_middleware(tower::ServiceBuilder::new().layer(cors))
            .build(addr)
            .await?;

        let module = self.into_rpc();
        let handle = server.start(module);
        info!(%addr, "gateway RPC server started");
        Ok(handle)
    }
}

#[async_trait]
impl GatewayApiServer for RpcServer {
    async fn submit(&self, params: Value, headers: HeaderMap) -> RpcResult<Value> {
        let envelope = InboundEnvelope { params, headers };
        let outbound = self.state.handler.dispatch(envelope).await;
        // The spec's response envelope carries its own `success`/`error`
        // fields — failures are still a successful JSON-RPC call, per
        // DESIGN.md's resolution of the wire-protocol open question.
        serde_json::to_value(&outbound)
            .map_err(|e| rpc_err(-32603, format!("encoding response envelope: {e}")).into())
    }
}
