use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use serde_json::Value;

/// The gateway's JSON-RPC 2.0 API definition.
///
/// All method names are prefixed with "gateway_" via `namespace = "gateway"`.
/// A single method carries the entire inbound/outbound envelope shape from
/// spec.md §6 rather than one method per request kind — the envelope's
/// `params` already tags submit-only vs. build-and-submit vs. management,
/// so `gateway_submit` just forwards it to [`gateway_handler::Handler`]
/// unchanged and returns the response envelope verbatim, success or
/// failure, as the jsonrpsee success payload (see `server.rs`).
#[rpc(server, namespace = "gateway")]
pub trait GatewayApi {
    /// Submit a request: `{ params, headers }` in, `{ success, data, error? }` out.
    #[method(name = "submit")]
    async fn submit(&self, params: Value, headers: HeaderMap) -> RpcResult<Value>;
}

/// `Map<string, string[]>` per spec §6's inbound envelope headers field.
pub type HeaderMap = std::collections::HashMap<String, Vec<String>>;
