use serde_json::{json, Value};
use thiserror::Error;

/// The gateway's single error type. Every fallible operation in every crate
/// in this workspace returns `Result<T, GatewayError>`.
///
/// Each variant maps to exactly one of the wire error codes in the response
/// envelope's `data.code` field (see [`GatewayError::code`]) and an
/// HTTP-style status (see [`GatewayError::status`]), mirroring how the
/// response envelope is specified: `{ success, data, error?, metadata? }`
/// with `data.code` / `data.details` on failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    // ── Configuration (500) ──────────────────────────────────────────────────
    #[error("missing required configuration: {field}")]
    ConfigMissing { field: &'static str },

    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    // ── Client (400) ─────────────────────────────────────────────────────────
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("invalid xdr: {0}")]
    InvalidXdr(String),

    #[error("invalid envelope type: expected a regular transaction envelope")]
    InvalidEnvelopeType,

    #[error("invalid time bounds: {0}")]
    InvalidTimeBounds(String),

    #[error("fee {fee} exceeds resourceFee {resource_fee} + 201")]
    FeeMismatch { fee: u64, resource_fee: u64 },

    #[error("time bounds too far in the future: maxTime {max_time} exceeds now+120 ({limit})")]
    TimeboundsTooFar { max_time: i64, limit: i64 },

    #[error("invalid unsigned xdr: {0}")]
    InvalidUnsignedXdr(String),

    #[error("invalid signature")]
    InvalidSignature,

    // ── Capacity (503) ───────────────────────────────────────────────────────
    #[error("no channel accounts configured")]
    NoChannelsConfigured,

    #[error("channel pool at capacity: {reason}")]
    PoolCapacity {
        reason: &'static str,
        total_channels: usize,
        /// `busyCandidates` for the unlimited reason, `candidateChannels` for
        /// the limited-contract reason — the field the spec's two scenarios
        /// name differently but which occupies the same slot.
        candidates: usize,
    },

    #[error("relayer unavailable: {0}")]
    RelayerUnavailable(String),

    #[error("relayer not found or not a stellar account: {0}")]
    RelayerNotFound(String),

    // ── Upstream (502) ───────────────────────────────────────────────────────
    #[error("failed to get sequence number: {0}")]
    FailedToGetSequence(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("simulation network error: {0}")]
    SimulationNetworkError(String),

    #[error("simulation RPC failure: {0}")]
    SimulationRpcFailure(String),

    // ── Client (400), simulation outcomes ───────────────────────────────────
    #[error("simulation failed: {0}")]
    SimulationFailed(String),

    #[error("signed-auth validation failed during simulation: {0}")]
    SimulationSignedAuthValidationFailed(String),

    // ── Assembly (500) ───────────────────────────────────────────────────────
    #[error("assembly failed: {0}")]
    AssemblyFailed(String),

    // ── On-chain (400) ───────────────────────────────────────────────────────
    #[error("transaction failed on chain: {reason}")]
    OnchainFailed {
        status: String,
        reason: String,
        id: Option<String>,
        hash: Option<String>,
        result_code: Option<String>,
        lab_url: String,
    },

    // ── Timeout (504) ────────────────────────────────────────────────────────
    #[error("timed out waiting for transaction confirmation")]
    WaitTimeout {
        id: Option<String>,
        hash: Option<String>,
    },

    // ── Budget (429) ─────────────────────────────────────────────────────────
    #[error("fee limit exceeded")]
    FeeLimitExceeded {
        consumed: u64,
        fee: u64,
        remaining: u64,
        limit: u64,
    },

    #[error("API key required")]
    ApiKeyRequired,

    // ── Authentication (401/403) ─────────────────────────────────────────────
    #[error("management plane disabled")]
    ManagementDisabled,

    #[error("unauthorized")]
    Unauthorized,

    // ── Conflict (409) ───────────────────────────────────────────────────────
    #[error("cannot remove locked channel accounts: {0:?}")]
    LockedConflict(Vec<String>),

    // ── Management-plane payload errors (400) ───────────────────────────────
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid management action: {0}")]
    InvalidAction(String),

    // ── Storage (500), surfaced only on the management plane per spec §7 ────
    #[error("kv error: {0}")]
    KvError(String),
}

impl GatewayError {
    pub fn kv(msg: impl Into<String>) -> Self {
        GatewayError::KvError(msg.into())
    }

    /// The wire error code, exactly one of the identifiers listed in spec §6.
    pub fn code(&self) -> &'static str {
        use GatewayError::*;
        match self {
            ConfigMissing { .. } => "CONFIG_MISSING",
            UnsupportedNetwork(_) => "UNSUPPORTED_NETWORK",
            InvalidParams(_) => "INVALID_PARAMS",
            InvalidXdr(_) => "INVALID_XDR",
            InvalidEnvelopeType => "INVALID_ENVELOPE_TYPE",
            InvalidTimeBounds(_) => "INVALID_TIME_BOUNDS",
            FeeMismatch { .. } => "FEE_MISMATCH",
            TimeboundsTooFar { .. } => "TIMEBOUNDS_TOO_FAR",
            InvalidUnsignedXdr(_) => "INVALID_UNSIGNED_XDR",
            InvalidSignature => "INVALID_SIGNATURE",
            NoChannelsConfigured => "NO_CHANNELS_CONFIGURED",
            PoolCapacity { .. } => "POOL_CAPACITY",
            RelayerUnavailable(_) => "RELAYER_UNAVAILABLE",
            RelayerNotFound(_) => "RELAYER_NOT_FOUND",
            FailedToGetSequence(_) => "FAILED_TO_GET_SEQUENCE",
            AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            SimulationNetworkError(_) => "SIMULATION_NETWORK_ERROR",
            SimulationRpcFailure(_) => "SIMULATION_RPC_FAILURE",
            SimulationFailed(_) => "SIMULATION_FAILED",
            SimulationSignedAuthValidationFailed(_) => "SIMULATION_SIGNED_AUTH_VALIDATION_FAILED",
            AssemblyFailed(_) => "ASSEMBLY_FAILED",
            OnchainFailed { .. } => "ONCHAIN_FAILED",
            WaitTimeout { .. } => "WAIT_TIMEOUT",
            FeeLimitExceeded { .. } => "FEE_LIMIT_EXCEEDED",
            ApiKeyRequired => "API_KEY_REQUIRED",
            ManagementDisabled => "MANAGEMENT_DISABLED",
            Unauthorized => "UNAUTHORIZED",
            LockedConflict(_) => "LOCKED_CONFLICT",
            InvalidPayload(_) => "INVALID_PAYLOAD",
            InvalidAction(_) => "INVALID_ACTION",
            KvError(_) => "KV_ERROR",
        }
    }

    /// HTTP-style status code per the taxonomy in spec §7.
    pub fn status(&self) -> u16 {
        use GatewayError::*;
        match self {
            ConfigMissing { .. } | UnsupportedNetwork(_) => 500,
            InvalidParams(_)
            | InvalidXdr(_)
            | InvalidEnvelopeType
            | InvalidTimeBounds(_)
            | FeeMismatch { .. }
            | TimeboundsTooFar { .. }
            | InvalidUnsignedXdr(_)
            | InvalidSignature
            | SimulationFailed(_)
            | SimulationSignedAuthValidationFailed(_)
            | OnchainFailed { .. }
            | InvalidPayload(_)
            | InvalidAction(_) => 400,
            ApiKeyRequired => 400,
            FeeLimitExceeded { .. } => 429,
            Unauthorized => 401,
            ManagementDisabled => 403,
            LockedConflict(_) => 409,
            NoChannelsConfigured | PoolCapacity { .. } => 503,
            RelayerUnavailable(_) => 503,
            RelayerNotFound(_) => 400,
            FailedToGetSequence(_)
            | AccountNotFound(_)
            | SimulationNetworkError(_)
            | SimulationRpcFailure(_) => 502,
            AssemblyFailed(_) => 500,
            WaitTimeout { .. } => 504,
            KvError(_) => 500,
        }
    }

    /// Structured `data.details` for the response envelope, or `None` when
    /// the error carries nothing beyond its message.
    pub fn details(&self) -> Option<Value> {
        use GatewayError::*;
        match self {
            ConfigMissing { field } => Some(json!({ "field": field })),
            PoolCapacity { reason, total_channels, candidates } => {
                let candidates_key = if *reason == "limited_contract_capacity" {
                    "candidateChannels"
                } else {
                    "busyCandidates"
                };
                let mut obj = serde_json::Map::new();
                obj.insert("reason".to_string(), json!(reason));
                obj.insert("totalChannels".to_string(), json!(total_channels));
                obj.insert(candidates_key.to_string(), json!(candidates));
                Some(Value::Object(obj))
            }
            FeeMismatch { fee, resource_fee } => {
                Some(json!({ "fee": fee, "resourceFee": resource_fee }))
            }
            TimeboundsTooFar { max_time, limit } => {
                Some(json!({ "maxTime": max_time, "limit": limit }))
            }
            OnchainFailed { status, reason, id, hash, result_code, lab_url } => Some(json!({
                "status": status,
                "reason": reason,
                "id": id,
                "hash": hash,
                "resultCode": result_code,
                "labUrl": lab_url,
            })),
            WaitTimeout { id, hash } => Some(json!({ "id": id, "hash": hash })),
            FeeLimitExceeded { consumed, fee, remaining, limit } => Some(json!({
                "consumed": consumed,
                "fee": fee,
                "remaining": remaining,
                "limit": limit,
            })),
            LockedConflict(locked) => Some(json!({ "locked": locked })),
            _ => None,
        }
    }

    /// Sanitized top-level `error` message: never leaks internal addresses,
    /// truncated to 100 chars, sentinel tokens stripped.
    pub fn public_message(&self) -> String {
        sanitize_message(&self.to_string())
    }
}

/// Strip sentinel/internal tokens and cap length, used both for
/// `GatewayError::public_message` and for provider-supplied raw text that
/// ends up in error details (see `gateway-submit::sanitize_reason`).
pub fn sanitize_message(raw: &str) -> String {
    const SENTINELS: [&str; 3] = ["internal://", "0x7f", "AccountId(" /* debug leakage guard */];
    let mut msg = raw.to_string();
    for s in SENTINELS {
        msg = msg.replace(s, "");
    }
    if msg.len() > 200 {
        msg.truncate(200);
    }
    msg
}

pub type GatewayResult<T> = Result<T, GatewayError>;
