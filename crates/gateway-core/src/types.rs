use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

// ── Network ──────────────────────────────────────────────────────────────────

/// The Stellar network a request targets. Used as the namespace prefix on
/// every KV key (`<net>:channel:...`, `<net>:api-key-fees:...`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }

    pub fn parse(s: &str) -> Result<Self, GatewayError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(GatewayError::UnsupportedNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Identifier newtypes ──────────────────────────────────────────────────────

/// A normalized channel-account/relayer identifier: trimmed, lowercased,
/// restricted to `[a-z0-9:_-]`, length <=128.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelayerId(pub String);

impl RelayerId {
    /// Normalizes per spec §3 ("Channel Membership"). Returns `None` if the
    /// result would be empty or exceed the length bound.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().to_ascii_lowercase();
        if trimmed.is_empty() || trimmed.len() > 128 {
            return None;
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-'))
        {
            return None;
        }
        Some(RelayerId(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A contract id as it appears in `LIMITED_CONTRACTS` / a host-function
/// invocation. Upper-cased for comparison (per spec §4.2's
/// `LIMITED_CONTRACTS` effect: "Comma-separated contract ids, upper-cased").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId(pub String);

impl ContractId {
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().to_ascii_uppercase();
        if trimmed.is_empty() || trimmed.len() > 64 {
            return None;
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ContractId(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A caller's API key, read from the configured header. Trimmed; empty
/// becomes `None` upstream (see `InboundEnvelope::api_key`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiKey(pub String);

impl ApiKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ── Request (tagged variant) ─────────────────────────────────────────────────

/// The internal request shape, decomposed from the inbound JSON per spec §4.3.
#[derive(Debug, Clone)]
pub enum GatewayRequest {
    /// A fully signed transaction envelope, base64-encoded XDR.
    Submit { xdr: String },
    /// An unsigned host-function call.
    Build {
        func: String,
        auth: Vec<String>,
        return_tx_hash: bool,
    },
}

// ── Transaction result summary ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Confirmed,
    Pending,
    Failed,
    Readonly,
}

/// `{transactionId?, hash?, status, returnValue?, latestLedger?, error?}` —
/// the shape every pipeline path converges on before being folded into the
/// response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxResultSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub status: TxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_ledger: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TxResultSummary {
    pub fn readonly(return_value: String, latest_ledger: Option<u32>) -> Self {
        Self {
            transaction_id: None,
            hash: None,
            status: TxStatus::Readonly,
            return_value: Some(return_value),
            latest_ledger,
            error: None,
        }
    }
}

// ── Inbound / outbound envelopes ─────────────────────────────────────────────

/// `{ params: <Request>, headers: Map<string, string[]> }` per spec §6.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEnvelope {
    pub params: Value,
    #[serde(default)]
    pub headers: HashMap<String, Vec<String>>,
}

impl InboundEnvelope {
    /// First value of the given (already-lowercased) header name, trimmed,
    /// empty mapped to `None`.
    pub fn header_value(&self, name: &str) -> Option<String> {
        let lower = name.to_ascii_lowercase();
        let values = self
            .headers
            .iter()
            .find(|(k, _)| k.to_ascii_lowercase() == lower)
            .map(|(_, v)| v)?;
        let first = values.first()?.trim();
        if first.is_empty() {
            None
        } else {
            Some(first.to_string())
        }
    }

    pub fn api_key(&self, header_name: &str) -> Option<ApiKey> {
        self.header_value(header_name).map(ApiKey)
    }
}

/// `{ success, data, error?, metadata? }` per spec §6.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEnvelope {
    pub success: bool,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutboundEnvelope {
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).unwrap_or(Value::Null),
            error: None,
        }
    }

    pub fn err(e: &GatewayError) -> Self {
        let mut data = serde_json::Map::new();
        data.insert("code".to_string(), Value::String(e.code().to_string()));
        if let Some(details) = e.details() {
            data.insert("details".to_string(), details);
        }
        Self {
            success: false,
            data: Value::Object(data),
            error: Some(e.public_message()),
        }
    }
}
