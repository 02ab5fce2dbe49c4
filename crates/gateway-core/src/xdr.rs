//! Minimal, gateway-local stand-ins for the Stellar/Soroban wire types.
//!
//! The real blockchain SDK — the thing that actually serializes XDR and
//! performs cryptographic signing — is explicitly out of scope (spec §1):
//! "the blockchain SDK that serializes transaction envelopes and performs
//! cryptographic signing" is listed as an external collaborator. Everything
//! in this module is therefore a small, JSON-shaped approximation of the
//! XDR concepts the gateway's *business logic* needs to reason about
//! (envelope type, time bounds, Soroban footprint, resource fee, auth
//! credential kind) — base64-encoded JSON rather than true binary XDR. A
//! production deployment wires a real `stellar-xdr`-backed codec behind
//! these same shapes; see `DESIGN.md` for this Open Question's resolution.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

fn encode_json<T: Serialize>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).expect("xdr-ish types always serialize");
    BASE64.encode(bytes)
}

fn decode_json<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T, GatewayError> {
    let bytes = BASE64
        .decode(raw.trim())
        .map_err(|e| GatewayError::InvalidXdr(format!("invalid base64: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| GatewayError::InvalidXdr(format!("invalid payload: {e}")))
}

// ── Host function / authorization ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostFunctionValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    pub function_name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl HostFunctionValue {
    pub fn from_base64(raw: &str) -> Result<Self, GatewayError> {
        decode_json(raw)
    }

    pub fn to_base64(&self) -> String {
        encode_json(self)
    }
}

/// Authorization-entry credential kind. Source-account credentials are
/// incompatible with channel-signed transactions (spec §4.3) because the
/// channel account, not the request's original source, ends up signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "credentials", rename_all = "snake_case")]
pub enum AuthorizationEntry {
    SourceAccount {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    Address {
        address: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nonce: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
}

impl AuthorizationEntry {
    pub fn from_base64(raw: &str) -> Result<Self, GatewayError> {
        decode_json(raw)
    }

    pub fn to_base64(&self) -> String {
        encode_json(self)
    }

    pub fn is_source_account(&self) -> bool {
        matches!(self, AuthorizationEntry::SourceAccount { .. })
    }
}

// ── Ledger footprint / Soroban transaction data ─────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerFootprint {
    #[serde(default)]
    pub read_only: Vec<String>,
    #[serde(default)]
    pub read_write: Vec<String>,
}

impl LedgerFootprint {
    pub fn is_read_write_empty(&self) -> bool {
        self.read_write.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SorobanTransactionData {
    pub resource_fee: u64,
    #[serde(default)]
    pub footprint: LedgerFootprint,
}

// ── Inner transaction ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeBounds {
    pub min_time: i64,
    pub max_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeHostFunctionOp {
    pub host_function: HostFunctionValue,
    #[serde(default)]
    pub auth: Vec<AuthorizationEntry>,
}

/// The inner (to-be-fee-bumped) transaction: what the channel account
/// signs. Mirrors the fields spec §4.6's "Simulate"/"Assemble" steps name
/// explicitly (source, sequence, fee, time bounds, one invoke-host-function
/// operation, optional attached Soroban resource data).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnerTransaction {
    pub source: String,
    /// Decimal string — sequence numbers are handled as arbitrary-precision
    /// text throughout the gateway (see `gateway-sequence`), never as a
    /// fixed-width integer.
    pub sequence: String,
    pub fee: u64,
    pub time_bounds: TimeBounds,
    pub operation: InvokeHostFunctionOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soroban_data: Option<SorobanTransactionData>,
}

impl InnerTransaction {
    pub fn contract_id(&self) -> Option<String> {
        self.operation.host_function.contract_id.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeType {
    Regular,
    FeeBump,
}

/// The outer envelope as submitted by a caller in the submit-only path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub envelope_type: EnvelopeType,
    pub signed: bool,
    pub inner: InnerTransaction,
    #[serde(default)]
    pub signatures: Vec<String>,
}

impl TransactionEnvelope {
    pub fn from_base64(raw: &str) -> Result<Self, GatewayError> {
        decode_json(raw)
    }

    pub fn to_base64(&self) -> String {
        encode_json(self)
    }

    /// True when the envelope carries exactly one invoke-host-function
    /// operation and no signatures — spec §4.11's "unsigned envelope
    /// decomposed into func+auth" case.
    pub fn is_unsigned_single_invoke(&self) -> bool {
        !self.signed && self.signatures.is_empty()
    }
}

// ── Ledger entries (chain RPC collaborator) ─────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerKey {
    Account { address: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountEntry {
    pub address: String,
    pub sequence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: LedgerKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountEntry>,
}

pub fn account_ledger_key(address: &str) -> LedgerKey {
    LedgerKey::Account {
        address: address.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_function_round_trips_through_base64() {
        let hf = HostFunctionValue {
            contract_id: Some("CONTRACT123".to_string()),
            function_name: "transfer".to_string(),
            args: vec![Value::String("alice".into())],
        };
        let encoded = hf.to_base64();
        let decoded = HostFunctionValue::from_base64(&encoded).unwrap();
        assert_eq!(decoded.contract_id, hf.contract_id);
        assert_eq!(decoded.function_name, hf.function_name);
    }

    #[test]
    fn source_account_auth_entry_is_detected() {
        let entry = AuthorizationEntry::SourceAccount { signature: None };
        assert!(entry.is_source_account());
        let encoded = entry.to_base64();
        let decoded = AuthorizationEntry::from_base64(&encoded).unwrap();
        assert!(decoded.is_source_account());
    }

    #[test]
    fn address_auth_entry_is_not_source_account() {
        let entry = AuthorizationEntry::Address {
            address: "GADDRESS".to_string(),
            nonce: Some(1),
            signature: None,
        };
        assert!(!entry.is_source_account());
    }
}
