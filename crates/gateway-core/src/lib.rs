//! gateway-core
//!
//! Shared vocabulary for every other crate in the workspace: configuration,
//! the error enum, network/identifier newtypes, the inbound/outbound
//! envelopes, the gateway-local XDR-ish stand-ins, and request validation.
//! This is the dependency-free base crate everything else in the workspace
//! builds on.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
pub mod validation;
pub mod xdr;

pub use config::Config;
pub use error::{GatewayError, GatewayResult};
pub use types::{
    ApiKey, ContractId, GatewayRequest, InboundEnvelope, Network, OutboundEnvelope, RelayerId,
    TxResultSummary, TxStatus,
};
