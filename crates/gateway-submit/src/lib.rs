//! gateway-submit
//!
//! The send/poll/classify half of the simulate→build→sign→submit pipeline
//! (spec §4.9): the [`RelayerRuntime`] collaborator interface, an HTTP
//! sidecar implementation, and [`submit_and_wait`] tying it to the fee
//! tracker.

pub mod mock;
pub mod runtime;
pub mod submit;

pub use mock::MockRelayerRuntime;
pub use runtime::{
    HttpRelayerRuntime, RelayerInfo, RelayerNetworkType, RelayerRuntime, SendTransactionRequest,
    SubmissionHandle, TerminalStatus, TerminalStatusKind,
};
pub use submit::{build_lab_url, sanitize_reason, submit_and_wait, SubmitContext};
