//! Simulation-error classification and the read-only predicate, per spec
//! §4.6. The error-message parsing rules are implemented with plain string
//! scanning rather than a `regex` dependency: the grammar here (bracketed
//! array / quoted string / first line) is simple enough that a regex would
//! add a dependency without buying clarity.

use gateway_core::error::GatewayError;

use crate::SimulateResponse;

/// Substrings that, per spec §4.6, indicate an enforce-mode signed-auth
/// validation failure rather than a generic simulation failure.
const AUTH_FAILURE_MARKERS: [&str; 7] = [
    "Error(Auth,",
    "require_auth",
    "invalid signature",
    "signature has expired",
    "signature verification failed",
    "bad_signature",
    "tx_bad_auth",
];

/// Extract the human-readable core of a raw simulation error message:
/// prefer a bracketed `data:[...]` array, else a quoted `data:"..."`
/// string, else the first trimmed line. A candidate of length <=3 is
/// skipped in favor of the next rule; if every rule yields something that
/// short, the whole trimmed input is used as a last resort.
pub fn parse_simulation_error_message(raw: &str) -> String {
    let mut candidates: Vec<String> = Vec::new();

    if let Some(start) = raw.find("data:[") {
        let after = &raw[start + "data:[".len()..];
        if let Some(end) = after.find(']') {
            candidates.push(clean_quoted(&after[..end]));
        }
    }
    if let Some(start) = raw.find("data:\"") {
        let after = &raw[start + "data:\"".len()..];
        if let Some(end) = after.find('"') {
            candidates.push(after[..end].to_string());
        }
    }
    candidates.push(raw.lines().next().unwrap_or("").trim().to_string());

    candidates
        .into_iter()
        .find(|c| c.len() > 3)
        .unwrap_or_else(|| raw.trim().to_string())
}

fn clean_quoted(s: &str) -> String {
    s.trim().trim_matches('"').trim().to_string()
}

/// Extract the `(X,Y)` type tag from an `Error(X,Y)` occurrence, if any.
pub fn extract_error_tag(raw: &str) -> Option<String> {
    let start = raw.find("Error(")?;
    let after = &raw[start + "Error(".len()..];
    let end = after.find(')')?;
    Some(after[..end].trim().to_string())
}

/// Classify a raw simulation `error` field into the appropriate
/// `GatewayError` variant, appending the `Error(X,Y)` tag in parentheses
/// when present (spec §4.6 / scenario 8).
pub fn classify_simulation_error(raw: &str) -> GatewayError {
    let message = parse_simulation_error_message(raw);
    let full = match extract_error_tag(raw) {
        Some(tag) => format!("{message} ({tag})"),
        None => message,
    };

    if AUTH_FAILURE_MARKERS.iter().any(|m| raw.contains(m)) {
        GatewayError::SimulationSignedAuthValidationFailed(full)
    } else {
        GatewayError::SimulationFailed(full)
    }
}

/// True iff the call is read-only: no auth entries in the first result,
/// and the attached Soroban transaction data's read-write footprint is
/// empty. A missing or undecodable footprint is treated as *not*
/// read-only (spec §4.6).
pub fn is_read_only(sim: &SimulateResponse) -> bool {
    let Some(first) = sim.results.first() else {
        return false;
    };
    if !first.auth.is_empty() {
        return false;
    }
    match &sim.transaction_data {
        Some(data) => data.footprint.is_read_write_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::xdr::{AuthorizationEntry, LedgerFootprint, SorobanTransactionData};

    #[test]
    fn prefers_bracketed_data_array() {
        let raw = r#"HostError: Error(Contract, #1)\ndata:["insufficient balance"]"#;
        assert_eq!(parse_simulation_error_message(raw), "insufficient balance");
    }

    #[test]
    fn falls_back_to_first_line_when_no_data_field() {
        let raw = "custom contract panic\nmore detail here";
        assert_eq!(parse_simulation_error_message(raw), "custom contract panic");
    }

    #[test]
    fn short_candidates_are_skipped() {
        let raw = "data:[\"no\"]\nactual failure description line";
        // "no" has length 2, skipped in favor of the first-line fallback.
        assert_eq!(
            parse_simulation_error_message(raw),
            "actual failure description line"
        );
    }

    #[test]
    fn enforce_auth_mismatch_is_classified_and_tagged() {
        let raw = "HostError: Error(Auth, InvalidInput)\ndata:[\"signature has expired\"]";
        let err = classify_simulation_error(raw);
        assert_eq!(err.code(), "SIMULATION_SIGNED_AUTH_VALIDATION_FAILED");
        assert!(err.to_string().contains("signature has expired (Auth, InvalidInput)"));
    }

    #[test]
    fn generic_failure_is_not_misclassified() {
        let raw = "HostError: Error(Contract, #5)\ndata:[\"division by zero\"]";
        let err = classify_simulation_error(raw);
        assert_eq!(err.code(), "SIMULATION_FAILED");
    }

    #[test]
    fn read_only_requires_empty_auth_and_empty_read_write() {
        let sim = SimulateResponse {
            results: vec![crate::SimulateResult {
                xdr: "ret".to_string(),
                auth: vec![],
            }],
            transaction_data: Some(SorobanTransactionData {
                resource_fee: 0,
                footprint: LedgerFootprint {
                    read_only: vec!["k1".to_string()],
                    read_write: vec![],
                },
            }),
            ..Default::default()
        };
        assert!(is_read_only(&sim));
    }

    #[test]
    fn read_only_false_when_auth_present() {
        let sim = SimulateResponse {
            results: vec![crate::SimulateResult {
                xdr: "ret".to_string(),
                auth: vec![AuthorizationEntry::SourceAccount { signature: None }],
            }],
            transaction_data: Some(SorobanTransactionData {
                resource_fee: 0,
                footprint: LedgerFootprint::default(),
            }),
            ..Default::default()
        };
        assert!(!is_read_only(&sim));
    }

    #[test]
    fn read_only_false_when_footprint_missing() {
        let sim = SimulateResponse {
            results: vec![crate::SimulateResult {
                xdr: "ret".to_string(),
                auth: vec![],
            }],
            transaction_data: None,
            ..Default::default()
        };
        assert!(!is_read_only(&sim));
    }
}
