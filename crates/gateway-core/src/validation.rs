//! Request-shape validation: exactly one of `{xdr}` or `{func, auth}`, no
//! stray keys, no source-account-credentialed auth entries. Follows the
//! same validating-constructor style used throughout the workspace: reject
//! at the boundary, return a typed error, never partially accept.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};
use crate::types::GatewayRequest;
use crate::xdr::{AuthorizationEntry, HostFunctionValue};

const SUBMIT_KEYS: [&str; 1] = ["xdr"];
const BUILD_KEYS: [&str; 3] = ["func", "auth", "returnTxHash"];

fn invalid(msg: impl Into<String>) -> GatewayError {
    GatewayError::InvalidParams(msg.into())
}

/// Decomposes the raw `params` object into a [`GatewayRequest`]. Any decode
/// failure along the way — malformed JSON shape, unreadable base64, a
/// source-account auth entry — produces `INVALID_PARAMS`.
pub fn validate_request(raw: &Value) -> GatewayResult<GatewayRequest> {
    let obj = raw.as_object().ok_or_else(|| invalid("params must be an object"))?;
    let keys: HashSet<&str> = obj.keys().map(String::as_str).collect();

    let has_xdr = keys.contains("xdr");
    let has_func = keys.contains("func");

    if has_xdr == has_func {
        return Err(invalid(
            "request must be exactly one of {xdr} or {func, auth}",
        ));
    }

    if has_xdr {
        return validate_submit(obj, &keys);
    }
    validate_build(obj, &keys)
}

fn validate_submit(
    obj: &serde_json::Map<String, Value>,
    keys: &HashSet<&str>,
) -> GatewayResult<GatewayRequest> {
    let allowed: HashSet<&str> = SUBMIT_KEYS.into_iter().collect();
    if !keys.is_subset(&allowed) {
        return Err(invalid("xdr request accepts no other keys"));
    }
    let xdr = obj["xdr"]
        .as_str()
        .ok_or_else(|| invalid("xdr must be a string"))?;
    Ok(GatewayRequest::Submit {
        xdr: xdr.to_string(),
    })
}

fn validate_build(
    obj: &serde_json::Map<String, Value>,
    keys: &HashSet<&str>,
) -> GatewayResult<GatewayRequest> {
    let allowed: HashSet<&str> = BUILD_KEYS.into_iter().collect();
    if !keys.is_subset(&allowed) {
        return Err(invalid("func/auth request carries an unexpected key"));
    }

    let func = obj["func"]
        .as_str()
        .ok_or_else(|| invalid("func must be a base64 string"))?;
    HostFunctionValue::from_base64(func).map_err(|e| invalid(format!("invalid func: {e}")))?;

    let auth_raw = obj
        .get("auth")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("auth must be an array of base64 strings"))?;

    let mut auth = Vec::with_capacity(auth_raw.len());
    for entry in auth_raw {
        let encoded = entry
            .as_str()
            .ok_or_else(|| invalid("auth entries must be strings"))?;
        let decoded = AuthorizationEntry::from_base64(encoded)
            .map_err(|e| invalid(format!("invalid auth entry: {e}")))?;
        if decoded.is_source_account() {
            return Err(invalid(
                "source-account credentials are incompatible with channel-signed transactions",
            ));
        }
        auth.push(encoded.to_string());
    }

    let return_tx_hash = obj
        .get("returnTxHash")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(GatewayRequest::Build {
        func: func.to_string(),
        auth,
        return_tx_hash,
    })
}
