//! Dynamic fee calculation, per spec §4.7. A pure function over an
//! assembled inner transaction — no KV/chain I/O.

use std::collections::HashSet;

use gateway_core::constants::NON_SOROBAN_FEE;
use gateway_core::types::ContractId;
use gateway_core::xdr::InnerTransaction;

/// `maxFee = (resourceFee > 0 ? resourceFee : NON_SOROBAN_FEE) + inclusionFee`,
/// exactly the pseudocode in spec §4.7. Resource-fee arithmetic runs
/// through `u128` (the "arbitrary precision" the spec calls for — Soroban
/// resource fees fit comfortably within it), with a checked narrowing to
/// `u64` for the final fee.
pub fn calculate_fee(
    tx: &InnerTransaction,
    limited_contracts: &HashSet<ContractId>,
    inclusion_fee_default: u64,
    inclusion_fee_limited: u64,
) -> u64 {
    let resource_fee: u128 = tx
        .soroban_data
        .as_ref()
        .map(|d| d.resource_fee as u128)
        .unwrap_or(0);

    let contract_id = extract_contract_id(tx);
    let is_limited = contract_id
        .as_ref()
        .map(|c| limited_contracts.contains(c))
        .unwrap_or(false);
    let inclusion_fee = if is_limited {
        inclusion_fee_limited
    } else {
        inclusion_fee_default
    };

    let base = if resource_fee > 0 {
        resource_fee
    } else {
        NON_SOROBAN_FEE as u128
    };

    (base + inclusion_fee as u128).min(u64::MAX as u128) as u64
}

/// Tolerates malformed envelopes: any failure to read a contract id yields
/// `None` rather than propagating, matching spec §4.7 ("any exception ⇒
/// no contract id, default inclusion"). The gateway's `InnerTransaction`
/// is already a validated, strongly typed struct by the time it reaches
/// here, so the only "failure" mode is an absent contract id on the
/// invoked function itself.
pub fn extract_contract_id(tx: &InnerTransaction) -> Option<ContractId> {
    tx.contract_id().and_then(|raw| ContractId::normalize(&raw))
}
