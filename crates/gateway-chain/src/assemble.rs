//! Building the throwaway simulation transaction and assembling the real
//! inner transaction from a cached simulation result, per spec §4.6.

use gateway_core::constants::{ASSEMBLED_TX_FEE, SIMULATION_TX_FEE, TIME_BOUNDS_WINDOW_SECONDS};
use gateway_core::error::GatewayError;
use gateway_core::xdr::{
    AuthorizationEntry, HostFunctionValue, InnerTransaction, InvokeHostFunctionOp, TimeBounds,
};

use crate::SimulateResponse;

/// A throwaway transaction sourced from the fund address at sequence `0`,
/// used purely to obtain a simulation (spec §4.6 "Simulate").
pub fn build_simulation_transaction(
    fund_address: &str,
    func: &HostFunctionValue,
    auth: &[AuthorizationEntry],
    now_unix: i64,
) -> InnerTransaction {
    InnerTransaction {
        source: fund_address.to_string(),
        sequence: "0".to_string(),
        fee: SIMULATION_TX_FEE,
        time_bounds: TimeBounds {
            min_time: 0,
            max_time: now_unix + TIME_BOUNDS_WINDOW_SECONDS,
        },
        operation: InvokeHostFunctionOp {
            host_function: func.clone(),
            auth: auth.to_vec(),
        },
        soroban_data: None,
    }
}

/// Assemble the real inner transaction sourced from the channel account,
/// applying the cached simulation's resource footprint/fee. Any missing
/// piece of the simulation is an `ASSEMBLY_FAILED` (spec §4.6).
pub fn assemble_inner_transaction(
    channel_address: &str,
    sequence: &str,
    func: &HostFunctionValue,
    auth: &[AuthorizationEntry],
    sim: &SimulateResponse,
    now_unix: i64,
) -> Result<InnerTransaction, GatewayError> {
    let soroban_data = sim.transaction_data.clone().ok_or_else(|| {
        GatewayError::AssemblyFailed("simulation carried no transaction data to attach".to_string())
    })?;

    Ok(InnerTransaction {
        source: channel_address.to_string(),
        sequence: sequence.to_string(),
        fee: ASSEMBLED_TX_FEE,
        time_bounds: TimeBounds {
            min_time: 0,
            max_time: now_unix + TIME_BOUNDS_WINDOW_SECONDS,
        },
        operation: InvokeHostFunctionOp {
            host_function: func.clone(),
            auth: auth.to_vec(),
        },
        soroban_data: Some(soroban_data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::xdr::{LedgerFootprint, SorobanTransactionData};

    fn func() -> HostFunctionValue {
        HostFunctionValue {
            contract_id: Some("CONTRACTX".to_string()),
            function_name: "transfer".to_string(),
            args: vec![],
        }
    }

    #[test]
    fn assemble_fails_without_transaction_data() {
        let sim = SimulateResponse::default();
        let err = assemble_inner_transaction("CCHANNEL", "42", &func(), &[], &sim, 1000).unwrap_err();
        assert_eq!(err.code(), "ASSEMBLY_FAILED");
    }

    #[test]
    fn assemble_attaches_footprint_and_fee() {
        let sim = SimulateResponse {
            transaction_data: Some(SorobanTransactionData {
                resource_fee: 5000,
                footprint: LedgerFootprint {
                    read_only: vec![],
                    read_write: vec!["k".to_string()],
                },
            }),
            ..Default::default()
        };
        let tx = assemble_inner_transaction("CCHANNEL", "42", &func(), &[], &sim, 1000).unwrap();
        assert_eq!(tx.source, "CCHANNEL");
        assert_eq!(tx.sequence, "42");
        assert_eq!(tx.soroban_data.unwrap().resource_fee, 5000);
        assert_eq!(tx.time_bounds.max_time, 1000 + TIME_BOUNDS_WINDOW_SECONDS);
    }
}
