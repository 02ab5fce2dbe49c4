//! gateway-fees
//!
//! Dynamic fee calculation (spec §4.7) and the per-API-key fee budget
//! tracker (spec §4.8): small, pure, directly-testable helpers layered
//! over a persisted, lock-guarded budget.

pub mod calculator;
pub mod tracker;

pub use calculator::{calculate_fee, extract_contract_id};
pub use tracker::{FeeTracker, UsageInfo};
