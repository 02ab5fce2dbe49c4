use std::collections::HashSet;
use std::env;

use tracing::warn;

use crate::constants::{
    CONTRACT_CAPACITY_RATIO_DEFAULT, INCLUSION_FEE_DEFAULT, INCLUSION_FEE_LIMITED,
    LOCK_TTL_SECONDS_DEFAULT, LOCK_TTL_SECONDS_MAX, LOCK_TTL_SECONDS_MIN,
};
use crate::error::GatewayError;
use crate::types::{ContractId, Network};

/// Process configuration, parsed from environment variables per spec §4.2.
/// Invalid values fall back to defaults (logged, never an error); missing
/// required variables fail fast with `CONFIG_MISSING`.
#[derive(Debug, Clone)]
pub struct Config {
    pub network: Network,
    pub fund_relayer_id: String,
    pub lock_ttl_seconds: u64,
    pub fee_limit: Option<u64>,
    pub fee_reset_period_ms: Option<u64>,
    pub api_key_header: String,
    pub admin_secret: Option<String>,
    pub limited_contracts: HashSet<ContractId>,
    pub contract_capacity_ratio: f64,
    pub inclusion_fee_default: u64,
    pub inclusion_fee_limited: u64,
}

impl Config {
    /// Parse the process environment. Called once per request, matching
    /// spec §4.2 — cheap enough (a handful of `env::var` lookups) that this
    /// carries no real per-request cost; see `SPEC_FULL.md` §4.2.
    pub fn from_env() -> Result<Self, GatewayError> {
        let network_raw = env::var("NETWORK").map_err(|_| GatewayError::ConfigMissing {
            field: "NETWORK",
        })?;
        let network = Network::parse(&network_raw)?;

        let fund_relayer_id =
            env::var("FUND_RELAYER_ID").map_err(|_| GatewayError::ConfigMissing {
                field: "FUND_RELAYER_ID",
            })?;

        let lock_ttl_seconds = match env::var("LOCK_TTL_SECONDS") {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(v) => v.clamp(LOCK_TTL_SECONDS_MIN, LOCK_TTL_SECONDS_MAX),
                Err(_) => {
                    warn!(value = %raw, "LOCK_TTL_SECONDS invalid, falling back to default");
                    LOCK_TTL_SECONDS_DEFAULT
                }
            },
            Err(_) => LOCK_TTL_SECONDS_DEFAULT,
        };

        let fee_limit = parse_optional_u64("FEE_LIMIT");
        let fee_reset_period_ms = parse_optional_u64("FEE_RESET_PERIOD_SECONDS").map(|s| s * 1000);

        let api_key_header = env::var("API_KEY_HEADER")
            .ok()
            .map(|s| s.to_ascii_lowercase())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| crate::constants::API_KEY_HEADER_DEFAULT.to_string());

        let admin_secret = env::var("PLUGIN_ADMIN_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let limited_contracts = parse_limited_contracts();

        let contract_capacity_ratio = env::var("CONTRACT_CAPACITY_RATIO")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| (0.0..=1.0).contains(v))
            .unwrap_or_else(|| {
                if let Ok(raw) = env::var("CONTRACT_CAPACITY_RATIO") {
                    warn!(value = %raw, "CONTRACT_CAPACITY_RATIO invalid, falling back to default");
                }
                CONTRACT_CAPACITY_RATIO_DEFAULT
            });

        let inclusion_fee_default = parse_optional_u64("INCLUSION_FEE_DEFAULT")
            .unwrap_or(INCLUSION_FEE_DEFAULT);
        let inclusion_fee_limited = parse_optional_u64("INCLUSION_FEE_LIMITED")
            .unwrap_or(INCLUSION_FEE_LIMITED);

        Ok(Config {
            network,
            fund_relayer_id,
            lock_ttl_seconds,
            fee_limit,
            fee_reset_period_ms,
            api_key_header,
            admin_secret,
            limited_contracts,
            contract_capacity_ratio,
            inclusion_fee_default,
            inclusion_fee_limited,
        })
    }
}

fn parse_optional_u64(name: &str) -> Option<u64> {
    match env::var(name) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(%name, value = %raw, "env var invalid integer, ignoring");
                None
            }
        },
        Err(_) => None,
    }
}

fn parse_limited_contracts() -> HashSet<ContractId> {
    let Ok(raw) = env::var("LIMITED_CONTRACTS") else {
        return HashSet::new();
    };
    let mut out = HashSet::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match ContractId::normalize(part) {
            Some(id) => {
                out.insert(id);
            }
            None => {
                warn!(
                    entry = %part,
                    "LIMITED_CONTRACTS entry invalid, falling back to empty set"
                );
                return HashSet::new();
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch
    // them rather than relying on parallel test isolation.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for k in [
            "NETWORK",
            "FUND_RELAYER_ID",
            "LOCK_TTL_SECONDS",
            "FEE_LIMIT",
            "FEE_RESET_PERIOD_SECONDS",
            "API_KEY_HEADER",
            "PLUGIN_ADMIN_SECRET",
            "LIMITED_CONTRACTS",
            "CONTRACT_CAPACITY_RATIO",
            "INCLUSION_FEE_DEFAULT",
            "INCLUSION_FEE_LIMITED",
        ] {
            env::remove_var(k);
        }
    }

    #[test]
    fn missing_required_fails_fast() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let err = Config::from_env().unwrap_err();
        assert_eq!(err.code(), "CONFIG_MISSING");
    }

    #[test]
    fn lock_ttl_clamped_and_invalid_falls_back() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("NETWORK", "testnet");
        env::set_var("FUND_RELAYER_ID", "fund-1");
        env::set_var("LOCK_TTL_SECONDS", "999");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.lock_ttl_seconds, LOCK_TTL_SECONDS_MAX);

        env::set_var("LOCK_TTL_SECONDS", "not-a-number");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.lock_ttl_seconds, LOCK_TTL_SECONDS_DEFAULT);
        clear_all();
    }

    #[test]
    fn limited_contracts_invalid_entry_falls_back_to_empty() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("NETWORK", "mainnet");
        env::set_var("FUND_RELAYER_ID", "fund-1");
        env::set_var("LIMITED_CONTRACTS", "ABC123,not valid!");
        let cfg = Config::from_env().unwrap();
        assert!(cfg.limited_contracts.is_empty());
        clear_all();
    }
}
