//! Defaults and fixed protocol numbers named throughout spec.md. Kept in one
//! place so a reader can find every magic number here rather than scattered
//! across call sites.

/// Clamp bounds and default for `LOCK_TTL_SECONDS` (spec §4.2 / §3).
pub const LOCK_TTL_SECONDS_MIN: u64 = 3;
pub const LOCK_TTL_SECONDS_MAX: u64 = 30;
pub const LOCK_TTL_SECONDS_DEFAULT: u64 = 30;

/// Pool global-mutex TTL (spec §3, "Pool Global Mutex").
pub const POOL_MUTEX_TTL_SECONDS: u64 = 1;

/// Channel-pool acquire retry bound and jitter range (spec §4.4).
pub const MAX_SPINS: u32 = 30;
pub const SPIN_BACKOFF_MIN_MS: u64 = 10;
pub const SPIN_BACKOFF_MAX_MS: u64 = 30;

/// Sequence-cache max age before a chain re-fetch is required (spec §3).
pub const SEQUENCE_MAX_AGE_MS_DEFAULT: u64 = 120_000;

/// Default contract-capacity partition ratio (spec §4.2).
pub const CONTRACT_CAPACITY_RATIO_DEFAULT: f64 = 0.8;

/// Default Soroban inclusion fees, in stroops (spec §4.2).
pub const INCLUSION_FEE_DEFAULT: u64 = 203;
pub const INCLUSION_FEE_LIMITED: u64 = 201;

/// Flat fee charged for a non-Soroban (classic) operation (spec §4.7).
pub const NON_SOROBAN_FEE: u64 = 100_000;

/// The submit-only sanity-check offset: `fee <= resourceFee + offset`.
/// Spec §9 Open Questions: the source hard-codes `201`, which happens to
/// equal `INCLUSION_FEE_LIMITED` with offset 0 — kept as its own named
/// constant rather than reusing `INCLUSION_FEE_LIMITED` so a future change
/// to the limited-tier fee doesn't silently change this unrelated check.
pub const SUBMIT_ONLY_FEE_SANITY_OFFSET: u64 = 201;

/// Throwaway simulation transaction fee (spec §4.6).
pub const SIMULATION_TX_FEE: u64 = 100;

/// Inner transaction fee used during assembly (spec §4.6).
pub const ASSEMBLED_TX_FEE: u64 = 100;

/// Time-bounds window applied to simulation and assembled transactions:
/// `[0, now + TIME_BOUNDS_WINDOW_SECONDS]` (spec §4.6 / §4.11).
pub const TIME_BOUNDS_WINDOW_SECONDS: i64 = 120;

/// Submit-and-wait poll cadence and hard timeout (spec §4.9).
pub const WAIT_POLL_INTERVAL_MS: u64 = 500;
pub const WAIT_TIMEOUT_MS: u64 = 25_000;

/// Default API-key header name (spec §4.2), already lowercased.
pub const API_KEY_HEADER_DEFAULT: &str = "x-api-key";

/// Fee-usage lock TTL. Ambient detail not named in spec.md (see
/// `SPEC_FULL.md` §4.8 / `DESIGN.md`'s Open Question log); kept short since
/// contention windows here are a single read-modify-write, not a whole
/// submission pipeline.
pub const FEE_USAGE_LOCK_TTL_SECONDS: u64 = 2;
pub const FEE_USAGE_LOCK_MAX_RETRIES: u32 = 3;
pub const FEE_USAGE_LOCK_BACKOFF_MIN_MS: u64 = 50;
pub const FEE_USAGE_LOCK_BACKOFF_MAX_MS: u64 = 150;
