/// Application constants
///
/// Heuristic thresholds are preserved verbatim from the first production
/// deployment; scores and flags are part of the response contract, so do not
/// "improve" them without versioning the API.

// Risk flag labels
pub const FLAG_NEW_WALLET: &str = "Low activity / new wallet";
pub const FLAG_HIGH_VALUE: &str = "High value wallet";
pub const FLAG_LOW_VALUE: &str = "Low value wallet";
pub const FLAG_HIGH_ACTIVITY: &str = "High activity wallet";
pub const FLAG_UNKNOWN_CONTRACTS: &str = "Interacts with unknown contracts";
pub const FLAG_HIGH_GAS: &str = "High gas usage";

// Risk flag thresholds
pub const NEW_WALLET_TX_COUNT: u64 = 3;
pub const HIGH_ACTIVITY_TX_COUNT: u64 = 50;
pub const HIGH_VALUE_USD: f64 = 10_000.0;
pub const LOW_VALUE_USD: f64 = 10.0;

// Health score rules
pub const HEALTH_SCORE_BASE: i32 = 80;
pub const SCORE_LOW_BALANCE_USD: f64 = 50.0;
pub const SCORE_HIGH_BALANCE_USD: f64 = 10_000.0;
pub const SCORE_LOW_TX_COUNT: u64 = 5;
pub const SCORE_HIGH_TX_COUNT: u64 = 100;

// Activity window
pub const ACTIVITY_WINDOW_BLOCKS: u64 = 5_000;
pub const ACTIVITY_MAX_EVENTS: usize = 25;

// Approval classification
pub const APPROVAL_UNLIMITED_THRESHOLD: f64 = 1_000_000_000.0;
pub const APPROVAL_HIGH_RISK_THRESHOLD: f64 = 100_000.0;
pub const APPROVAL_MEDIUM_RISK_THRESHOLD: f64 = 1_000.0;

// Chainlink aggregators answer with 8 decimals
pub const CHAINLINK_ANSWER_SCALE: f64 = 1e8;

// Per-call timeouts
pub const ENDPOINT_PROBE_TIMEOUT_SECS: u64 = 5;
pub const RPC_CALL_TIMEOUT_SECS: u64 = 6;
pub const PRICE_API_TIMEOUT_SECS: u64 = 4;

// Off-chain price API
pub const PRICE_API_DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
