pub mod logs;
pub mod price;
pub mod provider;

use std::time::Duration;

use ethers::types::U256;
use ethers::utils::format_units;

use crate::error::Result;

/// Runs one external call under a timeout and converts any failure into
/// `None`. Every best-effort call site in the pipelines goes through here so
/// the degradation policy stays in one place.
pub async fn best_effort<T, F>(label: &str, timeout_secs: u64, fut: F) -> Option<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), fut).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            tracing::debug!("{} degraded: {}", label, err);
            None
        }
        Err(_) => {
            tracing::debug!("{} timed out after {}s", label, timeout_secs);
            None
        }
    }
}

/// Raw token units to a decimal amount. Unlike `U256::as_u128` this never
/// panics on oversized balances.
pub fn scale_u256(value: U256, decimals: u32) -> f64 {
    format_units(value, decimals)
        .ok()
        .and_then(|text| text.parse::<f64>().ok())
        .unwrap_or(0.0)
}

ethers::contract::abigen!(
    Erc20,
    r#"[
        function balanceOf(address) view returns (uint256)
        function allowance(address owner, address spender) view returns (uint256)
    ]"#
);

ethers::contract::abigen!(
    ChainlinkFeed,
    r#"[
        function latestRoundData() view returns (uint80, int256, uint256, uint256, uint80)
    ]"#
);
