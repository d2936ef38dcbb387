use std::sync::Arc;
use std::time::Duration;

use ethers::providers::{Http, Middleware, Provider};
use futures_util::future::select_ok;

use crate::constants::ENDPOINT_PROBE_TIMEOUT_SECS;
use crate::error::{AppError, Result};
use crate::registry::Chain;

pub type EvmProvider = Arc<Provider<Http>>;

/// Races a liveness probe against every candidate endpoint and returns the
/// first one that answers a block-height query. Losing probes are dropped,
/// not awaited. All probes failing is the only failure mode.
pub async fn healthy_provider(chain: Chain, endpoints: &[String]) -> Result<EvmProvider> {
    if endpoints.is_empty() {
        return Err(AppError::NoHealthyEndpoint(chain.to_string()));
    }

    let probes: Vec<_> = endpoints
        .iter()
        .map(|url| Box::pin(probe_endpoint(chain, url)))
        .collect();

    match select_ok(probes).await {
        Ok((provider, _losers)) => Ok(provider),
        Err(err) => {
            tracing::warn!("all {} endpoints failed liveness probe: {}", chain, err);
            Err(AppError::NoHealthyEndpoint(chain.to_string()))
        }
    }
}

async fn probe_endpoint(chain: Chain, url: &str) -> Result<EvmProvider> {
    let provider = Provider::<Http>::try_from(url)
        .map_err(|e| AppError::BlockchainRPC(format!("Invalid RPC URL {}: {}", url, e)))?;

    let block = tokio::time::timeout(
        Duration::from_secs(ENDPOINT_PROBE_TIMEOUT_SECS),
        provider.get_block_number(),
    )
    .await
    .map_err(|_| AppError::BlockchainRPC(format!("{} probe timed out", url)))?
    .map_err(|e| AppError::BlockchainRPC(format!("{} probe failed: {}", url, e)))?;

    tracing::debug!("{} endpoint {} live at block {}", chain, url, block);
    Ok(Arc::new(provider))
}
