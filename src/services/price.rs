use std::collections::HashMap;
use std::time::Duration;

use ethers::types::Address;

use crate::constants::{CHAINLINK_ANSWER_SCALE, PRICE_API_TIMEOUT_SECS, RPC_CALL_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::registry::Token;
use crate::services::{provider::EvmProvider, ChainlinkFeed};

/// Native asset price in USD from the chain's Chainlink aggregator.
///
/// Any failure (call error, timeout, non-positive or oversized answer) is
/// swallowed here; callers treat `None` as "price unknown".
pub async fn native_usd(provider: EvmProvider, feed: Address) -> Option<f64> {
    let feed = ChainlinkFeed::new(feed, provider);
    let round = match tokio::time::timeout(
        Duration::from_secs(RPC_CALL_TIMEOUT_SECS),
        feed.latest_round_data().call(),
    )
    .await
    {
        Ok(Ok(round)) => round,
        Ok(Err(err)) => {
            tracing::debug!("native price feed read failed: {}", err);
            return None;
        }
        Err(_) => {
            tracing::debug!(
                "native price feed read timed out after {}s",
                RPC_CALL_TIMEOUT_SECS
            );
            return None;
        }
    };

    let (_round_id, answer, _started_at, _updated_at, _answered_in) = round;
    let raw = i128::try_from(answer).ok()?;
    if raw <= 0 {
        return None;
    }
    Some(raw as f64 / CHAINLINK_ANSWER_SCALE)
}

/// One batched USD lookup for the curated tokens' price-source ids.
/// Returns an empty map on any network or parse failure.
pub async fn token_prices(base_url: &str, tokens: &[Token]) -> HashMap<String, f64> {
    let ids = dedup_price_ids(tokens);
    if ids.is_empty() {
        return HashMap::new();
    }

    let url = format!(
        "{}/simple/price?ids={}&vs_currencies=usd",
        base_url.trim_end_matches('/'),
        ids.join(",")
    );

    match fetch_price_map(&url).await {
        Ok(prices) => prices,
        Err(err) => {
            tracing::warn!("token price lookup failed: {}", err);
            HashMap::new()
        }
    }
}

fn dedup_price_ids(tokens: &[Token]) -> Vec<&'static str> {
    let mut ids: Vec<&'static str> = Vec::new();
    for token in tokens {
        if token.price_id.is_empty() {
            continue;
        }
        if !ids.contains(&token.price_id) {
            ids.push(token.price_id);
        }
    }
    ids
}

async fn fetch_price_map(url: &str) -> Result<HashMap<String, f64>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(PRICE_API_TIMEOUT_SECS))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("price API unreachable: {}", e)))?;
    if !response.status().is_success() {
        return Err(AppError::Internal(format!(
            "price API returned {}",
            response.status()
        )));
    }

    let payload: HashMap<String, HashMap<String, f64>> = response
        .json()
        .await
        .map_err(|e| AppError::Internal(format!("price API payload: {}", e)))?;

    Ok(flatten_price_payload(payload))
}

fn flatten_price_payload(payload: HashMap<String, HashMap<String, f64>>) -> HashMap<String, f64> {
    payload
        .into_iter()
        .filter_map(|(id, quotes)| quotes.get("usd").copied().map(|usd| (id, usd)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Chain, ChainRegistry};

    #[test]
    fn price_ids_are_deduplicated_in_list_order() {
        let registry = ChainRegistry::bootstrap().unwrap();
        let mut tokens = registry.chain(Chain::Ethereum).tokens.clone();
        tokens.extend(registry.chain(Chain::Base).tokens.clone()); // second usd-coin
        let ids = dedup_price_ids(&tokens);
        assert_eq!(ids, vec!["usd-coin", "tether", "dai", "weth"]);
    }

    #[test]
    fn payload_flattening_keeps_usd_quotes_only() {
        let payload: HashMap<String, HashMap<String, f64>> = serde_json::from_value(
            serde_json::json!({
                "usd-coin": {"usd": 0.9998},
                "tether": {"eur": 0.91},
            }),
        )
        .unwrap();
        let prices = flatten_price_payload(payload);
        assert_eq!(prices.get("usd-coin"), Some(&0.9998));
        assert!(!prices.contains_key("tether"));
    }

    #[test]
    fn no_price_ids_means_no_query() {
        let ids = dedup_price_ids(&[]);
        assert!(ids.is_empty());
    }
}
