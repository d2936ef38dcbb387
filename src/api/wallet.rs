use std::collections::HashMap;

use axum::{extract::State, Json};
use ethers::providers::Middleware;
use ethers::types::{Address, Log};
use futures_util::future::join_all;
use serde::Deserialize;

use super::AppState;
use crate::constants::{
    ACTIVITY_MAX_EVENTS, ACTIVITY_WINDOW_BLOCKS, FLAG_HIGH_ACTIVITY, FLAG_HIGH_GAS,
    FLAG_HIGH_VALUE, FLAG_LOW_VALUE, FLAG_NEW_WALLET, FLAG_UNKNOWN_CONTRACTS,
    HEALTH_SCORE_BASE, HIGH_ACTIVITY_TX_COUNT, HIGH_VALUE_USD, LOW_VALUE_USD,
    NEW_WALLET_TX_COUNT, RPC_CALL_TIMEOUT_SECS, SCORE_HIGH_BALANCE_USD, SCORE_HIGH_TX_COUNT,
    SCORE_LOW_BALANCE_USD, SCORE_LOW_TX_COUNT,
};
use crate::error::{AppError, Result};
use crate::models::{ActivityEvent, PortfolioEntry, WalletSummary};
use crate::registry::{Chain, Token};
use crate::services::{
    best_effort, logs, price,
    provider::{self, EvmProvider},
    scale_u256, Erc20,
};

#[derive(Debug, Deserialize)]
pub struct WalletSummaryRequest {
    pub address: Option<String>,
    pub chain: Option<String>,
}

/// POST /wallet-summary
///
/// Never hard-fails once a provider is acquired: individual reads degrade to
/// absence and the response carries whatever could be collected.
pub async fn wallet_summary(
    State(state): State<AppState>,
    Json(req): Json<WalletSummaryRequest>,
) -> Result<Json<WalletSummary>> {
    let (address, chain) = match (req.address, req.chain) {
        (Some(address), Some(chain))
            if !address.trim().is_empty() && !chain.trim().is_empty() =>
        {
            (address, chain)
        }
        _ => {
            return Err(AppError::MissingInput(
                "Missing address or chain".to_string(),
            ));
        }
    };
    let chain = Chain::parse(&chain)?;
    let owner: Address = address
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid address".to_string()))?;

    let chain_config = state.registry.chain(chain);
    let provider = provider::healthy_provider(chain, &chain_config.endpoints).await?;

    let balance_eth = best_effort("wallet native balance", RPC_CALL_TIMEOUT_SECS, async {
        provider
            .get_balance(owner, None)
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))
    })
    .await
    .map(|raw| scale_u256(raw, 18));

    let tx_count = best_effort("wallet tx count", RPC_CALL_TIMEOUT_SECS, async {
        provider
            .get_transaction_count(owner, None)
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))
    })
    .await
    .map(|count| count.as_u64());

    let native_price = price::native_usd(provider.clone(), chain_config.native_feed).await;
    // Unknown price stays absent; it must never collapse to $0.
    let native_usd = match (balance_eth, native_price) {
        (Some(balance), Some(price)) => Some(balance * price),
        _ => None,
    };

    let prices = price::token_prices(&state.config.price_api_base_url, &chain_config.tokens).await;
    let portfolio = collect_portfolio(&provider, owner, &chain_config.tokens, &prices).await;
    let tokens_usd_total: f64 = portfolio.iter().filter_map(|entry| entry.amount_usd).sum();
    let total_usd_value = native_usd.map(|native| native + tokens_usd_total);

    let risk_flags = derive_risk_flags(total_usd_value, tx_count);
    let activity = recent_activity(&provider, owner, &chain_config.tokens).await;
    let health_score = compute_health_score(total_usd_value, tx_count, &risk_flags);
    let ai_summary = compose_summary(chain, total_usd_value, tx_count, &risk_flags);

    Ok(Json(WalletSummary {
        chain: chain.to_string(),
        address: owner,
        balance_eth,
        native_usd,
        total_usd_value,
        tx_count,
        risk_flags,
        portfolio,
        activity,
        health_score,
        ai_summary,
    }))
}

/// Per-token balances, fetched concurrently but emitted in registry order.
/// Zero and unreadable balances are omitted, not reported.
async fn collect_portfolio(
    provider: &EvmProvider,
    owner: Address,
    tokens: &[Token],
    prices: &HashMap<String, f64>,
) -> Vec<PortfolioEntry> {
    let reads = tokens.iter().map(|token| {
        let provider = provider.clone();
        async move {
            let erc20 = Erc20::new(token.address, provider);
            let raw = best_effort(
                &format!("wallet {} balance", token.symbol),
                RPC_CALL_TIMEOUT_SECS,
                async {
                    erc20
                        .balance_of(owner)
                        .call()
                        .await
                        .map_err(|e| AppError::BlockchainRPC(e.to_string()))
                },
            )
            .await?;

            let amount = scale_u256(raw, token.decimals as u32);
            if amount <= 0.0 {
                return None;
            }
            Some(PortfolioEntry {
                symbol: token.symbol.to_string(),
                address: token.address,
                amount,
                amount_usd: prices.get(token.price_id).map(|p| amount * p),
            })
        }
    });

    join_all(reads).await.into_iter().flatten().collect()
}

fn derive_risk_flags(total_usd: Option<f64>, tx_count: Option<u64>) -> Vec<String> {
    let mut flags = Vec::new();
    if matches!(tx_count, Some(count) if count < NEW_WALLET_TX_COUNT) {
        flags.push(FLAG_NEW_WALLET.to_string());
    }
    if matches!(total_usd, Some(total) if total > HIGH_VALUE_USD) {
        flags.push(FLAG_HIGH_VALUE.to_string());
    }
    if matches!(total_usd, Some(total) if total < LOW_VALUE_USD) {
        flags.push(FLAG_LOW_VALUE.to_string());
    }
    if matches!(tx_count, Some(count) if count > HIGH_ACTIVITY_TX_COUNT) {
        flags.push(FLAG_HIGH_ACTIVITY.to_string());
    }
    // Counterparty classification is heuristic, not exhaustive.
    flags.push(FLAG_UNKNOWN_CONTRACTS.to_string());
    flags
}

/// Weighted-rule scorer. The rules and their weights are part of the response
/// contract; keep them in sync with `constants.rs`.
fn compute_health_score(
    total_usd: Option<f64>,
    tx_count: Option<u64>,
    risk_flags: &[String],
) -> u8 {
    let mut score = HEALTH_SCORE_BASE;

    if let Some(total) = total_usd {
        if total < SCORE_LOW_BALANCE_USD {
            score -= 5;
        }
        if total > SCORE_HIGH_BALANCE_USD {
            score += 5;
        }
    }
    if let Some(count) = tx_count {
        if count < SCORE_LOW_TX_COUNT {
            score -= 10;
        }
        if count > SCORE_HIGH_TX_COUNT {
            score += 5;
        }
    }
    if risk_flags.iter().any(|flag| flag == FLAG_HIGH_GAS) {
        score -= 5;
    }
    if risk_flags.iter().any(|flag| flag == FLAG_UNKNOWN_CONTRACTS) {
        score -= 10;
    }

    score.clamp(0, 100) as u8
}

/// Deterministic template composition; stable inputs produce stable text.
fn compose_summary(
    chain: Chain,
    total_usd: Option<f64>,
    tx_count: Option<u64>,
    risk_flags: &[String],
) -> String {
    let mut parts = Vec::new();

    match total_usd {
        Some(total) => parts.push(format!(
            "This wallet has approximately ${:.2} in on-chain value on {}.",
            total, chain
        )),
        None => parts.push(format!(
            "This wallet's on-chain value on {} could not be priced.",
            chain
        )),
    }

    match tx_count {
        Some(count) if count < SCORE_LOW_TX_COUNT => {
            parts.push("It appears relatively new with limited transaction history.".to_string())
        }
        Some(count) if count > SCORE_HIGH_TX_COUNT => parts.push(
            "It has a rich transaction history and appears to be an active user.".to_string(),
        ),
        Some(_) => parts.push("It has a moderate transaction history.".to_string()),
        None => parts.push("Its transaction history could not be read.".to_string()),
    }

    if risk_flags.is_empty() {
        parts.push("No major risk signals were detected.".to_string());
    } else {
        parts.push(format!(
            "Key risk considerations: {}.",
            risk_flags.join(", ")
        ));
    }

    parts.join(" ")
}

/// Transfer events touching `owner` across curated tokens in the recent
/// block window, newest first, bounded.
async fn recent_activity(
    provider: &EvmProvider,
    owner: Address,
    tokens: &[Token],
) -> Vec<ActivityEvent> {
    if tokens.is_empty() {
        return Vec::new();
    }

    let latest = match best_effort("activity block height", RPC_CALL_TIMEOUT_SECS, async {
        provider
            .get_block_number()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))
    })
    .await
    {
        Some(block) => block.as_u64(),
        None => return Vec::new(),
    };
    let from_block = latest.saturating_sub(ACTIVITY_WINDOW_BLOCKS);

    let scans = tokens.iter().map(|token| async move {
        let token_logs = best_effort(
            &format!("activity {} logs", token.symbol),
            RPC_CALL_TIMEOUT_SECS,
            logs::transfer_logs(provider, token.address, from_block, latest),
        )
        .await
        .unwrap_or_default();
        decode_activity(token, owner, token_logs)
    });

    let mut events: Vec<ActivityEvent> = join_all(scans).await.into_iter().flatten().collect();
    order_activity(&mut events);
    events
}

fn decode_activity(token: &Token, owner: Address, token_logs: Vec<Log>) -> Vec<ActivityEvent> {
    let mut events = Vec::new();
    for log in token_logs {
        let Some(decoded) = logs::decode_transfer(&log, token.decimals) else {
            continue;
        };
        if decoded.from != owner && decoded.to != owner {
            continue;
        }
        let (Some(block), Some(tx_hash)) = (log.block_number, log.transaction_hash) else {
            continue;
        };
        let direction = if decoded.to == owner { "in" } else { "out" };
        events.push(ActivityEvent {
            kind: "token_transfer".to_string(),
            token: token.symbol.to_string(),
            contract: token.address,
            from: decoded.from,
            to: decoded.to,
            amount: decoded.amount,
            direction: direction.to_string(),
            block_number: block.as_u64(),
            tx_hash,
        });
    }
    events
}

/// Fetch order must not leak into the client-visible order.
fn order_activity(events: &mut Vec<ActivityEvent>) {
    events.sort_by(|a, b| b.block_number.cmp(&a.block_number));
    events.truncate(ACTIVITY_MAX_EVENTS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Bytes, H256, U256};

    fn flags_with_unknown() -> Vec<String> {
        vec![FLAG_UNKNOWN_CONTRACTS.to_string()]
    }

    fn event_at(block: u64) -> ActivityEvent {
        ActivityEvent {
            kind: "token_transfer".to_string(),
            token: "USDC".to_string(),
            contract: Address::zero(),
            from: Address::zero(),
            to: Address::zero(),
            amount: 1.0,
            direction: "in".to_string(),
            block_number: block,
            tx_hash: H256::zero(),
        }
    }

    fn transfer_log(from: Address, to: Address, raw: U256, block: u64) -> Log {
        let mut data = [0u8; 32];
        raw.to_big_endian(&mut data);
        Log {
            topics: vec![logs::transfer_topic(), H256::from(from), H256::from(to)],
            data: Bytes::from(data.to_vec()),
            block_number: Some(block.into()),
            transaction_hash: Some(H256::repeat_byte(0x99)),
            ..Default::default()
        }
    }

    #[test]
    fn health_score_baseline_wallet() {
        // $20k, 150 txs: +5 +5, unknown-contracts flag -10.
        let score = compute_health_score(Some(20_000.0), Some(150), &flags_with_unknown());
        assert_eq!(score, 80);
    }

    #[test]
    fn health_score_penalizes_empty_new_wallets() {
        // $0, 0 txs: -5 -10, unknown-contracts flag -10.
        let score = compute_health_score(Some(0.0), Some(0), &flags_with_unknown());
        assert_eq!(score, 55);
    }

    #[test]
    fn health_score_skips_usd_rules_when_price_unknown() {
        let score = compute_health_score(None, Some(0), &flags_with_unknown());
        assert_eq!(score, 60);
    }

    #[test]
    fn health_score_is_always_clamped() {
        let magnitudes = [
            None,
            Some(0.0),
            Some(9.99),
            Some(50.0),
            Some(10_000.0),
            Some(f64::MAX),
        ];
        let counts = [None, Some(0), Some(3), Some(50), Some(100), Some(u64::MAX)];
        let all_flags = vec![
            FLAG_HIGH_GAS.to_string(),
            FLAG_UNKNOWN_CONTRACTS.to_string(),
        ];
        for total in magnitudes {
            for count in counts {
                let score = compute_health_score(total, count, &all_flags);
                assert!(score <= 100);
            }
        }
    }

    #[test]
    fn risk_flags_for_low_value_new_wallet() {
        let flags = derive_risk_flags(Some(5.0), Some(1));
        assert_eq!(
            flags,
            vec![
                FLAG_NEW_WALLET.to_string(),
                FLAG_LOW_VALUE.to_string(),
                FLAG_UNKNOWN_CONTRACTS.to_string(),
            ]
        );
    }

    #[test]
    fn risk_flags_for_busy_whale() {
        let flags = derive_risk_flags(Some(50_000.0), Some(200));
        assert_eq!(
            flags,
            vec![
                FLAG_HIGH_VALUE.to_string(),
                FLAG_HIGH_ACTIVITY.to_string(),
                FLAG_UNKNOWN_CONTRACTS.to_string(),
            ]
        );
    }

    #[test]
    fn unknown_usd_sets_no_value_flags() {
        let flags = derive_risk_flags(None, Some(10));
        assert_eq!(flags, vec![FLAG_UNKNOWN_CONTRACTS.to_string()]);
    }

    #[test]
    fn summary_is_stable_for_stable_inputs() {
        let flags = flags_with_unknown();
        let first = compose_summary(Chain::Ethereum, Some(123.456), Some(10), &flags);
        let second = compose_summary(Chain::Ethereum, Some(123.456), Some(10), &flags);
        assert_eq!(first, second);
        assert!(first.starts_with("This wallet has approximately $123.46"));
        assert!(first.contains("moderate transaction history"));
        assert!(first.contains(FLAG_UNKNOWN_CONTRACTS));
    }

    #[test]
    fn summary_treats_unknown_price_as_absent() {
        let text = compose_summary(Chain::Polygon, None, Some(1), &flags_with_unknown());
        assert!(text.contains("could not be priced"));
        assert!(!text.contains("$0.00"));
    }

    #[test]
    fn activity_is_sorted_descending_and_bounded() {
        let mut events: Vec<ActivityEvent> = (0..40).map(event_at).collect();
        order_activity(&mut events);
        assert_eq!(events.len(), ACTIVITY_MAX_EVENTS);
        for pair in events.windows(2) {
            assert!(pair[0].block_number >= pair[1].block_number);
        }
        assert_eq!(events[0].block_number, 39);
    }

    #[test]
    fn decode_activity_keeps_only_owner_transfers() {
        let owner = Address::repeat_byte(0xaa);
        let stranger = Address::repeat_byte(0xbb);
        let token = Token {
            address: Address::repeat_byte(0x01),
            symbol: "USDC",
            decimals: 6,
            price_id: "usd-coin",
        };

        let token_logs = vec![
            transfer_log(stranger, owner, U256::from(1_000_000_u64), 100),
            transfer_log(stranger, stranger, U256::from(1_000_000_u64), 101),
            transfer_log(owner, stranger, U256::from(2_000_000_u64), 102),
        ];

        let events = decode_activity(&token, owner, token_logs);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].direction, "in");
        assert_eq!(events[1].direction, "out");
        assert_eq!(events[1].amount, 2.0);
    }
}
