use std::collections::HashMap;
use std::time::Duration;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use ethers::providers::Middleware;
use ethers::types::{Address, Log, TransactionReceipt, H256, U64};
use serde::Deserialize;

use super::AppState;
use crate::constants::RPC_CALL_TIMEOUT_SECS;
use crate::error::{AppError, Result};
use crate::models::{ContractIntel, TokenTransfer, TransactionDiagnostic};
use crate::registry::{Chain, ChainRegistry};
use crate::services::{
    best_effort, logs, price,
    provider::{self, EvmProvider},
    scale_u256,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnoseRequest {
    pub tx_hash: Option<String>,
    pub chain: Option<String>,
}

/// POST /diagnose
pub async fn diagnose(
    State(state): State<AppState>,
    Json(req): Json<DiagnoseRequest>,
) -> Result<Response> {
    let (tx_hash, chain) = match (req.tx_hash, req.chain) {
        (Some(tx_hash), Some(chain))
            if !tx_hash.trim().is_empty() && !chain.trim().is_empty() =>
        {
            (tx_hash, chain)
        }
        _ => {
            return Err(AppError::MissingInput("Missing txHash or chain".to_string()));
        }
    };
    let chain = Chain::parse(&chain)?;

    match run_diagnosis(&state, chain, &tx_hash).await {
        Ok(diagnostic) => Ok(Json(diagnostic).into_response()),
        // Not-found is a data result, not a transport failure.
        Err(AppError::TransactionNotFound) => Ok(Json(serde_json::json!({
            "error": "Transaction not found"
        }))
        .into_response()),
        Err(err) => Err(err),
    }
}

async fn run_diagnosis(
    state: &AppState,
    chain: Chain,
    tx_hash: &str,
) -> Result<TransactionDiagnostic> {
    let hash: H256 = tx_hash
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid transaction hash".to_string()))?;

    let chain_config = state.registry.chain(chain);
    let provider = provider::healthy_provider(chain, &chain_config.endpoints).await?;

    let tx = tokio::time::timeout(
        Duration::from_secs(RPC_CALL_TIMEOUT_SECS),
        provider.get_transaction(hash),
    )
    .await
    .map_err(|_| AppError::BlockchainRPC("transaction lookup timed out".to_string()))?
    .map_err(|e| AppError::BlockchainRPC(e.to_string()))?
    .ok_or(AppError::TransactionNotFound)?;

    let receipt = best_effort("diagnose receipt", RPC_CALL_TIMEOUT_SECS, async {
        provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))
    })
    .await
    .flatten();

    let native_price = price::native_usd(provider.clone(), chain_config.native_feed).await;
    let value_eth = scale_u256(tx.value, 18);
    let value_usd = native_price.map(|p| value_eth * p);

    let protocols = infer_protocols(tx.to);

    let prices = price::token_prices(&state.config.price_api_base_url, &chain_config.tokens).await;
    let token_transfers = receipt
        .as_ref()
        .map(|r| decode_receipt_transfers(&state.registry, chain, &r.logs, &prices))
        .unwrap_or_default();

    let contract_intel = match tx.to {
        Some(to) => Some(counterparty_intel(&provider, to).await),
        None => None,
    };

    Ok(TransactionDiagnostic {
        chain: chain.to_string(),
        tx_hash: hash,
        from: tx.from,
        to: tx.to,
        gas_used: receipt.as_ref().and_then(|r| r.gas_used).map(|g| g.to_string()),
        status: status_label(receipt.as_ref()),
        value_eth,
        value_usd,
        block_number: tx.block_number.map(|b| b.as_u64()),
        timestamp: Utc::now().timestamp_millis(),
        protocols,
        token_transfers,
        contract_intel,
    })
}

fn status_label(receipt: Option<&TransactionReceipt>) -> String {
    let succeeded = receipt.and_then(|r| r.status) == Some(U64::one());
    if succeeded { "success" } else { "failed" }.to_string()
}

fn infer_protocols(to: Option<Address>) -> Vec<String> {
    match to {
        Some(to) => protocol_tags(&format!("{:?}", to)),
        None => vec![],
    }
}

/// Rule table mapping destination-text fragments to protocol tags.
fn protocol_tags(destination: &str) -> Vec<String> {
    let text = destination.to_ascii_lowercase();
    let mut tags = Vec::new();

    if text.contains("uniswap") || text.contains("swap") {
        tags.push("DEX".to_string());
    }
    if text.contains("aave") || text.contains("compound") {
        tags.push("Lending".to_string());
    }
    if text.contains("bridge") {
        tags.push("Bridge".to_string());
    }
    if text.contains("nft") {
        tags.push("NFT".to_string());
    }
    if tags.is_empty() {
        tags.push("Unknown / Direct".to_string());
    }

    tags
}

fn decode_receipt_transfers(
    registry: &ChainRegistry,
    chain: Chain,
    receipt_logs: &[Log],
    prices: &HashMap<String, f64>,
) -> Vec<TokenTransfer> {
    let mut transfers = Vec::new();
    for log in receipt_logs {
        let Some(token) = registry.token_at(chain, log.address) else {
            continue;
        };
        let Some(decoded) = logs::decode_transfer(log, token.decimals) else {
            continue;
        };
        transfers.push(TokenTransfer {
            token: token.symbol.to_string(),
            contract: token.address,
            from: decoded.from,
            to: decoded.to,
            amount: decoded.amount,
            amount_usd: prices.get(token.price_id).map(|p| decoded.amount * p),
        });
    }
    transfers
}

/// Destination-contract intelligence, degrading to an all-unknown record
/// instead of propagating read failures.
async fn counterparty_intel(provider: &EvmProvider, address: Address) -> ContractIntel {
    let code = best_effort("counterparty code", RPC_CALL_TIMEOUT_SECS, async {
        provider
            .get_code(address, None)
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))
    })
    .await;

    let Some(code) = code else {
        return ContractIntel::default();
    };

    if code.is_empty() {
        return ContractIntel {
            is_contract: Some(false),
            code_size: Some(0),
            ..Default::default()
        };
    }

    let tx_count = best_effort("counterparty tx count", RPC_CALL_TIMEOUT_SECS, async {
        provider
            .get_transaction_count(address, None)
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))
    })
    .await;

    match tx_count {
        Some(count) => ContractIntel {
            is_contract: Some(true),
            code_size: Some(code.len() as u64),
            tx_count: Some(count.as_u64()),
            ..Default::default()
        },
        None => ContractIntel::default(),
    }
}
