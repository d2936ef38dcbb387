use axum::{extract::State, Json};
use ethers::types::Address;
use futures_util::future::join_all;
use serde::Deserialize;

use super::AppState;
use crate::constants::{
    APPROVAL_HIGH_RISK_THRESHOLD, APPROVAL_MEDIUM_RISK_THRESHOLD, APPROVAL_UNLIMITED_THRESHOLD,
    RPC_CALL_TIMEOUT_SECS,
};
use crate::error::{AppError, Result};
use crate::models::{Approval, ApprovalsResponse};
use crate::registry::{Chain, Spender, Token};
use crate::services::{best_effort, provider, scale_u256, Erc20};

#[derive(Debug, Deserialize)]
pub struct ApprovalsRequest {
    pub address: Option<String>,
    pub chain: Option<String>,
}

/// POST /approvals
///
/// Scans every curated token/spender pair. Pairs that cannot be read are
/// omitted rather than failing the whole scan.
pub async fn approvals(
    State(state): State<AppState>,
    Json(req): Json<ApprovalsRequest>,
) -> Result<Json<ApprovalsResponse>> {
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

    let pairs: Vec<(&Token, &Spender)> = chain_config
        .tokens
        .iter()
        .flat_map(|token| chain_config.spenders.iter().map(move |s| (token, s)))
        .collect();

    let reads = pairs.into_iter().map(|(token, spender)| {
        let provider = provider.clone();
        async move {
            let erc20 = Erc20::new(token.address, provider);
            let raw = best_effort(
                &format!("{} allowance for {}", token.symbol, spender.label),
                RPC_CALL_TIMEOUT_SECS,
                async {
                    erc20
                        .allowance(owner, spender.address)
                        .call()
                        .await
                        .map_err(|e| AppError::BlockchainRPC(e.to_string()))
                },
            )
            .await?;

            let amount = scale_u256(raw, token.decimals as u32);
            classify(token, spender, amount)
        }
    });

    let approvals = join_all(reads).await.into_iter().flatten().collect();

    Ok(Json(ApprovalsResponse {
        address: owner,
        chain: chain.to_string(),
        approvals,
    }))
}

/// Zero allowances are not approvals and are skipped.
fn classify(token: &Token, spender: &Spender, amount: f64) -> Option<Approval> {
    if amount <= 0.0 {
        return None;
    }
    let unlimited = amount > APPROVAL_UNLIMITED_THRESHOLD;
    let risk = if unlimited || amount > APPROVAL_HIGH_RISK_THRESHOLD {
        "high"
    } else if amount > APPROVAL_MEDIUM_RISK_THRESHOLD {
        "medium"
    } else {
        "low"
    };
    Some(Approval {
        token: token.symbol.to_string(),
        token_address: token.address,
        spender: spender.address,
        spender_label: spender.label.to_string(),
        amount,
        unlimited,
        risk: risk.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc() -> Token {
        Token {
            address: Address::repeat_byte(0x01),
            symbol: "USDC",
            decimals: 6,
            price_id: "usd-coin",
        }
    }

    fn router() -> Spender {
        Spender {
            address: Address::repeat_byte(0x02),
            label: "Uniswap V3 Router",
        }
    }

    #[test]
    fn zero_allowance_is_skipped() {
        assert!(classify(&usdc(), &router(), 0.0).is_none());
    }

    #[test]
    fn small_allowance_is_low_risk() {
        let approval = classify(&usdc(), &router(), 500.0).unwrap();
        assert_eq!(approval.risk, "low");
        assert!(!approval.unlimited);
        assert_eq!(approval.token, "USDC");
        assert_eq!(approval.spender_label, "Uniswap V3 Router");
    }

    #[test]
    fn medium_risk_between_thousand_and_hundred_thousand() {
        let approval = classify(&usdc(), &router(), 5_000.0).unwrap();
        assert_eq!(approval.risk, "medium");
        assert!(!approval.unlimited);
    }

    #[test]
    fn large_allowance_is_high_risk() {
        let approval = classify(&usdc(), &router(), 250_000.0).unwrap();
        assert_eq!(approval.risk, "high");
        assert!(!approval.unlimited);
    }

    #[test]
    fn past_unlimited_threshold_is_flagged_and_high() {
        let approval = classify(&usdc(), &router(), 2_000_000_000.0).unwrap();
        assert_eq!(approval.risk, "high");
        assert!(approval.unlimited);
    }

    #[test]
    fn boundary_values_are_not_promoted() {
        // Thresholds are strict greater-than.
        assert_eq!(classify(&usdc(), &router(), 1_000.0).unwrap().risk, "low");
        assert_eq!(
            classify(&usdc(), &router(), 100_000.0).unwrap().risk,
            "medium"
        );
        assert!(!classify(&usdc(), &router(), 1_000_000_000.0)
            .unwrap()
            .unlimited);
    }
}
