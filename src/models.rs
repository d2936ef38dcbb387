use ethers::types::{Address, H256};
use serde::Serialize;

/// Derived view of one on-chain transaction. Never stored; rebuilt per request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDiagnostic {
    pub chain: String,
    pub tx_hash: H256,
    pub from: Address,
    pub to: Option<Address>,
    pub gas_used: Option<String>,
    pub status: String,
    pub value_eth: f64,
    pub value_usd: Option<f64>,
    pub block_number: Option<u64>,
    /// Request time in unix millis; exempt from idempotence.
    pub timestamp: i64,
    pub protocols: Vec<String>,
    pub token_transfers: Vec<TokenTransfer>,
    pub contract_intel: Option<ContractIntel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub token: String,
    pub contract: Address,
    pub from: Address,
    pub to: Address,
    pub amount: f64,
    pub amount_usd: Option<f64>,
}

/// Counterparty intelligence. All fields are `None` when the lookup failed;
/// callers must treat that as "unknown", not as "not a contract".
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractIntel {
    pub is_contract: Option<bool>,
    pub code_size: Option<u64>,
    pub deploy_tx: Option<String>,
    pub age_blocks: Option<u64>,
    pub tx_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub chain: String,
    pub address: Address,
    pub balance_eth: Option<f64>,
    pub native_usd: Option<f64>,
    pub total_usd_value: Option<f64>,
    pub tx_count: Option<u64>,
    pub risk_flags: Vec<String>,
    pub portfolio: Vec<PortfolioEntry>,
    pub activity: Vec<ActivityEvent>,
    pub health_score: u8,
    pub ai_summary: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioEntry {
    pub symbol: String,
    pub address: Address,
    pub amount: f64,
    pub amount_usd: Option<f64>,
}

/// A decoded ERC-20 Transfer touching the queried address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub token: String,
    pub contract: Address,
    pub from: Address,
    pub to: Address,
    pub amount: f64,
    pub direction: String,
    pub block_number: u64,
    pub tx_hash: H256,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalsResponse {
    pub address: Address,
    pub chain: String,
    pub approvals: Vec<Approval>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub token: String,
    pub token_address: Address,
    pub spender: Address,
    pub spender_label: String,
    pub amount: f64,
    pub unlimited: bool,
    pub risk: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_serializes_with_camel_case_contract_fields() {
        let diagnostic = TransactionDiagnostic {
            chain: "ethereum".to_string(),
            tx_hash: H256::zero(),
            from: Address::zero(),
            to: None,
            gas_used: None,
            status: "failed".to_string(),
            value_eth: 0.0,
            value_usd: None,
            block_number: None,
            timestamp: 0,
            protocols: vec!["Unknown / Direct".to_string()],
            token_transfers: vec![],
            contract_intel: None,
        };
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert!(json.get("txHash").is_some());
        assert!(json.get("valueEth").is_some());
        assert!(json.get("tokenTransfers").is_some());
        assert!(json["valueUsd"].is_null());
    }

    #[test]
    fn activity_event_uses_type_tag() {
        let event = ActivityEvent {
            kind: "token_transfer".to_string(),
            token: "USDC".to_string(),
            contract: Address::zero(),
            from: Address::zero(),
            to: Address::zero(),
            amount: 1.0,
            direction: "in".to_string(),
            block_number: 1,
            tx_hash: H256::zero(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "token_transfer");
        assert!(json.get("blockNumber").is_some());
    }

    #[test]
    fn unknown_intel_serializes_all_null() {
        let json = serde_json::to_value(ContractIntel::default()).unwrap();
        assert!(json["isContract"].is_null());
        assert!(json["codeSize"].is_null());
        assert!(json["txCount"].is_null());
    }
}
