use ethers::providers::Middleware;
use ethers::types::{Address, Filter, Log, H256, U256};
use ethers::utils::keccak256;

use crate::error::{AppError, Result};
use crate::services::{provider::EvmProvider, scale_u256};

pub fn transfer_topic() -> H256 {
    H256::from(keccak256("Transfer(address,address,uint256)"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTransfer {
    pub from: Address,
    pub to: Address,
    pub amount: f64,
}

/// Decodes one ERC-20 Transfer log into parties and a decimal amount.
/// Malformed logs (wrong topic, ERC-721 shape, short data) yield `None`.
pub fn decode_transfer(log: &Log, decimals: u8) -> Option<DecodedTransfer> {
    if log.topics.len() != 3 || log.topics[0] != transfer_topic() {
        return None;
    }
    if log.data.len() < 32 {
        return None;
    }

    let from = Address::from_slice(&log.topics[1].as_bytes()[12..]);
    let to = Address::from_slice(&log.topics[2].as_bytes()[12..]);
    let raw = U256::from_big_endian(&log.data[..32]);

    Some(DecodedTransfer {
        from,
        to,
        amount: scale_u256(raw, decimals as u32),
    })
}

/// Transfer logs emitted by one token contract over a block range.
pub async fn transfer_logs(
    provider: &EvmProvider,
    token: Address,
    from_block: u64,
    to_block: u64,
) -> Result<Vec<Log>> {
    let filter = Filter::new()
        .address(token)
        .topic0(transfer_topic())
        .from_block(from_block)
        .to_block(to_block);

    provider
        .get_logs(&filter)
        .await
        .map_err(|e| AppError::BlockchainRPC(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Bytes;

    fn transfer_log(from: Address, to: Address, raw_amount: U256) -> Log {
        let mut data = [0u8; 32];
        raw_amount.to_big_endian(&mut data);
        Log {
            topics: vec![transfer_topic(), H256::from(from), H256::from(to)],
            data: Bytes::from(data.to_vec()),
            ..Default::default()
        }
    }

    #[test]
    fn decodes_parties_and_scaled_amount() {
        let from = Address::repeat_byte(0x11);
        let to = Address::repeat_byte(0x22);
        let log = transfer_log(from, to, U256::from(2_500_000_u64));

        let decoded = decode_transfer(&log, 6).unwrap();
        assert_eq!(decoded.from, from);
        assert_eq!(decoded.to, to);
        assert_eq!(decoded.amount, 2.5);
    }

    #[test]
    fn rejects_wrong_event_topic() {
        let mut log = transfer_log(Address::zero(), Address::zero(), U256::one());
        log.topics[0] = H256::from(keccak256("Approval(address,address,uint256)"));
        assert!(decode_transfer(&log, 18).is_none());
    }

    #[test]
    fn rejects_erc721_shaped_transfer() {
        // ERC-721 emits the same signature with the token id as a 4th topic.
        let mut log = transfer_log(Address::zero(), Address::zero(), U256::one());
        log.topics.push(H256::zero());
        log.data = Bytes::default();
        assert!(decode_transfer(&log, 18).is_none());
    }

    #[test]
    fn rejects_truncated_data() {
        let mut log = transfer_log(Address::zero(), Address::zero(), U256::one());
        log.data = Bytes::from(vec![0u8; 16]);
        assert!(decode_transfer(&log, 18).is_none());
    }
}
