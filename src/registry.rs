use std::collections::HashMap;
use std::fmt;

use ethers::types::Address;

use crate::error::{AppError, Result};

/// One supported network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Ethereum,
    Base,
    Arbitrum,
    Polygon,
    Optimism,
}

impl Chain {
    pub const ALL: [Chain; 5] = [
        Chain::Ethereum,
        Chain::Base,
        Chain::Arbitrum,
        Chain::Polygon,
        Chain::Optimism,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Base => "base",
            Chain::Arbitrum => "arbitrum",
            Chain::Polygon => "polygon",
            Chain::Optimism => "optimism",
        }
    }

    pub fn parse(value: &str) -> Result<Chain> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ethereum" => Ok(Chain::Ethereum),
            "base" => Ok(Chain::Base),
            "arbitrum" => Ok(Chain::Arbitrum),
            "polygon" => Ok(Chain::Polygon),
            "optimism" => Ok(Chain::Optimism),
            other => Err(AppError::UnsupportedChain(other.to_string())),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Curated ERC-20 entry. `price_id` keys the off-chain price API.
#[derive(Debug, Clone)]
pub struct Token {
    pub address: Address,
    pub symbol: &'static str,
    pub decimals: u8,
    pub price_id: &'static str,
}

/// Allowlisted spender contract (known routers etc).
#[derive(Debug, Clone)]
pub struct Spender {
    pub address: Address,
    pub label: &'static str,
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Candidate RPC endpoints, ordered. All of them are probed concurrently;
    /// the order only fixes output determinism, not preference.
    pub endpoints: Vec<String>,
    /// Chainlink native-asset/USD aggregator.
    pub native_feed: Address,
    pub tokens: Vec<Token>,
    pub spenders: Vec<Spender>,
}

/// Immutable per-chain configuration, built once at startup.
pub struct ChainRegistry {
    chains: HashMap<Chain, ChainConfig>,
}

impl ChainRegistry {
    pub fn bootstrap() -> anyhow::Result<Self> {
        let mut chains = HashMap::new();

        chains.insert(
            Chain::Ethereum,
            ChainConfig {
                endpoints: urls(&[
                    "https://eth.llamarpc.com",
                    "https://rpc.ankr.com/eth",
                    "https://ethereum.publicnode.com",
                ]),
                native_feed: addr("0x5f4ec3df9cbd43714fe2740f5e3616155c5b8419")?,
                tokens: vec![
                    Token {
                        address: addr("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")?,
                        symbol: "USDC",
                        decimals: 6,
                        price_id: "usd-coin",
                    },
                    Token {
                        address: addr("0xdac17f958d2ee523a2206206994597c13d831ec7")?,
                        symbol: "USDT",
                        decimals: 6,
                        price_id: "tether",
                    },
                    Token {
                        address: addr("0x6b175474e89094c44da98b954eedeac495271d0f")?,
                        symbol: "DAI",
                        decimals: 18,
                        price_id: "dai",
                    },
                    Token {
                        address: addr("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2")?,
                        symbol: "WETH",
                        decimals: 18,
                        price_id: "weth",
                    },
                ],
                spenders: vec![
                    Spender {
                        address: addr("0xE592427A0AEce92De3Edee1F18E0157C05861564")?,
                        label: "Uniswap V3 Router",
                    },
                    Spender {
                        address: addr("0x1111111254EEB25477B68fb85Ed929f73A960582")?,
                        label: "1inch Router",
                    },
                ],
            },
        );

        chains.insert(
            Chain::Base,
            ChainConfig {
                endpoints: urls(&["https://base.llamarpc.com", "https://mainnet.base.org"]),
                native_feed: addr("0x4d5f47fa6a74757f35c14fd3a6ef8e3c9bc514e8")?,
                tokens: vec![Token {
                    address: addr("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913")?,
                    symbol: "USDC",
                    decimals: 6,
                    price_id: "usd-coin",
                }],
                spenders: vec![],
            },
        );

        chains.insert(
            Chain::Arbitrum,
            ChainConfig {
                endpoints: urls(&[
                    "https://arbitrum.llamarpc.com",
                    "https://arb1.arbitrum.io/rpc",
                ]),
                native_feed: addr("0x639fe6ab55c921f74e7fac1ee960c0b6293ba612")?,
                tokens: vec![Token {
                    address: addr("0xff970a61a04b1ca14834a43f5de4533ebddb5cc8")?,
                    symbol: "USDC.e",
                    decimals: 6,
                    price_id: "usd-coin",
                }],
                spenders: vec![],
            },
        );

        chains.insert(
            Chain::Polygon,
            ChainConfig {
                endpoints: urls(&["https://polygon.llamarpc.com", "https://polygon-rpc.com"]),
                native_feed: addr("0xab594600376ec9fd91f8e885dadf0ce036862de0")?,
                tokens: vec![Token {
                    address: addr("0x2791bca1f2de4661ed88a30c99a7a9449aa84174")?,
                    symbol: "USDC",
                    decimals: 6,
                    price_id: "usd-coin",
                }],
                spenders: vec![],
            },
        );

        chains.insert(
            Chain::Optimism,
            ChainConfig {
                endpoints: urls(&[
                    "https://optimism.llamarpc.com",
                    "https://mainnet.optimism.io",
                ]),
                native_feed: addr("0x13e3ee699d1909e989722e753853ae30b17e08c5")?,
                tokens: vec![Token {
                    address: addr("0x7f5c764cbc14f9669b88837ca1490cca17c31607")?,
                    symbol: "USDC.e",
                    decimals: 6,
                    price_id: "usd-coin",
                }],
                spenders: vec![],
            },
        );

        Ok(Self { chains })
    }

    /// Every `Chain` variant is configured at bootstrap, so this cannot miss.
    pub fn chain(&self, chain: Chain) -> &ChainConfig {
        &self.chains[&chain]
    }

    /// Finds the curated token deployed at `address`, if any.
    pub fn token_at(&self, chain: Chain, address: Address) -> Option<&Token> {
        self.chain(chain).tokens.iter().find(|t| t.address == address)
    }
}

fn addr(value: &str) -> anyhow::Result<Address> {
    value
        .parse::<Address>()
        .map_err(|e| anyhow::anyhow!("Invalid registry address {}: {}", value, e))
}

fn urls(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
