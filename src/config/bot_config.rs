use alloy::primitives::{address, utils::parse_ether, Address, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::util::RetryPolicy;

/// Complete configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BotConfig {
    /// Newline-delimited private keys
    pub key_file: PathBuf,
    /// Optional invite code for the faucet login
    pub invite_file: PathBuf,
    /// Accounts processed at the same time (1 = strictly sequential)
    pub concurrency: usize,
    pub node: NodeConfig,
    pub retry: RetrySettings,
    pub gas: GasConfig,
    pub faucet: FaucetConfig,
    pub mint: MintConfig,
    pub transfer: TransferConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            key_file: PathBuf::from("privatekey.txt"),
            invite_file: PathBuf::from("reff.txt"),
            concurrency: 1,
            node: NodeConfig::default(),
            retry: RetrySettings::default(),
            gas: GasConfig::default(),
            faucet: FaucetConfig::default(),
            mint: MintConfig::default(),
            transfer: TransferConfig::default(),
        }
    }
}

/// Node and chain configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    pub rpc_url: String,
    /// Queried from the node when not set
    pub chain_id: Option<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://testnet.dplabs-internal.com".to_string(),
            chain_id: None,
        }
    }
}

/// Backoff settings shared by the HTTP helper and the RPC client
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            backoff_multiplier: 1.5,
            max_delay_ms: 10_000,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            self.backoff_multiplier,
        )
        .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

/// Gas price quoting shared by the mint and transfer pipelines
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GasConfig {
    /// Node-quoted gas price is multiplied by this percentage
    pub price_buffer_pct: u64,
    /// Used when the node cannot quote a price
    pub fallback_price_wei: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            price_buffer_pct: 110,
            fallback_price_wei: 1_000_000_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FaucetConfig {
    pub api_url: String,
    pub origin: String,
    pub referer: String,
    pub user_agent: String,
    /// Challenge signed with personal_sign for the login call
    pub login_message: String,
    pub request_timeout_secs: u64,
    pub account_pause_ms: u64,
    pub loop_interval_secs: u64,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.pharosnetwork.xyz".to_string(),
            origin: "https://testnet.pharosnetwork.xyz".to_string(),
            referer: "https://testnet.pharosnetwork.xyz/".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36"
                .to_string(),
            login_message: "pharos".to_string(),
            request_timeout_secs: 15,
            account_pause_ms: 300,
            loop_interval_secs: 3_600,
        }
    }
}

impl FaucetConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn account_pause(&self) -> Duration {
        Duration::from_millis(self.account_pause_ms)
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_secs(self.loop_interval_secs)
    }
}

/// A claimable drop in the mint catalog
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DropContract {
    pub name: String,
    pub address: Address,
}

impl DropContract {
    pub fn new(name: impl Into<String>, address: Address) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

fn from_ether_str<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_ether(&s).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MintConfig {
    /// Accounts below this native balance are skipped, e.g. "0.1"
    #[serde(deserialize_with = "from_ether_str")]
    pub min_balance: U256,
    /// Price passed to `claim` and sent as value, e.g. "1"
    #[serde(deserialize_with = "from_ether_str")]
    pub price_per_token: U256,
    pub quantity: u64,
    /// Used when gas estimation fails
    pub default_gas_limit: u64,
    pub gas_limit_buffer_pct: u64,
    pub receipt_timeout_secs: u64,
    pub receipt_poll_ms: u64,
    /// Extra attempts after the first one
    pub max_retries: usize,
    /// Wait before retrying a claim that was mined with failure status
    pub retry_delay_ms: u64,
    /// Wait before retrying a claim that errored before it was mined
    pub send_retry_delay_ms: u64,
    pub after_success_ms: u64,
    pub after_failure_ms: u64,
    pub wallet_delay_secs: u64,
    pub contracts: Vec<DropContract>,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            min_balance: U256::from(100_000_000_000_000_000u128),
            price_per_token: U256::from(1_000_000_000_000_000_000u128),
            quantity: 1,
            default_gas_limit: 250_000,
            gas_limit_buffer_pct: 120,
            receipt_timeout_secs: 180,
            receipt_poll_ms: 2_000,
            max_retries: 2,
            retry_delay_ms: 3_000,
            send_retry_delay_ms: 5_000,
            after_success_ms: 3_000,
            after_failure_ms: 2_000,
            wallet_delay_secs: 5,
            contracts: default_catalog(),
        }
    }
}

impl MintConfig {
    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn receipt_poll(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }

    pub fn wallet_delay(&self) -> Duration {
        Duration::from_secs(self.wallet_delay_secs)
    }

    pub fn after_item(&self, succeeded: bool) -> Duration {
        if succeeded {
            Duration::from_millis(self.after_success_ms)
        } else {
            Duration::from_millis(self.after_failure_ms)
        }
    }
}

fn default_catalog() -> Vec<DropContract> {
    vec![
        DropContract::new("NFT 1", address!("1da9f40036bee3fda37ddd9bff624e1125d8991d")),
        DropContract::new("NFT 2", address!("2a469a4073480596b9deb19f52aa89891ccff5ce")),
        DropContract::new("NFT 3", address!("e71188df7be6321ffd5aaa6e52e6c96375e62793")),
        DropContract::new("NFT 4", address!("b2ac4f09735007562c513ebbe152a8d7fa682bef")),
        DropContract::new("NFT 5", address!("96381ed3fcfb385cbacfe6908159f0905b19767a")),
        DropContract::new("NFT 6", address!("0d00314d006e70ca08ac37c3469b4bf958a7580b")),
        DropContract::new("NFT 7", address!("4af366c7269dc9a0335bd055af979729c20e0f5f")),
        DropContract::new("NFT 8", address!("9979b7fedf761c2989642f63ba6ed580dbdfc46f")),
        DropContract::new("NFT 9", address!("822483f6cf39b7dad66fec5f4feecbfd72172626")),
    ]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransferConfig {
    pub gas_limit: u64,
    pub pause_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            gas_limit: 21_000,
            pause_ms: 300,
        }
    }
}

impl TransferConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl BotConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: BotConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// Like [`BotConfig::load`], but falls back to the built-in defaults when
    /// the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            info!(
                "Config file {:?} not found, using built-in defaults",
                path.as_ref()
            );
            Ok(Self::default())
        }
    }
}
