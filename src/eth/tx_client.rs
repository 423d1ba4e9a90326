use alloy::primitives::{Address, Bytes, TxHash, U256};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::debug;

use crate::eth::errors::TxError;

/// Simulated call used for `eth_call` and `eth_estimateGas`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
}

/// The parts of a receipt the pipelines care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinedReceipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub gas_used: u64,
    pub block_number: Option<u64>,
}

/// Chain access used by the mint and transfer pipelines.
/// EthHttpCli implements it against a JSON-RPC node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Get the RPC URL
    fn rpc(&self) -> Arc<String>;

    async fn chain_id(&self) -> Result<u64>;

    async fn get_balance(&self, address: Address) -> Result<U256>;

    /// Get transaction count (nonce) for an address at the latest block
    async fn get_txn_count(&self, address: Address) -> Result<u64>;

    /// Transaction count including transactions still in the pool
    async fn get_pending_txn_count(&self, address: Address) -> Result<u64>;

    async fn get_gas_price(&self) -> Result<u128>;

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64>;

    /// Read-only contract call
    async fn call(&self, request: &CallRequest) -> Result<Bytes>;

    /// Send a single raw transaction
    async fn send_raw_tx(&self, tx_bytes: Vec<u8>) -> Result<TxHash>;

    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<MinedReceipt>>;

    /// Poll for the receipt until it exists or `timeout` elapses
    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<MinedReceipt> {
        let start = Instant::now();
        loop {
            match self.get_receipt(tx_hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                Err(e) => debug!("Receipt query for {} failed: {:#}", tx_hash, e),
            }
            if start.elapsed() >= timeout {
                return Err(TxError::Timeout(format!(
                    "no receipt for {} after {:?}",
                    tx_hash, timeout
                ))
                .into());
            }
            sleep(poll_interval).await;
        }
    }
}
