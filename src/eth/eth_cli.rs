use alloy::{
    network::{Ethereum, ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionRequest,
};
use anyhow::{Context as AnyhowContext, Result};
use async_trait::async_trait;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use std::collections::BTreeMap;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::eth::errors::TxError;
use crate::eth::tx_client::{CallRequest, ChainClient, MinedReceipt};
use crate::util::RetryPolicy;

/// Upper bound for a single broadcast
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Format large numbers with appropriate suffixes (K, M, B)
fn format_large_number(num: u64) -> String {
    if num >= 1_000_000_000 {
        format!("{:.1}B", num as f64 / 1_000_000_000.0)
    } else if num >= 1_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else if num >= 10_000 {
        format!("{:.1}K", num as f64 / 1_000.0)
    } else {
        num.to_string()
    }
}

#[derive(Debug, Default, Clone)]
pub struct MethodMetrics {
    pub requests_sent: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub total_latency_ms: u64,
}

#[derive(Debug, Default, Clone)]
pub struct ProviderMetrics {
    pub per_method: BTreeMap<String, MethodMetrics>,
}

/// JSON-RPC client for the target chain, with bounded retries on read calls
#[derive(Clone)]
pub struct EthHttpCli {
    inner: Arc<RootProvider<Ethereum>>,
    metrics: Arc<tokio::sync::Mutex<ProviderMetrics>>,
    retry: RetryPolicy,
    rpc: Arc<String>,
}

fn to_request(request: &CallRequest) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(request.from)
        .with_to(request.to)
        .with_value(request.value)
        .with_input(request.input.clone())
}

impl EthHttpCli {
    pub fn rpc(&self) -> Arc<String> {
        self.rpc.clone()
    }

    /// Create new client instance
    pub fn new(rpc_url: &str, retry: RetryPolicy) -> Result<Self> {
        debug!("Creating EthHttpCli for URL: {}", rpc_url);

        let url =
            Url::parse(rpc_url).with_context(|| format!("Failed to parse RPC URL: {}", rpc_url))?;
        let provider: RootProvider<Ethereum> = ProviderBuilder::default().connect_http(url);

        // a reverted eth_call will revert again
        let retry = retry.with_retryable(|err| {
            let msg = err.to_string().to_lowercase();
            !msg.contains("revert")
        });

        Ok(Self {
            rpc: Arc::new(rpc_url.to_string()),
            inner: Arc::new(provider),
            metrics: Arc::new(tokio::sync::Mutex::new(ProviderMetrics::default())),
            retry,
        })
    }

    /// Execute operation with retry mechanism and record it under `method`
    async fn retry_with_backoff<F, Fut, T>(&self, method: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, alloy::transports::TransportError>>,
    {
        let start = Instant::now();

        let result = self
            .retry
            .run(|_| {
                let fut = operation();
                async move { fut.await.map_err(anyhow::Error::from) }
            })
            .await;

        self.update_metrics(method, result.is_ok(), start.elapsed())
            .await;

        result
    }

    /// Update performance metrics
    async fn update_metrics(&self, method: &str, success: bool, latency: Duration) {
        let mut metrics = self.metrics.lock().await;
        let method_metrics = metrics.per_method.entry(method.to_string()).or_default();

        method_metrics.requests_sent += 1;

        if success {
            method_metrics.requests_succeeded += 1;
        } else {
            method_metrics.requests_failed += 1;
        }

        let latency_ms = std::cmp::max(1, latency.as_millis() as u64);
        method_metrics.total_latency_ms += latency_ms;
    }

    /// Get a copy of performance metrics
    pub async fn get_metrics(&self) -> ProviderMetrics {
        self.metrics.lock().await.clone()
    }

    /// Log performance metrics
    pub async fn log_metrics_summary(&self) {
        let metrics = self.get_metrics().await;
        if metrics.per_method.is_empty() {
            info!("RPC Metrics for [{}]: No requests recorded yet.", self.rpc);
            return;
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);

        table.set_header(vec![
            "RPC Method",
            "Sent",
            "Succeeded",
            "Failed",
            "Success Rate",
            "Avg Latency",
        ]);

        for (method, stats) in &metrics.per_method {
            let success_rate = if stats.requests_sent > 0 {
                stats.requests_succeeded as f64 / stats.requests_sent as f64 * 100.0
            } else {
                0.0
            };
            let avg_latency = if stats.requests_sent > 0 {
                stats.total_latency_ms as f64 / stats.requests_sent as f64
            } else {
                0.0
            };

            table.add_row(vec![
                Cell::new(method),
                Cell::new(format_large_number(stats.requests_sent)),
                Cell::new(format_large_number(stats.requests_succeeded)),
                Cell::new(format_large_number(stats.requests_failed)),
                Cell::new(format!("{:.1}%", success_rate)),
                Cell::new(format!("{:.1}ms", avg_latency)),
            ]);
        }

        let total_sent: u64 = metrics.per_method.values().map(|m| m.requests_sent).sum();
        let total_succeeded: u64 = metrics
            .per_method
            .values()
            .map(|m| m.requests_succeeded)
            .sum();
        let total_failed: u64 = metrics.per_method.values().map(|m| m.requests_failed).sum();
        let overall_success_rate = if total_sent > 0 {
            total_succeeded as f64 / total_sent as f64 * 100.0
        } else {
            0.0
        };

        table.add_row(vec![
            Cell::new("TOTAL"),
            Cell::new(format_large_number(total_sent)),
            Cell::new(format_large_number(total_succeeded)),
            Cell::new(format_large_number(total_failed)),
            Cell::new(format!("{:.1}%", overall_success_rate)),
            Cell::new("-"),
        ]);

        info!("RPC Metrics for [{}]\n{}", self.rpc, table);
    }
}

#[async_trait]
impl ChainClient for EthHttpCli {
    fn rpc(&self) -> Arc<String> {
        EthHttpCli::rpc(self)
    }

    async fn chain_id(&self) -> Result<u64> {
        self.retry_with_backoff("eth_chainId", || self.inner.get_chain_id())
            .await
            .with_context(|| "Failed to get chain id")
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        self.retry_with_backoff("eth_getBalance", || self.inner.get_balance(address).into_future())
            .await
            .with_context(|| format!("Failed to get balance for address: {:?}", address))
    }

    async fn get_txn_count(&self, address: Address) -> Result<u64> {
        self.retry_with_backoff("eth_getTransactionCount", || {
            self.inner.get_transaction_count(address).into_future()
        })
        .await
        .with_context(|| format!("Failed to get transaction count for address: {:?}", address))
    }

    async fn get_pending_txn_count(&self, address: Address) -> Result<u64> {
        self.retry_with_backoff("eth_getTransactionCount", || {
            self.inner.get_transaction_count(address).pending().into_future()
        })
        .await
        .with_context(|| {
            format!(
                "Failed to get pending transaction count for address: {:?}",
                address
            )
        })
    }

    async fn get_gas_price(&self) -> Result<u128> {
        self.retry_with_backoff("eth_gasPrice", || self.inner.get_gas_price())
            .await
            .with_context(|| "Failed to get gas price")
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64> {
        let start = Instant::now();
        let result = self.inner.estimate_gas(to_request(request)).await;
        self.update_metrics("eth_estimateGas", result.is_ok(), start.elapsed())
            .await;
        result.with_context(|| format!("Failed to estimate gas for call to {}", request.to))
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes> {
        self.retry_with_backoff("eth_call", || {
            self.inner.call(to_request(request)).into_future()
        })
        .await
        .with_context(|| format!("eth_call to {} failed", request.to))
    }

    async fn send_raw_tx(&self, tx_bytes: Vec<u8>) -> Result<TxHash> {
        let start = Instant::now();
        let op = async {
            let pending_tx = self.inner.send_raw_transaction(&tx_bytes).await?;
            anyhow::Ok(*pending_tx.tx_hash())
        };

        let result = tokio::time::timeout(SEND_TIMEOUT, op).await;

        let final_result = match result {
            Ok(Ok(hash)) => Ok(hash),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(TxError::Timeout(format!(
                "eth_sendRawTransaction timed out after {:?}",
                SEND_TIMEOUT
            ))
            .into()),
        };

        self.update_metrics(
            "eth_sendRawTransaction",
            final_result.is_ok(),
            start.elapsed(),
        )
        .await;

        final_result
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<MinedReceipt>> {
        let receipt = self
            .retry_with_backoff("eth_getTransactionReceipt", || {
                self.inner.get_transaction_receipt(tx_hash)
            })
            .await
            .with_context(|| format!("Failed to get transaction receipt for hash: {:?}", tx_hash))?;

        Ok(receipt.map(|receipt| MinedReceipt {
            tx_hash,
            success: ReceiptResponse::status(&receipt),
            gas_used: ReceiptResponse::gas_used(&receipt),
            block_number: ReceiptResponse::block_number(&receipt),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_numbers_get_suffixes() {
        assert_eq!(format_large_number(999), "999");
        assert_eq!(format_large_number(12_500), "12.5K");
        assert_eq!(format_large_number(3_000_000), "3.0M");
    }

    #[test]
    fn rejects_malformed_url() {
        assert!(EthHttpCli::new("not a url", RetryPolicy::default()).is_err());
    }

    #[tokio::test]
    async fn metrics_count_successes_and_failures() {
        let cli = EthHttpCli::new("http://127.0.0.1:8545", RetryPolicy::default()).unwrap();
        cli.update_metrics("eth_gasPrice", true, Duration::from_millis(5))
            .await;
        cli.update_metrics("eth_gasPrice", false, Duration::from_millis(0))
            .await;

        let metrics = cli.get_metrics().await;
        let gas = &metrics.per_method["eth_gasPrice"];
        assert_eq!(gas.requests_sent, 2);
        assert_eq!(gas.requests_succeeded, 1);
        assert_eq!(gas.requests_failed, 1);
        assert_eq!(gas.total_latency_ms, 6);
    }
}
