use tracing::warn;

use crate::config::GasConfig;
use crate::eth::tx_client::{CallRequest, ChainClient};

pub fn apply_buffer(value: u128, buffer_pct: u64) -> u128 {
    value.saturating_mul(buffer_pct as u128) / 100
}

/// Node-quoted gas price plus the configured buffer, or the fallback price
pub async fn quote_gas_price(client: &dyn ChainClient, config: &GasConfig) -> u128 {
    match client.get_gas_price().await {
        Ok(price) => apply_buffer(price, config.price_buffer_pct),
        Err(e) => {
            warn!(
                "Gas price query failed, using fallback {} wei: {:#}",
                config.fallback_price_wei, e
            );
            config.fallback_price_wei as u128
        }
    }
}

/// Simulated gas plus the buffer, or `fallback` when estimation fails
pub async fn estimate_gas_limit(
    client: &dyn ChainClient,
    request: &CallRequest,
    buffer_pct: u64,
    fallback: u64,
) -> u64 {
    match client.estimate_gas(request).await {
        Ok(estimated) => apply_buffer(estimated as u128, buffer_pct) as u64,
        Err(e) => {
            warn!(
                "Gas estimation failed, using default limit {}: {:#}",
                fallback, e
            );
            fallback
        }
    }
}
