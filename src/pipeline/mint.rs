use alloy::primitives::{utils::format_ether, U256};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::accounts::Account;
use crate::config::{DropContract, GasConfig, MintConfig};
use crate::eth::drop_contract::{balance_of_calldata, claim_calldata, decode_balance};
use crate::eth::gas::{estimate_gas_limit, quote_gas_price};
use crate::eth::{
    sign_legacy, CallRequest, ChainClient, ErrorKind, MinedReceipt, NonceTracker, TxError,
    TxParams,
};
use crate::pipeline::batch::AccountTask;
use crate::pipeline::outcome::{AccountReport, Outcome, StepOutcome};
use crate::pipeline::report::short_address;
use crate::pipeline::stats::MintStats;
use crate::util::RetryPolicy;

pub const STEP_BALANCE: &str = "balance";
pub const STEP_NONCE: &str = "nonce";
pub const BELOW_MINIMUM: &str = "balance below minimum";
pub const ALREADY_OWNED: &str = "already owned";

/// Pause before the next attempt: a claim that was mined and failed waits
/// `retry_delay_ms`, one that errored before mining waits `send_retry_delay_ms`
fn retry_delay(config: &MintConfig, err: &anyhow::Error) -> Duration {
    match err.downcast_ref::<TxError>() {
        Some(TxError::MinedFailure(_)) => Duration::from_millis(config.retry_delay_ms),
        _ => Duration::from_millis(config.send_retry_delay_ms),
    }
}

/// Claims every catalog drop an account does not hold yet
pub struct MintPipeline {
    client: Arc<dyn ChainClient>,
    config: MintConfig,
    gas: GasConfig,
    chain_id: u64,
    retry: RetryPolicy,
}

impl MintPipeline {
    pub fn new(
        client: Arc<dyn ChainClient>,
        config: MintConfig,
        gas: GasConfig,
        chain_id: u64,
    ) -> Self {
        let retry = RetryPolicy::immediate(config.max_retries + 1)
            .with_retryable(TxError::is_retryable_error);

        Self {
            client,
            config,
            gas,
            chain_id,
            retry,
        }
    }

    /// `balanceOf(owner) > 0`. A failing view call counts as not owned.
    async fn owns(&self, account: &Account, contract: &DropContract) -> bool {
        let request = CallRequest {
            from: account.address,
            to: contract.address,
            value: U256::ZERO,
            input: balance_of_calldata(account.address),
        };
        let result = match self.client.call(&request).await {
            Ok(output) => decode_balance(&output),
            Err(e) => Err(e),
        };
        match result {
            Ok(balance) => !balance.is_zero(),
            Err(e) => {
                warn!(
                    "[{}] balanceOf on {} failed, treating as missing: {:#}",
                    account.index, contract.name, e
                );
                false
            }
        }
    }

    /// One claim attempt: quote, check funds, sign, broadcast, wait for the receipt
    async fn try_mint(
        &self,
        account: &Account,
        contract: &DropContract,
        nonces: &mut NonceTracker,
    ) -> Result<MinedReceipt> {
        let value = self.config.price_per_token * U256::from(self.config.quantity);
        let request = CallRequest {
            from: account.address,
            to: contract.address,
            value,
            input: claim_calldata(
                account.address,
                self.config.quantity,
                self.config.price_per_token,
            ),
        };

        let gas_price = quote_gas_price(self.client.as_ref(), &self.gas).await;
        let gas_limit = estimate_gas_limit(
            self.client.as_ref(),
            &request,
            self.config.gas_limit_buffer_pct,
            self.config.default_gas_limit,
        )
        .await;

        let params = TxParams {
            to: contract.address,
            value,
            input: request.input,
            gas_price,
            gas_limit,
            nonce: nonces.current(),
            chain_id: self.chain_id,
        };

        let cost = params.max_cost();
        debug!(
            "[{}] {} estimated cost {} (gas limit {})",
            account.index,
            contract.name,
            format_ether(cost),
            gas_limit
        );

        let balance = self.client.get_balance(account.address).await?;
        if balance < cost {
            return Err(TxError::InsufficientFunds(format!(
                "balance {} below cost {}",
                format_ether(balance),
                format_ether(cost)
            ))
            .into());
        }

        let signed = sign_legacy(&account.signer, &params)?;
        let tx_hash = self
            .client
            .send_raw_tx(signed.raw)
            .await
            .map_err(TxError::from_send_error)?;
        nonces.advance();
        info!("[{}] {} sent: {}", account.index, contract.name, tx_hash);

        let receipt = self
            .client
            .wait_for_receipt(tx_hash, self.config.receipt_timeout(), self.config.receipt_poll())
            .await?;
        if !receipt.success {
            return Err(TxError::MinedFailure(format!("{} mined with status 0", tx_hash)).into());
        }
        Ok(receipt)
    }

    /// Claim one drop with bounded retries. Nonce and funding errors end it at once.
    async fn mint_item(
        &self,
        account: &Account,
        contract: &DropContract,
        nonces: &mut NonceTracker,
        stats: &mut MintStats,
    ) -> StepOutcome {
        let mut attempt = 0;
        loop {
            match self.try_mint(account, contract, nonces).await {
                Ok(receipt) => {
                    info!(
                        "[{}] ✅ {} minted in block {:?}, gas used {}",
                        account.index, contract.name, receipt.block_number, receipt.gas_used
                    );
                    stats.record_success(receipt.gas_used);
                    return StepOutcome::succeeded(&contract.name);
                }
                Err(err) => {
                    let kind = TxError::kind_of(&err);
                    stats.record_error(kind);

                    if kind == ErrorKind::Nonce {
                        match self.client.get_pending_txn_count(account.address).await {
                            Ok(pending) => nonces.resync(pending),
                            Err(e) => warn!("[{}] nonce resync failed: {:#}", account.index, e),
                        }
                    }

                    if self.retry.should_retry(attempt, &err) {
                        warn!(
                            "[{}] {} attempt {}/{} failed ({}): {:#}",
                            account.index,
                            contract.name,
                            attempt + 1,
                            self.retry.max_attempts,
                            kind,
                            err
                        );
                        sleep(retry_delay(&self.config, &err)).await;
                        attempt += 1;
                        continue;
                    }

                    error!(
                        "[{}] ❌ {} failed ({}): {:#}",
                        account.index, contract.name, kind, err
                    );
                    stats.record_failure();
                    return StepOutcome::failed(&contract.name, kind.as_str());
                }
            }
        }
    }
}

#[async_trait]
impl AccountTask for MintPipeline {
    type Output = MintStats;

    async fn process(
        &self,
        account: &Account,
        report: &mut AccountReport,
        stats: &mut MintStats,
    ) {
        let addr = short_address(&account.address);

        let balance = match self.client.get_balance(account.address).await {
            Ok(balance) => balance,
            Err(e) => {
                error!("[{}] {}: balance query failed: {:#}", account.index, addr, e);
                report.push(StepOutcome::failed(STEP_BALANCE, "balance query failed"));
                return;
            }
        };
        info!(
            "🎯 Wallet {} {}: balance {}",
            account.index,
            addr,
            format_ether(balance)
        );

        if balance < self.config.min_balance {
            warn!(
                "[{}] balance below minimum {}, skipped",
                account.index,
                format_ether(self.config.min_balance)
            );
            report.push(StepOutcome::skipped(STEP_BALANCE, BELOW_MINIMUM));
            return;
        }

        let mut missing = Vec::new();
        for contract in &self.config.contracts {
            if self.owns(account, contract).await {
                report.push(StepOutcome::skipped(&contract.name, ALREADY_OWNED));
            } else {
                missing.push(contract);
            }
        }

        if missing.is_empty() {
            info!("[{}] 🎉 all drops already owned", account.index);
            return;
        }
        info!("[{}] {} drops to mint", account.index, missing.len());

        let mut nonces = match self.client.get_txn_count(account.address).await {
            Ok(count) => NonceTracker::new(count),
            Err(e) => {
                error!("[{}] nonce query failed: {:#}", account.index, e);
                report.push(StepOutcome::failed(STEP_NONCE, "nonce query failed"));
                return;
            }
        };

        let last = missing.len() - 1;
        for (i, contract) in missing.into_iter().enumerate() {
            info!(
                "[{}] 📍 minting {} ({}/{})",
                account.index,
                contract.name,
                i + 1,
                last + 1
            );
            let step = self
                .mint_item(account, contract, &mut nonces, stats)
                .await;
            let succeeded = step.outcome == Outcome::Succeeded;
            report.push(step);
            if i < last {
                sleep(self.config.after_item(succeeded)).await;
            }
        }

        info!(
            "[{}] 📊 {} minted, {} failed",
            account.index, stats.minted, stats.failed
        );
    }
}
