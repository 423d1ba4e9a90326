use alloy::primitives::{
    utils::{format_ether, format_units, parse_ether},
    Address, Bytes, TxHash, U256,
};
use anyhow::{bail, Context, Result};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::accounts::Account;
use crate::config::{GasConfig, TransferConfig};
use crate::eth::gas::quote_gas_price;
use crate::eth::{sign_legacy, ChainClient, ErrorKind, NonceTracker, TxError, TxParams};
use crate::pipeline::outcome::{AccountReport, Outcome, StepOutcome, INTERRUPTED};
use crate::pipeline::report::short_address;
use crate::util::Shutdown;

pub const STEP_TRANSFER: &str = "transfer";

/// One sender paying the same amount to every other loaded account
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub sender: Account,
    pub recipients: Vec<Account>,
    pub amount: U256,
}

/// Decimal native-token amount, e.g. "0.001". Must be positive.
pub fn parse_amount(amount: &str) -> Result<U256> {
    let value = parse_ether(amount.trim())
        .with_context(|| format!("Invalid amount: {:?}", amount))?;
    if value.is_zero() {
        bail!("Amount must be greater than zero");
    }
    Ok(value)
}

/// `sender` is the 1-based position in `accounts`
pub fn plan_transfer(accounts: &[Account], sender: usize, amount: U256) -> Result<TransferPlan> {
    if accounts.len() < 2 {
        bail!(
            "At least 2 valid keys are needed (sender + recipient), found {}",
            accounts.len()
        );
    }
    if sender == 0 || sender > accounts.len() {
        bail!("Sender must be between 1 and {}, got {}", accounts.len(), sender);
    }
    if amount.is_zero() {
        bail!("Amount must be greater than zero");
    }

    let sender_account = accounts[sender - 1].clone();
    let recipients = accounts
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != sender - 1)
        .map(|(_, account)| account.clone())
        .collect();

    Ok(TransferPlan {
        sender: sender_account,
        recipients,
        amount,
    })
}

#[derive(Debug, Clone)]
pub struct TransferReport {
    pub sender: Address,
    pub amount: U256,
    pub recipients: usize,
    pub gas_price: u128,
    /// Set when the pre-flight check failed and nothing was sent
    pub shortfall: Option<U256>,
    /// One row per recipient, in recipient order
    pub rows: Vec<AccountReport>,
    pub tx_hashes: Vec<TxHash>,
}

impl TransferReport {
    pub fn succeeded(&self) -> usize {
        self.count(Outcome::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::Failed)
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.rows.iter().filter(|r| r.outcome() == outcome).count()
    }
}

/// Value plus worst-case gas for all recipients
pub fn required_balance(amount: U256, recipients: usize, gas_price: u128, gas_limit: u64) -> U256 {
    let n = U256::from(recipients);
    amount * n + U256::from(gas_price) * U256::from(gas_limit) * n
}

/// Send `plan.amount` to each recipient in turn without waiting for receipts.
///
/// The nonce moves forward only when the node accepts a broadcast; after a
/// nonce conflict it is re-read from the pending transaction count.
pub async fn run_transfer(
    client: &dyn ChainClient,
    plan: &TransferPlan,
    gas: &GasConfig,
    config: &TransferConfig,
    chain_id: u64,
    mut shutdown: Shutdown,
) -> Result<TransferReport> {
    let sender = &plan.sender;
    let gas_price = quote_gas_price(client, gas).await;

    let balance = client.get_balance(sender.address).await?;
    let required = required_balance(
        plan.amount,
        plan.recipients.len(),
        gas_price,
        config.gas_limit,
    );
    info!(
        "👤 Sender {} balance {} | 🎯 {} recipients x {} | gas price {} gwei",
        short_address(&sender.address),
        format_ether(balance),
        plan.recipients.len(),
        format_ether(plan.amount),
        format_units(U256::from(gas_price), "gwei").unwrap_or_else(|_| gas_price.to_string())
    );

    let mut report = TransferReport {
        sender: sender.address,
        amount: plan.amount,
        recipients: plan.recipients.len(),
        gas_price,
        shortfall: None,
        rows: Vec::new(),
        tx_hashes: Vec::new(),
    };

    if balance < required {
        let shortfall = required - balance;
        error!(
            "❌ Balance too low: need ~{}, have {}, short {}",
            format_ether(required),
            format_ether(balance),
            format_ether(shortfall)
        );
        report.shortfall = Some(shortfall);
        return Ok(report);
    }

    let mut nonces = NonceTracker::new(client.get_txn_count(sender.address).await?);
    let total = plan.recipients.len();

    for (i, recipient) in plan.recipients.iter().enumerate() {
        let mut row = AccountReport::new(recipient.index, recipient.address);
        if shutdown.is_triggered() {
            row.push(StepOutcome::skipped(STEP_TRANSFER, INTERRUPTED));
            report.rows.push(row);
            continue;
        }

        let params = TxParams {
            to: recipient.address,
            value: plan.amount,
            input: Bytes::new(),
            gas_price,
            gas_limit: config.gas_limit,
            nonce: nonces.current(),
            chain_id,
        };

        let sent = match sign_legacy(&sender.signer, &params) {
            Ok(signed) => client
                .send_raw_tx(signed.raw)
                .await
                .map_err(TxError::from_send_error),
            Err(e) => Err(TxError::from_send_error(e)),
        };

        match sent {
            Ok(tx_hash) => {
                info!(
                    "  [{}/{}] → {} | nonce {} | TX: {}",
                    i + 1,
                    total,
                    short_address(&recipient.address),
                    params.nonce,
                    tx_hash
                );
                nonces.advance();
                report.tx_hashes.push(tx_hash);
                row.push(StepOutcome::succeeded(STEP_TRANSFER).with_note(tx_hash.to_string()));
            }
            Err(err) => {
                warn!(
                    "  [{}/{}] → {} | ❌ {}",
                    i + 1,
                    total,
                    short_address(&recipient.address),
                    err
                );
                if err.kind() == ErrorKind::Nonce {
                    match client.get_pending_txn_count(sender.address).await {
                        Ok(pending) => nonces.resync(pending),
                        Err(e) => warn!("Nonce resync failed: {:#}", e),
                    }
                }
                row.push(StepOutcome::failed(STEP_TRANSFER, err.kind().as_str()));
            }
        }
        report.rows.push(row);

        if i + 1 < total {
            tokio::select! {
                _ = sleep(config.pause()) => {},
                _ = shutdown.wait() => {},
            }
        }
    }

    Ok(report)
}
