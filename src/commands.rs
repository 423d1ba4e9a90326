//! Entry points for each CLI subcommand

use anyhow::{Context, Result};
use chrono::Local;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use crate::accounts::{load_private_keys, read_invite_code, Account};
use crate::api::FaucetApi;
use crate::config::BotConfig;
use crate::eth::{ChainClient, EthHttpCli};
use crate::pipeline::report::{log_faucet_report, log_mint_report, log_transfer_report};
use crate::pipeline::{
    parse_amount, plan_transfer, run_batch, run_transfer, BatchOptions, BatchResult,
    FaucetPipeline, MintPipeline, MintStats, TransferReport,
};
use crate::util::Shutdown;

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

async fn load_accounts(config: &BotConfig) -> Vec<Account> {
    let accounts = load_private_keys(&config.key_file).await;
    if accounts.is_empty() {
        error!("❌ No valid private keys in {:?}, nothing to do", config.key_file);
    } else {
        info!("🔑 Loaded {} wallets", accounts.len());
    }
    accounts
}

fn connect(config: &BotConfig) -> Result<Arc<EthHttpCli>> {
    let client = EthHttpCli::new(&config.node.rpc_url, config.retry.policy())?;
    Ok(Arc::new(client))
}

async fn resolve_chain_id(config: &BotConfig, client: &dyn ChainClient) -> Result<u64> {
    let chain_id = match config.node.chain_id {
        Some(id) => id,
        None => client
            .chain_id()
            .await
            .with_context(|| format!("Failed to query chain id from {}", client.rpc()))?,
    };
    info!("🔗 Chain ID: {} | RPC: {}", chain_id, client.rpc());
    Ok(chain_id)
}

/// Mint missing drops for every wallet. `delay` overrides the wallet delay.
pub async fn run_mint(
    config: &BotConfig,
    delay: Option<Duration>,
    shutdown: Shutdown,
) -> Result<MintStats> {
    info!("🚀 Starting NFT minting at {}", timestamp());
    let accounts = load_accounts(config).await;
    if accounts.is_empty() {
        return Ok(MintStats::default());
    }

    let client = connect(config)?;
    let chain_id = resolve_chain_id(config, client.as_ref()).await?;
    let pipeline = MintPipeline::new(
        client.clone(),
        config.mint.clone(),
        config.gas.clone(),
        chain_id,
    );
    let options = BatchOptions {
        concurrency: config.concurrency,
        delay_between_accounts: delay.unwrap_or_else(|| config.mint.wallet_delay()),
        show_progress: true,
    };

    let result = run_batch(&pipeline, &accounts, &options, shutdown).await;

    let mut totals = MintStats::default();
    for stats in result.outputs() {
        totals.merge(stats);
    }
    log_mint_report(&result, &totals);
    client.log_metrics_summary().await;
    info!("⏱️  Completed at {}", timestamp());
    Ok(totals)
}

/// One faucet pass over every wallet
pub async fn run_faucet(
    config: &BotConfig,
    shutdown: Shutdown,
) -> Result<BatchResult<Option<u64>>> {
    info!("🚰 Faucet run at {}", timestamp());
    let accounts = load_accounts(config).await;
    if accounts.is_empty() {
        return Ok(BatchResult {
            entries: Vec::new(),
            interrupted: false,
        });
    }

    let invite_code = read_invite_code(&config.invite_file).await;
    let api = FaucetApi::new(&config.faucet, config.retry.policy())?;
    let pipeline = FaucetPipeline::new(api, invite_code, config.faucet.login_message.clone());
    let options = BatchOptions {
        concurrency: config.concurrency,
        delay_between_accounts: config.faucet.account_pause(),
        show_progress: true,
    };

    let result = run_batch(&pipeline, &accounts, &options, shutdown).await;
    log_faucet_report(&result);
    Ok(result)
}

/// Repeat the faucet pass every `interval` until interrupted
pub async fn run_faucet_loop(
    config: &BotConfig,
    interval: Option<Duration>,
    mut shutdown: Shutdown,
) -> Result<()> {
    let interval = interval.unwrap_or_else(|| config.faucet.loop_interval());
    loop {
        let result = run_faucet(config, shutdown.clone()).await?;
        if result.interrupted || shutdown.is_triggered() {
            return Ok(());
        }

        let hours = (interval.as_secs() / 3600).max(1);
        info!("⏳ Next cycle in {:?} (~{}h)", interval, hours);
        tokio::select! {
            _ = sleep(interval) => {},
            _ = shutdown.wait() => return Ok(()),
        }
    }
}

/// Send `amount` from wallet `sender` (1-based) to every other wallet
pub async fn run_send(
    config: &BotConfig,
    sender: usize,
    amount: &str,
    shutdown: Shutdown,
) -> Result<Option<TransferReport>> {
    let amount = parse_amount(amount)?;
    let accounts = load_accounts(config).await;
    if accounts.is_empty() {
        return Ok(None);
    }
    let plan = plan_transfer(&accounts, sender, amount)?;

    let client = connect(config)?;
    let chain_id = resolve_chain_id(config, client.as_ref()).await?;

    let report = run_transfer(
        client.as_ref(),
        &plan,
        &config.gas,
        &config.transfer,
        chain_id,
        shutdown,
    )
    .await?;
    log_transfer_report(&report);
    client.log_metrics_summary().await;
    info!("⏱️  Completed at {}", timestamp());
    Ok(Some(report))
}

/// Mint pass followed by one faucet pass
pub async fn run_all(
    config: &BotConfig,
    delay: Option<Duration>,
    shutdown: Shutdown,
) -> Result<()> {
    run_mint(config, delay, shutdown.clone()).await?;
    if shutdown.is_triggered() {
        return Ok(());
    }
    run_faucet(config, shutdown).await?;
    Ok(())
}
