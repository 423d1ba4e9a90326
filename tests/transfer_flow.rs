mod common;

use alloy::primitives::U256;
use pharos_batch::config::{GasConfig, TransferConfig};
use pharos_batch::pipeline::{plan_transfer, run_transfer, Outcome};
use pharos_batch::util::shutdown::channel;
use pharos_batch::util::Shutdown;

use crate::common::{accounts, ether, MockChain};

fn no_pause() -> TransferConfig {
    TransferConfig {
        pause_ms: 0,
        ..TransferConfig::default()
    }
}

#[tokio::test]
async fn every_other_account_receives_once_with_increasing_nonces() {
    let chain = MockChain::new();
    let wallets = accounts(4);
    let sender = &wallets[1];
    chain.set_balance(sender.address, ether(10));
    chain.set_tx_count(sender.address, 5);

    let plan = plan_transfer(&wallets, 2, ether(1)).unwrap();
    let report = run_transfer(
        &chain,
        &plan,
        &GasConfig::default(),
        &no_pause(),
        688_688,
        Shutdown::never(),
    )
    .await
    .unwrap();

    let sent = chain.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|tx| tx.from == sender.address && tx.to != sender.address));
    assert_eq!(sent.iter().map(|tx| tx.nonce).collect::<Vec<_>>(), vec![5, 6, 7]);
    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.tx_hashes.len(), 3);
    assert_eq!(
        report.rows.iter().map(|r| r.index).collect::<Vec<_>>(),
        vec![1, 3, 4]
    );
}

#[tokio::test]
async fn failed_broadcast_reuses_its_nonce() {
    let chain = MockChain::new();
    let wallets = accounts(4);
    chain.set_balance(wallets[0].address, ether(10));
    chain.script_sends(vec![None, Some("connection reset by peer"), None]);

    let plan = plan_transfer(&wallets, 1, ether(1)).unwrap();
    let report = run_transfer(
        &chain,
        &plan,
        &GasConfig::default(),
        &no_pause(),
        688_688,
        Shutdown::never(),
    )
    .await
    .unwrap();

    let sent = chain.sent();
    assert_eq!(sent.iter().map(|tx| tx.nonce).collect::<Vec<_>>(), vec![0, 1, 1]);
    assert_eq!(
        chain.accepted().iter().map(|tx| tx.nonce).collect::<Vec<_>>(),
        vec![0, 1]
    );
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.rows[1].outcome(), Outcome::Failed);
}

#[tokio::test]
async fn insufficient_balance_sends_nothing() {
    let chain = MockChain::new();
    let wallets = accounts(3);
    // covers the value for two recipients but not the gas
    chain.set_balance(wallets[0].address, ether(2));

    let plan = plan_transfer(&wallets, 1, ether(1)).unwrap();
    let report = run_transfer(
        &chain,
        &plan,
        &GasConfig::default(),
        &no_pause(),
        688_688,
        Shutdown::never(),
    )
    .await
    .unwrap();

    assert!(chain.sent().is_empty());
    assert!(report.rows.is_empty());
    // 1.1 gwei * 21000 gas * 2 recipients
    assert_eq!(report.shortfall, Some(U256::from(46_200_000_000_000u64)));
}

#[tokio::test]
async fn interrupt_before_start_skips_all_recipients() {
    let chain = MockChain::new();
    let wallets = accounts(3);
    chain.set_balance(wallets[0].address, ether(10));
    let (trigger, shutdown) = channel();
    trigger.trigger();

    let plan = plan_transfer(&wallets, 1, ether(1)).unwrap();
    let report = run_transfer(&chain, &plan, &GasConfig::default(), &no_pause(), 688_688, shutdown)
        .await
        .unwrap();

    assert!(chain.sent().is_empty());
    assert_eq!(report.rows.len(), 2);
    assert!(report.rows.iter().all(|r| r.outcome() == Outcome::Skipped));
}
