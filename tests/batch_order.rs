mod common;

use alloy::primitives::Address;
use async_trait::async_trait;
use std::time::Duration;

use pharos_batch::accounts::Account;
use pharos_batch::pipeline::{
    run_batch, AccountReport, AccountTask, BatchOptions, Outcome, StepOutcome,
};
use pharos_batch::util::shutdown::channel;
use pharos_batch::util::Shutdown;

use crate::common::accounts;

/// Later accounts finish first
struct ReverseSleeper {
    total: usize,
}

#[async_trait]
impl AccountTask for ReverseSleeper {
    type Output = Address;

    async fn process(&self, account: &Account, report: &mut AccountReport, out: &mut Address) {
        let wait = (self.total - account.index) as u64 * 20;
        tokio::time::sleep(Duration::from_millis(wait)).await;
        report.push(StepOutcome::succeeded("work"));
        *out = account.address;
    }
}

/// Records one step, then never finishes on its own
struct Stuck;

#[async_trait]
impl AccountTask for Stuck {
    type Output = u32;

    async fn process(&self, _account: &Account, report: &mut AccountReport, done: &mut u32) {
        report.push(StepOutcome::succeeded("prepare"));
        *done += 1;
        std::future::pending::<()>().await
    }
}

fn quiet(concurrency: usize) -> BatchOptions {
    BatchOptions {
        concurrency,
        delay_between_accounts: Duration::ZERO,
        show_progress: false,
    }
}

#[tokio::test]
async fn rows_follow_input_order_under_concurrency() {
    let wallets = accounts(4);
    let task = ReverseSleeper { total: wallets.len() };

    let result = run_batch(&task, &wallets, &quiet(4), Shutdown::never()).await;

    assert!(!result.interrupted);
    assert_eq!(
        result.reports().map(|r| r.index).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(
        result.outputs().copied().collect::<Vec<_>>(),
        wallets.iter().map(|w| w.address).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn interrupt_fails_current_and_skips_the_rest() {
    let wallets = accounts(3);
    let (trigger, shutdown) = channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.trigger();
    });
    let result = run_batch(&Stuck, &wallets, &quiet(1), shutdown).await;

    assert!(result.interrupted);
    let outcomes: Vec<_> = result.reports().map(|r| r.outcome()).collect();
    assert_eq!(
        outcomes,
        vec![Outcome::Failed, Outcome::Skipped, Outcome::Skipped]
    );
    let first = &result.entries[0];
    assert_eq!(
        first.report.step("prepare").map(|s| s.outcome),
        Some(Outcome::Succeeded)
    );
    assert_eq!(first.report.step("run").and_then(|s| s.note.as_deref()), Some("interrupted"));
    assert_eq!(first.output, Some(1));
    assert!(result.entries[1..]
        .iter()
        .all(|e| e.output.is_none() && e.report.note() == Some("interrupted")));
}
