use async_trait::async_trait;
use futures::{stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::accounts::Account;
use crate::pipeline::outcome::AccountReport;
use crate::util::Shutdown;

/// Per-account work of one pipeline
#[async_trait]
pub trait AccountTask: Send + Sync {
    type Output: Default + Send;

    /// Run every step for `account`, recording into `report` and `output` as
    /// it goes. Must not fail: problems become steps. Whatever was recorded
    /// before an interrupt is kept.
    async fn process(
        &self,
        account: &Account,
        report: &mut AccountReport,
        output: &mut Self::Output,
    );
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Accounts in flight at once, at least 1
    pub concurrency: usize,
    /// Pause after each account except the last
    pub delay_between_accounts: Duration,
    pub show_progress: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            delay_between_accounts: Duration::ZERO,
            show_progress: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchEntry<O> {
    pub report: AccountReport,
    /// `None` when the run stopped before the account started
    pub output: Option<O>,
}

#[derive(Debug, Clone)]
pub struct BatchResult<O> {
    /// One entry per account, in input order
    pub entries: Vec<BatchEntry<O>>,
    pub interrupted: bool,
}

impl<O> BatchResult<O> {
    pub fn reports(&self) -> impl Iterator<Item = &AccountReport> {
        self.entries.iter().map(|e| &e.report)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &O> {
        self.entries.iter().filter_map(|e| e.output.as_ref())
    }
}

fn progress_bar(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} accounts",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Run `task` over all accounts, at most `options.concurrency` at a time.
///
/// Once `shutdown` fires, the account in flight keeps what it recorded and
/// is marked failed; accounts not yet started are recorded as skipped.
pub async fn run_batch<T: AccountTask>(
    task: &T,
    accounts: &[Account],
    options: &BatchOptions,
    shutdown: Shutdown,
) -> BatchResult<T::Output> {
    let total = accounts.len();
    let pb = progress_bar(total as u64, options.show_progress);
    let start_time = Instant::now();

    let jobs = accounts.iter().enumerate().map(|(position, account)| {
        let mut shutdown = shutdown.clone();
        let pb = pb.clone();
        let delay = options.delay_between_accounts;
        async move {
            if shutdown.is_triggered() {
                pb.inc(1);
                let report =
                    AccountReport::interrupted_before_start(account.index, account.address);
                return (position, BatchEntry { report, output: None });
            }

            let mut report = AccountReport::new(account.index, account.address);
            let mut output = T::Output::default();
            let finished = tokio::select! {
                _ = task.process(account, &mut report, &mut output) => true,
                _ = shutdown.wait() => false,
            };
            if !finished {
                warn!("Wallet {} interrupted", account.index);
                report.mark_interrupted();
            }
            let entry = BatchEntry {
                report,
                output: Some(output),
            };
            pb.inc(1);

            if position + 1 < total && !delay.is_zero() {
                tokio::select! {
                    _ = sleep(delay) => {},
                    _ = shutdown.wait() => {},
                }
            }
            (position, entry)
        }
    });

    let mut results: Vec<(usize, BatchEntry<T::Output>)> = stream::iter(jobs)
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;
    results.sort_by_key(|(position, _)| *position);

    pb.finish_and_clear();
    info!(
        "Processed {} accounts in {:.2}s",
        total,
        start_time.elapsed().as_secs_f64()
    );

    BatchResult {
        entries: results.into_iter().map(|(_, entry)| entry).collect(),
        interrupted: shutdown.is_triggered(),
    }
}
