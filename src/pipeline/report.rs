use alloy::primitives::{utils::format_ether, Address};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use tracing::info;

use crate::pipeline::batch::BatchResult;
use crate::pipeline::faucet::{STEP_FAUCET, STEP_LOGIN, STEP_SIGN_IN};
use crate::pipeline::outcome::{AccountReport, Outcome};
use crate::pipeline::stats::MintStats;
use crate::pipeline::transfer::TransferReport;

/// `0x1234ab…cdef`
pub fn short_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}…{}", &full[..8], &full[full.len() - 4..])
}

fn step_symbol(report: &AccountReport, step: &str) -> &'static str {
    report.step(step).map(|s| s.outcome.symbol()).unwrap_or("-")
}

fn count_step(reports: &[&AccountReport], step: &str) -> usize {
    reports
        .iter()
        .filter(|r| r.step(step).map(|s| s.outcome) == Some(Outcome::Succeeded))
        .count()
}

pub fn faucet_table(result: &BatchResult<Option<u64>>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Address", "Login", "Sign-in", "Streak", "Faucet", "Note"]);

    for entry in &result.entries {
        let report = &entry.report;
        let streak = entry
            .output
            .flatten()
            .map(|days| days.to_string())
            .unwrap_or_else(|| "-".to_string());
        let note = match report.outcome() {
            Outcome::Succeeded => "OK",
            _ => report.note().unwrap_or("-"),
        };
        table.add_row(vec![
            Cell::new(report.index),
            Cell::new(short_address(&report.address)),
            Cell::new(step_symbol(report, STEP_LOGIN)),
            Cell::new(step_symbol(report, STEP_SIGN_IN)),
            Cell::new(streak),
            Cell::new(step_symbol(report, STEP_FAUCET)),
            Cell::new(note),
        ]);
    }
    table
}

pub fn log_faucet_report(result: &BatchResult<Option<u64>>) {
    let reports: Vec<&AccountReport> = result.reports().collect();
    info!("Faucet results\n{}", faucet_table(result));
    info!(
        "Summary: accounts {} | login OK {} | sign-in OK {} | faucet OK {}",
        reports.len(),
        count_step(&reports, STEP_LOGIN),
        count_step(&reports, STEP_SIGN_IN),
        count_step(&reports, STEP_FAUCET)
    );
}

fn count_outcomes(report: &AccountReport, outcome: Outcome) -> usize {
    report.steps.iter().filter(|s| s.outcome == outcome).count()
}

pub fn mint_table(result: &BatchResult<MintStats>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Address", "Result", "Minted", "Skipped", "Failed", "Note"]);

    for entry in &result.entries {
        let report = &entry.report;
        table.add_row(vec![
            Cell::new(report.index),
            Cell::new(short_address(&report.address)),
            Cell::new(report.outcome()),
            Cell::new(count_outcomes(report, Outcome::Succeeded)),
            Cell::new(count_outcomes(report, Outcome::Skipped)),
            Cell::new(count_outcomes(report, Outcome::Failed)),
            Cell::new(report.note().unwrap_or("-")),
        ]);
    }
    table
}

/// Per-account table, run totals and the error breakdown
pub fn log_mint_report(result: &BatchResult<MintStats>, totals: &MintStats) {
    info!("Mint results\n{}", mint_table(result));

    let mut summary = Table::new();
    summary.load_preset(UTF8_FULL);
    summary.set_header(vec!["Metric", "Value"]);
    summary.add_row(vec![Cell::new("NFTs minted"), Cell::new(totals.minted)]);
    summary.add_row(vec![Cell::new("Failed"), Cell::new(totals.failed)]);
    if let Some(avg) = totals.average_gas() {
        summary.add_row(vec![Cell::new("Average gas per mint"), Cell::new(avg)]);
    }
    for (kind, count) in &totals.errors {
        summary.add_row(vec![Cell::new(format!("error: {}", kind)), Cell::new(count)]);
    }
    info!("📊 Final statistics\n{}", summary);
}

pub fn log_transfer_report(report: &TransferReport) {
    if let Some(shortfall) = report.shortfall {
        info!(
            "Nothing sent from {}: short {} for {} x {}",
            report.sender,
            format_ether(shortfall),
            report.recipients,
            format_ether(report.amount)
        );
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Recipient", "Result", "Note"]);
    for row in &report.rows {
        table.add_row(vec![
            Cell::new(row.index),
            Cell::new(short_address(&row.address)),
            Cell::new(row.outcome()),
            Cell::new(row.note().unwrap_or("-")),
        ]);
    }

    info!(
        "📊 Transfer summary\nSender: {}\nRecipients: {} | succeeded: {} | failed: {}\n{}",
        report.sender,
        report.recipients,
        report.succeeded(),
        report.failed(),
        table
    );
    if !report.tx_hashes.is_empty() {
        let hashes: Vec<String> = report.tx_hashes.iter().map(|h| format!("  - {}", h)).collect();
        info!("🔗 TX hashes:\n{}", hashes.join("\n"));
    }
}
