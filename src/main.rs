use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use tokio::time::Duration;
use tracing::{info, Level};

use pharos_batch::commands;
use pharos_batch::config::BotConfig;
use pharos_batch::util::shutdown::listen_for_ctrl_c;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "bot_config.toml")]
    config: PathBuf,

    #[arg(
        long,
        default_value = "info",
        help = "Set the log level (trace, debug, info, warn, error)"
    )]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mint every missing catalog NFT for each wallet
    Mint {
        /// Seconds between wallets
        #[arg(long)]
        delay: Option<u64>,
    },
    /// Daily login, sign-in and faucet claim for each wallet
    Faucet {
        /// Keep running, one pass per interval
        #[arg(long = "loop", default_value_t = false)]
        repeat: bool,

        /// Seconds between passes in loop mode
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Send native tokens from one wallet to all the others
    Send {
        /// 1-based position of the sender in the key file
        #[arg(long)]
        sender: usize,

        /// Amount per recipient in native units, e.g. 0.001
        #[arg(long)]
        amount: String,
    },
    /// Mint, then one faucet pass
    All {
        #[arg(long)]
        delay: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = Level::from_str(&args.log_level).unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .init();

    let config = BotConfig::load_or_default(&args.config)?;
    let shutdown = listen_for_ctrl_c();

    match args.command {
        Command::Mint { delay } => {
            commands::run_mint(&config, delay.map(Duration::from_secs), shutdown).await?;
        }
        Command::Faucet { repeat, interval } => {
            if repeat {
                commands::run_faucet_loop(&config, interval.map(Duration::from_secs), shutdown)
                    .await?;
            } else {
                commands::run_faucet(&config, shutdown).await?;
            }
        }
        Command::Send { sender, amount } => {
            commands::run_send(&config, sender, &amount, shutdown).await?;
        }
        Command::All { delay } => {
            commands::run_all(&config, delay.map(Duration::from_secs), shutdown).await?;
        }
    }

    info!("Done");
    Ok(())
}
