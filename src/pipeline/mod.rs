pub mod batch;
pub mod faucet;
pub mod mint;
pub mod outcome;
pub mod report;
pub mod stats;
pub mod transfer;

pub use batch::{run_batch, AccountTask, BatchEntry, BatchOptions, BatchResult};
pub use faucet::FaucetPipeline;
pub use mint::MintPipeline;
pub use outcome::{AccountReport, Outcome, StepOutcome};
pub use stats::MintStats;
pub use transfer::{parse_amount, plan_transfer, run_transfer, TransferPlan, TransferReport};
