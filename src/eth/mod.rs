pub mod drop_contract;
mod errors;
mod eth_cli;
pub mod gas;
mod tx_client;
mod txn_builder;
pub use txn_builder::*;

pub use errors::{classify_send_error, ErrorKind, TxError};
pub use eth_cli::{EthHttpCli, MethodMetrics, ProviderMetrics};
pub use tx_client::{CallRequest, ChainClient, MinedReceipt};
