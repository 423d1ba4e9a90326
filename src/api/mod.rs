mod faucet_api;
mod http;

pub use faucet_api::{ApiEnvelope, FaucetApi};
pub use http::HttpHelper;
