use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info, warn};

/// Invite code used when `reff.txt` is absent or empty
pub const DEFAULT_INVITE_CODE: &str = "S6NGMzXSCDBxhnwo";

/// A loaded wallet. `index` is the 1-based position among the valid keys.
#[derive(Clone, Debug)]
pub struct Account {
    pub index: usize,
    pub signer: PrivateKeySigner,
    pub address: Address,
}

impl Account {
    pub fn new(index: usize, signer: PrivateKeySigner) -> Self {
        let address = signer.address();
        Self {
            index,
            signer,
            address,
        }
    }
}

/// Strip whitespace and an optional `0x` prefix; accept exactly 64 hex chars
pub fn normalize_private_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let key: String = trimmed.split_whitespace().collect();

    if key.len() == 64 && key.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(key)
    } else {
        None
    }
}

/// Parse newline-delimited keys. Invalid lines are reported and skipped.
pub fn parse_private_keys(content: &str) -> Vec<Account> {
    let mut accounts = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = line_no + 1;

        let Some(key) = normalize_private_key(line) else {
            warn!("❌ Line {}: invalid key format, skipped", line_no);
            continue;
        };

        match PrivateKeySigner::from_str(&key) {
            Ok(signer) => {
                let account = Account::new(accounts.len() + 1, signer);
                info!(
                    "✅ Wallet {}: {}",
                    account.index,
                    crate::pipeline::report::short_address(&account.address)
                );
                accounts.push(account);
            }
            Err(e) => warn!("❌ Line {}: not a valid secp256k1 key ({}), skipped", line_no, e),
        }
    }

    accounts
}

/// Load keys from `path`. Never fails: a missing file yields an empty list.
pub async fn load_private_keys<P: AsRef<Path>>(path: P) -> Vec<Account> {
    match tokio::fs::read_to_string(path.as_ref()).await {
        Ok(content) => parse_private_keys(&content),
        Err(e) => {
            error!("❌ Cannot read key file {:?}: {}", path.as_ref(), e);
            Vec::new()
        }
    }
}

/// First non-empty content of the invite file, or [`DEFAULT_INVITE_CODE`]
pub async fn read_invite_code<P: AsRef<Path>>(path: P) -> String {
    match tokio::fs::read_to_string(path.as_ref()).await {
        Ok(content) if !content.trim().is_empty() => content.trim().to_string(),
        _ => DEFAULT_INVITE_CODE.to_string(),
    }
}
