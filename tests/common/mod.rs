#![allow(dead_code)]

use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::Decodable2718;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use pharos_batch::accounts::{parse_private_keys, Account};
use pharos_batch::config::{DropContract, MintConfig};
use pharos_batch::eth::{CallRequest, ChainClient, MinedReceipt};

pub const KEYS: [&str; 4] = [
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    "7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6",
];

pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

pub fn accounts(n: usize) -> Vec<Account> {
    parse_private_keys(&KEYS[..n].join("\n"))
}

pub fn ether(n: u128) -> U256 {
    U256::from(n * ONE_ETHER)
}

/// Catalog of `n` drops at distinct addresses
pub fn catalog(n: usize) -> Vec<DropContract> {
    (0..n)
        .map(|i| DropContract::new(format!("NFT {}", i + 1), Address::repeat_byte(0xd0 + i as u8)))
        .collect()
}

/// Mint settings with every pause removed
pub fn fast_mint_config(contracts: Vec<DropContract>) -> MintConfig {
    MintConfig {
        contracts,
        receipt_timeout_secs: 1,
        receipt_poll_ms: 1,
        retry_delay_ms: 0,
        send_retry_delay_ms: 0,
        after_success_ms: 0,
        after_failure_ms: 0,
        wallet_delay_secs: 0,
        ..MintConfig::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTx {
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub value: U256,
    pub accepted: bool,
}

#[derive(Default)]
struct State {
    balances: HashMap<Address, U256>,
    tx_counts: HashMap<Address, u64>,
    /// (contract, owner)
    owned: HashSet<(Address, Address)>,
    /// Per send attempt: `Some(msg)` rejects the broadcast with `msg`
    send_script: VecDeque<Option<String>>,
    /// Status of successive accepted transactions, success when exhausted
    receipt_script: VecDeque<bool>,
    receipts: HashMap<TxHash, MinedReceipt>,
    sent: Vec<SentTx>,
    failing_calls: bool,
}

/// In-memory chain: balances, nonces and drop ownership
#[derive(Clone, Default)]
pub struct MockChain {
    state: Arc<Mutex<State>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.state.lock().unwrap().balances.insert(address, balance);
    }

    pub fn set_tx_count(&self, address: Address, count: u64) {
        self.state.lock().unwrap().tx_counts.insert(address, count);
    }

    pub fn give(&self, contract: Address, owner: Address) {
        self.state.lock().unwrap().owned.insert((contract, owner));
    }

    pub fn owns(&self, contract: Address, owner: Address) -> bool {
        self.state.lock().unwrap().owned.contains(&(contract, owner))
    }

    pub fn script_sends(&self, script: Vec<Option<&str>>) {
        self.state.lock().unwrap().send_script =
            script.into_iter().map(|s| s.map(str::to_string)).collect();
    }

    pub fn script_receipts(&self, statuses: Vec<bool>) {
        self.state.lock().unwrap().receipt_script = statuses.into();
    }

    pub fn fail_calls(&self) {
        self.state.lock().unwrap().failing_calls = true;
    }

    /// Every broadcast attempt, accepted or not
    pub fn sent(&self) -> Vec<SentTx> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn accepted(&self) -> Vec<SentTx> {
        self.sent().into_iter().filter(|tx| tx.accepted).collect()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn rpc(&self) -> Arc<String> {
        Arc::new("mock://chain".to_string())
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(688_688)
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn get_txn_count(&self, address: Address) -> Result<u64> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .tx_counts
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn get_pending_txn_count(&self, address: Address) -> Result<u64> {
        self.get_txn_count(address).await
    }

    async fn get_gas_price(&self) -> Result<u128> {
        Ok(1_000_000_000)
    }

    async fn estimate_gas(&self, _request: &CallRequest) -> Result<u64> {
        Ok(100_000)
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes> {
        let state = self.state.lock().unwrap();
        if state.failing_calls {
            return Err(anyhow!("execution reverted"));
        }
        let owned = state.owned.contains(&(request.to, request.from));
        let balance = U256::from(owned as u64);
        Ok(Bytes::from(balance.to_be_bytes::<32>().to_vec()))
    }

    async fn send_raw_tx(&self, tx_bytes: Vec<u8>) -> Result<TxHash> {
        let envelope = TxEnvelope::decode_2718(&mut tx_bytes.as_slice())?;
        let from = envelope.recover_signer()?;
        let to = envelope.to().ok_or_else(|| anyhow!("contract creation"))?;
        let hash = *envelope.tx_hash();

        let mut state = self.state.lock().unwrap();
        let mut record = SentTx {
            from,
            to,
            nonce: envelope.nonce(),
            value: envelope.value(),
            accepted: false,
        };

        if let Some(Some(msg)) = state.send_script.pop_front() {
            state.sent.push(record);
            return Err(anyhow!(msg));
        }

        let expected = state.tx_counts.get(&from).copied().unwrap_or_default();
        if record.nonce != expected {
            state.sent.push(record);
            return Err(anyhow!("nonce too low: expected {}", expected));
        }

        record.accepted = true;
        state.sent.push(record);
        *state.tx_counts.entry(from).or_default() += 1;

        let success = state.receipt_script.pop_front().unwrap_or(true);
        if success {
            state.owned.insert((to, from));
        }
        state.receipts.insert(
            hash,
            MinedReceipt {
                tx_hash: hash,
                success,
                gas_used: 90_000,
                block_number: Some(1),
            },
        );
        Ok(hash)
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<MinedReceipt>> {
        Ok(self.state.lock().unwrap().receipts.get(&tx_hash).copied())
    }
}
