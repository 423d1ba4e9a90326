use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxHash, TxKind, U256};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};

/// Fields of one legacy (EIP-155) transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxParams {
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub nonce: u64,
    pub chain_id: u64,
}

impl TxParams {
    /// Upper bound of what the sender pays: value plus the full gas allowance
    pub fn max_cost(&self) -> U256 {
        self.value + U256::from(self.gas_limit) * U256::from(self.gas_price)
    }
}

#[derive(Debug, Clone)]
pub struct SignedTx {
    pub hash: TxHash,
    pub nonce: u64,
    pub raw: Vec<u8>,
}

/// Sign locally and return the EIP-2718 encoded bytes for `eth_sendRawTransaction`
pub fn sign_legacy(signer: &PrivateKeySigner, params: &TxParams) -> Result<SignedTx> {
    let mut tx = TxLegacy {
        chain_id: Some(params.chain_id),
        nonce: params.nonce,
        gas_price: params.gas_price,
        gas_limit: params.gas_limit,
        to: TxKind::Call(params.to),
        value: params.value,
        input: params.input.clone(),
    };

    let signature = signer
        .sign_transaction_sync(&mut tx)
        .with_context(|| format!("Failed to sign transaction with nonce {}", params.nonce))?;
    let envelope: TxEnvelope = tx.into_signed(signature).into();

    Ok(SignedTx {
        hash: *envelope.tx_hash(),
        nonce: params.nonce,
        raw: envelope.encoded_2718(),
    })
}

/// Per-sender nonce sequence for one run.
///
/// Starts at the on-chain transaction count and only moves forward when a
/// broadcast was accepted, so accepted nonces never leave a gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceTracker {
    next: u64,
}

impl NonceTracker {
    pub fn new(on_chain_count: u64) -> Self {
        Self {
            next: on_chain_count,
        }
    }

    pub fn current(&self) -> u64 {
        self.next
    }

    pub fn advance(&mut self) {
        self.next += 1;
    }

    /// Adopt the chain's view after a nonce conflict
    pub fn resync(&mut self, pending_count: u64) {
        self.next = pending_count;
    }
}
