//! ABI of the thirdweb-style drop contracts in the mint catalog

use alloy::primitives::{address, Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use anyhow::{Context, Result};

sol! {
    #[allow(missing_docs)]
    interface IDrop {
        struct AllowlistProof {
            bytes32[] proof;
            uint256 quantityLimitPerWallet;
            uint256 pricePerToken;
            address currency;
        }

        function claim(
            address _receiver,
            uint256 _quantity,
            address _currency,
            uint256 _pricePerToken,
            AllowlistProof calldata _allowlistProof,
            bytes calldata _data
        ) external payable;

        function balanceOf(address owner) external view returns (uint256);
    }
}

/// Sentinel the drop contracts use for the chain's native token
pub const NATIVE_CURRENCY: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Public-phase proof: no merkle proof, unlimited quantity, price taken from the call
fn open_allowlist_proof() -> IDrop::AllowlistProof {
    IDrop::AllowlistProof {
        proof: Vec::new(),
        quantityLimitPerWallet: U256::MAX,
        pricePerToken: U256::ZERO,
        currency: Address::ZERO,
    }
}

pub fn claim_calldata(receiver: Address, quantity: u64, price_per_token: U256) -> Bytes {
    IDrop::claimCall {
        _receiver: receiver,
        _quantity: U256::from(quantity),
        _currency: NATIVE_CURRENCY,
        _pricePerToken: price_per_token,
        _allowlistProof: open_allowlist_proof(),
        _data: Bytes::new(),
    }
    .abi_encode()
    .into()
}

pub fn balance_of_calldata(owner: Address) -> Bytes {
    IDrop::balanceOfCall { owner }.abi_encode().into()
}

pub fn decode_balance(output: &[u8]) -> Result<U256> {
    IDrop::balanceOfCall::abi_decode_returns(output).with_context(|| {
        format!(
            "Failed to decode balanceOf output: 0x{}",
            alloy::hex::encode(output)
        )
    })
}
