//! Offline Calldata Handling
//!
//! Decodes the input of bridge transactions seen on the wire (mempool or
//! block bodies) and builds unsigned input for them, without a provider.

use alloy::{
    hex,
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};

use crate::artifacts::ContractKind;
use crate::contracts::{ERC20Basic, LockRedeem, LockRedeemERC};
use crate::error::BindingError;

/// `(selector hex, signature)` for every function of `kind`, ordered by selector
pub fn selectors(kind: ContractKind) -> Result<Vec<(String, String)>, BindingError> {
    let abi = kind.abi()?;
    let mut table: Vec<(String, String)> = abi
        .functions()
        .map(|f| (hex::encode(f.selector()), f.signature()))
        .collect();
    table.sort();
    Ok(table)
}

fn check_selector(input: &[u8], expected: [u8; 4], what: &'static str) -> Result<(), BindingError> {
    if input.len() < 4 {
        return Err(BindingError::decode(what, "input shorter than a selector"));
    }
    if input[..4] != expected {
        return Err(BindingError::UnexpectedSelector {
            expected: hex::encode(expected),
            found: hex::encode(&input[..4]),
        });
    }
    Ok(())
}

fn decode_call<C: SolCall>(input: &[u8], what: &'static str) -> Result<C, BindingError> {
    check_selector(input, C::SELECTOR, what)?;
    C::abi_decode(input, true).map_err(|e| BindingError::decode(what, e))
}

// ============================================================================
// Parsing
// ============================================================================

/// Whether `input` calls `lock()`
pub fn is_lock_call(input: &[u8]) -> bool {
    input.len() >= 4 && input[..4] == LockRedeem::lockCall::SELECTOR
}

/// Amount of a `redeem(uint256)` call (v1 and v2)
pub fn parse_redeem(input: &[u8]) -> Result<U256, BindingError> {
    let call: LockRedeem::redeemCall = decode_call(input, "redeem calldata")?;
    Ok(call.amount_)
}

/// `(amount, token)` of an ERC20 `redeem(uint256,address)` call
pub fn parse_erc_redeem(input: &[u8]) -> Result<(U256, Address), BindingError> {
    let call: LockRedeemERC::redeemCall = decode_call(input, "ERC20 redeem calldata")?;
    Ok((call.amount_, call.tokenAddress_))
}

/// `(amount, recipient)` of a `sign(uint256,address)` call
pub fn parse_sign(input: &[u8]) -> Result<(U256, Address), BindingError> {
    let call: LockRedeem::signCall = decode_call(input, "sign calldata")?;
    Ok((call.amount_, call.recipient_))
}

/// `(receiver, amount)` of an ERC20 `transfer(address,uint256)` call
pub fn parse_erc20_transfer(input: &[u8]) -> Result<(Address, U256), BindingError> {
    let call: ERC20Basic::transferCall = decode_call(input, "ERC20 transfer calldata")?;
    Ok((call.receiver, call.numTokens))
}

// ============================================================================
// Encoding
// ============================================================================

pub fn encode_lock() -> Bytes {
    LockRedeem::lockCall {}.abi_encode().into()
}

pub fn encode_redeem(amount: U256) -> Bytes {
    LockRedeem::redeemCall { amount_: amount }.abi_encode().into()
}

pub fn encode_sign(amount: U256, recipient: Address) -> Bytes {
    LockRedeem::signCall {
        amount_: amount,
        recipient_: recipient,
    }
    .abi_encode()
    .into()
}
