//! Minimal ABI encoding for the handful of calls the swap flow makes.

use alloy_primitives::{Address, Bytes, U256, keccak256};

use super::PricingError;

pub const QUOTE_EXACT_INPUT: &str = "quoteExactInput(bytes,uint256)";
pub const EXACT_INPUT: &str = "exactInput((bytes,address,uint256,uint256,uint256))";
pub const ALLOWANCE: &str = "allowance(address,address)";
pub const APPROVE: &str = "approve(address,uint256)";

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn word_u256(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}

fn word_address(address: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

fn word_usize(value: usize) -> [u8; 32] {
    word_u256(U256::from(value))
}

/// Length-prefixed, right-padded `bytes` tail
fn dynamic_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = word_usize(data.len()).to_vec();
    out.extend_from_slice(data);
    let padding = (32 - data.len() % 32) % 32;
    out.extend(std::iter::repeat_n(0u8, padding));
    out
}

/// `solidityPack(["address","uint24","address"], [tokenIn, fee, tokenOut])`
pub fn encode_path(token_in: Address, fee: u32, token_out: Address) -> Bytes {
    let mut out = Vec::with_capacity(43);
    out.extend_from_slice(token_in.as_slice());
    out.extend_from_slice(&fee.to_be_bytes()[1..]);
    out.extend_from_slice(token_out.as_slice());
    Bytes::from(out)
}

pub fn quote_exact_input_call(path: &[u8], amount_in: U256) -> Bytes {
    let mut out = selector(QUOTE_EXACT_INPUT).to_vec();
    out.extend_from_slice(&word_usize(0x40));
    out.extend_from_slice(&word_u256(amount_in));
    out.extend(dynamic_bytes(path));
    Bytes::from(out)
}

pub struct ExactInputParams<'a> {
    pub path: &'a [u8],
    pub recipient: Address,
    pub deadline: U256,
    pub amount_in: U256,
    pub amount_out_minimum: U256,
}

pub fn exact_input_call(params: &ExactInputParams<'_>) -> Bytes {
    let mut out = selector(EXACT_INPUT).to_vec();
    // the tuple is dynamic, so the only head word is its offset
    out.extend_from_slice(&word_usize(0x20));
    out.extend_from_slice(&word_usize(5 * 32));
    out.extend_from_slice(&word_address(params.recipient));
    out.extend_from_slice(&word_u256(params.deadline));
    out.extend_from_slice(&word_u256(params.amount_in));
    out.extend_from_slice(&word_u256(params.amount_out_minimum));
    out.extend(dynamic_bytes(params.path));
    Bytes::from(out)
}

pub fn allowance_call(owner: Address, spender: Address) -> Bytes {
    let mut out = selector(ALLOWANCE).to_vec();
    out.extend_from_slice(&word_address(owner));
    out.extend_from_slice(&word_address(spender));
    Bytes::from(out)
}

pub fn approve_call(spender: Address, amount: U256) -> Bytes {
    let mut out = selector(APPROVE).to_vec();
    out.extend_from_slice(&word_address(spender));
    out.extend_from_slice(&word_u256(amount));
    Bytes::from(out)
}

/// First 32-byte word of an `eth_call` result as a uint256
pub fn decode_uint(raw: &str) -> Result<U256, PricingError> {
    let digits = raw.trim().trim_start_matches("0x");
    if digits.len() < 64 || !digits.is_ascii() {
        return Err(PricingError::Rpc(format!("eth_call returned {} hex digits, expected a uint256", digits.len())));
    }
    let bytes = hex::decode(&digits[..64]).map_err(|e| PricingError::Rpc(format!("invalid eth_call result: {e}")))?;
    Ok(U256::from_be_slice(&bytes))
}

pub fn hex_quantity(value: U256) -> String {
    format!("0x{value:x}")
}
