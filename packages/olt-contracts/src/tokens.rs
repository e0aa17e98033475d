//! ERC20 Token Helpers
//!
//! Balance, allowance and metadata reads plus approve / transfer for tokens
//! bridged through `LockRedeemERC` (the `ERC20Basic` test token or any
//! standard ERC20).

use crate::contracts::{ERC20Basic, IERC20};
use alloy::{
    primitives::{
        utils::{format_units, parse_units},
        Address, TxHash, U256,
    },
    providers::Provider,
    transports::Transport,
};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// ERC20 balance of `account`
pub async fn get_token_balance<T, P>(
    provider: P,
    token_address: Address,
    account: Address,
) -> Result<U256>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let contract = IERC20::new(token_address, provider);
    let balance = contract
        .balanceOf(account)
        .call()
        .await
        .map_err(|e| eyre!("Failed to get balance: {}", e))?;
    Ok(balance._0)
}

/// Amount `spender` may still move on behalf of `owner`
pub async fn get_token_allowance<T, P>(
    provider: P,
    token_address: Address,
    owner: Address,
    spender: Address,
) -> Result<U256>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let contract = IERC20::new(token_address, provider);
    let allowance = contract
        .allowance(owner, spender)
        .call()
        .await
        .map_err(|e| eyre!("Failed to get allowance: {}", e))?;
    Ok(allowance._0)
}

/// Total supply of the token
pub async fn get_total_supply<T, P>(provider: P, token_address: Address) -> Result<U256>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let contract = IERC20::new(token_address, provider);
    let supply = contract
        .totalSupply()
        .call()
        .await
        .map_err(|e| eyre!("Failed to get total supply: {}", e))?;
    Ok(supply._0)
}

/// Token metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Name, symbol and decimals in one go
pub async fn get_token_info<T, P>(provider: P, token_address: Address) -> Result<TokenInfo>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let contract = ERC20Basic::new(token_address, provider);

    let (name, symbol, decimals) = tokio::try_join!(
        async {
            contract
                .name()
                .call()
                .await
                .map(|r| r._0)
                .map_err(|e| eyre!("Failed to get name: {}", e))
        },
        async {
            contract
                .symbol()
                .call()
                .await
                .map(|r| r._0)
                .map_err(|e| eyre!("Failed to get symbol: {}", e))
        },
        async {
            contract
                .decimals()
                .call()
                .await
                .map(|r| r._0)
                .map_err(|e| eyre!("Failed to get decimals: {}", e))
        }
    )?;

    Ok(TokenInfo {
        address: token_address,
        name,
        symbol,
        decimals,
    })
}

/// Approve `spender` (e.g. the ERC20 bridge) to move `amount`
pub async fn approve<T, P>(
    provider: P,
    token_address: Address,
    spender: Address,
    amount: U256,
) -> Result<TxHash>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let contract = IERC20::new(token_address, provider);
    let pending = contract
        .approve(spender, amount)
        .send()
        .await
        .map_err(|e| eyre!("Failed to send approve: {}", e))?;

    let tx_hash = *pending.tx_hash();
    info!(token = %token_address, spender = %spender, amount = %amount, tx_hash = %tx_hash, "Approval sent");
    Ok(tx_hash)
}

/// Transfer `amount` to `to` from the signer; returns once the node accepted it
pub async fn transfer<T, P>(
    provider: P,
    token_address: Address,
    to: Address,
    amount: U256,
) -> Result<TxHash>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let contract = IERC20::new(token_address, provider);
    let pending = contract
        .transfer(to, amount)
        .send()
        .await
        .map_err(|e| eyre!("Failed to send transfer: {}", e))?;

    let tx_hash = *pending.tx_hash();
    info!(token = %token_address, to = %to, amount = %amount, tx_hash = %tx_hash, "Transfer sent");
    Ok(tx_hash)
}

/// Convert a decimal string ("1.5") to raw token units
pub fn to_token_units(amount: &str, decimals: u8) -> Result<U256> {
    let parsed = parse_units(amount, decimals)
        .map_err(|e| eyre!("Invalid token amount {:?}: {}", amount, e))?;
    Ok(parsed.get_absolute())
}

/// Convert raw token units to a decimal string
pub fn from_token_units(raw: U256, decimals: u8) -> Result<String> {
    format_units(raw, decimals).map_err(|e| eyre!("Failed to format {}: {}", raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_token_units() {
        // 1.5 TTC at 18 decimals
        let result = to_token_units("1.5", 18).unwrap();
        assert_eq!(result, U256::from(1_500_000_000_000_000_000u128));

        let result = to_token_units("100", 6).unwrap();
        assert_eq!(result, U256::from(100_000_000u64));

        assert!(to_token_units("abc", 18).is_err());
    }

    #[test]
    fn test_from_token_units() {
        let result = from_token_units(U256::from(1_500_000_000_000_000_000u128), 18).unwrap();
        assert!(result.starts_with("1.5"));

        let result = from_token_units(U256::from(100_000_000u64), 6).unwrap();
        assert!(result.starts_with("100."));
    }
}
