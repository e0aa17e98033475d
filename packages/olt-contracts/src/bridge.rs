//! Lock/Redeem Bridge Clients
//!
//! Typed wrappers over the generated contract instances. Reads return plain
//! values; writes return the transaction hash once the node accepted the
//! transaction (use [`crate::watcher::wait_for_receipt`] to wait for
//! finality).
//!
//! - [`LockRedeemClient`] - v1 `LockRedeem`, and the ERC20 methods of `LockRedeemERC`
//! - [`LockRedeemV2Client`] - `LockRedeemV2`, and `LockRedeemKratos` which shares its ABI

use alloy::{
    contract::{CallBuilder, CallDecoder},
    primitives::{Address, TxHash, I256, U256},
    providers::Provider,
    transports::Transport,
};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contracts::{
    LockRedeem::{self, LockRedeemInstance},
    LockRedeemERC,
    LockRedeemKratos,
    LockRedeemV2::{self, LockRedeemV2Instance},
};
use crate::error::BindingError;

/// Send a prepared call and return its hash
async fn send_tx<T, P, D>(builder: CallBuilder<T, P, D>, what: &str) -> Result<TxHash>
where
    T: Transport + Clone,
    P: Provider<T>,
    D: CallDecoder,
{
    let pending = builder
        .send()
        .await
        .map_err(|e| eyre!("Failed to send {} transaction: {}", what, e))?;
    let tx_hash = *pending.tx_hash();
    debug!(method = what, tx_hash = %tx_hash, "Transaction sent");
    Ok(tx_hash)
}

// ============================================================================
// Redeem Status (v2)
// ============================================================================

/// Redeem state reported by v2 `verifyRedeem(address)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeemStatus {
    /// No open request for the recipient (-1)
    NotFound,
    /// Lock period running and amount still outstanding (0)
    Ongoing,
    /// Lock period over and amount paid out (1)
    Succeeded,
    /// Lock period over with amount still outstanding (2)
    Expired,
}

impl TryFrom<i8> for RedeemStatus {
    type Error = BindingError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(RedeemStatus::NotFound),
            0 => Ok(RedeemStatus::Ongoing),
            1 => Ok(RedeemStatus::Succeeded),
            2 => Ok(RedeemStatus::Expired),
            other => Err(BindingError::InvalidRedeemStatus(other)),
        }
    }
}

impl From<RedeemStatus> for i8 {
    fn from(status: RedeemStatus) -> Self {
        match status {
            RedeemStatus::NotFound => -1,
            RedeemStatus::Ongoing => 0,
            RedeemStatus::Succeeded => 1,
            RedeemStatus::Expired => 2,
        }
    }
}

// ============================================================================
// v1 Client
// ============================================================================

/// Client for the v1 lock/redeem contract
#[derive(Debug, Clone)]
pub struct LockRedeemClient<T, P> {
    contract: LockRedeemInstance<T, P>,
}

impl<T, P> LockRedeemClient<T, P>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    /// Bind to a v1 contract at `address`
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            contract: LockRedeem::new(address, provider),
        }
    }

    /// Deployed contract address
    pub fn address(&self) -> Address {
        *self.contract.address()
    }

    /// Generated instance, for methods not wrapped here
    pub fn instance(&self) -> &LockRedeemInstance<T, P> {
        &self.contract
    }

    fn erc(&self) -> LockRedeemERC::LockRedeemERCInstance<T, &P> {
        LockRedeemERC::new(self.address(), self.contract.provider())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Lock `value` wei on the bridge
    pub async fn lock(&self, value: U256) -> Result<TxHash> {
        info!(contract = %self.address(), value = %value, "Locking ether");
        send_tx(self.contract.lock().value(value), "lock").await
    }

    /// Request a redeem of `amount` wei
    pub async fn redeem(&self, amount: U256) -> Result<TxHash> {
        send_tx(self.contract.redeem(amount), "redeem").await
    }

    /// Validator signature on a pending redeem
    pub async fn sign(&self, amount: U256, recipient: Address) -> Result<TxHash> {
        send_tx(self.contract.sign(amount, recipient), "sign").await
    }

    /// Vote to add `validator` (validators only)
    pub async fn propose_add_validator(&self, validator: Address) -> Result<TxHash> {
        send_tx(
            self.contract.proposeAddValidator(validator),
            "proposeAddValidator",
        )
        .await
    }

    /// Vote to remove `validator` (validators only)
    pub async fn propose_remove_validator(&self, validator: Address) -> Result<TxHash> {
        send_tx(
            self.contract.proposeRemoveValidator(validator),
            "proposeRemoveValidator",
        )
        .await
    }

    /// Vote for a new voting threshold (validators only)
    pub async fn propose_new_threshold(&self, threshold: U256) -> Result<TxHash> {
        send_tx(
            self.contract.proposeNewThreshold(threshold),
            "proposeNewThreshold",
        )
        .await
    }

    /// ERC20 redeem request against a `LockRedeemERC` deployment
    pub async fn redeem_erc(&self, amount: U256, token: Address) -> Result<TxHash> {
        send_tx(self.erc().redeem(amount, token), "redeem").await
    }

    /// Pay out a fully signed ERC20 redeem
    pub async fn execute_redeem(&self, token: Address) -> Result<TxHash> {
        send_tx(self.erc().executeredeem(token), "executeredeem").await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether `address` is in the current validator set
    pub async fn is_validator(&self, address: Address) -> Result<bool> {
        let result = self
            .contract
            .isValidator(address)
            .call()
            .await
            .map_err(|e| eyre!("Failed to check validator {}: {}", address, e))?;
        Ok(result._0)
    }

    /// Validator power (0 when not a validator)
    pub async fn validator_power(&self, address: Address) -> Result<I256> {
        let result = self
            .contract
            .validators(address)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get validator power: {}", e))?;
        Ok(result._0)
    }

    /// Size of the validator set
    pub async fn num_validators(&self) -> Result<U256> {
        let result = self
            .contract
            .numValidators()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get validator count: {}", e))?;
        Ok(result._0)
    }

    /// Votes needed for a proposal to pass
    pub async fn voting_threshold(&self) -> Result<U256> {
        let result = self
            .contract
            .votingThreshold()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get voting threshold: {}", e))?;
        Ok(result._0)
    }

    /// Block height at which the current redeem epoch started
    pub async fn epoch_block_height(&self) -> Result<U256> {
        let result = self
            .contract
            .epochBlockHeight()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get epoch block height: {}", e))?;
        Ok(result._0)
    }

    /// Wei held by the contract
    pub async fn total_eth_balance(&self) -> Result<U256> {
        let result = self
            .contract
            .getTotalEthBalance()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get total ETH balance: {}", e))?;
        Ok(result._0)
    }

    /// Address the contract reports as its own
    pub async fn olt_eth_address(&self) -> Result<Address> {
        let result = self
            .contract
            .getOLTEthAddress()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get contract address: {}", e))?;
        Ok(result._0)
    }

    /// Votes so far to add `validator`
    pub async fn add_validator_votes(&self, validator: Address) -> Result<U256> {
        let result = self
            .contract
            .addValidatorProposals(validator)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get add-validator votes: {}", e))?;
        Ok(result.voteCount)
    }

    /// Votes so far to remove `validator`
    pub async fn remove_validator_votes(&self, validator: Address) -> Result<U256> {
        let result = self
            .contract
            .removeValidatorProposals(validator)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get remove-validator votes: {}", e))?;
        Ok(result.voteCount)
    }

    /// Votes so far for `threshold`
    pub async fn new_threshold_votes(&self, threshold: U256) -> Result<U256> {
        let result = self
            .contract
            .newThresholdProposals(threshold)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get threshold votes: {}", e))?;
        Ok(result.voteCount)
    }

    /// ERC20 deployments: whether the redeem for `recipient` reached quorum
    pub async fn verify_redeem_erc(&self, recipient: Address) -> Result<bool> {
        let result = self
            .erc()
            .verifyRedeem(recipient)
            .call()
            .await
            .map_err(|e| eyre!("Failed to verify redeem: {}", e))?;
        Ok(result._0)
    }

    /// ERC20 deployments: whether the calling validator signed `recipient`'s redeem
    pub async fn has_validator_signed_erc(&self, recipient: Address) -> Result<bool> {
        let result = self
            .erc()
            .hasValidatorSigned(recipient)
            .call()
            .await
            .map_err(|e| eyre!("Failed to check validator signature: {}", e))?;
        Ok(result._0)
    }

    /// ERC20 deployments: token balance held by the bridge
    pub async fn total_erc_balance(&self, token: Address) -> Result<U256> {
        let result = self
            .erc()
            .getTotalErcBalance(token)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get total token balance: {}", e))?;
        Ok(result._0)
    }
}

// ============================================================================
// v2 Client
// ============================================================================

/// Client for the v2 lock/redeem contract (also drives Kratos deployments)
#[derive(Debug, Clone)]
pub struct LockRedeemV2Client<T, P> {
    contract: LockRedeemV2Instance<T, P>,
}

impl<T, P> LockRedeemV2Client<T, P>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    /// Bind to a v2 or Kratos contract at `address`
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            contract: LockRedeemV2::new(address, provider),
        }
    }

    /// Deployed contract address
    pub fn address(&self) -> Address {
        *self.contract.address()
    }

    /// Underlying `sol!` instance
    pub fn instance(&self) -> &LockRedeemV2Instance<T, P> {
        &self.contract
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Lock `value` wei
    pub async fn lock(&self, value: U256) -> Result<TxHash> {
        info!(contract = %self.address(), value = %value, "Locking ether");
        send_tx(self.contract.lock().value(value), "lock").await
    }

    /// Request a redeem of `amount` wei; `fee` is sent as value to cover validator gas
    pub async fn redeem(&self, amount: U256, fee: U256) -> Result<TxHash> {
        send_tx(self.contract.redeem(amount).value(fee), "redeem").await
    }

    /// Validator signature on `recipient`'s pending redeem of `amount`
    pub async fn sign(&self, amount: U256, recipient: Address) -> Result<TxHash> {
        send_tx(self.contract.sign(amount, recipient), "sign").await
    }

    /// Validator withdraws its share of collected redeem fees
    pub async fn collect_user_fee(&self) -> Result<TxHash> {
        send_tx(self.contract.collectUserFee(), "collectUserFee").await
    }

    /// Vote to move the locked balance to `new_contract`
    pub async fn migrate(&self, new_contract: Address) -> Result<TxHash> {
        info!(from = %self.address(), to = %new_contract, "Voting for migration");
        send_tx(self.contract.migrate(new_contract), "migrate").await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether `address` is in the current validator set
    pub async fn is_validator(&self, address: Address) -> Result<bool> {
        let result = self
            .contract
            .isValidator(address)
            .call()
            .await
            .map_err(|e| eyre!("Failed to check validator {}: {}", address, e))?;
        Ok(result._0)
    }

    /// Whether the call's `from` is a validator (v2 only, not on Kratos)
    pub async fn verify_validator(&self, from: Address) -> Result<bool> {
        let result = self
            .contract
            .verifyValidator()
            .from(from)
            .call()
            .await
            .map_err(|e| eyre!("Failed to verify validator: {}", e))?;
        Ok(result._0)
    }

    /// Voting power of `address`
    pub async fn validator_power(&self, address: Address) -> Result<u8> {
        let result = self
            .contract
            .validators(address)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get validator power: {}", e))?;
        Ok(result._0)
    }

    /// Size of the validator set
    pub async fn num_validators(&self) -> Result<U256> {
        let result = self
            .contract
            .numValidators()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get validator count: {}", e))?;
        Ok(result._0)
    }

    /// Wei held by the contract
    pub async fn total_eth_balance(&self) -> Result<U256> {
        let result = self
            .contract
            .getTotalEthBalance()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get total ETH balance: {}", e))?;
        Ok(result._0)
    }

    /// Address the contract reports as its own
    pub async fn olt_eth_address(&self) -> Result<Address> {
        let result = self
            .contract
            .getOLTEthAddress()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get contract address: {}", e))?;
        Ok(result._0)
    }

    /// State of `recipient`'s redeem request
    pub async fn verify_redeem(&self, recipient: Address) -> Result<RedeemStatus> {
        let result = self
            .contract
            .verifyRedeem(recipient)
            .call()
            .await
            .map_err(|e| eyre!("Failed to verify redeem for {}: {}", recipient, e))?;
        Ok(RedeemStatus::try_from(result._0)?)
    }

    /// Whether `validator` already signed `recipient`'s redeem
    pub async fn has_validator_signed(
        &self,
        validator: Address,
        recipient: Address,
    ) -> Result<bool> {
        let result = self
            .contract
            .hasValidatorSigned(recipient)
            .from(validator)
            .call()
            .await
            .map_err(|e| eyre!("Failed to check validator signature: {}", e))?;
        Ok(result._0)
    }

    /// Validator signatures collected on `recipient`'s redeem
    pub async fn signature_count(&self, recipient: Address) -> Result<U256> {
        let result = self
            .contract
            .getSignatureCount(recipient)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get signature count: {}", e))?;
        Ok(result._0)
    }

    /// Outstanding redeem amount for `recipient`
    pub async fn redeem_balance(&self, recipient: Address) -> Result<U256> {
        let result = self
            .contract
            .getRedeemBalance(recipient)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get redeem balance: {}", e))?;
        Ok(result._0)
    }

    /// Whether `recipient` may open a new redeem request
    pub async fn is_redeem_available(&self, recipient: Address) -> Result<bool> {
        let result = self
            .contract
            .isredeemAvailable(recipient)
            .call()
            .await
            .map_err(|e| eyre!("Failed to check redeem availability: {}", e))?;
        Ok(result._0)
    }

    /// Validators that have signed the migration
    pub async fn migration_signatures(&self) -> Result<U256> {
        let result = self
            .contract
            .migrationSignatures()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get migration signatures: {}", e))?;
        Ok(result._0)
    }

    /// Whether `validator` has signed the migration
    pub async fn has_signed_migration(&self, validator: Address) -> Result<bool> {
        let result = self
            .contract
            .migrationSigners(validator)
            .call()
            .await
            .map_err(|e| eyre!("Failed to check migration signer: {}", e))?;
        Ok(result._0)
    }

    /// Validators migrated into this contract so far
    pub async fn migration_count(&self) -> Result<U256> {
        let result = self
            .contract
            .getMigrationCount()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get migration count: {}", e))?;
        Ok(result._0)
    }

    /// Kratos deployments: whether the contract is still active
    pub async fn active_status(&self) -> Result<bool> {
        let result = LockRedeemKratos::new(self.address(), self.contract.provider())
            .ActiveStatus()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get active status: {}", e))?;
        Ok(result._0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeem_status_mapping() {
        assert_eq!(RedeemStatus::try_from(-1), Ok(RedeemStatus::NotFound));
        assert_eq!(RedeemStatus::try_from(0), Ok(RedeemStatus::Ongoing));
        assert_eq!(RedeemStatus::try_from(1), Ok(RedeemStatus::Succeeded));
        assert_eq!(RedeemStatus::try_from(2), Ok(RedeemStatus::Expired));
        assert_eq!(
            RedeemStatus::try_from(3),
            Err(BindingError::InvalidRedeemStatus(3))
        );
        assert_eq!(
            RedeemStatus::try_from(-128),
            Err(BindingError::InvalidRedeemStatus(-128))
        );
    }

    #[test]
    fn test_redeem_status_to_wire() {
        for value in -1i8..=2 {
            let status = RedeemStatus::try_from(value).unwrap();
            assert_eq!(i8::from(status), value);
        }
    }

    #[test]
    fn test_redeem_status_serde() {
        assert_eq!(
            serde_json::to_string(&RedeemStatus::NotFound).unwrap(),
            "\"not_found\""
        );
    }

    #[tokio::test]
    async fn test_client_construction_is_offline() {
        let provider = alloy::providers::ProviderBuilder::new()
            .on_http("http://127.0.0.1:8545".parse().unwrap());
        let address = Address::repeat_byte(0x0b);

        let v1 = LockRedeemClient::new(address, provider.clone());
        assert_eq!(v1.address(), address);

        let v2 = LockRedeemV2Client::new(address, provider);
        assert_eq!(v2.address(), address);
    }
}
