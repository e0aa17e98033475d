//! Contract Deployment
//!
//! Every deployment goes through [`deploy_creation_code`]: creation code plus
//! ABI-encoded constructor arguments sent as a contract-creation transaction.
//! The per-contract helpers only encode the constructor.
//!
//! ## Usage
//!
//! ```ignore
//! let provider = client.signing_provider()?;
//! let token = deploy_erc20_basic(&provider, U256::from(1_000_000u64), &TransactOptions::default()).await?;
//! let bridge = deploy_lock_redeem(&provider, vec![validator], &TransactOptions::default()).await?;
//! ```

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, TxHash, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
    sol_types::SolConstructor,
    transports::Transport,
};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifacts::{Artifact, ContractKind};
use crate::contracts::{
    ERC20Basic, LockRedeem, LockRedeemERC, LockRedeemFuture, LockRedeemKratos, LockRedeemV2,
    TestRedeemGas,
};
use crate::session::TransactOptions;

/// Result of a contract deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Address of the new contract
    pub address: Address,
    /// Creation transaction
    pub tx_hash: TxHash,
    /// Block the creation was mined in
    pub block_number: Option<u64>,
    pub gas_used: u128,
}

/// Deploy raw creation code (bytecode followed by encoded constructor arguments)
pub async fn deploy_creation_code<T, P>(
    provider: &P,
    code: Bytes,
    opts: &TransactOptions,
) -> Result<Deployment>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let tx = build_deploy_tx(code, opts);

    let pending = provider
        .send_transaction(tx)
        .await
        .map_err(|e| eyre!("Failed to send deployment transaction: {}", e))?;
    let tx_hash = *pending.tx_hash();
    debug!(tx_hash = %tx_hash, "Deployment transaction sent");

    let receipt = pending
        .get_receipt()
        .await
        .map_err(|e| eyre!("Failed to get deployment receipt for {}: {}", tx_hash, e))?;

    if !receipt.status() {
        return Err(eyre!("Deployment transaction {} reverted", tx_hash));
    }

    let address = receipt
        .contract_address
        .ok_or_else(|| eyre!("Deployment receipt {} has no contract address", tx_hash))?;

    let deployment = Deployment {
        address,
        tx_hash,
        block_number: receipt.block_number,
        gas_used: u128::from(receipt.gas_used),
    };

    info!(
        address = %deployment.address,
        tx_hash = %deployment.tx_hash,
        gas_used = %deployment.gas_used,
        "Contract deployed"
    );

    Ok(deployment)
}

fn build_deploy_tx(code: Bytes, opts: &TransactOptions) -> TransactionRequest {
    let mut tx = TransactionRequest::default().with_deploy_code(code);
    if let Some(from) = opts.from {
        tx = tx.with_from(from);
    }
    if let Some(value) = opts.value {
        tx = tx.with_value(value);
    }
    if let Some(gas_limit) = opts.gas_limit {
        tx = tx.with_gas_limit(gas_limit);
    }
    if let Some(gas_price) = opts.gas_price {
        tx = tx.with_gas_price(gas_price);
    }
    if let Some(nonce) = opts.nonce {
        tx = tx.with_nonce(nonce);
    }
    tx
}

/// Deploy a loaded artifact with already-encoded constructor arguments
pub async fn deploy_artifact<T, P>(
    provider: &P,
    artifact: &Artifact,
    encoded_args: &[u8],
    opts: &TransactOptions,
) -> Result<Deployment>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    info!(contract = %artifact.name, "Deploying contract");
    deploy_creation_code(provider, artifact.creation_code(encoded_args), opts).await
}

async fn deploy_embedded<T, P>(
    provider: &P,
    kind: ContractKind,
    encoded_args: Vec<u8>,
    opts: &TransactOptions,
) -> Result<Deployment>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let artifact = Artifact::embedded(kind)?;
    deploy_artifact(provider, &artifact, &encoded_args, opts).await
}

// ============================================================================
// Per-contract Deployers
// ============================================================================

/// Deploy the ERC20Basic test token with `total` minted to the deployer
pub async fn deploy_erc20_basic<T, P>(
    provider: &P,
    total: U256,
    opts: &TransactOptions,
) -> Result<Deployment>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let args = ERC20Basic::constructorCall { total }.abi_encode();
    deploy_embedded(provider, ContractKind::Erc20Basic, args, opts).await
}

/// Deploy the v1 ETH lock/redeem contract
pub async fn deploy_lock_redeem<T, P>(
    provider: &P,
    initial_validators: Vec<Address>,
    opts: &TransactOptions,
) -> Result<Deployment>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let args = LockRedeem::constructorCall {
        initialValidators: initial_validators,
    }
    .abi_encode();
    deploy_embedded(provider, ContractKind::LockRedeem, args, opts).await
}

/// Deploy the v1 ERC20 lock/redeem contract
pub async fn deploy_lock_redeem_erc<T, P>(
    provider: &P,
    initial_validators: Vec<Address>,
    opts: &TransactOptions,
) -> Result<Deployment>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let args = LockRedeemERC::constructorCall {
        initialValidators: initial_validators,
    }
    .abi_encode();
    deploy_embedded(provider, ContractKind::LockRedeemErc, args, opts).await
}

/// Deploy the v2 contract; validators are copied from `old_contract`
pub async fn deploy_lock_redeem_v2<T, P>(
    provider: &P,
    lock_period: U256,
    old_contract: Address,
    validators_in_old: U256,
    opts: &TransactOptions,
) -> Result<Deployment>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let args = LockRedeemV2::constructorCall {
        _lock_period: lock_period,
        _old_contract: old_contract,
        noofValidatorsinold: validators_in_old,
    }
    .abi_encode();
    deploy_embedded(provider, ContractKind::LockRedeemV2, args, opts).await
}

/// Deploy the Kratos flavour of v2 with its own initial validator set
pub async fn deploy_lock_redeem_kratos<T, P>(
    provider: &P,
    initial_validators: Vec<Address>,
    lock_period: U256,
    old_contract: Address,
    validators_in_old: U256,
    opts: &TransactOptions,
) -> Result<Deployment>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let args = LockRedeemKratos::constructorCall {
        initialValidators: initial_validators,
        _lock_period: lock_period,
        _old_contract: old_contract,
        noofValidatorsinold: validators_in_old,
    }
    .abi_encode();
    deploy_embedded(provider, ContractKind::LockRedeemKratos, args, opts).await
}

/// Deploy a migration target for `old_contract`
pub async fn deploy_lock_redeem_future<T, P>(
    provider: &P,
    old_contract: Address,
    validators_in_old: U256,
    opts: &TransactOptions,
) -> Result<Deployment>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let args = LockRedeemFuture::constructorCall {
        _old_contract: old_contract,
        noofValidatorsinold: validators_in_old,
    }
    .abi_encode();
    deploy_embedded(provider, ContractKind::LockRedeemFuture, args, opts).await
}

/// Deploy TestRedeemGas from compiled output loaded at runtime
pub async fn deploy_test_redeem_gas<T, P>(
    provider: &P,
    artifact: &Artifact,
    initial_validators: Vec<Address>,
    opts: &TransactOptions,
) -> Result<Deployment>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let args = TestRedeemGas::constructorCall {
        initialValidators: initial_validators,
    }
    .abi_encode();
    deploy_artifact(provider, artifact, &args, opts).await
}
