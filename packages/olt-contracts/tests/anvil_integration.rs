//! Bridge Contract Integration Tests
//!
//! Deploys the embedded contracts to a running development node and drives
//! them through the typed clients, watcher and raw access.
//!
//! ## Setup
//!
//! Requires a node with a funded account, e.g. `anvil`. Set:
//!
//! - `EVM_RPC_URL` - node RPC (e.g., http://localhost:8545)
//! - `EVM_PRIVATE_KEY` - funded deployer key
//!
//! ## Running
//!
//! ```bash
//! anvil &
//! EVM_RPC_URL=http://localhost:8545 \
//! EVM_PRIVATE_KEY=0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80 \
//! cargo test -p olt-contracts --test anvil_integration -- --ignored --nocapture
//! ```

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, U256};
use olt_contracts::{
    deploy_erc20_basic, deploy_lock_redeem, deploy_lock_redeem_kratos, tokens, wait_for_receipt,
    BridgeWatcher, ContractKind, LockRedeemClient, LockRedeemV2Client, OltClient, RawContract,
    RedeemStatus, TransactOptions, WatcherConfig,
};
use std::time::Duration;

/// Load the client from env; Err explains what is missing
fn setup() -> Result<OltClient, String> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info,olt_contracts=debug")
        .with_test_writer()
        .try_init();

    let rpc_url = std::env::var("EVM_RPC_URL")
        .map_err(|_| "EVM_RPC_URL not set. Start anvil and set EVM_RPC_URL, EVM_PRIVATE_KEY")?;
    let private_key =
        std::env::var("EVM_PRIVATE_KEY").map_err(|_| "EVM_PRIVATE_KEY not set".to_string())?;

    OltClient::new_with_signer(&rpc_url, &private_key).map_err(|e| e.to_string())
}

fn fast_watcher_config() -> WatcherConfig {
    WatcherConfig {
        poll_interval: Duration::from_millis(200),
        max_block_range: 1_000,
    }
}

#[tokio::test]
#[ignore]
async fn test_erc20_basic_deploy_and_transfer() {
    let client = setup().expect("setup");
    let provider = client.signing_provider().unwrap();
    let deployer = client.signer_address().unwrap();
    let total = U256::from(1_000_000u64);

    let token = deploy_erc20_basic(&provider, total, &TransactOptions::default())
        .await
        .unwrap();

    let info = tokens::get_token_info(&provider, token.address).await.unwrap();
    assert_eq!(info.decimals, 18);
    assert_eq!(
        tokens::get_total_supply(&provider, token.address).await.unwrap(),
        total
    );
    assert_eq!(
        tokens::get_token_balance(&provider, token.address, deployer)
            .await
            .unwrap(),
        total
    );

    let receiver = Address::repeat_byte(0x42);
    let tx_hash = tokens::transfer(&provider, token.address, receiver, U256::from(250u64))
        .await
        .unwrap();
    let receipt = wait_for_receipt(
        &provider,
        tx_hash,
        1,
        Duration::from_secs(30),
        Duration::from_millis(200),
    )
    .await
    .unwrap();
    let block = receipt.block_number.unwrap();

    let watcher = BridgeWatcher::with_config(provider.clone(), token.address, fast_watcher_config());
    let transfers = watcher
        .filter_transfer(block, block, None, Some(receiver))
        .await
        .unwrap();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].from, deployer);
    assert_eq!(transfers[0].amount, U256::from(250u64));
}

#[tokio::test]
#[ignore]
async fn test_lock_redeem_v1_lock_and_filter() {
    let client = setup().expect("setup");
    let provider = client.signing_provider().unwrap();
    let deployer = client.signer_address().unwrap();

    let deployment = deploy_lock_redeem(&provider, vec![deployer], &TransactOptions::default())
        .await
        .unwrap();
    let bridge = LockRedeemClient::new(deployment.address, provider.clone());

    assert!(bridge.is_validator(deployer).await.unwrap());
    assert!(!bridge.is_validator(Address::repeat_byte(0x99)).await.unwrap());
    assert_eq!(bridge.num_validators().await.unwrap(), U256::from(1));

    let amount = U256::from(1_000_000_000_000_000u64);
    let tx_hash = bridge.lock(amount).await.unwrap();
    let receipt = wait_for_receipt(
        &provider,
        tx_hash,
        1,
        Duration::from_secs(30),
        Duration::from_millis(200),
    )
    .await
    .unwrap();
    let block = receipt.block_number.unwrap();

    assert_eq!(bridge.total_eth_balance().await.unwrap(), amount);

    let watcher =
        BridgeWatcher::with_config(provider.clone(), deployment.address, fast_watcher_config());
    let locks = watcher.filter_lock(deployment.block_number.unwrap_or(0), block).await.unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].sender, deployer);
    assert_eq!(locks[0].amount_received, amount);
    assert_eq!(locks[0].tx_hash, tx_hash);
}

#[tokio::test]
#[ignore]
async fn test_watch_forwards_lock_events() {
    let client = setup().expect("setup");
    let provider = client.signing_provider().unwrap();
    let deployer = client.signer_address().unwrap();

    let deployment = deploy_lock_redeem(&provider, vec![deployer], &TransactOptions::default())
        .await
        .unwrap();
    let bridge = LockRedeemClient::new(deployment.address, provider.clone());
    let watcher =
        BridgeWatcher::with_config(provider.clone(), deployment.address, fast_watcher_config());

    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let handle = watcher.watch_lock(None, tx).await.unwrap();

    let amount = U256::from(12_345u64);
    bridge.lock(amount).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(20), rx.recv())
        .await
        .expect("lock event within timeout")
        .expect("channel open");
    assert_eq!(event.amount_received, amount);

    handle.unsubscribe().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_kratos_redeem_status_without_request() {
    let client = setup().expect("setup");
    let provider = client.signing_provider().unwrap();
    let deployer = client.signer_address().unwrap();

    let deployment = deploy_lock_redeem_kratos(
        &provider,
        vec![deployer],
        U256::from(100),
        Address::ZERO,
        U256::ZERO,
        &TransactOptions::default(),
    )
    .await
    .unwrap();
    let bridge = LockRedeemV2Client::new(deployment.address, provider.clone());

    assert!(bridge.is_validator(deployer).await.unwrap());
    assert_eq!(
        bridge.verify_redeem(Address::repeat_byte(0x31)).await.unwrap(),
        RedeemStatus::NotFound
    );
    assert_eq!(
        bridge.redeem_balance(Address::repeat_byte(0x31)).await.unwrap(),
        U256::ZERO
    );
}

#[tokio::test]
#[ignore]
async fn test_raw_call_matches_typed_call() {
    let client = setup().expect("setup");
    let provider = client.signing_provider().unwrap();
    let deployer = client.signer_address().unwrap();

    let deployment = deploy_lock_redeem(&provider, vec![deployer], &TransactOptions::default())
        .await
        .unwrap();

    let raw = RawContract::new(ContractKind::LockRedeem, deployment.address, provider.clone())
        .unwrap();
    let output = raw
        .call("isValidator", &[DynSolValue::Address(deployer)])
        .await
        .unwrap();
    assert_eq!(output, vec![DynSolValue::Bool(true)]);

    let output = raw.call("numValidators", &[]).await.unwrap();
    assert_eq!(output, vec![DynSolValue::Uint(U256::from(1), 256)]);
}
