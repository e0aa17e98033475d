mod config;

use alloy::primitives::{Address, TxHash, U256};
use std::time::Duration;
use eyre::WrapErr;
use olt_contracts::contracts::{LockRedeem, TestRedeemGas};
use olt_contracts::{
    deploy_lock_redeem, deploy_test_redeem_gas, wait_for_receipt, Artifact, CallOptions,
    Deployment, OltClient, Session, TransactOptions,
};

use config::{Config, DemoContract};

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    tracing::info!("Starting OneLedger contract demo");

    let config = Config::load()?;
    tracing::debug!(config = ?config, "Configuration loaded");

    let validator: Address = config
        .demo
        .validator_address
        .parse()
        .wrap_err("DEMO_VALIDATOR_ADDRESS is not a valid address")?;

    // Connect and report the deployer's state
    let client = OltClient::new_with_signer(&config.evm.rpc_url, &config.evm.private_key)?;
    let deployer = client
        .signer_address()
        .ok_or_else(|| eyre::eyre!("Client was built without a signer"))?;

    let chain_id = client.get_chain_id().await?;
    let nonce = client.pending_nonce(deployer).await?;
    let gas_price = client.suggest_gas_price().await?;
    tracing::info!(
        chain_id = chain_id,
        deployer = %deployer,
        nonce = nonce,
        gas_price = %gas_price,
        "Connected"
    );

    let provider = client.signing_provider()?;
    let deploy_opts = TransactOptions {
        from: Some(deployer),
        value: Some(U256::ZERO),
        gas_limit: Some(config.demo.gas_limit),
        gas_price: Some(gas_price),
        nonce: Some(nonce),
    };

    // Deploy
    let deployment: Deployment = match config.demo.contract {
        DemoContract::TestGas => {
            let path = config
                .demo
                .testgas_artifact
                .as_ref()
                .ok_or_else(|| eyre::eyre!("TESTGAS_ARTIFACT is not set"))?;
            let artifact = Artifact::from_file(path)?;
            deploy_test_redeem_gas(&provider, &artifact, vec![validator], &deploy_opts).await?
        }
        DemoContract::LockRedeem => {
            deploy_lock_redeem(&provider, vec![validator], &deploy_opts).await?
        }
    };

    println!("Contract address: {}", deployment.address);
    println!("Deployment tx:    {}", deployment.tx_hash);

    // Session with pending-state reads and filler-managed transactions
    let call_opts = CallOptions::pending_from(deployer);
    let transact_opts = TransactOptions {
        from: Some(deployer),
        ..Default::default()
    };

    let outcome = match config.demo.contract {
        DemoContract::TestGas => {
            let session = Session::new(
                TestRedeemGas::new(deployment.address, &provider),
                call_opts,
                transact_opts,
            );
            run_test_gas(&session, validator).await
        }
        DemoContract::LockRedeem => {
            let session = Session::new(
                LockRedeem::new(deployment.address, &provider),
                call_opts,
                transact_opts,
            );
            run_lock_redeem(&session, validator).await
        }
    };

    match outcome {
        Ok(tx_hash) => {
            match wait_for_receipt(
                &provider,
                tx_hash,
                1,
                config.demo.confirm_timeout(),
                Duration::from_secs(1),
            )
            .await
            {
                Ok(receipt) => tracing::info!(
                    tx_hash = %tx_hash,
                    block = ?receipt.block_number,
                    gas_used = %receipt.gas_used,
                    "sign confirmed"
                ),
                Err(e) => tracing::error!(error = %e, "sign was not confirmed"),
            }
        }
        Err(e) => tracing::error!(error = %e, "Demo call failed"),
    }

    tracing::info!("Demo finished");
    Ok(())
}

async fn run_test_gas<T, P>(
    session: &Session<TestRedeemGas::TestRedeemGasInstance<T, P>>,
    validator: Address,
) -> eyre::Result<TxHash>
where
    T: alloy::transports::Transport + Clone,
    P: alloy::providers::Provider<T>,
{
    let is_validator = session
        .call(session.contract().isValidator(validator))
        .await?
        ._0;
    println!("isValidator({}): {}", validator, is_validator);

    let tx_hash = session.transact(session.contract().sign()).await?;
    println!("sign() tx: {}", tx_hash);
    Ok(tx_hash)
}

async fn run_lock_redeem<T, P>(
    session: &Session<LockRedeem::LockRedeemInstance<T, P>>,
    validator: Address,
) -> eyre::Result<TxHash>
where
    T: alloy::transports::Transport + Clone,
    P: alloy::providers::Provider<T>,
{
    let is_validator = session
        .call(session.contract().isValidator(validator))
        .await?
        ._0;
    println!("isValidator({}): {}", validator, is_validator);

    let tx_hash = session
        .transact(session.contract().sign(U256::ZERO, validator))
        .await?;
    println!("sign(0, {}) tx: {}", validator, tx_hash);
    Ok(tx_hash)
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,olt_contracts=debug,olt_demo=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}
