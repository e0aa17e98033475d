//! OLT-Contracts: Ethereum bindings for the OneLedger bridge contracts
//!
//! This crate exposes the bridge contracts to Rust callers. All bridge logic
//! (voting thresholds, redeem windows, quorum, fees, migration) runs in the
//! contract bytecode; this crate only encodes calls and transactions and
//! decodes results and logs.
//!
//! - **Contracts** - `sol!` bindings for ERC20Basic, LockRedeem (v1, ERC20),
//!   LockRedeemV2, LockRedeemKratos, LockRedeemFuture and TestRedeemGas
//! - **Artifacts** - embedded bytecode and ABI, plus loading compiled output from disk
//! - **Deploy** - contract-creation transactions for every deployable contract
//! - **Session** - call / transact options bound to a contract handle
//! - **Bridge** - typed v1 and v2 lock/redeem clients
//! - **Events / Watcher** - typed log records, range queries, live watching, finality
//! - **Calldata** - offline decoding and encoding of bridge transaction input
//! - **Raw** - method-by-name access through the JSON ABI
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! olt-contracts = { path = "../olt-contracts" }
//! ```

pub mod artifacts;
pub mod bridge;
pub mod calldata;
pub mod client;
pub mod contracts;
pub mod deploy;
pub mod error;
pub mod events;
pub mod raw;
pub mod redact;
pub mod session;
pub mod tokens;
pub mod watcher;

// Re-export commonly used items at the crate root
pub use artifacts::{Artifact, ContractKind};
pub use bridge::{LockRedeemClient, LockRedeemV2Client, RedeemStatus};
pub use client::OltClient;
pub use deploy::{
    deploy_artifact, deploy_creation_code, deploy_erc20_basic, deploy_lock_redeem,
    deploy_lock_redeem_erc, deploy_lock_redeem_future, deploy_lock_redeem_kratos,
    deploy_lock_redeem_v2, deploy_test_redeem_gas, Deployment,
};
pub use error::BindingError;
pub use events::{LockRedeemEvent, LockRedeemV2Event};
pub use raw::RawContract;
pub use session::{CallOptions, Session, TransactOptions};
pub use watcher::{wait_for_receipt, BridgeWatcher, WatchHandle, WatcherConfig, DEFAULT_CONFIRMATIONS};
