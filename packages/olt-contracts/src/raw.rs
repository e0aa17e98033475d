//! Dynamic Contract Access
//!
//! Method-by-name access driven by the embedded JSON ABI, for tooling that
//! does not know the contract at compile time. Arguments and results are
//! `DynSolValue`s.

use alloy::{
    contract::{ContractInstance, Interface},
    dyn_abi::DynSolValue,
    json_abi::JsonAbi,
    network::{Ethereum, TransactionBuilder},
    primitives::{Address, TxHash, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
    transports::Transport,
};
use eyre::{eyre, Result};
use tracing::{debug, info};

use crate::artifacts::ContractKind;
use crate::error::BindingError;

/// Contract handle addressed by method name
pub struct RawContract<T, P> {
    name: String,
    instance: ContractInstance<T, P, Ethereum>,
}

impl<T, P> RawContract<T, P>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    /// Handle for an embedded contract deployed at `address`
    pub fn new(kind: ContractKind, address: Address, provider: P) -> Result<Self, BindingError> {
        Ok(Self::from_abi(kind.name(), kind.abi()?, address, provider))
    }

    /// Handle from any ABI (e.g. one loaded with an [`crate::artifacts::Artifact`])
    pub fn from_abi(name: &str, abi: JsonAbi, address: Address, provider: P) -> Self {
        Self {
            name: name.to_string(),
            instance: ContractInstance::new(address, provider, Interface::new(abi)),
        }
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }

    pub fn abi(&self) -> &JsonAbi {
        self.instance.abi()
    }

    fn ensure_method(&self, method: &str) -> Result<(), BindingError> {
        if self.abi().function(method).is_none() {
            return Err(BindingError::UnknownMethod {
                contract: self.name.clone(),
                method: method.to_string(),
            });
        }
        Ok(())
    }

    /// Read-only call; returns the decoded outputs
    pub async fn call(&self, method: &str, args: &[DynSolValue]) -> Result<Vec<DynSolValue>> {
        self.ensure_method(method)?;

        let builder = self
            .instance
            .function(method, args)
            .map_err(|e| eyre!("Failed to encode {}.{}: {}", self.name, method, e))?;
        let output = builder
            .call()
            .await
            .map_err(|e| eyre!("Call {}.{} failed: {}", self.name, method, e))?;

        debug!(
            contract = %self.name,
            method = method,
            outputs = output.len(),
            "Raw call"
        );
        Ok(output)
    }

    /// State-changing call carrying `value` wei
    pub async fn transact(
        &self,
        method: &str,
        args: &[DynSolValue],
        value: U256,
    ) -> Result<TxHash> {
        self.ensure_method(method)?;

        let builder = self
            .instance
            .function(method, args)
            .map_err(|e| eyre!("Failed to encode {}.{}: {}", self.name, method, e))?
            .value(value);
        let pending = builder
            .send()
            .await
            .map_err(|e| eyre!("Failed to send {}.{}: {}", self.name, method, e))?;

        let tx_hash = *pending.tx_hash();
        info!(contract = %self.name, method = method, tx_hash = %tx_hash, "Raw transaction sent");
        Ok(tx_hash)
    }

    /// Plain value transfer to the contract (payable fallback)
    pub async fn transfer(&self, value: U256) -> Result<TxHash> {
        let tx = TransactionRequest::default()
            .with_to(self.address())
            .with_value(value);

        let pending = self
            .instance
            .provider()
            .send_transaction(tx)
            .await
            .map_err(|e| eyre!("Failed to transfer to {}: {}", self.name, e))?;

        let tx_hash = *pending.tx_hash();
        info!(contract = %self.name, value = %value, tx_hash = %tx_hash, "Value sent to fallback");
        Ok(tx_hash)
    }
}
