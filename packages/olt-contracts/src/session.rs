//! Contract Sessions
//!
//! A [`Session`] pairs a contract handle with call and transact options that
//! apply to every invocation, so callers set sender, block tag and gas
//! parameters once.
//!
//! ```ignore
//! let session = Session::new(contract, CallOptions::pending_from(me), TransactOptions::default());
//! let is_validator = session.call(session.contract().isValidator(me)).await?._0;
//! let receipt = session.transact_and_wait(session.contract().sign()).await?;
//! ```

use alloy::{
    contract::{CallBuilder, CallDecoder},
    eips::BlockId,
    primitives::{Address, TxHash, U256},
    providers::Provider,
    rpc::types::TransactionReceipt,
    transports::Transport,
};
use eyre::{eyre, Result};
use tracing::{debug, info};

/// Options for read-only calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// `msg.sender` of the call
    pub from: Option<Address>,
    /// Block to read at; ignored when `pending` is set
    pub block: Option<u64>,
    /// Read against the pending block
    pub pending: bool,
}

impl CallOptions {
    /// Pending-state reads as `from`
    pub fn pending_from(from: Address) -> Self {
        Self {
            from: Some(from),
            block: None,
            pending: true,
        }
    }

    pub fn block_id(&self) -> Option<BlockId> {
        if self.pending {
            Some(BlockId::pending())
        } else {
            self.block.map(BlockId::number)
        }
    }

    /// Apply to a call builder
    pub fn apply<T, P, D>(&self, mut builder: CallBuilder<T, P, D>) -> CallBuilder<T, P, D>
    where
        T: Transport + Clone,
        P: Provider<T>,
        D: CallDecoder,
    {
        if let Some(from) = self.from {
            builder = builder.from(from);
        }
        if let Some(block) = self.block_id() {
            builder = builder.block(block);
        }
        builder
    }
}

/// Options for transactions; `None` leaves the field to the provider's fillers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactOptions {
    pub from: Option<Address>,
    /// Wei sent along with the transaction
    pub value: Option<U256>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub nonce: Option<u64>,
}

impl TransactOptions {
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Apply to a call builder
    pub fn apply<T, P, D>(&self, mut builder: CallBuilder<T, P, D>) -> CallBuilder<T, P, D>
    where
        T: Transport + Clone,
        P: Provider<T>,
        D: CallDecoder,
    {
        if let Some(from) = self.from {
            builder = builder.from(from);
        }
        if let Some(value) = self.value {
            builder = builder.value(value);
        }
        if let Some(gas) = self.gas_limit {
            builder = builder.gas(gas);
        }
        if let Some(gas_price) = self.gas_price {
            builder = builder.gas_price(gas_price);
        }
        if let Some(nonce) = self.nonce {
            builder = builder.nonce(nonce);
        }
        builder
    }
}

/// Contract handle with pre-set call and transact options
#[derive(Debug, Clone)]
pub struct Session<C> {
    contract: C,
    pub call_options: CallOptions,
    pub transact_options: TransactOptions,
}

impl<C> Session<C> {
    pub fn new(contract: C, call_options: CallOptions, transact_options: TransactOptions) -> Self {
        Self {
            contract,
            call_options,
            transact_options,
        }
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    pub fn into_inner(self) -> C {
        self.contract
    }

    /// Run a read-only call with the session's call options
    pub async fn call<T, P, D>(&self, builder: CallBuilder<T, P, D>) -> Result<D::CallOutput>
    where
        T: Transport + Clone,
        P: Provider<T>,
        D: CallDecoder + Send + Sync + Unpin,
    {
        let builder = self.call_options.apply(builder);
        let output = builder
            .call()
            .await
            .map_err(|e| eyre!("Contract call failed: {}", e))?;
        Ok(output)
    }

    /// Send a transaction with the session's transact options; returns once the node accepted it
    pub async fn transact<T, P, D>(&self, builder: CallBuilder<T, P, D>) -> Result<TxHash>
    where
        T: Transport + Clone,
        P: Provider<T>,
        D: CallDecoder + Send + Sync + Unpin,
    {
        let builder = self.transact_options.apply(builder);
        let pending = builder
            .send()
            .await
            .map_err(|e| eyre!("Failed to send transaction: {}", e))?;
        let tx_hash = *pending.tx_hash();

        debug!(tx_hash = %tx_hash, "Transaction sent");
        Ok(tx_hash)
    }

    /// Send a transaction and wait for its receipt; a reverted transaction is an error
    pub async fn transact_and_wait<T, P, D>(
        &self,
        builder: CallBuilder<T, P, D>,
    ) -> Result<TransactionReceipt>
    where
        T: Transport + Clone,
        P: Provider<T>,
        D: CallDecoder + Send + Sync + Unpin,
    {
        let builder = self.transact_options.apply(builder);
        let pending = builder
            .send()
            .await
            .map_err(|e| eyre!("Failed to send transaction: {}", e))?;
        let tx_hash = *pending.tx_hash();

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| eyre!("Failed to get receipt for {}: {}", tx_hash, e))?;

        if !receipt.status() {
            return Err(eyre!("Transaction {} reverted", tx_hash));
        }

        info!(
            tx_hash = %tx_hash,
            block = ?receipt.block_number,
            gas_used = %receipt.gas_used,
            "Transaction confirmed"
        );

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_options_block_id() {
        let me = Address::repeat_byte(0x01);

        let opts = CallOptions::pending_from(me);
        assert_eq!(opts.from, Some(me));
        assert_eq!(opts.block_id(), Some(BlockId::pending()));

        let opts = CallOptions {
            block: Some(42),
            ..Default::default()
        };
        assert_eq!(opts.block_id(), Some(BlockId::number(42)));

        // pending wins over an explicit block
        let opts = CallOptions {
            block: Some(42),
            pending: true,
            ..Default::default()
        };
        assert_eq!(opts.block_id(), Some(BlockId::pending()));

        assert_eq!(CallOptions::default().block_id(), None);
    }

    #[test]
    fn test_transact_options_default_is_auto() {
        let opts = TransactOptions::default();
        assert!(opts.nonce.is_none());
        assert!(opts.gas_limit.is_none());
        assert!(opts.gas_price.is_none());

        let opts = TransactOptions::default()
            .with_value(U256::from(5))
            .with_gas_limit(6_721_970);
        assert_eq!(opts.value, Some(U256::from(5)));
        assert_eq!(opts.gas_limit, Some(6_721_970));
    }
}
