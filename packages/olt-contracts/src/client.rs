//! JSON-RPC Client
//!
//! Holds the endpoint, a read-only provider and (optionally) the signing key.
//! Write paths get a provider with the recommended fillers plus the wallet,
//! so nonce, gas limit, gas price and chain id are filled automatically when
//! the caller leaves them unset.

use alloy::{
    network::EthereumWallet,
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use eyre::{eyre, Result};
use tracing::{debug, info};
use url::Url;

use crate::redact::redact_rpc_url;

/// Ethereum client for the bridge contracts
#[derive(Clone)]
pub struct OltClient {
    rpc_url: Url,
    provider: RootProvider<Http<Client>>,
    signer: Option<PrivateKeySigner>,
}

impl std::fmt::Debug for OltClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OltClient")
            .field("rpc_url", &redact_rpc_url(self.rpc_url.as_str()))
            .field("signer", &self.signer_address())
            .finish()
    }
}

impl OltClient {
    /// Create a client that can only read
    pub fn new_readonly(rpc_url: &str) -> Result<Self> {
        let rpc_url: Url = rpc_url
            .parse()
            .map_err(|e| eyre!("Invalid RPC URL: {}", e))?;
        let provider = ProviderBuilder::new().on_http(rpc_url.clone());

        info!(
            rpc_url = %redact_rpc_url(rpc_url.as_str()),
            "Created read-only client"
        );

        Ok(Self {
            rpc_url,
            provider,
            signer: None,
        })
    }

    /// Create a client that can also sign and send transactions
    pub fn new_with_signer(rpc_url: &str, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| eyre!("Invalid private key: {}", e))?;

        let mut client = Self::new_readonly(rpc_url)?;
        info!(address = %signer.address(), "Loaded signing key");
        client.signer = Some(signer);
        Ok(client)
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    /// Read-only provider
    pub fn provider(&self) -> &RootProvider<Http<Client>> {
        &self.provider
    }

    /// Address of the signing key, if any
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// Provider that fills and signs transactions with the client's key
    pub fn signing_provider(&self) -> Result<impl Provider<Http<Client>> + Clone> {
        let signer = self
            .signer
            .clone()
            .ok_or_else(|| eyre!("Client has no signing key"))?;

        debug!(address = %signer.address(), "Building signing provider");

        Ok(ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(self.rpc_url.clone()))
    }

    // =========================================================================
    // Chain Queries
    // =========================================================================

    pub async fn get_chain_id(&self) -> Result<u64> {
        let chain_id = self.provider.get_chain_id().await?;
        Ok(chain_id)
    }

    pub async fn get_block_number(&self) -> Result<u64> {
        let block = self.provider.get_block_number().await?;
        Ok(block)
    }

    /// ETH balance of an address
    pub async fn get_balance(&self, address: Address) -> Result<U256> {
        let balance = self.provider.get_balance(address).await?;
        Ok(balance)
    }

    /// Nonce including transactions still in the pool
    pub async fn pending_nonce(&self, address: Address) -> Result<u64> {
        let nonce = self
            .provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| eyre!("Failed to get pending nonce for {}: {}", address, e))?;
        Ok(nonce)
    }

    /// Node's suggested gas price in wei
    pub async fn suggest_gas_price(&self) -> Result<u128> {
        let price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| eyre!("Failed to get gas price: {}", e))?;
        Ok(price)
    }
}
