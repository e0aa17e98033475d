use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use olt_contracts::redact::redact_rpc_url;

/// Demo configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub evm: EvmConfig,
    pub demo: DemoConfig,
}

/// Node connection and signing key
#[derive(Clone)]
pub struct EvmConfig {
    pub rpc_url: String,
    pub private_key: String,
}

/// Custom Debug that redacts the key and any credentials in the RPC URL.
impl fmt::Debug for EvmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmConfig")
            .field("rpc_url", &redact_rpc_url(&self.rpc_url))
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Which contract the demo deploys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoContract {
    /// TestRedeemGas, loaded from `TESTGAS_ARTIFACT`
    TestGas,
    /// Embedded v1 LockRedeem
    LockRedeem,
}

impl FromStr for DemoContract {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testgas" | "testredeemgas" => Ok(DemoContract::TestGas),
            "lockredeem" => Ok(DemoContract::LockRedeem),
            other => Err(eyre!(
                "DEMO_CONTRACT must be 'testgas' or 'lockredeem', got '{}'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Validator passed to the constructor and queried afterwards
    pub validator_address: String,
    pub gas_limit: u64,
    pub testgas_artifact: Option<PathBuf>,
    pub contract: DemoContract,
    pub confirm_timeout_secs: u64,
}

impl DemoConfig {
    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_gas_limit() -> u64 {
    6_721_970
}

fn default_contract() -> DemoContract {
    DemoContract::TestGas
}

fn default_confirm_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    fn load_from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from a variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let evm = EvmConfig {
            rpc_url: lookup("EVM_RPC_URL").unwrap_or_else(default_rpc_url),
            private_key: lookup("EVM_PRIVATE_KEY")
                .ok_or_else(|| eyre!("EVM_PRIVATE_KEY environment variable is required"))?,
        };

        let demo = DemoConfig {
            validator_address: lookup("DEMO_VALIDATOR_ADDRESS")
                .ok_or_else(|| eyre!("DEMO_VALIDATOR_ADDRESS environment variable is required"))?,
            gas_limit: match lookup("DEMO_GAS_LIMIT") {
                Some(v) => v.parse().wrap_err("DEMO_GAS_LIMIT must be a valid u64")?,
                None => default_gas_limit(),
            },
            testgas_artifact: lookup("TESTGAS_ARTIFACT")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            contract: match lookup("DEMO_CONTRACT") {
                Some(v) => v.parse()?,
                None => default_contract(),
            },
            confirm_timeout_secs: lookup("DEMO_CONFIRM_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_confirm_timeout_secs()),
        };

        let config = Config { evm, demo };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.evm.rpc_url.is_empty() {
            return Err(eyre!("evm.rpc_url cannot be empty"));
        }

        if self.evm.private_key.len() != 66 || !self.evm.private_key.starts_with("0x") {
            return Err(eyre!("evm.private_key must be 66 chars (0x + 64 hex chars)"));
        }

        if self.demo.validator_address.len() != 42 || !self.demo.validator_address.starts_with("0x")
        {
            return Err(eyre!(
                "demo.validator_address must be a valid hex address (42 chars with 0x prefix)"
            ));
        }

        if self.demo.gas_limit == 0 {
            return Err(eyre!("demo.gas_limit must be positive"));
        }

        if self.demo.contract == DemoContract::TestGas && self.demo.testgas_artifact.is_none() {
            return Err(eyre!(
                "TESTGAS_ARTIFACT is required when DEMO_CONTRACT=testgas \
                 (or set DEMO_CONTRACT=lockredeem to use the embedded contract)"
            ));
        }

        Ok(())
    }
}
