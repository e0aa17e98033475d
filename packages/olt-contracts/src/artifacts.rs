//! Compiled Contract Artifacts
//!
//! The bridge contracts ship as solc output: a hex creation-code blob and a
//! JSON ABI per contract, embedded from `artifacts/` at build time.
//! [`Artifact`] also loads compiled output from disk (used for
//! `TestRedeemGas`, which is not embedded).
//!
//! Supported file formats:
//! - `.bin` / `.hex`: creation code as hex, with or without `0x`
//! - `.json`: `{ "bytecode": "0x..." }` (solc / truffle) or
//!   `{ "bytecode": { "object": "0x..." } }` (forge), optional `"abi"`

use alloy::{json_abi::JsonAbi, primitives::Bytes};
use eyre::{Result, WrapErr};
use serde::Deserialize;
use std::{fmt, path::Path, str::FromStr};
use tracing::debug;

use crate::error::BindingError;

// ============================================================================
// Embedded Artifacts
// ============================================================================

const ERC20_BASIC_BIN: &str = include_str!("../artifacts/ERC20Basic.bin");
const ERC20_BASIC_ABI: &str = include_str!("../artifacts/ERC20Basic.abi.json");
const LOCK_REDEEM_BIN: &str = include_str!("../artifacts/LockRedeem.bin");
const LOCK_REDEEM_ABI: &str = include_str!("../artifacts/LockRedeem.abi.json");
const LOCK_REDEEM_ERC_BIN: &str = include_str!("../artifacts/LockRedeemERC.bin");
const LOCK_REDEEM_ERC_ABI: &str = include_str!("../artifacts/LockRedeemERC.abi.json");
const LOCK_REDEEM_V2_BIN: &str = include_str!("../artifacts/LockRedeemV2.bin");
const LOCK_REDEEM_V2_ABI: &str = include_str!("../artifacts/LockRedeemV2.abi.json");
const LOCK_REDEEM_KRATOS_BIN: &str = include_str!("../artifacts/LockRedeemKratos.bin");
const LOCK_REDEEM_KRATOS_ABI: &str = include_str!("../artifacts/LockRedeemKratos.abi.json");
const LOCK_REDEEM_FUTURE_BIN: &str = include_str!("../artifacts/LockRedeemFuture.bin");
const LOCK_REDEEM_FUTURE_ABI: &str = include_str!("../artifacts/LockRedeemFuture.abi.json");

/// Contracts with embedded bytecode and ABI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    Erc20Basic,
    LockRedeem,
    LockRedeemErc,
    LockRedeemV2,
    LockRedeemKratos,
    LockRedeemFuture,
}

impl ContractKind {
    pub const ALL: [ContractKind; 6] = [
        ContractKind::Erc20Basic,
        ContractKind::LockRedeem,
        ContractKind::LockRedeemErc,
        ContractKind::LockRedeemV2,
        ContractKind::LockRedeemKratos,
        ContractKind::LockRedeemFuture,
    ];

    /// Solidity contract name
    pub fn name(&self) -> &'static str {
        match self {
            ContractKind::Erc20Basic => "ERC20Basic",
            ContractKind::LockRedeem => "LockRedeem",
            ContractKind::LockRedeemErc => "LockRedeemERC",
            ContractKind::LockRedeemV2 => "LockRedeemV2",
            ContractKind::LockRedeemKratos => "LockRedeemKratos",
            ContractKind::LockRedeemFuture => "LockRedeemFuture",
        }
    }

    fn sources(&self) -> (&'static str, &'static str) {
        match self {
            ContractKind::Erc20Basic => (ERC20_BASIC_BIN, ERC20_BASIC_ABI),
            ContractKind::LockRedeem => (LOCK_REDEEM_BIN, LOCK_REDEEM_ABI),
            ContractKind::LockRedeemErc => (LOCK_REDEEM_ERC_BIN, LOCK_REDEEM_ERC_ABI),
            ContractKind::LockRedeemV2 => (LOCK_REDEEM_V2_BIN, LOCK_REDEEM_V2_ABI),
            ContractKind::LockRedeemKratos => (LOCK_REDEEM_KRATOS_BIN, LOCK_REDEEM_KRATOS_ABI),
            ContractKind::LockRedeemFuture => (LOCK_REDEEM_FUTURE_BIN, LOCK_REDEEM_FUTURE_ABI),
        }
    }

    /// Creation code (without constructor arguments)
    pub fn bytecode(&self) -> Result<Bytes, BindingError> {
        decode_bytecode(self.name(), self.sources().0)
    }

    /// Parsed JSON ABI
    pub fn abi(&self) -> Result<JsonAbi, BindingError> {
        parse_abi(self.name(), self.sources().1)
    }

    /// Raw ABI JSON as shipped
    pub fn abi_json(&self) -> &'static str {
        self.sources().1
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContractKind {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ContractKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| BindingError::UnknownContract(wanted.to_string()))
    }
}

// ============================================================================
// External Artifacts
// ============================================================================

/// Compiled contract loaded from an embedded blob or from disk
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Contract name (file stem for on-disk artifacts)
    pub name: String,
    /// Creation code
    pub bytecode: Bytes,
    /// ABI, when the artifact carries one
    pub abi: Option<JsonAbi>,
}

#[derive(Deserialize)]
struct CompiledOutput {
    bytecode: BytecodeField,
    #[serde(default)]
    abi: Option<JsonAbi>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Hex(String),
    Object { object: String },
}

impl Artifact {
    /// Load an embedded contract
    pub fn embedded(kind: ContractKind) -> Result<Self, BindingError> {
        Ok(Self {
            name: kind.name().to_string(),
            bytecode: kind.bytecode()?,
            abi: Some(kind.abi()?),
        })
    }

    /// Build from hex creation code
    pub fn from_hex(name: &str, hex_code: &str) -> Result<Self, BindingError> {
        Ok(Self {
            name: name.to_string(),
            bytecode: decode_bytecode(name, hex_code)?,
            abi: None,
        })
    }

    /// Build from solc / truffle / forge JSON output
    pub fn from_json(name: &str, json: &str) -> Result<Self, BindingError> {
        let output: CompiledOutput =
            serde_json::from_str(json).map_err(|e| BindingError::InvalidBytecode {
                contract: name.to_string(),
                reason: format!("not a compiler output: {}", e),
            })?;

        let code = match output.bytecode {
            BytecodeField::Hex(code) => code,
            BytecodeField::Object { object } => object,
        };

        Ok(Self {
            name: name.to_string(),
            bytecode: decode_bytecode(name, &code)?,
            abi: output.abi,
        })
    }

    /// Load from a file; `.json` is parsed as compiler output, anything else as hex
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BindingError::MissingArtifact(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read artifact {}", path.display()))?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.split('.').next().unwrap_or(s))
            .unwrap_or("contract")
            .to_string();

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let artifact = if is_json {
            Self::from_json(&name, &contents)?
        } else {
            Self::from_hex(&name, &contents)?
        };

        debug!(
            name = %artifact.name,
            path = %path.display(),
            code_len = artifact.bytecode.len(),
            "Loaded contract artifact"
        );

        Ok(artifact)
    }

    /// Creation code followed by ABI-encoded constructor arguments
    pub fn creation_code(&self, encoded_args: &[u8]) -> Bytes {
        creation_code(&self.bytecode, encoded_args)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Concatenate creation code and ABI-encoded constructor arguments
pub fn creation_code(bytecode: &[u8], encoded_args: &[u8]) -> Bytes {
    let mut code = Vec::with_capacity(bytecode.len() + encoded_args.len());
    code.extend_from_slice(bytecode);
    code.extend_from_slice(encoded_args);
    code.into()
}

/// Decode hex creation code, tolerating a `0x` prefix and surrounding whitespace
pub fn decode_bytecode(contract: &str, hex_code: &str) -> Result<Bytes, BindingError> {
    let trimmed = hex_code.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    if stripped.is_empty() {
        return Err(BindingError::InvalidBytecode {
            contract: contract.to_string(),
            reason: "empty bytecode".to_string(),
        });
    }

    hex::decode(stripped)
        .map(Bytes::from)
        .map_err(|e| BindingError::InvalidBytecode {
            contract: contract.to_string(),
            reason: e.to_string(),
        })
}

fn parse_abi(contract: &str, json: &str) -> Result<JsonAbi, BindingError> {
    serde_json::from_str(json).map_err(|e| BindingError::InvalidAbi {
        contract: contract.to_string(),
        reason: e.to_string(),
    })
}
