//! Error types for the OneLedger contract bindings
//!
//! Transport, revert and RPC failures travel as `eyre::Report` with context.
//! Failures that are detected locally, before anything touches the network,
//! are classified here so callers can match on them.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    // ========================================================================
    // Artifact Errors
    // ========================================================================

    #[error("Invalid bytecode for {contract}: {reason}")]
    InvalidBytecode { contract: String, reason: String },

    #[error("Missing artifact: {0}")]
    MissingArtifact(String),

    #[error("Unknown contract: {0}")]
    UnknownContract(String),

    #[error("Invalid ABI for {contract}: {reason}")]
    InvalidAbi { contract: String, reason: String },

    // ========================================================================
    // Calldata / Log Errors
    // ========================================================================

    #[error("Unexpected selector 0x{found}, expected 0x{expected}")]
    UnexpectedSelector { expected: String, found: String },

    #[error("Failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("Unknown method {method} on {contract}")]
    UnknownMethod { contract: String, method: String },

    #[error("Invalid redeem status {0}")]
    InvalidRedeemStatus(i8),
}

impl BindingError {
    pub(crate) fn decode(what: &'static str, reason: impl ToString) -> Self {
        Self::Decode {
            what,
            reason: reason.to_string(),
        }
    }
}
