//! Typed Event Records
//!
//! Decoded contract events plus the position of the log that carried them.
//! A record is built from the generated `sol!` event type through
//! [`FromSolEvent`]; [`decode_record`] does the log decoding and skips logs
//! that have no block / transaction metadata yet (pending logs).

use alloy::{
    primitives::{Address, B256, I256, U256},
    rpc::types::Log,
    sol_types::SolEvent,
};
use eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::contracts::{ERC20Basic, LockRedeem, LockRedeemERC, LockRedeemV2};
use crate::error::BindingError;

/// Where a log sits in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMeta {
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

impl LogMeta {
    /// `None` for pending logs
    pub fn from_log(log: &Log) -> Option<Self> {
        Some(Self {
            block_number: log.block_number?,
            tx_hash: log.transaction_hash?,
            log_index: log.log_index?,
        })
    }
}

/// Build a record from a decoded `sol!` event
pub trait FromSolEvent<E: SolEvent>: Sized {
    fn from_sol(event: E, meta: LogMeta) -> Self;
}

/// Decode `log` as `E` and convert it; `Ok(None)` when the log is still pending
pub fn decode_record<E, R>(log: &Log) -> Result<Option<R>>
where
    E: SolEvent,
    R: FromSolEvent<E>,
{
    let decoded = log
        .log_decode::<E>()
        .map_err(|e| BindingError::decode(E::SIGNATURE, e))?;

    let Some(meta) = LogMeta::from_log(log) else {
        warn!(
            event = E::SIGNATURE,
            address = %log.address(),
            "Skipping log without block metadata"
        );
        return Ok(None);
    };

    Ok(Some(R::from_sol(decoded.inner.data, meta)))
}

// ============================================================================
// Bridge Events
// ============================================================================

/// Ether locked on the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEvent {
    pub sender: Address,
    pub amount_received: U256,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

impl FromSolEvent<LockRedeem::Lock> for LockEvent {
    fn from_sol(event: LockRedeem::Lock, meta: LogMeta) -> Self {
        Self {
            sender: event.sender,
            amount_received: event.amount_received,
            block_number: meta.block_number,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
        }
    }
}

impl FromSolEvent<LockRedeemV2::Lock> for LockEvent {
    fn from_sol(event: LockRedeemV2::Lock, meta: LogMeta) -> Self {
        Self {
            sender: event.sender,
            amount_received: event.amount_received,
            block_number: meta.block_number,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
        }
    }
}

/// Redeem requested by a user
///
/// v1: RedeemRequest(address indexed recepient, uint256 amount_requested)
/// v2: RedeemRequest(address indexed recepient, uint256 amount_requested, uint256 redeemFeeCharged)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemRequestEvent {
    pub recipient: Address,
    pub amount_requested: U256,
    /// v2 only
    pub redeem_fee_charged: Option<U256>,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

impl FromSolEvent<LockRedeem::RedeemRequest> for RedeemRequestEvent {
    fn from_sol(event: LockRedeem::RedeemRequest, meta: LogMeta) -> Self {
        Self {
            recipient: event.recepient,
            amount_requested: event.amount_requested,
            redeem_fee_charged: None,
            block_number: meta.block_number,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
        }
    }
}

impl FromSolEvent<LockRedeemV2::RedeemRequest> for RedeemRequestEvent {
    fn from_sol(event: LockRedeemV2::RedeemRequest, meta: LogMeta) -> Self {
        Self {
            recipient: event.recepient,
            amount_requested: event.amount_requested,
            redeem_fee_charged: Some(event.redeemFeeCharged),
            block_number: meta.block_number,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
        }
    }
}

/// A validator signed a pending redeem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSignedRedeemEvent {
    pub recipient: Address,
    pub validator: Address,
    pub amount: U256,
    /// v2 only: gas refunded to the validator out of the redeem fee
    pub gas_returned: Option<U256>,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

impl FromSolEvent<LockRedeem::ValidatorSignedRedeem> for ValidatorSignedRedeemEvent {
    fn from_sol(event: LockRedeem::ValidatorSignedRedeem, meta: LogMeta) -> Self {
        Self {
            recipient: event.recipient,
            validator: event.validator_addresss,
            amount: event.amount,
            gas_returned: None,
            block_number: meta.block_number,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
        }
    }
}

impl FromSolEvent<LockRedeemV2::ValidatorSignedRedeem> for ValidatorSignedRedeemEvent {
    fn from_sol(event: LockRedeemV2::ValidatorSignedRedeem, meta: LogMeta) -> Self {
        Self {
            recipient: event.recipient,
            validator: event.validator_addresss,
            amount: event.amount,
            gas_returned: Some(event.gasReturned),
            block_number: meta.block_number,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
        }
    }
}

/// ERC20 redeem paid out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemSuccessfulEvent {
    pub recipient: Address,
    pub amount_transferred: U256,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

impl FromSolEvent<LockRedeemERC::RedeemSuccessful> for RedeemSuccessfulEvent {
    fn from_sol(event: LockRedeemERC::RedeemSuccessful, meta: LogMeta) -> Self {
        Self {
            recipient: event.recepient,
            amount_transferred: event.amount_trafered,
            block_number: meta.block_number,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
        }
    }
}

// ============================================================================
// Governance Events
// ============================================================================

/// Validator added; v1 carries its voting power
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddValidatorEvent {
    pub validator: Address,
    /// v1 only
    pub power: Option<I256>,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

impl FromSolEvent<LockRedeem::AddValidator> for AddValidatorEvent {
    fn from_sol(event: LockRedeem::AddValidator, meta: LogMeta) -> Self {
        Self {
            validator: event._address,
            power: Some(event._power),
            block_number: meta.block_number,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
        }
    }
}

impl FromSolEvent<LockRedeemV2::AddValidator> for AddValidatorEvent {
    fn from_sol(event: LockRedeemV2::AddValidator, meta: LogMeta) -> Self {
        Self {
            validator: event._address,
            power: None,
            block_number: meta.block_number,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteValidatorEvent {
    pub validator: Address,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

impl FromSolEvent<LockRedeem::DeleteValidator> for DeleteValidatorEvent {
    fn from_sol(event: LockRedeem::DeleteValidator, meta: LogMeta) -> Self {
        Self {
            validator: event._address,
            block_number: meta.block_number,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewThresholdEvent {
    pub previous_threshold: U256,
    pub new_threshold: U256,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

impl FromSolEvent<LockRedeem::NewThreshold> for NewThresholdEvent {
    fn from_sol(event: LockRedeem::NewThreshold, meta: LogMeta) -> Self {
        Self {
            previous_threshold: event._prevThreshold,
            new_threshold: event._newThreshold,
            block_number: meta.block_number,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEpochEvent {
    pub epoch_height: U256,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

impl FromSolEvent<LockRedeem::NewEpoch> for NewEpochEvent {
    fn from_sol(event: LockRedeem::NewEpoch, meta: LogMeta) -> Self {
        Self {
            epoch_height: event.epochHeight,
            block_number: meta.block_number,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
        }
    }
}

/// A validator voted to migrate to a new contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorMigratedEvent {
    pub validator: Address,
    pub new_contract: Address,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

impl FromSolEvent<LockRedeemV2::ValidatorMigrated> for ValidatorMigratedEvent {
    fn from_sol(event: LockRedeemV2::ValidatorMigrated, meta: LogMeta) -> Self {
        Self {
            validator: event.validator,
            new_contract: event.NewSmartContractAddress,
            block_number: meta.block_number,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
        }
    }
}

// ============================================================================
// Token Events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEvent {
    pub token: Address,
    pub owner: Address,
    pub spender: Address,
    pub amount: U256,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

/// Token events need the emitting address, which the decoded event does not carry
pub fn decode_transfer(log: &Log) -> Result<Option<TransferEvent>> {
    let decoded = log
        .log_decode::<ERC20Basic::Transfer>()
        .map_err(|e| BindingError::decode("Transfer", e))?;
    let Some(meta) = LogMeta::from_log(log) else {
        warn!(token = %log.address(), "Skipping pending Transfer log");
        return Ok(None);
    };
    let event = decoded.inner.data;
    Ok(Some(TransferEvent {
        token: log.address(),
        from: event.from,
        to: event.to,
        amount: event.tokens,
        block_number: meta.block_number,
        tx_hash: meta.tx_hash,
        log_index: meta.log_index,
    }))
}

pub fn decode_approval(log: &Log) -> Result<Option<ApprovalEvent>> {
    let decoded = log
        .log_decode::<ERC20Basic::Approval>()
        .map_err(|e| BindingError::decode("Approval", e))?;
    let Some(meta) = LogMeta::from_log(log) else {
        warn!(token = %log.address(), "Skipping pending Approval log");
        return Ok(None);
    };
    let event = decoded.inner.data;
    Ok(Some(ApprovalEvent {
        token: log.address(),
        owner: event.tokenOwner,
        spender: event.spender,
        amount: event.tokens,
        block_number: meta.block_number,
        tx_hash: meta.tx_hash,
        log_index: meta.log_index,
    }))
}

// ============================================================================
// Log Classification
// ============================================================================

/// Any event a v1 contract (ETH or ERC20 flavour) emits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockRedeemEvent {
    Lock(LockEvent),
    RedeemRequest(RedeemRequestEvent),
    ValidatorSignedRedeem(ValidatorSignedRedeemEvent),
    RedeemSuccessful(RedeemSuccessfulEvent),
    AddValidator(AddValidatorEvent),
    DeleteValidator(DeleteValidatorEvent),
    NewThreshold(NewThresholdEvent),
    NewEpoch(NewEpochEvent),
}

impl LockRedeemEvent {
    /// Classify by topic0; `Ok(None)` for foreign or pending logs
    pub fn from_log(log: &Log) -> Result<Option<Self>> {
        let Some(topic0) = log.topics().first().copied() else {
            return Ok(None);
        };

        let event = match topic0 {
            LockRedeem::Lock::SIGNATURE_HASH => {
                decode_record::<LockRedeem::Lock, LockEvent>(log)?.map(Self::Lock)
            }
            LockRedeem::RedeemRequest::SIGNATURE_HASH => {
                decode_record::<LockRedeem::RedeemRequest, RedeemRequestEvent>(log)?
                    .map(Self::RedeemRequest)
            }
            LockRedeem::ValidatorSignedRedeem::SIGNATURE_HASH => {
                decode_record::<LockRedeem::ValidatorSignedRedeem, ValidatorSignedRedeemEvent>(
                    log,
                )?
                .map(Self::ValidatorSignedRedeem)
            }
            LockRedeemERC::RedeemSuccessful::SIGNATURE_HASH => {
                decode_record::<LockRedeemERC::RedeemSuccessful, RedeemSuccessfulEvent>(log)?
                    .map(Self::RedeemSuccessful)
            }
            LockRedeem::AddValidator::SIGNATURE_HASH => {
                decode_record::<LockRedeem::AddValidator, AddValidatorEvent>(log)?
                    .map(Self::AddValidator)
            }
            LockRedeem::DeleteValidator::SIGNATURE_HASH => {
                decode_record::<LockRedeem::DeleteValidator, DeleteValidatorEvent>(log)?
                    .map(Self::DeleteValidator)
            }
            LockRedeem::NewThreshold::SIGNATURE_HASH => {
                decode_record::<LockRedeem::NewThreshold, NewThresholdEvent>(log)?
                    .map(Self::NewThreshold)
            }
            LockRedeem::NewEpoch::SIGNATURE_HASH => {
                decode_record::<LockRedeem::NewEpoch, NewEpochEvent>(log)?.map(Self::NewEpoch)
            }
            _ => None,
        };

        Ok(event)
    }
}

/// Any event a v2 / Kratos contract emits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockRedeemV2Event {
    Lock(LockEvent),
    RedeemRequest(RedeemRequestEvent),
    ValidatorSignedRedeem(ValidatorSignedRedeemEvent),
    AddValidator(AddValidatorEvent),
    ValidatorMigrated(ValidatorMigratedEvent),
}

impl LockRedeemV2Event {
    /// Classify by topic0; `Ok(None)` for foreign or pending logs
    pub fn from_log(log: &Log) -> Result<Option<Self>> {
        let Some(topic0) = log.topics().first().copied() else {
            return Ok(None);
        };

        let event = match topic0 {
            LockRedeemV2::Lock::SIGNATURE_HASH => {
                decode_record::<LockRedeemV2::Lock, LockEvent>(log)?.map(Self::Lock)
            }
            LockRedeemV2::RedeemRequest::SIGNATURE_HASH => {
                decode_record::<LockRedeemV2::RedeemRequest, RedeemRequestEvent>(log)?
                    .map(Self::RedeemRequest)
            }
            LockRedeemV2::ValidatorSignedRedeem::SIGNATURE_HASH => {
                decode_record::<LockRedeemV2::ValidatorSignedRedeem, ValidatorSignedRedeemEvent>(
                    log,
                )?
                .map(Self::ValidatorSignedRedeem)
            }
            LockRedeemV2::AddValidator::SIGNATURE_HASH => {
                decode_record::<LockRedeemV2::AddValidator, AddValidatorEvent>(log)?
                    .map(Self::AddValidator)
            }
            LockRedeemV2::ValidatorMigrated::SIGNATURE_HASH => {
                decode_record::<LockRedeemV2::ValidatorMigrated, ValidatorMigratedEvent>(log)?
                    .map(Self::ValidatorMigrated)
            }
            _ => None,
        };

        Ok(event)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy::primitives::{address, LogData};

    pub(crate) const BRIDGE: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

    pub(crate) fn mined_log(data: LogData, block: u64, index: u64) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: BRIDGE,
                data,
            },
            block_number: Some(block),
            transaction_hash: Some(B256::repeat_byte(block as u8)),
            log_index: Some(index),
            ..Default::default()
        }
    }

    #[test]
    fn test_v2_redeem_request_record() {
        let recipient = Address::repeat_byte(0xaa);
        let event = LockRedeemV2::RedeemRequest {
            recepient: recipient,
            amount_requested: U256::from(5_000u64),
            redeemFeeCharged: U256::from(21u64),
        };
        let log = mined_log(event.encode_log_data(), 12, 3);

        let record = decode_record::<LockRedeemV2::RedeemRequest, RedeemRequestEvent>(&log)
            .unwrap()
            .unwrap();
        assert_eq!(record.recipient, recipient);
        assert_eq!(record.amount_requested, U256::from(5_000u64));
        assert_eq!(record.redeem_fee_charged, Some(U256::from(21u64)));
        assert_eq!(record.block_number, 12);
        assert_eq!(record.log_index, 3);
    }

    #[test]
    fn test_pending_log_is_skipped() {
        let event = LockRedeem::Lock {
            sender: Address::repeat_byte(0x01),
            amount_received: U256::from(1u64),
        };
        let mut log = mined_log(event.encode_log_data(), 1, 0);
        log.block_number = None;

        let record = decode_record::<LockRedeem::Lock, LockEvent>(&log).unwrap();
        assert!(record.is_none());
    }

    #[test]
    fn test_wrong_event_is_decode_error() {
        let event = LockRedeem::NewEpoch {
            epochHeight: U256::from(100u64),
        };
        let log = mined_log(event.encode_log_data(), 1, 0);

        let err = decode_record::<LockRedeem::Lock, LockEvent>(&log).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BindingError>(),
            Some(BindingError::Decode { .. })
        ));
    }

    #[test]
    fn test_classify_v1_logs() {
        let validator = Address::repeat_byte(0x0c);
        let signed = LockRedeem::ValidatorSignedRedeem {
            recipient: Address::repeat_byte(0x0d),
            validator_addresss: validator,
            amount: U256::from(9u64),
        };
        let log = mined_log(signed.encode_log_data(), 7, 1);

        match LockRedeemEvent::from_log(&log).unwrap() {
            Some(LockRedeemEvent::ValidatorSignedRedeem(record)) => {
                assert_eq!(record.validator, validator);
                assert_eq!(record.gas_returned, None);
            }
            other => panic!("unexpected classification: {:?}", other),
        }

        let threshold = LockRedeem::NewThreshold {
            _prevThreshold: U256::from(2u64),
            _newThreshold: U256::from(3u64),
        };
        let log = mined_log(threshold.encode_log_data(), 8, 0);
        assert!(matches!(
            LockRedeemEvent::from_log(&log).unwrap(),
            Some(LockRedeemEvent::NewThreshold(NewThresholdEvent { new_threshold, .. }))
                if new_threshold == U256::from(3u64)
        ));
    }

    #[test]
    fn test_classify_ignores_foreign_topics() {
        let transfer = ERC20Basic::Transfer {
            from: Address::repeat_byte(0x01),
            to: Address::repeat_byte(0x02),
            tokens: U256::from(10u64),
        };
        let log = mined_log(transfer.encode_log_data(), 1, 0);

        assert!(LockRedeemEvent::from_log(&log).unwrap().is_none());
        assert!(LockRedeemV2Event::from_log(&log).unwrap().is_none());
    }

    #[test]
    fn test_v2_add_validator_differs_from_v1() {
        let event = LockRedeemV2::AddValidator {
            _address: Address::repeat_byte(0x05),
        };
        let log = mined_log(event.encode_log_data(), 2, 0);

        assert!(LockRedeemEvent::from_log(&log).unwrap().is_none());
        match LockRedeemV2Event::from_log(&log).unwrap() {
            Some(LockRedeemV2Event::AddValidator(record)) => assert_eq!(record.power, None),
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_decode_transfer_keeps_token_address() {
        let transfer = ERC20Basic::Transfer {
            from: Address::repeat_byte(0x01),
            to: Address::repeat_byte(0x02),
            tokens: U256::from(10u64),
        };
        let log = mined_log(transfer.encode_log_data(), 4, 2);

        let record = decode_transfer(&log).unwrap().unwrap();
        assert_eq!(record.token, BRIDGE);
        assert_eq!(record.to, Address::repeat_byte(0x02));
        assert_eq!(record.amount, U256::from(10u64));
    }
}
