//! Contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for every contract
//! the OneLedger Ethereum bridge ships: the test token, the v1 and v2
//! lock/redeem contracts (plus their ERC20, Kratos and migration-target
//! variants) and the test-gas contract.
//!
//! Parameter names follow the deployed ABIs verbatim (including their typos,
//! e.g. `recepient`), so generated field names line up with the JSON ABI in
//! `artifacts/`.
//!
//! The payable fallbacks of `LockRedeemV2`, `LockRedeemKratos` and
//! `LockRedeemFuture` are not part of the typed interface; send plain value
//! with [`crate::raw::RawContract::transfer`].

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    // ========================================================================
    // Test token
    // ========================================================================

    /// ERC20Basic test token ("TTC", 18 decimals)
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract ERC20Basic {
        constructor(uint256 total);

        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address tokenOwner) external view returns (uint256);
        function allowance(address owner, address delegate) external view returns (uint256);
        function approve(address delegate, uint256 numTokens) external returns (bool);
        function transfer(address receiver, uint256 numTokens) external returns (bool);
        function transferFrom(address owner, address buyer, uint256 numTokens) external returns (bool);

        event Approval(address indexed tokenOwner, address indexed spender, uint256 tokens);
        event Transfer(address indexed from, address indexed to, uint256 tokens);
    }

    /// Standard ERC20 interface (OpenZeppelin naming)
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract IERC20 {
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address recipient, uint256 amount) external returns (bool);
        function transferFrom(address sender, address recipient, uint256 amount) external returns (bool);
        function increaseAllowance(address spender, uint256 addedValue) external returns (bool);
        function decreaseAllowance(address spender, uint256 subtractedValue) external returns (bool);

        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);
    }

    // ========================================================================
    // LockRedeem (v1)
    // ========================================================================

    /// v1 ETH lock/redeem contract with on-chain validator governance
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract LockRedeem {
        constructor(address[] initialValidators);

        // Lock / redeem

        /// Lock ether; the amount is the transaction value
        function lock() external payable;

        /// User requests to redeem `amount_` wei
        function redeem(uint256 amount_) external;

        /// Validator signs a pending redeem for `recipient_`
        function sign(uint256 amount_, address recipient_) external;

        // Governance

        function proposeAddValidator(address v) external;

        /// Declared `view` in the deployed ABI
        function proposeRemoveValidator(address v) external view;

        function proposeNewThreshold(uint256 threshold) external;

        function addValidatorProposals(address) external view returns (uint256 voteCount);
        function removeValidatorProposals(address) external view returns (uint256 voteCount);
        function newThresholdProposals(uint256) external view returns (uint256 voteCount);

        // Views

        function isValidator(address addr) external view returns (bool);
        function validators(address) external view returns (int256);
        function numValidators() external view returns (uint256);
        function votingThreshold() external view returns (uint256);
        function epochBlockHeight() external view returns (uint256);
        function getTotalEthBalance() external view returns (uint256);
        function getOLTEthAddress() external view returns (address);

        // Events

        event AddValidator(address indexed _address, int256 _power);
        event DeleteValidator(address indexed _address);
        event NewEpoch(uint256 epochHeight);
        event NewThreshold(uint256 _prevThreshold, uint256 _newThreshold);
        event Lock(address sender, uint256 amount_received);
        event RedeemRequest(address indexed recepient, uint256 amount_requested);
        event ValidatorSignedRedeem(address indexed recipient, address validator_addresss, uint256 amount);
    }

    /// ERC20 flavour of the v1 contract (single-contract deployment)
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract LockRedeemERC {
        constructor(address[] initialValidators);

        function redeem(uint256 amount_, address tokenAddress_) external;
        function sign(uint256 amount_, address recipient_) external;
        function executeredeem(address tokenAddress_) external;

        function proposeAddValidator(address v) external;
        function proposeRemoveValidator(address v) external view;
        function proposeNewThreshold(uint256 threshold) external;

        function addValidatorProposals(address) external view returns (uint256 voteCount);
        function removeValidatorProposals(address) external view returns (uint256 voteCount);
        function newThresholdProposals(uint256) external view returns (uint256 voteCount);

        function isValidator(address addr) external view returns (bool);
        function validators(address) external view returns (int256);
        function numValidators() external view returns (uint256);
        function votingThreshold() external view returns (uint256);
        function epochBlockHeight() external view returns (uint256);
        function getOLTErcAddress() external view returns (address);
        function getTotalErcBalance(address tokenAddress_) external view returns (uint256);
        function hasValidatorSigned(address recipient_) external view returns (bool);
        function verifyRedeem(address recipient_) external view returns (bool);

        event AddValidator(address indexed _address, int256 _power);
        event DeleteValidator(address indexed _address);
        event NewEpoch(uint256 epochHeight);
        event NewThreshold(uint256 _prevThreshold, uint256 _newThreshold);
        event RedeemRequest(address indexed recepient, uint256 amount_requested);
        event RedeemSuccessful(address indexed recepient, uint256 amount_trafered);
        event ValidatorSignedRedeem(address indexed recipient, address validator_addresss, uint256 amount);
    }

    // ========================================================================
    // LockRedeem (v2)
    // ========================================================================

    /// v2 lock/redeem contract: redeem fee, lock period, migration handshake
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract LockRedeemV2 {
        constructor(uint256 _lock_period, address _old_contract, uint256 noofValidatorsinold);

        // Lock / redeem

        function lock() external payable;

        /// Redeem request; the transaction value pays the redeem fee
        function redeem(uint256 amount_) external payable;

        function sign(uint256 amount_, address recipient_) external;

        /// Validator withdraws the gas refunds collected from redeem fees
        function collectUserFee() external;

        // Migration

        /// Validator votes to move the balance to `newSmartContractAddress`
        function migrate(address newSmartContractAddress) external;

        /// Called by the old contract on its successor
        function MigrateFromOld() external;

        function migrationSignatures() external view returns (uint256);
        function migrationSigners(address) external view returns (bool);
        function getMigrationCount() external view returns (uint256);

        // Views

        function isValidator(address addr) external view returns (bool);
        function verifyValidator() external view returns (bool);
        function validators(address) external view returns (uint8);
        function numValidators() external view returns (uint256);
        function getTotalEthBalance() external view returns (uint256);
        function getOLTEthAddress() external view returns (address);
        function getRedeemBalance(address recipient_) external view returns (uint256);
        function getSignatureCount(address recipient_) external view returns (uint256);
        function hasValidatorSigned(address recipient_) external view returns (bool);
        function isredeemAvailable(address recepient_) external view returns (bool);
        function verifyRedeem(address recipient_) external view returns (int8);

        // Events

        event AddValidator(address indexed _address);
        event Lock(address sender, uint256 amount_received);
        event RedeemRequest(address indexed recepient, uint256 amount_requested, uint256 redeemFeeCharged);
        event ValidatorMigrated(address validator, address NewSmartContractAddress);
        event ValidatorSignedRedeem(address indexed recipient, address validator_addresss, uint256 amount, uint256 gasReturned);
    }

    /// Kratos deployment of v2: seeded with its own validator set
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract LockRedeemKratos {
        constructor(address[] initialValidators, uint256 _lock_period, address _old_contract, uint256 noofValidatorsinold);

        function lock() external payable;
        function redeem(uint256 amount_) external payable;
        function sign(uint256 amount_, address recipient_) external;
        function collectUserFee() external;

        function migrate(address newSmartContractAddress) external;
        function MigrateFromOld() external;
        function migrationSignatures() external view returns (uint256);
        function migrationSigners(address) external view returns (bool);

        function ActiveStatus() external view returns (bool);
        function isValidator(address addr) external view returns (bool);
        function validators(address) external view returns (uint8);
        function numValidators() external view returns (uint256);
        function getTotalEthBalance() external view returns (uint256);
        function getOLTEthAddress() external view returns (address);
        function getRedeemBalance(address recipient_) external view returns (uint256);
        function getSignatureCount(address recipient_) external view returns (uint256);
        function hasValidatorSigned(address recipient_) external view returns (bool);
        function isredeemAvailable(address recepient_) external view returns (bool);
        function verifyRedeem(address recipient_) external view returns (int8);

        event AddValidator(address indexed _address);
        event Lock(address sender, uint256 amount_received);
        event RedeemRequest(address indexed recepient, uint256 amount_requested, uint256 redeemFeeCharged);
        event ValidatorMigrated(address validator, address NewSmartContractAddress);
        event ValidatorSignedRedeem(address indexed recipient, address validator_addresss, uint256 amount, uint256 gasReturned);
    }

    /// Minimal successor used to exercise the migration handshake
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract LockRedeemFuture {
        constructor(address _old_contract, uint256 noofValidatorsinold);

        function MigrateFromOld() external;
        function getMigrationCount() external view returns (uint256);
        function getTotalEthBalance() external view returns (uint256);
        function isActive() external view returns (bool);
        function numValidators() external view returns (uint256);
        function validators(address) external view returns (uint256);
    }

    // ========================================================================
    // Test gas
    // ========================================================================

    /// Gas measurement contract for the validator `sign` path
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract TestRedeemGas {
        constructor(address[] initialValidators);

        function isValidator(address addr) external view returns (bool);
        function sign() external;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Address, U256};
    use alloy::sol_types::{SolCall, SolConstructor, SolEvent};

    #[test]
    fn test_lock_redeem_selectors() {
        assert_eq!(hex::encode(LockRedeem::lockCall::SELECTOR), "f83d08ba");
        assert_eq!(hex::encode(LockRedeem::redeemCall::SELECTOR), "db006a75");
        assert_eq!(hex::encode(LockRedeem::signCall::SELECTOR), "7cacde3f");
        assert_eq!(hex::encode(LockRedeem::isValidatorCall::SELECTOR), "facd743b");
    }

    #[test]
    fn test_v2_selectors() {
        assert_eq!(hex::encode(LockRedeemV2::MigrateFromOldCall::SELECTOR), "587ab37e");
        assert_eq!(hex::encode(LockRedeemV2::collectUserFeeCall::SELECTOR), "7edd7ccd");
        assert_eq!(hex::encode(LockRedeemV2::migrateCall::SELECTOR), "ce5494bb");
        assert_eq!(hex::encode(LockRedeemV2::verifyRedeemCall::SELECTOR), "91e39868");
        assert_eq!(hex::encode(LockRedeemV2::isredeemAvailableCall::SELECTOR), "2138c6b9");
        assert_eq!(hex::encode(LockRedeemV2::getSignatureCountCall::SELECTOR), "6c7d13df");
    }

    #[test]
    fn test_token_selectors() {
        assert_eq!(hex::encode(ERC20Basic::transferCall::SELECTOR), "a9059cbb");
        assert_eq!(hex::encode(ERC20Basic::approveCall::SELECTOR), "095ea7b3");
        assert_eq!(hex::encode(ERC20Basic::transferFromCall::SELECTOR), "23b872dd");
        assert_eq!(hex::encode(ERC20Basic::decimalsCall::SELECTOR), "313ce567");
        // Parameter names differ, the wire format does not
        assert_eq!(IERC20::transferCall::SELECTOR, ERC20Basic::transferCall::SELECTOR);
    }

    #[test]
    fn test_event_topics() {
        assert_eq!(
            hex::encode(ERC20Basic::Transfer::SIGNATURE_HASH),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert_eq!(
            hex::encode(ERC20Basic::Approval::SIGNATURE_HASH),
            "8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925"
        );
        assert_eq!(
            hex::encode(LockRedeem::Lock::SIGNATURE_HASH),
            "625fed9875dada8643f2418b838ae0bc78d9a148a18eee4ee1979ff0f3f5d427"
        );
        assert_eq!(
            hex::encode(LockRedeem::RedeemRequest::SIGNATURE_HASH),
            "222dc200773fe9b45015bf792e8fee37d651e3590c215806a5042404b6d741d2"
        );
        assert_eq!(
            hex::encode(LockRedeemV2::RedeemRequest::SIGNATURE_HASH),
            "eee07ebdabc7ab1dc20be39b715e23aa8a85c6a8ae3c16f8334dace8d76683dc"
        );
        assert_eq!(
            hex::encode(LockRedeem::AddValidator::SIGNATURE_HASH),
            "b2076c69a79e1dfb01d613dcc63b7c42ae1962daf11d4f2151352135133f824b"
        );
        assert_eq!(
            hex::encode(LockRedeemV2::AddValidator::SIGNATURE_HASH),
            "6a7a7b9e5967ba1cf76c3d7d5a9b98e96f11754855b04564fada97b94741ad36"
        );
        assert_eq!(
            hex::encode(LockRedeemV2::ValidatorSignedRedeem::SIGNATURE_HASH),
            "975a8b0f36f1204c7939f566cea0503ea32284a2768a7f98ede91960b6d15830"
        );
        assert_eq!(
            hex::encode(LockRedeemV2::ValidatorMigrated::SIGNATURE_HASH),
            "077478953a7559f9e01b2ceeb429ce87333fb7fc0ec16eb5eb9128463e30fa92"
        );
        assert_eq!(
            hex::encode(LockRedeemERC::RedeemSuccessful::SIGNATURE_HASH),
            "80cfc930fa1029f5fdb639588b474e55c8051b1a9b635f90fe3af3508cfd8ad1"
        );
    }

    #[test]
    fn test_kratos_shares_v2_wire_format() {
        assert_eq!(
            LockRedeemKratos::RedeemRequest::SIGNATURE_HASH,
            LockRedeemV2::RedeemRequest::SIGNATURE_HASH
        );
        assert_eq!(LockRedeemKratos::signCall::SELECTOR, LockRedeemV2::signCall::SELECTOR);
    }

    #[test]
    fn test_sign_call_decodes() {
        let recipient = address!("EF66117e2014cEb509A039b5ADeBed7012332935");
        let call = LockRedeem::signCall {
            amount_: U256::from(1_000_000_000u64),
            recipient_: recipient,
        };
        let data = call.abi_encode();
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(hex::encode(&data[..4]), "7cacde3f");

        let decoded = LockRedeem::signCall::abi_decode(&data, true).unwrap();
        assert_eq!(decoded.amount_, U256::from(1_000_000_000u64));
        assert_eq!(decoded.recipient_, recipient);
    }

    #[test]
    fn test_constructor_encoding() {
        let validators = vec![Address::repeat_byte(0x11), Address::repeat_byte(0x22)];
        let encoded = TestRedeemGas::constructorCall {
            initialValidators: validators,
        }
        .abi_encode();

        // offset + length + two words
        assert_eq!(encoded.len(), 32 * 4);
        assert_eq!(U256::from_be_slice(&encoded[..32]), U256::from(32));
        assert_eq!(U256::from_be_slice(&encoded[32..64]), U256::from(2));
        assert_eq!(&encoded[76..96], Address::repeat_byte(0x11).as_slice());
    }
}
