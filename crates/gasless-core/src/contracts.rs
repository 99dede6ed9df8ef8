//! Solidity bindings for every contract the panels talk to.

use alloy::sol;

sol! {
    /// ERC-2612 permit message.
    #[derive(Debug, PartialEq, Eq)]
    struct Permit {
        address owner;
        address spender;
        uint256 value;
        uint256 nonce;
        uint256 deadline;
    }

    /// Message signed for a contract-native (`executeMetaTransaction`) relay.
    #[derive(Debug, PartialEq, Eq)]
    struct MetaTransaction {
        uint256 nonce;
        address from;
        bytes functionSignature;
    }

    /// EIP-2771 trusted forwarder request.
    #[derive(Debug, PartialEq, Eq)]
    struct ForwardRequest {
        address from;
        address to;
        uint256 value;
        uint256 gas;
        uint256 nonce;
        bytes data;
    }

    interface IERC20Permit {
        function name() external view returns (string memory);
        function nonces(address owner) external view returns (uint256);
    }

    interface IDepositVault {
        function depositWithPermit(
            uint256 amount,
            address receiver,
            uint256 deadline,
            uint8 v,
            bytes32 r,
            bytes32 s
        ) external returns (uint256);
        function getNonce(address user) external view returns (uint256);
        function executeMetaTransaction(
            address userAddress,
            bytes functionSignature,
            bytes32 sigR,
            bytes32 sigS,
            uint8 sigV
        ) external payable returns (bytes memory);
    }

    interface IForwarder {
        function getNonce(address from) external view returns (uint256);
        function execute(ForwardRequest req, bytes signature) external payable returns (bool, bytes memory);
        function executePersonalSign(ForwardRequest req, bytes signature) external payable returns (bool, bytes memory);
    }

    interface ISmartAccount {
        function executeCall(address dest, uint256 value, bytes func) external;
    }

    interface ISmartAccountFactory {
        function getAddressForCounterFactualAccount(address owner, uint256 index) external view returns (address);
        function deployCounterFactualAccount(address owner, uint256 index) external returns (address);
    }

    interface IEntryPoint {
        function getNonce(address sender, uint192 key) external view returns (uint256);
    }
}
