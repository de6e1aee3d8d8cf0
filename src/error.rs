//! Error types for the KiloEx trader

use ethers::types::H256;
use thiserror::Error;

/// Main error type for position operations
#[derive(Error, Debug)]
pub enum TradeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("RPC error during {operation}: {message}")]
    Rpc { operation: String, message: String },

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("No receipt for transaction {tx_hash:?}: dropped from mempool")]
    ReceiptUnavailable { tx_hash: H256 },

    #[error("Allowance approval failed: {0}")]
    Approval(String),

    #[error("Transaction {tx_hash:?} reverted")]
    Reverted { tx_hash: H256 },
}

impl TradeError {
    /// Build an RPC error for the named operation
    pub fn rpc(operation: &str, err: impl std::fmt::Display) -> Self {
        TradeError::Rpc {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<ethers::abi::AbiError> for TradeError {
    fn from(err: ethers::abi::AbiError) -> Self {
        TradeError::Abi(err.to_string())
    }
}

/// Result type for trade operations
pub type TradeResult<T> = Result<T, TradeError>;
