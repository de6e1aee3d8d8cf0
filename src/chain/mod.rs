//! Chain module - JSON-RPC access for nonce, gas price, broadcast and receipts
//!
//! Everything the position operations need from the node goes through the
//! [`ChainClient`] trait, so the submission pipeline can run against mocks.

pub mod provider;

pub use provider::HttpChainClient;

use crate::error::TradeResult;

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};

/// Read and broadcast surface of a chain RPC endpoint
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current transaction count (next nonce) of an account
    async fn get_transaction_count(&self, address: Address) -> TradeResult<U256>;

    /// Current network gas price
    async fn get_gas_price(&self) -> TradeResult<U256>;

    /// Execute a read-only call against the latest block
    async fn call(&self, tx: &TypedTransaction) -> TradeResult<Bytes>;

    /// Broadcast a signed, RLP-encoded transaction
    async fn send_raw_transaction(&self, raw: Bytes) -> TradeResult<H256>;

    /// Block until the transaction is mined and return its receipt
    async fn wait_for_receipt(&self, tx_hash: H256) -> TradeResult<TransactionReceipt>;
}
