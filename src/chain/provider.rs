//! HTTP JSON-RPC chain client

use super::ChainClient;
use crate::config::MarketConfig;
use crate::error::{TradeError, TradeResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::time::Duration;
use tracing::debug;

/// Single-endpoint HTTP provider for one market's chain
pub struct HttpChainClient {
    chain_id: u64,
    provider: Provider<Http>,
}

impl HttpChainClient {
    /// Create a client for an RPC URL, polling receipts at `poll_interval`
    pub fn new(rpc_url: &str, chain_id: u64, poll_interval: Duration) -> TradeResult<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| TradeError::Config(format!("Invalid RPC URL {}: {}", rpc_url, e)))?
            .interval(poll_interval);

        debug!("Added HTTP provider for chain {}: {}", chain_id, rpc_url);

        Ok(Self { chain_id, provider })
    }

    /// Create a client from a market configuration
    pub fn from_config(config: &MarketConfig) -> TradeResult<Self> {
        Self::new(
            &config.rpc_url,
            config.chain_id,
            Duration::from_millis(config.receipt_poll_interval_ms),
        )
    }

    /// Get the underlying HTTP provider
    pub fn http(&self) -> &Provider<Http> {
        &self.provider
    }

    /// Get chain ID
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn get_transaction_count(&self, address: Address) -> TradeResult<U256> {
        self.provider
            .get_transaction_count(address, None)
            .await
            .map_err(|e| TradeError::rpc("get_transaction_count", e))
    }

    async fn get_gas_price(&self) -> TradeResult<U256> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| TradeError::rpc("get_gas_price", e))
    }

    async fn call(&self, tx: &TypedTransaction) -> TradeResult<Bytes> {
        self.provider
            .call(tx, None)
            .await
            .map_err(|e| TradeError::rpc("eth_call", e))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> TradeResult<H256> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| TradeError::Transaction(e.to_string()))?;

        let tx_hash = pending.tx_hash();
        debug!("Broadcast tx {:?} on chain {}", tx_hash, self.chain_id);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> TradeResult<TransactionReceipt> {
        let receipt = PendingTransaction::new(tx_hash, &self.provider)
            .await
            .map_err(|e| TradeError::rpc("wait_for_receipt", e))?;

        receipt.ok_or(TradeError::ReceiptUnavailable { tx_hash })
    }
}
