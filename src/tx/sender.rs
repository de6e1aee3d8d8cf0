//! Transaction sender: envelope assembly, signing, broadcast and receipt wait
//!
//! Every contract call goes through the same pipeline: read nonce, read gas
//! price, attach the envelope, sign, broadcast, wait for the receipt. There is
//! no retry and no local nonce tracking; concurrent calls for one wallet can
//! collide on the nonce.

use crate::chain::ChainClient;
use crate::config::MarketConfig;
use crate::error::{TradeError, TradeResult};

use ethers::prelude::*;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use tracing::debug;

/// One encoded contract method call
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    /// Native value attached to the call, in wei
    pub value: U256,
}

/// A broadcast transaction together with its mined receipt
#[derive(Debug, Clone)]
pub struct SubmittedTransaction {
    pub tx_hash: H256,
    pub receipt: TransactionReceipt,
}

/// Signs and submits legacy (gasPrice) transactions for one wallet
pub struct TransactionSender<C> {
    client: Arc<C>,
    wallet: LocalWallet,
    gas_limit: U256,
    chain_id: u64,
}

impl<C: ChainClient> TransactionSender<C> {
    /// Create a new transaction sender
    pub fn new(client: Arc<C>, wallet: LocalWallet, gas_limit: u64, chain_id: u64) -> Self {
        Self {
            client,
            wallet: wallet.with_chain_id(chain_id),
            gas_limit: U256::from(gas_limit),
            chain_id,
        }
    }

    /// Create a sender from a market configuration.
    ///
    /// The private key must belong to the configured wallet address.
    pub fn from_config(client: Arc<C>, config: &MarketConfig) -> TradeResult<Self> {
        let wallet = config
            .private_key
            .parse::<LocalWallet>()
            .map_err(|e| TradeError::Wallet(format!("Invalid private key: {}", e)))?;

        let configured = config.wallet_address()?;
        if wallet.address() != configured {
            return Err(TradeError::Wallet(format!(
                "Private key belongs to {:?}, not configured wallet {:?}",
                wallet.address(),
                configured
            )));
        }

        Ok(Self::new(client, wallet, config.gas_limit, config.chain_id))
    }

    /// Build the unsigned envelope for a call
    pub fn build_transaction(
        &self,
        call: &ContractCall,
        nonce: U256,
        gas_price: U256,
    ) -> TypedTransaction {
        let tx = TransactionRequest::new()
            .from(self.wallet.address())
            .to(call.to)
            .data(call.data.clone())
            .nonce(nonce)
            .gas(self.gas_limit)
            .gas_price(gas_price)
            .value(call.value)
            .chain_id(self.chain_id);

        TypedTransaction::Legacy(tx)
    }

    /// Sign, broadcast and wait for a call to be mined
    pub async fn submit(&self, call: ContractCall) -> TradeResult<SubmittedTransaction> {
        let nonce = self
            .client
            .get_transaction_count(self.wallet.address())
            .await?;
        let gas_price = self.client.get_gas_price().await?;

        let tx = self.build_transaction(&call, nonce, gas_price);
        debug!(
            "Built tx to {:?} (nonce {}, gas price {}, value {}) on chain {}",
            call.to, nonce, gas_price, call.value, self.chain_id
        );

        // Sign transaction
        let signature = self
            .wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| TradeError::Wallet(format!("Failed to sign transaction: {}", e)))?;
        let raw = tx.rlp_signed(&signature);

        let tx_hash = self.client.send_raw_transaction(raw).await?;
        let receipt = self.client.wait_for_receipt(tx_hash).await?;

        debug!(
            "Tx {:?} mined in block {:?} with status {:?}",
            tx_hash, receipt.block_number, receipt.status
        );

        Ok(SubmittedTransaction { tx_hash, receipt })
    }

    /// Get wallet address
    pub fn wallet_address(&self) -> Address {
        self.wallet.address()
    }

    /// Chain ID stamped on every envelope
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Get the chain client
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chain::MockChainClient;
    use crate::config::tests::{test_market, TEST_MARKET, TEST_WALLET};
    use ethers::utils::rlp::Rlp;

    pub fn mined_receipt(tx_hash: H256, status: u64) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: tx_hash,
            block_number: Some(U64::from(42)),
            status: Some(U64::from(status)),
            ..Default::default()
        }
    }

    fn decode_signed(raw: &Bytes) -> (TypedTransaction, Signature) {
        TypedTransaction::decode_signed(&Rlp::new(raw.as_ref())).unwrap()
    }

    fn sample_call() -> ContractCall {
        ContractCall {
            to: TEST_MARKET.parse().unwrap(),
            data: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
            value: U256::from(300_000_000_000_000u64),
        }
    }

    #[test]
    fn test_from_config_rejects_foreign_key() {
        let mut config = test_market();
        config.wallet = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string();

        let result = TransactionSender::from_config(Arc::new(MockChainClient::new()), &config);
        assert!(matches!(result, Err(TradeError::Wallet(_))));
    }

    #[test]
    fn test_from_config_rejects_malformed_key() {
        let mut config = test_market();
        config.private_key = "0x1234".to_string();

        let result = TransactionSender::from_config(Arc::new(MockChainClient::new()), &config);
        assert!(matches!(result, Err(TradeError::Wallet(_))));
    }

    #[test]
    fn test_build_transaction_envelope() {
        let sender =
            TransactionSender::from_config(Arc::new(MockChainClient::new()), &test_market())
                .unwrap();
        let call = sample_call();

        let tx = sender.build_transaction(&call, U256::from(7), U256::from(5_000_000_000u64));

        assert_eq!(tx.from(), Some(&TEST_WALLET.parse::<Address>().unwrap()));
        assert_eq!(tx.to_addr(), Some(&call.to));
        assert_eq!(tx.nonce(), Some(&U256::from(7)));
        assert_eq!(tx.gas(), Some(&U256::from(3_000_000u64)));
        assert_eq!(tx.gas_price(), Some(U256::from(5_000_000_000u64)));
        assert_eq!(tx.value(), Some(&call.value));
        assert_eq!(tx.chain_id(), Some(U64::from(56)));
        assert_eq!(tx.data(), Some(&call.data));
    }

    #[tokio::test]
    async fn test_submit_signs_with_current_nonce() {
        let wallet: Address = TEST_WALLET.parse().unwrap();
        let tx_hash = H256::repeat_byte(0xab);

        let mut client = MockChainClient::new();
        client
            .expect_get_transaction_count()
            .withf(move |address| *address == wallet)
            .times(1)
            .returning(|_| Ok(U256::from(11)));
        client
            .expect_get_gas_price()
            .times(1)
            .returning(|| Ok(U256::from(3_000_000_000u64)));
        client
            .expect_send_raw_transaction()
            .times(1)
            .withf(move |raw| {
                let (tx, signature) = decode_signed(raw);
                tx.nonce() == Some(&U256::from(11))
                    && tx.value() == Some(&U256::from(300_000_000_000_000u64))
                    && tx.chain_id() == Some(U64::from(56))
                    && tx.gas_price() == Some(U256::from(3_000_000_000u64))
                    && signature.recover(tx.sighash()).ok() == Some(wallet)
            })
            .returning(move |_| Ok(tx_hash));
        client
            .expect_wait_for_receipt()
            .withf(move |hash| *hash == tx_hash)
            .times(1)
            .returning(|hash| Ok(mined_receipt(hash, 1)));

        let sender = TransactionSender::from_config(Arc::new(client), &test_market()).unwrap();
        let submitted = sender.submit(sample_call()).await.unwrap();

        assert_eq!(submitted.tx_hash, tx_hash);
        assert_eq!(submitted.receipt.status, Some(U64::from(1)));
    }

    #[tokio::test]
    async fn test_envelope_follows_market_config() {
        let wallet: Address = TEST_WALLET.parse().unwrap();
        let mut config = test_market();
        config.chain_id = 204;
        config.gas_limit = 1_500_000;
        let fee = U256::from(30_000_000_000_000u64);

        let mut client = MockChainClient::new();
        client
            .expect_get_transaction_count()
            .times(1)
            .returning(|_| Ok(U256::from(128)));
        client
            .expect_get_gas_price()
            .times(1)
            .returning(|| Ok(U256::from(1_000_000u64)));
        client
            .expect_send_raw_transaction()
            .times(1)
            .withf(move |raw| {
                let (tx, signature) = decode_signed(raw);
                tx.nonce() == Some(&U256::from(128))
                    && tx.value() == Some(&fee)
                    && tx.chain_id() == Some(U64::from(204))
                    && tx.gas() == Some(&U256::from(1_500_000u64))
                    && signature.recover(tx.sighash()).ok() == Some(wallet)
            })
            .returning(|_| Ok(H256::repeat_byte(0xcc)));
        client
            .expect_wait_for_receipt()
            .times(1)
            .returning(|hash| Ok(mined_receipt(hash, 1)));

        let sender = TransactionSender::from_config(Arc::new(client), &config).unwrap();
        assert_eq!(sender.chain_id(), 204);

        let call = ContractCall {
            value: fee,
            ..sample_call()
        };
        sender.submit(call).await.unwrap();
    }

    #[tokio::test]
    async fn test_broadcast_failure_is_not_retried() {
        let mut client = MockChainClient::new();
        client
            .expect_get_transaction_count()
            .times(1)
            .returning(|_| Ok(U256::zero()));
        client
            .expect_get_gas_price()
            .times(1)
            .returning(|| Ok(U256::from(1_000_000_000u64)));
        client
            .expect_send_raw_transaction()
            .times(1)
            .returning(|_| Err(TradeError::Transaction("insufficient funds".to_string())));
        client.expect_wait_for_receipt().never();

        let sender = TransactionSender::from_config(Arc::new(client), &test_market()).unwrap();
        let err = sender.submit(sample_call()).await.unwrap_err();

        assert!(matches!(err, TradeError::Transaction(_)));
    }
}
