//! Collateral allowance approval run before opening a position

use crate::chain::ChainClient;
use crate::error::{TradeError, TradeResult};
use crate::tx::{ContractCall, FixedPointBase, TransactionSender};

use async_trait::async_trait;
use ethers::abi::parse_abi;
use ethers::contract::BaseContract;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// Authorizes a spender to pull at least `margin` of collateral
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AllowanceApprover: Send + Sync {
    /// Returns once the allowance covers `margin`, approving and waiting for
    /// the approval to be mined when it does not
    async fn ensure_allowance(&self, spender: Address, margin: Decimal) -> TradeResult<()>;
}

/// ERC-20 (USDT) approver sharing the position wallet's sender
pub struct Erc20Approver<C> {
    sender: Arc<TransactionSender<C>>,
    token: Address,
    erc20: BaseContract,
    collateral: FixedPointBase,
}

impl<C: ChainClient> Erc20Approver<C> {
    pub fn new(
        sender: Arc<TransactionSender<C>>,
        token: Address,
        collateral: FixedPointBase,
    ) -> TradeResult<Self> {
        let abi = parse_abi(&[
            "function allowance(address owner, address spender) external view returns (uint256)",
            "function approve(address spender, uint256 amount) external returns (bool)",
        ])
        .map_err(|e| TradeError::Abi(format!("Invalid ERC-20 ABI: {}", e)))?;

        Ok(Self {
            sender,
            token,
            erc20: BaseContract::from(abi),
            collateral,
        })
    }

    /// Current allowance granted by the wallet to `spender`
    pub async fn allowance(&self, spender: Address) -> TradeResult<U256> {
        let owner = self.sender.wallet_address();
        let data = self.erc20.encode("allowance", (owner, spender))?;
        let tx: TypedTransaction = TransactionRequest::new()
            .from(owner)
            .to(self.token)
            .data(data)
            .into();

        let output = self.sender.client().call(&tx).await?;
        Ok(self.erc20.decode_output("allowance", output)?)
    }

    async fn approve(&self, spender: Address, amount: U256) -> TradeResult<()> {
        let current = self.allowance(spender).await?;
        if current >= amount {
            debug!(
                "Allowance {} for {:?} already covers {}",
                current, spender, amount
            );
            return Ok(());
        }

        info!(
            "Approving {} collateral units for {:?} (current allowance {})",
            amount, spender, current
        );

        let data = self.erc20.encode("approve", (spender, amount))?;
        let submitted = self
            .sender
            .submit(ContractCall {
                to: self.token,
                data,
                value: U256::zero(),
            })
            .await?;

        if submitted.receipt.status != Some(U64::from(1)) {
            return Err(TradeError::Approval(format!(
                "approve tx {:?} reverted",
                submitted.tx_hash
            )));
        }

        crate::metrics::record_approval_submitted(self.sender.chain_id());
        info!("Approval tx {:?} mined", submitted.tx_hash);
        Ok(())
    }
}

#[async_trait]
impl<C: ChainClient> AllowanceApprover for Erc20Approver<C> {
    async fn ensure_allowance(&self, spender: Address, margin: Decimal) -> TradeResult<()> {
        let amount = self.collateral.scale(margin)?;

        self.approve(spender, amount).await.map_err(|e| match e {
            TradeError::Approval(_) => e,
            other => TradeError::Approval(other.to_string()),
        })
    }
}
