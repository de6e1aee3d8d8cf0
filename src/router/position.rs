//! Market increase / decrease position requests against the PositionRouter

use super::abi::{DecreasePositionArgs, IncreasePositionArgs, PositionRouterAbi};
use super::allowance::{AllowanceApprover, Erc20Approver};
use crate::chain::{ChainClient, HttpChainClient};
use crate::config::MarketConfig;
use crate::error::{TradeError, TradeResult};
use crate::metrics;
use crate::tx::{ContractCall, FixedPointBase, SubmittedTransaction, TransactionSender};

use ethers::types::{Address, Bytes, H256, U256, U64};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Opaque 32-byte referral code passed to `createIncreasePosition`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferralCode([u8; 32]);

impl ReferralCode {
    pub fn as_h256(&self) -> H256 {
        H256::from(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl FromStr for ReferralCode {
    type Err = TradeError;

    /// Accepts an empty string (zero code), `0x`-prefixed hex, or text; both
    /// hex and text are left-aligned and zero-padded to 32 bytes
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = match s.strip_prefix("0x") {
            Some(hex_str) => hex::decode(hex_str).map_err(|e| {
                TradeError::InvalidInput(format!("Invalid referral code hex {:?}: {}", s, e))
            })?,
            None => s.as_bytes().to_vec(),
        };

        if bytes.len() > 32 {
            return Err(TradeError::InvalidInput(format!(
                "Referral code is {} bytes, at most 32 allowed",
                bytes.len()
            )));
        }

        let mut code = [0u8; 32];
        code[..bytes.len()].copy_from_slice(&bytes);
        Ok(Self(code))
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Request to open or increase a position at market
#[derive(Debug, Clone)]
pub struct OpenPositionRequest {
    pub product_id: u64,
    pub margin: Decimal,
    pub leverage: Decimal,
    pub is_long: bool,
    /// Slippage bound: worst execution price the contract may accept
    pub acceptable_price: Decimal,
    pub referral_code: ReferralCode,
}

impl OpenPositionRequest {
    /// Client-side sanity checks; leverage bounds are left to the contract
    pub fn validate(&self) -> TradeResult<()> {
        validate_common(self.product_id, self.margin, self.acceptable_price)?;
        require_positive("leverage", self.leverage)
    }
}

/// Request to decrease or close a position at market
#[derive(Debug, Clone)]
pub struct ClosePositionRequest {
    pub product_id: u64,
    pub margin: Decimal,
    pub is_long: bool,
    pub acceptable_price: Decimal,
}

impl ClosePositionRequest {
    pub fn validate(&self) -> TradeResult<()> {
        validate_common(self.product_id, self.margin, self.acceptable_price)
    }
}

fn validate_common(product_id: u64, margin: Decimal, acceptable_price: Decimal) -> TradeResult<()> {
    if product_id == 0 {
        return Err(TradeError::InvalidInput("product id must be positive".to_string()));
    }
    require_positive("margin", margin)?;
    require_positive("acceptable price", acceptable_price)
}

fn require_positive(field: &str, value: Decimal) -> TradeResult<()> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(TradeError::InvalidInput(format!(
            "{} must be positive, got {}",
            field, value
        )))
    }
}

/// Mined status reported by the receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
    /// Receipt carried no status field
    Unknown,
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiptStatus::Success => write!(f, "1"),
            ReceiptStatus::Reverted => write!(f, "0"),
            ReceiptStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Outcome of a mined position request.
///
/// A reverted transaction is still returned as `Ok`; callers needing strict
/// success detection call [`PositionReceipt::ensure_success`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionReceipt {
    pub tx_hash: H256,
    pub status: ReceiptStatus,
    pub block_number: Option<u64>,
}

impl PositionReceipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }

    /// Turn anything but a successful status into [`TradeError::Reverted`]
    pub fn ensure_success(self) -> TradeResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TradeError::Reverted {
                tx_hash: self.tx_hash,
            })
        }
    }
}

impl From<SubmittedTransaction> for PositionReceipt {
    fn from(submitted: SubmittedTransaction) -> Self {
        let status = match submitted.receipt.status {
            Some(status) if status == U64::from(1) => ReceiptStatus::Success,
            Some(_) => ReceiptStatus::Reverted,
            None => ReceiptStatus::Unknown,
        };

        Self {
            tx_hash: submitted.tx_hash,
            status,
            block_number: submitted.receipt.block_number.map(|b| b.as_u64()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PositionAction {
    Increase,
    Decrease,
}

impl PositionAction {
    fn name(&self) -> &'static str {
        match self {
            PositionAction::Increase => "increase",
            PositionAction::Decrease => "decrease",
        }
    }
}

/// Client for one market's PositionRouter contract
pub struct PositionRouter<C, A> {
    sender: Arc<TransactionSender<C>>,
    approver: A,
    abi: Arc<PositionRouterAbi>,
    market: Address,
    base: FixedPointBase,
    execution_fee: U256,
}

impl PositionRouter<HttpChainClient, Erc20Approver<HttpChainClient>> {
    /// Wire an HTTP client, the configured wallet and the collateral approver
    pub fn connect(config: &MarketConfig, abi: Arc<PositionRouterAbi>) -> TradeResult<Self> {
        let client = Arc::new(HttpChainClient::from_config(config)?);
        Self::with_client(client, config, abi)
    }
}

impl<C: ChainClient> PositionRouter<C, Erc20Approver<C>> {
    /// Build a router and its ERC-20 approver around an existing chain client
    pub fn with_client(
        client: Arc<C>,
        config: &MarketConfig,
        abi: Arc<PositionRouterAbi>,
    ) -> TradeResult<Self> {
        let sender = Arc::new(TransactionSender::from_config(client, config)?);
        let approver = Erc20Approver::new(
            sender.clone(),
            config.collateral_token_address()?,
            FixedPointBase::new(config.collateral_decimals)?,
        )?;
        Self::new(sender, approver, abi, config)
    }
}

impl<C: ChainClient, A: AllowanceApprover> PositionRouter<C, A> {
    /// Create a router from its parts
    pub fn new(
        sender: Arc<TransactionSender<C>>,
        approver: A,
        abi: Arc<PositionRouterAbi>,
        config: &MarketConfig,
    ) -> TradeResult<Self> {
        Ok(Self {
            sender,
            approver,
            abi,
            market: config.market_address()?,
            base: FixedPointBase::new(config.base_decimals)?,
            execution_fee: U256::from(config.execution_fee),
        })
    }

    /// Open (or increase) a position at market.
    ///
    /// Collateral allowance for `margin` is ensured against the router before
    /// the position request is built.
    pub async fn open_market_increase_position(
        &self,
        request: &OpenPositionRequest,
    ) -> TradeResult<PositionReceipt> {
        let result = self.increase_position(request).await;
        self.finish(PositionAction::Increase, result)
    }

    /// Close (or decrease) a position at market. No allowance is needed.
    pub async fn open_market_decrease_position(
        &self,
        request: &ClosePositionRequest,
    ) -> TradeResult<PositionReceipt> {
        let result = self.decrease_position(request).await;
        self.finish(PositionAction::Decrease, result)
    }

    async fn increase_position(&self, request: &OpenPositionRequest) -> TradeResult<PositionReceipt> {
        request.validate()?;

        self.approver
            .ensure_allowance(self.market, request.margin)
            .await?;

        let args = IncreasePositionArgs {
            product_id: U256::from(request.product_id),
            margin: self.base.scale(request.margin)?,
            leverage: self.base.scale(request.leverage)?,
            is_long: request.is_long,
            acceptable_price: self.base.scale(request.acceptable_price)?,
            execution_fee: self.execution_fee,
            referral_code: request.referral_code.as_h256(),
        };
        let data = self.abi.encode_increase_position(&args)?;

        self.submit(data).await
    }

    async fn decrease_position(&self, request: &ClosePositionRequest) -> TradeResult<PositionReceipt> {
        request.validate()?;

        let args = DecreasePositionArgs {
            product_id: U256::from(request.product_id),
            margin: self.base.scale(request.margin)?,
            is_long: request.is_long,
            acceptable_price: self.base.scale(request.acceptable_price)?,
            execution_fee: self.execution_fee,
        };
        let data = self.abi.encode_decrease_position(&args)?;

        self.submit(data).await
    }

    async fn submit(&self, data: Bytes) -> TradeResult<PositionReceipt> {
        let submitted = self
            .sender
            .submit(ContractCall {
                to: self.market,
                data,
                value: self.execution_fee,
            })
            .await?;

        Ok(PositionReceipt::from(submitted))
    }

    fn finish(
        &self,
        action: PositionAction,
        result: TradeResult<PositionReceipt>,
    ) -> TradeResult<PositionReceipt> {
        let chain_id = self.sender.chain_id();

        match result {
            Ok(receipt) => {
                info!(
                    "Market {} position tx_hash: {:?}, status: {}",
                    action.name(),
                    receipt.tx_hash,
                    receipt.status
                );
                metrics::record_position_submitted(chain_id, action.name());
                if receipt.status == ReceiptStatus::Reverted {
                    warn!(
                        "Market {} position tx {:?} was mined but reverted",
                        action.name(),
                        receipt.tx_hash
                    );
                    metrics::record_position_reverted(chain_id, action.name());
                }
                Ok(receipt)
            }
            Err(e) => {
                error!("Market {} position error: {}", action.name(), e);
                metrics::record_position_failed(chain_id, action.name());
                Err(e)
            }
        }
    }

    /// PositionRouter contract address
    pub fn market_address(&self) -> Address {
        self.market
    }

    /// Wallet submitting the requests
    pub fn wallet_address(&self) -> Address {
        self.sender.wallet_address()
    }
}
