//! PositionRouter contract ABI
//!
//! The ABI is parsed once and shared read-only (`Arc<PositionRouterAbi>`)
//! with every router that encodes calls against it.

use crate::error::{TradeError, TradeResult};

use ethers::abi::Abi;
use ethers::contract::BaseContract;
use ethers::types::{Bytes, H256, U256};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const EMBEDDED_ABI: &str = include_str!("../../abi/PositionRouter.json");

pub const INCREASE_POSITION: &str = "createIncreasePosition";
pub const DECREASE_POSITION: &str = "createDecreasePosition";

/// Scaled arguments of `createIncreasePosition`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncreasePositionArgs {
    pub product_id: U256,
    pub margin: U256,
    pub leverage: U256,
    pub is_long: bool,
    pub acceptable_price: U256,
    pub execution_fee: U256,
    pub referral_code: H256,
}

/// Scaled arguments of `createDecreasePosition`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecreasePositionArgs {
    pub product_id: U256,
    pub margin: U256,
    pub is_long: bool,
    pub acceptable_price: U256,
    pub execution_fee: U256,
}

type IncreaseTokens = (U256, U256, U256, bool, U256, U256, H256);
type DecreaseTokens = (U256, U256, bool, U256, U256);

/// Immutable PositionRouter ABI definition
#[derive(Debug, Clone)]
pub struct PositionRouterAbi {
    contract: BaseContract,
}

impl PositionRouterAbi {
    /// ABI bundled with the crate
    pub fn embedded() -> TradeResult<Self> {
        Self::from_json(EMBEDDED_ABI)
    }

    /// Load from an ABI file, or fall back to the embedded definition
    pub fn load(path: Option<&Path>) -> TradeResult<Arc<Self>> {
        let abi = match path {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| {
                    TradeError::Abi(format!("Failed to read ABI file {:?}: {}", path, e))
                })?;
                info!("Loaded PositionRouter ABI from {:?}", path);
                Self::from_json(&json)?
            }
            None => Self::embedded()?,
        };

        Ok(Arc::new(abi))
    }

    /// Parse a JSON ABI; both position methods must be present
    pub fn from_json(json: &str) -> TradeResult<Self> {
        let abi: Abi = serde_json::from_str(json)
            .map_err(|e| TradeError::Abi(format!("Invalid ABI JSON: {}", e)))?;

        for name in [INCREASE_POSITION, DECREASE_POSITION] {
            abi.function(name)
                .map_err(|e| TradeError::Abi(format!("ABI lacks {}: {}", name, e)))?;
        }

        Ok(Self {
            contract: BaseContract::from(abi),
        })
    }

    pub fn encode_increase_position(&self, args: &IncreasePositionArgs) -> TradeResult<Bytes> {
        let tokens: IncreaseTokens = (
            args.product_id,
            args.margin,
            args.leverage,
            args.is_long,
            args.acceptable_price,
            args.execution_fee,
            args.referral_code,
        );
        Ok(self.contract.encode(INCREASE_POSITION, tokens)?)
    }

    pub fn encode_decrease_position(&self, args: &DecreasePositionArgs) -> TradeResult<Bytes> {
        let tokens: DecreaseTokens = (
            args.product_id,
            args.margin,
            args.is_long,
            args.acceptable_price,
            args.execution_fee,
        );
        Ok(self.contract.encode(DECREASE_POSITION, tokens)?)
    }

    /// Decode calldata produced by [`Self::encode_increase_position`]
    pub fn decode_increase_position(&self, data: &[u8]) -> TradeResult<IncreasePositionArgs> {
        let (product_id, margin, leverage, is_long, acceptable_price, execution_fee, referral_code): IncreaseTokens =
            self.contract.decode_input(data)?;

        Ok(IncreasePositionArgs {
            product_id,
            margin,
            leverage,
            is_long,
            acceptable_price,
            execution_fee,
            referral_code,
        })
    }

    /// Decode calldata produced by [`Self::encode_decrease_position`]
    pub fn decode_decrease_position(&self, data: &[u8]) -> TradeResult<DecreasePositionArgs> {
        let (product_id, margin, is_long, acceptable_price, execution_fee): DecreaseTokens =
            self.contract.decode_input(data)?;

        Ok(DecreasePositionArgs {
            product_id,
            margin,
            is_long,
            acceptable_price,
            execution_fee,
        })
    }
}
