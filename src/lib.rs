//! KiloEx Trader - market position requests against the KiloEx PositionRouter
//!
//! Opens and closes leveraged positions by submitting signed
//! `createIncreasePosition` / `createDecreasePosition` calls to an EVM chain
//! and waiting for each to be mined.

pub mod chain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod router;
pub mod tx;

pub use config::{MarketConfig, Settings};
pub use error::{TradeError, TradeResult};
pub use router::{
    ClosePositionRequest, OpenPositionRequest, PositionReceipt, PositionRouter,
    PositionRouterAbi, ReceiptStatus, ReferralCode,
};
