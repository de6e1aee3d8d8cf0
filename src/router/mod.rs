//! PositionRouter client: ABI, collateral approval and position requests
//!
//! This module provides:
//! - The immutable PositionRouter ABI shared by every router
//! - ERC-20 collateral approval ahead of opening positions
//! - Market increase / decrease position submission

pub mod abi;
pub mod allowance;
pub mod position;

pub use abi::{DecreasePositionArgs, IncreasePositionArgs, PositionRouterAbi};
pub use allowance::{AllowanceApprover, Erc20Approver};
pub use position::{
    ClosePositionRequest, OpenPositionRequest, PositionReceipt, PositionRouter, ReceiptStatus,
    ReferralCode,
};
