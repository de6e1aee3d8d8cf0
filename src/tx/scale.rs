//! Fixed-point scaling of human-readable amounts into on-chain integers

use crate::config::MAX_DECIMALS;
use crate::error::{TradeError, TradeResult};

use ethers::types::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Integer base `10^decimals` applied to margin, leverage and prices.
///
/// Conversion multiplies then truncates toward zero, so any precision finer
/// than `1 / base` is dropped rather than rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPointBase {
    decimals: u32,
}

impl FixedPointBase {
    pub fn new(decimals: u32) -> TradeResult<Self> {
        if decimals > MAX_DECIMALS {
            return Err(TradeError::Config(format!(
                "fixed-point decimals {} exceed {}",
                decimals, MAX_DECIMALS
            )));
        }
        Ok(Self { decimals })
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// The multiplier itself, `10^decimals`
    pub fn base(&self) -> U256 {
        U256::exp10(self.decimals as usize)
    }

    /// floor(value * base) as an on-chain integer
    pub fn scale(&self, value: Decimal) -> TradeResult<U256> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(TradeError::InvalidInput(format!(
                "cannot scale negative amount {}",
                value
            )));
        }

        let multiplier = Decimal::from(10u64.pow(self.decimals));
        let scaled = value
            .checked_mul(multiplier)
            .ok_or_else(|| {
                TradeError::InvalidInput(format!(
                    "{} overflows at 10^{} scale",
                    value, self.decimals
                ))
            })?
            .trunc();

        let units = scaled.to_u128().ok_or_else(|| {
            TradeError::InvalidInput(format!("{} is not representable on-chain", scaled))
        })?;

        Ok(U256::from(units))
    }
}
